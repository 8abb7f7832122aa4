//! Runtime fork dispatch: monomorphizes the executor entry points from a
//! [`SpecId`].

use crate::db::Database;
use crate::evm_impl::{EvmResult, EVMImpl, Transact, TransactionError};
use crate::interpreter::Contract;
use crate::journaled_state::JournaledState;
use crate::models::{Computation, Env, ExecutionResult};
use crate::{spec_to_generic, SpecId};

/// Applies the transaction in `env.tx` under the given fork.
pub fn transact<DB: Database>(
    spec_id: SpecId,
    env: &mut Env,
    state: &mut JournaledState,
    db: &mut DB,
) -> Result<ExecutionResult, TransactionError<DB::Error>> {
    spec_to_generic!(
        spec_id,
        EVMImpl::<SPEC, DB>::new(db, env, state).transact()
    )
}

/// Runs raw bytecode in a single frame under the given fork; commits
/// nothing on its own.
pub fn execute_bytecode<DB: Database>(
    spec_id: SpecId,
    env: &mut Env,
    state: &mut JournaledState,
    db: &mut DB,
    contract: Contract,
    gas_limit: u64,
) -> EvmResult<Computation, DB::Error> {
    spec_to_generic!(
        spec_id,
        EVMImpl::<SPEC, DB>::new(db, env, state).execute_bytecode(contract, gas_limit)
    )
}
