//! The transaction executor: validation, gas purchase, the top-level frame,
//! nested calls and creates, refunds and fee payment.

use crate::common::{keccak256, KECCAK_EMPTY};
use crate::db::Database;
use crate::gas::{self, Gas};
use crate::instructions::{Eval, Reason};
use crate::interpreter::{Contract, Interpreter, CALL_STACK_LIMIT};
use crate::journaled_state::JournaledState;
use crate::models::{
    CallContext, CallInputs, CallOutputs, CallScheme, Computation, ComputationKind, CreateInputs,
    CreateOutputs, CreateScheme, Env, ExecutionResult, Log, SelfDestructResult, TransactOut,
    TransactTo, Transfer,
};
use crate::{return_ok, return_revert, Address, Bytes, Spec, SpecId::*, B256, U256};
use core::cmp::min;
use core::fmt::Debug;
use core::marker::PhantomData;
use ember_precompile::{Error as PrecompileError, Precompiles};
use tracing::{debug, trace};

/// An exceptional halt: execution of the current frame ends immediately and,
/// for every kind except `Revert`-adjacent handling in the caller, all gas
/// forwarded to the frame is consumed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExceptionalHalt {
    #[error("the operation costs more than the gas left in the frame")]
    OutOfGas,
    #[error("a pop was executed on an empty stack")]
    StackUnderflow,
    #[error("a push was executed on a stack at max capacity")]
    StackOverflow,
    #[error("the opcode is not defined in the active fork")]
    OpcodeNotFound,
    #[error("the designated invalid opcode was executed")]
    InvalidOpcode,
    #[error("jump destination is not a JUMPDEST on an instruction boundary")]
    InvalidJump,
    #[error("read beyond the boundaries of the return data buffer")]
    OutOfBoundsRead,
    #[error("state modification attempted inside a STATICCALL context")]
    WriteInStaticContext,
    #[error("the message depth limit of 1024 was reached")]
    StackDepthLimit,
    #[error("value transfer exceeds the available balance")]
    OutOfFund,
    #[error("the created contract address is already occupied")]
    CreateCollision,
    #[error("the deployed code would exceed the EIP-170 size limit")]
    CreateContractSizeLimit,
    #[error("the deployed code starts with the reserved 0xEF byte")]
    CreateContractStartingWithEF,
    #[error("the sender nonce cannot be incremented further")]
    NonceOverflow,
    #[error("a precompiled contract rejected its input")]
    PrecompileFailure,
}

impl From<PrecompileError> for ExceptionalHalt {
    fn from(error: PrecompileError) -> Self {
        match error {
            PrecompileError::OutOfGas => Self::OutOfGas,
            _ => Self::PrecompileFailure,
        }
    }
}

/// Frame-level error channel: either a fault of the executing code, or the
/// state backend failing to produce data. The latter aborts the whole
/// transaction and is the only variant that escapes a frame.
#[derive(Debug, thiserror::Error)]
pub enum EvmError<DE: Debug> {
    #[error("the state database failed to produce data: {0:?}")]
    DatabaseFailure(DE),
    #[error(transparent)]
    Halt(#[from] ExceptionalHalt),
}

pub type EvmResult<T, E> = Result<T, EvmError<E>>;

/// Rejections raised before (or instead of) executing a transaction. None of
/// these consume gas or change state.
#[derive(Debug, thiserror::Error)]
pub enum TransactionError<DE: Debug> {
    #[error("transaction gas limit is higher than the block gas limit")]
    CallerGasLimitMoreThanBlock,
    #[error("gas limit does not cover the intrinsic transaction cost")]
    CallGasCostMoreThanGasLimit,
    #[error("priority fee is greater than the max fee")]
    GasMaxFeeGreaterThanPriorityFee,
    #[error("effective gas price is below the block base fee")]
    GasPriceLessThanBasefee,
    #[error("sender cannot afford gas limit and transferred value")]
    LackOfFundForGasLimit,
    #[error("transaction nonce {tx} does not match sender nonce {state}")]
    NonceMismatch { tx: u64, state: u64 },
    #[error("incrementing the nonce of {0} overflows")]
    NonceOverflow(Address),
    #[error("gas payment calculation overflows")]
    OverflowPayment,
    #[error("prevrandao is not set for a post-merge block")]
    PrevrandaoNotSet,
    #[error("transaction sender has deployed code (EIP-3607)")]
    RejectCallerWithCode,
    #[error("the state database failed to produce data: {0:?}")]
    DatabaseFailure(DE),
    #[error("frame halt escaped the executor: {0}")]
    Internal(ExceptionalHalt),
}

impl<DE: Debug> From<EvmError<DE>> for TransactionError<DE> {
    fn from(error: EvmError<DE>) -> Self {
        match error {
            EvmError::DatabaseFailure(e) => Self::DatabaseFailure(e),
            // Halts are captured at frame boundaries; one reaching here is an
            // executor bug.
            EvmError::Halt(halt) => Self::Internal(halt),
        }
    }
}

/// What the opcode handlers can ask of their surroundings.
pub trait Host {
    type DatabaseError: Debug;

    fn env(&mut self) -> &mut Env;

    /// Loads an account; returns `(is_cold, exists)`.
    fn load_account(&mut self, address: Address)
        -> EvmResult<(bool, bool), Self::DatabaseError>;
    /// Hash of an ancestor block.
    fn block_hash(&mut self, number: U256) -> EvmResult<B256, Self::DatabaseError>;
    /// Balance of an address; returns `(balance, is_cold)`.
    fn balance(&mut self, address: Address) -> EvmResult<(U256, bool), Self::DatabaseError>;
    /// Code of an address; returns `(code, is_cold)`.
    fn code(&mut self, address: Address) -> EvmResult<(Bytes, bool), Self::DatabaseError>;
    /// Code hash of an address per EIP-1052; empty accounts hash to zero.
    fn code_hash(&mut self, address: Address) -> EvmResult<(B256, bool), Self::DatabaseError>;
    /// Storage read; returns `(value, is_cold)`.
    fn sload(&mut self, address: Address, index: U256)
        -> EvmResult<(U256, bool), Self::DatabaseError>;
    /// Storage write; returns `(original, present, new, is_cold)`.
    fn sstore(
        &mut self,
        address: Address,
        index: U256,
        value: U256,
    ) -> EvmResult<(U256, U256, U256, bool), Self::DatabaseError>;
    fn log(&mut self, address: Address, topics: Vec<B256>, data: Bytes);
    fn selfdestruct(
        &mut self,
        address: Address,
        target: Address,
    ) -> EvmResult<SelfDestructResult, Self::DatabaseError>;
    fn create(
        &mut self,
        inputs: &mut CreateInputs,
    ) -> EvmResult<CreateOutputs, Self::DatabaseError>;
    fn call(&mut self, inputs: &mut CallInputs) -> EvmResult<CallOutputs, Self::DatabaseError>;
}

pub struct EVMData<'a, DB: Database> {
    pub env: &'a mut Env,
    pub journaled_state: &'a mut JournaledState,
    pub db: &'a mut DB,
}

/// One transaction's executor, monomorphized over the fork rules.
pub struct EVMImpl<'a, GSPEC: Spec, DB: Database> {
    pub data: EVMData<'a, DB>,
    precompiles: &'static Precompiles,
    depth: usize,
    trace_stack: Vec<Computation>,
    root_trace: Option<Computation>,
    _phantomdata: PhantomData<GSPEC>,
}

pub trait Transact<DBError: Debug> {
    /// Runs the transaction in `env.tx` against the journaled state.
    fn transact(&mut self) -> Result<ExecutionResult, TransactionError<DBError>>;
}

impl<'a, GSPEC: Spec, DB: Database> Transact<DB::Error> for EVMImpl<'a, GSPEC, DB> {
    fn transact(&mut self) -> Result<ExecutionResult, TransactionError<DB::Error>> {
        let caller = self.data.env.tx.caller;
        let value = self.data.env.tx.value;
        let data = self.data.env.tx.data.clone();
        let gas_limit = self.data.env.tx.gas_limit;
        let effective_gas_price = self.data.env.effective_gas_price();
        let log_start = self.data.journaled_state.log_count();

        if GSPEC::enabled(MERGE) && self.data.env.block.prevrandao.is_none() {
            return Err(TransactionError::PrevrandaoNotSet);
        }

        if GSPEC::enabled(LONDON) {
            if let Some(priority_fee) = self.data.env.tx.gas_priority_fee {
                if priority_fee > self.data.env.tx.gas_price {
                    return Err(TransactionError::GasMaxFeeGreaterThanPriorityFee);
                }
            }
            if !self.data.env.cfg.costless && effective_gas_price < self.data.env.block.basefee {
                return Err(TransactionError::GasPriceLessThanBasefee);
            }
        }

        if U256::from(gas_limit) > self.data.env.block.gas_limit {
            return Err(TransactionError::CallerGasLimitMoreThanBlock);
        }

        let mut gas = Gas::new(gas_limit);
        if !gas.record_cost(self.intrinsic_gas()) {
            return Err(TransactionError::CallGasCostMoreThanGasLimit);
        }

        self.data
            .journaled_state
            .load_account(caller, self.data.db)
            .map_err(TransactionError::DatabaseFailure)?;

        let caller_info = &self.data.journaled_state.state[&caller].info;

        // EIP-3607: introduced after London, but there is no historic
        // collision in leaving it always on.
        if caller_info.code_hash != KECCAK_EMPTY {
            return Err(TransactionError::RejectCallerWithCode);
        }

        if caller_info.nonce != self.data.env.tx.nonce {
            return Err(TransactionError::NonceMismatch {
                tx: self.data.env.tx.nonce,
                state: caller_info.nonce,
            });
        }

        // The sender buys the whole gas limit up front.
        let payment = U256::from(gas_limit)
            .checked_mul(effective_gas_price)
            .ok_or(TransactionError::OverflowPayment)?;
        let balance = caller_info.balance;
        if payment.saturating_add(value) > balance {
            return Err(TransactionError::LackOfFundForGasLimit);
        }
        self.data
            .journaled_state
            .set_balance(caller, balance - payment, self.data.db)
            .map_err(TransactionError::DatabaseFailure)?;

        if GSPEC::enabled(BERLIN) {
            self.warm_transaction_sets()
                .map_err(TransactionError::DatabaseFailure)?;
        }

        trace!(
            sender = %caller,
            gas = gas_limit,
            value = %value,
            data_hash = %keccak256(&data),
            "transaction start"
        );

        // From here every unit is spent unless the frame hands it back.
        let transact_gas_limit = gas.remaining();
        let _ = gas.record_cost(transact_gas_limit);

        let (reason, ret_gas, out) = match self.data.env.tx.transact_to {
            TransactTo::Call(address) => {
                if self.data.journaled_state.inc_nonce(caller).is_none() {
                    return Err(TransactionError::NonceOverflow(caller));
                }
                let context = CallContext {
                    caller,
                    address,
                    code_address: address,
                    apparent_value: value,
                    scheme: CallScheme::Call,
                };
                let mut inputs = CallInputs {
                    contract: address,
                    transfer: Transfer {
                        source: caller,
                        target: address,
                        value,
                    },
                    input: data,
                    gas_limit: transact_gas_limit,
                    context,
                    is_static: false,
                };
                let outputs = self.call_inner(&mut inputs)?;
                (
                    outputs.reason,
                    outputs.gas,
                    TransactOut::Call(outputs.return_value),
                )
            }
            TransactTo::Create(scheme) => {
                let mut inputs = CreateInputs {
                    caller,
                    scheme,
                    value,
                    init_code: data,
                    gas_limit: transact_gas_limit,
                };
                let outputs = self.create_inner(&mut inputs)?;
                (
                    outputs.reason,
                    outputs.gas,
                    TransactOut::Create(outputs.return_value, outputs.address),
                )
            }
        };

        match reason {
            return_ok!() => {
                gas.erase_cost(ret_gas.remaining());
                gas.record_refund(ret_gas.refunded());
            }
            return_revert!() => {
                gas.erase_cost(ret_gas.remaining());
            }
            _ => {}
        }

        let (gas_used, gas_refunded) = self
            .finalize(caller, &gas)
            .map_err(TransactionError::DatabaseFailure)?;

        // EIP-161: touched accounts that ended the transaction empty vanish.
        if GSPEC::enabled(SPURIOUS_DRAGON) {
            for address in self.data.journaled_state.clear_touched_empty_accounts() {
                trace!(%address, "clearing empty touched account");
            }
        }

        debug!(
            sender = %caller,
            gas_used,
            gas_refunded,
            success = matches!(reason, return_ok!()),
            "transaction executed"
        );

        let logs = self.data.journaled_state.logs_since(log_start).to_vec();
        let computation = self
            .root_trace
            .take()
            .expect("top-level frame always leaves a trace");

        Ok(ExecutionResult {
            reason,
            out,
            gas_used,
            gas_refunded,
            logs,
            computation,
        })
    }
}

impl<'a, GSPEC: Spec, DB: Database> EVMImpl<'a, GSPEC, DB> {
    pub fn new(db: &'a mut DB, env: &'a mut Env, journaled_state: &'a mut JournaledState) -> Self {
        journaled_state.set_spec_id(GSPEC::SPEC_ID);
        Self {
            data: EVMData {
                env,
                journaled_state,
                db,
            },
            precompiles: Precompiles::new(GSPEC::SPEC_ID.precompile_spec()),
            depth: 0,
            trace_stack: Vec::new(),
            root_trace: None,
            _phantomdata: PhantomData,
        }
    }

    pub fn precompile_addresses(&self) -> impl Iterator<Item = &Address> {
        self.precompiles.addresses()
    }

    /// Gas charged before any bytecode runs.
    fn intrinsic_gas(&self) -> u64 {
        let is_create = self.data.env.tx.transact_to.is_create();
        let access_list_addresses = self.data.env.tx.access_list.len() as u64;
        let access_list_slots: u64 = self
            .data
            .env
            .tx
            .access_list
            .iter()
            .map(|(_, slots)| slots.len() as u64)
            .sum();
        gas::intrinsic_gas::<GSPEC>(
            &self.data.env.tx.data,
            is_create,
            access_list_addresses,
            access_list_slots,
        )
    }

    /// EIP-2929 pre-warming: sender, target, the access list, and every
    /// precompile of the active fork.
    fn warm_transaction_sets(&mut self) -> Result<(), DB::Error> {
        self.data.journaled_state.mark_address_warm(self.data.env.tx.caller);
        if let TransactTo::Call(address) = self.data.env.tx.transact_to {
            self.data.journaled_state.mark_address_warm(address);
        }
        let precompiles = self.precompiles;
        for address in precompiles.addresses() {
            self.data.journaled_state.mark_address_warm(*address);
        }
        let access_list = self.data.env.tx.access_list.clone();
        for (address, slots) in access_list {
            self.data
                .journaled_state
                .load_account(address, self.data.db)?;
            for slot in slots {
                self.data.journaled_state.mark_storage_warm(address, slot);
            }
        }
        Ok(())
    }

    /// Refund, sender reimbursement and the coinbase tip.
    fn finalize(&mut self, caller: Address, gas: &Gas) -> Result<(u64, u64), DB::Error> {
        let coinbase = self.data.env.block.coinbase;
        let effective_gas_price = self.data.env.effective_gas_price();
        let basefee = self.data.env.block.basefee;

        // EIP-3529 reduced the refund ceiling.
        let max_refund_quotient = if GSPEC::enabled(LONDON) { 5 } else { 2 };
        let gas_refunded = min(
            gas.refunded().max(0) as u64,
            gas.spend() / max_refund_quotient,
        );

        self.data.journaled_state.delta_balance(
            caller,
            effective_gas_price * U256::from(gas.remaining() + gas_refunded),
            self.data.db,
        )?;

        // EIP-1559: the base-fee share is burned, only the tip reaches the
        // coinbase.
        let coinbase_gas_price = if GSPEC::enabled(LONDON) {
            effective_gas_price.saturating_sub(basefee)
        } else {
            effective_gas_price
        };

        // The coinbase is touched even for a zero fee, so post-merge
        // zero-tip blocks still clean it up if it is empty (EIP-161).
        self.data
            .journaled_state
            .load_account(coinbase, self.data.db)?;
        self.data.journaled_state.touch(&coinbase);
        self.data.journaled_state.delta_balance(
            coinbase,
            coinbase_gas_price * U256::from(gas.spend() - gas_refunded),
            self.data.db,
        )?;

        Ok((gas.spend() - gas_refunded, gas_refunded))
    }

    //
    // Trace plumbing
    //

    fn trace_enter(
        &mut self,
        kind: ComputationKind,
        from: Address,
        to: Address,
        value: U256,
        gas_limit: u64,
    ) {
        self.trace_stack
            .push(Computation::enter(kind, from, to, value, gas_limit));
    }

    fn trace_exit(&mut self, reason: Reason, gas: &Gas, output: &Bytes) {
        let mut node = self.trace_stack.pop().expect("balanced trace frames");
        node.gas_used = if matches!(reason, Reason::Failure(_)) {
            node.gas_limit
        } else {
            gas.spend()
        };
        node.gas_refunded = gas.refunded();
        node.output = output.clone();
        node.reason = Some(reason);
        match self.trace_stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => self.root_trace = Some(node),
        }
    }

    //
    // Frames
    //

    /// Runs one interpreter frame, capturing faults into a `Reason`.
    /// Database failures pass through and abort the transaction.
    fn run_interpreter(
        &mut self,
        contract: Contract,
        gas_limit: u64,
        is_static: bool,
    ) -> EvmResult<(Reason, Interpreter), DB::Error> {
        self.depth += 1;
        let mut interpreter = Interpreter::new::<GSPEC>(contract, gas_limit, is_static);
        let exit = interpreter.run::<Self, GSPEC>(self);
        self.depth -= 1;
        let reason = match exit {
            Ok(eval) => Reason::Success(eval),
            Err(EvmError::Halt(halt)) => Reason::Failure(halt),
            Err(error @ EvmError::DatabaseFailure(_)) => return Err(error),
        };
        Ok((reason, interpreter))
    }

    /// Runs arbitrary code in a single frame without transferring value.
    /// The read-only harness: the caller reverts around it.
    pub fn execute_bytecode(
        &mut self,
        contract: Contract,
        gas_limit: u64,
    ) -> EvmResult<Computation, DB::Error> {
        self.trace_enter(
            ComputationKind::Call,
            contract.caller,
            contract.address,
            contract.value,
            gas_limit,
        );
        self.data
            .journaled_state
            .load_account(contract.address, self.data.db)
            .map_err(EvmError::DatabaseFailure)?;
        let (reason, interpreter) = self.run_interpreter(contract, gas_limit, false)?;
        let return_value = interpreter.return_value();
        self.trace_exit(reason, &interpreter.gas, &return_value);
        Ok(self
            .root_trace
            .take()
            .expect("harness frame closes the trace"))
    }

    fn fail_create(&mut self, halt: ExceptionalHalt, gas: Gas) -> CreateOutputs {
        self.trace_exit(Reason::Failure(halt), &gas, &Bytes::new());
        CreateOutputs {
            reason: Reason::Failure(halt),
            address: None,
            gas,
            return_value: Bytes::new(),
        }
    }

    fn fail_call(&mut self, halt: ExceptionalHalt, gas: Gas) -> CallOutputs {
        self.trace_exit(Reason::Failure(halt), &gas, &Bytes::new());
        CallOutputs {
            reason: Reason::Failure(halt),
            gas,
            return_value: Bytes::new(),
        }
    }

    fn create_inner(
        &mut self,
        inputs: &mut CreateInputs,
    ) -> EvmResult<CreateOutputs, DB::Error> {
        let gas = Gas::new(inputs.gas_limit);
        self.trace_enter(
            ComputationKind::Create,
            inputs.caller,
            Address::ZERO,
            inputs.value,
            inputs.gas_limit,
        );

        if self.depth >= CALL_STACK_LIMIT {
            return Ok(self.fail_create(ExceptionalHalt::StackDepthLimit, gas));
        }

        // Balance check before touching the nonce.
        let (caller_account, _) = self
            .data
            .journaled_state
            .load_account(inputs.caller, self.data.db)
            .map_err(EvmError::DatabaseFailure)?;
        if caller_account.info.balance < inputs.value {
            return Ok(self.fail_create(ExceptionalHalt::OutOfFund, gas));
        }

        let old_nonce = match self.data.journaled_state.inc_nonce(inputs.caller) {
            Some(nonce) => nonce - 1,
            None => return Ok(self.fail_create(ExceptionalHalt::NonceOverflow, gas)),
        };

        let code_hash = keccak256(&inputs.init_code);
        let created_address = match inputs.scheme {
            CreateScheme::Create => inputs.caller.create(old_nonce),
            CreateScheme::Create2 { salt } => {
                inputs.caller.create2(B256::from(salt), code_hash)
            }
        };
        if let Some(node) = self.trace_stack.last_mut() {
            node.to = created_address;
        }

        // Loading warms the new address (EIP-2929).
        self.data
            .journaled_state
            .load_account(created_address, self.data.db)
            .map_err(EvmError::DatabaseFailure)?;

        let checkpoint = self.data.journaled_state.checkpoint();

        // Existing code or nonce at the target: the create fails and the
        // forwarded gas is gone.
        match self
            .data
            .journaled_state
            .create_account(created_address, self.data.db)
        {
            Ok(true) => {}
            Ok(false) => {
                self.data.journaled_state.checkpoint_revert(checkpoint);
                return Ok(self.fail_create(ExceptionalHalt::CreateCollision, gas));
            }
            Err(e) => return Err(EvmError::DatabaseFailure(e)),
        }

        // EIP-161: a new contract starts life at nonce 1.
        if GSPEC::enabled(SPURIOUS_DRAGON) {
            self.data.journaled_state.inc_nonce(created_address);
        }

        match self.data.journaled_state.transfer(
            &inputs.caller,
            &created_address,
            inputs.value,
            self.data.db,
        ) {
            Ok(()) => {}
            Err(EvmError::Halt(_)) => {
                self.data.journaled_state.checkpoint_revert(checkpoint);
                return Ok(self.fail_create(ExceptionalHalt::OutOfFund, gas));
            }
            Err(error) => return Err(error),
        }

        let contract = Contract::new(
            Bytes::new(),
            inputs.init_code.clone(),
            created_address,
            inputs.caller,
            inputs.value,
        );
        let (reason, mut interpreter) =
            self.run_interpreter(contract, gas.limit(), false)?;

        let outputs = match reason {
            return_ok!() => {
                let mut code = interpreter.return_value();

                // EIP-3541: reject new code starting with 0xEF.
                if GSPEC::enabled(LONDON) && code.first() == Some(&0xEF) {
                    self.data.journaled_state.checkpoint_revert(checkpoint);
                    return Ok(
                        self.fail_create(ExceptionalHalt::CreateContractStartingWithEF, gas)
                    );
                }

                // EIP-170.
                let size_limit = self
                    .data
                    .env
                    .cfg
                    .limit_contract_code_size
                    .unwrap_or(gas::MAX_CODE_SIZE);
                if GSPEC::enabled(SPURIOUS_DRAGON) && code.len() > size_limit {
                    self.data.journaled_state.checkpoint_revert(checkpoint);
                    return Ok(
                        self.fail_create(ExceptionalHalt::CreateContractSizeLimit, gas)
                    );
                }

                let deposit_cost = code.len() as u64 * gas::CODEDEPOSIT;
                if !interpreter.gas.record_cost(deposit_cost) {
                    // EIP-2 point 3: Homestead turns an unpaid code deposit
                    // into a failed create; Frontier deployed an empty
                    // contract instead.
                    if GSPEC::enabled(HOMESTEAD) {
                        self.data.journaled_state.checkpoint_revert(checkpoint);
                        return Ok(self.fail_create(ExceptionalHalt::OutOfGas, gas));
                    }
                    code = Bytes::new();
                }

                self.data.journaled_state.checkpoint_commit();
                self.data.journaled_state.set_code(created_address, code.clone());
                self.trace_exit(reason, &interpreter.gas, &code);
                CreateOutputs {
                    reason,
                    address: Some(created_address),
                    gas: interpreter.gas,
                    return_value: code,
                }
            }
            _ => {
                self.data.journaled_state.checkpoint_revert(checkpoint);
                let return_value = interpreter.return_value();
                self.trace_exit(reason, &interpreter.gas, &return_value);
                CreateOutputs {
                    reason,
                    address: Some(created_address),
                    gas: interpreter.gas,
                    return_value,
                }
            }
        };
        Ok(outputs)
    }

    fn call_inner(&mut self, inputs: &mut CallInputs) -> EvmResult<CallOutputs, DB::Error> {
        let mut gas = Gas::new(inputs.gas_limit);
        let kind = if self.precompiles.contains(&inputs.contract) {
            ComputationKind::Precompile
        } else {
            ComputationKind::Call
        };
        self.trace_enter(
            kind,
            inputs.context.caller,
            inputs.context.address,
            inputs.context.apparent_value,
            inputs.gas_limit,
        );

        // Load the code up front; the account is warm from here on.
        let code = {
            let (account, _) = self
                .data
                .journaled_state
                .load_code(inputs.contract, self.data.db)
                .map_err(EvmError::DatabaseFailure)?;
            account.info.code.clone().expect("code filled by load_code")
        };

        if self.depth >= CALL_STACK_LIMIT {
            return Ok(self.fail_call(ExceptionalHalt::StackDepthLimit, gas));
        }

        let checkpoint = self.data.journaled_state.checkpoint();

        // A zero-value call still touches the target (EIP-161 cleanup).
        if inputs.transfer.value.is_zero() {
            self.data
                .journaled_state
                .load_account(inputs.context.address, self.data.db)
                .map_err(EvmError::DatabaseFailure)?;
            self.data.journaled_state.touch(&inputs.context.address);
        }

        match self.data.journaled_state.transfer(
            &inputs.transfer.source,
            &inputs.transfer.target,
            inputs.transfer.value,
            self.data.db,
        ) {
            Ok(()) => {}
            Err(EvmError::Halt(_)) => {
                self.data.journaled_state.checkpoint_revert(checkpoint);
                return Ok(self.fail_call(ExceptionalHalt::OutOfFund, gas));
            }
            Err(error) => return Err(error),
        }

        let outputs = if let Some(precompile) = self.precompiles.get(&inputs.contract) {
            match precompile(inputs.input.as_ref(), inputs.gas_limit) {
                Ok((gas_used, output)) => {
                    if gas.record_cost(gas_used) {
                        self.data.journaled_state.checkpoint_commit();
                        let return_value = Bytes::from(output);
                        self.trace_exit(Reason::Success(Eval::Return), &gas, &return_value);
                        CallOutputs {
                            reason: Reason::Success(Eval::Return),
                            gas,
                            return_value,
                        }
                    } else {
                        self.data.journaled_state.checkpoint_revert(checkpoint);
                        self.fail_call(ExceptionalHalt::OutOfGas, gas)
                    }
                }
                Err(error) => {
                    self.data.journaled_state.checkpoint_revert(checkpoint);
                    self.fail_call(ExceptionalHalt::from(error), gas)
                }
            }
        } else {
            let contract =
                Contract::new_with_context(inputs.input.clone(), code, &inputs.context);
            let (reason, interpreter) =
                self.run_interpreter(contract, gas.limit(), inputs.is_static)?;
            if matches!(reason, return_ok!()) {
                self.data.journaled_state.checkpoint_commit();
            } else {
                self.data.journaled_state.checkpoint_revert(checkpoint);
            }
            let return_value = interpreter.return_value();
            self.trace_exit(reason, &interpreter.gas, &return_value);
            CallOutputs {
                reason,
                gas: interpreter.gas,
                return_value,
            }
        };
        Ok(outputs)
    }
}

impl<'a, GSPEC: Spec, DB: Database> Host for EVMImpl<'a, GSPEC, DB> {
    type DatabaseError = DB::Error;

    fn env(&mut self) -> &mut Env {
        self.data.env
    }

    fn load_account(
        &mut self,
        address: Address,
    ) -> EvmResult<(bool, bool), Self::DatabaseError> {
        self.data
            .journaled_state
            .load_account_exist(address, self.data.db)
            .map_err(EvmError::DatabaseFailure)
    }

    fn block_hash(&mut self, number: U256) -> EvmResult<B256, Self::DatabaseError> {
        self.data
            .db
            .block_hash(number)
            .map_err(EvmError::DatabaseFailure)
    }

    fn balance(&mut self, address: Address) -> EvmResult<(U256, bool), Self::DatabaseError> {
        self.data
            .journaled_state
            .load_account(address, self.data.db)
            .map(|(account, is_cold)| (account.info.balance, is_cold))
            .map_err(EvmError::DatabaseFailure)
    }

    fn code(&mut self, address: Address) -> EvmResult<(Bytes, bool), Self::DatabaseError> {
        self.data
            .journaled_state
            .load_code(address, self.data.db)
            .map(|(account, is_cold)| {
                (
                    account.info.code.clone().expect("code filled by load_code"),
                    is_cold,
                )
            })
            .map_err(EvmError::DatabaseFailure)
    }

    fn code_hash(&mut self, address: Address) -> EvmResult<(B256, bool), Self::DatabaseError> {
        let (account, is_cold) = self
            .data
            .journaled_state
            .load_code(address, self.data.db)
            .map_err(EvmError::DatabaseFailure)?;
        // EIP-1052: absent and empty accounts both hash to zero.
        if account.is_not_existing || account.is_destroyed || account.is_empty() {
            return Ok((B256::ZERO, is_cold));
        }
        Ok((account.info.code_hash, is_cold))
    }

    fn sload(
        &mut self,
        address: Address,
        index: U256,
    ) -> EvmResult<(U256, bool), Self::DatabaseError> {
        self.data
            .journaled_state
            .sload(address, index, self.data.db)
            .map_err(EvmError::DatabaseFailure)
    }

    fn sstore(
        &mut self,
        address: Address,
        index: U256,
        value: U256,
    ) -> EvmResult<(U256, U256, U256, bool), Self::DatabaseError> {
        self.data
            .journaled_state
            .sstore(address, index, value, self.data.db)
            .map_err(EvmError::DatabaseFailure)
    }

    fn log(&mut self, address: Address, topics: Vec<B256>, data: Bytes) {
        self.data.journaled_state.log(Log {
            address,
            topics,
            data,
        });
    }

    fn selfdestruct(
        &mut self,
        address: Address,
        target: Address,
    ) -> EvmResult<SelfDestructResult, Self::DatabaseError> {
        self.data
            .journaled_state
            .selfdestruct(address, target, self.data.db)
            .map_err(EvmError::DatabaseFailure)
    }

    fn create(
        &mut self,
        inputs: &mut CreateInputs,
    ) -> EvmResult<CreateOutputs, Self::DatabaseError> {
        self.create_inner(inputs)
    }

    fn call(&mut self, inputs: &mut CallInputs) -> EvmResult<CallOutputs, Self::DatabaseError> {
        self.call_inner(inputs)
    }
}

/// A host with no state behind it; enough for the pure opcode handlers in
/// unit tests.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct NoHost {
    pub env: Env,
    pub logs: Vec<Log>,
}

#[cfg(test)]
impl Host for NoHost {
    type DatabaseError = core::convert::Infallible;

    fn env(&mut self) -> &mut Env {
        &mut self.env
    }

    fn load_account(&mut self, _address: Address) -> EvmResult<(bool, bool), Self::DatabaseError> {
        Ok((false, false))
    }

    fn block_hash(&mut self, _number: U256) -> EvmResult<B256, Self::DatabaseError> {
        Ok(B256::ZERO)
    }

    fn balance(&mut self, _address: Address) -> EvmResult<(U256, bool), Self::DatabaseError> {
        Ok((U256::ZERO, false))
    }

    fn code(&mut self, _address: Address) -> EvmResult<(Bytes, bool), Self::DatabaseError> {
        Ok((Bytes::new(), false))
    }

    fn code_hash(&mut self, _address: Address) -> EvmResult<(B256, bool), Self::DatabaseError> {
        Ok((B256::ZERO, false))
    }

    fn sload(
        &mut self,
        _address: Address,
        _index: U256,
    ) -> EvmResult<(U256, bool), Self::DatabaseError> {
        Ok((U256::ZERO, false))
    }

    fn sstore(
        &mut self,
        _address: Address,
        _index: U256,
        value: U256,
    ) -> EvmResult<(U256, U256, U256, bool), Self::DatabaseError> {
        Ok((U256::ZERO, U256::ZERO, value, false))
    }

    fn log(&mut self, address: Address, topics: Vec<B256>, data: Bytes) {
        self.logs.push(Log {
            address,
            topics,
            data,
        });
    }

    fn selfdestruct(
        &mut self,
        _address: Address,
        _target: Address,
    ) -> EvmResult<SelfDestructResult, Self::DatabaseError> {
        Ok(SelfDestructResult::default())
    }

    fn create(
        &mut self,
        _inputs: &mut CreateInputs,
    ) -> EvmResult<CreateOutputs, Self::DatabaseError> {
        unimplemented!("NoHost cannot spawn frames")
    }

    fn call(&mut self, _inputs: &mut CallInputs) -> EvmResult<CallOutputs, Self::DatabaseError> {
        unimplemented!("NoHost cannot spawn frames")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryDB;
    use crate::models::AccountInfo;
    use crate::specification::BerlinSpec;

    fn call_inputs(to: Address) -> CallInputs {
        CallInputs {
            contract: to,
            transfer: Transfer {
                source: Address::ZERO,
                target: to,
                value: U256::ZERO,
            },
            input: Bytes::new(),
            gas_limit: 50_000,
            context: CallContext {
                address: to,
                caller: Address::ZERO,
                code_address: to,
                apparent_value: U256::ZERO,
                scheme: CallScheme::Call,
            },
            is_static: false,
        }
    }

    #[test]
    fn frame_at_depth_limit_fails_without_running() {
        let mut db = InMemoryDB::default();
        let mut env = Env::default();
        let mut state = JournaledState::new(crate::SpecId::BERLIN);
        let mut evm = EVMImpl::<BerlinSpec, _>::new(&mut db, &mut env, &mut state);

        evm.depth = CALL_STACK_LIMIT;
        let outputs = evm.call_inner(&mut call_inputs(Address::repeat_byte(1))).unwrap();
        assert_eq!(
            outputs.reason,
            Reason::Failure(ExceptionalHalt::StackDepthLimit)
        );

        // one below the limit still runs (the target has no code, so it
        // halts cleanly)
        evm.depth = CALL_STACK_LIMIT - 1;
        let outputs = evm.call_inner(&mut call_inputs(Address::repeat_byte(1))).unwrap();
        assert!(outputs.reason.is_ok());
    }

    #[test]
    fn transfer_failure_inside_frame_is_contained() {
        let mut db = InMemoryDB::default();
        db.insert_account_info(Address::ZERO, AccountInfo::from_balance(U256::from(5)));
        let mut env = Env::default();
        let mut state = JournaledState::new(crate::SpecId::BERLIN);
        let mut evm = EVMImpl::<BerlinSpec, _>::new(&mut db, &mut env, &mut state);

        let mut inputs = call_inputs(Address::repeat_byte(1));
        inputs.transfer.value = U256::from(100);
        let outputs = evm.call_inner(&mut inputs).unwrap();
        assert_eq!(outputs.reason, Reason::Failure(ExceptionalHalt::OutOfFund));
        // the balance is untouched
        let EVMData {
            journaled_state,
            db,
            ..
        } = &mut evm.data;
        assert_eq!(
            journaled_state
                .balance(Address::ZERO, &mut **db)
                .unwrap(),
            U256::from(5)
        );
    }
}
