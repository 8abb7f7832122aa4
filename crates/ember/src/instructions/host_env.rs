use super::Eval;
use crate::evm_impl::{EvmResult, Host};
use crate::interpreter::Interpreter;
use crate::{Spec, SpecId::*, U256};

/// EIP-1344.
pub(super) fn chainid<H: Host>(
    interpreter: &mut Interpreter,
    host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    push!(interpreter, U256::from(host.env().cfg.chain_id));

    Ok(Eval::Continue)
}

pub(super) fn coinbase<H: Host>(
    interpreter: &mut Interpreter,
    host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    push_b256!(interpreter, host.env().block.coinbase.into_word());

    Ok(Eval::Continue)
}

pub(super) fn timestamp<H: Host>(
    interpreter: &mut Interpreter,
    host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    push!(interpreter, host.env().block.timestamp);

    Ok(Eval::Continue)
}

pub(super) fn number<H: Host>(
    interpreter: &mut Interpreter,
    host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    push!(interpreter, host.env().block.number);

    Ok(Eval::Continue)
}

/// DIFFICULTY pre-merge, PREVRANDAO after (EIP-4399).
pub(super) fn difficulty<H: Host, SPEC: Spec>(
    interpreter: &mut Interpreter,
    host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    if SPEC::enabled(MERGE) {
        let prevrandao = host
            .env()
            .block
            .prevrandao
            .expect("prevrandao is validated before execution");
        push_b256!(interpreter, prevrandao);
    } else {
        push!(interpreter, host.env().block.difficulty);
    }

    Ok(Eval::Continue)
}

pub(super) fn gaslimit<H: Host>(
    interpreter: &mut Interpreter,
    host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    push!(interpreter, host.env().block.gas_limit);

    Ok(Eval::Continue)
}

/// Reports the effective per-gas price the sender pays, not the raw max fee.
pub(super) fn gasprice<H: Host>(
    interpreter: &mut Interpreter,
    host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    push!(interpreter, host.env().effective_gas_price());

    Ok(Eval::Continue)
}

/// EIP-3198.
pub(super) fn basefee<H: Host>(
    interpreter: &mut Interpreter,
    host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    push!(interpreter, host.env().block.basefee);

    Ok(Eval::Continue)
}

pub(super) fn origin<H: Host>(
    interpreter: &mut Interpreter,
    host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    push_b256!(interpreter, host.env().tx.caller.into_word());

    Ok(Eval::Continue)
}
