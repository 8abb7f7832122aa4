use super::Eval;
use crate::evm_impl::{EvmError, EvmResult, Host};
use crate::interpreter::Interpreter;
use crate::U256;

pub(super) fn pop<H: Host>(
    interpreter: &mut Interpreter,
    _host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    interpreter
        .stack
        .reduce_one()
        .map_err(EvmError::from)?;

    Ok(Eval::Continue)
}

/// EIP-3855.
pub(super) fn push0<H: Host>(
    interpreter: &mut Interpreter,
    _host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    push!(interpreter, U256::ZERO);

    Ok(Eval::Continue)
}

/// PUSH1..PUSH32. The immediate bytes sit right behind the PC; padding
/// guarantees the read is in bounds even at the end of the code.
pub(super) fn push_dyn<H: Host>(
    interpreter: &mut Interpreter,
    _host: &mut H,
    n: usize,
) -> EvmResult<Eval, H::DatabaseError> {
    let start = interpreter.instruction_pointer;
    // Safety: analysis padded the bytecode with 33 trailing zero bytes.
    interpreter
        .stack
        .push_slice(unsafe { core::slice::from_raw_parts(start, n) })
        .map_err(EvmError::from)?;
    interpreter.instruction_pointer = unsafe { interpreter.instruction_pointer.add(n) };

    Ok(Eval::Continue)
}

pub(super) fn dup_dyn<H: Host>(
    interpreter: &mut Interpreter,
    _host: &mut H,
    n: usize,
) -> EvmResult<Eval, H::DatabaseError> {
    interpreter.stack.dup(n).map_err(EvmError::from)?;

    Ok(Eval::Continue)
}

pub(super) fn swap_dyn<H: Host>(
    interpreter: &mut Interpreter,
    _host: &mut H,
    n: usize,
) -> EvmResult<Eval, H::DatabaseError> {
    interpreter.stack.swap(n).map_err(EvmError::from)?;

    Ok(Eval::Continue)
}
