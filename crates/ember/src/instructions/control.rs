use super::Eval;
use crate::evm_impl::{EvmError, EvmResult, ExceptionalHalt, Host};
use crate::interpreter::Interpreter;
use crate::U256;

pub(super) fn jump<H: Host>(
    interpreter: &mut Interpreter,
    _host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    pop!(interpreter, dest);
    let dest = as_usize_or_fail!(dest, ExceptionalHalt::InvalidJump);
    if !interpreter.contract.is_valid_jump(dest) {
        return Err(EvmError::from(ExceptionalHalt::InvalidJump));
    }
    // Safety: the destination was just validated against the jump map, which
    // only marks positions inside the code.
    interpreter.instruction_pointer =
        unsafe { interpreter.contract.bytecode.as_ptr().add(dest) };

    Ok(Eval::Continue)
}

pub(super) fn jumpi<H: Host>(
    interpreter: &mut Interpreter,
    _host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    pop!(interpreter, dest, value);
    if !value.is_zero() {
        let dest = as_usize_or_fail!(dest, ExceptionalHalt::InvalidJump);
        if !interpreter.contract.is_valid_jump(dest) {
            return Err(EvmError::from(ExceptionalHalt::InvalidJump));
        }
        // Safety: as in `jump`.
        interpreter.instruction_pointer =
            unsafe { interpreter.contract.bytecode.as_ptr().add(dest) };
    }

    Ok(Eval::Continue)
}

pub(super) fn jumpdest<H: Host>(
    _interpreter: &mut Interpreter,
    _host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    Ok(Eval::Continue)
}

pub(super) fn pc<H: Host>(
    interpreter: &mut Interpreter,
    _host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    // The PC has already advanced past this opcode.
    push!(interpreter, U256::from(interpreter.program_counter() - 1));

    Ok(Eval::Continue)
}

pub(super) fn ret<H: Host>(
    interpreter: &mut Interpreter,
    _host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    pop!(interpreter, start, len);
    let len = as_usize_or_fail!(len, ExceptionalHalt::OutOfGas);
    if len == 0 {
        interpreter.return_range = usize::MAX..usize::MAX;
    } else {
        let offset = as_usize_or_fail!(start, ExceptionalHalt::OutOfGas);
        memory_resize!(interpreter, offset, len);
        interpreter.return_range = offset..(offset + len);
    }

    Ok(Eval::Return)
}

/// EIP-140.
pub(super) fn revert<H: Host>(
    interpreter: &mut Interpreter,
    _host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    pop!(interpreter, start, len);
    let len = as_usize_or_fail!(len, ExceptionalHalt::OutOfGas);
    if len == 0 {
        interpreter.return_range = usize::MAX..usize::MAX;
    } else {
        let offset = as_usize_or_fail!(start, ExceptionalHalt::OutOfGas);
        memory_resize!(interpreter, offset, len);
        interpreter.return_range = offset..(offset + len);
    }

    Ok(Eval::Revert)
}
