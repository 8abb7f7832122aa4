use super::Eval;
use crate::evm_impl::{EvmResult, ExceptionalHalt, Host};
use crate::interpreter::Interpreter;
use crate::U256;

pub(super) fn mload<H: Host>(
    interpreter: &mut Interpreter,
    _host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    pop!(interpreter, index);
    let index = as_usize_or_fail!(index, ExceptionalHalt::OutOfGas);
    memory_resize!(interpreter, index, 32);
    push!(
        interpreter,
        U256::from_be_bytes::<32>(
            interpreter
                .memory
                .get_slice(index, 32)
                .try_into()
                .expect("slice is 32 bytes")
        )
    );

    Ok(Eval::Continue)
}

pub(super) fn mstore<H: Host>(
    interpreter: &mut Interpreter,
    _host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    pop!(interpreter, index, value);
    let index = as_usize_or_fail!(index, ExceptionalHalt::OutOfGas);
    memory_resize!(interpreter, index, 32);
    interpreter.memory.set_u256(index, value);

    Ok(Eval::Continue)
}

pub(super) fn mstore8<H: Host>(
    interpreter: &mut Interpreter,
    _host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    pop!(interpreter, index, value);
    let index = as_usize_or_fail!(index, ExceptionalHalt::OutOfGas);
    memory_resize!(interpreter, index, 1);
    interpreter.memory.set_byte(index, value.byte(0));

    Ok(Eval::Continue)
}

pub(super) fn msize<H: Host>(
    interpreter: &mut Interpreter,
    _host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    push!(interpreter, U256::from(interpreter.memory.effective_len()));

    Ok(Eval::Continue)
}
