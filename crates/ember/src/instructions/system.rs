use super::Eval;
use crate::common::{keccak256, KECCAK_EMPTY};
use crate::evm_impl::{EvmError, EvmResult, ExceptionalHalt, Host};
use crate::interpreter::Interpreter;
use crate::{gas, B256, U256};
use core::cmp::min;

pub(super) fn sha3<H: Host>(
    interpreter: &mut Interpreter,
    _host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    pop!(interpreter, from, len);
    let len = as_usize_or_fail!(len, ExceptionalHalt::OutOfGas);
    gas_or_fail!(
        interpreter,
        gas::keccak256_cost(len as u64).map(|cost| cost - gas::KECCAK256)
    );
    let hash = if len == 0 {
        KECCAK_EMPTY
    } else {
        let from = as_usize_or_fail!(from, ExceptionalHalt::OutOfGas);
        memory_resize!(interpreter, from, len);
        keccak256(interpreter.memory.get_slice(from, len))
    };
    push_b256!(interpreter, hash);

    Ok(Eval::Continue)
}

pub(super) fn address<H: Host>(
    interpreter: &mut Interpreter,
    _host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    push_b256!(interpreter, interpreter.contract.address.into_word());

    Ok(Eval::Continue)
}

pub(super) fn caller<H: Host>(
    interpreter: &mut Interpreter,
    _host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    push_b256!(interpreter, interpreter.contract.caller.into_word());

    Ok(Eval::Continue)
}

pub(super) fn callvalue<H: Host>(
    interpreter: &mut Interpreter,
    _host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    push!(interpreter, interpreter.contract.value);

    Ok(Eval::Continue)
}

pub(super) fn codesize<H: Host>(
    interpreter: &mut Interpreter,
    _host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    push!(interpreter, U256::from(interpreter.contract.code_len));

    Ok(Eval::Continue)
}

pub(super) fn codecopy<H: Host>(
    interpreter: &mut Interpreter,
    _host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    pop!(interpreter, memory_offset, code_offset, len);
    let len = as_usize_or_fail!(len, ExceptionalHalt::OutOfGas);
    gas_or_fail!(interpreter, gas::copy_cost(len as u64));
    if len == 0 {
        return Ok(Eval::Continue);
    }
    let memory_offset = as_usize_or_fail!(memory_offset, ExceptionalHalt::OutOfGas);
    let code_offset = as_usize_saturated!(code_offset);
    memory_resize!(interpreter, memory_offset, len);

    let code = interpreter.contract.original_code();
    interpreter
        .memory
        .set_data(memory_offset, code_offset, len, code);

    Ok(Eval::Continue)
}

pub(super) fn calldataload<H: Host>(
    interpreter: &mut Interpreter,
    _host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    pop!(interpreter, index);
    let index = as_usize_saturated!(index);

    let load = if index < interpreter.contract.input.len() {
        let have_bytes = min(interpreter.contract.input.len() - index, 32);
        let mut bytes = [0u8; 32];
        bytes[..have_bytes]
            .copy_from_slice(&interpreter.contract.input[index..index + have_bytes]);
        B256::new(bytes)
    } else {
        B256::ZERO
    };
    push_b256!(interpreter, load);

    Ok(Eval::Continue)
}

pub(super) fn calldatasize<H: Host>(
    interpreter: &mut Interpreter,
    _host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    push!(interpreter, U256::from(interpreter.contract.input.len()));

    Ok(Eval::Continue)
}

pub(super) fn calldatacopy<H: Host>(
    interpreter: &mut Interpreter,
    _host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    pop!(interpreter, memory_offset, data_offset, len);
    let len = as_usize_or_fail!(len, ExceptionalHalt::OutOfGas);
    gas_or_fail!(interpreter, gas::copy_cost(len as u64));
    if len == 0 {
        return Ok(Eval::Continue);
    }
    let memory_offset = as_usize_or_fail!(memory_offset, ExceptionalHalt::OutOfGas);
    let data_offset = as_usize_saturated!(data_offset);
    memory_resize!(interpreter, memory_offset, len);

    interpreter
        .memory
        .set_data(memory_offset, data_offset, len, &interpreter.contract.input);

    Ok(Eval::Continue)
}

/// EIP-211.
pub(super) fn returndatasize<H: Host>(
    interpreter: &mut Interpreter,
    _host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    push!(
        interpreter,
        U256::from(interpreter.return_data_buffer.len())
    );

    Ok(Eval::Continue)
}

/// EIP-211. Reading past the buffer is a fault, unlike CALLDATACOPY.
pub(super) fn returndatacopy<H: Host>(
    interpreter: &mut Interpreter,
    _host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    pop!(interpreter, memory_offset, offset, len);
    let len = as_usize_or_fail!(len, ExceptionalHalt::OutOfGas);
    gas_or_fail!(interpreter, gas::copy_cost(len as u64));
    let data_offset = as_usize_saturated!(offset);
    let (data_end, overflow) = data_offset.overflowing_add(len);
    if overflow || data_end > interpreter.return_data_buffer.len() {
        return Err(EvmError::from(ExceptionalHalt::OutOfBoundsRead));
    }
    if len != 0 {
        let memory_offset = as_usize_or_fail!(memory_offset, ExceptionalHalt::OutOfGas);
        memory_resize!(interpreter, memory_offset, len);
        interpreter
            .memory
            .set(memory_offset, &interpreter.return_data_buffer[data_offset..data_end]);
    }

    Ok(Eval::Continue)
}

pub(super) fn gas<H: Host>(
    interpreter: &mut Interpreter,
    _host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    push!(interpreter, U256::from(interpreter.gas.remaining()));

    Ok(Eval::Continue)
}
