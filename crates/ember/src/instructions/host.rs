use super::Eval;
use crate::evm_impl::{EvmError, EvmResult, ExceptionalHalt, Host};
use crate::interpreter::Interpreter;
use crate::models::{
    CallContext, CallInputs, CallOutputs, CallScheme, CreateInputs, CreateOutputs, CreateScheme,
    Transfer,
};
use crate::{gas, Bytes, Spec, SpecId::*, B256, U256};
use core::cmp::min;

pub(super) fn balance<H: Host, SPEC: Spec>(
    interpreter: &mut Interpreter,
    host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    pop_address!(interpreter, address);
    let (balance, is_cold) = host.balance(address)?;
    if SPEC::enabled(BERLIN) && is_cold {
        // The warm cost is in the opcode table.
        gas!(interpreter, gas::cold_account_surcharge());
    }
    push!(interpreter, balance);

    Ok(Eval::Continue)
}

/// EIP-1884.
pub(super) fn selfbalance<H: Host>(
    interpreter: &mut Interpreter,
    host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    let (balance, _) = host.balance(interpreter.contract.address)?;
    push!(interpreter, balance);

    Ok(Eval::Continue)
}

pub(super) fn extcodesize<H: Host, SPEC: Spec>(
    interpreter: &mut Interpreter,
    host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    pop_address!(interpreter, address);
    let (code, is_cold) = host.code(address)?;
    if SPEC::enabled(BERLIN) && is_cold {
        gas!(interpreter, gas::cold_account_surcharge());
    }
    push!(interpreter, U256::from(code.len()));

    Ok(Eval::Continue)
}

/// EIP-1052.
pub(super) fn extcodehash<H: Host, SPEC: Spec>(
    interpreter: &mut Interpreter,
    host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    pop_address!(interpreter, address);
    let (code_hash, is_cold) = host.code_hash(address)?;
    if SPEC::enabled(BERLIN) && is_cold {
        gas!(interpreter, gas::cold_account_surcharge());
    }
    push_b256!(interpreter, code_hash);

    Ok(Eval::Continue)
}

pub(super) fn extcodecopy<H: Host, SPEC: Spec>(
    interpreter: &mut Interpreter,
    host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    pop_address!(interpreter, address);
    pop!(interpreter, memory_offset, code_offset, len_word);
    let len = as_usize_or_fail!(len_word, ExceptionalHalt::OutOfGas);

    let (code, is_cold) = host.code(address)?;
    if SPEC::enabled(BERLIN) && is_cold {
        gas!(interpreter, gas::cold_account_surcharge());
    }
    gas_or_fail!(interpreter, gas::copy_cost(len as u64));
    if len == 0 {
        return Ok(Eval::Continue);
    }
    let memory_offset = as_usize_or_fail!(memory_offset, ExceptionalHalt::OutOfGas);
    let code_offset = min(as_usize_saturated!(code_offset), code.len());
    memory_resize!(interpreter, memory_offset, len);

    interpreter
        .memory
        .set_data(memory_offset, code_offset, len, &code);

    Ok(Eval::Continue)
}

pub(super) fn blockhash<H: Host>(
    interpreter: &mut Interpreter,
    host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    pop_top!(interpreter, number);

    // Only the 256 most recent ancestors are addressable; everything else,
    // including the current block, reads as zero.
    let block_number = host.env().block.number;
    let requested = *number;
    *number = U256::ZERO;
    if let Some(diff) = block_number.checked_sub(requested) {
        let diff = as_usize_saturated!(diff);
        if diff <= 256 && diff != 0 {
            let hash = host.block_hash(requested)?;
            *number = U256::from_be_bytes(hash.0);
        }
    }

    Ok(Eval::Continue)
}

pub(super) fn sload<H: Host, SPEC: Spec>(
    interpreter: &mut Interpreter,
    host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    pop!(interpreter, index);
    let (value, is_cold) = host.sload(interpreter.contract.address, index)?;
    if SPEC::enabled(BERLIN) && is_cold {
        gas!(interpreter, gas::cold_sload_surcharge());
    }
    push!(interpreter, value);

    Ok(Eval::Continue)
}

pub(super) fn sstore<H: Host, SPEC: Spec>(
    interpreter: &mut Interpreter,
    host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    check_staticcall!(interpreter);

    pop!(interpreter, index, value);
    let (original, old, new, is_cold) =
        host.sstore(interpreter.contract.address, index, value)?;
    gas_or_fail!(interpreter, {
        let remaining = interpreter.gas.remaining();
        gas::sstore_cost::<SPEC>(original, old, new, remaining, is_cold)
    });
    refund!(interpreter, gas::sstore_refund::<SPEC>(original, old, new));

    Ok(Eval::Continue)
}

pub(super) fn log<H: Host, SPEC: Spec>(
    interpreter: &mut Interpreter,
    host: &mut H,
    n: u8,
) -> EvmResult<Eval, H::DatabaseError> {
    check_staticcall!(interpreter);

    pop!(interpreter, offset, len);
    let len = as_usize_or_fail!(len, ExceptionalHalt::OutOfGas);
    gas_or_fail!(interpreter, gas::log_cost(n, len as u64));
    let data = if len == 0 {
        Bytes::new()
    } else {
        let offset = as_usize_or_fail!(offset, ExceptionalHalt::OutOfGas);
        memory_resize!(interpreter, offset, len);
        Bytes::copy_from_slice(interpreter.memory.get_slice(offset, len))
    };

    let n = n as usize;
    if interpreter.stack.len() < n {
        return Err(EvmError::from(ExceptionalHalt::StackUnderflow));
    }
    let mut topics = Vec::with_capacity(n);
    for _ in 0..n {
        // Safety: bounds checked just above.
        topics.push(B256::from(unsafe { interpreter.stack.pop_unsafe() }));
    }

    host.log(interpreter.contract.address, topics, data);

    Ok(Eval::Continue)
}

pub(super) fn selfdestruct<H: Host, SPEC: Spec>(
    interpreter: &mut Interpreter,
    host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    check_staticcall!(interpreter);
    pop_address!(interpreter, target);

    let res = host.selfdestruct(interpreter.contract.address, target)?;

    // EIP-3529 removed the refund.
    if !SPEC::enabled(LONDON) && !res.previously_destroyed {
        refund!(interpreter, gas::SELFDESTRUCT_REFUND);
    }
    gas!(interpreter, gas::selfdestruct_cost::<SPEC>(&res));

    Ok(Eval::SelfDestruct)
}

pub(super) fn create<const IS_CREATE2: bool, H: Host, SPEC: Spec>(
    interpreter: &mut Interpreter,
    host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    check_staticcall!(interpreter);

    interpreter.return_data_buffer = Bytes::new();

    pop!(interpreter, value, code_offset, len);
    let len = as_usize_or_fail!(len, ExceptionalHalt::OutOfGas);

    let code = if len == 0 {
        Bytes::new()
    } else {
        let code_offset = as_usize_or_fail!(code_offset, ExceptionalHalt::OutOfGas);
        memory_resize!(interpreter, code_offset, len);
        Bytes::copy_from_slice(interpreter.memory.get_slice(code_offset, len))
    };

    let scheme = if IS_CREATE2 {
        pop!(interpreter, salt);
        gas_or_fail!(interpreter, gas::create2_cost(len as u64));
        CreateScheme::Create2 { salt }
    } else {
        CreateScheme::Create
    };

    // EIP-150: forward all but one 64th.
    let mut gas_limit = interpreter.gas.remaining();
    if SPEC::enabled(TANGERINE) {
        gas_limit -= gas_limit / 64;
    }
    gas!(interpreter, gas_limit);

    let mut inputs = CreateInputs {
        caller: interpreter.contract.address,
        scheme,
        value,
        init_code: code,
        gas_limit,
    };

    let CreateOutputs {
        reason,
        address,
        gas,
        return_value,
    } = host.create(&mut inputs)?;

    interpreter.return_data_buffer = if reason.is_revert() {
        // Keep the revert payload readable via RETURNDATA*.
        return_value
    } else {
        Bytes::new()
    };

    if reason.is_ok() {
        push_b256!(
            interpreter,
            address.map(|a| a.into_word()).unwrap_or_default()
        );
        interpreter.gas.erase_cost(gas.remaining());
        interpreter.gas.record_refund(gas.refunded());
    } else if reason.is_revert() {
        push!(interpreter, U256::ZERO);
        interpreter.gas.erase_cost(gas.remaining());
    } else {
        push!(interpreter, U256::ZERO);
    }

    Ok(Eval::Continue)
}

pub(super) fn call<H: Host, SPEC: Spec>(
    interpreter: &mut Interpreter,
    host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    call_inner::<H, SPEC>(interpreter, CallScheme::Call, host)
}

pub(super) fn call_code<H: Host, SPEC: Spec>(
    interpreter: &mut Interpreter,
    host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    call_inner::<H, SPEC>(interpreter, CallScheme::CallCode, host)
}

pub(super) fn delegate_call<H: Host, SPEC: Spec>(
    interpreter: &mut Interpreter,
    host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    call_inner::<H, SPEC>(interpreter, CallScheme::DelegateCall, host)
}

pub(super) fn static_call<H: Host, SPEC: Spec>(
    interpreter: &mut Interpreter,
    host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    call_inner::<H, SPEC>(interpreter, CallScheme::StaticCall, host)
}

fn call_inner<H: Host, SPEC: Spec>(
    interpreter: &mut Interpreter,
    scheme: CallScheme,
    host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    interpreter.return_data_buffer = Bytes::new();

    pop!(interpreter, local_gas_limit);
    pop_address!(interpreter, to);
    let local_gas_limit = u64::try_from(local_gas_limit).unwrap_or(u64::MAX);

    let value = match scheme {
        CallScheme::CallCode => {
            pop!(interpreter, value);
            value
        }
        CallScheme::Call => {
            pop!(interpreter, value);
            if interpreter.is_static && !value.is_zero() {
                return Err(EvmError::from(ExceptionalHalt::WriteInStaticContext));
            }
            value
        }
        CallScheme::DelegateCall | CallScheme::StaticCall => U256::ZERO,
    };

    pop!(interpreter, in_offset, in_len, out_offset, out_len);

    let in_len = as_usize_or_fail!(in_len, ExceptionalHalt::OutOfGas);
    let input = if in_len != 0 {
        let in_offset = as_usize_or_fail!(in_offset, ExceptionalHalt::OutOfGas);
        memory_resize!(interpreter, in_offset, in_len);
        Bytes::copy_from_slice(interpreter.memory.get_slice(in_offset, in_len))
    } else {
        Bytes::new()
    };

    let out_len = as_usize_or_fail!(out_len, ExceptionalHalt::OutOfGas);
    let out_offset = if out_len != 0 {
        let out_offset = as_usize_or_fail!(out_offset, ExceptionalHalt::OutOfGas);
        memory_resize!(interpreter, out_offset, out_len);
        out_offset
    } else {
        usize::MAX
    };

    let context = match scheme {
        CallScheme::Call | CallScheme::StaticCall => CallContext {
            address: to,
            caller: interpreter.contract.address,
            code_address: to,
            apparent_value: value,
            scheme,
        },
        CallScheme::CallCode => CallContext {
            address: interpreter.contract.address,
            caller: interpreter.contract.address,
            code_address: to,
            apparent_value: value,
            scheme,
        },
        CallScheme::DelegateCall => CallContext {
            address: interpreter.contract.address,
            caller: interpreter.contract.caller,
            code_address: to,
            apparent_value: interpreter.contract.value,
            scheme,
        },
    };

    let transfer = if scheme == CallScheme::Call {
        Transfer {
            source: interpreter.contract.address,
            target: to,
            value,
        }
    } else if scheme == CallScheme::CallCode {
        Transfer {
            source: interpreter.contract.address,
            target: interpreter.contract.address,
            value,
        }
    } else {
        // No balance moves for StaticCall and DelegateCall.
        Transfer {
            source: interpreter.contract.address,
            target: interpreter.contract.address,
            value: U256::ZERO,
        }
    };

    let (is_cold, exists) = host.load_account(to)?;
    let is_new = !exists;
    let transfers_value = !transfer.value.is_zero()
        && matches!(scheme, CallScheme::Call | CallScheme::CallCode);

    gas!(
        interpreter,
        gas::call_cost::<SPEC>(
            transfers_value,
            is_cold,
            is_new,
            matches!(scheme, CallScheme::Call | CallScheme::StaticCall),
        )
    );

    // EIP-150: the caller keeps one 64th of its remaining gas.
    let mut gas_limit = if SPEC::enabled(TANGERINE) {
        let gas = interpreter.gas.remaining();
        min(gas - gas / 64, local_gas_limit)
    } else {
        local_gas_limit
    };
    gas!(interpreter, gas_limit);

    if transfers_value {
        // The stipend comes on top of the forwarded gas; it was never charged
        // to the caller.
        gas_limit = gas_limit.saturating_add(gas::CALL_STIPEND);
    }
    let is_static = matches!(scheme, CallScheme::StaticCall) || interpreter.is_static;

    let mut inputs = CallInputs {
        contract: to,
        transfer,
        input,
        gas_limit,
        context,
        is_static,
    };

    let CallOutputs {
        reason,
        gas,
        return_value,
    } = host.call(&mut inputs)?;

    interpreter.return_data_buffer = return_value;
    let target_len = min(out_len, interpreter.return_data_buffer.len());

    if reason.is_ok() {
        interpreter.gas.erase_cost(gas.remaining());
        interpreter.gas.record_refund(gas.refunded());
        if target_len != 0 {
            let data = interpreter.return_data_buffer.clone();
            interpreter.memory.set(out_offset, &data[..target_len]);
        }
        push!(interpreter, U256::from(1));
    } else if reason.is_revert() {
        interpreter.gas.erase_cost(gas.remaining());
        if target_len != 0 {
            let data = interpreter.return_data_buffer.clone();
            interpreter.memory.set(out_offset, &data[..target_len]);
        }
        push!(interpreter, U256::ZERO);
    } else {
        push!(interpreter, U256::ZERO);
    }

    Ok(Eval::Continue)
}
