use super::i256::{i256_div, i256_mod};
use super::Eval;
use crate::evm_impl::{EvmResult, Host};
use crate::interpreter::Interpreter;
use crate::{gas, Spec, U256};

pub(super) fn wrapping_add<H: Host>(
    interpreter: &mut Interpreter,
    _host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    pop_top!(interpreter, op1, op2);
    *op2 = op1.wrapping_add(*op2);

    Ok(Eval::Continue)
}

pub(super) fn wrapping_mul<H: Host>(
    interpreter: &mut Interpreter,
    _host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    pop_top!(interpreter, op1, op2);
    *op2 = op1.wrapping_mul(*op2);

    Ok(Eval::Continue)
}

pub(super) fn wrapping_sub<H: Host>(
    interpreter: &mut Interpreter,
    _host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    pop_top!(interpreter, op1, op2);
    *op2 = op1.wrapping_sub(*op2);

    Ok(Eval::Continue)
}

pub(super) fn div<H: Host>(
    interpreter: &mut Interpreter,
    _host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    pop_top!(interpreter, op1, op2);
    *op2 = if op2.is_zero() {
        U256::ZERO
    } else {
        op1 / *op2
    };

    Ok(Eval::Continue)
}

pub(super) fn sdiv<H: Host>(
    interpreter: &mut Interpreter,
    _host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    pop_top!(interpreter, op1, op2);
    *op2 = i256_div(op1, *op2);

    Ok(Eval::Continue)
}

pub(super) fn rem<H: Host>(
    interpreter: &mut Interpreter,
    _host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    pop_top!(interpreter, op1, op2);
    *op2 = if op2.is_zero() {
        U256::ZERO
    } else {
        op1 % *op2
    };

    Ok(Eval::Continue)
}

pub(super) fn smod<H: Host>(
    interpreter: &mut Interpreter,
    _host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    pop_top!(interpreter, op1, op2);
    *op2 = i256_mod(op1, *op2);

    Ok(Eval::Continue)
}

pub(super) fn addmod<H: Host>(
    interpreter: &mut Interpreter,
    _host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    pop_top!(interpreter, op1, op2, op3);
    *op3 = op1.add_mod(op2, *op3);

    Ok(Eval::Continue)
}

pub(super) fn mulmod<H: Host>(
    interpreter: &mut Interpreter,
    _host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    pop_top!(interpreter, op1, op2, op3);
    *op3 = op1.mul_mod(op2, *op3);

    Ok(Eval::Continue)
}

pub(super) fn exp<H: Host, SPEC: Spec>(
    interpreter: &mut Interpreter,
    _host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    pop_top!(interpreter, op1, op2);
    gas_or_fail!(interpreter, gas::exp_cost::<SPEC>(*op2));
    *op2 = op1.pow(*op2);

    Ok(Eval::Continue)
}

/// Sign-extends the value at byte position `op1` (0 = least significant).
pub(super) fn signextend<H: Host>(
    interpreter: &mut Interpreter,
    _host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    pop_top!(interpreter, op1, op2);
    if op1 < U256::from(32) {
        let bit_index = 8 * usize::try_from(op1).expect("op1 < 32") + 7;
        let mask = (U256::from(1) << (bit_index + 1)).wrapping_sub(U256::from(1));
        *op2 = if op2.bit(bit_index) {
            *op2 | !mask
        } else {
            *op2 & mask
        };
    }

    Ok(Eval::Continue)
}
