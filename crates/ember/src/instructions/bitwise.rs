use super::i256::{i256_cmp, i256_sign, two_compl, Sign};
use super::Eval;
use crate::evm_impl::{EvmResult, Host};
use crate::interpreter::Interpreter;
use crate::U256;
use core::cmp::Ordering;
use core::ops::{BitAnd, BitOr, BitXor};

pub(super) fn lt<H: Host>(
    interpreter: &mut Interpreter,
    _host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    pop_top!(interpreter, op1, op2);
    *op2 = U256::from(op1 < *op2);

    Ok(Eval::Continue)
}

pub(super) fn gt<H: Host>(
    interpreter: &mut Interpreter,
    _host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    pop_top!(interpreter, op1, op2);
    *op2 = U256::from(op1 > *op2);

    Ok(Eval::Continue)
}

pub(super) fn slt<H: Host>(
    interpreter: &mut Interpreter,
    _host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    pop_top!(interpreter, op1, op2);
    *op2 = U256::from(i256_cmp(op1, *op2) == Ordering::Less);

    Ok(Eval::Continue)
}

pub(super) fn sgt<H: Host>(
    interpreter: &mut Interpreter,
    _host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    pop_top!(interpreter, op1, op2);
    *op2 = U256::from(i256_cmp(op1, *op2) == Ordering::Greater);

    Ok(Eval::Continue)
}

pub(super) fn eq<H: Host>(
    interpreter: &mut Interpreter,
    _host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    pop_top!(interpreter, op1, op2);
    *op2 = U256::from(op1 == *op2);

    Ok(Eval::Continue)
}

pub(super) fn iszero<H: Host>(
    interpreter: &mut Interpreter,
    _host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    pop_top!(interpreter, op1);
    *op1 = U256::from(op1.is_zero());

    Ok(Eval::Continue)
}

pub(super) fn bitand<H: Host>(
    interpreter: &mut Interpreter,
    _host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    pop_top!(interpreter, op1, op2);
    *op2 = op1.bitand(*op2);

    Ok(Eval::Continue)
}

pub(super) fn bitor<H: Host>(
    interpreter: &mut Interpreter,
    _host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    pop_top!(interpreter, op1, op2);
    *op2 = op1.bitor(*op2);

    Ok(Eval::Continue)
}

pub(super) fn bitxor<H: Host>(
    interpreter: &mut Interpreter,
    _host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    pop_top!(interpreter, op1, op2);
    *op2 = op1.bitxor(*op2);

    Ok(Eval::Continue)
}

pub(super) fn not<H: Host>(
    interpreter: &mut Interpreter,
    _host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    pop_top!(interpreter, op1);
    *op1 = !*op1;

    Ok(Eval::Continue)
}

/// Big-endian byte extraction: index 0 is the most significant byte.
pub(super) fn byte<H: Host>(
    interpreter: &mut Interpreter,
    _host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    pop_top!(interpreter, op1, op2);
    *op2 = if op1 < U256::from(32) {
        let index = usize::try_from(op1).expect("op1 < 32");
        U256::from(op2.byte(31 - index))
    } else {
        U256::ZERO
    };

    Ok(Eval::Continue)
}

pub(super) fn shl<H: Host>(
    interpreter: &mut Interpreter,
    _host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    pop_top!(interpreter, op1, op2);
    *op2 <<= as_usize_saturated!(op1);

    Ok(Eval::Continue)
}

pub(super) fn shr<H: Host>(
    interpreter: &mut Interpreter,
    _host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    pop_top!(interpreter, op1, op2);
    *op2 >>= as_usize_saturated!(op1);

    Ok(Eval::Continue)
}

/// Arithmetic shift right: fills with the sign bit.
pub(super) fn sar<H: Host>(
    interpreter: &mut Interpreter,
    _host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    pop_top!(interpreter, op1, op2);

    let value_sign = i256_sign(op2);

    *op2 = if op2.is_zero() || op1 >= U256::from(256) {
        match value_sign {
            Sign::Plus | Sign::Zero => U256::ZERO,
            Sign::Minus => U256::MAX,
        }
    } else {
        let shift = usize::try_from(op1).expect("op1 < 256");
        match value_sign {
            Sign::Plus | Sign::Zero => *op2 >> shift,
            Sign::Minus => {
                // Rounds toward negative infinity: -((abs - 1) >> s) - 1.
                let abs = two_compl(*op2);
                let shifted = ((abs.wrapping_sub(U256::from(1))) >> shift)
                    .wrapping_add(U256::from(1));
                two_compl(shifted)
            }
        }
    };

    Ok(Eval::Continue)
}
