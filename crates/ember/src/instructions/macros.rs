//! Shared shorthand for the opcode handlers: gas charging, stack traffic and
//! memory growth, each failing out of the handler with the right halt.

macro_rules! gas {
    ($interp:expr, $gas:expr) => {
        if !$interp.gas.record_cost($gas as u64) {
            return Err($crate::evm_impl::EvmError::from(
                $crate::evm_impl::ExceptionalHalt::OutOfGas,
            ));
        }
    };
}

macro_rules! gas_or_fail {
    ($interp:expr, $gas:expr) => {
        match $gas {
            Some(gas_used) => gas!($interp, gas_used),
            None => {
                return Err($crate::evm_impl::EvmError::from(
                    $crate::evm_impl::ExceptionalHalt::OutOfGas,
                ))
            }
        }
    };
}

macro_rules! refund {
    ($interp:expr, $refund:expr) => {
        $interp.gas.record_refund($refund)
    };
}

macro_rules! push {
    ($interp:expr, $value:expr) => {
        $interp
            .stack
            .push($value)
            .map_err($crate::evm_impl::EvmError::from)?
    };
}

macro_rules! push_b256 {
    ($interp:expr, $value:expr) => {
        $interp
            .stack
            .push_b256($value)
            .map_err($crate::evm_impl::EvmError::from)?
    };
}

macro_rules! pop {
    ($interp:expr, $x1:ident) => {
        let $x1 = $interp.stack.pop().map_err($crate::evm_impl::EvmError::from)?;
    };
    ($interp:expr, $x1:ident, $x2:ident) => {
        pop!($interp, $x1);
        pop!($interp, $x2);
    };
    ($interp:expr, $x1:ident, $x2:ident, $x3:ident) => {
        pop!($interp, $x1);
        pop!($interp, $x2);
        pop!($interp, $x3);
    };
    ($interp:expr, $x1:ident, $x2:ident, $x3:ident, $x4:ident) => {
        pop!($interp, $x1);
        pop!($interp, $x2);
        pop!($interp, $x3);
        pop!($interp, $x4);
    };
}

/// Pops operands but leaves the last one on the stack as a mutable slot for
/// the result.
macro_rules! pop_top {
    ($interp:expr, $x1:ident) => {
        let $x1 = $interp.stack.top().map_err($crate::evm_impl::EvmError::from)?;
    };
    ($interp:expr, $x1:ident, $x2:ident) => {
        pop!($interp, $x1);
        pop_top!($interp, $x2);
    };
    ($interp:expr, $x1:ident, $x2:ident, $x3:ident) => {
        pop!($interp, $x1);
        pop!($interp, $x2);
        pop_top!($interp, $x3);
    };
}

macro_rules! pop_address {
    ($interp:expr, $x1:ident) => {
        let $x1 = $crate::Address::from_word($crate::B256::from(
            $interp.stack.pop().map_err($crate::evm_impl::EvmError::from)?,
        ));
    };
}

/// Checks a static-context restriction.
macro_rules! check_staticcall {
    ($interp:expr) => {
        if $interp.is_static {
            return Err($crate::evm_impl::EvmError::from(
                $crate::evm_impl::ExceptionalHalt::WriteInStaticContext,
            ));
        }
    };
}

/// Charges memory expansion and grows the frame memory to cover
/// `[offset, offset + len)`.
macro_rules! memory_resize {
    ($interp:expr, $offset:expr, $len:expr) => {{
        let size = $offset.saturating_add($len);
        if size > $interp.memory.effective_len() {
            let rounded = match $crate::interpreter::next_multiple_of_32(size) {
                Some(rounded) => rounded,
                None => {
                    return Err($crate::evm_impl::EvmError::from(
                        $crate::evm_impl::ExceptionalHalt::OutOfGas,
                    ))
                }
            };
            let old_words = ($interp.memory.effective_len() / 32) as u64;
            let new_words = (rounded / 32) as u64;
            gas!(
                $interp,
                $crate::gas::memory_gas(new_words) - $crate::gas::memory_gas(old_words)
            );
            $interp.memory.resize(rounded);
        }
    }};
}

/// Converts a word to `usize`, treating anything oversized as the given halt.
macro_rules! as_usize_or_fail {
    ($word:expr, $halt:expr) => {{
        match usize::try_from($word) {
            Ok(value) => value,
            Err(_) => return Err($crate::evm_impl::EvmError::from($halt)),
        }
    }};
}

macro_rules! as_usize_saturated {
    ($word:expr) => {
        usize::try_from($word).unwrap_or(usize::MAX)
    };
}
