use super::constants::*;
use crate::models::SelfDestructResult;
use crate::{Spec, SpecId::*, U256};

/// Refund credited (or clawed back) by an SSTORE transition.
pub fn sstore_refund<SPEC: Spec>(original: U256, current: U256, new: U256) -> i64 {
    if SPEC::enabled(ISTANBUL) {
        // EIP-2200 (and EIP-3529's reduced clear refund from London)
        let sstore_clears_schedule = if SPEC::enabled(LONDON) {
            SSTORE_CLEARS_REFUND_LONDON
        } else {
            SSTORE_CLEARS_REFUND
        };
        if current == new {
            return 0;
        }
        if original == current && new.is_zero() {
            return sstore_clears_schedule;
        }

        let mut refund = 0i64;
        if !original.is_zero() {
            if current.is_zero() {
                refund -= sstore_clears_schedule;
            } else if new.is_zero() {
                refund += sstore_clears_schedule;
            }
        }
        if original == new {
            let (reset_cost, sload_cost) = if SPEC::enabled(BERLIN) {
                (SSTORE_RESET - COLD_SLOAD_COST, WARM_STORAGE_READ_COST)
            } else {
                (SSTORE_RESET, sload_base_cost::<SPEC>())
            };
            if original.is_zero() {
                refund += (SSTORE_SET - sload_cost) as i64;
            } else {
                refund += (reset_cost - sload_cost) as i64;
            }
        }
        refund
    } else if !current.is_zero() && new.is_zero() {
        SSTORE_CLEARS_REFUND
    } else {
        0
    }
}

/// Full SSTORE cost for the transition. `None` signals the EIP-2200 sentry.
pub fn sstore_cost<SPEC: Spec>(
    original: U256,
    current: U256,
    new: U256,
    gas_remaining: u64,
    is_cold: bool,
) -> Option<u64> {
    // EIP-1706: reverting when little gas is left prevents reentrancy tricks
    // around the refund.
    if SPEC::enabled(ISTANBUL) && gas_remaining <= CALL_STIPEND {
        return None;
    }

    let gas = if SPEC::enabled(BERLIN) {
        // EIP-2929
        let base = if new == current {
            WARM_STORAGE_READ_COST
        } else if original == current && original.is_zero() {
            SSTORE_SET
        } else if original == current {
            SSTORE_RESET - COLD_SLOAD_COST
        } else {
            WARM_STORAGE_READ_COST
        };
        if is_cold {
            base + COLD_SLOAD_COST
        } else {
            base
        }
    } else if SPEC::enabled(ISTANBUL) {
        // EIP-2200
        if new == current {
            sload_base_cost::<SPEC>()
        } else if original == current && original.is_zero() {
            SSTORE_SET
        } else if original == current {
            SSTORE_RESET
        } else {
            sload_base_cost::<SPEC>()
        }
    } else if current.is_zero() && !new.is_zero() {
        SSTORE_SET
    } else {
        SSTORE_RESET
    };
    Some(gas)
}

/// SLOAD cost before the warm/cold split; also the EIP-2200 "dirty" slot cost.
pub fn sload_base_cost<SPEC: Spec>() -> u64 {
    if SPEC::enabled(ISTANBUL) {
        // EIP-1884
        800
    } else if SPEC::enabled(TANGERINE) {
        // EIP-150
        200
    } else {
        50
    }
}

/// Cold surcharge applied by account-touching opcodes under EIP-2929, on top
/// of the warm base cost already charged from the opcode table.
pub const fn cold_account_surcharge() -> u64 {
    COLD_ACCOUNT_ACCESS_COST - WARM_STORAGE_READ_COST
}

pub const fn cold_sload_surcharge() -> u64 {
    COLD_SLOAD_COST - WARM_STORAGE_READ_COST
}

/// Dynamic part of the CALL-family cost: value transfer, account creation and
/// the EIP-2929 cold surcharge. The warm/base access cost sits in the opcode
/// table.
pub fn call_cost<SPEC: Spec>(
    transfers_value: bool,
    is_cold: bool,
    is_new: bool,
    is_call_or_staticcall: bool,
) -> u64 {
    let mut gas = 0;
    if SPEC::enabled(BERLIN) && is_cold {
        gas += cold_account_surcharge();
    }
    if transfers_value {
        gas += CALLVALUE;
    }
    // Creating an account costs extra; from Spurious Dragon only calls that
    // actually send value to a dead account pay it (EIP-161).
    if is_call_or_staticcall
        && is_new
        && (!SPEC::enabled(SPURIOUS_DRAGON) || transfers_value)
    {
        gas += NEWACCOUNT;
    }
    gas
}

pub fn selfdestruct_cost<SPEC: Spec>(res: &SelfDestructResult) -> u64 {
    // EIP-161: only charge for account creation when value is moved to a dead
    // account; pre Spurious Dragon every new target pays.
    let should_charge_topup = if SPEC::enabled(SPURIOUS_DRAGON) {
        res.had_value && !res.target_exists
    } else {
        !res.target_exists
    };

    let mut gas = if SPEC::enabled(TANGERINE) && should_charge_topup {
        NEWACCOUNT
    } else {
        0
    };
    if SPEC::enabled(BERLIN) && res.is_cold {
        gas += COLD_ACCOUNT_ACCESS_COST;
    }
    gas
}

/// Quadratic memory cost for a size in 32-byte words.
pub const fn memory_gas(words: u64) -> u64 {
    MEMORY * words + words * words / QUAD_COEFF_DIV
}

pub fn keccak256_cost(len: u64) -> Option<u64> {
    KECCAK256WORD
        .checked_mul(len.div_ceil(32))
        .and_then(|cost| cost.checked_add(KECCAK256))
}

/// Word-priced copy cost shared by CODECOPY, CALLDATACOPY, RETURNDATACOPY and
/// EXTCODECOPY; the base access cost is in the opcode table.
pub fn copy_cost(len: u64) -> Option<u64> {
    COPY.checked_mul(len.div_ceil(32))
}

pub fn log_cost(n: u8, len: u64) -> Option<u64> {
    LOGDATA
        .checked_mul(len)
        .and_then(|cost| cost.checked_add(LOGTOPIC * n as u64))
}

pub fn exp_cost<SPEC: Spec>(power: U256) -> Option<u64> {
    if power.is_zero() {
        return Some(0);
    }
    // EIP-160 repriced the per-byte exponent cost.
    let gas_byte: u64 = if SPEC::enabled(SPURIOUS_DRAGON) {
        50
    } else {
        10
    };
    let bytes = (power.bit_len() as u64).div_ceil(8);
    gas_byte.checked_mul(bytes)
}

/// CREATE2 hashes the init code on top of the CREATE base cost.
pub fn create2_cost(len: u64) -> Option<u64> {
    KECCAK256WORD.checked_mul(len.div_ceil(32))
}

/// Minimum gas a transaction must carry before any bytecode runs.
pub fn intrinsic_gas<SPEC: Spec>(
    data: &[u8],
    is_create: bool,
    access_list_addresses: u64,
    access_list_slots: u64,
) -> u64 {
    let zero_data_len = data.iter().filter(|v| **v == 0).count() as u64;
    let non_zero_data_len = data.len() as u64 - zero_data_len;

    let base = if is_create && SPEC::enabled(HOMESTEAD) {
        // EIP-2
        TRANSACTION_CREATE
    } else {
        TRANSACTION_BASE
    };

    // EIP-2028
    let non_zero_data_cost = if SPEC::enabled(ISTANBUL) {
        TRANSACTION_NON_ZERO_DATA_ISTANBUL
    } else {
        TRANSACTION_NON_ZERO_DATA
    };

    base + zero_data_len * TRANSACTION_ZERO_DATA
        + non_zero_data_len * non_zero_data_cost
        + access_list_addresses * ACCESS_LIST_ADDRESS
        + access_list_slots * ACCESS_LIST_STORAGE_KEY
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::specification::{BerlinSpec, FrontierSpec, IstanbulSpec, LondonSpec};
    use rstest::rstest;

    fn u(x: u64) -> U256 {
        U256::from(x)
    }

    #[test]
    fn memory_cost_is_quadratic() {
        assert_eq!(memory_gas(1), 3);
        assert_eq!(memory_gas(32), 32 * 3 + 2);
        // one word past the linear-dominated region
        assert_eq!(memory_gas(1024), 1024 * 3 + 1024 * 1024 / 512);
    }

    #[test]
    fn intrinsic_gas_simple_transfer() {
        assert_eq!(intrinsic_gas::<LondonSpec>(&[], false, 0, 0), 21_000);
    }

    #[test]
    fn intrinsic_gas_calldata_pricing() {
        let data = [0u8, 1, 0, 2];
        assert_eq!(
            intrinsic_gas::<FrontierSpec>(&data, false, 0, 0),
            21_000 + 2 * 4 + 2 * 68
        );
        assert_eq!(
            intrinsic_gas::<IstanbulSpec>(&data, false, 0, 0),
            21_000 + 2 * 4 + 2 * 16
        );
    }

    #[test]
    fn intrinsic_gas_create_and_access_list() {
        assert_eq!(intrinsic_gas::<LondonSpec>(&[], true, 0, 0), 53_000);
        // Frontier predates EIP-2.
        assert_eq!(intrinsic_gas::<FrontierSpec>(&[], true, 0, 0), 21_000);
        assert_eq!(
            intrinsic_gas::<BerlinSpec>(&[], false, 2, 3),
            21_000 + 2 * 2_400 + 3 * 1_900
        );
    }

    #[rstest]
    // zero -> nonzero on an untouched slot
    #[case(u(0), u(0), u(1), false, Some(20_000))]
    // warm dirty write
    #[case(u(0), u(1), u(2), false, Some(100))]
    // no-op write
    #[case(u(1), u(1), u(1), false, Some(100))]
    // nonzero -> nonzero on an untouched warm slot
    #[case(u(1), u(1), u(2), false, Some(2_900))]
    // cold surcharge stacks on top
    #[case(u(1), u(1), u(2), true, Some(5_000))]
    fn berlin_sstore_costs(
        #[case] original: U256,
        #[case] current: U256,
        #[case] new: U256,
        #[case] is_cold: bool,
        #[case] expected: Option<u64>,
    ) {
        assert_eq!(
            sstore_cost::<BerlinSpec>(original, current, new, 1_000_000, is_cold),
            expected
        );
    }

    #[test]
    fn sstore_sentry_blocks_low_gas() {
        assert_eq!(
            sstore_cost::<IstanbulSpec>(u(0), u(0), u(1), CALL_STIPEND, false),
            None
        );
        // Frontier has no sentry.
        assert_eq!(
            sstore_cost::<FrontierSpec>(u(0), u(0), u(1), 100, false),
            Some(20_000)
        );
    }

    #[test]
    fn clear_refund_quotients() {
        // clearing a slot refunds per fork schedule
        assert_eq!(sstore_refund::<FrontierSpec>(u(1), u(1), u(0)), 15_000);
        assert_eq!(sstore_refund::<LondonSpec>(u(1), u(1), u(0)), 4_800);
        // un-clearing claws the refund back
        assert_eq!(sstore_refund::<LondonSpec>(u(1), u(0), u(2)), -4_800);
    }

    #[test]
    fn exp_cost_per_byte() {
        assert_eq!(exp_cost::<FrontierSpec>(u(0)), Some(0));
        assert_eq!(exp_cost::<FrontierSpec>(u(255)), Some(10));
        assert_eq!(exp_cost::<LondonSpec>(u(256)), Some(100));
        assert_eq!(exp_cost::<LondonSpec>(U256::MAX), Some(50 * 32));
    }
}
