use crate::{right_pad, u64_to_address, Error, PrecompileResult, PrecompileWithAddress};
use alloy_primitives::U256;
use aurora_engine_modexp::modexp;
use core::cmp::{max, min};

pub(crate) const BYZANTIUM: PrecompileWithAddress =
    PrecompileWithAddress(u64_to_address(5), byzantium_run);

pub(crate) const BERLIN: PrecompileWithAddress =
    PrecompileWithAddress(u64_to_address(5), berlin_run);

/// EIP-198 pricing.
fn byzantium_run(input: &[u8], gas_limit: u64) -> PrecompileResult {
    run_inner(input, gas_limit, 0, |base_len, exp_len, mod_len, exp_highp| {
        byzantium_gas_calc(base_len, exp_len, mod_len, exp_highp)
    })
}

/// EIP-2565 pricing.
fn berlin_run(input: &[u8], gas_limit: u64) -> PrecompileResult {
    run_inner(input, gas_limit, 200, |base_len, exp_len, mod_len, exp_highp| {
        berlin_gas_calc(base_len, exp_len, mod_len, exp_highp)
    })
}

/// Number of squaring rounds implied by the exponent, per EIP-198/2565.
fn calculate_iteration_count(exp_length: u64, exp_highp: &U256) -> u64 {
    let mut iteration_count: u64 = 0;

    if exp_length <= 32 && exp_highp.is_zero() {
        iteration_count = 0;
    } else if exp_length <= 32 {
        iteration_count = exp_highp.bit_len() as u64 - 1;
    } else if exp_length > 32 {
        iteration_count = (8 * (exp_length - 32)) + max(1, exp_highp.bit_len() as u64) - 1;
    }

    max(iteration_count, 1)
}

fn byzantium_gas_calc(base_len: u64, exp_len: u64, mod_len: u64, exp_highp: &U256) -> u64 {
    // ordinary multiplication complexity table from EIP-198
    fn mult_complexity(x: u128) -> u128 {
        if x <= 64 {
            x * x
        } else if x <= 1024 {
            (x * x) / 4 + 96 * x - 3072
        } else {
            (x * x) / 16 + 480 * x - 199_680
        }
    }

    let mul = mult_complexity(max(base_len, mod_len) as u128);
    let iter_count = calculate_iteration_count(exp_len, exp_highp) as u128;
    let gas = mul.saturating_mul(iter_count) / 20;
    u64::try_from(gas).unwrap_or(u64::MAX)
}

fn berlin_gas_calc(base_len: u64, exp_len: u64, mod_len: u64, exp_highp: &U256) -> u64 {
    let words = (max(base_len, mod_len) as u128).div_ceil(8);
    let multiplication_complexity = words * words;
    let iteration_count = calculate_iteration_count(exp_len, exp_highp) as u128;
    let gas = multiplication_complexity.saturating_mul(iteration_count) / 3;
    max(200, u64::try_from(gas).unwrap_or(u64::MAX))
}

fn run_inner(
    input: &[u8],
    gas_limit: u64,
    min_gas: u64,
    calc_gas: impl FnOnce(u64, u64, u64, &U256) -> u64,
) -> PrecompileResult {
    const HEADER_LENGTH: usize = 96;

    let header = right_pad(input, HEADER_LENGTH);
    let read_len = |from: usize| -> Result<usize, Error> {
        let word = U256::from_be_slice(&header[from..from + 32]);
        usize::try_from(word).map_err(|_| Error::ModexpLengthOverflow)
    };
    let base_len = read_len(0)?;
    let exp_len = read_len(32)?;
    let mod_len = read_len(64)?;

    // A zero-width base and modulus costs only the floor price.
    if base_len == 0 && mod_len == 0 {
        return Ok((min_gas, Vec::new()));
    }

    let body = if input.len() > HEADER_LENGTH {
        &input[HEADER_LENGTH..]
    } else {
        &[]
    };

    // The leading exponent word drives the iteration count.
    let exp_highp = {
        let start = min(base_len, body.len());
        let available = body.len().saturating_sub(start);
        let slice = &body[start..start + min(available, min(exp_len, 32))];
        U256::from_be_slice(&right_pad(slice, min(exp_len, 32)))
    };

    let gas_cost = calc_gas(base_len as u64, exp_len as u64, mod_len as u64, &exp_highp);
    if gas_cost > gas_limit {
        return Err(Error::OutOfGas);
    }

    let read_part = |from: usize, len: usize| -> Vec<u8> {
        let start = min(from, body.len());
        let end = min(from + len, body.len());
        right_pad(&body[start..end], len)
    };
    let base = read_part(0, base_len);
    let exponent = read_part(base_len, exp_len);
    let modulus = read_part(base_len + exp_len, mod_len);

    // Output is the result left-padded to the modulus width.
    let result = modexp(&base, &exponent, &modulus);
    let mut output = vec![0; mod_len];
    let copy_from = mod_len - min(mod_len, result.len());
    output[copy_from..].copy_from_slice(&result[result.len() - (mod_len - copy_from)..]);

    Ok((gas_cost, output))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pack(base: &[u8], exp: &[u8], modulus: &[u8]) -> Vec<u8> {
        let mut input = Vec::new();
        for len in [base.len(), exp.len(), modulus.len()] {
            input.extend_from_slice(&U256::from(len).to_be_bytes::<32>());
        }
        input.extend_from_slice(base);
        input.extend_from_slice(exp);
        input.extend_from_slice(modulus);
        input
    }

    #[test]
    fn three_squared_mod_five() {
        let input = pack(&[3], &[2], &[5]);
        let (_, out) = berlin_run(&input, 100_000).unwrap();
        assert_eq!(out, vec![4]);
    }

    #[test]
    fn zero_exponent_is_one() {
        let input = pack(&[7], &[0], &[13]);
        let (_, out) = berlin_run(&input, 100_000).unwrap();
        assert_eq!(out, vec![1]);
    }

    #[test]
    fn output_padded_to_modulus_width() {
        let input = pack(&[2], &[10], &[0, 0, 0, 251]);
        let (_, out) = berlin_run(&input, 100_000).unwrap();
        // 2^10 mod 251 = 20
        assert_eq!(out, vec![0, 0, 0, 20]);
    }

    #[test]
    fn berlin_floor_price() {
        let input = pack(&[3], &[2], &[5]);
        let (gas, _) = berlin_run(&input, 100_000).unwrap();
        assert_eq!(gas, 200);
    }

    #[test]
    fn empty_input_costs_floor() {
        let (gas, out) = berlin_run(&[], 100_000).unwrap();
        assert_eq!(gas, 200);
        assert!(out.is_empty());
    }
}
