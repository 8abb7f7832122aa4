use crate::{right_pad, u64_to_address, Error, PrecompileResult, PrecompileWithAddress};
use alloy_primitives::U256;
use bn::{AffineG1, AffineG2, Fq, Fq2, Group, Gt, G1, G2};

pub(crate) mod add {
    use super::*;

    pub(crate) const BYZANTIUM: PrecompileWithAddress =
        PrecompileWithAddress(u64_to_address(6), |input, gas| {
            run_add(input, 500, gas)
        });

    pub(crate) const ISTANBUL: PrecompileWithAddress =
        PrecompileWithAddress(u64_to_address(6), |input, gas| {
            run_add(input, 150, gas)
        });
}

pub(crate) mod mul {
    use super::*;

    pub(crate) const BYZANTIUM: PrecompileWithAddress =
        PrecompileWithAddress(u64_to_address(7), |input, gas| {
            run_mul(input, 40_000, gas)
        });

    pub(crate) const ISTANBUL: PrecompileWithAddress =
        PrecompileWithAddress(u64_to_address(7), |input, gas| {
            run_mul(input, 6_000, gas)
        });
}

pub(crate) mod pair {
    use super::*;

    pub(crate) const BYZANTIUM: PrecompileWithAddress =
        PrecompileWithAddress(u64_to_address(8), |input, gas| {
            run_pair(input, 80_000, 100_000, gas)
        });

    pub(crate) const ISTANBUL: PrecompileWithAddress =
        PrecompileWithAddress(u64_to_address(8), |input, gas| {
            run_pair(input, 34_000, 45_000, gas)
        });
}

const ADD_INPUT_LEN: usize = 128;
const MUL_INPUT_LEN: usize = 96;
const PAIR_ELEMENT_LEN: usize = 192;

/// Reads a field element from two 32-byte coordinates at `start`.
fn read_point(input: &[u8], start: usize) -> Result<G1, Error> {
    let px = read_fq(input, start)?;
    let py = read_fq(input, start + 32)?;
    new_g1_point(px, py)
}

fn read_fq(input: &[u8], start: usize) -> Result<Fq, Error> {
    Fq::from_slice(&input[start..start + 32]).map_err(|_| Error::Bn128FieldPointNotAMember)
}

fn new_g1_point(px: Fq, py: Fq) -> Result<G1, Error> {
    if px == Fq::zero() && py == Fq::zero() {
        Ok(G1::zero())
    } else {
        AffineG1::new(px, py)
            .map(Into::into)
            .map_err(|_| Error::Bn128AffineGFailedToCreate)
    }
}

fn point_to_output(point: G1) -> Vec<u8> {
    let mut output = vec![0; 64];
    if let Some(point) = AffineG1::from_jacobian(point) {
        point.x().to_big_endian(&mut output[..32]).unwrap();
        point.y().to_big_endian(&mut output[32..]).unwrap();
    }
    output
}

fn run_add(input: &[u8], gas_cost: u64, gas_limit: u64) -> PrecompileResult {
    if gas_cost > gas_limit {
        return Err(Error::OutOfGas);
    }

    let input = right_pad(input, ADD_INPUT_LEN);
    let p1 = read_point(&input, 0)?;
    let p2 = read_point(&input, 64)?;

    Ok((gas_cost, point_to_output(p1 + p2)))
}

fn run_mul(input: &[u8], gas_cost: u64, gas_limit: u64) -> PrecompileResult {
    if gas_cost > gas_limit {
        return Err(Error::OutOfGas);
    }

    let input = right_pad(input, MUL_INPUT_LEN);
    let point = read_point(&input, 0)?;
    let fr = bn::Fr::from_slice(&input[64..96]).map_err(|_| Error::Bn128FieldPointNotAMember)?;

    Ok((gas_cost, point_to_output(point * fr)))
}

fn run_pair(
    input: &[u8],
    pair_per_point_cost: u64,
    pair_base_cost: u64,
    gas_limit: u64,
) -> PrecompileResult {
    let gas_cost =
        pair_base_cost + pair_per_point_cost * (input.len() / PAIR_ELEMENT_LEN) as u64;
    if gas_cost > gas_limit {
        return Err(Error::OutOfGas);
    }

    if input.len() % PAIR_ELEMENT_LEN != 0 {
        return Err(Error::Bn128PairLength);
    }

    let success = if input.is_empty() {
        true
    } else {
        let elements = input.len() / PAIR_ELEMENT_LEN;
        let mut pairs = Vec::with_capacity(elements);
        for i in 0..elements {
            let start = i * PAIR_ELEMENT_LEN;
            let a = read_point(input, start)?;

            // G2 coordinates come in (imaginary, real) order on the wire.
            let b_ay = read_fq(input, start + 64)?;
            let b_ax = read_fq(input, start + 96)?;
            let b_by = read_fq(input, start + 128)?;
            let b_bx = read_fq(input, start + 160)?;
            let ba = Fq2::new(b_ax, b_ay);
            let bb = Fq2::new(b_bx, b_by);
            let b = if ba.is_zero() && bb.is_zero() {
                G2::zero()
            } else {
                G2::from(
                    AffineG2::new(ba, bb).map_err(|_| Error::Bn128AffineGFailedToCreate)?,
                )
            };
            pairs.push((a, b));
        }
        bn::pairing_batch(&pairs) == Gt::one()
    };

    let mut output = vec![0; 32];
    if success {
        output[..].copy_from_slice(&U256::from(1).to_be_bytes::<32>());
    }
    Ok((gas_cost, output))
}
