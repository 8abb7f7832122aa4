use crate::{linear_cost, u64_to_address, Error, PrecompileResult, PrecompileWithAddress};

pub(crate) const FUN: PrecompileWithAddress = PrecompileWithAddress(u64_to_address(4), identity_run);

/// The identity precompile copies its input to its output.
fn identity_run(input: &[u8], gas_limit: u64) -> PrecompileResult {
    let cost = linear_cost(input.len(), 15, 3);
    if cost > gas_limit {
        return Err(Error::OutOfGas);
    }
    Ok((cost, input.to_vec()))
}
