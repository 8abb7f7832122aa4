use crate::{linear_cost, u64_to_address, Error, PrecompileResult, PrecompileWithAddress};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

pub(crate) const SHA256: PrecompileWithAddress =
    PrecompileWithAddress(u64_to_address(2), sha256_run);

pub(crate) const RIPEMD160: PrecompileWithAddress =
    PrecompileWithAddress(u64_to_address(3), ripemd160_run);

fn sha256_run(input: &[u8], gas_limit: u64) -> PrecompileResult {
    let cost = linear_cost(input.len(), 60, 12);
    if cost > gas_limit {
        return Err(Error::OutOfGas);
    }
    let output = Sha256::digest(input);
    Ok((cost, output.to_vec()))
}

fn ripemd160_run(input: &[u8], gas_limit: u64) -> PrecompileResult {
    let cost = linear_cost(input.len(), 600, 120);
    if cost > gas_limit {
        return Err(Error::OutOfGas);
    }
    let mut hasher = Ripemd160::new();
    hasher.update(input);

    // The 20-byte digest is left-padded to a 32-byte word.
    let mut output = vec![0; 32];
    hasher.finalize_into((&mut output[12..]).into());
    Ok((cost, output))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_empty_input() {
        let (gas, out) = sha256_run(&[], 100).unwrap();
        assert_eq!(gas, 60);
        assert_eq!(
            hex::encode(out),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn ripemd160_empty_input() {
        let (gas, out) = ripemd160_run(&[], 1_000).unwrap();
        assert_eq!(gas, 600);
        assert_eq!(
            hex::encode(&out[12..]),
            "9c1185a5c5e9fc54612808977ee8f548b2258d31"
        );
        assert!(out[..12].iter().all(|b| *b == 0));
    }

    #[test]
    fn word_rounding() {
        // 33 bytes is two words.
        assert_eq!(linear_cost(33, 60, 12), 84);
    }
}
