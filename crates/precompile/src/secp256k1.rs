use crate::{u64_to_address, right_pad, Error, PrecompileResult, PrecompileWithAddress};
use alloy_primitives::{keccak256, B256};
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};

pub(crate) const ECRECOVER: PrecompileWithAddress =
    PrecompileWithAddress(u64_to_address(1), ec_recover_run);

const ECRECOVER_BASE: u64 = 3_000;

fn ecrecover(sig: &[u8; 64], recid: u8, msg: &B256) -> Result<B256, k256::ecdsa::Error> {
    let signature = Signature::from_slice(sig)?;
    let recid = RecoveryId::from_byte(recid).expect("recovery id is checked to be 0 or 1");

    let recovered_key = VerifyingKey::recover_from_prehash(&msg[..], &signature, recid)?;
    let public_key = recovered_key.to_encoded_point(false);

    // The address is the low 20 bytes of the hashed uncompressed point.
    let mut hash = keccak256(&public_key.as_bytes()[1..]);
    hash[..12].fill(0);
    Ok(hash)
}

fn ec_recover_run(input: &[u8], gas_limit: u64) -> PrecompileResult {
    if ECRECOVER_BASE > gas_limit {
        return Err(Error::OutOfGas);
    }

    let input = right_pad(input, 128);

    // v must be 27 or 28 with 31 leading zero bytes; anything else recovers
    // nothing rather than failing the call.
    if !(input[32..63].iter().all(|b| *b == 0) && matches!(input[63], 27 | 28)) {
        return Ok((ECRECOVER_BASE, Vec::new()));
    }

    let msg = B256::from_slice(&input[0..32]);
    let recid = input[63] - 27;
    let sig: [u8; 64] = input[64..128].try_into().expect("padded to 128 bytes");

    let out = ecrecover(&sig, recid, &msg)
        .map(|address| address.to_vec())
        .unwrap_or_default();

    Ok((ECRECOVER_BASE, out))
}
