//! Ember precompiles - the precompiled contracts reachable through `CALL`-family
//! opcodes at the reserved low addresses.
//!
//! Registries are grouped per hard fork and built lazily; a fork inherits the
//! registry of its predecessor and extends or reprices it.

mod blake2;
mod bn128;
mod hash;
mod identity;
mod modexp;
mod secp256k1;

use alloy_primitives::Address;
use once_cell::sync::OnceCell;
use std::collections::HashMap;

/// A precompile operation result.
///
/// On success returns the gas cost actually charged and the output bytes.
pub type PrecompileResult = Result<(u64, Vec<u8>), Error>;

/// A builtin contract: the pricing-and-execution function.
pub type StandardPrecompileFn = fn(&[u8], u64) -> PrecompileResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The input cost more than the gas forwarded to the precompile.
    OutOfGas,
    /// blake2 compression input is not exactly 213 bytes.
    Blake2WrongLength,
    /// blake2 final-block indicator is neither 0 nor 1.
    Blake2WrongFinalIndicatorFlag,
    /// modexp length headers exceed the addressable range.
    ModexpLengthOverflow,
    /// bn128 input did not encode a point in the field.
    Bn128FieldPointNotAMember,
    /// bn128 coordinates did not lie on the curve.
    Bn128AffineGFailedToCreate,
    /// bn128 pairing input is not a multiple of the pair length.
    Bn128PairLength,
}

/// A precompiled contract together with its reserved address.
#[derive(Clone, Copy)]
pub struct PrecompileWithAddress(pub Address, pub StandardPrecompileFn);

impl PrecompileWithAddress {
    pub const fn address(&self) -> &Address {
        &self.0
    }
}

/// Hard-fork granularity at which the precompile set changes.
///
/// This is coarser than the execution engine's fork enum: only the forks that
/// added or repriced builtins are distinguished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrecompileSpecId {
    HOMESTEAD,
    BYZANTIUM,
    ISTANBUL,
    BERLIN,
}

/// The registry of precompiled contracts active for one fork.
#[derive(Clone, Default)]
pub struct Precompiles {
    inner: HashMap<Address, StandardPrecompileFn>,
}

impl Precompiles {
    /// Returns the precompile set for the given fork, building it on first use.
    pub fn new(spec: PrecompileSpecId) -> &'static Self {
        match spec {
            PrecompileSpecId::HOMESTEAD => Self::homestead(),
            PrecompileSpecId::BYZANTIUM => Self::byzantium(),
            PrecompileSpecId::ISTANBUL => Self::istanbul(),
            PrecompileSpecId::BERLIN => Self::berlin(),
        }
    }

    /// Frontier/Homestead set: ecrecover, sha256, ripemd160, identity.
    pub fn homestead() -> &'static Self {
        static INSTANCE: OnceCell<Precompiles> = OnceCell::new();
        INSTANCE.get_or_init(|| {
            let mut precompiles = Precompiles::default();
            precompiles.extend([
                secp256k1::ECRECOVER,
                hash::SHA256,
                hash::RIPEMD160,
                identity::FUN,
            ]);
            precompiles
        })
    }

    /// Byzantium adds modexp and the bn128 curve operations.
    pub fn byzantium() -> &'static Self {
        static INSTANCE: OnceCell<Precompiles> = OnceCell::new();
        INSTANCE.get_or_init(|| {
            let mut precompiles = Self::homestead().clone();
            precompiles.extend([
                modexp::BYZANTIUM,
                bn128::add::BYZANTIUM,
                bn128::mul::BYZANTIUM,
                bn128::pair::BYZANTIUM,
            ]);
            precompiles
        })
    }

    /// Istanbul reprices the bn128 operations (EIP-1108) and adds blake2f
    /// (EIP-152).
    pub fn istanbul() -> &'static Self {
        static INSTANCE: OnceCell<Precompiles> = OnceCell::new();
        INSTANCE.get_or_init(|| {
            let mut precompiles = Self::byzantium().clone();
            precompiles.extend([
                bn128::add::ISTANBUL,
                bn128::mul::ISTANBUL,
                bn128::pair::ISTANBUL,
                blake2::FUN,
            ]);
            precompiles
        })
    }

    /// Berlin reprices modexp (EIP-2565).
    pub fn berlin() -> &'static Self {
        static INSTANCE: OnceCell<Precompiles> = OnceCell::new();
        INSTANCE.get_or_init(|| {
            let mut precompiles = Self::istanbul().clone();
            precompiles.extend([modexp::BERLIN]);
            precompiles
        })
    }

    pub fn addresses(&self) -> impl Iterator<Item = &Address> {
        self.inner.keys()
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.inner.contains_key(address)
    }

    pub fn get(&self, address: &Address) -> Option<&StandardPrecompileFn> {
        self.inner.get(address)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn extend(&mut self, other: impl IntoIterator<Item = PrecompileWithAddress>) {
        self.inner
            .extend(other.into_iter().map(|p| (p.0, p.1)));
    }
}

/// Builds the reserved address for precompile number `x`: 19 zero bytes
/// followed by `x`.
pub(crate) const fn u64_to_address(x: u64) -> Address {
    let x = x.to_be_bytes();
    Address::new([
        0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, x[0], x[1], x[2], x[3], x[4], x[5], x[6], x[7],
    ])
}

/// Charges `base + per_word * ceil(len / 32)`, the linear cost formula shared
/// by the hashing and identity builtins.
pub(crate) fn linear_cost(len: usize, base: u64, word: u64) -> u64 {
    (len as u64).div_ceil(32) * word + base
}

/// Zero-pads or truncates `input` to exactly `len` bytes.
pub(crate) fn right_pad(input: &[u8], len: usize) -> Vec<u8> {
    let mut padded = vec![0; len];
    let copy = core::cmp::min(input.len(), len);
    padded[..copy].copy_from_slice(&input[..copy]);
    padded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fork_sets_grow_monotonically() {
        assert_eq!(Precompiles::homestead().len(), 4);
        assert_eq!(Precompiles::byzantium().len(), 8);
        assert_eq!(Precompiles::istanbul().len(), 9);
        assert_eq!(Precompiles::berlin().len(), 9);
    }

    #[test]
    fn addresses_are_low_reserved_range() {
        for i in 1..=9u64 {
            assert!(Precompiles::istanbul().contains(&u64_to_address(i)));
        }
        assert!(!Precompiles::istanbul().contains(&u64_to_address(10)));
        assert!(!Precompiles::homestead().contains(&u64_to_address(5)));
    }
}
