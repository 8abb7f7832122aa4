//! Hard-fork identifiers and the per-fork rule selection.
//!
//! Each fork refines its predecessor: gas schedules, opcode availability,
//! validation and fee-market rules all query `SPEC::enabled(...)` so that a
//! fork is expressed as the set of upgrades active at that point, not as a
//! type hierarchy.

use ember_precompile::PrecompileSpecId;

/// Hard forks in activation order. The discriminant ordering is what makes
/// `enabled` a simple comparison.
#[repr(u8)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(non_camel_case_types)]
pub enum SpecId {
    #[default]
    FRONTIER = 0,
    HOMESTEAD = 1,
    TANGERINE = 2,
    SPURIOUS_DRAGON = 3,
    BYZANTIUM = 4,
    CONSTANTINOPLE = 5,
    PETERSBURG = 6,
    ISTANBUL = 7,
    BERLIN = 8,
    LONDON = 9,
    MERGE = 10,
    SHANGHAI = 11,
    LATEST = u8::MAX,
}

impl SpecId {
    /// Whether `other` is active under this spec.
    #[inline]
    pub const fn enabled(self, other: SpecId) -> bool {
        self as u8 >= other as u8
    }

    /// Maps to the coarser fork granularity of the precompile registries.
    pub const fn precompile_spec(self) -> PrecompileSpecId {
        match self {
            SpecId::FRONTIER | SpecId::HOMESTEAD | SpecId::TANGERINE | SpecId::SPURIOUS_DRAGON => {
                PrecompileSpecId::HOMESTEAD
            }
            SpecId::BYZANTIUM | SpecId::CONSTANTINOPLE | SpecId::PETERSBURG => {
                PrecompileSpecId::BYZANTIUM
            }
            SpecId::ISTANBUL => PrecompileSpecId::ISTANBUL,
            SpecId::BERLIN | SpecId::LONDON | SpecId::MERGE | SpecId::SHANGHAI | SpecId::LATEST => {
                PrecompileSpecId::BERLIN
            }
        }
    }
}

/// Compile-time fork selection used to monomorphize the hot paths.
pub trait Spec: Sized + 'static {
    const SPEC_ID: SpecId;

    #[inline]
    fn enabled(spec_id: SpecId) -> bool {
        Self::SPEC_ID.enabled(spec_id)
    }
}

macro_rules! spec {
    ($spec_id:ident, $spec_name:ident) => {
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $spec_name;

        impl Spec for $spec_name {
            const SPEC_ID: SpecId = SpecId::$spec_id;
        }
    };
}

spec!(FRONTIER, FrontierSpec);
spec!(HOMESTEAD, HomesteadSpec);
spec!(TANGERINE, TangerineSpec);
spec!(SPURIOUS_DRAGON, SpuriousDragonSpec);
spec!(BYZANTIUM, ByzantiumSpec);
spec!(CONSTANTINOPLE, ConstantinopleSpec);
spec!(PETERSBURG, PetersburgSpec);
spec!(ISTANBUL, IstanbulSpec);
spec!(BERLIN, BerlinSpec);
spec!(LONDON, LondonSpec);
spec!(MERGE, MergeSpec);
spec!(SHANGHAI, ShanghaiSpec);
spec!(LATEST, LatestSpec);

/// Expands an expression once per fork with `SPEC` bound to the matching
/// zero-sized spec type.
#[macro_export]
macro_rules! spec_to_generic {
    ($spec_id:expr, $e:expr) => {{
        match $spec_id {
            $crate::SpecId::FRONTIER => {
                use $crate::specification::FrontierSpec as SPEC;
                $e
            }
            $crate::SpecId::HOMESTEAD => {
                use $crate::specification::HomesteadSpec as SPEC;
                $e
            }
            $crate::SpecId::TANGERINE => {
                use $crate::specification::TangerineSpec as SPEC;
                $e
            }
            $crate::SpecId::SPURIOUS_DRAGON => {
                use $crate::specification::SpuriousDragonSpec as SPEC;
                $e
            }
            $crate::SpecId::BYZANTIUM => {
                use $crate::specification::ByzantiumSpec as SPEC;
                $e
            }
            $crate::SpecId::CONSTANTINOPLE => {
                use $crate::specification::ConstantinopleSpec as SPEC;
                $e
            }
            $crate::SpecId::PETERSBURG => {
                use $crate::specification::PetersburgSpec as SPEC;
                $e
            }
            $crate::SpecId::ISTANBUL => {
                use $crate::specification::IstanbulSpec as SPEC;
                $e
            }
            $crate::SpecId::BERLIN => {
                use $crate::specification::BerlinSpec as SPEC;
                $e
            }
            $crate::SpecId::LONDON => {
                use $crate::specification::LondonSpec as SPEC;
                $e
            }
            $crate::SpecId::MERGE => {
                use $crate::specification::MergeSpec as SPEC;
                $e
            }
            $crate::SpecId::SHANGHAI => {
                use $crate::specification::ShanghaiSpec as SPEC;
                $e
            }
            $crate::SpecId::LATEST => {
                use $crate::specification::LatestSpec as SPEC;
                $e
            }
        }
    }};
}

/// Activation heights supplied by the host. Pre-merge forks activate by block
/// number, the merge by the zero-difficulty header rule, Shanghai by
/// timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ForkSchedule {
    pub homestead_block: u64,
    pub tangerine_block: u64,
    pub spurious_dragon_block: u64,
    pub byzantium_block: u64,
    pub constantinople_block: u64,
    pub petersburg_block: u64,
    pub istanbul_block: u64,
    pub berlin_block: u64,
    pub london_block: u64,
    pub merge_block: Option<u64>,
    pub shanghai_time: Option<u64>,
}

impl ForkSchedule {
    /// The Ethereum mainnet activation heights.
    pub const MAINNET: Self = Self {
        homestead_block: 1_150_000,
        tangerine_block: 2_463_000,
        spurious_dragon_block: 2_675_000,
        byzantium_block: 4_370_000,
        constantinople_block: 7_280_000,
        petersburg_block: 7_280_000,
        istanbul_block: 9_069_000,
        berlin_block: 12_244_000,
        london_block: 12_965_000,
        merge_block: Some(15_537_394),
        shanghai_time: Some(1_681_338_455),
    };

    /// Every fork active from genesis; convenient for tests and fresh chains.
    pub const fn all_from_genesis() -> Self {
        Self {
            homestead_block: 0,
            tangerine_block: 0,
            spurious_dragon_block: 0,
            byzantium_block: 0,
            constantinople_block: 0,
            petersburg_block: 0,
            istanbul_block: 0,
            berlin_block: 0,
            london_block: 0,
            merge_block: Some(0),
            shanghai_time: Some(0),
        }
    }

    /// Resolves the rule set for a block position.
    pub fn spec_at(&self, number: u64, timestamp: u64) -> SpecId {
        if self
            .shanghai_time
            .is_some_and(|activation| timestamp >= activation)
        {
            return SpecId::SHANGHAI;
        }
        if self.merge_block.is_some_and(|activation| number >= activation) {
            return SpecId::MERGE;
        }
        if number >= self.london_block {
            SpecId::LONDON
        } else if number >= self.berlin_block {
            SpecId::BERLIN
        } else if number >= self.istanbul_block {
            SpecId::ISTANBUL
        } else if number >= self.petersburg_block {
            SpecId::PETERSBURG
        } else if number >= self.constantinople_block {
            SpecId::CONSTANTINOPLE
        } else if number >= self.byzantium_block {
            SpecId::BYZANTIUM
        } else if number >= self.spurious_dragon_block {
            SpecId::SPURIOUS_DRAGON
        } else if number >= self.tangerine_block {
            SpecId::TANGERINE
        } else if number >= self.homestead_block {
            SpecId::HOMESTEAD
        } else {
            SpecId::FRONTIER
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enabled_is_transitive() {
        assert!(SpecId::LONDON.enabled(SpecId::BERLIN));
        assert!(SpecId::LONDON.enabled(SpecId::FRONTIER));
        assert!(!SpecId::BERLIN.enabled(SpecId::LONDON));
        assert!(LondonSpec::enabled(SpecId::SPURIOUS_DRAGON));
    }

    #[test]
    fn mainnet_boundaries() {
        let schedule = ForkSchedule::MAINNET;
        assert_eq!(schedule.spec_at(0, 0), SpecId::FRONTIER);
        assert_eq!(schedule.spec_at(1_150_000, 0), SpecId::HOMESTEAD);
        assert_eq!(schedule.spec_at(2_675_000, 0), SpecId::SPURIOUS_DRAGON);
        assert_eq!(schedule.spec_at(12_964_999, 0), SpecId::BERLIN);
        assert_eq!(schedule.spec_at(12_965_000, 0), SpecId::LONDON);
        assert_eq!(schedule.spec_at(15_537_394, 0), SpecId::MERGE);
        // Shanghai switches on timestamp, not number.
        assert_eq!(
            schedule.spec_at(17_000_000, 1_681_338_455),
            SpecId::SHANGHAI
        );
        assert_eq!(schedule.spec_at(17_000_000, 1_681_338_454), SpecId::MERGE);
    }
}
