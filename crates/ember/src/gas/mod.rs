//! Gas metering: the per-frame meter plus the static and dynamic cost
//! schedules.

mod calc;
mod constants;

pub use calc::*;
pub use constants::*;

/// The per-frame gas meter.
///
/// `remaining() >= 0` holds at every step: `record_cost` refuses to go
/// negative and the caller raises `OutOfGas`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Gas {
    limit: u64,
    used: u64,
    refunded: i64,
}

impl Gas {
    pub fn new(limit: u64) -> Self {
        Self {
            limit,
            used: 0,
            refunded: 0,
        }
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn remaining(&self) -> u64 {
        self.limit - self.used
    }

    /// Total gas recorded as spent so far.
    pub fn spend(&self) -> u64 {
        self.used
    }

    pub fn refunded(&self) -> i64 {
        self.refunded
    }

    /// Records a cost, returning `false` when the meter would go negative.
    #[inline]
    #[must_use]
    pub fn record_cost(&mut self, cost: u64) -> bool {
        let (used, overflow) = self.used.overflowing_add(cost);
        if overflow || used > self.limit {
            return false;
        }
        self.used = used;
        true
    }

    /// Returns gas a child frame did not spend.
    pub fn erase_cost(&mut self, returned: u64) {
        self.used -= returned;
    }

    /// Accumulates a refund; SSTORE schedules may drive this negative
    /// transiently.
    pub fn record_refund(&mut self, refund: i64) {
        self.refunded += refund;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meter_never_goes_negative() {
        let mut gas = Gas::new(100);
        assert!(gas.record_cost(60));
        assert!(!gas.record_cost(41));
        // A refused cost leaves the meter untouched.
        assert_eq!(gas.remaining(), 40);
        assert!(gas.record_cost(40));
        assert_eq!(gas.remaining(), 0);
    }

    #[test]
    fn erase_restores_child_leftover() {
        let mut gas = Gas::new(100);
        assert!(gas.record_cost(90));
        gas.erase_cost(30);
        assert_eq!(gas.spend(), 60);
        assert_eq!(gas.remaining(), 40);
    }

    #[test]
    fn accounting_identity() {
        // limit == spend + remaining at every point
        let mut gas = Gas::new(1000);
        assert!(gas.record_cost(123));
        assert!(gas.record_cost(456));
        assert_eq!(gas.limit(), gas.spend() + gas.remaining());
    }
}
