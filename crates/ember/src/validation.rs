//! Header, block, uncle and receipt validation.

use crate::block::{logs_bloom, uncles_hash, Block, Header, Receipt};
use alloy_primitives::BloomInput;

pub const MAX_EXTRA_DATA_BYTES: usize = 32;
pub const MAX_UNCLES: usize = 2;
/// Oldest generation an uncle may come from.
pub const MAX_UNCLE_DEPTH: u64 = 7;
pub const GAS_LIMIT_MINIMUM: u64 = 5_000;
/// A block may drift from its parent's gas limit by at most 1/1024.
pub const GAS_LIMIT_ADJUSTMENT_FACTOR: u64 = 1_024;

/// A consistency failure in a block, header, uncle or receipt. The offending
/// values ride along for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("extra data is {got} bytes, limit is {limit}")]
    ExtraDataTooLong { got: usize, limit: usize },
    #[error("block number {got} does not follow parent number {parent}")]
    NonConsecutiveBlockNumber { got: u64, parent: u64 },
    #[error("timestamp {got} is not after parent timestamp {parent}")]
    TimestampNotLater { got: u64, parent: u64 },
    #[error("gas limit {got} outside the allowed range around {parent}")]
    GasLimitOutOfRange { got: u64, parent: u64 },
    #[error("gas used {got} exceeds gas limit {limit}")]
    GasUsedExceedsLimit { got: u64, limit: u64 },
    #[error("transaction root mismatch")]
    TransactionRootMismatch,
    #[error("receipt root mismatch")]
    ReceiptRootMismatch,
    #[error("withdrawals root mismatch")]
    WithdrawalsRootMismatch,
    #[error("state root mismatch or unknown")]
    StateRootMismatch,
    #[error("block has {0} uncles, limit is {MAX_UNCLES}")]
    TooManyUncles(usize),
    #[error("uncle number {uncle} out of range for block {block}")]
    UncleNumberOutOfRange { uncle: u64, block: u64 },
    #[error("uncle timestamp is not after its parent's")]
    UncleTimestampNotLater,
    #[error("uncles hash does not commit to the uncle list")]
    UnclesHashMismatch,
    #[error("log address or topic missing from the receipt bloom")]
    ReceiptBloomMismatch,
    #[error("receipt logs bloom is not the fold of its logs")]
    ReceiptBloomNotDerived,
    #[error("seal verification failed: {0}")]
    InvalidSeal(String),
    #[error("transaction gas limit does not fit in the remaining block gas")]
    TransactionExceedsBlockGasLimit,
    #[error("this VM is bound to block {expected}, got {got}")]
    WrongBlockNumber { expected: u64, got: u64 },
    #[error("header has no parent to validate against")]
    MissingParent,
}

/// Drift of at most 1/1024 of the parent limit, and never below the floor.
pub fn validate_gas_limit(gas_limit: u64, parent_gas_limit: u64) -> Result<(), ValidationError> {
    let max_adjustment = parent_gas_limit / GAS_LIMIT_ADJUSTMENT_FACTOR;
    let out_of_range = gas_limit < GAS_LIMIT_MINIMUM
        || gas_limit > parent_gas_limit + max_adjustment
        || gas_limit < parent_gas_limit.saturating_sub(max_adjustment);
    if out_of_range {
        return Err(ValidationError::GasLimitOutOfRange {
            got: gas_limit,
            parent: parent_gas_limit,
        });
    }
    Ok(())
}

pub fn validate_header(header: &Header, parent: &Header) -> Result<(), ValidationError> {
    if header.extra_data.len() > MAX_EXTRA_DATA_BYTES {
        return Err(ValidationError::ExtraDataTooLong {
            got: header.extra_data.len(),
            limit: MAX_EXTRA_DATA_BYTES,
        });
    }

    validate_gas_limit(header.gas_limit, parent.gas_limit)?;

    if header.number != parent.number + 1 {
        return Err(ValidationError::NonConsecutiveBlockNumber {
            got: header.number,
            parent: parent.number,
        });
    }

    if header.timestamp <= parent.timestamp {
        return Err(ValidationError::TimestampNotLater {
            got: header.timestamp,
            parent: parent.timestamp,
        });
    }

    Ok(())
}

/// Structural uncle checks against the uncle's own parent.
pub fn validate_uncle(
    block: &Block,
    uncle: &Header,
    uncle_parent: &Header,
) -> Result<(), ValidationError> {
    if uncle.number >= block.header.number {
        return Err(ValidationError::UncleNumberOutOfRange {
            uncle: uncle.number,
            block: block.header.number,
        });
    }
    if uncle.number != uncle_parent.number + 1 {
        return Err(ValidationError::NonConsecutiveBlockNumber {
            got: uncle.number,
            parent: uncle_parent.number,
        });
    }
    if uncle.timestamp <= uncle_parent.timestamp {
        return Err(ValidationError::UncleTimestampNotLater);
    }
    if uncle.gas_used > uncle.gas_limit {
        return Err(ValidationError::GasUsedExceedsLimit {
            got: uncle.gas_used,
            limit: uncle.gas_limit,
        });
    }

    // A London uncle of a pre-London parent sees the doubled elasticity
    // limit.
    let mut uncle_parent_gas_limit = uncle_parent.gas_limit;
    if uncle_parent.base_fee_per_gas.is_none() && uncle.base_fee_per_gas.is_some() {
        uncle_parent_gas_limit *= 2;
    }
    validate_gas_limit(uncle.gas_limit, uncle_parent_gas_limit)
}

/// Uncle placement rules that need no chain lookup.
pub fn validate_block_uncles(block: &Block) -> Result<(), ValidationError> {
    if block.uncles.len() > MAX_UNCLES {
        return Err(ValidationError::TooManyUncles(block.uncles.len()));
    }
    let number = block.header.number;
    for uncle in &block.uncles {
        let lowest = number.saturating_sub(MAX_UNCLE_DEPTH);
        if uncle.number < lowest || uncle.number >= number {
            return Err(ValidationError::UncleNumberOutOfRange {
                uncle: uncle.number,
                block: number,
            });
        }
    }
    if uncles_hash(&block.uncles) != block.header.uncles_hash {
        return Err(ValidationError::UnclesHashMismatch);
    }
    Ok(())
}

/// Every log address and topic must be present in the receipt's bloom, and
/// the bloom must be exactly the fold of the logs.
pub fn validate_receipt(receipt: &Receipt) -> Result<(), ValidationError> {
    for log in &receipt.logs {
        if !receipt
            .bloom
            .contains_input(BloomInput::Raw(log.address.as_slice()))
        {
            return Err(ValidationError::ReceiptBloomMismatch);
        }
        for topic in &log.topics {
            if !receipt
                .bloom
                .contains_input(BloomInput::Raw(topic.as_slice()))
            {
                return Err(ValidationError::ReceiptBloomMismatch);
            }
        }
    }
    if logs_bloom(receipt.logs.iter()) != receipt.bloom {
        return Err(ValidationError::ReceiptBloomNotDerived);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{ReceiptOutcome, TxType};
    use crate::models::Log;
    use crate::{Address, Bytes, B256};
    use alloy_primitives::Bloom;

    fn parent() -> Header {
        Header {
            number: 9,
            timestamp: 100,
            gas_limit: 8_000_000,
            ..Header::default()
        }
    }

    fn child() -> Header {
        Header {
            number: 10,
            timestamp: 110,
            gas_limit: 8_000_000,
            ..Header::default()
        }
    }

    #[test]
    fn accepts_well_formed_header() {
        assert_eq!(validate_header(&child(), &parent()), Ok(()));
    }

    #[test]
    fn rejects_long_extra_data() {
        let mut header = child();
        header.extra_data = Bytes::from(vec![0; 33]);
        assert!(matches!(
            validate_header(&header, &parent()),
            Err(ValidationError::ExtraDataTooLong { got: 33, .. })
        ));
    }

    #[test]
    fn rejects_non_consecutive_number() {
        let mut header = child();
        header.number = 12;
        assert!(matches!(
            validate_header(&header, &parent()),
            Err(ValidationError::NonConsecutiveBlockNumber { .. })
        ));
    }

    #[test]
    fn rejects_stale_timestamp() {
        let mut header = child();
        header.timestamp = 100;
        assert!(matches!(
            validate_header(&header, &parent()),
            Err(ValidationError::TimestampNotLater { .. })
        ));
    }

    #[test]
    fn gas_limit_drift_bounds() {
        let parent_limit = 8_000_000;
        // 1/1024 of the parent is the widest step
        assert!(validate_gas_limit(parent_limit + 7_812, parent_limit).is_ok());
        assert!(validate_gas_limit(parent_limit + 7_813, parent_limit).is_err());
        assert!(validate_gas_limit(parent_limit - 7_812, parent_limit).is_ok());
        assert!(validate_gas_limit(parent_limit - 7_813, parent_limit).is_err());
        assert!(validate_gas_limit(4_999, 5_000).is_err());
    }

    #[test]
    fn uncle_depth_window() {
        let mut block = Block {
            header: Header {
                number: 10,
                ..Header::default()
            },
            ..Block::default()
        };
        let mut uncle = Header::default();
        uncle.number = 2; // block - 8: too deep
        block.uncles = vec![uncle];
        block.header.uncles_hash = uncles_hash(&block.uncles);
        assert!(matches!(
            validate_block_uncles(&block),
            Err(ValidationError::UncleNumberOutOfRange { .. })
        ));

        block.uncles[0].number = 3; // block - 7: oldest allowed
        block.header.uncles_hash = uncles_hash(&block.uncles);
        assert_eq!(validate_block_uncles(&block), Ok(()));
    }

    #[test]
    fn receipt_bloom_soundness() {
        let log = Log {
            address: Address::repeat_byte(1),
            topics: vec![B256::repeat_byte(2)],
            data: Bytes::new(),
        };
        let good = Receipt {
            tx_type: TxType::Legacy,
            outcome: ReceiptOutcome::Status(true),
            cumulative_gas_used: 21_000,
            bloom: logs_bloom([&log]),
            logs: vec![log.clone()],
        };
        assert_eq!(validate_receipt(&good), Ok(()));

        let bad = Receipt {
            bloom: Bloom::ZERO,
            ..good
        };
        assert!(validate_receipt(&bad).is_err());
    }
}
