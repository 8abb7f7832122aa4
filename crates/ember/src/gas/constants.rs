pub const ZERO: u64 = 0;
pub const BASE: u64 = 2;
pub const VERYLOW: u64 = 3;
pub const LOW: u64 = 5;
pub const MID: u64 = 8;
pub const HIGH: u64 = 10;
pub const JUMPDEST: u64 = 1;

pub const CREATE: u64 = 32_000;
pub const CODEDEPOSIT: u64 = 200;

pub const CALL_STIPEND: u64 = 2_300;
pub const CALLVALUE: u64 = 9_000;
pub const NEWACCOUNT: u64 = 25_000;

pub const SELFDESTRUCT_REFUND: i64 = 24_000;

pub const MEMORY: u64 = 3;
pub const QUAD_COEFF_DIV: u64 = 512;

pub const KECCAK256: u64 = 30;
pub const KECCAK256WORD: u64 = 6;
pub const COPY: u64 = 3;

pub const LOG: u64 = 375;
pub const LOGDATA: u64 = 8;
pub const LOGTOPIC: u64 = 375;

pub const EXP: u64 = 10;

pub const SSTORE_SET: u64 = 20_000;
pub const SSTORE_RESET: u64 = 5_000;
pub const SSTORE_CLEARS_REFUND: i64 = 15_000;
/// EIP-3529 reduced clear refund.
pub const SSTORE_CLEARS_REFUND_LONDON: i64 = 4_800;

// EIP-2929 warm/cold access pricing.
pub const WARM_STORAGE_READ_COST: u64 = 100;
pub const COLD_SLOAD_COST: u64 = 2_100;
pub const COLD_ACCOUNT_ACCESS_COST: u64 = 2_600;

// Intrinsic transaction costs.
pub const TRANSACTION_BASE: u64 = 21_000;
/// EIP-2: contract creation transactions pay an extra 32 000.
pub const TRANSACTION_CREATE: u64 = 53_000;
pub const TRANSACTION_ZERO_DATA: u64 = 4;
pub const TRANSACTION_NON_ZERO_DATA: u64 = 68;
/// EIP-2028 reduced calldata cost.
pub const TRANSACTION_NON_ZERO_DATA_ISTANBUL: u64 = 16;
pub const ACCESS_LIST_ADDRESS: u64 = 2_400;
pub const ACCESS_LIST_STORAGE_KEY: u64 = 1_900;

/// EIP-170 deployed code size cap.
pub const MAX_CODE_SIZE: usize = 0x6000;
