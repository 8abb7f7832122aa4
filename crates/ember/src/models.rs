//! Parameter bundles flowing between the executor, interpreter and state.

use crate::common::KECCAK_EMPTY;
use crate::instructions::{Eval, Reason};
use crate::{Address, Bytes, Gas, B256, U256};

/// Basic account state: everything except storage.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AccountInfo {
    pub balance: U256,
    pub nonce: u64,
    pub code_hash: B256,
    /// Loaded lazily by `Database::code_by_hash` when `None`.
    pub code: Option<Bytes>,
}

impl Default for AccountInfo {
    fn default() -> Self {
        Self {
            balance: U256::ZERO,
            nonce: 0,
            code_hash: KECCAK_EMPTY,
            code: Some(Bytes::new()),
        }
    }
}

impl AccountInfo {
    pub fn new(balance: U256, nonce: u64, code_hash: B256, code: Bytes) -> Self {
        Self {
            balance,
            nonce,
            code_hash,
            code: Some(code),
        }
    }

    pub fn from_balance(balance: U256) -> Self {
        Self {
            balance,
            ..Default::default()
        }
    }

    /// EIP-161 emptiness: no code, zero nonce, zero balance.
    pub fn is_empty(&self) -> bool {
        self.code_hash == KECCAK_EMPTY && self.balance.is_zero() && self.nonce == 0
    }

    pub fn has_code_or_nonce(&self) -> bool {
        self.code_hash != KECCAK_EMPTY || self.nonce != 0
    }
}

/// An emitted LOG entry.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Log {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
}

/// Transaction destination.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransactTo {
    Call(Address),
    Create(CreateScheme),
}

impl TransactTo {
    pub fn create() -> Self {
        Self::Create(CreateScheme::Create)
    }

    pub fn is_create(&self) -> bool {
        matches!(self, Self::Create(_))
    }
}

/// How a created contract's address is derived.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CreateScheme {
    /// `keccak(rlp([sender, nonce]))[12..]`
    Create,
    /// `keccak(0xff ++ sender ++ salt ++ keccak(init_code))[12..]`
    Create2 { salt: U256 },
}

/// Which CALL-family opcode spawned a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallScheme {
    Call,
    CallCode,
    DelegateCall,
    StaticCall,
}

/// Context of a call frame as the opcodes observe it.
#[derive(Clone, Copy, Debug)]
pub struct CallContext {
    /// Storage (and ADDRESS opcode) address.
    pub address: Address,
    /// CALLER opcode value.
    pub caller: Address,
    /// Where the executed code lives.
    pub code_address: Address,
    /// CALLVALUE opcode value; not necessarily transferred.
    pub apparent_value: U256,
    pub scheme: CallScheme,
}

/// An actual balance movement.
#[derive(Clone, Copy, Debug)]
pub struct Transfer {
    pub source: Address,
    pub target: Address,
    pub value: U256,
}

#[derive(Clone, Debug)]
pub struct CallInputs {
    /// Account whose code runs.
    pub contract: Address,
    pub transfer: Transfer,
    pub input: Bytes,
    pub gas_limit: u64,
    pub context: CallContext,
    pub is_static: bool,
}

#[derive(Clone, Debug)]
pub struct CreateInputs {
    pub caller: Address,
    pub scheme: CreateScheme,
    pub value: U256,
    pub init_code: Bytes,
    pub gas_limit: u64,
}

pub struct CallOutputs {
    pub reason: Reason,
    pub gas: Gas,
    pub return_value: Bytes,
}

pub struct CreateOutputs {
    pub reason: Reason,
    pub address: Option<Address>,
    pub gas: Gas,
    pub return_value: Bytes,
}

/// What SELFDESTRUCT observed; drives its dynamic gas.
#[derive(Clone, Copy, Debug, Default)]
pub struct SelfDestructResult {
    pub had_value: bool,
    pub target_exists: bool,
    pub is_cold: bool,
    pub previously_destroyed: bool,
}

/// Per-VM configuration that is not part of any fork rule.
#[derive(Clone, Debug)]
pub struct CfgEnv {
    pub chain_id: u64,
    /// EIP-170 override, mainly for tests.
    pub limit_contract_code_size: Option<usize>,
    /// Forces a zero effective gas price: the costless-state harness.
    pub costless: bool,
}

impl Default for CfgEnv {
    fn default() -> Self {
        Self {
            chain_id: 1,
            limit_contract_code_size: None,
            costless: false,
        }
    }
}

/// Immutable per-block execution context.
#[derive(Clone, Debug, Default)]
pub struct BlockEnv {
    pub number: U256,
    /// Fee recipient, as chosen by the consensus engine.
    pub coinbase: Address,
    pub timestamp: U256,
    pub difficulty: U256,
    /// Post-merge randomness beacon (the header's mix_hash field).
    pub prevrandao: Option<B256>,
    pub basefee: U256,
    pub gas_limit: U256,
}

/// Per-transaction inputs. Signature recovery happens outside the engine, so
/// `caller` is already the recovered sender.
#[derive(Clone, Debug)]
pub struct TxEnv {
    pub caller: Address,
    pub gas_limit: u64,
    /// Legacy gas price, or EIP-1559 max_fee_per_gas.
    pub gas_price: U256,
    /// EIP-1559 max_priority_fee_per_gas.
    pub gas_priority_fee: Option<U256>,
    pub transact_to: TransactTo,
    pub value: U256,
    pub data: Bytes,
    pub nonce: u64,
    pub access_list: Vec<(Address, Vec<U256>)>,
}

impl Default for TxEnv {
    fn default() -> Self {
        Self {
            caller: Address::ZERO,
            gas_limit: u64::MAX,
            gas_price: U256::ZERO,
            gas_priority_fee: None,
            transact_to: TransactTo::Call(Address::ZERO),
            value: U256::ZERO,
            data: Bytes::new(),
            nonce: 0,
            access_list: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Env {
    pub cfg: CfgEnv,
    pub block: BlockEnv,
    pub tx: TxEnv,
}

impl Env {
    /// What the sender actually pays per gas, and what the GASPRICE opcode
    /// reports. In the costless harness this is forced to zero, which also
    /// zeroes the coinbase tip.
    pub fn effective_gas_price(&self) -> U256 {
        if self.cfg.costless {
            return U256::ZERO;
        }
        match self.tx.gas_priority_fee {
            None => self.tx.gas_price,
            Some(priority_fee) => {
                core::cmp::min(self.tx.gas_price, priority_fee + self.block.basefee)
            }
        }
    }
}

/// Transaction-level output location.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransactOut {
    None,
    Call(Bytes),
    Create(Bytes, Option<Address>),
}

/// Result of executing one transaction, state changes applied to the
/// journal.
#[derive(Debug)]
pub struct ExecutionResult {
    pub reason: Reason,
    pub out: TransactOut,
    pub gas_used: u64,
    pub gas_refunded: u64,
    pub logs: Vec<Log>,
    /// Root of the call trace.
    pub computation: Computation,
}

impl ExecutionResult {
    /// Receipt status: anything but a clean halt is a failure.
    pub fn is_success(&self) -> bool {
        matches!(
            self.reason,
            Reason::Success(Eval::Stop | Eval::Return | Eval::SelfDestruct | Eval::Continue)
        )
    }
}

/// What kind of frame a computation node describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComputationKind {
    Call,
    Create,
    Precompile,
}

/// One node of the call tree: the per-frame summary kept for tracing and
/// inspection. Children appear in execution order.
#[derive(Debug)]
pub struct Computation {
    pub kind: ComputationKind,
    pub from: Address,
    /// Target address; for creates, the address being deployed to.
    pub to: Address,
    pub value: U256,
    pub gas_limit: u64,
    pub gas_used: u64,
    pub gas_refunded: i64,
    pub output: Bytes,
    /// `None` while the frame is still running; filled at exit.
    pub reason: Option<Reason>,
    pub children: Vec<Computation>,
}

impl Computation {
    pub(crate) fn enter(
        kind: ComputationKind,
        from: Address,
        to: Address,
        value: U256,
        gas_limit: u64,
    ) -> Self {
        Self {
            kind,
            from,
            to,
            value,
            gas_limit,
            gas_used: 0,
            gas_refunded: 0,
            output: Bytes::new(),
            reason: None,
            children: Vec::new(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.reason, Some(Reason::Failure(_)))
    }

    /// Depth-first count of frames, this one included.
    pub fn frame_count(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(Computation::frame_count)
            .sum::<usize>()
    }
}
