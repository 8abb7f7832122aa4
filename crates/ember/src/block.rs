//! Block-level wire types: headers, signed transactions, receipts,
//! withdrawals. Encodings follow mainnet RLP, including the EIP-2718 typed
//! envelopes; decoding is the host's concern.

use crate::common::keccak256;
use crate::models::{Log, TransactTo, TxEnv};
use crate::{Address, Bytes, B256, U256};
use alloy_primitives::{Bloom, BloomInput, B64};
use alloy_rlp::{Encodable, RlpEncodable};

/// A block header. `base_fee_per_gas` and `withdrawals_root` only join the
/// RLP tail once their forks activate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Header {
    pub parent_hash: B256,
    pub uncles_hash: B256,
    pub coinbase: Address,
    pub state_root: B256,
    pub transaction_root: B256,
    pub receipt_root: B256,
    pub bloom: Bloom,
    pub difficulty: U256,
    pub number: u64,
    pub gas_limit: u64,
    pub gas_used: u64,
    pub timestamp: u64,
    pub extra_data: Bytes,
    pub mix_hash: B256,
    pub nonce: B64,
    /// London.
    pub base_fee_per_gas: Option<u64>,
    /// Shanghai.
    pub withdrawals_root: Option<B256>,
}

impl Default for Header {
    fn default() -> Self {
        Self {
            parent_hash: B256::ZERO,
            uncles_hash: EMPTY_UNCLES_HASH,
            coinbase: Address::ZERO,
            state_root: crate::trie::EMPTY_ROOT,
            transaction_root: crate::trie::EMPTY_ROOT,
            receipt_root: crate::trie::EMPTY_ROOT,
            bloom: Bloom::ZERO,
            difficulty: U256::ZERO,
            number: 0,
            gas_limit: 0,
            gas_used: 0,
            timestamp: 0,
            extra_data: Bytes::new(),
            mix_hash: B256::ZERO,
            nonce: B64::ZERO,
            base_fee_per_gas: None,
            withdrawals_root: None,
        }
    }
}

/// `keccak(rlp([]))`: the uncles hash of a block without uncles.
pub const EMPTY_UNCLES_HASH: B256 = B256::new([
    0x1d, 0xcc, 0x4d, 0xe8, 0xde, 0xc7, 0x5d, 0x7a, 0xab, 0x85, 0xb5, 0x67, 0xb6, 0xcc, 0xd4,
    0x1a, 0xd3, 0x12, 0x45, 0x1b, 0x94, 0x8a, 0x74, 0x13, 0xf0, 0xa1, 0x42, 0xfd, 0x40, 0xd4,
    0x93, 0x47,
]);

impl Encodable for Header {
    fn encode(&self, out: &mut dyn alloy_rlp::BufMut) {
        let payload_length = self.payload_length();
        alloy_rlp::Header {
            list: true,
            payload_length,
        }
        .encode(out);
        self.parent_hash.encode(out);
        self.uncles_hash.encode(out);
        self.coinbase.encode(out);
        self.state_root.encode(out);
        self.transaction_root.encode(out);
        self.receipt_root.encode(out);
        self.bloom.encode(out);
        self.difficulty.encode(out);
        self.number.encode(out);
        self.gas_limit.encode(out);
        self.gas_used.encode(out);
        self.timestamp.encode(out);
        self.extra_data.encode(out);
        self.mix_hash.encode(out);
        self.nonce.encode(out);
        if let Some(base_fee) = self.base_fee_per_gas {
            base_fee.encode(out);
        }
        if let Some(withdrawals_root) = self.withdrawals_root {
            withdrawals_root.encode(out);
        }
    }

    fn length(&self) -> usize {
        let payload_length = self.payload_length();
        payload_length
            + alloy_rlp::Header {
                list: true,
                payload_length,
            }
            .length()
    }
}

impl Header {
    fn payload_length(&self) -> usize {
        let mut length = self.parent_hash.length()
            + self.uncles_hash.length()
            + self.coinbase.length()
            + self.state_root.length()
            + self.transaction_root.length()
            + self.receipt_root.length()
            + self.bloom.length()
            + self.difficulty.length()
            + self.number.length()
            + self.gas_limit.length()
            + self.gas_used.length()
            + self.timestamp.length()
            + self.extra_data.length()
            + self.mix_hash.length()
            + self.nonce.length();
        if let Some(base_fee) = self.base_fee_per_gas {
            length += base_fee.length();
        }
        if let Some(withdrawals_root) = self.withdrawals_root {
            length += withdrawals_root.length();
        }
        length
    }

    pub fn hash(&self) -> B256 {
        keccak256(alloy_rlp::encode(self))
    }

    /// Whether this header is post-merge under the zero-difficulty rule.
    pub fn is_post_merge(&self) -> bool {
        self.difficulty.is_zero()
    }
}

/// EIP-2718 transaction type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum TxType {
    Legacy = 0x00,
    /// EIP-2930.
    AccessList = 0x01,
    /// EIP-1559.
    DynamicFee = 0x02,
}

#[derive(Clone, Debug, PartialEq, Eq, RlpEncodable)]
pub struct AccessListItem {
    pub address: Address,
    pub storage_keys: Vec<B256>,
}

/// Secp256k1 signature fields, carried opaquely: recovery happens in the
/// host, which also supplies `sender`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Signature {
    /// Legacy `v`, or the typed-transaction y-parity bit.
    pub v: u64,
    pub r: U256,
    pub s: U256,
}

/// A signed transaction with its sender already recovered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub tx_type: TxType,
    pub chain_id: Option<u64>,
    pub nonce: u64,
    /// Gas price for legacy/access-list; max_fee_per_gas for dynamic-fee.
    pub gas_price: U256,
    pub max_priority_fee_per_gas: Option<U256>,
    pub gas_limit: u64,
    /// `None` creates a contract.
    pub to: Option<Address>,
    pub value: U256,
    pub data: Bytes,
    pub access_list: Vec<AccessListItem>,
    pub signature: Signature,
    pub sender: Address,
}

impl Default for Transaction {
    fn default() -> Self {
        Self {
            tx_type: TxType::Legacy,
            chain_id: None,
            nonce: 0,
            gas_price: U256::ZERO,
            max_priority_fee_per_gas: None,
            gas_limit: 21_000,
            to: Some(Address::ZERO),
            value: U256::ZERO,
            data: Bytes::new(),
            access_list: Vec::new(),
            signature: Signature::default(),
            sender: Address::ZERO,
        }
    }
}

/// `to` field: an address or the empty string for creates.
fn encode_to(to: &Option<Address>, out: &mut dyn alloy_rlp::BufMut) {
    match to {
        Some(address) => address.encode(out),
        None => out.put_u8(alloy_rlp::EMPTY_STRING_CODE),
    }
}

fn to_length(to: &Option<Address>) -> usize {
    match to {
        Some(address) => address.length(),
        None => 1,
    }
}

impl Transaction {
    fn payload_length(&self) -> usize {
        let mut length = self.nonce.length()
            + self.gas_limit.length()
            + to_length(&self.to)
            + self.value.length()
            + self.data.length()
            + self.signature.r.length()
            + self.signature.s.length();
        match self.tx_type {
            TxType::Legacy => {
                length += self.gas_price.length() + self.signature.v.length();
            }
            TxType::AccessList => {
                length += self.chain_id.unwrap_or(1).length()
                    + self.gas_price.length()
                    + self.access_list.length()
                    + self.signature.v.length();
            }
            TxType::DynamicFee => {
                length += self.chain_id.unwrap_or(1).length()
                    + self
                        .max_priority_fee_per_gas
                        .unwrap_or_default()
                        .length()
                    + self.gas_price.length()
                    + self.access_list.length()
                    + self.signature.v.length();
            }
        }
        length
    }

    /// The EIP-2718 envelope: what goes into the transaction trie and what
    /// gets hashed for the transaction id.
    pub fn encoded(&self) -> Bytes {
        let mut out = Vec::new();
        if self.tx_type != TxType::Legacy {
            out.push(self.tx_type as u8);
        }
        alloy_rlp::Header {
            list: true,
            payload_length: self.payload_length(),
        }
        .encode(&mut out);
        match self.tx_type {
            TxType::Legacy => {
                self.nonce.encode(&mut out);
                self.gas_price.encode(&mut out);
                self.gas_limit.encode(&mut out);
                encode_to(&self.to, &mut out);
                self.value.encode(&mut out);
                self.data.encode(&mut out);
                self.signature.v.encode(&mut out);
                self.signature.r.encode(&mut out);
                self.signature.s.encode(&mut out);
            }
            TxType::AccessList => {
                self.chain_id.unwrap_or(1).encode(&mut out);
                self.nonce.encode(&mut out);
                self.gas_price.encode(&mut out);
                self.gas_limit.encode(&mut out);
                encode_to(&self.to, &mut out);
                self.value.encode(&mut out);
                self.data.encode(&mut out);
                self.access_list.encode(&mut out);
                self.signature.v.encode(&mut out);
                self.signature.r.encode(&mut out);
                self.signature.s.encode(&mut out);
            }
            TxType::DynamicFee => {
                self.chain_id.unwrap_or(1).encode(&mut out);
                self.nonce.encode(&mut out);
                self.max_priority_fee_per_gas
                    .unwrap_or_default()
                    .encode(&mut out);
                self.gas_price.encode(&mut out);
                self.gas_limit.encode(&mut out);
                encode_to(&self.to, &mut out);
                self.value.encode(&mut out);
                self.data.encode(&mut out);
                self.access_list.encode(&mut out);
                self.signature.v.encode(&mut out);
                self.signature.r.encode(&mut out);
                self.signature.s.encode(&mut out);
            }
        }
        Bytes::from(out)
    }

    pub fn hash(&self) -> B256 {
        keccak256(self.encoded())
    }

    pub fn is_create(&self) -> bool {
        self.to.is_none()
    }

    /// The executor-facing view of this transaction.
    pub fn tx_env(&self) -> TxEnv {
        TxEnv {
            caller: self.sender,
            gas_limit: self.gas_limit,
            gas_price: self.gas_price,
            gas_priority_fee: self.max_priority_fee_per_gas,
            transact_to: match self.to {
                Some(address) => TransactTo::Call(address),
                None => TransactTo::create(),
            },
            value: self.value,
            data: self.data.clone(),
            nonce: self.nonce,
            access_list: self
                .access_list
                .iter()
                .map(|item| {
                    (
                        item.address,
                        item.storage_keys
                            .iter()
                            .map(|key| U256::from_be_bytes(key.0))
                            .collect(),
                    )
                })
                .collect(),
        }
    }
}

impl Encodable for Log {
    fn encode(&self, out: &mut dyn alloy_rlp::BufMut) {
        let payload_length =
            self.address.length() + self.topics.length() + self.data.length();
        alloy_rlp::Header {
            list: true,
            payload_length,
        }
        .encode(out);
        self.address.encode(out);
        self.topics.encode(out);
        self.data.encode(out);
    }

    fn length(&self) -> usize {
        let payload_length =
            self.address.length() + self.topics.length() + self.data.length();
        payload_length
            + alloy_rlp::Header {
                list: true,
                payload_length,
            }
            .length()
    }
}

/// Pre-Byzantium receipts commit to an intermediate state root; Byzantium on,
/// to a status bit (EIP-658).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReceiptOutcome {
    Root(B256),
    Status(bool),
}

impl Encodable for ReceiptOutcome {
    fn encode(&self, out: &mut dyn alloy_rlp::BufMut) {
        match self {
            ReceiptOutcome::Root(root) => root.encode(out),
            ReceiptOutcome::Status(status) => (*status as u64).encode(out),
        }
    }

    fn length(&self) -> usize {
        match self {
            ReceiptOutcome::Root(root) => root.length(),
            ReceiptOutcome::Status(_) => 1,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Receipt {
    pub tx_type: TxType,
    pub outcome: ReceiptOutcome,
    pub cumulative_gas_used: u64,
    pub bloom: Bloom,
    pub logs: Vec<Log>,
}

impl Receipt {
    /// EIP-2718 envelope, as placed in the receipt trie.
    pub fn encoded(&self) -> Bytes {
        let mut out = Vec::new();
        if self.tx_type != TxType::Legacy {
            out.push(self.tx_type as u8);
        }
        let payload_length = self.outcome.length()
            + self.cumulative_gas_used.length()
            + self.bloom.length()
            + self.logs.length();
        alloy_rlp::Header {
            list: true,
            payload_length,
        }
        .encode(&mut out);
        self.outcome.encode(&mut out);
        self.cumulative_gas_used.encode(&mut out);
        self.bloom.encode(&mut out);
        self.logs.encode(&mut out);
        Bytes::from(out)
    }

    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, ReceiptOutcome::Status(true) | ReceiptOutcome::Root(_))
    }
}

/// Folds log addresses and topics into a 2048-bit bloom.
pub fn logs_bloom<'a>(logs: impl IntoIterator<Item = &'a Log>) -> Bloom {
    let mut bloom = Bloom::ZERO;
    for log in logs {
        bloom.accrue(BloomInput::Raw(log.address.as_slice()));
        for topic in &log.topics {
            bloom.accrue(BloomInput::Raw(topic.as_slice()));
        }
    }
    bloom
}

/// EIP-4895 beacon-chain withdrawal; `amount` is denominated in gwei.
#[derive(Clone, Copy, Debug, PartialEq, Eq, RlpEncodable)]
pub struct Withdrawal {
    pub index: u64,
    pub validator_index: u64,
    pub address: Address,
    pub amount: u64,
}

impl Withdrawal {
    pub const GWEI: u64 = 1_000_000_000;

    /// Amount in wei, as credited to the account.
    pub fn amount_wei(&self) -> U256 {
        U256::from(self.amount) * U256::from(Self::GWEI)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Block {
    pub header: Header,
    pub transactions: Vec<Transaction>,
    pub uncles: Vec<Header>,
    /// Present from Shanghai.
    pub withdrawals: Option<Vec<Withdrawal>>,
}

/// `keccak(rlp(uncles))`, the header commitment to the uncle list.
pub fn uncles_hash(uncles: &[Header]) -> B256 {
    let payload_length: usize = uncles.iter().map(Encodable::length).sum();
    let mut out = Vec::with_capacity(payload_length + 9);
    alloy_rlp::Header {
        list: true,
        payload_length,
    }
    .encode(&mut out);
    for uncle in uncles {
        uncle.encode(&mut out);
    }
    keccak256(out)
}
