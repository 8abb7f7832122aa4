//! The consumed storage interfaces and their in-memory reference
//! implementations.
//!
//! The engine buffers all writes in the journal and only talks to a
//! [`Database`] for reads; [`DatabaseCommit`] receives the flattened changes
//! at `persist` time. A real node backs these with its trie database; the
//! in-memory forms here serve tests and the costless harness.

use crate::block::Header;
use crate::common::KECCAK_EMPTY;
use crate::journaled_state::Account;
use crate::models::AccountInfo;
use crate::trie;
use crate::{Address, Bytes, B256, U256};
use alloy_rlp::Encodable;
use core::convert::Infallible;
use hashbrown::HashMap;

/// Read access to the world state. Errors surface as `EVMMissingData`-style
/// failures that abort and undo the surrounding transaction.
pub trait Database {
    type Error: core::fmt::Debug;

    /// Basic account data, or `None` if the account does not exist.
    fn basic(&mut self, address: Address) -> Result<Option<AccountInfo>, Self::Error>;
    fn code_by_hash(&mut self, code_hash: B256) -> Result<Bytes, Self::Error>;
    fn storage(&mut self, address: Address, index: U256) -> Result<U256, Self::Error>;
    /// Hash of an ancestor block, for the BLOCKHASH opcode.
    fn block_hash(&mut self, number: U256) -> Result<B256, Self::Error>;
}

/// Write sink for the journal's flattened per-block changes.
pub trait DatabaseCommit {
    fn commit(&mut self, changes: HashMap<Address, Account>);
}

/// A database that can also commit and compute the state root: what the
/// block driver needs.
pub trait StateDatabase: Database + DatabaseCommit {
    fn state_root(&mut self) -> B256;
}

/// How the cached account relates to the backing store.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub enum AccountState {
    /// Known absent. Distinct from empty before Spurious Dragon.
    NotExisting,
    /// Written by the EVM.
    Touched,
    /// Storage wiped (selfdestruct or fresh create); missing slots are zero,
    /// not database reads.
    StorageCleared,
    /// Only read so far.
    #[default]
    None,
}

#[derive(Debug, Clone, Default)]
pub struct DbAccount {
    pub info: AccountInfo,
    pub account_state: AccountState,
    pub storage: HashMap<U256, U256>,
}

impl DbAccount {
    fn new_not_existing() -> Self {
        Self {
            account_state: AccountState::NotExisting,
            ..Default::default()
        }
    }

    fn exists(&self) -> bool {
        self.account_state != AccountState::NotExisting
    }
}

/// Memory backend, storing all state in maps.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDB {
    pub accounts: HashMap<Address, DbAccount>,
    pub contracts: HashMap<B256, Bytes>,
    pub block_hashes: HashMap<U256, B256>,
}

impl InMemoryDB {
    pub fn insert_account_info(&mut self, address: Address, mut info: AccountInfo) {
        self.insert_contract(&mut info);
        self.accounts.entry(address).or_default().info = info;
    }

    pub fn insert_account_storage(&mut self, address: Address, slot: U256, value: U256) {
        self.accounts
            .entry(address)
            .or_default()
            .storage
            .insert(slot, value);
    }

    pub fn insert_block_hash(&mut self, number: U256, hash: B256) {
        self.block_hashes.insert(number, hash);
    }

    fn insert_contract(&mut self, info: &mut AccountInfo) {
        if let Some(code) = &info.code {
            if !code.is_empty() {
                if info.code_hash == KECCAK_EMPTY {
                    info.code_hash = crate::common::keccak256(code);
                }
                self.contracts
                    .entry(info.code_hash)
                    .or_insert_with(|| code.clone());
            }
        }
    }

    /// RLP of `[nonce, balance, storage_root, code_hash]`, the account leaf.
    fn account_leaf(&self, account: &DbAccount) -> Vec<u8> {
        let storage_root = trie::trie_root_and_nodes(
            account
                .storage
                .iter()
                .filter(|(_, value)| !value.is_zero())
                .map(|(key, value)| {
                    (
                        crate::common::keccak256(key.to_be_bytes::<32>()).to_vec(),
                        alloy_rlp::encode(value),
                    )
                }),
        )
        .0;

        let payload_length = account.info.nonce.length()
            + account.info.balance.length()
            + storage_root.length()
            + account.info.code_hash.length();
        let mut out = Vec::with_capacity(payload_length + 3);
        alloy_rlp::Header {
            list: true,
            payload_length,
        }
        .encode(&mut out);
        account.info.nonce.encode(&mut out);
        account.info.balance.encode(&mut out);
        storage_root.encode(&mut out);
        account.info.code_hash.encode(&mut out);
        out
    }
}

impl Database for InMemoryDB {
    type Error = Infallible;

    fn basic(&mut self, address: Address) -> Result<Option<AccountInfo>, Self::Error> {
        Ok(self
            .accounts
            .get(&address)
            .filter(|account| account.exists())
            .map(|account| account.info.clone()))
    }

    fn code_by_hash(&mut self, code_hash: B256) -> Result<Bytes, Self::Error> {
        Ok(self.contracts.get(&code_hash).cloned().unwrap_or_default())
    }

    fn storage(&mut self, address: Address, index: U256) -> Result<U256, Self::Error> {
        Ok(self
            .accounts
            .get(&address)
            .filter(|account| {
                !matches!(
                    account.account_state,
                    AccountState::NotExisting | AccountState::StorageCleared
                )
            })
            .and_then(|account| account.storage.get(&index).copied())
            .unwrap_or(U256::ZERO))
    }

    fn block_hash(&mut self, number: U256) -> Result<B256, Self::Error> {
        Ok(self.block_hashes.get(&number).copied().unwrap_or(B256::ZERO))
    }
}

impl DatabaseCommit for InMemoryDB {
    fn commit(&mut self, changes: HashMap<Address, Account>) {
        for (address, mut account) in changes {
            if account.is_destroyed {
                let db_account = self.accounts.entry(address).or_default();
                db_account.storage.clear();
                db_account.account_state = AccountState::NotExisting;
                db_account.info = AccountInfo::default();
                continue;
            }
            if account.is_not_existing && !account.is_touched {
                continue;
            }
            self.insert_contract(&mut account.info);

            let db_account = self.accounts.entry(address).or_default();
            db_account.info = account.info;
            db_account.account_state = if account.is_created {
                db_account.storage.clear();
                AccountState::StorageCleared
            } else {
                AccountState::Touched
            };
            db_account.storage.extend(
                account
                    .storage
                    .into_iter()
                    .map(|(key, slot)| (key, slot.present_value)),
            );
        }
    }
}

impl StateDatabase for InMemoryDB {
    /// Secure-trie root over every existing account.
    fn state_root(&mut self) -> B256 {
        let leaves: Vec<(Vec<u8>, Vec<u8>)> = self
            .accounts
            .iter()
            .filter(|(_, account)| account.exists())
            .map(|(address, account)| {
                (
                    crate::common::keccak256(address).to_vec(),
                    self.account_leaf(account),
                )
            })
            .collect();
        trie::trie_root_and_nodes(leaves).0
    }
}

/// The chain-database surface the block driver consumes: ancestor headers
/// and a sink for trie nodes produced while sealing a block.
pub trait ChainDb {
    fn get_block_header_by_hash(&self, hash: B256) -> Option<Header>;

    fn get_parent_header(&self, header: &Header) -> Option<Header> {
        self.get_block_header_by_hash(header.parent_hash)
    }

    fn persist_trie_data_dict(&mut self, nodes: HashMap<B256, Bytes>);

    /// Whether a trie root (or other node hash) is already present.
    fn exists(&self, hash: B256) -> bool;
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryChainDb {
    pub headers: HashMap<B256, Header>,
    pub trie_nodes: HashMap<B256, Bytes>,
}

impl InMemoryChainDb {
    pub fn insert_header(&mut self, header: Header) -> B256 {
        let hash = header.hash();
        self.headers.insert(hash, header);
        hash
    }
}

impl ChainDb for InMemoryChainDb {
    fn get_block_header_by_hash(&self, hash: B256) -> Option<Header> {
        self.headers.get(&hash).cloned()
    }

    fn persist_trie_data_dict(&mut self, nodes: HashMap<B256, Bytes>) {
        self.trie_nodes.extend(nodes);
    }

    fn exists(&self, hash: B256) -> bool {
        self.trie_nodes.contains_key(&hash) || self.headers.contains_key(&hash)
    }
}
