//! The state façade: a journaled overlay over a [`Database`].
//!
//! Every mutation appends an inverse entry to the current journal frame;
//! `checkpoint`/`checkpoint_revert`/`checkpoint_commit` give the LIFO
//! snapshot discipline the executor builds call frames on. Reverting a
//! checkpoint restores the warm/cold access sets too, so gas observability
//! is byte-identical after a rollback.

use crate::common::{keccak256, KECCAK_EMPTY};
use crate::db::{Database, DatabaseCommit};
use crate::evm_impl::{EvmError, EvmResult, ExceptionalHalt};
use crate::models::{AccountInfo, Log, SelfDestructResult};
use crate::{Address, Bytes, SpecId, B256, U256};
use hashbrown::{HashMap, HashSet};

/// A storage slot with the value it had when the transaction started.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StorageSlot {
    pub original_value: U256,
    pub present_value: U256,
}

impl StorageSlot {
    pub fn new(value: U256) -> Self {
        Self {
            original_value: value,
            present_value: value,
        }
    }
}

/// An account as the journal sees it.
#[derive(Clone, Debug, Default)]
pub struct Account {
    pub info: AccountInfo,
    pub storage: HashMap<U256, StorageSlot>,
    /// Read or written this transaction; EIP-161 deletes touched empties.
    pub is_touched: bool,
    /// Queued for deletion (SELFDESTRUCT, or the EIP-161 sweep).
    pub is_destroyed: bool,
    /// Created this transaction: its storage starts empty regardless of the
    /// database.
    pub is_created: bool,
    /// The database had no such account; distinct from "empty" before
    /// Spurious Dragon.
    pub is_not_existing: bool,
}

impl Account {
    fn new_not_existing() -> Self {
        Self {
            is_not_existing: true,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.info.is_empty()
    }
}

/// Everything the engine read from the database while executing: the partial
/// witness a stateless host needs.
#[derive(Clone, Debug, Default)]
pub struct MetaWitness {
    pub accounts_queried: HashSet<Address>,
    pub bytecodes_queried: HashSet<B256>,
    pub slots_queried: HashSet<(Address, U256)>,
    /// Trie node hashes recorded by the trie builders during finalization.
    pub hashes: HashSet<B256>,
}

/// One undo step.
#[derive(Debug)]
enum JournalEntry {
    /// The account was cached from the database; revert evicts it.
    AccountLoaded { address: Address },
    AccountTouched { address: Address },
    AccountWarmed { address: Address },
    StorageWarmed { address: Address, key: U256 },
    AccountDestroyed {
        address: Address,
        target: Address,
        was_destroyed: bool,
        had_balance: U256,
    },
    AccountCreated { address: Address, was_destroyed: bool },
    BalanceTransfer {
        from: Address,
        to: Address,
        balance: U256,
    },
    BalanceChange { address: Address, had_balance: U256 },
    NonceChange { address: Address, had_nonce: u64 },
    StorageChange {
        address: Address,
        key: U256,
        had_value: Option<U256>,
    },
    CodeChange {
        address: Address,
        had_code: Option<(B256, Bytes)>,
    },
}

/// Opaque snapshot token. Valid until its matching commit or revert.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JournalCheckpoint {
    journal_i: usize,
    log_i: usize,
}

#[derive(Debug, Default)]
pub struct JournaledState {
    /// The overlay. Presence here means the account is cached, not warm;
    /// warmth is tracked separately so it can reset per transaction.
    pub state: HashMap<Address, Account>,
    logs: Vec<Log>,
    journal: Vec<Vec<JournalEntry>>,
    spec_id: SpecId,
    /// EIP-2929 per-transaction access sets.
    warm_addresses: HashSet<Address>,
    warm_slots: HashSet<(Address, U256)>,
    witness: MetaWitness,
}

impl JournaledState {
    pub fn new(spec_id: SpecId) -> Self {
        Self {
            spec_id,
            ..Default::default()
        }
    }

    pub fn spec_id(&self) -> SpecId {
        self.spec_id
    }

    pub fn set_spec_id(&mut self, spec_id: SpecId) {
        self.spec_id = spec_id;
    }

    pub fn logs(&self) -> &[Log] {
        &self.logs
    }

    fn journal_frame(&mut self) -> &mut Vec<JournalEntry> {
        if self.journal.is_empty() {
            self.journal.push(Vec::new());
        }
        self.journal.last_mut().expect("frame pushed above")
    }

    //
    // Access sets (EIP-2929)
    //

    /// Clears the warm sets at a transaction boundary.
    pub fn reset_access_sets(&mut self) {
        self.warm_addresses.clear();
        self.warm_slots.clear();
    }

    pub fn is_address_warm(&self, address: &Address) -> bool {
        self.warm_addresses.contains(address)
    }

    pub fn is_storage_warm(&self, address: &Address, key: &U256) -> bool {
        self.warm_slots.contains(&(*address, *key))
    }

    /// Marks an address warm, returning whether it was cold before.
    pub fn mark_address_warm(&mut self, address: Address) -> bool {
        if self.warm_addresses.insert(address) {
            self.journal_frame()
                .push(JournalEntry::AccountWarmed { address });
            true
        } else {
            false
        }
    }

    pub fn mark_storage_warm(&mut self, address: Address, key: U256) -> bool {
        if self.warm_slots.insert((address, key)) {
            self.journal_frame()
                .push(JournalEntry::StorageWarmed { address, key });
            true
        } else {
            false
        }
    }

    //
    // Account loading
    //

    /// Loads (caching if needed) an account. Returns the account and whether
    /// the access was cold.
    pub fn load_account<DB: Database>(
        &mut self,
        address: Address,
        db: &mut DB,
    ) -> Result<(&mut Account, bool), DB::Error> {
        let is_cold = self.mark_address_warm(address);
        if !self.state.contains_key(&address) {
            let account = db
                .basic(address)?
                .map(|info| Account {
                    info,
                    ..Default::default()
                })
                .unwrap_or_else(Account::new_not_existing);
            self.witness.accounts_queried.insert(address);
            self.journal_frame()
                .push(JournalEntry::AccountLoaded { address });
            self.state.insert(address, account);
        }
        Ok((
            self.state.get_mut(&address).expect("inserted above"),
            is_cold,
        ))
    }

    /// Loads an account and reports `(is_cold, exists)`, where existence
    /// follows EIP-161 emptiness from Spurious Dragon on.
    pub fn load_account_exist<DB: Database>(
        &mut self,
        address: Address,
        db: &mut DB,
    ) -> Result<(bool, bool), DB::Error> {
        let spec_id = self.spec_id;
        let (account, is_cold) = self.load_account(address, db)?;
        let exists = if spec_id.enabled(SpecId::SPURIOUS_DRAGON) {
            !account.is_empty() && !account.is_destroyed
        } else {
            !account.is_not_existing && !account.is_destroyed
        };
        Ok((is_cold, exists))
    }

    /// Loads an account with its code filled in.
    pub fn load_code<DB: Database>(
        &mut self,
        address: Address,
        db: &mut DB,
    ) -> Result<(&mut Account, bool), DB::Error> {
        let (is_cold, needs_code) = {
            let (account, is_cold) = self.load_account(address, db)?;
            (is_cold, account.info.code.is_none())
        };
        if needs_code {
            let code_hash = self.state[&address].info.code_hash;
            let code = if code_hash == KECCAK_EMPTY {
                Bytes::new()
            } else {
                self.witness.bytecodes_queried.insert(code_hash);
                db.code_by_hash(code_hash)?
            };
            self.state
                .get_mut(&address)
                .expect("loaded above")
                .info
                .code = Some(code);
        }
        Ok((
            self.state.get_mut(&address).expect("loaded above"),
            is_cold,
        ))
    }

    //
    // Facade reads
    //

    pub fn account_exists<DB: Database>(
        &mut self,
        address: Address,
        db: &mut DB,
    ) -> Result<bool, DB::Error> {
        let (account, _) = self.load_account(address, db)?;
        Ok(!account.is_not_existing && !account.is_destroyed)
    }

    pub fn account_is_empty<DB: Database>(
        &mut self,
        address: Address,
        db: &mut DB,
    ) -> Result<bool, DB::Error> {
        let (account, _) = self.load_account(address, db)?;
        Ok(account.is_empty() || account.is_destroyed)
    }

    pub fn balance<DB: Database>(
        &mut self,
        address: Address,
        db: &mut DB,
    ) -> Result<U256, DB::Error> {
        let (account, _) = self.load_account(address, db)?;
        Ok(account.info.balance)
    }

    pub fn nonce<DB: Database>(
        &mut self,
        address: Address,
        db: &mut DB,
    ) -> Result<u64, DB::Error> {
        let (account, _) = self.load_account(address, db)?;
        Ok(account.info.nonce)
    }

    //
    // Mutations
    //

    /// Marks an account as touched for EIP-161 cleanup.
    pub fn touch(&mut self, address: &Address) {
        if let Some(account) = self.state.get_mut(address) {
            if !account.is_touched {
                account.is_touched = true;
                let address = *address;
                self.journal_frame()
                    .push(JournalEntry::AccountTouched { address });
            }
        }
    }

    pub fn set_balance<DB: Database>(
        &mut self,
        address: Address,
        balance: U256,
        db: &mut DB,
    ) -> Result<(), DB::Error> {
        self.load_account(address, db)?;
        let account = self.state.get_mut(&address).expect("loaded above");
        let had_balance = account.info.balance;
        account.info.balance = balance;
        account.is_touched = true;
        self.journal_frame()
            .push(JournalEntry::BalanceChange {
                address,
                had_balance,
            });
        Ok(())
    }

    /// Adds `delta` (which may be negative via wrapping semantics at the
    /// call sites; the façade only ever passes well-formed amounts).
    pub fn delta_balance<DB: Database>(
        &mut self,
        address: Address,
        delta: U256,
        db: &mut DB,
    ) -> Result<(), DB::Error> {
        let balance = self.balance(address, db)?;
        self.set_balance(address, balance.saturating_add(delta), db)
    }

    /// Increments the nonce, returning the new value, or `None` on overflow.
    pub fn inc_nonce(&mut self, address: Address) -> Option<u64> {
        let account = self.state.get_mut(&address)?;
        let had_nonce = account.info.nonce;
        let new_nonce = had_nonce.checked_add(1)?;
        account.info.nonce = new_nonce;
        account.is_touched = true;
        self.journal_frame()
            .push(JournalEntry::NonceChange { address, had_nonce });
        Some(new_nonce)
    }

    /// Sets the nonce outright; test fixtures and genesis loading use this.
    pub fn set_nonce<DB: Database>(
        &mut self,
        address: Address,
        nonce: u64,
        db: &mut DB,
    ) -> Result<(), DB::Error> {
        self.load_account(address, db)?;
        let account = self.state.get_mut(&address).expect("loaded above");
        let had_nonce = account.info.nonce;
        account.info.nonce = nonce;
        account.is_touched = true;
        self.journal_frame()
            .push(JournalEntry::NonceChange { address, had_nonce });
        Ok(())
    }

    pub fn set_code(&mut self, address: Address, code: Bytes) {
        let account = self.state.get_mut(&address).expect("account is loaded");
        account.is_touched = true;
        let had_code = account
            .info
            .code
            .clone()
            .map(|code| (account.info.code_hash, code));
        account.info.code_hash = if code.is_empty() {
            KECCAK_EMPTY
        } else {
            keccak256(&code)
        };
        account.info.code = Some(code);
        self.journal_frame()
            .push(JournalEntry::CodeChange { address, had_code });
    }

    /// Moves `balance` between two loaded-or-loadable accounts. Insufficient
    /// funds is a frame-level halt, not a database error.
    pub fn transfer<DB: Database>(
        &mut self,
        from: &Address,
        to: &Address,
        balance: U256,
        db: &mut DB,
    ) -> EvmResult<(), DB::Error> {
        self.load_account(*to, db)
            .map_err(EvmError::DatabaseFailure)?;
        self.load_account(*from, db)
            .map_err(EvmError::DatabaseFailure)?;

        let from_account = self.state.get_mut(from).expect("loaded above");
        from_account.is_touched = true;
        from_account.info.balance = from_account
            .info
            .balance
            .checked_sub(balance)
            .ok_or(EvmError::Halt(ExceptionalHalt::OutOfFund))?;

        let to_account = self.state.get_mut(to).expect("loaded above");
        to_account.is_touched = true;
        to_account.info.balance = to_account.info.balance.saturating_add(balance);

        self.journal_frame().push(JournalEntry::BalanceTransfer {
            from: *from,
            to: *to,
            balance,
        });
        // Both sides were touched.
        let frame = self.journal.last_mut().expect("frame exists");
        frame.push(JournalEntry::AccountTouched { address: *from });
        frame.push(JournalEntry::AccountTouched { address: *to });
        Ok(())
    }

    /// Creates the account for a new contract. Returns `false` on an address
    /// collision (existing code or nonce).
    pub fn create_account<DB: Database>(
        &mut self,
        address: Address,
        db: &mut DB,
    ) -> Result<bool, DB::Error> {
        let spec_id = self.spec_id;
        let (account, _) = self.load_account(address, db)?;

        if spec_id.enabled(SpecId::SPURIOUS_DRAGON) && account.info.has_code_or_nonce() {
            return Ok(false);
        }

        let was_destroyed = account.is_destroyed;
        account.is_created = true;
        account.is_destroyed = false;
        account.is_not_existing = false;
        account.is_touched = true;
        account.storage.clear();
        self.journal_frame()
            .push(JournalEntry::AccountCreated {
                address,
                was_destroyed,
            });
        Ok(true)
    }

    pub fn selfdestruct<DB: Database>(
        &mut self,
        address: Address,
        target: Address,
        db: &mut DB,
    ) -> Result<SelfDestructResult, DB::Error> {
        let (is_cold, target_exists) = self.load_account_exist(target, db)?;

        let account = self.state.get_mut(&address).expect("executing account is loaded");
        let had_balance = account.info.balance;
        let was_destroyed = account.is_destroyed;
        account.info.balance = U256::ZERO;
        account.is_destroyed = true;
        account.is_touched = true;

        // Balance moves even when target == address; it was zeroed above, so
        // a self-send burns.
        let target_account = self.state.get_mut(&target).expect("loaded above");
        target_account.is_touched = true;
        target_account.info.balance = target_account.info.balance.saturating_add(had_balance);

        self.journal_frame().push(JournalEntry::AccountDestroyed {
            address,
            target,
            was_destroyed,
            had_balance,
        });

        Ok(SelfDestructResult {
            had_value: !had_balance.is_zero(),
            target_exists,
            is_cold,
            previously_destroyed: was_destroyed,
        })
    }

    //
    // Storage
    //

    /// Reads a slot, reporting cold/warm per EIP-2929. The owning account is
    /// loaded as a side effect; per EIP-2929 note 2 that access is never
    /// charged here.
    pub fn sload<DB: Database>(
        &mut self,
        address: Address,
        key: U256,
        db: &mut DB,
    ) -> Result<(U256, bool), DB::Error> {
        self.load_account(address, db)?;
        let is_cold = self.mark_storage_warm(address, key);

        let is_created = self
            .state
            .get(&address)
            .map(|account| account.is_created || account.is_destroyed)
            .unwrap_or(false);

        if let Some(slot) = self.state.get(&address).and_then(|a| a.storage.get(&key)) {
            return Ok((slot.present_value, is_cold));
        }

        // Freshly created accounts never consult the database.
        let value = if is_created {
            U256::ZERO
        } else {
            self.witness.slots_queried.insert((address, key));
            db.storage(address, key)?
        };
        let account = self.state.get_mut(&address).expect("account is loaded");
        account.storage.insert(key, StorageSlot::new(value));
        self.journal_frame().push(JournalEntry::StorageChange {
            address,
            key,
            had_value: None,
        });
        Ok((value, is_cold))
    }

    /// Writes a slot; returns `(original, present, new, is_cold)` for the
    /// gas schedule.
    pub fn sstore<DB: Database>(
        &mut self,
        address: Address,
        key: U256,
        new: U256,
        db: &mut DB,
    ) -> Result<(U256, U256, U256, bool), DB::Error> {
        let (present, is_cold) = self.sload(address, key, db)?;
        let account = self.state.get_mut(&address).expect("loaded by sload");
        let slot = account.storage.get_mut(&key).expect("loaded by sload");
        let original = slot.original_value;
        if present != new {
            slot.present_value = new;
            self.journal_frame().push(JournalEntry::StorageChange {
                address,
                key,
                had_value: Some(present),
            });
        }
        Ok((original, present, new, is_cold))
    }

    //
    // Logs
    //

    pub fn log(&mut self, log: Log) {
        self.logs.push(log);
    }

    //
    // Snapshots
    //

    pub fn checkpoint(&mut self) -> JournalCheckpoint {
        let checkpoint = JournalCheckpoint {
            journal_i: self.journal.len(),
            log_i: self.logs.len(),
        };
        self.journal.push(Vec::new());
        checkpoint
    }

    /// Merges the newest frame into its parent.
    pub fn checkpoint_commit(&mut self) {
        let frame = self.journal.pop().expect("no checkpoint to commit");
        if let Some(parent) = self.journal.last_mut() {
            parent.extend(frame);
        } else {
            // Entries below the outermost checkpoint are locked in.
        }
    }

    /// Rolls back every change made since `checkpoint`. Panics on a stale
    /// token; that is a programmer error in the frame discipline.
    pub fn checkpoint_revert(&mut self, checkpoint: JournalCheckpoint) {
        assert!(
            checkpoint.journal_i <= self.journal.len() && checkpoint.log_i <= self.logs.len(),
            "stale snapshot token"
        );
        self.logs.truncate(checkpoint.log_i);
        while self.journal.len() > checkpoint.journal_i {
            let frame = self.journal.pop().expect("length checked");
            for entry in frame.into_iter().rev() {
                self.revert_entry(entry);
            }
        }
    }

    fn revert_entry(&mut self, entry: JournalEntry) {
        match entry {
            JournalEntry::AccountLoaded { address } => {
                self.state.remove(&address);
            }
            JournalEntry::AccountTouched { address } => {
                if let Some(account) = self.state.get_mut(&address) {
                    account.is_touched = false;
                }
            }
            JournalEntry::AccountWarmed { address } => {
                self.warm_addresses.remove(&address);
            }
            JournalEntry::StorageWarmed { address, key } => {
                self.warm_slots.remove(&(address, key));
            }
            JournalEntry::AccountDestroyed {
                address,
                target,
                was_destroyed,
                had_balance,
            } => {
                if address != target {
                    if let Some(target_account) = self.state.get_mut(&target) {
                        target_account.info.balance -= had_balance;
                    }
                }
                let account = self.state.get_mut(&address).expect("destroyed account is cached");
                account.is_destroyed = was_destroyed;
                account.info.balance += had_balance;
            }
            JournalEntry::AccountCreated {
                address,
                was_destroyed,
            } => {
                let account = self.state.get_mut(&address).expect("created account is cached");
                account.is_created = false;
                account.is_destroyed = was_destroyed;
                account.storage.clear();
            }
            JournalEntry::BalanceTransfer { from, to, balance } => {
                if let Some(to_account) = self.state.get_mut(&to) {
                    to_account.info.balance -= balance;
                }
                if let Some(from_account) = self.state.get_mut(&from) {
                    from_account.info.balance += balance;
                }
            }
            JournalEntry::BalanceChange {
                address,
                had_balance,
            } => {
                if let Some(account) = self.state.get_mut(&address) {
                    account.info.balance = had_balance;
                }
            }
            JournalEntry::NonceChange { address, had_nonce } => {
                if let Some(account) = self.state.get_mut(&address) {
                    account.info.nonce = had_nonce;
                }
            }
            JournalEntry::StorageChange {
                address,
                key,
                had_value,
            } => {
                if let Some(account) = self.state.get_mut(&address) {
                    match had_value {
                        // The slot was loaded fresh; evict so it reads cold
                        // again.
                        None => {
                            account.storage.remove(&key);
                        }
                        Some(value) => {
                            if let Some(slot) = account.storage.get_mut(&key) {
                                slot.present_value = value;
                            }
                        }
                    }
                }
            }
            JournalEntry::CodeChange { address, had_code } => {
                if let Some(account) = self.state.get_mut(&address) {
                    match had_code {
                        Some((hash, code)) => {
                            account.info.code_hash = hash;
                            account.info.code = Some(code);
                        }
                        None => {
                            account.info.code_hash = KECCAK_EMPTY;
                            account.info.code = Some(Bytes::new());
                        }
                    }
                }
            }
        }
    }

    /// Locks in everything recorded so far: after this nothing can revert
    /// past the current state, which is how transaction boundaries are
    /// enforced. Any outstanding checkpoint tokens become stale.
    pub fn lock_changes(&mut self) {
        self.journal.clear();
    }

    /// Deletes every account touched this transaction that ended up empty
    /// (EIP-161). The deletions themselves are locked in by the caller.
    pub fn clear_touched_empty_accounts(&mut self) -> Vec<Address> {
        let mut cleared = Vec::new();
        for (address, account) in self.state.iter_mut() {
            if account.is_touched && account.is_empty() && !account.is_destroyed {
                account.is_destroyed = true;
                account.storage.clear();
                cleared.push(*address);
            }
        }
        cleared
    }

    /// Removes an account outright. Used between transactions (withdrawal
    /// cleanup), so no journal entry is recorded.
    pub fn delete_account(&mut self, address: Address) {
        if let Some(account) = self.state.get_mut(&address) {
            account.info = crate::models::AccountInfo::default();
            account.storage.clear();
            account.is_destroyed = true;
        }
    }

    /// Flushes queued deletions to the database and evicts them from the
    /// cache, so later transactions in the block observe the deletion
    /// instead of crediting a doomed account.
    pub fn commit_destroyed<DB: DatabaseCommit>(&mut self, db: &mut DB) {
        let addresses: Vec<Address> = self
            .state
            .iter()
            .filter(|(_, account)| account.is_destroyed)
            .map(|(address, _)| *address)
            .collect();
        if addresses.is_empty() {
            return;
        }
        let mut destroyed = HashMap::new();
        for address in addresses {
            if let Some(account) = self.state.remove(&address) {
                destroyed.insert(address, account);
            }
        }
        db.commit(destroyed);
    }

    /// Resets per-transaction flags. Called after a transaction commits.
    pub fn end_transaction(&mut self) {
        for account in self.state.values_mut() {
            account.is_touched = false;
        }
        self.reset_access_sets();
        self.lock_changes();
    }

    /// Flushes the buffered state into the database and returns the witness
    /// of everything read. Open checkpoints are locked in; their tokens go
    /// stale.
    pub fn persist<DB: DatabaseCommit>(&mut self, db: &mut DB) -> MetaWitness {
        let state = core::mem::take(&mut self.state);
        db.commit(state);
        self.logs.clear();
        self.journal.clear();
        self.reset_access_sets();
        core::mem::take(&mut self.witness)
    }

    /// Logs emitted since `checkpoint` was taken; used to build receipts.
    pub fn logs_since(&self, log_i: usize) -> &[Log] {
        &self.logs[log_i..]
    }

    pub fn log_count(&self) -> usize {
        self.logs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryDB;

    fn addr(x: u8) -> Address {
        Address::repeat_byte(x)
    }

    fn funded_state(balance: u64) -> (JournaledState, InMemoryDB) {
        let mut db = InMemoryDB::default();
        db.insert_account_info(addr(1), AccountInfo::from_balance(U256::from(balance)));
        (JournaledState::new(SpecId::BERLIN), db)
    }

    #[test]
    fn revert_restores_balances_and_warmth() {
        let (mut state, mut db) = funded_state(100);

        state.load_account(addr(1), &mut db).unwrap();
        let checkpoint = state.checkpoint();
        state
            .transfer(&addr(1), &addr(2), U256::from(40), &mut db)
            .unwrap();
        state.mark_storage_warm(addr(1), U256::from(7));
        assert!(state.is_address_warm(&addr(2)));
        assert_eq!(state.balance(addr(2), &mut db).unwrap(), U256::from(40));

        state.checkpoint_revert(checkpoint);
        assert_eq!(state.balance(addr(1), &mut db).unwrap(), U256::from(100));
        // warm/cold observability is part of the snapshot
        assert!(!state.is_address_warm(&addr(2)));
        assert!(!state.is_storage_warm(&addr(1), &U256::from(7)));
    }

    #[test]
    fn transfer_with_insufficient_funds_is_a_halt() {
        let (mut state, mut db) = funded_state(10);
        state.load_account(addr(1), &mut db).unwrap();
        let result = state.transfer(&addr(1), &addr(2), U256::from(11), &mut db);
        assert!(matches!(
            result,
            Err(EvmError::Halt(ExceptionalHalt::OutOfFund))
        ));
    }

    #[test]
    fn sload_revert_restores_cold_slot() {
        let (mut state, mut db) = funded_state(0);
        db.insert_account_storage(addr(1), U256::from(5), U256::from(42));

        state.load_account(addr(1), &mut db).unwrap();
        let checkpoint = state.checkpoint();
        let (value, is_cold) = state.sload(addr(1), U256::from(5), &mut db).unwrap();
        assert_eq!(value, U256::from(42));
        assert!(is_cold);
        let (_, is_cold) = state.sload(addr(1), U256::from(5), &mut db).unwrap();
        assert!(!is_cold);

        state.checkpoint_revert(checkpoint);
        let (_, is_cold) = state.sload(addr(1), U256::from(5), &mut db).unwrap();
        assert!(is_cold, "revert must restore the cold state");
    }

    #[test]
    fn sstore_reports_original_and_present() {
        let (mut state, mut db) = funded_state(0);
        db.insert_account_storage(addr(1), U256::ZERO, U256::from(1));

        state.load_account(addr(1), &mut db).unwrap();
        state.checkpoint();
        let (original, present, new, _) = state
            .sstore(addr(1), U256::ZERO, U256::from(2), &mut db)
            .unwrap();
        assert_eq!((original, present, new), (U256::from(1), U256::from(1), U256::from(2)));
        let (original, present, new, _) = state
            .sstore(addr(1), U256::ZERO, U256::from(3), &mut db)
            .unwrap();
        assert_eq!((original, present, new), (U256::from(1), U256::from(2), U256::from(3)));
    }

    #[test]
    fn selfdestruct_moves_balance_and_reverts() {
        let (mut state, mut db) = funded_state(55);
        state.load_account(addr(1), &mut db).unwrap();
        let checkpoint = state.checkpoint();

        let res = state.selfdestruct(addr(1), addr(9), &mut db).unwrap();
        assert!(res.had_value);
        assert!(!res.previously_destroyed);
        assert_eq!(state.balance(addr(9), &mut db).unwrap(), U256::from(55));
        assert_eq!(state.balance(addr(1), &mut db).unwrap(), U256::ZERO);

        state.checkpoint_revert(checkpoint);
        assert_eq!(state.balance(addr(1), &mut db).unwrap(), U256::from(55));
        assert_eq!(state.balance(addr(9), &mut db).unwrap(), U256::ZERO);
    }

    #[test]
    fn eip161_sweep_deletes_touched_empties() {
        let (mut state, mut db) = funded_state(10);
        state.load_account(addr(1), &mut db).unwrap();
        state.checkpoint();
        // zero-value transfer touches the target without funding it
        state
            .transfer(&addr(1), &addr(3), U256::ZERO, &mut db)
            .unwrap();
        state.checkpoint_commit();

        let cleared = state.clear_touched_empty_accounts();
        assert_eq!(cleared, vec![addr(3)]);
        assert!(!state.account_exists(addr(3), &mut db).unwrap());
    }

    #[test]
    fn nonce_change_reverts() {
        let (mut state, mut db) = funded_state(0);
        state.load_account(addr(1), &mut db).unwrap();
        let checkpoint = state.checkpoint();
        assert_eq!(state.inc_nonce(addr(1)), Some(1));
        state.checkpoint_revert(checkpoint);
        assert_eq!(state.nonce(addr(1), &mut db).unwrap(), 0);
    }
}
