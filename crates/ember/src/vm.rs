//! The block driver: applies transactions and withdrawals against a header
//! under construction, assigns rewards, and seals blocks with their trie
//! roots.

use crate::block::{
    logs_bloom, uncles_hash, Block, Header, Receipt, ReceiptOutcome, Transaction, Withdrawal,
};
use crate::db::{ChainDb, StateDatabase};
use crate::evm;
use crate::evm_impl::TransactionError;
use crate::interpreter::Contract;
use crate::journaled_state::{JournaledState, MetaWitness};
use crate::models::{BlockEnv, CfgEnv, Computation, Env, TxEnv};
use crate::specification::ForkSchedule;
use crate::trie;
use crate::validation::{
    validate_block_uncles, validate_header, validate_receipt, ValidationError,
};
use crate::{Address, Bytes, SpecId, B256, U256};
use core::fmt::Debug;
use tracing::{debug, trace};

/// Seal rules and fee-recipient selection are consensus concerns; the VM
/// only forwards to them.
pub trait ConsensusEngine {
    fn get_fee_recipient(&self, header: &Header) -> Address {
        header.coinbase
    }

    fn validate_seal(&self, header: &Header) -> Result<(), ValidationError>;

    fn validate_seal_extension(
        &self,
        header: &Header,
        parents: &[Header],
    ) -> Result<(), ValidationError>;
}

/// Accepts any seal; what test chains and post-merge execution-layer checks
/// want.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProof;

impl ConsensusEngine for NoProof {
    fn validate_seal(&self, _header: &Header) -> Result<(), ValidationError> {
        Ok(())
    }

    fn validate_seal_extension(
        &self,
        _header: &Header,
        _parents: &[Header],
    ) -> Result<(), ValidationError> {
        Ok(())
    }
}

/// Anything that can go wrong while driving a block.
#[derive(Debug, thiserror::Error)]
pub enum VmError<DE: Debug> {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Transaction(TransactionError<DE>),
}

impl<DE: Debug> VmError<DE> {
    /// Whether the failure came from the state backend rather than the
    /// transaction itself.
    pub fn is_missing_data(&self) -> bool {
        matches!(self, Self::Transaction(TransactionError::DatabaseFailure(_)))
    }
}

/// Lazy walk over up to 256 ancestor hashes, newest first.
pub struct PrevHashes<'a, CDB: ChainDb> {
    chain_db: &'a CDB,
    next: Option<B256>,
    remaining: usize,
}

impl<'a, CDB: ChainDb> Iterator for PrevHashes<'a, CDB> {
    type Item = B256;

    fn next(&mut self) -> Option<B256> {
        if self.remaining == 0 {
            return None;
        }
        let hash = self.next.take()?;
        let header = self.chain_db.get_block_header_by_hash(hash)?;
        self.remaining -= 1;
        if header.number > 0 {
            self.next = Some(header.parent_hash);
        }
        Some(hash)
    }
}

/// Pre-merge issuance per block, by fork.
fn block_reward(spec_id: SpecId) -> U256 {
    if spec_id.enabled(SpecId::CONSTANTINOPLE) {
        // EIP-1234
        U256::from(2_000_000_000_000_000_000u64)
    } else if spec_id.enabled(SpecId::BYZANTIUM) {
        // EIP-649
        U256::from(3_000_000_000_000_000_000u64)
    } else {
        U256::from(5_000_000_000_000_000_000u64)
    }
}

/// One VM instance drives exactly one block.
pub struct Vm<'a, DB: StateDatabase, CDB: ChainDb, C: ConsensusEngine> {
    header: Header,
    cfg: CfgEnv,
    schedule: ForkSchedule,
    state: JournaledState,
    db: &'a mut DB,
    chain_db: &'a mut CDB,
    consensus: C,
    witness: MetaWitness,
}

impl<'a, DB: StateDatabase, CDB: ChainDb, C: ConsensusEngine> Vm<'a, DB, CDB, C> {
    /// `header` is the candidate header of the block being built or
    /// imported.
    pub fn new(
        header: Header,
        db: &'a mut DB,
        chain_db: &'a mut CDB,
        consensus: C,
        schedule: ForkSchedule,
        cfg: CfgEnv,
    ) -> Self {
        let spec_id = schedule.spec_at(header.number, header.timestamp);
        Self {
            header,
            cfg,
            schedule,
            state: JournaledState::new(spec_id),
            db,
            chain_db,
            consensus,
            witness: MetaWitness::default(),
        }
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn state(&mut self) -> &mut JournaledState {
        &mut self.state
    }

    pub fn spec_id(&self) -> SpecId {
        self.schedule
            .spec_at(self.header.number, self.header.timestamp)
    }

    /// Up to 256 ancestor hashes, parent first.
    pub fn previous_hashes(&self) -> PrevHashes<'_, CDB> {
        PrevHashes {
            chain_db: self.chain_db,
            next: Some(self.header.parent_hash),
            remaining: 256,
        }
    }

    fn block_env(&self) -> BlockEnv {
        let spec_id = self.spec_id();
        BlockEnv {
            number: U256::from(self.header.number),
            coinbase: self.consensus.get_fee_recipient(&self.header),
            timestamp: U256::from(self.header.timestamp),
            difficulty: self.header.difficulty,
            prevrandao: spec_id
                .enabled(SpecId::MERGE)
                .then_some(self.header.mix_hash),
            basefee: U256::from(self.header.base_fee_per_gas.unwrap_or_default()),
            gas_limit: U256::from(self.header.gas_limit),
        }
    }

    fn env_for(&self, tx: TxEnv) -> Env {
        Env {
            cfg: self.cfg.clone(),
            block: self.block_env(),
            tx,
        }
    }

    /// The cumulative block gas budget check done before execution.
    pub fn validate_transaction_against_header(
        &self,
        transaction: &Transaction,
    ) -> Result<(), ValidationError> {
        if self.header.gas_used + transaction.gas_limit > self.header.gas_limit {
            return Err(ValidationError::TransactionExceedsBlockGasLimit);
        }
        Ok(())
    }

    /// Applies one transaction: on success the receipt and the computation
    /// trace; the header accumulates gas and bloom. Validation failures and
    /// missing state data leave the world state untouched.
    pub fn apply_transaction(
        &mut self,
        transaction: &Transaction,
    ) -> Result<(Receipt, Computation), VmError<DB::Error>> {
        self.validate_transaction_against_header(transaction)?;

        // A new transaction begins: nothing before it may unwind.
        self.state.end_transaction();

        let spec_id = self.spec_id();
        let mut env = self.env_for(transaction.tx_env());
        let checkpoint = self.state.checkpoint();

        let result = match evm::transact(spec_id, &mut env, &mut self.state, self.db) {
            Ok(result) => {
                self.state.checkpoint_commit();
                result
            }
            Err(error) => {
                // Undo account cache warming and, for a database failure,
                // every partial effect of the transaction.
                self.state.checkpoint_revert(checkpoint);
                return Err(VmError::Transaction(error));
            }
        };

        // Deletions become visible to the rest of the block right away; a
        // later transaction crediting the address starts a fresh account.
        self.state.commit_destroyed(self.db);

        let outcome = if spec_id.enabled(SpecId::BYZANTIUM) {
            ReceiptOutcome::Status(result.is_success())
        } else {
            // Pre-Byzantium receipts commit to the intermediate state root.
            ReceiptOutcome::Root(self.make_state_root())
        };

        let receipt = Receipt {
            tx_type: transaction.tx_type,
            outcome,
            cumulative_gas_used: self.header.gas_used + result.gas_used,
            bloom: logs_bloom(result.logs.iter()),
            logs: result.logs.clone(),
        };
        validate_receipt(&receipt)?;

        self.header.gas_used = receipt.cumulative_gas_used;
        self.header.bloom.accrue_bloom(&receipt.bloom);

        Ok((receipt, result.computation))
    }

    /// Folds `apply_transaction` over a block body. A missing-data failure
    /// has already rolled the offending transaction back when it propagates.
    pub fn apply_all_transactions(
        &mut self,
        transactions: &[Transaction],
    ) -> Result<(Vec<Receipt>, Vec<Computation>), VmError<DB::Error>> {
        let mut receipts = Vec::with_capacity(transactions.len());
        let mut computations = Vec::with_capacity(transactions.len());
        for (index, transaction) in transactions.iter().enumerate() {
            let (receipt, computation) = self.apply_transaction(transaction)?;
            debug!(
                index,
                hash = %transaction.hash(),
                cumulative_gas = receipt.cumulative_gas_used,
                "transaction applied"
            );
            receipts.push(receipt);
            computations.push(computation);
        }
        Ok((receipts, computations))
    }

    /// The read-only bytecode harness: runs `code` as if deployed at `to`,
    /// then rolls every state effect back.
    #[allow(clippy::too_many_arguments)]
    pub fn execute_bytecode(
        &mut self,
        origin: Option<Address>,
        gas_price: U256,
        gas: u64,
        to: Address,
        sender: Address,
        value: U256,
        data: Bytes,
        code: Bytes,
        code_address: Option<Address>,
    ) -> Result<Computation, VmError<DB::Error>> {
        let spec_id = self.spec_id();
        let mut env = self.env_for(TxEnv {
            caller: origin.unwrap_or(sender),
            gas_price,
            gas_limit: gas,
            ..TxEnv::default()
        });

        let mut contract = Contract::new(data, code, to, sender, value);
        contract.code_address = code_address;

        let checkpoint = self.state.checkpoint();
        let result = evm::execute_bytecode(
            spec_id,
            &mut env,
            &mut self.state,
            self.db,
            contract,
            gas,
        );
        self.state.checkpoint_revert(checkpoint);
        result.map_err(|error| VmError::Transaction(TransactionError::from(error)))
    }

    /// Runs `f` against a state whose fees are forced to zero; every change,
    /// including header accumulation, is discarded when the closure returns.
    pub fn in_costless_state<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let spec_id = self.spec_id();
        let saved_state = core::mem::replace(&mut self.state, JournaledState::new(spec_id));
        let saved_header = self.header.clone();
        let saved_costless = self.cfg.costless;

        if self.header.base_fee_per_gas.is_some() {
            self.header.base_fee_per_gas = Some(0);
        }
        self.cfg.costless = true;

        let result = f(self);

        // The scratch state is dropped wholesale; nothing persists.
        self.state = saved_state;
        self.header = saved_header;
        self.cfg.costless = saved_costless;
        result
    }

    //
    // Withdrawals (EIP-4895)
    //

    pub fn apply_withdrawal(&mut self, withdrawal: &Withdrawal) -> Result<(), VmError<DB::Error>> {
        self.state
            .delta_balance(withdrawal.address, withdrawal.amount_wei(), self.db)
            .map_err(|e| VmError::Transaction(TransactionError::DatabaseFailure(e)))?;
        self.state.touch(&withdrawal.address);
        trace!(address = %withdrawal.address, amount_gwei = withdrawal.amount, "withdrawal applied");
        Ok(())
    }

    /// Credits every withdrawal, then deletes any credited address that is
    /// still empty (an amount of zero does not resurrect an empty account).
    pub fn apply_all_withdrawals(
        &mut self,
        withdrawals: &[Withdrawal],
    ) -> Result<(), VmError<DB::Error>> {
        let mut touched_addresses: Vec<Address> = Vec::new();
        for withdrawal in withdrawals {
            self.apply_withdrawal(withdrawal)?;
            if !touched_addresses.contains(&withdrawal.address) {
                touched_addresses.push(withdrawal.address);
            }
        }
        for address in touched_addresses {
            let empty = self
                .state
                .account_is_empty(address, self.db)
                .map_err(|e| VmError::Transaction(TransactionError::DatabaseFailure(e)))?;
            if empty {
                self.state.delete_account(address);
            }
        }
        Ok(())
    }

    //
    // Rewards
    //

    fn assign_block_rewards(&mut self, block: &Block) -> Result<(), DB::Error> {
        let spec_id = self.spec_id();
        let base_reward = block_reward(spec_id);
        let nephew_reward = base_reward / U256::from(32);
        let reward = base_reward + U256::from(block.uncles.len()) * nephew_reward;

        // The coinbase is touched even when the reward is zero so EIP-161
        // cleanup stays consistent post-merge.
        self.state.delta_balance(block.header.coinbase, reward, self.db)?;
        self.state.touch(&block.header.coinbase);
        debug!(reward = %reward, coinbase = %block.header.coinbase, "block reward");

        for uncle in &block.uncles {
            // Uncle depth is validated separately; saturate rather than
            // underflow on garbage input.
            let distance_factor = (uncle.number + 8).saturating_sub(block.header.number);
            let uncle_reward = U256::from(distance_factor) * base_reward / U256::from(8);
            self.state
                .delta_balance(uncle.coinbase, uncle_reward, self.db)?;
            self.state.touch(&uncle.coinbase);
            debug!(reward = %uncle_reward, coinbase = %uncle.coinbase, "uncle reward");
        }
        Ok(())
    }

    //
    // Sealing
    //

    /// Persists the buffered state and returns the current state root.
    fn make_state_root(&mut self) -> B256 {
        let witness = self.state.persist(self.db);
        self.merge_witness(witness);
        self.db.state_root()
    }

    fn merge_witness(&mut self, witness: MetaWitness) {
        self.witness.accounts_queried.extend(witness.accounts_queried);
        self.witness.bytecodes_queried.extend(witness.bytecodes_queried);
        self.witness.slots_queried.extend(witness.slots_queried);
        self.witness.hashes.extend(witness.hashes);
    }

    /// Executes a complete block body against this VM's header, seals the
    /// trie roots, assigns rewards, and returns the finalized block with the
    /// witness of every read.
    pub fn import_block(&mut self, block: &Block) -> Result<(Block, MetaWitness), VmError<DB::Error>> {
        if self.header.number != block.header.number {
            return Err(ValidationError::WrongBlockNumber {
                expected: self.header.number,
                got: block.header.number,
            }
            .into());
        }

        // Adopt the candidate's header parameters; execution results are
        // filled in below.
        self.header = Header {
            parent_hash: self.header.parent_hash,
            uncles_hash: uncles_hash(&block.uncles),
            coinbase: block.header.coinbase,
            state_root: self.header.state_root,
            transaction_root: trie::EMPTY_ROOT,
            receipt_root: trie::EMPTY_ROOT,
            bloom: Default::default(),
            difficulty: block.header.difficulty,
            number: block.header.number,
            gas_limit: block.header.gas_limit,
            gas_used: 0,
            timestamp: block.header.timestamp,
            extra_data: block.header.extra_data.clone(),
            mix_hash: block.header.mix_hash,
            nonce: block.header.nonce,
            base_fee_per_gas: block.header.base_fee_per_gas,
            withdrawals_root: None,
        };

        let (receipts, _computations) = self.apply_all_transactions(&block.transactions)?;

        if let Some(withdrawals) = &block.withdrawals {
            self.apply_all_withdrawals(withdrawals)?;
        }

        // Trie roots of the block body; the nodes go to the chain database.
        let (tx_root, tx_nodes) = trie::ordered_trie_root_and_nodes(
            block.transactions.iter().map(|tx| tx.encoded().to_vec()),
        );
        self.witness.hashes.extend(tx_nodes.keys().copied());
        self.chain_db.persist_trie_data_dict(tx_nodes);

        let (receipt_root, receipt_nodes) = trie::ordered_trie_root_and_nodes(
            receipts.iter().map(|receipt| receipt.encoded().to_vec()),
        );
        self.witness.hashes.extend(receipt_nodes.keys().copied());
        self.chain_db.persist_trie_data_dict(receipt_nodes);

        self.header.transaction_root = tx_root;
        self.header.receipt_root = receipt_root;

        if let Some(withdrawals) = &block.withdrawals {
            let (withdrawals_root, withdrawal_nodes) = trie::ordered_trie_root_and_nodes(
                withdrawals
                    .iter()
                    .map(|withdrawal| alloy_rlp::encode(withdrawal)),
            );
            self.witness.hashes.extend(withdrawal_nodes.keys().copied());
            self.chain_db.persist_trie_data_dict(withdrawal_nodes);
            self.header.withdrawals_root = Some(withdrawals_root);
        }

        // Issuance, for chains still mining; post-merge the zero-difficulty
        // rule turns it off but the coinbase still gets touched.
        if block.header.number > 0 {
            self.state.lock_changes();
            if !block.header.is_post_merge() {
                self.assign_block_rewards(block)
                    .map_err(|e| VmError::Transaction(TransactionError::DatabaseFailure(e)))?;
            } else {
                self.state
                    .load_account(block.header.coinbase, self.db)
                    .map_err(|e| VmError::Transaction(TransactionError::DatabaseFailure(e)))?;
                self.state.touch(&block.header.coinbase);
            }
            // A zero-reward touch can leave the coinbase (or a withdrawal
            // target) empty; EIP-161 removes it.
            if self.spec_id().enabled(SpecId::SPURIOUS_DRAGON) {
                self.state.clear_touched_empty_accounts();
            }
        }

        self.header.state_root = self.make_state_root();

        let final_block = Block {
            header: self.header.clone(),
            transactions: block.transactions.clone(),
            uncles: block.uncles.clone(),
            withdrawals: block.withdrawals.clone(),
        };

        self.validate_block(&final_block)?;

        debug!(
            number = final_block.header.number,
            hash = %final_block.header.hash(),
            accounts = self.witness.accounts_queried.len(),
            slots = self.witness.slots_queried.len(),
            "block imported"
        );

        Ok((final_block, core::mem::take(&mut self.witness)))
    }

    //
    // Validation
    //

    pub fn validate_block(&mut self, block: &Block) -> Result<(), ValidationError> {
        if block.header.number > 0 {
            let parent = self
                .chain_db
                .get_parent_header(&block.header)
                .ok_or(ValidationError::MissingParent)?;
            validate_header(&block.header, &parent)?;
        } else if block.header.extra_data.len() > crate::validation::MAX_EXTRA_DATA_BYTES {
            return Err(ValidationError::ExtraDataTooLong {
                got: block.header.extra_data.len(),
                limit: crate::validation::MAX_EXTRA_DATA_BYTES,
            });
        }

        let tx_root = trie::ordered_trie_root(
            block.transactions.iter().map(|tx| tx.encoded().to_vec()),
        );
        if tx_root != block.header.transaction_root {
            return Err(ValidationError::TransactionRootMismatch);
        }

        validate_block_uncles(block)?;

        if !self.chain_db.exists(block.header.state_root)
            && self.db.state_root() != block.header.state_root
        {
            return Err(ValidationError::StateRootMismatch);
        }

        Ok(())
    }

    pub fn validate_seal(&self, header: &Header) -> Result<(), ValidationError> {
        self.consensus.validate_seal(header)
    }

    pub fn validate_seal_extension(
        &self,
        header: &Header,
        parents: &[Header],
    ) -> Result<(), ValidationError> {
        self.consensus.validate_seal_extension(header, parents)
    }
}
