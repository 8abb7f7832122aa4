//! Driver-level scenarios: whole blocks through `import_block`, rewards,
//! withdrawals, the costless harness and validation plumbing.

use ember::block::{Block, Header, ReceiptOutcome, Transaction, TxType, Withdrawal};
use ember::db::{ChainDb, Database, DatabaseCommit, InMemoryChainDb, InMemoryDB, StateDatabase};
use ember::instructions::opcode;
use ember::journaled_state::Account;
use ember::{trie, AccountInfo, Address, Bytes, CfgEnv, ForkSchedule, NoProof, Vm, B256, U256};
use hashbrown::HashMap;

const ETHER: u64 = 1_000_000_000_000_000_000;
const GWEI: u64 = 1_000_000_000;

fn sender() -> Address {
    Address::repeat_byte(0xaa)
}

fn recipient() -> Address {
    Address::repeat_byte(0xbb)
}

fn coinbase() -> Address {
    Address::repeat_byte(0xcc)
}

/// Pre-merge chain: London rules, still mining.
fn mining_schedule() -> ForkSchedule {
    ForkSchedule {
        merge_block: None,
        shanghai_time: None,
        ..ForkSchedule::all_from_genesis()
    }
}

/// Post-merge chain without Shanghai.
fn merge_schedule() -> ForkSchedule {
    ForkSchedule {
        shanghai_time: None,
        ..ForkSchedule::all_from_genesis()
    }
}

fn homestead_schedule() -> ForkSchedule {
    ForkSchedule {
        tangerine_block: u64::MAX,
        spurious_dragon_block: u64::MAX,
        byzantium_block: u64::MAX,
        constantinople_block: u64::MAX,
        petersburg_block: u64::MAX,
        istanbul_block: u64::MAX,
        berlin_block: u64::MAX,
        london_block: u64::MAX,
        merge_block: None,
        shanghai_time: None,
        ..ForkSchedule::all_from_genesis()
    }
}

struct Fixture {
    db: InMemoryDB,
    chain_db: InMemoryChainDb,
    candidate: Header,
}

fn fixture(difficulty: u64) -> Fixture {
    let mut db = InMemoryDB::default();
    db.insert_account_info(
        sender(),
        AccountInfo::from_balance(U256::from(10) * U256::from(ETHER)),
    );

    let parent = Header {
        number: 0,
        timestamp: 50,
        gas_limit: 8_000_000,
        ..Header::default()
    };
    let mut chain_db = InMemoryChainDb::default();
    let parent_hash = chain_db.insert_header(parent);

    let candidate = Header {
        parent_hash,
        number: 1,
        timestamp: 60,
        gas_limit: 8_000_000,
        coinbase: coinbase(),
        difficulty: U256::from(difficulty),
        ..Header::default()
    };

    Fixture {
        db,
        chain_db,
        candidate,
    }
}

fn transfer(nonce: u64, value: U256) -> Transaction {
    Transaction {
        tx_type: TxType::Legacy,
        nonce,
        gas_price: U256::from(GWEI),
        gas_limit: 21_000,
        to: Some(recipient()),
        value,
        sender: sender(),
        ..Transaction::default()
    }
}

#[test]
fn empty_pre_merge_block_pays_constantinople_reward() {
    let Fixture {
        mut db,
        mut chain_db,
        candidate,
    } = fixture(1);

    let block = Block {
        header: candidate.clone(),
        ..Block::default()
    };
    let mut vm = Vm::new(
        candidate,
        &mut db,
        &mut chain_db,
        NoProof,
        mining_schedule(),
        CfgEnv::default(),
    );
    let (final_block, witness) = vm.import_block(&block).unwrap();

    // EIP-1234 reward
    assert_eq!(
        db.basic(coinbase()).unwrap().unwrap().balance,
        U256::from(2) * U256::from(ETHER)
    );
    assert_eq!(final_block.header.transaction_root, trie::EMPTY_ROOT);
    assert_eq!(final_block.header.receipt_root, trie::EMPTY_ROOT);
    assert_eq!(final_block.header.state_root, db.state_root());
    assert!(witness.accounts_queried.contains(&coinbase()));
}

#[test]
fn uncle_rewards_follow_the_distance_formula() {
    let Fixture {
        mut db,
        mut chain_db,
        candidate,
    } = fixture(1);

    let uncle_coinbase = Address::repeat_byte(0xdd);
    let uncle = Header {
        number: 0,
        coinbase: uncle_coinbase,
        ..Header::default()
    };
    let block = Block {
        header: candidate.clone(),
        uncles: vec![uncle],
        ..Block::default()
    };

    let mut vm = Vm::new(
        candidate,
        &mut db,
        &mut chain_db,
        NoProof,
        mining_schedule(),
        CfgEnv::default(),
    );
    vm.import_block(&block).unwrap();

    // nephew bonus: base + base/32
    let base = U256::from(2) * U256::from(ETHER);
    assert_eq!(
        db.basic(coinbase()).unwrap().unwrap().balance,
        base + base / U256::from(32)
    );
    // uncle at distance 1: (number + 8 - block) * base / 8 = 7/8 base
    assert_eq!(
        db.basic(uncle_coinbase).unwrap().unwrap().balance,
        U256::from(7) * base / U256::from(8)
    );
}

#[test]
fn post_merge_block_touches_but_does_not_pay_coinbase() {
    let Fixture {
        mut db,
        mut chain_db,
        candidate,
    } = fixture(0);

    let block = Block {
        header: candidate.clone(),
        ..Block::default()
    };
    let mut vm = Vm::new(
        candidate,
        &mut db,
        &mut chain_db,
        NoProof,
        merge_schedule(),
        CfgEnv::default(),
    );
    vm.import_block(&block).unwrap();

    // no reward, and the empty touched coinbase was cleaned up (EIP-161)
    assert_eq!(db.basic(coinbase()).unwrap(), None);
}

#[test]
fn block_with_transfer_seals_roots_and_gas() {
    let run = || {
        let Fixture {
            mut db,
            mut chain_db,
            candidate,
        } = fixture(0);

        let block = Block {
            header: candidate.clone(),
            transactions: vec![transfer(0, U256::from(ETHER))],
            ..Block::default()
        };
        let mut vm = Vm::new(
            candidate,
            &mut db,
            &mut chain_db,
            NoProof,
            merge_schedule(),
            CfgEnv::default(),
        );
        let (final_block, _) = vm.import_block(&block).unwrap();

        assert_eq!(final_block.header.gas_used, 21_000);
        assert_ne!(final_block.header.transaction_root, trie::EMPTY_ROOT);
        assert_ne!(final_block.header.receipt_root, trie::EMPTY_ROOT);
        assert_eq!(
            db.basic(recipient()).unwrap().unwrap().balance,
            U256::from(ETHER)
        );
        // the trie nodes that back the roots were handed to the chain db
        assert!(chain_db.exists(final_block.header.transaction_root));
        assert!(chain_db.exists(final_block.header.receipt_root));
        final_block.header.state_root
    };

    // identical inputs, identical roots
    assert_eq!(run(), run());
}

#[test]
fn driver_receipts_accumulate_gas_and_bloom() {
    let Fixture {
        mut db,
        mut chain_db,
        candidate,
    } = fixture(0);

    let mut vm = Vm::new(
        candidate,
        &mut db,
        &mut chain_db,
        NoProof,
        merge_schedule(),
        CfgEnv::default(),
    );

    let (first, computation) = vm.apply_transaction(&transfer(0, U256::from(ETHER))).unwrap();
    assert_eq!(first.cumulative_gas_used, 21_000);
    assert_eq!(first.outcome, ReceiptOutcome::Status(true));
    assert!(first.logs.is_empty());
    assert_eq!(computation.frame_count(), 1);
    assert_eq!(vm.header().gas_used, 21_000);

    let (second, _) = vm.apply_transaction(&transfer(1, U256::from(ETHER))).unwrap();
    assert_eq!(second.cumulative_gas_used, 42_000);
    assert_eq!(vm.header().gas_used, 42_000);
}

#[test]
fn homestead_receipts_carry_state_roots() {
    let Fixture {
        mut db,
        mut chain_db,
        candidate,
    } = fixture(1);

    let mut vm = Vm::new(
        candidate,
        &mut db,
        &mut chain_db,
        NoProof,
        homestead_schedule(),
        CfgEnv::default(),
    );
    let (receipt, _) = vm.apply_transaction(&transfer(0, U256::from(ETHER))).unwrap();
    match receipt.outcome {
        ReceiptOutcome::Root(root) => assert_ne!(root, trie::EMPTY_ROOT),
        ReceiptOutcome::Status(_) => panic!("pre-Byzantium receipts commit to a state root"),
    }
}

#[test]
fn transaction_over_block_gas_budget_is_rejected() {
    let Fixture {
        mut db,
        mut chain_db,
        mut candidate,
    } = fixture(0);
    candidate.gas_limit = 30_000;

    let mut vm = Vm::new(
        candidate,
        &mut db,
        &mut chain_db,
        NoProof,
        merge_schedule(),
        CfgEnv::default(),
    );
    vm.apply_transaction(&transfer(0, U256::ZERO)).unwrap();
    // 9_000 gas left in the block, the next transfer needs 21_000
    let err = vm.apply_transaction(&transfer(1, U256::ZERO)).unwrap_err();
    assert!(matches!(err, ember::VmError::Validation(_)));
}

#[test]
fn shanghai_withdrawals_credit_and_clean_up() {
    let Fixture {
        mut db,
        mut chain_db,
        mut candidate,
    } = fixture(0);
    let funded = Address::repeat_byte(0x11);
    let untouched_empty = Address::repeat_byte(0x22);

    let block = Block {
        header: candidate.clone(),
        withdrawals: Some(vec![
            Withdrawal {
                index: 0,
                validator_index: 7,
                address: funded,
                amount: 1_000_000,
            },
            // a zero credit touches without funding; the account must not
            // materialize
            Withdrawal {
                index: 1,
                validator_index: 8,
                address: untouched_empty,
                amount: 0,
            },
        ]),
        ..Block::default()
    };

    let mut vm = Vm::new(
        candidate,
        &mut db,
        &mut chain_db,
        NoProof,
        ForkSchedule::all_from_genesis(),
        CfgEnv::default(),
    );
    let (final_block, _) = vm.import_block(&block).unwrap();

    assert_eq!(
        db.basic(funded).unwrap().unwrap().balance,
        U256::from(10u64.pow(15))
    );
    assert_eq!(db.basic(untouched_empty).unwrap(), None);
    assert!(final_block.header.withdrawals_root.is_some());
    assert_ne!(final_block.header.withdrawals_root, Some(trie::EMPTY_ROOT));
}

#[test]
fn costless_state_charges_no_fees_and_reverts() {
    let Fixture {
        mut db,
        mut chain_db,
        mut candidate,
    } = fixture(0);
    candidate.base_fee_per_gas = Some(30);

    let mut vm = Vm::new(
        candidate,
        &mut db,
        &mut chain_db,
        NoProof,
        merge_schedule(),
        CfgEnv::default(),
    );

    vm.in_costless_state(|vm| {
        let mut tx = transfer(0, U256::from(ETHER));
        tx.tx_type = TxType::DynamicFee;
        tx.gas_price = U256::from(100);
        tx.max_priority_fee_per_gas = Some(U256::from(2));
        let (receipt, _) = vm.apply_transaction(&tx).unwrap();
        assert_eq!(receipt.outcome, ReceiptOutcome::Status(true));

        // only the value moved; gas was free and the tip is zero. The
        // sender stays cached, so reading against a throwaway db is safe.
        assert_eq!(
            vm.state()
                .balance(sender(), &mut InMemoryDB::default())
                .unwrap(),
            U256::from(9) * U256::from(ETHER)
        );
    });

    // nothing escaped the costless scope
    assert_eq!(vm.header().gas_used, 0);
    assert_eq!(vm.header().base_fee_per_gas, Some(30));
    assert_eq!(
        db.basic(sender()).unwrap().unwrap().balance,
        U256::from(10) * U256::from(ETHER)
    );
    assert_eq!(db.basic(recipient()).unwrap(), None);
    assert_eq!(db.basic(coinbase()).unwrap(), None);
}

#[test]
fn execute_bytecode_harness_reverts_state() {
    let Fixture {
        mut db,
        mut chain_db,
        candidate,
    } = fixture(0);
    let target = Address::repeat_byte(0x33);

    let mut vm = Vm::new(
        candidate,
        &mut db,
        &mut chain_db,
        NoProof,
        merge_schedule(),
        CfgEnv::default(),
    );

    let code = vec![
        opcode::PUSH1,
        0x01,
        opcode::PUSH1,
        0x00,
        opcode::SSTORE,
        opcode::STOP,
    ];
    let computation = vm
        .execute_bytecode(
            None,
            U256::ZERO,
            100_000,
            target,
            sender(),
            U256::ZERO,
            Bytes::new(),
            Bytes::from(code),
            None,
        )
        .unwrap();

    assert!(!computation.is_error());
    assert!(computation.gas_used > 0);
    // the write was rolled back with the harness checkpoint
    let (value, _) = vm.state().sload(target, U256::ZERO, &mut InMemoryDB::default()).unwrap();
    assert_eq!(value, U256::ZERO);
}

#[test]
fn previous_hashes_walk_ancestry_newest_first() {
    let mut chain_db = InMemoryChainDb::default();
    let genesis = Header {
        number: 0,
        timestamp: 10,
        gas_limit: 8_000_000,
        ..Header::default()
    };
    let genesis_hash = chain_db.insert_header(genesis);
    let middle = Header {
        number: 1,
        timestamp: 20,
        gas_limit: 8_000_000,
        parent_hash: genesis_hash,
        ..Header::default()
    };
    let middle_hash = chain_db.insert_header(middle);
    let tip = Header {
        number: 2,
        timestamp: 30,
        gas_limit: 8_000_000,
        parent_hash: middle_hash,
        ..Header::default()
    };
    let tip_hash = chain_db.insert_header(tip);

    let mut db = InMemoryDB::default();
    let candidate = Header {
        number: 3,
        timestamp: 40,
        gas_limit: 8_000_000,
        parent_hash: tip_hash,
        ..Header::default()
    };
    let vm = Vm::new(
        candidate,
        &mut db,
        &mut chain_db,
        NoProof,
        merge_schedule(),
        CfgEnv::default(),
    );

    let hashes: Vec<B256> = vm.previous_hashes().collect();
    assert_eq!(hashes, vec![tip_hash, middle_hash, genesis_hash]);
}

/// A state backend that cannot serve one account: the missing-witness case.
#[derive(Default)]
struct HoleyDb {
    inner: InMemoryDB,
    hole: Option<Address>,
}

impl Database for HoleyDb {
    type Error = &'static str;

    fn basic(&mut self, address: Address) -> Result<Option<AccountInfo>, Self::Error> {
        if self.hole == Some(address) {
            return Err("account data missing from witness");
        }
        self.inner.basic(address).map_err(|_| "unreachable")
    }

    fn code_by_hash(&mut self, code_hash: B256) -> Result<Bytes, Self::Error> {
        self.inner.code_by_hash(code_hash).map_err(|_| "unreachable")
    }

    fn storage(&mut self, address: Address, index: U256) -> Result<U256, Self::Error> {
        self.inner.storage(address, index).map_err(|_| "unreachable")
    }

    fn block_hash(&mut self, number: U256) -> Result<B256, Self::Error> {
        self.inner.block_hash(number).map_err(|_| "unreachable")
    }
}

impl DatabaseCommit for HoleyDb {
    fn commit(&mut self, changes: HashMap<Address, Account>) {
        self.inner.commit(changes);
    }
}

impl StateDatabase for HoleyDb {
    fn state_root(&mut self) -> B256 {
        self.inner.state_root()
    }
}

#[test]
fn missing_state_data_undoes_the_transaction() {
    let Fixture {
        db,
        mut chain_db,
        candidate,
    } = fixture(0);
    let mut db = HoleyDb {
        inner: db,
        hole: Some(recipient()),
    };

    let mut vm = Vm::new(
        candidate,
        &mut db,
        &mut chain_db,
        NoProof,
        merge_schedule(),
        CfgEnv::default(),
    );
    let err = vm.apply_transaction(&transfer(0, U256::from(ETHER))).unwrap_err();
    assert!(err.is_missing_data());

    // The debit and nonce bump were rolled back: a nonce-0 transaction to a
    // reachable target still goes through cleanly.
    let ok_tx = Transaction {
        to: Some(Address::repeat_byte(0x55)),
        ..transfer(0, U256::ZERO)
    };
    let (receipt, _) = vm.apply_transaction(&ok_tx).unwrap();
    assert_eq!(receipt.cumulative_gas_used, 21_000);
    assert_eq!(
        vm.state()
            .balance(sender(), &mut InMemoryDB::default())
            .unwrap(),
        U256::from(10) * U256::from(ETHER) - U256::from(21_000u64) * U256::from(GWEI)
    );
}
