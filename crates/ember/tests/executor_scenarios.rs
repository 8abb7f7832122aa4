//! Transaction-executor scenarios: fee flows, storage semantics, creates,
//! nested frames and the per-fork gas schedules, run end to end through
//! `transact`.

use ember::db::{InMemoryDB, StateDatabase};
use ember::instructions::opcode;
use ember::{
    transact, AccountInfo, Address, BlockEnv, Bytes, CfgEnv, Env, ExceptionalHalt, JournaledState,
    Reason, SpecId, TransactTo, TxEnv, U256,
};

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

fn funded_db(balance: U256) -> InMemoryDB {
    let mut db = InMemoryDB::default();
    db.insert_account_info(sender(), AccountInfo::from_balance(balance));
    db
}

fn env(tx: TxEnv) -> Env {
    Env {
        cfg: CfgEnv::default(),
        block: BlockEnv {
            number: U256::from(1),
            coinbase: coinbase(),
            timestamp: U256::from(1_000),
            gas_limit: U256::from(30_000_000),
            ..BlockEnv::default()
        },
        tx,
    }
}

fn transfer_tx(gas_limit: u64, gas_price: u64, value: U256) -> TxEnv {
    TxEnv {
        caller: sender(),
        gas_limit,
        gas_price: U256::from(gas_price),
        transact_to: TransactTo::Call(recipient()),
        value,
        ..TxEnv::default()
    }
}

fn install_code(db: &mut InMemoryDB, address: Address, code: Vec<u8>) {
    db.insert_account_info(
        address,
        AccountInfo::new(
            U256::ZERO,
            1,
            ember::keccak256(&code),
            Bytes::from(code),
        ),
    );
}

#[test]
fn simple_transfer_pre_london() {
    let mut db = funded_db(U256::from(10) * U256::from(ETHER));
    let mut state = JournaledState::new(SpecId::BERLIN);
    let mut env = env(transfer_tx(21_000, GWEI, U256::from(ETHER)));

    let result = transact(SpecId::BERLIN, &mut env, &mut state, &mut db).unwrap();

    assert!(result.is_success());
    assert_eq!(result.gas_used, 21_000);

    let gas_fee = U256::from(21_000u64) * U256::from(GWEI);
    assert_eq!(
        state.balance(sender(), &mut db).unwrap(),
        U256::from(10) * U256::from(ETHER) - U256::from(ETHER) - gas_fee
    );
    assert_eq!(
        state.balance(recipient(), &mut db).unwrap(),
        U256::from(ETHER)
    );
    // pre-London the coinbase receives the full gas fee
    assert_eq!(state.balance(coinbase(), &mut db).unwrap(), gas_fee);
    // nonce is strictly monotonic
    assert_eq!(state.nonce(sender(), &mut db).unwrap(), 1);
}

#[test]
fn london_base_fee_is_burned() {
    let mut db = funded_db(U256::from(10) * U256::from(ETHER));
    let mut state = JournaledState::new(SpecId::LONDON);
    let mut tx = transfer_tx(21_000, 100, U256::from(ETHER));
    tx.gas_priority_fee = Some(U256::from(2));
    let mut env = env(tx);
    env.block.basefee = U256::from(30);

    let before: U256 = [sender(), recipient(), coinbase()]
        .iter()
        .map(|address| state.balance(*address, &mut db).unwrap())
        .fold(U256::ZERO, |acc, balance| acc + balance);

    let result = transact(SpecId::LONDON, &mut env, &mut state, &mut db).unwrap();
    assert!(result.is_success());

    // effective price = min(100, 2 + 30) = 32; tip = 2
    assert_eq!(
        state.balance(sender(), &mut db).unwrap(),
        U256::from(10) * U256::from(ETHER)
            - U256::from(ETHER)
            - U256::from(21_000u64) * U256::from(32u64)
    );
    assert_eq!(
        state.balance(coinbase(), &mut db).unwrap(),
        U256::from(21_000u64) * U256::from(2u64)
    );

    // the base-fee share vanishes from circulation
    let after: U256 = [sender(), recipient(), coinbase()]
        .iter()
        .map(|address| state.balance(*address, &mut db).unwrap())
        .fold(U256::ZERO, |acc, balance| acc + balance);
    assert_eq!(before - after, U256::from(21_000u64) * U256::from(30u64));
}

#[test]
fn validation_failures_leave_nonce_unchanged() {
    let mut db = funded_db(U256::from(ETHER));
    let mut state = JournaledState::new(SpecId::BERLIN);

    // wrong nonce
    let mut tx = transfer_tx(21_000, GWEI, U256::ZERO);
    tx.nonce = 7;
    let mut wrong_nonce_env = env(tx);
    assert!(transact(SpecId::BERLIN, &mut wrong_nonce_env, &mut state, &mut db).is_err());
    assert_eq!(state.nonce(sender(), &mut db).unwrap(), 0);

    // unaffordable value
    let mut poor_env = env(transfer_tx(21_000, GWEI, U256::from(2) * U256::from(ETHER)));
    assert!(transact(SpecId::BERLIN, &mut poor_env, &mut state, &mut db).is_err());
    assert_eq!(state.nonce(sender(), &mut db).unwrap(), 0);
    assert_eq!(state.balance(sender(), &mut db).unwrap(), U256::from(ETHER));
}

#[test]
fn intrinsic_gas_shortfall_is_rejected() {
    let mut db = funded_db(U256::from(ETHER));
    let mut state = JournaledState::new(SpecId::BERLIN);
    let mut env = env(transfer_tx(20_999, GWEI, U256::ZERO));
    assert!(transact(SpecId::BERLIN, &mut env, &mut state, &mut db).is_err());
}

#[test]
fn cold_and_warm_sload_pricing() {
    let contract = recipient();
    let mut db = funded_db(U256::from(ETHER));
    // SLOAD slot 5 twice: 2100 cold, then 100 warm
    install_code(
        &mut db,
        contract,
        vec![
            opcode::PUSH1,
            0x05,
            opcode::SLOAD,
            opcode::POP,
            opcode::PUSH1,
            0x05,
            opcode::SLOAD,
            opcode::POP,
            opcode::STOP,
        ],
    );

    let mut state = JournaledState::new(SpecId::BERLIN);
    let mut env = env(transfer_tx(100_000, GWEI, U256::ZERO));
    let result = transact(SpecId::BERLIN, &mut env, &mut state, &mut db).unwrap();

    assert!(result.is_success());
    assert_eq!(result.gas_used, 21_000 + 3 + 2_100 + 2 + 3 + 100 + 2);
}

#[test]
fn access_list_pre_warms_slots() {
    let contract = recipient();
    let mut db = funded_db(U256::from(ETHER));
    install_code(
        &mut db,
        contract,
        vec![
            opcode::PUSH1,
            0x05,
            opcode::SLOAD,
            opcode::POP,
            opcode::PUSH1,
            0x05,
            opcode::SLOAD,
            opcode::POP,
            opcode::STOP,
        ],
    );

    let mut state = JournaledState::new(SpecId::BERLIN);
    let mut tx = transfer_tx(100_000, GWEI, U256::ZERO);
    tx.access_list = vec![(contract, vec![U256::from(5)])];
    let mut env = env(tx);
    let result = transact(SpecId::BERLIN, &mut env, &mut state, &mut db).unwrap();

    // both loads are warm; the access list is paid for up front
    assert_eq!(
        result.gas_used,
        21_000 + 2_400 + 1_900 + 3 + 100 + 2 + 3 + 100 + 2
    );
}

#[test]
fn sstore_clear_refund_is_capped_per_fork() {
    let contract = recipient();
    let code = vec![
        opcode::PUSH1,
        0x00,
        opcode::PUSH1,
        0x00,
        opcode::SSTORE,
        opcode::STOP,
    ];

    // slot 0 starts at 1, the transaction clears it
    for (spec_id, expected_gas_used) in [
        // quotient 2: refund = min(15000, 26006/2) = 13003
        (SpecId::BERLIN, 26_006 - 13_003),
        // EIP-3529: refund = min(4800, 26006/5) = 4800
        (SpecId::LONDON, 26_006 - 4_800),
    ] {
        let mut db = funded_db(U256::from(ETHER));
        install_code(&mut db, contract, code.clone());
        db.insert_account_storage(contract, U256::ZERO, U256::from(1));

        let mut state = JournaledState::new(spec_id);
        let mut env = env(transfer_tx(100_000, GWEI, U256::ZERO));
        let result = transact(spec_id, &mut env, &mut state, &mut db).unwrap();
        assert!(result.is_success());
        assert_eq!(result.gas_used, expected_gas_used, "spec {spec_id:?}");
    }
}

#[test]
fn create_collision_consumes_gas_and_keeps_code() {
    let mut db = funded_db(U256::from(ETHER));
    // the address CREATE will derive for nonce 0
    let colliding = sender().create(0);
    install_code(&mut db, colliding, vec![opcode::STOP]);

    let mut state = JournaledState::new(SpecId::BERLIN);
    let mut env = env(TxEnv {
        caller: sender(),
        gas_limit: 100_000,
        gas_price: U256::from(GWEI),
        transact_to: TransactTo::create(),
        ..TxEnv::default()
    });
    let result = transact(SpecId::BERLIN, &mut env, &mut state, &mut db).unwrap();

    assert!(matches!(
        result.reason,
        Reason::Failure(ExceptionalHalt::CreateCollision)
    ));
    // every unit of gas is consumed
    assert_eq!(result.gas_used, 100_000);
    // the existing code survives
    let (account, _) = state.load_code(colliding, &mut db).unwrap();
    assert_eq!(account.info.code.clone().unwrap(), Bytes::from(vec![opcode::STOP]));
}

#[test]
fn create_deploys_returned_code() {
    let mut db = funded_db(U256::from(ETHER));
    let mut state = JournaledState::new(SpecId::BERLIN);

    // init code: MSTORE8(0, 0xFE); RETURN(0, 1)  -> deploys [0xFE]
    let init_code = vec![
        opcode::PUSH1,
        0xFE,
        opcode::PUSH1,
        0x00,
        opcode::MSTORE8,
        opcode::PUSH1,
        0x01,
        opcode::PUSH1,
        0x00,
        opcode::RETURN,
    ];
    let mut env = env(TxEnv {
        caller: sender(),
        gas_limit: 100_000,
        gas_price: U256::from(GWEI),
        transact_to: TransactTo::create(),
        data: Bytes::from(init_code),
        ..TxEnv::default()
    });
    let result = transact(SpecId::BERLIN, &mut env, &mut state, &mut db).unwrap();
    assert!(result.is_success());

    let created = sender().create(0);
    let (account, _) = state.load_code(created, &mut db).unwrap();
    assert_eq!(account.info.code.clone().unwrap(), Bytes::from(vec![0xFE]));
    // EIP-161: fresh contracts start at nonce 1
    assert_eq!(account.info.nonce, 1);
}

#[test]
fn nested_revert_rolls_back_inner_store_only() {
    let outer = recipient();
    let inner = Address::repeat_byte(0xdd);

    // inner: SSTORE(0, 2); REVERT(0, 0)
    let inner_code = vec![
        opcode::PUSH1,
        0x02,
        opcode::PUSH1,
        0x00,
        opcode::SSTORE,
        opcode::PUSH1,
        0x00,
        opcode::PUSH1,
        0x00,
        opcode::REVERT,
    ];

    // outer: SSTORE(0, 1); CALL(inner); STOP
    let mut outer_code = vec![
        opcode::PUSH1,
        0x01,
        opcode::PUSH1,
        0x00,
        opcode::SSTORE,
        // ret len, ret offset, args len, args offset, value
        opcode::PUSH1,
        0x00,
        opcode::PUSH1,
        0x00,
        opcode::PUSH1,
        0x00,
        opcode::PUSH1,
        0x00,
        opcode::PUSH1,
        0x00,
        opcode::PUSH1 + 19, // PUSH20
    ];
    outer_code.extend_from_slice(inner.as_slice());
    outer_code.extend_from_slice(&[
        opcode::PUSH2,
        0xFF,
        0xFF,
        opcode::CALL,
        opcode::STOP,
    ]);

    let mut db = funded_db(U256::from(ETHER));
    install_code(&mut db, outer, outer_code);
    install_code(&mut db, inner, inner_code);

    let mut state = JournaledState::new(SpecId::BERLIN);
    let mut env = env(transfer_tx(200_000, GWEI, U256::ZERO));
    let result = transact(SpecId::BERLIN, &mut env, &mut state, &mut db).unwrap();

    assert!(result.is_success());
    // outer write survives, inner write is gone
    let (value, _) = state.sload(outer, U256::ZERO, &mut db).unwrap();
    assert_eq!(value, U256::from(1));
    let (value, _) = state.sload(inner, U256::ZERO, &mut db).unwrap();
    assert_eq!(value, U256::ZERO);

    // the trace shows one reverted child frame
    assert_eq!(result.computation.children.len(), 1);
    assert_eq!(
        result.computation.children[0].reason,
        Some(Reason::Success(ember::Eval::Revert))
    );
    assert!(!result.computation.is_error());
}

#[test]
fn selfdestruct_sweeps_balance_and_refunds_pre_london() {
    let contract = recipient();
    let heir = Address::repeat_byte(0xee);

    let mut code = vec![opcode::PUSH1 + 19]; // PUSH20
    code.extend_from_slice(heir.as_slice());
    code.push(opcode::SELFDESTRUCT);

    for (spec_id, expected_gas_used) in [
        // spend = 21000 + 3 + (5000 + 2600 + 25000) = 53603; refund 24000
        (SpecId::BERLIN, 53_603 - 24_000),
        // EIP-3529 removes the refund
        (SpecId::LONDON, 53_603),
    ] {
        let mut db = funded_db(U256::from(ETHER));
        db.insert_account_info(
            contract,
            AccountInfo {
                balance: U256::from(100),
                nonce: 1,
                code_hash: ember::keccak256(&code),
                code: Some(Bytes::from(code.clone())),
            },
        );

        let mut state = JournaledState::new(spec_id);
        let mut env = env(transfer_tx(100_000, GWEI, U256::ZERO));
        let result = transact(spec_id, &mut env, &mut state, &mut db).unwrap();

        assert!(result.is_success(), "spec {spec_id:?}");
        assert_eq!(result.gas_used, expected_gas_used, "spec {spec_id:?}");
        assert_eq!(state.balance(heir, &mut db).unwrap(), U256::from(100));
        assert!(!state.account_exists(contract, &mut db).unwrap());
    }
}

#[test]
fn log_emission_lands_in_result() {
    let contract = recipient();
    let code = vec![
        opcode::PUSH1,
        0xAB, // topic
        opcode::PUSH1,
        0x00, // len
        opcode::PUSH1,
        0x00, // offset
        opcode::LOG0 + 1,
        opcode::STOP,
    ];
    let mut db = funded_db(U256::from(ETHER));
    install_code(&mut db, contract, code);

    let mut state = JournaledState::new(SpecId::BERLIN);
    let mut env = env(transfer_tx(100_000, GWEI, U256::ZERO));
    let result = transact(SpecId::BERLIN, &mut env, &mut state, &mut db).unwrap();

    assert!(result.is_success());
    assert_eq!(result.logs.len(), 1);
    assert_eq!(result.logs[0].address, contract);
    assert_eq!(result.logs[0].topics, vec![ember::B256::with_last_byte(0xAB)]);
    assert_eq!(result.gas_used, 21_000 + 3 + 3 + 3 + 375 + 375);
}

#[test]
fn static_call_write_fails_but_outer_continues() {
    let outer = recipient();
    let inner = Address::repeat_byte(0xdd);

    // inner writes storage; called via STATICCALL that must fail
    let inner_code = vec![
        opcode::PUSH1,
        0x01,
        opcode::PUSH1,
        0x00,
        opcode::SSTORE,
        opcode::STOP,
    ];
    let mut outer_code = vec![
        // ret len, ret offset, args len, args offset
        opcode::PUSH1,
        0x00,
        opcode::PUSH1,
        0x00,
        opcode::PUSH1,
        0x00,
        opcode::PUSH1,
        0x00,
        opcode::PUSH1 + 19, // PUSH20
    ];
    outer_code.extend_from_slice(inner.as_slice());
    outer_code.extend_from_slice(&[
        opcode::PUSH2,
        0xFF,
        0xFF,
        opcode::STATICCALL,
        opcode::STOP,
    ]);

    let mut db = funded_db(U256::from(ETHER));
    install_code(&mut db, outer, outer_code);
    install_code(&mut db, inner, inner_code);

    let mut state = JournaledState::new(SpecId::BERLIN);
    let mut env = env(transfer_tx(200_000, GWEI, U256::ZERO));
    let result = transact(SpecId::BERLIN, &mut env, &mut state, &mut db).unwrap();

    assert!(result.is_success());
    let (value, _) = state.sload(inner, U256::ZERO, &mut db).unwrap();
    assert_eq!(value, U256::ZERO);
    assert_eq!(
        result.computation.children[0].reason,
        Some(Reason::Failure(ExceptionalHalt::WriteInStaticContext))
    );
}

#[test]
fn determinism_identical_inputs_identical_outcomes() {
    let run = || {
        let mut db = funded_db(U256::from(10) * U256::from(ETHER));
        let mut state = JournaledState::new(SpecId::LONDON);
        let mut tx = transfer_tx(50_000, 100, U256::from(ETHER));
        tx.gas_priority_fee = Some(U256::from(2));
        let mut env = env(tx);
        env.block.basefee = U256::from(30);
        let result = transact(SpecId::LONDON, &mut env, &mut state, &mut db).unwrap();
        let _ = state.persist(&mut db);
        (result.gas_used, db.state_root())
    };

    assert_eq!(run(), run());
}

#[test]
fn precompile_call_identity() {
    // call the identity precompile (0x04) and copy its output back
    let outer = recipient();
    let code = vec![
        opcode::PUSH1,
        0x20, // ret len
        opcode::PUSH1,
        0x00, // ret offset
        opcode::PUSH1,
        0x01, // args len
        opcode::PUSH1,
        0x00, // args offset
        opcode::PUSH1,
        0x00, // value
        opcode::PUSH1,
        0x04, // identity precompile
        opcode::PUSH2,
        0xFF,
        0xFF,
        opcode::CALL,
        opcode::STOP,
    ];

    let mut db = funded_db(U256::from(ETHER));
    install_code(&mut db, outer, code);

    let mut state = JournaledState::new(SpecId::BERLIN);
    let mut env = env(transfer_tx(100_000, GWEI, U256::ZERO));
    let result = transact(SpecId::BERLIN, &mut env, &mut state, &mut db).unwrap();

    assert!(result.is_success());
    let child = &result.computation.children[0];
    assert_eq!(child.kind, ember::ComputationKind::Precompile);
    assert!(child.reason.map(|reason| reason.is_ok()).unwrap_or(false));
}
