//! ember - an Ethereum Virtual Machine execution engine.
//!
//! The crate applies signed transactions against a journaled world state,
//! producing state transitions, receipts and computation traces, and drives
//! whole blocks through execution, rewards and validation. Hard forks from
//! Frontier through Shanghai are expressed as layered rule refinements over
//! a shared interpreter.
//!
//! The persistent trie database, signature recovery and consensus sealing
//! are consumed through traits; see [`db`] and [`vm`].

pub mod block;
mod common;
pub mod db;
pub mod evm;
pub mod evm_impl;
pub mod gas;
pub mod instructions;
pub mod interpreter;
pub mod journaled_state;
pub mod models;
pub mod specification;
pub mod trie;
pub mod validation;
pub mod vm;

pub use alloy_primitives::{Address, Bloom, Bytes, B256, U256};

pub use common::{keccak256, KECCAK_EMPTY};
pub use evm::{execute_bytecode, transact};
pub use evm_impl::{
    EvmError, EvmResult, ExceptionalHalt, Host, Transact, TransactionError, EVMImpl,
};
pub use gas::Gas;
pub use instructions::{Eval, Reason, OPCODE_JUMPMAP};
pub use interpreter::{Contract, Interpreter, CALL_STACK_LIMIT, STACK_LIMIT};
pub use journaled_state::{Account, JournalCheckpoint, JournaledState, MetaWitness, StorageSlot};
pub use models::{
    AccountInfo, BlockEnv, CallInputs, CallScheme, CfgEnv, Computation, ComputationKind,
    CreateInputs, CreateScheme, Env, ExecutionResult, Log, TransactOut, TransactTo, TxEnv,
};
pub use specification::{ForkSchedule, Spec, SpecId};
pub use validation::ValidationError;
pub use vm::{ConsensusEngine, NoProof, Vm, VmError};
