//! The bytecode interpreter: one instance per call frame.

mod contract;
mod memory;
mod stack;

pub use contract::Contract;
pub use memory::{next_multiple_of_32, Memory};
pub use stack::{Stack, STACK_LIMIT};

use crate::evm_impl::{EvmResult, ExceptionalHalt, Host};
use crate::instructions::{self, opcode::spec_opcode_gas, opcode::OpInfo, Eval};
use crate::{Bytes, Gas, Spec};
use core::ops::Range;

/// Nested calls and creates stop at this depth; the parent sees a failed
/// frame.
pub const CALL_STACK_LIMIT: usize = 1024;

/// Executes one frame's bytecode against a host.
pub struct Interpreter {
    /// Points into the padded bytecode of `contract`.
    pub instruction_pointer: *const u8,
    pub gas: Gas,
    pub contract: Contract,
    pub stack: Stack,
    pub memory: Memory,
    /// Output of the most recent sub-call, served to RETURNDATA* opcodes.
    pub return_data_buffer: Bytes,
    /// Memory range holding this frame's RETURN/REVERT payload.
    pub return_range: Range<usize>,
    pub is_static: bool,
    opcode_gas: &'static [OpInfo; 256],
}

impl Interpreter {
    pub fn new<SPEC: Spec>(contract: Contract, gas_limit: u64, is_static: bool) -> Self {
        let instruction_pointer = contract.bytecode.as_ptr();
        Self {
            instruction_pointer,
            gas: Gas::new(gas_limit),
            contract,
            stack: Stack::new(),
            memory: Memory::new(),
            return_data_buffer: Bytes::new(),
            return_range: usize::MAX..usize::MAX,
            is_static,
            opcode_gas: spec_opcode_gas(SPEC::SPEC_ID),
        }
    }

    /// Offset of the next instruction within the bytecode.
    pub fn program_counter(&self) -> usize {
        // Safety: the pointer always stays within the padded bytecode
        // allocation.
        unsafe {
            self.instruction_pointer
                .offset_from(self.contract.bytecode.as_ptr()) as usize
        }
    }

    pub fn gas(&self) -> &Gas {
        &self.gas
    }

    /// The RETURN/REVERT payload of this frame.
    pub fn return_value(&self) -> Bytes {
        if self.return_range.start == usize::MAX {
            Bytes::new()
        } else {
            Bytes::copy_from_slice(
                self.memory
                    .get_slice(self.return_range.start, self.return_range.len()),
            )
        }
    }

    /// Runs to completion. `Ok` carries the halt kind; faults surface as
    /// `ExceptionalHalt` and database failures pass through untouched.
    pub fn run<H: Host, SPEC: Spec>(&mut self, host: &mut H) -> EvmResult<Eval, H::DatabaseError> {
        loop {
            // Fetch, advance, charge the table cost, then dispatch. Padding
            // guarantees the fetch is in bounds; the zero padding is STOP.
            let opcode = unsafe { *self.instruction_pointer };
            self.instruction_pointer = unsafe { self.instruction_pointer.add(1) };

            let info = &self.opcode_gas[opcode as usize];
            if !info.is_enabled() {
                return Err(ExceptionalHalt::OpcodeNotFound.into());
            }
            if !self.gas.record_cost(info.gas()) {
                return Err(ExceptionalHalt::OutOfGas.into());
            }

            match instructions::eval::<H, SPEC>(opcode, self, host)? {
                Eval::Continue => {}
                eval => return Ok(eval),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evm_impl::{EvmError, NoHost};
    use crate::instructions::opcode;
    use crate::specification::{FrontierSpec, LondonSpec};
    use crate::{Address, U256};

    fn run(code: Vec<u8>, gas_limit: u64) -> (EvmResult<Eval, core::convert::Infallible>, Interpreter) {
        let contract = Contract::new(
            Bytes::new(),
            Bytes::from(code),
            Address::ZERO,
            Address::ZERO,
            U256::ZERO,
        );
        let mut interpreter = Interpreter::new::<LondonSpec>(contract, gas_limit, false);
        let mut host = NoHost::default();
        let exit = interpreter.run::<_, LondonSpec>(&mut host);
        (exit, interpreter)
    }

    #[test]
    fn add_program_leaves_sum_on_stack() {
        let (exit, interpreter) = run(
            vec![opcode::PUSH1, 0x02, opcode::PUSH1, 0x03, opcode::ADD, opcode::STOP],
            100,
        );
        assert!(matches!(exit, Ok(Eval::Stop)));
        assert_eq!(interpreter.stack.data(), &[U256::from(5)]);
        // 3 + 3 + 3 for the verylow opcodes
        assert_eq!(interpreter.gas.spend(), 9);
    }

    #[test]
    fn running_off_the_code_is_an_implicit_stop() {
        let (exit, _) = run(vec![opcode::PUSH1, 0x01], 100);
        assert!(matches!(exit, Ok(Eval::Stop)));
    }

    #[test]
    fn out_of_gas_at_prologue() {
        let (exit, interpreter) = run(vec![opcode::PUSH1, 0x01, opcode::PUSH1, 0x02], 5);
        assert!(matches!(exit, Err(EvmError::Halt(ExceptionalHalt::OutOfGas))));
        // the meter never goes negative
        assert_eq!(interpreter.gas.remaining(), 2);
    }

    #[test]
    fn disabled_opcode_is_not_found() {
        let contract = Contract::new(
            Bytes::new(),
            Bytes::from(vec![opcode::PUSH0]),
            Address::ZERO,
            Address::ZERO,
            U256::ZERO,
        );
        // PUSH0 does not exist before Shanghai
        let mut interpreter = Interpreter::new::<FrontierSpec>(contract, 100, false);
        let mut host = NoHost::default();
        let exit = interpreter.run::<_, FrontierSpec>(&mut host);
        assert!(matches!(
            exit,
            Err(EvmError::Halt(ExceptionalHalt::OpcodeNotFound))
        ));
    }

    #[test]
    fn invalid_jump_faults() {
        // JUMP to a non-JUMPDEST byte
        let (exit, _) = run(vec![opcode::PUSH1, 0x00, opcode::JUMP], 100);
        assert!(matches!(
            exit,
            Err(EvmError::Halt(ExceptionalHalt::InvalidJump))
        ));
    }

    #[test]
    fn jump_loop_burns_gas_until_exhaustion() {
        // JUMPDEST; PUSH1 0; JUMP -> spins until out of gas
        let (exit, _) = run(
            vec![opcode::JUMPDEST, opcode::PUSH1, 0x00, opcode::JUMP],
            1_000,
        );
        assert!(matches!(exit, Err(EvmError::Halt(ExceptionalHalt::OutOfGas))));
    }

    #[test]
    fn memory_expansion_is_charged_quadratically() {
        // MSTORE at offset 0: one word of memory
        let (exit, interpreter) = run(
            vec![
                opcode::PUSH1,
                0x2a,
                opcode::PUSH1,
                0x00,
                opcode::MSTORE,
                opcode::STOP,
            ],
            100,
        );
        assert!(matches!(exit, Ok(Eval::Stop)));
        assert_eq!(interpreter.memory.effective_len(), 32);
        // 3 + 3 + (3 base + 3 expansion)
        assert_eq!(interpreter.gas.spend(), 12);
    }

    #[test]
    fn revert_returns_payload() {
        let (exit, interpreter) = run(
            vec![
                opcode::PUSH1,
                0x2a,
                opcode::PUSH1,
                0x00,
                opcode::MSTORE,
                opcode::PUSH1,
                0x20,
                opcode::PUSH1,
                0x00,
                opcode::REVERT,
            ],
            100,
        );
        assert!(matches!(exit, Ok(Eval::Revert)));
        let value = U256::from_be_bytes::<32>(
            interpreter.return_value().as_ref().try_into().unwrap(),
        );
        assert_eq!(value, U256::from(0x2a));
    }
}
