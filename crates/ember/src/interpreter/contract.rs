use crate::instructions::opcode;
use crate::models::CallContext;
use crate::{Address, Bytes, U256};
use bitvec::prelude::{bitvec, BitVec, Lsb0};

/// The code being run by one frame, with its call parameters.
///
/// The bytecode is padded with 33 zero bytes at analysis time so PUSH
/// immediates never read past the end and running off the code executes
/// STOP.
#[derive(Debug, Clone)]
pub struct Contract {
    /// Call data.
    pub input: Bytes,
    /// Padded bytecode.
    pub bytecode: Bytes,
    /// Length of the unpadded code; PC values at or past this are synthetic.
    pub code_len: usize,
    /// Valid `JUMPDEST` positions.
    jump_map: BitVec<u8, Lsb0>,
    /// Address whose storage this frame writes.
    pub address: Address,
    /// Caller as seen by the `CALLER` opcode.
    pub caller: Address,
    /// Where the code was loaded from, when it differs from `address`
    /// (CALLCODE/DELEGATECALL).
    pub code_address: Option<Address>,
    /// Apparent value for the `CALLVALUE` opcode.
    pub value: U256,
}

impl Contract {
    pub fn new(
        input: Bytes,
        code: Bytes,
        address: Address,
        caller: Address,
        value: U256,
    ) -> Self {
        let (bytecode, code_len, jump_map) = analyze(&code);
        Self {
            input,
            bytecode,
            code_len,
            jump_map,
            address,
            caller,
            code_address: None,
            value,
        }
    }

    pub fn new_with_context(input: Bytes, code: Bytes, context: &CallContext) -> Self {
        let mut contract = Self::new(
            input,
            code,
            context.address,
            context.caller,
            context.apparent_value,
        );
        contract.code_address = Some(context.code_address);
        contract
    }

    /// True when `dest` is a `JUMPDEST` on an instruction boundary.
    #[inline]
    pub fn is_valid_jump(&self, dest: usize) -> bool {
        dest < self.code_len && self.jump_map[dest]
    }

    /// The unpadded code, as `CODECOPY`/`CODESIZE` see it.
    pub fn original_code(&self) -> &[u8] {
        &self.bytecode[..self.code_len]
    }
}

/// One linear pass over the code: records `JUMPDEST` positions, skipping PUSH
/// immediate bytes so data cannot be jumped into, and pads the code for the
/// interpreter.
fn analyze(code: &[u8]) -> (Bytes, usize, BitVec<u8, Lsb0>) {
    let mut jump_map = bitvec![u8, Lsb0; 0; code.len()];

    let mut i = 0;
    while i < code.len() {
        let op = code[i];
        if op == opcode::JUMPDEST {
            jump_map.set(i, true);
            i += 1;
        } else if (opcode::PUSH1..=opcode::PUSH32).contains(&op) {
            i += (op - opcode::PUSH1) as usize + 2;
        } else {
            i += 1;
        }
    }

    let mut padded = Vec::with_capacity(code.len() + 33);
    padded.extend_from_slice(code);
    padded.resize(code.len() + 33, 0);

    (Bytes::from(padded), code.len(), jump_map)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contract(code: &[u8]) -> Contract {
        Contract::new(
            Bytes::new(),
            Bytes::from(code.to_vec()),
            Address::ZERO,
            Address::ZERO,
            U256::ZERO,
        )
    }

    #[test]
    fn jumpdest_on_boundary_is_valid() {
        // PUSH1 0x03; JUMP; JUMPDEST
        let c = contract(&[opcode::PUSH1, 0x03, opcode::JUMP, opcode::JUMPDEST]);
        assert!(c.is_valid_jump(3));
        assert!(!c.is_valid_jump(0));
        assert!(!c.is_valid_jump(4));
    }

    #[test]
    fn jumpdest_inside_push_data_is_invalid() {
        // PUSH2 0x5b 0x5b; JUMPDEST
        let c = contract(&[opcode::PUSH2, 0x5b, 0x5b, opcode::JUMPDEST]);
        assert!(!c.is_valid_jump(1));
        assert!(!c.is_valid_jump(2));
        assert!(c.is_valid_jump(3));
    }

    #[test]
    fn padding_preserves_original_length() {
        let c = contract(&[opcode::PUSH1]);
        assert_eq!(c.code_len, 1);
        assert_eq!(c.bytecode.len(), 34);
        assert_eq!(c.original_code(), &[opcode::PUSH1]);
    }
}
