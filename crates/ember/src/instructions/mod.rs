//! Opcode handlers, grouped the way the opcode ranges group them.
//!
//! The interpreter prologue has already charged the table cost when a handler
//! runs; handlers only charge dynamic parts (memory growth, per-word costs,
//! warm/cold surcharges, storage schedules).

#[macro_use]
mod macros;
mod arithmetic;
mod bitwise;
mod control;
mod host;
mod host_env;
mod i256;
mod memory;
pub mod opcode;
mod stack;
mod system;

use crate::evm_impl::{EvmResult, ExceptionalHalt, Host};
use crate::interpreter::Interpreter;
use crate::Spec;
pub use opcode::OPCODE_JUMPMAP;

/// How a frame stopped.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Eval {
    /// Not a halt; the interpreter keeps stepping.
    #[default]
    Continue = 0x00,
    Stop = 0x01,
    Return = 0x02,
    SelfDestruct = 0x03,
    /// Raised by the `REVERT` opcode.
    ///
    /// Unlike the exceptional halts this does not consume the remaining gas.
    Revert = 0x20,
}

/// Final outcome of a frame: a clean halt, a revert, or a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    Success(Eval),
    Failure(ExceptionalHalt),
}

/// Pattern matching the non-reverting halts.
#[macro_export]
macro_rules! return_ok {
    () => {
        $crate::instructions::Reason::Success(
            $crate::instructions::Eval::Continue
                | $crate::instructions::Eval::Stop
                | $crate::instructions::Eval::Return
                | $crate::instructions::Eval::SelfDestruct,
        )
    };
}

#[macro_export]
macro_rules! return_revert {
    () => {
        $crate::instructions::Reason::Success($crate::instructions::Eval::Revert)
    };
}

impl Reason {
    pub fn is_ok(&self) -> bool {
        matches!(self, return_ok!())
    }

    pub fn is_revert(&self) -> bool {
        matches!(self, return_revert!())
    }
}

impl From<Eval> for Reason {
    fn from(eval: Eval) -> Self {
        Reason::Success(eval)
    }
}

impl From<ExceptionalHalt> for Reason {
    fn from(halt: ExceptionalHalt) -> Self {
        Reason::Failure(halt)
    }
}

#[inline(always)]
pub(crate) fn eval<H: Host, S: Spec>(
    opcode: u8,
    interp: &mut Interpreter,
    host: &mut H,
) -> EvmResult<Eval, H::DatabaseError> {
    match opcode {
        opcode::STOP => Ok(Eval::Stop),
        opcode::ADD => arithmetic::wrapping_add(interp, host),
        opcode::MUL => arithmetic::wrapping_mul(interp, host),
        opcode::SUB => arithmetic::wrapping_sub(interp, host),
        opcode::DIV => arithmetic::div(interp, host),
        opcode::SDIV => arithmetic::sdiv(interp, host),
        opcode::MOD => arithmetic::rem(interp, host),
        opcode::SMOD => arithmetic::smod(interp, host),
        opcode::ADDMOD => arithmetic::addmod(interp, host),
        opcode::MULMOD => arithmetic::mulmod(interp, host),
        opcode::EXP => arithmetic::exp::<H, S>(interp, host),
        opcode::SIGNEXTEND => arithmetic::signextend(interp, host),
        opcode::LT => bitwise::lt(interp, host),
        opcode::GT => bitwise::gt(interp, host),
        opcode::SLT => bitwise::slt(interp, host),
        opcode::SGT => bitwise::sgt(interp, host),
        opcode::EQ => bitwise::eq(interp, host),
        opcode::ISZERO => bitwise::iszero(interp, host),
        opcode::AND => bitwise::bitand(interp, host),
        opcode::OR => bitwise::bitor(interp, host),
        opcode::XOR => bitwise::bitxor(interp, host),
        opcode::NOT => bitwise::not(interp, host),
        opcode::BYTE => bitwise::byte(interp, host),
        opcode::SHL => bitwise::shl(interp, host),
        opcode::SHR => bitwise::shr(interp, host),
        opcode::SAR => bitwise::sar(interp, host),
        opcode::SHA3 => system::sha3(interp, host),
        opcode::ADDRESS => system::address(interp, host),
        opcode::BALANCE => host::balance::<H, S>(interp, host),
        opcode::ORIGIN => host_env::origin(interp, host),
        opcode::CALLER => system::caller(interp, host),
        opcode::CALLVALUE => system::callvalue(interp, host),
        opcode::CALLDATALOAD => system::calldataload(interp, host),
        opcode::CALLDATASIZE => system::calldatasize(interp, host),
        opcode::CALLDATACOPY => system::calldatacopy(interp, host),
        opcode::CODESIZE => system::codesize(interp, host),
        opcode::CODECOPY => system::codecopy(interp, host),
        opcode::GASPRICE => host_env::gasprice(interp, host),
        opcode::EXTCODESIZE => host::extcodesize::<H, S>(interp, host),
        opcode::EXTCODECOPY => host::extcodecopy::<H, S>(interp, host),
        opcode::RETURNDATASIZE => system::returndatasize(interp, host),
        opcode::RETURNDATACOPY => system::returndatacopy(interp, host),
        opcode::EXTCODEHASH => host::extcodehash::<H, S>(interp, host),
        opcode::BLOCKHASH => host::blockhash(interp, host),
        opcode::COINBASE => host_env::coinbase(interp, host),
        opcode::TIMESTAMP => host_env::timestamp(interp, host),
        opcode::NUMBER => host_env::number(interp, host),
        opcode::DIFFICULTY => host_env::difficulty::<H, S>(interp, host),
        opcode::GASLIMIT => host_env::gaslimit(interp, host),
        opcode::CHAINID => host_env::chainid(interp, host),
        opcode::SELFBALANCE => host::selfbalance(interp, host),
        opcode::BASEFEE => host_env::basefee(interp, host),
        opcode::POP => stack::pop(interp, host),
        opcode::MLOAD => memory::mload(interp, host),
        opcode::MSTORE => memory::mstore(interp, host),
        opcode::MSTORE8 => memory::mstore8(interp, host),
        opcode::SLOAD => host::sload::<H, S>(interp, host),
        opcode::SSTORE => host::sstore::<H, S>(interp, host),
        opcode::JUMP => control::jump(interp, host),
        opcode::JUMPI => control::jumpi(interp, host),
        opcode::PC => control::pc(interp, host),
        opcode::MSIZE => memory::msize(interp, host),
        opcode::GAS => system::gas(interp, host),
        opcode::JUMPDEST => control::jumpdest(interp, host),
        opcode::PUSH0 => stack::push0(interp, host),
        opcode::PUSH1..=opcode::PUSH32 => {
            stack::push_dyn(interp, host, (opcode - opcode::PUSH1 + 1) as usize)
        }
        opcode::DUP1..=opcode::DUP16 => {
            stack::dup_dyn(interp, host, (opcode - opcode::DUP1 + 1) as usize)
        }
        opcode::SWAP1..=opcode::SWAP16 => {
            stack::swap_dyn(interp, host, (opcode - opcode::SWAP1 + 1) as usize)
        }
        opcode::LOG0..=opcode::LOG4 => {
            host::log::<H, S>(interp, host, opcode - opcode::LOG0)
        }
        opcode::CREATE => host::create::<false, H, S>(interp, host),
        opcode::CALL => host::call::<H, S>(interp, host),
        opcode::CALLCODE => host::call_code::<H, S>(interp, host),
        opcode::RETURN => control::ret(interp, host),
        opcode::DELEGATECALL => host::delegate_call::<H, S>(interp, host),
        opcode::CREATE2 => host::create::<true, H, S>(interp, host),
        opcode::STATICCALL => host::static_call::<H, S>(interp, host),
        opcode::REVERT => control::revert(interp, host),
        opcode::INVALID => Err(ExceptionalHalt::InvalidOpcode.into()),
        opcode::SELFDESTRUCT => host::selfdestruct::<H, S>(interp, host),
        _ => Err(ExceptionalHalt::OpcodeNotFound.into()),
    }
}
