//! Opcode byte values, mnemonics, and the per-fork base-gas tables.
//!
//! Each fork's table is its predecessor's table with overrides applied, so a
//! repricing EIP shows up as a handful of assignments.

use crate::{gas, SpecId};

pub const STOP: u8 = 0x00;
pub const ADD: u8 = 0x01;
pub const MUL: u8 = 0x02;
pub const SUB: u8 = 0x03;
pub const DIV: u8 = 0x04;
pub const SDIV: u8 = 0x05;
pub const MOD: u8 = 0x06;
pub const SMOD: u8 = 0x07;
pub const ADDMOD: u8 = 0x08;
pub const MULMOD: u8 = 0x09;
pub const EXP: u8 = 0x0a;
pub const SIGNEXTEND: u8 = 0x0b;

pub const LT: u8 = 0x10;
pub const GT: u8 = 0x11;
pub const SLT: u8 = 0x12;
pub const SGT: u8 = 0x13;
pub const EQ: u8 = 0x14;
pub const ISZERO: u8 = 0x15;
pub const AND: u8 = 0x16;
pub const OR: u8 = 0x17;
pub const XOR: u8 = 0x18;
pub const NOT: u8 = 0x19;
pub const BYTE: u8 = 0x1a;
pub const SHL: u8 = 0x1b;
pub const SHR: u8 = 0x1c;
pub const SAR: u8 = 0x1d;

pub const SHA3: u8 = 0x20;

pub const ADDRESS: u8 = 0x30;
pub const BALANCE: u8 = 0x31;
pub const ORIGIN: u8 = 0x32;
pub const CALLER: u8 = 0x33;
pub const CALLVALUE: u8 = 0x34;
pub const CALLDATALOAD: u8 = 0x35;
pub const CALLDATASIZE: u8 = 0x36;
pub const CALLDATACOPY: u8 = 0x37;
pub const CODESIZE: u8 = 0x38;
pub const CODECOPY: u8 = 0x39;
pub const GASPRICE: u8 = 0x3a;
pub const EXTCODESIZE: u8 = 0x3b;
pub const EXTCODECOPY: u8 = 0x3c;
pub const RETURNDATASIZE: u8 = 0x3d;
pub const RETURNDATACOPY: u8 = 0x3e;
pub const EXTCODEHASH: u8 = 0x3f;

pub const BLOCKHASH: u8 = 0x40;
pub const COINBASE: u8 = 0x41;
pub const TIMESTAMP: u8 = 0x42;
pub const NUMBER: u8 = 0x43;
pub const DIFFICULTY: u8 = 0x44;
pub const GASLIMIT: u8 = 0x45;
pub const CHAINID: u8 = 0x46;
pub const SELFBALANCE: u8 = 0x47;
pub const BASEFEE: u8 = 0x48;

pub const POP: u8 = 0x50;
pub const MLOAD: u8 = 0x51;
pub const MSTORE: u8 = 0x52;
pub const MSTORE8: u8 = 0x53;
pub const SLOAD: u8 = 0x54;
pub const SSTORE: u8 = 0x55;
pub const JUMP: u8 = 0x56;
pub const JUMPI: u8 = 0x57;
pub const PC: u8 = 0x58;
pub const MSIZE: u8 = 0x59;
pub const GAS: u8 = 0x5a;
pub const JUMPDEST: u8 = 0x5b;
pub const PUSH0: u8 = 0x5f;

pub const PUSH1: u8 = 0x60;
pub const PUSH2: u8 = 0x61;
pub const PUSH32: u8 = 0x7f;
pub const DUP1: u8 = 0x80;
pub const DUP16: u8 = 0x8f;
pub const SWAP1: u8 = 0x90;
pub const SWAP16: u8 = 0x9f;

pub const LOG0: u8 = 0xa0;
pub const LOG4: u8 = 0xa4;

pub const CREATE: u8 = 0xf0;
pub const CALL: u8 = 0xf1;
pub const CALLCODE: u8 = 0xf2;
pub const RETURN: u8 = 0xf3;
pub const DELEGATECALL: u8 = 0xf4;
pub const CREATE2: u8 = 0xf5;
pub const STATICCALL: u8 = 0xfa;
pub const REVERT: u8 = 0xfd;
pub const INVALID: u8 = 0xfe;
pub const SELFDESTRUCT: u8 = 0xff;

/// Mnemonics indexed by opcode byte. Unassigned bytes stay `None`.
pub const OPCODE_JUMPMAP: [Option<&'static str>; 256] = {
    let mut map: [Option<&'static str>; 256] = [None; 256];
    map[STOP as usize] = Some("STOP");
    map[ADD as usize] = Some("ADD");
    map[MUL as usize] = Some("MUL");
    map[SUB as usize] = Some("SUB");
    map[DIV as usize] = Some("DIV");
    map[SDIV as usize] = Some("SDIV");
    map[MOD as usize] = Some("MOD");
    map[SMOD as usize] = Some("SMOD");
    map[ADDMOD as usize] = Some("ADDMOD");
    map[MULMOD as usize] = Some("MULMOD");
    map[EXP as usize] = Some("EXP");
    map[SIGNEXTEND as usize] = Some("SIGNEXTEND");
    map[LT as usize] = Some("LT");
    map[GT as usize] = Some("GT");
    map[SLT as usize] = Some("SLT");
    map[SGT as usize] = Some("SGT");
    map[EQ as usize] = Some("EQ");
    map[ISZERO as usize] = Some("ISZERO");
    map[AND as usize] = Some("AND");
    map[OR as usize] = Some("OR");
    map[XOR as usize] = Some("XOR");
    map[NOT as usize] = Some("NOT");
    map[BYTE as usize] = Some("BYTE");
    map[SHL as usize] = Some("SHL");
    map[SHR as usize] = Some("SHR");
    map[SAR as usize] = Some("SAR");
    map[SHA3 as usize] = Some("SHA3");
    map[ADDRESS as usize] = Some("ADDRESS");
    map[BALANCE as usize] = Some("BALANCE");
    map[ORIGIN as usize] = Some("ORIGIN");
    map[CALLER as usize] = Some("CALLER");
    map[CALLVALUE as usize] = Some("CALLVALUE");
    map[CALLDATALOAD as usize] = Some("CALLDATALOAD");
    map[CALLDATASIZE as usize] = Some("CALLDATASIZE");
    map[CALLDATACOPY as usize] = Some("CALLDATACOPY");
    map[CODESIZE as usize] = Some("CODESIZE");
    map[CODECOPY as usize] = Some("CODECOPY");
    map[GASPRICE as usize] = Some("GASPRICE");
    map[EXTCODESIZE as usize] = Some("EXTCODESIZE");
    map[EXTCODECOPY as usize] = Some("EXTCODECOPY");
    map[RETURNDATASIZE as usize] = Some("RETURNDATASIZE");
    map[RETURNDATACOPY as usize] = Some("RETURNDATACOPY");
    map[EXTCODEHASH as usize] = Some("EXTCODEHASH");
    map[BLOCKHASH as usize] = Some("BLOCKHASH");
    map[COINBASE as usize] = Some("COINBASE");
    map[TIMESTAMP as usize] = Some("TIMESTAMP");
    map[NUMBER as usize] = Some("NUMBER");
    map[DIFFICULTY as usize] = Some("DIFFICULTY");
    map[GASLIMIT as usize] = Some("GASLIMIT");
    map[CHAINID as usize] = Some("CHAINID");
    map[SELFBALANCE as usize] = Some("SELFBALANCE");
    map[BASEFEE as usize] = Some("BASEFEE");
    map[POP as usize] = Some("POP");
    map[MLOAD as usize] = Some("MLOAD");
    map[MSTORE as usize] = Some("MSTORE");
    map[MSTORE8 as usize] = Some("MSTORE8");
    map[SLOAD as usize] = Some("SLOAD");
    map[SSTORE as usize] = Some("SSTORE");
    map[JUMP as usize] = Some("JUMP");
    map[JUMPI as usize] = Some("JUMPI");
    map[PC as usize] = Some("PC");
    map[MSIZE as usize] = Some("MSIZE");
    map[GAS as usize] = Some("GAS");
    map[JUMPDEST as usize] = Some("JUMPDEST");
    map[PUSH0 as usize] = Some("PUSH0");
    let names: [&'static str; 32] = [
        "PUSH1", "PUSH2", "PUSH3", "PUSH4", "PUSH5", "PUSH6", "PUSH7", "PUSH8", "PUSH9",
        "PUSH10", "PUSH11", "PUSH12", "PUSH13", "PUSH14", "PUSH15", "PUSH16", "PUSH17",
        "PUSH18", "PUSH19", "PUSH20", "PUSH21", "PUSH22", "PUSH23", "PUSH24", "PUSH25",
        "PUSH26", "PUSH27", "PUSH28", "PUSH29", "PUSH30", "PUSH31", "PUSH32",
    ];
    let mut i = 0;
    while i < 32 {
        map[PUSH1 as usize + i] = Some(names[i]);
        i += 1;
    }
    let dups: [&'static str; 16] = [
        "DUP1", "DUP2", "DUP3", "DUP4", "DUP5", "DUP6", "DUP7", "DUP8", "DUP9", "DUP10",
        "DUP11", "DUP12", "DUP13", "DUP14", "DUP15", "DUP16",
    ];
    let swaps: [&'static str; 16] = [
        "SWAP1", "SWAP2", "SWAP3", "SWAP4", "SWAP5", "SWAP6", "SWAP7", "SWAP8", "SWAP9",
        "SWAP10", "SWAP11", "SWAP12", "SWAP13", "SWAP14", "SWAP15", "SWAP16",
    ];
    let mut i = 0;
    while i < 16 {
        map[DUP1 as usize + i] = Some(dups[i]);
        map[SWAP1 as usize + i] = Some(swaps[i]);
        i += 1;
    }
    map[LOG0 as usize] = Some("LOG0");
    map[LOG0 as usize + 1] = Some("LOG1");
    map[LOG0 as usize + 2] = Some("LOG2");
    map[LOG0 as usize + 3] = Some("LOG3");
    map[LOG0 as usize + 4] = Some("LOG4");
    map[CREATE as usize] = Some("CREATE");
    map[CALL as usize] = Some("CALL");
    map[CALLCODE as usize] = Some("CALLCODE");
    map[RETURN as usize] = Some("RETURN");
    map[DELEGATECALL as usize] = Some("DELEGATECALL");
    map[CREATE2 as usize] = Some("CREATE2");
    map[STATICCALL as usize] = Some("STATICCALL");
    map[REVERT as usize] = Some("REVERT");
    map[INVALID as usize] = Some("INVALID");
    map[SELFDESTRUCT as usize] = Some("SELFDESTRUCT");
    map
};

/// One opcode-table entry: the statically-known base cost, charged by the
/// interpreter prologue before the handler runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OpInfo {
    gas: u32,
    enabled: bool,
}

impl OpInfo {
    pub const DISABLED: Self = Self {
        gas: 0,
        enabled: false,
    };

    pub const fn new(gas: u64) -> Self {
        Self {
            gas: gas as u32,
            enabled: true,
        }
    }

    pub const fn gas(&self) -> u64 {
        self.gas as u64
    }

    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }
}

const fn frontier_table() -> [OpInfo; 256] {
    let mut t = [OpInfo::DISABLED; 256];
    t[STOP as usize] = OpInfo::new(gas::ZERO);
    t[ADD as usize] = OpInfo::new(gas::VERYLOW);
    t[MUL as usize] = OpInfo::new(gas::LOW);
    t[SUB as usize] = OpInfo::new(gas::VERYLOW);
    t[DIV as usize] = OpInfo::new(gas::LOW);
    t[SDIV as usize] = OpInfo::new(gas::LOW);
    t[MOD as usize] = OpInfo::new(gas::LOW);
    t[SMOD as usize] = OpInfo::new(gas::LOW);
    t[ADDMOD as usize] = OpInfo::new(gas::MID);
    t[MULMOD as usize] = OpInfo::new(gas::MID);
    t[EXP as usize] = OpInfo::new(gas::EXP);
    t[SIGNEXTEND as usize] = OpInfo::new(gas::LOW);

    let mut i = LT as usize;
    while i <= BYTE as usize {
        t[i] = OpInfo::new(gas::VERYLOW);
        i += 1;
    }

    t[SHA3 as usize] = OpInfo::new(gas::KECCAK256);

    t[ADDRESS as usize] = OpInfo::new(gas::BASE);
    t[BALANCE as usize] = OpInfo::new(20);
    t[ORIGIN as usize] = OpInfo::new(gas::BASE);
    t[CALLER as usize] = OpInfo::new(gas::BASE);
    t[CALLVALUE as usize] = OpInfo::new(gas::BASE);
    t[CALLDATALOAD as usize] = OpInfo::new(gas::VERYLOW);
    t[CALLDATASIZE as usize] = OpInfo::new(gas::BASE);
    t[CALLDATACOPY as usize] = OpInfo::new(gas::VERYLOW);
    t[CODESIZE as usize] = OpInfo::new(gas::BASE);
    t[CODECOPY as usize] = OpInfo::new(gas::VERYLOW);
    t[GASPRICE as usize] = OpInfo::new(gas::BASE);
    t[EXTCODESIZE as usize] = OpInfo::new(20);
    t[EXTCODECOPY as usize] = OpInfo::new(20);

    t[BLOCKHASH as usize] = OpInfo::new(20);
    t[COINBASE as usize] = OpInfo::new(gas::BASE);
    t[TIMESTAMP as usize] = OpInfo::new(gas::BASE);
    t[NUMBER as usize] = OpInfo::new(gas::BASE);
    t[DIFFICULTY as usize] = OpInfo::new(gas::BASE);
    t[GASLIMIT as usize] = OpInfo::new(gas::BASE);

    t[POP as usize] = OpInfo::new(gas::BASE);
    t[MLOAD as usize] = OpInfo::new(gas::VERYLOW);
    t[MSTORE as usize] = OpInfo::new(gas::VERYLOW);
    t[MSTORE8 as usize] = OpInfo::new(gas::VERYLOW);
    t[SLOAD as usize] = OpInfo::new(50);
    t[SSTORE as usize] = OpInfo::new(gas::ZERO);
    t[JUMP as usize] = OpInfo::new(gas::MID);
    t[JUMPI as usize] = OpInfo::new(gas::HIGH);
    t[PC as usize] = OpInfo::new(gas::BASE);
    t[MSIZE as usize] = OpInfo::new(gas::BASE);
    t[GAS as usize] = OpInfo::new(gas::BASE);
    t[JUMPDEST as usize] = OpInfo::new(gas::JUMPDEST);

    let mut i = PUSH1 as usize;
    while i <= PUSH32 as usize {
        t[i] = OpInfo::new(gas::VERYLOW);
        i += 1;
    }
    let mut i = DUP1 as usize;
    while i <= SWAP16 as usize {
        t[i] = OpInfo::new(gas::VERYLOW);
        i += 1;
    }
    let mut i = LOG0 as usize;
    while i <= LOG4 as usize {
        t[i] = OpInfo::new(gas::LOG);
        i += 1;
    }

    t[CREATE as usize] = OpInfo::new(gas::CREATE);
    t[CALL as usize] = OpInfo::new(40);
    t[CALLCODE as usize] = OpInfo::new(40);
    t[RETURN as usize] = OpInfo::new(gas::ZERO);
    t[INVALID as usize] = OpInfo::new(gas::ZERO);
    t[SELFDESTRUCT as usize] = OpInfo::new(gas::ZERO);
    t
}

const fn homestead_table() -> [OpInfo; 256] {
    let mut t = frontier_table();
    // EIP-7
    t[DELEGATECALL as usize] = OpInfo::new(40);
    t
}

/// EIP-150 repricing of IO-heavy opcodes.
const fn tangerine_table() -> [OpInfo; 256] {
    let mut t = homestead_table();
    t[BALANCE as usize] = OpInfo::new(400);
    t[EXTCODESIZE as usize] = OpInfo::new(700);
    t[EXTCODECOPY as usize] = OpInfo::new(700);
    t[SLOAD as usize] = OpInfo::new(200);
    t[CALL as usize] = OpInfo::new(700);
    t[CALLCODE as usize] = OpInfo::new(700);
    t[DELEGATECALL as usize] = OpInfo::new(700);
    t[SELFDESTRUCT as usize] = OpInfo::new(5_000);
    t
}

const fn byzantium_table() -> [OpInfo; 256] {
    let mut t = tangerine_table();
    // EIP-211, EIP-214, EIP-140
    t[RETURNDATASIZE as usize] = OpInfo::new(gas::BASE);
    t[RETURNDATACOPY as usize] = OpInfo::new(gas::VERYLOW);
    t[STATICCALL as usize] = OpInfo::new(700);
    t[REVERT as usize] = OpInfo::new(gas::ZERO);
    t
}

const fn constantinople_table() -> [OpInfo; 256] {
    let mut t = byzantium_table();
    // EIP-145, EIP-1052
    t[SHL as usize] = OpInfo::new(gas::VERYLOW);
    t[SHR as usize] = OpInfo::new(gas::VERYLOW);
    t[SAR as usize] = OpInfo::new(gas::VERYLOW);
    t[EXTCODEHASH as usize] = OpInfo::new(400);
    t
}

const fn petersburg_table() -> [OpInfo; 256] {
    let mut t = constantinople_table();
    // EIP-1014
    t[CREATE2 as usize] = OpInfo::new(gas::CREATE);
    t
}

/// EIP-1344, EIP-1884.
const fn istanbul_table() -> [OpInfo; 256] {
    let mut t = petersburg_table();
    t[CHAINID as usize] = OpInfo::new(gas::BASE);
    t[SELFBALANCE as usize] = OpInfo::new(gas::LOW);
    t[BALANCE as usize] = OpInfo::new(700);
    t[EXTCODEHASH as usize] = OpInfo::new(700);
    t[SLOAD as usize] = OpInfo::new(800);
    t
}

/// EIP-2929: the table holds the warm cost; handlers add the cold surcharge.
const fn berlin_table() -> [OpInfo; 256] {
    let mut t = istanbul_table();
    t[BALANCE as usize] = OpInfo::new(gas::WARM_STORAGE_READ_COST);
    t[EXTCODESIZE as usize] = OpInfo::new(gas::WARM_STORAGE_READ_COST);
    t[EXTCODECOPY as usize] = OpInfo::new(gas::WARM_STORAGE_READ_COST);
    t[EXTCODEHASH as usize] = OpInfo::new(gas::WARM_STORAGE_READ_COST);
    t[SLOAD as usize] = OpInfo::new(gas::WARM_STORAGE_READ_COST);
    t[CALL as usize] = OpInfo::new(gas::WARM_STORAGE_READ_COST);
    t[CALLCODE as usize] = OpInfo::new(gas::WARM_STORAGE_READ_COST);
    t[DELEGATECALL as usize] = OpInfo::new(gas::WARM_STORAGE_READ_COST);
    t[STATICCALL as usize] = OpInfo::new(gas::WARM_STORAGE_READ_COST);
    t[SELFDESTRUCT as usize] = OpInfo::new(5_000);
    t
}

const fn london_table() -> [OpInfo; 256] {
    let mut t = berlin_table();
    // EIP-3198
    t[BASEFEE as usize] = OpInfo::new(gas::BASE);
    t
}

const fn shanghai_table() -> [OpInfo; 256] {
    let mut t = london_table();
    // EIP-3855
    t[PUSH0 as usize] = OpInfo::new(gas::BASE);
    t
}

static FRONTIER_TABLE: [OpInfo; 256] = frontier_table();
static HOMESTEAD_TABLE: [OpInfo; 256] = homestead_table();
static TANGERINE_TABLE: [OpInfo; 256] = tangerine_table();
static BYZANTIUM_TABLE: [OpInfo; 256] = byzantium_table();
static CONSTANTINOPLE_TABLE: [OpInfo; 256] = constantinople_table();
static PETERSBURG_TABLE: [OpInfo; 256] = petersburg_table();
static ISTANBUL_TABLE: [OpInfo; 256] = istanbul_table();
static BERLIN_TABLE: [OpInfo; 256] = berlin_table();
static LONDON_TABLE: [OpInfo; 256] = london_table();
static SHANGHAI_TABLE: [OpInfo; 256] = shanghai_table();

/// The base-gas table for a fork.
pub const fn spec_opcode_gas(spec_id: SpecId) -> &'static [OpInfo; 256] {
    match spec_id {
        SpecId::FRONTIER => &FRONTIER_TABLE,
        SpecId::HOMESTEAD => &HOMESTEAD_TABLE,
        // Spurious Dragon only repriced dynamic costs (EIP-160).
        SpecId::TANGERINE | SpecId::SPURIOUS_DRAGON => &TANGERINE_TABLE,
        SpecId::BYZANTIUM => &BYZANTIUM_TABLE,
        SpecId::CONSTANTINOPLE => &CONSTANTINOPLE_TABLE,
        SpecId::PETERSBURG => &PETERSBURG_TABLE,
        SpecId::ISTANBUL => &ISTANBUL_TABLE,
        SpecId::BERLIN => &BERLIN_TABLE,
        SpecId::LONDON | SpecId::MERGE => &LONDON_TABLE,
        SpecId::SHANGHAI | SpecId::LATEST => &SHANGHAI_TABLE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_inherit_by_override() {
        let frontier = spec_opcode_gas(SpecId::FRONTIER);
        let berlin = spec_opcode_gas(SpecId::BERLIN);
        // untouched entries carry through every fork
        assert_eq!(frontier[ADD as usize], berlin[ADD as usize]);
        // repriced entries differ
        assert_eq!(frontier[SLOAD as usize].gas(), 50);
        assert_eq!(berlin[SLOAD as usize].gas(), 100);
    }

    #[test]
    fn opcode_availability_per_fork() {
        let frontier = spec_opcode_gas(SpecId::FRONTIER);
        assert!(!frontier[DELEGATECALL as usize].is_enabled());
        assert!(!frontier[REVERT as usize].is_enabled());
        assert!(!frontier[SHL as usize].is_enabled());

        assert!(spec_opcode_gas(SpecId::HOMESTEAD)[DELEGATECALL as usize].is_enabled());
        assert!(spec_opcode_gas(SpecId::BYZANTIUM)[REVERT as usize].is_enabled());
        assert!(!spec_opcode_gas(SpecId::CONSTANTINOPLE)[CREATE2 as usize].is_enabled());
        assert!(spec_opcode_gas(SpecId::PETERSBURG)[CREATE2 as usize].is_enabled());
        assert!(!spec_opcode_gas(SpecId::LONDON)[PUSH0 as usize].is_enabled());
        assert!(spec_opcode_gas(SpecId::SHANGHAI)[PUSH0 as usize].is_enabled());
    }

    #[test]
    fn mnemonics_cover_every_enabled_opcode() {
        let table = spec_opcode_gas(SpecId::SHANGHAI);
        for (byte, info) in table.iter().enumerate() {
            if info.is_enabled() {
                assert!(
                    OPCODE_JUMPMAP[byte].is_some(),
                    "opcode {byte:#04x} has no mnemonic"
                );
            }
        }
    }
}
