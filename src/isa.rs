// Pepasm - Symbol resolution and linkage core for a two-unit Pep/10 assembler
// Copyright (C) 2026  Marcel Joachim Kloubert <marcel@kloubert.dev>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Pep/10 instruction set facts needed for layout.
//!
//! Only what address assignment and validation need lives here: which
//! mnemonics exist, whether they take an operand, and which addressing modes
//! each accepts. Encoding bytes is the object-code writer's job.

use std::fmt;

/// Addressing modes for non-unary instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressingMode {
    /// Immediate (`i`)
    I,
    /// Direct (`d`)
    D,
    /// Indirect (`n`)
    N,
    /// Stack-relative (`s`)
    S,
    /// Stack-relative deferred (`sf`)
    SF,
    /// Indexed (`x`)
    X,
    /// Stack-indexed (`sx`)
    SX,
    /// Stack-deferred indexed (`sfx`)
    SFX,
}

impl AddressingMode {
    /// Parse a mode suffix, case-insensitively.
    pub fn parse(text: &str) -> Option<Self> {
        match text.to_ascii_lowercase().as_str() {
            "i" => Some(Self::I),
            "d" => Some(Self::D),
            "n" => Some(Self::N),
            "s" => Some(Self::S),
            "sf" => Some(Self::SF),
            "x" => Some(Self::X),
            "sx" => Some(Self::SX),
            "sfx" => Some(Self::SFX),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::I => "i",
            Self::D => "d",
            Self::N => "n",
            Self::S => "s",
            Self::SF => "sf",
            Self::X => "x",
            Self::SX => "sx",
            Self::SFX => "sfx",
        }
    }
}

impl fmt::Display for AddressingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which operands an instruction accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operands {
    /// No operand at all.
    None,
    /// Branches: immediate or indexed, immediate when omitted.
    BranchModes,
    /// Every mode.
    All,
    /// Every mode except immediate (stores).
    NoImmediate,
}

macro_rules! mnemonics {
    ($($name:ident => $opcode:literal, $operands:ident;)*) => {
        /// Pep/10 mnemonics.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Mnemonic {
            $($name,)*
        }

        impl Mnemonic {
            /// Every mnemonic, in opcode order.
            pub const ALL: &'static [Mnemonic] = &[$(Mnemonic::$name,)*];

            /// Look a mnemonic up by name, case-insensitively.
            pub fn parse(text: &str) -> Option<Self> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|m| m.as_str().eq_ignore_ascii_case(text))
            }

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Mnemonic::$name => stringify!($name),)*
                }
            }

            /// Opcode of the instruction's first addressing mode.
            pub fn base_opcode(&self) -> u8 {
                match self {
                    $(Mnemonic::$name => $opcode,)*
                }
            }

            fn operands(&self) -> Operands {
                match self {
                    $(Mnemonic::$name => Operands::$operands,)*
                }
            }
        }
    };
}

mnemonics! {
    RET => 0x01, None;
    SRET => 0x02, None;
    MOVFLGA => 0x03, None;
    MOVAFLG => 0x04, None;
    MOVSPA => 0x05, None;
    MOVASP => 0x06, None;
    NOP => 0x07, None;
    NEGA => 0x18, None;
    NEGX => 0x19, None;
    ASLA => 0x1A, None;
    ASLX => 0x1B, None;
    ASRA => 0x1C, None;
    ASRX => 0x1D, None;
    NOTA => 0x1E, None;
    NOTX => 0x1F, None;
    ROLA => 0x20, None;
    ROLX => 0x21, None;
    RORA => 0x22, None;
    RORX => 0x23, None;
    BR => 0x24, BranchModes;
    BRLE => 0x26, BranchModes;
    BRLT => 0x28, BranchModes;
    BREQ => 0x2A, BranchModes;
    BRNE => 0x2C, BranchModes;
    BRGE => 0x2E, BranchModes;
    BRGT => 0x30, BranchModes;
    BRV => 0x32, BranchModes;
    BRC => 0x34, BranchModes;
    CALL => 0x36, BranchModes;
    SCALL => 0x38, All;
    ADDSP => 0x40, All;
    SUBSP => 0x48, All;
    ADDA => 0x50, All;
    ADDX => 0x58, All;
    SUBA => 0x60, All;
    SUBX => 0x68, All;
    ANDA => 0x70, All;
    ANDX => 0x78, All;
    ORA => 0x80, All;
    ORX => 0x88, All;
    XORA => 0x90, All;
    XORX => 0x98, All;
    CPWA => 0xA0, All;
    CPWX => 0xA8, All;
    CPBA => 0xB0, All;
    CPBX => 0xB8, All;
    LDWA => 0xC0, All;
    LDWX => 0xC8, All;
    LDBA => 0xD0, All;
    LDBX => 0xD8, All;
    STWA => 0xE0, NoImmediate;
    STWX => 0xE8, NoImmediate;
    STBA => 0xF0, NoImmediate;
    STBX => 0xF8, NoImmediate;
}

impl Mnemonic {
    /// Unary instructions take no operand.
    pub fn is_unary(&self) -> bool {
        self.operands() == Operands::None
    }

    /// Size of the encoded instruction in bytes.
    pub fn byte_size(&self) -> u16 {
        if self.is_unary() {
            1
        } else {
            3
        }
    }

    /// Whether `mode` may be written after this mnemonic's operand.
    pub fn allows(&self, mode: AddressingMode) -> bool {
        match self.operands() {
            Operands::None => false,
            Operands::BranchModes => matches!(mode, AddressingMode::I | AddressingMode::X),
            Operands::All => true,
            Operands::NoImmediate => mode != AddressingMode::I,
        }
    }

    /// The mode assumed when none is written, if omitting it is legal.
    pub fn default_mode(&self) -> Option<AddressingMode> {
        match self.operands() {
            Operands::BranchModes => Some(AddressingMode::I),
            _ => None,
        }
    }
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
