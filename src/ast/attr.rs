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

//! Node attributes.
//!
//! Nodes carry a fixed set of optional attributes rather than a dynamic map.
//! Passes only read and write the fields they care about.

use std::fmt;

use bitflags::bitflags;

use super::value::Argument;
use crate::error::Message;
use crate::isa::{AddressingMode, Mnemonic};
use crate::symbol::{EntryId, TableId};

/// Dot-commands understood by the assembler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Directive {
    Align,
    Ascii,
    Block,
    Burn,
    Byte,
    End,
    Equate,
    Export,
    Import,
    Input,
    Org,
    Output,
    Scall,
    Section,
    Uscall,
    Word,
}

impl Directive {
    pub const ALL: &'static [Directive] = &[
        Directive::Align,
        Directive::Ascii,
        Directive::Block,
        Directive::Burn,
        Directive::Byte,
        Directive::End,
        Directive::Equate,
        Directive::Export,
        Directive::Import,
        Directive::Input,
        Directive::Org,
        Directive::Output,
        Directive::Scall,
        Directive::Section,
        Directive::Uscall,
        Directive::Word,
    ];

    /// Look a directive up by name, without the leading dot.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|d| d.as_str().eq_ignore_ascii_case(name))
    }

    /// Upper-case name without the leading dot.
    pub fn as_str(&self) -> &'static str {
        match self {
            Directive::Align => "ALIGN",
            Directive::Ascii => "ASCII",
            Directive::Block => "BLOCK",
            Directive::Burn => "BURN",
            Directive::Byte => "BYTE",
            Directive::End => "END",
            Directive::Equate => "EQUATE",
            Directive::Export => "EXPORT",
            Directive::Import => "IMPORT",
            Directive::Input => "INPUT",
            Directive::Org => "ORG",
            Directive::Output => "OUTPUT",
            Directive::Scall => "SCALL",
            Directive::Section => "SECTION",
            Directive::Uscall => "USCALL",
            Directive::Word => "WORD",
        }
    }

    /// Directives that occupy memory.
    pub fn is_addressed(&self) -> bool {
        matches!(
            self,
            Directive::Align
                | Directive::Ascii
                | Directive::Block
                | Directive::Byte
                | Directive::Word
        )
    }

    /// Directives that have no address column in a listing.
    pub fn is_addressless(&self) -> bool {
        matches!(
            self,
            Directive::End
                | Directive::Export
                | Directive::Import
                | Directive::Input
                | Directive::Output
                | Directive::Scall
                | Directive::Uscall
                | Directive::Section
        )
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ".{}", self.as_str())
    }
}

bitflags! {
    /// Permissions of a section.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct SectionFlags: u8 {
        const R = 0b0001;
        const W = 0b0010;
        const X = 0b0100;
        /// Counted for size, never emitted.
        const Z = 0b1000;
    }
}

impl SectionFlags {
    /// Flags named by the letters of `text`; unknown letters are ignored.
    pub fn from_letters(text: &str) -> Self {
        let mut flags = SectionFlags::empty();
        for c in text.chars() {
            match c.to_ascii_lowercase() {
                'r' => flags |= SectionFlags::R,
                'w' => flags |= SectionFlags::W,
                'x' => flags |= SectionFlags::X,
                'z' => flags |= SectionFlags::Z,
                _ => {}
            }
        }
        flags
    }

    /// Lower-case letters, in `rwxz` order.
    pub fn letters(&self) -> String {
        [
            (SectionFlags::R, 'r'),
            (SectionFlags::W, 'w'),
            (SectionFlags::X, 'x'),
            (SectionFlags::Z, 'z'),
        ]
        .iter()
        .filter(|(flag, _)| self.contains(*flag))
        .map(|(_, c)| *c)
        .collect()
    }
}

impl Default for SectionFlags {
    fn default() -> Self {
        SectionFlags::R | SectionFlags::W | SectionFlags::X
    }
}

/// Name and permissions of a section node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionInfo {
    pub name: String,
    pub flags: SectionFlags,
}

impl Default for SectionInfo {
    fn default() -> Self {
        Self {
            name: ".text".to_string(),
            flags: SectionFlags::default(),
        }
    }
}

/// A symbol declared by a line (`name:`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolDeclaration {
    pub name: String,
    pub entry: EntryId,
}

/// Where a node came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    /// 0-indexed line number.
    pub line: usize,
}

/// Where a comment line is printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommentIndent {
    /// At column 0.
    Left,
    /// Aligned with instruction comments.
    #[default]
    Instruction,
}

/// Memory occupied by a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Address {
    pub start: u16,
    pub size: u16,
}

/// Things a node asks to be left out of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Hide {
    /// No bytes in the object file, size still counted.
    pub object: bool,
    /// No address column in a listing.
    pub address_in_listing: bool,
}

/// All attributes a node may carry.
#[derive(Debug, Clone, Default)]
pub struct Attributes {
    pub symbol: Option<SymbolDeclaration>,
    pub mnemonic: Option<Mnemonic>,
    pub addressing_mode: Option<AddressingMode>,
    pub directive: Option<Directive>,
    pub macro_name: Option<String>,
    pub arguments: Vec<Argument>,
    pub comment: Option<String>,
    pub comment_indent: CommentIndent,
    /// Comment produced around a macro expansion.
    pub is_macro_comment: bool,
    pub section: Option<SectionInfo>,
    /// Scope that names in this subtree are resolved against.
    pub scope: Option<TableId>,
    pub location: Option<SourceLocation>,
    pub address: Option<Address>,
    pub hide: Hide,
    pub errors: Vec<Message>,
}
