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

//! Argument values carried by instructions, directives and macro calls.

use std::fmt;

use crate::symbol::{EntryId, SymbolStore};

/// What an argument denotes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgumentKind {
    /// A decimal literal, possibly negative.
    Decimal(i64),
    /// A hexadecimal literal.
    Hexadecimal(u64),
    /// A character literal, already unescaped.
    Character(u8),
    /// A string literal, already unescaped.
    Text(Vec<u8>),
    /// A bare word that is not looked up as a symbol (macro parameters, flags).
    Identifier,
    /// A symbol reference resolved against a table.
    Symbol(EntryId),
}

/// One argument and its source spelling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    pub kind: ArgumentKind,
    /// Exactly as written, quotes included.
    pub text: String,
}

impl Argument {
    pub fn new(kind: ArgumentKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    pub fn decimal(value: i64) -> Self {
        Self::new(ArgumentKind::Decimal(value), value.to_string())
    }

    pub fn hexadecimal(value: u64) -> Self {
        Self::new(ArgumentKind::Hexadecimal(value), format!("0x{:04X}", value))
    }

    /// A string literal; `text` is stored with surrounding quotes.
    pub fn string(value: &str) -> Self {
        Self::new(
            ArgumentKind::Text(value.as_bytes().to_vec()),
            format!("\"{}\"", value),
        )
    }

    pub fn identifier(name: impl Into<String>) -> Self {
        Self::new(ArgumentKind::Identifier, name)
    }

    pub fn symbol(name: impl Into<String>, entry: EntryId) -> Self {
        Self::new(ArgumentKind::Symbol(entry), name)
    }

    /// Whether the argument evaluates to a number.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self.kind,
            ArgumentKind::Decimal(_)
                | ArgumentKind::Hexadecimal(_)
                | ArgumentKind::Character(_)
                | ArgumentKind::Symbol(_)
        )
    }

    /// Whether the argument is a string literal.
    pub fn is_text(&self) -> bool {
        matches!(self.kind, ArgumentKind::Text(_))
    }

    /// Whether the encoded size is known without looking at the value.
    pub fn is_fixed_size(&self) -> bool {
        !self.is_text()
    }

    /// Bytes occupied when the argument is emitted as data.
    pub fn size(&self) -> u16 {
        match &self.kind {
            ArgumentKind::Text(bytes) => bytes.len().min(usize::from(u16::MAX)) as u16,
            ArgumentKind::Character(_) => 1,
            _ => 2,
        }
    }

    /// Fewest bytes that can hold the value.
    pub fn required_bytes(&self) -> u16 {
        match &self.kind {
            ArgumentKind::Decimal(v) if (-128..=255).contains(v) => 1,
            ArgumentKind::Decimal(_) => 2,
            ArgumentKind::Hexadecimal(v) if *v <= 0xFF => 1,
            ArgumentKind::Hexadecimal(_) => 2,
            ArgumentKind::Character(_) => 1,
            ArgumentKind::Text(bytes) => bytes.len().min(usize::from(u16::MAX)) as u16,
            ArgumentKind::Identifier | ArgumentKind::Symbol(_) => 2,
        }
    }

    /// The symbol this argument refers to, if any.
    pub fn entry(&self) -> Option<EntryId> {
        match self.kind {
            ArgumentKind::Symbol(id) => Some(id),
            _ => None,
        }
    }

    /// Numeric value, following symbols through the store.
    pub fn value(&self, store: &SymbolStore) -> Option<u64> {
        match &self.kind {
            ArgumentKind::Decimal(v) => Some(*v as u64),
            ArgumentKind::Hexadecimal(v) => Some(*v),
            ArgumentKind::Character(c) => Some(u64::from(*c)),
            ArgumentKind::Symbol(id) => Some(store.resolve(*id).value()),
            ArgumentKind::Text(_) | ArgumentKind::Identifier => None,
        }
    }

    /// The unquoted contents of a string literal.
    pub fn as_text(&self) -> Option<String> {
        match &self.kind {
            ArgumentKind::Text(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
            _ => None,
        }
    }
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
