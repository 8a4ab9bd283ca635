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

//! Hierarchical symbol tables with ELF-like linkage.
//!
//! This module provides:
//! - [`SymbolStore`] - an arena owning every table and entry of one or more trees
//! - [`Value`] - what a symbol currently denotes
//! - [`fork`] - reference-preserving deep copies of a table tree
//! - [`visit`] - policy-driven walks (lookup, enumeration, relocation, listings)
//!
//! Tables and entries are addressed by generation-checked ids. A parent link or
//! a pointer held by a value is just an id, validated whenever it is followed,
//! so dropping a tree never leaves anything dangling.

pub mod fork;
pub mod table;
pub mod value;
pub mod visit;

use thiserror::Error;

pub use fork::{fork, ForkMap};
pub use table::{Entry, EntryId, SymbolStore, Table, TableId};
pub use value::{LocationKind, MaskedBits, Value};
pub use visit::{adjust_offset, enumerate, exists, root_table, select_by_name, table_listing};

/// How many times, and in which context, a symbol has been defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub enum DefinitionState {
    /// Referenced, but no definition seen yet.
    #[default]
    Undefined,
    /// Exactly one definition.
    Single,
    /// Defined more than once within its scope.
    Multiple,
    /// Conflicts with a global definition from another table.
    ExternalMultiple,
}

impl DefinitionState {
    /// Advance by one definition, saturating at [`DefinitionState::Multiple`].
    ///
    /// `ExternalMultiple` is terminal and never changes.
    pub fn advance(self) -> Self {
        match self {
            DefinitionState::Undefined => DefinitionState::Single,
            DefinitionState::Single | DefinitionState::Multiple => DefinitionState::Multiple,
            DefinitionState::ExternalMultiple => DefinitionState::ExternalMultiple,
        }
    }
}

/// Visibility of a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Binding {
    /// Only visible inside its own table.
    #[default]
    Local,
    /// Must be unique across the whole tree.
    Global,
    /// An alias resolved to a global living elsewhere.
    Imported,
}

/// Coarse classification of a symbol's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolType {
    Empty,
    Object,
    Code,
    Constant,
    PtrToSym,
    Deleted,
}

/// Which part of a table tree an operation visits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraversalPolicy {
    /// The table itself and all of its descendants.
    Children,
    /// Only the descendants of the table.
    ChildrenOnly,
    /// The table's parent, the parent's descendants and so the table's siblings.
    Siblings,
    /// Every table reachable from the root.
    WholeTree,
}

/// Errors raised when the arena is used with ids that are no longer valid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SymbolError {
    #[error("symbol table {0:?} is no longer alive")]
    StaleTable(TableId),
    #[error("symbol entry {0:?} is no longer alive")]
    StaleEntry(EntryId),
    #[error("value was deleted and must not be read")]
    DeletedValue,
    #[error("external symbol table {0:?} has been dropped")]
    DroppedTable(TableId),
    #[error("pointer chain is longer than {0} hops")]
    PointerChainTooLong(usize),
    #[error("table {0:?} already has a parent")]
    AlreadyAttached(TableId),
}
