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

//! Reference-preserving deep copies of a table tree.
//!
//! A fork runs in three passes and the order matters:
//! 1. copy every table, keeping the parent/child shape
//! 2. copy every entry as a shell (name, binding, state, section index)
//! 3. copy every value, retargeting internal pointers through the map
//!
//! Pass 3 can only retarget a pointer once its destination has a copy, so
//! both maps must be complete before any value is cloned.

use super::table::{EntryId, SymbolStore, TableId};
use super::value::Value;
use super::SymbolError;

/// Source-to-copy correspondence produced by [`fork`].
///
/// Both maps are indexed by the source id's arena slot.
#[derive(Debug, Clone, Default)]
pub struct ForkMap {
    tables: Vec<Option<(TableId, TableId)>>,
    entries: Vec<Option<(EntryId, EntryId)>>,
}

impl ForkMap {
    fn with_capacity(tables: usize, entries: usize) -> Self {
        Self {
            tables: vec![None; tables],
            entries: vec![None; entries],
        }
    }

    fn map_table(&mut self, source: TableId, copy: TableId) {
        if self.tables.len() <= source.index() {
            self.tables.resize(source.index() + 1, None);
        }
        self.tables[source.index()] = Some((source, copy));
    }

    fn map_entry(&mut self, source: EntryId, copy: EntryId) {
        if self.entries.len() <= source.index() {
            self.entries.resize(source.index() + 1, None);
        }
        self.entries[source.index()] = Some((source, copy));
    }

    /// The copy of `source`, if it was part of the fork.
    pub fn table(&self, source: TableId) -> Option<TableId> {
        match self.tables.get(source.index()) {
            Some(Some((from, to))) if *from == source => Some(*to),
            _ => None,
        }
    }

    /// The copy of `source`, if it was part of the fork.
    pub fn entry(&self, source: EntryId) -> Option<EntryId> {
        match self.entries.get(source.index()) {
            Some(Some((from, to))) if *from == source => Some(*to),
            _ => None,
        }
    }

    /// All (source, copy) table pairs.
    pub fn tables(&self) -> impl Iterator<Item = (TableId, TableId)> + '_ {
        self.tables.iter().flatten().copied()
    }

    /// All (source, copy) entry pairs.
    pub fn entries(&self) -> impl Iterator<Item = (EntryId, EntryId)> + '_ {
        self.entries.iter().flatten().copied()
    }
}

/// Deep-copy the tree rooted at `source`.
///
/// The copy is a new root with no parent; attach it with
/// [`SymbolStore::attach`] to give it a place in another tree. Pointers whose
/// target lies outside the copied subtree keep pointing at the original.
pub fn fork(store: &mut SymbolStore, source: TableId) -> Result<(TableId, ForkMap), SymbolError> {
    let mut map = ForkMap::with_capacity(store.table_capacity(), store.entry_capacity());

    let root = fork_tables(store, source, None, &mut map)?;
    fork_symbol_refs(store, &mut map)?;
    fork_symbol_values(store, &map)?;

    log::debug!(
        "forked symbol tree {:?} into {:?} ({} tables, {} entries)",
        source,
        root,
        map.tables().count(),
        map.entries().count()
    );
    Ok((root, map))
}

fn fork_tables(
    store: &mut SymbolStore,
    source: TableId,
    parent: Option<TableId>,
    map: &mut ForkMap,
) -> Result<TableId, SymbolError> {
    let copy = match parent {
        Some(parent) => store.add_child(parent)?,
        None => {
            let pointer_size = store.pointer_size(source)?;
            store.add_root(pointer_size)
        }
    };
    map.map_table(source, copy);

    let children = store
        .table(source)
        .map(|t| t.children().to_vec())
        .unwrap_or_default();
    for child in children {
        fork_tables(store, child, Some(copy), map)?;
    }
    Ok(copy)
}

fn fork_symbol_refs(store: &mut SymbolStore, map: &mut ForkMap) -> Result<(), SymbolError> {
    let pairs: Vec<_> = map.tables().collect();
    for (source, copy) in pairs {
        let ids: Vec<EntryId> = store.entries(source).collect();
        for id in ids {
            let Some(original) = store.entry(id).cloned() else {
                return Err(SymbolError::StaleEntry(id));
            };
            let new_id = store.insert_entry(copy, original.name())?;
            if let Some(shell) = store.entry_mut(new_id) {
                shell.binding = original.binding;
                shell.state = original.state;
                shell.section_index = original.section_index;
            }
            map.map_entry(id, new_id);
        }
    }
    Ok(())
}

fn fork_symbol_values(store: &mut SymbolStore, map: &ForkMap) -> Result<(), SymbolError> {
    for (source, copy) in map.entries() {
        let value = store
            .entry(source)
            .map(|e| e.value.clone())
            .ok_or(SymbolError::StaleEntry(source))?;
        let value = match value {
            Value::InternalPointer {
                pointer_size,
                target,
            } => Value::InternalPointer {
                pointer_size,
                target: map.entry(target).unwrap_or(target),
            },
            other => other,
        };
        store.set_value(copy, value)?;
    }
    Ok(())
}
