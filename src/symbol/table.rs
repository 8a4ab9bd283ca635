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

//! The symbol table arena.
//!
//! Every table and entry of every tree lives in one [`SymbolStore`]. A tree
//! is made of tables linked by parent ids and child lists; entries belong to
//! exactly one table. Linkage (local, global, imported) is resolved
//! incrementally as names are referenced, defined and exported, so the
//! result is the same regardless of the order those calls arrive in.

use indexmap::IndexMap;

use super::value::{MaskedBits, Value};
use super::visit::select_by_name;
use super::{Binding, DefinitionState, SymbolError, TraversalPolicy};

/// Handle to a table in a [`SymbolStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId {
    index: u32,
    generation: u32,
}

/// Handle to an entry in a [`SymbolStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId {
    index: u32,
    generation: u32,
}

impl TableId {
    /// Slot index inside the arena.
    pub fn index(&self) -> usize {
        self.index as usize
    }
}

impl EntryId {
    /// Slot index inside the arena.
    pub fn index(&self) -> usize {
        self.index as usize
    }
}

/// One scope of symbols.
#[derive(Debug, Clone)]
pub struct Table {
    parent: Option<TableId>,
    children: Vec<TableId>,
    entries: IndexMap<String, EntryId>,
    pointer_size: u16,
}

impl Table {
    fn new(parent: Option<TableId>, pointer_size: u16) -> Self {
        Self {
            parent,
            children: Vec::new(),
            entries: IndexMap::new(),
            pointer_size,
        }
    }

    /// The enclosing table, `None` for a root.
    pub fn parent(&self) -> Option<TableId> {
        self.parent
    }

    pub fn children(&self) -> &[TableId] {
        &self.children
    }

    /// Pointer size in bytes, shared by the whole tree.
    pub fn pointer_size(&self) -> u16 {
        self.pointer_size
    }

    /// Number of locally owned entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One name inside a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    table: TableId,
    name: String,
    pub state: DefinitionState,
    pub binding: Binding,
    pub value: Value,
    /// Index of the section the symbol ends up in, assigned with addresses.
    pub section_index: u16,
}

impl Entry {
    fn new(table: TableId, name: &str) -> Self {
        Self {
            table,
            name: name.to_string(),
            state: DefinitionState::Undefined,
            binding: Binding::Local,
            value: Value::default(),
            section_index: 0,
        }
    }

    /// The table owning this entry.
    pub fn table(&self) -> TableId {
        self.table
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone)]
struct Slot<T> {
    generation: u32,
    item: Option<T>,
}

/// Generational slot storage with index reuse.
#[derive(Debug, Clone)]
struct Arena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }
}

impl<T> Arena<T> {
    fn insert(&mut self, item: T) -> (u32, u32) {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.item = Some(item);
            (index, slot.generation)
        } else {
            self.slots.push(Slot {
                generation: 0,
                item: Some(item),
            });
            ((self.slots.len() - 1) as u32, 0)
        }
    }

    fn get(&self, index: u32, generation: u32) -> Option<&T> {
        self.slots
            .get(index as usize)
            .filter(|slot| slot.generation == generation)
            .and_then(|slot| slot.item.as_ref())
    }

    fn get_mut(&mut self, index: u32, generation: u32) -> Option<&mut T> {
        self.slots
            .get_mut(index as usize)
            .filter(|slot| slot.generation == generation)
            .and_then(|slot| slot.item.as_mut())
    }

    fn remove(&mut self, index: u32, generation: u32) -> Option<T> {
        let slot = self.slots.get_mut(index as usize)?;
        if slot.generation != generation {
            return None;
        }
        let item = slot.item.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(index);
        Some(item)
    }

    fn capacity(&self) -> usize {
        self.slots.len()
    }
}

/// Owner of every symbol table and entry.
#[derive(Debug, Clone, Default)]
pub struct SymbolStore {
    tables: Arena<Table>,
    entries: Arena<Entry>,
}

impl SymbolStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new root table for a tree whose pointers are `pointer_size` bytes.
    pub fn add_root(&mut self, pointer_size: u16) -> TableId {
        let (index, generation) = self.tables.insert(Table::new(None, pointer_size));
        TableId { index, generation }
    }

    /// Create a child scope of `parent` sharing its pointer size.
    pub fn add_child(&mut self, parent: TableId) -> Result<TableId, SymbolError> {
        let pointer_size = self.pointer_size(parent)?;
        let (index, generation) = self
            .tables
            .insert(Table::new(Some(parent), pointer_size));
        let child = TableId { index, generation };
        self.table_mut(parent)?.children.push(child);
        Ok(child)
    }

    /// Adopt the root of another tree as a child of `parent`.
    ///
    /// Used to hang a forked template below the scope that expanded it.
    pub fn attach(&mut self, parent: TableId, child: TableId) -> Result<(), SymbolError> {
        if self.table_ref(child)?.parent.is_some() || self.root_of(parent)? == child {
            return Err(SymbolError::AlreadyAttached(child));
        }
        self.table_ref(parent)?;
        self.table_mut(child)?.parent = Some(parent);
        self.table_mut(parent)?.children.push(child);
        Ok(())
    }

    pub fn table(&self, id: TableId) -> Option<&Table> {
        self.tables.get(id.index, id.generation)
    }

    pub fn is_live_table(&self, id: TableId) -> bool {
        self.table(id).is_some()
    }

    pub fn entry(&self, id: EntryId) -> Option<&Entry> {
        self.entries.get(id.index, id.generation)
    }

    pub fn entry_mut(&mut self, id: EntryId) -> Option<&mut Entry> {
        self.entries.get_mut(id.index, id.generation)
    }

    pub fn is_live_entry(&self, id: EntryId) -> bool {
        self.entry(id).is_some()
    }

    fn table_ref(&self, id: TableId) -> Result<&Table, SymbolError> {
        self.table(id).ok_or(SymbolError::StaleTable(id))
    }

    fn table_mut(&mut self, id: TableId) -> Result<&mut Table, SymbolError> {
        self.tables
            .get_mut(id.index, id.generation)
            .ok_or(SymbolError::StaleTable(id))
    }

    fn entry_ref_mut(&mut self, id: EntryId) -> Result<&mut Entry, SymbolError> {
        self.entry_mut(id).ok_or(SymbolError::StaleEntry(id))
    }

    pub fn pointer_size(&self, table: TableId) -> Result<u16, SymbolError> {
        Ok(self.table_ref(table)?.pointer_size)
    }

    pub fn parent(&self, table: TableId) -> Option<TableId> {
        self.table(table).and_then(|t| t.parent)
    }

    /// Walk parent links up to the root of `table`'s tree.
    pub fn root_of(&self, table: TableId) -> Result<TableId, SymbolError> {
        let mut current = table;
        while let Some(parent) = self.table_ref(current)?.parent {
            current = parent;
        }
        Ok(current)
    }

    /// Number of table slots ever allocated.
    pub fn table_capacity(&self) -> usize {
        self.tables.capacity()
    }

    /// Number of entry slots ever allocated.
    pub fn entry_capacity(&self) -> usize {
        self.entries.capacity()
    }

    /// Local lookup. Never creates an entry.
    pub fn get(&self, table: TableId, name: &str) -> Option<EntryId> {
        self.table(table)
            .and_then(|t| t.entries.get(name))
            .copied()
    }

    /// Local membership test.
    pub fn exists(&self, table: TableId, name: &str) -> bool {
        self.get(table, name).is_some()
    }

    /// Entries owned by `table`, in insertion order.
    pub fn entries(&self, table: TableId) -> impl Iterator<Item = EntryId> + '_ {
        self.table(table)
            .into_iter()
            .flat_map(|t| t.entries.values().copied())
    }

    /// Resolve the value of `entry` to concrete bits.
    pub fn resolve(&self, entry: EntryId) -> MaskedBits {
        match self.entry(entry) {
            Some(e) => e.value.resolve(self),
            None => {
                log::warn!("resolving stale symbol entry {:?}", entry);
                MaskedBits::default()
            }
        }
    }

    pub fn set_value(&mut self, entry: EntryId, value: Value) -> Result<(), SymbolError> {
        self.entry_ref_mut(entry)?.value = value;
        Ok(())
    }

    pub(super) fn insert_entry(&mut self, table: TableId, name: &str) -> Result<EntryId, SymbolError> {
        self.table_ref(table)?;
        let (index, generation) = self.entries.insert(Entry::new(table, name));
        let id = EntryId { index, generation };
        self.table_mut(table)?.entries.insert(name.to_string(), id);
        Ok(id)
    }

    /// Same-named entries anywhere in the tree, excluding `table`'s own.
    fn foreign_same_name(&self, table: TableId, name: &str) -> Vec<EntryId> {
        select_by_name(self, table, name, TraversalPolicy::WholeTree)
            .into_iter()
            .filter(|&id| self.entry(id).is_some_and(|e| e.table != table))
            .collect()
    }

    /// Return the local entry for `name`, creating it if needed, and link it
    /// to a global of the same name elsewhere in the tree.
    ///
    /// With exactly one such global the entry becomes an imported alias of
    /// it. With more than one the program is already invalid and the entry
    /// is poisoned as a conflicting global.
    pub fn reference(&mut self, table: TableId, name: &str) -> Result<EntryId, SymbolError> {
        let local = match self.get(table, name) {
            Some(id) => id,
            None => self.insert_entry(table, name)?,
        };
        let pointer_size = self.pointer_size(table)?;

        let globals: Vec<EntryId> = self
            .foreign_same_name(table, name)
            .into_iter()
            .filter(|&id| self.entry(id).is_some_and(|e| e.binding == Binding::Global))
            .collect();

        match globals.as_slice() {
            [] => {}
            [global] => {
                let global = *global;
                let global_state = self
                    .entry(global)
                    .map(|e| e.state)
                    .unwrap_or_default();
                let entry = self.entry_ref_mut(local)?;
                // A global that meets another global was already poisoned by mark_global.
                if entry.binding != Binding::Global {
                    entry.value = Value::InternalPointer {
                        pointer_size,
                        target: global,
                    };
                    entry.binding = Binding::Imported;
                    entry.state = global_state;
                }
            }
            _ => {
                let entry = self.entry_ref_mut(local)?;
                entry.state = DefinitionState::ExternalMultiple;
                entry.binding = Binding::Global;
            }
        }
        Ok(local)
    }

    /// Record a definition of `name` in `table`.
    pub fn define(&mut self, table: TableId, name: &str) -> Result<EntryId, SymbolError> {
        let local = self.reference(table, name)?;
        let pointer_size = self.pointer_size(table)?;

        let entry = self.entry_ref_mut(local)?;
        let binding = entry.binding;
        match binding {
            Binding::Imported => entry.state = DefinitionState::ExternalMultiple,
            Binding::Local => entry.state = entry.state.advance(),
            Binding::Global => {
                entry.state = entry.state.advance();
                let state = entry.state;
                for other in self.foreign_same_name(table, name) {
                    let other = self.entry_ref_mut(other)?;
                    if other.binding == Binding::Imported {
                        other.value = Value::InternalPointer {
                            pointer_size,
                            target: local,
                        };
                        other.state = state;
                    }
                }
            }
        }
        Ok(local)
    }

    /// Promote `name` in `table` to a global and rewire every same-named local
    /// elsewhere in the tree to import it.
    pub fn mark_global(&mut self, table: TableId, name: &str) -> Result<EntryId, SymbolError> {
        let local = self.reference(table, name)?;
        let pointer_size = self.pointer_size(table)?;
        self.entry_ref_mut(local)?.binding = Binding::Global;

        for other_id in self.foreign_same_name(table, name) {
            let other_binding = self.entry_ref_mut(other_id)?.binding;
            match other_binding {
                Binding::Global => {
                    self.entry_ref_mut(other_id)?.state = DefinitionState::ExternalMultiple;
                    self.entry_ref_mut(local)?.state = DefinitionState::ExternalMultiple;
                }
                Binding::Local => {
                    let state = self.entry_ref_mut(local)?.state;
                    let other = self.entry_ref_mut(other_id)?;
                    other.value = Value::InternalPointer {
                        pointer_size,
                        target: local,
                    };
                    other.binding = Binding::Imported;
                    other.state = state;
                }
                Binding::Imported => {}
            }
        }
        Ok(local)
    }

    /// Define `name` in `table` as an alias of the same name in `other`,
    /// which usually belongs to a different tree.
    ///
    /// Returns `None` when `other` has no such name.
    pub fn import(
        &mut self,
        table: TableId,
        other: TableId,
        name: &str,
    ) -> Result<Option<EntryId>, SymbolError> {
        let Some(external) = self.get(other, name) else {
            return Ok(None);
        };
        let prior = self
            .get(table, name)
            .and_then(|id| self.entry(id))
            .map(|e| e.state)
            .unwrap_or_default();
        let local = self.define(table, name)?;
        let pointer_size = self.pointer_size(table)?;

        let entry = self.entry_ref_mut(local)?;
        entry.binding = Binding::Imported;
        // A name already defined here cannot also be an import.
        if prior != DefinitionState::Undefined {
            entry.state = DefinitionState::ExternalMultiple;
        }
        entry.value = Value::ExternalPointer {
            pointer_size,
            table: other,
            target: external,
        };
        Ok(Some(local))
    }

    /// Release `table` and everything below it.
    ///
    /// Ids into the released tree stay harmless: lookups through them fail
    /// and pointers into it resolve to zero.
    pub fn drop_tree(&mut self, table: TableId) -> Result<(), SymbolError> {
        if let Some(parent) = self.table_ref(table)?.parent {
            if let Ok(parent) = self.table_mut(parent) {
                parent.children.retain(|&child| child != table);
            }
        }

        let mut pending = vec![table];
        while let Some(current) = pending.pop() {
            if let Some(removed) = self.tables.remove(current.index, current.generation) {
                for entry in removed.entries.values() {
                    self.entries.remove(entry.index, entry.generation);
                }
                pending.extend(removed.children);
            }
        }
        log::debug!("dropped symbol tree rooted at {:?}", table);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::value::LocationKind;
    use pretty_assertions::assert_eq;

    fn entry(store: &SymbolStore, id: EntryId) -> &Entry {
        store.entry(id).unwrap()
    }

    #[test]
    fn test_reference_creates_undefined_local() {
        let mut store = SymbolStore::new();
        let root = store.add_root(2);
        let id = store.reference(root, "hello").unwrap();

        let e = entry(&store, id);
        assert_eq!(e.name(), "hello");
        assert_eq!(e.table(), root);
        assert_eq!(e.state, DefinitionState::Undefined);
        assert_eq!(e.binding, Binding::Local);
        assert_eq!(store.reference(root, "hello").unwrap(), id);
    }

    #[test]
    fn test_get_does_not_create() {
        let mut store = SymbolStore::new();
        let root = store.add_root(2);
        assert_eq!(store.get(root, "x"), None);
        assert!(!store.exists(root, "x"));
        store.reference(root, "x").unwrap();
        assert!(store.exists(root, "x"));
    }

    #[test]
    fn test_define_twice_is_multiple() {
        let mut store = SymbolStore::new();
        let root = store.add_root(2);
        store.define(root, "x").unwrap();
        let id = store.define(root, "x").unwrap();
        assert_eq!(entry(&store, id).state, DefinitionState::Multiple);
        store.define(root, "x").unwrap();
        assert_eq!(entry(&store, id).state, DefinitionState::Multiple);
    }

    #[test]
    fn test_locals_in_sibling_tables_are_independent() {
        let mut store = SymbolStore::new();
        let root = store.add_root(2);
        let a = store.add_child(root).unwrap();
        let b = store.add_child(root).unwrap();

        let in_a = store.define(a, "loop").unwrap();
        let in_b = store.define(b, "loop").unwrap();
        assert_eq!(entry(&store, in_a).state, DefinitionState::Single);
        assert_eq!(entry(&store, in_b).state, DefinitionState::Single);
        assert_eq!(entry(&store, in_b).binding, Binding::Local);
    }

    #[test]
    fn test_reference_after_global_imports() {
        let mut store = SymbolStore::new();
        let root = store.add_root(2);
        let child = store.add_child(root).unwrap();

        let global = store.define(root, "main").unwrap();
        store.mark_global(root, "main").unwrap();
        store
            .set_value(global, Value::location(1, 2, 0x10, LocationKind::Code))
            .unwrap();

        let alias = store.reference(child, "main").unwrap();
        let e = entry(&store, alias);
        assert_eq!(e.binding, Binding::Imported);
        assert_eq!(e.state, DefinitionState::Single);
        assert_eq!(
            e.value,
            Value::InternalPointer {
                pointer_size: 2,
                target: global
            }
        );
        assert_eq!(store.resolve(alias), store.resolve(global));
    }

    #[test]
    fn test_mark_global_converts_existing_locals() {
        let mut store = SymbolStore::new();
        let root = store.add_root(2);
        let child = store.add_child(root).unwrap();

        let early = store.reference(child, "shared").unwrap();
        let global = store.define(root, "shared").unwrap();
        store.mark_global(root, "shared").unwrap();

        let e = entry(&store, early);
        assert_eq!(e.binding, Binding::Imported);
        assert_eq!(e.state, DefinitionState::Single);
        assert_eq!(e.value.pointee(), Some(global));
    }

    #[test]
    fn test_two_globals_conflict() {
        let mut store = SymbolStore::new();
        let root = store.add_root(2);
        let a = store.add_child(root).unwrap();
        let b = store.add_child(root).unwrap();

        let first = store.define(a, "dup").unwrap();
        store.mark_global(a, "dup").unwrap();
        store.define(b, "dup").unwrap();
        let second = store.mark_global(b, "dup").unwrap();

        for id in [first, second] {
            let e = entry(&store, id);
            assert_eq!(e.binding, Binding::Global);
            assert_eq!(e.state, DefinitionState::ExternalMultiple);
        }
    }

    #[test]
    fn test_third_reference_to_conflicting_globals_is_poisoned() {
        let mut store = SymbolStore::new();
        let root = store.add_root(2);
        let a = store.add_child(root).unwrap();
        let b = store.add_child(root).unwrap();
        store.mark_global(a, "dup").unwrap();
        store.mark_global(b, "dup").unwrap();

        let third = store.reference(root, "dup").unwrap();
        let e = entry(&store, third);
        assert_eq!(e.binding, Binding::Global);
        assert_eq!(e.state, DefinitionState::ExternalMultiple);
    }

    #[test]
    fn test_defining_an_import_is_an_error() {
        let mut store = SymbolStore::new();
        let root = store.add_root(2);
        let child = store.add_child(root).unwrap();
        store.define(root, "g").unwrap();
        store.mark_global(root, "g").unwrap();

        let alias = store.define(child, "g").unwrap();
        assert_eq!(entry(&store, alias).state, DefinitionState::ExternalMultiple);
    }

    #[test]
    fn test_define_global_updates_imported_aliases() {
        let mut store = SymbolStore::new();
        let root = store.add_root(2);
        let child = store.add_child(root).unwrap();

        store.mark_global(root, "late").unwrap();
        let alias = store.reference(child, "late").unwrap();
        assert_eq!(entry(&store, alias).state, DefinitionState::Undefined);

        let global = store.define(root, "late").unwrap();
        let e = entry(&store, alias);
        assert_eq!(e.state, DefinitionState::Single);
        assert_eq!(e.value.pointee(), Some(global));
    }

    #[test]
    fn test_import_from_other_tree() {
        let mut store = SymbolStore::new();
        let os = store.add_root(2);
        let user = store.add_root(2);

        let loader = store.define(os, "loader").unwrap();
        store.mark_global(os, "loader").unwrap();
        store
            .set_value(loader, Value::location(1, 2, 0xFC17, LocationKind::Code))
            .unwrap();

        let imported = store.import(user, os, "loader").unwrap().unwrap();
        let e = entry(&store, imported);
        assert_eq!(e.binding, Binding::Imported);
        assert_eq!(e.state, DefinitionState::Single);
        assert_eq!(store.resolve(imported).value(), 0xFC17);
        assert_eq!(store.resolve(imported).byte_count, 2);

        assert_eq!(store.import(user, os, "missing").unwrap(), None);
    }

    #[test]
    fn test_separate_roots_do_not_link() {
        let mut store = SymbolStore::new();
        let os = store.add_root(2);
        let user = store.add_root(2);
        store.mark_global(os, "x").unwrap();
        let local = store.reference(user, "x").unwrap();
        assert_eq!(entry(&store, local).binding, Binding::Local);
    }

    #[test]
    fn test_drop_tree_invalidates_ids() {
        let mut store = SymbolStore::new();
        let root = store.add_root(2);
        let child = store.add_child(root).unwrap();
        let id = store.define(child, "gone").unwrap();

        store.drop_tree(root).unwrap();
        assert!(!store.is_live_table(root));
        assert!(!store.is_live_table(child));
        assert!(store.entry(id).is_none());
        assert_eq!(store.reference(child, "gone"), Err(SymbolError::StaleTable(child)));

        // Reused slots get a new generation.
        let fresh = store.add_root(2);
        assert_ne!(fresh, root);
        assert!(!store.is_live_table(root));
    }

    #[test]
    fn test_drop_subtree_detaches_from_parent() {
        let mut store = SymbolStore::new();
        let root = store.add_root(2);
        let child = store.add_child(root).unwrap();
        store.drop_tree(child).unwrap();
        assert!(store.table(root).unwrap().children().is_empty());
    }

    #[test]
    fn test_attach_orphan_root() {
        let mut store = SymbolStore::new();
        let root = store.add_root(2);
        let orphan = store.add_root(2);
        store.attach(root, orphan).unwrap();

        assert_eq!(store.parent(orphan), Some(root));
        assert_eq!(store.root_of(orphan).unwrap(), root);
        assert_eq!(
            store.attach(root, orphan),
            Err(SymbolError::AlreadyAttached(orphan))
        );
        assert_eq!(
            store.attach(orphan, root),
            Err(SymbolError::AlreadyAttached(root))
        );
    }

    #[test]
    fn test_entries_in_insertion_order() {
        let mut store = SymbolStore::new();
        let root = store.add_root(2);
        for name in ["c", "a", "b"] {
            store.reference(root, name).unwrap();
        }
        let names: Vec<_> = store
            .entries(root)
            .map(|id| entry(&store, id).name().to_string())
            .collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }
}
