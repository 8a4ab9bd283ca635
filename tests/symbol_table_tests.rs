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

//! Symbol table tests.
//!
//! These tests drive the public symbol API the way the passes do: nested
//! scopes, globals shared across a tree, imports across trees and the
//! traversal helpers used for listings and relocation.

use pepasm::symbol::{
    adjust_offset, enumerate, exists, root_table, select_by_name, Binding, DefinitionState,
    LocationKind, SymbolError, SymbolStore, SymbolType, TableId, TraversalPolicy, Value,
};
use pretty_assertions::assert_eq;

/// A root with two child scopes, the first of which has a child of its own.
fn tree(store: &mut SymbolStore) -> (TableId, TableId, TableId, TableId) {
    let root = store.add_root(2);
    let left = store.add_child(root).unwrap();
    let right = store.add_child(root).unwrap();
    let nested = store.add_child(left).unwrap();
    (root, left, right, nested)
}

fn state(store: &SymbolStore, table: TableId, name: &str) -> DefinitionState {
    let id = store.get(table, name).unwrap();
    store.entry(id).unwrap().state
}

fn binding(store: &SymbolStore, table: TableId, name: &str) -> Binding {
    let id = store.get(table, name).unwrap();
    store.entry(id).unwrap().binding
}

// ============================================================================
// Definition and Reference
// ============================================================================

#[test]
fn test_forward_reference_then_define() {
    let mut store = SymbolStore::new();
    let root = store.add_root(2);

    let referenced = store.reference(root, "done").unwrap();
    assert_eq!(state(&store, root, "done"), DefinitionState::Undefined);

    let defined = store.define(root, "done").unwrap();
    assert_eq!(referenced, defined);
    assert_eq!(state(&store, root, "done"), DefinitionState::Single);
}

#[test]
fn test_same_name_in_different_scopes_is_not_a_conflict() {
    let mut store = SymbolStore::new();
    let (_, left, right, _) = tree(&mut store);

    store.define(left, "loop").unwrap();
    store.define(right, "loop").unwrap();

    assert_eq!(state(&store, left, "loop"), DefinitionState::Single);
    assert_eq!(state(&store, right, "loop"), DefinitionState::Single);
    assert_eq!(binding(&store, left, "loop"), Binding::Local);
}

#[test]
fn test_reference_after_global_becomes_import() {
    let mut store = SymbolStore::new();
    let (root, left, _, nested) = tree(&mut store);

    let global = store.define(root, "putc").unwrap();
    store.mark_global(root, "putc").unwrap();
    store
        .set_value(global, Value::location(1, 2, 0x20, LocationKind::Code))
        .unwrap();

    let alias = store.reference(nested, "putc").unwrap();
    let entry = store.entry(alias).unwrap();
    assert_eq!(entry.binding, Binding::Imported);
    assert_eq!(entry.value, Value::InternalPointer { pointer_size: 2, target: global });
    assert_eq!(entry.value.symbol_type(), SymbolType::PtrToSym);
    assert_eq!(store.resolve(alias), store.resolve(global));

    // A sibling that never mentions the name gets no entry.
    assert!(!store.exists(left, "putc"));
}

#[test]
fn test_mark_global_rewires_existing_locals() {
    let mut store = SymbolStore::new();
    let (root, left, right, _) = tree(&mut store);

    let local = store.reference(left, "x").unwrap();
    let global = store.define(right, "x").unwrap();
    store.mark_global(right, "x").unwrap();

    let entry = store.entry(local).unwrap();
    assert_eq!(entry.binding, Binding::Imported);
    assert_eq!(entry.value.pointee(), Some(global));
    assert_eq!(entry.state, DefinitionState::Single);
    assert!(!store.exists(root, "x"));
}

#[test]
fn test_two_globals_conflict() {
    let mut store = SymbolStore::new();
    let (_, left, right, _) = tree(&mut store);

    store.define(left, "dup").unwrap();
    store.mark_global(left, "dup").unwrap();
    store.define(right, "dup").unwrap();
    store.mark_global(right, "dup").unwrap();

    assert_eq!(state(&store, left, "dup"), DefinitionState::ExternalMultiple);
    assert_eq!(state(&store, right, "dup"), DefinitionState::ExternalMultiple);
    assert_eq!(binding(&store, left, "dup"), Binding::Global);
    assert_eq!(binding(&store, right, "dup"), Binding::Global);
}

#[test]
fn test_defining_an_import_conflicts() {
    let mut store = SymbolStore::new();
    let (root, left, _, _) = tree(&mut store);

    store.define(root, "g").unwrap();
    store.mark_global(root, "g").unwrap();
    store.reference(left, "g").unwrap();
    store.define(left, "g").unwrap();

    assert_eq!(state(&store, left, "g"), DefinitionState::ExternalMultiple);
}

#[test]
fn test_global_definitions_propagate_to_imports() {
    let mut store = SymbolStore::new();
    let (root, left, _, _) = tree(&mut store);

    store.mark_global(root, "later").unwrap();
    store.reference(left, "later").unwrap();
    assert_eq!(state(&store, left, "later"), DefinitionState::Undefined);

    store.define(root, "later").unwrap();
    assert_eq!(state(&store, left, "later"), DefinitionState::Single);
}

// ============================================================================
// Cross-tree Imports
// ============================================================================

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
    let entry = store.entry(imported).unwrap();
    assert_eq!(entry.binding, Binding::Imported);
    assert_eq!(
        entry.value,
        Value::ExternalPointer { pointer_size: 2, table: os, target: loader }
    );

    let bits = store.resolve(imported);
    assert_eq!(bits.value(), 0xFC17);
    assert_eq!(bits.byte_count, 2);
}

#[test]
fn test_import_over_local_definition_conflicts() {
    let mut store = SymbolStore::new();
    let os = store.add_root(2);
    let user = store.add_root(2);

    store.define(os, "loader").unwrap();
    store.mark_global(os, "loader").unwrap();
    let local = store.define(user, "loader").unwrap();

    let imported = store.import(user, os, "loader").unwrap().unwrap();
    assert_eq!(imported, local);
    let entry = store.entry(imported).unwrap();
    assert_eq!(entry.binding, Binding::Imported);
    assert_eq!(entry.state, DefinitionState::ExternalMultiple);
}

#[test]
fn test_import_of_missing_name() {
    let mut store = SymbolStore::new();
    let os = store.add_root(2);
    let user = store.add_root(2);

    assert_eq!(store.import(user, os, "nothing").unwrap(), None);
    assert!(!store.exists(user, "nothing"));
}

#[test]
fn test_trees_do_not_see_each_other() {
    let mut store = SymbolStore::new();
    let os = store.add_root(2);
    let user = store.add_root(2);

    store.define(os, "x").unwrap();
    store.mark_global(os, "x").unwrap();
    store.reference(user, "x").unwrap();

    assert_eq!(binding(&store, user, "x"), Binding::Local);
    assert_eq!(state(&store, user, "x"), DefinitionState::Undefined);
}

#[test]
fn test_dropped_external_table_resolves_to_zero() {
    let mut store = SymbolStore::new();
    let os = store.add_root(2);
    let user = store.add_root(2);

    let loader = store.define(os, "loader").unwrap();
    store.set_value(loader, Value::constant(0x1234, 2)).unwrap();
    let imported = store.import(user, os, "loader").unwrap().unwrap();

    store.drop_tree(os).unwrap();
    assert!(!store.is_live_table(os));
    assert!(!store.is_live_entry(loader));

    let value = store.entry(imported).unwrap().value.clone();
    assert_eq!(value.try_resolve(&store), Err(SymbolError::DroppedTable(os)));
    assert_eq!(store.resolve(imported).value(), 0);
}

#[test]
fn test_stale_ids_are_rejected() {
    let mut store = SymbolStore::new();
    let root = store.add_root(2);
    let child = store.add_child(root).unwrap();
    store.drop_tree(child).unwrap();

    assert_eq!(store.define(child, "x"), Err(SymbolError::StaleTable(child)));
    assert!(store.table(root).unwrap().children().is_empty());

    // A recycled slot must not revive the old id.
    let fresh = store.add_child(root).unwrap();
    assert_ne!(fresh, child);
    assert!(!store.is_live_table(child));
}

// ============================================================================
// Traversal
// ============================================================================

#[test]
fn test_select_by_name_policies() {
    let mut store = SymbolStore::new();
    let (root, left, right, nested) = tree(&mut store);
    for table in [root, left, right, nested] {
        store.define(table, "n").unwrap();
    }

    assert_eq!(select_by_name(&store, left, "n", TraversalPolicy::Children).len(), 2);
    assert_eq!(select_by_name(&store, left, "n", TraversalPolicy::ChildrenOnly).len(), 1);
    assert_eq!(select_by_name(&store, nested, "n", TraversalPolicy::Siblings).len(), 2);
    assert_eq!(select_by_name(&store, nested, "n", TraversalPolicy::WholeTree).len(), 4);
}

#[test]
fn test_exists_and_root() {
    let mut store = SymbolStore::new();
    let (root, left, right, nested) = tree(&mut store);
    store.define(nested, "deep").unwrap();

    assert_eq!(root_table(&store, nested), root);
    assert!(exists(&store, right, "deep", TraversalPolicy::WholeTree));
    assert!(!exists(&store, right, "deep", TraversalPolicy::Children));
    assert!(exists(&store, left, "deep", TraversalPolicy::ChildrenOnly));
}

#[test]
fn test_enumerate_visits_children_first() {
    let mut store = SymbolStore::new();
    let (root, left, _, nested) = tree(&mut store);
    store.define(root, "top").unwrap();
    store.define(left, "mid").unwrap();
    store.define(nested, "low").unwrap();

    let names: Vec<String> = enumerate(&store, root, TraversalPolicy::WholeTree)
        .into_iter()
        .map(|id| store.entry(id).unwrap().name().to_string())
        .collect();
    assert_eq!(names, vec!["low", "mid", "top"]);
}

#[test]
fn test_adjust_offset_only_moves_locations_above_threshold() {
    let mut store = SymbolStore::new();
    let (root, left, _, _) = tree(&mut store);

    let low = store.define(root, "low").unwrap();
    let high = store.define(left, "high").unwrap();
    let constant = store.define(left, "k").unwrap();
    let empty = store.define(root, "e").unwrap();
    store.set_value(low, Value::location(1, 2, 0x10, LocationKind::Object)).unwrap();
    store.set_value(high, Value::location(1, 2, 0x80, LocationKind::Code)).unwrap();
    store.set_value(constant, Value::constant(0x80, 2)).unwrap();

    let before_constant = store.entry(constant).unwrap().value.clone();
    let before_empty = store.entry(empty).unwrap().value.clone();

    let changed = adjust_offset(&mut store, left, 0x100, 0x80, TraversalPolicy::WholeTree);
    assert_eq!(changed, 1);
    assert_eq!(store.resolve(high).value(), 0x180);
    assert_eq!(store.resolve(low).value(), 0x10);
    assert_eq!(store.entry(constant).unwrap().value, before_constant);
    assert_eq!(store.entry(empty).unwrap().value, before_empty);
}
