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

//! Policy-driven walks over a table tree.
//!
//! Every walk is depth-first and visits a table's children before the table
//! itself. The [`TraversalPolicy`] picks where the walk starts and whether
//! that starting table contributes its own entries.

use std::fmt::Write;

use super::table::{EntryId, SymbolStore, TableId};
use super::TraversalPolicy;

/// Which parts of a table a walk looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SelectMode {
    include_self: bool,
    include_children: bool,
}

impl SelectMode {
    fn from_policy(policy: TraversalPolicy) -> Self {
        match policy {
            TraversalPolicy::Children | TraversalPolicy::Siblings | TraversalPolicy::WholeTree => {
                Self {
                    include_self: true,
                    include_children: true,
                }
            }
            TraversalPolicy::ChildrenOnly => Self {
                include_self: false,
                include_children: true,
            },
        }
    }

    /// Mode used for a child: children of an included subtree always count.
    fn to_child(self) -> Self {
        Self {
            include_self: self.include_children,
            include_children: true,
        }
    }
}

/// Root of the tree containing `table`.
///
/// A stale table is its own root.
pub fn root_table(store: &SymbolStore, table: TableId) -> TableId {
    store.root_of(table).unwrap_or(table)
}

fn policy_root(store: &SymbolStore, table: TableId, policy: TraversalPolicy) -> TableId {
    match policy {
        TraversalPolicy::Children | TraversalPolicy::ChildrenOnly => table,
        TraversalPolicy::Siblings => store.parent(table).unwrap_or(table),
        TraversalPolicy::WholeTree => root_table(store, table),
    }
}

fn walk(
    store: &SymbolStore,
    table: TableId,
    mode: SelectMode,
    visit: &mut dyn FnMut(TableId),
) {
    let Some(t) = store.table(table) else {
        return;
    };
    if mode.include_children {
        for &child in t.children() {
            walk(store, child, mode.to_child(), visit);
        }
    }
    if mode.include_self {
        visit(table);
    }
}

fn for_each_table(
    store: &SymbolStore,
    table: TableId,
    policy: TraversalPolicy,
    visit: &mut dyn FnMut(TableId),
) {
    let start = policy_root(store, table, policy);
    walk(store, start, SelectMode::from_policy(policy), visit);
}

/// Every entry called `name` in the visited tables.
pub fn select_by_name(
    store: &SymbolStore,
    table: TableId,
    name: &str,
    policy: TraversalPolicy,
) -> Vec<EntryId> {
    let mut found = Vec::new();
    for_each_table(store, table, policy, &mut |t| {
        if let Some(id) = store.get(t, name) {
            found.push(id);
        }
    });
    found
}

/// Whether any visited table owns `name`.
pub fn exists(store: &SymbolStore, table: TableId, name: &str, policy: TraversalPolicy) -> bool {
    let mut any = false;
    for_each_table(store, table, policy, &mut |t| {
        any |= store.exists(t, name);
    });
    any
}

/// Every entry of the visited tables.
pub fn enumerate(store: &SymbolStore, table: TableId, policy: TraversalPolicy) -> Vec<EntryId> {
    let mut found = Vec::new();
    for_each_table(store, table, policy, &mut |t| found.extend(store.entries(t)));
    found
}

/// Set the offset of every relocatable value whose base is at or above
/// `threshold`.
///
/// Constants, empty values, pointers and locations below the threshold are
/// left untouched. Returns how many values changed.
pub fn adjust_offset(
    store: &mut SymbolStore,
    table: TableId,
    offset: u64,
    threshold: u64,
    policy: TraversalPolicy,
) -> usize {
    let mut adjusted = 0;
    for id in enumerate(store, table, policy) {
        let Some(entry) = store.entry_mut(id) else {
            continue;
        };
        let relocate = entry.value.is_relocatable()
            && entry.value.base().is_some_and(|base| base >= threshold);
        if relocate && entry.value.set_offset(offset) {
            adjusted += 1;
        }
    }
    adjusted
}

/// Two-column listing of names and resolved values.
///
/// Each cell is the name padded to nine characters followed by the value in
/// upper-case hex, zero-padded to `max_bytes` bytes.
pub fn table_listing(
    store: &SymbolStore,
    table: TableId,
    max_bytes: u8,
    policy: TraversalPolicy,
) -> String {
    let width = 2 * usize::from(max_bytes);
    let mut out = String::new();
    let mut left = true;

    for id in enumerate(store, table, policy) {
        let Some(entry) = store.entry(id) else {
            continue;
        };
        let cell = format!(
            "{:<9} 0x{:0>width$}",
            entry.name(),
            format!("{:X}", store.resolve(id).value()),
            width = width
        );
        if left {
            out.push_str(&cell);
        } else {
            let _ = writeln!(out, "         {}", cell);
        }
        left = !left;
    }

    // An odd count leaves the last line open.
    if !left {
        out.push('\n');
    }
    out
}
