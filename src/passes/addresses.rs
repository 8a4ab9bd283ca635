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

//! Address assignment.
//!
//! Walks each section in order and hands out addresses. Sections with the
//! same name continue from where the previous one stopped; `.ORG` moves the
//! counter. A section holding `.BURN addr` is laid out so that its last byte
//! lands on `addr`. Declared symbols receive their final values here.

use indexmap::IndexMap;

use crate::ast::{Address, Argument, ArgumentKind, Ast, Directive, Node, NodeId, NodeKind};
use crate::error::Message;
use crate::symbol::{root_table, LocationKind, SymbolError, SymbolStore, TableId, Value};

/// What a line does to the location counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    /// Occupies `size` bytes at the counter.
    Place(u32),
    /// Moves the counter.
    Org(u32),
    /// Gives its symbol a value without occupying memory.
    Equate,
    /// Has no address at all.
    Addressless,
    /// Comments, blanks and structure.
    Skip,
}

fn step(node: &Node, counter: u32) -> Step {
    let literal = |index: usize| {
        node.attrs
            .arguments
            .get(index)
            .and_then(literal_value)
            .unwrap_or(0)
    };

    match node.kind {
        NodeKind::Instruction => Step::Place(node.attrs.mnemonic.map_or(0, |m| u32::from(m.byte_size()))),
        NodeKind::Directive => match node.attrs.directive {
            Some(Directive::Align) => {
                let align = literal(0).max(1);
                Step::Place((align - counter % align) % align)
            }
            Some(Directive::Ascii) => {
                Step::Place(node.attrs.arguments.first().map_or(0, |a| u32::from(a.size())))
            }
            Some(Directive::Block) => Step::Place(literal(0)),
            Some(Directive::Byte) => Step::Place(1),
            Some(Directive::Word) => Step::Place(2),
            Some(Directive::Org) => Step::Org(literal(0)),
            Some(Directive::Equate) => Step::Equate,
            Some(_) => Step::Addressless,
            None => Step::Skip,
        },
        NodeKind::MacroInvoke | NodeKind::Comment | NodeKind::Blank | NodeKind::Structural => Step::Skip,
    }
}

fn literal_value(arg: &Argument) -> Option<u32> {
    match arg.kind {
        ArgumentKind::Decimal(v) => u32::try_from(v).ok(),
        ArgumentKind::Hexadecimal(v) => u32::try_from(v).ok(),
        _ => None,
    }
}

/// Bytes a section occupies when laid out from `start`.
fn measure(ast: &Ast, lines: &[NodeId], start: u32) -> u32 {
    let mut counter = start;
    for &line in lines {
        match step(&ast[line], counter) {
            Step::Place(size) => counter += size,
            Step::Org(address) => counter = address,
            _ => {}
        }
    }
    counter.saturating_sub(start)
}

/// Value of an `.EQUATE` argument.
fn equate_value(store: &SymbolStore, arg: &Argument, own_root: Option<TableId>, pointer_size: u16) -> Value {
    match &arg.kind {
        ArgumentKind::Decimal(v) => Value::constant(*v as u64, 2),
        ArgumentKind::Hexadecimal(v) => Value::constant(*v, 2),
        ArgumentKind::Character(c) => Value::constant(u64::from(*c), 2),
        ArgumentKind::Text(bytes) => {
            let bits = bytes.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b));
            Value::constant(bits, 2)
        }
        ArgumentKind::Symbol(target) => match store.entry(*target) {
            Some(entry) if Some(root_table(store, entry.table())) != own_root => Value::ExternalPointer {
                pointer_size,
                table: entry.table(),
                target: *target,
            },
            _ => Value::InternalPointer {
                pointer_size,
                target: *target,
            },
        },
        ArgumentKind::Identifier => Value::default(),
    }
}

/// Assign addresses and symbol values for every section below `root`.
///
/// Returns whether every symbol could be updated.
pub fn assign_addresses(ast: &mut Ast, store: &mut SymbolStore, root: NodeId) -> bool {
    let scope = ast[root].attrs.scope;
    let own_root = scope.map(|s| root_table(store, s));
    let pointer_size = scope
        .and_then(|s| store.pointer_size(s).ok())
        .unwrap_or(2);

    let mut ok = true;
    let mut counters: IndexMap<String, u32> = IndexMap::new();
    let sections = ast.children(root).to_vec();

    for (index, section) in sections.into_iter().enumerate() {
        let name = ast[section]
            .attrs
            .section
            .as_ref()
            .map(|info| info.name.clone())
            .unwrap_or_default();
        let lines: Vec<NodeId> = ast.preorder(section).into_iter().skip(1).collect();

        let burn = lines.iter().find_map(|&line| {
            let node = &ast[line];
            (node.attrs.directive == Some(Directive::Burn))
                .then(|| node.attrs.arguments.first().and_then(literal_value))
                .flatten()
        });
        let mut counter = match burn {
            Some(last) => {
                let size = measure(ast, &lines, 0);
                (last + 1).saturating_sub(size)
            }
            None => counters.get(&name).copied().unwrap_or(0),
        };

        for line in lines {
            let value = match step(&ast[line], counter) {
                Step::Place(size) => {
                    let kind = if ast[line].kind == NodeKind::Instruction {
                        LocationKind::Code
                    } else {
                        LocationKind::Object
                    };
                    ast[line].attrs.address = Some(Address {
                        start: counter as u16,
                        size: size as u16,
                    });
                    let value = Value::location(size as u16, pointer_size, u64::from(counter), kind);
                    counter += size;
                    Some(value)
                }
                Step::Org(address) => {
                    counter = address;
                    ast[line].attrs.address = Some(Address {
                        start: address as u16,
                        size: 0,
                    });
                    Some(Value::location(0, pointer_size, u64::from(address), LocationKind::Object))
                }
                Step::Equate => {
                    ast[line].attrs.hide.address_in_listing = true;
                    ast[line]
                        .attrs
                        .arguments
                        .first()
                        .map(|arg| equate_value(store, arg, own_root, pointer_size))
                }
                Step::Addressless => {
                    ast[line].attrs.hide.address_in_listing = true;
                    None
                }
                Step::Skip => None,
            };

            let (Some(value), Some(decl)) = (value, ast[line].attrs.symbol.as_ref()) else {
                continue;
            };
            let entry = decl.entry;
            let updated = store.set_value(entry, value).and_then(|()| {
                store
                    .entry_mut(entry)
                    .map(|e| e.section_index = index as u16)
                    .ok_or(SymbolError::StaleEntry(entry))
            });
            if let Err(e) = updated {
                ast[line].attrs.errors.push(Message::from(e));
                ok = false;
            }
        }
        counters.insert(name, counter);
    }
    ok
}

/// Total bytes of every addressed node below `root`.
pub fn object_size(ast: &Ast, root: NodeId) -> u32 {
    ast.preorder(root)
        .into_iter()
        .filter_map(|id| ast[id].attrs.address)
        .map(|address| u32::from(address.size))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::macros::{Macro, MacroExpander, MacroOrigin, MacroRegistry, RedefinitionPolicy};
    use crate::parser::{parse_unit, LineParser};
    use crate::passes::group::group_sections;
    use crate::passes::predicates::is_addressable;
    use pretty_assertions::assert_eq;

    fn assemble(source: &str) -> (Ast, SymbolStore, TableId) {
        let mut registry = MacroRegistry::new(RedefinitionPolicy::default());
        registry
            .register(Macro::new("PAIR", 0, "first: NOP\n.WORD 7", MacroOrigin::Core))
            .unwrap();
        let mut ast = Ast::new();
        let mut store = SymbolStore::new();
        let scope = store.add_root(2);
        let errors = parse_unit(&LineParser, source, &mut ast, &mut store, scope);
        assert!(errors.is_empty(), "{:?}", errors);
        let root = ast.root();
        let mut expander = MacroExpander::new(&registry, &LineParser, is_addressable);
        assert!(expander.expand_all(&mut ast, &mut store, root));
        assert!(group_sections(&mut ast, root, is_addressable));
        assert!(assign_addresses(&mut ast, &mut store, root));
        (ast, store, scope)
    }

    fn value_of(store: &SymbolStore, scope: TableId, name: &str) -> u64 {
        store.resolve(store.get(scope, name).unwrap()).value()
    }

    #[test]
    fn test_sequential_layout() {
        let (ast, store, scope) = assemble("a: NOP\nb: LDWA 1,i\nc: .BLOCK 5\nd: .BYTE 1\ne: .WORD 2\nf: .ASCII \"hey\"\ng: NOP");
        let expected = [("a", 0), ("b", 1), ("c", 4), ("d", 9), ("e", 10), ("f", 12), ("g", 15)];
        for (name, address) in expected {
            assert_eq!(value_of(&store, scope, name), address, "{}", name);
        }
        assert_eq!(object_size(&ast, ast.root()), 16);
    }

    #[test]
    fn test_symbol_kinds() {
        let (_, store, scope) = assemble("code: NOP\ndata: .WORD 1");
        let code = store.entry(store.get(scope, "code").unwrap()).unwrap();
        assert!(matches!(code.value, Value::Location { kind: LocationKind::Code, pointed_size: 1, .. }));
        let data = store.entry(store.get(scope, "data").unwrap()).unwrap();
        assert!(matches!(data.value, Value::Location { kind: LocationKind::Object, pointed_size: 2, .. }));
    }

    #[test]
    fn test_align() {
        let (_, store, scope) = assemble("NOP\npad: .ALIGN 4\nnext: NOP");
        assert_eq!(value_of(&store, scope, "pad"), 1);
        assert_eq!(value_of(&store, scope, "next"), 4);
    }

    #[test]
    fn test_org_and_shared_counter() {
        let source = ".ORG 0x100\na: NOP\n.SECTION \"data\"\nb: .WORD 1\n.SECTION \".text\"\nc: NOP";
        let (_, store, scope) = assemble(source);
        assert_eq!(value_of(&store, scope, "a"), 0x100);
        assert_eq!(value_of(&store, scope, "b"), 0);
        assert_eq!(value_of(&store, scope, "c"), 0x101);
    }

    #[test]
    fn test_burn_lays_out_backwards() {
        let (ast, store, scope) = assemble(".BURN 0xFFFF\nfirst: NOP\nlast: .WORD 0");
        assert_eq!(value_of(&store, scope, "first"), 0xFFFD);
        assert_eq!(value_of(&store, scope, "last"), 0xFFFE);
        let burn = ast.preorder(ast.root())[2];
        assert!(ast[burn].attrs.hide.address_in_listing);
    }

    #[test]
    fn test_equate_values() {
        let (_, store, scope) = assemble("size: .EQUATE 12\nneg: .EQUATE -1\nalias: .EQUATE size\nword: .EQUATE \"AB\"");
        assert_eq!(value_of(&store, scope, "size"), 12);
        assert_eq!(value_of(&store, scope, "neg"), 0xFFFF);
        assert_eq!(value_of(&store, scope, "alias"), 12);
        assert_eq!(value_of(&store, scope, "word"), 0x4142);
    }

    #[test]
    fn test_macro_body_is_addressed() {
        let (_, store, scope) = assemble("NOP\nhere: @PAIR\nafter: NOP");
        assert_eq!(value_of(&store, scope, "here"), 1);
        assert_eq!(value_of(&store, scope, "after"), 4);
    }

    #[test]
    fn test_section_index() {
        let (_, store, scope) = assemble("a: NOP\n.SECTION \"data\"\nb: .WORD 1");
        let section = |name| store.entry(store.get(scope, name).unwrap()).unwrap().section_index;
        assert_eq!(section("a"), 0);
        assert_eq!(section("b"), 1);
    }
}
