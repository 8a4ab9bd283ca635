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

//! Node predicates shared by the passes.

use crate::ast::{Directive, Node, NodeKind};

/// Whether a node occupies memory: instructions and address-consuming
/// directives (`.ALIGN`, `.ASCII`, `.BLOCK`, `.BYTE`, `.WORD`).
pub fn is_addressable(node: &Node) -> bool {
    match node.kind {
        NodeKind::Instruction => true,
        NodeKind::Directive => node.attrs.directive.is_some_and(|d| d.is_addressed()),
        _ => false,
    }
}

/// Whether a node is the given directive.
pub fn is_directive(node: &Node, directive: Directive) -> bool {
    node.kind == NodeKind::Directive && node.attrs.directive == Some(directive)
}
