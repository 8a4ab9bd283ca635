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

//! Call-via-return annotation.
//!
//! A `RET` commented with `@call` is really the second half of a call: the
//! code pushes a return address and "returns" into the callee. Such sites are
//! collected by address for later analysis.

use std::collections::BTreeSet;

use crate::ast::{Ast, NodeId};
use crate::isa::Mnemonic;

/// Add the address of every `RET ;@call` below `root` to `addresses`.
pub fn annotate_ret_ops(ast: &Ast, root: NodeId, addresses: &mut BTreeSet<u16>) {
    for id in ast.preorder(root) {
        let attrs = &ast[id].attrs;
        if attrs.mnemonic != Some(Mnemonic::RET) {
            continue;
        }
        let tagged = attrs
            .comment
            .as_deref()
            .is_some_and(|comment| comment.to_ascii_lowercase().contains("@call"));
        if let (true, Some(address)) = (tagged, attrs.address) {
            addresses.insert(address.start);
        }
    }
}
