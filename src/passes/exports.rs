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

//! Export registration.
//!
//! `.EXPORT`, `.SCALL`, `.USCALL`, `.INPUT` and `.OUTPUT` make their symbol
//! visible to the other unit by promoting it to a global.

use crate::ast::{Ast, Directive, NodeId, NodeKind};
use crate::symbol::SymbolStore;

/// Directives whose argument becomes a global symbol.
pub fn is_export(directive: Directive) -> bool {
    matches!(
        directive,
        Directive::Export | Directive::Scall | Directive::Uscall | Directive::Input | Directive::Output
    )
}

/// Promote every exported symbol below `root`. Returns whether all succeeded.
pub fn register_exports(ast: &mut Ast, store: &mut SymbolStore, root: NodeId) -> bool {
    let mut ok = true;
    for id in ast.preorder(root) {
        let node = &ast[id];
        if node.kind != NodeKind::Directive || !node.attrs.directive.is_some_and(is_export) {
            continue;
        }
        let Some(entry) = node.attrs.arguments.first().and_then(|arg| arg.entry()) else {
            continue;
        };

        let promoted = match store.entry(entry) {
            Some(e) => {
                let (table, name) = (e.table(), e.name().to_string());
                store.mark_global(table, &name).map(|_| ())
            }
            None => Err(crate::symbol::SymbolError::StaleEntry(entry)),
        };
        if let Err(e) = promoted {
            ast[id].attrs.errors.push(e.into());
            ok = false;
        }
    }
    ok
}
