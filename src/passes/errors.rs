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

//! Error collection.

use crate::ast::{Ast, NodeId};
use crate::error::Message;

/// Every error in the subtree at `root`, in source order.
///
/// Each message is paired with the 0-indexed line of the node carrying it.
/// Nodes without a location of their own report the line of their nearest
/// located ancestor.
pub fn collect_errors(ast: &Ast, root: NodeId) -> Vec<(usize, Message)> {
    let mut errors = Vec::new();
    for id in ast.preorder(root) {
        let node = &ast[id];
        if node.attrs.errors.is_empty() {
            continue;
        }
        let line = line_of(ast, id);
        errors.extend(node.attrs.errors.iter().map(|message| (line, message.clone())));
    }
    errors
}

/// Whether anything in the subtree at `root` carries an error.
pub fn has_errors(ast: &Ast, root: NodeId) -> bool {
    ast.preorder(root)
        .into_iter()
        .any(|id| !ast[id].attrs.errors.is_empty())
}

fn line_of(ast: &Ast, id: NodeId) -> usize {
    let mut current = Some(id);
    while let Some(node) = current {
        if let Some(line) = ast[node].line() {
            return line;
        }
        current = ast.parent(node);
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Attributes, NodeKind, SourceLocation};
    use crate::error::ErrorCode;

    #[test]
    fn test_collect_in_preorder_with_inherited_lines() {
        let mut ast = Ast::new();
        let root = ast.root();
        let located = ast.add(
            NodeKind::MacroInvoke,
            Attributes {
                location: Some(SourceLocation { line: 4 }),
                errors: vec![Message::fatal(ErrorCode::MacroNotFound, "outer")],
                ..Attributes::default()
            },
        );
        let inner = ast.add(
            NodeKind::Directive,
            Attributes {
                errors: vec![Message::fatal(ErrorCode::UndefinedSymbol, "inner")],
                ..Attributes::default()
            },
        );
        ast.append_child(root, located);
        ast.append_child(located, inner);

        let errors = collect_errors(&ast, root);
        let summary: Vec<_> = errors.iter().map(|(line, m)| (*line, m.message.as_str())).collect();
        assert_eq!(summary, vec![(4, "outer"), (4, "inner")]);
        assert!(has_errors(&ast, root));
    }

    #[test]
    fn test_no_errors() {
        let ast = Ast::new();
        assert!(collect_errors(&ast, ast.root()).is_empty());
        assert!(!has_errors(&ast, ast.root()));
    }
}
