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

//! Source formatting.
//!
//! Lines are laid out in fixed columns: symbol, operation, arguments and
//! comment. Macro bookkeeping comments reuse the same columns so that an
//! expanded listing stays aligned.

use crate::ast::{Ast, CommentIndent, NodeId, NodeKind};

/// Width of the symbol column, colon included.
pub const SYMBOL_WIDTH: usize = 9;
/// Width of the mnemonic / directive column.
pub const MNEMONIC_WIDTH: usize = 8;
/// Width of the argument column.
pub const ARGUMENT_WIDTH: usize = 12;

/// Left-justify `text` in `width` columns, keeping at least one space after it.
fn pad(text: &str, width: usize) -> String {
    if text.is_empty() {
        " ".repeat(width)
    } else if text.len() < width {
        format!("{:<width$}", text, width = width)
    } else {
        format!("{} ", text)
    }
}

/// Lay out one source line. Trailing whitespace is removed.
pub fn format_line(symbol: Option<&str>, operation: &str, args: &[String], comment: Option<&str>) -> String {
    let symbol = symbol.map(|s| format!("{}:", s)).unwrap_or_default();
    let mut line = pad(&symbol, SYMBOL_WIDTH);
    line.push_str(&pad(operation, MNEMONIC_WIDTH));
    line.push_str(&pad(&args.join(","), ARGUMENT_WIDTH));
    if let Some(comment) = comment {
        line.push(';');
        line.push_str(comment);
    }
    line.trim_end().to_string()
}

/// `@NAME args`, with the name in the mnemonic column.
pub fn format_macro_call(name: &str, args: &[String]) -> String {
    let call = format!("@{}", name);
    if args.is_empty() {
        call
    } else {
        format!("{}{}", pad(&call, MNEMONIC_WIDTH), args.join(","))
    }
}

/// Format a single node without its children.
pub fn format_node(ast: &Ast, id: NodeId) -> String {
    let node = &ast[id];
    let attrs = &node.attrs;
    let symbol = attrs.symbol.as_ref().map(|s| s.name.as_str());
    let comment = attrs.comment.as_deref();
    let args: Vec<String> = attrs.arguments.iter().map(|a| a.text.clone()).collect();

    match node.kind {
        NodeKind::Instruction => {
            let Some(mnemonic) = attrs.mnemonic else {
                return String::new();
            };
            let mut args = args;
            if let Some(mode) = attrs.addressing_mode {
                if mnemonic.default_mode() != Some(mode) {
                    args.push(mode.to_string());
                }
            }
            format_line(symbol, mnemonic.as_str(), &args, comment)
        }
        NodeKind::Directive => {
            let name = attrs
                .directive
                .map(|d| d.to_string())
                .unwrap_or_default();
            format_line(symbol, &name, &args, comment)
        }
        NodeKind::MacroInvoke => {
            let name = format!("@{}", attrs.macro_name.as_deref().unwrap_or_default());
            format_line(symbol, &name, &args, comment)
        }
        NodeKind::Comment => {
            let text = comment.unwrap_or_default();
            match attrs.comment_indent {
                CommentIndent::Left => format!(";{}", text),
                CommentIndent::Instruction => format!(
                    "{};{}",
                    " ".repeat(SYMBOL_WIDTH + MNEMONIC_WIDTH + ARGUMENT_WIDTH),
                    text
                ),
            }
        }
        NodeKind::Blank | NodeKind::Structural => String::new(),
    }
}

/// Format a whole subtree as source, one string per line.
///
/// Structural nodes contribute no line of their own. An expanded macro call
/// is represented by its bookkeeping comments and body.
pub fn format_source(ast: &Ast, id: NodeId) -> Vec<String> {
    ast.preorder(id)
        .into_iter()
        .filter(|&n| {
            let node = &ast[n];
            match node.kind {
                NodeKind::Structural => false,
                NodeKind::MacroInvoke => node.children().is_empty(),
                _ => true,
            }
        })
        .map(|n| format_node(ast, n))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Argument, Attributes, Directive};
    use crate::isa::{AddressingMode, Mnemonic};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_format_line_columns() {
        let line = format_line(
            Some("main"),
            "LDWA",
            &["0x0010".to_string(), "d".to_string()],
            Some("load"),
        );
        assert_eq!(line, "main:    LDWA    0x0010,d    ;load");
    }

    #[test]
    fn test_long_symbol_keeps_separator() {
        let line = format_line(Some("verylongname"), "RET", &[], None);
        assert_eq!(line, "verylongname: RET");
    }

    #[test]
    fn test_macro_call() {
        assert_eq!(format_macro_call("DECI", &["num".into(), "d".into()]), "@DECI   num,d");
        assert_eq!(format_macro_call("PUSHA", &[]), "@PUSHA");
    }

    #[test]
    fn test_branch_elides_immediate_mode() {
        let mut ast = Ast::new();
        let id = ast.add(
            NodeKind::Instruction,
            Attributes {
                mnemonic: Some(Mnemonic::BR),
                addressing_mode: Some(AddressingMode::I),
                arguments: vec![Argument::identifier("loop")],
                ..Default::default()
            },
        );
        assert_eq!(format_node(&ast, id), "         BR      loop");
    }

    #[test]
    fn test_format_source_skips_structural() {
        let mut ast = Ast::new();
        let root = ast.root();
        let dir = ast.add(
            NodeKind::Directive,
            Attributes {
                directive: Some(Directive::Block),
                arguments: vec![Argument::decimal(2)],
                ..Default::default()
            },
        );
        let comment = ast.add(
            NodeKind::Comment,
            Attributes {
                comment: Some("hello".into()),
                comment_indent: CommentIndent::Left,
                ..Default::default()
            },
        );
        ast.append_child(root, dir);
        ast.append_child(root, comment);

        assert_eq!(
            format_source(&ast, root),
            vec!["         .BLOCK  2".to_string(), ";hello".to_string()]
        );
    }
}
