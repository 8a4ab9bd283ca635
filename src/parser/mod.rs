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

//! Reference line parser.
//!
//! Converts Pep/10 source text into detached AST nodes, one per line:
//!
//! ```text
//! [symbol:] (MNEMONIC [arg[,mode]] | .DIRECTIVE args | @MACRO args) [;comment]
//! ```
//!
//! Declared symbols are defined in the target table while converting. A line
//! that fails to convert becomes a blank node carrying the error, so that the
//! rest of the unit is still checked.
//!
//! # Module Structure
//!
//! - `directives` - Per-directive arity and argument checks
//! - `helpers` - Token stream navigation and argument conversion (ParserHelpers trait)

// Submodules
pub mod directives;
pub mod helpers;

use std::collections::HashSet;

use helpers::ParserHelpers;

use crate::ast::{Ast, Attributes, CommentIndent, Directive, NodeId, NodeKind, SourceLocation, SymbolDeclaration};
use crate::error::{ErrorCode, Message};
use crate::isa::{AddressingMode, Mnemonic};
use crate::lexer::{tokenize_line, Span, Token};
use crate::symbol::{SymbolStore, TableId};

/// Where converted nodes and symbols go.
pub struct ParseTarget<'a> {
    pub ast: &'a mut Ast,
    pub store: &'a mut SymbolStore,
    /// Table that declared symbols are defined in.
    pub scope: TableId,
}

/// Nodes produced from a piece of text, plus every line error.
#[derive(Debug, Default)]
pub struct ParseResult {
    /// Detached nodes in source order.
    pub nodes: Vec<NodeId>,
    /// `(0-indexed line, message)` for every line that failed.
    pub errors: Vec<(usize, Message)>,
}

impl ParseResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Turns source text into AST nodes.
///
/// Macro expansion re-parses substituted bodies through this trait, so any
/// front end that can produce nodes for a text can drive the passes.
pub trait SourceParser {
    fn parse(&self, text: &str, target: ParseTarget<'_>) -> ParseResult;
}

/// The built-in line-oriented parser.
#[derive(Debug, Default, Clone, Copy)]
pub struct LineParser;

impl SourceParser for LineParser {
    fn parse(&self, text: &str, target: ParseTarget<'_>) -> ParseResult {
        let ParseTarget { ast, store, scope } = target;
        let lines: Vec<&str> = text.lines().collect();
        let tokenized: Vec<_> = lines.iter().map(|line| tokenize_line(line)).collect();

        let declared: HashSet<String> = tokenized
            .iter()
            .filter_map(|tokens| match tokens.as_ref().ok()?.first() {
                Some((Token::SymbolDecl(name), _)) => Some(name.clone()),
                _ => None,
            })
            .collect();

        let mut result = ParseResult::default();
        for (index, (line, tokens)) in lines.iter().zip(tokenized).enumerate() {
            let converted = tokens.and_then(|tokens| {
                let mut parser = Parser::new(&tokens, line);
                parser.convert(store, scope, &declared)
            });

            let location = Some(SourceLocation { line: index });
            let id = match converted {
                Ok(mut line) => {
                    line.attrs.location = location;
                    if line.attrs.comment.is_some() && line.kind == NodeKind::Comment {
                        line.attrs.comment_indent = comment_indent(lines[index]);
                    }
                    ast.add(line.kind, line.attrs)
                }
                Err(message) => {
                    result.errors.push((index, message.clone()));
                    ast.add(
                        NodeKind::Blank,
                        Attributes {
                            location,
                            errors: vec![message],
                            ..Attributes::default()
                        },
                    )
                }
            };
            result.nodes.push(id);
        }
        result
    }
}

/// Parse a whole unit and append it under the tree's root.
///
/// The root is tagged with `scope` so that passes know which table the unit
/// resolves against. Returns the line errors.
pub fn parse_unit(
    parser: &dyn SourceParser,
    text: &str,
    ast: &mut Ast,
    store: &mut SymbolStore,
    scope: TableId,
) -> Vec<(usize, Message)> {
    let root = ast.root();
    ast[root].attrs.scope = Some(scope);
    let result = parser.parse(
        text,
        ParseTarget {
            ast: &mut *ast,
            store: &mut *store,
            scope,
        },
    );
    for node in result.nodes {
        ast.append_child(root, node);
    }
    result.errors
}

fn comment_indent(line: &str) -> CommentIndent {
    if line.starts_with(';') {
        CommentIndent::Left
    } else {
        CommentIndent::Instruction
    }
}

/// A converted line.
struct Line {
    kind: NodeKind,
    attrs: Attributes,
}

/// The parser state for one line.
pub struct Parser<'a> {
    /// The token stream to parse.
    pub(crate) tokens: &'a [(Token, Span)],
    /// Current position in the token stream.
    pub(crate) position: usize,
    /// The line the spans point into.
    pub(crate) source: &'a str,
}

impl<'a> Parser<'a> {
    /// Create a new parser for the given token stream.
    pub fn new(tokens: &'a [(Token, Span)], source: &'a str) -> Self {
        Self {
            tokens,
            position: 0,
            source,
        }
    }

    fn convert(
        &mut self,
        store: &mut SymbolStore,
        scope: TableId,
        declared: &HashSet<String>,
    ) -> Result<Line, Message> {
        let mut attrs = Attributes::default();

        // The lexer swallows the rest of the line into a comment, so it can
        // only ever be last.
        if let Some((Token::Comment(text), _)) = self.tokens.last() {
            attrs.comment = Some(text.clone());
            self.tokens = &self.tokens[..self.tokens.len() - 1];
        }

        if self.is_at_end() {
            let kind = if attrs.comment.is_some() {
                NodeKind::Comment
            } else {
                NodeKind::Blank
            };
            return Ok(Line { kind, attrs });
        }

        let symbol = match self.peek() {
            Some(Token::SymbolDecl(name)) => {
                let name = name.clone();
                self.advance();
                Some(name)
            }
            _ => None,
        };

        let kind = match self.advance() {
            Some((Token::Identifier(name), _)) => {
                self.instruction(&name, &mut attrs, store, scope, declared)?;
                NodeKind::Instruction
            }
            Some((Token::Directive(name), _)) => {
                self.directive(&name, symbol.is_some(), &mut attrs, store, scope, declared)?;
                NodeKind::Directive
            }
            Some((Token::Macro(name), _)) => {
                attrs.arguments = self.argument_list(store, scope, declared, false)?;
                self.expect_end()?;
                attrs.macro_name = Some(name);
                NodeKind::MacroInvoke
            }
            Some((token, _)) => {
                return Err(self.error(
                    ErrorCode::UnexpectedToken,
                    format!("Unexpected {}.", token.describe()),
                ))
            }
            None => {
                return Err(self.error(
                    ErrorCode::UnexpectedToken,
                    "A symbol declaration must be followed by an instruction, directive or macro.",
                ))
            }
        };

        if let Some(name) = symbol {
            let entry = store.define(scope, &name)?;
            attrs.symbol = Some(SymbolDeclaration { name, entry });
        }
        Ok(Line { kind, attrs })
    }

    fn instruction(
        &mut self,
        name: &str,
        attrs: &mut Attributes,
        store: &mut SymbolStore,
        scope: TableId,
        declared: &HashSet<String>,
    ) -> Result<(), Message> {
        let mnemonic = Mnemonic::parse(name).ok_or_else(|| {
            self.error(
                ErrorCode::InvalidMnemonic,
                format!("Invalid mnemonic \"{}\".", name),
            )
        })?;
        attrs.mnemonic = Some(mnemonic);

        if mnemonic.is_unary() {
            return self.expect_end();
        }

        let argument = self
            .argument(store, scope, declared, true)?
            .ok_or_else(|| {
                self.error(
                    ErrorCode::UnexpectedToken,
                    format!("{} requires an operand.", mnemonic),
                )
            })?;
        if argument.is_text() && argument.size() > 2 {
            return Err(self.error(
                ErrorCode::ArgumentOutOfRange,
                format!("String operand {} is longer than 2 bytes.", argument),
            ));
        }

        let mode = if self.match_token(&Token::Comma) {
            match self.advance() {
                Some((Token::Identifier(text), _)) => AddressingMode::parse(&text).ok_or_else(|| {
                    self.error(
                        ErrorCode::InvalidAddressingMode,
                        format!("Invalid addressing mode \"{}\".", text),
                    )
                })?,
                _ => {
                    return Err(self.error(
                        ErrorCode::InvalidAddressingMode,
                        "Expected an addressing mode after \",\".",
                    ))
                }
            }
        } else {
            mnemonic.default_mode().ok_or_else(|| {
                self.error(
                    ErrorCode::InvalidAddressingMode,
                    format!("{} requires an addressing mode.", mnemonic),
                )
            })?
        };

        if !mnemonic.allows(mode) {
            return Err(self.error(
                ErrorCode::InvalidAddressingMode,
                format!("{} does not allow addressing mode \"{}\".", mnemonic, mode),
            ));
        }
        self.expect_end()?;

        attrs.arguments = vec![argument];
        attrs.addressing_mode = Some(mode);
        Ok(())
    }

    fn directive(
        &mut self,
        name: &str,
        has_symbol: bool,
        attrs: &mut Attributes,
        store: &mut SymbolStore,
        scope: TableId,
        declared: &HashSet<String>,
    ) -> Result<(), Message> {
        let directive = Directive::parse(name).ok_or_else(|| {
            self.error(
                ErrorCode::InvalidDirective,
                format!("Invalid directive \".{}\".", name),
            )
        })?;
        let symbolic = directives::is_symbolic(directive);
        let arguments = self.argument_list(store, scope, declared, symbolic)?;
        self.expect_end()?;
        directives::validate(directive, &arguments, has_symbol)?;

        attrs.directive = Some(directive);
        attrs.arguments = arguments;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ArgumentKind;
    use crate::symbol::{Binding, DefinitionState};

    fn parse(text: &str) -> (Ast, SymbolStore, TableId, Vec<(usize, Message)>) {
        let mut ast = Ast::new();
        let mut store = SymbolStore::new();
        let scope = store.add_root(2);
        let errors = parse_unit(&LineParser, text, &mut ast, &mut store, scope);
        (ast, store, scope, errors)
    }

    fn only_node(ast: &Ast) -> &crate::ast::Node {
        let children = ast.children(ast.root());
        assert_eq!(children.len(), 1);
        &ast[children[0]]
    }

    // ========================================
    // Line Shape Tests
    // ========================================

    #[test]
    fn test_parse_instruction_with_mode() {
        let (ast, _, _, errors) = parse("LDWA 0x0005,d");
        assert!(errors.is_empty());
        let node = only_node(&ast);
        assert_eq!(node.kind, NodeKind::Instruction);
        assert_eq!(node.attrs.mnemonic, Some(Mnemonic::LDWA));
        assert_eq!(node.attrs.addressing_mode, Some(AddressingMode::D));
        assert_eq!(node.attrs.arguments[0].kind, ArgumentKind::Hexadecimal(5));
        assert_eq!(node.attrs.arguments[0].text, "0x0005");
    }

    #[test]
    fn test_parse_unary_instruction() {
        let (ast, _, _, errors) = parse("RET ;done");
        assert!(errors.is_empty());
        let node = only_node(&ast);
        assert_eq!(node.attrs.mnemonic, Some(Mnemonic::RET));
        assert_eq!(node.attrs.comment.as_deref(), Some("done"));
        assert!(node.attrs.arguments.is_empty());
    }

    #[test]
    fn test_branch_defaults_to_immediate() {
        let (ast, _, _, errors) = parse("main: BR main");
        assert!(errors.is_empty());
        let node = only_node(&ast);
        assert_eq!(node.attrs.addressing_mode, Some(AddressingMode::I));
    }

    #[test]
    fn test_parse_comment_indent() {
        let (ast, _, _, _) = parse(";left\n   ;indented");
        let children = ast.children(ast.root()).to_vec();
        assert_eq!(ast[children[0]].kind, NodeKind::Comment);
        assert_eq!(ast[children[0]].attrs.comment_indent, CommentIndent::Left);
        assert_eq!(ast[children[1]].attrs.comment_indent, CommentIndent::Instruction);
    }

    #[test]
    fn test_parse_blank_line() {
        let (ast, _, _, errors) = parse("");
        assert!(errors.is_empty());
        assert!(ast.children(ast.root()).is_empty());

        let (ast, _, _, _) = parse("   \nNOP");
        let children = ast.children(ast.root()).to_vec();
        assert_eq!(ast[children[0]].kind, NodeKind::Blank);
        assert_eq!(ast[children[1]].attrs.location, Some(SourceLocation { line: 1 }));
    }

    #[test]
    fn test_parse_macro_invocation() {
        let (ast, _, _, errors) = parse("@DECO value,d");
        assert!(errors.is_empty());
        let node = only_node(&ast);
        assert_eq!(node.kind, NodeKind::MacroInvoke);
        assert_eq!(node.attrs.macro_name.as_deref(), Some("DECO"));
        let args: Vec<_> = node.attrs.arguments.iter().map(|a| a.text.as_str()).collect();
        assert_eq!(args, vec!["value", "d"]);
        assert_eq!(node.attrs.arguments[0].kind, ArgumentKind::Identifier);
    }

    // ========================================
    // Symbol Tests
    // ========================================

    #[test]
    fn test_declared_symbol_is_defined() {
        let (ast, store, scope, errors) = parse("main: NOP");
        assert!(errors.is_empty());
        let node = only_node(&ast);
        let decl = node.attrs.symbol.as_ref().unwrap();
        assert_eq!(decl.name, "main");
        let entry = store.entry(decl.entry).unwrap();
        assert_eq!(entry.state, DefinitionState::Single);
        assert_eq!(entry.binding, Binding::Local);
        assert_eq!(store.get(scope, "main"), Some(decl.entry));
    }

    #[test]
    fn test_forward_reference_is_shared() {
        let (ast, store, scope, errors) = parse("BR done\ndone: RET");
        assert!(errors.is_empty());
        let children = ast.children(ast.root()).to_vec();
        let reference = ast[children[0]].attrs.arguments[0].entry().unwrap();
        let declared = ast[children[1]].attrs.symbol.as_ref().unwrap().entry;
        assert_eq!(reference, declared);
        assert_eq!(store.get(scope, "done"), Some(declared));
    }

    #[test]
    fn test_reference_to_parent_symbol() {
        let mut ast = Ast::new();
        let mut store = SymbolStore::new();
        let root = store.add_root(2);
        let outer = store.define(root, "buffer").unwrap();
        let inner = store.add_child(root).unwrap();

        let result = LineParser.parse(
            "LDWA buffer,d\nlocal: LDWA fresh,d",
            ParseTarget { ast: &mut ast, store: &mut store, scope: inner },
        );
        assert!(result.is_ok());
        assert_eq!(ast[result.nodes[0]].attrs.arguments[0].entry(), Some(outer));
        assert!(store.exists(inner, "local"));
        assert!(store.exists(root, "fresh"));
        assert!(!store.exists(inner, "fresh"));
    }

    #[test]
    fn test_double_declaration() {
        let (_, store, scope, errors) = parse("x: NOP\nx: NOP");
        assert!(errors.is_empty());
        let entry = store.get(scope, "x").unwrap();
        assert_eq!(store.entry(entry).unwrap().state, DefinitionState::Multiple);
    }

    // ========================================
    // Error Tests
    // ========================================

    #[test]
    fn test_error_recovery_per_line() {
        let (ast, store, scope, errors) = parse("bad: FOO 1,d\nNOP\n.WORD 1,2");
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].0, 0);
        assert_eq!(errors[0].1.code, ErrorCode::InvalidMnemonic);
        assert_eq!(errors[1].0, 2);
        assert_eq!(errors[1].1.code, ErrorCode::InvalidDirectiveArity);

        let children = ast.children(ast.root()).to_vec();
        assert_eq!(ast[children[0]].kind, NodeKind::Blank);
        assert_eq!(ast[children[0]].attrs.errors.len(), 1);
        assert!(!store.exists(scope, "bad"));
    }

    #[test]
    fn test_missing_addressing_mode() {
        let (_, _, _, errors) = parse("LDWA 5");
        assert_eq!(errors[0].1.code, ErrorCode::InvalidAddressingMode);
    }

    #[test]
    fn test_store_rejects_immediate() {
        let (_, _, _, errors) = parse("STWA 5,i");
        assert_eq!(errors[0].1.code, ErrorCode::InvalidAddressingMode);
    }

    #[test]
    fn test_unary_rejects_operand() {
        let (_, _, _, errors) = parse("NOTA 5");
        assert_eq!(errors[0].1.code, ErrorCode::UnexpectedToken);
    }

    #[test]
    fn test_decimal_out_of_range() {
        let (_, _, _, errors) = parse("LDWA 70000,i");
        assert_eq!(errors[0].1.code, ErrorCode::ArgumentOutOfRange);
    }

    #[test]
    fn test_symbol_alone_is_error() {
        let (_, _, _, errors) = parse("lonely:");
        assert_eq!(errors[0].1.code, ErrorCode::UnexpectedToken);
    }

    #[test]
    fn test_invalid_directive() {
        let (_, _, _, errors) = parse(".FOO 1");
        assert_eq!(errors[0].1.code, ErrorCode::InvalidDirective);
    }
}
