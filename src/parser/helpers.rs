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

//! Parser helper methods for token stream navigation and error handling.
//!
//! This module provides utility methods for the line converter including:
//! - Token stream navigation (peek, advance, check)
//! - Argument and argument-list conversion
//! - Error creation

use std::collections::HashSet;

use super::Parser;
use crate::ast::{Argument, ArgumentKind};
use crate::error::{ErrorCode, Message};
use crate::lexer::{unescape, Span, Token};
use crate::symbol::{root_table, SymbolStore, TableId};

/// Trait for parser helper operations.
pub trait ParserHelpers<'a> {
    /// Check if we've reached the end of the token stream.
    fn is_at_end(&self) -> bool;

    /// Peek at the current token without advancing.
    fn peek(&self) -> Option<&Token>;

    /// Advance to the next token and return the current one.
    fn advance(&mut self) -> Option<(Token, Span)>;

    /// Check if the current token has the same variant as `expected`.
    fn check(&self, expected: &Token) -> bool;

    /// Consume the current token if it matches the expected variant.
    fn match_token(&mut self, expected: &Token) -> bool;

    /// Fail unless every token has been consumed.
    fn expect_end(&self) -> Result<(), Message>;

    /// Create an error.
    fn error(&self, code: ErrorCode, message: impl Into<String>) -> Message;
}

impl<'a> ParserHelpers<'a> for Parser<'a> {
    fn is_at_end(&self) -> bool {
        self.position >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position).map(|(t, _)| t)
    }

    fn advance(&mut self) -> Option<(Token, Span)> {
        let result = self.tokens.get(self.position).cloned();
        if result.is_some() {
            self.position += 1;
        }
        result
    }

    fn check(&self, expected: &Token) -> bool {
        self.peek()
            .is_some_and(|t| std::mem::discriminant(t) == std::mem::discriminant(expected))
    }

    fn match_token(&mut self, expected: &Token) -> bool {
        if self.check(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_end(&self) -> Result<(), Message> {
        match self.peek() {
            None => Ok(()),
            Some(token) => Err(self.error(
                ErrorCode::UnexpectedToken,
                format!("Unexpected {}.", token.describe()),
            )),
        }
    }

    fn error(&self, code: ErrorCode, message: impl Into<String>) -> Message {
        Message::fatal(code, message)
    }
}

/// Table a symbolic reference resolves against.
///
/// Names declared by the text being parsed stay in `scope`. Anything else
/// goes to the nearest enclosing table that already owns the name, or to the
/// root of the tree so that later declarations pick it up.
pub fn reference_scope(
    store: &SymbolStore,
    scope: TableId,
    declared: &HashSet<String>,
    name: &str,
) -> TableId {
    if declared.contains(name) || store.exists(scope, name) {
        return scope;
    }
    let mut current = store.parent(scope);
    while let Some(table) = current {
        if store.exists(table, name) {
            return table;
        }
        current = store.parent(table);
    }
    root_table(store, scope)
}

impl<'a> Parser<'a> {
    /// Convert the next token into an argument, if it is one.
    ///
    /// Identifiers become symbol references when `symbolic` is set and plain
    /// identifiers otherwise.
    pub(crate) fn argument(
        &mut self,
        store: &mut SymbolStore,
        scope: TableId,
        declared: &HashSet<String>,
        symbolic: bool,
    ) -> Result<Option<Argument>, Message> {
        let Some(token) = self.peek().cloned() else {
            return Ok(None);
        };
        let raw = self.slice_at(self.position);

        let argument = match token {
            Token::Decimal(v) => {
                if !(-32768..=65535).contains(&v) {
                    return Err(self.error(
                        ErrorCode::ArgumentOutOfRange,
                        format!("Decimal {} does not fit in 16 bits.", v),
                    ));
                }
                Argument::new(ArgumentKind::Decimal(v), raw)
            }
            Token::Hex(v) => {
                if v > 0xFFFF {
                    return Err(self.error(
                        ErrorCode::ArgumentOutOfRange,
                        format!("Hexadecimal {} does not fit in 16 bits.", raw),
                    ));
                }
                Argument::new(ArgumentKind::Hexadecimal(v), raw)
            }
            Token::Char(text) => {
                let bytes = unescape(&text)?;
                match bytes.as_slice() {
                    [byte] => Argument::new(ArgumentKind::Character(*byte), text),
                    _ => {
                        return Err(self.error(
                            ErrorCode::ArgumentOutOfRange,
                            format!("Character literal {} is not a single byte.", text),
                        ))
                    }
                }
            }
            Token::Str(text) => Argument::new(ArgumentKind::Text(unescape(&text)?), text),
            Token::Identifier(name) if symbolic => {
                let table = reference_scope(store, scope, declared, &name);
                let entry = store.reference(table, &name)?;
                Argument::symbol(name, entry)
            }
            Token::Identifier(name) => Argument::identifier(name),
            _ => return Ok(None),
        };
        self.advance();
        Ok(Some(argument))
    }

    /// Convert a comma-separated list of arguments.
    pub(crate) fn argument_list(
        &mut self,
        store: &mut SymbolStore,
        scope: TableId,
        declared: &HashSet<String>,
        symbolic: bool,
    ) -> Result<Vec<Argument>, Message> {
        let mut args = Vec::new();
        let Some(first) = self.argument(store, scope, declared, symbolic)? else {
            return Ok(args);
        };
        args.push(first);
        while self.match_token(&Token::Comma) {
            match self.argument(store, scope, declared, symbolic)? {
                Some(arg) => args.push(arg),
                None => {
                    return Err(self.error(
                        ErrorCode::UnexpectedToken,
                        "Expected an argument after \",\".",
                    ))
                }
            }
        }
        Ok(args)
    }

    fn slice_at(&self, position: usize) -> String {
        self.tokens
            .get(position)
            .and_then(|(_, span)| self.source.get(span.clone()))
            .unwrap_or_default()
            .to_string()
    }
}
