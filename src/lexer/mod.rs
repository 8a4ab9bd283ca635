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

//! Lexer module for Pep/10 assembly.
//!
//! Source is tokenized one line at a time; a line never continues onto the
//! next. It handles:
//! - Symbol declarations (`name:`), identifiers, directives and macro calls
//! - Decimal, hexadecimal, character and string literals
//! - Comments (starting with `;`)

mod tokens;

pub use tokens::Token;

use std::ops::Range;

use crate::error::{ErrorCode, Message};

/// Byte range of a token inside its line.
pub type Span = Range<usize>;

/// Tokenize a single line.
pub fn tokenize_line(line: &str) -> Result<Vec<(Token, Span)>, Message> {
    use logos::Logos;

    let mut tokens = Vec::new();
    for (result, span) in Token::lexer(line).spanned() {
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(()) => {
                return Err(Message::fatal(
                    ErrorCode::UnexpectedToken,
                    format!("Unexpected input \"{}\".", &line[span]),
                ))
            }
        }
    }
    Ok(tokens)
}

/// Decode the escapes of a quoted literal, quotes included in `raw`.
pub fn unescape(raw: &str) -> Result<Vec<u8>, Message> {
    let inner = raw
        .get(1..raw.len().saturating_sub(1))
        .unwrap_or_default();
    let mut out = Vec::with_capacity(inner.len());
    let mut chars = inner.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            let mut buf = [0u8; 4];
            out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        let escaped = chars.next().unwrap_or('\\');
        match escaped {
            'n' => out.push(b'\n'),
            'r' => out.push(b'\r'),
            't' => out.push(b'\t'),
            'b' => out.push(0x08),
            'f' => out.push(0x0C),
            'v' => out.push(0x0B),
            '0' => out.push(0),
            '\\' => out.push(b'\\'),
            '"' => out.push(b'"'),
            '\'' => out.push(b'\''),
            'x' | 'X' => {
                let hex: String = chars.by_ref().take(2).collect();
                match u8::from_str_radix(&hex, 16) {
                    Ok(byte) if hex.len() == 2 => out.push(byte),
                    _ => {
                        return Err(Message::fatal(
                            ErrorCode::UnexpectedToken,
                            format!("Invalid hex escape in {}.", raw),
                        ))
                    }
                }
            }
            other => {
                return Err(Message::fatal(
                    ErrorCode::UnexpectedToken,
                    format!("Invalid escape sequence \"\\{}\".", other),
                ))
            }
        }
    }
    Ok(out)
}
