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

//! Token definitions for Pep/10 assembly lines.

use logos::Logos;

/// A token of a single source line.
#[derive(Logos, Debug, Clone, PartialEq, Eq)]
#[logos(skip r"[ \t\r]+")]
pub enum Token {
    /// `name:` - a symbol declaration, colon stripped.
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*:", |lex| lex.slice().trim_end_matches(':').to_string())]
    SymbolDecl(String),

    /// A bare word: mnemonic, symbol reference or addressing mode.
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Identifier(String),

    /// `.NAME` - a directive, dot stripped.
    #[regex(r"\.[A-Za-z]+", |lex| lex.slice()[1..].to_string())]
    Directive(String),

    /// `@NAME` - a macro call, at-sign stripped.
    #[regex(r"@[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice()[1..].to_string())]
    Macro(String),

    /// `0x1F` - hexadecimal literal.
    #[regex(r"0[xX][0-9A-Fa-f]+", |lex| u64::from_str_radix(&lex.slice()[2..], 16).ok())]
    Hex(u64),

    /// `-12` - decimal literal.
    #[regex(r"[+-]?[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Decimal(i64),

    /// `'a'` - character literal, quotes included.
    #[regex(r"'([^'\\]|\\.|\\[xX][0-9A-Fa-f]{2})'", |lex| lex.slice().to_string())]
    Char(String),

    /// `"text"` - string literal, quotes included.
    #[regex(r#""([^"\\]|\\.)*""#, |lex| lex.slice().to_string())]
    Str(String),

    #[token(",")]
    Comma,

    /// `;text` - comment, semicolon stripped.
    #[regex(r";[^\n]*", |lex| lex.slice()[1..].to_string())]
    Comment(String),
}

impl Token {
    /// Short description used in error messages.
    pub fn describe(&self) -> String {
        match self {
            Token::SymbolDecl(name) => format!("symbol declaration \"{}:\"", name),
            Token::Identifier(name) => format!("identifier \"{}\"", name),
            Token::Directive(name) => format!("directive \".{}\"", name),
            Token::Macro(name) => format!("macro \"@{}\"", name),
            Token::Hex(v) => format!("hexadecimal 0x{:X}", v),
            Token::Decimal(v) => format!("decimal {}", v),
            Token::Char(text) | Token::Str(text) => text.clone(),
            Token::Comma => "\",\"".to_string(),
            Token::Comment(_) => "comment".to_string(),
        }
    }
}
