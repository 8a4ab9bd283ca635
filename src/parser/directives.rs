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

//! Directive argument validation.
//!
//! Each dot-command has a fixed arity and accepts only certain argument
//! shapes. These checks run while a line is converted, before any pass sees
//! the node.

use crate::ast::{Argument, ArgumentKind, Directive};
use crate::error::{ErrorCode, Message};

/// Whether identifiers in this directive's arguments name symbols.
pub fn is_symbolic(directive: Directive) -> bool {
    !matches!(
        directive,
        Directive::Section
            | Directive::Align
            | Directive::Block
            | Directive::Burn
            | Directive::Org
            | Directive::Ascii
            | Directive::End
    )
}

/// Whether a line carrying this directive may declare a symbol.
pub fn allows_symbol(directive: Directive) -> bool {
    !matches!(
        directive,
        Directive::End
            | Directive::Export
            | Directive::Import
            | Directive::Input
            | Directive::Output
            | Directive::Scall
            | Directive::Uscall
            | Directive::Section
            | Directive::Burn
    )
}

/// Check arity and argument shapes of a directive line.
pub fn validate(directive: Directive, args: &[Argument], has_symbol: bool) -> Result<(), Message> {
    if has_symbol && !allows_symbol(directive) {
        return Err(Message::fatal(
            ErrorCode::SymbolNotAllowed,
            format!("{} does not allow a symbol declaration.", directive),
        ));
    }

    match directive {
        // Validated by section grouping, which owns the name/flags rules.
        Directive::Section => Ok(()),
        Directive::End => arity(directive, args, 0),
        Directive::Align => {
            arity(directive, args, 1)?;
            match args[0].kind {
                ArgumentKind::Decimal(1 | 2 | 4 | 8) => Ok(()),
                ArgumentKind::Decimal(_) => Err(Message::fatal(
                    ErrorCode::ArgumentOutOfRange,
                    ".ALIGN expects 1, 2, 4 or 8.",
                )),
                _ => Err(wrong_type(directive, "a decimal")),
            }
        }
        Directive::Ascii => {
            arity(directive, args, 1)?;
            if args[0].is_text() {
                Ok(())
            } else {
                Err(wrong_type(directive, "a string"))
            }
        }
        Directive::Block | Directive::Burn | Directive::Org => {
            arity(directive, args, 1)?;
            match args[0].kind {
                ArgumentKind::Decimal(v) if v < 0 => Err(Message::fatal(
                    ErrorCode::ArgumentOutOfRange,
                    format!("{} expects an unsigned value.", directive),
                )),
                ArgumentKind::Decimal(_) | ArgumentKind::Hexadecimal(_) => Ok(()),
                _ => Err(wrong_type(directive, "a decimal or hexadecimal")),
            }
        }
        Directive::Byte => {
            arity(directive, args, 1)?;
            let arg = &args[0];
            if !arg.is_numeric() || arg.entry().is_some() {
                return Err(wrong_type(directive, "a literal"));
            }
            if arg.required_bytes() > 1 {
                return Err(Message::fatal(
                    ErrorCode::ArgumentOutOfRange,
                    format!("{} does not fit in a byte.", arg),
                ));
            }
            Ok(())
        }
        Directive::Word => {
            arity(directive, args, 1)?;
            let arg = &args[0];
            if arg.is_numeric() || (arg.is_text() && arg.size() <= 2) {
                Ok(())
            } else {
                Err(wrong_type(directive, "a number, symbol or short string"))
            }
        }
        Directive::Equate => {
            arity(directive, args, 1)?;
            if !has_symbol {
                return Err(Message::fatal(
                    ErrorCode::SymbolRequired,
                    ".EQUATE requires a symbol declaration.",
                ));
            }
            let arg = &args[0];
            if arg.is_numeric() || (arg.is_text() && arg.size() <= 2) {
                Ok(())
            } else {
                Err(wrong_type(directive, "a number, symbol or short string"))
            }
        }
        Directive::Export
        | Directive::Import
        | Directive::Input
        | Directive::Output
        | Directive::Scall
        | Directive::Uscall => {
            arity(directive, args, 1)?;
            if args[0].entry().is_some() {
                Ok(())
            } else {
                Err(wrong_type(directive, "a symbol"))
            }
        }
    }
}

fn arity(directive: Directive, args: &[Argument], expected: usize) -> Result<(), Message> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(Message::fatal(
            ErrorCode::InvalidDirectiveArity,
            format!(
                "{} expects {} argument(s), found {}.",
                directive,
                expected,
                args.len()
            ),
        ))
    }
}

fn wrong_type(directive: Directive, expected: &str) -> Message {
    Message::fatal(
        ErrorCode::InvalidDirectiveArgumentType,
        format!("{} expects {}.", directive, expected),
    )
}
