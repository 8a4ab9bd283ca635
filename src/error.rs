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

//! Error types for the Pep/10 assembler core.
//!
//! Almost every problem found while assembling is recorded on the AST node
//! that caused it as a [`Message`], and the pass keeps going. [`AsmError`] is
//! the owned, line-tagged form handed to callers once a unit is finished,
//! and the error type for the few operations that can fail outright
//! (reading macro directories, for example).

use std::fmt;
use thiserror::Error;

/// Error codes for the assembler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Line conversion errors (E001-E030)
    UnexpectedToken,
    InvalidMnemonic,
    InvalidDirective,
    InvalidAddressingMode,
    InvalidDirectiveArity,
    InvalidDirectiveArgumentType,
    SymbolNotAllowed,
    SymbolRequired,
    ArgumentOutOfRange,

    // Macro errors (E100-E106)
    ExpectedMacro,
    MacroNotFound,
    MacroArityMismatch,
    MacroRecursion,
    MacroBodyParseError,
    InvalidMacroDefinition,
    MacroRedefinition,

    // Section errors (E150)
    InvalidSectionArguments,

    // Linkage errors (E200-E240)
    UndefinedSymbol,
    MultiplyDefinedSymbol,
    ConflictingGlobalDefinition,
    IllegalInUserProgram,
    IllegalInOsProgram,
    SymbolNotExported,
    ObjectTooLarge,
    SymbolTable,

    // Environment errors (E300)
    Io,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl ErrorCode {
    /// Get the numeric code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            // Line conversion errors
            ErrorCode::UnexpectedToken => "E001",
            ErrorCode::InvalidMnemonic => "E002",
            ErrorCode::InvalidDirective => "E003",
            ErrorCode::InvalidAddressingMode => "E004",
            ErrorCode::InvalidDirectiveArity => "E010",
            ErrorCode::InvalidDirectiveArgumentType => "E011",
            ErrorCode::SymbolNotAllowed => "E020",
            ErrorCode::SymbolRequired => "E021",
            ErrorCode::ArgumentOutOfRange => "E030",

            // Macro errors
            ErrorCode::ExpectedMacro => "E100",
            ErrorCode::MacroNotFound => "E101",
            ErrorCode::MacroArityMismatch => "E102",
            ErrorCode::MacroRecursion => "E103",
            ErrorCode::MacroBodyParseError => "E104",
            ErrorCode::InvalidMacroDefinition => "E105",
            ErrorCode::MacroRedefinition => "E106",

            // Section errors
            ErrorCode::InvalidSectionArguments => "E150",

            // Linkage errors
            ErrorCode::UndefinedSymbol => "E200",
            ErrorCode::MultiplyDefinedSymbol => "E201",
            ErrorCode::ConflictingGlobalDefinition => "E202",
            ErrorCode::IllegalInUserProgram => "E210",
            ErrorCode::IllegalInOsProgram => "E211",
            ErrorCode::SymbolNotExported => "E220",
            ErrorCode::ObjectTooLarge => "E231",
            ErrorCode::SymbolTable => "E240",

            ErrorCode::Io => "E300",
        }
    }
}

/// How serious a node diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    /// Reported, but does not fail the unit.
    Warning,
    /// The unit must not be emitted.
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Fatal => write!(f, "error"),
        }
    }
}

/// A diagnostic attached to an AST node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub severity: Severity,
    pub code: ErrorCode,
    pub message: String,
}

impl Message {
    /// Create a fatal diagnostic.
    pub fn fatal(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Fatal,
            code,
            message: message.into(),
        }
    }

    /// Create a non-fatal diagnostic.
    pub fn warning(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
        }
    }

    /// Check whether this diagnostic fails its unit.
    pub fn is_fatal(&self) -> bool {
        self.severity == Severity::Fatal
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

/// An assembler error with an optional source line.
#[derive(Debug, Error)]
#[error("[{code}] {message}")]
pub struct AsmError {
    /// The error code.
    pub code: ErrorCode,
    /// The error message.
    pub message: String,
    /// 0-indexed source line, if the error belongs to one.
    pub line: Option<usize>,
    /// Optional hint for fixing the error.
    pub hint: Option<String>,
}

impl AsmError {
    /// Create a new error that is not tied to a line.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            line: None,
            hint: None,
        }
    }

    /// Create an error from a node diagnostic found on `line`.
    pub fn at_line(line: usize, message: &Message) -> Self {
        Self {
            code: message.code,
            message: message.message.clone(),
            line: Some(line),
            hint: None,
        }
    }

    /// Add a hint to this error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Get the error code string.
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }
}

impl From<crate::symbol::SymbolError> for Message {
    fn from(err: crate::symbol::SymbolError) -> Self {
        Message::fatal(ErrorCode::SymbolTable, err.to_string())
    }
}

impl From<std::io::Error> for AsmError {
    fn from(err: std::io::Error) -> Self {
        AsmError::new(ErrorCode::Io, err.to_string())
    }
}

/// Result type for assembler operations.
pub type Result<T> = std::result::Result<T, AsmError>;

/// Format an error with source context.
///
/// `line` on the error is 0-indexed; the rendered location is 1-indexed
/// like every other tool that prints `file:line`.
pub fn format_error(error: &AsmError, source: &str, filename: Option<&str>) -> String {
    let filename = filename.unwrap_or("<input>");
    let mut output = String::new();

    output.push_str(&format!("error[{}]: {}\n", error.code_str(), error.message));

    if let Some(line) = error.line {
        let line_content = source.lines().nth(line).unwrap_or("");
        let shown = line + 1;
        let width = shown.to_string().len();

        output.push_str(&format!("  --> {}:{}\n", filename, shown));
        output.push_str(&format!("{:>width$} |\n", "", width = width));
        output.push_str(&format!(
            "{:>width$} | {}\n",
            shown,
            line_content,
            width = width
        ));
        let trimmed = line_content.trim_start();
        let indent = line_content.len() - trimmed.len();
        output.push_str(&format!(
            "{:>width$} | {:>indent$}{}\n",
            "",
            "",
            "^".repeat(trimmed.trim_end().len().max(1)),
            width = width,
            indent = indent
        ));
    } else {
        output.push_str(&format!("  --> {}\n", filename));
    }

    if let Some(hint) = &error.hint {
        output.push_str(&format!("  = hint: {}\n", hint));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(ErrorCode::UnexpectedToken.code(), "E001");
        assert_eq!(ErrorCode::MacroNotFound.code(), "E101");
        assert_eq!(ErrorCode::UndefinedSymbol.code(), "E200");
    }

    #[test]
    fn test_message_display() {
        let msg = Message::fatal(ErrorCode::MacroRecursion, "Macro loop detected.");
        assert_eq!(msg.to_string(), "[E103] Macro loop detected.");
        assert!(msg.is_fatal());
        assert!(!Message::warning(ErrorCode::Io, "x").is_fatal());
    }

    #[test]
    fn test_asm_error_from_message() {
        let msg = Message::fatal(ErrorCode::UndefinedSymbol, "Undefined symbol \"foo\".");
        let err = AsmError::at_line(3, &msg).with_hint("Did you mean \"fo\"?");

        assert_eq!(err.code_str(), "E200");
        assert_eq!(err.line, Some(3));
        assert!(err.hint.is_some());
    }

    #[test]
    fn test_format_error_with_line() {
        let source = "main: LDWA 0,i\n      BR nowhere\n";
        let msg = Message::fatal(ErrorCode::UndefinedSymbol, "Undefined symbol \"nowhere\".");
        let rendered = format_error(&AsmError::at_line(1, &msg), source, Some("os.pep"));

        assert!(rendered.starts_with("error[E200]"));
        assert!(rendered.contains("--> os.pep:2"));
        assert!(rendered.contains("BR nowhere"));
        assert!(rendered.contains("^^^^^^^^^^"));
    }
}
