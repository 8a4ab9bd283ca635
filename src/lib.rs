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

//! Pepasm Assembler Library
//!
//! This library provides the semantic core of a Pep/10 assembler that builds
//! an operating system and a user program side by side.
//!
//! # Modules
//!
//! - [`error`] - Error codes, node diagnostics and error reporting
//! - [`symbol`] - Symbol tables, values, forking and traversal
//! - [`ast`] - The node arena and its attributes
//! - [`lexer`] - Tokenization of single source lines
//! - [`parser`] - Converting lines into AST nodes
//! - [`macros`] - The macro registry and macro expansion
//! - [`passes`] - Section grouping, exports, addresses and sanity checks
//! - [`driver`] - Running both units through the pipeline
//! - [`format`] - Rendering nodes back into source lines
//!
//! # Example
//!
//! ```
//! let os = ".EXPORT loader\n.ORG 0xFC17\nloader: NOP\n";
//! let user = ".IMPORT loader\nmain: CALL loader\n";
//!
//! let assembly = pepasm::assemble(os, Some(user));
//! assert!(assembly.os_errors().is_empty());
//! assert!(assembly.user_errors().is_empty());
//! ```

pub mod ast;
pub mod driver;
pub mod error;
pub mod format;
pub mod isa;
pub mod lexer;
pub mod macros;
pub mod parser;
pub mod passes;
pub mod symbol;

// Re-export commonly used types
pub use driver::{AsmDriver, Assembly, DriverConfig, Features, Stage, Unit, UnitKind};
pub use error::{format_error, AsmError, ErrorCode, Message, Result, Severity};
pub use macros::{Macro, MacroOrigin, MacroRegistry, RedefinitionPolicy};
pub use symbol::{Binding, DefinitionState, SymbolStore, Value};

/// The version of the assembler.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The name of the assembler.
pub const NAME: &str = "Pepasm";

/// Assemble an operating system and an optional user program.
///
/// This is the main entry point. It uses the default configuration, the
/// built-in macro book and the line parser. Problems are never returned as
/// `Err`; they are recorded per unit and available through
/// [`Assembly::os_errors`] and [`Assembly::user_errors`].
///
/// # Example
///
/// ```
/// let assembly = pepasm::assemble("FROB 1,i\n", None);
/// let errors = assembly.os_errors();
/// assert_eq!(errors.len(), 1);
/// assert_eq!(errors[0].0, 0);
/// ```
pub fn assemble(os_text: &str, user_text: Option<&str>) -> Assembly {
    AsmDriver::default().assemble(os_text, user_text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_name() {
        assert_eq!(NAME, "Pepasm");
    }

    #[test]
    fn test_assemble_empty_os() {
        let assembly = assemble("", None);
        assert!(!assembly.has_errors());
        assert_eq!(assembly.os.stage, Stage::End);
    }
}
