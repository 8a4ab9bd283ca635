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

//! Fuzz target for the Pepasm line parser.
//!
//! This fuzzer parses random text into a fresh unit to find crashes,
//! panics, or infinite loops in line conversion.
//!
//! Run with:
//!   cargo +nightly fuzz run fuzz_parser
//!
//! Run for a specific duration:
//!   cargo +nightly fuzz run fuzz_parser -- -max_total_time=60

#![no_main]

use libfuzzer_sys::fuzz_target;
use pepasm::ast::Ast;
use pepasm::parser::{parse_unit, LineParser};
use pepasm::symbol::SymbolStore;

fuzz_target!(|data: &[u8]| {
    if let Ok(source) = std::str::from_utf8(data) {
        let mut ast = Ast::new();
        let mut store = SymbolStore::new();
        let scope = store.add_root(2);

        let errors = parse_unit(&LineParser, source, &mut ast, &mut store, scope);
        // One node per line, and errors only on lines that exist
        assert_eq!(ast.children(ast.root()).len(), source.lines().count());
        for (line, _) in errors {
            assert!(line < source.lines().count());
        }
    }
});
