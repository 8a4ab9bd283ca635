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

//! Fuzz target for the whole two-unit driver.
//!
//! Arbitrary operating system and user program texts are assembled
//! together. Expansion, grouping, linking and layout must terminate
//! without panicking, whatever the input.
//!
//! Run with:
//!   cargo +nightly fuzz run fuzz_driver
//!
//! Run for a specific duration:
//!   cargo +nightly fuzz run fuzz_driver -- -max_total_time=60

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use pepasm::driver::AsmDriver;
use pepasm::macros::{Macro, MacroOrigin};

#[derive(Arbitrary, Debug)]
struct Input {
    os: String,
    user: Option<String>,
    macro_body: String,
}

fuzz_target!(|input: Input| {
    let mut driver = AsmDriver::default();
    // A user macro that may call itself or the core book
    let _ = driver
        .registry_mut()
        .register(Macro::new("FUZZ", 1, input.macro_body, MacroOrigin::User));

    let mut assembly = driver.assemble(&input.os, input.user.as_deref());
    let _ = assembly.os_errors();
    let _ = assembly.user_errors();
    let _ = assembly.relocate_user(0x8000, 0);
});
