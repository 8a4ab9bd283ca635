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

//! Passes run over a parsed unit, in pipeline order:
//!
//! 1. macro expansion (see [`crate::macros`])
//! 2. `group` - section grouping
//! 3. `exports` - export registration
//! 4. `addresses` - address and symbol value assignment
//! 5. `sanity` - whole-program checks
//!
//! `errors` and `ret_ops` read a finished tree.

pub mod addresses;
pub mod errors;
pub mod exports;
pub mod group;
pub mod predicates;
pub mod ret_ops;
pub mod sanity;

pub use addresses::{assign_addresses, object_size};
pub use errors::{collect_errors, has_errors};
pub use exports::register_exports;
pub use group::group_sections;
pub use predicates::is_addressable;
pub use ret_ops::annotate_ret_ops;
pub use sanity::check_whole_program;
