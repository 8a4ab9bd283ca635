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

//! Whole-program sanity checks.
//!
//! Run once addresses are known. The checks are ordered; the first class of
//! problem found is reported on every offending node and the rest are skipped,
//! since later checks tend to repeat what an earlier failure already explains.

use crate::ast::{Ast, Directive, NodeId, NodeKind};
use crate::driver::Features;
use crate::error::{ErrorCode, Message};
use crate::symbol::{DefinitionState, SymbolStore};

use super::addresses::object_size;

/// Largest object a unit may produce.
pub const MAX_OBJECT_SIZE: u32 = 0x10000;

/// Directives only the operating system may use.
pub fn is_os_only(directive: Directive) -> bool {
    matches!(
        directive,
        Directive::Burn
            | Directive::Export
            | Directive::Scall
            | Directive::Uscall
            | Directive::Input
            | Directive::Output
    )
}

/// Check a finished unit. Returns whether it is sound.
pub fn check_whole_program(ast: &mut Ast, store: &SymbolStore, root: NodeId, features: &Features) -> bool {
    if object_size(ast, root) > MAX_OBJECT_SIZE {
        let first = ast
            .preorder(root)
            .into_iter()
            .find(|&id| ast[id].kind != NodeKind::Structural);
        if let Some(first) = first {
            ast[first].attrs.errors.push(Message::fatal(
                ErrorCode::ObjectTooLarge,
                format!("Object code exceeds {} bytes.", MAX_OBJECT_SIZE),
            ));
        }
        return false;
    }

    if !check_directives(ast, root, features.is_os) {
        return false;
    }
    if !features.ignore_undefined_symbols && !check_undefined(ast, store, root) {
        return false;
    }
    check_definitions(ast, store, root)
}

fn check_directives(ast: &mut Ast, root: NodeId, is_os: bool) -> bool {
    let mut ok = true;
    for id in ast.preorder(root) {
        let Some(directive) = ast[id].attrs.directive else {
            continue;
        };
        let message = if !is_os && is_os_only(directive) {
            Message::fatal(
                ErrorCode::IllegalInUserProgram,
                format!("{} is only allowed in the operating system.", directive),
            )
        } else if is_os && directive == Directive::Import {
            Message::fatal(
                ErrorCode::IllegalInOsProgram,
                format!("{} is not allowed in the operating system.", directive),
            )
        } else {
            continue;
        };
        ast[id].attrs.errors.push(message);
        ok = false;
    }
    ok
}

fn check_undefined(ast: &mut Ast, store: &SymbolStore, root: NodeId) -> bool {
    let mut ok = true;
    for id in ast.preorder(root) {
        // Imports are checked when units are linked.
        if ast[id].attrs.directive == Some(Directive::Import) {
            continue;
        }
        let undefined: Vec<String> = ast[id]
            .attrs
            .arguments
            .iter()
            .filter(|arg| {
                arg.entry()
                    .and_then(|entry| store.entry(entry))
                    .is_some_and(|e| e.state == DefinitionState::Undefined)
            })
            .map(|arg| arg.text.clone())
            .collect();
        for name in undefined {
            ast[id].attrs.errors.push(Message::fatal(
                ErrorCode::UndefinedSymbol,
                format!("Undefined symbol \"{}\".", name),
            ));
            ok = false;
        }
    }
    ok
}

fn check_definitions(ast: &mut Ast, store: &SymbolStore, root: NodeId) -> bool {
    let mut ok = true;
    for id in ast.preorder(root) {
        let Some(decl) = ast[id].attrs.symbol.as_ref() else {
            continue;
        };
        let message = match store.entry(decl.entry).map(|e| e.state) {
            Some(DefinitionState::Multiple) => Message::fatal(
                ErrorCode::MultiplyDefinedSymbol,
                format!("Symbol \"{}\" is defined more than once.", decl.name),
            ),
            Some(DefinitionState::ExternalMultiple) => Message::fatal(
                ErrorCode::ConflictingGlobalDefinition,
                format!("Symbol \"{}\" conflicts with a global definition.", decl.name),
            ),
            _ => continue,
        };
        ast[id].attrs.errors.push(message);
        ok = false;
    }
    ok
}
