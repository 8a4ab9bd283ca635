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

//! Two-unit resolution driver.
//!
//! The driver owns the macro registry shared by both units and runs each unit
//! through the stage pipeline:
//!
//! ```text
//! Start -> Parse -> IncludeMacros -> GroupNodes -> RegisterExports
//!       -> LinkImports -> AssignAddresses -> WholeProgramSanity -> End
//! ```
//!
//! A unit stops at the first stage that reports a problem. Both units live in
//! one [`SymbolStore`] as two separate roots; the user root may import names
//! the operating system exports, never the other way round.

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use crate::ast::{Ast, Directive, NodeId};
use crate::error::{ErrorCode, Message, Result};
use crate::macros::{MacroExpander, MacroRegistry, RedefinitionPolicy};
use crate::parser::{parse_unit, LineParser, SourceParser};
use crate::passes::{
    annotate_ret_ops, assign_addresses, check_whole_program, collect_errors, group_sections,
    has_errors, is_addressable, register_exports,
};
use crate::symbol::{adjust_offset, table_listing, Binding, SymbolStore, TableId, TraversalPolicy};

/// Per-unit switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Features {
    /// The unit is the operating system.
    pub is_os: bool,
    /// Do not report symbols that are referenced but never defined.
    pub ignore_undefined_symbols: bool,
}

impl Features {
    pub fn os() -> Self {
        Self {
            is_os: true,
            ..Self::default()
        }
    }

    pub fn user() -> Self {
        Self::default()
    }
}

/// Driver configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverConfig {
    /// Size in bytes of an address on the target.
    pub pointer_size: u16,
    pub os_features: Features,
    pub user_features: Features,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            pointer_size: 2,
            os_features: Features::os(),
            user_features: Features::user(),
        }
    }
}

/// Pipeline stages, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    Start,
    Parse,
    IncludeMacros,
    GroupNodes,
    RegisterExports,
    LinkImports,
    AssignAddresses,
    WholeProgramSanity,
    End,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Start => "start",
            Stage::Parse => "parse",
            Stage::IncludeMacros => "include macros",
            Stage::GroupNodes => "group nodes",
            Stage::RegisterExports => "register exports",
            Stage::LinkImports => "link imports",
            Stage::AssignAddresses => "assign addresses",
            Stage::WholeProgramSanity => "whole program sanity",
            Stage::End => "end",
        };
        write!(f, "{}", name)
    }
}

/// Which of the two units something belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitKind {
    Os,
    User,
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitKind::Os => write!(f, "os"),
            UnitKind::User => write!(f, "user"),
        }
    }
}

/// One assembled translation unit.
#[derive(Debug, Clone)]
pub struct Unit {
    pub kind: UnitKind,
    pub ast: Ast,
    /// Root of the unit's symbol tree.
    pub table: TableId,
    /// The stage the unit was in when it stopped. `End` on success.
    pub stage: Stage,
}

impl Unit {
    pub fn root(&self) -> NodeId {
        self.ast.root()
    }

    /// Every error in the unit as `(0-indexed line, message)`.
    pub fn errors(&self) -> Vec<(usize, Message)> {
        collect_errors(&self.ast, self.ast.root())
    }

    /// The unit went through every stage and carries no errors.
    pub fn is_ok(&self) -> bool {
        self.stage == Stage::End && !has_errors(&self.ast, self.ast.root())
    }
}

/// The result of assembling the operating system and an optional user program.
#[derive(Debug, Clone)]
pub struct Assembly {
    pub store: SymbolStore,
    pub os: Unit,
    pub user: Option<Unit>,
    /// Addresses of `RET` instructions used as the second half of a call.
    pub call_via_return: BTreeSet<u16>,
}

impl Assembly {
    pub fn os_errors(&self) -> Vec<(usize, Message)> {
        self.os.errors()
    }

    pub fn user_errors(&self) -> Vec<(usize, Message)> {
        self.user.as_ref().map(Unit::errors).unwrap_or_default()
    }

    /// Check whether either unit failed.
    pub fn has_errors(&self) -> bool {
        !self.os.is_ok() || self.user.as_ref().is_some_and(|unit| !unit.is_ok())
    }

    /// Move every user location at or above `threshold` by `offset`.
    ///
    /// Returns how many symbol values changed.
    pub fn relocate_user(&mut self, offset: u64, threshold: u64) -> usize {
        let Some(user) = &self.user else {
            return 0;
        };
        let adjusted = adjust_offset(
            &mut self.store,
            user.table,
            offset,
            threshold,
            TraversalPolicy::WholeTree,
        );
        log::debug!("relocated {} user symbol(s) by {:#X}", adjusted, offset);
        adjusted
    }

    /// Symbol listing of a unit's whole symbol tree.
    pub fn symbol_listing(&self, kind: UnitKind) -> Option<String> {
        let unit = self.unit(kind)?;
        let max_bytes = self.store.pointer_size(unit.table).ok()?;
        Some(table_listing(
            &self.store,
            unit.table,
            u8::try_from(max_bytes).unwrap_or(u8::MAX),
            TraversalPolicy::WholeTree,
        ))
    }

    pub fn unit(&self, kind: UnitKind) -> Option<&Unit> {
        match kind {
            UnitKind::Os => Some(&self.os),
            UnitKind::User => self.user.as_ref(),
        }
    }
}

/// Runs both units through the pipeline.
pub struct AsmDriver {
    config: DriverConfig,
    registry: MacroRegistry,
    parser: Box<dyn SourceParser>,
}

impl AsmDriver {
    /// Create a driver using the line parser and the built-in macro book.
    pub fn new(config: DriverConfig) -> Self {
        Self::with_parts(
            config,
            MacroRegistry::with_core_book(RedefinitionPolicy::default()),
            Box::new(LineParser),
        )
    }

    pub fn with_parts(
        config: DriverConfig,
        registry: MacroRegistry,
        parser: Box<dyn SourceParser>,
    ) -> Self {
        Self {
            config,
            registry,
            parser,
        }
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn registry(&self) -> &MacroRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut MacroRegistry {
        &mut self.registry
    }

    /// Register every macro file in `dir` as a user macro.
    pub fn load_macro_directory(&mut self, dir: &Path) -> Result<usize> {
        self.registry.load_directory(dir)
    }

    /// Assemble the operating system and, if given, a user program against it.
    pub fn assemble(&self, os_text: &str, user_text: Option<&str>) -> Assembly {
        let mut store = SymbolStore::new();

        let os = self.run_unit(&mut store, UnitKind::Os, os_text, None);
        let user = user_text.map(|text| self.run_unit(&mut store, UnitKind::User, text, Some(os.table)));

        let mut call_via_return = BTreeSet::new();
        annotate_ret_ops(&os.ast, os.root(), &mut call_via_return);
        if let Some(user) = &user {
            annotate_ret_ops(&user.ast, user.root(), &mut call_via_return);
        }

        Assembly {
            store,
            os,
            user,
            call_via_return,
        }
    }

    fn features(&self, kind: UnitKind) -> Features {
        match kind {
            UnitKind::Os => self.config.os_features,
            UnitKind::User => self.config.user_features,
        }
    }

    fn run_unit(
        &self,
        store: &mut SymbolStore,
        kind: UnitKind,
        text: &str,
        os_table: Option<TableId>,
    ) -> Unit {
        let table = store.add_root(self.config.pointer_size);
        let mut unit = Unit {
            kind,
            ast: Ast::new(),
            table,
            stage: Stage::Start,
        };
        let root = unit.root();
        let features = self.features(kind);

        let stages = [
            Stage::Parse,
            Stage::IncludeMacros,
            Stage::GroupNodes,
            Stage::RegisterExports,
            Stage::LinkImports,
            Stage::AssignAddresses,
            Stage::WholeProgramSanity,
        ];
        for stage in stages {
            unit.stage = stage;
            log::debug!("{} unit: {}", kind, stage);

            let ast = &mut unit.ast;
            let ok = match stage {
                Stage::Parse => parse_unit(self.parser.as_ref(), text, ast, store, table).is_empty(),
                Stage::IncludeMacros => {
                    let mut expander =
                        MacroExpander::new(&self.registry, self.parser.as_ref(), is_addressable);
                    expander.expand_all(ast, store, root)
                }
                Stage::GroupNodes => group_sections(ast, root, is_addressable),
                Stage::RegisterExports => register_exports(ast, store, root),
                Stage::LinkImports => match os_table {
                    Some(os_table) => link_imports(ast, store, root, table, os_table),
                    None => true,
                },
                Stage::AssignAddresses => assign_addresses(ast, store, root),
                Stage::WholeProgramSanity => check_whole_program(ast, store, root, &features),
                Stage::Start | Stage::End => true,
            };

            if !ok {
                log::debug!("{} unit stopped at {}", kind, stage);
                return unit;
            }
        }

        unit.stage = Stage::End;
        unit
    }
}

impl Default for AsmDriver {
    fn default() -> Self {
        Self::new(DriverConfig::default())
    }
}

/// Resolve every `.IMPORT` of a unit against the operating system's root.
///
/// Only names the operating system made global can be imported.
pub fn link_imports(
    ast: &mut Ast,
    store: &mut SymbolStore,
    root: NodeId,
    table: TableId,
    os_table: TableId,
) -> bool {
    let mut ok = true;
    for id in ast.preorder(root) {
        if ast[id].attrs.directive != Some(Directive::Import) {
            continue;
        }
        let names: Vec<String> = ast[id].attrs.arguments.iter().map(|a| a.text.clone()).collect();
        for name in names {
            let exported = store
                .get(os_table, &name)
                .and_then(|entry| store.entry(entry))
                .is_some_and(|entry| entry.binding == Binding::Global);

            let result = if exported {
                store.import(table, os_table, &name).map_err(Message::from)
            } else {
                Err(Message::fatal(
                    ErrorCode::SymbolNotExported,
                    format!("Symbol \"{}\" is not exported by the operating system.", name),
                ))
            };

            if let Err(message) = result {
                ast[id].attrs.errors.push(message);
                ok = false;
            }
        }
    }
    ok
}
