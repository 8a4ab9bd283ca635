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

//! Macro registry.
//!
//! Macros come from two origins: the core book bundled with the assembler and
//! user directories of `.pepm` files. Each origin has its own namespace, and a
//! user macro shadows a core macro of the same name. Names are matched
//! case-insensitively.
//!
//! A definition file starts with a header line `@NAME argc`; the rest of the
//! file is the body, where `$1`..`$argc` mark the parameters.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;

use crate::error::{AsmError, ErrorCode, Message};

/// Where a macro was registered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MacroOrigin {
    /// Bundled with the assembler.
    Core,
    /// Loaded from a macro directory.
    User,
}

/// What to do when a name is registered twice within one origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RedefinitionPolicy {
    /// The later definition wins.
    #[default]
    Replace,
    /// The earlier definition wins; the later one is ignored.
    KeepFirst,
    /// Registering again is an error.
    Reject,
}

/// A macro definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Macro {
    pub name: String,
    pub arg_count: usize,
    pub body: String,
    pub origin: MacroOrigin,
}

impl Macro {
    pub fn new(name: impl Into<String>, arg_count: usize, body: impl Into<String>, origin: MacroOrigin) -> Self {
        Self {
            name: name.into(),
            arg_count,
            body: body.into(),
            origin,
        }
    }

    /// Parse a `.pepm` file: a `@NAME argc` header line, then the body.
    pub fn parse_definition(text: &str, origin: MacroOrigin) -> Result<Self, Message> {
        let (header, body) = text.split_once('\n').unwrap_or((text, ""));
        let invalid = |detail: &str| {
            Message::fatal(
                ErrorCode::InvalidMacroDefinition,
                format!("Invalid macro header \"{}\": {}.", header.trim(), detail),
            )
        };

        let mut parts = header.split_whitespace();
        let name = parts
            .next()
            .and_then(|word| word.strip_prefix('@'))
            .ok_or_else(|| invalid("expected @NAME"))?;
        let valid_name = name
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid_name {
            return Err(invalid("bad macro name"));
        }
        let arg_count = parts
            .next()
            .and_then(|count| count.parse::<usize>().ok())
            .ok_or_else(|| invalid("expected an argument count"))?;
        if parts.next().is_some() {
            return Err(invalid("trailing text"));
        }

        Ok(Self::new(name, arg_count, body, origin))
    }
}

/// Two-argument system calls of the core book, in trap-number order.
const CORE_SYSTEM_CALLS: &[&str] = &["DECI", "DECO", "HEXO", "STRO"];

/// All known macros, shared by both units of an assembly.
#[derive(Debug, Clone, Default)]
pub struct MacroRegistry {
    policy: RedefinitionPolicy,
    core: IndexMap<String, Macro>,
    user: IndexMap<String, Macro>,
}

impl MacroRegistry {
    /// An empty registry.
    pub fn new(policy: RedefinitionPolicy) -> Self {
        Self {
            policy,
            core: IndexMap::new(),
            user: IndexMap::new(),
        }
    }

    /// A registry seeded with the core book.
    pub fn with_core_book(policy: RedefinitionPolicy) -> Self {
        let mut registry = Self::new(policy);
        for (ordinal, name) in CORE_SYSTEM_CALLS.iter().enumerate() {
            let body = format!("LDWA {},i\nSCALL $1,$2", ordinal);
            // A fresh registry never rejects.
            let _ = registry.register(Macro::new(*name, 2, body, MacroOrigin::Core));
        }
        registry
    }

    pub fn policy(&self) -> RedefinitionPolicy {
        self.policy
    }

    /// Register a macro under its origin.
    ///
    /// Returns whether the registry now holds this definition.
    pub fn register(&mut self, definition: Macro) -> Result<bool, Message> {
        let key = definition.name.to_ascii_uppercase();
        let policy = self.policy;
        let table = match definition.origin {
            MacroOrigin::Core => &mut self.core,
            MacroOrigin::User => &mut self.user,
        };

        if table.contains_key(&key) {
            match policy {
                RedefinitionPolicy::Replace => {}
                RedefinitionPolicy::KeepFirst => return Ok(false),
                RedefinitionPolicy::Reject => {
                    return Err(Message::fatal(
                        ErrorCode::MacroRedefinition,
                        format!("Macro @{} is already defined.", definition.name),
                    ))
                }
            }
        }
        table.insert(key, definition);
        Ok(true)
    }

    /// Look a macro up, preferring user definitions over core ones.
    pub fn find(&self, name: &str) -> Option<&Macro> {
        let key = name.to_ascii_uppercase();
        self.user.get(&key).or_else(|| self.core.get(&key))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Number of definitions across both origins.
    pub fn len(&self) -> usize {
        self.core.len() + self.user.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every definition of one origin, in registration order.
    pub fn macros(&self, origin: MacroOrigin) -> impl Iterator<Item = &Macro> {
        match origin {
            MacroOrigin::Core => self.core.values(),
            MacroOrigin::User => self.user.values(),
        }
    }

    /// Register every `*.pepm` file in `dir` as a user macro.
    ///
    /// Subdirectories are not searched. Files that fail to parse or that the
    /// policy rejects are skipped with a warning. Returns how many macros were
    /// registered.
    pub fn load_directory(&mut self, dir: &Path) -> Result<usize, AsmError> {
        let mut paths: Vec<_> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "pepm"))
            .collect();
        paths.sort();

        let mut loaded = 0;
        for path in paths {
            let text = fs::read_to_string(&path)?;
            let registered = Macro::parse_definition(&text, MacroOrigin::User)
                .and_then(|definition| self.register(definition));
            match registered {
                Ok(true) => loaded += 1,
                Ok(false) => log::warn!("{}: keeping earlier definition", path.display()),
                Err(message) => log::warn!("{}: {}", path.display(), message),
            }
        }
        log::info!("loaded {} macro(s) from {}", loaded, dir.display());
        Ok(loaded)
    }
}
