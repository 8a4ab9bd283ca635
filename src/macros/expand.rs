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

//! Macro expansion pass.
//!
//! Rewrites every `@NAME args` node into its body: arguments are substituted
//! positionally, the text is re-parsed into a fresh child symbol table and the
//! result becomes the invocation's children, framed by start and end comments.
//!
//! An invocation is identified by its name and argument text. While one is
//! being expanded it sits in an in-flight set, so a body that reaches the
//! exact same invocation again is reported instead of recursing forever.
//! Calls to the same macro with different arguments are fine.
//!
//! Successful expansions are cached per call-site scope. Repeating an
//! invocation clones the cached nodes and forks the cached symbol table, so
//! every expansion owns its labels.

use std::collections::{HashMap, HashSet};
use std::fmt;

use super::registry::MacroRegistry;
use crate::ast::{Argument, ArgumentKind, Ast, Attributes, CommentIndent, Directive, Node, NodeId, NodeKind, SourceLocation};
use crate::error::{ErrorCode, Message};
use crate::format::format_macro_call;
use crate::parser::{ParseTarget, SourceParser};
use crate::symbol::{fork, SymbolStore, TableId};

/// Indentation of the start and end comments.
const COMMENT_INDENT: usize = 8;

/// Predicate telling which nodes occupy memory.
pub type AddressablePredicate = fn(&Node) -> bool;

/// A macro name plus its arguments as written.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MacroInvocation {
    pub name: String,
    pub args: Vec<String>,
}

impl MacroInvocation {
    pub fn new(name: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }
}

impl fmt::Display for MacroInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.name)?;
        if !self.args.is_empty() {
            write!(f, " {}", self.args.join(","))?;
        }
        Ok(())
    }
}

/// Replace `$1`..`$n` in `body` with the matching argument.
///
/// Higher indices go first so that `$1` never eats the prefix of `$10`.
pub fn substitute(body: &str, args: &[String]) -> String {
    let mut text = body.to_string();
    for (index, arg) in args.iter().enumerate().rev() {
        text = text.replace(&format!("${}", index + 1), arg);
    }
    text
}

struct CachedExpansion {
    /// Symbol table the first expansion was parsed into.
    table: TableId,
    /// Detached copies of the body, taken before decoration.
    nodes: Vec<NodeId>,
}

/// Expands macro invocations against a registry.
pub struct MacroExpander<'a> {
    registry: &'a MacroRegistry,
    parser: &'a dyn SourceParser,
    is_addressable: AddressablePredicate,
    in_flight: HashSet<MacroInvocation>,
    cache: HashMap<(MacroInvocation, TableId), CachedExpansion>,
}

impl<'a> MacroExpander<'a> {
    pub fn new(
        registry: &'a MacroRegistry,
        parser: &'a dyn SourceParser,
        is_addressable: AddressablePredicate,
    ) -> Self {
        Self {
            registry,
            parser,
            is_addressable,
            in_flight: HashSet::new(),
            cache: HashMap::new(),
        }
    }

    /// Number of invocations currently being expanded.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Expand every macro invocation directly below `parent`.
    ///
    /// Returns whether all of them expanded cleanly.
    pub fn expand_all(&mut self, ast: &mut Ast, store: &mut SymbolStore, parent: NodeId) -> bool {
        let invocations: Vec<NodeId> = ast
            .children(parent)
            .iter()
            .copied()
            .filter(|&child| ast[child].kind == NodeKind::MacroInvoke)
            .collect();

        let mut ok = true;
        for node in invocations {
            ok &= self.expand(ast, store, node);
        }
        ok
    }

    /// Expand one invocation node in place.
    ///
    /// Failures are recorded on the node. Returns whether the node and every
    /// invocation nested in its body expanded cleanly.
    pub fn expand(&mut self, ast: &mut Ast, store: &mut SymbolStore, node: NodeId) -> bool {
        let Some(name) = ast[node].attrs.macro_name.clone() else {
            push_error(
                ast,
                node,
                Message::fatal(ErrorCode::ExpectedMacro, "Expected a macro invocation."),
            );
            return false;
        };
        let args = ast[node].attrs.arguments.iter().map(|a| a.text.clone()).collect();
        let invocation = MacroInvocation::new(name, args);

        if !self.in_flight.insert(invocation.clone()) {
            push_error(
                ast,
                node,
                Message::fatal(
                    ErrorCode::MacroRecursion,
                    format!("Macro loop: {} is already being expanded.", invocation),
                ),
            );
            return false;
        }

        let expanded = self.expand_invocation(ast, store, node, &invocation);
        // Popped on failure too, so a later sibling with the same invocation
        // reports its own error instead of a spurious macro loop.
        self.in_flight.remove(&invocation);

        match expanded {
            Ok(nested_ok) => {
                self.decorate(ast, node);
                nested_ok
            }
            Err(messages) => {
                for message in messages {
                    push_error(ast, node, message);
                }
                false
            }
        }
    }

    fn expand_invocation(
        &mut self,
        ast: &mut Ast,
        store: &mut SymbolStore,
        node: NodeId,
        invocation: &MacroInvocation,
    ) -> Result<bool, Vec<Message>> {
        let registry = self.registry;
        let definition = registry.find(&invocation.name).ok_or_else(|| {
            vec![Message::fatal(
                ErrorCode::MacroNotFound,
                format!("No macro named @{}.", invocation.name),
            )]
        })?;
        if definition.arg_count != invocation.args.len() {
            return Err(vec![Message::fatal(
                ErrorCode::MacroArityMismatch,
                format!(
                    "@{} expects {} argument(s), found {}.",
                    invocation.name,
                    definition.arg_count,
                    invocation.args.len()
                ),
            )]);
        }

        let scope = ast.scope_of(node).ok_or_else(|| {
            vec![Message::fatal(
                ErrorCode::SymbolTable,
                format!("{} is outside of any symbol scope.", invocation),
            )]
        })?;
        let location = ast[node].attrs.location;

        let key = (invocation.clone(), scope);
        if let Some(cached) = self.cache.get(&key) {
            let (template, nodes) = (cached.table, cached.nodes.clone());
            self.instantiate(ast, store, node, scope, template, &nodes)
                .map_err(|message| vec![message])?;
            return Ok(true);
        }

        let text = substitute(&definition.body, &invocation.args);
        let table = store.add_child(scope).map_err(|e| vec![e.into()])?;
        let target = ParseTarget {
            ast: &mut *ast,
            store: &mut *store,
            scope: table,
        };
        let result = self.parser.parse(&text, target);

        if !result.is_ok() {
            if let Err(e) = store.drop_tree(table) {
                log::warn!("could not release scope of {}: {}", invocation, e);
            }
            return Err(result
                .errors
                .into_iter()
                .map(|(line, message)| {
                    Message::fatal(
                        ErrorCode::MacroBodyParseError,
                        format!("In {} line {}: {}", invocation, line + 1, message.message),
                    )
                })
                .collect());
        }

        ast[node].attrs.scope = Some(table);
        for &child in &result.nodes {
            for id in ast.preorder(child) {
                ast[id].attrs.location = location;
            }
            ast.append_child(node, child);
        }
        log::debug!("expanded {} into {} line(s)", invocation, result.nodes.len());

        let mut nested_ok = true;
        for &child in &result.nodes {
            if ast[child].kind == NodeKind::MacroInvoke {
                nested_ok &= self.expand(ast, store, child);
            }
        }

        if nested_ok {
            let nodes = result
                .nodes
                .iter()
                .map(|&child| ast.clone_subtree(child, &mut |_: &mut Attributes| {}))
                .collect();
            self.cache.insert(key, CachedExpansion { table, nodes });
        }
        Ok(nested_ok)
    }

    /// Re-create a cached expansion below `node` with its own symbols.
    fn instantiate(
        &self,
        ast: &mut Ast,
        store: &mut SymbolStore,
        node: NodeId,
        scope: TableId,
        template: TableId,
        nodes: &[NodeId],
    ) -> Result<(), Message> {
        let (table, map) = fork(store, template)?;
        store.attach(scope, table)?;
        let location = ast[node].attrs.location;

        let mut remap = |attrs: &mut Attributes| {
            if let Some(decl) = attrs.symbol.as_mut() {
                if let Some(entry) = map.entry(decl.entry) {
                    decl.entry = entry;
                }
            }
            for arg in &mut attrs.arguments {
                if let ArgumentKind::Symbol(entry) = &mut arg.kind {
                    if let Some(copy) = map.entry(*entry) {
                        *entry = copy;
                    }
                }
            }
            if let Some(scope) = attrs.scope.as_mut() {
                if let Some(copy) = map.table(*scope) {
                    *scope = copy;
                }
            }
            attrs.location = location;
        };

        ast[node].attrs.scope = Some(table);
        for &template_node in nodes {
            let copy = ast.clone_subtree(template_node, &mut remap);
            ast.append_child(node, copy);
        }
        log::debug!("reused cached expansion with forked scope {:?}", table);
        Ok(())
    }

    /// Frame the expansion with comments and move the call's symbol inside.
    fn decorate(&self, ast: &mut Ast, node: NodeId) {
        let attrs = &ast[node].attrs;
        let name = attrs.macro_name.clone().unwrap_or_default();
        let args: Vec<String> = attrs.arguments.iter().map(|a| a.text.clone()).collect();
        let location = attrs.location;
        let mut children = ast.take_children(node);

        if let Some(symbol) = ast[node].attrs.symbol.take() {
            let target = children
                .iter()
                .flat_map(|&child| ast.preorder(child))
                .find(|&id| (self.is_addressable)(&ast[id]));
            match target {
                Some(target) if ast[target].attrs.symbol.is_none() => {
                    ast[target].attrs.symbol = Some(symbol);
                }
                _ => {
                    let placeholder = ast.add(
                        NodeKind::Directive,
                        Attributes {
                            symbol: Some(symbol),
                            directive: Some(Directive::Block),
                            arguments: vec![Argument::decimal(0)],
                            location,
                            ..Attributes::default()
                        },
                    );
                    children.insert(0, placeholder);
                }
            }
        }

        let start = macro_comment(ast, format_macro_call(&name, &args), location);
        let end = macro_comment(ast, format!("End @{}", name.to_ascii_uppercase()), location);
        children.insert(0, start);
        children.push(end);
        for child in children {
            ast.append_child(node, child);
        }
    }
}

fn macro_comment(ast: &mut Ast, text: String, location: Option<SourceLocation>) -> NodeId {
    ast.add(
        NodeKind::Comment,
        Attributes {
            comment: Some(format!("{}{}", " ".repeat(COMMENT_INDENT), text)),
            comment_indent: CommentIndent::Left,
            is_macro_comment: true,
            location,
            ..Attributes::default()
        },
    )
}

fn push_error(ast: &mut Ast, node: NodeId, message: Message) {
    ast[node].attrs.errors.push(message);
}
