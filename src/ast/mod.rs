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

//! Abstract Syntax Tree (AST) definitions for the assembler.
//!
//! A unit is one [`Ast`]: an arena of [`Node`]s rooted at a structural node.
//! Nodes are never freed; moving a node detaches it from its old parent.

mod attr;
mod value;

pub use attr::*;
pub use value::*;

use std::ops::{Index, IndexMut};

/// Handle to a node inside an [`Ast`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// The shape of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// A machine instruction.
    Instruction,
    /// A dot-command.
    Directive,
    /// A `@NAME args` macro call. Its expansion becomes its children.
    MacroInvoke,
    /// A comment-only line.
    Comment,
    /// An empty line.
    Blank,
    /// Grouping nodes: unit roots and sections.
    Structural,
}

/// A single AST node.
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    pub attrs: Attributes,
}

impl Node {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// 0-indexed source line, if known.
    pub fn line(&self) -> Option<usize> {
        self.attrs.location.map(|loc| loc.line)
    }
}

/// One translation unit's tree.
#[derive(Debug, Clone)]
pub struct Ast {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Ast {
    /// Create a tree holding only a structural root.
    pub fn new() -> Self {
        let mut ast = Self {
            nodes: Vec::new(),
            root: NodeId(0),
        };
        ast.root = ast.add(NodeKind::Structural, Attributes::default());
        ast
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes ever created.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Create a detached node.
    pub fn add(&mut self, kind: NodeKind, attrs: Attributes) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind,
            parent: None,
            children: Vec::new(),
            attrs,
        });
        id
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self[id].children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self[id].parent
    }

    /// Remove `child` from its parent's child list.
    pub fn detach(&mut self, child: NodeId) {
        if let Some(parent) = self[child].parent.take() {
            self[parent].children.retain(|&c| c != child);
        }
    }

    /// Move `child` to the end of `parent`'s children.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self[child].parent = Some(parent);
        self[parent].children.push(child);
    }

    /// Move `child` to position `index` among `parent`'s children.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.detach(child);
        self[child].parent = Some(parent);
        let children = &mut self[parent].children;
        let index = index.min(children.len());
        children.insert(index, child);
    }

    /// Detach and return all children of `parent`.
    pub fn take_children(&mut self, parent: NodeId) -> Vec<NodeId> {
        let children = std::mem::take(&mut self[parent].children);
        for &child in &children {
            self[child].parent = None;
        }
        children
    }

    /// `start` and all its descendants, parents before children.
    pub fn preorder(&self, start: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self[id].children.iter().rev());
        }
        order
    }

    /// Copy the subtree at `id` into new, detached nodes.
    ///
    /// `edit` sees every copied node's attributes before it is stored, which
    /// lets callers rewrite symbol ids for the copy.
    pub fn clone_subtree(
        &mut self,
        id: NodeId,
        edit: &mut dyn FnMut(&mut Attributes),
    ) -> NodeId {
        let kind = self[id].kind;
        let mut attrs = self[id].attrs.clone();
        edit(&mut attrs);
        let copy = self.add(kind, attrs);
        let children = self[id].children.clone();
        for child in children {
            let child_copy = self.clone_subtree(child, edit);
            self.append_child(copy, child_copy);
        }
        copy
    }

    /// Nearest enclosing symbol scope of `id`, checking `id` itself first.
    pub fn scope_of(&self, id: NodeId) -> Option<crate::symbol::TableId> {
        let mut current = Some(id);
        while let Some(node) = current {
            if let Some(scope) = self[node].attrs.scope {
                return Some(scope);
            }
            current = self[node].parent;
        }
        None
    }
}

impl Default for Ast {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<NodeId> for Ast {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }
}

impl IndexMut<NodeId> for Ast {
    fn index_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(ast: &mut Ast, line: usize) -> NodeId {
        ast.add(
            NodeKind::Blank,
            Attributes {
                location: Some(SourceLocation { line }),
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_append_reparents() {
        let mut ast = Ast::new();
        let a = ast.add(NodeKind::Structural, Attributes::default());
        let b = ast.add(NodeKind::Structural, Attributes::default());
        let x = leaf(&mut ast, 0);

        ast.append_child(a, x);
        ast.append_child(b, x);
        assert!(ast.children(a).is_empty());
        assert_eq!(ast.children(b), &[x]);
        assert_eq!(ast.parent(x), Some(b));
    }

    #[test]
    fn test_insert_and_take_children() {
        let mut ast = Ast::new();
        let root = ast.root();
        let first = leaf(&mut ast, 0);
        let second = leaf(&mut ast, 1);
        ast.append_child(root, second);
        ast.insert_child(root, 0, first);
        assert_eq!(ast.children(root), &[first, second]);

        let taken = ast.take_children(root);
        assert_eq!(taken, vec![first, second]);
        assert_eq!(ast.parent(first), None);
        assert!(ast.children(root).is_empty());
    }

    #[test]
    fn test_preorder_and_clone() {
        let mut ast = Ast::new();
        let root = ast.root();
        let mid = ast.add(NodeKind::MacroInvoke, Attributes::default());
        let inner = leaf(&mut ast, 4);
        ast.append_child(root, mid);
        ast.append_child(mid, inner);

        assert_eq!(ast.preorder(root), vec![root, mid, inner]);

        let copy = ast.clone_subtree(mid, &mut |attrs| {
            if let Some(loc) = attrs.location.as_mut() {
                loc.line += 10;
            }
        });
        assert_eq!(ast.parent(copy), None);
        let copied_inner = ast.children(copy)[0];
        assert_eq!(ast[copied_inner].line(), Some(14));
        assert_eq!(ast[inner].line(), Some(4));
    }
}
