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

//! Section grouping.
//!
//! Moves the flat list of top-level lines into section nodes. Every unit
//! starts in `.text` (rwx). `.SECTION "name"[, "flags"]` opens a new section;
//! `.ORG` after something addressable re-opens the current section under the
//! same name and flags. Sections flagged `z` are kept for sizing but hidden
//! from object code, down to every nested node.

use crate::ast::{Ast, Attributes, Directive, NodeId, NodeKind, SectionFlags, SectionInfo};
use crate::error::{ErrorCode, Message};
use crate::macros::AddressablePredicate;

use super::predicates::is_directive;

/// Group the children of `root` into sections.
///
/// Returns whether every `.SECTION` line was valid. Invalid lines keep their
/// error and stay in the section that was open.
pub fn group_sections(ast: &mut Ast, root: NodeId, is_addressable: AddressablePredicate) -> bool {
    let lines = ast.take_children(root);
    let mut ok = true;

    let mut current = new_section(ast, root, SectionInfo::default());
    let mut has_addressable = false;

    for line in lines {
        if is_directive(&ast[line], Directive::Section) {
            match section_info(ast, line) {
                Ok(info) => {
                    current = new_section(ast, root, info);
                    has_addressable = false;
                }
                Err(message) => {
                    ast[line].attrs.errors.push(message);
                    ok = false;
                }
            }
        } else if is_directive(&ast[line], Directive::Org) && has_addressable {
            let info = ast[current].attrs.section.clone().unwrap_or_default();
            current = new_section(ast, root, info);
            has_addressable = false;
        }

        has_addressable |= ast.preorder(line).into_iter().any(|id| is_addressable(&ast[id]));
        ast.append_child(current, line);
    }

    hide_suppressed(ast, root);
    ok
}

fn new_section(ast: &mut Ast, root: NodeId, info: SectionInfo) -> NodeId {
    let section = ast.add(
        NodeKind::Structural,
        Attributes {
            section: Some(info),
            ..Attributes::default()
        },
    );
    ast.append_child(root, section);
    section
}

fn section_info(ast: &Ast, line: NodeId) -> Result<SectionInfo, Message> {
    let args = &ast[line].attrs.arguments;
    let text = |index: usize| {
        args[index].as_text().ok_or_else(|| {
            Message::fatal(
                ErrorCode::InvalidSectionArguments,
                format!(".SECTION expects string arguments, found {}.", args[index]),
            )
        })
    };

    match args.len() {
        1 => Ok(SectionInfo {
            name: text(0)?,
            ..SectionInfo::default()
        }),
        2 => Ok(SectionInfo {
            name: text(0)?,
            flags: SectionFlags::from_letters(&text(1)?),
        }),
        n => Err(Message::fatal(
            ErrorCode::InvalidSectionArguments,
            format!(".SECTION expects a name and optional flags, found {} argument(s).", n),
        )),
    }
}

/// Mark everything inside a `z` section as absent from object code.
fn hide_suppressed(ast: &mut Ast, root: NodeId) {
    let sections = ast.children(root).to_vec();
    for section in sections {
        let suppressed = ast[section]
            .attrs
            .section
            .as_ref()
            .is_some_and(|info| info.flags.contains(SectionFlags::Z));
        if suppressed {
            for id in ast.preorder(section) {
                ast[id].attrs.hide.object = true;
            }
        }
    }
}
