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

//! Symbol values.
//!
//! A [`Value`] is what a symbol currently denotes. Values that point at other
//! entries hold plain ids, so resolving them needs the [`SymbolStore`] that
//! owns the target.

use super::table::{EntryId, SymbolStore, TableId};
use super::{SymbolError, SymbolType};

/// Longest pointer chain followed before giving up.
pub const MAX_POINTER_HOPS: usize = 64;

/// A bit pattern together with the mask of bits that are meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct MaskedBits {
    /// Width of the value in bytes.
    pub byte_count: u16,
    pub bit_pattern: u64,
    pub mask: u64,
}

impl MaskedBits {
    /// The meaningful bits of the pattern.
    pub fn value(&self) -> u64 {
        self.bit_pattern & self.mask
    }
}

/// Mask covering `bytes` bytes.
pub fn mask_for(bytes: u16) -> u64 {
    if bytes >= 8 {
        u64::MAX
    } else {
        (1u64 << (8 * u32::from(bytes))) - 1
    }
}

/// Whether a location holds code or data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocationKind {
    Code,
    Object,
}

/// What a symbol denotes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Not yet defined.
    Empty { bytes: u16 },
    /// Defined, then retracted. Must never reach emitted output.
    Deleted,
    /// A fixed number that never relocates.
    Constant { bits: u64, mask: u64, bytes: u16 },
    /// An address, `base + offset`. Only `offset` changes after construction.
    Location {
        pointed_size: u16,
        pointer_size: u16,
        base: u64,
        offset: u64,
        kind: LocationKind,
    },
    /// Takes on the value of another entry in the same tree.
    InternalPointer { pointer_size: u16, target: EntryId },
    /// Takes on the value of an entry owned by a table in another tree.
    ExternalPointer {
        pointer_size: u16,
        table: TableId,
        target: EntryId,
    },
}

impl Default for Value {
    fn default() -> Self {
        Value::Empty { bytes: 0 }
    }
}

impl Value {
    /// A constant of `bytes` bytes; bits above the width are masked off on read.
    pub fn constant(bits: u64, bytes: u16) -> Self {
        Value::Constant {
            bits,
            mask: mask_for(bytes),
            bytes,
        }
    }

    /// A relocatable address with a zero offset.
    pub fn location(pointed_size: u16, pointer_size: u16, base: u64, kind: LocationKind) -> Self {
        Value::Location {
            pointed_size,
            pointer_size,
            base,
            offset: 0,
            kind,
        }
    }

    /// Size in bytes of the thing this value describes.
    pub fn size(&self) -> u32 {
        match self {
            Value::Empty { .. } | Value::Deleted => 0,
            Value::Constant { bytes, .. } => u32::from(*bytes),
            Value::Location { pointed_size, .. } => u32::from(*pointed_size),
            Value::InternalPointer { pointer_size, .. }
            | Value::ExternalPointer { pointer_size, .. } => u32::from(*pointer_size),
        }
    }

    pub fn symbol_type(&self) -> SymbolType {
        match self {
            Value::Empty { .. } => SymbolType::Empty,
            Value::Deleted => SymbolType::Deleted,
            Value::Constant { .. } => SymbolType::Constant,
            Value::Location {
                kind: LocationKind::Code,
                ..
            } => SymbolType::Code,
            Value::Location {
                kind: LocationKind::Object,
                ..
            } => SymbolType::Object,
            Value::InternalPointer { .. } | Value::ExternalPointer { .. } => SymbolType::PtrToSym,
        }
    }

    /// Only locations move when units are concatenated.
    pub fn is_relocatable(&self) -> bool {
        matches!(self, Value::Location { .. })
    }

    pub fn base(&self) -> Option<u64> {
        match self {
            Value::Location { base, .. } => Some(*base),
            _ => None,
        }
    }

    pub fn offset(&self) -> Option<u64> {
        match self {
            Value::Location { offset, .. } => Some(*offset),
            _ => None,
        }
    }

    /// Replace the offset of a location. Returns `false` for other variants.
    pub fn set_offset(&mut self, value: u64) -> bool {
        match self {
            Value::Location { offset, .. } => {
                *offset = value;
                true
            }
            _ => false,
        }
    }

    /// Add to the offset of a location. Returns `false` for other variants.
    pub fn add_to_offset(&mut self, value: u64) -> bool {
        match self {
            Value::Location { offset, .. } => {
                *offset = offset.wrapping_add(value);
                true
            }
            _ => false,
        }
    }

    /// The entry this value points at, if it is a pointer.
    pub fn pointee(&self) -> Option<EntryId> {
        match self {
            Value::InternalPointer { target, .. } | Value::ExternalPointer { target, .. } => {
                Some(*target)
            }
            _ => None,
        }
    }

    /// Resolve to concrete bits.
    ///
    /// Reading a deleted value, a pointer into a dropped table or an overlong
    /// pointer chain logs a warning and yields zero.
    pub fn resolve(&self, store: &SymbolStore) -> MaskedBits {
        match self.try_resolve(store) {
            Ok(bits) => bits,
            Err(err) => {
                log::warn!("reading symbol value: {}", err);
                MaskedBits::default()
            }
        }
    }

    /// Resolve to concrete bits, failing instead of substituting zero.
    ///
    /// Use this at emission boundaries where a deleted or dangling value is a
    /// hard error.
    pub fn try_resolve(&self, store: &SymbolStore) -> Result<MaskedBits, SymbolError> {
        let mut current = self;
        for _ in 0..MAX_POINTER_HOPS {
            match current {
                Value::Empty { bytes } => {
                    return Ok(MaskedBits {
                        byte_count: *bytes,
                        bit_pattern: 0,
                        mask: 0,
                    })
                }
                Value::Deleted => return Err(SymbolError::DeletedValue),
                Value::Constant { bits, mask, bytes } => {
                    return Ok(MaskedBits {
                        byte_count: *bytes,
                        bit_pattern: *bits,
                        mask: *mask,
                    })
                }
                Value::Location {
                    pointer_size,
                    base,
                    offset,
                    ..
                } => {
                    return Ok(MaskedBits {
                        byte_count: *pointer_size,
                        bit_pattern: base.wrapping_add(*offset),
                        mask: mask_for(*pointer_size),
                    })
                }
                Value::InternalPointer { target, .. } => {
                    current = &store.entry(*target).ok_or(SymbolError::StaleEntry(*target))?.value;
                }
                Value::ExternalPointer { table, target, .. } => {
                    if !store.is_live_table(*table) {
                        return Err(SymbolError::DroppedTable(*table));
                    }
                    current = &store.entry(*target).ok_or(SymbolError::StaleEntry(*target))?.value;
                }
            }
        }
        Err(SymbolError::PointerChainTooLong(MAX_POINTER_HOPS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_for_widths() {
        assert_eq!(mask_for(0), 0);
        assert_eq!(mask_for(1), 0xFF);
        assert_eq!(mask_for(2), 0xFFFF);
        assert_eq!(mask_for(8), u64::MAX);
    }

    #[test]
    fn test_empty_resolves_to_zero_with_width() {
        let store = SymbolStore::new();
        let bits = Value::Empty { bytes: 2 }.resolve(&store);
        assert_eq!(bits.byte_count, 2);
        assert_eq!(bits.value(), 0);
    }

    #[test]
    fn test_constant_is_masked() {
        let store = SymbolStore::new();
        let bits = Value::constant(0x1_2345, 2).resolve(&store);
        assert_eq!(bits.value(), 0x2345);
        assert!(!Value::constant(1, 1).is_relocatable());
    }

    #[test]
    fn test_location_wraps_to_pointer_size() {
        let store = SymbolStore::new();
        let mut loc = Value::location(1, 2, 0xFFFF, LocationKind::Code);
        assert!(loc.set_offset(2));
        let bits = loc.resolve(&store);
        assert_eq!(bits.value(), 0x0001);
        assert_eq!(bits.byte_count, 2);
        assert_eq!(loc.size(), 1);
        assert_eq!(loc.symbol_type(), SymbolType::Code);
    }

    #[test]
    fn test_deleted_fails_strict_resolution() {
        let store = SymbolStore::new();
        assert_eq!(
            Value::Deleted.try_resolve(&store),
            Err(SymbolError::DeletedValue)
        );
        assert_eq!(Value::Deleted.resolve(&store).value(), 0);
    }

    #[test]
    fn test_internal_pointer_follows_target() {
        let mut store = SymbolStore::new();
        let root = store.add_root(2);
        let target = store.define(root, "target").unwrap();
        store.set_value(target, Value::constant(0xBEEF, 2)).unwrap();

        let ptr = Value::InternalPointer {
            pointer_size: 2,
            target,
        };
        assert_eq!(ptr.resolve(&store).value(), 0xBEEF);
        assert_eq!(ptr.symbol_type(), SymbolType::PtrToSym);
        assert_eq!(ptr.size(), 2);
    }

    #[test]
    fn test_external_pointer_into_dropped_table_is_zero() {
        let mut store = SymbolStore::new();
        let os = store.add_root(2);
        let target = store.define(os, "loader").unwrap();
        store.set_value(target, Value::constant(0xFC17, 2)).unwrap();

        let ptr = Value::ExternalPointer {
            pointer_size: 2,
            table: os,
            target,
        };
        assert_eq!(ptr.resolve(&store).value(), 0xFC17);

        store.drop_tree(os).unwrap();
        assert_eq!(ptr.try_resolve(&store), Err(SymbolError::DroppedTable(os)));
        assert_eq!(ptr.resolve(&store).value(), 0);
    }

    #[test]
    fn test_self_referential_pointer_terminates() {
        let mut store = SymbolStore::new();
        let root = store.add_root(2);
        let a = store.reference(root, "a").unwrap();
        store
            .set_value(
                a,
                Value::InternalPointer {
                    pointer_size: 2,
                    target: a,
                },
            )
            .unwrap();

        let value = store.entry(a).unwrap().value.clone();
        assert_eq!(
            value.try_resolve(&store),
            Err(SymbolError::PointerChainTooLong(MAX_POINTER_HOPS))
        );
    }
}
