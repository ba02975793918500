//! Virtual address space shared by the generator and the virtual machine.
//!
//! Every (segment, type) pair owns one contiguous block of
//! [`RANGE_CAPACITY`] addresses. Blocks are laid out segment-major starting at
//! [`BASE_ADDRESS`], so an address can always be decoded back to the pair that
//! produced it without any side table.

use hashbrown::HashMap;
use strum::{EnumIter, IntoEnumIterator};
use thiserror::Error;

use super::primitive::ValueType;
use crate::index::simple_index;

pub const BASE_ADDRESS: u32 = 1000;
pub const RANGE_CAPACITY: u32 = 1000;

const TYPES_PER_SEGMENT: u32 = 4;

/// Lifetime class of a storage cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIter)]
pub enum Segment {
    Global,
    Local,
    Temporary,
    Constant,
}

impl core::fmt::Display for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Segment::Global => write!(f, "global"),
            Segment::Local => write!(f, "local"),
            Segment::Temporary => write!(f, "temporary"),
            Segment::Constant => write!(f, "constant"),
        }
    }
}

impl Segment {
    fn ordinal(self) -> u32 {
        match self {
            Segment::Global => 0,
            Segment::Local => 1,
            Segment::Temporary => 2,
            Segment::Constant => 3,
        }
    }

    /// Local and temporary cells belong to a single function invocation
    pub fn is_per_activation(self) -> bool {
        matches!(self, Segment::Local | Segment::Temporary)
    }
}

simple_index! {
    /// Identifies a single storage cell in the virtual address space
    pub struct Address;
}

impl Address {
    /// First address of the range reserved for `(segment, ty)`
    pub fn range_start(segment: Segment, ty: ValueType) -> Self {
        let block = segment.ordinal() * TYPES_PER_SEGMENT + ty.ordinal();
        Self(BASE_ADDRESS + block * RANGE_CAPACITY)
    }

    /// Recovers the segment and type an address was allocated for. Returns
    /// `None` for addresses outside of every range.
    pub fn decode(self) -> Option<(Segment, ValueType)> {
        let offset = self.0.checked_sub(BASE_ADDRESS)?;
        let block = offset / RANGE_CAPACITY;

        let segment = Segment::iter().find(|s| s.ordinal() == block / TYPES_PER_SEGMENT)?;
        let ty = ValueType::iter().find(|t| t.ordinal() == block % TYPES_PER_SEGMENT)?;

        Some((segment, ty))
    }

    pub fn segment(self) -> Option<Segment> {
        self.decode().map(|(segment, _)| segment)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("address space exhausted for {ty} values in the {segment} segment")]
pub struct AddressSpaceExhausted {
    pub segment: Segment,
    pub ty: ValueType,
}

/// Hands out addresses from every (segment, type) range, keeping one cursor
/// per range
#[derive(Debug, Clone)]
pub struct AddressAllocator {
    cursors: HashMap<(Segment, ValueType), u32>,
}

impl Default for AddressAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl AddressAllocator {
    pub fn new() -> Self {
        let cursors = Segment::iter()
            .flat_map(|segment| ValueType::iter().map(move |ty| ((segment, ty), 0)))
            .collect();

        Self { cursors }
    }

    pub fn allocate(
        &mut self,
        segment: Segment,
        ty: ValueType,
    ) -> Result<Address, AddressSpaceExhausted> {
        let cursor = self.cursors.entry((segment, ty)).or_insert(0);

        if *cursor >= RANGE_CAPACITY {
            return Err(AddressSpaceExhausted { segment, ty });
        }

        let address = Address(Address::range_start(segment, ty).0 + *cursor);
        *cursor += 1;

        Ok(address)
    }

    /// Rewinds every cursor of a per-activation segment so the next function
    /// reuses the same layout. Global and constant ranges are never rewound.
    pub fn reset(&mut self, segment: Segment) {
        if !segment.is_per_activation() {
            log::warn!("refusing to reset the {segment} segment");
            return;
        }

        for ty in ValueType::iter() {
            self.cursors.insert((segment, ty), 0);
        }
    }

    /// Number of cells handed out so far for a range
    #[cfg(test)]
    pub fn used(&self, segment: Segment, ty: ValueType) -> u32 {
        self.cursors.get(&(segment, ty)).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use hashbrown::HashSet;

    use super::*;

    #[test]
    fn every_allocated_address_decodes_to_its_range() {
        let mut allocator = AddressAllocator::new();
        let mut seen = HashSet::new();

        for segment in Segment::iter() {
            for ty in ValueType::iter() {
                for _ in 0..3 {
                    let address = allocator.allocate(segment, ty).unwrap();
                    assert_eq!(address.decode(), Some((segment, ty)));
                    assert!(seen.insert(address), "address {address} handed out twice");
                }
            }
        }
    }

    #[test]
    fn range_boundaries_decode_disjointly() {
        for segment in Segment::iter() {
            for ty in ValueType::iter() {
                let start = Address::range_start(segment, ty);
                let last = Address(start.0 + RANGE_CAPACITY - 1);

                assert_eq!(start.decode(), Some((segment, ty)));
                assert_eq!(last.decode(), Some((segment, ty)));
            }
        }

        assert_eq!(Address(999).decode(), None);
        assert_eq!(Address(17000).decode(), None);
        assert_eq!(
            Address(1000).decode(),
            Some((Segment::Global, ValueType::Integer))
        );
        assert_eq!(
            Address(14500).decode(),
            Some((Segment::Constant, ValueType::Float))
        );
    }

    #[test]
    fn exhausting_a_range_fails_without_touching_others() {
        let mut allocator = AddressAllocator::new();

        for _ in 0..RANGE_CAPACITY {
            allocator
                .allocate(Segment::Temporary, ValueType::Boolean)
                .unwrap();
        }

        assert_eq!(
            allocator.allocate(Segment::Temporary, ValueType::Boolean),
            Err(AddressSpaceExhausted {
                segment: Segment::Temporary,
                ty: ValueType::Boolean,
            })
        );

        assert_eq!(
            allocator.allocate(Segment::Temporary, ValueType::String),
            Ok(Address::range_start(Segment::Temporary, ValueType::String))
        );
    }

    #[test]
    fn reset_rewinds_only_per_activation_segments() {
        let mut allocator = AddressAllocator::new();

        let global = allocator.allocate(Segment::Global, ValueType::Integer).unwrap();
        let local = allocator.allocate(Segment::Local, ValueType::Integer).unwrap();
        allocator.allocate(Segment::Temporary, ValueType::Float).unwrap();

        allocator.reset(Segment::Local);
        allocator.reset(Segment::Temporary);
        allocator.reset(Segment::Global);

        assert_eq!(allocator.allocate(Segment::Local, ValueType::Integer), Ok(local));
        assert_eq!(allocator.used(Segment::Temporary, ValueType::Float), 0);
        assert_ne!(
            allocator.allocate(Segment::Global, ValueType::Integer),
            Ok(global)
        );
    }
}
