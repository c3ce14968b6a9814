//! Deterministic bed-slot assignment
//!
//! The home location has two shareable bed pairs, four sleeping spots in
//! total. Which spot a minor gets depends only on its birth index and the
//! genders of the first three siblings: siblings try to share a bed with a
//! same-gender sibling first, and the fourth fills whatever spot is left.
//! Slots are recomputed from the current sibling list every time they are
//! needed, so a corrected sibling list heals the assignment on its own.

use crate::core::types::{Gender, TilePoint};

/// The four canonical sleeping spots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BedSlot {
    /// Right side of the left bed
    PrimaryA,
    /// Left side of the left bed
    SharedA,
    /// Right side of the right bed
    PrimaryB,
    /// Left side of the right bed
    SharedB,
}

impl BedSlot {
    pub fn point(&self) -> TilePoint {
        match self {
            BedSlot::PrimaryA => TilePoint::new(23, 5),
            BedSlot::SharedA => TilePoint::new(22, 5),
            BedSlot::PrimaryB => TilePoint::new(27, 5),
            BedSlot::SharedB => TilePoint::new(26, 5),
        }
    }

    pub fn is_primary(&self) -> bool {
        matches!(self, BedSlot::PrimaryA | BedSlot::PrimaryB)
    }
}

/// Assign a sleeping spot to the sibling at `birth_index` (1-based).
///
/// `siblings` lists the genders of every sibling observed so far, in birth
/// order. Returns None past the fourth sibling or when the list does not
/// reach the requested index.
pub fn slot_for(birth_index: usize, siblings: &[Gender]) -> Option<BedSlot> {
    if birth_index == 0 || birth_index > 4 || siblings.len() < birth_index {
        return None;
    }

    // The first sibling always holds primary A
    if birth_index == 1 {
        return Some(BedSlot::PrimaryA);
    }

    // With exactly two siblings known, each keeps a bed to itself
    if siblings.len() == 2 {
        return Some(BedSlot::PrimaryB);
    }

    // Three or more siblings: sharing kicks in
    if siblings[0] == siblings[1] {
        // Siblings 1 and 2 share the left bed; 3 and 4 take the right
        return Some(match birth_index {
            2 => BedSlot::SharedA,
            3 => BedSlot::PrimaryB,
            _ => BedSlot::SharedB,
        });
    }

    // Siblings 1 and 2 cannot share
    if birth_index == 2 {
        return Some(BedSlot::PrimaryB);
    }

    if siblings[1] == siblings[2] {
        // Siblings 2 and 3 share the right bed, 4 joins sibling 1
        Some(match birth_index {
            3 => BedSlot::SharedB,
            _ => BedSlot::SharedA,
        })
    } else {
        // Nobody shares by gender: 3 joins sibling 1, 4 joins sibling 2
        Some(match birth_index {
            3 => BedSlot::SharedA,
            _ => BedSlot::SharedB,
        })
    }
}
