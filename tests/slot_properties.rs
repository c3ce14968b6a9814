//! Property tests for bed-slot assignment
//!
//! The slot rules are a fixed lookup table disguised as nested
//! conditionals, so the properties are checked over the whole input
//! space: every gender sequence of length 1 to 4.

use changeling::core::types::Gender;
use changeling::registry::slots::{slot_for, BedSlot};
use proptest::prelude::*;

fn gender() -> impl Strategy<Value = Gender> {
    prop_oneof![Just(Gender::Male), Just(Gender::Female)]
}

proptest! {
    #[test]
    fn assignment_is_deterministic(genders in prop::collection::vec(gender(), 1..=4)) {
        for index in 1..=genders.len() {
            prop_assert_eq!(slot_for(index, &genders), slot_for(index, &genders));
        }
    }

    #[test]
    fn siblings_never_share_a_slot(genders in prop::collection::vec(gender(), 1..=4)) {
        let slots: Vec<BedSlot> = (1..=genders.len())
            .filter_map(|index| slot_for(index, &genders))
            .collect();

        // Every sibling within the supported count gets a slot
        prop_assert_eq!(slots.len(), genders.len());

        for i in 0..slots.len() {
            for j in (i + 1)..slots.len() {
                prop_assert_ne!(slots[i], slots[j], "siblings {} and {} collide", i, j);
            }
        }
    }

    #[test]
    fn primary_slots_are_unique(genders in prop::collection::vec(gender(), 1..=4)) {
        let primaries: Vec<BedSlot> = (1..=genders.len())
            .filter_map(|index| slot_for(index, &genders))
            .filter(|slot| slot.is_primary())
            .collect();

        let unique: std::collections::HashSet<BedSlot> = primaries.iter().copied().collect();
        prop_assert_eq!(unique.len(), primaries.len());
    }

    #[test]
    fn fifth_and_later_siblings_are_unassigned(
        genders in prop::collection::vec(gender(), 5..=8),
        index in 5usize..=8,
    ) {
        prop_assume!(index <= genders.len());
        prop_assert_eq!(slot_for(index, &genders), None);
    }

    #[test]
    fn insufficient_sibling_data_is_unassigned(
        genders in prop::collection::vec(gender(), 1..=3),
        index in 1usize..=4,
    ) {
        prop_assume!(index > genders.len());
        prop_assert_eq!(slot_for(index, &genders), None);
    }
}
