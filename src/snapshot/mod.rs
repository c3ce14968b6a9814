//! Read-through snapshot cache
//!
//! Once per logical frame the cache pulls the identity registry, builds an
//! immutable set of per-minor fact records and compares it member-wise to
//! the previous frame's set. The external templating consumer only ever
//! reads the stored snapshot; a missing or unresolved value reads as "not
//! ready", which the consumer must treat as "suppress dependent output".

pub mod facts;

use crate::core::calendar::SimDate;
use crate::registry::IdentityRegistry;

/// One minor's exposed facts at a single frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactRecord {
    pub name: String,
    pub guardian: String,
    pub gender: String,
    pub days_old: u32,
    /// Derived as today minus age; None until the calendar date is known
    pub birthday: Option<String>,
    /// "<location> <x> <y>", None while no slot is assignable
    pub bed: Option<String>,
}

#[derive(Debug, Default)]
pub struct SnapshotCache {
    frame: Option<u64>,
    today: Option<SimDate>,
    home_name: Option<String>,
    records: Vec<FactRecord>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refresh the calendar context used for derived facts. Called at
    /// each day start.
    pub fn set_context(&mut self, today: SimDate, home_name: String) {
        self.today = Some(today);
        self.home_name = Some(home_name);
    }

    /// Rebuild the snapshot for `frame` and report whether anything
    /// changed. Calling again with the same frame id is a no-op that
    /// returns false.
    pub fn update(&mut self, registry: &IdentityRegistry, frame: u64) -> bool {
        if self.frame == Some(frame) {
            return false;
        }
        self.frame = Some(frame);

        let fresh = self.build(registry);
        let changed = fresh != self.records;
        self.records = fresh;
        changed
    }

    fn build(&self, registry: &IdentityRegistry) -> Vec<FactRecord> {
        registry
            .known_minors()
            .map(|entry| {
                let bed = registry.bed_slot_of(&entry.name).and_then(|slot| {
                    self.home_name.as_ref().map(|home| {
                        let point = slot.point();
                        format!("{} {} {}", home, point.x, point.y)
                    })
                });
                FactRecord {
                    name: entry.name.clone(),
                    guardian: entry.guardian.clone(),
                    gender: entry.gender.as_str().to_string(),
                    days_old: entry.days_old,
                    birthday: self.today.map(|today| today.minus_days(entry.days_old).label()),
                    bed,
                }
            })
            .collect()
    }

    /// True once any frame has been computed
    pub fn has_updated(&self) -> bool {
        self.frame.is_some()
    }

    /// Count of known minors as of the last update
    pub fn total(&self) -> usize {
        self.records.len()
    }

    pub fn record(&self, index: usize) -> Option<&FactRecord> {
        self.records.get(index)
    }

    /// Whether the slot at `index` has a ready record
    pub fn is_ready(&self, index: usize) -> bool {
        self.records
            .get(index)
            .map(|record| !record.name.is_empty())
            .unwrap_or(false)
    }

    pub fn name_at(&self, index: usize) -> Option<&str> {
        self.records.get(index).map(|r| r.name.as_str())
    }

    pub fn guardian_at(&self, index: usize) -> Option<&str> {
        self.records.get(index).map(|r| r.guardian.as_str())
    }

    pub fn gender_at(&self, index: usize) -> Option<&str> {
        self.records.get(index).map(|r| r.gender.as_str())
    }

    pub fn days_old_at(&self, index: usize) -> Option<u32> {
        self.records.get(index).map(|r| r.days_old)
    }

    pub fn birthday_at(&self, index: usize) -> Option<&str> {
        self.records.get(index).and_then(|r| r.birthday.as_deref())
    }

    pub fn bed_at(&self, index: usize) -> Option<&str> {
        self.records.get(index).and_then(|r| r.bed.as_deref())
    }
}
