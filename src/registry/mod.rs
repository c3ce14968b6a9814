//! Identity registry: the minor <-> proxy mapping and derived facts
//!
//! The registry owns the birth-order list of every minor observed in this
//! session, the per-minor derived facts (guardian, age), and the
//! bidirectional minor <-> proxy mapping. It is the single gate other
//! components consult before applying proxy behavior to any actor.

pub mod slots;

use ahash::{AHashMap, AHashSet};

use crate::core::config::EngineConfig;
use crate::core::error::{EngineError, Result};
use crate::core::types::{ActorId, Gender};
use crate::host::MinorRecord;
use crate::registry::slots::{slot_for, BedSlot};

/// Per-minor facts derived at observation time
#[derive(Debug, Clone)]
pub struct MinorEntry {
    pub name: String,
    pub gender: Gender,
    pub days_old: u32,
    /// Resolved once at first observation, immutable afterward
    pub guardian: String,
}

/// Birth-order list plus minor <-> proxy mapping
///
/// The birth-order list is append-only for the lifetime of a save and is
/// cleared only by `unregister_all` on full session teardown.
#[derive(Debug, Default)]
pub struct IdentityRegistry {
    birth_order: Vec<String>,
    entries: AHashMap<String, MinorEntry>,
    proxies: AHashMap<String, ActorId>,
    proxy_ids: AHashSet<ActorId>,
    proxy_minor: AHashMap<ActorId, String>,
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a minor, appending it to birth order on first sight.
    ///
    /// Idempotent: a known minor only has its host-mutated fields (age,
    /// gender) refreshed; its guardian and birth position never move.
    /// Call this for every minor the host currently owns, every tick, so
    /// late-arriving newborns are picked up without a reset.
    pub fn observe(&mut self, minor: &MinorRecord, config: &EngineConfig, partner: Option<&str>) {
        if let Some(entry) = self.entries.get_mut(&minor.name) {
            entry.days_old = minor.days_old;
            entry.gender = minor.gender;
            return;
        }

        let guardian = resolve_guardian(&minor.name, config, partner);
        tracing::debug!(
            "Observed new minor \"{}\" (guardian {}, {} days old)",
            minor.name,
            guardian,
            minor.days_old
        );
        self.birth_order.push(minor.name.clone());
        self.entries.insert(
            minor.name.clone(),
            MinorEntry {
                name: minor.name.clone(),
                gender: minor.gender,
                days_old: minor.days_old,
                guardian,
            },
        );
    }

    /// Map a minor to its proxy actor. Fails when the minor is unknown or
    /// already has a proxy.
    pub fn register_proxy(&mut self, minor_name: &str, proxy: ActorId) -> Result<()> {
        if !self.entries.contains_key(minor_name) {
            return Err(EngineError::NotFound(minor_name.to_string()));
        }
        if self.proxies.contains_key(minor_name) {
            return Err(EngineError::AlreadyRegistered(minor_name.to_string()));
        }
        self.insert_mapping(minor_name, proxy);
        Ok(())
    }

    /// Replace any existing mapping for the minor. Used by the lifecycle
    /// manager to resolve a duplicate registration by overwrite instead of
    /// duplication.
    pub fn force_register_proxy(&mut self, minor_name: &str, proxy: ActorId) {
        if let Some(old) = self.proxies.remove(minor_name) {
            self.proxy_ids.remove(&old);
            self.proxy_minor.remove(&old);
        }
        self.insert_mapping(minor_name, proxy);
    }

    fn insert_mapping(&mut self, minor_name: &str, proxy: ActorId) {
        self.proxies.insert(minor_name.to_string(), proxy);
        self.proxy_ids.insert(proxy);
        self.proxy_minor.insert(proxy, minor_name.to_string());
    }

    /// O(1) membership test: is this actor one of our proxies?
    ///
    /// Every host-visible side effect in the engine is gated on this.
    pub fn is_managed_proxy(&self, actor: &ActorId) -> bool {
        self.proxy_ids.contains(actor)
    }

    pub fn proxy_of(&self, minor_name: &str) -> Option<ActorId> {
        self.proxies.get(minor_name).copied()
    }

    pub fn minor_of(&self, proxy: &ActorId) -> Option<&str> {
        self.proxy_minor.get(proxy).map(String::as_str)
    }

    /// Clear all mappings and the birth-order list. Used on full session
    /// teardown; never touches the host-owned minors themselves.
    pub fn unregister_all(&mut self) {
        self.birth_order.clear();
        self.entries.clear();
        self.proxies.clear();
        self.proxy_ids.clear();
        self.proxy_minor.clear();
    }

    pub fn guardian_of(&self, minor_name: &str) -> Result<&str> {
        self.entries
            .get(minor_name)
            .map(|entry| entry.guardian.as_str())
            .ok_or_else(|| EngineError::NotFound(minor_name.to_string()))
    }

    /// Zero-based position in birth order
    pub fn birth_order_index(&self, minor_name: &str) -> Result<usize> {
        self.birth_order
            .iter()
            .position(|name| name == minor_name)
            .ok_or_else(|| EngineError::NotFound(minor_name.to_string()))
    }

    pub fn minor_count(&self) -> usize {
        self.birth_order.len()
    }

    pub fn proxy_count(&self) -> usize {
        self.proxies.len()
    }

    /// Entries in birth order
    pub fn known_minors(&self) -> impl Iterator<Item = &MinorEntry> {
        self.birth_order
            .iter()
            .filter_map(move |name| self.entries.get(name))
    }

    pub fn entry(&self, minor_name: &str) -> Option<&MinorEntry> {
        self.entries.get(minor_name)
    }

    pub fn entry_at(&self, index: usize) -> Option<&MinorEntry> {
        self.birth_order
            .get(index)
            .and_then(|name| self.entries.get(name))
    }

    /// Genders of every known minor, in birth order
    pub fn sibling_genders(&self) -> Vec<Gender> {
        self.known_minors().map(|entry| entry.gender).collect()
    }

    /// Bed slot for a minor, recomputed from the current sibling list
    pub fn bed_slot_of(&self, minor_name: &str) -> Option<BedSlot> {
        let index = self.birth_order_index(minor_name).ok()?;
        slot_for(index + 1, &self.sibling_genders())
    }
}

/// Resolve a minor's guardian name: explicit configured pair, then the
/// owning player's current partner, then the fixed fallback.
fn resolve_guardian(minor_name: &str, config: &EngineConfig, partner: Option<&str>) -> String {
    if let Some(paired) = config.guardian_pairs.get(minor_name) {
        return paired.clone();
    }
    match partner {
        Some(partner) if !partner.is_empty() => partner.to_string(),
        _ => config.fallback_guardian.clone(),
    }
}
