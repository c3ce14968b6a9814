//! Lifecycle manager: the daily swap-in and the pre-save swap-back
//!
//! Once per in-game day, minors at or above the promotion age are hidden
//! from the active location and replaced by their proxies. Immediately
//! before the host serializes, the swap is undone so save data only ever
//! contains the host's own minors. A single inconsistent entity never
//! aborts a pass: it is logged and skipped, and the loop continues.

pub mod proxy;

use ahash::{AHashMap, AHashSet};

use crate::core::config::EngineConfig;
use crate::core::error::EngineError;
use crate::core::types::ActorId;
use crate::host::{ContentSource, HostWorld, Pathfinder, RelationshipStore};
use crate::lifecycle::proxy::{disambiguate_name, Proxy};
use crate::registry::IdentityRegistry;

/// Maximum number of proxies supported per household
pub const MAX_PROXIES: usize = 4;

/// Search limit for the random day-start placement
const PLACEMENT_SEARCH_LIMIT: u32 = 60;

/// Owns every proxy and runs the two swap protocols
#[derive(Debug, Default)]
pub struct LifecycleManager {
    proxies: AHashMap<ActorId, Proxy>,
    /// Proxy names still waiting for external content, retried once per
    /// periodic tick until the refresh succeeds or the day ends
    pending_content: AHashSet<String>,
}

impl LifecycleManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn proxy(&self, id: ActorId) -> Option<&Proxy> {
        self.proxies.get(&id)
    }

    pub fn proxy_mut(&mut self, id: ActorId) -> Option<&mut Proxy> {
        self.proxies.get_mut(&id)
    }

    pub fn proxy_by_name(&self, name: &str) -> Option<&Proxy> {
        self.proxies.values().find(|p| p.name == name)
    }

    pub fn proxy_ids(&self) -> Vec<ActorId> {
        self.proxies.keys().copied().collect()
    }

    pub fn proxy_count(&self) -> usize {
        self.proxies.len()
    }

    pub fn pending_content_count(&self) -> usize {
        self.pending_content.len()
    }

    /// Daily swap-in, run once per day before any tick logic.
    ///
    /// Ordering within the pass is load-bearing: observation completes
    /// before proxy creation, creation before location mutation, location
    /// mutation before relationship migration.
    pub fn day_start(
        &mut self,
        host: &mut dyn HostWorld,
        pathfinder: &mut dyn Pathfinder,
        registry: &mut IdentityRegistry,
        store: &mut RelationshipStore,
        config: &EngineConfig,
    ) {
        let home = host.home_location();
        let partner = host.player_partner();

        // 1. Observe minors present in the home so newborns are appended
        for record in host.minors_in_home() {
            registry.observe(&record, config, partner.as_deref());
        }

        // 2. Promoted minors are hidden from the host's own day update,
        //    so run it for them here; then refresh derived facts for all.
        let known: Vec<String> = registry.known_minors().map(|e| e.name.clone()).collect();
        for name in &known {
            if registry.proxy_of(name).is_some() {
                host.refresh_minor_for_new_day(name);
            }
            if let Some(record) = host.minor_record(name) {
                registry.observe(&record, config, partner.as_deref());
            }
        }

        // 3. Create and register proxies for newly eligible minors.
        //    Name collisions are counted, not just flagged, so a minor
        //    sharing its name with an unrelated actor still collides
        //    after its own presence is discounted.
        let mut name_counts: AHashMap<String, usize> = AHashMap::new();
        for actor_name in host.actor_names() {
            *name_counts.entry(actor_name).or_insert(0) += 1;
        }
        for name in &known {
            if registry.proxy_of(name).is_some() || self.proxies.len() >= MAX_PROXIES {
                continue;
            }
            let eligible = registry
                .entry(name)
                .map(|entry| entry.days_old >= config.promotion_age_days)
                .unwrap_or(false);
            if !eligible {
                continue;
            }
            let Some(record) = host.minor_record(name) else {
                tracing::warn!("Minor \"{}\" has no host record, skipping promotion", name);
                continue;
            };

            let default_position = registry
                .bed_slot_of(name)
                .map(|slot| slot.point())
                .unwrap_or_else(|| host.fallback_bed_point(record.gender));
            // The minor itself does not count as a collision: the proxy
            // takes over its name for the day
            if let Some(count) = name_counts.get_mut(&record.name) {
                *count -= 1;
                if *count == 0 {
                    name_counts.remove(&record.name);
                }
            }
            let taken: AHashSet<String> = name_counts.keys().cloned().collect();
            let proxy_name = disambiguate_name(&record.name, &taken);
            *name_counts.entry(proxy_name.clone()).or_insert(0) += 1;

            let proxy = Proxy::new(
                ActorId::new(),
                proxy_name,
                record.name.clone(),
                record.gender,
                home.clone(),
                default_position,
                record.appearance.clone(),
            );
            if let Err(e) = registry.register_proxy(name, proxy.id) {
                tracing::error!("{}; replacing the existing mapping", e);
                registry.force_register_proxy(name, proxy.id);
            }
            tracing::info!(
                "Promoted minor \"{}\" to proxy \"{}\" at {}",
                name,
                proxy.name,
                proxy.default_position
            );
            self.proxies.insert(proxy.id, proxy);
        }

        // 4. Hide promoted minors, leaving everything else in place so
        //    the actor list keeps its relative order
        for name in &known {
            if registry.proxy_of(name).is_none() {
                continue;
            }
            let Some(record) = host.minor_record(name) else {
                tracing::warn!("Minor \"{}\" has no host record, cannot hide it", name);
                continue;
            };
            if !host.remove_actor(&home, record.id) {
                tracing::warn!(
                    "Swap-in skipped an entity: {}",
                    EngineError::InconsistentCollectionState {
                        name: name.clone(),
                        location: home.to_string(),
                    }
                );
            }
        }

        // 5. Place proxies, in birth order, at the configured position
        for name in &known {
            let Some(proxy_id) = registry.proxy_of(name) else {
                continue;
            };
            let Some(proxy) = self.proxies.get_mut(&proxy_id) else {
                tracing::warn!("Registered proxy for \"{}\" is not owned by the lifecycle", name);
                continue;
            };
            let position = if config.start_in_bed {
                proxy.default_position
            } else {
                pathfinder
                    .open_point_near(&home, PLACEMENT_SEARCH_LIMIT)
                    .unwrap_or(proxy.default_position)
            };
            host.insert_actor(&home, proxy.id, &proxy.name, position);
            proxy.location = home.clone();
            proxy.position = position;
            proxy.clear_controllers();
        }

        // 6. Migrate relationship records from minor keys to proxy keys
        for name in &known {
            let Some(proxy_id) = registry.proxy_of(name) else {
                continue;
            };
            let Some(proxy_name) = self.proxies.get(&proxy_id).map(|p| p.name.clone()) else {
                continue;
            };
            if let Some(record) = store.remove(name) {
                store.insert_or_overwrite(&proxy_name, record);
            }
        }

        // Proxy sprites are reloaded from external content every morning
        self.pending_content = self.proxies.values().map(|p| p.name.clone()).collect();
    }

    /// Pre-save swap-back, run immediately before the host serializes.
    pub fn before_save(
        &mut self,
        host: &mut dyn HostWorld,
        registry: &IdentityRegistry,
        store: &mut RelationshipStore,
    ) {
        let home = host.home_location();

        // 1. Remove every proxy from wherever it wandered to. Matching
        //    by name alone could catch the minor, so the id is checked.
        for proxy in self.proxies.values() {
            let mut found = false;
            for location in host.location_ids() {
                if let Some(actor) = host.find_actor(&location, &proxy.name) {
                    if actor == proxy.id && host.remove_actor(&location, actor) {
                        found = true;
                    }
                }
            }
            if !found {
                tracing::warn!(
                    "Swap-back continued past a missing proxy: {}",
                    EngineError::InconsistentCollectionState {
                        name: proxy.name.clone(),
                        location: "any".to_string(),
                    }
                );
            }
        }

        // 2. Migrate relationship records back to minor keys
        for proxy in self.proxies.values() {
            let Some(minor_name) = registry.minor_of(&proxy.id).map(str::to_string) else {
                tracing::warn!("Proxy \"{}\" has no registered minor, record not migrated", proxy.name);
                continue;
            };
            if let Some(record) = store.remove(&proxy.name) {
                store.insert_or_overwrite(&minor_name, record);
            }
        }

        // 3. Restore promoted minors, in birth order, at the end of the
        //    actor list; untouched minors keep their original position
        let names: Vec<String> = registry.known_minors().map(|e| e.name.clone()).collect();
        for name in names {
            match host.minor_record(&name) {
                Some(record) => {
                    if host.find_actor(&home, &name).is_none() {
                        host.insert_actor(&home, record.id, &name, record.position);
                    }
                }
                None => {
                    tracing::warn!("Minor \"{}\" missing from host data, cannot restore it", name)
                }
            }
        }
    }

    /// Full reset on session teardown (return to title). Minors are
    /// host-owned and stay untouched.
    pub fn session_teardown(&mut self, registry: &mut IdentityRegistry) {
        registry.unregister_all();
        self.proxies.clear();
        self.pending_content.clear();
    }

    /// Retry the appearance refresh for proxies whose external content
    /// was not ready yet. Called once per periodic tick.
    pub fn refresh_pending_content(&mut self, content: &dyn ContentSource, start_in_bed: bool) {
        let pending: Vec<String> = self.pending_content.iter().cloned().collect();
        for name in pending {
            match content.load_refresh(&name) {
                Ok(refresh) => {
                    if let Some(proxy) = self.proxies.values_mut().find(|p| p.name == name) {
                        proxy.appearance = refresh.appearance;
                        if let Some(anchor) = refresh.home_anchor {
                            proxy.default_position = anchor;
                            if start_in_bed {
                                proxy.position = anchor;
                            }
                        }
                    }
                    self.pending_content.remove(&name);
                }
                Err(e) => {
                    tracing::trace!("Appearance refresh deferred: {}", e);
                }
            }
        }
    }
}
