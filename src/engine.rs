//! Host-facing facade
//!
//! `ShadowEngine` is what the host glue code talks to: it subscribes to
//! the host's hooks (day started, periodic tick, arrival, boundary cross,
//! before save, session ended) and fans each callback out to the
//! registry, lifecycle manager, curfew scheduler and snapshot cache.
//!
//! Every hook runs to completion inside the host's single simulation
//! thread and downgrades internal failures to logged events; nothing here
//! propagates an error back into a host callback. The engine is not
//! re-entrant: a hook must return before the next one is delivered.

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use crate::core::config::EngineConfig;
use crate::core::error::{EngineError, Result};
use crate::core::types::{ActorId, LocationId, TilePoint};
use crate::host::{ContentSource, HostWorld, Pathfinder, RelationshipStore};
use crate::lifecycle::LifecycleManager;
use crate::registry::IdentityRegistry;
use crate::schedule::{CurfewScheduler, CurfewState, DailySchedule};
use crate::snapshot::facts::{self, FactConsumer};
use crate::snapshot::SnapshotCache;

pub struct ShadowEngine {
    config: EngineConfig,
    registry: Rc<RefCell<IdentityRegistry>>,
    lifecycle: LifecycleManager,
    scheduler: CurfewScheduler,
    cache: Rc<RefCell<SnapshotCache>>,
}

impl ShadowEngine {
    pub fn new(config: EngineConfig) -> Self {
        if let Err(e) = config.validate() {
            tracing::warn!("Engine config failed validation: {}", e);
        }
        Self {
            config,
            registry: Rc::new(RefCell::new(IdentityRegistry::new())),
            lifecycle: LifecycleManager::new(),
            scheduler: CurfewScheduler::new(),
            cache: Rc::new(RefCell::new(SnapshotCache::new())),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Daily swap-in: hide promoted minors, place proxies, migrate
    /// relationship records. Runs before any tick logic for the day.
    pub fn on_day_started(
        &mut self,
        host: &mut dyn HostWorld,
        pathfinder: &mut dyn Pathfinder,
        store: &mut RelationshipStore,
    ) {
        if !host.is_world_loaded() {
            return;
        }
        let home = host.home_location();
        let today = host.current_time().date;
        self.cache
            .borrow_mut()
            .set_context(today, host.location_display_name(&home));

        self.lifecycle.day_start(
            host,
            pathfinder,
            &mut self.registry.borrow_mut(),
            store,
            &self.config,
        );
        self.scheduler.reset_for_day();
    }

    /// Coarse periodic tick: pick up newborn minors, retry pending
    /// content, and advance every proxy's behavior state machine.
    pub fn on_periodic_tick(
        &mut self,
        host: &mut dyn HostWorld,
        pathfinder: &mut dyn Pathfinder,
        content: &dyn ContentSource,
    ) {
        if !host.is_world_loaded() {
            return;
        }

        let partner = host.player_partner();
        {
            let mut registry = self.registry.borrow_mut();
            for record in host.minors_in_home() {
                registry.observe(&record, &self.config, partner.as_deref());
            }
        }

        self.lifecycle
            .refresh_pending_content(content, self.config.start_in_bed);

        for id in self.lifecycle.proxy_ids() {
            if let Some(proxy) = self.lifecycle.proxy_mut(id) {
                self.scheduler
                    .on_time_tick(proxy, host, pathfinder, &self.config);
            }
        }
    }

    /// The pathfinding capability finished an actor's route.
    pub fn on_route_complete(&mut self, actor: ActorId) {
        if !self.registry.borrow().is_managed_proxy(&actor) {
            return;
        }
        if let Some(proxy) = self.lifecycle.proxy_mut(actor) {
            self.scheduler.on_route_complete(proxy);
        }
    }

    /// An actor crossed into the home location.
    pub fn on_home_entered(
        &mut self,
        host: &mut dyn HostWorld,
        pathfinder: &mut dyn Pathfinder,
        actor: ActorId,
    ) {
        if !self.registry.borrow().is_managed_proxy(&actor) {
            return;
        }
        if let Some(proxy) = self.lifecycle.proxy_mut(actor) {
            self.scheduler.on_home_entered(proxy, host, pathfinder);
        }
    }

    /// An actor is crossing a location boundary toward `target`.
    ///
    /// Homeward crossings are corrected to the household of the guardian
    /// that owns the actor; all other crossings pass through untouched
    /// (None). Unmanaged actors always pass through.
    pub fn on_boundary_cross(
        &mut self,
        host: &dyn HostWorld,
        actor: ActorId,
        target: &LocationId,
    ) -> Option<(LocationId, TilePoint)> {
        let registry = self.registry.borrow();
        if !registry.is_managed_proxy(&actor) {
            return None;
        }
        if *target != host.home_location() {
            return None;
        }
        let proxy = self.lifecycle.proxy(actor)?;
        let (location, point) = self.scheduler.boundary_redirect(proxy, &registry, host);
        drop(registry);

        if let Some(proxy) = self.lifecycle.proxy_mut(actor) {
            proxy.location = location.clone();
            proxy.position = point;
        }
        Some((location, point))
    }

    /// Pre-save swap-back: remove proxies everywhere, restore minors.
    pub fn on_before_save(&mut self, host: &mut dyn HostWorld, store: &mut RelationshipStore) {
        self.lifecycle
            .before_save(host, &self.registry.borrow(), store);
    }

    /// Full reset when the session is abandoned (return to title).
    pub fn on_session_ended(&mut self) {
        self.lifecycle
            .session_teardown(&mut self.registry.borrow_mut());
        self.scheduler.clear_all();
        *self.cache.borrow_mut() = SnapshotCache::new();
    }

    /// Rebuild the snapshot for a frame; true when any exposed value
    /// changed. Hosts that do not route updates through registered facts
    /// call this directly.
    pub fn update_snapshot(&mut self, frame: u64) -> bool {
        self.cache.borrow_mut().update(&self.registry.borrow(), frame)
    }

    /// Register the exposed facts with the templating consumer.
    pub fn register_facts(&self, consumer: &mut dyn FactConsumer) {
        facts::register_facts(
            consumer,
            Rc::clone(&self.cache),
            Rc::clone(&self.registry),
            &self.config,
        );
    }

    /// Attach a per-time destination table to a promoted minor's proxy.
    pub fn set_schedule(&mut self, minor_name: &str, schedule: DailySchedule) -> Result<()> {
        let proxy = self
            .registry
            .borrow()
            .proxy_of(minor_name)
            .ok_or_else(|| EngineError::NotFound(minor_name.to_string()))?;
        self.scheduler.set_schedule(proxy, schedule);
        Ok(())
    }

    pub fn registry(&self) -> Ref<'_, IdentityRegistry> {
        self.registry.borrow()
    }

    pub fn lifecycle(&self) -> &LifecycleManager {
        &self.lifecycle
    }

    pub fn proxy_state(&self, actor: ActorId) -> CurfewState {
        self.scheduler.state_of(actor)
    }
}
