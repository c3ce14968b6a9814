//! Curfew/schedule state machine
//!
//! Each proxy is steered by a small per-actor state machine evaluated on
//! the host's coarse periodic tick and on arrival events from the
//! pathfinding capability. Free wandering fills the day, an explicit
//! per-time destination table overrides it, and at curfew the proxy heads
//! home and settles for the night.
//!
//! Invariant: at most one movement controller is active per actor; every
//! transition that assigns a controller clears both slots first.

use std::collections::BTreeMap;

use ahash::AHashMap;

use crate::core::config::EngineConfig;
use crate::core::types::{ActorId, LocationId, TilePoint};
use crate::host::{ArrivalBehavior, HostWorld, Pathfinder};
use crate::lifecycle::proxy::Proxy;
use crate::registry::IdentityRegistry;

/// Time of day before which no transitions fire: the host's new-day
/// transition window is still running
pub const HOME_OPENING_TIME: u16 = 630;

/// Free wandering stops at this time even without a curfew
pub const WANDER_CUTOFF: u16 = 1900;

/// Search limit for random wander destinations
const WANDER_SEARCH_LIMIT: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurfewState {
    Idle,
    Wandering,
    FollowingSchedule,
    ReturningForCurfew,
    ArrivingHome,
    /// In bed for the night; no further overrides until the next day
    Settled,
}

/// One stop in a per-time-of-day destination table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleStop {
    pub location: LocationId,
    pub point: TilePoint,
}

/// Destination table keyed by HHMM-coded time of day
pub type DailySchedule = BTreeMap<u16, ScheduleStop>;

/// Per-proxy behavior controller
///
/// The retry slot and previous-endpoint cache are explicit state here;
/// they track a schedule stop that could not start yet because the actor
/// was still walking when its time came up.
#[derive(Debug, Default)]
pub struct CurfewScheduler {
    states: AHashMap<ActorId, CurfewState>,
    schedules: AHashMap<ActorId, DailySchedule>,
    retry_time: AHashMap<ActorId, u16>,
    previous_endpoint: AHashMap<ActorId, TilePoint>,
}

impl CurfewScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state_of(&self, actor: ActorId) -> CurfewState {
        self.states.get(&actor).copied().unwrap_or(CurfewState::Idle)
    }

    pub fn set_schedule(&mut self, actor: ActorId, schedule: DailySchedule) {
        self.schedules.insert(actor, schedule);
    }

    pub fn clear_schedule(&mut self, actor: ActorId) {
        self.schedules.remove(&actor);
    }

    /// Reset per-day state: everyone wakes up Idle and pending schedule
    /// retries are dropped.
    pub fn reset_for_day(&mut self) {
        self.states.clear();
        self.retry_time.clear();
        self.previous_endpoint.clear();
    }

    /// Forget per-actor state entirely (session teardown)
    pub fn clear_all(&mut self) {
        self.states.clear();
        self.schedules.clear();
        self.retry_time.clear();
        self.previous_endpoint.clear();
    }

    /// Evaluate transitions on the host's coarse periodic tick.
    pub fn on_time_tick(
        &mut self,
        proxy: &mut Proxy,
        host: &mut dyn HostWorld,
        pathfinder: &mut dyn Pathfinder,
        config: &EngineConfig,
    ) {
        let time = host.current_time().time;
        if !host.is_world_loaded() || time.0 <= HOME_OPENING_TIME {
            return;
        }
        if self.state_of(proxy.id) == CurfewState::Settled {
            return;
        }

        // Curfew beats everything else at its exact time
        if config.curfew_enabled && time.0 == config.curfew_time {
            self.begin_curfew_return(proxy, host, pathfinder);
            return;
        }

        if self.try_schedule_stop(proxy, pathfinder, time.0) {
            return;
        }

        self.try_wander(proxy, host, pathfinder, config, time.0);
    }

    /// The pathfinding capability reports that the active route finished.
    pub fn on_route_complete(&mut self, proxy: &mut Proxy) {
        let route = proxy.active_route().cloned();
        proxy.clear_controllers();

        let settled = match route {
            Some(route) => {
                proxy.position = route.destination;
                route.arrival == ArrivalBehavior::SettleForNight
            }
            None => false,
        };
        let next = if settled {
            CurfewState::Settled
        } else {
            CurfewState::Idle
        };
        self.states.insert(proxy.id, next);
    }

    /// The actor just crossed into its home location. Mirrors the host's
    /// own homecoming behavior: snap to the entry tile, drop any movement
    /// intent, then head for bed in the evening or wander otherwise.
    /// Suppressed during the new-day transition window.
    pub fn on_home_entered(
        &mut self,
        proxy: &mut Proxy,
        host: &mut dyn HostWorld,
        pathfinder: &mut dyn Pathfinder,
    ) {
        let time = host.current_time().time;
        if time.0 <= HOME_OPENING_TIME {
            return;
        }

        let home = host.home_location();
        proxy.location = home.clone();
        proxy.position = host.entry_point(&home);
        proxy.clear_controllers();

        if time.0 >= WANDER_CUTOFF {
            match pathfinder.compute_route(
                proxy.id,
                &home,
                proxy.default_position,
                ArrivalBehavior::SettleForNight,
            ) {
                Ok(route) => {
                    proxy.assign_temporary(route);
                    self.states.insert(proxy.id, CurfewState::ArrivingHome);
                }
                Err(e) => {
                    tracing::warn!("Proxy \"{}\" cannot reach its bed: {}", proxy.name, e);
                    self.states.insert(proxy.id, CurfewState::Idle);
                }
            }
        } else {
            let destination = pathfinder
                .open_point_near(&home, WANDER_SEARCH_LIMIT)
                .unwrap_or(proxy.default_position);
            match pathfinder.compute_route(proxy.id, &home, destination, ArrivalBehavior::None) {
                Ok(route) => {
                    proxy.assign_temporary(route);
                    self.states.insert(proxy.id, CurfewState::Wandering);
                }
                Err(_) => {
                    self.states.insert(proxy.id, CurfewState::Idle);
                }
            }
        }
    }

    /// Where should an actor crossing out of its home location come out?
    ///
    /// The host default assumes every actor belongs to one fixed
    /// household; a proxy belongs to whichever guardian owns it, so the
    /// redirect resolves the guardian through the registry and falls back
    /// to the household home on any miss.
    pub fn boundary_redirect(
        &self,
        proxy: &Proxy,
        registry: &IdentityRegistry,
        host: &dyn HostWorld,
    ) -> (LocationId, TilePoint) {
        let location = registry
            .guardian_of(&proxy.display_name)
            .ok()
            .and_then(|guardian| host.home_of_guardian(guardian))
            .unwrap_or_else(|| host.home_location());
        let entry = host.entry_point(&location);
        (location, entry)
    }

    fn begin_curfew_return(
        &mut self,
        proxy: &mut Proxy,
        host: &mut dyn HostWorld,
        pathfinder: &mut dyn Pathfinder,
    ) {
        proxy.clear_controllers();
        let home = host.home_location();

        if proxy.is_at_home() {
            // Already home: straight to bed, settling on arrival
            match pathfinder.compute_route(
                proxy.id,
                &home,
                proxy.default_position,
                ArrivalBehavior::SettleForNight,
            ) {
                Ok(route) => {
                    proxy.assign_primary(route);
                    self.states.insert(proxy.id, CurfewState::ArrivingHome);
                }
                Err(e) => {
                    tracing::warn!("Curfew route failed for \"{}\": {}", proxy.name, e);
                    self.states.insert(proxy.id, CurfewState::Idle);
                }
            }
        } else {
            let (location, point) = host.transfer_point_toward_home();
            match pathfinder.compute_route(proxy.id, &location, point, ArrivalBehavior::None) {
                Ok(route) => {
                    proxy.assign_primary(route);
                    self.states.insert(proxy.id, CurfewState::ReturningForCurfew);
                }
                Err(e) => {
                    tracing::warn!("Curfew return failed for \"{}\": {}", proxy.name, e);
                    self.states.insert(proxy.id, CurfewState::Idle);
                }
            }
        }
    }

    /// Start a scheduled stop when the table has one for this time (or a
    /// deferred earlier one). Returns true when the tick is consumed.
    fn try_schedule_stop(
        &mut self,
        proxy: &mut Proxy,
        pathfinder: &mut dyn Pathfinder,
        now: u16,
    ) -> bool {
        let effective = self.retry_time.get(&proxy.id).copied().unwrap_or(now);
        let Some(stop) = self
            .schedules
            .get(&proxy.id)
            .and_then(|table| table.get(&effective))
            .cloned()
        else {
            return false;
        };

        // Still walking the previous leg: keep the stop pending and try
        // again on the next tick
        let at_previous_endpoint = self
            .previous_endpoint
            .get(&proxy.id)
            .map(|point| *point == proxy.position)
            .unwrap_or(true);
        if proxy.has_controller() && !at_previous_endpoint {
            self.retry_time.insert(proxy.id, effective);
            return true;
        }

        match pathfinder.compute_route(proxy.id, &stop.location, stop.point, ArrivalBehavior::None)
        {
            Ok(route) => {
                proxy.assign_primary(route);
                proxy.location = stop.location.clone();
                self.previous_endpoint.insert(proxy.id, stop.point);
                self.retry_time.remove(&proxy.id);
                self.states.insert(proxy.id, CurfewState::FollowingSchedule);
            }
            Err(e) => {
                tracing::warn!(
                    "Schedule stop at {} unreachable for \"{}\": {}; idling instead",
                    effective,
                    proxy.name,
                    e
                );
                proxy.clear_controllers();
                self.retry_time.remove(&proxy.id);
                self.states.insert(proxy.id, CurfewState::Idle);
            }
        }
        true
    }

    fn try_wander(
        &mut self,
        proxy: &mut Proxy,
        host: &mut dyn HostWorld,
        pathfinder: &mut dyn Pathfinder,
        config: &EngineConfig,
        now: u16,
    ) {
        if !config.wandering_enabled
            || now % 100 != 0
            || now >= WANDER_CUTOFF
            || !proxy.is_at_home()
            || proxy.has_controller()
        {
            return;
        }

        let home = host.home_location();
        let destination = pathfinder
            .open_point_near(&home, WANDER_SEARCH_LIMIT)
            .unwrap_or(proxy.default_position);
        match pathfinder.compute_route(proxy.id, &home, destination, ArrivalBehavior::None) {
            Ok(route) => {
                proxy.assign_temporary(route);
                self.states.insert(proxy.id, CurfewState::Wandering);
            }
            Err(e) => {
                tracing::debug!("Wander route failed for \"{}\": {}", proxy.name, e);
                self.states.insert(proxy.id, CurfewState::Idle);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Gender;
    use crate::host::memory::{MemoryHost, MemoryPathfinder};
    use crate::host::VisualDescriptor;

    fn test_proxy(host: &MemoryHost) -> Proxy {
        Proxy::new(
            ActorId::new(),
            "Violet".into(),
            "Violet".into(),
            Gender::Female,
            host.home_location(),
            TilePoint::new(23, 5),
            VisualDescriptor::new("Characters/Violet", 16, 32),
        )
    }

    #[test]
    fn test_wandering_starts_on_the_hour_at_home() {
        let mut host = MemoryHost::new();
        let mut pathfinder = MemoryPathfinder::new(7);
        let mut scheduler = CurfewScheduler::new();
        let mut proxy = test_proxy(&host);
        let config = EngineConfig::default();

        host.set_time_of_day(1000);
        scheduler.on_time_tick(&mut proxy, &mut host, &mut pathfinder, &config);

        assert_eq!(scheduler.state_of(proxy.id), CurfewState::Wandering);
        assert!(proxy.temporary_controller().is_some());
        assert!(proxy.controller().is_none());
    }

    #[test]
    fn test_no_wandering_off_the_hour_or_with_active_controller() {
        let mut host = MemoryHost::new();
        let mut pathfinder = MemoryPathfinder::new(7);
        let mut scheduler = CurfewScheduler::new();
        let mut proxy = test_proxy(&host);
        let config = EngineConfig::default();

        host.set_time_of_day(1010);
        scheduler.on_time_tick(&mut proxy, &mut host, &mut pathfinder, &config);
        assert!(!proxy.has_controller());

        host.set_time_of_day(1100);
        scheduler.on_time_tick(&mut proxy, &mut host, &mut pathfinder, &config);
        let first_route = proxy.active_route().cloned();
        scheduler.on_time_tick(&mut proxy, &mut host, &mut pathfinder, &config);
        // Second tick on the same hour must not replace the controller
        assert_eq!(proxy.active_route().cloned(), first_route);
    }

    #[test]
    fn test_transitions_suppressed_during_new_day_window() {
        let mut host = MemoryHost::new();
        let mut pathfinder = MemoryPathfinder::new(7);
        let mut scheduler = CurfewScheduler::new();
        let mut proxy = test_proxy(&host);
        let config = EngineConfig::default();

        host.set_time_of_day(600);
        scheduler.on_time_tick(&mut proxy, &mut host, &mut pathfinder, &config);
        scheduler.on_home_entered(&mut proxy, &mut host, &mut pathfinder);

        assert_eq!(scheduler.state_of(proxy.id), CurfewState::Idle);
        assert!(!proxy.has_controller());
    }

    #[test]
    fn test_curfew_at_home_goes_straight_to_bed() {
        let mut host = MemoryHost::new();
        let mut pathfinder = MemoryPathfinder::new(7);
        let mut scheduler = CurfewScheduler::new();
        let mut proxy = test_proxy(&host);
        let config = EngineConfig::default();

        host.set_time_of_day(config.curfew_time);
        scheduler.on_time_tick(&mut proxy, &mut host, &mut pathfinder, &config);

        assert_eq!(scheduler.state_of(proxy.id), CurfewState::ArrivingHome);
        let route = proxy.active_route().expect("bed route assigned");
        assert_eq!(route.destination, proxy.default_position);
        assert_eq!(route.arrival, ArrivalBehavior::SettleForNight);

        scheduler.on_route_complete(&mut proxy);
        assert_eq!(scheduler.state_of(proxy.id), CurfewState::Settled);
        assert!(!proxy.has_controller());
        assert_eq!(proxy.position, proxy.default_position);

        // Settled blocks later overrides for the rest of the day
        host.set_time_of_day(2200);
        scheduler.on_time_tick(&mut proxy, &mut host, &mut pathfinder, &config);
        assert!(!proxy.has_controller());
    }

    #[test]
    fn test_curfew_away_from_home_heads_for_transfer_point() {
        let mut host = MemoryHost::new();
        let mut pathfinder = MemoryPathfinder::new(7);
        let mut scheduler = CurfewScheduler::new();
        let mut proxy = test_proxy(&host);
        let config = EngineConfig::default();

        proxy.location = LocationId::new("Village");
        host.set_time_of_day(config.curfew_time);
        scheduler.on_time_tick(&mut proxy, &mut host, &mut pathfinder, &config);

        assert_eq!(scheduler.state_of(proxy.id), CurfewState::ReturningForCurfew);
        let route = proxy.active_route().expect("transfer route assigned");
        assert_eq!(route.location, LocationId::new("Crossroads"));
    }

    #[test]
    fn test_unreachable_schedule_stop_falls_back_to_idle() {
        let mut host = MemoryHost::new();
        let mut pathfinder = MemoryPathfinder::new(7);
        let mut scheduler = CurfewScheduler::new();
        let mut proxy = test_proxy(&host);
        let config = EngineConfig::default();

        let stop = ScheduleStop {
            location: LocationId::new("Village"),
            point: TilePoint::new(40, 40),
        };
        pathfinder.unreachable.insert(stop.point);
        let mut table = DailySchedule::new();
        table.insert(900, stop);
        scheduler.set_schedule(proxy.id, table);

        host.set_time_of_day(900);
        scheduler.on_time_tick(&mut proxy, &mut host, &mut pathfinder, &config);

        assert_eq!(scheduler.state_of(proxy.id), CurfewState::Idle);
        assert!(!proxy.has_controller());
    }

    #[test]
    fn test_schedule_stop_overrides_wandering() {
        let mut host = MemoryHost::new();
        let mut pathfinder = MemoryPathfinder::new(7);
        let mut scheduler = CurfewScheduler::new();
        let mut proxy = test_proxy(&host);
        let config = EngineConfig::default();

        let stop = ScheduleStop {
            location: LocationId::new("Village"),
            point: TilePoint::new(12, 8),
        };
        let mut table = DailySchedule::new();
        table.insert(1000, stop.clone());
        scheduler.set_schedule(proxy.id, table);

        host.set_time_of_day(1000);
        scheduler.on_time_tick(&mut proxy, &mut host, &mut pathfinder, &config);

        assert_eq!(scheduler.state_of(proxy.id), CurfewState::FollowingSchedule);
        let route = proxy.active_route().expect("schedule route assigned");
        assert_eq!(route.destination, stop.point);
        // Schedule movement rides the primary controller
        assert!(proxy.temporary_controller().is_none());
    }

    #[test]
    fn test_home_entry_in_evening_heads_for_bed() {
        let mut host = MemoryHost::new();
        let mut pathfinder = MemoryPathfinder::new(7);
        let mut scheduler = CurfewScheduler::new();
        let mut proxy = test_proxy(&host);

        proxy.location = LocationId::new("Village");
        host.set_time_of_day(1900);
        scheduler.on_home_entered(&mut proxy, &mut host, &mut pathfinder);

        assert_eq!(scheduler.state_of(proxy.id), CurfewState::ArrivingHome);
        assert!(proxy.is_at_home());
        let route = proxy.active_route().expect("bed route assigned");
        assert_eq!(route.arrival, ArrivalBehavior::SettleForNight);
    }

    #[test]
    fn test_boundary_redirect_resolves_guardian_home() {
        let mut host = MemoryHost::new();
        let mut config = EngineConfig::default();
        config
            .guardian_pairs
            .insert("Violet".to_string(), "Rowan".to_string());
        host.set_guardian_home("Rowan", LocationId::new("Village"));
        host.spawn_minor("Violet", Gender::Female, 90);

        let mut registry = IdentityRegistry::new();
        for record in host.minors_in_home() {
            registry.observe(&record, &config, None);
        }

        let scheduler = CurfewScheduler::new();
        let proxy = test_proxy(&host);
        let (location, _) = scheduler.boundary_redirect(&proxy, &registry, &host);
        assert_eq!(location, LocationId::new("Village"));
    }

    #[test]
    fn test_boundary_redirect_falls_back_to_home() {
        let host = MemoryHost::new();
        let registry = IdentityRegistry::new();
        let scheduler = CurfewScheduler::new();
        let proxy = test_proxy(&host);

        // Unknown minor: NotFound is recoverable, fall back to home
        let (location, _) = scheduler.boundary_redirect(&proxy, &registry, &host);
        assert_eq!(location, host.home_location());
    }
}
