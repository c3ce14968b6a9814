//! In-memory reference host
//!
//! A small, deterministic implementation of the host-facing traits used by
//! the integration tests and the `day_cycle` demo binary. It models just
//! enough of a world - ordered actor lists per location, a household of
//! minors, a clock - to drive every engine path.

use ahash::{AHashMap, AHashSet};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::core::calendar::{Season, SimDate, SimTime, TimeOfDay};
use crate::core::error::{EngineError, Result};
use crate::core::types::{ActorId, Gender, LocationId, TilePoint};
use crate::host::{
    ArrivalBehavior, ContentRefresh, ContentSource, HostWorld, MinorRecord, Pathfinder,
    RouteHandle, VisualDescriptor,
};

/// A host-owned minor with its mutable day-update bookkeeping
#[derive(Debug, Clone)]
struct MemoryMinor {
    record: MinorRecord,
    /// Absolute day the minor was last aged, so the morning update is
    /// applied exactly once whether the host or the engine triggers it
    updated_day: u32,
}

/// Deterministic in-memory world
pub struct MemoryHost {
    home: LocationId,
    other_locations: Vec<LocationId>,
    /// Ordered actor lists, the order being positionally meaningful
    actors: AHashMap<LocationId, Vec<(ActorId, String)>>,
    minors: Vec<MemoryMinor>,
    partner: Option<String>,
    guardian_homes: AHashMap<String, LocationId>,
    time: SimTime,
    day_counter: u32,
    world_loaded: bool,
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHost {
    pub fn new() -> Self {
        let home = LocationId::new("Hearthhome");
        let other_locations = vec![LocationId::new("Crossroads"), LocationId::new("Village")];

        let mut actors = AHashMap::new();
        actors.insert(home.clone(), Vec::new());
        for loc in &other_locations {
            actors.insert(loc.clone(), Vec::new());
        }

        Self {
            home,
            other_locations,
            actors,
            minors: Vec::new(),
            partner: None,
            guardian_homes: AHashMap::new(),
            time: SimTime {
                date: SimDate::new(1, Season::Spring, 1),
                time: TimeOfDay(600),
            },
            day_counter: 0,
            world_loaded: true,
        }
    }

    /// Add a minor to the household and place it in the home location
    pub fn spawn_minor(&mut self, name: &str, gender: Gender, days_old: u32) -> ActorId {
        let id = ActorId::new();
        let record = MinorRecord {
            id,
            name: name.to_string(),
            gender,
            days_old,
            appearance: VisualDescriptor::new(format!("Characters/{}", name), 16, 32),
            position: TilePoint::new(16, 4),
        };
        self.minors.push(MemoryMinor {
            record,
            updated_day: self.day_counter,
        });
        let home = self.home.clone();
        self.place(&home, id, name);
        id
    }

    pub fn set_partner(&mut self, partner: Option<&str>) {
        self.partner = partner.map(str::to_string);
    }

    /// Place a plain host actor (spouse, villager) in a location
    pub fn spawn_villager(&mut self, name: &str, location: &LocationId) -> ActorId {
        let id = ActorId::new();
        self.place(location, id, name);
        id
    }

    pub fn set_guardian_home(&mut self, guardian: &str, location: LocationId) {
        self.guardian_homes.insert(guardian.to_string(), location);
    }

    pub fn set_time_of_day(&mut self, hhmm: u16) {
        self.time.time = TimeOfDay(hhmm);
    }

    pub fn set_world_loaded(&mut self, loaded: bool) {
        self.world_loaded = loaded;
    }

    /// Advance to the next morning: minors present in the home location
    /// receive their age update from the host itself, hidden minors rely
    /// on `refresh_minor_for_new_day`.
    pub fn advance_day(&mut self) {
        self.day_counter += 1;
        self.time.date = self.time.date.plus_days(1);
        self.time.time = TimeOfDay(600);

        let present: AHashSet<ActorId> = self.actors[&self.home]
            .iter()
            .map(|(id, _)| *id)
            .collect();
        let day = self.day_counter;
        for minor in &mut self.minors {
            if present.contains(&minor.record.id) && minor.updated_day < day {
                minor.record.days_old += 1;
                minor.updated_day = day;
            }
        }
    }

    /// Names currently placed in a location, in list order
    pub fn names_in(&self, location: &LocationId) -> Vec<String> {
        self.actors
            .get(location)
            .map(|list| list.iter().map(|(_, name)| name.clone()).collect())
            .unwrap_or_default()
    }

    /// Move an already-placed actor to a different location (test helper
    /// for the "proxy wandered off before the save" case)
    pub fn relocate_actor(&mut self, name: &str, to: &LocationId) {
        let mut moved = None;
        for list in self.actors.values_mut() {
            if let Some(index) = list.iter().position(|(_, n)| n == name) {
                moved = Some(list.remove(index));
                break;
            }
        }
        if let Some(entry) = moved {
            self.actors.get_mut(to).expect("known location").push(entry);
        }
    }

    fn place(&mut self, location: &LocationId, actor: ActorId, name: &str) {
        self.actors
            .get_mut(location)
            .expect("known location")
            .push((actor, name.to_string()));
    }

    fn minor_mut(&mut self, name: &str) -> Option<&mut MemoryMinor> {
        self.minors.iter_mut().find(|m| m.record.name == name)
    }

    pub(crate) fn remove_minor_entry(&mut self, name: &str) -> bool {
        let Some(index) = self.minors.iter().position(|m| m.record.name == name) else {
            return false;
        };
        let id = self.minors[index].record.id;
        self.minors.remove(index);
        for list in self.actors.values_mut() {
            list.retain(|(actor, _)| *actor != id);
        }
        true
    }

    pub(crate) fn set_minor_age(&mut self, name: &str, days_old: u32) -> bool {
        match self.minor_mut(name) {
            Some(minor) => {
                minor.record.days_old = days_old;
                true
            }
            None => false,
        }
    }
}

impl HostWorld for MemoryHost {
    fn home_location(&self) -> LocationId {
        self.home.clone()
    }

    fn location_display_name(&self, location: &LocationId) -> String {
        location.0.clone()
    }

    fn location_ids(&self) -> Vec<LocationId> {
        let mut ids = vec![self.home.clone()];
        ids.extend(self.other_locations.iter().cloned());
        ids
    }

    fn minors_in_home(&self) -> Vec<MinorRecord> {
        let present: AHashSet<ActorId> = self.actors[&self.home]
            .iter()
            .map(|(id, _)| *id)
            .collect();
        self.minors
            .iter()
            .filter(|m| present.contains(&m.record.id))
            .map(|m| m.record.clone())
            .collect()
    }

    fn minor_record(&self, name: &str) -> Option<MinorRecord> {
        self.minors
            .iter()
            .find(|m| m.record.name == name)
            .map(|m| m.record.clone())
    }

    fn refresh_minor_for_new_day(&mut self, name: &str) {
        let day = self.day_counter;
        let mut record = None;
        if let Some(minor) = self.minor_mut(name) {
            if minor.updated_day < day {
                minor.record.days_old += 1;
                minor.updated_day = day;
            }
            record = Some((minor.record.id, minor.record.name.clone()));
        }
        // The morning update puts the minor back into the home location
        if let Some((id, name)) = record {
            let home = self.home.clone();
            if self.find_actor(&home, &name).is_none() {
                self.place(&home, id, &name);
            }
        }
    }

    fn actor_names(&self) -> Vec<String> {
        self.actors
            .values()
            .flat_map(|list| list.iter().map(|(_, name)| name.clone()))
            .collect()
    }

    fn find_actor(&self, location: &LocationId, name: &str) -> Option<ActorId> {
        self.actors
            .get(location)?
            .iter()
            .find(|(_, n)| n == name)
            .map(|(id, _)| *id)
    }

    fn remove_actor(&mut self, location: &LocationId, actor: ActorId) -> bool {
        let Some(list) = self.actors.get_mut(location) else {
            return false;
        };
        match list.iter().position(|(id, _)| *id == actor) {
            Some(index) => {
                list.remove(index);
                true
            }
            None => false,
        }
    }

    fn insert_actor(&mut self, location: &LocationId, actor: ActorId, name: &str, _position: TilePoint) {
        self.place(location, actor, name);
    }

    fn entry_point(&self, _location: &LocationId) -> TilePoint {
        TilePoint::new(3, 11)
    }

    fn fallback_bed_point(&self, gender: Gender) -> TilePoint {
        match gender {
            Gender::Male => TilePoint::new(23, 4),
            Gender::Female => TilePoint::new(27, 4),
        }
    }

    fn transfer_point_toward_home(&self) -> (LocationId, TilePoint) {
        (LocationId::new("Crossroads"), TilePoint::new(-1, 23))
    }

    fn home_of_guardian(&self, guardian: &str) -> Option<LocationId> {
        self.guardian_homes.get(guardian).cloned()
    }

    fn player_partner(&self) -> Option<String> {
        self.partner.clone()
    }

    fn current_time(&self) -> SimTime {
        self.time
    }

    fn is_world_loaded(&self) -> bool {
        self.world_loaded
    }
}

impl crate::commands::AdminHost for MemoryHost {
    fn create_minor(&mut self, name: &str, gender: Gender) {
        self.spawn_minor(name, gender, 0);
    }

    fn delete_minor(&mut self, name: &str) -> bool {
        self.remove_minor_entry(name)
    }

    fn age_minor(&mut self, name: &str, days_old: u32) -> bool {
        self.set_minor_age(name, days_old)
    }
}

/// Deterministic pathfinder: routes succeed everywhere except a
/// configurable set of tiles, and open-point searches draw from a
/// seeded generator
pub struct MemoryPathfinder {
    next_id: u64,
    rng: ChaCha8Rng,
    pub unreachable: AHashSet<TilePoint>,
    /// When false, `open_point_near` always fails (crowded-house case)
    pub open_points_available: bool,
}

impl MemoryPathfinder {
    pub fn new(seed: u64) -> Self {
        Self {
            next_id: 0,
            rng: ChaCha8Rng::seed_from_u64(seed),
            unreachable: AHashSet::new(),
            open_points_available: true,
        }
    }
}

impl Pathfinder for MemoryPathfinder {
    fn compute_route(
        &mut self,
        _actor: ActorId,
        location: &LocationId,
        destination: TilePoint,
        arrival: ArrivalBehavior,
    ) -> Result<RouteHandle> {
        if self.unreachable.contains(&destination) {
            return Err(EngineError::UnreachableDestination(destination));
        }
        self.next_id += 1;
        Ok(RouteHandle {
            id: self.next_id,
            location: location.clone(),
            destination,
            arrival,
        })
    }

    fn open_point_near(&mut self, _location: &LocationId, _search_radius: u32) -> Option<TilePoint> {
        if !self.open_points_available {
            return None;
        }
        Some(TilePoint::new(
            self.rng.gen_range(1..=28),
            self.rng.gen_range(1..=10),
        ))
    }
}

/// Content source whose assets become available on demand
pub struct MemoryContent {
    pub available: bool,
    pub home_anchors: AHashMap<String, TilePoint>,
}

impl MemoryContent {
    pub fn new(available: bool) -> Self {
        Self {
            available,
            home_anchors: AHashMap::new(),
        }
    }
}

impl ContentSource for MemoryContent {
    fn load_refresh(&self, proxy_name: &str) -> Result<ContentRefresh> {
        if !self.available {
            return Err(EngineError::ExternalContentUnavailable(proxy_name.to_string()));
        }
        Ok(ContentRefresh {
            appearance: VisualDescriptor::new(format!("Characters/{}", proxy_name), 16, 32),
            home_anchor: self.home_anchors.get(proxy_name).copied(),
        })
    }
}
