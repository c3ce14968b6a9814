//! Interfaces to the external host simulation
//!
//! The engine never owns the world model. Everything it needs from the
//! host - actor lists, pathfinding, external content, the relationship
//! store - comes through the traits and shared resources defined here,
//! threaded into each operation rather than reached through globals.

pub mod memory;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::calendar::SimTime;
use crate::core::error::Result;
use crate::core::types::{ActorId, Gender, LocationId, TilePoint};

/// Visual descriptor for an actor's sprite sheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualDescriptor {
    /// Content key of the sprite sheet, e.g. "Characters/Violet"
    pub sheet: String,
    pub frame_width: u16,
    pub frame_height: u16,
}

impl VisualDescriptor {
    pub fn new(sheet: impl Into<String>, frame_width: u16, frame_height: u16) -> Self {
        Self {
            sheet: sheet.into(),
            frame_width,
            frame_height,
        }
    }
}

/// Read-only view of a host-owned minor
#[derive(Debug, Clone)]
pub struct MinorRecord {
    /// Host actor id for the minor itself
    pub id: ActorId,
    /// Stable name, the minor's identity key across the save
    pub name: String,
    pub gender: Gender,
    /// Age in days, mutated by the host each morning
    pub days_old: u32,
    pub appearance: VisualDescriptor,
    /// Current position inside the home location
    pub position: TilePoint,
}

/// What a movement controller should do when the route completes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrivalBehavior {
    /// Stop and await the next decision
    None,
    /// Mark the actor settled for the night
    SettleForNight,
}

/// Handle to an active movement controller produced by the pathfinding
/// capability. Replaced wholesale on every state transition, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteHandle {
    pub id: u64,
    pub location: LocationId,
    pub destination: TilePoint,
    pub arrival: ArrivalBehavior,
}

/// The host's entity/world model, as consumed by the engine
pub trait HostWorld {
    /// Identifier of the household's home location
    fn home_location(&self) -> LocationId;

    /// Name used when rendering positions in that location for consumers
    fn location_display_name(&self, location: &LocationId) -> String;

    /// Every location a wandering actor could currently be in
    fn location_ids(&self) -> Vec<LocationId>;

    /// Minors currently present in the home location
    fn minors_in_home(&self) -> Vec<MinorRecord>;

    /// Look up a minor by name regardless of where (or whether) it is
    /// currently placed in a location
    fn minor_record(&self, name: &str) -> Option<MinorRecord>;

    /// Run the host's own per-minor morning update (age, position) for a
    /// minor that is hidden from the simulation and would otherwise be
    /// skipped by the host. As a side effect the host places the minor
    /// back into the home location, so hiding must happen after this.
    fn refresh_minor_for_new_day(&mut self, name: &str);

    /// Names of every actor the host knows about, for collision checks
    fn actor_names(&self) -> Vec<String>;

    /// Find an actor by name within one location
    fn find_actor(&self, location: &LocationId, name: &str) -> Option<ActorId>;

    /// Remove an actor from a location's list, preserving the relative
    /// order of the remaining actors. Returns false when absent.
    fn remove_actor(&mut self, location: &LocationId, actor: ActorId) -> bool;

    /// Append an actor to a location's list at the given position
    fn insert_actor(&mut self, location: &LocationId, actor: ActorId, name: &str, position: TilePoint);

    /// The tile an actor stands on just after entering the location
    fn entry_point(&self, location: &LocationId) -> TilePoint;

    /// Default bed tile the host would assign a minor of this gender,
    /// used when no slot is assignable
    fn fallback_bed_point(&self, gender: Gender) -> TilePoint;

    /// The transfer point an actor should walk to in order to head home
    /// from wherever its current route network leads
    fn transfer_point_toward_home(&self) -> (LocationId, TilePoint);

    /// Home location of a named guardian, if the host knows one
    fn home_of_guardian(&self, guardian: &str) -> Option<LocationId>;

    /// Name of the owning player's current partner, if any
    fn player_partner(&self) -> Option<String>;

    fn current_time(&self) -> SimTime;

    fn is_world_loaded(&self) -> bool;
}

/// The host's pathfinding capability
pub trait Pathfinder {
    /// Compute a route for an actor inside `location`. Fails with
    /// `UnreachableDestination` when no route exists.
    fn compute_route(
        &mut self,
        actor: ActorId,
        location: &LocationId,
        destination: TilePoint,
        arrival: ArrivalBehavior,
    ) -> Result<RouteHandle>;

    /// A random open, routable tile in the location, or None when the
    /// search gives up within `search_radius` attempts
    fn open_point_near(&mut self, location: &LocationId, search_radius: u32) -> Option<TilePoint>;
}

/// Refresh payload produced by the external content source once the
/// consumer-side assets for a proxy have loaded
#[derive(Debug, Clone)]
pub struct ContentRefresh {
    pub appearance: VisualDescriptor,
    /// Optional override for the proxy's default position
    pub home_anchor: Option<TilePoint>,
}

/// External content source for proxy appearance data
///
/// Content is loaded by a third party and may not be ready yet; the
/// engine retries once per periodic tick until it is.
pub trait ContentSource {
    fn load_refresh(&self, proxy_name: &str) -> Result<ContentRefresh>;
}

/// Name-keyed store of relationship/gift-progress records
///
/// Records are opaque to the engine: they are migrated between minor and
/// proxy keys without ever being interpreted. Duplicate keys corrupt the
/// host's save format, so insertion on an occupied key overwrites and
/// logs rather than duplicating.
#[derive(Debug, Default)]
pub struct RelationshipStore {
    entries: AHashMap<String, Value>,
}

impl RelationshipStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.entries.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Insert a record, overwriting any existing entry for the key.
    /// Returns true when an entry was overwritten.
    pub fn insert_or_overwrite(&mut self, name: &str, record: Value) -> bool {
        let overwrote = self.entries.insert(name.to_string(), record).is_some();
        if overwrote {
            tracing::error!(
                "Relationship record already present for \"{}\", overwriting to avoid a duplicate key",
                name
            );
        }
        overwrote
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
