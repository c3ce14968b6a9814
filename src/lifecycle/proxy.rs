//! The proxy actor type
//!
//! A proxy is created and exclusively owned by the engine once its minor
//! crosses the promotion age. It carries its own movement-controller
//! handles; a handle is replaced wholesale on each state transition and
//! never mutated in place.

use ahash::AHashSet;

use crate::core::types::{ActorId, Gender, LocationId, TilePoint};
use crate::host::{RouteHandle, VisualDescriptor};

#[derive(Debug, Clone)]
pub struct Proxy {
    pub id: ActorId,
    /// Actor name, disambiguated against every other actor at creation
    pub name: String,
    /// The minor's own name, shown to players regardless of disambiguation
    pub display_name: String,
    pub gender: Gender,
    pub home: LocationId,
    /// Location the proxy is currently placed in
    pub location: LocationId,
    /// Assigned bed slot, or the host fallback when no slot was assignable
    pub default_position: TilePoint,
    pub position: TilePoint,
    pub appearance: VisualDescriptor,
    controller: Option<RouteHandle>,
    temporary_controller: Option<RouteHandle>,
}

impl Proxy {
    pub fn new(
        id: ActorId,
        name: String,
        display_name: String,
        gender: Gender,
        home: LocationId,
        default_position: TilePoint,
        appearance: VisualDescriptor,
    ) -> Self {
        Self {
            id,
            name,
            display_name,
            gender,
            location: home.clone(),
            home,
            default_position,
            position: default_position,
            appearance,
            controller: None,
            temporary_controller: None,
        }
    }

    /// Assign the primary controller, clearing any previous movement
    /// intent first so two controllers never compete.
    pub fn assign_primary(&mut self, route: RouteHandle) {
        self.clear_controllers();
        self.controller = Some(route);
    }

    /// Assign the temporary controller, clearing any previous movement
    /// intent first.
    pub fn assign_temporary(&mut self, route: RouteHandle) {
        self.clear_controllers();
        self.temporary_controller = Some(route);
    }

    pub fn clear_controllers(&mut self) {
        self.controller = None;
        self.temporary_controller = None;
    }

    pub fn controller(&self) -> Option<&RouteHandle> {
        self.controller.as_ref()
    }

    pub fn temporary_controller(&self) -> Option<&RouteHandle> {
        self.temporary_controller.as_ref()
    }

    /// The controller currently steering the actor, temporary first
    pub fn active_route(&self) -> Option<&RouteHandle> {
        self.temporary_controller.as_ref().or(self.controller.as_ref())
    }

    pub fn has_controller(&self) -> bool {
        self.controller.is_some() || self.temporary_controller.is_some()
    }

    pub fn is_at_home(&self) -> bool {
        self.location == self.home
    }
}

/// Pick an actor name for a proxy: the minor's own name when free,
/// otherwise padded until it no longer collides. The display name stays
/// the unpadded minor name.
pub fn disambiguate_name(base: &str, taken: &AHashSet<String>) -> String {
    let mut name = base.to_string();
    while taken.contains(&name) {
        name.push(' ');
    }
    name
}
