//! The slice of the physics engine that perception consumes.
//!
//! Nothing here owns bodies or steps a simulation. Adapters for a concrete engine implement
//! [`RayCaster`] and describe each fixture with a [`ShapeTag`] when forwarding collision callbacks.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use ai_core::{AgentId, Vec2};

/// Opaque handle of a physics body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BodyHandle(pub u64);

/// What a fixture is for, as tagged by the game when the body was built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum ShapeRole {
    /// The physical hull of a body.
    Solid,
    /// Below an agent's feet; overlaps scenery while standing.
    GroundSensor,
    /// An agent's field of view.
    VisionSensor,
    /// Range in which an agent keeps following the target.
    FollowSensor,
    /// Around the player; agents inside it can be harvested.
    HarvestSensor,
    /// Ahead of an agent's body; overlaps walls it is about to walk into.
    WalkSensor,
}

impl ShapeRole {
    pub fn is_sensor_role(self) -> bool {
        !matches!(self, ShapeRole::Solid)
    }
}

/// Back-reference from a fixture to the game entity owning it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Owner {
    Agent(AgentId),
    /// The player character.
    Target,
    /// Static level geometry: walls, floors, platforms.
    Scenery,
    /// Anything else with a body (props, projectiles, pickups).
    Prop,
}

/// Description of one fixture, as reported by ray casts and contact callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ShapeTag {
    pub body: BodyHandle,
    pub role: ShapeRole,
    /// Sensors report overlaps but never block rays.
    pub is_sensor: bool,
    /// `None` when the game forgot to attach an owner; such contacts are dropped.
    pub owner: Option<Owner>,
}

impl ShapeTag {
    pub fn solid(body: BodyHandle, owner: Owner) -> Self {
        Self {
            body,
            role: ShapeRole::Solid,
            is_sensor: false,
            owner: Some(owner),
        }
    }

    pub fn sensor(body: BodyHandle, role: ShapeRole, owner: Owner) -> Self {
        Self {
            body,
            role,
            is_sensor: true,
            owner: Some(owner),
        }
    }

    pub fn owner_agent(&self) -> Option<AgentId> {
        match self.owner {
            Some(Owner::Agent(id)) => Some(id),
            _ => None,
        }
    }
}

/// A fixture crossed by a ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub shape: ShapeTag,
    pub point: Vec2,
    /// Position along the ray in `[0, 1]`, from start to end.
    pub fraction: f32,
}

/// How a ray-cast visitor responds to a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RayResponse {
    /// Pretend the fixture is not there.
    Ignore,
    /// Accept the hit and shorten the ray to it; only closer hits are reported afterwards.
    Clip,
    /// Stop the query.
    Terminate,
}

/// Synchronous ray queries against the current physics state.
///
/// Hits may be reported in any order. Implementations must honor [`RayResponse`].
pub trait RayCaster {
    fn ray_cast(&self, start: Vec2, end: Vec2, visit: &mut dyn FnMut(&RayHit) -> RayResponse);
}

impl<T: RayCaster + ?Sized> RayCaster for &T {
    fn ray_cast(&self, start: Vec2, end: Vec2, visit: &mut dyn FnMut(&RayHit) -> RayResponse) {
        (**self).ray_cast(start, end, visit)
    }
}

/// A world without geometry. Every ray misses.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyWorld;

impl RayCaster for EmptyWorld {
    fn ray_cast(&self, _start: Vec2, _end: Vec2, _visit: &mut dyn FnMut(&RayHit) -> RayResponse) {}
}
