//! Line-of-sight queries.
//!
//! Every query is a fresh, synchronous ray cast against the physics world; nothing is cached
//! between calls. The closest fixture that is neither a sensor nor excluded decides the result.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use ai_core::{wrap_angle, Vec2};

use crate::physics::{BodyHandle, Owner, RayCaster, RayHit, RayResponse};

/// Semantic classification of a ray's closest hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum HitKind {
    /// Nothing relevant was hit (or a generic solid blocked the ray, see [`SolidPolicy::Block`]).
    #[default]
    None,
    Wall,
    Target,
}

/// How solids that are neither scenery nor the target are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SolidPolicy {
    /// Other agents and props do not obstruct perception.
    #[default]
    SeeThrough,
    /// The closest generic solid ends the ray with [`HitKind::None`].
    Block,
}

/// Which fixtures a query looks through and which it classifies as the target.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VisibilityFilter {
    source: Option<BodyHandle>,
    target: Option<BodyHandle>,
    ignored: Vec<BodyHandle>,
    solids: SolidPolicy,
}

impl VisibilityFilter {
    /// Looks through the casting body itself.
    pub fn from_source(source: BodyHandle) -> Self {
        Self {
            source: Some(source),
            ..Self::default()
        }
    }

    /// Classifies `body` as [`HitKind::Target`] in addition to fixtures owned by the target.
    pub fn with_target(mut self, body: BodyHandle) -> Self {
        self.target = Some(body);
        self
    }

    pub fn ignoring(mut self, body: BodyHandle) -> Self {
        self.ignored.push(body);
        self
    }

    pub fn blocking_solids(mut self) -> Self {
        self.solids = SolidPolicy::Block;
        self
    }

    pub fn solids(&self) -> SolidPolicy {
        self.solids
    }

    pub fn excludes(&self, body: BodyHandle) -> bool {
        self.source == Some(body) || self.ignored.contains(&body)
    }

    /// `None` means the hit is looked through.
    fn classify(&self, hit: &RayHit) -> Option<HitKind> {
        if hit.shape.is_sensor || self.excludes(hit.shape.body) {
            return None;
        }
        if self.target == Some(hit.shape.body) || hit.shape.owner == Some(Owner::Target) {
            return Some(HitKind::Target);
        }
        if hit.shape.owner == Some(Owner::Scenery) {
            return Some(HitKind::Wall);
        }
        match self.solids {
            SolidPolicy::SeeThrough => None,
            SolidPolicy::Block => Some(HitKind::None),
        }
    }
}

/// Outcome of one ray.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Visibility {
    /// Whether any relevant fixture was hit.
    pub hit: bool,
    /// Closest hit point, or the ray's far end on a miss.
    pub point: Vec2,
    pub kind: HitKind,
    /// Body of the closest relevant fixture.
    pub body: Option<BodyHandle>,
    /// Position of `point` along the ray, in `[0, 1]`.
    pub fraction: f32,
}

impl Visibility {
    fn miss(end: Vec2) -> Self {
        Self {
            hit: false,
            point: end,
            kind: HitKind::None,
            body: None,
            fraction: 1.0,
        }
    }

    pub fn sees_target(&self) -> bool {
        self.kind == HitKind::Target
    }

    pub fn sees_wall(&self) -> bool {
        self.kind == HitKind::Wall
    }
}

/// Casts a ray from `from` to `to` and reports the closest relevant hit.
pub fn cast_segment(
    world: &dyn RayCaster,
    from: Vec2,
    to: Vec2,
    filter: &VisibilityFilter,
) -> Visibility {
    let mut best = Visibility::miss(to);
    if !from.is_finite() || !to.is_finite() {
        return best;
    }

    world.ray_cast(from, to, &mut |hit: &RayHit| {
        let Some(kind) = filter.classify(hit) else {
            return RayResponse::Ignore;
        };
        if !best.hit || hit.fraction < best.fraction {
            best = Visibility {
                hit: true,
                point: hit.point,
                kind,
                body: Some(hit.shape.body),
                fraction: hit.fraction,
            };
        }
        RayResponse::Clip
    });
    best
}

/// Casts `max_distance` along `heading` (radians).
pub fn cast_heading(
    world: &dyn RayCaster,
    from: Vec2,
    heading: f32,
    max_distance: f32,
    filter: &VisibilityFilter,
) -> Visibility {
    let end = from + Vec2::from_angle(heading) * max_distance.max(0.0);
    cast_segment(world, from, end, filter)
}

/// Casts `max_distance` from `from` toward `target`.
///
/// The ray is not stopped at `target`: the caller learns what the closest thing in that direction
/// is. A target point further away than `max_distance` is therefore never reached.
pub fn cast_at(
    world: &dyn RayCaster,
    from: Vec2,
    target: Vec2,
    max_distance: f32,
    filter: &VisibilityFilter,
) -> Visibility {
    match (target - from).try_normalize() {
        Some(direction) => cast_segment(world, from, from + direction * max_distance.max(0.0), filter),
        None => Visibility::miss(from),
    }
}

/// A fan of rays used as a field of view.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VisionCone {
    /// Center direction in radians.
    pub heading: f32,
    /// Full opening angle in radians.
    pub fov: f32,
    /// Number of rays; `1` casts along the heading only.
    pub rays: u16,
    pub range: f32,
}

impl VisionCone {
    /// Ray directions, evenly spread from `heading - fov/2` to `heading + fov/2`.
    pub fn headings(&self) -> impl Iterator<Item = f32> + '_ {
        let rays = self.rays.max(1);
        let fov = self.fov.max(0.0);
        let step = if rays > 1 {
            fov / f32::from(rays - 1)
        } else {
            0.0
        };
        let first = if rays > 1 {
            self.heading - fov * 0.5
        } else {
            self.heading
        };
        (0..rays).map(move |i| wrap_angle(first + step * f32::from(i)))
    }
}

/// Per-ray results of a cone scan.
#[derive(Debug, Clone, PartialEq)]
pub struct ConeScan {
    /// Whether any ray's closest hit was the target.
    pub seen: bool,
    /// Hit point of the first ray that saw the target.
    pub target_point: Option<Vec2>,
    /// One entry per ray, in heading order. Useful for debug drawing.
    pub rays: Vec<Visibility>,
}

pub fn scan_cone(
    world: &dyn RayCaster,
    origin: Vec2,
    cone: &VisionCone,
    filter: &VisibilityFilter,
) -> ConeScan {
    let rays: Vec<Visibility> = cone
        .headings()
        .map(|heading| cast_heading(world, origin, heading, cone.range, filter))
        .collect();
    let target_point = rays.iter().find(|r| r.sees_target()).map(|r| r.point);
    ConeScan {
        seen: target_point.is_some(),
        target_point,
        rays,
    }
}
