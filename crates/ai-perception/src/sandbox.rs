//! A tiny box world for tests and headless runs.

use ai_core::Vec2;

use crate::physics::{BodyHandle, Owner, RayCaster, RayHit, RayResponse, ShapeRole, ShapeTag};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    pub fn new(a: Vec2, b: Vec2) -> Self {
        Self {
            min: Vec2::new(a.x.min(b.x), a.y.min(b.y)),
            max: Vec2::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    pub fn centered(center: Vec2, half_extents: Vec2) -> Self {
        Self::new(center - half_extents, center + half_extents)
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// Entry fraction of the segment `start..end`, `0` when starting inside.
    pub fn ray_fraction(&self, start: Vec2, end: Vec2) -> Option<f32> {
        let d = end - start;
        let mut t_min = 0.0_f32;
        let mut t_max = 1.0_f32;
        for (s, dir, lo, hi) in [
            (start.x, d.x, self.min.x, self.max.x),
            (start.y, d.y, self.min.y, self.max.y),
        ] {
            if dir.abs() < f32::EPSILON {
                if s < lo || s > hi {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / dir;
            let (mut t1, mut t2) = ((lo - s) * inv, (hi - s) * inv);
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }
            t_min = t_min.max(t1);
            t_max = t_max.min(t2);
            if t_min > t_max {
                return None;
            }
        }
        Some(t_min)
    }
}

/// Axis-aligned fixtures, reported to ray casts in insertion order.
#[derive(Debug, Clone, Default)]
pub struct BoxWorld {
    shapes: Vec<(Aabb, ShapeTag)>,
}

impl BoxWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, bounds: Aabb, tag: ShapeTag) -> &mut Self {
        self.shapes.push((bounds, tag));
        self
    }

    pub fn add_wall(&mut self, body: BodyHandle, bounds: Aabb) -> &mut Self {
        self.add(bounds, ShapeTag::solid(body, Owner::Scenery))
    }

    pub fn add_target(&mut self, body: BodyHandle, bounds: Aabb) -> &mut Self {
        self.add(bounds, ShapeTag::solid(body, Owner::Target))
    }

    pub fn add_sensor(
        &mut self,
        body: BodyHandle,
        role: ShapeRole,
        owner: Owner,
        bounds: Aabb,
    ) -> &mut Self {
        self.add(bounds, ShapeTag::sensor(body, role, owner))
    }

    /// Moves every fixture of `body` by `offset`.
    pub fn translate(&mut self, body: BodyHandle, offset: Vec2) {
        for (bounds, tag) in &mut self.shapes {
            if tag.body == body {
                bounds.min += offset;
                bounds.max += offset;
            }
        }
    }

    pub fn remove_body(&mut self, body: BodyHandle) {
        self.shapes.retain(|(_, tag)| tag.body != body);
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}

impl RayCaster for BoxWorld {
    fn ray_cast(&self, start: Vec2, end: Vec2, visit: &mut dyn FnMut(&RayHit) -> RayResponse) {
        let mut clip = 1.0_f32;
        for (bounds, tag) in &self.shapes {
            let Some(fraction) = bounds.ray_fraction(start, end) else {
                continue;
            };
            if fraction > clip {
                continue;
            }
            let hit = RayHit {
                shape: *tag,
                point: start.lerp(end, fraction),
                fraction,
            };
            match visit(&hit) {
                RayResponse::Ignore => {}
                RayResponse::Clip => clip = fraction,
                RayResponse::Terminate => return,
            }
        }
    }
}
