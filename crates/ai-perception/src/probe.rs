//! Wall and ledge guard used before committing to a step.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use ai_core::Vec2;

use crate::physics::{BodyHandle, RayCaster};
use crate::visibility::{cast_segment, VisibilityFilter};

/// Geometry of the two guard rays, relative to the agent's position.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct StepProbe {
    /// How far ahead walls and ledges are looked for.
    pub look_ahead: f32,
    /// Distance from the agent's position down to its feet.
    pub foot_offset: f32,
    /// How far below the feet ground may be and still count as walkable.
    pub drop_tolerance: f32,
}

impl Default for StepProbe {
    fn default() -> Self {
        Self {
            look_ahead: 0.75,
            foot_offset: 0.5,
            drop_tolerance: 0.4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepReport {
    pub wall_ahead: bool,
    pub ground_ahead: bool,
}

impl StepReport {
    pub fn is_safe(&self) -> bool {
        !self.wall_ahead && self.ground_ahead
    }
}

impl StepProbe {
    /// Probes in the horizontal `direction` (its sign; `0` counts as right).
    pub fn probe(
        &self,
        world: &dyn RayCaster,
        body: BodyHandle,
        position: Vec2,
        direction: f32,
    ) -> StepReport {
        let sign = if direction < 0.0 { -1.0 } else { 1.0 };
        let filter = VisibilityFilter::from_source(body);
        let ahead = Vec2::new(position.x + sign * self.look_ahead, position.y);

        let wall = cast_segment(world, position, ahead, &filter);
        let below = Vec2::new(ahead.x, position.y - self.foot_offset - self.drop_tolerance);
        let ground = cast_segment(world, ahead, below, &filter);

        StepReport {
            wall_ahead: wall.sees_wall(),
            ground_ahead: ground.sees_wall(),
        }
    }
}
