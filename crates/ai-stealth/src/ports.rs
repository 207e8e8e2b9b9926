//! What a species tree may read besides its own agent.

use ai_bt::{BtCtx, BtDomain, BtInstance, BtTemplate, Node};
use ai_core::{AgentId, Vec2};
use ai_perception::{BodyHandle, EmptyWorld, RayCaster};

use crate::agent::Agent;
use crate::species::Species;

/// Where the player character is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetInfo {
    pub position: Vec2,
    pub body: BodyHandle,
}

/// Scene queries the game answers for the agents.
pub trait TargetLocator {
    /// `None` while there is no player in the level (death, transitions).
    fn target(&self) -> Option<TargetInfo>;

    /// A point worth staring at within `radius` of `center`, if any.
    fn point_of_interest_near(&self, _center: Vec2, _radius: f32) -> Option<Vec2> {
        None
    }
}

/// A scene with no player.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTarget;

impl TargetLocator for NoTarget {
    fn target(&self) -> Option<TargetInfo> {
        None
    }
}

/// A fixed scene, for tests and tools.
#[derive(Debug, Clone, Default)]
pub struct StaticScene {
    pub target: Option<TargetInfo>,
    pub points_of_interest: Vec<Vec2>,
}

impl StaticScene {
    pub fn with_target(position: Vec2, body: BodyHandle) -> Self {
        Self {
            target: Some(TargetInfo { position, body }),
            points_of_interest: Vec::new(),
        }
    }

    pub fn with_point_of_interest(mut self, point: Vec2) -> Self {
        self.points_of_interest.push(point);
        self
    }
}

impl TargetLocator for StaticScene {
    fn target(&self) -> Option<TargetInfo> {
        self.target
    }

    fn point_of_interest_near(&self, center: Vec2, radius: f32) -> Option<Vec2> {
        self.points_of_interest
            .iter()
            .copied()
            .filter(|p| p.distance(center) <= radius)
            .min_by(|a, b| a.distance(center).total_cmp(&b.distance(center)))
    }
}

/// Read-only view of another agent, taken at the start of an update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AllyView {
    pub id: AgentId,
    pub species: Species,
    pub position: Vec2,
    pub stunned: bool,
}

impl AllyView {
    pub fn of(agent: &Agent) -> Self {
        Self {
            id: agent.id(),
            species: agent.species(),
            position: agent.position(),
            stunned: agent.is_stunned(),
        }
    }
}

/// Environment of one tree step.
#[derive(Clone, Copy)]
pub struct StealthEnv<'e> {
    pub physics: &'e dyn RayCaster,
    pub scene: &'e dyn TargetLocator,
    pub allies: &'e [AllyView],
}

static EMPTY_WORLD: EmptyWorld = EmptyWorld;
static NO_TARGET: NoTarget = NoTarget;

impl StealthEnv<'static> {
    /// An environment without physics or target, used to halt trees outside of an update.
    pub fn detached() -> Self {
        Self {
            physics: &EMPTY_WORLD,
            scene: &NO_TARGET,
            allies: &[],
        }
    }
}

impl<'e> StealthEnv<'e> {
    pub fn new(physics: &'e dyn RayCaster, scene: &'e dyn TargetLocator) -> Self {
        Self {
            physics,
            scene,
            allies: &[],
        }
    }

    pub fn with_allies(mut self, allies: &'e [AllyView]) -> Self {
        self.allies = allies;
        self
    }
}

/// Binds the behavior tree engine to [`Agent`] and [`StealthEnv`].
#[derive(Debug, Clone, Copy)]
pub enum StealthDomain {}

impl BtDomain for StealthDomain {
    type Agent = Agent;
    type Env<'e> = StealthEnv<'e>;
}

pub type StealthNode = Node<StealthDomain>;
pub type StealthCtx<'a> = BtCtx<'a, StealthDomain>;
pub type StealthTemplate = BtTemplate<StealthDomain>;
pub type StealthTree = BtInstance<StealthDomain>;
