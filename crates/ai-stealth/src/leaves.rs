//! Condition and action leaves shared by every species tree.
//!
//! Leaves only talk to the agent through its public surface and to the world through
//! [`StealthEnv`](crate::StealthEnv). Optional parameters fall back to the agent's species
//! profile at run time, so one template works for any tuning.

use std::borrow::Cow;

use ai_bt::{BtAction, BtStatus, LeafExit};
use ai_core::{turn_towards, wrap_angle, DeterministicRng, Vec2};
use ai_perception::{scan_cone, VisibilityFilter};

use crate::agent::{Agent, AwareMode};
use crate::ports::{StealthCtx, StealthDomain, StealthNode, TargetInfo};

type Name = Cow<'static, str>;

const CHANCE_STREAM: u64 = 0x57A2_E000_0000_0001;

/// Horizontal distance under which a chaser stops closing in.
const ARRIVE_DISTANCE: f32 = 0.05;

fn target(cx: &StealthCtx<'_>) -> Option<TargetInfo> {
    cx.env.scene.target()
}

fn direction_to(agent: &Agent, point: Vec2) -> f32 {
    let dx = point.x - agent.position().x;
    if dx.abs() <= ARRIVE_DISTANCE {
        0.0
    } else {
        dx.signum()
    }
}

// ---- conditions ---------------------------------------------------------------------------------

pub fn is_aware(name: impl Into<Name>) -> StealthNode {
    StealthNode::condition(name, |cx| cx.agent.is_aware())
}

pub fn is_alerted(name: impl Into<Name>) -> StealthNode {
    StealthNode::condition(name, |cx| cx.agent.is_alerted())
}

pub fn alert_complete(name: impl Into<Name>) -> StealthNode {
    StealthNode::condition(name, |cx| cx.agent.alert_complete())
}

pub fn sees_wall(name: impl Into<Name>) -> StealthNode {
    StealthNode::condition(name, |cx| cx.agent.sees_wall())
}

pub fn in_follow_range(name: impl Into<Name>) -> StealthNode {
    StealthNode::condition(name, |cx| cx.agent.in_follow_range())
}

pub fn in_harvest_zone(name: impl Into<Name>) -> StealthNode {
    StealthNode::condition(name, |cx| cx.agent.in_harvest_zone())
}

pub fn is_grounded(name: impl Into<Name>) -> StealthNode {
    StealthNode::condition(name, |cx| cx.agent.is_grounded())
}

pub fn attack_ready(name: impl Into<Name>) -> StealthNode {
    StealthNode::condition(name, |cx| cx.agent.attack_ready())
}

/// Target closer than `range` (default: the species' attack range).
pub fn target_within(name: impl Into<Name>, range: Option<f32>) -> StealthNode {
    StealthNode::condition(name, move |cx| {
        let range = range.unwrap_or(cx.agent.profile().attack_range);
        target(cx).is_some_and(|t| t.position.distance(cx.agent.position()) <= range)
    })
}

/// Line of sight through the agent's vision cone: at least one ray's closest hit is the target.
pub fn can_see_target(name: impl Into<Name>) -> StealthNode {
    StealthNode::condition(name, |cx| {
        let Some(target) = target(cx) else {
            return false;
        };
        let agent = &*cx.agent;
        let cone = agent.profile().vision.cone(agent.vision_heading());
        let filter = VisibilityFilter::from_source(agent.body()).with_target(target.body);
        scan_cone(cx.env.physics, agent.position(), &cone, &filter).seen
    })
}

pub fn point_of_interest_near(name: impl Into<Name>, radius: Option<f32>) -> StealthNode {
    StealthNode::condition(name, move |cx| {
        let radius = radius.unwrap_or(cx.agent.profile().curiosity_radius);
        cx.env
            .scene
            .point_of_interest_near(cx.agent.position(), radius)
            .is_some()
    })
}

/// Another agent within `radius` is stunned.
pub fn ally_stunned_near(name: impl Into<Name>, radius: Option<f32>) -> StealthNode {
    StealthNode::condition(name, move |cx| {
        let me = cx.agent.id();
        let position = cx.agent.position();
        let radius = radius.unwrap_or(cx.agent.profile().ally_radius);
        cx.env
            .allies
            .iter()
            .any(|a| a.id != me && a.stunned && a.position.distance(position) <= radius)
    })
}

/// Succeeds with probability `p` (default: the species' stare chance). Rolls are deterministic
/// per (seed, frame, agent).
pub fn chance(name: impl Into<Name>, p: Option<f32>) -> StealthNode {
    StealthNode::condition(name, move |cx| {
        let p = p.unwrap_or(cx.agent.profile().stare_chance);
        cx.tick
            .rng_for_agent(cx.agent.id(), CHANCE_STREAM)
            .chance(p)
    })
}

// ---- actions ------------------------------------------------------------------------------------

/// Walks back and forth, turning at walls and ledges.
///
/// Runs for `ticks` agent ticks per leg (`0`: until interrupted), then turns around and succeeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct Patrol {
    pub speed: Option<f32>,
    pub ticks: Option<u32>,
}

#[derive(Debug, Default)]
pub struct PatrolState {
    elapsed: u32,
    wall_seen: bool,
}

impl BtAction<StealthDomain> for Patrol {
    type State = PatrolState;

    fn start(&self, cx: &mut StealthCtx<'_>, state: &mut PatrolState) {
        state.wall_seen = cx.agent.sees_wall();
    }

    fn execute(&self, cx: &mut StealthCtx<'_>, state: &mut PatrolState) -> BtStatus {
        let physics = cx.env.physics;
        let agent = &mut *cx.agent;
        let speed = self.speed.unwrap_or(agent.profile().patrol_speed);
        let leg = self.ticks.unwrap_or(agent.profile().patrol_ticks);

        // Turn on a new wall contact only; the count stays up while the sensor still overlaps.
        let wall = agent.sees_wall();
        let new_wall = wall && !state.wall_seen;
        state.wall_seen = wall;

        if new_wall || !agent.is_safe_to_advance(physics) {
            agent.reverse();
        }
        if !agent.is_safe_to_advance(physics) {
            agent.set_movement(0.0);
        } else {
            agent.set_movement(agent.facing().sign() * speed);
        }
        agent.set_vision_heading(agent.facing().heading());

        state.elapsed += 1;
        if leg > 0 && state.elapsed >= leg {
            agent.reverse();
            return BtStatus::Success;
        }
        BtStatus::Running
    }
}

/// Stands still for `ticks` agent ticks (`0`: until interrupted).
#[derive(Debug, Clone, Copy, Default)]
pub struct Hold {
    pub ticks: u32,
}

#[derive(Debug, Default)]
pub struct HoldState {
    elapsed: u32,
}

impl BtAction<StealthDomain> for Hold {
    type State = HoldState;

    fn execute(&self, cx: &mut StealthCtx<'_>, state: &mut HoldState) -> BtStatus {
        cx.agent.set_movement(0.0);
        state.elapsed += 1;
        if self.ticks > 0 && state.elapsed >= self.ticks {
            BtStatus::Success
        } else {
            BtStatus::Running
        }
    }
}

/// Freezes and looks at the target while the alert runs out.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlertHold;

impl BtAction<StealthDomain> for AlertHold {
    type State = ();

    fn execute(&self, cx: &mut StealthCtx<'_>, _state: &mut ()) -> BtStatus {
        let target = target(cx);
        let agent = &mut *cx.agent;
        if !agent.is_aware() {
            return BtStatus::Failure;
        }
        agent.set_movement(0.0);
        if let Some(target) = target {
            agent.face_towards(target.position);
            agent.set_vision_heading((target.position - agent.position()).angle());
        }
        if agent.alert_complete() {
            BtStatus::Success
        } else {
            BtStatus::Running
        }
    }
}

/// Runs at the target, jumping over walls in the way.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pursue;

impl BtAction<StealthDomain> for Pursue {
    type State = ();

    fn start(&self, cx: &mut StealthCtx<'_>, _state: &mut ()) {
        cx.agent.commit_awareness(AwareMode::Pursuing);
    }

    fn execute(&self, cx: &mut StealthCtx<'_>, _state: &mut ()) -> BtStatus {
        let physics = cx.env.physics;
        let Some(target) = target(cx) else {
            return BtStatus::Failure;
        };
        let agent = &mut *cx.agent;
        if !agent.commit_awareness(AwareMode::Pursuing) {
            return BtStatus::Failure;
        }

        agent.set_vision_heading((target.position - agent.position()).angle());
        let direction = direction_to(agent, target.position);
        if direction == 0.0 {
            agent.set_movement(0.0);
            return BtStatus::Running;
        }

        let report = agent.probe_step(physics, direction);
        if report.wall_ahead || agent.sees_wall() {
            agent.set_movement(direction);
            agent.set_jump(agent.is_grounded());
        } else if agent.is_grounded() && !report.ground_ahead {
            agent.face_towards(target.position);
            agent.set_movement(0.0);
        } else {
            agent.set_movement(direction);
        }
        BtStatus::Running
    }
}

/// Runs away from the target; stops when cornered at a ledge.
#[derive(Debug, Clone, Copy, Default)]
pub struct Flee;

impl BtAction<StealthDomain> for Flee {
    type State = ();

    fn start(&self, cx: &mut StealthCtx<'_>, _state: &mut ()) {
        cx.agent.commit_awareness(AwareMode::Fleeing);
    }

    fn execute(&self, cx: &mut StealthCtx<'_>, _state: &mut ()) -> BtStatus {
        let physics = cx.env.physics;
        let Some(target) = target(cx) else {
            return BtStatus::Failure;
        };
        let agent = &mut *cx.agent;
        if !agent.commit_awareness(AwareMode::Fleeing) {
            return BtStatus::Failure;
        }

        let toward = direction_to(agent, target.position);
        let away = if toward == 0.0 {
            agent.facing().sign()
        } else {
            -toward
        };
        let report = agent.probe_step(physics, away);
        if report.wall_ahead || agent.sees_wall() {
            agent.set_movement(away);
            agent.set_jump(agent.is_grounded());
        } else if agent.is_grounded() && !report.ground_ahead {
            agent.set_movement(0.0);
        } else {
            agent.set_movement(away);
        }
        agent.set_vision_heading(agent.facing().heading());
        BtStatus::Running
    }
}

/// Turns the vision cone towards the target. Succeeds once the target lies inside the cone.
#[derive(Debug, Clone, Copy, Default)]
pub struct Track;

impl BtAction<StealthDomain> for Track {
    type State = ();

    fn execute(&self, cx: &mut StealthCtx<'_>, _state: &mut ()) -> BtStatus {
        let Some(target) = target(cx) else {
            return BtStatus::Failure;
        };
        let agent = &mut *cx.agent;
        if !agent.commit_awareness(AwareMode::Stationary) {
            return BtStatus::Failure;
        }
        agent.set_movement(0.0);
        agent.face_towards(target.position);

        let vision = agent.profile().vision;
        let desired = (target.position - agent.position()).angle();
        agent.set_vision_heading(turn_towards(agent.vision_heading(), desired, vision.turn_rate));
        if wrap_angle(desired - agent.vision_heading()).abs() <= vision.fov * 0.5 {
            BtStatus::Success
        } else {
            BtStatus::Running
        }
    }
}

/// Requests an attack. Fails while the cooldown is running.
#[derive(Debug, Clone, Copy, Default)]
pub struct Attack;

impl BtAction<StealthDomain> for Attack {
    type State = ();

    fn execute(&self, cx: &mut StealthCtx<'_>, _state: &mut ()) -> BtStatus {
        if let Some(target) = target(cx) {
            cx.agent.face_towards(target.position);
        }
        if cx.agent.trigger_attack() {
            BtStatus::Success
        } else {
            BtStatus::Failure
        }
    }
}

/// Swings the vision cone back and forth around the facing direction. Never finishes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sweep;

#[derive(Debug)]
pub struct SweepState {
    direction: f32,
}

impl Default for SweepState {
    fn default() -> Self {
        Self { direction: 1.0 }
    }
}

impl BtAction<StealthDomain> for Sweep {
    type State = SweepState;

    fn execute(&self, cx: &mut StealthCtx<'_>, state: &mut SweepState) -> BtStatus {
        let agent = &mut *cx.agent;
        agent.set_movement(0.0);
        let vision = agent.profile().vision;
        let center = agent.facing().heading();
        let goal = center + state.direction * vision.sweep;
        let heading = turn_towards(agent.vision_heading(), goal, vision.turn_rate);
        agent.set_vision_heading(heading);
        if wrap_angle(goal - heading).abs() <= 1e-3 && vision.sweep > 0.0 {
            state.direction = -state.direction;
        }
        BtStatus::Running
    }
}

/// Stops and stares at the nearest point of interest for `ticks` agent ticks.
#[derive(Debug, Clone, Copy, Default)]
pub struct Stare {
    pub ticks: Option<u32>,
    pub radius: Option<f32>,
}

#[derive(Debug, Default)]
pub struct StareState {
    elapsed: u32,
}

impl BtAction<StealthDomain> for Stare {
    type State = StareState;

    fn execute(&self, cx: &mut StealthCtx<'_>, state: &mut StareState) -> BtStatus {
        let scene = cx.env.scene;
        let agent = &mut *cx.agent;
        let radius = self.radius.unwrap_or(agent.profile().curiosity_radius);
        let Some(point) = scene.point_of_interest_near(agent.position(), radius) else {
            return BtStatus::Failure;
        };
        agent.set_movement(0.0);
        agent.face_towards(point);
        agent.set_vision_heading((point - agent.position()).angle());

        state.elapsed += 1;
        if state.elapsed >= self.ticks.unwrap_or(agent.profile().stare_ticks) {
            BtStatus::Success
        } else {
            BtStatus::Running
        }
    }

    fn end(&self, cx: &mut StealthCtx<'_>, _state: &mut StareState, exit: LeafExit) {
        if exit == LeafExit::Aborted {
            let agent = &mut *cx.agent;
            agent.set_vision_heading(agent.facing().heading());
        }
    }
}
