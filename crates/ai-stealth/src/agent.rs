//! The per-enemy state machine.
//!
//! An [`Agent`] owns its perception flags, awareness state, timers and intents. Every species uses
//! the same surface; what a species *does* with it lives in its decision tree. Intents written here
//! are read back by the game's movement code after each update.

use ai_core::{AgentId, Vec2};
use ai_perception::{BodyHandle, PerceptionKind, RayCaster, ShapeRole, StepReport};
use serde::{Deserialize, Serialize};

use crate::config::SpeciesProfile;
use crate::species::Species;
use crate::timers::Countdown;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Facing {
    Left,
    Right,
}

impl Facing {
    /// `-1.0` or `1.0`.
    pub fn sign(self) -> f32 {
        match self {
            Facing::Left => -1.0,
            Facing::Right => 1.0,
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            Facing::Left => Facing::Right,
            Facing::Right => Facing::Left,
        }
    }

    /// Resting heading of the vision cone for this facing.
    pub fn heading(self) -> f32 {
        match self {
            Facing::Left => std::f32::consts::PI,
            Facing::Right => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AwarenessState {
    #[default]
    Idle,
    /// Noticed the target; waiting out the alert before committing to a reaction.
    Alerted,
    AwareStationary,
    AwarePursuing,
    AwareFleeing,
}

/// Reaction a species commits to once its alert is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AwareMode {
    Stationary,
    Pursuing,
    Fleeing,
}

impl AwareMode {
    fn state(self) -> AwarenessState {
        match self {
            AwareMode::Stationary => AwarenessState::AwareStationary,
            AwareMode::Pursuing => AwarenessState::AwarePursuing,
            AwareMode::Fleeing => AwarenessState::AwareFleeing,
        }
    }
}

/// What the agent wants the body to do this frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Intent {
    /// Horizontal movement in `[-1, 1]`.
    pub movement: f32,
    pub jump: bool,
    pub attack: bool,
}

/// Open contacts per sensor role. A flag is set while its count is non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Contacts {
    pub ground: u16,
    pub wall: u16,
    pub sight: u16,
    pub follow: u16,
    pub harvest: u16,
}

impl Contacts {
    pub fn count(&self, role: ShapeRole) -> u16 {
        match role {
            ShapeRole::GroundSensor => self.ground,
            ShapeRole::WalkSensor => self.wall,
            ShapeRole::VisionSensor => self.sight,
            ShapeRole::FollowSensor => self.follow,
            ShapeRole::HarvestSensor => self.harvest,
            ShapeRole::Solid => 0,
        }
    }

    fn slot(&mut self, role: ShapeRole) -> Option<&mut u16> {
        match role {
            ShapeRole::GroundSensor => Some(&mut self.ground),
            ShapeRole::WalkSensor => Some(&mut self.wall),
            ShapeRole::VisionSensor => Some(&mut self.sight),
            ShapeRole::FollowSensor => Some(&mut self.follow),
            ShapeRole::HarvestSensor => Some(&mut self.harvest),
            ShapeRole::Solid => None,
        }
    }
}

/// Serializable snapshot for debug overlays and replays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentStatus {
    pub id: AgentId,
    pub species: Species,
    pub position: Vec2,
    pub facing: Facing,
    pub vision_heading: f32,
    pub intent: Intent,
    pub awareness: AwarenessState,
    pub stunned: bool,
    pub contacts: Contacts,
    pub alert_remaining: u32,
    pub awareness_remaining: u32,
    pub stun_remaining: u32,
    pub cooldown_remaining: u32,
    pub ticks: u64,
}

#[derive(Debug, Clone)]
pub struct Agent {
    id: AgentId,
    species: Species,
    body: BodyHandle,
    profile: SpeciesProfile,
    position: Vec2,
    facing: Facing,
    vision_heading: f32,
    intent: Intent,
    awareness: AwarenessState,
    stunned: bool,
    contacts: Contacts,
    awareness_decay: Countdown,
    alert: Countdown,
    stun: Countdown,
    action_cooldown: Countdown,
    ticks: u64,
    contact_underflows: u32,
}

impl Agent {
    pub fn new(id: AgentId, species: Species, body: BodyHandle, profile: SpeciesProfile) -> Self {
        Self {
            id,
            species,
            body,
            profile,
            position: Vec2::ZERO,
            facing: Facing::Right,
            vision_heading: Facing::Right.heading(),
            intent: Intent::default(),
            awareness: AwarenessState::Idle,
            stunned: false,
            contacts: Contacts::default(),
            awareness_decay: Countdown::idle(),
            alert: Countdown::idle(),
            stun: Countdown::idle(),
            action_cooldown: Countdown::idle(),
            ticks: 0,
            contact_underflows: 0,
        }
    }

    pub fn at(mut self, position: Vec2) -> Self {
        self.position = position;
        self
    }

    pub fn facing_to(mut self, facing: Facing) -> Self {
        self.facing = facing;
        self.vision_heading = facing.heading();
        self
    }

    // ---- intents ----------------------------------------------------------------------------

    /// Sets the horizontal movement intent.
    ///
    /// Clamped to `[-1, 1]`, NaN reads as `0`, and a stunned agent always stays at `0`. A
    /// non-zero value whose sign differs from the facing turns the agent around at once.
    pub fn set_movement(&mut self, movement: f32) {
        if self.stunned {
            self.intent.movement = 0.0;
            return;
        }
        let movement = if movement.is_nan() {
            0.0
        } else {
            movement.clamp(-1.0, 1.0)
        };
        if movement != 0.0 && movement.signum() != self.facing.sign() {
            self.facing = self.facing.flipped();
        }
        self.intent.movement = movement;
    }

    /// Turns around, carrying the current speed over to the new direction.
    pub fn reverse(&mut self) {
        self.facing = self.facing.flipped();
        if !self.stunned {
            self.intent.movement = -self.intent.movement;
        }
    }

    /// Turns to face `point` without moving.
    pub fn face_towards(&mut self, point: Vec2) {
        let dx = point.x - self.position.x;
        if dx < 0.0 {
            self.facing = Facing::Left;
        } else if dx > 0.0 {
            self.facing = Facing::Right;
        }
    }

    pub fn set_jump(&mut self, jump: bool) {
        self.intent.jump = jump && !self.stunned;
    }

    /// Points the vision cone; the angle is wrapped into `(-π, π]`.
    pub fn set_vision_heading(&mut self, heading: f32) {
        self.vision_heading = ai_core::wrap_angle(heading);
    }

    /// Requests an attack. Succeeds only when the cooldown has expired and the agent is not
    /// stunned; success restarts the cooldown.
    pub fn trigger_attack(&mut self) -> bool {
        if self.stunned || self.action_cooldown.is_running() {
            return false;
        }
        self.intent.attack = true;
        self.action_cooldown.start(self.profile.attack_cooldown_ticks);
        true
    }

    /// Returns and clears the attack request, so a throttled agent fires once per decision.
    pub fn take_attack_request(&mut self) -> bool {
        std::mem::take(&mut self.intent.attack)
    }

    /// Probes for a wall or a ledge in `direction` (its sign).
    pub fn probe_step(&self, world: &dyn RayCaster, direction: f32) -> StepReport {
        self.profile
            .step_probe
            .probe(world, self.body, self.position, direction)
    }

    /// `true` when a step in `direction` hits no wall and, for a grounded agent, does not walk
    /// off a ledge. An airborne agent has no ledge to fall from.
    pub fn is_safe_to_step(&self, world: &dyn RayCaster, direction: f32) -> bool {
        let report = self.probe_step(world, direction);
        !report.wall_ahead && (report.ground_ahead || !self.is_grounded())
    }

    /// [`Agent::is_safe_to_step`] in the facing direction.
    pub fn is_safe_to_advance(&self, world: &dyn RayCaster) -> bool {
        self.is_safe_to_step(world, self.facing.sign())
    }

    // ---- awareness --------------------------------------------------------------------------

    /// Raises or clears awareness of the target. Ignored while stunned.
    pub fn set_aware_of_target(&mut self, aware: bool) {
        if self.stunned {
            return;
        }
        if aware {
            self.notice_target();
        } else {
            self.forget_target();
        }
    }

    /// Moves an alerted or aware agent into `mode`. Refused while idle, stunned or still alerting.
    pub fn commit_awareness(&mut self, mode: AwareMode) -> bool {
        if self.stunned || !self.is_aware() || self.alert.is_running() {
            return false;
        }
        self.awareness = mode.state();
        true
    }

    fn notice_target(&mut self) {
        if self.awareness == AwarenessState::Idle {
            self.awareness = AwarenessState::Alerted;
            self.alert.start(self.profile.alert_ticks);
            tracing::debug!(agent = %self.id, species = %self.species, "target noticed");
        }
        self.awareness_decay.start(self.profile.awareness_decay_ticks);
    }

    fn forget_target(&mut self) {
        if self.awareness != AwarenessState::Idle {
            tracing::debug!(agent = %self.id, species = %self.species, "target forgotten");
        }
        self.awareness = AwarenessState::Idle;
        self.alert.stop();
        self.awareness_decay.stop();
    }

    // ---- stun -------------------------------------------------------------------------------

    /// Stuns the agent for `ticks` agent ticks; `0` ends a running stun.
    ///
    /// A stunned agent has no movement, jump or attack intent and ignores perception for
    /// awareness purposes. When the stun runs out the agent is idle again.
    pub fn set_stunned(&mut self, ticks: u32) {
        if ticks == 0 {
            if self.stunned {
                self.recover();
            }
            return;
        }
        self.stunned = true;
        self.stun.start(ticks);
        self.intent = Intent::default();
        tracing::debug!(agent = %self.id, ticks, "stunned");
    }

    fn recover(&mut self) {
        self.stunned = false;
        self.stun.stop();
        self.forget_target();
        tracing::debug!(agent = %self.id, "stun expired");
    }

    // ---- perception -------------------------------------------------------------------------

    /// Applies one routed perception event.
    ///
    /// Contact counts are kept even while stunned so they stay balanced; only the awareness
    /// reaction is suppressed.
    pub fn apply_perception(&mut self, kind: PerceptionKind) {
        let role = kind.sensor_role();
        let Some(count) = self.contacts.slot(role) else {
            return;
        };
        if kind.is_begin() {
            *count = count.saturating_add(1);
        } else if *count == 0 {
            self.contact_underflows += 1;
            tracing::warn!(agent = %self.id, event = %kind, "contact ended without a matching begin");
        } else {
            *count -= 1;
        }

        if kind == PerceptionKind::TargetSighted && !self.stunned {
            self.notice_target();
        }
    }

    // ---- tick protocol ----------------------------------------------------------------------

    /// Start of an agent tick: clears intents and advances alert and awareness.
    ///
    /// Intents are re-asserted every tick by whichever leaf is running.
    pub fn begin_tick(&mut self) {
        self.ticks += 1;
        self.intent = Intent::default();
        if self.stunned {
            return;
        }

        self.alert.tick();
        if self.target_in_view() {
            self.notice_target();
        } else if self.is_aware()
            && (!self.awareness_decay.is_running() || self.awareness_decay.tick())
        {
            self.forget_target();
        }
    }

    /// End of an agent tick: runs the stun and cooldown countdowns.
    pub fn end_tick(&mut self) {
        if self.stunned {
            self.intent = Intent::default();
            if self.stun.tick() {
                self.recover();
            }
        }
        self.action_cooldown.tick();
    }

    // ---- accessors --------------------------------------------------------------------------

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn species(&self) -> Species {
        self.species
    }

    pub fn body(&self) -> BodyHandle {
        self.body
    }

    pub fn profile(&self) -> &SpeciesProfile {
        &self.profile
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Copies the body position from the physics world.
    pub fn set_position(&mut self, position: Vec2) {
        if position.is_finite() {
            self.position = position;
        }
    }

    pub fn facing(&self) -> Facing {
        self.facing
    }

    pub fn vision_heading(&self) -> f32 {
        self.vision_heading
    }

    pub fn intent(&self) -> Intent {
        self.intent
    }

    pub fn movement(&self) -> f32 {
        self.intent.movement
    }

    pub fn wants_jump(&self) -> bool {
        self.intent.jump
    }

    pub fn wants_attack(&self) -> bool {
        self.intent.attack
    }

    /// Horizontal velocity the movement code should steer towards.
    pub fn desired_velocity(&self) -> Vec2 {
        Vec2::new(self.intent.movement * self.profile.max_speed, 0.0)
    }

    pub fn awareness(&self) -> AwarenessState {
        self.awareness
    }

    pub fn is_aware(&self) -> bool {
        self.awareness != AwarenessState::Idle
    }

    pub fn is_alerted(&self) -> bool {
        self.awareness == AwarenessState::Alerted
    }

    /// Aware, and the alert countdown is over.
    pub fn alert_complete(&self) -> bool {
        self.is_aware() && !self.alert.is_running()
    }

    pub fn is_stunned(&self) -> bool {
        self.stunned
    }

    pub fn contacts(&self) -> Contacts {
        self.contacts
    }

    pub fn contact_count(&self, role: ShapeRole) -> u16 {
        self.contacts.count(role)
    }

    pub fn sees_wall(&self) -> bool {
        self.contacts.wall > 0
    }

    pub fn is_grounded(&self) -> bool {
        self.contacts.ground > 0
    }

    pub fn target_in_view(&self) -> bool {
        self.contacts.sight > 0
    }

    pub fn in_follow_range(&self) -> bool {
        self.contacts.follow > 0
    }

    pub fn in_harvest_zone(&self) -> bool {
        self.contacts.harvest > 0
    }

    pub fn attack_ready(&self) -> bool {
        !self.stunned && !self.action_cooldown.is_running()
    }

    pub fn alert_remaining(&self) -> u32 {
        self.alert.remaining()
    }

    pub fn awareness_remaining(&self) -> u32 {
        self.awareness_decay.remaining()
    }

    pub fn stun_remaining(&self) -> u32 {
        self.stun.remaining()
    }

    pub fn cooldown_remaining(&self) -> u32 {
        self.action_cooldown.remaining()
    }

    /// Agent ticks run so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Contact ends that arrived without a matching begin.
    pub fn contact_underflows(&self) -> u32 {
        self.contact_underflows
    }

    pub fn status(&self) -> AgentStatus {
        AgentStatus {
            id: self.id,
            species: self.species,
            position: self.position,
            facing: self.facing,
            vision_heading: self.vision_heading,
            intent: self.intent,
            awareness: self.awareness,
            stunned: self.stunned,
            contacts: self.contacts,
            alert_remaining: self.alert.remaining(),
            awareness_remaining: self.awareness_decay.remaining(),
            stun_remaining: self.stun.remaining(),
            cooldown_remaining: self.action_cooldown.remaining(),
            ticks: self.ticks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chaser() -> Agent {
        Agent::new(
            AgentId(1),
            Species::PatrolChaseAttack,
            BodyHandle(1),
            SpeciesProfile::for_species(Species::PatrolChaseAttack),
        )
    }

    #[test]
    fn movement_is_clamped_and_nan_is_zero() {
        let mut agent = chaser();
        agent.set_movement(3.0);
        assert_eq!(agent.movement(), 1.0);
        agent.set_movement(f32::NAN);
        assert_eq!(agent.movement(), 0.0);
        assert_eq!(agent.facing(), Facing::Right);
    }

    #[test]
    fn sign_change_flips_facing() {
        let mut agent = chaser();
        agent.set_movement(-0.5);
        assert_eq!(agent.facing(), Facing::Left);
        agent.reverse();
        assert_eq!(agent.facing(), Facing::Right);
        assert_eq!(agent.movement(), 0.5);
    }

    #[test]
    fn stun_zeroes_and_pins_intent() {
        let mut agent = chaser();
        agent.set_movement(1.0);
        agent.set_jump(true);
        agent.set_stunned(3);
        assert_eq!(agent.intent(), Intent::default());
        agent.set_movement(1.0);
        agent.set_jump(true);
        assert!(!agent.trigger_attack());
        assert_eq!(agent.intent(), Intent::default());
    }

    #[test]
    fn sighting_while_stunned_does_not_raise_awareness() {
        let mut agent = chaser();
        agent.set_stunned(2);
        agent.apply_perception(PerceptionKind::TargetSighted);
        assert_eq!(agent.awareness(), AwarenessState::Idle);
        assert!(agent.target_in_view());
    }

    #[test]
    fn commit_waits_for_the_alert() {
        let mut agent = chaser();
        assert!(!agent.commit_awareness(AwareMode::Pursuing));
        agent.set_aware_of_target(true);
        assert!(agent.is_alerted());
        assert!(!agent.commit_awareness(AwareMode::Pursuing));
        for _ in 0..agent.profile().alert_ticks {
            agent.begin_tick();
            agent.end_tick();
        }
        assert!(agent.commit_awareness(AwareMode::Pursuing));
        assert_eq!(agent.awareness(), AwarenessState::AwarePursuing);
    }

    #[test]
    fn advancing_is_unsafe_into_walls_and_off_ledges_only_when_grounded() {
        use ai_perception::sandbox::{Aabb, BoxWorld};

        let floor = |to_x: f32| {
            let mut world = BoxWorld::new();
            world.add_wall(
                BodyHandle(500),
                Aabb::new(Vec2::new(-10.0, -1.5), Vec2::new(to_x, -0.5)),
            );
            world
        };
        let open = floor(10.0);
        let ledge = floor(0.3);
        let mut walled = floor(10.0);
        walled.add_wall(
            BodyHandle(501),
            Aabb::new(Vec2::new(0.5, -0.5), Vec2::new(1.0, 3.0)),
        );

        let mut agent = chaser();
        assert!(!agent.is_grounded());
        assert!(agent.is_safe_to_advance(&open));
        assert!(agent.is_safe_to_advance(&ledge));
        assert!(!agent.is_safe_to_advance(&walled));

        agent.apply_perception(PerceptionKind::GroundContactBegin);
        assert!(agent.is_safe_to_advance(&open));
        assert!(!agent.is_safe_to_advance(&ledge));
        assert!(!agent.is_safe_to_advance(&walled));
        assert!(agent.is_safe_to_step(&walled, -1.0));
        assert!(agent.is_safe_to_step(&ledge, -1.0));
    }

    #[test]
    fn cooldown_spaces_attacks() {
        let mut agent = chaser();
        let cooldown = agent.profile().attack_cooldown_ticks;
        assert!(agent.trigger_attack());
        agent.end_tick();
        let mut waited = 1;
        loop {
            agent.begin_tick();
            if agent.trigger_attack() {
                break;
            }
            agent.end_tick();
            waited += 1;
        }
        assert_eq!(waited, cooldown);
    }
}
