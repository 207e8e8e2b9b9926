//! Owns every registered agent and decides when each one thinks.
//!
//! Per frame the game calls, in order:
//! 1. [`AiManager::end_physics_step`] after the physics step, with the router that collected the
//!    step's contacts. Contacts are delivered first, then deferred removals run.
//! 2. [`AiManager::update`] with the frame time. Every agent whose think clock is due gets one tree
//!    step.
//! 3. Reads intents back ([`AiManager::agents`], [`AiManager::take_attack_requests`]).

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use ai_bt::{BtCtx, BtStatus};
use ai_core::{AgentId, Blackboard, ThinkClock, TickContext, Vec2};
use ai_perception::{
    BodyHandle, Delivery, PerceptionEvent, PerceptionSink, RayCaster, RouteStats,
    SensorEventRouter,
};
use ai_tools::{emit_with, TraceEvent, TraceLog, TRACE_LOG};

use crate::agent::{Agent, Facing};
use crate::config::StealthConfig;
use crate::economy::{FearAction, FearReserve};
use crate::error::{ConfigError, EconomyError, RegisterError};
use crate::ports::{AllyView, StealthDomain, StealthEnv, StealthTree, TargetLocator};
use crate::species::Species;
use crate::template::TemplateLibrary;

#[derive(Debug)]
struct Brain {
    agent: Agent,
    tree: StealthTree,
    blackboard: Blackboard,
    clock: ThinkClock,
    thinks: u64,
}

impl Brain {
    /// One agent tick: begin, tree step (or halt while stunned), end.
    fn think(&mut self, tick: &TickContext, env: &StealthEnv<'_>) {
        self.agent.begin_tick();
        let mut cx: BtCtx<'_, StealthDomain> = BtCtx {
            tick,
            agent: &mut self.agent,
            env,
            blackboard: &mut self.blackboard,
        };
        if cx.agent.is_stunned() {
            if self.tree.is_active() {
                self.tree.abort(&mut cx);
            }
        } else {
            self.tree.step(&mut cx);
        }
        self.agent.end_tick();
        self.thinks += 1;
    }

    fn halt(&mut self, tick: &TickContext) {
        let env = StealthEnv::detached();
        let mut cx = BtCtx {
            tick,
            agent: &mut self.agent,
            env: &env,
            blackboard: &mut self.blackboard,
        };
        self.tree.abort(&mut cx);
    }
}

/// Attack fired by an agent since the previous [`AiManager::take_attack_requests`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttackRequest {
    pub agent: AgentId,
    pub species: Species,
    pub position: Vec2,
    pub facing: Facing,
    pub vision_heading: f32,
}

/// What [`AiManager::end_physics_step`] did.
#[derive(Debug, Default)]
pub struct PhysicsStepOutcome {
    pub routed: RouteStats,
    pub removed: Vec<Agent>,
}

#[derive(Debug)]
pub struct AiManager {
    config: StealthConfig,
    library: TemplateLibrary,
    brains: BTreeMap<AgentId, Brain>,
    doomed: BTreeSet<AgentId>,
    frame: u64,
    trace: bool,
}

impl AiManager {
    /// A manager with the built-in species trees.
    pub fn new(config: StealthConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            library: TemplateLibrary::builtin(),
            brains: BTreeMap::new(),
            doomed: BTreeSet::new(),
            frame: 0,
            trace: false,
        })
    }

    pub fn with_library(mut self, library: TemplateLibrary) -> Self {
        self.library = library;
        self
    }

    /// Records tree and perception events into a per-agent [`TraceLog`] for agents registered
    /// afterwards.
    pub fn with_trace(mut self, enabled: bool) -> Self {
        self.trace = enabled;
        self
    }

    pub fn config(&self) -> &StealthConfig {
        &self.config
    }

    pub fn library(&self) -> &TemplateLibrary {
        &self.library
    }

    /// Mutable access for reloading species trees. Running agents keep the tree they were
    /// registered with.
    pub fn library_mut(&mut self) -> &mut TemplateLibrary {
        &mut self.library
    }

    /// Frames seen by [`AiManager::update`].
    pub fn frame(&self) -> u64 {
        self.frame
    }

    // ---- registration -----------------------------------------------------------------------

    /// Creates an agent with its species' configured profile and registers it.
    pub fn spawn(
        &mut self,
        id: AgentId,
        species: Species,
        body: BodyHandle,
        position: Vec2,
    ) -> Result<AgentId, RegisterError> {
        let agent = Agent::new(id, species, body, self.config.profile(species)).at(position);
        self.register(agent)?;
        Ok(id)
    }

    pub fn register(&mut self, agent: Agent) -> Result<(), RegisterError> {
        let id = agent.id();
        let species = agent.species();
        if self.brains.contains_key(&id) {
            return Err(RegisterError::AlreadyRegistered(id));
        }
        let Some(template) = self.library.get(species) else {
            let reason = self
                .library
                .failure(species)
                .unwrap_or("no tree loaded")
                .to_string();
            tracing::warn!(agent = %id, %species, %reason, "registration refused");
            return Err(RegisterError::TemplateUnavailable { species, reason });
        };

        let profile = agent.profile();
        let clock = ThinkClock::staggered(
            profile.tick_interval_seconds,
            profile.tick_jitter,
            self.config.seed,
            id,
        );
        let tree = StealthTree::new(Arc::clone(template)).with_subject(id.stable_id());
        let mut blackboard = Blackboard::new();
        if self.trace {
            blackboard.set(TRACE_LOG, TraceLog::default());
        }

        tracing::debug!(agent = %id, %species, interval = clock.interval(), "agent registered");
        self.brains.insert(
            id,
            Brain {
                agent,
                tree,
                blackboard,
                clock,
                thinks: 0,
            },
        );
        Ok(())
    }

    /// Removes an agent at once, halting its tree. Unknown ids are a no-op.
    pub fn unregister(&mut self, id: AgentId) -> Option<Agent> {
        let mut brain = self.brains.remove(&id)?;
        self.doomed.remove(&id);
        brain.halt(&self.tick_context(0.0));
        tracing::debug!(agent = %id, "agent unregistered");
        Some(brain.agent)
    }

    /// Marks an agent for removal at the end of the current physics step. Returns `false` for
    /// unknown ids.
    pub fn schedule_removal(&mut self, id: AgentId) -> bool {
        if self.brains.contains_key(&id) {
            self.doomed.insert(id);
            true
        } else {
            false
        }
    }

    pub fn is_scheduled_for_removal(&self, id: AgentId) -> bool {
        self.doomed.contains(&id)
    }

    /// Runs the deferred removals.
    pub fn post_update(&mut self) -> Vec<Agent> {
        let doomed = std::mem::take(&mut self.doomed);
        doomed
            .into_iter()
            .filter_map(|id| self.unregister(id))
            .collect()
    }

    /// Delivers the step's contacts, then runs the deferred removals, so an agent doomed during
    /// the step still sees everything that happened to it.
    pub fn end_physics_step(&mut self, router: &mut SensorEventRouter) -> PhysicsStepOutcome {
        let routed = router.flush(self);
        let removed = self.post_update();
        PhysicsStepOutcome { routed, removed }
    }

    // ---- scheduling -------------------------------------------------------------------------

    /// Advances every think clock by `dt` and steps the agents that are due. Returns how many
    /// agents thought.
    pub fn update(
        &mut self,
        dt: f32,
        physics: &dyn RayCaster,
        scene: &dyn TargetLocator,
    ) -> usize {
        self.frame += 1;
        let frame = self.frame;
        let seed = self.config.seed;

        let allies: Vec<AllyView> = self
            .brains
            .values()
            .map(|b| AllyView::of(&b.agent))
            .collect();
        let env = StealthEnv::new(physics, scene).with_allies(&allies);

        let mut thought = 0;
        for brain in self.brains.values_mut() {
            let Some(elapsed) = brain.clock.advance(dt) else {
                continue;
            };
            let tick = TickContext {
                tick: frame,
                dt_seconds: elapsed,
                seed,
            };
            brain.think(&tick, &env);
            thought += 1;
        }
        tracing::trace!(frame, thought, agents = self.brains.len(), "ai update");
        thought
    }

    fn tick_context(&self, dt_seconds: f32) -> TickContext {
        TickContext {
            tick: self.frame,
            dt_seconds,
            seed: self.config.seed,
        }
    }

    // ---- stun and harvest -------------------------------------------------------------------

    /// Stuns an agent for `ticks` of its own ticks and halts its tree.
    pub fn stun(&mut self, id: AgentId, ticks: u32) -> Result<(), EconomyError> {
        let tick = self.tick_context(0.0);
        let brain = self
            .brains
            .get_mut(&id)
            .ok_or(EconomyError::UnknownAgent(id))?;
        brain.agent.set_stunned(ticks);
        if brain.agent.is_stunned() {
            brain.halt(&tick);
        }
        emit_with(&mut brain.blackboard, || {
            TraceEvent::new(tick.tick, "stealth.stunned")
                .with_subject(id.stable_id())
                .with_detail(u64::from(ticks))
        });
        Ok(())
    }

    /// Pays for a stun from `reserve` and stuns for the species' stun length. Returns the fear
    /// left. Nothing is paid for unknown agents.
    pub fn stun_with(
        &mut self,
        id: AgentId,
        reserve: &mut FearReserve,
    ) -> Result<u32, EconomyError> {
        let ticks = self
            .brains
            .get(&id)
            .map(|b| b.agent.profile().stun_ticks)
            .ok_or(EconomyError::UnknownAgent(id))?;
        let left = reserve.spend(FearAction::Stun)?;
        self.stun(id, ticks)?;
        Ok(left)
    }

    /// Harvests a stunned agent inside the harvest zone: pays the harvest cost, credits the
    /// yield and schedules the agent for removal. Returns the fear afterwards.
    pub fn harvest(
        &mut self,
        id: AgentId,
        reserve: &mut FearReserve,
    ) -> Result<u32, EconomyError> {
        let brain = self
            .brains
            .get_mut(&id)
            .ok_or(EconomyError::UnknownAgent(id))?;
        if !(brain.agent.is_stunned() && brain.agent.in_harvest_zone()) {
            return Err(EconomyError::NotHarvestable(id));
        }
        reserve.spend(FearAction::Harvest)?;
        let gained = reserve.gain(reserve.costs().harvest_yield);

        let frame = self.frame;
        emit_with(&mut brain.blackboard, || {
            TraceEvent::new(frame, "stealth.harvested")
                .with_subject(id.stable_id())
                .with_detail(u64::from(gained))
        });
        tracing::info!(agent = %id, gained, fear = reserve.amount(), "agent harvested");
        self.schedule_removal(id);
        Ok(reserve.amount())
    }

    // ---- game-facing reads and writes -------------------------------------------------------

    /// Copies a body position from the physics world. Returns `false` for unknown ids.
    pub fn sync_position(&mut self, id: AgentId, position: Vec2) -> bool {
        match self.brains.get_mut(&id) {
            Some(brain) => {
                brain.agent.set_position(position);
                true
            }
            None => false,
        }
    }

    /// Attack requests raised since the last call, in agent id order. Clears them.
    pub fn take_attack_requests(&mut self) -> Vec<AttackRequest> {
        self.brains
            .values_mut()
            .filter_map(|brain| {
                let agent = &mut brain.agent;
                agent.take_attack_request().then(|| AttackRequest {
                    agent: agent.id(),
                    species: agent.species(),
                    position: agent.position(),
                    facing: agent.facing(),
                    vision_heading: agent.vision_heading(),
                })
            })
            .collect()
    }

    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.brains.get(&id).map(|b| &b.agent)
    }

    /// Registered agents in id order.
    pub fn agents(&self) -> impl Iterator<Item = &Agent> + '_ {
        self.brains.values().map(|b| &b.agent)
    }

    pub fn contains(&self, id: AgentId) -> bool {
        self.brains.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.brains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.brains.is_empty()
    }

    /// Root status of the agent's last tree step.
    pub fn tree_status(&self, id: AgentId) -> Option<BtStatus> {
        self.brains.get(&id).and_then(|b| b.tree.last_status())
    }

    /// Names of the agent's running action leaves.
    pub fn active_leaves(&self, id: AgentId) -> Vec<&str> {
        let Some(brain) = self.brains.get(&id) else {
            return Vec::new();
        };
        let template = brain.tree.template();
        brain
            .tree
            .active_leaves()
            .into_iter()
            .filter_map(|node| template.node_name(node))
            .collect()
    }

    /// Agent ticks run for `id`.
    pub fn think_count(&self, id: AgentId) -> u64 {
        self.brains.get(&id).map_or(0, |b| b.thinks)
    }

    pub fn think_interval(&self, id: AgentId) -> Option<f32> {
        self.brains.get(&id).map(|b| b.clock.interval())
    }

    /// Trace log of `id`, when tracing was enabled at registration.
    pub fn trace_log(&self, id: AgentId) -> Option<&TraceLog> {
        self.brains.get(&id).and_then(|b| b.blackboard.get(TRACE_LOG))
    }

    /// Lifecycle calls rejected by the agent's tree.
    pub fn lifecycle_violations(&self, id: AgentId) -> u32 {
        self.brains
            .get(&id)
            .map_or(0, |b| b.tree.lifecycle_violations())
    }
}

impl PerceptionSink for AiManager {
    fn deliver(&mut self, event: PerceptionEvent) -> Delivery {
        let Some(brain) = self.brains.get_mut(&event.agent) else {
            return Delivery::UnknownAgent;
        };
        brain.agent.apply_perception(event.kind);
        let frame = self.frame;
        emit_with(&mut brain.blackboard, || {
            TraceEvent::new(frame, event.kind.as_str()).with_subject(event.agent.stable_id())
        });
        Delivery::Delivered
    }
}
