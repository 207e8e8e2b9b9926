//! Perception-driven enemies for a 2D stealth platformer.
//!
//! Every enemy is an [`Agent`]: one state machine (awareness, stun, cooldowns, contact counts)
//! shared by all species. What a species does with that state is decided by its behavior tree,
//! built from the leaf library in [`leaves`] and described as data by [`TreeDef`]. The
//! [`AiManager`] owns the agents, routes perception into them and ticks each one at its own
//! throttled rate.
//!
//! ```no_run
//! use ai_core::{AgentId, Vec2};
//! use ai_perception::{BodyHandle, EmptyWorld, SensorEventRouter};
//! use ai_stealth::{AiManager, Species, StaticScene, StealthConfig};
//!
//! let mut manager = AiManager::new(StealthConfig::default()).expect("default config is valid");
//! manager
//!     .spawn(AgentId(1), Species::PatrolChaseAttack, BodyHandle(10), Vec2::ZERO)
//!     .expect("built-in tree");
//!
//! let mut router = SensorEventRouter::new();
//! let scene = StaticScene::with_target(Vec2::new(5.0, 0.0), BodyHandle(99));
//! // Once per frame, after the physics step:
//! manager.end_physics_step(&mut router);
//! manager.update(1.0 / 60.0, &EmptyWorld, &scene);
//! for agent in manager.agents() {
//!     let _velocity = agent.desired_velocity();
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod agent;
pub mod config;
pub mod economy;
pub mod error;
pub mod leaves;
pub mod manager;
pub mod ports;
pub mod species;
pub mod template;
pub mod timers;

pub use agent::{Agent, AgentStatus, AwareMode, AwarenessState, Contacts, Facing, Intent};
pub use config::{SpeciesProfile, StealthConfig, VisionProfile};
pub use economy::{FearAction, FearCosts, FearReserve};
pub use error::{ConfigError, EconomyError, RegisterError, TemplateError};
pub use manager::{AiManager, AttackRequest, PhysicsStepOutcome};
pub use ports::{
    AllyView, NoTarget, StaticScene, StealthCtx, StealthDomain, StealthEnv, StealthNode,
    StealthTemplate, StealthTree, TargetInfo, TargetLocator,
};
pub use species::Species;
pub use template::{builtin_tree, TemplateLibrary, TreeDef};
pub use timers::Countdown;
