//! Deterministic, engine-agnostic AI kernel primitives.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod agent;
pub mod blackboard;
pub mod clock;
pub mod math;
pub mod rng;
pub mod tick;

pub use agent::AgentId;
pub use blackboard::{BbKey, Blackboard};
pub use clock::ThinkClock;
pub use math::{turn_towards, wrap_angle, Vec2};
pub use rng::{DeterministicRng, SplitMix64};
pub use tick::TickContext;
