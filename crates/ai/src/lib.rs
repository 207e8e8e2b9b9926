//! Umbrella crate that re-exports the `ai-*` building blocks.
//!
//! - `core`: ids, tick context, deterministic RNG, 2D math, blackboard, think clock.
//! - `bt`: behavior tree templates and per-agent instances.
//! - `perception`: ray-cast line of sight, step probes and the sensor event router.
//! - `stealth`: enemy agents, species trees and the AI manager.
//! - `tools`: structured trace events for debugging and replays.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

#[cfg(feature = "core")]
#[cfg_attr(docsrs, doc(cfg(feature = "core")))]
pub use ai_core as core;

#[cfg(feature = "tools")]
#[cfg_attr(docsrs, doc(cfg(feature = "tools")))]
pub use ai_tools as tools;

#[cfg(feature = "bt")]
#[cfg_attr(docsrs, doc(cfg(feature = "bt")))]
pub use ai_bt as bt;

#[cfg(feature = "perception")]
#[cfg_attr(docsrs, doc(cfg(feature = "perception")))]
pub use ai_perception as perception;

#[cfg(feature = "stealth")]
#[cfg_attr(docsrs, doc(cfg(feature = "stealth")))]
pub use ai_stealth as stealth;
