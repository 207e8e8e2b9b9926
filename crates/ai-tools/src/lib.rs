//! Tooling primitives for deterministic game AI.
//!
//! Lightweight and engine-agnostic: events are plain data recorded during simulation and rendered
//! later by whatever debug UI the game uses.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod trace;

pub use trace::{emit, emit_with, TraceEvent, TraceLog, TRACE_LOG};
