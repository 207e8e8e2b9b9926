//! Behavior Tree runtime built on `ai-core`.
//!
//! A tree is described once with [`Node`] and compiled into an immutable [`BtTemplate`] that is
//! shared (via `Arc`) by every agent using it. Each agent owns a [`BtInstance`] that only carries
//! run state: sequence cursors, the running child of reactive composites and the state records of
//! action leaves that are currently running.
//!
//! Control flow nodes:
//! - [`Node::sequence`]: memory sequence, resumes at the running child without re-running the
//!   children that already succeeded.
//! - [`Node::reactive_sequence`]: guard sequence, re-checks every child on each step.
//! - [`Node::selector`]: priority selector, a higher-priority child that succeeds or runs aborts
//!   a lower-priority running child.
//!
//! Action leaves follow `start` / `execute` / `end`; `end` is delivered exactly once, including
//! when the branch is abandoned.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod bt;
pub mod instance;
pub mod template;

pub use bt::{BtAction, BtCtx, BtDomain, BtStatus, ConditionFn, LeafExit};
pub use instance::BtInstance;
pub use template::{BtError, BtTemplate, Node, NodeId, NodeKind};
