#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::VecDeque;

use ai_core::{BbKey, Blackboard};

/// A small, allocation-friendly trace event.
///
/// `subject` is usually the stable agent id and `detail` a subsystem-specific payload (a tree node
/// index, a perception kind code, ...). Richer renderings live in tooling, not here.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TraceEvent {
    pub tick: u64,
    pub tag: Cow<'static, str>,
    pub subject: u64,
    pub detail: u64,
}

impl TraceEvent {
    pub fn new(tick: u64, tag: impl Into<Cow<'static, str>>) -> Self {
        Self {
            tick,
            tag: tag.into(),
            subject: 0,
            detail: 0,
        }
    }

    pub fn with_subject(mut self, subject: u64) -> Self {
        self.subject = subject;
        self
    }

    pub fn with_detail(mut self, detail: u64) -> Self {
        self.detail = detail;
        self
    }
}

/// Bounded in-memory event log; the oldest events are dropped once `capacity` is reached.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TraceLog {
    capacity: usize,
    events: VecDeque<TraceEvent>,
    dropped: u64,
}

impl Default for TraceLog {
    fn default() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }
}

impl TraceLog {
    pub const DEFAULT_CAPACITY: usize = 4096;

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            events: VecDeque::new(),
            dropped: 0,
        }
    }

    pub fn push(&mut self, event: TraceEvent) {
        if self.events.len() == self.capacity {
            self.events.pop_front();
            self.dropped += 1;
        }
        self.events.push_back(event);
    }

    pub fn events(&self) -> impl Iterator<Item = &TraceEvent> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events evicted because the log was full.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn tags(&self) -> Vec<&str> {
        self.events.iter().map(|e| e.tag.as_ref()).collect()
    }

    pub fn drain(&mut self) -> Vec<TraceEvent> {
        self.events.drain(..).collect()
    }
}

/// Blackboard key for collecting events in-memory.
pub const TRACE_LOG: BbKey<TraceLog> = BbKey::new(0xA11D_7ACE_0000_0001);

/// Records `event` if the blackboard carries a [`TraceLog`]; otherwise a no-op.
pub fn emit(blackboard: &mut Blackboard, event: TraceEvent) {
    if let Some(log) = blackboard.get_mut(TRACE_LOG) {
        log.push(event);
    }
}

/// Same as [`emit`], but only builds the event when tracing is enabled.
pub fn emit_with(blackboard: &mut Blackboard, build: impl FnOnce() -> TraceEvent) {
    if let Some(log) = blackboard.get_mut(TRACE_LOG) {
        log.push(build());
    }
}
