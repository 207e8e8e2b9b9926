use crate::{rng, AgentId, SplitMix64};

/// Per-step context handed to every decision.
///
/// `tick` is the frame counter of the caller, `dt_seconds` the time covered by this decision
/// (for throttled agents this is the time since their previous decision).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickContext {
    pub tick: u64,
    pub dt_seconds: f32,
    pub seed: u64,
}

impl TickContext {
    pub fn rng_for_agent(&self, agent: AgentId, stream: u64) -> SplitMix64 {
        let seed = rng::derive_seed(self.seed ^ rng::mix64(self.tick), agent.stable_id(), stream);
        SplitMix64::new(seed)
    }
}
