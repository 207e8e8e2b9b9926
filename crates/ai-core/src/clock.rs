use crate::{rng, AgentId, DeterministicRng, SplitMix64};

const CLOCK_STREAM: u64 = 0xC10C_0000_0000_0001;

/// Accumulator that decides when a throttled agent gets to think.
///
/// Each call to [`ThinkClock::advance`] adds the frame time; once the accumulated time reaches the
/// interval the clock reports "due" and resets. At most one decision per frame, so a slow frame
/// never triggers a burst of catch-up decisions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThinkClock {
    interval: f32,
    accumulated: f32,
}

impl ThinkClock {
    /// A clock with a fixed interval; an interval of `0` thinks every frame.
    pub fn new(interval_seconds: f32) -> Self {
        Self {
            interval: sanitize(interval_seconds),
            accumulated: 0.0,
        }
    }

    /// A clock whose interval and starting phase are derived from `(seed, agent)`.
    ///
    /// `jitter` is the fraction of the interval by which the per-agent interval may deviate in
    /// either direction. The phase offset spreads agents of the same species across frames.
    pub fn staggered(interval_seconds: f32, jitter: f32, seed: u64, agent: AgentId) -> Self {
        let base = sanitize(interval_seconds);
        let mut rng = SplitMix64::new(rng::derive_seed(seed, agent.stable_id(), CLOCK_STREAM));
        let spread = jitter.clamp(0.0, 1.0);
        let interval = base * (1.0 + rng.range_f32(-spread, spread));
        let phase = rng.next_f32_unit();
        Self {
            interval,
            accumulated: interval * phase,
        }
    }

    pub fn interval(&self) -> f32 {
        self.interval
    }

    pub fn accumulated(&self) -> f32 {
        self.accumulated
    }

    /// Adds `dt` and returns the elapsed time covered by the decision when one is due.
    ///
    /// A decision is due once the accumulated time is greater than *or equal to* the interval;
    /// the accumulator then restarts at `0` and any remainder is dropped.
    pub fn advance(&mut self, dt: f32) -> Option<f32> {
        if dt.is_finite() && dt > 0.0 {
            self.accumulated += dt;
        }
        if self.accumulated >= self.interval {
            let elapsed = self.accumulated;
            self.accumulated = 0.0;
            Some(elapsed)
        } else {
            None
        }
    }
}

fn sanitize(interval: f32) -> f32 {
    if interval.is_finite() {
        interval.max(0.0)
    } else {
        0.0
    }
}
