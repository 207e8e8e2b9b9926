/// Whole-tick countdown.
///
/// Only [`Countdown::start`] raises the remaining count; every other operation keeps it or lowers
/// it, and it never goes below zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Countdown {
    remaining: u32,
}

impl Countdown {
    pub const fn idle() -> Self {
        Self { remaining: 0 }
    }

    pub fn start(&mut self, ticks: u32) {
        self.remaining = ticks;
    }

    pub fn stop(&mut self) {
        self.remaining = 0;
    }

    pub fn remaining(self) -> u32 {
        self.remaining
    }

    pub fn is_running(self) -> bool {
        self.remaining > 0
    }

    pub fn is_finished(self) -> bool {
        self.remaining == 0
    }

    /// Advances one tick. Returns `true` on the tick that reaches zero.
    pub fn tick(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        self.remaining == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn expires_on_exactly_the_nth_tick(n in 1u32..500) {
            let mut c = Countdown::idle();
            c.start(n);
            for _ in 1..n {
                prop_assert!(!c.tick());
                prop_assert!(c.is_running());
            }
            prop_assert!(c.tick());
            prop_assert!(c.is_finished());
            prop_assert!(!c.tick());
        }

        #[test]
        fn remaining_never_increases_without_start(n in 0u32..50, ticks in 0usize..80) {
            let mut c = Countdown::idle();
            c.start(n);
            let mut last = c.remaining();
            for _ in 0..ticks {
                c.tick();
                prop_assert!(c.remaining() <= last);
                last = c.remaining();
            }
        }
    }
}
