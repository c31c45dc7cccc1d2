//! Auto-advance countdown shown after a lesson ends.
//!
//! The countdown is bound to the course generation it was started under; a
//! tick from a later generation (course replaced or cleared) cancels it
//! instead of firing.

use tracing::debug;

pub const DEFAULT_AUTOPLAY_SECONDS: u32 = 5;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Countdown {
    Idle,
    Counting {
        remaining: u32,
        target: String,
        generation: u64,
    },
    Cancelled,
    Fired {
        target: String,
    },
}

#[derive(Clone, Debug)]
pub struct AutoAdvance {
    state: Countdown,
}

impl Default for AutoAdvance {
    fn default() -> Self {
        Self {
            state: Countdown::Idle,
        }
    }
}

impl AutoAdvance {
    pub fn state(&self) -> &Countdown {
        &self.state
    }

    pub fn is_counting(&self) -> bool {
        matches!(self.state, Countdown::Counting { .. })
    }

    pub fn remaining(&self) -> Option<u32> {
        match self.state {
            Countdown::Counting { remaining, .. } => Some(remaining),
            _ => None,
        }
    }

    pub fn target(&self) -> Option<&str> {
        match &self.state {
            Countdown::Counting { target, .. } => Some(target),
            _ => None,
        }
    }

    /// Begin counting down towards `target`. A running countdown is
    /// cancelled first.
    pub fn start(&mut self, target: &str, seconds: u32, generation: u64) {
        self.cancel();
        debug!(lesson = target, seconds, "autoplay countdown started");
        self.state = Countdown::Counting {
            remaining: seconds.max(1),
            target: target.to_string(),
            generation,
        };
    }

    /// Returns true if a running countdown was stopped.
    pub fn cancel(&mut self) -> bool {
        if self.is_counting() {
            debug!("autoplay countdown cancelled");
            self.state = Countdown::Cancelled;
            true
        } else {
            false
        }
    }

    /// Advance one second. Returns the lesson to load when the countdown
    /// reaches zero.
    pub fn tick(&mut self, generation: u64) -> Option<String> {
        let Countdown::Counting {
            remaining,
            target,
            generation: started_under,
        } = &mut self.state
        else {
            return None;
        };

        if *started_under != generation {
            self.state = Countdown::Cancelled;
            return None;
        }

        *remaining = remaining.saturating_sub(1);
        if *remaining == 0 {
            let target = std::mem::take(target);
            self.state = Countdown::Fired {
                target: target.clone(),
            };
            Some(target)
        } else {
            None
        }
    }

    /// "Play now": fire immediately if still counting under `generation`.
    pub fn fire_now(&mut self, generation: u64) -> Option<String> {
        match &self.state {
            Countdown::Counting {
                target,
                generation: started_under,
                ..
            } if *started_under == generation => {
                let target = target.clone();
                self.state = Countdown::Fired {
                    target: target.clone(),
                };
                Some(target)
            }
            Countdown::Counting { .. } => {
                self.state = Countdown::Cancelled;
                None
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_after_configured_seconds() {
        let mut auto = AutoAdvance::default();
        auto.start("B/b1.mp4", 3, 1);
        assert_eq!(auto.tick(1), None);
        assert_eq!(auto.remaining(), Some(2));
        assert_eq!(auto.tick(1), None);
        assert_eq!(auto.tick(1).as_deref(), Some("B/b1.mp4"));
        assert_eq!(
            auto.state(),
            &Countdown::Fired {
                target: "B/b1.mp4".to_string()
            }
        );
        // nothing more once fired
        assert_eq!(auto.tick(1), None);
    }

    #[test]
    fn cancelled_countdown_never_fires() {
        let mut auto = AutoAdvance::default();
        auto.start("B/b1.mp4", 1, 1);
        assert!(auto.cancel());
        assert_eq!(auto.tick(1), None);
        assert_eq!(auto.state(), &Countdown::Cancelled);
        assert!(!auto.cancel());
    }

    #[test]
    fn generation_change_cancels() {
        let mut auto = AutoAdvance::default();
        auto.start("B/b1.mp4", 1, 1);
        assert_eq!(auto.tick(2), None);
        assert_eq!(auto.state(), &Countdown::Cancelled);
    }

    #[test]
    fn fire_now_skips_the_wait() {
        let mut auto = AutoAdvance::default();
        auto.start("B/b1.mp4", 5, 7);
        assert_eq!(auto.fire_now(7).as_deref(), Some("B/b1.mp4"));
        assert_eq!(auto.fire_now(7), None);
    }

    #[test]
    fn fire_now_from_stale_generation_cancels() {
        let mut auto = AutoAdvance::default();
        auto.start("B/b1.mp4", 5, 7);
        assert_eq!(auto.fire_now(8), None);
        assert_eq!(auto.state(), &Countdown::Cancelled);
    }

    #[test]
    fn restart_replaces_target() {
        let mut auto = AutoAdvance::default();
        auto.start("A/a2.mp4", 5, 1);
        auto.start("B/b1.mp4", 2, 1);
        assert_eq!(auto.target(), Some("B/b1.mp4"));
        assert_eq!(auto.remaining(), Some(2));
    }

    #[test]
    fn zero_seconds_still_waits_one_tick() {
        let mut auto = AutoAdvance::default();
        auto.start("B/b1.mp4", 0, 1);
        assert_eq!(auto.tick(1).as_deref(), Some("B/b1.mp4"));
    }
}
