use crate::level::ChaosLevel;
use crate::scheduler::{Scheduler, TimerId};

pub const TICK_MS: u64 = 1000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Tick;

/// Drives the chaos level from 1 to 10, one step per second, then tears its timer down.
#[derive(Debug)]
pub struct EscalationClock {
    level: ChaosLevel,
    timers: Scheduler<Tick>,
    ticker: Option<TimerId>,
}

impl EscalationClock {
    pub fn new(now_ms: u64) -> Self {
        Self {
            level: ChaosLevel::MIN,
            timers: Scheduler::new(now_ms),
            ticker: None,
        }
    }

    pub fn level(&self) -> ChaosLevel {
        self.level
    }

    /// Starts ticking. No-op while running or once the top level is reached.
    pub fn start(&mut self, now_ms: u64) -> bool {
        if self.ticker.is_some() || self.level.is_max() {
            return false;
        }
        // Anchor the first tick to the moment of the call, not the last poll.
        self.timers.advance_to(now_ms);
        self.ticker = Some(self.timers.set_interval(TICK_MS, Tick));
        true
    }

    pub fn is_ticking(&self) -> bool {
        self.ticker.is_some()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.pending()
    }

    /// Fires every tick due by `now_ms`; returns each level reached, in order.
    pub fn poll(&mut self, now_ms: u64) -> Vec<ChaosLevel> {
        let mut reached = Vec::new();
        while let Some((id, Tick)) = self.timers.pop_due(now_ms) {
            if self.ticker != Some(id) {
                continue;
            }
            self.level = self.level.next();
            reached.push(self.level);
            if self.level.is_max() {
                self.timers.cancel(id);
                self.ticker = None;
            }
        }
        reached
    }
}
