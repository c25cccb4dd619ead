//! Virtual-time timers and frame-loop handles.
//!
//! Everything in the chaos core runs on one logical thread. Timers are driven by whatever
//! clock the owner feeds into [`Scheduler::pop_due`], which keeps the tests deterministic:
//! advancing by 1000 ms is just a number.

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Clone, Debug)]
struct Timer<T> {
    id: TimerId,
    due_ms: u64,
    period_ms: Option<u64>,
    task: T,
}

#[derive(Clone, Debug)]
pub struct Scheduler<T> {
    now_ms: u64,
    next_id: u64,
    timers: Vec<Timer<T>>,
}

impl<T: Clone> Scheduler<T> {
    pub fn new(now_ms: u64) -> Self {
        Self {
            now_ms,
            next_id: 1,
            timers: Vec::new(),
        }
    }

    /// Time of the timer that fired last, or the last time passed to `pop_due`.
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Moves the clock forward without firing anything. Time never goes backwards.
    pub fn advance_to(&mut self, now_ms: u64) {
        self.now_ms = self.now_ms.max(now_ms);
    }

    pub fn set_timeout(&mut self, delay_ms: u64, task: T) -> TimerId {
        self.insert(delay_ms, None, task)
    }

    pub fn set_interval(&mut self, period_ms: u64, task: T) -> TimerId {
        let period_ms = period_ms.max(1);
        self.insert(period_ms, Some(period_ms), task)
    }

    fn insert(&mut self, delay_ms: u64, period_ms: Option<u64>, task: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.timers.push(Timer {
            id,
            due_ms: self.now_ms.saturating_add(delay_ms),
            period_ms,
            task,
        });
        id
    }

    /// Returns true only for the call that actually removed the timer.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.id != id);
        self.timers.len() != before
    }

    pub fn cancel_where(&mut self, mut pred: impl FnMut(&T) -> bool) -> usize {
        let before = self.timers.len();
        self.timers.retain(|t| !pred(&t.task));
        before - self.timers.len()
    }

    pub fn count_where(&self, mut pred: impl FnMut(&T) -> bool) -> usize {
        self.timers.iter().filter(|t| pred(&t.task)).count()
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.timers.iter().any(|t| t.id == id)
    }

    pub fn pending(&self) -> usize {
        self.timers.len()
    }

    /// Pops the earliest timer due at or before `now_ms`.
    ///
    /// Repeating timers are re-armed one period after their due time, so a long gap between
    /// calls fires every missed period in order. Call in a loop; handlers may schedule or
    /// cancel timers between pops.
    pub fn pop_due(&mut self, now_ms: u64) -> Option<(TimerId, T)> {
        let idx = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due_ms <= now_ms)
            .min_by_key(|(_, t)| (t.due_ms, t.id))
            .map(|(i, _)| i);

        let Some(idx) = idx else {
            self.now_ms = self.now_ms.max(now_ms);
            return None;
        };

        let due_ms = self.timers[idx].due_ms;
        self.now_ms = self.now_ms.max(due_ms);
        let fired = match self.timers[idx].period_ms {
            Some(period) => {
                let t = &mut self.timers[idx];
                t.due_ms = due_ms.saturating_add(period);
                (t.id, t.task.clone())
            }
            None => {
                let t = self.timers.swap_remove(idx);
                (t.id, t.task)
            }
        };
        Some(fired)
    }
}

/// Handle for a continuously running per-frame loop.
///
/// Starting a running loop and cancelling a stopped one are both no-ops.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AnimationLoop {
    running: bool,
    frames: u64,
    starts: u32,
}

impl AnimationLoop {
    pub fn start(&mut self) -> bool {
        if self.running {
            return false;
        }
        self.running = true;
        self.frames = 0;
        self.starts += 1;
        true
    }

    pub fn cancel(&mut self) -> bool {
        let was = self.running;
        self.running = false;
        was
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Marks one frame as run; false when the loop is not running.
    pub fn frame(&mut self) -> bool {
        if self.running {
            self.frames += 1;
        }
        self.running
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// How many times the loop has been (re)started.
    pub fn starts(&self) -> u32 {
        self.starts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_fires_every_missed_period_in_order() {
        let mut s = Scheduler::new(0);
        s.set_interval(1000, "tick");
        let mut fired = Vec::new();
        while let Some((_, task)) = s.pop_due(3500) {
            fired.push((s.now_ms(), task));
        }
        assert_eq!(fired, vec![(1000, "tick"), (2000, "tick"), (3000, "tick")]);
        assert_eq!(s.now_ms(), 3500);
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut s = Scheduler::new(0);
        let id = s.set_timeout(10, ());
        assert!(s.cancel(id));
        assert!(!s.cancel(id));
        assert!(s.pop_due(100).is_none());
    }

    #[test]
    fn timeout_scheduled_inside_handler_is_relative_to_fire_time() {
        let mut s = Scheduler::new(0);
        s.set_timeout(100, 1u8);
        let (_, _) = s.pop_due(1000).unwrap();
        s.set_timeout(50, 2u8);
        let (_, task) = s.pop_due(1000).unwrap();
        assert_eq!(task, 2);
        assert_eq!(s.now_ms(), 150);
    }

    #[test]
    fn advance_to_anchors_new_timers_without_firing() {
        let mut s = Scheduler::new(0);
        s.set_timeout(10, 1u8);
        s.advance_to(500);
        s.advance_to(200);
        assert_eq!(s.now_ms(), 500);
        assert_eq!(s.pending(), 1);
        s.set_interval(100, 2u8);
        assert_eq!(s.pop_due(500), Some((TimerId(1), 1)));
        assert!(s.pop_due(599).is_none());
        assert_eq!(s.pop_due(600).map(|(_, t)| t), Some(2));
    }

    #[test]
    fn loop_handles_ignore_repeated_transitions() {
        let mut l = AnimationLoop::default();
        assert!(l.start());
        assert!(!l.start());
        assert!(l.frame());
        assert!(l.cancel());
        assert!(!l.cancel());
        assert!(!l.frame());
        assert_eq!(l.starts(), 1);
    }
}
