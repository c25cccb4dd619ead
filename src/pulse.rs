//! Zoom pulse: every entity runs its own wait → rise → fall chain on one-shot timers.
//!
//! The book never schedules anything itself; each transition hands back the next timer for
//! the owner to arm. A timer whose generation no longer matches its chain is stale and ignored.

use crate::entity::EntityId;
use crate::level::{lerp, ChaosLevel, Effect};
use fastrand::Rng;
use std::collections::BTreeMap;

pub const PEAK_SCALE: f32 = 1.1;
pub const RISE_MS: u64 = 150;
pub const FALL_MS: u64 = 150;
/// Wait between pulses at activation and at the top level.
pub const INTERVAL_AT_ACTIVATION_MS: (u64, u64) = (800, 1600);
pub const INTERVAL_AT_MAX_MS: (u64, u64) = (250, 600);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PulseStep {
    Begin,
    RiseDone,
    FallDone,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PulseTimer {
    pub id: EntityId,
    pub generation: u32,
    pub step: PulseStep,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PulsePhase {
    Waiting,
    Rising { start_ms: u64 },
    Falling { start_ms: u64 },
}

#[derive(Clone, Copy, Debug)]
struct Chain {
    phase: PulsePhase,
    generation: u32,
}

#[derive(Clone, Debug, Default)]
pub struct PulseBook {
    chains: BTreeMap<EntityId, Chain>,
}

pub fn ease_out_cubic(t: f32) -> f32 {
    let u = 1.0 - t.clamp(0.0, 1.0);
    1.0 - u * u * u
}

pub fn ease_in_cubic(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * t
}

pub fn interval_ms(level: ChaosLevel, rng: &mut Rng) -> u64 {
    let p = Effect::ZoomPulse.progress(level);
    let lo = lerp(
        INTERVAL_AT_ACTIVATION_MS.0 as f32,
        INTERVAL_AT_MAX_MS.0 as f32,
        p,
    ) as u64;
    let hi = lerp(
        INTERVAL_AT_ACTIVATION_MS.1 as f32,
        INTERVAL_AT_MAX_MS.1 as f32,
        p,
    ) as u64;
    rng.u64(lo..=hi.max(lo))
}

impl PulseBook {
    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.chains.contains_key(&id)
    }

    pub fn phase(&self, id: EntityId) -> Option<PulsePhase> {
        self.chains.get(&id).map(|c| c.phase)
    }

    /// Starts a chain for `id`; `None` if it already has one.
    pub fn attach(&mut self, id: EntityId, level: ChaosLevel, rng: &mut Rng) -> Option<(u64, PulseTimer)> {
        if self.chains.contains_key(&id) {
            return None;
        }
        let chain = Chain {
            phase: PulsePhase::Waiting,
            generation: 0,
        };
        let _ = self.chains.insert(id, chain);
        Some((
            interval_ms(level, rng),
            PulseTimer {
                id,
                generation: 0,
                step: PulseStep::Begin,
            },
        ))
    }

    pub fn detach(&mut self, id: EntityId) -> bool {
        self.chains.remove(&id).is_some()
    }

    pub fn clear(&mut self) {
        self.chains.clear();
    }

    pub fn ids(&self) -> Vec<EntityId> {
        self.chains.keys().copied().collect()
    }

    /// Advances the chain the timer belongs to and returns the next timer to arm.
    pub fn on_timer(
        &mut self,
        timer: PulseTimer,
        now_ms: u64,
        level: ChaosLevel,
        rng: &mut Rng,
    ) -> Option<(u64, PulseTimer)> {
        let chain = self.chains.get_mut(&timer.id)?;
        if chain.generation != timer.generation {
            return None;
        }

        let (phase, delay, step) = match (chain.phase, timer.step) {
            (PulsePhase::Waiting, PulseStep::Begin) => (
                PulsePhase::Rising { start_ms: now_ms },
                RISE_MS,
                PulseStep::RiseDone,
            ),
            (PulsePhase::Rising { start_ms }, PulseStep::RiseDone) => {
                if now_ms < start_ms + RISE_MS {
                    return Some((start_ms + RISE_MS - now_ms, timer));
                }
                (
                    PulsePhase::Falling { start_ms: now_ms },
                    FALL_MS,
                    PulseStep::FallDone,
                )
            }
            (PulsePhase::Falling { start_ms }, PulseStep::FallDone) => {
                if now_ms < start_ms + FALL_MS {
                    return Some((start_ms + FALL_MS - now_ms, timer));
                }
                (PulsePhase::Waiting, interval_ms(level, rng), PulseStep::Begin)
            }
            _ => return None,
        };

        chain.phase = phase;
        chain.generation = chain.generation.wrapping_add(1);
        Some((
            delay,
            PulseTimer {
                id: timer.id,
                generation: chain.generation,
                step,
            },
        ))
    }

    /// Scale factor for `id` at `now_ms`, `1.0` when idle or unknown.
    pub fn scale(&self, id: EntityId, now_ms: u64) -> f32 {
        let Some(chain) = self.chains.get(&id) else {
            return 1.0;
        };
        let amp = PEAK_SCALE - 1.0;
        match chain.phase {
            PulsePhase::Waiting => 1.0,
            PulsePhase::Rising { start_ms } => {
                let t = now_ms.saturating_sub(start_ms) as f32 / RISE_MS as f32;
                1.0 + amp * ease_out_cubic(t)
            }
            PulsePhase::Falling { start_ms } => {
                let t = now_ms.saturating_sub(start_ms) as f32 / FALL_MS as f32;
                1.0 + amp * (1.0 - ease_in_cubic(t))
            }
        }
    }
}
