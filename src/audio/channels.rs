//! Admission control for overlapping stingers: at most [`MAX_CHANNELS`] at once, everything
//! ducked once [`DUCK_THRESHOLD`] are open, oldest faded out and released to make room.

use super::{AudioEngine, AudioEvent, SoundHandle};
use crate::scheduler::Scheduler;
use fastrand::Rng;
use std::collections::VecDeque;

pub const MAX_CHANNELS: usize = 8;
pub const DUCK_THRESHOLD: usize = 5;
pub const BASE_VOLUME: f32 = 0.8;
pub const DUCKED_VOLUME: f32 = 0.35;
pub const EVICT_FADE_MS: u64 = 150;
pub const RANDOM_COOLDOWN_MS: u64 = 150;
/// Plays requested while the output is still locked.
pub const DEFERRED_LIMIT: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(pub u64);

#[derive(Clone, Debug, PartialEq)]
pub struct AudioChannel {
    pub id: ChannelId,
    pub source: String,
    pub start_ms: u64,
    pub volume: f32,
    handle: SoundHandle,
}

impl AudioChannel {
    pub fn handle(&self) -> SoundHandle {
        self.handle
    }
}

pub fn volume_for(open: usize) -> f32 {
    if open >= DUCK_THRESHOLD {
        DUCKED_VOLUME
    } else {
        BASE_VOLUME
    }
}

pub struct AudioChannelManager {
    engine: Box<dyn AudioEngine>,
    sources: Vec<String>,
    channels: Vec<AudioChannel>,
    fading: Scheduler<SoundHandle>,
    next_id: u64,
    last_random_ms: Option<u64>,
    unlocked: bool,
    deferred: VecDeque<String>,
    rng: Rng,
}

impl AudioChannelManager {
    pub fn new(engine: Box<dyn AudioEngine>, sources: &[&str], seed: u64) -> Self {
        Self {
            engine,
            sources: sources.iter().map(|s| s.to_string()).collect(),
            channels: Vec::new(),
            fading: Scheduler::new(0),
            next_id: 1,
            last_random_ms: None,
            unlocked: false,
            deferred: VecDeque::new(),
            rng: Rng::with_seed(seed),
        }
    }

    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    pub fn is_unlocked(&self) -> bool {
        self.unlocked
    }

    pub fn open_count(&self) -> usize {
        self.channels.len()
    }

    pub fn channels(&self) -> &[AudioChannel] {
        &self.channels
    }

    /// Evicted channels still fading toward silence.
    pub fn fading_count(&self) -> usize {
        self.fading.pending()
    }

    pub fn deferred_count(&self) -> usize {
        self.deferred.len()
    }

    /// Tries to unlock the output. Retried on every gesture until it succeeds.
    pub fn unlock(&mut self, now_ms: u64) -> bool {
        if self.unlocked {
            return true;
        }
        match self.engine.resume() {
            Ok(()) => {
                self.unlocked = true;
                tracing::info!(engine = self.engine.name(), "audio unlocked");
                let pending = std::mem::take(&mut self.deferred);
                for source in pending {
                    let _ = self.play(&source, now_ms);
                }
                true
            }
            Err(err) => {
                tracing::warn!(%err, "audio resume failed; retrying on next gesture");
                false
            }
        }
    }

    /// Opens a channel for `source`. `None` when deferred or when the engine refused it.
    pub fn play(&mut self, source: &str, now_ms: u64) -> Option<ChannelId> {
        if !self.unlocked {
            if self.deferred.len() >= DEFERRED_LIMIT {
                let _ = self.deferred.pop_front();
            }
            self.deferred.push_back(source.to_string());
            return None;
        }

        self.release_faded(now_ms);
        // Evict only once the new sound is live; a refused source keeps every channel.
        let volume = volume_for((self.channels.len() + 1).min(MAX_CHANNELS));
        let handle = match self.engine.create(source, volume) {
            Ok(h) => h,
            Err(err) => {
                tracing::debug!(%err, source, "sound dropped");
                return None;
            }
        };
        if let Err(err) = self.engine.play(handle) {
            tracing::debug!(%err, source, "sound failed to start");
            self.engine.unload(handle);
            return None;
        }
        if self.channels.len() >= MAX_CHANNELS {
            self.evict_oldest();
        }

        let id = ChannelId(self.next_id);
        self.next_id += 1;
        self.channels.push(AudioChannel {
            id,
            source: source.to_string(),
            start_ms: now_ms,
            volume,
            handle,
        });
        self.relevel();
        Some(id)
    }

    pub fn play_random(&mut self, now_ms: u64) -> Option<ChannelId> {
        if self.sources.is_empty() {
            return None;
        }
        let source = self.sources[self.rng.usize(..self.sources.len())].clone();
        self.play(&source, now_ms)
    }

    /// `play_random`, ignored within [`RANDOM_COOLDOWN_MS`] of the last accepted call.
    pub fn throttled_play_random(&mut self, now_ms: u64) -> Option<ChannelId> {
        if let Some(last) = self.last_random_ms {
            if now_ms.saturating_sub(last) < RANDOM_COOLDOWN_MS {
                return None;
            }
        }
        self.last_random_ms = Some(now_ms);
        self.play_random(now_ms)
    }

    /// Releases finished fades and applies engine notifications.
    pub fn update(&mut self, now_ms: u64) {
        self.release_faded(now_ms);
        for event in self.engine.poll_events(now_ms) {
            match event {
                AudioEvent::End(handle) => self.release(handle),
                AudioEvent::LoadError(handle) => {
                    tracing::debug!(?handle, "sound failed to load");
                    self.release(handle);
                }
            }
        }
    }

    fn release(&mut self, handle: SoundHandle) {
        if self.fading.cancel_where(|h| *h == handle) > 0 {
            self.engine.unload(handle);
            return;
        }
        let Some(idx) = self.channels.iter().position(|c| c.handle == handle) else {
            return;
        };
        let _ = self.channels.remove(idx);
        self.engine.unload(handle);
        self.relevel();
    }

    fn evict_oldest(&mut self) {
        let Some(idx) = self
            .channels
            .iter()
            .enumerate()
            .min_by_key(|(_, c)| (c.start_ms, c.id))
            .map(|(i, _)| i)
        else {
            return;
        };
        let old = self.channels.remove(idx);
        self.engine.fade(old.handle, old.volume, 0.0, EVICT_FADE_MS);
        let _ = self.fading.set_timeout(EVICT_FADE_MS, old.handle);
    }

    fn release_faded(&mut self, now_ms: u64) {
        while let Some((_, handle)) = self.fading.pop_due(now_ms) {
            self.engine.unload(handle);
        }
    }

    fn relevel(&mut self) {
        let target = volume_for(self.channels.len());
        for channel in &mut self.channels {
            if channel.volume != target {
                channel.volume = target;
                self.engine.set_volume(channel.handle, target);
            }
        }
    }
}
