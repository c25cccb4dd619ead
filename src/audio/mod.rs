mod channels;
pub mod synth;

pub use channels::{
    AudioChannel, AudioChannelManager, ChannelId, BASE_VOLUME, DEFERRED_LIMIT, DUCKED_VOLUME,
    DUCK_THRESHOLD, EVICT_FADE_MS, MAX_CHANNELS, RANDOM_COOLDOWN_MS,
};
pub use synth::SynthAudio;

use std::collections::BTreeMap;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SoundHandle(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AudioEvent {
    End(SoundHandle),
    LoadError(SoundHandle),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioError {
    UnknownSource(String),
    Decode { source: String, message: String },
    ContextSuspended(String),
    Backend(String),
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownSource(source) => write!(f, "unknown audio source: {source}"),
            Self::Decode { source, message } => write!(f, "cannot decode {source}: {message}"),
            Self::ContextSuspended(msg) => write!(f, "audio context suspended: {msg}"),
            Self::Backend(msg) => write!(f, "audio backend error: {msg}"),
        }
    }
}

impl std::error::Error for AudioError {}

/// Playback backend the channel manager drives. Handles are opaque to the core.
pub trait AudioEngine {
    fn name(&self) -> &'static str;
    /// Unlocks the output context; must be called from a user gesture.
    fn resume(&mut self) -> Result<(), AudioError>;
    fn create(&mut self, source: &str, volume: f32) -> Result<SoundHandle, AudioError>;
    fn play(&mut self, handle: SoundHandle) -> Result<(), AudioError>;
    fn set_volume(&mut self, handle: SoundHandle, volume: f32);
    fn fade(&mut self, handle: SoundHandle, from: f32, to: f32, duration_ms: u64);
    fn unload(&mut self, handle: SoundHandle);
    fn poll_events(&mut self, now_ms: u64) -> Vec<AudioEvent>;
}

/// Engine for `--mute` and headless runs: nothing is heard, sounds end after a fixed length.
#[derive(Debug)]
pub struct SilentAudio {
    length_ms: u64,
    next: u64,
    /// `None` until the first poll after `play` stamps the end time.
    playing: BTreeMap<SoundHandle, Option<u64>>,
}

impl SilentAudio {
    pub fn new(length_ms: u64) -> Self {
        Self {
            length_ms,
            next: 1,
            playing: BTreeMap::new(),
        }
    }
}

impl AudioEngine for SilentAudio {
    fn name(&self) -> &'static str {
        "silent"
    }

    fn resume(&mut self) -> Result<(), AudioError> {
        Ok(())
    }

    fn create(&mut self, _source: &str, _volume: f32) -> Result<SoundHandle, AudioError> {
        let handle = SoundHandle(self.next);
        self.next += 1;
        Ok(handle)
    }

    fn play(&mut self, handle: SoundHandle) -> Result<(), AudioError> {
        let _ = self.playing.insert(handle, None);
        Ok(())
    }

    fn set_volume(&mut self, _handle: SoundHandle, _volume: f32) {}

    fn fade(&mut self, _handle: SoundHandle, _from: f32, _to: f32, _duration_ms: u64) {}

    fn unload(&mut self, handle: SoundHandle) {
        let _ = self.playing.remove(&handle);
    }

    fn poll_events(&mut self, now_ms: u64) -> Vec<AudioEvent> {
        let mut ended = Vec::new();
        for (handle, end) in self.playing.iter_mut() {
            let end_ms = *end.get_or_insert(now_ms + self.length_ms);
            if now_ms >= end_ms {
                ended.push(*handle);
            }
        }
        for handle in &ended {
            let _ = self.playing.remove(handle);
        }
        ended.into_iter().map(AudioEvent::End).collect()
    }
}
