//! Video playback seam. The core only ever sees opaque handles and four notifications.

use std::collections::BTreeMap;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MediaHandle(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaEvent {
    CanPlay(MediaHandle),
    LoadedData(MediaHandle),
    Error(MediaHandle),
    Ended(MediaHandle),
}

impl MediaEvent {
    pub fn handle(self) -> MediaHandle {
        match self {
            Self::CanPlay(h) | Self::LoadedData(h) | Self::Error(h) | Self::Ended(h) => h,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaError {
    UnknownSource(String),
    UnknownHandle(MediaHandle),
    Autoplay(String),
}

impl fmt::Display for MediaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownSource(source) => write!(f, "unknown media source: {source}"),
            Self::UnknownHandle(h) => write!(f, "media handle {} is not open", h.0),
            Self::Autoplay(msg) => write!(f, "playback refused: {msg}"),
        }
    }
}

impl std::error::Error for MediaError {}

pub trait MediaEngine {
    fn name(&self) -> &'static str;
    fn open(&mut self, source: &str) -> Result<MediaHandle, MediaError>;
    fn play(&mut self, handle: MediaHandle) -> Result<(), MediaError>;
    fn pause(&mut self, handle: MediaHandle);
    fn seek(&mut self, handle: MediaHandle, position_ms: u64);
    fn set_playback_rate(&mut self, handle: MediaHandle, rate: f32);
    fn set_volume(&mut self, handle: MediaHandle, volume: f32);
    fn set_muted(&mut self, handle: MediaHandle, muted: bool);
    fn close(&mut self, handle: MediaHandle);
    fn poll_events(&mut self, now_ms: u64) -> Vec<MediaEvent>;
}

/// What a notification did to the primary item.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeckChange {
    None,
    Started,
    Looped,
    /// Switched to another index after a failure.
    Recovered { from: usize, to: usize },
    /// Every item failed in a row; the deck stays where it is.
    Exhausted,
}

/// The primary video: one open handle at the current index, looping, skipping broken items.
#[derive(Debug, Clone)]
pub struct MediaDeck {
    sources: Vec<String>,
    index: usize,
    handle: Option<MediaHandle>,
    /// Set by the first `open`, cleared by `close`; a handle can be gone while this holds.
    opened: bool,
    failures: usize,
}

impl MediaDeck {
    pub fn new(sources: &[&str], index: usize) -> Self {
        let len = sources.len().max(1);
        Self {
            sources: sources.iter().map(|s| s.to_string()).collect(),
            index: index % len,
            handle: None,
            opened: false,
            failures: 0,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn handle(&self) -> Option<MediaHandle> {
        self.handle
    }

    pub fn source(&self) -> Option<&str> {
        self.sources.get(self.index).map(String::as_str)
    }

    /// `index + delta`, wrapped into the pool.
    pub fn wrapped(&self, delta: isize) -> usize {
        let len = self.sources.len();
        if len == 0 {
            return 0;
        }
        (self.index as isize + delta).rem_euclid(len as isize) as usize
    }

    /// Opens the current item. Failed opens walk forward like a playback error would.
    pub fn open(&mut self, engine: &mut dyn MediaEngine) -> DeckChange {
        self.opened = true;
        let start = self.index;
        loop {
            if let Some(old) = self.handle.take() {
                engine.close(old);
            }
            let Some(source) = self.sources.get(self.index).cloned() else {
                return DeckChange::None;
            };
            match engine.open(&source) {
                Ok(handle) => {
                    engine.set_muted(handle, true);
                    self.handle = Some(handle);
                    return if self.index == start {
                        DeckChange::None
                    } else {
                        DeckChange::Recovered {
                            from: start,
                            to: self.index,
                        }
                    };
                }
                Err(err) => {
                    tracing::debug!(%err, index = self.index, "primary media failed to open");
                    if !self.skip_failed() {
                        return DeckChange::Exhausted;
                    }
                }
            }
        }
    }

    /// Moves to `index` and reopens if the deck was opened, even after it gave up.
    pub fn select(&mut self, engine: &mut dyn MediaEngine, index: usize) -> DeckChange {
        let len = self.sources.len().max(1);
        self.index = index % len;
        self.failures = 0;
        if self.opened {
            self.open(engine)
        } else {
            DeckChange::None
        }
    }

    pub fn close(&mut self, engine: &mut dyn MediaEngine) {
        self.opened = false;
        if let Some(h) = self.handle.take() {
            engine.close(h);
        }
    }

    /// Applies a notification addressed to the primary handle; others are ignored.
    pub fn on_event(&mut self, engine: &mut dyn MediaEngine, event: MediaEvent) -> DeckChange {
        if self.handle != Some(event.handle()) {
            return DeckChange::None;
        }
        match event {
            MediaEvent::CanPlay(h) => match engine.play(h) {
                Ok(()) => {
                    self.failures = 0;
                    DeckChange::Started
                }
                Err(err) => {
                    tracing::debug!(%err, "primary media refused to play");
                    self.recover(engine)
                }
            },
            MediaEvent::LoadedData(_) => DeckChange::None,
            MediaEvent::Ended(h) => {
                engine.seek(h, 0);
                match engine.play(h) {
                    Ok(()) => DeckChange::Looped,
                    Err(_) => self.recover(engine),
                }
            }
            MediaEvent::Error(_) => self.recover(engine),
        }
    }

    fn skip_failed(&mut self) -> bool {
        self.failures += 1;
        if self.failures >= self.sources.len() {
            tracing::warn!(failures = self.failures, "every media item failed; giving up");
            return false;
        }
        self.index = self.wrapped(1);
        true
    }

    fn recover(&mut self, engine: &mut dyn MediaEngine) -> DeckChange {
        let from = self.index;
        if !self.skip_failed() {
            return DeckChange::Exhausted;
        }
        match self.open(engine) {
            DeckChange::Exhausted => DeckChange::Exhausted,
            DeckChange::Recovered { to, .. } => DeckChange::Recovered { from, to },
            _ => DeckChange::Recovered {
                from,
                to: self.index,
            },
        }
    }
}

#[derive(Clone, Debug)]
struct Track {
    source: String,
    position_ms: f32,
    rate: f32,
    playing: bool,
    muted: bool,
    volume: f32,
    announced: bool,
    broken: bool,
}

/// Engine for the terminal: no pixels are decoded, each handle just advances a playhead.
#[derive(Debug)]
pub struct ClockedMedia {
    length_ms: u64,
    broken: Vec<String>,
    tracks: BTreeMap<MediaHandle, Track>,
    next: u64,
    last_poll_ms: Option<u64>,
}

impl ClockedMedia {
    pub fn new(length_ms: u64) -> Self {
        Self {
            length_ms: length_ms.max(1),
            broken: Vec::new(),
            tracks: BTreeMap::new(),
            next: 1,
            last_poll_ms: None,
        }
    }

    /// Sources that open fine but report `Error` on the first poll.
    pub fn with_broken(mut self, sources: &[&str]) -> Self {
        self.broken = sources.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn open_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_playing(&self, handle: MediaHandle) -> bool {
        self.tracks.get(&handle).is_some_and(|t| t.playing)
    }

    /// Playhead as a fraction of the clip, `None` for closed handles.
    pub fn progress(&self, handle: MediaHandle) -> Option<f32> {
        self.tracks
            .get(&handle)
            .map(|t| (t.position_ms / self.length_ms as f32).clamp(0.0, 1.0))
    }

    pub fn rate(&self, handle: MediaHandle) -> Option<f32> {
        self.tracks.get(&handle).map(|t| t.rate)
    }

    pub fn source(&self, handle: MediaHandle) -> Option<&str> {
        self.tracks.get(&handle).map(|t| t.source.as_str())
    }
}

impl MediaEngine for ClockedMedia {
    fn name(&self) -> &'static str {
        "clocked"
    }

    fn open(&mut self, source: &str) -> Result<MediaHandle, MediaError> {
        if source.is_empty() {
            return Err(MediaError::UnknownSource(source.to_string()));
        }
        let handle = MediaHandle(self.next);
        self.next += 1;
        let broken = self.broken.iter().any(|b| b == source);
        let _ = self.tracks.insert(
            handle,
            Track {
                source: source.to_string(),
                position_ms: 0.0,
                rate: 1.0,
                playing: false,
                muted: false,
                volume: 1.0,
                announced: false,
                broken,
            },
        );
        Ok(handle)
    }

    fn play(&mut self, handle: MediaHandle) -> Result<(), MediaError> {
        let track = self
            .tracks
            .get_mut(&handle)
            .ok_or(MediaError::UnknownHandle(handle))?;
        if track.broken {
            return Err(MediaError::Autoplay(track.source.clone()));
        }
        track.playing = true;
        Ok(())
    }

    fn pause(&mut self, handle: MediaHandle) {
        if let Some(t) = self.tracks.get_mut(&handle) {
            t.playing = false;
        }
    }

    fn seek(&mut self, handle: MediaHandle, position_ms: u64) {
        if let Some(t) = self.tracks.get_mut(&handle) {
            t.position_ms = position_ms.min(self.length_ms) as f32;
        }
    }

    fn set_playback_rate(&mut self, handle: MediaHandle, rate: f32) {
        if let Some(t) = self.tracks.get_mut(&handle) {
            t.rate = rate.max(0.0);
        }
    }

    fn set_volume(&mut self, handle: MediaHandle, volume: f32) {
        if let Some(t) = self.tracks.get_mut(&handle) {
            t.volume = volume.clamp(0.0, 1.0);
        }
    }

    fn set_muted(&mut self, handle: MediaHandle, muted: bool) {
        if let Some(t) = self.tracks.get_mut(&handle) {
            t.muted = muted;
        }
    }

    fn close(&mut self, handle: MediaHandle) {
        let _ = self.tracks.remove(&handle);
    }

    fn poll_events(&mut self, now_ms: u64) -> Vec<MediaEvent> {
        let dt = self
            .last_poll_ms
            .map_or(0, |last| now_ms.saturating_sub(last)) as f32;
        self.last_poll_ms = Some(now_ms);

        let length = self.length_ms as f32;
        let mut events = Vec::new();
        for (handle, track) in self.tracks.iter_mut() {
            if !track.announced {
                track.announced = true;
                if track.broken {
                    events.push(MediaEvent::Error(*handle));
                } else {
                    events.push(MediaEvent::LoadedData(*handle));
                    events.push(MediaEvent::CanPlay(*handle));
                }
                continue;
            }
            if !track.playing {
                continue;
            }
            track.position_ms += dt * track.rate;
            if track.position_ms >= length {
                track.position_ms = length;
                track.playing = false;
                events.push(MediaEvent::Ended(*handle));
            }
        }
        events
    }
}
