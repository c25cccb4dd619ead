use crate::assets::{AUDIO_SOURCES, VIDEO_SOURCES};
use crate::audio::{AudioChannelManager, AudioEngine};
use crate::clock::EscalationClock;
use crate::entity::{EntityId, Payload};
use crate::gesture::{Gesture, GestureInterpreter, RawInput};
use crate::level::ChaosLevel;
use crate::media::{DeckChange, MediaDeck, MediaEngine, MediaEvent, MediaHandle};
use crate::stage::{Stage, StageEvent};
use std::collections::BTreeMap;

/// Seed offsets so the stage and the audio manager draw from independent streams.
const AUDIO_SEED_SALT: u64 = 0x5eed_a0d1_0000_0001;

/// One run of the toy: entry screen until the first tap, then escalating chaos until exit.
pub struct ChaosSession {
    started: bool,
    now_ms: u64,
    clock: EscalationClock,
    stage: Stage,
    audio: AudioChannelManager,
    media: Box<dyn MediaEngine>,
    deck: MediaDeck,
    clones: BTreeMap<EntityId, MediaHandle>,
    gestures: GestureInterpreter,
}

impl ChaosSession {
    pub fn new(
        audio: Box<dyn AudioEngine>,
        media: Box<dyn MediaEngine>,
        seed: u64,
        now_ms: u64,
    ) -> Self {
        Self {
            started: false,
            now_ms,
            clock: EscalationClock::new(now_ms),
            stage: Stage::new(seed, now_ms, 0),
            audio: AudioChannelManager::new(audio, &AUDIO_SOURCES, seed ^ AUDIO_SEED_SALT),
            media,
            deck: MediaDeck::new(&VIDEO_SOURCES, 0),
            clones: BTreeMap::new(),
            gestures: GestureInterpreter::default(),
        }
    }

    pub fn started(&self) -> bool {
        self.started
    }

    /// `None` on the entry screen: the level only exists once chaos has begun.
    pub fn level(&self) -> Option<ChaosLevel> {
        self.started.then(|| self.clock.level())
    }

    pub fn media_index(&self) -> usize {
        self.deck.index()
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn audio(&self) -> &AudioChannelManager {
        &self.audio
    }

    pub fn deck(&self) -> &MediaDeck {
        &self.deck
    }

    pub fn clock(&self) -> &EscalationClock {
        &self.clock
    }

    pub fn clone_handle(&self, id: EntityId) -> Option<MediaHandle> {
        self.clones.get(&id).copied()
    }

    pub fn open_clone_media(&self) -> usize {
        self.clones.len()
    }

    /// Feeds one raw input event and acts on the gesture it completes, if any.
    pub fn handle_input(&mut self, input: &RawInput, now_ms: u64) -> Option<Gesture> {
        let gesture = self.gestures.feed(input)?;
        if !self.started {
            if matches!(gesture, Gesture::Tap | Gesture::KeyTap) {
                self.begin(now_ms);
            }
            return Some(gesture);
        }

        let _ = self.audio.unlock(now_ms);
        match gesture {
            Gesture::Move => {
                let _ = self.audio.throttled_play_random(now_ms);
            }
            Gesture::Swipe { direction, .. } => {
                let index = self.deck.wrapped(direction.media_step());
                self.select_media(index, now_ms);
                let _ = self.audio.play_random(now_ms);
            }
            Gesture::Tap | Gesture::KeyTap => {}
        }
        Some(gesture)
    }

    /// Runs everything due by `now_ms`: level ticks, stage timers and loops, audio, media.
    pub fn advance(&mut self, now_ms: u64) {
        self.now_ms = now_ms;
        if self.started {
            for level in self.clock.poll(now_ms) {
                tracing::info!(level = level.get(), "chaos level up");
                self.stage.sync(level, now_ms);
            }
            self.stage.advance(now_ms);
        }
        self.audio.update(now_ms);

        for event in self.media.poll_events(now_ms) {
            self.on_media_event(event, now_ms);
        }
        self.apply_stage_events();
    }

    /// Jumps straight to another media item, as a swipe would but without the sound.
    pub fn select_media(&mut self, index: usize, now_ms: u64) {
        let change = self.deck.select(self.media.as_mut(), index);
        self.after_deck_change(change);
        self.stage.set_media_index(self.deck.index(), now_ms);
        self.apply_stage_events();
    }

    fn begin(&mut self, now_ms: u64) {
        let _ = self.audio.unlock(now_ms);
        self.started = true;
        let _ = self.clock.start(now_ms);
        self.stage.sync(self.clock.level(), now_ms);
        let change = self.deck.open(self.media.as_mut());
        self.after_deck_change(change);
        if change != DeckChange::Exhausted {
            self.stage.set_media_index(self.deck.index(), now_ms);
        }
        self.apply_stage_events();
        tracing::info!(
            audio = self.audio.engine_name(),
            media = self.media.name(),
            unlocked = self.audio.is_unlocked(),
            "chaos started"
        );
    }

    fn on_media_event(&mut self, event: MediaEvent, now_ms: u64) {
        if self.deck.handle() == Some(event.handle()) {
            let change = self.deck.on_event(self.media.as_mut(), event);
            self.after_deck_change(change);
            if let DeckChange::Recovered { .. } = change {
                self.stage.set_media_index(self.deck.index(), now_ms);
            }
            return;
        }

        let handle = event.handle();
        let Some(id) = self
            .clones
            .iter()
            .find(|(_, h)| **h == handle)
            .map(|(id, _)| *id)
        else {
            return;
        };
        let failed = match event {
            MediaEvent::CanPlay(h) => self.media.play(h).is_err(),
            MediaEvent::Ended(h) => {
                self.media.seek(h, 0);
                self.media.play(h).is_err()
            }
            MediaEvent::Error(_) => true,
            MediaEvent::LoadedData(_) => false,
        };
        if failed {
            tracing::debug!(id = id.0, "clone media failed; dropping clone");
            let _ = self.stage.drop_clone(id);
        }
    }

    fn after_deck_change(&mut self, change: DeckChange) {
        match change {
            DeckChange::Recovered { from, to } => {
                tracing::debug!(from, to, "primary media skipped to next item");
            }
            DeckChange::Exhausted => {
                tracing::warn!("no playable primary media");
                return;
            }
            _ => {}
        }
        if let (Some(h), Payload::Video { playback_rate, .. }) =
            (self.deck.handle(), &self.stage.primary().payload)
        {
            self.media.set_playback_rate(h, *playback_rate);
        }
    }

    /// Mirrors clone spawns, removals and rate changes onto media handles.
    fn apply_stage_events(&mut self) {
        loop {
            let events = self.stage.drain_events();
            if events.is_empty() {
                return;
            }
            for event in events {
                match event {
                    StageEvent::VideoSpawned {
                        id,
                        source_index,
                        playback_rate,
                    } => self.open_clone(id, source_index, playback_rate),
                    StageEvent::VideoRemoved { id } => {
                        if let Some(h) = self.clones.remove(&id) {
                            self.media.close(h);
                        }
                    }
                    StageEvent::PlaybackRate { id, rate } => {
                        let handle = if id == self.stage.primary().id {
                            self.deck.handle()
                        } else {
                            self.clones.get(&id).copied()
                        };
                        if let Some(h) = handle {
                            self.media.set_playback_rate(h, rate);
                        }
                    }
                }
            }
        }
    }

    fn open_clone(&mut self, id: EntityId, source_index: usize, playback_rate: f32) {
        let Some(source) = VIDEO_SOURCES.get(source_index) else {
            let _ = self.stage.drop_clone(id);
            return;
        };
        match self.media.open(source) {
            Ok(h) => {
                self.media.set_muted(h, true);
                self.media.set_playback_rate(h, playback_rate);
                let _ = self.clones.insert(id, h);
            }
            Err(err) => {
                tracing::debug!(%err, id = id.0, "clone media failed to open");
                let _ = self.stage.drop_clone(id);
            }
        }
    }
}
