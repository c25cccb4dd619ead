use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use tap_chaos::audio::{
    AudioChannelManager, AudioEngine, AudioError, AudioEvent, SoundHandle, BASE_VOLUME,
    DEFERRED_LIMIT, DUCKED_VOLUME, EVICT_FADE_MS, MAX_CHANNELS, RANDOM_COOLDOWN_MS,
};

#[derive(Default)]
struct Log {
    next: u64,
    created: Vec<(SoundHandle, String)>,
    volumes: BTreeMap<SoundHandle, f32>,
    fades: Vec<(SoundHandle, f32, f32, u64)>,
    unloaded: Vec<SoundHandle>,
    pending: Vec<AudioEvent>,
    resume_failures: u32,
    resumes: u32,
}

/// Records every call; shares its log with the test through `Rc<RefCell<..>>`.
struct RecordingAudio(Rc<RefCell<Log>>);

impl AudioEngine for RecordingAudio {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn resume(&mut self) -> Result<(), AudioError> {
        let mut log = self.0.borrow_mut();
        log.resumes += 1;
        if log.resume_failures > 0 {
            log.resume_failures -= 1;
            return Err(AudioError::ContextSuspended("not allowed yet".into()));
        }
        Ok(())
    }

    fn create(&mut self, source: &str, volume: f32) -> Result<SoundHandle, AudioError> {
        if source.contains("broken") {
            return Err(AudioError::UnknownSource(source.to_string()));
        }
        let mut log = self.0.borrow_mut();
        log.next += 1;
        let handle = SoundHandle(log.next);
        log.created.push((handle, source.to_string()));
        log.volumes.insert(handle, volume);
        Ok(handle)
    }

    fn play(&mut self, _handle: SoundHandle) -> Result<(), AudioError> {
        Ok(())
    }

    fn set_volume(&mut self, handle: SoundHandle, volume: f32) {
        self.0.borrow_mut().volumes.insert(handle, volume);
    }

    fn fade(&mut self, handle: SoundHandle, from: f32, to: f32, duration_ms: u64) {
        self.0.borrow_mut().fades.push((handle, from, to, duration_ms));
    }

    fn unload(&mut self, handle: SoundHandle) {
        let mut log = self.0.borrow_mut();
        log.unloaded.push(handle);
        log.volumes.remove(&handle);
    }

    fn poll_events(&mut self, _now_ms: u64) -> Vec<AudioEvent> {
        std::mem::take(&mut self.0.borrow_mut().pending)
    }
}

fn manager() -> (AudioChannelManager, Rc<RefCell<Log>>) {
    let log = Rc::new(RefCell::new(Log::default()));
    let mgr = AudioChannelManager::new(
        Box::new(RecordingAudio(log.clone())),
        &["sfx/a", "sfx/b", "sfx/c"],
        7,
    );
    (mgr, log)
}

fn unlocked() -> (AudioChannelManager, Rc<RefCell<Log>>) {
    let (mut mgr, log) = manager();
    assert!(mgr.unlock(0));
    (mgr, log)
}

#[test]
fn ninth_sound_evicts_exactly_the_oldest() {
    let (mut mgr, log) = unlocked();
    for i in 0..MAX_CHANNELS as u64 {
        assert!(mgr.play("sfx/a", i * 10).is_some());
    }
    assert_eq!(mgr.open_count(), 8);
    assert!(log.borrow().fades.is_empty());

    let oldest = mgr.channels()[0].handle();
    assert!(mgr.play("sfx/b", 100).is_some());
    assert_eq!(mgr.open_count(), 8);
    assert!(mgr.channels().iter().all(|c| c.handle() != oldest));

    let fades = log.borrow().fades.clone();
    assert_eq!(fades.len(), 1);
    assert_eq!(fades[0].0, oldest);
    assert_eq!(fades[0].2, 0.0);
    assert_eq!(fades[0].3, EVICT_FADE_MS);
    assert_eq!(mgr.fading_count(), 1);

    mgr.update(100 + EVICT_FADE_MS - 1);
    assert!(!log.borrow().unloaded.contains(&oldest));
    mgr.update(100 + EVICT_FADE_MS);
    assert_eq!(log.borrow().unloaded, vec![oldest]);
    assert_eq!(mgr.fading_count(), 0);
}

#[test]
fn open_count_never_exceeds_cap() {
    let (mut mgr, _log) = unlocked();
    for i in 0..40u64 {
        let _ = mgr.play("sfx/c", i);
        assert!(mgr.open_count() <= MAX_CHANNELS);
    }
}

#[test]
fn ducking_follows_open_count_both_ways() {
    let (mut mgr, log) = unlocked();
    for i in 0..4u64 {
        let _ = mgr.play("sfx/a", i);
    }
    assert!(mgr.channels().iter().all(|c| c.volume == BASE_VOLUME));

    let _ = mgr.play("sfx/a", 5);
    assert_eq!(mgr.open_count(), 5);
    assert!(mgr.channels().iter().all(|c| c.volume == DUCKED_VOLUME));
    assert!(log.borrow().volumes.values().all(|v| *v == DUCKED_VOLUME));

    let finished = mgr.channels()[2].handle();
    log.borrow_mut().pending.push(AudioEvent::End(finished));
    mgr.update(10);
    assert_eq!(mgr.open_count(), 4);
    assert!(mgr.channels().iter().all(|c| c.volume == BASE_VOLUME));
    assert!(log.borrow().volumes.values().all(|v| *v == BASE_VOLUME));
}

#[test]
fn failed_loads_do_not_take_a_slot() {
    let (mut mgr, log) = unlocked();
    assert!(mgr.play("sfx/broken", 0).is_none());
    assert_eq!(mgr.open_count(), 0);

    let _ = mgr.play("sfx/a", 1);
    let h = mgr.channels()[0].handle();
    log.borrow_mut().pending.push(AudioEvent::LoadError(h));
    mgr.update(2);
    assert_eq!(mgr.open_count(), 0);
    assert_eq!(log.borrow().unloaded, vec![h]);
}

#[test]
fn refused_ninth_sound_keeps_every_channel() {
    let (mut mgr, log) = unlocked();
    for i in 0..MAX_CHANNELS as u64 {
        assert!(mgr.play("sfx/a", i).is_some());
    }
    let before: Vec<_> = mgr.channels().iter().map(|c| c.handle()).collect();

    assert!(mgr.play("sfx/broken", 100).is_none());
    assert_eq!(mgr.open_count(), MAX_CHANNELS);
    assert!(log.borrow().fades.is_empty());
    assert_eq!(mgr.fading_count(), 0);
    let after: Vec<_> = mgr.channels().iter().map(|c| c.handle()).collect();
    assert_eq!(before, after);
    assert!(mgr.channels().iter().all(|c| c.volume == DUCKED_VOLUME));
}

#[test]
fn random_play_is_throttled_from_last_accepted_call() {
    let (mut mgr, _log) = unlocked();
    assert!(mgr.throttled_play_random(1000).is_some());
    assert!(mgr.throttled_play_random(1000 + RANDOM_COOLDOWN_MS - 1).is_none());
    assert!(mgr.throttled_play_random(1000 + RANDOM_COOLDOWN_MS).is_some());
    // Un-throttled plays ignore the cooldown entirely.
    assert!(mgr.play_random(1000 + RANDOM_COOLDOWN_MS).is_some());
    assert_eq!(mgr.open_count(), 3);
}

#[test]
fn locked_output_defers_until_resume_succeeds() {
    let (mut mgr, log) = manager();
    log.borrow_mut().resume_failures = 1;

    assert!(!mgr.unlock(0));
    assert!(!mgr.is_unlocked());
    for i in 0..3u64 {
        assert!(mgr.play("sfx/b", i).is_none());
    }
    assert_eq!(mgr.deferred_count(), 3);
    assert_eq!(mgr.open_count(), 0);

    assert!(mgr.unlock(50));
    assert_eq!(log.borrow().resumes, 2);
    assert_eq!(mgr.deferred_count(), 0);
    assert_eq!(mgr.open_count(), 3);

    // Already unlocked: no further resume calls.
    assert!(mgr.unlock(60));
    assert_eq!(log.borrow().resumes, 2);
}

#[test]
fn deferred_queue_drops_oldest_past_its_limit() {
    let (mut mgr, log) = manager();
    log.borrow_mut().resume_failures = 1;
    let _ = mgr.unlock(0);
    let _ = mgr.play("sfx/first", 0);
    for i in 0..DEFERRED_LIMIT as u64 {
        let _ = mgr.play("sfx/a", i + 1);
    }
    assert_eq!(mgr.deferred_count(), DEFERRED_LIMIT);
    assert!(mgr.unlock(100));
    assert!(log.borrow().created.iter().all(|(_, s)| s != "sfx/first"));
}
