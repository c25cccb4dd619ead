use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;
use tap_chaos::assets::VIDEO_SOURCES;
use tap_chaos::audio::SilentAudio;
use tap_chaos::gesture::{Point, RawInput};
use tap_chaos::media::{ClockedMedia, MediaEngine, MediaError, MediaEvent, MediaHandle};
use tap_chaos::session::ChaosSession;

const POOL: usize = VIDEO_SOURCES.len();

fn session_with(media: Box<dyn MediaEngine>, seed: u64) -> ChaosSession {
    ChaosSession::new(Box::new(SilentAudio::new(400)), media, seed, 0)
}

fn started(seed: u64) -> ChaosSession {
    let mut s = session_with(Box::new(ClockedMedia::new(2_000)), seed);
    tap(&mut s, 0);
    s
}

fn tap(s: &mut ChaosSession, now: u64) {
    let p = Point::new(80.0, 80.0);
    let _ = s.handle_input(&RawInput::PointerDown(p), now);
    let _ = s.handle_input(&RawInput::PointerUp(p), now);
}

fn swipe(s: &mut ChaosSession, dy: f32, dx: f32, now: u64) {
    let from = Point::new(200.0, 400.0);
    let to = Point::new(200.0 + dx, 400.0 - dy);
    let _ = s.handle_input(&RawInput::PointerDown(from), now);
    let _ = s.handle_input(&RawInput::PointerUp(to), now);
}

fn run_until(s: &mut ChaosSession, from: u64, to: u64) {
    let mut t = from;
    while t <= to {
        s.advance(t);
        t += 16;
    }
}

#[test]
fn swipes_step_media_index_with_wrap() {
    let mut s = started(1);
    assert_eq!(s.media_index(), 0);

    swipe(&mut s, 200.0, 0.0, 10);
    assert_eq!(s.media_index(), 1);
    swipe(&mut s, -200.0, 0.0, 20);
    assert_eq!(s.media_index(), 0);
    swipe(&mut s, -200.0, 0.0, 30);
    assert_eq!(s.media_index(), POOL - 1);
    swipe(&mut s, 200.0, 0.0, 40);
    assert_eq!(s.media_index(), 0);
}

#[test]
fn weak_or_sideways_swipes_change_nothing() {
    let mut s = started(2);
    swipe(&mut s, 30.0, 0.0, 10);
    assert_eq!(s.media_index(), 0);
    swipe(&mut s, 120.0, 150.0, 20);
    assert_eq!(s.media_index(), 0);
    swipe(&mut s, -120.0, -150.0, 30);
    assert_eq!(s.media_index(), 0);
}

#[test]
fn swipes_play_a_sound_every_time_moves_are_throttled() {
    let mut s = started(3);
    swipe(&mut s, 200.0, 0.0, 10);
    swipe(&mut s, 200.0, 0.0, 11);
    assert_eq!(s.audio().open_count(), 2);

    let _ = s.handle_input(&RawInput::PointerDown(Point::new(5.0, 5.0)), 20);
    for t in 20..60 {
        let _ = s.handle_input(&RawInput::PointerMove(Point::new(5.0 + t as f32, 5.0)), t);
    }
    assert_eq!(s.audio().open_count(), 3);
}

#[test]
fn one_video_at_level_one_and_two_or_three_at_level_two() {
    for seed in 0..20 {
        let mut s = started(seed);
        assert_eq!(s.stage().video_count(), 1);
        s.advance(1_000);
        let videos = s.stage().video_count();
        assert!((2..=3).contains(&videos), "seed {seed}: {videos}");
        assert_eq!(s.open_clone_media(), videos - 1);
    }
}

#[test]
fn video_total_never_exceeds_fifteen() {
    for seed in 0..10 {
        let mut s = started(seed);
        let mut t = 0;
        while t <= 14_000 {
            s.advance(t);
            assert!(s.stage().video_count() <= 15);
            if t % 1_700 == 0 {
                swipe(&mut s, 200.0, 0.0, t);
            }
            t += 50;
        }
    }
}

#[test]
fn clone_count_grows_on_average() {
    let mut early = 0;
    let mut late = 0;
    for seed in 0..30 {
        let mut s = started(seed);
        s.advance(1_000);
        early += s.stage().clone_count();
        s.advance(9_000);
        late += s.stage().clone_count();
    }
    assert!(late > early * 3, "early {early}, late {late}");
}

#[test]
fn media_change_regenerates_clones_with_new_ids() {
    let mut s = started(8);
    run_until(&mut s, 0, 6_000);
    let before: BTreeSet<_> = s.stage().clone_ids().into_iter().collect();
    assert!(!before.is_empty());

    swipe(&mut s, 200.0, 0.0, 6_010);
    let after: BTreeSet<_> = s.stage().clone_ids().into_iter().collect();
    assert!(before.is_disjoint(&after));
    assert!((before.len() as i64 - after.len() as i64).abs() <= 2);
    assert_eq!(s.open_clone_media(), after.len());
}

#[test]
fn primary_error_advances_to_next_item() {
    let media = ClockedMedia::new(2_000).with_broken(&[VIDEO_SOURCES[0]]);
    let mut s = session_with(Box::new(media), 9);
    tap(&mut s, 0);
    assert_eq!(s.media_index(), 0);
    s.advance(16);
    assert_eq!(s.media_index(), 1);
    s.advance(32);
    assert_eq!(s.media_index(), 1);
}

#[test]
fn all_items_broken_gives_up_after_one_lap() {
    let media = ClockedMedia::new(2_000).with_broken(&VIDEO_SOURCES);
    let mut s = session_with(Box::new(media), 10);
    tap(&mut s, 0);
    run_until(&mut s, 0, 2_000);
    assert!(s.media_index() < POOL);
    let settled = s.media_index();
    run_until(&mut s, 2_016, 3_000);
    assert_eq!(s.media_index(), settled);
    assert!(s.started());
}

#[derive(Default)]
struct MediaLog {
    next: u64,
    open: BTreeSet<MediaHandle>,
    pending: Vec<MediaEvent>,
}

struct ScriptedMedia(Rc<RefCell<MediaLog>>);

impl MediaEngine for ScriptedMedia {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn open(&mut self, _source: &str) -> Result<MediaHandle, MediaError> {
        let mut log = self.0.borrow_mut();
        log.next += 1;
        let h = MediaHandle(log.next);
        log.open.insert(h);
        Ok(h)
    }

    fn play(&mut self, _handle: MediaHandle) -> Result<(), MediaError> {
        Ok(())
    }

    fn pause(&mut self, _handle: MediaHandle) {}
    fn seek(&mut self, _handle: MediaHandle, _position_ms: u64) {}
    fn set_playback_rate(&mut self, _handle: MediaHandle, _rate: f32) {}
    fn set_volume(&mut self, _handle: MediaHandle, _volume: f32) {}
    fn set_muted(&mut self, _handle: MediaHandle, _muted: bool) {}

    fn close(&mut self, handle: MediaHandle) {
        self.0.borrow_mut().open.remove(&handle);
    }

    fn poll_events(&mut self, _now_ms: u64) -> Vec<MediaEvent> {
        std::mem::take(&mut self.0.borrow_mut().pending)
    }
}

#[test]
fn clone_error_drops_only_that_clone() {
    let log = Rc::new(RefCell::new(MediaLog::default()));
    let mut s = session_with(Box::new(ScriptedMedia(log.clone())), 11);
    tap(&mut s, 0);
    s.advance(2_000);
    let clones = s.stage().clone_ids();
    assert!(!clones.is_empty());
    let victim = clones[0];
    let handle = s.clone_handle(victim).expect("clone has media");
    let primary = s.deck().handle().expect("primary open");

    log.borrow_mut().pending.push(MediaEvent::Error(handle));
    s.advance(2_001);

    assert!(!s.stage().clone_ids().contains(&victim));
    assert_eq!(s.stage().clone_count(), clones.len() - 1);
    assert!(s.clone_handle(victim).is_none());
    assert!(!log.borrow().open.contains(&handle));
    assert_eq!(s.deck().handle(), Some(primary));
    assert_eq!(s.media_index(), 0);
    // Primary plus every remaining clone still holds a handle.
    assert_eq!(log.borrow().open.len(), 1 + s.stage().clone_count());
}
