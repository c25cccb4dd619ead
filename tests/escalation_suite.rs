use tap_chaos::audio::SilentAudio;
use tap_chaos::clock::{EscalationClock, TICK_MS};
use tap_chaos::gesture::{Key, Point, RawInput};
use tap_chaos::level::{ChaosLevel, Effect};
use tap_chaos::media::ClockedMedia;
use tap_chaos::session::ChaosSession;

fn session(seed: u64) -> ChaosSession {
    ChaosSession::new(
        Box::new(SilentAudio::new(500)),
        Box::new(ClockedMedia::new(3_000)),
        seed,
        0,
    )
}

fn tap(s: &mut ChaosSession, now: u64) {
    let p = Point::new(40.0, 40.0);
    let _ = s.handle_input(&RawInput::PointerDown(p), now);
    let _ = s.handle_input(&RawInput::PointerUp(p), now);
}

#[test]
fn clock_samples_two_through_ten_then_holds() {
    let t0 = 5_000;
    let mut clock = EscalationClock::new(0);
    assert!(clock.start(t0));
    assert!(!clock.start(t0 + 10), "start is idempotent while running");

    let mut seen = Vec::new();
    for i in 1..=9 {
        let _ = clock.poll(t0 + i * TICK_MS);
        seen.push(clock.level().get());
    }
    assert_eq!(seen, vec![2, 3, 4, 5, 6, 7, 8, 9, 10]);

    for i in 10..40 {
        let _ = clock.poll(t0 + i * TICK_MS);
        assert_eq!(clock.level(), ChaosLevel::MAX);
    }
    assert!(!clock.is_ticking());
    assert_eq!(clock.pending_timers(), 0);
    assert!(!clock.start(t0 + 50_000), "no restart once at the top");
}

#[test]
fn level_is_non_decreasing_and_bounded() {
    let mut s = session(3);
    tap(&mut s, 0);
    let mut last = 1;
    for t in (0..20_000).step_by(37) {
        s.advance(t);
        let level = s.level().map(|l| l.get()).unwrap_or(0);
        assert!((1..=10).contains(&level));
        assert!(level >= last);
        last = level;
    }
    assert_eq!(last, 10);
}

#[test]
fn level_is_absent_before_the_first_tap() {
    let mut s = session(4);
    for t in (0..30_000).step_by(500) {
        s.advance(t);
        assert!(s.level().is_none());
        assert!(!s.started());
    }
    // Moves and swipes on the entry screen do not start anything.
    let _ = s.handle_input(&RawInput::PointerDown(Point::new(10.0, 300.0)), 30_000);
    let _ = s.handle_input(&RawInput::PointerUp(Point::new(10.0, 100.0)), 30_000);
    assert!(!s.started());

    tap(&mut s, 30_000);
    assert_eq!(s.level(), Some(ChaosLevel::MIN));
    s.advance(31_000);
    assert_eq!(s.level(), Some(ChaosLevel::new(2)));
}

#[test]
fn enter_starts_from_the_entry_screen_only() {
    let mut s = session(5);
    let _ = s.handle_input(&RawInput::Key(Key::Other), 0);
    assert!(!s.started());
    let _ = s.handle_input(&RawInput::Key(Key::Enter), 0);
    assert!(s.started());
    assert!(s.audio().is_unlocked());

    // Later key taps change nothing.
    let before = s.media_index();
    let _ = s.handle_input(&RawInput::Key(Key::Space), 10);
    assert_eq!(s.media_index(), before);
}

#[test]
fn activation_table_matches_documented_levels() {
    let expected = [
        (Effect::VideoClones, 2),
        (Effect::ScreenShake, 3),
        (Effect::BouncePhysics, 3),
        (Effect::BrandImages, 3),
        (Effect::Rotation, 4),
        (Effect::ColorCycle, 5),
        (Effect::BrandText, 5),
        (Effect::ZoomPulse, 6),
        (Effect::BrandLogos, 7),
        (Effect::PlaybackVariance, 7),
        (Effect::Glitch, 7),
        (Effect::FakePopups, 8),
        (Effect::MemeText, 9),
        (Effect::BirthdayText, 10),
        (Effect::BrandFlash, 10),
    ];
    for (effect, level) in expected {
        assert_eq!(effect.activation(), level, "{}", effect.label());
        assert!(!effect.is_active(ChaosLevel::new(level - 1)));
        assert!(effect.is_active(ChaosLevel::new(level)));
        if level < 10 {
            assert_eq!(effect.progress(ChaosLevel::new(level)), 0.0);
        }
        assert_eq!(effect.progress(ChaosLevel::MAX), 1.0);
    }
}
