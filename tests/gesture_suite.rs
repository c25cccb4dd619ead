use tap_chaos::gesture::{Gesture, GestureInterpreter, Key, Point, RawInput, SwipeDirection};

fn drag(g: &mut GestureInterpreter, from: (f32, f32), to: (f32, f32)) -> Option<Gesture> {
    assert!(g.feed(&RawInput::PointerDown(Point::new(from.0, from.1))).is_none());
    g.feed(&RawInput::PointerUp(Point::new(to.0, to.1)))
}

#[test]
fn vertical_swipes_classify_by_direction() {
    let mut g = GestureInterpreter::default();
    assert_eq!(
        drag(&mut g, (100.0, 400.0), (100.0, 200.0)),
        Some(Gesture::Swipe {
            direction: SwipeDirection::Up,
            magnitude: 200.0
        })
    );
    assert_eq!(
        drag(&mut g, (100.0, 200.0), (100.0, 400.0)),
        Some(Gesture::Swipe {
            direction: SwipeDirection::Down,
            magnitude: 200.0
        })
    );
    assert!(!g.is_tracking());
}

#[test]
fn short_or_horizontal_motion_is_ignored() {
    let mut g = GestureInterpreter::default();
    assert_eq!(drag(&mut g, (100.0, 300.0), (100.0, 270.0)), None);
    assert_eq!(drag(&mut g, (100.0, 300.0), (100.0, 250.0)), None, "exactly 50 px is not enough");
    assert_eq!(drag(&mut g, (100.0, 300.0), (300.0, 200.0)), None);
    assert!(!g.is_tracking());
}

#[test]
fn release_near_start_is_a_tap() {
    let mut g = GestureInterpreter::default();
    assert_eq!(drag(&mut g, (50.0, 50.0), (50.0, 50.0)), Some(Gesture::Tap));
    assert_eq!(drag(&mut g, (50.0, 50.0), (58.0, 57.0)), Some(Gesture::Tap));
}

#[test]
fn moves_only_count_while_tracking() {
    let mut g = GestureInterpreter::default();
    assert!(g.feed(&RawInput::PointerMove(Point::new(1.0, 1.0))).is_none());
    let _ = g.feed(&RawInput::PointerDown(Point::new(1.0, 1.0)));
    assert_eq!(
        g.feed(&RawInput::PointerMove(Point::new(2.0, 2.0))),
        Some(Gesture::Move)
    );
}

#[test]
fn touch_uses_first_point_and_missing_points_reset() {
    let mut g = GestureInterpreter::default();
    let _ = g.feed(&RawInput::TouchStart(vec![
        Point::new(10.0, 500.0),
        Point::new(900.0, 900.0),
    ]));
    assert!(g.is_tracking());
    assert!(matches!(
        g.feed(&RawInput::TouchEnd(vec![Point::new(10.0, 300.0)])),
        Some(Gesture::Swipe {
            direction: SwipeDirection::Up,
            ..
        })
    ));

    let _ = g.feed(&RawInput::TouchStart(vec![Point::new(10.0, 10.0)]));
    assert_eq!(g.feed(&RawInput::TouchEnd(Vec::new())), None);
    assert!(!g.is_tracking());

    let _ = g.feed(&RawInput::TouchStart(Vec::new()));
    assert!(!g.is_tracking());

    let _ = g.feed(&RawInput::TouchStart(vec![Point::new(10.0, 10.0)]));
    assert_eq!(g.feed(&RawInput::TouchMove(Vec::new())), None);
    assert!(!g.is_tracking());
}

#[test]
fn enter_and_space_are_key_taps() {
    let mut g = GestureInterpreter::default();
    assert_eq!(g.feed(&RawInput::Key(Key::Enter)), Some(Gesture::KeyTap));
    assert_eq!(g.feed(&RawInput::Key(Key::Space)), Some(Gesture::KeyTap));
    assert_eq!(g.feed(&RawInput::Key(Key::Other)), None);
}
