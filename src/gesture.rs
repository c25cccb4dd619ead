//! Pointer, touch and key input folded into the three gestures the session understands.

pub const SWIPE_THRESHOLD_PX: f32 = 50.0;
pub const TAP_SLOP_PX: f32 = 12.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Enter,
    Space,
    Other,
}

/// Input as the shell delivers it. Touch events carry every active point; only the first counts.
#[derive(Clone, Debug, PartialEq)]
pub enum RawInput {
    PointerDown(Point),
    PointerMove(Point),
    PointerUp(Point),
    TouchStart(Vec<Point>),
    TouchMove(Vec<Point>),
    TouchEnd(Vec<Point>),
    Key(Key),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SwipeDirection {
    /// Finger moved up the screen: next media item.
    Up,
    Down,
}

impl SwipeDirection {
    pub fn media_step(self) -> isize {
        match self {
            Self::Up => 1,
            Self::Down => -1,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Gesture {
    Tap,
    /// `magnitude` is `|dy|` in pixels.
    Swipe {
        direction: SwipeDirection,
        magnitude: f32,
    },
    Move,
    /// Enter or Space; only honoured on the entry screen.
    KeyTap,
}

#[derive(Clone, Copy, Debug, PartialEq, Default)]
enum Tracking {
    #[default]
    Idle,
    Tracking {
        start: Point,
    },
}

#[derive(Clone, Debug, Default)]
pub struct GestureInterpreter {
    state: Tracking,
}

/// Classifies a release. `None` means the motion was neither a tap nor a vertical swipe.
pub fn classify(start: Point, end: Point) -> Option<Gesture> {
    let dy = start.y - end.y;
    let dx = end.x - start.x;
    if dy.abs() > SWIPE_THRESHOLD_PX && dy.abs() > dx.abs() {
        let direction = if dy > 0.0 {
            SwipeDirection::Up
        } else {
            SwipeDirection::Down
        };
        return Some(Gesture::Swipe {
            direction,
            magnitude: dy.abs(),
        });
    }
    if dx.hypot(dy) <= TAP_SLOP_PX {
        return Some(Gesture::Tap);
    }
    None
}

impl GestureInterpreter {
    pub fn is_tracking(&self) -> bool {
        matches!(self.state, Tracking::Tracking { .. })
    }

    pub fn reset(&mut self) {
        self.state = Tracking::Idle;
    }

    pub fn feed(&mut self, input: &RawInput) -> Option<Gesture> {
        match input {
            RawInput::PointerDown(p) => self.down(Some(*p)),
            RawInput::TouchStart(points) => self.down(points.first().copied()),
            RawInput::PointerMove(_) => self.moved(true),
            RawInput::TouchMove(points) => self.moved(!points.is_empty()),
            RawInput::PointerUp(p) => self.up(Some(*p)),
            RawInput::TouchEnd(points) => self.up(points.first().copied()),
            RawInput::Key(Key::Enter | Key::Space) => Some(Gesture::KeyTap),
            RawInput::Key(Key::Other) => None,
        }
    }

    fn down(&mut self, point: Option<Point>) -> Option<Gesture> {
        self.state = match point {
            Some(start) => Tracking::Tracking { start },
            None => Tracking::Idle,
        };
        None
    }

    fn moved(&mut self, has_point: bool) -> Option<Gesture> {
        if !self.is_tracking() {
            return None;
        }
        if !has_point {
            self.reset();
            return None;
        }
        Some(Gesture::Move)
    }

    fn up(&mut self, point: Option<Point>) -> Option<Gesture> {
        let state = std::mem::take(&mut self.state);
        let Tracking::Tracking { start } = state else {
            return None;
        };
        classify(start, point?)
    }
}
