use std::fmt;

/// Chaos level, always within `[1, 10]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChaosLevel(u8);

impl ChaosLevel {
    pub const MIN: Self = Self(1);
    pub const MAX: Self = Self(10);

    /// Clamps into range.
    pub const fn new(raw: u8) -> Self {
        if raw < Self::MIN.0 {
            Self::MIN
        } else if raw > Self::MAX.0 {
            Self::MAX
        } else {
            Self(raw)
        }
    }

    pub const fn get(self) -> u8 {
        self.0
    }

    pub fn is_max(self) -> bool {
        self == Self::MAX
    }

    /// Next level up, saturating at `MAX`.
    pub fn next(self) -> Self {
        Self::new(self.0.saturating_add(1))
    }

    /// Progress through `[activation, MAX]` as `0.0..=1.0`.
    ///
    /// Zero below activation. An activation of `MAX` counts as fully progressed once reached.
    pub fn progress_from(self, activation: u8) -> f32 {
        if self.0 < activation {
            return 0.0;
        }
        let span = Self::MAX.0.saturating_sub(activation);
        if span == 0 {
            return 1.0;
        }
        (f32::from(self.0 - activation) / f32::from(span)).clamp(0.0, 1.0)
    }
}

impl Default for ChaosLevel {
    fn default() -> Self {
        Self::MIN
    }
}

impl fmt::Display for ChaosLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Every level-gated behaviour and the level it switches on at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Effect {
    VideoClones,
    ScreenShake,
    BouncePhysics,
    BrandImages,
    Rotation,
    ColorCycle,
    BrandText,
    ZoomPulse,
    BrandLogos,
    PlaybackVariance,
    Glitch,
    FakePopups,
    MemeText,
    BirthdayText,
    BrandFlash,
}

impl Effect {
    pub const fn all() -> [Self; 15] {
        [
            Self::VideoClones,
            Self::ScreenShake,
            Self::BouncePhysics,
            Self::BrandImages,
            Self::Rotation,
            Self::ColorCycle,
            Self::BrandText,
            Self::ZoomPulse,
            Self::BrandLogos,
            Self::PlaybackVariance,
            Self::Glitch,
            Self::FakePopups,
            Self::MemeText,
            Self::BirthdayText,
            Self::BrandFlash,
        ]
    }

    pub const fn activation(self) -> u8 {
        match self {
            Self::VideoClones => 2,
            Self::ScreenShake | Self::BouncePhysics | Self::BrandImages => 3,
            Self::Rotation => 4,
            Self::ColorCycle | Self::BrandText => 5,
            Self::ZoomPulse => 6,
            Self::BrandLogos | Self::PlaybackVariance | Self::Glitch => 7,
            Self::FakePopups => 8,
            Self::MemeText => 9,
            Self::BirthdayText | Self::BrandFlash => 10,
        }
    }

    pub fn is_active(self, level: ChaosLevel) -> bool {
        level.get() >= self.activation()
    }

    pub fn progress(self, level: ChaosLevel) -> f32 {
        level.progress_from(self.activation())
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::VideoClones => "clones",
            Self::ScreenShake => "shake",
            Self::BouncePhysics => "bounce",
            Self::BrandImages => "brand-img",
            Self::Rotation => "spin",
            Self::ColorCycle => "color",
            Self::BrandText => "brand-txt",
            Self::ZoomPulse => "pulse",
            Self::BrandLogos => "logos",
            Self::PlaybackVariance => "speed",
            Self::Glitch => "glitch",
            Self::FakePopups => "popups",
            Self::MemeText => "memes",
            Self::BirthdayText => "bday",
            Self::BrandFlash => "flash",
        }
    }
}

pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
