//! Fixed asset manifests. Every pool is an ordered list indexed by position.

pub const VIDEO_SOURCES: [&str; 8] = [
    "clips/dancing-cat.mp4",
    "clips/subway-surfers.mp4",
    "clips/spinning-fish.mp4",
    "clips/screaming-goat.mp4",
    "clips/hamster-stare.mp4",
    "clips/skateboard-fail.mp4",
    "clips/frog-dance.mp4",
    "clips/microwave-cat.mp4",
];

pub const AUDIO_SOURCES: [&str; 12] = [
    "sfx/airhorn",
    "sfx/vine-boom",
    "sfx/bruh",
    "sfx/sad-violin",
    "sfx/record-scratch",
    "sfx/oof",
    "sfx/bonk",
    "sfx/explosion",
    "sfx/error-ding",
    "sfx/dial-up",
    "sfx/kazoo-birthday",
    "sfx/laugh-track",
];

pub const MEME_TEXT: [&str; 16] = [
    "BRUH",
    "SHEESH",
    "NO CAP",
    "SKIBIDI",
    "OHIO",
    "RIZZ",
    "SUS",
    "L + RATIO",
    "IT'S GIVING",
    "MEWING",
    "NPC MODE",
    "BASED",
    "EMOTIONAL DAMAGE",
    "STONKS",
    "WE'RE SO BACK",
    "AND IT'S GONE",
];

pub const BIRTHDAY_TEXT: [&str; 6] = [
    "HAPPY BIRTHDAY",
    "HBD!!!",
    "MAKE A WISH",
    "ANOTHER YEAR",
    "PARTY TIME",
    "CAKE CAKE CAKE",
];

pub const BRAND_NAME: &str = "MEGA CRUNCH";

pub const BRAND_TEXT: [&str; 6] = [
    "MEGA CRUNCH",
    "NOW 300% CRUNCHIER",
    "CRUNCH RESPONSIBLY",
    "TASTE THE CHAOS",
    "LIMITED EDITION",
    "MEGA CRUNCH (TM)",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BrandAsset {
    Can,
    Bag,
    Mascot,
    Crown,
}

impl BrandAsset {
    pub const fn all() -> [Self; 4] {
        [Self::Can, Self::Bag, Self::Mascot, Self::Crown]
    }

    pub fn glyph(self) -> &'static str {
        match self {
            Self::Can => "[MC]",
            Self::Bag => "{MC}",
            Self::Mascot => "(^o^)",
            Self::Crown => "<MC>",
        }
    }

    pub fn rgb(self) -> (u8, u8, u8) {
        match self {
            Self::Can => (230, 30, 40),
            Self::Bag => (250, 200, 20),
            Self::Mascot => (255, 120, 0),
            Self::Crown => (255, 215, 0),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Font {
    Impact,
    ComicSans,
    ArialBlack,
    Papyrus,
}

impl Font {
    pub const fn all() -> [Self; 4] {
        [Self::Impact, Self::ComicSans, Self::ArialBlack, Self::Papyrus]
    }
}

pub const PALETTE: [(u8, u8, u8); 8] = [
    (255, 255, 255),
    (255, 255, 0),
    (0, 255, 255),
    (255, 0, 255),
    (0, 255, 0),
    (255, 64, 64),
    (255, 160, 0),
    (120, 120, 255),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PopupVariant {
    VirusAlert,
    LowBattery,
    FreePrize,
    SystemError,
    UpdateRequired,
}

impl PopupVariant {
    pub const fn all() -> [Self; 5] {
        [
            Self::VirusAlert,
            Self::LowBattery,
            Self::FreePrize,
            Self::SystemError,
            Self::UpdateRequired,
        ]
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::VirusAlert => "VIRUS DETECTED",
            Self::LowBattery => "Battery 1%",
            Self::FreePrize => "CONGRATULATIONS!!",
            Self::SystemError => "Fatal Error",
            Self::UpdateRequired => "Update Required",
        }
    }

    pub fn body(self) -> &'static str {
        match self {
            Self::VirusAlert => "37 viruses found. Tap to clean.",
            Self::LowBattery => "Connect charger immediately.",
            Self::FreePrize => "You are the 1,000,000th visitor!",
            Self::SystemError => "chaos.exe has stopped responding",
            Self::UpdateRequired => "Installing update 1 of 9999...",
        }
    }
}

/// Uniform pick by position.
pub fn pick<T: Copy>(rng: &mut fastrand::Rng, pool: &[T]) -> Option<T> {
    if pool.is_empty() {
        return None;
    }
    Some(pool[rng.usize(..pool.len())])
}
