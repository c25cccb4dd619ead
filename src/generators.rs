//! Level-driven spawners, one [`FamilySpec`] per entity family.

use crate::assets::{self, BrandAsset, Font, PopupVariant};
use crate::entity::{Entity, EntityId, Family, Payload, Pool, Vec2};
use crate::level::{lerp, ChaosLevel, Effect};
use fastrand::Rng;
use std::f32::consts::TAU;

/// How an entity behaves at the viewport edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgePolicy {
    Static,
    /// Overshoots slightly, then reflects.
    Bounce,
    /// Leaves the screen and gets culled.
    Drift,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FamilySpec {
    pub family: Family,
    pub effect: Effect,
    pub min_count: usize,
    pub max_count: usize,
    pub cap: usize,
    pub scale: (f32, f32),
    pub spin_chance: f32,
    /// Degrees per frame.
    pub spin_speed: (f32, f32),
    /// Percent per frame, `(base, max)` across level progress.
    pub velocity: Option<(f32, f32)>,
    pub edge: EdgePolicy,
}

pub const VIDEO_CLONES: FamilySpec = FamilySpec {
    family: Family::VideoClone,
    effect: Effect::VideoClones,
    min_count: 1,
    max_count: 14,
    cap: 14,
    scale: (0.25, 0.55),
    spin_chance: 0.6,
    spin_speed: (0.5, 3.0),
    velocity: Some((0.15, 0.6)),
    edge: EdgePolicy::Bounce,
};

pub const BRAND_IMAGES: FamilySpec = FamilySpec {
    family: Family::BrandImage,
    effect: Effect::BrandImages,
    min_count: 1,
    max_count: 8,
    cap: 8,
    scale: (0.6, 1.4),
    spin_chance: 0.7,
    spin_speed: (1.0, 4.0),
    velocity: Some((0.2, 0.8)),
    edge: EdgePolicy::Bounce,
};

pub const BRAND_TEXT: FamilySpec = FamilySpec {
    family: Family::BrandText,
    effect: Effect::BrandText,
    min_count: 2,
    max_count: 10,
    cap: 10,
    scale: (0.8, 1.5),
    spin_chance: 0.6,
    spin_speed: (0.5, 2.0),
    velocity: Some((0.1, 0.4)),
    edge: EdgePolicy::Drift,
};

pub const BRAND_LOGOS: FamilySpec = FamilySpec {
    family: Family::BrandLogo,
    effect: Effect::BrandLogos,
    min_count: 3,
    max_count: 15,
    cap: 15,
    scale: (0.5, 1.0),
    spin_chance: 0.65,
    spin_speed: (0.3, 1.5),
    velocity: None,
    edge: EdgePolicy::Static,
};

pub const MEME_TEXT: FamilySpec = FamilySpec {
    family: Family::MemeText,
    effect: Effect::MemeText,
    min_count: 8,
    max_count: 20,
    cap: 20,
    scale: (0.8, 1.6),
    spin_chance: 0.65,
    spin_speed: (0.5, 2.0),
    velocity: Some((0.1, 0.5)),
    edge: EdgePolicy::Drift,
};

pub const BIRTHDAY_TEXT: FamilySpec = FamilySpec {
    family: Family::BirthdayText,
    effect: Effect::BirthdayText,
    min_count: 3,
    max_count: 5,
    cap: 5,
    scale: (1.0, 1.8),
    spin_chance: 0.7,
    spin_speed: (0.5, 1.5),
    velocity: Some((0.15, 0.4)),
    edge: EdgePolicy::Drift,
};

/// Families reconciled against the level, in spawn order.
pub const LEVELED: [FamilySpec; 6] = [
    VIDEO_CLONES,
    BRAND_IMAGES,
    BRAND_TEXT,
    BRAND_LOGOS,
    MEME_TEXT,
    BIRTHDAY_TEXT,
];

pub const CORRUPTION_CAP: usize = 5;
pub const CORRUPTION_TTL_MS: (u64, u64) = (150, 450);
pub const POPUP_CAP: usize = 5;
pub const POPUP_TTL_MS: u64 = 2500;

pub fn spec_for(family: Family) -> Option<&'static FamilySpec> {
    LEVELED.iter().find(|s| s.family == family)
}

#[derive(Clone, Debug, Default)]
pub struct EntityIds {
    next: u64,
}

impl EntityIds {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn next(&mut self) -> EntityId {
        self.next = self.next.max(1);
        let id = EntityId(self.next);
        self.next += 1;
        id
    }
}

/// What a reconcile pass changed.
#[derive(Clone, Debug, Default)]
pub struct Reconciled {
    pub spawned: Vec<EntityId>,
    pub removed: Vec<Entity>,
}

impl Reconciled {
    pub fn is_empty(&self) -> bool {
        self.spawned.is_empty() && self.removed.is_empty()
    }

    fn absorb(&mut self, other: Reconciled) {
        self.spawned.extend(other.spawned);
        self.removed.extend(other.removed);
    }
}

/// Interpolated count with a fresh ±1 jitter; zero below activation.
pub fn target_count(spec: &FamilySpec, level: ChaosLevel, rng: &mut Rng) -> usize {
    if !spec.effect.is_active(level) {
        return 0;
    }
    let progress = spec.effect.progress(level);
    let base = lerp(spec.min_count as f32, spec.max_count as f32, progress).round() as i64;
    let jittered = base + i64::from(rng.i8(-1..=1));
    jittered.clamp(spec.min_count as i64, spec.max_count.min(spec.cap) as i64) as usize
}

pub fn playback_rate(level: ChaosLevel, rng: &mut Rng) -> f32 {
    if !Effect::PlaybackVariance.is_active(level) {
        return 1.0;
    }
    let p = Effect::PlaybackVariance.progress(level);
    let lo = lerp(0.75, 0.5, p);
    let hi = lerp(1.5, 2.0, p);
    lerp(lo, hi, rng.f32())
}

pub fn rand_range(rng: &mut Rng, (lo, hi): (f32, f32)) -> f32 {
    lerp(lo, hi, rng.f32())
}

/// Builds one entity of `spec.family` at a random spot biased toward the visible area.
pub fn spawn(
    spec: &FamilySpec,
    id: EntityId,
    level: ChaosLevel,
    now_ms: u64,
    media_index: usize,
    rng: &mut Rng,
) -> Entity {
    let pos = Vec2::new(rand_range(rng, (10.0, 90.0)), rand_range(rng, (10.0, 90.0)));
    let rotation = rand_range(rng, (-20.0, 20.0)).rem_euclid(360.0);
    let scale = rand_range(rng, spec.scale);

    let spin_speed = if rng.f32() < spec.spin_chance {
        let magnitude = rand_range(rng, spec.spin_speed);
        if rng.bool() { magnitude } else { -magnitude }
    } else {
        0.0
    };

    let velocity = spec.velocity.map(|(base, max)| {
        let speed = lerp(base, max, spec.effect.progress(level));
        let angle = rng.f32() * TAU;
        Vec2::new(angle.cos() * speed, angle.sin() * speed)
    });

    Entity {
        id,
        family: spec.family,
        pos,
        rotation,
        scale,
        velocity,
        spin_speed,
        created_at_ms: now_ms,
        payload: payload_for(spec.family, level, media_index, rng),
    }
}

fn payload_for(family: Family, level: ChaosLevel, media_index: usize, rng: &mut Rng) -> Payload {
    let color = assets::pick(rng, &assets::PALETTE).unwrap_or((255, 255, 255));
    let font = assets::pick(rng, &Font::all()).unwrap_or(Font::Impact);
    match family {
        Family::PrimaryVideo | Family::VideoClone => Payload::Video {
            source_index: media_index,
            playback_rate: playback_rate(level, rng),
        },
        Family::MemeText => Payload::Text {
            text: assets::pick(rng, &assets::MEME_TEXT).unwrap_or("BRUH"),
            font,
            color,
        },
        Family::BirthdayText => Payload::Text {
            text: assets::pick(rng, &assets::BIRTHDAY_TEXT).unwrap_or("HAPPY BIRTHDAY"),
            font,
            color,
        },
        Family::BrandText => Payload::Text {
            text: assets::pick(rng, &assets::BRAND_TEXT).unwrap_or(assets::BRAND_NAME),
            font,
            color: (255, 40, 40),
        },
        Family::BrandImage => Payload::Image {
            asset: assets::pick(rng, &BrandAsset::all()).unwrap_or(BrandAsset::Can),
            opacity: 1.0,
        },
        Family::BrandLogo => Payload::Image {
            asset: BrandAsset::Crown,
            opacity: rand_range(rng, (0.15, 0.35)),
        },
        Family::CorruptionRect => Payload::Corruption {
            width: rand_range(rng, (5.0, 40.0)),
            height: rand_range(rng, (1.0, 8.0)),
            opacity: rand_range(rng, (0.4, 0.9)),
        },
        Family::FakePopup => Payload::Popup {
            variant: assets::pick(rng, &PopupVariant::all()).unwrap_or(PopupVariant::SystemError),
        },
    }
}

/// Moves `pool` toward a freshly jittered target: clear below activation, spawn up, trim oldest.
pub fn reconcile(
    pool: &mut Pool,
    spec: &FamilySpec,
    level: ChaosLevel,
    now_ms: u64,
    media_index: usize,
    rng: &mut Rng,
    ids: &mut EntityIds,
) -> Reconciled {
    if !spec.effect.is_active(level) {
        return Reconciled {
            spawned: Vec::new(),
            removed: pool.clear(),
        };
    }

    let target = target_count(spec, level, rng);
    pool.set_target(target);
    let mut out = Reconciled {
        spawned: Vec::new(),
        removed: pool.trim_to(target),
    };
    out.absorb(top_up(pool, spec, level, now_ms, media_index, rng, ids));
    out
}

/// Spawns back up to the last computed target without re-rolling it.
pub fn top_up(
    pool: &mut Pool,
    spec: &FamilySpec,
    level: ChaosLevel,
    now_ms: u64,
    media_index: usize,
    rng: &mut Rng,
    ids: &mut EntityIds,
) -> Reconciled {
    let mut out = Reconciled::default();
    if !spec.effect.is_active(level) {
        return out;
    }
    while pool.len() < pool.target() {
        let entity = spawn(spec, ids.next(), level, now_ms, media_index, rng);
        out.spawned.push(entity.id);
        out.removed.extend(pool.admit(entity));
    }
    out
}

/// Replaces the whole pool with new ids, keeping the count near its previous value.
pub fn regenerate(
    pool: &mut Pool,
    spec: &FamilySpec,
    level: ChaosLevel,
    now_ms: u64,
    media_index: usize,
    rng: &mut Rng,
    ids: &mut EntityIds,
) -> Reconciled {
    let mut out = Reconciled {
        spawned: Vec::new(),
        removed: pool.clear(),
    };
    out.absorb(reconcile(pool, spec, level, now_ms, media_index, rng, ids));
    out
}

pub fn spawn_corruption(id: EntityId, now_ms: u64, rng: &mut Rng) -> Entity {
    Entity {
        id,
        family: Family::CorruptionRect,
        pos: Vec2::new(rand_range(rng, (0.0, 95.0)), rand_range(rng, (0.0, 95.0))),
        rotation: 0.0,
        scale: 1.0,
        velocity: None,
        spin_speed: 0.0,
        created_at_ms: now_ms,
        payload: payload_for(Family::CorruptionRect, ChaosLevel::MAX, 0, rng),
    }
}

pub fn spawn_popup(id: EntityId, now_ms: u64, rng: &mut Rng) -> Entity {
    Entity {
        id,
        family: Family::FakePopup,
        pos: Vec2::new(rand_range(rng, (10.0, 90.0)), rand_range(rng, (10.0, 90.0))),
        rotation: rand_range(rng, (-8.0, 8.0)).rem_euclid(360.0),
        scale: 1.0,
        velocity: None,
        spin_speed: 0.0,
        created_at_ms: now_ms,
        payload: payload_for(Family::FakePopup, ChaosLevel::MAX, 0, rng),
    }
}

pub fn corruption_ttl_ms(rng: &mut Rng) -> u64 {
    rng.u64(CORRUPTION_TTL_MS.0..=CORRUPTION_TTL_MS.1)
}
