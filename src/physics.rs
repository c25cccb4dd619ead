//! Screensaver-style motion: drift, random impulses, overshoot-then-reflect edges, spin, shake.

use crate::entity::{Entity, Pool, Vec2};
use crate::generators::EdgePolicy;
use crate::level::{lerp, ChaosLevel, Effect};
use fastrand::Rng;

pub const IMPULSE_CHANCE: f32 = 0.01;
pub const IMPULSE_MIN: f32 = 0.1;
pub const IMPULSE_MAX: f32 = 0.5;
pub const MAX_SPEED: f32 = 2.0;
/// How far past an edge a bouncing entity may travel before it reflects.
pub const BOUNCE_MARGIN: f32 = 5.0;
/// Drifting entities are culled once this far outside the viewport.
pub const CULL_MARGIN: f32 = 25.0;
pub const SHAKE_AMPLITUDE: (f32, f32) = (0.5, 3.0);

/// 1x at the bounce activation level, 2x at the top level.
pub fn speed_multiplier(level: ChaosLevel) -> f32 {
    if !Effect::BouncePhysics.is_active(level) {
        return 0.0;
    }
    1.0 + Effect::BouncePhysics.progress(level)
}

pub fn step_motion(entity: &mut Entity, edge: EdgePolicy, level: ChaosLevel, rng: &mut Rng) {
    if entity.velocity.is_none() || edge == EdgePolicy::Static {
        return;
    }
    let impulse = random_impulse(level, rng);
    step_with_impulse(entity, edge, level, impulse);
}

/// A rare kick whose strength grows with the bounce effect's progress.
fn random_impulse(level: ChaosLevel, rng: &mut Rng) -> Option<Vec2> {
    if rng.f32() >= IMPULSE_CHANCE {
        return None;
    }
    let strength = lerp(IMPULSE_MIN, IMPULSE_MAX, Effect::BouncePhysics.progress(level));
    Some(Vec2::new(
        (rng.f32() * 2.0 - 1.0) * strength,
        (rng.f32() * 2.0 - 1.0) * strength,
    ))
}

/// One motion step with a given impulse; speed is capped only when a kick lands.
pub fn step_with_impulse(
    entity: &mut Entity,
    edge: EdgePolicy,
    level: ChaosLevel,
    impulse: Option<Vec2>,
) {
    let Some(mut v) = entity.velocity else {
        return;
    };
    if edge == EdgePolicy::Static {
        return;
    }

    if let Some(kick) = impulse {
        v.x += kick.x;
        v.y += kick.y;
        let speed = v.length();
        if speed > MAX_SPEED {
            v.x *= MAX_SPEED / speed;
            v.y *= MAX_SPEED / speed;
        }
    }

    let mul = speed_multiplier(level);
    entity.pos.x += v.x * mul;
    entity.pos.y += v.y * mul;

    if edge == EdgePolicy::Bounce {
        v.x = reflect(entity.pos.x, v.x);
        v.y = reflect(entity.pos.y, v.y);
    }
    entity.velocity = Some(v);
}

fn reflect(pos: f32, v: f32) -> f32 {
    if (pos < -BOUNCE_MARGIN && v < 0.0) || (pos > 100.0 + BOUNCE_MARGIN && v > 0.0) {
        -v
    } else {
        v
    }
}

pub fn step_spin(entity: &mut Entity) {
    if entity.is_spinning() {
        entity.rotation = (entity.rotation + entity.spin_speed).rem_euclid(360.0);
    }
}

pub fn is_culled(entity: &Entity) -> bool {
    let lo = -CULL_MARGIN;
    let hi = 100.0 + CULL_MARGIN;
    entity.pos.x < lo || entity.pos.x > hi || entity.pos.y < lo || entity.pos.y > hi
}

/// One frame for a whole pool. Rotation only integrates when `spin` is set.
pub fn step_pool(pool: &mut Pool, edge: EdgePolicy, level: ChaosLevel, spin: bool, rng: &mut Rng) {
    for entity in pool.iter_mut() {
        step_motion(entity, edge, level, rng);
        if spin {
            step_spin(entity);
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Shake {
    offset: Vec2,
}

impl Shake {
    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    pub fn step(&mut self, level: ChaosLevel, rng: &mut Rng) {
        if !Effect::ScreenShake.is_active(level) {
            self.reset();
            return;
        }
        let amp = lerp(
            SHAKE_AMPLITUDE.0,
            SHAKE_AMPLITUDE.1,
            Effect::ScreenShake.progress(level),
        );
        self.offset = Vec2::new((rng.f32() * 2.0 - 1.0) * amp, (rng.f32() * 2.0 - 1.0) * amp);
    }

    pub fn reset(&mut self) {
        self.offset = Vec2::ZERO;
    }
}
