//! Session-wide post-process state: hue cycle, saturation spikes, inversion, glitch.

use crate::level::{lerp, ChaosLevel, Effect};
use fastrand::Rng;

pub const NEUTRAL_SATURATION: f32 = 100.0;
pub const NEUTRAL_CONTRAST: f32 = 100.0;
pub const NEUTRAL_BRIGHTNESS: f32 = 100.0;

pub const HUE_RATE: (f32, f32) = (0.5, 5.0);
pub const SATURATION_SPIKE_CHANCE: f32 = 0.01;
pub const SATURATION_SPIKE: f32 = 300.0;
pub const SATURATION_DECAY: f32 = 8.0;
pub const INVERT_CHANCE: (f32, f32) = (0.003, 0.012);
pub const INVERT_MS: u64 = 120;
pub const FLASH_CHANCE: f32 = 0.02;
pub const FLASH_MS: u64 = 100;

pub const CONTRAST_SPIKE_CHANCE: f32 = 0.02;
pub const CONTRAST_SPIKE: f32 = 250.0;
pub const CONTRAST_DECAY: f32 = 10.0;
pub const BRIGHTNESS_SPIKE_CHANCE: f32 = 0.02;
pub const BRIGHTNESS_SPIKE: f32 = 180.0;
pub const BRIGHTNESS_DECAY: f32 = 5.0;
/// Pixels of channel offset across glitch progress.
pub const ABERRATION: (f32, f32) = (2.0, 8.0);
pub const CORRUPTION_CHANCE: f32 = 0.05;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlobalFilterState {
    /// Degrees in `[0, 360)`.
    pub hue: f32,
    /// Percent, `100` is untouched.
    pub saturation: f32,
    pub inverted: bool,
    pub contrast: f32,
    pub brightness: f32,
    pub chromatic_aberration: f32,
    pub brand_flash: bool,
}

impl Default for GlobalFilterState {
    fn default() -> Self {
        Self {
            hue: 0.0,
            saturation: NEUTRAL_SATURATION,
            inverted: false,
            contrast: NEUTRAL_CONTRAST,
            brightness: NEUTRAL_BRIGHTNESS,
            chromatic_aberration: 0.0,
            brand_flash: false,
        }
    }
}

/// One-shot pulses that started this frame; the caller arms their revert timers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ColorStep {
    pub inversion_started: bool,
    pub flash_started: bool,
}

impl GlobalFilterState {
    pub fn is_neutral(&self) -> bool {
        *self == Self::default()
    }

    pub fn color_is_neutral(&self) -> bool {
        self.hue == 0.0
            && self.saturation == NEUTRAL_SATURATION
            && !self.inverted
            && !self.brand_flash
    }

    pub fn glitch_is_neutral(&self) -> bool {
        self.contrast == NEUTRAL_CONTRAST
            && self.brightness == NEUTRAL_BRIGHTNESS
            && self.chromatic_aberration == 0.0
    }

    pub fn step_color(&mut self, level: ChaosLevel, rng: &mut Rng) -> ColorStep {
        let mut out = ColorStep::default();
        if !Effect::ColorCycle.is_active(level) {
            self.reset_color();
            return out;
        }
        let p = Effect::ColorCycle.progress(level);
        self.hue = (self.hue + lerp(HUE_RATE.0, HUE_RATE.1, p)).rem_euclid(360.0);
        self.saturation = spike_or_decay(
            self.saturation,
            rng,
            SATURATION_SPIKE_CHANCE,
            SATURATION_SPIKE,
            SATURATION_DECAY,
            NEUTRAL_SATURATION,
        );

        if !self.inverted && rng.f32() < lerp(INVERT_CHANCE.0, INVERT_CHANCE.1, p) {
            self.inverted = true;
            out.inversion_started = true;
        }
        if Effect::BrandFlash.is_active(level) && !self.brand_flash && rng.f32() < FLASH_CHANCE {
            self.brand_flash = true;
            out.flash_started = true;
        }
        out
    }

    /// Returns true when a corruption rectangle should spawn this frame.
    pub fn step_glitch(&mut self, level: ChaosLevel, rng: &mut Rng) -> bool {
        if !Effect::Glitch.is_active(level) {
            self.reset_glitch();
            return false;
        }
        self.contrast = spike_or_decay(
            self.contrast,
            rng,
            CONTRAST_SPIKE_CHANCE,
            CONTRAST_SPIKE,
            CONTRAST_DECAY,
            NEUTRAL_CONTRAST,
        );
        self.brightness = spike_or_decay(
            self.brightness,
            rng,
            BRIGHTNESS_SPIKE_CHANCE,
            BRIGHTNESS_SPIKE,
            BRIGHTNESS_DECAY,
            NEUTRAL_BRIGHTNESS,
        );
        self.chromatic_aberration =
            lerp(ABERRATION.0, ABERRATION.1, Effect::Glitch.progress(level));
        rng.f32() < CORRUPTION_CHANCE
    }

    pub fn reset_color(&mut self) {
        self.hue = 0.0;
        self.saturation = NEUTRAL_SATURATION;
        self.inverted = false;
        self.brand_flash = false;
    }

    pub fn reset_glitch(&mut self) {
        self.contrast = NEUTRAL_CONTRAST;
        self.brightness = NEUTRAL_BRIGHTNESS;
        self.chromatic_aberration = 0.0;
    }
}

fn spike_or_decay(value: f32, rng: &mut Rng, chance: f32, spike: f32, decay: f32, rest: f32) -> f32 {
    if rng.f32() < chance {
        spike
    } else {
        (value - decay).max(rest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spike_decays_linearly_to_rest() {
        let mut rng = Rng::with_seed(0);
        let mut v = SATURATION_SPIKE;
        let mut frames = 0;
        while v > NEUTRAL_SATURATION {
            v = spike_or_decay(v, &mut rng, 0.0, SATURATION_SPIKE, SATURATION_DECAY, 100.0);
            frames += 1;
        }
        assert_eq!(v, NEUTRAL_SATURATION);
        assert_eq!(frames, 25);
    }

    #[test]
    fn hue_wraps_and_resets() {
        let mut rng = Rng::with_seed(4);
        let mut f = GlobalFilterState::default();
        for _ in 0..1000 {
            f.step_color(ChaosLevel::MAX, &mut rng);
            assert!((0.0..360.0).contains(&f.hue));
        }
        f.step_color(ChaosLevel::new(4), &mut rng);
        assert!(f.color_is_neutral());
    }
}
