//! Everything the chaos level drives: entity pools, frame loops, filters, pulses and their
//! timers. [`Stage::sync`] applies the activation table in both directions, so a lower level
//! clears families and tears their loops down just like a higher one builds them up.

use crate::entity::{Entity, EntityId, Family, Payload, Pool, Vec2};
use crate::filters::{self, GlobalFilterState};
use crate::generators::{self, EdgePolicy, EntityIds, FamilySpec, Reconciled, LEVELED};
use crate::level::{lerp, ChaosLevel, Effect};
use crate::physics::{self, Shake};
use crate::pulse::{PulseBook, PulseTimer};
use crate::scheduler::{AnimationLoop, Scheduler, TimerId};
use fastrand::Rng;

pub const POPUP_CHANCE: (f32, f32) = (0.01, 0.03);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StageTask {
    InversionEnd,
    FlashEnd,
    CorruptionExpire(EntityId),
    PopupExpire(EntityId),
    Pulse(PulseTimer),
}

/// Video-side changes the owner must mirror onto media handles.
#[derive(Clone, Debug, PartialEq)]
pub enum StageEvent {
    VideoSpawned {
        id: EntityId,
        source_index: usize,
        playback_rate: f32,
    },
    VideoRemoved {
        id: EntityId,
    },
    PlaybackRate {
        id: EntityId,
        rate: f32,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopKind {
    Motion,
    Color,
    Glitch,
    Popups,
}

pub struct Stage {
    level: ChaosLevel,
    media_index: usize,
    now_ms: u64,
    primary: Entity,
    leveled: Vec<Pool>,
    corruption: Pool,
    popups: Pool,
    filters: GlobalFilterState,
    shake: Shake,
    pulses: PulseBook,
    motion: AnimationLoop,
    color: AnimationLoop,
    glitch: AnimationLoop,
    popup_loop: AnimationLoop,
    timers: Scheduler<StageTask>,
    inversion_timer: Option<TimerId>,
    flash_timer: Option<TimerId>,
    ids: EntityIds,
    rng: Rng,
    events: Vec<StageEvent>,
}

fn pulses_family(family: Family) -> bool {
    matches!(
        family,
        Family::PrimaryVideo | Family::VideoClone | Family::BrandImage
    )
}

impl Stage {
    pub fn new(seed: u64, now_ms: u64, media_index: usize) -> Self {
        let mut ids = EntityIds::new();
        let primary = Entity {
            id: ids.next(),
            family: Family::PrimaryVideo,
            pos: Vec2::new(50.0, 50.0),
            rotation: 0.0,
            scale: 1.0,
            velocity: None,
            spin_speed: 0.0,
            created_at_ms: now_ms,
            payload: Payload::Video {
                source_index: media_index,
                playback_rate: 1.0,
            },
        };
        Self {
            level: ChaosLevel::MIN,
            media_index,
            now_ms,
            primary,
            leveled: LEVELED.iter().map(|s| Pool::new(s.family, s.cap)).collect(),
            corruption: Pool::new(Family::CorruptionRect, generators::CORRUPTION_CAP),
            popups: Pool::new(Family::FakePopup, generators::POPUP_CAP),
            filters: GlobalFilterState::default(),
            shake: Shake::default(),
            pulses: PulseBook::default(),
            motion: AnimationLoop::default(),
            color: AnimationLoop::default(),
            glitch: AnimationLoop::default(),
            popup_loop: AnimationLoop::default(),
            timers: Scheduler::new(now_ms),
            inversion_timer: None,
            flash_timer: None,
            ids,
            rng: Rng::with_seed(seed),
            events: Vec::new(),
        }
    }

    pub fn level(&self) -> ChaosLevel {
        self.level
    }

    pub fn media_index(&self) -> usize {
        self.media_index
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn primary(&self) -> &Entity {
        &self.primary
    }

    pub fn pool(&self, family: Family) -> Option<&Pool> {
        match family {
            Family::CorruptionRect => Some(&self.corruption),
            Family::FakePopup => Some(&self.popups),
            _ => self.leveled.iter().find(|p| p.family() == family),
        }
    }

    fn family_len(&self, family: Family) -> usize {
        self.pool(family).map_or(0, Pool::len)
    }

    pub fn clone_count(&self) -> usize {
        self.family_len(Family::VideoClone)
    }

    /// Primary video plus clones.
    pub fn video_count(&self) -> usize {
        1 + self.clone_count()
    }

    pub fn clone_ids(&self) -> Vec<EntityId> {
        self.pool(Family::VideoClone).map(Pool::ids).unwrap_or_default()
    }

    /// Every entity in back-to-front draw order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> + '_ {
        // Logos sit behind the primary video, everything else in front of it.
        let logos = self.pool(Family::BrandLogo).into_iter().flat_map(Pool::iter);
        let front = [
            Family::VideoClone,
            Family::BrandImage,
            Family::BrandText,
            Family::MemeText,
            Family::BirthdayText,
        ]
        .into_iter()
        .filter_map(move |f| self.pool(f))
        .flat_map(Pool::iter);
        logos
            .chain(std::iter::once(&self.primary))
            .chain(front)
            .chain(self.corruption.iter())
            .chain(self.popups.iter())
    }

    pub fn filters(&self) -> &GlobalFilterState {
        &self.filters
    }

    pub fn shake_offset(&self) -> Vec2 {
        self.shake.offset()
    }

    pub fn pulse_scale(&self, id: EntityId) -> f32 {
        self.pulses.scale(id, self.now_ms)
    }

    pub fn pulsing(&self) -> usize {
        self.pulses.len()
    }

    /// Scale including the current pulse.
    pub fn effective_scale(&self, entity: &Entity) -> f32 {
        entity.scale * self.pulse_scale(entity.id)
    }

    pub fn loop_running(&self, kind: LoopKind) -> bool {
        match kind {
            LoopKind::Motion => self.motion.is_running(),
            LoopKind::Color => self.color.is_running(),
            LoopKind::Glitch => self.glitch.is_running(),
            LoopKind::Popups => self.popup_loop.is_running(),
        }
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.pending()
    }

    /// Armed revert timers as `(inversion, brand flash)`.
    pub fn pending_reverts(&self) -> (usize, usize) {
        (
            self.timers.count_where(|t| *t == StageTask::InversionEnd),
            self.timers.count_where(|t| *t == StageTask::FlashEnd),
        )
    }

    pub fn drain_events(&mut self) -> Vec<StageEvent> {
        std::mem::take(&mut self.events)
    }

    /// Applies the activation table for `level`, growing or tearing down every family.
    pub fn sync(&mut self, level: ChaosLevel, now_ms: u64) {
        self.run_timers(now_ms);
        self.level = level;

        for idx in 0..self.leveled.len() {
            let spec = LEVELED[idx];
            let changes = generators::reconcile(
                &mut self.leveled[idx],
                &spec,
                level,
                now_ms,
                self.media_index,
                &mut self.rng,
                &mut self.ids,
            );
            self.apply_changes(&spec, changes);
        }

        self.sync_loops();
        self.sync_pulses();
        self.sync_playback_rates();
        tracing::debug!(
            level = level.get(),
            videos = self.video_count(),
            pulsing = self.pulses.len(),
            "stage synced"
        );
    }

    /// Switches the clone pool to a new media item: every clone is replaced with a fresh id.
    pub fn set_media_index(&mut self, media_index: usize, now_ms: u64) {
        self.run_timers(now_ms);
        self.media_index = media_index;
        if let Payload::Video { source_index, .. } = &mut self.primary.payload {
            *source_index = media_index;
        }
        let spec = generators::VIDEO_CLONES;
        let Some(idx) = LEVELED.iter().position(|s| s.family == spec.family) else {
            return;
        };
        let changes = generators::regenerate(
            &mut self.leveled[idx],
            &spec,
            self.level,
            now_ms,
            media_index,
            &mut self.rng,
            &mut self.ids,
        );
        self.apply_changes(&spec, changes);
        self.sync_pulses();
    }

    /// Drops a clone whose media failed; it is not respawned until the next reconcile.
    pub fn drop_clone(&mut self, id: EntityId) -> bool {
        let Some(pool) = self.leveled_mut(Family::VideoClone) else {
            return false;
        };
        if pool.remove(id).is_none() {
            return false;
        }
        self.forget_pulse(id);
        self.events.push(StageEvent::VideoRemoved { id });
        true
    }

    /// Fires due timers, then runs one frame of every running loop.
    pub fn advance(&mut self, now_ms: u64) {
        self.run_timers(now_ms);
        self.frame();
    }

    fn leveled_mut(&mut self, family: Family) -> Option<&mut Pool> {
        self.leveled.iter_mut().find(|p| p.family() == family)
    }

    fn apply_changes(&mut self, spec: &FamilySpec, changes: Reconciled) {
        for removed in &changes.removed {
            self.forget_pulse(removed.id);
            if spec.family == Family::VideoClone {
                self.events.push(StageEvent::VideoRemoved { id: removed.id });
            }
        }
        if spec.family != Family::VideoClone {
            return;
        }
        for id in changes.spawned {
            let Some(pool) = self.pool(Family::VideoClone) else {
                continue;
            };
            let Some(entity) = pool.get(id) else {
                continue;
            };
            if let Payload::Video {
                source_index,
                playback_rate,
            } = entity.payload
            {
                self.events.push(StageEvent::VideoSpawned {
                    id,
                    source_index,
                    playback_rate,
                });
            }
        }
    }

    fn forget_pulse(&mut self, id: EntityId) {
        if self.pulses.detach(id) {
            let _ = self
                .timers
                .cancel_where(|t| matches!(t, StageTask::Pulse(p) if p.id == id));
        }
    }

    fn sync_loops(&mut self) {
        let level = self.level;

        if Effect::BouncePhysics.is_active(level) {
            let _ = self.motion.start();
        } else {
            let _ = self.motion.cancel();
            self.shake.reset();
        }

        if Effect::ColorCycle.is_active(level) {
            let _ = self.color.start();
        } else {
            let _ = self.color.cancel();
            self.cancel_one_shot(StageTask::InversionEnd);
            self.cancel_one_shot(StageTask::FlashEnd);
            self.filters.reset_color();
        }
        if !Effect::BrandFlash.is_active(level) {
            self.cancel_one_shot(StageTask::FlashEnd);
            self.filters.brand_flash = false;
        }

        if Effect::Glitch.is_active(level) {
            let _ = self.glitch.start();
        } else {
            let _ = self.glitch.cancel();
            self.filters.reset_glitch();
            let _ = self.corruption.clear();
            let _ = self
                .timers
                .cancel_where(|t| matches!(t, StageTask::CorruptionExpire(_)));
        }

        if Effect::FakePopups.is_active(level) {
            let _ = self.popup_loop.start();
        } else {
            let _ = self.popup_loop.cancel();
            let _ = self.popups.clear();
            let _ = self
                .timers
                .cancel_where(|t| matches!(t, StageTask::PopupExpire(_)));
        }
    }

    fn cancel_one_shot(&mut self, task: StageTask) {
        let slot = match task {
            StageTask::InversionEnd => &mut self.inversion_timer,
            StageTask::FlashEnd => &mut self.flash_timer,
            _ => return,
        };
        if let Some(id) = slot.take() {
            let _ = self.timers.cancel(id);
        }
    }

    fn sync_pulses(&mut self) {
        if !Effect::ZoomPulse.is_active(self.level) {
            self.pulses.clear();
            let _ = self
                .timers
                .cancel_where(|t| matches!(t, StageTask::Pulse(_)));
            return;
        }

        let mut wanted = vec![self.primary.id];
        for pool in &self.leveled {
            if pulses_family(pool.family()) {
                wanted.extend(pool.ids());
            }
        }
        for id in self.pulses.ids() {
            if !wanted.contains(&id) {
                self.forget_pulse(id);
            }
        }
        for id in wanted {
            if let Some((delay, timer)) = self.pulses.attach(id, self.level, &mut self.rng) {
                let _ = self.timers.set_timeout(delay, StageTask::Pulse(timer));
            }
        }
    }

    fn sync_playback_rates(&mut self) {
        let level = self.level;
        let primary_rate = generators::playback_rate(level, &mut self.rng);
        if let Payload::Video { playback_rate, .. } = &mut self.primary.payload {
            if *playback_rate != primary_rate {
                *playback_rate = primary_rate;
                self.events.push(StageEvent::PlaybackRate {
                    id: self.primary.id,
                    rate: primary_rate,
                });
            }
        }

        let Some(idx) = self
            .leveled
            .iter()
            .position(|p| p.family() == Family::VideoClone)
        else {
            return;
        };
        for clone in self.leveled[idx].iter_mut() {
            let rate = generators::playback_rate(level, &mut self.rng);
            if let Payload::Video { playback_rate, .. } = &mut clone.payload {
                if *playback_rate != rate {
                    *playback_rate = rate;
                    self.events.push(StageEvent::PlaybackRate { id: clone.id, rate });
                }
            }
        }
    }

    fn run_timers(&mut self, now_ms: u64) {
        while let Some((_, task)) = self.timers.pop_due(now_ms) {
            self.now_ms = self.timers.now_ms();
            self.handle_task(task);
        }
        self.now_ms = now_ms.max(self.now_ms);
    }

    fn handle_task(&mut self, task: StageTask) {
        let level = self.level;
        match task {
            StageTask::InversionEnd => {
                self.inversion_timer = None;
                if Effect::ColorCycle.is_active(level) {
                    self.filters.inverted = false;
                }
            }
            StageTask::FlashEnd => {
                self.flash_timer = None;
                if Effect::BrandFlash.is_active(level) {
                    self.filters.brand_flash = false;
                }
            }
            StageTask::CorruptionExpire(id) => {
                if Effect::Glitch.is_active(level) {
                    let _ = self.corruption.remove(id);
                }
            }
            StageTask::PopupExpire(id) => {
                if Effect::FakePopups.is_active(level) {
                    let _ = self.popups.remove(id);
                }
            }
            StageTask::Pulse(timer) => {
                if !Effect::ZoomPulse.is_active(level) {
                    return;
                }
                if let Some((delay, next)) =
                    self.pulses.on_timer(timer, self.now_ms, level, &mut self.rng)
                {
                    let _ = self.timers.set_timeout(delay, StageTask::Pulse(next));
                }
            }
        }
    }

    fn frame(&mut self) {
        let level = self.level;

        if self.motion.frame() && Effect::BouncePhysics.is_active(level) {
            let spin = Effect::Rotation.is_active(level);
            for idx in 0..self.leveled.len() {
                let spec = LEVELED[idx];
                physics::step_pool(&mut self.leveled[idx], spec.edge, level, spin, &mut self.rng);
                if spec.edge == EdgePolicy::Drift {
                    let culled = self.leveled[idx].drain_where(physics::is_culled);
                    let mut changes = Reconciled {
                        spawned: Vec::new(),
                        removed: culled,
                    };
                    let topped = generators::top_up(
                        &mut self.leveled[idx],
                        &spec,
                        level,
                        self.now_ms,
                        self.media_index,
                        &mut self.rng,
                        &mut self.ids,
                    );
                    changes.spawned.extend(topped.spawned);
                    changes.removed.extend(topped.removed);
                    self.apply_changes(&spec, changes);
                }
            }
            self.shake.step(level, &mut self.rng);
        }

        if self.color.frame() && Effect::ColorCycle.is_active(level) {
            let step = self.filters.step_color(level, &mut self.rng);
            if step.inversion_started {
                self.inversion_timer =
                    Some(self.timers.set_timeout(filters::INVERT_MS, StageTask::InversionEnd));
            }
            if step.flash_started {
                self.flash_timer =
                    Some(self.timers.set_timeout(filters::FLASH_MS, StageTask::FlashEnd));
            }
        }

        if self.glitch.frame() && Effect::Glitch.is_active(level) {
            if self.filters.step_glitch(level, &mut self.rng) {
                let rect = generators::spawn_corruption(self.ids.next(), self.now_ms, &mut self.rng);
                let id = rect.id;
                for old in self.corruption.admit(rect) {
                    let _ = self
                        .timers
                        .cancel_where(|t| *t == StageTask::CorruptionExpire(old.id));
                }
                let ttl = generators::corruption_ttl_ms(&mut self.rng);
                let _ = self.timers.set_timeout(ttl, StageTask::CorruptionExpire(id));
            }
        }

        if self.popup_loop.frame() && Effect::FakePopups.is_active(level) {
            let chance = lerp(
                POPUP_CHANCE.0,
                POPUP_CHANCE.1,
                Effect::FakePopups.progress(level),
            );
            if self.rng.f32() < chance {
                let popup = generators::spawn_popup(self.ids.next(), self.now_ms, &mut self.rng);
                let id = popup.id;
                for old in self.popups.admit(popup) {
                    let _ = self
                        .timers
                        .cancel_where(|t| *t == StageTask::PopupExpire(old.id));
                }
                let _ = self
                    .timers
                    .set_timeout(generators::POPUP_TTL_MS, StageTask::PopupExpire(id));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME_MS: u64 = 16;

    /// Follows one revert timer at a time and checks each span it guards.
    #[derive(Default)]
    struct Spans {
        current: Option<(TimerId, u64)>,
        started: u32,
    }

    impl Spans {
        fn observe(&mut self, timer: Option<TimerId>, now: u64, limit_ms: u64) {
            if let Some((id, start)) = self.current {
                if timer == Some(id) {
                    return;
                }
                assert!(now - start <= limit_ms + FRAME_MS, "span of {} ms", now - start);
                self.current = None;
            }
            if let Some(id) = timer {
                self.current = Some((id, now));
                self.started += 1;
            }
        }
    }

    #[test]
    fn inversions_and_flashes_revert_on_their_own() {
        let mut stage = Stage::new(21, 0, 0);
        stage.sync(ChaosLevel::MAX, 0);
        let mut inversions = Spans::default();
        let mut flashes = Spans::default();
        let mut t = 0;
        while t <= 60_000 {
            stage.advance(t);
            assert_eq!(stage.filters.inverted, stage.inversion_timer.is_some());
            assert_eq!(stage.filters.brand_flash, stage.flash_timer.is_some());
            inversions.observe(stage.inversion_timer, t, filters::INVERT_MS);
            flashes.observe(stage.flash_timer, t, filters::FLASH_MS);
            t += FRAME_MS;
        }
        assert!(inversions.started > 5, "{}", inversions.started);
        assert!(flashes.started > 5, "{}", flashes.started);
    }
}
