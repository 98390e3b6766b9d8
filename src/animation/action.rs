use super::clip::AnimationClip;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LoopMode {
    #[default]
    Repeat,
    Once,
}

/// Linear weight ramp scheduled on the owning mixer's clock.
#[derive(Clone, Copy, Debug, PartialEq)]
struct WeightFade {
    start: f32,
    end: f32,
    from: f32,
    to: f32,
}

impl WeightFade {
    fn value_at(&self, now: f32) -> f32 {
        if now >= self.end {
            return self.to;
        }
        if now <= self.start {
            return self.from;
        }
        let t = (now - self.start) / (self.end - self.start);
        self.from + (self.to - self.from) * t
    }
}

/// Playback state of one clip bound to a mixer.
///
/// Mutators return `&mut Self` so a transition can be written as a chain:
/// `action.reset().set_effective_time_scale(1.0).set_effective_weight(1.0).fade_in(0.5).play()`.
#[derive(Clone, Debug)]
pub struct ClipAction {
    clip: Arc<AnimationClip>,
    time: f32,
    time_scale: f32,
    weight: f32,
    enabled: bool,
    paused: bool,
    scheduled: bool,
    loop_mode: LoopMode,
    clamp_when_finished: bool,
    fade: Option<WeightFade>,
    now: f32,
}

impl ClipAction {
    pub(crate) fn new(clip: Arc<AnimationClip>, now: f32) -> Self {
        Self {
            clip,
            time: 0.0,
            time_scale: 1.0,
            weight: 1.0,
            enabled: true,
            paused: false,
            scheduled: false,
            loop_mode: LoopMode::Repeat,
            clamp_when_finished: false,
            fade: None,
            now,
        }
    }

    pub fn clip(&self) -> &Arc<AnimationClip> {
        &self.clip
    }

    pub fn name(&self) -> &str {
        &self.clip.name
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn loop_mode(&self) -> LoopMode {
        self.loop_mode
    }

    pub fn clamp_when_finished(&self) -> bool {
        self.clamp_when_finished
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Scheduled on its mixer via `play` and not stopped since.
    pub fn is_scheduled(&self) -> bool {
        self.scheduled
    }

    pub fn is_fading(&self) -> bool {
        self.fade.is_some()
    }

    /// Configured weight, or zero while disabled.
    pub fn effective_weight(&self) -> f32 {
        if self.enabled {
            self.weight
        } else {
            0.0
        }
    }

    pub fn effective_time_scale(&self) -> f32 {
        if self.paused {
            0.0
        } else {
            self.time_scale
        }
    }

    /// Weight this action contributes to the blended pose right now, fades included.
    pub fn blend_weight(&self) -> f32 {
        if !self.scheduled || !self.enabled {
            return 0.0;
        }
        let fade = self.fade.map(|f| f.value_at(self.now)).unwrap_or(1.0);
        self.weight * fade
    }

    pub fn set_loop(&mut self, mode: LoopMode, clamp_when_finished: bool) -> &mut Self {
        self.loop_mode = mode;
        self.clamp_when_finished = clamp_when_finished;
        self
    }

    pub fn reset(&mut self) -> &mut Self {
        self.paused = false;
        self.enabled = true;
        self.time = 0.0;
        self.fade = None;
        self
    }

    pub fn set_effective_time_scale(&mut self, time_scale: f32) -> &mut Self {
        self.time_scale = time_scale;
        self
    }

    pub fn set_effective_weight(&mut self, weight: f32) -> &mut Self {
        self.weight = weight;
        self.fade = None;
        self
    }

    pub fn fade_in(&mut self, duration: f32) -> &mut Self {
        self.schedule_fade(duration, 0.0, 1.0)
    }

    pub fn fade_out(&mut self, duration: f32) -> &mut Self {
        self.schedule_fade(duration, 1.0, 0.0)
    }

    pub fn play(&mut self) -> &mut Self {
        self.scheduled = true;
        self
    }

    /// Unschedules the action and rewinds it.
    pub fn stop(&mut self) -> &mut Self {
        self.scheduled = false;
        self.reset()
    }

    fn schedule_fade(&mut self, duration: f32, from: f32, to: f32) -> &mut Self {
        let duration = duration.max(0.0);
        self.fade = Some(WeightFade { start: self.now, end: self.now + duration, from, to });
        self
    }

    pub(crate) fn sync_clock(&mut self, now: f32) {
        self.now = now;
    }

    /// Advances clip-local time by `delta` mixer seconds and returns the resulting blend weight.
    pub(crate) fn advance(&mut self, now: f32, delta: f32) -> f32 {
        self.now = now;
        if !self.scheduled || !self.enabled {
            return 0.0;
        }
        self.advance_time(delta * self.effective_time_scale());
        self.update_weight()
    }

    fn advance_time(&mut self, delta: f32) {
        if delta == 0.0 {
            return;
        }
        let duration = self.clip.duration;
        let time = self.time + delta;
        match self.loop_mode {
            LoopMode::Once => {
                if time >= duration {
                    self.time = duration;
                    if self.clamp_when_finished {
                        self.paused = true;
                    } else {
                        self.enabled = false;
                    }
                } else {
                    self.time = time.max(0.0);
                }
            }
            LoopMode::Repeat => {
                self.time = if duration > 0.0 { time.rem_euclid(duration) } else { 0.0 };
            }
        }
    }

    fn update_weight(&mut self) -> f32 {
        if !self.enabled {
            return 0.0;
        }
        let mut weight = self.weight;
        if let Some(fade) = self.fade {
            let value = fade.value_at(self.now);
            weight *= value;
            if self.now >= fade.end {
                self.fade = None;
                if value == 0.0 {
                    self.enabled = false;
                }
            }
        }
        weight
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::clip::{ClipInterpolation, NodeTrack};
    use glam::Vec3;

    fn clip(duration: f32) -> Arc<AnimationClip> {
        let track = NodeTrack::translation(
            "Hips",
            ClipInterpolation::Linear,
            &[0.0, duration],
            vec![Vec3::ZERO, Vec3::Y],
        )
        .expect("track");
        Arc::new(AnimationClip::new("clip", vec![track]))
    }

    #[test]
    fn unscheduled_action_does_not_advance() {
        let mut action = ClipAction::new(clip(1.0), 0.0);
        assert_eq!(action.advance(0.5, 0.5), 0.0);
        assert_eq!(action.time(), 0.0);
    }

    #[test]
    fn repeat_wraps_time() {
        let mut action = ClipAction::new(clip(1.0), 0.0);
        action.play();
        action.advance(1.25, 1.25);
        assert!((action.time() - 0.25).abs() < 1e-6);
    }

    #[test]
    fn fade_in_ramps_weight_linearly() {
        let mut action = ClipAction::new(clip(2.0), 0.0);
        action.reset().set_effective_weight(1.0).fade_in(1.0).play();
        assert!((action.advance(0.25, 0.25) - 0.25).abs() < 1e-6);
        assert!((action.advance(1.5, 1.25) - 1.0).abs() < 1e-6);
        assert!(!action.is_fading());
    }

    #[test]
    fn completed_fade_out_disables_action() {
        let mut action = ClipAction::new(clip(2.0), 0.0);
        action.play().fade_out(0.5);
        action.advance(0.6, 0.6);
        assert!(!action.is_enabled());
        assert_eq!(action.blend_weight(), 0.0);
        action.reset();
        assert!(action.is_enabled(), "reset re-enables a faded out action");
    }

    #[test]
    fn zero_length_fade_completes_on_next_advance() {
        let mut action = ClipAction::new(clip(1.0), 3.0);
        action.fade_in(0.0).play();
        assert!((action.advance(3.016, 0.016) - 1.0).abs() < 1e-6);
        assert!(!action.is_fading());
    }

    #[test]
    fn once_with_clamp_holds_last_frame() {
        let mut action = ClipAction::new(clip(1.0), 0.0);
        action.set_loop(LoopMode::Once, true).play();
        action.advance(1.5, 1.5);
        assert_eq!(action.time(), 1.0);
        assert!(action.is_paused());
        assert!(action.is_enabled());
        assert_eq!(action.advance(2.0, 0.5), 1.0);
        assert_eq!(action.time(), 1.0);
    }

    #[test]
    fn once_without_clamp_disables() {
        let mut action = ClipAction::new(clip(1.0), 0.0);
        action.set_loop(LoopMode::Once, false).play();
        action.advance(1.5, 1.5);
        assert!(!action.is_enabled());
    }
}
