use crate::renderer::RenderSurface;
use crate::robot::{ReadyRobot, Stage, StageError};
use crate::time::FrameClock;
use std::time::Instant;

/// Delta-time driven frame loop: advance every mixer, render, wait for the next refresh.
pub struct RenderLoop {
    clock: FrameClock,
    frames: u64,
}

impl RenderLoop {
    pub fn new() -> Self {
        Self { clock: FrameClock::new(), frames: 0 }
    }

    pub fn starting_at(now: Instant) -> Self {
        Self { clock: FrameClock::starting_at(now), frames: 0 }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    /// Runs one frame with the wall-clock delta since the previous tick.
    pub fn tick<S: RenderSurface>(&mut self, robot: &mut ReadyRobot<S>) -> anyhow::Result<()> {
        let delta = self.clock.tick();
        self.frame(robot, delta)
    }

    pub fn tick_at<S: RenderSurface>(&mut self, robot: &mut ReadyRobot<S>, now: Instant) -> anyhow::Result<()> {
        let delta = self.clock.tick_at(now);
        self.frame(robot, delta)
    }

    pub fn frame<S: RenderSurface>(&mut self, robot: &mut ReadyRobot<S>, delta_seconds: f32) -> anyhow::Result<()> {
        self.frames += 1;
        robot.animate(delta_seconds)
    }

    /// Same as [`RenderLoop::tick`] for a stage whose phase is only known at runtime.
    pub fn tick_stage<S: RenderSurface>(&mut self, stage: &mut Stage<S>) -> Result<(), StageError> {
        let ready = stage.ready_mut()?;
        self.tick(ready)?;
        Ok(())
    }
}

impl Default for RenderLoop {
    fn default() -> Self {
        Self::new()
    }
}
