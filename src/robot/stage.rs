use super::{ReadyRobot, Robot, StageError};
use crate::environment::SharedEnvironment;
use crate::renderer::RenderSurface;

/// Runtime view over both phases, for glue that only learns about the surface later
/// (the window is created inside the event loop). Renderer-dependent calls fail with
/// [`StageError::RendererNotSet`] until `setup_renderer` ran.
pub enum Stage<S: RenderSurface> {
    Configured(Robot),
    Ready(ReadyRobot<S>),
}

impl<S: RenderSurface> Stage<S> {
    pub fn new(robot: Robot) -> Self {
        Stage::Configured(robot)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Stage::Ready(_))
    }

    pub fn robot(&self) -> &Robot {
        match self {
            Stage::Configured(robot) => robot,
            Stage::Ready(ready) => ready.robot(),
        }
    }

    pub fn robot_mut(&mut self) -> &mut Robot {
        match self {
            Stage::Configured(robot) => robot,
            Stage::Ready(ready) => ready.robot_mut(),
        }
    }

    /// Enters the ready phase. Calling it again swaps the surface.
    pub fn setup_renderer(self, surface: S) -> Self {
        match self {
            Stage::Configured(robot) => Stage::Ready(robot.setup_renderer(surface)),
            Stage::Ready(mut ready) => {
                ready.replace_surface(surface);
                Stage::Ready(ready)
            }
        }
    }

    pub fn ready(&self) -> Result<&ReadyRobot<S>, StageError> {
        match self {
            Stage::Ready(ready) => Ok(ready),
            Stage::Configured(_) => Err(StageError::RendererNotSet),
        }
    }

    pub fn ready_mut(&mut self) -> Result<&mut ReadyRobot<S>, StageError> {
        match self {
            Stage::Ready(ready) => Ok(ready),
            Stage::Configured(_) => Err(StageError::RendererNotSet),
        }
    }

    pub fn neutral_environment(&self) -> Result<&SharedEnvironment, StageError> {
        Ok(self.ready()?.neutral_environment())
    }

    pub fn transition_to(&mut self, name: &str, fade_seconds: f32) -> Result<(), StageError> {
        self.ready_mut()?.transition_to(name, fade_seconds);
        Ok(())
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), StageError> {
        self.ready_mut()?.resize(width, height);
        Ok(())
    }

    pub fn animate(&mut self, delta_seconds: f32) -> Result<(), StageError> {
        self.ready_mut()?.animate(delta_seconds)?;
        Ok(())
    }

    pub fn render(&mut self) -> Result<(), StageError> {
        self.ready_mut()?.render()?;
        Ok(())
    }
}
