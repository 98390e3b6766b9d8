use super::{ActionComplement, Robot, RobotState};
use crate::animation::{AnimationClip, ClipHandle};
use crate::assets::ModelNode;
use crate::environment::SharedEnvironment;
use crate::renderer::{FrameView, RenderSurface};
use anyhow::Result;
use bevy_ecs::entity::Entity;
use std::sync::Arc;

/// Ready phase: the controller bound to a render surface and its neutral environment.
pub struct ReadyRobot<S: RenderSurface> {
    robot: Robot,
    surface: S,
    neutral_environment: SharedEnvironment,
}

impl<S: RenderSurface> ReadyRobot<S> {
    pub(super) fn new(robot: Robot, mut surface: S) -> Self {
        let (width, height) = robot.dimensions;
        surface.resize(width, height);
        let neutral_environment = Arc::new(surface.neutral_environment());
        log::debug!(
            target: "renderer",
            "renderer ready at {width}x{height} with environment '{}'",
            neutral_environment.label()
        );
        Self { robot, surface, neutral_environment }
    }

    pub fn robot(&self) -> &Robot {
        &self.robot
    }

    pub fn robot_mut(&mut self) -> &mut Robot {
        &mut self.robot
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Swaps the render surface, keeping scene and animation state.
    pub fn replace_surface(&mut self, mut surface: S) -> S {
        let (width, height) = self.robot.dimensions;
        surface.resize(width, height);
        std::mem::replace(&mut self.surface, surface)
    }

    pub fn neutral_environment(&self) -> &SharedEnvironment {
        &self.neutral_environment
    }

    pub fn state(&self) -> RobotState {
        self.robot.state()
    }

    pub fn setup_loaded_character(&mut self, model: &ModelNode, clips: &[Arc<AnimationClip>]) -> Entity {
        self.robot.setup_loaded_character(model, clips)
    }

    pub fn spawn_prop(&mut self, model: &ModelNode) -> Entity {
        self.robot.spawn_prop(model)
    }

    pub fn register_auxiliary_animated(&mut self, root: Entity, clip: Arc<AnimationClip>) -> ClipHandle {
        self.robot.register_auxiliary_animated(root, clip)
    }

    pub fn attach_complement(&mut self, state: &str, partial: ActionComplement) {
        self.robot.attach_complement(state, partial);
    }

    pub fn change_expression(&mut self, name: &str) {
        self.robot.change_expression(name);
    }

    /// Cross-fades to `name`, resets the scene to its baseline and activates the new state.
    /// Unconfigured or not yet registered states are ignored.
    pub fn transition_to(&mut self, name: &str, fade_seconds: f32) {
        let robot = &mut self.robot;
        if !robot.config.is_available_action(name) {
            log::trace!(target: "stage", "state '{name}' is not configured");
            return;
        }
        let Some(incoming) = robot.actions.get(name) else {
            log::trace!(target: "stage", "state '{name}' is not registered yet");
            return;
        };

        let previous = robot.active.as_deref().and_then(|active| robot.actions.get(active));
        if let Some(previous) = previous.filter(|previous| previous.name() != name) {
            if let Some(action) = robot.rig.driver.action_mut(previous.clip()) {
                action.fade_out(fade_seconds);
            }
        }
        if let Some(action) = robot.rig.driver.action_mut(incoming.clip()) {
            action.reset().set_effective_time_scale(1.0).set_effective_weight(1.0).fade_in(fade_seconds).play();
        }

        robot.rig.reset_baseline(self.neutral_environment.clone());
        for action in robot.actions.values() {
            action.deactivate(&mut robot.rig);
        }
        incoming.activate(&mut robot.rig);

        log::debug!(
            target: "stage",
            "transition {} -> {name} over {fade_seconds:.2}s",
            robot.active.as_deref().unwrap_or("<none>")
        );
        robot.active = Some(name.to_string());
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.robot.dimensions = (width, height);
        self.robot.rig.camera.set_aspect(width, height);
        self.surface.resize(width, height);
    }

    /// Advances every mixer by `delta_seconds`, then draws the frame.
    pub fn animate(&mut self, delta_seconds: f32) -> Result<()> {
        let rig = &mut self.robot.rig;
        rig.driver.advance(delta_seconds, &mut rig.scene);
        self.render()
    }

    pub fn render(&mut self) -> Result<()> {
        let rig = &self.robot.rig;
        let nodes = rig.scene.visible_nodes();
        let frame = FrameView::capture(&rig.camera, &rig.scene, &nodes);
        self.surface.render(&frame)
    }
}
