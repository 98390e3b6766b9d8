//! The showcase stage: one character, a closed set of animated states with per-state scene
//! decorations, and one-hot facial expressions.
//!
//! Construction is two-phase. [`Robot`] holds everything that can be prepared before a render
//! surface exists (asset registration, complements, expressions); [`Robot::setup_renderer`]
//! turns it into a [`ReadyRobot`], which alone can transition, resize and draw. Glue code that
//! cannot track the phase statically goes through [`Stage`], which reports
//! [`StageError::RendererNotSet`] instead.

pub mod action;
pub mod defaults;
pub mod error;
pub mod kinds;
pub mod ready;
pub mod rig;
pub mod stage;

pub use action::{ActionComplement, RobotAction};
pub use error::StageError;
pub use kinds::ActionKind;
pub use ready::ReadyRobot;
pub use rig::SceneRig;
pub use stage::Stage;

use crate::animation::{AnimationClip, ClipHandle};
use crate::assets::ModelNode;
use crate::config::StageConfig;
use crate::renderer::RenderSurface;
use bevy_ecs::entity::Entity;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Read-only view of the controller for pickers and tests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RobotState {
    pub actions: Vec<String>,
    pub expressions: Vec<String>,
    pub active_action: Option<String>,
    pub has_face: bool,
}

/// Configured phase of the stage controller.
pub struct Robot {
    config: StageConfig,
    dimensions: (u32, u32),
    rig: SceneRig,
    character: Option<Entity>,
    actions: BTreeMap<String, RobotAction>,
    active: Option<String>,
    expressions: Vec<String>,
    face: Option<Entity>,
}

impl Robot {
    pub fn new(config: StageConfig, width: u32, height: u32) -> Result<Self, StageError> {
        config.validate()?;
        Ok(Self {
            config,
            dimensions: (width, height),
            rig: SceneRig::new(width, height),
            character: None,
            actions: BTreeMap::new(),
            active: None,
            expressions: Vec::new(),
            face: None,
        })
    }

    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.dimensions
    }

    pub fn rig(&self) -> &SceneRig {
        &self.rig
    }

    pub fn character(&self) -> Option<Entity> {
        self.character
    }

    pub fn face(&self) -> Option<Entity> {
        self.face
    }

    pub fn action(&self, name: &str) -> Option<&RobotAction> {
        self.actions.get(name)
    }

    pub fn active_action(&self) -> Option<&RobotAction> {
        self.active.as_deref().and_then(|name| self.actions.get(name))
    }

    pub fn expression_targets(&self) -> &[String] {
        &self.expressions
    }

    pub fn state(&self) -> RobotState {
        RobotState {
            actions: self.actions.keys().cloned().collect(),
            expressions: self.expressions.clone(),
            active_action: self.active.clone(),
            has_face: self.face.is_some(),
        }
    }

    /// Inserts the character under the scene root, binds its mixer, registers one action per
    /// configured clip and discovers the face's expressions. Returns the character root.
    pub fn setup_loaded_character(&mut self, model: &ModelNode, clips: &[Arc<AnimationClip>]) -> Entity {
        if let Some(previous) = self.character.take() {
            self.rig.scene.remove(previous);
        }
        let root = self.rig.scene.spawn_model(model);
        self.rig.scene.add(root);
        self.character = Some(root);

        // Complements outlive the character they were attached to; clips do not.
        let mut previous = std::mem::take(&mut self.actions);
        for action in previous.values() {
            if let Some(clip) = self.rig.driver.action_mut(action.clip()) {
                clip.stop();
            }
        }

        let mixer = self.rig.driver.register(root);
        for clip in clips {
            let name = clip.name.as_ref();
            if !self.config.is_available_action(name) {
                log::trace!(target: "stage", "clip '{name}' is not a configured state; skipping");
                continue;
            }
            let Some(kind) = ActionKind::from_name(name) else {
                continue;
            };
            let Some(handle) = self.rig.driver.bind_clip(mixer, clip.clone(), &self.rig.scene) else {
                continue;
            };
            let mut action = RobotAction::build(kind, name, handle, &mut self.rig.driver);
            if let Some(stale) = previous.remove(name) {
                action.update_complement(stale.complement().clone());
            }
            self.actions.insert(name.to_string(), action);
        }
        match self.active.as_ref().map(|active| self.actions.get(active)) {
            Some(Some(action)) => {
                if let Some(clip) = self.rig.driver.action_mut(action.clip()) {
                    clip.reset().play();
                }
            }
            Some(None) => self.active = None,
            None => {}
        }

        self.face = self.rig.scene.find_by_name(root, &self.config.face_node);
        self.expressions = match self.face.and_then(|face| self.rig.scene.morph_targets(face)) {
            Some(morph) => {
                morph.names.iter().filter(|name| self.config.is_available_expression(name)).cloned().collect()
            }
            None => Vec::new(),
        };
        if self.face.is_none() {
            log::debug!(target: "stage", "no '{}' node on the character; expressions disabled", self.config.face_node);
        }
        log::debug!(
            target: "stage",
            "character ready: {} action(s), {} expression(s)",
            self.actions.len(),
            self.expressions.len()
        );
        root
    }

    /// Spawns a side prop without attaching it; complements attach it on activation.
    pub fn spawn_prop(&mut self, model: &ModelNode) -> Entity {
        self.rig.scene.spawn_model(model)
    }

    /// Binds a dedicated mixer and clip for a prop that is not owned by any single state.
    pub fn register_auxiliary_animated(&mut self, root: Entity, clip: Arc<AnimationClip>) -> ClipHandle {
        self.rig.driver.register_clip(root, clip, &self.rig.scene)
    }

    /// Merges `partial` into the named state's complement. Unknown states are ignored so side
    /// assets may arrive before the character.
    pub fn attach_complement(&mut self, state: &str, partial: ActionComplement) {
        match self.actions.get_mut(state) {
            Some(action) => action.update_complement(partial),
            None => log::trace!(target: "stage", "complement for unregistered state '{state}' ignored"),
        }
    }

    /// Switches the face to a single expression at full influence.
    pub fn change_expression(&mut self, name: &str) {
        if !self.config.is_available_expression(name) {
            log::trace!(target: "stage", "expression '{name}' is not configured");
            return;
        }
        let Some(face) = self.face else {
            return;
        };
        let index = self.expressions.iter().position(|candidate| candidate == name);
        if let Some(mut morph) = self.rig.scene.morph_targets_mut(face) {
            for (i, influence) in morph.influences.iter_mut().enumerate() {
                *influence = if Some(i) == index { 1.0 } else { 0.0 };
            }
        }
    }

    pub fn expression_influences(&self) -> Option<&[f32]> {
        let face = self.face?;
        self.rig.scene.morph_targets(face).map(|morph| morph.influences.as_slice())
    }

    /// Hands the controller a render surface, entering the ready phase.
    pub fn setup_renderer<S: RenderSurface>(self, surface: S) -> ReadyRobot<S> {
        ReadyRobot::new(self, surface)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn character() -> ModelNode {
        ModelNode::new("Robot").with_child(
            ModelNode::new("Body")
                .with_child(ModelNode::new("Head_4").with_morph_targets(["Angry", "Wink", "Surprised", "Sad"])),
        )
    }

    fn clips(names: &[&str]) -> Vec<Arc<AnimationClip>> {
        names.iter().map(|name| Arc::new(AnimationClip::empty(name))).collect()
    }

    #[test]
    fn only_configured_clips_become_actions() {
        let mut robot = Robot::new(StageConfig::default(), 800, 600).expect("robot");
        robot.setup_loaded_character(&character(), &clips(&["Idle", "Dance", "Walking", "Jump"]));
        assert_eq!(robot.state().actions, vec!["Dance", "Walking"]);
        assert!(robot.active_action().is_none());
    }

    #[test]
    fn reloading_the_character_rebuilds_actions() {
        let mut robot = Robot::new(StageConfig::default(), 800, 600).expect("robot");
        robot.setup_loaded_character(&character(), &clips(&["Walking", "Dance"]));
        let prop = robot.spawn_prop(&ModelNode::new("IronThrone"));
        robot.attach_complement("Walking", ActionComplement::object(prop));
        let stale_dance = robot.action("Dance").expect("dance").clip();

        let second = robot.setup_loaded_character(&character(), &clips(&["Walking"]));
        assert_eq!(robot.state().actions, vec!["Walking"]);
        assert!(robot.action("Dance").is_none());
        assert_eq!(robot.action("Walking").expect("walking").complement().object, Some(prop));
        let walking = robot.action("Walking").expect("walking").clip();
        assert_eq!(robot.rig().driver.mixer(walking.mixer()).map(|m| m.root()), Some(second));
        assert!(robot.rig().driver.action(stale_dance).is_some_and(|action| !action.is_scheduled()));
    }

    #[test]
    fn expression_targets_follow_face_order() {
        let mut robot = Robot::new(StageConfig::default(), 800, 600).expect("robot");
        robot.setup_loaded_character(&character(), &[]);
        assert_eq!(robot.expression_targets(), &["Angry", "Surprised", "Sad"]);
    }

    #[test]
    fn missing_face_disables_expressions() {
        let mut robot = Robot::new(StageConfig::default(), 800, 600).expect("robot");
        robot.setup_loaded_character(&ModelNode::new("Robot"), &[]);
        assert!(!robot.state().has_face);
        robot.change_expression("Angry");
        assert!(robot.expression_influences().is_none());
    }

    #[test]
    fn expression_outside_targets_clears_every_influence() {
        let mut robot = Robot::new(StageConfig::default(), 800, 600).expect("robot");
        robot.setup_loaded_character(&character(), &[]);
        robot.change_expression("Angry");
        assert_eq!(robot.expression_influences(), Some(&[1.0, 0.0, 0.0, 0.0][..]));
        // Configured but not among the face targets.
        robot.change_expression("Neutral");
        assert_eq!(robot.expression_influences(), Some(&[0.0, 0.0, 0.0, 0.0][..]));
    }

    #[test]
    fn auxiliary_props_start_detached() {
        let mut robot = Robot::new(StageConfig::default(), 800, 600).expect("robot");
        let prop = robot.spawn_prop(&ModelNode::new("DiscoBall"));
        let handle = robot.register_auxiliary_animated(prop, Arc::new(AnimationClip::empty("Spin")));
        assert!(!robot.rig().scene.contains(prop));
        assert_eq!(robot.rig().driver.mixer(handle.mixer()).map(|m| m.root()), Some(prop));
    }
}
