use super::kinds::ActionKind;
use super::rig::SceneRig;
use crate::animation::{AnimationDriver, ClipHandle};
use crate::environment::SharedEnvironment;
use bevy_ecs::entity::Entity;

/// Optional scene content that travels with a state. Fields arrive independently as side
/// assets finish loading.
#[derive(Clone, Debug, Default)]
pub struct ActionComplement {
    pub object: Option<Entity>,
    pub action: Option<ClipHandle>,
    pub environment: Option<SharedEnvironment>,
}

impl ActionComplement {
    pub fn object(object: Entity) -> Self {
        Self { object: Some(object), ..Self::default() }
    }

    pub fn action(action: ClipHandle) -> Self {
        Self { action: Some(action), ..Self::default() }
    }

    pub fn environment(environment: SharedEnvironment) -> Self {
        Self { environment: Some(environment), ..Self::default() }
    }

    pub fn with_object(mut self, object: Entity) -> Self {
        self.object = Some(object);
        self
    }

    pub fn with_action(mut self, action: ClipHandle) -> Self {
        self.action = Some(action);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.object.is_none() && self.action.is_none() && self.environment.is_none()
    }

    /// Fields present in `partial` win; absent ones keep their current value.
    pub fn merge(&mut self, partial: ActionComplement) {
        if partial.object.is_some() {
            self.object = partial.object;
        }
        if partial.action.is_some() {
            self.action = partial.action;
        }
        if partial.environment.is_some() {
            self.environment = partial.environment;
        }
    }
}

/// One registered state: its primary clip, its kind and whatever complement has arrived so far.
#[derive(Clone, Debug)]
pub struct RobotAction {
    name: String,
    kind: ActionKind,
    clip: ClipHandle,
    complement: ActionComplement,
}

impl RobotAction {
    /// Factory: applies the kind's construction rules to the bound clip.
    pub(crate) fn build(kind: ActionKind, name: &str, clip: ClipHandle, driver: &mut AnimationDriver) -> Self {
        if let Some(action) = driver.action_mut(clip) {
            kind.configure_clip(action);
        }
        Self { name: name.to_string(), kind, clip, complement: ActionComplement::default() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn clip(&self) -> ClipHandle {
        self.clip
    }

    pub fn complement(&self) -> &ActionComplement {
        &self.complement
    }

    pub fn update_complement(&mut self, partial: ActionComplement) {
        self.complement.merge(partial);
    }

    pub(crate) fn activate(&self, rig: &mut SceneRig) {
        if let Some(environment) = &self.complement.environment {
            rig.scene.environment = Some(environment.clone());
        }
        if let Some(object) = self.complement.object {
            rig.scene.add(object);
        }
        if let Some(handle) = self.complement.action {
            if let Some(action) = rig.driver.action_mut(handle) {
                action.play();
            }
        }
        self.kind.activate_specific(rig);
    }

    /// Stops and detaches the complement. The environment is reset by the caller.
    pub(crate) fn deactivate(&self, rig: &mut SceneRig) {
        if let Some(object) = self.complement.object {
            rig.scene.remove(object);
        }
        if let Some(handle) = self.complement.action {
            if let Some(action) = rig.driver.action_mut(handle) {
                action.stop();
            }
        }
    }
}
