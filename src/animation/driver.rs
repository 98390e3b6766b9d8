use super::action::ClipAction;
use super::clip::AnimationClip;
use super::mixer::AnimationMixer;
use crate::scene::SceneGraph;
use bevy_ecs::entity::Entity;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MixerHandle(usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ClipHandle {
    mixer: usize,
    action: usize,
}

impl ClipHandle {
    pub fn mixer(&self) -> MixerHandle {
        MixerHandle(self.mixer)
    }
}

/// Append-only registry of mixers, advanced together once per frame.
#[derive(Default)]
pub struct AnimationDriver {
    mixers: Vec<AnimationMixer>,
}

impl AnimationDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, root: Entity) -> MixerHandle {
        self.mixers.push(AnimationMixer::new(root));
        MixerHandle(self.mixers.len() - 1)
    }

    /// Returns `None` only for a handle from another driver.
    pub fn bind_clip(&mut self, mixer: MixerHandle, clip: Arc<AnimationClip>, scene: &SceneGraph) -> Option<ClipHandle> {
        let action = self.mixers.get_mut(mixer.0)?.clip_action(clip, scene);
        Some(ClipHandle { mixer: mixer.0, action })
    }

    /// Registers a dedicated mixer for `root` with a single clip bound to it.
    pub fn register_clip(&mut self, root: Entity, clip: Arc<AnimationClip>, scene: &SceneGraph) -> ClipHandle {
        let mut mixer = AnimationMixer::new(root);
        let action = mixer.clip_action(clip, scene);
        self.mixers.push(mixer);
        ClipHandle { mixer: self.mixers.len() - 1, action }
    }

    pub fn advance(&mut self, delta_seconds: f32, scene: &mut SceneGraph) {
        for mixer in &mut self.mixers {
            mixer.update(delta_seconds, scene);
        }
    }

    pub fn mixer_count(&self) -> usize {
        self.mixers.len()
    }

    pub fn mixer(&self, handle: MixerHandle) -> Option<&AnimationMixer> {
        self.mixers.get(handle.0)
    }

    pub fn action(&self, handle: ClipHandle) -> Option<&ClipAction> {
        self.mixers.get(handle.mixer)?.action(handle.action)
    }

    pub fn action_mut(&mut self, handle: ClipHandle) -> Option<&mut ClipAction> {
        self.mixers.get_mut(handle.mixer)?.action_mut(handle.action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Transform3D;

    #[test]
    fn advance_without_mixers_is_a_no_op() {
        let mut scene = SceneGraph::new();
        let mut driver = AnimationDriver::new();
        driver.advance(0.5, &mut scene);
        assert_eq!(driver.mixer_count(), 0);
    }

    #[test]
    fn mixers_keep_independent_clocks() {
        let mut scene = SceneGraph::new();
        let a = scene.spawn("a", Transform3D::default());
        let b = scene.spawn("b", Transform3D::default());
        let mut driver = AnimationDriver::new();
        let first = driver.register(a);
        driver.advance(1.0, &mut scene);
        let second = driver.register(b);
        driver.advance(0.25, &mut scene);
        assert!((driver.mixer(first).unwrap().time() - 1.25).abs() < 1e-6);
        assert!((driver.mixer(second).unwrap().time() - 0.25).abs() < 1e-6);
    }

    #[test]
    fn bound_clip_is_reachable_through_its_handle() {
        let mut scene = SceneGraph::new();
        let root = scene.spawn("prop", Transform3D::default());
        let mut driver = AnimationDriver::new();
        let mixer = driver.register(root);
        let handle = driver.bind_clip(mixer, Arc::new(AnimationClip::empty("Spin")), &scene).expect("handle");
        assert_eq!(handle.mixer(), mixer);
        assert_eq!(driver.action(handle).map(|a| a.name()), Some("Spin"));
    }
}
