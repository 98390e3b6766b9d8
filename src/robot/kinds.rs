use super::error::StageError;
use super::rig::SceneRig;
use crate::animation::{ClipAction, LoopMode};
use crate::color::{palette, Color};
use glam::Vec3;
use std::fmt;
use std::str::FromStr;

/// Closed set of character states. Adding a state means adding a variant and its arms below.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Walking,
    Dance,
    Running,
    Sitting,
}

impl ActionKind {
    pub const ALL: [ActionKind; 4] = [ActionKind::Walking, ActionKind::Dance, ActionKind::Running, ActionKind::Sitting];

    pub fn name(self) -> &'static str {
        match self {
            ActionKind::Walking => "Walking",
            ActionKind::Dance => "Dance",
            ActionKind::Running => "Running",
            ActionKind::Sitting => "Sitting",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Construction-time rules for the primary clip.
    pub(crate) fn configure_clip(self, action: &mut ClipAction) {
        if self == ActionKind::Sitting {
            action.set_loop(LoopMode::Once, true);
        }
    }

    /// Camera, background and key light changes applied after the complement is attached.
    pub(crate) fn activate_specific(self, rig: &mut SceneRig) {
        match self {
            ActionKind::Walking => {}
            ActionKind::Dance => {
                rig.scene.background = Color::from_hex(palette::BLACK);
                rig.set_key_light_color(Color::from_hex(palette::PURPLE));
                rig.set_key_light_intensity(10.0);
                // Orientation stays on the baseline target.
                rig.place_camera(Vec3::new(-6.0, 4.0, 16.0), None);
            }
            ActionKind::Running => {
                rig.scene.background = Color::from_hex(palette::LIGHT_BLUE);
                rig.set_key_light_color(Color::from_hex(palette::GREEN));
                rig.place_camera(Vec3::new(0.0, 2.0, 10.0), Some(Vec3::new(0.0, 2.0, -5.0)));
            }
            ActionKind::Sitting => {
                rig.scene.background = Color::from_hex(palette::BROWN);
                rig.set_key_light_color(Color::from_hex(palette::RED));
                rig.place_camera(Vec3::new(0.0, 3.0, 8.0), Some(Vec3::new(0.0, 2.0, 0.0)));
            }
        }
    }
}

impl FromStr for ActionKind {
    type Err = StageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| StageError::UnknownState(s.to_string()))
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::AnimationClip;
    use crate::robot::defaults;
    use std::sync::Arc;

    #[test]
    fn names_round_trip() {
        for kind in ActionKind::ALL {
            assert_eq!(kind.name().parse::<ActionKind>().ok(), Some(kind));
        }
        assert!(matches!("Idle".parse::<ActionKind>(), Err(StageError::UnknownState(name)) if name == "Idle"));
    }

    #[test]
    fn only_sitting_plays_once() {
        let mut driver = crate::animation::AnimationDriver::new();
        let scene = crate::scene::SceneGraph::new();
        let mixer = driver.register(scene.root());
        for kind in ActionKind::ALL {
            let handle = driver.bind_clip(mixer, Arc::new(AnimationClip::empty(kind.name())), &scene).expect("bind");
            let action = driver.action_mut(handle).expect("action");
            kind.configure_clip(action);
            let expected = if kind == ActionKind::Sitting { LoopMode::Once } else { LoopMode::Repeat };
            assert_eq!(action.loop_mode(), expected, "{kind}");
            assert_eq!(action.clamp_when_finished(), kind == ActionKind::Sitting);
        }
    }

    #[test]
    fn walking_keeps_the_baseline() {
        let mut rig = SceneRig::new(640, 480);
        let camera = rig.camera.clone();
        ActionKind::Walking.activate_specific(&mut rig);
        assert_eq!(rig.camera.position, camera.position);
        assert_eq!(rig.scene.background.to_hex(), defaults::BACKGROUND);
        assert_eq!(rig.key_light_params(), (Color::WHITE, defaults::KEY_LIGHT_INTENSITY));
    }

    #[test]
    fn running_faces_down_the_road() {
        let mut rig = SceneRig::new(640, 480);
        ActionKind::Running.activate_specific(&mut rig);
        assert_eq!(rig.scene.background.to_hex(), palette::LIGHT_BLUE);
        assert_eq!(rig.key_light_params().0.to_hex(), palette::GREEN);
        assert!(rig.camera.forward().abs_diff_eq(Vec3::NEG_Z, 1e-5));
    }
}
