use std::sync::Arc;

use glam::{Quat, Vec3};
use robot_showcase::animation::{AnimationClip, ClipInterpolation, NodeTrack};
use robot_showcase::assets::ModelNode;
use robot_showcase::color::{palette, Color};
use robot_showcase::config::StageConfig;
use robot_showcase::environment::EnvironmentMap;
use robot_showcase::renderer::HeadlessSurface;
use robot_showcase::robot::{defaults, ActionComplement, ReadyRobot, Robot, Stage, StageError};

const EPSILON: f32 = 1e-4;

fn character() -> ModelNode {
    ModelNode::new("Robot").with_child(
        ModelNode::new("Hips").with_child(
            ModelNode::new("Head_4").with_morph_targets(["Neutral", "Angry", "Surprised", "Sad"]),
        ),
    )
}

fn hips_clip(name: &str) -> Arc<AnimationClip> {
    let track =
        NodeTrack::translation("Hips", ClipInterpolation::Linear, &[0.0, 1.0], vec![Vec3::ZERO, Vec3::Y])
            .expect("track");
    Arc::new(AnimationClip::new(name, vec![track]))
}

fn showcase_clips() -> Vec<Arc<AnimationClip>> {
    ["Walking", "Dance", "Running", "Sitting", "Idle"].into_iter().map(hips_clip).collect()
}

fn loaded_robot() -> Robot {
    let mut robot = Robot::new(StageConfig::default(), 640, 480).expect("robot");
    robot.setup_loaded_character(&character(), &showcase_clips());
    robot
}

fn ready_robot() -> ReadyRobot<HeadlessSurface> {
    loaded_robot().setup_renderer(HeadlessSurface::new())
}

fn assert_vec3_close(actual: Vec3, expected: Vec3) {
    assert!((actual - expected).length() < EPSILON, "{actual:?} != {expected:?}");
}

#[test]
fn loaded_character_registers_states_and_expressions() {
    let state = loaded_robot().state();
    assert_eq!(state.actions, vec!["Dance", "Running", "Sitting", "Walking"]);
    assert_eq!(state.expressions, vec!["Neutral", "Angry", "Surprised", "Sad"]);
    assert_eq!(state.active_action, None);
    assert!(state.has_face);
}

#[test]
fn dance_turns_the_stage_into_a_party() {
    let mut ready = ready_robot();
    ready.transition_to("Dance", 0.0);
    ready.render().expect("frame");

    let robot = ready.robot();
    assert_eq!(robot.active_action().map(|a| a.name()), Some("Dance"));
    assert_eq!(robot.rig().scene.background.to_hex(), palette::BLACK);
    let (color, intensity) = robot.rig().key_light_params();
    assert_eq!(color.to_hex(), palette::PURPLE);
    assert_eq!(intensity, 10.0);
    assert_vec3_close(robot.rig().camera.position, Vec3::new(-6.0, 4.0, 16.0));

    let frame = ready.surface().last_frame().expect("recorded frame");
    assert_eq!(frame.background, Color::from_hex(palette::BLACK));
    assert_eq!(frame.key_light.map(|(_, intensity)| intensity), Some(10.0));
}

#[test]
fn leaving_a_state_restores_the_baseline() {
    let mut ready = ready_robot();
    ready.transition_to("Dance", 0.0);
    ready.transition_to("Walking", 0.0);

    let rig = ready.robot().rig();
    assert_eq!(rig.scene.background.to_hex(), defaults::BACKGROUND);
    assert_eq!(rig.key_light_params(), (Color::from_hex(defaults::KEY_LIGHT_COLOR), defaults::KEY_LIGHT_INTENSITY));
    assert_vec3_close(rig.camera.position, defaults::CAMERA_POSITION);
    let neutral = ready.neutral_environment();
    assert!(rig.scene.environment.as_ref().is_some_and(|env| Arc::ptr_eq(env, neutral)));
}

#[test]
fn running_and_sitting_frame_their_props() {
    let mut ready = ready_robot();
    ready.transition_to("Running", 0.0);
    let rig = ready.robot().rig();
    assert_eq!(rig.scene.background.to_hex(), palette::LIGHT_BLUE);
    assert_eq!(rig.key_light_params().0.to_hex(), palette::GREEN);
    assert_vec3_close(rig.camera.position, Vec3::new(0.0, 2.0, 10.0));
    assert!(rig.camera.forward().z < -0.99);

    ready.transition_to("Sitting", 0.0);
    let rig = ready.robot().rig();
    assert_eq!(rig.scene.background.to_hex(), palette::BROWN);
    assert_eq!(rig.key_light_params().0.to_hex(), palette::RED);
    assert_vec3_close(rig.camera.position, Vec3::new(0.0, 3.0, 8.0));
}

#[test]
fn expressions_are_one_hot() {
    let mut robot = loaded_robot();
    robot.change_expression("Angry");
    assert_eq!(robot.expression_influences(), Some(&[0.0, 1.0, 0.0, 0.0][..]));
    robot.change_expression("Sad");
    assert_eq!(robot.expression_influences(), Some(&[0.0, 0.0, 0.0, 1.0][..]));
}

#[test]
fn unconfigured_expression_leaves_influences_alone() {
    let mut robot = loaded_robot();
    robot.change_expression("Surprised");
    robot.change_expression("Wink");
    assert_eq!(robot.expression_influences(), Some(&[0.0, 0.0, 1.0, 0.0][..]));
}

#[test]
fn complement_before_character_is_dropped() {
    let mut robot = Robot::new(StageConfig::default(), 640, 480).expect("robot");
    let prop = robot.spawn_prop(&ModelNode::new("DiscoBall"));
    robot.attach_complement("Dance", ActionComplement::object(prop));
    assert!(robot.state().actions.is_empty());

    robot.setup_loaded_character(&character(), &showcase_clips());
    assert!(robot.action("Dance").expect("dance").complement().is_empty());
}

#[test]
fn complements_follow_their_state_in_any_load_order() {
    let mut ready = ready_robot();
    ready.transition_to("Dance", 0.0);

    // Side assets land while Dance is already active; they show up on the next activation.
    let ball = ready.spawn_prop(&ModelNode::new("DiscoBall"));
    let spin = ready.register_auxiliary_animated(ball, hips_clip("Spin"));
    ready.attach_complement("Dance", ActionComplement::object(ball));
    ready.attach_complement("Dance", ActionComplement::action(spin));
    ready.attach_complement(
        "Dance",
        ActionComplement::environment(Arc::new(EnvironmentMap::from_image(
            "party",
            &image::DynamicImage::new_rgb8(4, 2),
        ))),
    );
    let throne = ready.spawn_prop(&ModelNode::new("IronThrone"));
    ready.attach_complement("Sitting", ActionComplement::object(throne));
    assert!(!ready.robot().rig().scene.contains(ball));

    ready.transition_to("Dance", 0.0);
    {
        let rig = ready.robot().rig();
        assert!(rig.scene.contains(ball));
        assert!(!rig.scene.contains(throne));
        assert!(rig.driver.action(spin).is_some_and(|action| action.is_scheduled()));
        assert_eq!(rig.scene.environment.as_ref().map(|env| env.key()), Some("party"));
    }

    ready.transition_to("Sitting", 0.0);
    let rig = ready.robot().rig();
    assert!(!rig.scene.contains(ball));
    assert!(rig.scene.contains(throne));
    assert!(rig.driver.action(spin).is_some_and(|action| !action.is_scheduled()));
    assert_ne!(rig.scene.environment.as_ref().map(|env| env.key()), Some("party"));
}

fn stage_snapshot(ready: &ReadyRobot<HeadlessSurface>) -> (Vec3, Quat, (Color, f32), Color) {
    let rig = ready.robot().rig();
    (rig.camera.position, rig.camera.rotation, rig.key_light_params(), rig.scene.background)
}

#[test]
fn selecting_dance_twice_lands_on_the_same_stage() {
    let mut ready = ready_robot();
    ready.transition_to("Dance", defaults::FADE_SECONDS);
    let first = stage_snapshot(&ready);
    ready.animate(0.3).expect("frame");
    ready.transition_to("Dance", defaults::FADE_SECONDS);
    let second = stage_snapshot(&ready);

    assert_eq!(first, second);
    assert_vec3_close(second.0, Vec3::new(-6.0, 4.0, 16.0));
    assert_eq!(second.2, (Color::from_hex(palette::PURPLE), 10.0));
    assert_eq!(second.3.to_hex(), palette::BLACK);
}

#[test]
fn reselecting_the_active_state_replays_it() {
    let mut ready = ready_robot();
    ready.transition_to("Running", 0.0);
    ready.animate(0.25).expect("frame");
    ready.transition_to("Running", 0.5);

    let robot = ready.robot();
    assert_eq!(robot.active_action().map(|a| a.name()), Some("Running"));
    let handle = robot.action("Running").expect("running").clip();
    let action = robot.rig().driver.action(handle).expect("clip action");
    assert!(action.is_enabled());
    assert_eq!(action.time(), 0.0);
    assert_eq!(robot.rig().scene.background.to_hex(), palette::LIGHT_BLUE);
}

#[test]
fn unknown_or_unregistered_states_are_ignored() {
    let mut ready = ready_robot();
    ready.transition_to("Walking", 0.0);
    ready.transition_to("Jumping", 0.0);
    ready.transition_to("Idle", 0.0);
    assert_eq!(ready.robot().active_action().map(|a| a.name()), Some("Walking"));

    let mut empty = Robot::new(StageConfig::default(), 640, 480).expect("robot").setup_renderer(HeadlessSurface::new());
    empty.transition_to("Dance", 0.0);
    assert!(empty.robot().active_action().is_none());
}

#[test]
fn reloaded_character_drops_states_it_no_longer_animates() {
    let mut ready = ready_robot();
    ready.transition_to("Dance", 0.0);
    ready.setup_loaded_character(&character(), &[hips_clip("Walking")]);

    assert_eq!(ready.state().actions, vec!["Walking"]);
    assert_eq!(ready.state().active_action, None);
    ready.transition_to("Dance", 0.0);
    assert!(ready.robot().active_action().is_none());
    ready.transition_to("Walking", 0.0);
    assert_eq!(ready.robot().active_action().map(|a| a.name()), Some("Walking"));
}

#[test]
fn crossfade_blends_outgoing_and_incoming_actions() {
    let mut ready = ready_robot();
    ready.transition_to("Walking", 1.0);
    ready.animate(1.0).expect("frame");
    ready.transition_to("Dance", 1.0);
    ready.animate(0.5).expect("frame");

    let (walking, dance) = {
        let robot = ready.robot();
        (robot.action("Walking").expect("walking").clip(), robot.action("Dance").expect("dance").clip())
    };
    let driver = &ready.robot().rig().driver;
    let outgoing = driver.action(walking).expect("walking action").blend_weight();
    let incoming = driver.action(dance).expect("dance action").blend_weight();
    assert!((outgoing - 0.5).abs() < EPSILON, "outgoing {outgoing}");
    assert!((incoming - 0.5).abs() < EPSILON, "incoming {incoming}");

    ready.animate(0.5).expect("frame");
    let driver = &ready.robot().rig().driver;
    assert!(!driver.action(walking).expect("walking action").is_enabled());
    assert!((driver.action(dance).expect("dance action").blend_weight() - 1.0).abs() < EPSILON);
}

#[test]
fn sitting_holds_its_final_pose() {
    let mut ready = ready_robot();
    ready.transition_to("Sitting", 0.0);
    ready.animate(2.0).expect("frame");
    ready.animate(1.0).expect("frame");

    let robot = ready.robot();
    let handle = robot.action("Sitting").expect("sitting").clip();
    let action = robot.rig().driver.action(handle).expect("clip action");
    assert!(action.is_paused());
    assert!(action.is_enabled());
    let character = robot.character().expect("character");
    let hips = robot.rig().scene.find_by_name(character, "Hips").expect("hips");
    assert_vec3_close(robot.rig().scene.transform(hips).expect("transform").translation, Vec3::Y);
}

#[test]
fn stage_refuses_rendering_work_before_setup() {
    let mut stage: Stage<HeadlessSurface> = Stage::new(loaded_robot());
    assert!(!stage.is_ready());
    assert!(matches!(stage.transition_to("Dance", 0.5), Err(StageError::RendererNotSet)));
    assert!(matches!(stage.resize(800, 600), Err(StageError::RendererNotSet)));
    assert!(matches!(stage.animate(0.016), Err(StageError::RendererNotSet)));
    assert!(matches!(stage.render(), Err(StageError::RendererNotSet)));
    let err = stage.neutral_environment().expect_err("not ready");
    assert!(err.to_string().contains("`setup_renderer` must be called first"));

    // Non-rendering operations work in either phase.
    stage.robot_mut().change_expression("Angry");
    assert_eq!(stage.robot().expression_influences(), Some(&[0.0, 1.0, 0.0, 0.0][..]));

    let mut stage = stage.setup_renderer(HeadlessSurface::new());
    assert!(stage.is_ready());
    stage.transition_to("Dance", 0.5).expect("transition");
    stage.resize(800, 600).expect("resize");
    stage.animate(0.016).expect("frame");
    assert_eq!(stage.robot().dimensions(), (800, 600));
    let ready = stage.ready().expect("ready");
    assert_eq!(ready.surface().frames().len(), 1);
}

#[test]
fn surface_failures_propagate_from_animate() {
    let mut ready = ready_robot();
    ready.surface_mut().fail_next_frame("device lost");
    let err = ready.animate(0.016).expect_err("failed frame");
    assert!(err.to_string().contains("device lost"));
    ready.animate(0.016).expect("recovered frame");
}
