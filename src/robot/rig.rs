use super::defaults;
use crate::animation::AnimationDriver;
use crate::camera3d::PerspectiveCamera;
use crate::color::Color;
use crate::environment::SharedEnvironment;
use crate::scene::{Fog, Light, Renderable, SceneGraph, Transform3D};
use bevy_ecs::entity::Entity;
use glam::{Quat, Vec3};
use std::f32::consts::FRAC_PI_2;

const GRID_LINE_WIDTH: f32 = 0.1;

/// Camera, scene graph, lights and mixers: everything a state activation may touch.
pub struct SceneRig {
    pub camera: PerspectiveCamera,
    pub scene: SceneGraph,
    pub driver: AnimationDriver,
    key_light: Entity,
    hemisphere_light: Entity,
}

impl SceneRig {
    pub fn new(width: u32, height: u32) -> Self {
        let mut camera = PerspectiveCamera::new(defaults::FOV_Y_DEGREES.to_radians(), 1.0, defaults::NEAR, defaults::FAR);
        camera.set_aspect(width, height);
        camera.set_position(defaults::CAMERA_POSITION);
        camera.look_at(defaults::CAMERA_TARGET);

        let mut scene = SceneGraph::new();
        scene.background = Color::from_hex(defaults::BACKGROUND);
        scene.fog =
            Some(Fog { color: Color::from_hex(defaults::BACKGROUND), near: defaults::FOG_NEAR, far: defaults::FOG_FAR });

        let hemisphere_light = scene.spawn("HemisphereLight", Transform3D::from_translation(defaults::HEMI_POSITION));
        scene.insert_light(
            hemisphere_light,
            Light::Hemisphere {
                sky: Color::from_hex(defaults::HEMI_SKY),
                ground: Color::from_hex(defaults::HEMI_GROUND),
                intensity: defaults::HEMI_INTENSITY,
            },
        );
        scene.add(hemisphere_light);

        let key_light = scene.spawn("DirectionalLight", Transform3D::from_translation(defaults::KEY_LIGHT_POSITION));
        scene.insert_light(
            key_light,
            Light::Directional {
                color: Color::from_hex(defaults::KEY_LIGHT_COLOR),
                intensity: defaults::KEY_LIGHT_INTENSITY,
            },
        );
        scene.add(key_light);

        let ground = scene.spawn(
            "Ground",
            Transform3D {
                rotation: Quat::from_rotation_x(-FRAC_PI_2),
                ..Transform3D::default()
            },
        );
        scene.insert_renderable(
            ground,
            Renderable {
                color: Color::from_hex(defaults::GROUND_COLOR),
                opacity: 1.0,
                extent: defaults::GROUND_SIZE * 0.5,
            },
        );
        scene.add(ground);

        let grid = spawn_grid(&mut scene);
        scene.add(grid);

        Self { camera, scene, driver: AnimationDriver::new(), key_light, hemisphere_light }
    }

    pub fn key_light(&self) -> Entity {
        self.key_light
    }

    pub fn hemisphere_light(&self) -> Entity {
        self.hemisphere_light
    }

    /// Color and intensity of the directional light.
    pub fn key_light_params(&self) -> (Color, f32) {
        match self.scene.light(self.key_light) {
            Some(Light::Directional { color, intensity }) => (color, intensity),
            _ => (Color::from_hex(defaults::KEY_LIGHT_COLOR), defaults::KEY_LIGHT_INTENSITY),
        }
    }

    pub fn set_key_light_color(&mut self, new_color: Color) {
        if let Some(mut light) = self.scene.light_mut(self.key_light) {
            if let Light::Directional { color, .. } = &mut *light {
                *color = new_color;
            }
        }
    }

    pub fn set_key_light_intensity(&mut self, new_intensity: f32) {
        if let Some(mut light) = self.scene.light_mut(self.key_light) {
            if let Light::Directional { intensity, .. } = &mut *light {
                *intensity = new_intensity;
            }
        }
    }

    pub fn place_camera(&mut self, position: Vec3, target: Option<Vec3>) {
        self.camera.set_position(position);
        if let Some(target) = target {
            self.camera.look_at(target);
        }
    }

    /// Restores environment, background, key light and camera. Complements are left alone.
    pub fn reset_baseline(&mut self, neutral: SharedEnvironment) {
        self.scene.environment = Some(neutral);
        self.scene.background = Color::from_hex(defaults::BACKGROUND);
        self.set_key_light_color(Color::from_hex(defaults::KEY_LIGHT_COLOR));
        self.set_key_light_intensity(defaults::KEY_LIGHT_INTENSITY);
        self.place_camera(defaults::CAMERA_POSITION, Some(defaults::CAMERA_TARGET));
    }
}

/// Floor grid: `GRID_DIVISIONS + 1` thin lines along each horizontal axis, centered on the origin.
fn spawn_grid(scene: &mut SceneGraph) -> Entity {
    let grid = scene.spawn("Grid", Transform3D::default());
    let half = defaults::GRID_SIZE * 0.5;
    let step = defaults::GRID_SIZE / defaults::GRID_DIVISIONS as f32;
    let line = Renderable { color: Color::BLACK, opacity: defaults::GRID_OPACITY, extent: half };
    // Unit quads lie in XY; flatten onto the floor, then squash across the line.
    let flat = Quat::from_rotation_x(-FRAC_PI_2);
    let scale = Vec3::new(1.0, GRID_LINE_WIDTH * 0.5 / half, 1.0);
    for i in 0..=defaults::GRID_DIVISIONS {
        let offset = -half + step * i as f32;
        let along_x = Transform3D { translation: Vec3::new(0.0, 0.0, offset), rotation: flat, scale };
        let along_z = Transform3D {
            translation: Vec3::new(offset, 0.0, 0.0),
            rotation: Quat::from_rotation_y(FRAC_PI_2) * flat,
            scale,
        };
        for transform in [along_x, along_z] {
            let entity = scene.spawn("GridLine", transform);
            scene.insert_renderable(entity, line);
            scene.set_parent(entity, grid);
        }
    }
    grid
}
