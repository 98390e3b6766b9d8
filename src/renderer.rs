//! Render surfaces. The stage only talks to [`RenderSurface`]; the window surface draws with
//! wgpu, the headless surface records frames so the stage can run without a GPU.

pub mod marker_pass;
pub mod window_surface;

pub use window_surface::WindowSurface;

use crate::camera3d::PerspectiveCamera;
use crate::color::Color;
use crate::environment::{EnvironmentMap, SharedEnvironment};
use crate::scene::{Fog, Light, SceneGraph, VisibleNode};
use anyhow::Result;
use glam::{Mat4, Vec3};

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameLight {
    pub position: Vec3,
    pub light: Light,
}

/// Everything a surface needs to draw one frame, captured from the camera and scene graph.
#[derive(Clone, Debug)]
pub struct FrameView<'a> {
    pub view_projection: Mat4,
    pub camera_position: Vec3,
    pub background: Color,
    pub fog: Option<Fog>,
    pub environment: Option<SharedEnvironment>,
    pub lights: Vec<FrameLight>,
    pub nodes: &'a [VisibleNode],
}

impl<'a> FrameView<'a> {
    pub fn capture(camera: &PerspectiveCamera, scene: &SceneGraph, nodes: &'a [VisibleNode]) -> Self {
        let lights = nodes
            .iter()
            .filter_map(|node| {
                scene.light(node.entity).map(|light| FrameLight { position: node.world.w_axis.truncate(), light })
            })
            .collect();
        Self {
            view_projection: camera.view_projection(),
            camera_position: camera.position,
            background: scene.background,
            fog: scene.fog,
            environment: scene.environment.clone(),
            lights,
            nodes,
        }
    }

    /// Drawable nodes only.
    pub fn drawables(&self) -> impl Iterator<Item = &VisibleNode> + '_ {
        self.nodes.iter().filter(|node| node.renderable.is_some())
    }

    /// Ambient term: environment radiance scaled by the hemisphere lights.
    pub fn ambient(&self) -> Vec3 {
        let radiance = self.environment.as_ref().map(|env| env.radiance()).unwrap_or(Vec3::splat(0.5));
        let hemisphere: Vec3 = self
            .lights
            .iter()
            .filter_map(|entry| match entry.light {
                Light::Hemisphere { sky, ground, intensity } => {
                    Some(sky.lerp(ground, 0.5).to_vec3() * intensity / std::f32::consts::PI)
                }
                _ => None,
            })
            .sum();
        radiance * hemisphere.max(Vec3::splat(0.1))
    }

    pub fn key_light(&self) -> Option<(Vec3, Color, f32)> {
        self.lights.iter().find_map(|entry| match entry.light {
            Light::Directional { color, intensity } => Some((entry.position, color, intensity)),
            _ => None,
        })
    }
}

pub trait RenderSurface {
    fn size(&self) -> (u32, u32);

    fn resize(&mut self, width: u32, height: u32);

    fn render(&mut self, frame: &FrameView<'_>) -> Result<()>;

    /// Environment installed by every scene reset.
    fn neutral_environment(&mut self) -> EnvironmentMap {
        EnvironmentMap::room()
    }
}

/// Summary of one frame handed to a [`HeadlessSurface`].
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedFrame {
    pub background: Color,
    pub camera_position: Vec3,
    pub environment_key: Option<String>,
    pub visible_nodes: usize,
    pub drawables: usize,
    pub key_light: Option<(Color, f32)>,
}

/// Surface without a GPU: it records what it was asked to draw.
#[derive(Debug, Default)]
pub struct HeadlessSurface {
    size: (u32, u32),
    resizes: usize,
    frames: Vec<RecordedFrame>,
    fail_next: Option<String>,
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> &[RecordedFrame] {
        &self.frames
    }

    pub fn last_frame(&self) -> Option<&RecordedFrame> {
        self.frames.last()
    }

    pub fn resize_count(&self) -> usize {
        self.resizes
    }

    /// Makes the next `render` call fail with `message`.
    pub fn fail_next_frame(&mut self, message: impl Into<String>) {
        self.fail_next = Some(message.into());
    }
}

impl RenderSurface for HeadlessSurface {
    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.size = (width, height);
        self.resizes += 1;
    }

    fn render(&mut self, frame: &FrameView<'_>) -> Result<()> {
        if let Some(message) = self.fail_next.take() {
            anyhow::bail!(message);
        }
        self.frames.push(RecordedFrame {
            background: frame.background,
            camera_position: frame.camera_position,
            environment_key: frame.environment.as_ref().map(|env| env.key().to_string()),
            visible_nodes: frame.nodes.len(),
            drawables: frame.drawables().count(),
            key_light: frame.key_light().map(|(_, color, intensity)| (color, intensity)),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Renderable, Transform3D};

    #[test]
    fn capture_collects_lights_and_drawables() {
        let mut scene = SceneGraph::new();
        let sun = scene.spawn("sun", Transform3D::from_translation(Vec3::new(0.0, 20.0, 10.0)));
        scene.insert_light(sun, Light::Directional { color: Color::WHITE, intensity: 3.0 });
        scene.add(sun);
        let marker = scene.spawn("marker", Transform3D::default());
        scene.insert_renderable(marker, Renderable { color: Color::BLACK, opacity: 1.0, extent: 1.0 });
        scene.add(marker);
        let hidden = scene.spawn("hidden", Transform3D::default());
        scene.insert_renderable(hidden, Renderable { color: Color::BLACK, opacity: 1.0, extent: 1.0 });

        let camera = PerspectiveCamera::new(1.0, 1.0, 0.1, 10.0);
        let nodes = scene.visible_nodes();
        let frame = FrameView::capture(&camera, &scene, &nodes);
        assert_eq!(frame.drawables().count(), 1);
        let (position, color, intensity) = frame.key_light().expect("key light");
        assert_eq!(position, Vec3::new(0.0, 20.0, 10.0));
        assert_eq!((color, intensity), (Color::WHITE, 3.0));
    }

    #[test]
    fn headless_surface_records_and_fails_on_request() {
        let scene = SceneGraph::new();
        let camera = PerspectiveCamera::new(1.0, 1.0, 0.1, 10.0);
        let nodes = scene.visible_nodes();
        let frame = FrameView::capture(&camera, &scene, &nodes);
        let mut surface = HeadlessSurface::new();
        surface.resize(64, 32);
        surface.render(&frame).expect("render");
        surface.fail_next_frame("device lost");
        let err = surface.render(&frame).expect_err("injected failure");
        assert!(err.to_string().contains("device lost"));
        assert_eq!(surface.frames().len(), 1);
        assert_eq!(surface.size(), (64, 32));
        assert_eq!(surface.last_frame().map(|f| f.visible_nodes), Some(1));
    }
}
