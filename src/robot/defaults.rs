//! Baseline scene restored before every state activation.

use crate::color::palette;
use glam::Vec3;

pub const FOV_Y_DEGREES: f32 = 45.0;
pub const NEAR: f32 = 0.25;
pub const FAR: f32 = 100.0;

pub const CAMERA_POSITION: Vec3 = Vec3::new(-5.0, 3.0, 10.0);
pub const CAMERA_TARGET: Vec3 = Vec3::new(0.0, 2.0, 0.0);

pub const BACKGROUND: u32 = 0xe0e0e0;
pub const FOG_NEAR: f32 = 20.0;
pub const FOG_FAR: f32 = 100.0;

pub const KEY_LIGHT_COLOR: u32 = palette::WHITE;
pub const KEY_LIGHT_INTENSITY: f32 = 3.0;
pub const KEY_LIGHT_POSITION: Vec3 = Vec3::new(0.0, 20.0, 10.0);

pub const HEMI_SKY: u32 = 0xffffff;
pub const HEMI_GROUND: u32 = 0x8d8d8d;
pub const HEMI_INTENSITY: f32 = 3.0;
pub const HEMI_POSITION: Vec3 = Vec3::new(0.0, 20.0, 0.0);

pub const GROUND_SIZE: f32 = 2000.0;
pub const GROUND_COLOR: u32 = 0xcbcbcb;
pub const GRID_SIZE: f32 = 200.0;
pub const GRID_DIVISIONS: u32 = 40;
pub const GRID_OPACITY: f32 = 0.2;

/// Cross-fade used by the state picker.
pub const FADE_SECONDS: f32 = 0.5;
