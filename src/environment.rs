use anyhow::{Context, Result};
use glam::{Vec2, Vec3};
use image::{DynamicImage, ImageReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const ROOM_WIDTH: u32 = 128;
const ROOM_HEIGHT: u32 = 64;

/// Image-derived lighting source applied to the whole scene.
///
/// Only the summary the renderer consumes is kept: the dimensions of the decoded image and its
/// average radiance, which tints the ambient term.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentMap {
    key: String,
    label: String,
    source: Option<PathBuf>,
    width: u32,
    height: u32,
    radiance: Vec3,
}

struct EquirectImage {
    width: u32,
    height: u32,
    pixels: Vec<Vec3>,
}

impl EnvironmentMap {
    /// Neutral studio lighting used as the stage baseline: a soft grey room with a pair of
    /// bright ceiling panels.
    pub fn room() -> Self {
        let image = generate_room_equirect();
        Self::from_equirect("environment::room".to_string(), "Neutral Room".to_string(), None, &image)
    }

    pub fn from_image(key: impl Into<String>, image: &DynamicImage) -> Self {
        let key = key.into();
        let equirect = convert_to_equirect(image);
        Self::from_equirect(key.clone(), key, None, &equirect)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader = ImageReader::open(path)
            .with_context(|| format!("opening environment image '{}'", path.display()))?
            .with_guessed_format()
            .with_context(|| format!("probing environment image '{}'", path.display()))?;
        let decoded =
            reader.decode().with_context(|| format!("decoding environment image '{}'", path.display()))?;
        let key = environment_key_from_path(path).unwrap_or_else(|| "environment::unnamed".to_string());
        let label = path
            .file_stem()
            .and_then(|s| s.to_str())
            .map(|s| s.to_string())
            .unwrap_or_else(|| key.clone());
        let equirect = convert_to_equirect(&decoded);
        Ok(Self::from_equirect(key, label, Some(path.to_path_buf()), &equirect))
    }

    fn from_equirect(key: String, label: String, source: Option<PathBuf>, image: &EquirectImage) -> Self {
        let radiance = average_radiance(image);
        Self { key, label, source, width: image.width, height: image.height, radiance }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn radiance(&self) -> Vec3 {
        self.radiance
    }
}

/// Shared handle stored on the scene and on action complements.
pub type SharedEnvironment = Arc<EnvironmentMap>;

fn environment_key_from_path(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_string_lossy();
    let sanitized: String = stem
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() { ch.to_ascii_lowercase() } else { '_' })
        .collect();
    if sanitized.is_empty() {
        None
    } else {
        Some(format!("environment::{sanitized}"))
    }
}

fn convert_to_equirect(image: &DynamicImage) -> EquirectImage {
    let rgb = image.to_rgb32f();
    let width = rgb.width();
    let height = rgb.height();
    let pixels = rgb.pixels().map(|pixel| Vec3::from_array(pixel.0)).collect();
    EquirectImage { width, height, pixels }
}

/// Solid-angle weighted mean; rows near the poles cover less of the sphere.
fn average_radiance(image: &EquirectImage) -> Vec3 {
    if image.width == 0 || image.height == 0 || image.pixels.is_empty() {
        return Vec3::ZERO;
    }
    let mut sum = Vec3::ZERO;
    let mut total_weight = 0.0_f32;
    for y in 0..image.height {
        let latitude = ((y as f32 + 0.5) / image.height as f32 - 0.5) * std::f32::consts::PI;
        let weight = latitude.cos();
        let row = (y * image.width) as usize;
        for x in 0..image.width as usize {
            if let Some(pixel) = image.pixels.get(row + x) {
                sum += *pixel * weight;
                total_weight += weight;
            }
        }
    }
    if total_weight <= 0.0 {
        Vec3::ZERO
    } else {
        sum / total_weight
    }
}

fn generate_room_equirect() -> EquirectImage {
    let (width, height) = (ROOM_WIDTH, ROOM_HEIGHT);
    let mut pixels = Vec::with_capacity((width * height) as usize);
    let panels = [Vec2::new(0.25, 0.12), Vec2::new(0.75, 0.12)];
    for y in 0..height {
        let v = y as f32 / (height - 1) as f32;
        for x in 0..width {
            let u = x as f32 / (width - 1) as f32;
            let walls = Vec3::splat(0.55) * (1.0 - v) + Vec3::splat(0.35) * v;
            let light = panels
                .iter()
                .map(|panel| {
                    let d = Vec2::new(u, v) - *panel;
                    (1.0 - d.length() * 8.0).max(0.0).powf(2.0)
                })
                .sum::<f32>();
            pixels.push(walls + Vec3::splat(light * 4.0));
        }
    }
    EquirectImage { width, height, pixels }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn room_environment_is_bright_and_neutral() {
        let room = EnvironmentMap::room();
        assert_eq!(room.key(), "environment::room");
        assert_eq!(room.dimensions(), (ROOM_WIDTH, ROOM_HEIGHT));
        let r = room.radiance();
        assert!(r.x > 0.3 && (r.x - r.y).abs() < 1e-5 && (r.y - r.z).abs() < 1e-5);
    }

    #[test]
    fn uniform_image_averages_to_its_color() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 4, Rgb([255, 0, 0])));
        let env = EnvironmentMap::from_image("party", &image);
        assert!((env.radiance() - Vec3::new(1.0, 0.0, 0.0)).length() < 1e-4);
        assert_eq!(env.source(), None);
    }

    #[test]
    fn key_from_path_is_sanitized() {
        assert_eq!(environment_key_from_path(Path::new("assets/Party Time.jpg")).as_deref(), Some("environment::party_time"));
    }
}
