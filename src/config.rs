use crate::robot::{ActionKind, StageError};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "config/app.json";

#[derive(Debug, Clone, Deserialize)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub vsync: bool,
    pub fullscreen: bool,
}

/// States, expressions and presentation constants of the showcase stage.
#[derive(Debug, Clone, Deserialize)]
pub struct StageConfig {
    #[serde(default = "StageConfig::default_available_actions")]
    pub available_actions: Vec<String>,
    #[serde(default = "StageConfig::default_available_expressions")]
    pub available_expressions: Vec<String>,
    #[serde(default = "StageConfig::default_action")]
    pub default_action: String,
    #[serde(default = "StageConfig::default_expression")]
    pub default_expression: String,
    /// Name of the morphable head mesh inside the character model.
    #[serde(default = "StageConfig::default_face_node")]
    pub face_node: String,
    #[serde(default = "StageConfig::default_fade_seconds")]
    pub fade_seconds: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetConfig {
    #[serde(default = "AssetConfig::default_root")]
    pub root: PathBuf,
    #[serde(default = "AssetConfig::default_robot")]
    pub robot: String,
    #[serde(default = "AssetConfig::default_disco_ball")]
    pub disco_ball: String,
    #[serde(default = "AssetConfig::default_running_track")]
    pub running_track: String,
    #[serde(default = "AssetConfig::default_iron_throne")]
    pub iron_throne: String,
    #[serde(default = "AssetConfig::default_party_texture")]
    pub party_texture: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub stage: StageConfig,
    #[serde(default)]
    pub assets: AssetConfig,
}

#[derive(Debug, Clone, Default)]
pub struct AppConfigOverrides {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub vsync: Option<bool>,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self { title: "Robot Showcase".to_string(), width: 1280, height: 720, vsync: true, fullscreen: false }
    }
}

impl StageConfig {
    fn default_available_actions() -> Vec<String> {
        ["Walking", "Dance", "Running", "Sitting"].iter().map(|s| s.to_string()).collect()
    }

    fn default_available_expressions() -> Vec<String> {
        ["Neutral", "Angry", "Surprised", "Sad"].iter().map(|s| s.to_string()).collect()
    }

    fn default_action() -> String {
        "Walking".to_string()
    }

    fn default_expression() -> String {
        "Neutral".to_string()
    }

    fn default_face_node() -> String {
        "Head_4".to_string()
    }

    const fn default_fade_seconds() -> f32 {
        0.5
    }

    pub fn is_available_action(&self, name: &str) -> bool {
        self.available_actions.iter().any(|candidate| candidate == name)
    }

    pub fn is_available_expression(&self, name: &str) -> bool {
        self.available_expressions.iter().any(|candidate| candidate == name)
    }

    /// Every configured state must map onto an action variant.
    pub fn validate(&self) -> Result<(), StageError> {
        for name in &self.available_actions {
            name.parse::<ActionKind>()?;
        }
        Ok(())
    }
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            available_actions: Self::default_available_actions(),
            available_expressions: Self::default_available_expressions(),
            default_action: Self::default_action(),
            default_expression: Self::default_expression(),
            face_node: Self::default_face_node(),
            fade_seconds: Self::default_fade_seconds(),
        }
    }
}

impl AssetConfig {
    fn default_root() -> PathBuf {
        PathBuf::from("assets")
    }

    fn default_robot() -> String {
        "RobotExpressive.glb".to_string()
    }

    fn default_disco_ball() -> String {
        "disco_ball_animated.glb".to_string()
    }

    fn default_running_track() -> String {
        "lowpoly_road.glb".to_string()
    }

    fn default_iron_throne() -> String {
        "iron_throne.glb".to_string()
    }

    fn default_party_texture() -> String {
        "party.jpg".to_string()
    }

    pub fn resolve(&self, file: &str) -> PathBuf {
        self.root.join(file)
    }
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            root: Self::default_root(),
            robot: Self::default_robot(),
            disco_ball: Self::default_disco_ball(),
            running_track: Self::default_running_track(),
            iron_throne: Self::default_iron_throne(),
            party_texture: Self::default_party_texture(),
        }
    }
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        let cfg = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(cfg)
    }

    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                log::warn!(target: "app", "Config load error: {err:?}. Falling back to defaults.");
                Self::default()
            }
        }
    }

    pub fn apply_overrides(&mut self, overrides: &AppConfigOverrides) {
        if let Some(width) = overrides.width {
            self.window.width = width;
        }
        if let Some(height) = overrides.height {
            self.window.height = height;
        }
        if let Some(vsync) = overrides.vsync {
            self.window.vsync = vsync;
        }
    }
}

impl AppConfigOverrides {
    pub fn is_empty(&self) -> bool {
        self.width.is_none() && self.height.is_none() && self.vsync.is_none()
    }

    pub fn applied_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.width.is_some() {
            fields.push("width");
        }
        if self.height.is_some() {
            fields.push("height");
        }
        if self.vsync.is_some() {
            fields.push("vsync");
        }
        fields
    }
}
