use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use anyhow::{anyhow, Result};

use crate::assets::{load_model_from_gltf, ModelAsset};
use crate::config::AssetConfig;
use crate::environment::EnvironmentMap;
use crate::robot::{ActionComplement, ActionKind, Robot};

/// What a finished asset is used for once it reaches the stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetRole {
    Character,
    /// Animated prop: its first clip is bound to a dedicated mixer.
    AnimatedProp { state: String },
    Prop { state: String },
    Environment { state: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRequest {
    pub role: AssetRole,
    pub path: PathBuf,
}

pub enum AssetPayload {
    Model(ModelAsset),
    Environment(EnvironmentMap),
}

pub struct AssetResult {
    pub request: AssetRequest,
    pub data: Result<AssetPayload>,
}

/// The showcase's asset set: the character plus the side assets of Dance, Running and Sitting.
pub fn showcase_requests(assets: &AssetConfig) -> Vec<AssetRequest> {
    let request = |role, file: &str| AssetRequest { role, path: assets.resolve(file) };
    vec![
        request(AssetRole::Character, &assets.robot),
        request(AssetRole::AnimatedProp { state: ActionKind::Dance.name().to_string() }, &assets.disco_ball),
        request(AssetRole::Prop { state: ActionKind::Running.name().to_string() }, &assets.running_track),
        request(AssetRole::Prop { state: ActionKind::Sitting.name().to_string() }, &assets.iron_throne),
        request(AssetRole::Environment { state: ActionKind::Dance.name().to_string() }, &assets.party_texture),
    ]
}

pub fn run_asset_job(request: AssetRequest) -> AssetResult {
    let data = match &request.role {
        AssetRole::Environment { .. } => EnvironmentMap::load(&request.path).map(AssetPayload::Environment),
        _ => load_model_from_gltf(&request.path).map(AssetPayload::Model),
    };
    AssetResult { request, data }
}

/// Decodes every request on its own worker thread; results are drained on the UI thread.
pub struct AssetLoader {
    rx: mpsc::Receiver<AssetResult>,
    pending: usize,
    failures: usize,
}

impl AssetLoader {
    pub fn spawn(requests: Vec<AssetRequest>) -> Self {
        let (tx, rx) = mpsc::channel();
        let mut pending = 0;
        let mut failures = 0;
        for (index, request) in requests.into_iter().enumerate() {
            let thread_tx = tx.clone();
            let builder = thread::Builder::new().name(format!("asset-load-{index}"));
            let path = request.path.clone();
            match builder.spawn(move || {
                let _ = thread_tx.send(run_asset_job(request));
            }) {
                Ok(_) => pending += 1,
                Err(err) => {
                    log::error!(target: "assets", "failed to spawn loader for {}: {err:?}", path.display());
                    failures += 1;
                }
            }
        }
        Self { rx, pending, failures }
    }

    /// Finished loads since the last call. Never blocks.
    pub fn drain(&mut self) -> Vec<AssetResult> {
        let mut results = Vec::new();
        while let Ok(result) = self.rx.try_recv() {
            self.pending = self.pending.saturating_sub(1);
            if result.data.is_err() {
                self.failures += 1;
            }
            results.push(result);
        }
        results
    }

    pub fn pending(&self) -> usize {
        self.pending
    }

    pub fn failures(&self) -> usize {
        self.failures
    }

    pub fn is_finished(&self) -> bool {
        self.pending == 0
    }
}

/// Complements that arrived so far, replayed once the character has registered its states.
#[derive(Default)]
pub struct PendingComplements {
    by_state: HashMap<String, ActionComplement>,
}

impl PendingComplements {
    pub fn record(&mut self, state: &str, partial: ActionComplement) {
        self.by_state.entry(state.to_string()).or_default().merge(partial);
    }

    pub fn replay(&self, robot: &mut Robot) {
        for (state, complement) in &self.by_state {
            robot.attach_complement(state, complement.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.by_state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_state.is_empty()
    }
}

/// Feeds one finished asset into the stage. Returns true when it was the character.
pub fn apply_asset(robot: &mut Robot, pending: &mut PendingComplements, result: AssetResult) -> Result<bool> {
    let AssetResult { request, data } = result;
    let payload = data.map_err(|err| err.context(format!("Failed to load {}", request.path.display())))?;
    match (request.role, payload) {
        (AssetRole::Character, AssetPayload::Model(model)) => {
            robot.setup_loaded_character(&model.root, &model.clips);
            pending.replay(robot);
            log::info!(target: "assets", "character loaded from {}", request.path.display());
            Ok(true)
        }
        (AssetRole::AnimatedProp { state }, AssetPayload::Model(model)) => {
            let object = robot.spawn_prop(&model.root);
            let mut partial = ActionComplement::object(object);
            match model.first_clip() {
                Some(clip) => partial = partial.with_action(robot.register_auxiliary_animated(object, Arc::clone(clip))),
                None => log::warn!(target: "assets", "{} has no animation", request.path.display()),
            }
            attach(robot, pending, &state, partial);
            Ok(false)
        }
        (AssetRole::Prop { state }, AssetPayload::Model(model)) => {
            let object = robot.spawn_prop(&model.root);
            attach(robot, pending, &state, ActionComplement::object(object));
            Ok(false)
        }
        (AssetRole::Environment { state }, AssetPayload::Environment(environment)) => {
            attach(robot, pending, &state, ActionComplement::environment(Arc::new(environment)));
            Ok(false)
        }
        (role, _) => Err(anyhow!("Asset {} decoded into the wrong payload for {role:?}", request.path.display())),
    }
}

fn attach(robot: &mut Robot, pending: &mut PendingComplements, state: &str, partial: ActionComplement) {
    pending.record(state, partial.clone());
    robot.attach_complement(state, partial);
    log::debug!(target: "assets", "complement for '{state}' ready");
}
