//! Window glue around the stage: loads assets in the background, owns the winit event loop and
//! maps keys onto the state and expression pickers.

pub mod asset_loading;
pub mod controls;

use anyhow::{Context, Result};
use winit::application::ApplicationHandler;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};

use crate::config::{AppConfig, AppConfigOverrides, DEFAULT_CONFIG_PATH};
use crate::render_loop::RenderLoop;
use crate::renderer::{RenderSurface, WindowSurface};
use crate::robot::{Robot, Stage};
use asset_loading::{apply_asset, showcase_requests, AssetLoader, PendingComplements};
use controls::{command_for_key, UiCommand};

const LOAD_FAILURE_TITLE: &str = "Failed to load models";

pub fn run() -> Result<()> {
    run_with_overrides(DEFAULT_CONFIG_PATH, AppConfigOverrides::default())
}

pub fn run_with_overrides(config_path: impl AsRef<std::path::Path>, overrides: AppConfigOverrides) -> Result<()> {
    let mut config = AppConfig::load_or_default(config_path);
    if !overrides.is_empty() {
        log::info!(target: "app", "CLI overrides applied: {}", overrides.applied_fields().join(", "));
    }
    config.apply_overrides(&overrides);
    let event_loop = EventLoop::new().context("Failed to create winit event loop")?;
    let mut app = App::new(config)?;
    event_loop.run_app(&mut app).context("Event loop execution failed")?;
    Ok(())
}

pub struct App {
    config: AppConfig,
    stage: Option<Stage<WindowSurface>>,
    loader: AssetLoader,
    pending: PendingComplements,
    render_loop: RenderLoop,
    character_ready: bool,
    defaults_applied: bool,
    load_failed: bool,
    shown_pending: Option<usize>,
    should_close: bool,
}

impl App {
    pub fn new(config: AppConfig) -> Result<Self> {
        let robot = Robot::new(config.stage.clone(), config.window.width, config.window.height)
            .context("Invalid stage configuration")?;
        let loader = AssetLoader::spawn(showcase_requests(&config.assets));
        Ok(Self {
            config,
            stage: Some(Stage::new(robot)),
            loader,
            pending: PendingComplements::default(),
            render_loop: RenderLoop::new(),
            character_ready: false,
            defaults_applied: false,
            load_failed: false,
            shown_pending: None,
            should_close: false,
        })
    }

    fn drain_assets(&mut self) {
        let Some(stage) = self.stage.as_mut() else {
            return;
        };
        for result in self.loader.drain() {
            match apply_asset(stage.robot_mut(), &mut self.pending, result) {
                Ok(true) => self.character_ready = true,
                Ok(false) => {}
                Err(err) => {
                    log::error!(target: "assets", "{err:#}");
                    if !self.load_failed {
                        self.load_failed = true;
                        if let Ok(ready) = stage.ready() {
                            ready.surface().set_title(LOAD_FAILURE_TITLE);
                        }
                    }
                }
            }
        }
    }

    fn apply_defaults_when_ready(&mut self) {
        if self.defaults_applied || !self.character_ready {
            return;
        }
        let Some(stage) = self.stage.as_mut() else {
            return;
        };
        if !stage.is_ready() {
            return;
        }
        let stage_cfg = &self.config.stage;
        if let Err(err) = stage.transition_to(&stage_cfg.default_action, stage_cfg.fade_seconds) {
            log::error!(target: "app", "default state failed: {err}");
            return;
        }
        stage.robot_mut().change_expression(&stage_cfg.default_expression);
        if let Ok(ready) = stage.ready() {
            if !self.load_failed {
                ready.surface().set_title(&self.config.window.title);
            }
        }
        self.defaults_applied = true;
    }

    fn handle_command(&mut self, command: UiCommand) {
        let Some(stage) = self.stage.as_mut() else {
            return;
        };
        match command {
            UiCommand::Quit => self.should_close = true,
            UiCommand::SelectState(name) => {
                if let Err(err) = stage.transition_to(&name, self.config.stage.fade_seconds) {
                    log::warn!(target: "app", "cannot select '{name}': {err}");
                }
            }
            UiCommand::SelectExpression(name) => stage.robot_mut().change_expression(&name),
        }
    }

    fn loading_title(&self) -> String {
        format!("{} - loading models ({} left)", self.config.window.title, self.loader.pending())
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let Some(stage) = self.stage.take() else {
            return;
        };
        if stage.is_ready() {
            self.stage = Some(stage);
            return;
        }
        let mut surface = WindowSurface::new(&self.config.window);
        if let Err(err) = surface.ensure_window(event_loop) {
            log::error!(target: "renderer", "Renderer initialization error: {err:?}");
            self.stage = Some(stage);
            self.should_close = true;
            return;
        }
        surface.set_title(&self.loading_title());
        let (width, height) = surface.size();
        let mut stage = stage.setup_renderer(surface);
        if let Err(err) = stage.resize(width, height) {
            log::warn!(target: "renderer", "initial resize failed: {err}");
        }
        self.stage = Some(stage);
    }

    fn window_event(&mut self, _el: &ActiveEventLoop, _id: winit::window::WindowId, event: WindowEvent) {
        match &event {
            WindowEvent::CloseRequested => self.should_close = true,
            WindowEvent::Resized(size) => {
                if let Some(stage) = self.stage.as_mut() {
                    if let Err(err) = stage.resize(size.width, size.height) {
                        log::debug!(target: "app", "resize before renderer setup ignored: {err}");
                    }
                }
            }
            WindowEvent::KeyboardInput { event: KeyEvent { logical_key, state, repeat: false, .. }, .. } => {
                if *state == ElementState::Pressed {
                    if let Some(command) = command_for_key(logical_key, &self.config.stage) {
                        self.handle_command(command);
                    }
                }
            }
            WindowEvent::RedrawRequested => {
                if let Some(stage) = self.stage.as_mut() {
                    if let Err(err) = self.render_loop.tick_stage(stage) {
                        log::warn!(target: "renderer", "frame failed: {err:#}");
                    }
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.should_close {
            event_loop.exit();
            return;
        }
        self.drain_assets();
        self.apply_defaults_when_ready();
        let pending = self.loader.pending();
        if let Some(Ok(ready)) = self.stage.as_ref().map(Stage::ready) {
            if !self.defaults_applied && !self.load_failed && self.shown_pending != Some(pending) {
                ready.surface().set_title(&self.loading_title());
                self.shown_pending = Some(pending);
            }
            ready.surface().request_redraw();
        }
    }
}
