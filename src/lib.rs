pub mod animation;
pub mod app;
pub mod assets;
pub mod camera3d;
pub mod cli;
pub mod color;
pub mod config;
pub mod environment;
pub mod render_loop;
pub mod renderer;
pub mod robot;
pub mod scene;
pub mod time;

pub use app::{run, run_with_overrides, App};
