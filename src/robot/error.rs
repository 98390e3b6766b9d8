use thiserror::Error;

#[derive(Debug, Error)]
pub enum StageError {
    /// A renderer-dependent operation ran before `setup_renderer`.
    #[error("Renderer not set. `setup_renderer` must be called first")]
    RendererNotSet,
    #[error("state '{0}' has no action variant")]
    UnknownState(String),
    #[error(transparent)]
    Surface(#[from] anyhow::Error),
}
