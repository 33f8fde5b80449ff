use thiserror::Error;

use weft_render::RenderError;

pub type LifecycleResult<T> = Result<T, LifecycleError>;

#[derive(Error, Debug, Clone)]
pub enum LifecycleError {
    /// The postback referenced a view state that was never stored, has
    /// been evicted, or carries a forged identifier. Non-fatal: callers
    /// redirect to a safe entry point instead of replaying.
    #[error("View state '{id}' is unknown or has expired")]
    ExpiredViewState { id: String },

    #[error("Controller execution failed: {message}")]
    Controller { message: String },

    /// A declared retryable conflict between concurrent writers. Consumed
    /// by the bounded-retry controller decorator.
    #[error("Write conflict during controller execution")]
    WriteConflict,

    #[error(transparent)]
    Render(#[from] RenderError),
}

impl LifecycleError {
    pub fn controller(message: impl Into<String>) -> Self {
        LifecycleError::Controller {
            message: message.into(),
        }
    }
}
