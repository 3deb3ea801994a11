// stepflow/src/error.rs
use anyhow::Error as AnyhowError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StepflowError {
  /// `start()` was called on a pipeline that is already executing,
  /// typically from inside one of its own hooks.
  #[error("Pipeline '{pipeline}' is already running; re-entrant start is not allowed")]
  AlreadyRunning { pipeline: String },

  #[error("Error in user-provided hook or external operation. Source: {source}")]
  HandlerError {
    #[source]
    source: AnyhowError,
  },
}

impl StepflowError {
  /// Wraps a plain message as a `HandlerError`.
  pub fn msg<M>(message: M) -> Self
  where
    M: std::fmt::Display + std::fmt::Debug + Send + Sync + 'static,
  {
    StepflowError::HandlerError {
      source: AnyhowError::msg(message),
    }
  }
}

// The key conversion for external errors raised inside hooks.
impl From<AnyhowError> for StepflowError {
  fn from(err: AnyhowError) -> Self {
    // Unwrap a StepflowError that was previously boxed into anyhow so we don't
    // end up with HandlerError(HandlerError(...)).
    match err.downcast::<StepflowError>() {
      Ok(inner) => inner,
      Err(err) => StepflowError::HandlerError { source: err },
    }
  }
}

pub type StepflowResult<T, E = StepflowError> = std::result::Result<T, E>;
