// stepflow/src/core/phase.rs

//! Defines the phases a step passes through while it is executed.

use std::fmt;

/// The phase a step is currently in.
///
/// The regular path is `Before -> Execution -> After -> Success -> Complete`.
/// `Error` is entered when `Before`, `Execution`, `After` or `Success` fails,
/// and is followed by `Complete` whenever the failure is contained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionPhase {
  /// The pipeline-wide "before" hook.
  Before,
  /// The step's own action.
  Execution,
  /// The pipeline-wide "after" hook.
  After,
  /// The step's success hook.
  Success,
  /// The step's error hook.
  Error,
  /// The step's completion hook.
  Complete,
}

impl ExecutionPhase {
  pub fn as_str(&self) -> &'static str {
    match self {
      ExecutionPhase::Before => "before",
      ExecutionPhase::Execution => "execution",
      ExecutionPhase::After => "after",
      ExecutionPhase::Success => "success",
      ExecutionPhase::Error => "error",
      ExecutionPhase::Complete => "complete",
    }
  }
}

impl fmt::Display for ExecutionPhase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}
