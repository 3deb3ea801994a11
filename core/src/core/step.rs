// stepflow/src/core/step.rs

//! Defines the stored form of a single step within a pipeline.

use super::context::Hook;

/// Identity of a step: its position plus the optional id and name given by the builder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepInfo {
  pub index: usize,
  pub id: Option<String>,
  pub name: Option<String>,
}

impl StepInfo {
  /// Best human-readable label: name, then id, then `#index`.
  pub fn label(&self) -> String {
    self
      .name
      .clone()
      .or_else(|| self.id.clone())
      .unwrap_or_else(|| format!("#{}", self.index))
  }
}

/// Definition of a pipeline step: its action, its step-local hooks and flags.
///
/// Cloning is cheap (hooks are `Arc`s); the driver clones the whole step list
/// when a run begins so that builder calls made during the run cannot affect it.
pub struct StepDef<V, Err> {
  pub info: StepInfo,
  pub action: Hook<V, Err>,
  /// Opt out of the pipeline-wide "before" hook for this step only.
  pub skip_before: bool,
  pub on_success: Option<Hook<V, Err>>,
  pub on_error: Option<Hook<V, Err>>,
  pub on_complete: Option<Hook<V, Err>>,
  /// Swallow failures that no error hook handles.
  pub ignore_errors: bool,
}

impl<V, Err> StepDef<V, Err> {
  pub(crate) fn new(index: usize, action: Hook<V, Err>) -> Self {
    StepDef {
      info: StepInfo {
        index,
        ..Default::default()
      },
      action,
      skip_before: false,
      on_success: None,
      on_error: None,
      on_complete: None,
      ignore_errors: false,
    }
  }
}

impl<V, Err> Clone for StepDef<V, Err> {
  fn clone(&self) -> Self {
    StepDef {
      info: self.info.clone(),
      action: self.action.clone(),
      skip_before: self.skip_before,
      on_success: self.on_success.clone(),
      on_error: self.on_error.clone(),
      on_complete: self.on_complete.clone(),
      ignore_errors: self.ignore_errors,
    }
  }
}

// Hooks are closures, so Debug only reports which ones are present.
impl<V, Err> std::fmt::Debug for StepDef<V, Err> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("StepDef")
      .field("info", &self.info)
      .field("skip_before", &self.skip_before)
      .field("ignore_errors", &self.ignore_errors)
      .field("success_present", &self.on_success.is_some())
      .field("error_present", &self.on_error.is_some())
      .field("complete_present", &self.on_complete.is_some())
      .finish()
  }
}
