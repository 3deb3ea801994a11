pub mod context;
pub mod phase;
pub mod shared;
pub mod step;

// Re-export key types for easier access from other stepflow modules (and lib.rs)
pub use context::{ExecutionContext, Hook, SkipPredicate};
pub use phase::ExecutionPhase;
pub use shared::{SharedCollection, SharedObject};
pub use step::{StepDef, StepInfo};
