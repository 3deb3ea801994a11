// stepflow/src/pipeline/mod.rs

//! Defines the `Pipeline` and `Step` handles, the builder surface and the execution driver.

pub mod definition;
pub mod execution;
pub mod hooks;

pub use definition::Pipeline;
pub use hooks::Step;
