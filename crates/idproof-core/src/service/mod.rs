//! Session management and stage orchestration.

mod pipeline;
mod store;

pub use pipeline::{Capabilities, PipelineConfig, VerificationPipeline};
pub use store::{SessionConfig, SessionStore};
