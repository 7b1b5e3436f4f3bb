//! Deployment pipeline

pub mod fsm;
pub mod orchestrator;
pub mod progress;
pub mod stages;

pub use orchestrator::Orchestrator;
pub use stages::{default_pipeline, Stage, StageKind};
