//! Job tracking and the deployment service

pub mod service;
pub mod tracker;

pub use service::{JobService, Submission};
pub use tracker::{JobLogger, JobTracker, LiveSnapshot};
