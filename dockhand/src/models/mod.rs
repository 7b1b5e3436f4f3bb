//! Domain models

pub mod deployment;
pub mod job;
pub mod profile;
pub mod tag;
