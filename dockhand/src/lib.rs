//! Dockhand Library
//!
//! Build a container image, push it to a registry and roll it out to a
//! remote host, while tracking job progress and keeping encrypted
//! deployment profiles.

pub mod app;
pub mod deploy;
pub mod engine;
pub mod errors;
pub mod filesys;
pub mod jobs;
pub mod logs;
pub mod models;
pub mod process;
pub mod profiles;
pub mod remote;
pub mod server;
pub mod storage;
pub mod store;
pub mod utils;
pub mod vault;
