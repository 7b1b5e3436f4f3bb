//! Utility functions

use anyhow::{bail, Context};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::filesys::dir::Dir;
use crate::process::succeeds;
use crate::storage::settings::Settings;

/// Version information for the service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// Get version information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: option_env!("GIT_HASH").unwrap_or("unknown").to_string(),
        build_time: option_env!("BUILD_TIME").unwrap_or("unknown").to_string(),
    }
}

async fn check_binary(binary: &str, version_arg: &str) -> anyhow::Result<()> {
    let mut command = Command::new(binary);
    command.arg(version_arg);
    let ok = succeeds(command)
        .await
        .with_context(|| format!("cannot execute {}", binary))?;
    if !ok {
        bail!("{} {} exited with an error", binary, version_arg);
    }
    Ok(())
}

async fn check_data_dir(settings: &Settings) -> anyhow::Result<()> {
    let dir = Dir::new(settings.data_dir.clone());
    dir.create()
        .await
        .with_context(|| format!("cannot create {}", settings.data_dir.display()))?;
    let marker = dir.file(".dockhand-write-check");
    marker
        .write_string("ok")
        .await
        .with_context(|| format!("{} is not writable", settings.data_dir.display()))?;
    marker.delete().await?;
    Ok(())
}

/// Check the external tools and the data directory. Returns whether all checks passed.
pub async fn run_diagnostic(settings: &Settings) -> bool {
    let version = version_info();
    println!(
        "{} {} ({}, built {})",
        "dockhand".bold(),
        version.version,
        version.git_hash,
        version.build_time
    );

    let checks = [
        ("container engine", check_binary(&settings.docker_bin, "--version").await),
        ("ssh client", check_binary(&settings.ssh_bin, "-V").await),
        ("data directory", check_data_dir(settings).await),
    ];

    let mut healthy = true;
    for (name, result) in checks {
        match result {
            Ok(()) => println!("  {} {}", "ok".green(), name),
            Err(e) => {
                healthy = false;
                println!("  {} {}: {:#}", "failed".red(), name, e);
            }
        }
    }
    healthy
}
