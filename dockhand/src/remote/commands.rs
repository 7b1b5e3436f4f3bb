//! Remote command assembly
//!
//! Pure functions turning a [`RemoteDeployRequest`] into the ordered shell
//! commands run on the target host.

use crate::remote::RemoteDeployRequest;

const ENV_HEREDOC_MARKER: &str = "DOCKHAND_ENV_EOF";

/// One remote shell command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteStep {
    /// Short description used in log lines
    pub description: String,

    /// Shell command text
    pub command: String,

    /// A failure of this step is logged and ignored
    pub tolerate_failure: bool,
}

impl RemoteStep {
    /// Command text safe to show in logs; heredoc bodies are left out.
    pub fn display_command(&self) -> &str {
        self.command.lines().next().unwrap_or_default()
    }

    fn required(description: impl Into<String>, command: String) -> Self {
        Self {
            description: description.into(),
            command,
            tolerate_failure: false,
        }
    }

    fn tolerant(description: impl Into<String>, command: String) -> Self {
        Self {
            description: description.into(),
            command,
            tolerate_failure: true,
        }
    }
}

/// Commands for one rollout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePlan {
    /// Run in order; stops at the first failing required step
    pub steps: Vec<RemoteStep>,

    /// Run after `steps` whatever happened, once step `cleanup_from` was attempted
    pub cleanup: Vec<RemoteStep>,

    pub cleanup_from: usize,
}

impl RemotePlan {
    /// Whether cleanup is due after attempting `attempted` steps
    pub fn needs_cleanup(&self, attempted: usize) -> bool {
        !self.cleanup.is_empty() && attempted > self.cleanup_from
    }
}

/// Build the rollout plan. `env_file` is the remote path used for the
/// environment block when one is given.
pub fn plan(request: &RemoteDeployRequest, env_file: &str) -> RemotePlan {
    let image = shell_quote(&request.image_ref);
    let name = shell_quote(&request.container_name);
    let env_lines = env_lines(request.env_block.as_deref());

    let mut steps = vec![
        RemoteStep::required(
            format!("Pulling image {}", request.image_ref),
            format!("docker pull {}", image),
        ),
        RemoteStep::tolerant(
            format!("Stopping existing container {}", request.container_name),
            format!("docker stop {} 2>/dev/null || true", name),
        ),
        RemoteStep::tolerant(
            format!("Removing existing container {}", request.container_name),
            format!("docker rm {} 2>/dev/null || true", name),
        ),
    ];

    let mut cleanup = Vec::new();
    let cleanup_from = steps.len();
    let env_file = if env_lines.is_empty() {
        None
    } else {
        steps.push(RemoteStep::required(
            "Writing environment file",
            write_env_file(env_file, &env_lines),
        ));
        cleanup.push(RemoteStep::tolerant(
            "Removing environment file",
            format!("rm -f {}", shell_quote(env_file)),
        ));
        Some(env_file)
    };

    steps.push(RemoteStep::required(
        format!("Starting container {}", request.container_name),
        run_command(request, env_file),
    ));

    RemotePlan {
        steps,
        cleanup,
        cleanup_from,
    }
}

/// `docker run` with flags assembled from the optional parameters
pub fn run_command(request: &RemoteDeployRequest, env_file: Option<&str>) -> String {
    let mut args = vec![
        "docker run -d".to_string(),
        format!("--name {}", shell_quote(&request.container_name)),
        "--restart unless-stopped".to_string(),
    ];

    if let Some((host, container)) = request.ports {
        args.push(format!("-p {}:{}", host, container));
    }
    if let Some(path) = env_file {
        args.push(format!("--env-file {}", shell_quote(path)));
    }
    for volume in block_lines(request.volume_block.as_deref()) {
        args.push(format!("-v {}", shell_quote(volume)));
    }

    args.push(shell_quote(&request.image_ref));
    args.join(" ")
}

fn write_env_file(path: &str, lines: &[&str]) -> String {
    format!(
        "umask 077 && cat > {} <<'{}'\n{}\n{}",
        shell_quote(path),
        ENV_HEREDOC_MARKER,
        lines.join("\n"),
        ENV_HEREDOC_MARKER
    )
}

/// `KEY=VALUE` lines of an env block; blanks and `#` comments are skipped.
///
/// Every kept line contains `=`, so none can match the heredoc marker.
pub fn env_lines(block: Option<&str>) -> Vec<&str> {
    block_lines(block)
        .into_iter()
        .filter(|line| !line.starts_with('#') && line.contains('='))
        .collect()
}

fn block_lines(block: Option<&str>) -> Vec<&str> {
    block
        .map(|b| {
            b.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// Quote a value for a POSIX shell
pub fn shell_quote(value: &str) -> String {
    if !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=@,+".contains(c))
    {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', r"'\''"))
}
