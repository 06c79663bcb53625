//! Process-level container signals and the adapter that reads them.

use std::path::{Path, PathBuf};

/// Marker file created by the Docker runtime at the container root.
pub const DOCKERENV_PATH: &str = "/.dockerenv";
/// Control-group membership of the first process.
pub const CGROUP_PATH: &str = "/proc/1/cgroup";
/// Kernel-exposed hostname.
pub const HOSTNAME_PATH: &str = "/proc/sys/kernel/hostname";
/// Environment variables set by the deployment tooling inside containers.
pub const CONTAINER_ENV_VARS: [&str; 2] = ["DOCKER_CONTAINER", "CONTAINER"];

const CONTAINER_RUNTIMES: [&str; 2] = ["docker", "containerd"];
const CONTAINER_ID_HOSTNAME_LEN: usize = 12;

/// Snapshot of every container signal, taken fresh on each resolution.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnvironmentSignal {
    pub dockerenv_file_exists: bool,
    pub container_env_var_set: bool,
    pub hostname: String,
    pub hostname_looks_like_container_id: bool,
    pub cgroup_mentions_container_runtime: bool,
}

/// True when `hostname` has the shape of an auto-generated container id:
/// exactly 12 ASCII alphanumeric characters.
pub fn hostname_looks_like_container_id(hostname: &str) -> bool {
    hostname.len() == CONTAINER_ID_HOSTNAME_LEN && hostname.chars().all(|c| c.is_ascii_alphanumeric())
}

/// True when cgroup content names a known container runtime.
pub fn cgroup_mentions_container_runtime(contents: &str) -> bool {
    CONTAINER_RUNTIMES.iter().any(|rt| contents.contains(rt))
}

/// Source of raw environment readings. Every method degrades to "absent" on I/O failure.
pub trait SignalProvider {
    fn marker_file_exists(&self) -> bool;
    fn env_var(&self, name: &str) -> Option<String>;
    fn hostname(&self) -> Option<String>;
    fn cgroup_contents(&self) -> Option<String>;

    /// Read every signal and derive the boolean view.
    fn snapshot(&self) -> EnvironmentSignal {
        let container_env_var_set = CONTAINER_ENV_VARS
            .iter()
            .any(|name| self.env_var(name).map(|v| !v.trim().is_empty()).unwrap_or(false));
        let hostname = self.hostname().map(|h| h.trim().to_string()).unwrap_or_default();
        EnvironmentSignal {
            dockerenv_file_exists: self.marker_file_exists(),
            container_env_var_set,
            hostname_looks_like_container_id: hostname_looks_like_container_id(&hostname),
            hostname,
            cgroup_mentions_container_runtime: self
                .cgroup_contents()
                .map(|c| cgroup_mentions_container_runtime(&c))
                .unwrap_or(false),
        }
    }
}

/// Reads signals from the running system.
#[derive(Clone, Debug)]
pub struct SystemSignals {
    marker_path: PathBuf,
    cgroup_path: PathBuf,
    hostname_path: PathBuf,
}

impl SystemSignals {
    pub fn new() -> Self {
        SystemSignals {
            marker_path: PathBuf::from(DOCKERENV_PATH),
            cgroup_path: PathBuf::from(CGROUP_PATH),
            hostname_path: PathBuf::from(HOSTNAME_PATH),
        }
    }

    /// Override the filesystem locations (tests, non-Linux hosts).
    pub fn with_paths(
        marker_path: impl Into<PathBuf>,
        cgroup_path: impl Into<PathBuf>,
        hostname_path: impl Into<PathBuf>,
    ) -> Self {
        SystemSignals {
            marker_path: marker_path.into(),
            cgroup_path: cgroup_path.into(),
            hostname_path: hostname_path.into(),
        }
    }
}

impl Default for SystemSignals {
    fn default() -> Self {
        Self::new()
    }
}

fn read_optional(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(s) => Some(s),
        Err(e) => {
            tracing::trace!(path = %path.display(), error = %e, "signal unreadable, treating as absent");
            None
        }
    }
}

impl SignalProvider for SystemSignals {
    fn marker_file_exists(&self) -> bool {
        self.marker_path.exists()
    }

    fn env_var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }

    fn hostname(&self) -> Option<String> {
        read_optional(&self.hostname_path)
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .or_else(|| std::env::var("HOSTNAME").ok())
    }

    fn cgroup_contents(&self) -> Option<String> {
        read_optional(&self.cgroup_path)
    }
}
