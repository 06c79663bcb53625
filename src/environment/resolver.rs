//! Containerization decision and the database host derived from it.

use crate::environment::signals::{EnvironmentSignal, SignalProvider, SystemSignals};

/// Loopback address used when the database runs on the same host.
pub const LOOPBACK_HOST: &str = "127.0.0.1";
/// The host machine as seen from inside a Docker container.
pub const DOCKER_HOST_GATEWAY: &str = "host.docker.internal";

/// Address family used to reach the database.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DatabaseTarget {
    LocalHost,
    DockerHostGateway,
}

impl DatabaseTarget {
    pub fn from_signal(signal: &EnvironmentSignal) -> Self {
        if is_containerized_signal(signal) {
            DatabaseTarget::DockerHostGateway
        } else {
            DatabaseTarget::LocalHost
        }
    }

    pub fn host(&self) -> &'static str {
        match self {
            DatabaseTarget::LocalHost => LOOPBACK_HOST,
            DatabaseTarget::DockerHostGateway => DOCKER_HOST_GATEWAY,
        }
    }
}

/// Any single signal is enough; none is authoritative alone.
pub fn is_containerized_signal(signal: &EnvironmentSignal) -> bool {
    signal.dockerenv_file_exists
        || signal.container_env_var_set
        || signal.hostname_looks_like_container_id
        || signal.cgroup_mentions_container_runtime
}

/// Re-reads its provider on every call; callers may memoize the result at startup.
pub struct EnvironmentResolver<P: SignalProvider> {
    provider: P,
}

impl<P: SignalProvider> EnvironmentResolver<P> {
    pub fn new(provider: P) -> Self {
        EnvironmentResolver { provider }
    }

    pub fn signal(&self) -> EnvironmentSignal {
        self.provider.snapshot()
    }

    pub fn is_containerized(&self) -> bool {
        is_containerized_signal(&self.signal())
    }

    pub fn database_target(&self) -> DatabaseTarget {
        let signal = self.signal();
        let target = DatabaseTarget::from_signal(&signal);
        tracing::debug!(
            dockerenv = signal.dockerenv_file_exists,
            env_var = signal.container_env_var_set,
            hostname = %signal.hostname,
            hostname_container_id = signal.hostname_looks_like_container_id,
            cgroup = signal.cgroup_mentions_container_runtime,
            target = ?target,
            "resolved database target"
        );
        target
    }

    pub fn resolve_database_host(&self) -> &'static str {
        self.database_target().host()
    }
}

impl Default for EnvironmentResolver<SystemSignals> {
    fn default() -> Self {
        EnvironmentResolver::new(SystemSignals::new())
    }
}

/// Whether this process runs inside a container, read from the live system.
pub fn is_containerized() -> bool {
    EnvironmentResolver::default().is_containerized()
}

/// Database host for this process, read from the live system.
pub fn resolve_database_host() -> &'static str {
    EnvironmentResolver::default().resolve_database_host()
}
