//! Container detection and database host resolution.

mod resolver;
mod signals;

pub use resolver::*;
pub use signals::*;

#[cfg(test)]
pub(crate) mod fixtures {
    use super::SignalProvider;
    use std::collections::HashMap;

    /// In-memory signal source for resolver tests.
    pub struct FixedSignals {
        pub marker: bool,
        pub vars: HashMap<&'static str, &'static str>,
        pub hostname: Option<&'static str>,
        pub cgroup: Option<&'static str>,
    }

    impl SignalProvider for FixedSignals {
        fn marker_file_exists(&self) -> bool {
            self.marker
        }

        fn env_var(&self, name: &str) -> Option<String> {
            self.vars.get(name).map(|v| v.to_string())
        }

        fn hostname(&self) -> Option<String> {
            self.hostname.map(str::to_string)
        }

        fn cgroup_contents(&self) -> Option<String> {
            self.cgroup.map(str::to_string)
        }
    }
}
