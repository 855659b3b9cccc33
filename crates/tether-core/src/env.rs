//! Environment contract between a host and its component subprocesses.
//!
//! The host never passes configuration on the command line of a normal
//! invocation. Everything a component needs to reach the host travels in
//! the variables below, built with [`ComponentEnv`].

use crate::name::ComponentName;

/// Address of the host's loopback RPC endpoint (`127.0.0.1:1123`).
pub const HOST_TARGET: &str = "TETHER_HOST_TARGET";
/// Name of the component being invoked.
pub const COMPONENT_NAME: &str = "TETHER_COMPONENT_NAME";
/// Log level the host is running with.
pub const LOG_LEVEL: &str = "TETHER_LOG";
/// `true` when the host cache is disabled for this invocation.
pub const NO_CACHE: &str = "TETHER_NOCACHE";
/// Version of the host that spawned the component.
pub const HOST_VERSION: &str = "TETHER_HOST_VERSION";
/// Override for the host home directory.
pub const HOME: &str = "TETHER_HOME";

/// System variables a component process inherits from the host.
pub const SYSTEM_VARS: &[&str] = &[
    "PATH", "HOME", "USER", "SHELL", "TERM", "LANG", "LC_ALL", "LC_CTYPE", "TMPDIR", "TMP",
    "TEMP",
];

/// The [`SYSTEM_VARS`] that are set in the current process.
#[must_use]
pub fn system_vars() -> Vec<(String, String)> {
    SYSTEM_VARS
        .iter()
        .filter_map(|k| std::env::var(k).ok().map(|v| ((*k).to_string(), v)))
        .collect()
}

/// Env vars that must never be forwarded through `passthrough_env`.
const BLOCKED_PASSTHROUGH: &[&str] = &[
    "HOME",
    "PATH",
    "LD_PRELOAD",
    "LD_LIBRARY_PATH",
    "DYLD_INSERT_LIBRARIES",
    "DYLD_LIBRARY_PATH",
    "NODE_OPTIONS",
    "PYTHONPATH",
    "BASH_ENV",
    "ENV",
];

/// Prefixes that are blocked entirely (case-insensitive).
const BLOCKED_PREFIXES: &[&str] = &["ld_", "dyld_", "tether_"];

/// Returns `true` if `key` may not be forwarded to a component.
///
/// `TETHER_*` variables are owned by the contract itself and cannot be
/// overridden through passthrough.
#[must_use]
pub fn is_blocked_passthrough(key: &str) -> bool {
    if BLOCKED_PASSTHROUGH
        .iter()
        .any(|k| k.eq_ignore_ascii_case(key))
    {
        return true;
    }
    let lower = key.to_ascii_lowercase();
    BLOCKED_PREFIXES.iter().any(|p| lower.starts_with(p))
}

/// Parse a boolean env value the way the host writes it.
///
/// Accepts `1`, `true`, `yes` and `on` (any case) as true.
#[must_use]
pub fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Read a boolean variable from the process environment.
#[must_use]
pub fn read_bool(key: &str) -> bool {
    std::env::var(key).is_ok_and(|v| parse_bool(&v))
}

/// Builder for the variables injected into a component subprocess.
#[derive(Debug, Clone)]
pub struct ComponentEnv {
    target: String,
    component: ComponentName,
    log_level: Option<String>,
    no_cache: bool,
    host_version: Option<String>,
    passthrough: Vec<(String, String)>,
}

impl ComponentEnv {
    /// Start an environment for `component` talking to `target`.
    #[must_use]
    pub fn new(target: impl Into<String>, component: ComponentName) -> Self {
        Self {
            target: target.into(),
            component,
            log_level: None,
            no_cache: false,
            host_version: None,
            passthrough: Vec::new(),
        }
    }

    /// Forward the host log level.
    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = Some(level.into());
        self
    }

    /// Mark the cache as disabled for this invocation.
    #[must_use]
    pub fn with_no_cache(mut self, no_cache: bool) -> Self {
        self.no_cache = no_cache;
        self
    }

    /// Record the host version.
    #[must_use]
    pub fn with_host_version(mut self, version: impl Into<String>) -> Self {
        self.host_version = Some(version.into());
        self
    }

    /// Forward a credential or other variable from the host environment.
    ///
    /// Blocked names are silently skipped.
    #[must_use]
    pub fn with_passthrough(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        if !is_blocked_passthrough(&key) {
            self.passthrough.push((key, value.into()));
        }
        self
    }

    /// Copy each listed variable from the current process, if set.
    #[must_use]
    pub fn with_passthrough_from_process<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for key in keys {
            let key = key.as_ref();
            if let Ok(value) = std::env::var(key) {
                self = self.with_passthrough(key, value);
            }
        }
        self
    }

    /// The component this environment targets.
    #[must_use]
    pub fn component(&self) -> &ComponentName {
        &self.component
    }

    /// Flatten into `(key, value)` pairs ready for `Command::envs`.
    #[must_use]
    pub fn to_vars(&self) -> Vec<(String, String)> {
        let mut vars = self.passthrough.clone();
        vars.push((HOST_TARGET.to_string(), self.target.clone()));
        vars.push((COMPONENT_NAME.to_string(), self.component.to_string()));
        vars.push((NO_CACHE.to_string(), self.no_cache.to_string()));
        if let Some(level) = &self.log_level {
            vars.push((LOG_LEVEL.to_string(), level.clone()));
        }
        if let Some(version) = &self.host_version {
            vars.push((HOST_VERSION.to_string(), version.clone()));
        }
        vars
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup<'a>(vars: &'a [(String, String)], key: &str) -> Option<&'a str> {
        vars.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn env_carries_contract_variables() {
        let env = ComponentEnv::new("127.0.0.1:1123", ComponentName::new("iac").unwrap())
            .with_log_level("debug")
            .with_no_cache(true)
            .with_host_version("0.1.0");
        let vars = env.to_vars();

        assert_eq!(lookup(&vars, HOST_TARGET), Some("127.0.0.1:1123"));
        assert_eq!(lookup(&vars, COMPONENT_NAME), Some("iac"));
        assert_eq!(lookup(&vars, LOG_LEVEL), Some("debug"));
        assert_eq!(lookup(&vars, NO_CACHE), Some("true"));
        assert_eq!(lookup(&vars, HOST_VERSION), Some("0.1.0"));
    }

    #[test]
    fn passthrough_skips_blocked_names() {
        let env = ComponentEnv::new("127.0.0.1:1", ComponentName::new("iac").unwrap())
            .with_passthrough("ACME_API_KEY", "secret")
            .with_passthrough("LD_PRELOAD", "/tmp/evil.so")
            .with_passthrough("TETHER_HOST_TARGET", "10.0.0.1:1");
        let vars = env.to_vars();

        assert_eq!(lookup(&vars, "ACME_API_KEY"), Some("secret"));
        assert_eq!(lookup(&vars, "LD_PRELOAD"), None);
        assert_eq!(lookup(&vars, HOST_TARGET), Some("127.0.0.1:1"));
        assert_eq!(
            vars.iter().filter(|(k, _)| k == HOST_TARGET).count(),
            1
        );
    }

    #[test]
    fn blocked_matching_is_case_insensitive() {
        assert!(is_blocked_passthrough("ld_debug"));
        assert!(is_blocked_passthrough("Path"));
        assert!(is_blocked_passthrough("tether_log"));
        assert!(!is_blocked_passthrough("AWS_PROFILE"));
    }

    #[test]
    fn parse_bool_values() {
        assert!(parse_bool("true"));
        assert!(parse_bool("TRUE"));
        assert!(parse_bool(" 1 "));
        assert!(parse_bool("yes"));
        assert!(!parse_bool("false"));
        assert!(!parse_bool(""));
        assert!(!parse_bool("nope"));
    }
}
