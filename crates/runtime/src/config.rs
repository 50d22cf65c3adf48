use std::time::Duration;

/// Environment variable overriding the read debounce window, in milliseconds.
pub const DEBOUNCE_ENV: &str = "REQUEST_DEBOUNCE_MS";

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LifecycleConfig {
    /// Quiet period a read trigger must survive before its fetch starts.
    pub debounce: Duration,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

impl LifecycleConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup. Unparseable values fall
    /// back to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let default_ms = DEFAULT_DEBOUNCE.as_millis() as u64;
        let debounce_ms = env_u64(&lookup, DEBOUNCE_ENV, default_ms);
        Self {
            debounce: Duration::from_millis(debounce_ms),
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }
}

fn env_u64(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> u64 {
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, default, "ignoring unparseable setting");
            default
        }),
        None => default,
    }
}
