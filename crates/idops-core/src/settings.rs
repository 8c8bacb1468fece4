//! Common connection settings shared by both cores.

use serde::{Deserialize, Serialize};

/// Timeouts and retry policy for a network-backed session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionSettings {
    /// Connection/bind timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum bind attempts before the constructor gives up.
    #[serde(default = "default_bind_retries")]
    pub bind_retries: u32,
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_bind_retries() -> u32 {
    4
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            bind_retries: default_bind_retries(),
        }
    }
}

impl ConnectionSettings {
    /// Create settings with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the connection timeout.
    #[must_use]
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Set the bind retry count.
    #[must_use]
    pub fn with_bind_retries(mut self, retries: u32) -> Self {
        self.bind_retries = retries;
        self
    }

    /// Connection timeout as a [`std::time::Duration`].
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = ConnectionSettings::default();
        assert_eq!(settings.timeout_secs, 60);
        assert_eq!(settings.bind_retries, 4);
    }

    #[test]
    fn test_builders() {
        let settings = ConnectionSettings::new()
            .with_timeout(15)
            .with_bind_retries(2);
        assert_eq!(settings.timeout(), std::time::Duration::from_secs(15));
        assert_eq!(settings.bind_retries, 2);
    }
}
