//! Runtime settings for the swap engine.
//!
//! Defaults live in code; a TOML file can override any subset of them.

use anyhow::Context;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineSettings {
    /// Delay between refreshes within one reconciliation cycle.
    pub poll_interval_ms: u64,
    /// Length of a reconciliation cycle; polling self-terminates after this.
    pub poll_window_ms: u64,
    /// Per-request RPC timeout.
    pub rpc_timeout_ms: u64,
    /// Bounded retries for rate-limited read calls.
    pub max_rpc_retries: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2_000,
            poll_window_ms: 30_000,
            rpc_timeout_ms: 5_000,
            max_rpc_retries: 3,
        }
    }
}

impl EngineSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn poll_window(&self) -> Duration {
        Duration::from_millis(self.poll_window_ms)
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }
}

/// Load settings from a TOML file, falling back to defaults for anything
/// the file leaves out.
pub fn load_settings(path: &Path) -> anyhow::Result<EngineSettings> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading settings file {}", path.display()))?;
    let settings: EngineSettings =
        toml::from_str(&raw).with_context(|| format!("parsing settings file {}", path.display()))?;
    info!(path = %path.display(), ?settings, "loaded engine settings");
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_sane() {
        let settings = EngineSettings::default();
        assert_eq!(settings.poll_interval(), Duration::from_secs(2));
        assert_eq!(settings.poll_window(), Duration::from_secs(30));
        assert!(settings.poll_interval() < settings.poll_window());
    }

    #[test]
    fn partial_toml_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "poll_interval_ms = 500").unwrap();
        let settings = load_settings(file.path()).unwrap();
        assert_eq!(settings.poll_interval_ms, 500);
        assert_eq!(settings.poll_window_ms, 30_000);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "poll_intervall_ms = 500").unwrap();
        assert!(load_settings(file.path()).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_settings(Path::new("/nonexistent/engine.toml")).is_err());
    }
}
