use crate::debugger::ContinuePolicy;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Debugger settings, read from a JSON file. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct DebuggerConfig {
    /// When a `continue` inside a breakpoint command takes effect.
    pub continue_policy: ContinuePolicy,
    /// Refuse to create breakpoints that resolve to no location.
    pub strict_breakpoints: bool,
    /// Abort a command list on the first failing native command.
    pub stop_on_command_error: bool,
    /// `run` restarts a live process without asking.
    pub auto_confirm: bool,
    /// Give up waiting for the inferior after this long.
    pub stop_timeout_ms: Option<u64>,
    /// Fallback log filter when `RUST_LOG` is unset.
    pub log_level: Option<String>,
}

impl DebuggerConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn stop_timeout(&self) -> Option<Duration> {
        self.stop_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DebuggerConfig::from_json("{}").unwrap();
        assert_eq!(config, DebuggerConfig::default());
        assert_eq!(config.continue_policy, ContinuePolicy::AfterList);
        assert_eq!(config.stop_timeout(), None);
    }

    #[test]
    fn test_kebab_case_fields() {
        let config = DebuggerConfig::from_json(
            r#"{ "continue-policy": "immediate", "auto-confirm": true, "stop-timeout-ms": 250 }"#,
        )
        .unwrap();
        assert_eq!(config.continue_policy, ContinuePolicy::Immediate);
        assert!(config.auto_confirm);
        assert_eq!(config.stop_timeout(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        assert!(DebuggerConfig::from_json(r#"{ "auto-confrim": true }"#).is_err());
    }
}
