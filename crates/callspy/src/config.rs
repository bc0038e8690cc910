//! Spy configuration

use crate::trace::{CallerLocation, StackCapture, StackSnapshot};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Environment variable selecting the default [`TraceMode`]
pub const TRACE_ENV: &str = "CALLSPY_TRACE";
/// Environment variable toggling per-call logging
pub const LOG_CALLS_ENV: &str = "CALLSPY_LOG_CALLS";

/// How much call-site context each record carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceMode {
    /// Stack snapshot of the invoking thread plus the invoking location
    #[default]
    Stack,
    /// Source location of the invoking code only
    Location,
}

impl TraceMode {
    /// Capturer implementing this mode
    #[must_use]
    pub fn capturer(self) -> Arc<dyn StackCapture> {
        match self {
            Self::Stack => Arc::new(StackSnapshot),
            Self::Location => Arc::new(CallerLocation),
        }
    }
}

impl fmt::Display for TraceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stack => f.write_str("stack"),
            Self::Location => f.write_str("location"),
        }
    }
}

impl FromStr for TraceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stack" | "backtrace" | "full" => Ok(Self::Stack),
            "location" | "caller" => Ok(Self::Location),
            other => Err(format!("unknown trace mode '{other}'")),
        }
    }
}

/// Per-spy configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpyConfig {
    /// Name used in log events and errors
    pub name: Option<String>,
    /// Call-site capture mode
    pub trace: TraceMode,
    /// Emit a trace event for every recorded call
    pub log_calls: bool,
}

impl Default for SpyConfig {
    fn default() -> Self {
        Self {
            name: None,
            trace: TraceMode::Stack,
            log_calls: true,
        }
    }
}

impl SpyConfig {
    /// Create a new config
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `CALLSPY_TRACE` and `CALLSPY_LOG_CALLS`
    ///
    /// Unparseable values are logged and ignored.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_overrides(
            std::env::var(TRACE_ENV).ok().as_deref(),
            std::env::var(LOG_CALLS_ENV).ok().as_deref(),
        )
    }

    fn with_overrides(mut self, trace: Option<&str>, log_calls: Option<&str>) -> Self {
        if let Some(raw) = trace {
            match raw.parse() {
                Ok(mode) => self.trace = mode,
                Err(err) => tracing::warn!(var = TRACE_ENV, %err, "ignoring override"),
            }
        }
        if let Some(raw) = log_calls {
            match parse_flag(raw) {
                Some(flag) => self.log_calls = flag,
                None => tracing::warn!(var = LOG_CALLS_ENV, value = raw, "ignoring override"),
            }
        }
        self
    }

    /// Set the spy name
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the trace mode
    #[must_use]
    pub const fn with_trace(mut self, trace: TraceMode) -> Self {
        self.trace = trace;
        self
    }

    /// Enable or disable per-call logging
    #[must_use]
    pub const fn with_log_calls(mut self, enabled: bool) -> Self {
        self.log_calls = enabled;
        self
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SpyConfig::new();
        assert_eq!(config.name, None);
        assert_eq!(config.trace, TraceMode::Stack);
        assert!(config.log_calls);
    }

    #[test]
    fn test_builders() {
        let config = SpyConfig::new()
            .with_name("on_save")
            .with_trace(TraceMode::Location)
            .with_log_calls(false);
        assert_eq!(config.name.as_deref(), Some("on_save"));
        assert_eq!(config.trace, TraceMode::Location);
        assert!(!config.log_calls);
    }

    #[test]
    fn test_trace_mode_parse() {
        assert_eq!("location".parse::<TraceMode>(), Ok(TraceMode::Location));
        assert_eq!("caller".parse::<TraceMode>(), Ok(TraceMode::Location));
        assert_eq!(" Backtrace ".parse::<TraceMode>(), Ok(TraceMode::Stack));
        assert_eq!("stack".parse::<TraceMode>(), Ok(TraceMode::Stack));
        assert!("verbose".parse::<TraceMode>().is_err());
    }

    #[test]
    fn test_trace_mode_display_round_trips() {
        for mode in [TraceMode::Stack, TraceMode::Location] {
            assert_eq!(mode.to_string().parse::<TraceMode>(), Ok(mode));
        }
    }

    #[test]
    fn test_trace_mode_capturer() {
        let caller = std::panic::Location::caller();
        let located = TraceMode::Location.capturer().capture(caller);
        assert!(located.location().is_some());
        assert!(located.backtrace().is_none());

        let stacked = TraceMode::Stack.capturer().capture(caller);
        assert!(stacked.location().is_some());
        assert!(stacked.backtrace().is_some());
    }

    #[test]
    fn test_overrides_applied() {
        let config = SpyConfig::default().with_overrides(Some("location"), Some("0"));
        assert_eq!(config.trace, TraceMode::Location);
        assert!(!config.log_calls);
    }

    #[test]
    fn test_bad_overrides_ignored() {
        let config = SpyConfig::default().with_overrides(Some("loud"), Some("maybe"));
        assert_eq!(config, SpyConfig::default());
    }

    #[test]
    fn test_absent_overrides() {
        assert_eq!(
            SpyConfig::default().with_overrides(None, None),
            SpyConfig::default()
        );
    }

    #[test]
    fn test_config_serde() {
        let config = SpyConfig::new().with_name("fn").with_trace(TraceMode::Location);
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"location\""));
        let back: SpyConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
