//! Semantic validation of a loaded configuration.
//!
//! Parsing already rejects malformed files; this catches settings that parse
//! but cannot work at runtime.

use crate::schema::{CourierConfig, ReasoningMode};

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Dotted path, e.g. "pre_classifier.url"
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}: {}", self.severity, self.path, self.message)
    }
}

/// Result of validating a configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    fn push(&mut self, severity: Severity, path: &str, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity,
            path: path.to_string(),
            message: message.into(),
        });
    }
}

/// Check a configuration for settings that would silently disable or break
/// a feature at runtime.
#[must_use]
pub fn validate_config(config: &CourierConfig) -> ValidationResult {
    let mut result = ValidationResult::default();

    let gate = &config.pre_classifier;
    if gate.enabled {
        let url = gate.url.trim();
        if url.is_empty() {
            result.push(
                Severity::Warning,
                "pre_classifier.url",
                "pre-classifier is enabled without a url and will be skipped",
            );
        } else {
            match url::Url::parse(url) {
                Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {},
                Ok(parsed) => result.push(
                    Severity::Error,
                    "pre_classifier.url",
                    format!("unsupported scheme \"{}\"", parsed.scheme()),
                ),
                Err(e) => result.push(
                    Severity::Error,
                    "pre_classifier.url",
                    format!("invalid url: {e}"),
                ),
            }
        }
        if gate.timeout_ms == Some(0) {
            result.push(
                Severity::Error,
                "pre_classifier.timeout_ms",
                "timeout must be greater than zero",
            );
        }
    }

    let reasoning = &config.reasoning;
    if reasoning.enabled {
        if reasoning.provider.trim().is_empty() {
            result.push(
                Severity::Error,
                "reasoning.provider",
                "reasoning is enabled without a provider",
            );
        }
        let has_channel = reasoning
            .channel_id
            .as_deref()
            .is_some_and(|id| !id.trim().is_empty());
        if reasoning.mode == ReasoningMode::Channel && !has_channel {
            result.push(
                Severity::Error,
                "reasoning.channel_id",
                "channel mode requires a channel_id",
            );
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::schema::{PreClassifierConfig, ReasoningConfig},
    };

    fn gate(url: &str, timeout_ms: Option<u64>) -> CourierConfig {
        CourierConfig {
            pre_classifier: PreClassifierConfig {
                enabled: true,
                url: url.into(),
                timeout_ms,
            },
            ..Default::default()
        }
    }

    #[test]
    fn default_config_is_clean() {
        let result = validate_config(&CourierConfig::default());
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn valid_gate_is_clean() {
        let result = validate_config(&gate("http://localhost:8000/gatekeeper", Some(800)));
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn enabled_gate_without_url_warns() {
        let result = validate_config(&gate("", None));
        assert!(!result.has_errors());
        assert_eq!(result.count(Severity::Warning), 1);
    }

    #[test]
    fn rejects_non_http_scheme() {
        let result = validate_config(&gate("ftp://localhost/gate", None));
        assert!(result.has_errors());
        assert!(result.diagnostics[0].message.contains("ftp"));
    }

    #[test]
    fn rejects_unparsable_url() {
        let result = validate_config(&gate("not a url", None));
        assert!(result.has_errors());
    }

    #[test]
    fn rejects_zero_timeout() {
        let result = validate_config(&gate("http://localhost:8000/gatekeeper", Some(0)));
        assert_eq!(result.diagnostics[0].path, "pre_classifier.timeout_ms");
    }

    #[test]
    fn channel_mode_needs_channel_id() {
        let cfg = CourierConfig {
            reasoning: ReasoningConfig {
                enabled: true,
                mode: ReasoningMode::Channel,
                provider: "mattermost".into(),
                ..Default::default()
            },
            ..Default::default()
        };
        let result = validate_config(&cfg);
        assert!(result.has_errors());
        assert_eq!(result.diagnostics[0].path, "reasoning.channel_id");
    }

    #[test]
    fn reasoning_needs_provider() {
        let cfg = CourierConfig {
            reasoning: ReasoningConfig {
                enabled: true,
                ..Default::default()
            },
            ..Default::default()
        };
        let result = validate_config(&cfg);
        assert_eq!(result.diagnostics[0].path, "reasoning.provider");
    }
}
