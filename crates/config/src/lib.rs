//! Configuration loading, validation, and env substitution.
//!
//! Config files: `courier.toml`, `courier.yaml`, or `courier.json`
//! Searched in `./` then `~/.config/courier/`.
//!
//! Supports `${ENV_VAR}` and `${ENV_VAR:-default}` substitution in the raw file.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    error::{Error, Result},
    loader::{config_dir, data_dir, discover_and_load, load_config},
    schema::{
        CourierConfig, DEFAULT_CLASSIFIER_TIMEOUT_MS, MetricsConfig, PreClassifierConfig,
        ReasoningConfig, ReasoningMode, ResolvedPreClassifier, SessionsConfig,
    },
    validate::{Diagnostic, Severity, ValidationResult, validate_config},
};
