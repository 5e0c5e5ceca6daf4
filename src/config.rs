//! Editor configuration, from serde input or the process environment.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::env::VarError;

use serde::{Deserialize, Serialize};

use crate::drag::RejectPolicy;
use crate::error::EditorError;
use crate::kind::ElementKind;

pub const ENV_REJECT_POLICY: &str = "PAGECRAFT_REJECT_POLICY";
pub const ENV_CONFIRM_DELETE: &str = "PAGECRAFT_CONFIRM_DELETE";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Treatment of zones whose kind filter rejects the dragged source.
    pub reject_policy: RejectPolicy,
    /// Ask the host to confirm before deleting an element.
    pub confirm_delete: bool,
    /// Kind filter applied to zones registered for newly created containers.
    pub container_accepts: Vec<ElementKind>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self { reject_policy: RejectPolicy::FallThrough, confirm_delete: true, container_accepts: Vec::new() }
    }
}

impl EditorConfig {
    /// Build config from environment variables, defaulting what is unset.
    ///
    /// Optional:
    /// - `PAGECRAFT_REJECT_POLICY`: `fall_through` (default) or `cancel`
    /// - `PAGECRAFT_CONFIRM_DELETE`: `true` (default) or `false`
    ///
    /// # Errors
    ///
    /// `Config` when a variable is set to an unrecognized value.
    pub fn from_env() -> Result<Self, EditorError> {
        Self::from_lookup(|key| std::env::var(key))
    }

    /// Build config from an arbitrary key lookup (environment-shaped).
    ///
    /// # Errors
    ///
    /// `Config` when a value is set but unrecognized.
    pub fn from_lookup(lookup: impl Fn(&str) -> Result<String, VarError>) -> Result<Self, EditorError> {
        let mut config = Self::default();
        if let Ok(raw) = lookup(ENV_REJECT_POLICY) {
            config.reject_policy = parse_reject_policy(&raw)?;
        }
        if let Ok(raw) = lookup(ENV_CONFIRM_DELETE) {
            config.confirm_delete = parse_bool(ENV_CONFIRM_DELETE, &raw)?;
        }
        Ok(config)
    }
}

fn parse_reject_policy(raw: &str) -> Result<RejectPolicy, EditorError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "fall_through" | "fallthrough" => Ok(RejectPolicy::FallThrough),
        "cancel" => Ok(RejectPolicy::Cancel),
        other => Err(EditorError::Config(format!("{ENV_REJECT_POLICY}: unknown policy {other:?}"))),
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, EditorError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        other => Err(EditorError::Config(format!("{key}: expected a boolean, got {other:?}"))),
    }
}
