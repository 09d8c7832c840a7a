//! Engine configuration
//!
//! Loaded from YAML; every section and key is optional.
//!
//! ```yaml
//! work_root: /var/lib/datavet/executions
//! validation:
//!   max_duplicate_reports: 100
//!   max_listed_failures: 10
//! performance:
//!   skip_rules_above: 500000
//!   skip_scopes: [row, field]
//! ```

use crate::{Error, Result};
use datavet_validation::{RuleScope, ValidationConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory that holds one subdirectory per run
pub const DEFAULT_WORK_ROOT: &str = "executions";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub work_root: PathBuf,
    pub validation: ValidationSettings,
    pub performance: PerformanceSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            work_root: PathBuf::from(DEFAULT_WORK_ROOT),
            validation: ValidationSettings::default(),
            performance: PerformanceSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidationSettings {
    pub max_duplicate_reports: usize,
    pub max_listed_failures: usize,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        let defaults = ValidationConfig::default();
        Self {
            max_duplicate_reports: defaults.max_duplicate_reports,
            max_listed_failures: defaults.max_listed_failures,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PerformanceSettings {
    /// Record count above which rules of `skip_scopes` are skipped
    pub skip_rules_above: Option<usize>,
    pub skip_scopes: Vec<String>,
}

impl Default for PerformanceSettings {
    fn default() -> Self {
        Self {
            skip_rules_above: None,
            skip_scopes: vec![RuleScope::Row.as_str().to_string()],
        }
    }
}

impl EngineConfig {
    /// Parse a YAML configuration document
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for malformed documents, unknown keys and
    /// unknown rule scopes.
    pub fn from_yaml(text: &str) -> Result<Self> {
        let config: Self = if text.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(text).map_err(|e| Error::Config(e.to_string()))?
        };
        config.validation_config()?;
        Ok(config)
    }

    /// Load a YAML configuration file
    ///
    /// # Errors
    ///
    /// I/O failures and everything [`EngineConfig::from_yaml`] rejects.
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading engine configuration from {}", path.display());
        let text = std::fs::read_to_string(path).map_err(|e| Error::io("read config", path, &e))?;
        Self::from_yaml(&text)
    }

    /// Override the work root
    #[must_use]
    pub fn with_work_root(mut self, work_root: impl Into<PathBuf>) -> Self {
        self.work_root = work_root.into();
        self
    }

    /// Settings for the validation engine
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an unknown rule scope.
    pub fn validation_config(&self) -> Result<ValidationConfig> {
        let skip_scopes = self
            .performance
            .skip_scopes
            .iter()
            .map(|name| {
                RuleScope::from_name(name).ok_or_else(|| {
                    Error::Config(format!(
                        "unknown rule scope '{name}' in performance.skip_scopes (expected field, row, dataset or package)"
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ValidationConfig {
            max_duplicate_reports: self.validation.max_duplicate_reports,
            max_listed_failures: self.validation.max_listed_failures,
            skip_rules_above: self.performance.skip_rules_above,
            skip_scopes,
        })
    }
}
