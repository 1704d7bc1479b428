//! Pipeline configuration
//!
//! Loaded from TOML, then overridden by `PREMIUM_*` environment variables and
//! finally by command-line flags in the trainer binary.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::errors::{PremiumError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub iterations: usize,
    pub folds: usize,
    pub seed: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            iterations: 25,
            folds: 4,
            seed: 123,
        }
    }
}

/// Booster settings outside the search space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoosterConfig {
    pub max_bin: usize,
    pub min_child_weight: f64,
}

impl Default for BoosterConfig {
    fn default() -> Self {
        Self {
            max_bin: 256,
            min_child_weight: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub top_features: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self { top_features: 19 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Reference date for tenure; the local clock when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_date: Option<NaiveDate>,
    pub search: SearchConfig,
    pub booster: BoosterConfig,
    pub report: ReportConfig,
    pub logging: LoggingConfig,
}

impl PipelineConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            PremiumError::Config(format!("Failed to read config file {}: {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| PremiumError::Config(format!("Failed to parse config: {e}")))
    }

    /// Write configuration as TOML
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| PremiumError::Config(format!("Failed to serialize config: {e}")))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Apply `PREMIUM_*` environment variables
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    /// Apply overrides from any key lookup; unparseable values are ignored
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("PREMIUM_LOG_LEVEL") {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                self.logging.level = trimmed.to_string();
            }
        }

        if let Some(value) = lookup("PREMIUM_SEARCH_ITERATIONS") {
            if let Ok(parsed) = value.trim().parse() {
                self.search.iterations = parsed;
            }
        }

        if let Some(value) = lookup("PREMIUM_SEARCH_FOLDS") {
            if let Ok(parsed) = value.trim().parse() {
                self.search.folds = parsed;
            }
        }

        if let Some(value) = lookup("PREMIUM_SEED") {
            if let Ok(parsed) = value.trim().parse() {
                self.search.seed = parsed;
            }
        }

        if let Some(value) = lookup("PREMIUM_PROCESSING_DATE") {
            match NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d") {
                Ok(date) => self.processing_date = Some(date),
                Err(e) => debug!("Ignoring PREMIUM_PROCESSING_DATE={}: {}", value, e),
            }
        }
    }

    /// Reject unusable settings and return warnings for questionable ones
    pub fn validate(&self) -> Result<Vec<String>> {
        if self.search.iterations == 0 {
            return Err(PremiumError::Config(
                "search.iterations must be at least 1".into(),
            ));
        }
        if self.search.folds < 2 {
            return Err(PremiumError::Config("search.folds must be at least 2".into()));
        }
        if self.booster.max_bin < 2 {
            return Err(PremiumError::Config("booster.max_bin must be at least 2".into()));
        }
        if self.booster.min_child_weight.is_nan() || self.booster.min_child_weight < 0.0 {
            return Err(PremiumError::Config(
                "booster.min_child_weight must be non-negative".into(),
            ));
        }

        let mut warnings = Vec::new();
        if self.processing_date.is_none() {
            warnings.push(
                "processing_date is unset; tenure buckets follow the local clock".to_string(),
            );
        }
        if self.search.folds > 10 {
            warnings.push(format!(
                "{} folds multiplies training cost per candidate",
                self.search.folds
            ));
        }
        if self.booster.max_bin > 1024 {
            warnings.push(format!("max_bin {} is unusually large", self.booster.max_bin));
        }
        if self.report.top_features == 0 {
            warnings.push("report.top_features is 0; no importances will be reported".into());
        }
        if !matches!(
            self.logging.level.to_lowercase().as_str(),
            "trace" | "debug" | "info" | "warn" | "error"
        ) {
            warnings.push(format!("unrecognised log level '{}'", self.logging.level));
        }
        Ok(warnings)
    }
}
