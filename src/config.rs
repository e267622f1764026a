use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::common::constants::{
    CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH, DEFAULT_DAYS_AHEAD, DEFAULT_MAX_CONCURRENT,
};
use crate::common::error::ConfigError;
use crate::temporal::DateWindow;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub date_range: DateRangeConfig,
    pub scraping: ScrapingConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
    pub sources: Vec<SourceConfig>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateRangeMode {
    #[default]
    Rolling,
    Fixed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DateRangeConfig {
    pub mode: DateRangeMode,
    pub days_ahead: i64,
    /// `YYYY-MM-DD`, fixed mode only
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl Default for DateRangeConfig {
    fn default() -> Self {
        Self {
            mode: DateRangeMode::Rolling,
            days_ahead: DEFAULT_DAYS_AHEAD,
            start_date: None,
            end_date: None,
        }
    }
}

impl DateRangeConfig {
    pub fn window(&self, now: DateTime<FixedOffset>) -> Result<DateWindow, ConfigError> {
        match self.mode {
            DateRangeMode::Rolling => DateWindow::rolling(now, self.days_ahead),
            DateRangeMode::Fixed => match (&self.start_date, &self.end_date) {
                (Some(start), Some(end)) => DateWindow::fixed(start, end),
                _ => Err(ConfigError::Invalid(
                    "fixed date range needs both start_date and end_date".to_string(),
                )),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapingConfig {
    pub max_concurrent: usize,
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub directory: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: PathBuf::from("logs"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Where `run` writes the rendered Prometheus snapshot, if anywhere
    pub snapshot_file: Option<PathBuf>,
}

/// One configured listing source backed by a local JSON feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub path: PathBuf,
    /// Default zone for listings that name none
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

impl AppConfig {
    /// Config path from `EVENT_CALENDAR_CONFIG`, else `config.toml`
    pub fn default_path() -> PathBuf {
        std::env::var(CONFIG_PATH_ENV)
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    /// Read, parse and validate a config file. Relative feed paths are
    /// resolved against the config file's directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&content)?;

        if let Some(base) = path.parent() {
            for source in &mut config.sources {
                if source.path.is_relative() {
                    source.path = base.join(&source.path);
                }
            }
        }
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scraping.max_concurrent == 0 {
            return Err(ConfigError::Invalid(
                "scraping.max_concurrent must be at least 1".to_string(),
            ));
        }
        if self.date_range.mode == DateRangeMode::Fixed
            && (self.date_range.start_date.is_none() || self.date_range.end_date.is_none())
        {
            return Err(ConfigError::Invalid(
                "fixed date range needs both start_date and end_date".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for source in &self.sources {
            if source.name.trim().is_empty() {
                return Err(ConfigError::Invalid("source name must not be empty".to_string()));
            }
            if !seen.insert(source.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate source name '{}'",
                    source.name
                )));
            }
        }
        Ok(())
    }
}
