//! Scheduler configuration loaded from a JSON file.

use crate::calculations::CriticalityPolicy;
use crate::calendar::WorkCalendar;
use crate::engine::EngineOptions;
use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_ENV_VAR: &str = "SITE_SCHEDULE_CONFIG";
pub const HTTP_ADDR_ENV_VAR: &str = "SITE_SCHEDULE_HTTP_ADDR";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub working_days: Vec<Weekday>,
    pub criticality_policy: CriticalityPolicy,
    /// Forward-pass iteration cap on cyclic graphs, as a multiple of the task count.
    pub iteration_cap_factor: usize,
    pub log_level: String,
    pub database_path: PathBuf,
    pub http_addr: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            working_days: WorkCalendar::STANDARD_WEEK.to_vec(),
            criticality_policy: CriticalityPolicy::default(),
            iteration_cap_factor: 2,
            log_level: "info".to_string(),
            database_path: PathBuf::from("site_schedule.db"),
            http_addr: "0.0.0.0:3000".to_string(),
        }
    }
}

impl SchedulerConfig {
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            criticality_policy: self.criticality_policy,
            iteration_cap_factor: self
                .iteration_cap_factor
                .clamp(1, EngineOptions::MAX_ITERATION_CAP_FACTOR),
        }
    }

    /// Mon-Fri unless configured otherwise, with the given blocked dates.
    pub fn calendar_with<J>(&self, blocked: J) -> WorkCalendar
    where
        J: IntoIterator<Item = chrono::NaiveDate>,
    {
        WorkCalendar::custom(self.working_days.iter().copied(), blocked)
    }

    /// `SITE_SCHEDULE_HTTP_ADDR` overrides the configured address.
    pub fn resolved_http_addr(&self) -> String {
        std::env::var(HTTP_ADDR_ENV_VAR)
            .ok()
            .filter(|addr| !addr.trim().is_empty())
            .unwrap_or_else(|| self.http_addr.clone())
    }
}

#[derive(Debug)]
pub struct ConfigLoad {
    pub config: SchedulerConfig,
    pub error: Option<ConfigError>,
}

pub fn config_path() -> Option<PathBuf> {
    std::env::var(CONFIG_ENV_VAR)
        .ok()
        .filter(|path| !path.trim().is_empty())
        .map(PathBuf::from)
}

pub fn load_config_from_path(path: &Path) -> Result<SchedulerConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Explicit path first, then `SITE_SCHEDULE_CONFIG`, then defaults. Errors are
/// handed back next to the default config instead of aborting.
pub fn load_config_with_fallback(explicit: Option<&Path>) -> ConfigLoad {
    let path = explicit.map(Path::to_path_buf).or_else(config_path);
    let Some(path) = path else {
        return ConfigLoad {
            config: SchedulerConfig::default(),
            error: None,
        };
    };

    match load_config_from_path(&path) {
        Ok(config) => ConfigLoad {
            config,
            error: None,
        },
        Err(err) => ConfigLoad {
            config: SchedulerConfig::default(),
            error: Some(err),
        },
    }
}
