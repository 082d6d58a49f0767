use std::path::Path;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::analytics::AnalyticsOptions;
use crate::error::{CourtError, Result};
use crate::pipeline::DEFAULT_PAGE_SIZE;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub table: TableConfig,
    pub analytics: AnalyticsOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    pub page_size: usize,
    pub max_page_size: usize,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_page_size: 1000,
        }
    }
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// One century of days; anything longer falls outside the register.
pub const MAX_DAYS_BACK: u32 = 36_500;

impl AppConfig {
    /// Defaults, then `open-court.toml` / `config/open-court.*` if present,
    /// then an explicit file, then `OPEN_COURT__SECTION__KEY` variables.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder()
            .add_source(File::with_name("open-court").required(false))
            .add_source(File::with_name("config/open-court").required(false));

        if let Some(path) = explicit {
            builder = builder.add_source(File::from(path).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix("OPEN_COURT")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let app_config: AppConfig = config.try_deserialize()?;
        app_config.validate()?;
        Ok(app_config)
    }

    pub fn validate(&self) -> Result<()> {
        let level = self.logging.level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(CourtError::Config(format!(
                "Invalid log level: {}. Must be one of: {:?}",
                self.logging.level, LOG_LEVELS
            )));
        }

        if self.table.page_size == 0 {
            return Err(CourtError::Config(
                "table.page_size must be greater than 0".to_string(),
            ));
        }
        if self.table.page_size > self.table.max_page_size {
            return Err(CourtError::Config(format!(
                "table.page_size {} exceeds table.max_page_size {}",
                self.table.page_size, self.table.max_page_size
            )));
        }

        let analytics = &self.analytics;
        let limits = [
            ("months_back", analytics.months_back),
            ("days_back", analytics.days_back as usize),
            ("daily_points", analytics.daily_points),
            ("top_stations", analytics.top_stations),
            ("top_categories", analytics.top_categories),
            ("top_officers", analytics.top_officers),
            ("top_divisions", analytics.top_divisions),
            ("stacked_groups", analytics.stacked_groups),
            ("correlation_groups", analytics.correlation_groups),
        ];
        for (name, value) in limits {
            if value == 0 {
                return Err(CourtError::Config(format!(
                    "analytics.{name} must be greater than 0"
                )));
            }
        }
        if analytics.days_back > MAX_DAYS_BACK {
            return Err(CourtError::Config(format!(
                "analytics.days_back {} exceeds {MAX_DAYS_BACK}",
                analytics.days_back
            )));
        }

        Ok(())
    }

    /// Requested page size, capped by the configured maximum. Zero is rejected.
    pub fn page_size(&self, requested: Option<usize>) -> Result<usize> {
        match requested {
            Some(0) => Err(CourtError::InvalidInput(
                "page size must be at least 1".to_string(),
            )),
            Some(size) => Ok(size.min(self.table.max_page_size)),
            None => Ok(self.table.page_size.min(self.table.max_page_size)),
        }
    }
}
