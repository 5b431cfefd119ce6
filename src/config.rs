//! Configuration types for pit-analytics

use crate::calendar::SessionCalendar;
use crate::cost::CostModelConfig;
use crate::optimize::WalkForwardConfig;
use crate::quantile::QuantileAnalysisConfig;
use crate::telemetry::LogFormat;
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

/// Invalid model parameters
///
/// Raised at construction; parameters are never clamped into range.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Value is NaN or infinite
    #[error("{field} must be finite, got {value}")]
    NonFinite { field: &'static str, value: f64 },
    /// Value is outside its allowed range
    #[error("{field} out of range: {reason}")]
    OutOfRange { field: &'static str, reason: String },
}

impl ConfigError {
    pub(crate) fn out_of_range(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::OutOfRange {
            field,
            reason: reason.into(),
        }
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub cost_model: CostModelConfig,
    #[serde(default)]
    pub quantile: QuantileAnalysisConfig,
    #[serde(default)]
    pub walk_forward: WalkForwardConfig,
    #[serde(default)]
    pub calendar: CalendarConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Where trading sessions come from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionSource {
    /// Distinct dates present in the daily returns table
    #[default]
    Returns,
    /// Monday-Friday minus `holidays`
    Weekdays,
}

/// Trading calendar configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CalendarConfig {
    #[serde(default)]
    pub sessions: SessionSource,
    /// First calendar day covered
    #[serde(default = "default_calendar_start")]
    pub start: NaiveDate,
    /// Last calendar day covered
    #[serde(default = "default_calendar_end")]
    pub end: NaiveDate,
    /// Exchange holidays excluded from the weekday sessions
    #[serde(default)]
    pub holidays: Vec<NaiveDate>,
}

fn default_calendar_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(1990, 1, 1).unwrap_or_default()
}
fn default_calendar_end() -> NaiveDate {
    NaiveDate::from_ymd_opt(2030, 12, 31).unwrap_or_default()
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            sessions: SessionSource::default(),
            start: default_calendar_start(),
            end: default_calendar_end(),
            holidays: Vec::new(),
        }
    }
}

impl CalendarConfig {
    /// Build the weekday session calendar
    pub fn build(&self) -> SessionCalendar {
        if self.holidays.is_empty() {
            tracing::warn!(
                start = %self.start,
                end = %self.end,
                "Weekday calendar has no holidays; forward windows spanning exchange holidays will be dropped"
            );
        }
        SessionCalendar::weekdays(self.start, self.end, &self.holidays)
    }

    /// Build the calendar for a daily returns table
    ///
    /// With `sessions = "returns"` every distinct return date inside
    /// `[start, end]` is a session, so exchange holidays need no list.
    pub fn build_for_returns(
        &self,
        dates: impl IntoIterator<Item = NaiveDate>,
    ) -> SessionCalendar {
        match self.sessions {
            SessionSource::Weekdays => self.build(),
            SessionSource::Returns => {
                let calendar = SessionCalendar::from_sessions(
                    dates
                        .into_iter()
                        .filter(|d| *d >= self.start && *d <= self.end),
                );
                tracing::debug!(sessions = calendar.len(), "Built session calendar from daily returns");
                calendar
            }
        }
    }
}

/// Artifact output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./output")
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
    /// Install the in-process Prometheus recorder
    #[serde(default)]
    pub metrics_enabled: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            metrics_enabled: false,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}
