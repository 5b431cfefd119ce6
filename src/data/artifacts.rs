//! Run summary artifact (`summary.json`)

use super::types::DataError;
use crate::cost::{CapacityAnalysis, CostModelConfig, CostSummary};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const SUMMARY_FILE: &str = "summary.json";

/// Provenance and headline results of one analytics run
///
/// Cost sections are stored as JSON objects so the file stays readable by
/// tools that do not know the Rust types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub created_at: DateTime<Utc>,
    /// Point-in-time snapshot every input was read from
    pub snapshot_id: Option<String>,
    /// Dataset name to version id
    #[serde(default)]
    pub dataset_version_ids: BTreeMap<String, String>,
    #[serde(default)]
    pub cost_summary: Option<serde_json::Value>,
    #[serde(default)]
    pub capacity_analysis: Option<serde_json::Value>,
    #[serde(default)]
    pub cost_model_config: Option<serde_json::Value>,
    /// Free-form results such as the Rank-IC headline numbers
    #[serde(default)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl RunSummary {
    pub fn new(snapshot_id: Option<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            created_at: Utc::now(),
            snapshot_id,
            dataset_version_ids: BTreeMap::new(),
            cost_summary: None,
            capacity_analysis: None,
            cost_model_config: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn with_dataset_version(mut self, dataset: impl Into<String>, version: impl Into<String>) -> Self {
        self.dataset_version_ids.insert(dataset.into(), version.into());
        self
    }

    pub fn with_costs(
        mut self,
        summary: &CostSummary,
        capacity: &CapacityAnalysis,
        config: &CostModelConfig,
    ) -> Self {
        self.cost_summary = Some(summary.to_json());
        self.capacity_analysis = Some(capacity.to_json());
        self.cost_model_config = Some(config.to_json());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    pub fn cost_summary(&self) -> Result<Option<CostSummary>, DataError> {
        Ok(self
            .cost_summary
            .clone()
            .map(CostSummary::from_json)
            .transpose()?)
    }

    pub fn capacity_analysis(&self) -> Result<Option<CapacityAnalysis>, DataError> {
        Ok(self
            .capacity_analysis
            .clone()
            .map(CapacityAnalysis::from_json)
            .transpose()?)
    }

    /// Stored cost model config, re-validated on load
    pub fn cost_model_config(&self) -> Result<Option<CostModelConfig>, DataError> {
        Ok(self
            .cost_model_config
            .clone()
            .map(CostModelConfig::from_json)
            .transpose()?)
    }

    /// Write `summary.json` into `dir`
    pub fn write(&self, dir: impl AsRef<Path>) -> Result<PathBuf, DataError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let path = dir.join(SUMMARY_FILE);
        fs::write(&path, serde_json::to_string_pretty(self)?)?;
        tracing::info!(path = ?path, run_id = %self.run_id, "Wrote run summary");
        Ok(path)
    }

    pub fn read(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}
