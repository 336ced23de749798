//! Queue task payload types

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::geometry::Geometry;
use crate::validation::{normalize_refresh_before, validate_zoom_range};

/// What a sub-task asks the seeding tool to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeedMode {
    /// Populate tiles
    Seed,
    /// Purge stale tiles
    Clean,
}

impl SeedMode {
    /// Get the mode name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Seed => "seed",
            Self::Clean => "clean",
        }
    }

    /// Parse mode from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "seed" => Some(Self::Seed),
            "clean" => Some(Self::Clean),
            _ => None,
        }
    }
}

impl fmt::Display for SeedMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backing stores this worker can seed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheType {
    Redis,
}

impl CacheType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Redis => "redis",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "redis" => Some(Self::Redis),
            _ => None,
        }
    }
}

impl fmt::Display for CacheType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One seed or cleanup request inside a queue task.
///
/// `mode` stays a raw string so that an unknown value reaches the executor
/// and is rejected there instead of failing the whole payload decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedTask {
    pub mode: String,
    pub grid: String,
    pub from_zoom_level: u32,
    pub to_zoom_level: u32,
    pub geometry: Geometry,
    #[serde(default)]
    pub skip_uncached: bool,
    pub layer_id: String,
    pub refresh_before: String,
}

impl SeedTask {
    /// Parsed mode, `None` for anything but seed/clean
    pub fn seed_mode(&self) -> Option<SeedMode> {
        SeedMode::from_str(&self.mode)
    }

    /// Derive the validated form used to build the seed specification.
    ///
    /// The refresh timestamp is checked and shifted first, then the zoom
    /// order. `self` is left untouched.
    pub fn normalize(
        &self,
        mode: SeedMode,
        refresh_offset_years: u32,
    ) -> std::result::Result<NormalizedSeedTask, ValidationError> {
        let refresh_before = normalize_refresh_before(&self.refresh_before, refresh_offset_years)?;
        validate_zoom_range(self.from_zoom_level, self.to_zoom_level)?;

        Ok(NormalizedSeedTask {
            mode,
            grid: self.grid.clone(),
            from_zoom_level: self.from_zoom_level,
            to_zoom_level: self.to_zoom_level,
            geometry: self.geometry.clone(),
            skip_uncached: self.skip_uncached,
            layer_id: self.layer_id.clone(),
            refresh_before,
        })
    }
}

/// A sub-task whose mode, zoom range and refresh timestamp passed validation
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedSeedTask {
    pub mode: SeedMode,
    pub grid: String,
    pub from_zoom_level: u32,
    pub to_zoom_level: u32,
    pub geometry: Geometry,
    pub skip_uncached: bool,
    pub layer_id: String,
    /// UTC, second precision, already shifted by the configured offset
    pub refresh_before: String,
}

/// Decoded `parameters` of a queue task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskParameters {
    pub seed_tasks: Vec<SeedTask>,
    #[serde(default)]
    pub catalog_id: String,
    pub cache_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_parent_context: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span_id: Option<String>,
}

impl TaskParameters {
    /// The W3C traceparent carried with the task, if any
    pub fn traceparent(&self) -> Option<&str> {
        self.trace_parent_context
            .as_ref()?
            .get("traceparent")?
            .as_str()
    }
}

/// A task as handed out by the job manager
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueTask {
    pub id: String,
    pub job_id: String,
    #[serde(rename = "type", default)]
    pub task_type: String,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub status: Option<String>,
    /// Raw parameters, decoded on demand by [`QueueTask::decode_parameters`]
    #[serde(default)]
    pub parameters: serde_json::Value,
}

impl QueueTask {
    /// Build a task around typed parameters
    pub fn new(
        id: impl Into<String>,
        job_id: impl Into<String>,
        attempts: u32,
        parameters: &TaskParameters,
    ) -> serde_json::Result<Self> {
        Ok(Self {
            id: id.into(),
            job_id: job_id.into(),
            task_type: String::new(),
            attempts,
            status: None,
            parameters: serde_json::to_value(parameters)?,
        })
    }

    /// Decode the parameters payload
    pub fn decode_parameters(&self) -> std::result::Result<TaskParameters, ValidationError> {
        serde_json::from_value(self.parameters.clone())
            .map_err(|e| ValidationError::MalformedParameters(e.to_string()))
    }
}

/// Parent job of a task; only used for log context
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobMetadata {
    pub id: String,
    pub resource_id: Option<String>,
    pub version: Option<String>,
    #[serde(rename = "type")]
    pub job_type: Option<String>,
    pub status: Option<String>,
    pub domain: Option<String>,
    pub product_type: Option<String>,
    pub priority: Option<i64>,
}
