use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::data::pivot::DuplicatePolicy;

/// Environment variable naming an optional JSON config file.
pub const CONFIG_ENV: &str = "RUSTY_DASHBOARD_CONFIG";

/// Runtime settings. Every field has a default, so `{}` is a valid file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Column-name fragments that mark a column for datetime coercion.
    pub datetime_tokens: Vec<String>,
    /// chrono formats tried in order when coercing text to datetimes.
    pub datetime_formats: Vec<String>,
    /// What the pivot does when an (index, group) pair repeats.
    pub duplicate_policy: DuplicatePolicy,
    /// Rows shown in the data preview.
    pub preview_rows: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            datetime_tokens: ["日期", "时间", "date", "time"]
                .into_iter()
                .map(String::from)
                .collect(),
            datetime_formats: [
                "%Y-%m-%d %H:%M:%S",
                "%Y-%m-%dT%H:%M:%S",
                "%Y-%m-%d %H:%M",
                "%Y/%m/%d %H:%M:%S",
                "%Y/%m/%d %H:%M",
                "%Y-%m-%d",
                "%Y/%m/%d",
                "%Y.%m.%d",
                "%Y年%m月%d日",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            duplicate_policy: DuplicatePolicy::default(),
            preview_rows: 50,
        }
    }
}

impl DashboardConfig {
    /// Read a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Load from [`CONFIG_ENV`] if set; defaults otherwise or on error.
    pub fn from_env() -> Self {
        let Some(path) = std::env::var_os(CONFIG_ENV) else {
            return Self::default();
        };
        match Self::load(Path::new(&path)) {
            Ok(config) => {
                log::info!("Loaded config from {}", Path::new(&path).display());
                config
            }
            Err(e) => {
                log::warn!("Ignoring config: {e:#}");
                Self::default()
            }
        }
    }
}
