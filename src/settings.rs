use crate::errors::AppResult;
use crate::tools::find_tool;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_ENV_VAR: &str = "DASHBOARD_CONFIG";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeedKind {
    Empty,
    #[default]
    Demo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    pub level: String,
    pub dir: Option<PathBuf>,
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: None,
            json: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardSettings {
    pub title: String,
    pub seed: SeedKind,
    /// Tools staged for confirmation when the caller does not pick a mode.
    pub confirm_tools: Vec<String>,
    pub logging: LoggingSettings,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            title: "Dashboard".to_string(),
            seed: SeedKind::Demo,
            confirm_tools: vec![
                "add_chart".to_string(),
                "delete_chart".to_string(),
                "pin_metric".to_string(),
            ],
            logging: LoggingSettings::default(),
        }
    }
}

impl DashboardSettings {
    /// Read settings from a YAML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "settings file not found, using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file {}", path.display()))?;
        let settings = Self::from_yaml(&raw)?;
        Ok(settings)
    }

    pub fn from_env() -> AppResult<Self> {
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) => Self::load(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }

    pub fn from_yaml(raw: &str) -> AppResult<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let mut settings: Self = serde_yaml::from_str(raw)?;
        settings.confirm_tools.retain(|name| {
            let known = find_tool(name).is_some_and(|tool| tool.mutates);
            if !known {
                tracing::warn!(tool = %name, "ignoring unknown tool in confirmTools");
            }
            known
        });
        Ok(settings)
    }

    pub fn requires_confirmation(&self, tool: &str) -> bool {
        self.confirm_tools.iter().any(|name| name == tool)
    }
}
