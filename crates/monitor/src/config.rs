//! Layered configuration: `configuration/base.yaml`, then
//! `configuration/{APP_ENVIRONMENT}.yaml`, then `DM_` environment variables
//! (`DM_INFERENCE__BASE_URL=http://10.0.0.2:5000`).

use alerting::{AlertConfig, UnknownVerdictPolicy};
use anyhow::Context;
use camera_capture::CameraConfig;
use dms::SessionConfig;
use inference_client::InferenceConfig;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct MonitorConfig {
    #[serde(default, deserialize_with = "deserialize_log_level")]
    pub log_level: LogLevel,
    #[serde(default)]
    pub log_format: LogFormat,
    #[serde(default)]
    pub inference: InferenceConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub alert: AlertSettings,
    #[serde(default)]
    pub session: SessionConfig,
}

impl MonitorConfig {
    /// Session settings with the camera's mirroring applied
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            mirror: self.camera.mirror,
            ..self.session.clone()
        }
    }
}

fn deserialize_log_level<'de, D>(deserializer: D) -> Result<LogLevel, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.try_into().map_err(serde::de::Error::custom)
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AlertSettings {
    pub unknown_policy: UnknownVerdictPolicy,
    /// Delay between two bells while the alert plays
    pub bell_interval_ms: u64,
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            unknown_policy: UnknownVerdictPolicy::default(),
            bell_interval_ms: 800,
        }
    }
}

impl AlertSettings {
    pub fn alert_config(&self) -> AlertConfig {
        AlertConfig {
            unknown_policy: self.unknown_policy,
        }
    }

    pub fn bell_interval(&self) -> Duration {
        Duration::from_millis(self.bell_interval_ms.max(1))
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`.",
                other
            )),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl TryFrom<String> for LogLevel {
    type Error = String;

    fn try_from(s: String) -> Result<Self, <Self as TryFrom<String>>::Error> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(format!(
                "{} is not a supported minimum log level. Use one of `trace`, `debug`, `info`, `warn` or `error`.",
                other
            )),
        }
    }
}

/// Load configuration from `./configuration` and the process environment
pub fn get_configuration() -> anyhow::Result<MonitorConfig> {
    let base_path = std::env::current_dir().context("Failed to determine the current directory")?;

    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(anyhow::Error::msg)
        .context("Failed to parse APP_ENVIRONMENT")?;

    load(&base_path.join("configuration"), environment, None)
}

/// Load configuration from `directory`.
///
/// `vars` replaces the process environment when given.
pub fn load(
    directory: &Path,
    environment: Environment,
    vars: Option<HashMap<String, String>>,
) -> anyhow::Result<MonitorConfig> {
    let config = config::Config::builder()
        .add_source(config::File::from(directory.join("base.yaml")))
        .add_source(
            config::File::from(directory.join(format!("{}.yaml", environment.as_str())))
                .required(false),
        )
        .add_source(
            config::Environment::with_prefix("DM")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(vars),
        )
        .build()
        .context("Failed to read configuration")?;

    config
        .try_deserialize::<MonitorConfig>()
        .context("Invalid configuration")
}
