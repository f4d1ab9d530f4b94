use std::path::Path;
use std::time::Duration;
use serde::Deserialize;
use anyhow::{bail, Context, Result};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackerConfig {
    /// Pause between the end of one resolution cycle and the start of the next
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
    /// Upper bound on a single resolution; unset means wait as long as the resolver does
    #[serde(default)]
    pub resolve_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_report_interval")]
    pub interval_secs: u64,
}

fn default_interval() -> u64 {
    10
}

fn default_report_interval() -> u64 {
    30
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            resolve_timeout_secs: None,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_report_interval(),
        }
    }
}

impl TrackerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn resolve_timeout(&self) -> Option<Duration> {
        self.resolve_timeout_secs.map(Duration::from_secs)
    }
}

impl ReportConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.tracker.interval_secs == 0 {
            bail!("tracker.interval_secs must be greater than zero");
        }
        if self.tracker.resolve_timeout_secs == Some(0) {
            bail!("tracker.resolve_timeout_secs must be greater than zero");
        }
        if self.report.interval_secs == 0 {
            bail!("report.interval_secs must be greater than zero");
        }
        Ok(())
    }
}
