//! Layered settings: built-in defaults, an optional TOML file, then
//! `TAGWATCH_*` environment variables.
//!
//! ```toml
//! endpoint = "http://localhost:7410/api"
//! interval = "500ms"
//! stale_timeout = "5s"
//! tags = ["1", "2"]
//!
//! [[rules]]
//! tag = "2"
//! condition = "gt"
//! threshold = 40
//! message = "Level high"
//!
//! [[groups]]
//! name = "Sensors"
//! tags = ["1"]
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use tagwatch_adapters::factoryio::DEFAULT_ENDPOINT;
use tagwatch_types::{AlertRule, Comparison, MAX_HISTORY};

use crate::data::parse_duration;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "TAGWATCH";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    /// Factory I/O Web API base URL.
    pub endpoint: String,

    /// Read tags from this JSON file instead of the Web API.
    #[serde(default)]
    pub catalog_file: Option<PathBuf>,

    pub interval: String,
    pub stale_timeout: String,
    pub max_history: usize,

    /// Initial selection.
    #[serde(default)]
    pub tags: Vec<String>,

    /// Name of a configured group to select when `tags` is empty.
    #[serde(default)]
    pub group: Option<String>,

    #[serde(default)]
    pub rules: Vec<RuleConfig>,

    #[serde(default)]
    pub groups: Vec<GroupConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RuleConfig {
    pub tag: String,
    /// `gt`, `lt` or `eq` (or the long forms).
    pub condition: String,
    pub threshold: f64,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GroupConfig {
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl RuleConfig {
    pub fn to_rule(&self) -> Result<AlertRule> {
        let comparison: Comparison = self
            .condition
            .parse()
            .map_err(|e| anyhow!("rule for tag {}: {e}", self.tag))?;
        Ok(AlertRule::new(
            self.tag.clone(),
            comparison,
            self.threshold,
            self.message.clone(),
        ))
    }
}

impl Settings {
    /// Load settings from an optional file and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_from(path, environment())
    }

    fn load_from(path: Option<&Path>, env: Environment) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("endpoint", DEFAULT_ENDPOINT)?
            .set_default("interval", "1s")?
            .set_default("stale_timeout", "5s")?
            .set_default("max_history", MAX_HISTORY as i64)?;

        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        let config = builder
            .add_source(env)
            .build()
            .context("Failed to load configuration")?;

        config
            .try_deserialize()
            .context("Invalid configuration")
    }

    /// Poll interval. Must be non-zero.
    pub fn interval(&self) -> Result<Duration> {
        positive_duration("interval", &self.interval)
    }

    /// Time without fresh samples before the system counts as paused. Must be non-zero.
    pub fn stale_timeout(&self) -> Result<Duration> {
        positive_duration("stale_timeout", &self.stale_timeout)
    }

    /// Configured rules, in file order.
    pub fn alert_rules(&self) -> Result<Vec<AlertRule>> {
        self.rules.iter().map(RuleConfig::to_rule).collect()
    }
}

fn positive_duration(key: &str, value: &str) -> Result<Duration> {
    let duration = parse_duration(value).with_context(|| format!("Invalid {key}"))?;
    if duration.is_zero() {
        bail!("Invalid {key}: must be greater than zero, got {value:?}");
    }
    Ok(duration)
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("tags")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn no_env() -> Environment {
        environment().source(Some(config::Map::new()))
    }

    fn env(pairs: &[(&str, &str)]) -> Environment {
        let map = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        environment().source(Some(map))
    }

    #[test]
    fn defaults_without_file() {
        let settings = Settings::load_from(None, no_env()).unwrap();
        assert_eq!(settings.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(settings.interval().unwrap(), Duration::from_secs(1));
        assert_eq!(settings.stale_timeout().unwrap(), Duration::from_secs(5));
        assert_eq!(settings.max_history, MAX_HISTORY);
        assert!(settings.tags.is_empty());
        assert!(settings.rules.is_empty());
    }

    #[test]
    fn file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
interval = "500ms"
tags = ["a", "b"]

[[rules]]
tag = "a"
condition = "gt"
threshold = 40
message = "high"

[[groups]]
name = "Line 1"
tags = ["a"]
"#
        )
        .unwrap();

        let settings = Settings::load_from(Some(file.path()), no_env()).unwrap();
        assert_eq!(settings.interval().unwrap(), Duration::from_millis(500));
        assert_eq!(settings.tags, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(settings.groups[0].name, "Line 1");

        let rules = settings.alert_rules().unwrap();
        assert_eq!(rules, vec![AlertRule::greater_than("a", 40.0, "high")]);
    }

    #[test]
    fn environment_overrides_defaults() {
        let settings = Settings::load_from(
            None,
            env(&[
                ("TAGWATCH_ENDPOINT", "http://plc:7410/api"),
                ("TAGWATCH_MAX_HISTORY", "250"),
                ("TAGWATCH_TAGS", "x,y"),
            ]),
        )
        .unwrap();

        assert_eq!(settings.endpoint, "http://plc:7410/api");
        assert_eq!(settings.max_history, 250);
        assert_eq!(settings.tags, vec!["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn zero_durations_are_rejected() {
        let mut settings = Settings::load_from(None, no_env()).unwrap();
        settings.interval = "0ms".into();
        settings.stale_timeout = "0".into();

        let err = settings.interval().unwrap_err();
        assert!(err.to_string().contains("greater than zero"));
        assert!(settings.stale_timeout().is_err());

        settings.interval = "1ms".into();
        assert_eq!(settings.interval().unwrap(), Duration::from_millis(1));
    }

    #[test]
    fn bad_condition_is_an_error() {
        let rule = RuleConfig {
            tag: "a".into(),
            condition: "approximately".into(),
            threshold: 1.0,
            message: "m".into(),
        };
        let err = rule.to_rule().unwrap_err();
        assert!(err.to_string().contains("unknown comparison"));
    }
}
