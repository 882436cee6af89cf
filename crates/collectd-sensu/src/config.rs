// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use regex::Regex;
use tracing::warn;

use crate::errors::ConfigError;
use crate::hostname::get_hostname;
use crate::PLUGIN_NAME;

const DEFAULT_SENSU_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 3030;
const DEFAULT_HANDLER: &str = "graphite";
const DEFAULT_TYPES_DB: &str = "/usr/share/collectd/types.db";
const DEFAULT_SEPARATOR: &str = ".";
const DEFAULT_FLUSH_INTERVAL_SECS: u64 = 30;
const DEFAULT_FLUSH_MAX_MEASUREMENTS: usize = 600;
const DEFAULT_FLUSH_TIMEOUT: Duration = Duration::from_secs(15);

/// One `Key value...` child of the plugin's configuration block, as handed
/// over by the host agent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigItem {
    pub key: String,
    pub values: Vec<String>,
}

impl ConfigItem {
    pub fn new(key: &str, values: &[&str]) -> Self {
        Self {
            key: key.to_string(),
            values: values.iter().map(|v| (*v).to_string()).collect(),
        }
    }

    /// Parses the body of a collectd-style `<Plugin>` block.
    ///
    /// Block delimiters (`<...>`), blank lines and `#` comments are skipped.
    /// Values may be double-quoted to carry whitespace.
    pub fn parse_block(block: &str) -> Vec<Self> {
        block
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('<'))
            .filter_map(|line| {
                let mut tokens = tokenize(line).into_iter();
                let key = tokens.next()?;
                Some(Self {
                    key,
                    values: tokens.collect(),
                })
            })
            .collect()
    }

    fn value(&self) -> Result<&str, ConfigError> {
        self.values
            .first()
            .map(String::as_str)
            .ok_or_else(|| ConfigError::MissingValue(self.key.clone()))
    }

    fn flag(&self) -> bool {
        match self.values.first() {
            None => true,
            Some(value) => !matches!(
                value.to_ascii_lowercase().as_str(),
                "false" | "no" | "off" | "0"
            ),
        }
    }
}

/// Splits on whitespace, keeping double-quoted runs together with the quotes removed.
pub(crate) fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;
    for ch in line.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    tokens.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }
    if has_token {
        tokens.push(current);
    }
    tokens
}

/// Resolved plugin settings. Built once before any sample is processed and
/// never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    pub sensu_host: String,
    pub port: u16,
    pub handler: String,
    pub types_db: PathBuf,
    /// Leading metric name component. Skipped when empty.
    pub metric_prefix: String,
    pub metric_separator: String,
    /// Overrides the reporting source in the envelope sent to Sensu.
    pub source: Option<String>,
    pub flush_interval_secs: u64,
    pub flush_max_measurements: usize,
    /// Upper bound for connecting to and writing one batch to Sensu.
    pub flush_timeout: Duration,
    pub lower_case: bool,
    /// Append the data source name even when a sample carries a single value.
    pub single_value_names: bool,
    /// Compiled `IncludeRegex` patterns, anchored at the start of the name.
    /// Empty means every name passes.
    pub include_regex: Vec<Regex>,
    pub floor_time_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sensu_host: DEFAULT_SENSU_HOST.to_string(),
            port: DEFAULT_PORT,
            handler: DEFAULT_HANDLER.to_string(),
            types_db: PathBuf::from(DEFAULT_TYPES_DB),
            metric_prefix: get_hostname(),
            metric_separator: DEFAULT_SEPARATOR.to_string(),
            source: None,
            flush_interval_secs: DEFAULT_FLUSH_INTERVAL_SECS,
            flush_max_measurements: DEFAULT_FLUSH_MAX_MEASUREMENTS,
            flush_timeout: DEFAULT_FLUSH_TIMEOUT,
            lower_case: false,
            single_value_names: false,
            include_regex: Vec::new(),
            floor_time_secs: None,
        }
    }
}

impl Config {
    /// Applies the host's configuration children on top of the defaults.
    pub fn from_items(items: &[ConfigItem]) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        for item in items {
            config.apply(item)?;
        }
        Ok(config)
    }

    fn apply(&mut self, item: &ConfigItem) -> Result<(), ConfigError> {
        match item.key.to_ascii_lowercase().as_str() {
            "metricprefix" => self.metric_prefix = item.value()?.to_string(),
            "sensuhost" => self.sensu_host = item.value()?.to_string(),
            "handler" => self.handler = item.value()?.to_string(),
            "port" => self.port = parse_number("Port", item.value()?)?,
            "typesdb" => self.types_db = PathBuf::from(item.value()?),
            "metricseparator" => {
                let separator = item.value()?;
                if separator.is_empty() {
                    return Err(ConfigError::Invalid {
                        key: "MetricSeparator",
                        reason: "must not be empty".to_string(),
                    });
                }
                self.metric_separator = separator.to_string();
            }
            "lowercasemetricnames" => self.lower_case = item.flag(),
            "includesinglevaluenames" => self.single_value_names = item.flag(),
            "floortimesecs" => {
                let secs: u64 = parse_number("FloorTimeSecs", item.value()?)?;
                self.floor_time_secs = (secs > 0).then_some(secs);
            }
            "source" => self.source = Some(item.value()?.to_string()),
            "includeregex" => {
                self.include_regex = compile_patterns(item.values.first().map_or("", String::as_str))?;
            }
            "flushintervalsecs" => {
                self.flush_interval_secs = parse_seconds("FlushIntervalSecs", item.value()?)?;
            }
            "flushmaxmeasurements" => {
                self.flush_max_measurements = parse_number("FlushMaxMeasurements", item.value()?)?;
            }
            "flushtimeoutsecs" => {
                let secs: u64 = parse_number("FlushTimeoutSecs", item.value()?)?;
                if secs == 0 {
                    return Err(ConfigError::Invalid {
                        key: "FlushTimeoutSecs",
                        reason: "must be greater than 0".to_string(),
                    });
                }
                self.flush_timeout = Duration::from_secs(secs);
            }
            _ => warn!("{PLUGIN_NAME}: ignoring unknown config key {}", item.key),
        }
        Ok(())
    }
}

fn parse_number<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidNumber {
        key,
        value: value.to_string(),
    })
}

/// Accepts any non-negative number and truncates it to whole seconds.
fn parse_seconds(key: &'static str, value: &str) -> Result<u64, ConfigError> {
    let secs: f64 = value.trim().parse().map_err(|_| ConfigError::InvalidNumber {
        key,
        value: value.to_string(),
    })?;
    if !secs.is_finite() || secs < 0.0 {
        return Err(ConfigError::InvalidNumber {
            key,
            value: value.to_string(),
        });
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Ok(secs.trunc() as u64)
}

fn compile_patterns(value: &str) -> Result<Vec<Regex>, ConfigError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|pattern| !pattern.is_empty())
        .map(|pattern| {
            Regex::new(&format!("^(?:{pattern})")).map_err(|source| ConfigError::InvalidRegex {
                pattern: pattern.to_string(),
                source,
            })
        })
        .collect()
}
