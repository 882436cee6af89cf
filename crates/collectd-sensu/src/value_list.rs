// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Interpretation of collectd value lists into Sensu measurement lines.
//!
//! A value list is matched against its type in the [`TypesDb`], then every
//! value is checked against its data source kind. Values that survive are
//! named, filtered and formatted as `name\tvalue\ttimestamp`.

use tracing::{trace, warn};

use crate::config::Config;
use crate::naming::{matches_filter, MetricNameBuilder};
use crate::types_db::{DataSourceKind, TypesDb};
use crate::PLUGIN_NAME;

/// One value list handed to the write callback by the host agent.
#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    pub type_name: String,
    pub plugin: String,
    pub plugin_instance: Option<String>,
    pub type_instance: Option<String>,
    pub host: String,
    /// Epoch seconds.
    pub time: i64,
    /// Positional values; `None` marks an absent value.
    pub values: Vec<Option<f64>>,
}

/// A formatted `name\tvalue\ttimestamp` line ready for delivery.
pub type MeasurementLine = String;

/// Turns one sample into zero or more measurement lines.
///
/// Unknown types and value count mismatches are warned about and yield
/// nothing. Individual values are skipped silently when their data source
/// kind is unsupported, when they are absent or not a number, or when a
/// counter or derive value is negative.
pub fn interpret(sample: &Sample, types_db: &TypesDb, config: &Config) -> Vec<MeasurementLine> {
    let Some(data_sources) = types_db.get(&sample.type_name) else {
        warn!(
            "{PLUGIN_NAME}: do not know how to handle type {}. do you have all your types.db files configured?",
            sample.type_name
        );
        return Vec::new();
    };

    if data_sources.len() != sample.values.len() {
        warn!(
            "{PLUGIN_NAME}: differing number of values for type {}",
            sample.type_name
        );
        return Vec::new();
    }

    let names = MetricNameBuilder::new(config, sample);
    let timestamp = effective_time(sample.time, config.floor_time_secs);

    sample
        .values
        .iter()
        .zip(data_sources)
        .filter_map(|(value, data_source)| {
            if !data_source.kind.is_supported() {
                return None;
            }
            let value = (*value)?;
            if !value.is_finite() {
                return None;
            }
            if data_source.kind != DataSourceKind::Gauge && value < 0.0 {
                trace!(
                    "Skipping negative {} value for {}",
                    data_source.kind,
                    data_source.name
                );
                return None;
            }

            let name = names.build(&data_source.name);
            if !matches_filter(&name, &config.include_regex) {
                return None;
            }
            Some(format_measurement(&name, value, timestamp))
        })
        .collect()
}

/// Floors `time` to a multiple of `floor_secs` when flooring is configured.
pub fn effective_time(time: i64, floor_secs: Option<u64>) -> i64 {
    match floor_secs.and_then(|secs| i64::try_from(secs).ok()) {
        Some(secs) if secs > 0 => time.div_euclid(secs) * secs,
        _ => time,
    }
}

/// Values are written as integers, truncated toward zero.
#[allow(clippy::cast_possible_truncation)]
fn format_measurement(name: &str, value: f64, timestamp: i64) -> MeasurementLine {
    format!("{}\t{}\t{}", name, value.trunc() as i64, timestamp)
}
