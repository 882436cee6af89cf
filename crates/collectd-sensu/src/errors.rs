// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

/// Fatal problems found while resolving the plugin configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidNumber { key: &'static str, value: String },
    #[error("Invalid IncludeRegex pattern '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("Option {0} requires a value")]
    MissingValue(String),
    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// The types database could not be read. Fatal at startup.
#[derive(Debug, thiserror::Error)]
#[error("Unable to open TypesDB file: {}", .path.display())]
pub struct SchemaLoadError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Errors returned by the plugin init entry point. The host is expected to
/// disable the plugin when it sees one of these.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Schema(#[from] SchemaLoadError),
}

/// A line of plain-text collectd input that could not be turned into samples.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PutvalError {
    #[error("Not a PUTVAL command: {0}")]
    UnknownCommand(String),
    #[error("Missing identifier")]
    MissingIdentifier,
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),
    #[error("Missing values")]
    MissingValues,
    #[error("Invalid value list: {0}")]
    InvalidValues(String),
}
