// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Registry of collectd value-list types, loaded from a `types.db(5)` file.
//!
//! Each line names a type followed by its data sources:
//!
//! ```text
//! load    shortterm:GAUGE:0:5000, midterm:GAUGE:0:5000, longterm:GAUGE:0:5000
//! ```
//!
//! The order of the data sources matters: it lines up positionally with the
//! values array of every sample of that type.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use tracing::{debug, warn};

use crate::errors::SchemaLoadError;
use crate::PLUGIN_NAME;

/// How a data source's values should be read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DataSourceKind {
    Gauge,
    Counter,
    Derive,
    /// Anything else (`ABSOLUTE`, ...). Values of these kinds are never forwarded.
    Other(String),
}

impl DataSourceKind {
    pub fn parse(kind: &str) -> Self {
        if kind.eq_ignore_ascii_case("GAUGE") {
            Self::Gauge
        } else if kind.eq_ignore_ascii_case("COUNTER") {
            Self::Counter
        } else if kind.eq_ignore_ascii_case("DERIVE") {
            Self::Derive
        } else {
            Self::Other(kind.to_string())
        }
    }

    /// Whether values of this kind are forwarded at all.
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl fmt::Display for DataSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gauge => f.write_str("GAUGE"),
            Self::Counter => f.write_str("COUNTER"),
            Self::Derive => f.write_str("DERIVE"),
            Self::Other(kind) => f.write_str(kind),
        }
    }
}

/// One named component of a multi-value type.
#[derive(Clone, Debug, PartialEq)]
pub struct DataSource {
    pub name: String,
    pub kind: DataSourceKind,
    /// `None` when the bound is `U` (unbounded).
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl DataSource {
    /// Parses a `name:kind:min:max` token. Returns `None` if the token is malformed.
    fn parse(token: &str) -> Option<Self> {
        let fields: Vec<&str> = token.split(':').collect();
        let [name, kind, min, max] = fields.as_slice() else {
            return None;
        };
        if name.is_empty() {
            return None;
        }
        Some(Self {
            name: (*name).to_string(),
            kind: DataSourceKind::parse(kind),
            min: parse_bound(min)?,
            max: parse_bound(max)?,
        })
    }
}

fn parse_bound(bound: &str) -> Option<Option<f64>> {
    if bound == "U" {
        return Some(None);
    }
    bound.parse::<f64>().ok().map(Some)
}

/// Type name to ordered data sources. Built once at startup and read-only afterwards.
#[derive(Clone, Debug, Default)]
pub struct TypesDb {
    types: HashMap<String, Vec<DataSource>>,
}

impl TypesDb {
    /// Reads and parses the file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SchemaLoadError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| SchemaLoadError {
            path: path.to_path_buf(),
            source,
        })?;
        let types_db = Self::parse(&contents);
        debug!(
            "Loaded {} types from {}",
            types_db.types.len(),
            path.display()
        );
        Ok(types_db)
    }

    /// Parses types.db contents. Malformed data sources are logged and
    /// dropped; the rest of their line is kept.
    pub fn parse(contents: &str) -> Self {
        let mut types = HashMap::new();
        for line in contents.lines() {
            let mut fields = line.split_whitespace();
            let (Some(type_name), Some(first)) = (fields.next(), fields.next()) else {
                continue;
            };
            if type_name.starts_with('#') {
                continue;
            }

            let mut data_sources = Vec::new();
            let tokens = std::iter::once(first)
                .chain(fields)
                .flat_map(|field| field.split(','))
                .filter(|token| !token.is_empty());
            for token in tokens {
                match DataSource::parse(token) {
                    Some(data_source) => data_sources.push(data_source),
                    None => warn!(
                        "{PLUGIN_NAME}: cannot parse data source {token} on type {type_name}"
                    ),
                }
            }
            types.insert(type_name.to_string(), data_sources);
        }
        Self { types }
    }

    pub fn get(&self, type_name: &str) -> Option<&[DataSource]> {
        self.types.get(type_name).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
