// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Write plugin entry points driven by the host agent.
//!
//! The host resolves a [`Config`] through the configuration callback, calls
//! [`SensuWriter::init`] once, then calls [`SensuWriter::write`] for every
//! value list, possibly from several tasks at once. Nothing in here returns
//! an error to the write path: unusable samples and failed deliveries are
//! logged and dropped.

use tracing::{debug, info};

use crate::buffer::{FlushDecision, MeasurementBuffer};
use crate::config::{Config, ConfigItem};
use crate::errors::{ConfigError, InitError};
use crate::flusher::Flusher;
use crate::types_db::TypesDb;
use crate::value_list::{interpret, Sample};

/// Configuration callback: resolves the host's key/value children.
pub fn configure(items: &[ConfigItem]) -> Result<Config, ConfigError> {
    Config::from_items(items)
}

/// Shared state of the write plugin.
#[derive(Debug)]
pub struct SensuWriter {
    config: Config,
    types_db: TypesDb,
    buffer: MeasurementBuffer,
    flusher: Flusher,
}

impl SensuWriter {
    /// Init callback: loads the types database named by the configuration.
    pub fn init(config: Config) -> Result<Self, InitError> {
        let types_db = TypesDb::load(&config.types_db)?;
        info!(
            "Sending metrics to Sensu at {}:{} with handler {}",
            config.sensu_host, config.port, config.handler
        );
        Ok(Self::with_types_db(config, types_db))
    }

    #[must_use]
    pub fn with_types_db(config: Config, types_db: TypesDb) -> Self {
        let buffer =
            MeasurementBuffer::new(config.flush_interval_secs, config.flush_max_measurements);
        let flusher = Flusher::new(&config);
        Self {
            config,
            types_db,
            buffer,
            flusher,
        }
    }

    /// Write callback. The caller that cuts a batch also delivers it, after
    /// the buffer lock has been released.
    pub async fn write(&self, sample: &Sample) {
        let lines = interpret(sample, &self.types_db, &self.config);
        if !lines.is_empty() {
            debug!(
                "Queueing {} measurements from {}/{}",
                lines.len(),
                sample.host,
                sample.plugin
            );
        }
        if let FlushDecision::Flush(batch) = self.buffer.enqueue(lines) {
            self.flusher.flush(batch).await;
        }
    }

    /// Sends whatever is still pending, ignoring the flush thresholds.
    pub async fn shutdown(&self) {
        let batch = self.buffer.drain();
        debug!("Flushing {} pending measurements on shutdown", batch.len());
        self.flusher.flush(batch).await;
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}
