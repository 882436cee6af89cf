// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::Config;
use crate::value_list::MeasurementLine;

/// Check result envelope understood by the Sensu client socket.
#[derive(Debug, Serialize)]
pub struct SensuPayload<'a> {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub handler: &'a str,
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<&'a str>,
}

impl<'a> SensuPayload<'a> {
    pub fn new(handler: &'a str, source: Option<&'a str>, lines: &[MeasurementLine]) -> Self {
        Self {
            name: "collectd",
            kind: "metric",
            handler,
            output: lines.join("\n"),
            source,
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum ShippingError {
    #[error("failed to serialize payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("{}", with_errno(.0))]
    Connect(#[source] std::io::Error),
    #[error("{}", with_errno(.0))]
    Send(#[source] std::io::Error),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// Appends the OS error number the way the Sensu client logs it.
fn with_errno(e: &std::io::Error) -> String {
    match e.raw_os_error() {
        Some(code) => format!("{e}, Err#{code}"),
        None => e.to_string(),
    }
}

/// Ships batches of measurement lines to the Sensu client socket.
///
/// Every batch gets its own connection. Nothing is read back, and a failed
/// batch is logged and dropped.
#[derive(Clone, Debug)]
pub struct Flusher {
    host: String,
    port: u16,
    handler: String,
    source: Option<String>,
    timeout: Duration,
}

impl Flusher {
    pub fn new(config: &Config) -> Self {
        Self {
            host: config.sensu_host.clone(),
            port: config.port,
            handler: config.handler.clone(),
            source: config.source.clone(),
            timeout: config.flush_timeout,
        }
    }

    /// Sends `lines` as one check result. Never fails from the caller's point of view.
    pub async fn flush(&self, lines: Vec<MeasurementLine>) {
        if lines.is_empty() {
            return;
        }
        let count = lines.len();
        debug!("Flushing {count} measurements to {}:{}", self.host, self.port);

        match self.ship(&lines).await {
            Ok(()) => debug!("Successfully flushed {count} measurements"),
            Err(e) => warn!("Sensu Send failed: {e}"),
        }
    }

    async fn ship(&self, lines: &[MeasurementLine]) -> Result<(), ShippingError> {
        let payload = SensuPayload::new(&self.handler, self.source.as_deref(), lines);
        let body = serde_json::to_vec(&payload)?;

        let mut stream = timeout(
            self.timeout,
            TcpStream::connect((self.host.as_str(), self.port)),
        )
        .await
        .map_err(|_| ShippingError::Timeout(self.timeout))?
        .map_err(ShippingError::Connect)?;

        // The stream is dropped, and therefore closed, on every path below.
        timeout(self.timeout, async {
            stream.write_all(&body).await?;
            stream.shutdown().await?;
            Ok::<_, std::io::Error>(())
        })
        .await
        .map_err(|_| ShippingError::Timeout(self.timeout))?
        .map_err(ShippingError::Send)
    }
}
