// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::{env, process::ExitCode, sync::Arc};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    task::JoinSet,
};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use collectd_sensu::{
    buffer::now, plugin::configure, putval::parse_putval, ConfigItem, SensuWriter,
};

const CONFIG_PATH_ENV: &str = "COLLECTD_SENSU_CONFIG";
const LOG_LEVEL_ENV: &str = "COLLECTD_SENSU_LOG_LEVEL";

#[tokio::main]
pub async fn main() -> ExitCode {
    let log_level = env::var(LOG_LEVEL_ENV)
        .map(|val| val.to_lowercase())
        .unwrap_or("info".to_string());

    let env_filter = match EnvFilter::try_new(&log_level) {
        Ok(filter) => filter,
        Err(e) => {
            eprintln!("could not parse log level {log_level}: {e}");
            return ExitCode::FAILURE;
        }
    };
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_level(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true)
        .without_time()
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("setting default subscriber failed: {e}");
        return ExitCode::FAILURE;
    }

    debug!("Logging subsystem enabled");

    let items = match load_config_items() {
        Ok(items) => items,
        Err(e) => {
            error!("Unable to read plugin configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let writer = match configure(&items).map_err(Into::into).and_then(SensuWriter::init) {
        Ok(writer) => Arc::new(writer),
        Err(e) => {
            error!("Error initializing collectd-sensu: {e}");
            return ExitCode::FAILURE;
        }
    };

    relay_stdin(Arc::clone(&writer)).await;

    info!("Input closed, flushing {} pending measurements", writer.pending());
    writer.shutdown().await;
    ExitCode::SUCCESS
}

/// Reads the `<Plugin>` block named by the first argument or `COLLECTD_SENSU_CONFIG`.
/// Without either, the defaults apply.
fn load_config_items() -> std::io::Result<Vec<ConfigItem>> {
    let Some(path) = env::args().nth(1).or_else(|| env::var(CONFIG_PATH_ENV).ok()) else {
        return Ok(Vec::new());
    };
    let block = std::fs::read_to_string(path)?;
    Ok(ConfigItem::parse_block(&block))
}

/// Feeds every PUTVAL line on stdin to the writer until EOF or Ctrl-C.
/// Each sample is written from its own task, like concurrent collectd write threads.
async fn relay_stdin(writer: Arc<SensuWriter>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut tasks = JoinSet::new();
    let interrupted = tokio::signal::ctrl_c();
    tokio::pin!(interrupted);

    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if line.is_empty() || line.starts_with('#') {
                        continue;
                    }
                    match parse_putval(line, now()) {
                        Ok(samples) => {
                            let writer = Arc::clone(&writer);
                            tasks.spawn(async move {
                                for sample in &samples {
                                    writer.write(sample).await;
                                }
                            });
                        }
                        Err(e) => warn!("Skipping input line {line:?}: {e}"),
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    error!("Failed to read stdin: {e}");
                    break;
                }
            },
            Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            _ = &mut interrupted => {
                info!("Interrupted, shutting down");
                break;
            }
        }
    }

    while let Some(result) = tasks.join_next().await {
        if let Err(e) = result {
            error!("Write task failed: {e}");
        }
    }
}
