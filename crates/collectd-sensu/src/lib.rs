// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! collectd write plugin that relays value lists to a Sensu client socket.
//!
//! Samples are interpreted against the collectd types database, named,
//! filtered, buffered, and shipped in batches as Sensu metric check results
//! whose output holds one `name\tvalue\ttimestamp` line per measurement.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod buffer;
pub mod config;
pub mod errors;
pub mod flusher;
pub mod hostname;
pub mod naming;
pub mod plugin;
pub mod putval;
pub mod types_db;
pub mod value_list;

/// Prefix of warnings emitted on behalf of the plugin.
pub const PLUGIN_NAME: &str = "collectd-sensu";

pub use config::{Config, ConfigItem};
pub use plugin::SensuWriter;
pub use value_list::Sample;
