// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Parser for collectd's plain-text `PUTVAL` command.
//!
//! ```text
//! PUTVAL "web01/cpu-0/cpu-idle" interval=10 1700000000:98.5
//! PUTVAL web01/load/load N:0.1:0.2:0.3
//! ```
//!
//! The identifier is `host/plugin[-plugin_instance]/type[-type_instance]`,
//! `N` stands for the current time and `U` for an absent value.

use crate::config::tokenize;
use crate::errors::PutvalError;
use crate::value_list::Sample;

/// Parses one `PUTVAL` line. Every value group on the line becomes a sample.
pub fn parse_putval(line: &str, now: i64) -> Result<Vec<Sample>, PutvalError> {
    // Quoted identifiers may contain spaces, e.g. "web01/df-my disk/df_complex-free".
    let tokens = tokenize(line);
    let mut tokens = tokens.iter().map(String::as_str);
    match tokens.next() {
        Some(command) if command.eq_ignore_ascii_case("PUTVAL") => {}
        Some(command) => return Err(PutvalError::UnknownCommand(command.to_string())),
        None => return Err(PutvalError::UnknownCommand(String::new())),
    }

    let identifier = tokens.next().ok_or(PutvalError::MissingIdentifier)?;
    let identifier = Identifier::parse(identifier)?;

    let samples = tokens
        // Options such as interval=10 carry nothing we forward.
        .filter(|token| !token.contains('='))
        .map(|group| {
            let (time, values) = parse_value_group(group, now)?;
            Ok(identifier.sample(time, values))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if samples.is_empty() {
        return Err(PutvalError::MissingValues);
    }
    Ok(samples)
}

struct Identifier<'a> {
    host: &'a str,
    plugin: &'a str,
    plugin_instance: Option<&'a str>,
    type_name: &'a str,
    type_instance: Option<&'a str>,
}

impl<'a> Identifier<'a> {
    fn parse(identifier: &'a str) -> Result<Self, PutvalError> {
        let invalid = || PutvalError::InvalidIdentifier(identifier.to_string());
        let mut parts = identifier.split('/');
        let (Some(host), Some(plugin), Some(type_name), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };

        let (plugin, plugin_instance) = split_instance(plugin);
        let (type_name, type_instance) = split_instance(type_name);
        if host.is_empty() || plugin.is_empty() || type_name.is_empty() {
            return Err(invalid());
        }

        Ok(Self {
            host,
            plugin,
            plugin_instance,
            type_name,
            type_instance,
        })
    }

    fn sample(&self, time: i64, values: Vec<Option<f64>>) -> Sample {
        Sample {
            type_name: self.type_name.to_string(),
            plugin: self.plugin.to_string(),
            plugin_instance: self.plugin_instance.map(str::to_string),
            type_instance: self.type_instance.map(str::to_string),
            host: self.host.to_string(),
            time,
            values,
        }
    }
}

fn split_instance(part: &str) -> (&str, Option<&str>) {
    match part.split_once('-') {
        Some((name, instance)) => (name, Some(instance)),
        None => (part, None),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn parse_value_group(group: &str, now: i64) -> Result<(i64, Vec<Option<f64>>), PutvalError> {
    let invalid = || PutvalError::InvalidValues(group.to_string());
    let mut fields = group.split(':');

    let time = match fields.next() {
        Some("N") => now,
        Some(time) => time
            .parse::<f64>()
            .ok()
            .filter(|t| t.is_finite())
            .ok_or_else(invalid)?
            .trunc() as i64,
        None => return Err(invalid()),
    };

    let values = fields
        .map(|value| match value {
            "U" => Ok(None),
            value => value.parse::<f64>().map(Some).map_err(|_| invalid()),
        })
        .collect::<Result<Vec<_>, _>>()?;
    if values.is_empty() {
        return Err(invalid());
    }
    Ok((time, values))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_identifier() {
        let samples =
            parse_putval(r#"PUTVAL "web01/cpu-0/cpu-idle" interval=10 1700000000.75:98.5"#, 0)
                .unwrap();
        assert_eq!(
            samples,
            vec![Sample {
                type_name: "cpu".to_string(),
                plugin: "cpu".to_string(),
                plugin_instance: Some("0".to_string()),
                type_instance: Some("idle".to_string()),
                host: "web01".to_string(),
                time: 1_700_000_000,
                values: vec![Some(98.5)],
            }]
        );
    }

    #[test]
    fn test_parse_now_and_undefined_values() {
        let samples = parse_putval("PUTVAL web01/load/load N:0.1:U:0.3", 1234).unwrap();
        assert_eq!(samples[0].time, 1234);
        assert_eq!(samples[0].values, vec![Some(0.1), None, Some(0.3)]);
        assert_eq!(samples[0].plugin_instance, None);
        assert_eq!(samples[0].type_instance, None);
    }

    #[test]
    fn test_instance_keeps_later_dashes() {
        let samples = parse_putval("PUTVAL h/disk-sda-1/disk_octets 10:1:2", 0).unwrap();
        assert_eq!(samples[0].plugin_instance.as_deref(), Some("sda-1"));
    }

    #[test]
    fn test_quoted_identifier_keeps_spaces() {
        let samples = parse_putval(r#"PUTVAL "h/df-my disk/df_complex-free" N:1"#, 5).unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].host, "h");
        assert_eq!(samples[0].plugin, "df");
        assert_eq!(samples[0].plugin_instance.as_deref(), Some("my disk"));
        assert_eq!(samples[0].type_name, "df_complex");
        assert_eq!(samples[0].type_instance.as_deref(), Some("free"));
        assert_eq!(samples[0].time, 5);
        assert_eq!(samples[0].values, vec![Some(1.0)]);
    }

    #[test]
    fn test_multiple_value_groups() {
        let samples = parse_putval("PUTVAL h/load/load 10:1:2:3 20:4:5:6", 0).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[1].time, 20);
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            parse_putval("GETVAL h/load/load", 0).unwrap_err(),
            PutvalError::UnknownCommand("GETVAL".to_string())
        );
        assert_eq!(
            parse_putval("PUTVAL", 0).unwrap_err(),
            PutvalError::MissingIdentifier
        );
        assert!(matches!(
            parse_putval("PUTVAL h/load 10:1", 0).unwrap_err(),
            PutvalError::InvalidIdentifier(_)
        ));
        assert_eq!(
            parse_putval("PUTVAL h/load/load interval=10", 0).unwrap_err(),
            PutvalError::MissingValues
        );
        assert!(matches!(
            parse_putval("PUTVAL h/load/load 10:abc", 0).unwrap_err(),
            PutvalError::InvalidValues(_)
        ));
        assert!(matches!(
            parse_putval("PUTVAL h/load/load 10", 0).unwrap_err(),
            PutvalError::InvalidValues(_)
        ));
    }
}
