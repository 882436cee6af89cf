// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Metric name construction and filtering.

use regex::Regex;

use crate::config::Config;
use crate::value_list::Sample;

/// Sanitizes a plugin or type instance into metric name components.
///
/// Surrounding whitespace is trimmed, inner spaces become underscores,
/// parentheses are dropped and the result is split on periods.
///
/// # Examples
///
/// ```
/// use collectd_sensu::naming::sanitize_field;
///
/// assert_eq!(sanitize_field("foo (bar).baz"), vec!["foo_bar", "baz"]);
/// assert_eq!(sanitize_field(" eth0 "), vec!["eth0"]);
/// ```
pub fn sanitize_field(field: &str) -> Vec<String> {
    let cleaned: String = field
        .trim()
        .chars()
        .filter(|ch| *ch != '(' && *ch != ')')
        .map(|ch| if ch == ' ' { '_' } else { ch })
        .collect();
    cleaned.split('.').map(str::to_string).collect()
}

/// Returns true when `name` should be forwarded: either no patterns are
/// configured or at least one matches from the start of the name.
pub fn matches_filter(name: &str, patterns: &[Regex]) -> bool {
    patterns.is_empty() || patterns.iter().any(|pattern| pattern.is_match(name))
}

/// Builds the names of every value in one sample.
///
/// The components shared by all values are computed once:
/// `prefix`, `plugin`, plugin instance parts, `type`, type instance parts.
/// The data source name is appended when the sample carries more than one
/// value or when single value names are requested.
pub struct MetricNameBuilder<'a> {
    components: Vec<String>,
    separator: &'a str,
    lower_case: bool,
    append_data_source: bool,
}

impl<'a> MetricNameBuilder<'a> {
    pub fn new(config: &'a Config, sample: &Sample) -> Self {
        let mut components = Vec::with_capacity(6);
        if !config.metric_prefix.is_empty() {
            components.push(config.metric_prefix.clone());
        }
        components.push(sample.plugin.clone());
        if let Some(plugin_instance) = non_empty(sample.plugin_instance.as_deref()) {
            components.extend(sanitize_field(plugin_instance));
        }
        components.push(sample.type_name.clone());
        if let Some(type_instance) = non_empty(sample.type_instance.as_deref()) {
            components.extend(sanitize_field(type_instance));
        }

        Self {
            components,
            separator: &config.metric_separator,
            lower_case: config.lower_case,
            append_data_source: sample.values.len() > 1 || config.single_value_names,
        }
    }

    pub fn build(&self, data_source: &str) -> String {
        let mut name = self.components.join(self.separator);
        if self.append_data_source {
            name.push_str(self.separator);
            name.push_str(data_source);
        }
        if self.lower_case {
            name = name.to_lowercase();
        }
        name
    }
}

fn non_empty(field: Option<&str>) -> Option<&str> {
    field.filter(|f| !f.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn config(prefix: &str) -> Config {
        Config {
            metric_prefix: prefix.to_string(),
            ..Config::default()
        }
    }

    fn sample(values: Vec<Option<f64>>) -> Sample {
        Sample {
            type_name: "load".to_string(),
            plugin: "cpu".to_string(),
            plugin_instance: None,
            type_instance: None,
            host: "host1".to_string(),
            time: 1000,
            values,
        }
    }

    #[test]
    fn test_sanitize_field() {
        assert_eq!(sanitize_field("foo (bar).baz"), vec!["foo_bar", "baz"]);
        assert_eq!(sanitize_field("  sda1  "), vec!["sda1"]);
        assert_eq!(sanitize_field("a b c"), vec!["a_b_c"]);
        assert_eq!(sanitize_field("1.2.3"), vec!["1", "2", "3"]);
    }

    #[test]
    fn test_single_value_name() {
        let config = config("host1");
        let sample = sample(vec![Some(1.0)]);
        let builder = MetricNameBuilder::new(&config, &sample);
        assert_eq!(builder.build("value"), "host1.cpu.load");
    }

    #[test]
    fn test_multi_value_name_appends_data_source() {
        let config = config("host1");
        let sample = sample(vec![Some(1.0), Some(2.0)]);
        let builder = MetricNameBuilder::new(&config, &sample);
        assert_eq!(builder.build("user"), "host1.cpu.load.user");
    }

    #[test]
    fn test_single_value_names_option() {
        let config = Config {
            single_value_names: true,
            ..config("host1")
        };
        let sample = sample(vec![Some(1.0)]);
        let builder = MetricNameBuilder::new(&config, &sample);
        assert_eq!(builder.build("value"), "host1.cpu.load.value");
    }

    #[test]
    fn test_empty_prefix_is_skipped() {
        let config = config("");
        let sample = sample(vec![Some(1.0)]);
        assert_eq!(MetricNameBuilder::new(&config, &sample).build("v"), "cpu.load");
    }

    #[test]
    fn test_instances_are_sanitized() {
        let config = Config {
            metric_separator: "/".to_string(),
            ..config("h")
        };
        let mut sample = sample(vec![Some(1.0)]);
        sample.plugin_instance = Some("foo (bar).baz".to_string());
        sample.type_instance = Some("idle time".to_string());
        assert_eq!(
            MetricNameBuilder::new(&config, &sample).build("v"),
            "h/cpu/foo_bar/baz/load/idle_time"
        );
    }

    #[test]
    fn test_lower_case_applies_to_whole_name() {
        let config = Config {
            lower_case: true,
            ..config("Web01")
        };
        let mut sample = sample(vec![Some(1.0), Some(2.0)]);
        sample.type_instance = Some("Total".to_string());
        assert_eq!(
            MetricNameBuilder::new(&config, &sample).build("RX"),
            "web01.cpu.load.total.rx"
        );
    }

    #[test]
    fn test_matches_filter() {
        let patterns = vec![
            Regex::new("^(?:h\\.cpu)").unwrap(),
            Regex::new("^(?:h\\.memory)").unwrap(),
        ];
        assert!(matches_filter("h.cpu.load", &patterns));
        assert!(matches_filter("h.memory.used", &patterns));
        assert!(!matches_filter("h.disk.io", &patterns));
        assert!(matches_filter("anything", &[]));
    }

    proptest! {
        #[test]
        fn sanitized_tokens_are_clean(field in "[a-z ().]{0,32}") {
            for token in sanitize_field(&field) {
                prop_assert!(!token.contains('.'));
                prop_assert!(!token.contains('('));
                prop_assert!(!token.contains(')'));
                prop_assert!(!token.contains(' '));
            }
        }

        #[test]
        fn sanitize_yields_one_token_per_period(field in "[a-z_]{1,8}(\\.[a-z_]{1,8}){0,4}") {
            let periods = field.matches('.').count();
            prop_assert_eq!(sanitize_field(&field).len(), periods + 1);
        }
    }
}
