//! Configuration management for the epubcfi tool

use std::env;
use thiserror::Error;

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub output: OutputFormat,
    /// Emit `epubcfi(...)` rather than bare paths
    pub wrap: bool,
    /// Fallback tracing filter when `RUST_LOG` is unset
    pub log_filter: String,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },
}

impl Default for Config {
    fn default() -> Self {
        Config {
            output: OutputFormat::Text,
            wrap: true,
            log_filter: "epubcfi=info".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key lookup, falling back to defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Config::default();

        let output = match lookup("EPUBCFI_OUTPUT") {
            None => defaults.output,
            Some(value) => match value.to_ascii_lowercase().as_str() {
                "text" => OutputFormat::Text,
                "json" => OutputFormat::Json,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        var: "EPUBCFI_OUTPUT",
                        value,
                    })
                }
            },
        };

        let wrap = match lookup("EPUBCFI_WRAP") {
            None => defaults.wrap,
            Some(value) => match value.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        var: "EPUBCFI_WRAP",
                        value,
                    })
                }
            },
        };

        Ok(Config {
            output,
            wrap,
            log_filter: lookup("EPUBCFI_LOG").unwrap_or(defaults.log_filter),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_reads_values() {
        let config = Config::from_lookup(lookup(&[
            ("EPUBCFI_OUTPUT", "JSON"),
            ("EPUBCFI_WRAP", "0"),
            ("EPUBCFI_LOG", "epubcfi=trace"),
        ]))
        .unwrap();

        assert_eq!(config.output, OutputFormat::Json);
        assert!(!config.wrap);
        assert_eq!(config.log_filter, "epubcfi=trace");
    }

    #[test]
    fn test_rejects_bad_values() {
        let err = Config::from_lookup(lookup(&[("EPUBCFI_OUTPUT", "yaml")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                var: "EPUBCFI_OUTPUT",
                value: "yaml".to_string()
            }
        );

        assert!(Config::from_lookup(lookup(&[("EPUBCFI_WRAP", "maybe")])).is_err());
    }
}
