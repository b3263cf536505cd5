//! Per-plugin option handling
//!
//! Plugins receive a list of `key=value` strings. Two keys carry
//! engine-level meaning: `delay` (float seconds of courtesy delay after each
//! successful write) and `concurrency` (override of the download worker
//! limit). Malformed or missing values are logged and defaulted, never
//! fatal; unrecognized keys are retained for source-specific use.

use std::collections::HashMap;
use std::time::Duration;

use tracing::warn;

use crate::constants::options::{CONCURRENCY_KEY, DELAY_KEY};

/// Parsed plugin options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginOptions {
    delay: Duration,
    concurrency: Option<usize>,
    extra: HashMap<String, String>,
}

impl PluginOptions {
    /// Parse a list of `key=value` option strings
    ///
    /// Entries without exactly one `=` are ignored with a warning.
    pub fn parse<S: AsRef<str>>(raw: &[S]) -> Self {
        let mut map = HashMap::new();
        for option in raw {
            let option = option.as_ref();
            match option.split_once('=') {
                Some((key, value)) if !key.is_empty() => {
                    map.insert(key.to_string(), value.to_string());
                }
                _ => {
                    warn!("'{}' is not a valid option and will be ignored", option);
                }
            }
        }
        Self::from_map(map)
    }

    /// Build options from an already-split key/value map
    pub fn from_map(mut map: HashMap<String, String>) -> Self {
        let delay = match map.remove(DELAY_KEY) {
            Some(value) => {
                let parsed = value
                    .parse::<f64>()
                    .ok()
                    .and_then(|seconds| Duration::try_from_secs_f64(seconds).ok());
                match parsed {
                    Some(delay) => delay,
                    None => {
                        warn!(
                            "plugin option 'delay' is not a non-negative number, using default"
                        );
                        Duration::ZERO
                    }
                }
            }
            None => {
                warn!("plugin option 'delay' is missing, using default");
                Duration::ZERO
            }
        };

        let concurrency = match map.remove(CONCURRENCY_KEY) {
            Some(value) => match value.parse::<usize>() {
                Ok(count) if count > 0 => Some(count),
                _ => {
                    warn!("plugin option 'concurrency' is not a positive integer, using default");
                    None
                }
            },
            None => None,
        };

        Self {
            delay,
            concurrency,
            extra: map,
        }
    }

    /// Courtesy delay after each successful write
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Download concurrency override, if one was given
    pub fn concurrency(&self) -> Option<usize> {
        self.concurrency
    }

    /// Look up a source-specific option
    pub fn get(&self, key: &str) -> Option<&str> {
        self.extra.get(key).map(String::as_str)
    }
}
