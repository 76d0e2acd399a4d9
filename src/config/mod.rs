//! Mediator options — switches for the built-in behaviors.
//!
//! Options can be built in code, deserialized from JSON, or loaded from
//! environment variables:
//!
//! | Variable              | Field        | Default |
//! |-----------------------|--------------|---------|
//! | `MEDIATOR_LOGGING`    | `logging`    | `true`  |
//! | `MEDIATOR_VALIDATION` | `validation` | `true`  |
//! | `MEDIATOR_CACHING`    | `caching`    | `true`  |

use std::env;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Which built-in behaviors the mediator attaches to every pipeline.
///
/// Caching additionally requires a cache store and only applies to request
/// types registered with
/// [`MediatorBuilder::cacheable_handler`](crate::MediatorBuilder::cacheable_handler).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediatorOptions {
    pub logging: bool,
    pub validation: bool,
    pub caching: bool,
}

impl Default for MediatorOptions {
    fn default() -> Self {
        Self {
            logging: true,
            validation: true,
            caching: true,
        }
    }
}

impl MediatorOptions {
    /// Options with every built-in behavior disabled; only custom behaviors run.
    pub fn bare() -> Self {
        Self {
            logging: false,
            validation: false,
            caching: false,
        }
    }

    /// Load options from `MEDIATOR_*` environment variables.
    ///
    /// Unset variables keep their default. Unparseable values are ignored with
    /// a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Parse options from a JSON document. Missing fields keep their default.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use courier::MediatorOptions;
    ///
    /// let options = MediatorOptions::from_json(r#"{ "caching": false }"#).unwrap();
    /// assert!(options.logging);
    /// assert!(!options.caching);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns the [`serde_json::Error`] when the document is malformed.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let flag = |key: &str, default: bool| match lookup(key) {
            None => default,
            Some(raw) => parse_flag(&raw).unwrap_or_else(|| {
                warn!(variable = key, value = %raw, "ignoring unparseable flag");
                default
            }),
        };

        Self {
            logging: flag("MEDIATOR_LOGGING", defaults.logging),
            validation: flag("MEDIATOR_VALIDATION", defaults.validation),
            caching: flag("MEDIATOR_CACHING", defaults.caching),
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_enable_everything() {
        let options = MediatorOptions::default();
        assert!(options.logging && options.validation && options.caching);
    }

    #[test]
    fn bare_disables_everything() {
        let options = MediatorOptions::bare();
        assert!(!options.logging && !options.validation && !options.caching);
    }

    #[test]
    fn lookup_overrides_defaults() {
        let options = MediatorOptions::from_lookup(lookup(&[
            ("MEDIATOR_LOGGING", "off"),
            ("MEDIATOR_CACHING", "0"),
        ]));
        assert!(!options.logging);
        assert!(options.validation);
        assert!(!options.caching);
    }

    #[test]
    fn unparseable_values_keep_default() {
        let options = MediatorOptions::from_lookup(lookup(&[("MEDIATOR_VALIDATION", "maybe")]));
        assert!(options.validation);
    }

    #[test]
    fn json_fills_missing_fields() {
        let options = MediatorOptions::from_json(r#"{ "logging": false }"#).unwrap();
        assert_eq!(
            options,
            MediatorOptions {
                logging: false,
                validation: true,
                caching: true,
            }
        );
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(MediatorOptions::from_json("{ logging: ").is_err());
    }
}
