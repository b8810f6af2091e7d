// Configuration Management
//
// This crate handles all configuration loading for the deploy portal.
// Every setting comes from the process environment (optionally seeded from a
// `.env` file by the binary). Each section validates its own variables so a
// misconfigured deployment fails at startup rather than on the first request.

use thiserror::Error;

pub mod types;

// Re-export all configuration types
pub use types::*;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} is required but was not set")]
    Missing { var: &'static str },

    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Source of raw configuration values, keyed by variable name.
///
/// Blank values are treated the same as unset ones.
pub trait Lookup {
    fn get(&self, key: &str) -> Option<String>;
}

/// Reads from the process environment.
pub struct ProcessEnv;

impl Lookup for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl<F> Lookup for F
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        self(key)
    }
}

pub(crate) fn optional(lookup: &dyn Lookup, var: &'static str) -> Option<String> {
    lookup
        .get(var)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub(crate) fn required(lookup: &dyn Lookup, var: &'static str) -> Result<String, ConfigError> {
    optional(lookup, var).ok_or(ConfigError::Missing { var })
}

pub(crate) fn parsed_or<T>(
    lookup: &dyn Lookup,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match optional(lookup, var) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: format!("{raw:?}: {e}"),
        }),
        None => Ok(default),
    }
}
