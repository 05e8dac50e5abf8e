//! Configuration of a capture stream.

use serde::Deserialize;

/// The environment variable that enables or disables reassembly.
pub const REASSEMBLE_VARIABLE: &str = "MCTP_REASSEMBLE";

/// Errors raised when reading the configuration.
#[derive(Debug, thiserror::Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    /// An environment variable holds a value that cannot be interpreted.
    #[error("invalid value {value:?} for {variable}")]
    InvalidValue {
        /// The name of the variable.
        variable: &'static str,
        /// The value that was found.
        value: String,
    },
}

/// Options controlling how captured frames are processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Reassemble fragmented messages.
    ///
    /// When disabled, fragments are reported individually and never dispatched; messages carried
    /// in a single packet are still dispatched.
    pub reassemble: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self { reassemble: true }
    }
}

impl CaptureConfig {
    /// Reads the configuration from the environment.
    ///
    /// Variables that are not set keep their default values.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to a value that cannot be interpreted.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|variable| std::env::var(variable).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(value) = lookup(REASSEMBLE_VARIABLE) {
            config.reassemble = parse_flag(REASSEMBLE_VARIABLE, value)?;
        }
        tracing::debug!(?config, "capture configuration");

        Ok(config)
    }
}

fn parse_flag(variable: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidValue { variable, value }),
    }
}

#[cfg(test)]
mod tests {
    use serde::de::value::{Error as DeError, MapDeserializer};

    use super::*;

    fn lookup(value: Option<&'static str>) -> impl Fn(&str) -> Option<String> {
        move |variable: &str| {
            assert_eq!(variable, REASSEMBLE_VARIABLE);
            value.map(String::from)
        }
    }

    #[test]
    fn reassembles_by_default() -> test_utils::Result {
        assert!(CaptureConfig::default().reassemble);
        assert_eq!(CaptureConfig::from_lookup(lookup(None))?, CaptureConfig::default());
        Ok(())
    }

    test_utils::param_test! {
        reassemble_from_environment -> test_utils::Result: [
            true_literal: ("true", true),
            one: ("1", true),
            false_uppercase: ("FALSE", false),
            zero: ("0", false)
        ]
    }
    fn reassemble_from_environment(value: &'static str, expected: bool) -> test_utils::Result {
        let config = CaptureConfig::from_lookup(lookup(Some(value)))?;
        assert_eq!(config.reassemble, expected);
        Ok(())
    }

    #[test]
    fn invalid_flag() {
        assert_eq!(
            CaptureConfig::from_lookup(lookup(Some("sometimes"))),
            Err(ConfigError::InvalidValue {
                variable: REASSEMBLE_VARIABLE,
                value: "sometimes".into()
            })
        );
    }

    #[test]
    fn deserialize_with_defaults() -> test_utils::Result {
        let empty: [(&str, bool); 0] = [];
        let config = CaptureConfig::deserialize(MapDeserializer::<_, DeError>::new(
            empty.into_iter(),
        ))?;
        assert_eq!(config, CaptureConfig::default());

        let config = CaptureConfig::deserialize(MapDeserializer::<_, DeError>::new(
            [("reassemble", false)].into_iter(),
        ))?;
        assert!(!config.reassemble);

        Ok(())
    }
}
