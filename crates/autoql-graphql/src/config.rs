//! Schema generation configuration.
//!
//! Configuration can be loaded from TOML, e.g. the `[schema]` section of an
//! application config file.
//!
//! # Example Configuration
//!
//! ```toml
//! query_type_name = "Query"
//! mutation_type_name = "Mutation"
//! input_suffix = "Input"
//! max_depth = 15
//! max_complexity = 500
//! introspection = true
//! date_format = "epoch_millis"
//! ```

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

/// How date and date-time values are exposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateFormat {
    /// Milliseconds since the Unix epoch, as the `Long` scalar.
    #[default]
    EpochMillis,
    /// ISO-8601 strings.
    Iso8601,
}

/// Schema generation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaConfig {
    /// Name of the root query type.
    /// Default: "Query"
    #[serde(default = "default_query_type_name")]
    pub query_type_name: String,

    /// Name of the root mutation type.
    /// Default: "Mutation"
    #[serde(default = "default_mutation_type_name")]
    pub mutation_type_name: String,

    /// Suffix appended to derived input object names.
    /// Default: "Input"
    #[serde(default = "default_input_suffix")]
    pub input_suffix: String,

    /// Maximum query depth allowed.
    /// Default: 15
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Maximum query complexity allowed.
    /// Default: 500
    #[serde(default = "default_max_complexity")]
    pub max_complexity: usize,

    /// Enable introspection queries.
    /// Default: true
    #[serde(default = "default_introspection")]
    pub introspection: bool,

    /// Representation of `Date`/`DateTime` values.
    /// Default: epoch_millis
    #[serde(default)]
    pub date_format: DateFormat,
}

fn default_query_type_name() -> String {
    "Query".to_string()
}

fn default_mutation_type_name() -> String {
    "Mutation".to_string()
}

fn default_input_suffix() -> String {
    "Input".to_string()
}

fn default_max_depth() -> usize {
    15
}

fn default_max_complexity() -> usize {
    500
}

fn default_introspection() -> bool {
    true
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            query_type_name: default_query_type_name(),
            mutation_type_name: default_mutation_type_name(),
            input_suffix: default_input_suffix(),
            max_depth: default_max_depth(),
            max_complexity: default_max_complexity(),
            introspection: default_introspection(),
            date_format: DateFormat::default(),
        }
    }
}

impl SchemaConfig {
    /// Parses a configuration from TOML and validates it.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::InvalidConfig` if the document cannot be parsed
    /// or fails validation.
    pub fn from_toml(document: &str) -> Result<Self, SchemaError> {
        let config: Self =
            toml::from_str(document).map_err(|e| SchemaError::InvalidConfig(e.to_string()))?;
        config.validate().map_err(SchemaError::InvalidConfig)?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration values are invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_depth == 0 {
            return Err("schema.max_depth must be > 0".into());
        }
        if self.max_complexity == 0 {
            return Err("schema.max_complexity must be > 0".into());
        }
        if self.query_type_name.is_empty() {
            return Err("schema.query_type_name must not be empty".into());
        }
        if self.mutation_type_name.is_empty() {
            return Err("schema.mutation_type_name must not be empty".into());
        }
        if self.query_type_name == self.mutation_type_name {
            return Err("schema.query_type_name and schema.mutation_type_name must differ".into());
        }
        if self.input_suffix.is_empty() {
            return Err("schema.input_suffix must not be empty".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SchemaConfig::default();
        assert_eq!(config.query_type_name, "Query");
        assert_eq!(config.mutation_type_name, "Mutation");
        assert_eq!(config.input_suffix, "Input");
        assert_eq!(config.max_depth, 15);
        assert_eq!(config.max_complexity, 500);
        assert!(config.introspection);
        assert_eq!(config.date_format, DateFormat::EpochMillis);
    }

    #[test]
    fn test_valid_config() {
        assert!(SchemaConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_limits() {
        let mut config = SchemaConfig::default();
        config.max_depth = 0;
        assert!(config.validate().is_err());

        let mut config = SchemaConfig::default();
        config.max_complexity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_root_names() {
        let mut config = SchemaConfig::default();
        config.mutation_type_name = "Query".into();
        assert!(config.validate().is_err());

        let mut config = SchemaConfig::default();
        config.query_type_name = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_input_suffix() {
        let mut config = SchemaConfig::default();
        config.input_suffix = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_from_toml() {
        let toml = r#"
            max_depth = 20
            max_complexity = 1000
            introspection = false
            date_format = "iso8601"
        "#;

        let config: SchemaConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.max_depth, 20);
        assert_eq!(config.max_complexity, 1000);
        assert!(!config.introspection);
        assert_eq!(config.date_format, DateFormat::Iso8601);
        assert_eq!(config.query_type_name, "Query");
    }

    #[test]
    fn test_from_toml_validates() {
        let err = SchemaConfig::from_toml("max_depth = 0").unwrap_err();
        assert!(matches!(err, SchemaError::InvalidConfig(_)));

        let err = SchemaConfig::from_toml("max_depth = \"deep\"").unwrap_err();
        assert!(matches!(err, SchemaError::InvalidConfig(_)));
    }
}
