use crate::error::ConfigurationError;
use crate::topology::validation::percentage_in_range;

pub const DEFAULT_SCHEMA_NAME: &str = "public";
pub const DEFAULT_BLOAT_PERCENTAGE_THRESHOLD: f64 = 10.0;
pub const DEFAULT_REMAINING_PERCENTAGE_THRESHOLD: f64 = 10.0;

/// Schema and thresholds a diagnostic runs with
#[derive(Debug, Clone, PartialEq)]
pub struct CheckContext {
    schema_name: String,
    bloat_percentage_threshold: f64,
    remaining_percentage_threshold: f64,
}

impl Default for CheckContext {
    fn default() -> Self {
        Self {
            schema_name: DEFAULT_SCHEMA_NAME.to_string(),
            bloat_percentage_threshold: DEFAULT_BLOAT_PERCENTAGE_THRESHOLD,
            remaining_percentage_threshold: DEFAULT_REMAINING_PERCENTAGE_THRESHOLD,
        }
    }
}

impl CheckContext {
    /// Schema name is lower-cased; thresholds must be within 0..=100
    pub fn new(
        schema_name: &str,
        bloat_percentage_threshold: f64,
        remaining_percentage_threshold: f64,
    ) -> Result<Self, ConfigurationError> {
        if schema_name.trim().is_empty() {
            return Err(ConfigurationError::BlankSchemaName);
        }
        Ok(Self {
            schema_name: schema_name.to_lowercase(),
            bloat_percentage_threshold: percentage_in_range(
                "bloat_percentage_threshold",
                bloat_percentage_threshold,
            )?,
            remaining_percentage_threshold: percentage_in_range(
                "remaining_percentage_threshold",
                remaining_percentage_threshold,
            )?,
        })
    }

    pub fn of_schema(schema_name: &str) -> Result<Self, ConfigurationError> {
        Self::new(
            schema_name,
            DEFAULT_BLOAT_PERCENTAGE_THRESHOLD,
            DEFAULT_REMAINING_PERCENTAGE_THRESHOLD,
        )
    }

    pub fn schema_name(&self) -> &str {
        &self.schema_name
    }

    pub fn bloat_percentage_threshold(&self) -> f64 {
        self.bloat_percentage_threshold
    }

    pub fn remaining_percentage_threshold(&self) -> f64 {
        self.remaining_percentage_threshold
    }

    pub fn is_default_schema(&self) -> bool {
        self.schema_name == DEFAULT_SCHEMA_NAME
    }

    /// Qualify an object name with the schema unless it is `public` or already qualified
    pub fn enrich_with_schema(&self, object_name: &str) -> String {
        if self.is_default_schema() {
            return object_name.to_string();
        }
        let prefix = format!("{}.", self.schema_name);
        if object_name.to_lowercase().starts_with(&prefix) {
            object_name.to_string()
        } else {
            prefix + object_name
        }
    }
}
