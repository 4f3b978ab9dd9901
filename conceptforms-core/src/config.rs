//! Configuration of the translator and of the view layer built on top of it.
//!
//! Every field has a default, so a configuration file only needs to list what it changes.
//!
//! # Example (YAML)
//! ```yaml
//! membership_operators: ["in", "-in"]
//! default_equality_operator: exact
//! transient_notice_ms: 5000
//! ```

use crate::error::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormsConfig {
    /// Operators whose list value is a set of selections rather than a pair of inputs.
    pub membership_operators: Vec<String>,
    /// Operator of a list value submitted without an operator.
    pub default_membership_operator: String,
    /// Operator of a scalar value submitted without an operator.
    pub default_equality_operator: String,
    /// Message shown when a commit is attempted with missing values.
    pub empty_value_message: String,
    /// Message used for an invalid input reported without a message.
    pub invalid_input_message: String,
    /// How long a transient notice stays visible.
    pub transient_notice_ms: u64,
    /// Largest number of categories a choice chart is drawn as a pie.
    pub pie_chart_max_categories: usize,
}

impl Default for FormsConfig {
    fn default() -> Self {
        FormsConfig {
            membership_operators: vec!["in".to_owned(), "-in".to_owned()],
            default_membership_operator: "in".to_owned(),
            default_equality_operator: "exact".to_owned(),
            empty_value_message: "No value has been specified.".to_owned(),
            invalid_input_message:
                "This query contains invalid input, please correct any invalid fields."
                    .to_owned(),
            transient_notice_ms: 3000,
            pie_chart_max_categories: 3,
        }
    }
}

impl FormsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_membership_operator(&self, operator: &str) -> bool {
        self.membership_operators.iter().any(|op| op == operator)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, Error> {
        serde_yaml::from_str(yaml).map_err(|e| Error::parse_error("YAML configuration", e))
    }

    /// Load configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|e| Error::parse_error("JSON configuration", e))
    }

    pub fn to_yaml(&self) -> Result<String, Error> {
        serde_yaml::to_string(self).map_err(|e| Error::serialization_error("configuration to YAML", e))
    }

    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::serialization_error("configuration to JSON", e))
    }
}
