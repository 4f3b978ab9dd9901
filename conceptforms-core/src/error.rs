use itertools::Itertools;

use crate::key::{FieldRef, Position};
use std::error;
use std::fmt;
use std::fmt::Display;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, Copy)]
pub enum ErrorType {
    EmptyOrMissingValue,
    UnclassifiableField,
    MalformedQuery,
    KeyParseError,
    ConceptNotRegistered,
    ViewNotFound,
    NoActiveConcept,
    NoticeNotFound,
    SerializationError,
    ParseError,
    General,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Error {
    pub error_type: ErrorType,
    pub message: String,
    pub position: Position,
    pub key: Option<String>,
    pub concept: Option<String>,
}

impl Error {
    pub fn new(error_type: ErrorType, message: String) -> Self {
        Error {
            error_type,
            message,
            position: Position::unknown(),
            key: None,
            concept: None,
        }
    }

    pub fn with_key(mut self, key: &str) -> Self {
        self.key = Some(key.to_owned());
        self
    }
    pub fn with_concept(mut self, concept_id: &str) -> Self {
        self.concept = Some(concept_id.to_owned());
        self
    }

    /// The form is empty or one of its values is null, an empty string or an empty list.
    /// Raised by the pre-flight check; the key (if any) names the offending entry.
    pub fn empty_or_missing_value(key: Option<&str>) -> Self {
        let error = Error::new(
            ErrorType::EmptyOrMissingValue,
            match key {
                Some(key) => format!("No value specified for '{}'", key),
                None => "No value has been specified".to_owned(),
            },
        );
        match key {
            Some(key) => error.with_key(key),
            None => error,
        }
    }
    pub fn is_empty_or_missing_value(&self) -> bool {
        self.error_type == ErrorType::EmptyOrMissingValue
    }

    /// Combination of values and operator of a field does not match any known query node shape.
    pub fn unclassifiable_field(field: &FieldRef, detail: &str) -> Self {
        Error::new(
            ErrorType::UnclassifiableField,
            format!("Unable to determine field '{}': {}", field, detail),
        )
        .with_key(&field.encode())
    }
    pub fn malformed_query(message: String) -> Self {
        Error::new(ErrorType::MalformedQuery, message)
    }
    pub fn key_parse_error(key: &str, err: &str, position: &Position) -> Self {
        Error {
            error_type: ErrorType::KeyParseError,
            message: format!("Can't parse form key '{}': {}", key, err),
            position: position.clone(),
            key: Some(key.to_owned()),
            concept: None,
        }
    }
    pub fn concept_not_registered(concept_id: &str) -> Self {
        Error::new(
            ErrorType::ConceptNotRegistered,
            format!("Concept '{}' is not registered", concept_id),
        )
        .with_concept(concept_id)
    }
    pub fn view_not_found(concept_id: &str, index: usize, available: &[String]) -> Self {
        Error::new(
            ErrorType::ViewNotFound,
            format!(
                "Concept '{}' has no view #{} (views: {})",
                concept_id,
                index,
                available.iter().map(|name| format!("'{}'", name)).join(", ")
            ),
        )
        .with_concept(concept_id)
    }
    pub fn no_active_concept() -> Self {
        Error::new(ErrorType::NoActiveConcept, "No concept is active".to_owned())
    }
    pub fn notice_not_found(notice_key: &str) -> Self {
        Error::new(
            ErrorType::NoticeNotFound,
            format!("No notice registered for '{}'", notice_key),
        )
        .with_key(notice_key)
    }
    pub fn serialization_error<E: Display>(what: &str, error: E) -> Self {
        Error::new(
            ErrorType::SerializationError,
            format!("Failed to serialize {}: {}", what, error),
        )
    }
    pub fn parse_error<E: Display>(what: &str, error: E) -> Self {
        Error::new(
            ErrorType::ParseError,
            format!("Failed to parse {}: {}", what, error),
        )
    }
    pub fn general_error(message: String) -> Self {
        Error::new(ErrorType::General, message)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.position.is_unknown() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{} at {}", self.message, self.position)
        }
    }
}

impl error::Error for Error {}
