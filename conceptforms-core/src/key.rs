//! Form keys.
//!
//! Every input widget of a builtin view stores its value in the form data-source
//! under a key that encodes the concept, the field and the role of the value:
//!
//! | key                            | variant                   |
//! |--------------------------------|---------------------------|
//! | `7_12`                         | [FormKey::Plain]          |
//! | `7_12_input0`, `7_12_input1`   | [FormKey::Binary]         |
//! | `7_12_operator`                | [FormKey::Operator]       |
//! | `3OR5`                         | [FormKey::FieldChoice]    |
//!
//! The field part may itself be a list of alternatives (`7_3OR5`), see [FieldRef].
//! Keys are parsed by [crate::parse::parse_form_key] and written back with [FormKey::encode].

use itertools::Itertools;
use std::fmt::Display;

/// Separator of alternative field identifiers in a [FieldRef].
pub const FIELD_CHOICE_SEPARATOR: &str = "OR";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub offset: usize,
    pub line: u32,
    pub column: usize,
}

impl Position {
    pub fn unknown() -> Position {
        Position {
            offset: 0,
            line: 0,
            column: 0,
        }
    }
    pub fn is_unknown(&self) -> bool {
        self.line == 0
    }
}

impl Default for Position {
    fn default() -> Self {
        Position::unknown()
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.line == 0 {
            write!(f, "(unknown position)")
        } else {
            write!(f, "position {}", self.column)
        }
    }
}

/// Field part of a form key: one numeric field identifier,
/// or several alternatives the user picks from (`3OR5`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldRef(Vec<String>);

impl FieldRef {
    /// Field reference to a single field.
    pub fn single<S: Into<String>>(id: S) -> Self {
        FieldRef(vec![id.into()])
    }

    /// Field reference to a list of alternative fields.
    /// The list is expected to be non-empty.
    pub fn choices<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldRef(ids.into_iter().map(|id| id.into()).collect())
    }

    pub fn ids(&self) -> &[String] {
        &self.0
    }

    /// True if the reference lists more than one candidate field.
    pub fn is_choice(&self) -> bool {
        self.0.len() > 1
    }

    pub fn encode(&self) -> String {
        self.0.iter().join(FIELD_CHOICE_SEPARATOR)
    }
}

impl Display for FieldRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.encode())
    }
}

/// Which of the two values of a binary (range) operator an input key holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputSlot {
    First,
    Second,
}

impl InputSlot {
    pub fn from_index(index: usize) -> Option<InputSlot> {
        match index {
            0 => Some(InputSlot::First),
            1 => Some(InputSlot::Second),
            _ => None,
        }
    }
    pub fn index(&self) -> usize {
        match self {
            InputSlot::First => 0,
            InputSlot::Second => 1,
        }
    }
}

/// Decomposed form key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FormKey {
    /// `conceptId_fieldId` - the single value of a field.
    Plain { concept: String, field: FieldRef },
    /// `conceptId_fieldId_input0|1` - one side of a binary operator.
    Binary {
        concept: String,
        field: FieldRef,
        slot: InputSlot,
    },
    /// `conceptId_fieldId_operator` - operator selected for a field.
    Operator { concept: String, field: FieldRef },
    /// `fieldIdAORfieldIdB...` - the value is the identifier of the chosen field.
    FieldChoice(FieldRef),
}

impl FormKey {
    pub fn plain(concept: &str, field: &FieldRef) -> Self {
        FormKey::Plain {
            concept: concept.to_owned(),
            field: field.clone(),
        }
    }
    pub fn binary(concept: &str, field: &FieldRef, slot: InputSlot) -> Self {
        FormKey::Binary {
            concept: concept.to_owned(),
            field: field.clone(),
            slot,
        }
    }
    pub fn operator(concept: &str, field: &FieldRef) -> Self {
        FormKey::Operator {
            concept: concept.to_owned(),
            field: field.clone(),
        }
    }

    pub fn field(&self) -> &FieldRef {
        match self {
            FormKey::Plain { field, .. } => field,
            FormKey::Binary { field, .. } => field,
            FormKey::Operator { field, .. } => field,
            FormKey::FieldChoice(field) => field,
        }
    }

    /// Concept prefix of the key; field-choice keys carry none.
    pub fn concept(&self) -> Option<&str> {
        match self {
            FormKey::Plain { concept, .. } => Some(concept),
            FormKey::Binary { concept, .. } => Some(concept),
            FormKey::Operator { concept, .. } => Some(concept),
            FormKey::FieldChoice(_) => None,
        }
    }

    pub fn is_operator(&self) -> bool {
        matches!(self, FormKey::Operator { .. })
    }

    pub fn encode(&self) -> String {
        match self {
            FormKey::Plain { concept, field } => format!("{}_{}", concept, field.encode()),
            FormKey::Binary {
                concept,
                field,
                slot,
            } => format!("{}_{}_input{}", concept, field.encode(), slot.index()),
            FormKey::Operator { concept, field } => {
                format!("{}_{}_operator", concept, field.encode())
            }
            FormKey::FieldChoice(field) => field.encode(),
        }
    }
}

impl Display for FormKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.encode())
    }
}
