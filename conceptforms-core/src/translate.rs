//! Translation between a [FormData] and a [QueryDocument].
//!
//! ## Form to query
//!
//! The form is read in two passes over its keys:
//!
//! 1. *Classify and accumulate.* Binary input keys, plain value keys and
//!    field-choice keys are collected into one accumulator per field.
//!    The value of a field-choice key is the identifier of the chosen field,
//!    never a query value.
//! 2. *Attach operators.* Operator keys are attached to the accumulators created
//!    in pass 1. An operator of a field without any value (an optional input left
//!    empty) is ignored; an operator value that is not a name is an error.
//!
//! Each accumulator then becomes one [QueryNode] (see [FieldAccumulator::into_node]
//! for the rules). A single node is the query; several nodes are wrapped in an
//! `and` branch.
//!
//! ## Query to form
//!
//! The reverse direction walks the query tree and writes the keys the builtin
//! form widgets use, so that a stored query can be edited again.

use std::collections::BTreeMap;

use tracing::debug;

use crate::config::FormsConfig;
use crate::error::Error;
use crate::form::FormData;
use crate::key::{FieldRef, FormKey, InputSlot};
use crate::parse::{is_identifier, parse_form_key};
use crate::query::{BranchType, QueryBranch, QueryDocument, QueryNode};
use crate::value::Value;

/// Values and operator collected for one field while reading a form.
#[derive(Debug, Clone, Default, PartialEq)]
struct FieldAccumulator {
    value0: Option<Value>,
    value1: Option<Value>,
    operator: Option<String>,
    resolved_field: Option<String>,
}

impl FieldAccumulator {
    /// Null marks an input that exists but holds nothing; the field is known
    /// to the form but the slot stays empty.
    fn set_input(&mut self, slot: InputSlot, value: &Value) {
        let value = if value.is_none() {
            None
        } else {
            Some(value.clone())
        };
        match slot {
            InputSlot::First => self.value0 = value,
            InputSlot::Second => self.value1 = value,
        }
    }

    /// Build the query node of the field. The first matching rule wins:
    ///
    /// | operator | value0 | value1  | node                                 |
    /// |----------|--------|---------|--------------------------------------|
    /// | yes      | -      | -       | unary (no value)                     |
    /// | yes      | yes    | yes     | binary, value `[value0, value1]`     |
    /// | yes      | scalar | -       | scalar                               |
    /// | any      | list   | any     | membership, operator defaults to `in`|
    /// | -        | scalar | -       | equality (`exact`)                   |
    ///
    /// Anything else is an error.
    fn into_node(
        self,
        field: &FieldRef,
        concept_id: &str,
        config: &FormsConfig,
    ) -> Result<QueryNode, Error> {
        let (operator, value) = match (self.operator, self.value0, self.value1) {
            (Some(operator), None, None) => (operator, None),
            (Some(operator), Some(value0), Some(value1)) => {
                (operator, Some(Value::Array(vec![value0, value1])))
            }
            (Some(operator), Some(value0), None) if !value0.is_array() => (operator, Some(value0)),
            (operator, Some(value0), value1) if value0.is_array() => {
                if let Some(value1) = value1 {
                    debug!("Field {}: second input {} ignored for a list value", field, value1);
                }
                (
                    operator.unwrap_or_else(|| config.default_membership_operator.clone()),
                    Some(value0),
                )
            }
            (None, Some(value0), None) => (config.default_equality_operator.clone(), Some(value0)),
            (operator, value0, value1) => {
                return Err(Error::unclassifiable_field(
                    field,
                    &format!(
                        "operator {}, first value {}, second value {}",
                        describe(operator.as_deref()),
                        describe(value0.map(|v| v.to_string()).as_deref()),
                        describe(value1.map(|v| v.to_string()).as_deref()),
                    ),
                )
                .with_concept(concept_id))
            }
        };

        let mut node = QueryNode {
            operator,
            id: field.encode(),
            value,
            concept_id: concept_id.to_owned(),
            id_choices: None,
        };
        match self.resolved_field {
            Some(resolved) => {
                node.id = resolved;
                node.id_choices = Some(field.ids().to_vec());
            }
            None if field.is_choice() => {
                return Err(Error::unclassifiable_field(field, "no field has been chosen")
                    .with_concept(concept_id));
            }
            None => {}
        }
        Ok(node)
    }
}

fn describe(part: Option<&str>) -> &str {
    part.unwrap_or("missing")
}

/// Translator between form data-sources and query documents.
#[derive(Debug, Clone, Default)]
pub struct Translator {
    config: FormsConfig,
}

impl Translator {
    pub fn new(config: FormsConfig) -> Self {
        Translator { config }
    }

    pub fn config(&self) -> &FormsConfig {
        &self.config
    }

    /// Build the form data-source that reproduces a query.
    pub fn form_from_query(&self, query: &QueryDocument) -> Result<FormData, Error> {
        let mut form = FormData::new();
        self.write_query(query, &mut form)?;
        Ok(form)
    }

    fn write_query(&self, query: &QueryDocument, form: &mut FormData) -> Result<(), Error> {
        match query {
            QueryDocument::Branch(branch) => {
                if branch.branch_type != BranchType::And {
                    return Err(Error::malformed_query(format!(
                        "Only 'and' branches can be edited in a form, got '{}'",
                        branch.branch_type
                    ))
                    .with_concept(&branch.concept_id));
                }
                for child in branch.children.iter() {
                    self.write_query(child, form)?;
                }
                Ok(())
            }
            QueryDocument::Condition(node) => self.write_node(node, form),
        }
    }

    fn write_node(&self, node: &QueryNode, form: &mut FormData) -> Result<(), Error> {
        if node.operator.is_empty() {
            return Err(Error::malformed_query(format!(
                "Condition on field '{}' has no operator",
                node.id
            ))
            .with_concept(&node.concept_id));
        }
        if !is_identifier(&node.concept_id) {
            return Err(Error::malformed_query(format!(
                "Condition on field '{}' has an invalid concept id '{}'",
                node.id, node.concept_id
            )));
        }
        if !is_identifier(&node.id) {
            return Err(Error::malformed_query(format!(
                "Condition has an invalid field id '{}'",
                node.id
            ))
            .with_concept(&node.concept_id));
        }

        let field = match &node.id_choices {
            Some(choices) if choices.len() > 1 => {
                if let Some(choice) = choices.iter().find(|choice| !is_identifier(choice)) {
                    return Err(Error::malformed_query(format!(
                        "Condition on field '{}' has an invalid field choice '{}'",
                        node.id, choice
                    ))
                    .with_concept(&node.concept_id));
                }
                let field = FieldRef::choices(choices.iter().cloned());
                form.set_key(&FormKey::FieldChoice(field.clone()), node.id.as_str());
                field
            }
            _ => FieldRef::single(node.id.as_str()),
        };

        let concept = node.concept_id.as_str();
        match &node.value {
            None => {
                form.set_key(&FormKey::plain(concept, &field), Value::None);
            }
            Some(Value::Array(items)) if !self.config.is_membership_operator(&node.operator) => {
                if items.len() != 2 {
                    return Err(Error::malformed_query(format!(
                        "Operator '{}' on field '{}' takes a single value or two values, got a list of {}",
                        node.operator,
                        node.id,
                        items.len()
                    ))
                    .with_concept(concept));
                }
                for (index, item) in items.iter().enumerate() {
                    if let Some(slot) = InputSlot::from_index(index) {
                        form.set_key(&FormKey::binary(concept, &field, slot), item.clone());
                    }
                }
            }
            Some(value) => {
                form.set_key(&FormKey::plain(concept, &field), value.clone());
            }
        }
        form.set_key(&FormKey::operator(concept, &field), node.operator.as_str());
        Ok(())
    }

    /// Build the query described by a form data-source.
    ///
    /// The caller is expected to run [FormData::validate] first;
    /// a form that yields no condition at all is reported as empty.
    pub fn query_from_form(&self, form: &FormData, concept_id: &str) -> Result<QueryDocument, Error> {
        let keys = form
            .iter()
            .filter_map(|(name, value)| match parse_form_key(name) {
                Ok(key) => Some((key, value)),
                Err(e) => {
                    debug!("Form entry '{}' skipped: {}", name, e);
                    None
                }
            })
            .collect::<Vec<_>>();

        let mut fields: BTreeMap<FieldRef, FieldAccumulator> = BTreeMap::new();

        // Pass 1: values and chosen fields.
        for (key, value) in keys.iter() {
            match key {
                FormKey::Binary { field, slot, .. } => {
                    fields.entry(field.clone()).or_default().set_input(*slot, value);
                }
                FormKey::Plain { field, .. } => {
                    fields
                        .entry(field.clone())
                        .or_default()
                        .set_input(InputSlot::First, value);
                }
                FormKey::FieldChoice(field) => {
                    let resolved = value.as_identifier().ok_or_else(|| {
                        Error::unclassifiable_field(
                            field,
                            &format!("chosen field {} is not a field identifier", value),
                        )
                        .with_concept(concept_id)
                    })?;
                    fields.entry(field.clone()).or_default().resolved_field = Some(resolved);
                }
                FormKey::Operator { .. } => {}
            }
        }

        // Pass 2: operators, only for fields that exist after pass 1.
        for (key, value) in keys.iter() {
            if let FormKey::Operator { field, .. } = key {
                let Some(accumulator) = fields.get_mut(field) else {
                    debug!("Operator {} of field {} has no value, ignored", value, field);
                    continue;
                };
                match value.as_text() {
                    Some(operator) if !operator.is_empty() => {
                        accumulator.operator = Some(operator.to_owned())
                    }
                    _ => {
                        return Err(Error::unclassifiable_field(
                            field,
                            &format!("operator {} is not an operator name", value),
                        )
                        .with_concept(concept_id))
                    }
                }
            }
        }

        let mut nodes = fields
            .into_iter()
            .map(|(field, accumulator)| {
                accumulator
                    .into_node(&field, concept_id, &self.config)
                    .map(QueryDocument::Condition)
            })
            .collect::<Result<Vec<_>, Error>>()?;

        match nodes.len() {
            0 => Err(Error::empty_or_missing_value(None).with_concept(concept_id)),
            1 => Ok(nodes.remove(0)),
            _ => Ok(QueryBranch::and(concept_id, nodes).into()),
        }
    }
}

/// Form data-source of a query, using the default configuration.
pub fn form_from_query(query: &QueryDocument) -> Result<FormData, Error> {
    Translator::default().form_from_query(query)
}

/// Query of a form data-source, using the default configuration.
pub fn query_from_form(form: &FormData, concept_id: &str) -> Result<QueryDocument, Error> {
    Translator::default().query_from_form(form, concept_id)
}
