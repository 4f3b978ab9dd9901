//! Query documents exchanged with the query-evaluation backend.
//!
//! A document is a tree: leaves are [QueryNode] conditions on a single field,
//! inner nodes are [QueryBranch] conjunctions. The serialized form uses the
//! backend's key names (`operator`, `id`, `value`, `concept_id`, `id_choices`,
//! `type`, `children`).

use std::fmt::Display;

use serde::{Deserialize, Deserializer};

use crate::error::Error;
use crate::value::Value;

#[derive(Deserialize)]
#[serde(untagged)]
enum Identifier {
    Text(String),
    Number(i64),
}

impl From<Identifier> for String {
    fn from(id: Identifier) -> String {
        match id {
            Identifier::Text(text) => text,
            Identifier::Number(n) => n.to_string(),
        }
    }
}

/// Identifiers are opaque; the backend may send them as numbers.
pub fn deserialize_identifier<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Identifier::deserialize(deserializer)?.into())
}

pub fn deserialize_identifier_list<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Vec<String>>, D::Error> {
    let ids = Option::<Vec<Identifier>>::deserialize(deserializer)?;
    Ok(ids.map(|ids| ids.into_iter().map(String::from).collect()))
}

/// Condition on a single field.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct QueryNode {
    pub operator: String,
    /// Field identifier the condition applies to.
    #[serde(deserialize_with = "deserialize_identifier")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(deserialize_with = "deserialize_identifier")]
    pub concept_id: String,
    /// Candidate fields the user could choose from; `id` is the chosen one.
    #[serde(
        default,
        deserialize_with = "deserialize_identifier_list",
        skip_serializing_if = "Option::is_none"
    )]
    pub id_choices: Option<Vec<String>>,
}

impl QueryNode {
    pub fn new(operator: &str, id: &str, concept_id: &str) -> Self {
        QueryNode {
            operator: operator.to_owned(),
            id: id.to_owned(),
            value: None,
            concept_id: concept_id.to_owned(),
            id_choices: None,
        }
    }
    pub fn with_value<V: Into<Value>>(mut self, value: V) -> Self {
        self.value = Some(value.into());
        self
    }
    pub fn with_choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.id_choices = Some(choices.into_iter().map(|c| c.into()).collect());
        self
    }
    /// Node without a value, e.g. an "is null" test.
    pub fn is_unary(&self) -> bool {
        self.value.is_none()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BranchType {
    #[default]
    And,
    Or,
}

impl Display for BranchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BranchType::And => write!(f, "and"),
            BranchType::Or => write!(f, "or"),
        }
    }
}

/// Combination of several conditions.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct QueryBranch {
    #[serde(rename = "type")]
    pub branch_type: BranchType,
    pub children: Vec<QueryDocument>,
    #[serde(default, deserialize_with = "deserialize_identifier")]
    pub concept_id: String,
}

impl QueryBranch {
    pub fn and(concept_id: &str, children: Vec<QueryDocument>) -> Self {
        QueryBranch {
            branch_type: BranchType::And,
            children,
            concept_id: concept_id.to_owned(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum QueryDocument {
    Branch(QueryBranch),
    Condition(QueryNode),
}

impl QueryDocument {
    pub fn concept_id(&self) -> &str {
        match self {
            QueryDocument::Branch(branch) => &branch.concept_id,
            QueryDocument::Condition(node) => &node.concept_id,
        }
    }

    pub fn is_branch(&self) -> bool {
        matches!(self, QueryDocument::Branch(_))
    }

    pub fn as_node(&self) -> Option<&QueryNode> {
        match self {
            QueryDocument::Condition(node) => Some(node),
            QueryDocument::Branch(_) => None,
        }
    }

    pub fn as_branch(&self) -> Option<&QueryBranch> {
        match self {
            QueryDocument::Branch(branch) => Some(branch),
            QueryDocument::Condition(_) => None,
        }
    }

    /// All leaf conditions, depth first.
    pub fn nodes(&self) -> Vec<&QueryNode> {
        let mut nodes = Vec::new();
        self.collect_nodes(&mut nodes);
        nodes
    }

    fn collect_nodes<'a>(&'a self, nodes: &mut Vec<&'a QueryNode>) {
        match self {
            QueryDocument::Condition(node) => nodes.push(node),
            QueryDocument::Branch(branch) => {
                for child in branch.children.iter() {
                    child.collect_nodes(nodes);
                }
            }
        }
    }

    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|e| Error::parse_error("query document", e))
    }

    pub fn encode(&self) -> Result<String, Error> {
        serde_json::to_string(self).map_err(|e| Error::serialization_error("query document", e))
    }
}

impl From<QueryNode> for QueryDocument {
    fn from(node: QueryNode) -> Self {
        QueryDocument::Condition(node)
    }
}

impl From<QueryBranch> for QueryDocument {
    fn from(branch: QueryBranch) -> Self {
        QueryDocument::Branch(branch)
    }
}

impl Display for QueryDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.encode() {
            Ok(json) => write!(f, "{}", json),
            Err(e) => write!(f, "<{}>", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decode_condition() -> Result<(), Box<dyn std::error::Error>> {
        let q: QueryDocument = serde_json::from_value(json!({
            "operator": "range",
            "id": 12,
            "value": [10, 20],
            "concept_id": 7
        }))?;
        let node = q.as_node().ok_or("expected a condition")?;
        assert_eq!(node.id, "12");
        assert_eq!(node.concept_id, "7");
        assert_eq!(node.value, Some(Value::from(vec![10, 20])));
        assert_eq!(node.id_choices, None);
        Ok(())
    }

    #[test]
    fn decode_branch() -> Result<(), Box<dyn std::error::Error>> {
        let q = QueryDocument::from_json(
            r#"{"type": "and", "concept_id": "7", "children": [
                {"operator": "isnull", "id": "12", "concept_id": "7"},
                {"operator": "exact", "id": "5", "value": "x", "concept_id": "7", "id_choices": [3, 5]}
            ]}"#,
        )?;
        let branch = q.as_branch().ok_or("expected a branch")?;
        assert_eq!(branch.branch_type, BranchType::And);
        assert_eq!(q.nodes().len(), 2);
        assert!(q.nodes()[0].is_unary());
        assert_eq!(
            q.nodes()[1].id_choices,
            Some(vec!["3".to_owned(), "5".to_owned()])
        );
        Ok(())
    }

    #[test]
    fn encode_skips_absent_parts() -> Result<(), Box<dyn std::error::Error>> {
        let q: QueryDocument = QueryNode::new("isnull", "12", "7").into();
        assert_eq!(
            q.encode()?,
            r#"{"operator":"isnull","id":"12","concept_id":"7"}"#
        );
        Ok(())
    }

    #[test]
    fn encode_branch_type() -> Result<(), Box<dyn std::error::Error>> {
        let q: QueryDocument = QueryBranch::and(
            "7",
            vec![QueryNode::new("exact", "12", "7").with_value("a").into()],
        )
        .into();
        let value = serde_json::to_value(&q)?;
        assert_eq!(value["type"], json!("and"));
        assert_eq!(value["children"][0]["value"], json!("a"));
        Ok(())
    }
}
