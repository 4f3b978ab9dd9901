use std::collections::BTreeMap;

use crate::error::Error;
use crate::key::FormKey;
use crate::value::Value;

/// Form data-source: the flat key/value view of the inputs of a concept.
///
/// Keys follow the form key grammar (see [crate::key]); entries with other keys
/// may be present but take no part in the translation to a query.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(transparent)]
pub struct FormData(BTreeMap<String, Value>);

impl FormData {
    pub fn new() -> Self {
        FormData(BTreeMap::new())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Store a value, returning the previous one.
    pub fn set<K: Into<String>, V: Into<Value>>(&mut self, key: K, value: V) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn set_key<V: Into<Value>>(&mut self, key: &FormKey, value: V) -> Option<Value> {
        self.set(key.encode(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Apply a change reported by an input widget.
    /// An absent value means the input is no longer in use (e.g. hidden after an
    /// operator change) and its entry is dropped.
    pub fn apply_change(&mut self, key: &str, value: Option<Value>) {
        match value {
            Some(value) => {
                self.0.insert(key.to_owned(), value);
            }
            None => {
                self.0.remove(key);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// Pre-flight check run before a commit.
    ///
    /// The data-source must not be empty and no entry may be null,
    /// an empty string or an empty list.
    pub fn validate(&self) -> Result<(), Error> {
        if self.is_empty() {
            return Err(Error::empty_or_missing_value(None));
        }
        match self.0.iter().find(|(_, value)| value.is_blank()) {
            Some((key, _)) => Err(Error::empty_or_missing_value(Some(key))),
            None => Ok(()),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|e| Error::parse_error("form data", e))
    }

    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string(self).map_err(|e| Error::serialization_error("form data", e))
    }
}

impl FromIterator<(String, Value)> for FormData {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        FormData(iter.into_iter().collect())
    }
}

impl IntoIterator for FormData {
    type Item = (String, Value);
    type IntoIter = std::collections::btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorType;

    #[test]
    fn empty_form_is_invalid() {
        let error = FormData::new().validate().unwrap_err();
        assert_eq!(error.error_type, ErrorType::EmptyOrMissingValue);
        assert_eq!(error.key, None);
    }

    #[test]
    fn blank_values_are_invalid() -> Result<(), Box<dyn std::error::Error>> {
        for json in [r#"{"7_12": ""}"#, r#"{"7_12": []}"#, r#"{"7_12": null}"#] {
            let form = FormData::from_json(json)?;
            let error = form.validate().unwrap_err();
            assert!(error.is_empty_or_missing_value());
            assert_eq!(error.key.as_deref(), Some("7_12"));
        }
        Ok(())
    }

    #[test]
    fn filled_form_is_valid() -> Result<(), Box<dyn std::error::Error>> {
        let form = FormData::from_json(r#"{"7_12": 0, "7_13": ["a"], "7_13_operator": "in"}"#)?;
        form.validate()?;
        assert!(form.is_valid());
        Ok(())
    }

    #[test]
    fn apply_change_removes_absent_values() {
        let mut form = FormData::new();
        form.apply_change("7_12", Some(Value::from("foo")));
        assert_eq!(form.get("7_12"), Some(&Value::from("foo")));
        form.apply_change("7_12", None);
        assert!(form.is_empty());
    }

    #[test]
    fn json_is_a_flat_object() -> Result<(), Box<dyn std::error::Error>> {
        let mut form = FormData::new();
        form.set("7_12_input0", 10);
        form.set("7_12_input1", 20);
        assert_eq!(form.to_json()?, r#"{"7_12_input0":10,"7_12_input1":20}"#);
        Ok(())
    }
}
