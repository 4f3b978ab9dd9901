use std::collections::HashMap;

use tracing::{debug, info};

use conceptforms_core::error::Error;
use conceptforms_core::form::FormData;
use conceptforms_core::translate::Translator;

use super::concept::{Concept, ViewSpec};
use super::notices::NoticeBoard;

// ─── ConceptEntry ───────────────────────────────────────────────────────────

/// View of a registered concept and whether it has been shown yet.
#[derive(Debug, Clone)]
pub struct ViewState {
    pub spec: ViewSpec,
    pub loaded: bool,
}

/// Everything kept for a concept between showings: the concept itself, the
/// form data shared by all of its views and its invalid-input notices.
#[derive(Debug, Clone)]
pub struct ConceptEntry {
    pub concept: Concept,
    pub form: FormData,
    pub notices: NoticeBoard,
    pub views: Vec<ViewState>,
    /// Shared view code (scripts, styles) has been requested.
    pub globals_loaded: bool,
}

impl ConceptEntry {
    /// Entry for a freshly shown concept. The form is pre-filled from the
    /// concept's query when it has one.
    pub fn new(concept: Concept, translator: &Translator) -> Result<Self, Error> {
        let form = match &concept.query {
            Some(query) => translator
                .form_from_query(query)
                .map_err(|e| e.with_concept(&concept.id))?,
            None => FormData::new(),
        };
        let views = concept
            .views
            .iter()
            .map(|spec| ViewState {
                spec: spec.clone(),
                loaded: false,
            })
            .collect();
        Ok(ConceptEntry {
            concept,
            form,
            notices: NoticeBoard::new(),
            views,
            globals_loaded: false,
        })
    }

    pub fn id(&self) -> &str {
        &self.concept.id
    }

    pub fn view(&self, index: usize) -> Result<&ViewState, Error> {
        self.views
            .get(index)
            .ok_or_else(|| Error::view_not_found(&self.concept.id, index, &self.concept.tab_names()))
    }

    pub fn view_mut(&mut self, index: usize) -> Result<&mut ViewState, Error> {
        let tabs = self.concept.tab_names();
        let concept_id = self.concept.id.clone();
        self.views
            .get_mut(index)
            .ok_or_else(|| Error::view_not_found(&concept_id, index, &tabs))
    }

    /// Indices of loaded views other than `index`.
    pub fn other_loaded_views(&self, index: usize) -> Vec<usize> {
        self.views
            .iter()
            .enumerate()
            .filter(|(i, view)| *i != index && view.loaded)
            .map(|(i, _)| i)
            .collect()
    }
}

// ─── ConceptStore Trait ─────────────────────────────────────────────────────

/// Registry of concepts the user has opened, keyed by concept id.
///
/// All methods are synchronous; the store holds in-memory data only.
pub trait ConceptStore: Send + Sync + std::fmt::Debug {
    fn insert(&mut self, entry: ConceptEntry);

    fn get(&self, concept_id: &str) -> Option<&ConceptEntry>;

    fn get_mut(&mut self, concept_id: &str) -> Option<&mut ConceptEntry>;

    /// Drop the entry together with its form data.
    fn remove(&mut self, concept_id: &str) -> Option<ConceptEntry>;

    fn concept_ids(&self) -> Vec<String>;

    fn contains(&self, concept_id: &str) -> bool {
        self.get(concept_id).is_some()
    }

    /// Entry of a registered concept or a `ConceptNotRegistered` error.
    fn entry(&self, concept_id: &str) -> Result<&ConceptEntry, Error> {
        self.get(concept_id)
            .ok_or_else(|| Error::concept_not_registered(concept_id))
    }

    fn entry_mut(&mut self, concept_id: &str) -> Result<&mut ConceptEntry, Error> {
        self.get_mut(concept_id)
            .ok_or_else(|| Error::concept_not_registered(concept_id))
    }

    /// Register a concept on its first showing. Concepts already registered
    /// keep their entry, including any edits made to the form.
    fn register(&mut self, concept: Concept, translator: &Translator) -> Result<(), Error> {
        if self.contains(&concept.id) {
            debug!(concept_id = %concept.id, "Concept already registered");
            return Ok(());
        }
        info!(concept_id = %concept.id, name = %concept.name, "Registering concept");
        let entry = ConceptEntry::new(concept, translator)?;
        self.insert(entry);
        Ok(())
    }
}

// ─── DirectConceptStore ─────────────────────────────────────────────────────

/// In-memory [ConceptStore].
#[derive(Debug, Default)]
pub struct DirectConceptStore {
    entries: HashMap<String, ConceptEntry>,
}

impl DirectConceptStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConceptStore for DirectConceptStore {
    fn insert(&mut self, entry: ConceptEntry) {
        self.entries.insert(entry.id().to_owned(), entry);
    }

    fn get(&self, concept_id: &str) -> Option<&ConceptEntry> {
        self.entries.get(concept_id)
    }

    fn get_mut(&mut self, concept_id: &str) -> Option<&mut ConceptEntry> {
        self.entries.get_mut(concept_id)
    }

    fn remove(&mut self, concept_id: &str) -> Option<ConceptEntry> {
        self.entries.remove(concept_id)
    }

    fn concept_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entries.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conceptforms_core::config::FormsConfig;
    use conceptforms_core::error::ErrorType;
    use conceptforms_core::query::QueryNode;
    use conceptforms_core::value::Value;

    use crate::ui::concept::ViewElement;

    fn age() -> Concept {
        Concept::new("7", "Age")
            .with_view(ViewSpec::builtin("Form", vec![ViewElement::Form]))
            .with_view(ViewSpec::custom("Plot", "plot.js"))
    }

    #[test]
    fn register_builds_form_from_query() -> Result<(), Box<dyn std::error::Error>> {
        let translator = Translator::new(FormsConfig::default());
        let mut store = DirectConceptStore::new();
        let concept = age().with_query(QueryNode::new("exact", "12", "7").with_value("x").into());
        store.register(concept, &translator)?;
        let entry = store.entry("7")?;
        assert_eq!(entry.form.get("7_12"), Some(&Value::from("x")));
        assert_eq!(entry.views.len(), 2);
        assert!(entry.views.iter().all(|view| !view.loaded));
        Ok(())
    }

    #[test]
    fn register_keeps_existing_entry() -> Result<(), Box<dyn std::error::Error>> {
        let translator = Translator::new(FormsConfig::default());
        let mut store = DirectConceptStore::new();
        store.register(age(), &translator)?;
        store.entry_mut("7")?.form.set("7_12", "edited");
        store.register(age(), &translator)?;
        assert_eq!(store.entry("7")?.form.get("7_12"), Some(&Value::from("edited")));
        assert_eq!(store.concept_ids(), vec!["7"]);
        Ok(())
    }

    #[test]
    fn remove_and_missing_entries() -> Result<(), Box<dyn std::error::Error>> {
        let translator = Translator::new(FormsConfig::default());
        let mut store = DirectConceptStore::new();
        store.register(age(), &translator)?;
        assert!(store.remove("7").is_some());
        assert!(!store.contains("7"));
        let error = store.entry("7").unwrap_err();
        assert_eq!(error.error_type, ErrorType::ConceptNotRegistered);
        Ok(())
    }

    #[test]
    fn view_lookup() -> Result<(), Box<dyn std::error::Error>> {
        let translator = Translator::new(FormsConfig::default());
        let mut entry = ConceptEntry::new(age(), &translator)?;
        entry.view_mut(1)?.loaded = true;
        assert_eq!(entry.other_loaded_views(0), vec![1]);
        assert!(entry.other_loaded_views(1).is_empty());
        assert_eq!(entry.view(5).unwrap_err().error_type, ErrorType::ViewNotFound);
        Ok(())
    }
}
