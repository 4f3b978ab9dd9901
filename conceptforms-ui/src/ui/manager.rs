use tracing::{debug, error, info, warn};

use conceptforms_core::config::FormsConfig;
use conceptforms_core::error::Error;
use conceptforms_core::form::FormData;
use conceptforms_core::query::QueryDocument;
use conceptforms_core::translate::Translator;
use conceptforms_core::value::Value;

use super::concept::Concept;
use super::message::{ViewCommand, ViewEvent, ViewEventSender};
use super::notices::{NoticeBoard, NoticeChange, NoticeId};
use super::store::{ConceptStore, DirectConceptStore};

/// Input name under which a failed commit is reported.
pub const COMMIT_NOTICE_FIELD: &str = "add_to_query";

/// Drives the concept views: keeps one form per concept in sync across its
/// views, tracks invalid inputs and turns committed forms into queries.
///
/// Commands come in through [ViewManager::dispatch] (or the individual methods);
/// everything the presentation layer has to do is sent as a [ViewEvent].
#[derive(Debug)]
pub struct ViewManager {
    translator: Translator,
    store: Box<dyn ConceptStore>,
    active_concept: Option<String>,
    active_view: Option<usize>,
    events: ViewEventSender,
}

impl ViewManager {
    pub fn new(config: FormsConfig, events: ViewEventSender) -> Self {
        Self::with_store(config, Box::new(DirectConceptStore::new()), events)
    }

    pub fn with_store(config: FormsConfig, store: Box<dyn ConceptStore>, events: ViewEventSender) -> Self {
        ViewManager {
            translator: Translator::new(config),
            store,
            active_concept: None,
            active_view: None,
            events,
        }
    }

    pub fn config(&self) -> &FormsConfig {
        self.translator.config()
    }

    pub fn store(&self) -> &dyn ConceptStore {
        self.store.as_ref()
    }

    pub fn active_concept(&self) -> Option<&str> {
        self.active_concept.as_deref()
    }

    pub fn active_view(&self) -> Option<usize> {
        self.active_view
    }

    pub fn form(&self, concept_id: &str) -> Result<&FormData, Error> {
        Ok(&self.store.entry(concept_id)?.form)
    }

    pub fn notices(&self, concept_id: &str) -> Result<&NoticeBoard, Error> {
        Ok(&self.store.entry(concept_id)?.notices)
    }

    pub fn dispatch(&mut self, command: ViewCommand) -> Result<(), Error> {
        match command {
            ViewCommand::ShowConcept {
                concept,
                existing_query,
            } => self.show(concept, existing_query),
            ViewCommand::ShowView { index } => self.show_view(index),
            ViewCommand::ValueChanged { name, value } => self.value_changed(&name, value),
            ViewCommand::CommitRequested => self.commit().map(|_| ()),
            ViewCommand::InputInvalid {
                field,
                reason,
                message,
                ephemeral,
            } => self.input_invalid(&field, reason.as_deref(), message.as_deref(), ephemeral),
            ViewCommand::InputCorrected { field, reason } => {
                self.input_corrected(&field, reason.as_deref())
            }
            ViewCommand::NoticeExpired { notice_id } => self.notice_expired(notice_id),
            ViewCommand::UnloadConcept { concept_id } => self.unload(&concept_id),
        }
    }

    // ─── Showing ────────────────────────────────────────────────────────────

    /// Show a concept and its first view. Showing the active concept again does nothing.
    pub fn show(&mut self, mut concept: Concept, existing_query: Option<QueryDocument>) -> Result<(), Error> {
        if self.active_concept.as_deref() == Some(concept.id.as_str()) {
            debug!(concept_id = %concept.id, "Concept already shown");
            return Ok(());
        }
        if existing_query.is_some() {
            concept.query = existing_query;
        }
        let concept_id = concept.id.clone();
        self.store.register(concept, &self.translator)?;

        let entry = self.store.entry_mut(&concept_id)?;
        let load_globals = !entry.globals_loaded;
        entry.globals_loaded = true;
        let event = ViewEvent::ConceptShown {
            concept_id: concept_id.clone(),
            name: entry.concept.name.clone(),
            tabs: entry.concept.tab_names(),
            show_tabs: entry.views.len() >= 2,
            show_commit: entry.concept.is_builtin(),
            static_content: entry.concept.static_content.clone(),
            load_globals,
        };
        let has_views = !entry.views.is_empty();

        self.active_concept = Some(concept_id);
        self.active_view = None;
        self.emit(event);
        if has_views {
            self.show_view(0)?;
        }
        Ok(())
    }

    /// Switch to a view of the active concept. The first showing of a view also
    /// delivers the current form data so the view can fill its inputs.
    pub fn show_view(&mut self, index: usize) -> Result<(), Error> {
        let concept_id = self.require_active()?;
        let entry = self.store.entry_mut(&concept_id)?;
        let view = entry.view_mut(index)?;
        let loaded = view.loaded;
        view.loaded = true;
        let spec = view.spec.clone();
        let form = entry.form.clone();

        debug!(concept_id = %concept_id, index, loaded, "Showing view");
        self.active_view = Some(index);
        self.emit(ViewEvent::ViewShown {
            concept_id: concept_id.clone(),
            index,
            view: spec,
            loaded,
        });
        if !loaded {
            self.emit(ViewEvent::ViewFormData {
                concept_id,
                index,
                form,
            });
        }
        Ok(())
    }

    // ─── Editing ────────────────────────────────────────────────────────────

    /// Apply an input change to the concept's form and propagate it to the
    /// other views that have already been shown.
    pub fn value_changed(&mut self, name: &str, value: Option<Value>) -> Result<(), Error> {
        let concept_id = self.require_active()?;
        let entry = self.store.entry_mut(&concept_id)?;
        entry.form.apply_change(name, value.clone());
        // With no active view every loaded view is a target.
        let targets = entry.other_loaded_views(self.active_view.unwrap_or(usize::MAX));
        for index in targets {
            self.emit(ViewEvent::ElementUpdated {
                concept_id: concept_id.clone(),
                index,
                name: name.to_owned(),
                value: value.clone(),
            });
        }
        Ok(())
    }

    /// Translate the active form into a query.
    ///
    /// Returns `Ok(None)` when the commit is refused: while invalid inputs are
    /// outstanding, or when the form is empty or has a blank value (the latter is
    /// reported to the user as a transient notice).
    pub fn commit(&mut self) -> Result<Option<QueryDocument>, Error> {
        let concept_id = self.require_active()?;
        let entry = self.store.entry(&concept_id)?;

        if !entry.notices.commit_enabled() {
            warn!(concept_id = %concept_id, "Commit requested while inputs are invalid");
            return Ok(None);
        }
        if let Err(e) = entry.form.validate() {
            debug!(concept_id = %concept_id, error = %e, "Form rejected before translation");
            let message = self.config().empty_value_message.clone();
            self.input_invalid(COMMIT_NOTICE_FIELD, None, Some(&message), true)?;
            return Ok(None);
        }

        let query = self
            .translator
            .query_from_form(&entry.form, &concept_id)
            .map_err(|e| {
                error!(concept_id = %concept_id, error = %e, "Form translation failed");
                e.with_concept(&concept_id)
            })?;
        info!(concept_id = %concept_id, query = %query, "Query committed");
        self.emit(ViewEvent::QueryReady {
            concept_id,
            query: query.clone(),
        });
        Ok(Some(query))
    }

    // ─── Notices ────────────────────────────────────────────────────────────

    /// Report an invalid input of the active concept. Without a message the
    /// configured invalid-input message is shown.
    pub fn input_invalid(
        &mut self,
        field: &str,
        reason: Option<&str>,
        message: Option<&str>,
        ephemeral: bool,
    ) -> Result<(), Error> {
        let concept_id = self.require_active()?;
        let config = self.translator.config();
        let message = message.unwrap_or(config.invalid_input_message.as_str()).to_owned();
        let duration_ms = config.transient_notice_ms;

        let notices = &mut self.store.entry_mut(&concept_id)?.notices;
        let was_enabled = notices.commit_enabled();
        let changes = notices.raise(field, reason, &message, ephemeral);
        let enabled = notices.commit_enabled();

        self.emit_notice_changes(&concept_id, changes, duration_ms);
        if enabled != was_enabled {
            self.emit(ViewEvent::CommitEnabled { concept_id, enabled });
        }
        Ok(())
    }

    /// Report that an input is valid again. Inputs that were never reported
    /// invalid are ignored.
    pub fn input_corrected(&mut self, field: &str, reason: Option<&str>) -> Result<(), Error> {
        let concept_id = self.require_active()?;
        let duration_ms = self.config().transient_notice_ms;

        let notices = &mut self.store.entry_mut(&concept_id)?.notices;
        let was_enabled = notices.commit_enabled();
        let changes = match notices.correct(field, reason) {
            Ok(changes) => changes,
            Err(e) => {
                warn!(concept_id = %concept_id, error = %e, "Ignoring correction");
                return Ok(());
            }
        };
        let enabled = notices.commit_enabled();

        self.emit(ViewEvent::InputCorrected {
            concept_id: concept_id.clone(),
            field: field.to_owned(),
            reason: reason.map(str::to_owned),
        });
        self.emit_notice_changes(&concept_id, changes, duration_ms);
        if enabled != was_enabled {
            self.emit(ViewEvent::CommitEnabled { concept_id, enabled });
        }
        Ok(())
    }

    /// Take a faded transient notice of the active concept off display, so the
    /// same message can be shown again.
    pub fn notice_expired(&mut self, notice_id: NoticeId) -> Result<(), Error> {
        let concept_id = self.require_active()?;
        let duration_ms = self.config().transient_notice_ms;
        let change = match self.store.entry_mut(&concept_id)?.notices.expire(notice_id) {
            Ok(change) => change,
            Err(e) => {
                debug!(concept_id = %concept_id, error = %e, "Ignoring expiry");
                return Ok(());
            }
        };
        self.emit_notice_changes(&concept_id, vec![change], duration_ms);
        Ok(())
    }

    // ─── Unloading ──────────────────────────────────────────────────────────

    /// Forget a concept together with its form data and notices.
    pub fn unload(&mut self, concept_id: &str) -> Result<(), Error> {
        if self.store.remove(concept_id).is_none() {
            debug!(concept_id, "Unloading a concept that is not registered");
            return Ok(());
        }
        info!(concept_id, "Concept unloaded");
        if self.active_concept.as_deref() == Some(concept_id) {
            self.active_concept = None;
            self.active_view = None;
        }
        Ok(())
    }

    fn require_active(&self) -> Result<String, Error> {
        self.active_concept.clone().ok_or_else(Error::no_active_concept)
    }

    fn emit_notice_changes(&self, concept_id: &str, changes: Vec<NoticeChange>, duration_ms: u64) {
        for change in changes {
            let event = match change {
                NoticeChange::Shown {
                    id,
                    message,
                    transient,
                } => ViewEvent::InputInvalid {
                    concept_id: concept_id.to_owned(),
                    notice_id: id,
                    message,
                    transient,
                    duration_ms: transient.then_some(duration_ms),
                },
                NoticeChange::Removed { id } => ViewEvent::NoticeRemoved {
                    concept_id: concept_id.to_owned(),
                    notice_id: id,
                },
            };
            self.emit(event);
        }
    }

    fn emit(&self, event: ViewEvent) {
        if let Err(e) = self.events.send(event) {
            debug!("View event dropped, no receiver: {:?}", e.0);
        }
    }
}
