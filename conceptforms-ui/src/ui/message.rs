use serde::{Deserialize, Serialize};

use conceptforms_core::form::FormData;
use conceptforms_core::query::QueryDocument;
use conceptforms_core::value::Value;

use super::concept::{Concept, ViewSpec};
use super::notices::NoticeId;

/// Commands sent by the presentation layer to the [ViewManager](super::ViewManager).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "command")]
pub enum ViewCommand {
    /// Show a concept, registering it on first use. `existing_query` is the part
    /// of the user's query already restricting this concept.
    ShowConcept {
        concept: Concept,
        #[serde(default)]
        existing_query: Option<QueryDocument>,
    },
    /// Switch to a view (tab) of the active concept.
    ShowView { index: usize },
    /// A form input of the active view changed. `None` clears the input.
    ValueChanged {
        name: String,
        #[serde(default)]
        value: Option<Value>,
    },
    /// Translate the active form into a query.
    CommitRequested,
    InputInvalid {
        field: String,
        #[serde(default)]
        reason: Option<String>,
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        ephemeral: bool,
    },
    InputCorrected {
        field: String,
        #[serde(default)]
        reason: Option<String>,
    },
    /// A transient notice has faded out.
    NoticeExpired { notice_id: NoticeId },
    UnloadConcept { concept_id: String },
}

/// Events emitted by the view manager for the presentation layer and the
/// query-building backend.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "event")]
pub enum ViewEvent {
    ConceptShown {
        concept_id: String,
        name: String,
        tabs: Vec<String>,
        /// More than one view, so tabs are worth drawing.
        show_tabs: bool,
        /// All views are builtin and the commit control is drawn by the framework.
        show_commit: bool,
        static_content: Option<String>,
        /// Shared view code has not been requested for this concept yet.
        load_globals: bool,
    },
    ViewShown {
        concept_id: String,
        index: usize,
        view: ViewSpec,
        /// The view was shown before and keeps its rendered state.
        loaded: bool,
    },
    /// Initial values for a view shown for the first time.
    ViewFormData {
        concept_id: String,
        index: usize,
        form: FormData,
    },
    /// An input changed in another view of the same concept.
    ElementUpdated {
        concept_id: String,
        index: usize,
        name: String,
        value: Option<Value>,
    },
    QueryReady {
        concept_id: String,
        query: QueryDocument,
    },
    InputInvalid {
        concept_id: String,
        notice_id: NoticeId,
        message: String,
        transient: bool,
        /// How long a transient notice stays visible.
        duration_ms: Option<u64>,
    },
    NoticeRemoved {
        concept_id: String,
        notice_id: NoticeId,
    },
    InputCorrected {
        concept_id: String,
        field: String,
        reason: Option<String>,
    },
    CommitEnabled { concept_id: String, enabled: bool },
}

pub type ViewEventSender = tokio::sync::mpsc::UnboundedSender<ViewEvent>;
pub type ViewEventReceiver = tokio::sync::mpsc::UnboundedReceiver<ViewEvent>;

/// Create a new view event channel.
pub fn view_event_channel() -> (ViewEventSender, ViewEventReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decode_commands() -> Result<(), Box<dyn std::error::Error>> {
        let command: ViewCommand = serde_json::from_value(json!({
            "command": "ValueChanged",
            "name": "7_12",
            "value": "foo"
        }))?;
        assert_eq!(
            command,
            ViewCommand::ValueChanged {
                name: "7_12".to_owned(),
                value: Some(Value::from("foo"))
            }
        );
        let command: ViewCommand = serde_json::from_value(json!({
            "command": "InputInvalid",
            "field": "7_12"
        }))?;
        assert_eq!(
            command,
            ViewCommand::InputInvalid {
                field: "7_12".to_owned(),
                reason: None,
                message: None,
                ephemeral: false
            }
        );
        let command: ViewCommand = serde_json::from_value(json!({"command": "CommitRequested"}))?;
        assert_eq!(command, ViewCommand::CommitRequested);
        Ok(())
    }

    #[test]
    fn encode_event() -> Result<(), Box<dyn std::error::Error>> {
        let event = ViewEvent::CommitEnabled {
            concept_id: "7".to_owned(),
            enabled: false,
        };
        assert_eq!(
            serde_json::to_value(&event)?,
            json!({"event": "CommitEnabled", "concept_id": "7", "enabled": false})
        );
        Ok(())
    }
}
