pub mod concept;
pub mod manager;
pub mod message;
pub mod notices;
pub mod store;

pub use concept::{ChartData, ChartKind, Concept, ViewElement, ViewSpec, ViewType};
pub use manager::{ViewManager, COMMIT_NOTICE_FIELD};
pub use message::{view_event_channel, ViewCommand, ViewEvent, ViewEventReceiver, ViewEventSender};
pub use notices::{notice_key, Notice, NoticeBoard, NoticeChange, NoticeId};
pub use store::{ConceptEntry, ConceptStore, DirectConceptStore, ViewState};
