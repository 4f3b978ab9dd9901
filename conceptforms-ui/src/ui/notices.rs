use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use conceptforms_core::error::Error;

pub type NoticeId = u64;

/// Invalid-input notice currently on screen.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub id: NoticeId,
    pub message: String,
    /// Number of invalid inputs pointing to this notice.
    pub ref_count: usize,
}

/// Display change requested by the notice board.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum NoticeChange {
    Shown {
        id: NoticeId,
        message: String,
        transient: bool,
    },
    Removed {
        id: NoticeId,
    },
}

/// Name under which an invalid input is tracked: the input name,
/// suffixed with the reason when one is given.
pub fn notice_key(field: &str, reason: Option<&str>) -> String {
    match reason {
        Some(reason) if !reason.is_empty() => format!("{}_{}", field, reason),
        _ => field.to_owned(),
    }
}

/// Deduplicated, reference-counted invalid-input notices of one concept.
///
/// The same message is shown once no matter how many inputs report it, and each
/// input (and reason) points to at most one notice. Persistent notices stay until
/// every input pointing to them is corrected; while any remain, committing the
/// query is disabled. Transient notices point to no input and stay on display
/// until [NoticeBoard::expire] is called for them; until then a transient notice
/// with the same message is not shown again.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct NoticeBoard {
    /// Displayed persistent notices, most recent first.
    notices: Vec<Notice>,
    transient: Vec<Notice>,
    invalid_inputs: BTreeMap<String, NoticeId>,
    next_id: NoticeId,
}

impl NoticeBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn displayed(&self) -> &[Notice] {
        &self.notices
    }

    /// Transient notices still fading out.
    pub fn transient(&self) -> &[Notice] {
        &self.transient
    }

    pub fn notice(&self, id: NoticeId) -> Option<&Notice> {
        self.notices.iter().find(|notice| notice.id == id)
    }

    /// Notice an input (and reason) currently points to.
    pub fn notice_for(&self, field: &str, reason: Option<&str>) -> Option<&Notice> {
        self.invalid_inputs
            .get(&notice_key(field, reason))
            .and_then(|id| self.notice(*id))
    }

    pub fn commit_enabled(&self) -> bool {
        self.invalid_inputs.is_empty()
    }

    /// Report an invalid input.
    ///
    /// An ephemeral report is dropped while a notice with the same message is
    /// displayed, persistent or transient.
    pub fn raise(
        &mut self,
        field: &str,
        reason: Option<&str>,
        message: &str,
        ephemeral: bool,
    ) -> Vec<NoticeChange> {
        let key = notice_key(field, reason);
        let mut changes = Vec::new();

        if let Some(displayed) = self.notices.iter().find(|n| n.message == message).map(|n| n.id) {
            if ephemeral {
                return changes;
            }
            match self.invalid_inputs.get(&key).copied() {
                Some(current) if current == displayed => {}
                Some(current) => {
                    changes.extend(self.release(current));
                    self.attach(key, displayed);
                }
                None => self.attach(key, displayed),
            }
            return changes;
        }

        if ephemeral && self.transient.iter().any(|n| n.message == message) {
            return changes;
        }

        let id = self.next_id;
        self.next_id += 1;
        if ephemeral {
            self.transient.push(Notice {
                id,
                message: message.to_owned(),
                ref_count: 0,
            });
            changes.push(NoticeChange::Shown {
                id,
                message: message.to_owned(),
                transient: true,
            });
            return changes;
        }
        if let Some(current) = self.invalid_inputs.get(&key).copied() {
            changes.extend(self.release(current));
        }
        self.notices.insert(
            0,
            Notice {
                id,
                message: message.to_owned(),
                ref_count: 1,
            },
        );
        self.invalid_inputs.insert(key, id);
        changes.push(NoticeChange::Shown {
            id,
            message: message.to_owned(),
            transient: false,
        });
        changes
    }

    /// Report that a previously invalid input has been corrected.
    pub fn correct(&mut self, field: &str, reason: Option<&str>) -> Result<Vec<NoticeChange>, Error> {
        let key = notice_key(field, reason);
        let id = self
            .invalid_inputs
            .remove(&key)
            .ok_or_else(|| Error::notice_not_found(&key))?;
        Ok(self.release(id).into_iter().collect())
    }

    /// Take a transient notice off display once it has faded out.
    pub fn expire(&mut self, id: NoticeId) -> Result<NoticeChange, Error> {
        let index = self
            .transient
            .iter()
            .position(|n| n.id == id)
            .ok_or_else(|| Error::notice_not_found(&id.to_string()))?;
        self.transient.remove(index);
        Ok(NoticeChange::Removed { id })
    }

    pub fn clear(&mut self) -> Vec<NoticeChange> {
        self.invalid_inputs.clear();
        self.notices
            .drain(..)
            .chain(self.transient.drain(..))
            .map(|notice| NoticeChange::Removed { id: notice.id })
            .collect()
    }

    fn attach(&mut self, key: String, id: NoticeId) {
        if let Some(notice) = self.notices.iter_mut().find(|n| n.id == id) {
            notice.ref_count += 1;
        }
        self.invalid_inputs.insert(key, id);
    }

    fn release(&mut self, id: NoticeId) -> Option<NoticeChange> {
        let index = self.notices.iter().position(|n| n.id == id)?;
        let notice = &mut self.notices[index];
        notice.ref_count = notice.ref_count.saturating_sub(1);
        if notice.ref_count == 0 {
            self.notices.remove(index);
            Some(NoticeChange::Removed { id })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conceptforms_core::error::ErrorType;

    #[test]
    fn same_message_is_shown_once() {
        let mut board = NoticeBoard::new();
        let first = board.raise("7_12", None, "Bad number", false);
        assert!(matches!(first.as_slice(), [NoticeChange::Shown { transient: false, .. }]));
        let second = board.raise("7_13", None, "Bad number", false);
        assert!(second.is_empty());
        assert_eq!(board.displayed().len(), 1);
        assert_eq!(board.displayed()[0].ref_count, 2);
        assert!(!board.commit_enabled());
    }

    #[test]
    fn notice_stays_until_all_inputs_are_corrected() -> Result<(), Box<dyn std::error::Error>> {
        let mut board = NoticeBoard::new();
        board.raise("7_12", None, "Bad number", false);
        board.raise("7_13", None, "Bad number", false);
        assert!(board.correct("7_12", None)?.is_empty());
        assert_eq!(board.displayed().len(), 1);
        assert!(!board.commit_enabled());
        let changes = board.correct("7_13", None)?;
        assert!(matches!(changes.as_slice(), [NoticeChange::Removed { .. }]));
        assert!(board.displayed().is_empty());
        assert!(board.commit_enabled());
        Ok(())
    }

    #[test]
    fn input_switches_to_a_new_message() {
        let mut board = NoticeBoard::new();
        board.raise("7_12", None, "Too small", false);
        let changes = board.raise("7_12", None, "Too large", false);
        assert_eq!(changes.len(), 2);
        assert!(matches!(changes[0], NoticeChange::Removed { .. }));
        assert!(matches!(&changes[1], NoticeChange::Shown { message, .. } if message == "Too large"));
        assert_eq!(board.displayed().len(), 1);
        assert_eq!(
            board.notice_for("7_12", None).map(|n| n.message.as_str()),
            Some("Too large")
        );
    }

    #[test]
    fn input_moves_to_a_displayed_message() {
        let mut board = NoticeBoard::new();
        board.raise("7_12", None, "Too small", false);
        board.raise("7_13", None, "Too large", false);
        let changes = board.raise("7_12", None, "Too large", false);
        assert!(matches!(changes.as_slice(), [NoticeChange::Removed { .. }]));
        assert_eq!(board.displayed().len(), 1);
        assert_eq!(board.displayed()[0].ref_count, 2);
    }

    #[test]
    fn reasons_are_tracked_separately() -> Result<(), Box<dyn std::error::Error>> {
        let mut board = NoticeBoard::new();
        board.raise("7_12", Some("range"), "Out of range", false);
        board.raise("7_12", Some("format"), "Not a number", false);
        assert_eq!(board.displayed().len(), 2);
        board.correct("7_12", Some("range"))?;
        assert_eq!(board.displayed().len(), 1);
        assert!(!board.commit_enabled());
        Ok(())
    }

    #[test]
    fn transient_notices_do_not_block_commit() {
        let mut board = NoticeBoard::new();
        let changes = board.raise("add_to_query", None, "No value", true);
        assert!(matches!(changes.as_slice(), [NoticeChange::Shown { transient: true, .. }]));
        assert!(board.displayed().is_empty());
        assert_eq!(board.transient().len(), 1);
        assert!(board.commit_enabled());
    }

    #[test]
    fn repeated_transient_notice_is_shown_once_until_expired() -> Result<(), Box<dyn std::error::Error>> {
        let mut board = NoticeBoard::new();
        let id = match board.raise("add_to_query", None, "No value", true).as_slice() {
            [NoticeChange::Shown { id, .. }] => *id,
            other => return Err(format!("unexpected changes {:?}", other).into()),
        };
        assert!(board.raise("add_to_query", None, "No value", true).is_empty());

        assert_eq!(board.expire(id)?, NoticeChange::Removed { id });
        assert!(board.transient().is_empty());
        assert_eq!(board.raise("add_to_query", None, "No value", true).len(), 1);
        assert_eq!(
            board.expire(id).unwrap_err().error_type,
            ErrorType::NoticeNotFound
        );
        Ok(())
    }

    #[test]
    fn transient_duplicate_of_displayed_notice_is_dropped() {
        let mut board = NoticeBoard::new();
        board.raise("7_12", None, "No value", false);
        assert!(board.raise("add_to_query", None, "No value", true).is_empty());
        assert_eq!(board.displayed()[0].ref_count, 1);
    }

    #[test]
    fn correcting_an_unknown_input_fails() {
        let mut board = NoticeBoard::new();
        let error = board.correct("7_12", None).unwrap_err();
        assert_eq!(error.error_type, ErrorType::NoticeNotFound);
        assert_eq!(error.key.as_deref(), Some("7_12"));
    }

    #[test]
    fn keys() {
        assert_eq!(notice_key("7_12", None), "7_12");
        assert_eq!(notice_key("7_12", Some("")), "7_12");
        assert_eq!(notice_key("7_12", Some("range")), "7_12_range");
    }
}
