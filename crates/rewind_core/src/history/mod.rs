//! Linear undo/redo history engine.
//!
//! # Responsibility
//! - Own the ordered entry arena and the "last done" cursor.
//! - Move the cursor by reverting or applying the minimal entry span.
//!
//! # Invariants
//! - Entries are sorted by strictly increasing `EntryId`.
//! - Entries with id <= cursor are applied; the rest are pending redo.
//! - The cursor only moves once every step of a transition succeeded.
//! - A failed transition marks the history corrupted; it then refuses work.
//!
//! # See also
//! - `project` for the lock that makes transitions atomic to readers.

use crate::model::change::{ChangeError, ChangeRecord, ChangeTarget};
use crate::model::entry::{now_epoch_ms, EntryId, EntryMeta, HistoryEntry};
use log::{debug, error, info};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type HistoryResult<T> = Result<T, HistoryError>;

/// Direction of one cursor transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveDirection {
    None,
    Undo,
    Redo,
}

impl MoveDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Undo => "undo",
            Self::Redo => "redo",
        }
    }
}

/// Result of a successful `History::move_to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveOutcome {
    pub from: EntryId,
    pub to: EntryId,
    pub direction: MoveDirection,
    /// Entry ids reverted, in execution order (descending).
    pub reverted: Vec<EntryId>,
    /// Entry ids applied, in execution order (ascending).
    pub applied: Vec<EntryId>,
}

impl MoveOutcome {
    fn unchanged(cursor: EntryId) -> Self {
        Self {
            from: cursor,
            to: cursor,
            direction: MoveDirection::None,
            reverted: vec![],
            applied: vec![],
        }
    }

    pub fn is_noop(&self) -> bool {
        self.direction == MoveDirection::None
    }
}

/// History engine errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    /// Target id is neither 0 nor present in the history.
    UnknownEntry(EntryId),
    /// An apply/revert failed mid-transition; cursor stopped at `reached`.
    HistoryCorruption {
        direction: MoveDirection,
        reached: EntryId,
        failed_entry: EntryId,
        source: ChangeError,
    },
    /// A new change could not be applied; history is unchanged.
    ChangeRejected {
        description: String,
        source: ChangeError,
    },
    /// A previous transition failed; the owning dataset must be reloaded.
    Corrupted { cursor: EntryId },
}

impl HistoryError {
    /// Returns whether the caller may treat this as a rejected request.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::UnknownEntry(_) | Self::ChangeRejected { .. })
    }
}

impl Display for HistoryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownEntry(id) => write!(f, "history entry not found: {id}"),
            Self::HistoryCorruption {
                direction,
                reached,
                failed_entry,
                source,
            } => write!(
                f,
                "history corrupted during {}: entry {failed_entry} failed ({source}); cursor left at {reached}",
                direction.as_str()
            ),
            Self::ChangeRejected {
                description,
                source,
            } => write!(f, "change `{description}` rejected: {source}"),
            Self::Corrupted { cursor } => {
                write!(f, "history is corrupted at cursor {cursor}; reload required")
            }
        }
    }
}

impl Error for HistoryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::HistoryCorruption { source, .. } => Some(source),
            Self::ChangeRejected { source, .. } => Some(source),
            Self::UnknownEntry(_) | Self::Corrupted { .. } => None,
        }
    }
}

/// Ordered entry arena plus the cursor of the last applied entry.
pub struct History<T: ChangeTarget> {
    entries: Vec<HistoryEntry<T>>,
    cursor: EntryId,
    next_id: u64,
    corrupted: bool,
}

impl<T: ChangeTarget> Default for History<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            cursor: EntryId::INITIAL,
            next_id: 1,
            corrupted: false,
        }
    }
}

impl<T: ChangeTarget> History<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of the last applied entry, or `EntryId::INITIAL`.
    pub fn cursor(&self) -> EntryId {
        self.cursor
    }

    /// Alias of `cursor` using the undo/redo vocabulary.
    pub fn last_done_id(&self) -> EntryId {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_corrupted(&self) -> bool {
        self.corrupted
    }

    pub fn last_entry_id(&self) -> EntryId {
        self.entries
            .last()
            .map_or(EntryId::INITIAL, HistoryEntry::id)
    }

    pub fn entry(&self, id: EntryId) -> Option<&HistoryEntry<T>> {
        self.position(id).map(|index| &self.entries[index])
    }

    /// Returns the id applied right before `id`.
    ///
    /// `Some(EntryId::INITIAL)` for the first entry, `None` when `id` is
    /// initial or unknown.
    pub fn preceding_entry_id(&self, id: EntryId) -> Option<EntryId> {
        let index = self.position(id)?;
        Some(match index {
            0 => EntryId::INITIAL,
            _ => self.entries[index - 1].id(),
        })
    }

    /// Applied entries in chronological order.
    pub fn done_entries(&self) -> Vec<EntryMeta> {
        self.entries
            .iter()
            .take_while(|entry| entry.id() <= self.cursor)
            .map(HistoryEntry::meta)
            .collect()
    }

    /// Pending (redo) entries in chronological order.
    pub fn pending_entries(&self) -> Vec<EntryMeta> {
        self.entries
            .iter()
            .skip_while(|entry| entry.id() <= self.cursor)
            .map(HistoryEntry::meta)
            .collect()
    }

    /// Most recent `count` applied entries, oldest first.
    pub fn last_done_entries(&self, count: usize) -> Vec<EntryMeta> {
        let done = self.done_count();
        let start = done.saturating_sub(count);
        self.entries[start..done]
            .iter()
            .map(HistoryEntry::meta)
            .collect()
    }

    /// Applies `change` and appends it after the cursor.
    ///
    /// Any pending redo tail is discarded first. If the change fails to
    /// apply, the history is left untouched.
    ///
    /// # Errors
    /// - `ChangeRejected` when the target refuses the change.
    /// - `Corrupted` when an earlier transition failed.
    pub fn commit(
        &mut self,
        target: &mut T,
        description: impl Into<String>,
        change: Box<dyn ChangeRecord<T>>,
    ) -> HistoryResult<EntryMeta> {
        self.ensure_usable()?;
        let description = description.into();

        if let Err(source) = target.apply_change(change.as_ref()) {
            error!(
                "event=history_commit module=history status=error kind={} error_code=change_rejected error={}",
                change.kind(),
                source
            );
            return Err(HistoryError::ChangeRejected {
                description,
                source,
            });
        }

        let discarded = self.truncate_pending();
        let id = EntryId(self.next_id);
        self.next_id += 1;
        let entry = HistoryEntry::new(id, description, now_epoch_ms(), change);
        let meta = entry.meta();
        self.entries.push(entry);
        self.cursor = id;

        info!(
            "event=history_commit module=history status=ok entry_id={} kind={} discarded={}",
            id,
            meta.kind,
            discarded.len()
        );
        Ok(meta)
    }

    /// Drops every pending entry and returns their metadata.
    pub fn truncate_pending(&mut self) -> Vec<EntryMeta> {
        let keep = self.done_count();
        self.entries
            .drain(keep..)
            .map(|entry| entry.meta())
            .collect()
    }

    /// Moves the cursor to `target_id`, reverting or applying entries.
    ///
    /// # Errors
    /// - `UnknownEntry` when `target_id` is nonzero and not present; the
    ///   cursor is unchanged.
    /// - `HistoryCorruption` when one step fails; the cursor stays at the
    ///   last id reached and the history becomes corrupted.
    /// - `Corrupted` when an earlier transition failed.
    pub fn move_to(&mut self, target: &mut T, target_id: EntryId) -> HistoryResult<MoveOutcome> {
        self.ensure_usable()?;
        if !target_id.is_initial() && self.position(target_id).is_none() {
            debug!(
                "event=history_move module=history status=rejected target_id={} error_code=unknown_entry",
                target_id
            );
            return Err(HistoryError::UnknownEntry(target_id));
        }

        let from = self.cursor;
        if target_id == from {
            return Ok(MoveOutcome::unchanged(from));
        }

        let result = if target_id < from {
            self.revert_span(target, from, target_id)
        } else {
            self.apply_span(target, from, target_id)
        };

        match result {
            Ok(outcome) => {
                self.cursor = target_id;
                info!(
                    "event=history_move module=history status=ok direction={} from={} to={} steps={}",
                    outcome.direction.as_str(),
                    from,
                    target_id,
                    outcome.reverted.len() + outcome.applied.len()
                );
                Ok(outcome)
            }
            Err(err) => {
                if let HistoryError::HistoryCorruption { reached, .. } = &err {
                    self.cursor = *reached;
                }
                self.corrupted = true;
                error!(
                    "event=history_move module=history status=error from={} to={} cursor={} error_code=history_corruption error={}",
                    from, target_id, self.cursor, err
                );
                Err(err)
            }
        }
    }

    /// Reverts the most recent applied entry.
    pub fn undo(&mut self, target: &mut T) -> HistoryResult<MoveOutcome> {
        match self.preceding_entry_id(self.cursor) {
            Some(previous) => self.move_to(target, previous),
            None => {
                self.ensure_usable()?;
                Ok(MoveOutcome::unchanged(self.cursor))
            }
        }
    }

    /// Re-applies the first pending entry.
    pub fn redo(&mut self, target: &mut T) -> HistoryResult<MoveOutcome> {
        match self.entries.get(self.done_count()).map(HistoryEntry::id) {
            Some(next) => self.move_to(target, next),
            None => {
                self.ensure_usable()?;
                Ok(MoveOutcome::unchanged(self.cursor))
            }
        }
    }

    /// Marks the history unusable after the owning dataset was left in an
    /// unknown state by something outside the engine (e.g. a panic).
    pub(crate) fn mark_corrupted(&mut self) {
        self.corrupted = true;
    }

    fn revert_span(
        &self,
        target: &mut T,
        from: EntryId,
        to: EntryId,
    ) -> HistoryResult<MoveOutcome> {
        let mut outcome = MoveOutcome {
            from,
            to,
            direction: MoveDirection::Undo,
            reverted: vec![],
            applied: vec![],
        };
        for entry in self
            .entries
            .iter()
            .rev()
            .filter(|entry| entry.id() > to && entry.id() <= from)
        {
            if let Err(source) = target.revert_change(entry.change()) {
                // The failing entry is still applied, so it is where we stopped.
                return Err(HistoryError::HistoryCorruption {
                    direction: MoveDirection::Undo,
                    reached: entry.id(),
                    failed_entry: entry.id(),
                    source,
                });
            }
            outcome.reverted.push(entry.id());
        }
        Ok(outcome)
    }

    fn apply_span(&self, target: &mut T, from: EntryId, to: EntryId) -> HistoryResult<MoveOutcome> {
        let mut outcome = MoveOutcome {
            from,
            to,
            direction: MoveDirection::Redo,
            reverted: vec![],
            applied: vec![],
        };
        let mut reached = from;
        for entry in self
            .entries
            .iter()
            .filter(|entry| entry.id() > from && entry.id() <= to)
        {
            if let Err(source) = target.apply_change(entry.change()) {
                return Err(HistoryError::HistoryCorruption {
                    direction: MoveDirection::Redo,
                    reached,
                    failed_entry: entry.id(),
                    source,
                });
            }
            reached = entry.id();
            outcome.applied.push(entry.id());
        }
        Ok(outcome)
    }

    fn ensure_usable(&self) -> HistoryResult<()> {
        if self.corrupted {
            return Err(HistoryError::Corrupted {
                cursor: self.cursor,
            });
        }
        Ok(())
    }

    fn position(&self, id: EntryId) -> Option<usize> {
        if id.is_initial() {
            return None;
        }
        self.entries
            .binary_search_by_key(&id, HistoryEntry::id)
            .ok()
    }

    /// Number of applied entries, i.e. the index of the first pending one.
    fn done_count(&self) -> usize {
        self.entries
            .partition_point(|entry| entry.id() <= self.cursor)
    }
}

#[cfg(test)]
mod tests {
    use super::{History, HistoryError, MoveDirection};
    use crate::model::change::{ChangeError, ChangeRecord, ChangeResult, ChangeTarget};
    use crate::model::entry::EntryId;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    struct Columns {
        names: Vec<String>,
    }

    impl ChangeTarget for Columns {}

    struct AddColumn(&'static str);

    impl ChangeRecord<Columns> for AddColumn {
        fn apply(&self, target: &mut Columns) -> ChangeResult<()> {
            target.names.push(self.0.to_string());
            Ok(())
        }

        fn revert(&self, target: &mut Columns) -> ChangeResult<()> {
            match target.names.last() {
                Some(last) if last == self.0 => {
                    target.names.pop();
                    Ok(())
                }
                _ => Err(ChangeError::new("column_missing", self.0)),
            }
        }

        fn kind(&self) -> &str {
            "add_column"
        }
    }

    struct Broken {
        fail_apply: bool,
    }

    impl ChangeRecord<Columns> for Broken {
        fn apply(&self, target: &mut Columns) -> ChangeResult<()> {
            if self.fail_apply {
                return Err(ChangeError::new("broken", "apply"));
            }
            target.names.push("broken".to_string());
            Ok(())
        }

        fn revert(&self, _target: &mut Columns) -> ChangeResult<()> {
            Err(ChangeError::new("broken", "revert"))
        }
    }

    /// Applies once; every later apply fails.
    struct FailsOnReapply {
        applied: AtomicBool,
    }

    impl ChangeRecord<Columns> for FailsOnReapply {
        fn apply(&self, target: &mut Columns) -> ChangeResult<()> {
            if self.applied.swap(true, Ordering::SeqCst) {
                return Err(ChangeError::new("stale", "cannot reapply"));
            }
            target.names.push("once".to_string());
            Ok(())
        }

        fn revert(&self, target: &mut Columns) -> ChangeResult<()> {
            target.names.pop();
            Ok(())
        }
    }

    /// Target that records every apply/revert the engine performs.
    #[derive(Debug, Default)]
    struct Recorder {
        calls: Vec<(&'static str, String)>,
    }

    impl ChangeTarget for Recorder {
        fn apply_change(&mut self, record: &dyn ChangeRecord<Self>) -> ChangeResult<()> {
            self.calls.push(("apply", record.kind().to_string()));
            record.apply(self)
        }

        fn revert_change(&mut self, record: &dyn ChangeRecord<Self>) -> ChangeResult<()> {
            self.calls.push(("revert", record.kind().to_string()));
            record.revert(self)
        }
    }

    struct Step(&'static str);

    impl ChangeRecord<Recorder> for Step {
        fn apply(&self, _target: &mut Recorder) -> ChangeResult<()> {
            Ok(())
        }

        fn revert(&self, _target: &mut Recorder) -> ChangeResult<()> {
            Ok(())
        }

        fn kind(&self) -> &str {
            self.0
        }
    }

    fn history_with(names: &[&'static str]) -> (History<Columns>, Columns) {
        let mut history = History::new();
        let mut columns = Columns::default();
        for &name in names {
            history
                .commit(&mut columns, format!("add {name}"), Box::new(AddColumn(name)))
                .expect("commit should succeed");
        }
        (history, columns)
    }

    #[test]
    fn commit_assigns_increasing_ids_and_advances_cursor() {
        let (history, columns) = history_with(&["a", "b", "c"]);
        assert_eq!(history.len(), 3);
        assert_eq!(history.cursor(), EntryId(3));
        assert_eq!(columns.names, vec!["a", "b", "c"]);
        let ids: Vec<_> = history.done_entries().iter().map(|meta| meta.id).collect();
        assert_eq!(ids, vec![EntryId(1), EntryId(2), EntryId(3)]);
        assert_eq!(history.done_entries()[0].kind, "add_column");
    }

    #[test]
    fn move_to_current_cursor_is_noop() {
        let (mut history, mut columns) = history_with(&["a", "b"]);
        let before = columns.clone();
        let outcome = history
            .move_to(&mut columns, EntryId(2))
            .expect("noop move should succeed");
        assert!(outcome.is_noop());
        assert_eq!(columns, before);
        assert_eq!(history.cursor(), EntryId(2));
    }

    #[test]
    fn undo_reverts_in_descending_order() {
        let (mut history, mut columns) = history_with(&["a", "b", "c"]);
        let outcome = history
            .move_to(&mut columns, EntryId(1))
            .expect("undo should succeed");
        assert_eq!(outcome.direction, MoveDirection::Undo);
        assert_eq!(outcome.reverted, vec![EntryId(3), EntryId(2)]);
        assert_eq!(history.cursor(), EntryId(1));
        assert_eq!(columns.names, vec!["a"]);
        assert_eq!(history.pending_entries().len(), 2);
    }

    #[test]
    fn redo_applies_in_ascending_order() {
        let (mut history, mut columns) = history_with(&["a", "b", "c"]);
        history
            .move_to(&mut columns, EntryId::INITIAL)
            .expect("undo all should succeed");
        assert!(columns.names.is_empty());

        let outcome = history
            .move_to(&mut columns, EntryId(3))
            .expect("redo should succeed");
        assert_eq!(outcome.applied, vec![EntryId(1), EntryId(2), EntryId(3)]);
        assert_eq!(columns.names, vec!["a", "b", "c"]);
    }

    #[test]
    fn unknown_entry_leaves_cursor_unchanged() {
        let (mut history, mut columns) = history_with(&["a", "b", "c"]);
        let err = history
            .move_to(&mut columns, EntryId(99))
            .expect_err("unknown id must fail");
        assert_eq!(err, HistoryError::UnknownEntry(EntryId(99)));
        assert!(err.is_recoverable());
        assert_eq!(history.cursor(), EntryId(3));
        assert!(!history.is_corrupted());
    }

    #[test]
    fn commit_after_undo_discards_pending_tail_without_reusing_ids() {
        let (mut history, mut columns) = history_with(&["a", "b", "c"]);
        history
            .move_to(&mut columns, EntryId(1))
            .expect("undo should succeed");

        let meta = history
            .commit(&mut columns, "add d", Box::new(AddColumn("d")))
            .expect("commit should succeed");
        assert_eq!(meta.id, EntryId(4));
        assert_eq!(history.cursor(), EntryId(4));
        assert!(history.entry(EntryId(2)).is_none());
        assert!(history.entry(EntryId(3)).is_none());
        assert!(history.pending_entries().is_empty());
        assert_eq!(history.preceding_entry_id(EntryId(4)), Some(EntryId(1)));
        assert_eq!(columns.names, vec!["a", "d"]);
    }

    #[test]
    fn undo_and_redo_step_over_id_gaps() {
        let (mut history, mut columns) = history_with(&["a", "b"]);
        history.undo(&mut columns).expect("undo should succeed");
        history
            .commit(&mut columns, "add c", Box::new(AddColumn("c")))
            .expect("commit should succeed");

        let outcome = history.undo(&mut columns).expect("undo should succeed");
        assert_eq!(outcome.to, EntryId(1));
        let outcome = history.redo(&mut columns).expect("redo should succeed");
        assert_eq!(outcome.to, EntryId(3));
        let outcome = history.redo(&mut columns).expect("redo at tip is a noop");
        assert!(outcome.is_noop());
    }

    #[test]
    fn rejected_commit_keeps_history_and_pending_tail() {
        let (mut history, mut columns) = history_with(&["a", "b"]);
        history.undo(&mut columns).expect("undo should succeed");

        let err = history
            .commit(&mut columns, "broken", Box::new(Broken { fail_apply: true }))
            .expect_err("failing apply must be rejected");
        assert!(matches!(err, HistoryError::ChangeRejected { .. }));
        assert_eq!(history.len(), 2);
        assert_eq!(history.cursor(), EntryId(1));
        assert_eq!(history.pending_entries().len(), 1);
    }

    #[test]
    fn failed_revert_stops_cursor_and_corrupts_history() {
        let mut history = History::new();
        let mut columns = Columns::default();
        history
            .commit(&mut columns, "add a", Box::new(AddColumn("a")))
            .expect("commit a");
        history
            .commit(&mut columns, "broken", Box::new(Broken { fail_apply: false }))
            .expect("commit broken");
        history
            .commit(&mut columns, "add c", Box::new(AddColumn("c")))
            .expect("commit c");

        let err = history
            .move_to(&mut columns, EntryId::INITIAL)
            .expect_err("revert of broken entry must fail");
        match err {
            HistoryError::HistoryCorruption {
                direction,
                reached,
                failed_entry,
                ..
            } => {
                assert_eq!(direction, MoveDirection::Undo);
                assert_eq!(reached, EntryId(2));
                assert_eq!(failed_entry, EntryId(2));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(history.cursor(), EntryId(2));
        assert!(history.is_corrupted());

        let err = history
            .move_to(&mut columns, EntryId(3))
            .expect_err("corrupted history must refuse work");
        assert_eq!(
            err,
            HistoryError::Corrupted {
                cursor: EntryId(2)
            }
        );
    }

    #[test]
    fn last_done_entries_returns_recent_window() {
        let (mut history, mut columns) = history_with(&["a", "b", "c", "d"]);
        history
            .move_to(&mut columns, EntryId(3))
            .expect("undo should succeed");
        let recent: Vec<_> = history
            .last_done_entries(2)
            .into_iter()
            .map(|meta| meta.id)
            .collect();
        assert_eq!(recent, vec![EntryId(2), EntryId(3)]);
        assert_eq!(history.last_done_entries(10).len(), 3);
    }

    #[test]
    fn preceding_entry_id_handles_edges() {
        let (history, _) = history_with(&["a", "b"]);
        assert_eq!(history.preceding_entry_id(EntryId(1)), Some(EntryId::INITIAL));
        assert_eq!(history.preceding_entry_id(EntryId(2)), Some(EntryId(1)));
        assert_eq!(history.preceding_entry_id(EntryId::INITIAL), None);
        assert_eq!(history.preceding_entry_id(EntryId(9)), None);
    }

    #[test]
    fn target_sees_reverts_descending_and_applies_ascending() {
        let mut history = History::new();
        let mut recorder = Recorder::default();
        for label in ["first", "second", "third"] {
            history
                .commit(&mut recorder, label, Box::new(Step(label)))
                .expect("commit should succeed");
        }
        recorder.calls.clear();

        history
            .move_to(&mut recorder, EntryId(1))
            .expect("undo should succeed");
        assert_eq!(
            recorder.calls,
            vec![("revert", "third".to_string()), ("revert", "second".to_string())]
        );

        recorder.calls.clear();
        history
            .move_to(&mut recorder, EntryId(3))
            .expect("redo should succeed");
        assert_eq!(
            recorder.calls,
            vec![("apply", "second".to_string()), ("apply", "third".to_string())]
        );
    }

    #[test]
    fn failed_reapply_stops_cursor_at_last_applied_entry() {
        let mut history = History::new();
        let mut columns = Columns::default();
        history
            .commit(&mut columns, "add a", Box::new(AddColumn("a")))
            .expect("commit a");
        history
            .commit(
                &mut columns,
                "once",
                Box::new(FailsOnReapply {
                    applied: AtomicBool::new(false),
                }),
            )
            .expect("commit once");
        history
            .commit(&mut columns, "add c", Box::new(AddColumn("c")))
            .expect("commit c");
        history
            .move_to(&mut columns, EntryId::INITIAL)
            .expect("undo all should succeed");

        let err = history
            .move_to(&mut columns, EntryId(3))
            .expect_err("reapply must fail");
        match err {
            HistoryError::HistoryCorruption {
                direction,
                reached,
                failed_entry,
                ..
            } => {
                assert_eq!(direction, MoveDirection::Redo);
                assert_eq!(reached, EntryId(1));
                assert_eq!(failed_entry, EntryId(2));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(history.cursor(), EntryId(1));
        assert_eq!(columns.names, vec!["a"]);
        assert!(history.is_corrupted());
    }
}
