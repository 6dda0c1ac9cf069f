//! History journal contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist entry metadata and the cursor so history survives a restart.
//! - Mirror the engine's "commit discards the redo tail" rule in storage.
//!
//! # Invariants
//! - Change payloads are never stored; they belong to the data model.
//! - A stored cursor is 0 or the id of a stored entry.
//! - Loaded entries are sorted by id.

use crate::db::DbError;
use crate::model::entry::{now_epoch_ms, EntryId, EntryMeta};
use crate::project::ProjectId;
use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type JournalResult<T> = Result<T, JournalError>;

#[derive(Debug)]
pub enum JournalError {
    Db(DbError),
    /// Cursor update names an entry the journal does not hold.
    UnknownEntry(EntryId),
    InvalidData(String),
}

impl Display for JournalError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::UnknownEntry(id) => write!(f, "journal has no entry {id}"),
            Self::InvalidData(message) => write!(f, "invalid journal data: {message}"),
        }
    }
}

impl Error for JournalError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::UnknownEntry(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for JournalError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for JournalError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Persisted state of one project's history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JournalSnapshot {
    pub entries: Vec<EntryMeta>,
    pub cursor: EntryId,
}

impl JournalSnapshot {
    pub fn done_entries(&self) -> impl Iterator<Item = &EntryMeta> {
        self.entries.iter().filter(|entry| entry.id <= self.cursor)
    }

    pub fn pending_entries(&self) -> impl Iterator<Item = &EntryMeta> {
        self.entries.iter().filter(|entry| entry.id > self.cursor)
    }
}

/// Persistence collaborator for history metadata.
pub trait HistoryJournal {
    /// Stores a newly committed entry, drops the stored redo tail and moves
    /// the stored cursor to the new entry.
    fn record_commit(&self, project_id: ProjectId, entry: &EntryMeta) -> JournalResult<()>;
    /// Stores a cursor move produced by undo/redo.
    fn record_cursor(&self, project_id: ProjectId, cursor: EntryId) -> JournalResult<()>;
    fn load(&self, project_id: ProjectId) -> JournalResult<JournalSnapshot>;
    /// Removes every row of one project.
    fn forget(&self, project_id: ProjectId) -> JournalResult<()>;
}

/// SQLite-backed journal over a migrated connection.
pub struct SqliteHistoryJournal<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteHistoryJournal<'conn> {
    /// Wraps a connection returned by `db::open_db*`.
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn stored_cursor(&self, project_id: &str) -> JournalResult<EntryId> {
        let cursor = self
            .conn
            .query_row(
                "SELECT last_done_id FROM history_cursors WHERE project_id = ?1",
                [project_id],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        cursor.map_or(Ok(EntryId::INITIAL), to_entry_id)
    }

    fn write_cursor(&self, project_id: &str, cursor: EntryId) -> JournalResult<()> {
        self.conn.execute(
            "INSERT INTO history_cursors (project_id, last_done_id, updated_at_ms)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(project_id) DO UPDATE SET
                last_done_id = excluded.last_done_id,
                updated_at_ms = excluded.updated_at_ms",
            params![project_id, to_sql_id(cursor)?, now_epoch_ms()],
        )?;
        Ok(())
    }
}

impl HistoryJournal for SqliteHistoryJournal<'_> {
    fn record_commit(&self, project_id: ProjectId, entry: &EntryMeta) -> JournalResult<()> {
        let key = project_id.to_string();
        let tx = self.conn.unchecked_transaction()?;

        let cursor = self.stored_cursor(&key)?;
        if entry.id <= cursor {
            return Err(JournalError::InvalidData(format!(
                "entry {} does not follow stored cursor {}",
                entry.id, cursor
            )));
        }
        let discarded = self.conn.execute(
            "DELETE FROM history_entries WHERE project_id = ?1 AND entry_id > ?2",
            params![key, to_sql_id(cursor)?],
        )?;
        self.conn.execute(
            "INSERT INTO history_entries (project_id, entry_id, description, kind, created_at_ms)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                key,
                to_sql_id(entry.id)?,
                entry.description,
                entry.kind,
                entry.created_at_ms
            ],
        )?;
        self.write_cursor(&key, entry.id)?;
        tx.commit()?;

        info!(
            "event=journal_commit module=journal status=ok project_id={} entry_id={} discarded={}",
            project_id, entry.id, discarded
        );
        Ok(())
    }

    fn record_cursor(&self, project_id: ProjectId, cursor: EntryId) -> JournalResult<()> {
        let key = project_id.to_string();
        if !cursor.is_initial() {
            let exists: bool = self.conn.query_row(
                "SELECT EXISTS(
                    SELECT 1 FROM history_entries WHERE project_id = ?1 AND entry_id = ?2
                )",
                params![key, to_sql_id(cursor)?],
                |row| row.get(0),
            )?;
            if !exists {
                return Err(JournalError::UnknownEntry(cursor));
            }
        }
        self.write_cursor(&key, cursor)?;
        debug!(
            "event=journal_cursor module=journal status=ok project_id={} cursor={}",
            project_id, cursor
        );
        Ok(())
    }

    fn load(&self, project_id: ProjectId) -> JournalResult<JournalSnapshot> {
        let key = project_id.to_string();
        let mut stmt = self.conn.prepare(
            "SELECT entry_id, description, kind, created_at_ms
             FROM history_entries
             WHERE project_id = ?1
             ORDER BY entry_id ASC",
        )?;
        let rows = stmt.query_map([key.as_str()], read_entry_row)?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(row??);
        }

        let cursor = self.stored_cursor(&key)?;
        if !cursor.is_initial() && !entries.iter().any(|entry| entry.id == cursor) {
            return Err(JournalError::InvalidData(format!(
                "cursor {cursor} has no matching entry"
            )));
        }
        Ok(JournalSnapshot { entries, cursor })
    }

    fn forget(&self, project_id: ProjectId) -> JournalResult<()> {
        let key = project_id.to_string();
        let tx = self.conn.unchecked_transaction()?;
        self.conn
            .execute("DELETE FROM history_entries WHERE project_id = ?1", [&key])?;
        self.conn
            .execute("DELETE FROM history_cursors WHERE project_id = ?1", [&key])?;
        tx.commit()?;
        Ok(())
    }
}

fn read_entry_row(row: &Row<'_>) -> rusqlite::Result<JournalResult<EntryMeta>> {
    let raw_id: i64 = row.get(0)?;
    let description: String = row.get(1)?;
    let kind: String = row.get(2)?;
    let created_at_ms: i64 = row.get(3)?;
    Ok(to_entry_id(raw_id).map(|id| EntryMeta {
        id,
        description,
        kind,
        created_at_ms,
    }))
}

fn to_entry_id(raw: i64) -> JournalResult<EntryId> {
    u64::try_from(raw)
        .map(EntryId)
        .map_err(|_| JournalError::InvalidData(format!("negative entry id {raw}")))
}

fn to_sql_id(id: EntryId) -> JournalResult<i64> {
    i64::try_from(id.get())
        .map_err(|_| JournalError::InvalidData(format!("entry id {id} exceeds storage range")))
}
