//! Append-only chat log plus the single mutable digest row per subject.

use chrono::{SubsecRound, Utc};
use natal_core::{ChatMessage, Role, SubjectId};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::database::Database;
use crate::error::StoreError;
use crate::rows::{format_ts, parse_enum, parse_ts, sentinel_ts};

const COLUMNS: &str = "id, subject_id, role, text, created_at, is_compacted";

#[derive(Clone)]
pub struct MessageRepo {
    db: Database,
}

impl MessageRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Append one user or assistant message
    pub fn append(
        &self,
        subject: &SubjectId,
        role: Role,
        text: &str,
    ) -> Result<ChatMessage, StoreError> {
        if role == Role::Summary {
            return Err(StoreError::InvalidInput(
                "summary messages are written by compaction only".to_string(),
            ));
        }
        self.db.with_conn(|conn| insert_message(conn, subject, role, text))
    }

    /// Append a user/assistant pair atomically, in that order
    pub fn append_turn(
        &self,
        subject: &SubjectId,
        user_text: &str,
        assistant_text: &str,
    ) -> Result<(ChatMessage, ChatMessage), StoreError> {
        self.db.with_tx(|tx| {
            let user = insert_message(tx, subject, Role::User, user_text)?;
            let assistant = insert_message(tx, subject, Role::Assistant, assistant_text)?;
            Ok((user, assistant))
        })
    }

    /// Live (not yet compacted) user/assistant messages, oldest first
    pub fn uncompacted(&self, subject: &SubjectId) -> Result<Vec<ChatMessage>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM chat_messages
                 WHERE subject_id = ?1 AND role != 'summary' AND is_compacted = 0
                 ORDER BY id"
            ))?;
            let rows = stmt
                .query_map([subject.as_str()], row_to_message)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn count_uncompacted(&self, subject: &SubjectId) -> Result<usize, StoreError> {
        self.db.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM chat_messages
                 WHERE subject_id = ?1 AND role != 'summary' AND is_compacted = 0",
                [subject.as_str()],
                |row| row.get(0),
            )?;
            Ok(count as usize)
        })
    }

    /// The rolling digest, if compaction has run for this subject
    pub fn digest(&self, subject: &SubjectId) -> Result<Option<ChatMessage>, StoreError> {
        self.db.with_conn(|conn| {
            Ok(conn
                .query_row(
                    &format!(
                        "SELECT {COLUMNS} FROM chat_messages WHERE subject_id = ?1 AND role = 'summary'"
                    ),
                    [subject.as_str()],
                    row_to_message,
                )
                .optional()?)
        })
    }

    /// Digest (if any) followed by every live message in insertion order.
    /// Row ids decide the order; `created_at` is wall-clock and may step back.
    pub fn conversation(&self, subject: &SubjectId) -> Result<Vec<ChatMessage>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM chat_messages
                 WHERE subject_id = ?1 AND (role = 'summary' OR is_compacted = 0)
                 ORDER BY role != 'summary', id"
            ))?;
            let rows = stmt
                .query_map([subject.as_str()], row_to_message)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Full log including compacted messages, newest last
    pub fn history(&self, subject: &SubjectId, limit: usize) -> Result<Vec<ChatMessage>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM (
                    SELECT {COLUMNS} FROM chat_messages
                    WHERE subject_id = ?1 AND role != 'summary'
                    ORDER BY id DESC LIMIT ?2
                 ) ORDER BY id"
            ))?;
            let rows = stmt
                .query_map(params![subject.as_str(), limit as i64], row_to_message)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Commit one compaction run.
    ///
    /// Marks every live message with `id <= through_id` compacted and upserts
    /// the subject's digest row, in one transaction. Returns how many messages
    /// were marked.
    pub fn apply_compaction(
        &self,
        subject: &SubjectId,
        through_id: i64,
        digest_text: &str,
    ) -> Result<usize, StoreError> {
        self.db.with_tx(|tx| {
            let marked = tx.execute(
                "UPDATE chat_messages SET is_compacted = 1
                 WHERE subject_id = ?1 AND role != 'summary' AND is_compacted = 0 AND id <= ?2",
                params![subject.as_str(), through_id],
            )?;
            tx.execute(
                "INSERT INTO chat_messages (subject_id, role, text, created_at, is_compacted)
                 VALUES (?1, 'summary', ?2, ?3, 0)
                 ON CONFLICT(subject_id) WHERE role = 'summary' DO UPDATE SET text = excluded.text",
                params![subject.as_str(), digest_text, format_ts(sentinel_ts())],
            )?;
            Ok(marked)
        })
    }
}

fn insert_message(
    conn: &Connection,
    subject: &SubjectId,
    role: Role,
    text: &str,
) -> Result<ChatMessage, StoreError> {
    let created_at = Utc::now().trunc_subsecs(6);
    conn.execute(
        "INSERT INTO chat_messages (subject_id, role, text, created_at, is_compacted)
         VALUES (?1, ?2, ?3, ?4, 0)",
        params![subject.as_str(), role.as_str(), text, format_ts(created_at)],
    )?;

    Ok(ChatMessage {
        id: conn.last_insert_rowid(),
        subject_id: subject.clone(),
        role,
        text: text.to_string(),
        created_at,
        is_compacted: false,
    })
}

fn row_to_message(row: &Row<'_>) -> rusqlite::Result<ChatMessage> {
    let subject_id: String = row.get(1)?;
    let role: String = row.get(2)?;
    let created_at: String = row.get(4)?;

    Ok(ChatMessage {
        id: row.get(0)?,
        subject_id: SubjectId::new(subject_id),
        role: parse_enum(2, &role)?,
        text: row.get(3)?,
        created_at: parse_ts(4, &created_at)?,
        is_compacted: row.get(5)?,
    })
}
