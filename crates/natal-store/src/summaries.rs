use std::collections::HashMap;

use chrono::{DateTime, Utc};
use natal_core::{SubjectId, SummaryRecord, TopicKey};
use rusqlite::{params, OptionalExtension, Row};

use crate::database::Database;
use crate::error::StoreError;
use crate::rows::{format_ts, parse_enum, parse_ts};

const COLUMNS: &str = "subject_id, topic_key, text, created_at, updated_at, expires_at";

/// One row per (subject, topic key)
#[derive(Clone)]
pub struct SummaryRepo {
    db: Database,
}

impl SummaryRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Fetch whatever records exist for `keys` in a single query
    pub fn get_many(
        &self,
        subject: &SubjectId,
        keys: &[TopicKey],
    ) -> Result<HashMap<TopicKey, SummaryRecord>, StoreError> {
        if keys.is_empty() {
            return Ok(HashMap::new());
        }
        let records = self.list(subject)?;
        Ok(records
            .into_iter()
            .filter(|record| keys.contains(&record.topic_key))
            .map(|record| (record.topic_key, record))
            .collect())
    }

    pub fn get(
        &self,
        subject: &SubjectId,
        key: TopicKey,
    ) -> Result<Option<SummaryRecord>, StoreError> {
        self.db.with_conn(|conn| {
            Ok(conn
                .query_row(
                    &format!("SELECT {COLUMNS} FROM summaries WHERE subject_id = ?1 AND topic_key = ?2"),
                    params![subject.as_str(), key.as_str()],
                    row_to_record,
                )
                .optional()?)
        })
    }

    pub fn list(&self, subject: &SubjectId) -> Result<Vec<SummaryRecord>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM summaries WHERE subject_id = ?1 ORDER BY topic_key"
            ))?;
            let rows = stmt
                .query_map([subject.as_str()], row_to_record)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Insert or overwrite; `created_at` of an existing row is preserved
    pub fn upsert(&self, record: &SummaryRecord) -> Result<(), StoreError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO summaries (subject_id, topic_key, text, created_at, updated_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(subject_id, topic_key) DO UPDATE SET
                    text = excluded.text,
                    updated_at = excluded.updated_at,
                    expires_at = excluded.expires_at",
                record_params(record),
            )?;
            Ok(())
        })
    }

    /// Upsert only while the subject's chart is still at `generation`.
    ///
    /// Returns `false` when the chart was regenerated (or removed) since the
    /// summary's input was extracted; the record is then discarded.
    pub fn upsert_for_generation(
        &self,
        record: &SummaryRecord,
        generation: i64,
    ) -> Result<bool, StoreError> {
        let [subject_id, topic_key, text, created_at, updated_at, expires_at] =
            record_params(record);
        self.db.with_conn(|conn| {
            let changed = conn.execute(
                "INSERT INTO summaries (subject_id, topic_key, text, created_at, updated_at, expires_at)
                 SELECT ?1, ?2, ?3, ?4, ?5, ?6
                 WHERE EXISTS (SELECT 1 FROM charts WHERE subject_id = ?1 AND generation = ?7)
                 ON CONFLICT(subject_id, topic_key) DO UPDATE SET
                    text = excluded.text,
                    updated_at = excluded.updated_at,
                    expires_at = excluded.expires_at",
                params![subject_id, topic_key, text, created_at, updated_at, expires_at, generation],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn delete_for_subject(&self, subject: &SubjectId) -> Result<usize, StoreError> {
        self.db.with_conn(|conn| {
            Ok(conn.execute(
                "DELETE FROM summaries WHERE subject_id = ?1",
                [subject.as_str()],
            )?)
        })
    }

    /// Drop every record whose expiry has passed
    pub fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        self.db.with_conn(|conn| {
            Ok(conn.execute(
                "DELETE FROM summaries WHERE expires_at IS NOT NULL AND expires_at <= ?1",
                [format_ts(now)],
            )?)
        })
    }
}

fn record_params(record: &SummaryRecord) -> [Option<String>; 6] {
    [
        Some(record.subject_id.as_str().to_string()),
        Some(record.topic_key.as_str().to_string()),
        Some(record.text.clone()),
        Some(format_ts(record.created_at)),
        Some(format_ts(record.updated_at)),
        record.expires_at.map(format_ts),
    ]
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<SummaryRecord> {
    let subject_id: String = row.get(0)?;
    let topic_key: String = row.get(1)?;
    let created_at: String = row.get(3)?;
    let updated_at: String = row.get(4)?;
    let expires_at: Option<String> = row.get(5)?;

    Ok(SummaryRecord {
        subject_id: SubjectId::new(subject_id),
        topic_key: parse_enum(1, &topic_key)?,
        text: row.get(2)?,
        created_at: parse_ts(3, &created_at)?,
        updated_at: parse_ts(4, &updated_at)?,
        expires_at: expires_at.map(|raw| parse_ts(5, &raw)).transpose()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::ChartRepo;
    use chrono::{Duration, TimeZone};
    use natal_core::BirthData;
    use serde_json::json;

    fn record(subject: &str, key: TopicKey, text: &str) -> SummaryRecord {
        let now = Utc::now();
        SummaryRecord {
            subject_id: SubjectId::new(subject),
            topic_key: key,
            text: text.to_string(),
            created_at: now,
            updated_at: now,
            expires_at: None,
        }
    }

    fn birth() -> BirthData {
        BirthData {
            instant: Utc.with_ymd_and_hms(1988, 2, 3, 12, 0, 0).unwrap(),
            latitude: 51.5,
            longitude: -0.12,
        }
    }

    #[test]
    fn test_get_many_filters_keys() {
        let repo = SummaryRepo::new(Database::in_memory().unwrap());
        repo.upsert(&record("s1", TopicKey::Planets, "planets text")).unwrap();
        repo.upsert(&record("s1", TopicKey::Yogas, "yogas text")).unwrap();
        repo.upsert(&record("s2", TopicKey::Planets, "other subject")).unwrap();

        let found = repo
            .get_many(&SubjectId::new("s1"), &[TopicKey::Planets, TopicKey::Dasha])
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[&TopicKey::Planets].text, "planets text");
    }

    #[test]
    fn test_upsert_overwrites_and_keeps_created_at() {
        let repo = SummaryRepo::new(Database::in_memory().unwrap());
        let mut first = record("s1", TopicKey::Houses, "v1");
        first.created_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        repo.upsert(&first).unwrap();

        let mut second = record("s1", TopicKey::Houses, "v2");
        second.expires_at = Some(Utc::now() + Duration::days(3));
        repo.upsert(&second).unwrap();

        let stored = repo.get(&SubjectId::new("s1"), TopicKey::Houses).unwrap().unwrap();
        assert_eq!(stored.text, "v2");
        assert_eq!(stored.created_at, first.created_at);
        assert!(stored.expires_at.is_some());
        assert_eq!(repo.list(&SubjectId::new("s1")).unwrap().len(), 1);
    }

    #[test]
    fn test_upsert_for_generation_rejects_stale() {
        let db = Database::in_memory().unwrap();
        let charts = ChartRepo::new(db.clone());
        let repo = SummaryRepo::new(db);
        let subject = SubjectId::new("s1");

        charts.replace(&subject, &birth(), &json!({"v": 1})).unwrap();
        assert!(repo
            .upsert_for_generation(&record("s1", TopicKey::Dasha, "gen1"), 1)
            .unwrap());

        charts.replace(&subject, &birth(), &json!({"v": 2})).unwrap();
        assert!(!repo
            .upsert_for_generation(&record("s1", TopicKey::Dasha, "late gen1"), 1)
            .unwrap());
        assert!(repo.get(&subject, TopicKey::Dasha).unwrap().is_none());
    }

    #[test]
    fn test_purge_expired() {
        let repo = SummaryRepo::new(Database::in_memory().unwrap());
        let now = Utc::now();
        let mut stale = record("s1", TopicKey::Dasha, "stale");
        stale.expires_at = Some(now - Duration::hours(1));
        repo.upsert(&stale).unwrap();
        repo.upsert(&record("s1", TopicKey::Planets, "forever")).unwrap();

        assert_eq!(repo.purge_expired(now).unwrap(), 1);
        let left = repo.list(&SubjectId::new("s1")).unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].topic_key, TopicKey::Planets);
    }
}
