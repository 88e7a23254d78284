//! Compressed raw-chart blobs, one per subject.
//!
//! The chart itself is opaque here. Beside the blob the row keeps a few
//! uncompressed header fields: the birth data it was computed from and a
//! generation counter bumped on every regeneration.

use chrono::Utc;
use natal_core::{BirthData, SubjectId};
use rusqlite::{params, OptionalExtension};
use serde_json::Value;
use tracing::{info, warn};

use crate::codec::{decode_chart, encode_chart};
use crate::database::Database;
use crate::error::StoreError;
use crate::rows::{format_ts, parse_ts};

/// Size accounting for a stored chart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlobStats {
    pub raw_bytes: i64,
    pub stored_bytes: i64,
    pub generation: i64,
}

impl BlobStats {
    pub fn ratio(&self) -> f64 {
        if self.raw_bytes == 0 {
            return 1.0;
        }
        self.stored_bytes as f64 / self.raw_bytes as f64
    }
}

#[derive(Clone)]
pub struct ChartRepo {
    db: Database,
}

impl ChartRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Store the chart blob, keeping any existing birth data and generation
    pub fn put(&self, subject: &SubjectId, chart: &Value) -> Result<(), StoreError> {
        let payload = encode_chart(chart)?;
        let raw_bytes = serde_json::to_vec(chart)?.len() as i64;
        let now = format_ts(Utc::now());

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO charts (subject_id, payload, raw_bytes, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(subject_id) DO UPDATE SET
                    payload = excluded.payload,
                    raw_bytes = excluded.raw_bytes,
                    updated_at = excluded.updated_at",
                params![subject.as_str(), payload, raw_bytes, now],
            )?;
            Ok(())
        })
    }

    /// Decompressed chart, or `None` when absent or undecodable
    pub fn get(&self, subject: &SubjectId) -> Result<Option<Value>, StoreError> {
        let payload: Option<Vec<u8>> = self.db.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT payload FROM charts WHERE subject_id = ?1",
                    [subject.as_str()],
                    |row| row.get(0),
                )
                .optional()?)
        })?;

        let Some(payload) = payload else {
            return Ok(None);
        };
        match decode_chart(&payload) {
            Ok(chart) => Ok(Some(chart)),
            Err(e) => {
                warn!(subject = %subject, error = %e, "stored chart is undecodable, treating as absent");
                Ok(None)
            }
        }
    }

    /// Regenerate wholesale from new birth data.
    ///
    /// Writes header and blob, bumps the generation and drops every derived
    /// summary of the subject in one transaction. Returns the new generation.
    pub fn replace(
        &self,
        subject: &SubjectId,
        birth: &BirthData,
        chart: &Value,
    ) -> Result<i64, StoreError> {
        let payload = encode_chart(chart)?;
        let raw_bytes = serde_json::to_vec(chart)?.len() as i64;
        let now = format_ts(Utc::now());

        let (generation, dropped) = self.db.with_tx(|tx| {
            tx.execute(
                "INSERT INTO charts
                    (subject_id, birth_instant, latitude, longitude, generation, payload, raw_bytes, updated_at)
                 VALUES (?1, ?2, ?3, ?4, 1, ?5, ?6, ?7)
                 ON CONFLICT(subject_id) DO UPDATE SET
                    birth_instant = excluded.birth_instant,
                    latitude = excluded.latitude,
                    longitude = excluded.longitude,
                    generation = charts.generation + 1,
                    payload = excluded.payload,
                    raw_bytes = excluded.raw_bytes,
                    updated_at = excluded.updated_at",
                params![
                    subject.as_str(),
                    format_ts(birth.instant),
                    birth.latitude,
                    birth.longitude,
                    payload,
                    raw_bytes,
                    now,
                ],
            )?;
            let dropped = tx.execute(
                "DELETE FROM summaries WHERE subject_id = ?1",
                [subject.as_str()],
            )?;
            let generation: i64 = tx.query_row(
                "SELECT generation FROM charts WHERE subject_id = ?1",
                [subject.as_str()],
                |row| row.get(0),
            )?;
            Ok((generation, dropped))
        })?;

        info!(subject = %subject, generation, dropped_summaries = dropped, "chart replaced");
        Ok(generation)
    }

    pub fn birth_data(&self, subject: &SubjectId) -> Result<Option<BirthData>, StoreError> {
        self.db.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT birth_instant, latitude, longitude FROM charts WHERE subject_id = ?1",
                    [subject.as_str()],
                    |row| {
                        let instant: Option<String> = row.get(0)?;
                        let latitude: Option<f64> = row.get(1)?;
                        let longitude: Option<f64> = row.get(2)?;
                        match (instant, latitude, longitude) {
                            (Some(instant), Some(latitude), Some(longitude)) => Ok(Some(BirthData {
                                instant: parse_ts(0, &instant)?,
                                latitude,
                                longitude,
                            })),
                            _ => Ok(None),
                        }
                    },
                )
                .optional()?;
            Ok(row.flatten())
        })
    }

    pub fn generation(&self, subject: &SubjectId) -> Result<Option<i64>, StoreError> {
        self.db.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT generation FROM charts WHERE subject_id = ?1",
                    [subject.as_str()],
                    |row| row.get(0),
                )
                .optional()?)
        })
    }

    pub fn stats(&self, subject: &SubjectId) -> Result<Option<BlobStats>, StoreError> {
        self.db.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT raw_bytes, length(payload), generation FROM charts WHERE subject_id = ?1",
                    [subject.as_str()],
                    |row| {
                        Ok(BlobStats {
                            raw_bytes: row.get(0)?,
                            stored_bytes: row.get(1)?,
                            generation: row.get(2)?,
                        })
                    },
                )
                .optional()?)
        })
    }

    /// Remove the chart and everything derived from it
    pub fn delete(&self, subject: &SubjectId) -> Result<bool, StoreError> {
        self.db.with_tx(|tx| {
            tx.execute(
                "DELETE FROM summaries WHERE subject_id = ?1",
                [subject.as_str()],
            )?;
            let removed = tx.execute(
                "DELETE FROM charts WHERE subject_id = ?1",
                [subject.as_str()],
            )?;
            Ok(removed > 0)
        })
    }
}
