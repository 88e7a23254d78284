//! Keyed summary cache with background derivation.
//!
//! A lookup never waits on the summarizer. Fresh summaries are served from
//! the store; for everything else the raw chart slice goes back to the
//! caller and a derivation is scheduled, at most one per (subject, key).

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use natal_core::{CacheConfig, SubjectId, SummaryRecord, TopicKey};
use natal_store::SummaryRepo;
use natal_summarize::prompt::instruction_for;
use natal_summarize::Summarizer;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::charts::ChartService;
use crate::error::ContextError;
use crate::extract::extract;
use crate::flight::InFlight;
use crate::tasks::BackgroundTasks;

/// What a single key resolved to: a summary on a hit, the raw slice on a miss
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolved {
    pub key: TopicKey,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_slice: Option<Value>,
}

impl Resolved {
    pub fn is_hit(&self) -> bool {
        self.summary.is_some()
    }
}

pub struct SummaryCache {
    summaries: SummaryRepo,
    charts: Arc<ChartService>,
    summarizer: Arc<dyn Summarizer>,
    tasks: BackgroundTasks,
    in_flight: InFlight<(SubjectId, TopicKey)>,
    config: CacheConfig,
}

impl SummaryCache {
    pub fn new(
        summaries: SummaryRepo,
        charts: Arc<ChartService>,
        summarizer: Arc<dyn Summarizer>,
        tasks: BackgroundTasks,
        config: CacheConfig,
    ) -> Self {
        Self {
            summaries,
            charts,
            summarizer,
            tasks,
            in_flight: InFlight::new(),
            config,
        }
    }

    /// Resolve every requested key, in key order
    pub async fn resolve(
        &self,
        subject: &SubjectId,
        keys: &BTreeSet<TopicKey>,
    ) -> Result<Vec<Resolved>, ContextError> {
        self.resolve_at(subject, keys, Utc::now()).await
    }

    /// Resolve against an explicit clock. `now` decides freshness, picks the
    /// active dasha, and is the start of the TTL for summaries derived from
    /// this call.
    pub async fn resolve_at(
        &self,
        subject: &SubjectId,
        keys: &BTreeSet<TopicKey>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Resolved>, ContextError> {
        let wanted: Vec<TopicKey> = keys.iter().copied().collect();
        let stored = self.summaries.get_many(subject, &wanted)?;

        let mut resolved = Vec::with_capacity(wanted.len());
        let mut missing = Vec::new();
        for key in wanted {
            match stored.get(&key) {
                Some(record) if record.is_fresh(now) => resolved.push(Resolved {
                    key,
                    summary: Some(record.text.clone()),
                    raw_slice: None,
                }),
                _ => missing.push(key),
            }
        }

        if !missing.is_empty() {
            let loaded = self.charts.load(subject).await?;
            for key in missing {
                let raw_slice = extract(key, &loaded.chart, now);
                match &raw_slice {
                    Some(slice) => {
                        self.schedule_derivation(subject, key, slice.clone(), loaded.generation, now)
                    }
                    None => debug!(subject = %subject, %key, "chart has no section for key"),
                }
                resolved.push(Resolved {
                    key,
                    summary: None,
                    raw_slice,
                });
            }
            resolved.sort_by_key(|r| r.key);
        }

        debug!(
            subject = %subject,
            requested = resolved.len(),
            hits = resolved.iter().filter(|r| r.is_hit()).count(),
            "summaries resolved"
        );
        Ok(resolved)
    }

    /// Drop every stored summary of `subject`
    pub fn invalidate(&self, subject: &SubjectId) -> Result<usize, ContextError> {
        self.charts.invalidate(subject);
        Ok(self.summaries.delete_for_subject(subject)?)
    }

    /// Drop records whose expiry is at or before `now`
    pub fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, ContextError> {
        let purged = self.summaries.purge_expired(now)?;
        if purged > 0 {
            info!(purged, "expired summaries removed");
        }
        Ok(purged)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    fn schedule_derivation(
        &self,
        subject: &SubjectId,
        key: TopicKey,
        slice: Value,
        generation: i64,
        requested_at: DateTime<Utc>,
    ) {
        let Some(guard) = self.in_flight.try_claim((subject.clone(), key)) else {
            debug!(subject = %subject, %key, "derivation already in flight");
            return;
        };

        let summaries = self.summaries.clone();
        let summarizer = Arc::clone(&self.summarizer);
        let expires_at = self.config.expiry_for(key, requested_at);
        let subject = subject.clone();
        self.tasks.spawn("derive_summary", async move {
            let _guard = guard;
            let text = match summarizer.summarize(instruction_for(key), &slice).await {
                Ok(text) => text,
                Err(e) => {
                    warn!(subject = %subject, %key, error = %e, "summary derivation failed");
                    return;
                }
            };

            let now = Utc::now();
            let record = SummaryRecord {
                subject_id: subject.clone(),
                topic_key: key,
                text,
                created_at: now,
                updated_at: now,
                expires_at,
            };
            match summaries.upsert_for_generation(&record, generation) {
                Ok(true) => info!(subject = %subject, %key, summarizer = summarizer.name(), "summary stored"),
                Ok(false) => debug!(subject = %subject, %key, generation, "chart regenerated, discarding summary"),
                Err(e) => warn!(subject = %subject, %key, error = %e, "failed to store summary"),
            }
        });
    }
}
