//! Chart loading on top of the blob store

use std::sync::Arc;

use dashmap::DashMap;
use natal_core::{BirthData, PeriodTree, SubjectId};
use natal_store::ChartRepo;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::ContextError;
use crate::oracle::ChartOracle;

/// A decoded chart and the generation it was read at
#[derive(Debug, Clone)]
pub struct LoadedChart {
    pub chart: Arc<Value>,
    pub generation: i64,
}

struct CachedTree {
    generation: i64,
    tree: Arc<PeriodTree>,
}

pub struct ChartService {
    repo: ChartRepo,
    oracle: Arc<dyn ChartOracle>,
    trees: DashMap<SubjectId, CachedTree>,
}

impl ChartService {
    pub fn new(repo: ChartRepo, oracle: Arc<dyn ChartOracle>) -> Self {
        Self {
            repo,
            oracle,
            trees: DashMap::new(),
        }
    }

    pub fn repo(&self) -> &ChartRepo {
        &self.repo
    }

    /// Compute and store a chart for new or changed birth data.
    ///
    /// Bumps the generation and drops every summary derived from the old chart.
    pub async fn onboard(&self, subject: &SubjectId, birth: &BirthData) -> Result<i64, ContextError> {
        let chart = self.oracle.compute_chart(birth).await?;
        self.store(subject, birth, &chart)
    }

    /// Store an already computed chart as the subject's new generation
    pub fn store(
        &self,
        subject: &SubjectId,
        birth: &BirthData,
        chart: &Value,
    ) -> Result<i64, ContextError> {
        let generation = self.repo.replace(subject, birth, chart)?;
        self.trees.remove(subject);
        Ok(generation)
    }

    /// Read the stored chart, recomputing it from birth data when the blob
    /// is missing or unreadable
    pub async fn load(&self, subject: &SubjectId) -> Result<LoadedChart, ContextError> {
        // generation first: a concurrent replace then makes us look stale, never fresh
        let generation = self.repo.generation(subject)?;
        if let (Some(generation), Some(chart)) = (generation, self.repo.get(subject)?) {
            return Ok(LoadedChart {
                chart: Arc::new(chart),
                generation,
            });
        }

        let birth = self
            .repo
            .birth_data(subject)?
            .ok_or_else(|| ContextError::NoBirthData(subject.clone()))?;
        info!(subject = %subject, "recomputing chart from stored birth data");
        let chart = self.oracle.compute_chart(&birth).await?;
        self.repo.put(subject, &chart)?;
        let generation = self
            .repo
            .generation(subject)?
            .ok_or_else(|| ContextError::NoBirthData(subject.clone()))?;
        Ok(LoadedChart {
            chart: Arc::new(chart),
            generation,
        })
    }

    /// Parsed period tree, cached per subject until the generation changes
    pub async fn period_tree(&self, subject: &SubjectId) -> Result<Arc<PeriodTree>, ContextError> {
        let current = self.repo.generation(subject)?;
        if let (Some(generation), Some(cached)) = (current, self.trees.get(subject)) {
            if cached.generation == generation {
                debug!(subject = %subject, generation, "period tree cache hit");
                return Ok(Arc::clone(&cached.tree));
            }
        }

        let loaded = self.load(subject).await?;
        let tree = Arc::new(PeriodTree::from_chart(&loaded.chart));
        self.trees.insert(
            subject.clone(),
            CachedTree {
                generation: loaded.generation,
                tree: Arc::clone(&tree),
            },
        );
        Ok(tree)
    }

    /// Forget the cached period tree for `subject`
    pub fn invalidate(&self, subject: &SubjectId) {
        self.trees.remove(subject);
    }
}
