//! Seam to the external astronomical computation

use async_trait::async_trait;
use natal_core::BirthData;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("chart computation failed: {0}")]
    Failed(String),
}

/// Computes a full raw chart from birth data
#[async_trait]
pub trait ChartOracle: Send + Sync {
    async fn compute_chart(&self, birth: &BirthData) -> Result<Value, OracleError>;
}

/// Oracle that hands back a chart computed elsewhere, e.g. an imported file
pub struct PrecomputedOracle {
    chart: Option<Value>,
}

impl PrecomputedOracle {
    pub fn new(chart: Value) -> Self {
        Self { chart: Some(chart) }
    }

    /// An oracle with nothing to hand out; every computation fails
    pub fn unavailable() -> Self {
        Self { chart: None }
    }
}

#[async_trait]
impl ChartOracle for PrecomputedOracle {
    async fn compute_chart(&self, _birth: &BirthData) -> Result<Value, OracleError> {
        self.chart
            .clone()
            .ok_or_else(|| OracleError::Failed("no chart computation backend configured".to_string()))
    }
}
