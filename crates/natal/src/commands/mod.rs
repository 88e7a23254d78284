pub mod compact;
pub mod history;
pub mod import;
pub mod init;
pub mod periods;
pub mod report;
pub mod resolve;
pub mod status;
pub mod turn;

use std::sync::Arc;
use std::time::Duration;

use natal_context::{ChartOracle, PrecomputedOracle, TurnAssembler};
use natal_core::Config;
use natal_store::Database;
use natal_summarize::{AnthropicSummarizer, ExtractiveSummarizer, Summarizer};
use natal_telemetry::Paths;
use tracing::{info, warn};

/// How long a command waits for background summaries and compactions on exit
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything a command needs, opened from `~/.natal`
pub struct App {
    pub config: Config,
    pub db: Database,
    pub assembler: TurnAssembler,
}

impl App {
    /// Open with no chart computation backend; stored charts only
    pub fn open() -> anyhow::Result<Self> {
        Self::open_with(Paths::new()?, Arc::new(PrecomputedOracle::unavailable()))
    }

    pub fn open_with(paths: Paths, oracle: Arc<dyn ChartOracle>) -> anyhow::Result<Self> {
        let config = Config::load(&paths.config_file())?;
        let db = Database::open(&paths.database_file())?;
        let summarizer = select_summarizer(&config);

        let mut assembler = TurnAssembler::new(db.clone(), oracle, summarizer, &config);
        if config.telemetry {
            assembler = assembler.with_telemetry(paths.turns_file());
        }

        Ok(Self {
            config,
            db,
            assembler,
        })
    }

    /// Let background work land before the process exits
    pub async fn finish(self) {
        if !self.assembler.drain(DRAIN_TIMEOUT).await {
            warn!("exiting with background work unfinished");
        }
    }
}

fn select_summarizer(config: &Config) -> Arc<dyn Summarizer> {
    match AnthropicSummarizer::from_env(config.summarizer.clone()) {
        Some(summarizer) => {
            info!(model = %config.summarizer.model, "using Anthropic summarizer");
            Arc::new(summarizer)
        }
        None => {
            info!("ANTHROPIC_API_KEY not set, using extractive summarizer");
            Arc::new(ExtractiveSummarizer::new(
                config.summarizer.extractive_sentences,
            ))
        }
    }
}
