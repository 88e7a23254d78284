//! Domain types, configuration and the planetary period engine

mod config;
pub mod periods;
mod types;

pub use config::{CacheConfig, Config, SummarizerConfig, WindowConfig};
pub use periods::{CurrentPeriod, PeriodLevel, PeriodNode, PeriodSpan, PeriodTree};
pub use types::{BirthData, ChatMessage, ParseError, Role, SubjectId, SummaryRecord, TopicKey};
