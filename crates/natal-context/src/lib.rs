//! Chart-grounded conversation context: the keyed summary cache, the
//! conversation window manager and per-turn assembly

pub mod assemble;
pub mod cache;
pub mod charts;
mod error;
pub mod extract;
mod flight;
pub mod oracle;
mod tasks;
pub mod window;

pub use assemble::{TurnAssembler, TurnContext, TurnRequest};
pub use cache::{Resolved, SummaryCache};
pub use charts::{ChartService, LoadedChart};
pub use error::ContextError;
pub use flight::{FlightGuard, InFlight};
pub use oracle::{ChartOracle, OracleError, PrecomputedOracle};
pub use tasks::BackgroundTasks;
pub use window::{AppendOutcome, CompactionOutcome, WindowManager};
