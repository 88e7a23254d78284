//! SQLite persistence: compressed chart blobs, topic summaries and chat history

pub mod charts;
pub mod codec;
mod database;
mod error;
pub mod messages;
mod rows;
mod schema;
pub mod summaries;

pub use charts::{BlobStats, ChartRepo};
pub use codec::{decode_chart, encode_chart};
pub use database::Database;
pub use error::StoreError;
pub use messages::MessageRepo;
pub use summaries::SummaryRepo;
