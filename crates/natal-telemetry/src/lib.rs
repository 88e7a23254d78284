//! Paths, JSONL records and token estimation shared by the natal crates

mod io;
mod paths;
mod tokens;
mod types;

pub use io::{append_jsonl, atomic_write, read_jsonl};
pub use paths::{Paths, HOME_ENV};
pub use tokens::estimate_tokens;
pub use types::TurnRecord;
