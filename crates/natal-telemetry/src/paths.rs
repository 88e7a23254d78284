//! Path resolution for the natal data directory

use std::path::PathBuf;

/// Environment variable that overrides the data directory
pub const HOME_ENV: &str = "NATAL_HOME";

/// Resolves standard paths under the data directory (`~/.natal` by default)
#[derive(Debug, Clone)]
pub struct Paths {
    pub data_dir: PathBuf,
}

impl Paths {
    /// Resolve from `NATAL_HOME`, falling back to `~/.natal`
    pub fn new() -> std::io::Result<Self> {
        if let Some(dir) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::at(PathBuf::from(dir)));
        }

        let home = dirs::home_dir().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "home directory not found")
        })?;
        Ok(Self::at(home.join(".natal")))
    }

    /// Use an explicit data directory
    pub fn at(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// SQLite database holding charts, summaries and chat history
    pub fn database_file(&self) -> PathBuf {
        self.data_dir.join("natal.db")
    }

    pub fn config_file(&self) -> PathBuf {
        self.data_dir.join("config.json")
    }

    pub fn telemetry_dir(&self) -> PathBuf {
        self.data_dir.join("telemetry")
    }

    pub fn turns_file(&self) -> PathBuf {
        self.telemetry_dir().join("turns.jsonl")
    }
}
