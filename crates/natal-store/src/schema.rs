/// SQL DDL for the natal database.
pub const SCHEMA_VERSION: u32 = 1;

pub const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS charts (
    subject_id TEXT PRIMARY KEY,
    birth_instant TEXT,
    latitude REAL,
    longitude REAL,
    generation INTEGER NOT NULL DEFAULT 1,
    payload BLOB NOT NULL,
    raw_bytes INTEGER NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS summaries (
    subject_id TEXT NOT NULL,
    topic_key TEXT NOT NULL,
    text TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    expires_at TEXT,
    PRIMARY KEY (subject_id, topic_key)
);

CREATE TABLE IF NOT EXISTS chat_messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    subject_id TEXT NOT NULL,
    role TEXT NOT NULL,
    text TEXT NOT NULL,
    created_at TEXT NOT NULL,
    is_compacted INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_chat_live ON chat_messages(subject_id, is_compacted, id);
CREATE UNIQUE INDEX IF NOT EXISTS idx_chat_digest ON chat_messages(subject_id) WHERE role = 'summary';
CREATE INDEX IF NOT EXISTS idx_summaries_expiry ON summaries(expires_at);

CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
);
"#;

pub const PRAGMAS: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA busy_timeout = 5000;
PRAGMA synchronous = NORMAL;
"#;
