use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
    pub journal_mode: SqliteJournalMode,
    pub synchronous: SqliteSynchronous,
    pub busy_timeout: Duration,
    pub acquire_timeout: Duration,
    pub max_connections: u32,
    pub foreign_keys: bool,
}

impl DbConfig {
    pub fn from_env() -> Result<Self, DbConfigError> {
        let path = match std::env::var("DATABASE_PATH") {
            Ok(raw) if raw.trim().is_empty() => {
                return Err(DbConfigError::Invalid {
                    key: "DATABASE_PATH",
                    value: raw,
                })
            }
            Ok(raw) => resolve_path(&raw),
            Err(_) => default_database_path(),
        };

        let journal_mode = match std::env::var("SQLITE_JOURNAL_MODE") {
            Ok(raw) => SqliteJournalMode::parse(&raw).ok_or(DbConfigError::Invalid {
                key: "SQLITE_JOURNAL_MODE",
                value: raw,
            })?,
            Err(_) => SqliteJournalMode::Wal,
        };

        let synchronous = match std::env::var("SQLITE_SYNCHRONOUS") {
            Ok(raw) => SqliteSynchronous::parse(&raw).ok_or(DbConfigError::Invalid {
                key: "SQLITE_SYNCHRONOUS",
                value: raw,
            })?,
            Err(_) => SqliteSynchronous::Normal,
        };

        Ok(Self {
            path,
            journal_mode,
            synchronous,
            busy_timeout: Duration::from_millis(env_u64("SQLITE_BUSY_TIMEOUT_MS", 5000)),
            acquire_timeout: Duration::from_millis(env_u64("DB_ACQUIRE_TIMEOUT_MS", 5000)),
            max_connections: env_u32("DB_MAX_CONNECTIONS", 5).max(1),
            foreign_keys: env_bool("SQLITE_FOREIGN_KEYS", true),
        })
    }

    /// Defaults for a database file at `path`, ignoring the environment.
    pub fn for_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            journal_mode: SqliteJournalMode::Wal,
            synchronous: SqliteSynchronous::Normal,
            busy_timeout: Duration::from_secs(5),
            acquire_timeout: Duration::from_secs(5),
            max_connections: 5,
            foreign_keys: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqliteJournalMode {
    Wal,
    Delete,
    Truncate,
    Persist,
    Memory,
    Off,
}

impl SqliteJournalMode {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "WAL" => Some(Self::Wal),
            "DELETE" => Some(Self::Delete),
            "TRUNCATE" => Some(Self::Truncate),
            "PERSIST" => Some(Self::Persist),
            "MEMORY" => Some(Self::Memory),
            "OFF" => Some(Self::Off),
            _ => None,
        }
    }

    pub const fn to_sqlx(self) -> sqlx::sqlite::SqliteJournalMode {
        use sqlx::sqlite::SqliteJournalMode as Mode;
        match self {
            Self::Wal => Mode::Wal,
            Self::Delete => Mode::Delete,
            Self::Truncate => Mode::Truncate,
            Self::Persist => Mode::Persist,
            Self::Memory => Mode::Memory,
            Self::Off => Mode::Off,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqliteSynchronous {
    Off,
    Normal,
    Full,
    Extra,
}

impl SqliteSynchronous {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "OFF" => Some(Self::Off),
            "NORMAL" => Some(Self::Normal),
            "FULL" => Some(Self::Full),
            "EXTRA" => Some(Self::Extra),
            _ => None,
        }
    }

    pub const fn to_sqlx(self) -> sqlx::sqlite::SqliteSynchronous {
        use sqlx::sqlite::SqliteSynchronous as Sync;
        match self {
            Self::Off => Sync::Off,
            Self::Normal => Sync::Normal,
            Self::Full => Sync::Full,
            Self::Extra => Sync::Extra,
        }
    }
}

#[derive(Debug, Error)]
pub enum DbConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vocab")
        .join("vocabulary.db")
}

fn resolve_path(value: &str) -> PathBuf {
    let raw = Path::new(value.trim());
    if raw.is_absolute() {
        return raw.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(raw))
        .unwrap_or_else(|_| raw.to_path_buf())
}

fn env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key).ok().as_deref() {
        Some("true") | Some("1") => true,
        Some("false") | Some("0") => false,
        _ => default,
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
        .unwrap_or(default)
}
