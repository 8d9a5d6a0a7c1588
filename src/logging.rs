use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "info";
const DEFAULT_LOG_DIR: &str = "./logs";
const DEFAULT_FILE_PREFIX: &str = "vocab.log";

/// Keeps the non-blocking file writer flushing; drop it only at shutdown.
pub struct FileLogGuard {
    _guard: WorkerGuard,
}

/// Where rolled log files go and how often they roll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSink {
    pub dir: PathBuf,
    pub prefix: String,
    pub rotation: Rotation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub filter: String,
    pub file: Option<FileSink>,
}

impl LogSettings {
    /// `filter` is the `RUST_LOG` directive string from `Config`. File output
    /// is read from `ENABLE_FILE_LOGS`, `LOG_DIR`, `LOG_FILE_PREFIX` and
    /// `LOG_ROTATION`.
    pub fn from_env(filter: &str) -> Self {
        Self::from_lookup(filter, |key| std::env::var(key).ok())
    }

    fn from_lookup(filter: &str, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let enabled = non_blank("ENABLE_FILE_LOGS").is_some_and(|v| parse_flag(&v));
        let file = enabled.then(|| FileSink {
            dir: PathBuf::from(non_blank("LOG_DIR").unwrap_or_else(|| DEFAULT_LOG_DIR.into())),
            prefix: non_blank("LOG_FILE_PREFIX")
                .map(|v| v.trim().to_string())
                .unwrap_or_else(|| DEFAULT_FILE_PREFIX.into()),
            rotation: non_blank("LOG_ROTATION")
                .and_then(|v| parse_rotation(&v))
                .unwrap_or(Rotation::DAILY),
        });

        Self {
            filter: filter.to_string(),
            file,
        }
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

fn parse_rotation(raw: &str) -> Option<Rotation> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "minutely" => Some(Rotation::MINUTELY),
        "hourly" => Some(Rotation::HOURLY),
        "daily" => Some(Rotation::DAILY),
        "never" => Some(Rotation::NEVER),
        _ => None,
    }
}

fn env_filter(directives: &str) -> EnvFilter {
    EnvFilter::try_new(directives).unwrap_or_else(|err| {
        eprintln!("invalid log filter {directives:?} ({err}); using {DEFAULT_FILTER}");
        EnvFilter::new(DEFAULT_FILTER)
    })
}

/// Opens the rolling appender, or returns `None` after reporting why the
/// directory could not be used.
fn file_writer(sink: &FileSink) -> Option<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    if let Err(err) = std::fs::create_dir_all(&sink.dir) {
        eprintln!("file logging disabled, cannot create {}: {err}", sink.dir.display());
        return None;
    }
    let appender = RollingFileAppender::new(sink.rotation.clone(), &sink.dir, &sink.prefix);
    Some(tracing_appender::non_blocking(appender))
}

/// Installs the global subscriber: stdout always, plus a rolling file when
/// `settings.file` is set and its directory is writable.
pub fn init_tracing(settings: &LogSettings) -> Option<FileLogGuard> {
    let (file_layer, guard) = match settings.file.as_ref().and_then(file_writer) {
        Some((writer, guard)) => {
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true);
            (Some(layer), Some(FileLogGuard { _guard: guard }))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter(&settings.filter))
        .with(fmt::layer().with_target(true))
        .with(file_layer)
        .init();

    if let (Some(sink), Some(_)) = (&settings.file, &guard) {
        tracing::info!(dir = %sink.dir.display(), prefix = %sink.prefix, "file logging enabled");
    }
    guard
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn settings(vars: &[(&str, &str)]) -> LogSettings {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        LogSettings::from_lookup("info,sqlx=warn", |key| vars.get(key).cloned())
    }

    #[test]
    fn file_output_is_off_unless_enabled() {
        assert_eq!(settings(&[]).file, None);
        assert_eq!(settings(&[("ENABLE_FILE_LOGS", "no")]).file, None);
        assert_eq!(settings(&[("LOG_DIR", "/tmp/elsewhere")]).file, None);
    }

    #[test]
    fn enabled_file_output_uses_defaults() {
        let sink = settings(&[("ENABLE_FILE_LOGS", " YES ")]).file.unwrap();
        assert_eq!(sink.dir, PathBuf::from("./logs"));
        assert_eq!(sink.prefix, "vocab.log");
        assert_eq!(sink.rotation, Rotation::DAILY);
    }

    #[test]
    fn file_sink_reads_overrides() {
        let sink = settings(&[
            ("ENABLE_FILE_LOGS", "1"),
            ("LOG_DIR", "/var/log/vocab"),
            ("LOG_FILE_PREFIX", "api.log"),
            ("LOG_ROTATION", "Hourly"),
        ])
        .file
        .unwrap();
        assert_eq!(sink.dir, PathBuf::from("/var/log/vocab"));
        assert_eq!(sink.prefix, "api.log");
        assert_eq!(sink.rotation, Rotation::HOURLY);
    }

    #[test]
    fn unknown_rotation_falls_back_to_daily() {
        assert_eq!(parse_rotation("weekly"), None);
        let sink = settings(&[("ENABLE_FILE_LOGS", "on"), ("LOG_ROTATION", "weekly")])
            .file
            .unwrap();
        assert_eq!(sink.rotation, Rotation::DAILY);
    }

    #[test]
    fn filter_is_carried_verbatim() {
        assert_eq!(settings(&[]).filter, "info,sqlx=warn");
    }
}
