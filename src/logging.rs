use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use chrono::Local;
use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

/// Sets up the global tracing subscriber with a fmt formatter and env filter.
///
/// `RUST_LOG` wins over `default_filter`. When `log_dir` is given, events go to a
/// fresh timestamped file inside it and the file path is returned; otherwise they go
/// to stderr.
pub fn init_tracing(
    default_filter: &str,
    log_dir: Option<&Path>,
) -> anyhow::Result<Option<PathBuf>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let builder = SubscriberBuilder::default()
        .with_env_filter(filter)
        .with_target(true)
        .with_line_number(true)
        .with_file(true);

    match log_dir {
        Some(dir) => {
            let path = log_file_path(&ensure_log_dir(dir)?, Local::now());
            let file = File::create(&path)
                .with_context(|| format!("creating log file {}", path.display()))?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
                .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {}", e))?;
            Ok(Some(path))
        }
        None => {
            builder
                .with_writer(std::io::stderr)
                .try_init()
                .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {}", e))?;
            Ok(None)
        }
    }
}

/// Creates `dir` if needed; falls back to `$HOME/logs` when it cannot be created.
fn ensure_log_dir(dir: &Path) -> anyhow::Result<PathBuf> {
    if dir.is_dir() || fs::create_dir_all(dir).is_ok() {
        return Ok(dir.to_path_buf());
    }
    let home = std::env::var_os("HOME").context("log dir unusable and HOME is not set")?;
    let fallback = PathBuf::from(home).join("logs");
    fs::create_dir_all(&fallback)
        .with_context(|| format!("creating fallback log dir {}", fallback.display()))?;
    Ok(fallback)
}

fn log_file_path(dir: &Path, now: chrono::DateTime<Local>) -> PathBuf {
    dir.join(format!("nhl_data_pull_{}.log", now.format("%d%b%y_%H%M%S")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn log_file_name_carries_timestamp() {
        let now = Local.with_ymd_and_hms(2023, 3, 7, 14, 5, 9).unwrap();
        let path = log_file_path(Path::new("/var/log/nhl"), now);
        assert_eq!(path, PathBuf::from("/var/log/nhl/nhl_data_pull_07Mar23_140509.log"));
    }
}
