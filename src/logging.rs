use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogConfig;

/// Sets up console + file logging for one of the CLI tools. The log file
/// lands under `LOG_DIR/<tool>.log` and is rotated by size on startup,
/// keeping `LOG_BACKUP_COUNT` numbered backups.
pub fn init(tool: &str, verbose: bool, config: &LogConfig) -> Result<()> {
    fs::create_dir_all(&config.dir)
        .with_context(|| format!("failed to create log directory {}", config.dir.display()))?;

    let log_path = config.dir.join(format!("{tool}.log"));
    rotate_if_needed(&log_path, config.max_bytes, config.backup_count)?;

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open log file {}", log_path.display()))?;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).without_time())
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(Arc::new(file)),
        )
        .try_init()
        .ok();

    println!("\n📋 Log file: {}\n", log_path.display());
    Ok(())
}

/// Shifts `tool.log -> tool.log.1 -> ... -> tool.log.N` once the active file
/// crosses `max_bytes`. The oldest backup falls off the end.
pub fn rotate_if_needed(path: &Path, max_bytes: u64, backup_count: usize) -> Result<()> {
    let size = match fs::metadata(path) {
        Ok(meta) => meta.len(),
        Err(_) => return Ok(()),
    };

    if size < max_bytes || backup_count == 0 {
        return Ok(());
    }

    let backup = |n: usize| path.with_extension(format!("log.{n}"));

    let oldest = backup(backup_count);
    if oldest.exists() {
        fs::remove_file(&oldest)?;
    }
    for n in (1..backup_count).rev() {
        let from = backup(n);
        if from.exists() {
            fs::rename(&from, backup(n + 1))?;
        }
    }
    fs::rename(path, backup(1))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;

    fn write_file(path: &Path, contents: &[u8]) {
        let mut f = File::create(path).unwrap();
        f.write_all(contents).unwrap();
    }

    #[test]
    fn small_file_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("tool.log");
        write_file(&log, b"short");
        rotate_if_needed(&log, 1024, 3).unwrap();
        assert!(log.exists());
        assert!(!dir.path().join("tool.log.1").exists());
    }

    #[test]
    fn oversized_file_rotates() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("tool.log");
        write_file(&log, &vec![b'x'; 64]);
        rotate_if_needed(&log, 10, 3).unwrap();
        assert!(!log.exists());
        assert!(dir.path().join("tool.log.1").exists());
    }

    #[test]
    fn backups_shift_and_oldest_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("tool.log");
        write_file(&log, &vec![b'a'; 64]);
        write_file(&dir.path().join("tool.log.1"), b"one");
        write_file(&dir.path().join("tool.log.2"), b"two");

        rotate_if_needed(&log, 10, 2).unwrap();

        // old .2 dropped, old .1 became .2, active became .1
        assert_eq!(fs::read(dir.path().join("tool.log.2")).unwrap(), b"one");
        assert_eq!(fs::read(dir.path().join("tool.log.1")).unwrap(), vec![b'a'; 64]);
        assert!(!log.exists());
    }
}
