//! Run log naming and retention.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, FixedOffset};
use tracing::{debug, warn};

const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Path of the log file for a run started at `started`.
pub fn log_file_path(dir: &Path, app_name: &str, started: &DateTime<FixedOffset>) -> PathBuf {
    dir.join(format!("{}_{}.log", app_name, started.format(TIMESTAMP_FORMAT)))
}

/// Delete regular files in `dir` last modified more than `retention` before `now`.
///
/// Files that cannot be inspected or removed are skipped. Returns the
/// number of files deleted.
pub fn purge_files(dir: &Path, retention: Duration, now: SystemTime) -> io::Result<usize> {
    let cutoff = now.checked_sub(retention).unwrap_or(SystemTime::UNIX_EPOCH);
    let mut removed = 0;

    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Unable to read log directory entry");
                continue;
            }
        };

        let modified = match entry.metadata().and_then(|m| {
            if m.is_file() {
                m.modified().map(Some)
            } else {
                Ok(None)
            }
        }) {
            Ok(Some(modified)) => modified,
            Ok(None) => continue,
            Err(e) => {
                warn!(path = ?entry.path(), error = %e, "Unable to stat log file");
                continue;
            }
        };

        if modified < cutoff {
            match fs::remove_file(entry.path()) {
                Ok(()) => {
                    debug!(path = ?entry.path(), "Purged old log file");
                    removed += 1;
                }
                Err(e) => warn!(path = ?entry.path(), error = %e, "Unable to purge log file"),
            }
        }
    }

    Ok(removed)
}

/// Retention window in days as a duration, saturating on huge values.
pub fn retention(days: u64) -> Duration {
    Duration::from_secs(days.saturating_mul(24 * 60 * 60))
}
