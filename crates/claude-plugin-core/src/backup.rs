//! Timestamped copies of files before they are rewritten.

use crate::error::{CoreError, CoreResult};
use chrono::{DateTime, Local};
use sha2::{Digest, Sha256};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// `strftime` pattern of the backup suffix.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d--%H-%M-%S";

/// Backup suffix for a run started at `now`.
pub fn timestamp(now: DateTime<Local>) -> String {
    now.format(TIMESTAMP_FORMAT).to_string()
}

/// `settings.local.json` -> `settings.local.json.bak.<stamp>`, same directory.
pub fn backup_path(original: &Path, stamp: &str) -> PathBuf {
    let mut name = original
        .file_name()
        .map(OsString::from)
        .unwrap_or_default();
    name.push(format!(".bak.{stamp}"));
    original.with_file_name(name)
}

/// Copy `original` beside itself and verify the copy.
///
/// Returns `None` when `original` does not exist, since there is nothing to
/// protect. The copy keeps the original's permissions; its modification time
/// is the moment the backup was taken.
pub fn backup_file(original: &Path, stamp: &str) -> CoreResult<Option<PathBuf>> {
    if !original.exists() {
        tracing::debug!(path = %original.display(), "file does not exist, no backup needed");
        return Ok(None);
    }

    let backup = backup_path(original, stamp);
    tracing::debug!(from = %original.display(), to = %backup.display(), "creating backup");

    fs::copy(original, &backup).map_err(|e| CoreError::io("copy", original, e))?;
    File::options()
        .write(true)
        .open(&backup)
        .and_then(|f| f.set_modified(SystemTime::now()))
        .map_err(|e| CoreError::io("set modification time", &backup, e))?;

    let expected = sha256_file(original)?;
    let actual = sha256_file(&backup)?;
    if expected != actual {
        return Err(CoreError::BackupMismatch {
            original: original.to_path_buf(),
            backup,
            expected,
            actual,
        });
    }
    tracing::trace!(sha256 = %actual, "backup verified");

    Ok(Some(backup))
}

/// Hex SHA-256 of a file's contents.
pub fn sha256_file(path: &Path) -> CoreResult<String> {
    let mut file = File::open(path).map_err(|e| CoreError::io("open", path, e))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).map_err(|e| CoreError::io("read", path, e))?;
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Duration;

    #[test]
    fn test_timestamp_format() {
        let at = Local.with_ymd_and_hms(2025, 1, 31, 9, 5, 7).unwrap();
        assert_eq!(timestamp(at), "2025-01-31--09-05-07");
    }

    #[test]
    fn test_backup_path_keeps_full_name() {
        assert_eq!(
            backup_path(
                Path::new("/p/.claude/settings.local.json"),
                "2025-01-31--09-05-07"
            ),
            PathBuf::from("/p/.claude/settings.local.json.bak.2025-01-31--09-05-07")
        );
    }

    #[test]
    fn test_missing_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let result = backup_file(&dir.path().join("absent.json"), "stamp").unwrap();
        assert!(result.is_none());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_backup_is_identical_and_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let original = dir.path().join("installed_plugins.json");
        fs::write(&original, "{\"plugins\": {}}").unwrap();
        File::options()
            .write(true)
            .open(&original)
            .unwrap()
            .set_modified(SystemTime::now() - Duration::from_secs(86_400))
            .unwrap();

        let started = SystemTime::now() - Duration::from_secs(1);
        let backup = backup_file(&original, "2025-01-31--09-05-07")
            .unwrap()
            .unwrap();

        assert_eq!(
            backup.file_name().unwrap(),
            "installed_plugins.json.bak.2025-01-31--09-05-07"
        );
        assert_eq!(fs::read(&backup).unwrap(), fs::read(&original).unwrap());
        assert!(fs::metadata(&backup).unwrap().modified().unwrap() >= started);
    }

    #[test]
    fn test_sha256_known_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f");
        fs::write(&path, b"test content").unwrap();
        assert_eq!(
            sha256_file(&path).unwrap(),
            "6ae8a75555209fd6c44157c0aed8016e763ff435a19cf186f76863140143ff72"
        );
    }
}
