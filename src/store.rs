//! Persistence of the last observed status between runs.
//!
//! The record is a single file holding one token, `reachable` or
//! `unreachable`. A missing file means the target has never been observed.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{MonitorError, Result};
use crate::models::{PreviousStatus, Status};

pub trait StatusStore: Send + Sync {
    fn load(&self) -> Result<PreviousStatus>;
    fn save(&self, status: Status) -> Result<()>;
}

pub struct FileStatusStore {
    path: PathBuf,
}

impl FileStatusStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes through a uniquely named temp file in the record's directory, so
    /// overlapping saves never share a half-written file.
    fn write_atomic(&self, contents: &str) -> io::Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let mut file = NamedTempFile::new_in(dir)?;
        file.write_all(contents.as_bytes())?;
        file.as_file().sync_all()?;

        file.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

impl StatusStore for FileStatusStore {
    fn load(&self) -> Result<PreviousStatus> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No status record yet");
                return Ok(PreviousStatus::Absent);
            }
            Err(e) => return Err(MonitorError::storage(&self.path, e)),
        };

        match parse_token(&content) {
            Some(status) => Ok(PreviousStatus::Known(status)),
            None => Err(MonitorError::CorruptStatus {
                path: self.path.clone(),
                content,
            }),
        }
    }

    fn save(&self, status: Status) -> Result<()> {
        self.write_atomic(&format!("{}\n", status.as_str()))
            .map_err(|e| MonitorError::storage(&self.path, e))?;
        debug!(path = %self.path.display(), %status, "Status saved");
        Ok(())
    }
}

/// `True`/`False` are the legacy tokens from the first checker; still accepted on read.
fn parse_token(content: &str) -> Option<Status> {
    match content.trim() {
        "reachable" | "True" => Some(Status::Reachable),
        "unreachable" | "False" => Some(Status::Unreachable),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> FileStatusStore {
        FileStatusStore::new(dir.path().join("status.txt"))
    }

    #[test]
    fn test_missing_record_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert_eq!(store.load().unwrap(), PreviousStatus::Absent);
    }

    #[test]
    fn test_save_twice_keeps_single_value() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store.save(Status::Unreachable).unwrap();
        store.save(Status::Unreachable).unwrap();

        assert_eq!(store.load().unwrap(), PreviousStatus::Known(Status::Unreachable));
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "unreachable\n");
    }

    #[test]
    fn test_save_overwrites_previous_value() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store.save(Status::Reachable).unwrap();
        store.save(Status::Unreachable).unwrap();

        assert_eq!(store.load().unwrap(), PreviousStatus::Known(Status::Unreachable));
    }

    #[test]
    fn test_no_temp_file_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store.save(Status::Reachable).unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_overlapping_saves_leave_a_readable_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("status.txt");

        for _ in 0..50 {
            let handles: Vec<_> = (0..4)
                .map(|i| {
                    let path = path.clone();
                    std::thread::spawn(move || {
                        let status = if i % 2 == 0 { Status::Reachable } else { Status::Unreachable };
                        FileStatusStore::new(path).save(status)
                    })
                })
                .collect();

            for handle in handles {
                handle.join().unwrap().unwrap();
            }
            assert!(matches!(
                FileStatusStore::new(&path).load().unwrap(),
                PreviousStatus::Known(_)
            ));
        }

        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_creates_missing_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStatusStore::new(dir.path().join("state").join("vm").join("status"));

        store.save(Status::Reachable).unwrap();

        assert_eq!(store.load().unwrap(), PreviousStatus::Known(Status::Reachable));
    }

    #[test]
    fn test_unrecognized_content_fails_closed() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), "maybe").unwrap();

        match store.load() {
            Err(MonitorError::CorruptStatus { content, .. }) => assert_eq!(content, "maybe"),
            other => panic!("expected CorruptStatus, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_record_fails_closed() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), "").unwrap();

        assert!(matches!(store.load(), Err(MonitorError::CorruptStatus { .. })));
    }

    #[test]
    fn test_legacy_tokens_and_whitespace() {
        assert_eq!(parse_token("True"), Some(Status::Reachable));
        assert_eq!(parse_token("False\n"), Some(Status::Unreachable));
        assert_eq!(parse_token("  reachable \r\n"), Some(Status::Reachable));
        assert_eq!(parse_token("true"), None);
        assert_eq!(parse_token("1"), None);
    }

    #[test]
    fn test_directory_in_place_of_record_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStatusStore::new(dir.path());

        assert!(matches!(store.load(), Err(MonitorError::Storage { .. })));
    }
}
