use std::path::{Path, PathBuf};

use tokio::sync::Mutex;
use tracing::{error, info};

use crate::error::{FeedloopError, Result};
use crate::models::FeedbackEntry;
use crate::store::write_atomic;

/// Append-only, durable record of every submitted correction.
///
/// The whole ledger is one JSON array, rewritten atomically on each append.
pub struct FeedbackLedger {
    path: PathBuf,
    entries: Mutex<Vec<FeedbackEntry>>,
}

impl FeedbackLedger {
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let read_path = path.clone();
        let entries = tokio::task::spawn_blocking(move || read_or_quarantine(&read_path))
            .await
            .map_err(|e| FeedloopError::Internal(format!("Ledger load task failed: {e}")))??;

        info!(entries = entries.len(), path = %path.display(), "Feedback ledger opened");
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Durably record `entry`. On failure nothing is recorded.
    pub async fn append(&self, entry: FeedbackEntry) -> Result<FeedbackEntry> {
        let mut entries = self.entries.lock().await;

        let mut next = entries.clone();
        next.push(entry.clone());

        let bytes = serde_json::to_vec_pretty(&next)
            .map_err(|e| FeedloopError::Ledger(format!("Failed to encode feedback: {e}")))?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomic(&path, &bytes))
            .await
            .map_err(|e| FeedloopError::Ledger(format!("Ledger write task failed: {e}")))?
            .map_err(|e| FeedloopError::Ledger(format!("Failed to persist feedback: {e}")))?;

        *entries = next;
        Ok(entry)
    }

    /// All entries in insertion order.
    pub async fn list(&self) -> Vec<FeedbackEntry> {
        self.entries.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn read_or_quarantine(path: &Path) -> Result<Vec<FeedbackEntry>> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(FeedloopError::Ledger(format!("Cannot read {}: {e}", path.display()))),
    };

    match serde_json::from_slice::<Vec<FeedbackEntry>>(&bytes) {
        Ok(entries) => Ok(entries),
        Err(parse_error) => {
            let quarantine = quarantine_path(path);
            std::fs::rename(path, &quarantine).map_err(|e| {
                FeedloopError::Ledger(format!(
                    "Ledger {} is corrupt ({parse_error}) and could not be moved aside: {e}",
                    path.display()
                ))
            })?;
            error!(
                path = %path.display(),
                moved_to = %quarantine.display(),
                error = %parse_error,
                "Feedback ledger is corrupt; starting with an empty ledger"
            );
            Ok(Vec::new())
        }
    }
}

fn quarantine_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "feedback_log.json".to_string());
    let ts = chrono::Utc::now().timestamp();

    let mut candidate = path.with_file_name(format!("{name}.corrupt-{ts}"));
    let mut n = 1;
    while candidate.exists() {
        candidate = path.with_file_name(format!("{name}.corrupt-{ts}-{n}"));
        n += 1;
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserRole;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_opens_empty() {
        let dir = TempDir::new().unwrap();
        let ledger = FeedbackLedger::open(dir.path().join("feedback_log.json"))
            .await
            .unwrap();
        assert!(ledger.is_empty().await);
    }

    #[tokio::test]
    async fn test_append_survives_reopen_in_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("feedback_log.json");

        let ledger = FeedbackLedger::open(&path).await.unwrap();
        let first = ledger
            .append(FeedbackEntry::new("q1", "r1", "u1", UserRole::Driver))
            .await
            .unwrap();
        let second = ledger
            .append(FeedbackEntry::new("q2", "r2", "u2", UserRole::Owner))
            .await
            .unwrap();

        let reopened = FeedbackLedger::open(&path).await.unwrap();
        assert_eq!(reopened.list().await, vec![first, second]);
    }

    #[tokio::test]
    async fn test_list_is_a_copy() {
        let dir = TempDir::new().unwrap();
        let ledger = FeedbackLedger::open(dir.path().join("feedback_log.json"))
            .await
            .unwrap();
        ledger
            .append(FeedbackEntry::new("q", "r", "u", UserRole::Manager))
            .await
            .unwrap();

        let mut snapshot = ledger.list().await;
        snapshot.clear();
        assert_eq!(ledger.len().await, 1);
    }

    #[tokio::test]
    async fn test_failed_write_records_nothing() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("sub");
        std::fs::create_dir(&sub).unwrap();

        let ledger = FeedbackLedger::open(sub.join("feedback_log.json"))
            .await
            .unwrap();

        std::fs::remove_dir(&sub).unwrap();
        std::fs::write(&sub, "not a directory").unwrap();

        let result = ledger
            .append(FeedbackEntry::new("q", "r", "u", UserRole::Owner))
            .await;

        assert!(matches!(result, Err(FeedloopError::Ledger(_))));
        assert!(ledger.is_empty().await);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_moved_aside() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("feedback_log.json");
        std::fs::write(&path, "{ definitely not an array").unwrap();

        let ledger = FeedbackLedger::open(&path).await.unwrap();
        assert!(ledger.is_empty().await);
        assert!(!path.exists());

        let quarantined: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.file_name()
                    .to_string_lossy()
                    .starts_with("feedback_log.json.corrupt-")
            })
            .collect();
        assert_eq!(quarantined.len(), 1);
        assert_eq!(
            std::fs::read_to_string(quarantined[0].path()).unwrap(),
            "{ definitely not an array"
        );
    }
}
