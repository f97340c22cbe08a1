use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{IndexState, VectorRecord};
use crate::error::{FeedloopError, Result};

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    dimensions: usize,
    records: Vec<VectorRecord>,
}

/// Write `bytes` to `path` so that readers only ever observe the old or the
/// new file contents.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(parent) = parent {
        std::fs::create_dir_all(parent)?;
    }

    let tmp = tmp_path(path);
    let written = (|| -> std::io::Result<()> {
        let mut file = std::fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        std::fs::rename(&tmp, path)
    })();

    if let Err(e) = written {
        let _ = std::fs::remove_file(&tmp);
        return Err(e.into());
    }

    sync_dir(parent.unwrap_or_else(|| Path::new(".")))?;
    Ok(())
}

/// Flush the directory entry so the rename survives a crash.
#[cfg(unix)]
fn sync_dir(dir: &Path) -> std::io::Result<()> {
    std::fs::File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Serialize and atomically persist an index state.
pub fn save(path: &Path, state: &IndexState) -> Result<()> {
    let snapshot = Snapshot {
        version: SNAPSHOT_VERSION,
        dimensions: state.dimensions().unwrap_or(0),
        records: state.records().to_vec(),
    };
    let bytes = serde_json::to_vec(&snapshot)
        .map_err(|e| FeedloopError::VectorStore(format!("Failed to encode snapshot: {e}")))?;
    write_atomic(path, &bytes)
}

/// Load a snapshot. `Ok(None)` means there is nothing on disk yet.
pub fn load(path: &Path, expected_dimensions: usize) -> Result<Option<IndexState>> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let snapshot: Snapshot = serde_json::from_slice(&bytes)
        .map_err(|e| FeedloopError::VectorStore(format!("Unreadable snapshot: {e}")))?;
    if snapshot.version != SNAPSHOT_VERSION {
        return Err(FeedloopError::VectorStore(format!(
            "Unsupported snapshot version {} in {}",
            snapshot.version,
            path.display()
        )));
    }

    if snapshot.records.is_empty() {
        return Ok(Some(IndexState::Empty));
    }

    if snapshot.dimensions != expected_dimensions {
        return Err(FeedloopError::VectorStore(format!(
            "Snapshot {} has {} dimensions, embedder produces {}",
            path.display(),
            snapshot.dimensions,
            expected_dimensions
        )));
    }

    IndexState::from_records(snapshot.records).map(Some)
}
