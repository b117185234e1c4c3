use std::{
    fs::{self, File, OpenOptions},
    io,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Local};
use log::{debug, info};

use crate::error::{Result, SignError};

/// Sortable timestamp prefix placed in front of the source file name.
pub const SNAPSHOT_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Timestamped copy of a source document, made before anything is sent for signing.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    /// Document the snapshot was taken from
    pub source_path: PathBuf,
    /// Location of the copy
    pub snapshot_path: PathBuf,
    /// Time used to name the copy
    pub created_at: DateTime<Local>,
}

/// Derives the snapshot path for `source` taken at `at`.
///
/// The copy lives next to the source and is named
/// `<yyyyMMddHHmmss>-<original name>`.
pub fn snapshot_path(source: &Path, at: DateTime<Local>) -> Result<PathBuf> {
    let file_name = source.file_name().ok_or_else(|| {
        SignError::io(
            source,
            io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"),
        )
    })?;

    let mut name = at.format(SNAPSHOT_TIMESTAMP_FORMAT).to_string();
    name.push('-');
    name.push_str(&file_name.to_string_lossy());

    Ok(source.with_file_name(name))
}

/// Copies `source` to a new snapshot named after the current local time.
pub fn create_snapshot(source: &Path) -> Result<Snapshot> {
    create_snapshot_at(source, Local::now())
}

/// Copies `source` to a new snapshot named after `at`.
///
/// The snapshot file is opened create-exclusive, so an existing path fails with
/// [`SignError::AlreadyExists`] and nothing is written. The source is only read.
pub fn create_snapshot_at(source: &Path, at: DateTime<Local>) -> Result<Snapshot> {
    let snapshot_path = snapshot_path(source, at)?;
    debug!(
        "Snapshotting {} to {}",
        source.display(),
        snapshot_path.display()
    );

    let mut reader = File::open(source).map_err(|e| SignError::io(source, e))?;

    let mut writer = match OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&snapshot_path)
    {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            return Err(SignError::AlreadyExists(snapshot_path));
        }
        Err(e) => return Err(SignError::io(&snapshot_path, e)),
    };

    let copied = io::copy(&mut reader, &mut writer).and_then(|n| writer.sync_all().map(|_| n));
    let bytes = match copied {
        Ok(bytes) => bytes,
        Err(e) => {
            drop(writer);
            // a partial copy is not a snapshot
            let _ = fs::remove_file(&snapshot_path);
            return Err(SignError::io(&snapshot_path, e));
        }
    };

    info!(
        "Created snapshot {} ({bytes} bytes)",
        snapshot_path.display()
    );

    Ok(Snapshot {
        source_path: source.to_path_buf(),
        snapshot_path,
        created_at: at,
    })
}
