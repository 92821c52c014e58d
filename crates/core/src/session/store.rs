use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::{MocapError, Result, Session};

const EXTENSION: &str = "json";

/// File name for a session saved at `at`, e.g. `avatar_capture_20250717_184050.json`.
pub fn artifact_name(base_name: &str, at: &DateTime<Local>) -> String {
    format!("{base_name}_{}.{EXTENSION}", at.format("%Y%m%d_%H%M%S"))
}

/// Directory of saved sessions. Saving never overwrites an existing file.
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
    base_name: String,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>, base_name: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            base_name: base_name.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    /// Writes the session under a timestamped name and returns its path.
    pub fn save(&self, session: &Session) -> Result<PathBuf> {
        self.save_at(session, &Local::now())
    }

    /// Like [`SessionStore::save`] with an explicit naming timestamp. A
    /// numeric suffix is appended when the name is already taken.
    pub fn save_at(&self, session: &Session, at: &DateTime<Local>) -> Result<PathBuf> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir).map_err(|err| MocapError::io(&self.dir, err))?;
            tracing::info!(dir = %self.dir.display(), "created capture directory");
        }

        let document = super::serialize(session)?;
        let stem = format!("{}_{}", self.base_name, at.format("%Y%m%d_%H%M%S"));

        let mut attempt = 0u32;
        loop {
            let file_name = if attempt == 0 {
                artifact_name(&self.base_name, at)
            } else {
                format!("{stem}_{attempt}.{EXTENSION}")
            };
            let path = self.dir.join(file_name);

            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => {
                    write_or_remove(file, &path, &document)?;
                    tracing::info!(
                        path = %path.display(),
                        frames = session.frame_count(),
                        duration = session.total_duration(),
                        "session saved"
                    );
                    return Ok(path);
                }
                Err(err) if err.kind() == ErrorKind::AlreadyExists => attempt += 1,
                Err(err) => return Err(MocapError::io(&path, err)),
            }
        }
    }

    /// Reads and decodes a session document.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Session> {
        load(path)
    }

    /// Most recent saved session. Names embed the save time, so the last
    /// one in name order is the newest.
    pub fn latest(&self) -> Result<Option<PathBuf>> {
        Ok(self.list()?.pop())
    }

    /// Saved session files in the directory, sorted by name. A missing
    /// directory simply has no sessions.
    pub fn list(&self) -> Result<Vec<PathBuf>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(MocapError::io(&self.dir, err)),
        };

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry.map_err(|err| MocapError::io(&self.dir, err))?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == EXTENSION) {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }
}

/// Writes `document` to a freshly created file, removing the file again if
/// the write fails so no truncated session is left behind.
fn write_or_remove<W: Write>(mut out: W, path: &Path, document: &str) -> Result<()> {
    let Err(err) = out.write_all(document.as_bytes()).and_then(|()| out.flush()) else {
        return Ok(());
    };
    drop(out);
    if let Err(cleanup) = fs::remove_file(path) {
        tracing::warn!(
            path = %path.display(),
            error = %cleanup,
            "failed to remove partial session file"
        );
    }
    Err(MocapError::io(path, err))
}

/// Reads and decodes a session document from any path.
pub fn load(path: impl AsRef<Path>) -> Result<Session> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|err| MocapError::io(path, err))?;
    let session = super::deserialize(&text).map_err(|err| match err {
        MocapError::MalformedDocument { reason } => {
            MocapError::malformed(format!("{}: {reason}", path.display()))
        }
        other => other,
    })?;

    tracing::info!(
        path = %path.display(),
        frames = session.frame_count(),
        duration = session.total_duration(),
        "session loaded"
    );
    Ok(session)
}
