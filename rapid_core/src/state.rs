//! Shift state container and its JSON snapshot.
//!
//! The snapshot lets the CLI apply one command per invocation. It is a
//! convenience, not a durable record: a missing or unreadable file starts
//! an empty shift.

use crate::alerts::AlertLog;
use crate::session::SessionRegistry;
use crate::timers::TimerRegistry;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Everything tracked during one shift
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ShiftState {
    #[serde(default)]
    pub sessions: SessionRegistry,
    #[serde(default)]
    pub timers: TimerRegistry,
    #[serde(default)]
    pub alerts: AlertLog,
    /// Time of the last effective mutation
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl ShiftState {
    pub fn touch(&mut self) {
        self.last_updated = Some(Utc::now());
    }

    /// Load a shift snapshot with shared locking
    ///
    /// Returns an empty shift if the file doesn't exist or can't be parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("No shift file found, starting a new shift");
            return Ok(Self::default());
        }

        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!("Unable to open shift file {:?}: {}. Starting fresh.", path, e);
                return Ok(Self::default());
            }
        };

        if let Err(e) = file.lock_shared() {
            tracing::warn!("Unable to lock shift file {:?}: {}. Starting fresh.", path, e);
            return Ok(Self::default());
        }

        let mut contents = String::new();
        let read = std::io::BufReader::new(&file).read_to_string(&mut contents);
        if let Err(e) = file.unlock() {
            tracing::warn!("Unable to unlock shift file {:?}: {}", path, e);
        }
        if let Err(e) = read {
            tracing::warn!("Failed to read shift file {:?}: {}. Starting fresh.", path, e);
            return Ok(Self::default());
        }

        match serde_json::from_str::<ShiftState>(&contents) {
            Ok(state) => {
                tracing::debug!("Loaded shift state from {:?}", path);
                Ok(state)
            }
            Err(e) => {
                tracing::warn!("Failed to parse shift file {:?}: {}. Starting fresh.", path, e);
                Ok(Self::default())
            }
        }
    }

    /// Save the snapshot by writing a temp file and renaming it into place
    pub fn save(&self, path: &Path) -> Result<()> {
        let parent = path
            .parent()
            .ok_or_else(|| Error::State(format!("shift path {:?} has no parent", path)))?;
        std::fs::create_dir_all(parent)?;

        let temp = NamedTempFile::new_in(parent)?;
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            serde_json::to_writer_pretty(&mut writer, self)?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;
        temp.persist(path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved shift state to {:?}", path);
        Ok(())
    }

    /// Load the shift, modify it, and save it back while holding the shift lock
    ///
    /// Every writer goes through here, so concurrent commands serialize
    /// instead of overwriting each other's snapshot.
    pub fn update<F, T>(path: &Path, f: F) -> Result<T>
    where
        F: FnOnce(&mut ShiftState) -> Result<T>,
    {
        let _lock = ShiftLock::acquire(path)?;
        let mut state = Self::load(path)?;
        let out = f(&mut state)?;
        state.save(path)?;
        Ok(out)
    }
}

/// Exclusive lock on a sidecar file next to the shift snapshot
///
/// The snapshot itself is replaced by rename on every save, so it cannot
/// carry a lock across a load-modify-save cycle. Released on drop.
pub struct ShiftLock {
    file: File,
}

impl ShiftLock {
    pub fn lock_path(shift_path: &Path) -> PathBuf {
        shift_path.with_extension("lock")
    }

    pub fn acquire(shift_path: &Path) -> Result<Self> {
        let lock_path = Self::lock_path(shift_path);
        if let Some(parent) = lock_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)?;
        file.lock_exclusive()?;
        tracing::trace!("Acquired shift lock {:?}", lock_path);
        Ok(Self { file })
    }
}

impl Drop for ShiftLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}
