use crate::error::StoreError;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Exclusive writer for a file.
///
/// Holding a `Lockfile` means owning `<target>.lock`, which is created with
/// `create_new` so only one process can hold it. New contents go into the
/// lock file and replace `<target>` with a rename on [`Lockfile::commit`].
/// Dropping an uncommitted lock leaves `<target>` untouched.
pub struct Lockfile {
    target: PathBuf,
    lock_path: PathBuf,
    file: Option<fs::File>,
}

impl Lockfile {
    pub fn acquire(target: impl AsRef<Path>) -> Result<Self, StoreError> {
        let target = target.as_ref().to_path_buf();
        let mut name = target.file_name().unwrap_or_default().to_os_string();
        name.push(".lock");
        let lock_path = target.with_file_name(name);

        let file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::AlreadyExists => {
                    StoreError::LockConflict(lock_path.display().to_string())
                }
                _ => StoreError::Io(e),
            })?;
        Ok(Self {
            target,
            lock_path,
            file: Some(file),
        })
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Write the full new contents of the target.
    pub fn write_all(&mut self, data: &[u8]) -> Result<(), StoreError> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| StoreError::LockConflict("lock already released".into()))?;
        file.set_len(0)?;
        file.write_all(data)?;
        file.sync_all()?;
        Ok(())
    }

    /// Replace the target with what was written.
    ///
    /// If the rename fails the lock is still held, and dropping it removes
    /// the lock file.
    pub fn commit(mut self) -> Result<(), StoreError> {
        fs::rename(&self.lock_path, &self.target)?;
        self.file.take();
        Ok(())
    }
}

impl Drop for Lockfile {
    fn drop(&mut self) {
        if self.file.take().is_some() {
            let _ = fs::remove_file(&self.lock_path);
        }
    }
}
