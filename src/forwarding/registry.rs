//! Forward Registry
//!
//! The directory of control sockets. A forward is open iff its socket name
//! exists here; the directory also holds the shared ssh diagnostic log and
//! the advisory lock file. Nothing in here talks to the network or spawns
//! processes.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::debug;

use super::pattern::ForwardPattern;

/// Diagnostic log ssh writes to (`ssh -E`), truncated before every invocation
pub const LOG_FILE: &str = "ssh.log";

/// Advisory lock file serialising lifecycle operations across processes
pub const LOCK_FILE: &str = "ssh.lock";

/// Registry of open forwards rooted at a directory
#[derive(Debug, Clone)]
pub struct SocketRegistry {
    root: PathBuf,
}

impl SocketRegistry {
    /// Create a registry over `root`; the directory is created on first use
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Ensure the registry directory exists
    pub fn ensure_dir(&self) -> io::Result<()> {
        fs::create_dir_all(&self.root)
    }

    /// Full path of an entry
    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn log_path(&self) -> PathBuf {
        self.path(LOG_FILE)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.path(LOCK_FILE)
    }

    /// Check whether an entry exists
    ///
    /// Uses `symlink_metadata` so a socket or dangling link still counts.
    pub fn exists(&self, name: &str) -> bool {
        fs::symlink_metadata(self.path(name)).is_ok()
    }

    /// Create an empty marker entry
    pub fn create(&self, name: &str) -> io::Result<()> {
        self.ensure_dir()?;
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(self.path(name))?;
        Ok(())
    }

    /// Remove an entry; returns whether anything was removed
    pub fn remove(&self, name: &str) -> io::Result<bool> {
        match fs::remove_file(self.path(name)) {
            Ok(()) => {
                debug!("Removed registry entry: {}", name);
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// List open forwards, sorted by socket name
    ///
    /// Entries that do not look like a control socket name are ignored.
    pub fn list(&self) -> io::Result<Vec<ForwardPattern>> {
        self.ensure_dir()?;

        let mut forwards = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if let Some(forward) = ForwardPattern::from_socket_name(name) {
                forwards.push(forward);
            }
        }

        forwards.sort_by(|a, b| a.socket.cmp(&b.socket));
        Ok(forwards)
    }

    /// Empty the shared diagnostic log
    pub fn clear_log(&self) -> io::Result<()> {
        self.remove(LOG_FILE).map(|_| ())
    }

    /// Read the shared diagnostic log; a missing log reads as empty
    pub fn read_log(&self) -> io::Result<String> {
        match fs::read_to_string(self.log_path()) {
            Ok(log) => Ok(log),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e),
        }
    }

    /// Take the exclusive advisory lock, blocking until it is free
    pub fn lock(&self) -> io::Result<RegistryLock> {
        self.ensure_dir()?;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(self.lock_path())?;
        file.lock_exclusive()?;
        Ok(RegistryLock { file })
    }
}

/// Held advisory lock on the registry; released on drop
pub struct RegistryLock {
    file: File,
}

impl Drop for RegistryLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}
