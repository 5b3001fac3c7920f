//! Path Resolution
//!
//! Works out where the sockets directory, SSH config and `ssh` binary are.
//! Sockets live next to the installed binary (`<install dir>/sockets`) so the
//! workflow keeps its state inside its own folder. The SSH config default
//! (`~/.ssh/config`) is only resolved when hosts are actually read.

use std::path::{Path, PathBuf};

/// Name of the sockets directory under the install dir
pub const SOCKETS_DIR_NAME: &str = "sockets";

/// Default `ssh` program, looked up on `PATH`
pub const DEFAULT_SSH_PROGRAM: &str = "ssh";

/// Path resolution errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Failed to determine install directory of {0}")]
    NoInstallDir(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Directory containing the running executable
pub fn install_dir() -> Result<PathBuf, StorageError> {
    let exe = std::env::current_exe()?;
    exe.parent()
        .map(Path::to_path_buf)
        .ok_or(StorageError::NoInstallDir(exe))
}

/// Default registry directory: `<install dir>/sockets`
pub fn default_sockets_dir() -> Result<PathBuf, StorageError> {
    Ok(install_dir()?.join(SOCKETS_DIR_NAME))
}

/// Resolved runtime settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Registry directory holding control sockets, `ssh.log` and `ssh.lock`
    pub sockets_dir: PathBuf,
    /// SSH client config file; `None` means `~/.ssh/config`
    pub ssh_config: Option<PathBuf>,
    /// The `ssh` binary to invoke
    pub ssh_program: PathBuf,
}

impl Settings {
    /// Fill in defaults for anything not given explicitly
    pub fn resolve(
        sockets_dir: Option<PathBuf>,
        ssh_config: Option<PathBuf>,
        ssh_program: Option<PathBuf>,
    ) -> Result<Self, StorageError> {
        let sockets_dir = match sockets_dir {
            Some(dir) => dir,
            None => default_sockets_dir()?,
        };
        let ssh_program = ssh_program.unwrap_or_else(|| PathBuf::from(DEFAULT_SSH_PROGRAM));

        tracing::debug!(
            sockets_dir = %sockets_dir.display(),
            ssh_config = ?ssh_config,
            ssh_program = %ssh_program.display(),
            "Resolved settings"
        );

        Ok(Self {
            sockets_dir,
            ssh_config,
            ssh_program,
        })
    }

    /// Config file to read hosts from, if one was given
    pub fn ssh_config_path(&self) -> Option<&Path> {
        self.ssh_config.as_deref()
    }
}
