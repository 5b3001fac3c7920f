//! Configuration Module
//!
//! Resolves where things live (sockets directory, SSH config, `ssh` binary)
//! and reads host aliases out of the user's SSH client configuration.

pub mod ssh_config;
pub mod storage;

pub use ssh_config::{
    default_ssh_config_path, list_hosts, parse_directives, parse_ssh_config, Directive, HostConfig,
    SshConfigError,
};
pub use storage::{default_sockets_dir, install_dir, Settings, StorageError};
