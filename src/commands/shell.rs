//! `shell <server>`: interactive ssh session in the current terminal

use std::path::Path;
use std::process::{Command, ExitCode};

use anyhow::{bail, Context, Result};
use tracing::{debug, warn};

use crate::forwarding::is_valid_server_name;

/// Run `ssh <server>` attached to this terminal and pass on its exit status
pub fn open_shell(program: &Path, server: &str) -> Result<ExitCode> {
    if !is_valid_server_name(server) {
        bail!("invalid server name '{}'", server);
    }

    debug!("Opening shell on {} via {}", server, program.display());
    let status = Command::new(program)
        .arg(server)
        .status()
        .with_context(|| format!("Failed to start {}", program.display()))?;

    Ok(match status.code() {
        Some(code) => ExitCode::from(u8::try_from(code).unwrap_or(u8::MAX)),
        None => {
            warn!("ssh session to {} terminated by signal", server);
            ExitCode::FAILURE
        }
    })
}
