//! Port forward client
//!
//! The process boundary of the forwarding subsystem. `SshForwardClient`
//! drives the system `ssh` binary through its connection multiplexing
//! options; tests substitute their own `PortForwardClient`.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};

use tracing::debug;

use super::error::ForwardError;
use super::pattern::ForwardPattern;
use super::registry::{SocketRegistry, LOG_FILE};

/// ssh reports a taken local port in its log but may still exit 0
pub const PORT_IN_USE_MARKER: &str = "Address already in use";

/// Establishes and tears down forwards tracked in a `SocketRegistry`
pub trait PortForwardClient {
    /// Start the forward; on success its control socket exists in `registry`
    fn establish(
        &self,
        registry: &SocketRegistry,
        forward: &ForwardPattern,
    ) -> Result<(), ForwardError>;

    /// Stop the forward whose control socket exists in `registry`
    fn teardown(
        &self,
        registry: &SocketRegistry,
        forward: &ForwardPattern,
    ) -> Result<(), ForwardError>;
}

/// `PortForwardClient` backed by the `ssh` command-line client
#[derive(Debug, Clone)]
pub struct SshForwardClient {
    program: PathBuf,
}

impl SshForwardClient {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// `ssh -E ssh.log -f -N -M -S <socket> -L <spec> <server>`
    ///
    /// Paths are relative: ssh runs inside the registry directory, which
    /// keeps the control socket path under the unix socket length limit.
    pub fn establish_args(forward: &ForwardPattern) -> Vec<OsString> {
        let socket = forward.socket_name();
        let spec = forward.local_forward_spec();
        [
            "-E",
            LOG_FILE,
            "-f",
            "-N",
            "-M",
            "-S",
            socket.as_str(),
            "-L",
            spec.as_str(),
            forward.server_name.as_str(),
        ]
        .iter()
        .map(OsString::from)
        .collect()
    }

    /// `ssh -E ssh.log -S <socket> -O exit <server>`
    pub fn teardown_args(forward: &ForwardPattern) -> Vec<OsString> {
        let socket = forward.socket_name();
        [
            "-E",
            LOG_FILE,
            "-S",
            socket.as_str(),
            "-O",
            "exit",
            forward.server_name.as_str(),
        ]
        .iter()
        .map(OsString::from)
        .collect()
    }

    /// Run ssh to completion with a fresh diagnostic log
    fn run(&self, registry: &SocketRegistry, args: Vec<OsString>) -> Result<(), ForwardError> {
        registry.ensure_dir()?;
        registry.clear_log()?;

        debug!("Running {} {:?}", self.program.display(), args);

        // All stdio detached: a backgrounded master keeps inherited pipes open
        let status = Command::new(&self.program)
            .args(&args)
            .current_dir(registry.root())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| {
                ForwardError::ProcessLaunch(format!(
                    "failed to start {}: {}",
                    self.program.display(),
                    e
                ))
            })?;

        check_status(status)
    }
}

impl Default for SshForwardClient {
    fn default() -> Self {
        Self::new("ssh")
    }
}

impl PortForwardClient for SshForwardClient {
    fn establish(
        &self,
        registry: &SocketRegistry,
        forward: &ForwardPattern,
    ) -> Result<(), ForwardError> {
        self.run(registry, Self::establish_args(forward))?;

        let log = registry.read_log()?;
        if let Some(line) = find_port_in_use(&log) {
            return Err(ForwardError::PortInUse(line.to_string()));
        }
        Ok(())
    }

    fn teardown(
        &self,
        registry: &SocketRegistry,
        forward: &ForwardPattern,
    ) -> Result<(), ForwardError> {
        self.run(registry, Self::teardown_args(forward))
    }
}

fn check_status(status: ExitStatus) -> Result<(), ForwardError> {
    match status.code() {
        Some(0) => Ok(()),
        Some(code) => Err(ForwardError::ProcessExit(code)),
        None => Err(ForwardError::ProcessSignaled),
    }
}

/// Last log line reporting the local port as taken
pub fn find_port_in_use(log: &str) -> Option<&str> {
    log.lines()
        .map(str::trim_end)
        .filter(|line| line.contains(PORT_IN_USE_MARKER))
        .last()
}
