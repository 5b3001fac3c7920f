//! Forward patterns and their control socket names
//!
//! A forward is identified by `{local_address}-{local_port}-{remote_address}-{remote_port}.{server_name}`,
//! which is also the file name of its control socket in the registry.

use std::fmt;

use serde::Serialize;

use super::error::ForwardError;

/// One local -> remote port forward, as requested or as found in the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardPattern {
    /// Host alias from the SSH config
    pub server_name: String,
    /// Local bind address
    pub local_address: String,
    /// Local bind port
    pub local_port: u16,
    /// Target host, resolved on the remote side
    pub remote_address: String,
    /// Target port
    pub remote_port: u16,
    /// Control socket name once the forward is known to be open
    #[serde(skip_serializing_if = "Option::is_none")]
    pub socket: Option<String>,
    /// Failure reason; `None` means the last operation succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ForwardError>,
}

impl ForwardPattern {
    /// Address used on both ends of forwards built from the CLI
    pub const DEFAULT_ADDRESS: &'static str = "localhost";

    /// Create a forward between explicit addresses
    pub fn new(
        server_name: impl Into<String>,
        local_address: impl Into<String>,
        local_port: u16,
        remote_address: impl Into<String>,
        remote_port: u16,
    ) -> Self {
        Self {
            server_name: server_name.into(),
            local_address: local_address.into(),
            local_port,
            remote_address: remote_address.into(),
            remote_port,
            socket: None,
            error: None,
        }
    }

    /// Create a `localhost:local_port -> localhost:remote_port` forward
    pub fn localhost(server_name: impl Into<String>, local_port: u16, remote_port: u16) -> Self {
        Self::new(
            server_name,
            Self::DEFAULT_ADDRESS,
            local_port,
            Self::DEFAULT_ADDRESS,
            remote_port,
        )
    }

    /// Control socket (marker file) name for this forward
    pub fn socket_name(&self) -> String {
        format!(
            "{}-{}-{}-{}.{}",
            self.local_address, self.local_port, self.remote_address, self.remote_port, self.server_name
        )
    }

    /// Decode a control socket name back into a forward
    ///
    /// Splits on the first three dashes, then on the first dot, so dotted
    /// addresses and server names containing dashes or dots survive.
    /// ssh's temporary `<socket>.<16 random alphanumerics>` names are not
    /// forwards and decode to `None`.
    pub fn from_socket_name(name: &str) -> Option<Self> {
        let mut parts = name.splitn(4, '-');
        let local_address = parts.next()?;
        let local_port = parts.next()?.parse().ok()?;
        let remote_address = parts.next()?;
        let (remote_port, server_name) = parts.next()?.split_once('.')?;
        let remote_port = remote_port.parse().ok()?;

        if local_address.is_empty()
            || remote_address.is_empty()
            || server_name.is_empty()
            || is_temporary_suffix(server_name)
        {
            return None;
        }

        let mut pattern = Self::new(
            server_name,
            local_address,
            local_port,
            remote_address,
            remote_port,
        );
        pattern.socket = Some(name.to_string());
        Some(pattern)
    }

    /// `-L` argument for ssh: `local_address:local_port:remote_address:remote_port`
    pub fn local_forward_spec(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.local_address, self.local_port, self.remote_address, self.remote_port
        )
    }

    /// Check the fields can be encoded into a socket name and passed to ssh
    pub fn validate(&self) -> Result<(), ForwardError> {
        if !is_valid_server_name(&self.server_name) {
            return Err(ForwardError::Invalid(format!(
                "bad server name '{}'",
                self.server_name
            )));
        }
        for address in [&self.local_address, &self.remote_address] {
            if address.is_empty() || address.contains(['-', '/']) || address.contains(char::is_whitespace) {
                return Err(ForwardError::Invalid(format!("bad address '{}'", address)));
            }
        }
        Ok(())
    }

    /// True when the last operation on this forward succeeded
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Length of the random suffix ssh appends while binding a control socket
const TEMP_SUFFIX_LEN: usize = 16;

fn is_temporary_suffix(server_name: &str) -> bool {
    match server_name.rsplit_once('.') {
        Some((_, suffix)) => {
            suffix.len() == TEMP_SUFFIX_LEN && suffix.chars().all(|c| c.is_ascii_alphanumeric())
        }
        None => false,
    }
}

/// Server names end up in file names and on the ssh command line
pub fn is_valid_server_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('-')
        && !name.contains('/')
        && !name.contains(char::is_whitespace)
}

impl fmt::Display for ForwardPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}->{}:{}",
            self.local_address, self.local_port, self.server_name, self.remote_port
        )
    }
}
