//! `port:open` / `port:close` / `port:list`

use std::fmt;
use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::Result;
use tracing::warn;

use crate::forwarding::{ForwardPattern, ForwardingManager, PortForwardClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortAction {
    Open,
    Close,
}

impl PortAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PortAction::Open => "port:open",
            PortAction::Close => "port:close",
        }
    }
}

impl fmt::Display for PortAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse `localPort:remotePort` tokens into localhost forwards on `server`
///
/// Tokens without exactly one `:` or with unparseable ports are dropped.
pub fn parse_forwards(server: &str, tokens: &[String]) -> Vec<ForwardPattern> {
    tokens
        .iter()
        .filter_map(|token| {
            let forward = parse_forward(server, token);
            if forward.is_none() {
                warn!("Ignoring malformed forward '{}', expected localPort:remotePort", token);
            }
            forward
        })
        .collect()
}

fn parse_forward(server: &str, token: &str) -> Option<ForwardPattern> {
    let (local, remote) = token.split_once(':')?;
    if remote.contains(':') {
        return None;
    }
    Some(ForwardPattern::localhost(
        server,
        local.parse().ok()?,
        remote.parse().ok()?,
    ))
}

/// Result lines of a `port:open` / `port:close` batch
#[derive(Debug)]
pub struct PortReport {
    pub action: PortAction,
    pub forwards: Vec<ForwardPattern>,
}

impl PortReport {
    pub fn lines(&self) -> Vec<String> {
        self.forwards
            .iter()
            .map(|fw| result_line(self.action, fw))
            .collect()
    }

    pub fn any_failed(&self) -> bool {
        self.forwards.iter().any(|fw| !fw.is_ok())
    }

    pub fn exit_code(&self) -> ExitCode {
        if self.any_failed() {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        }
    }

    pub fn print(&self, out: &mut impl Write) -> io::Result<()> {
        for line in self.lines() {
            writeln!(out, "{}", line)?;
        }
        Ok(())
    }
}

/// Run a batch against the manager
///
/// A bad server name fails each forward on its own, like any other error.
pub fn run<C: PortForwardClient>(
    manager: &ForwardingManager<C>,
    action: PortAction,
    server: &str,
    tokens: &[String],
) -> Result<PortReport> {
    let batch = parse_forwards(server, tokens);
    let forwards = match action {
        PortAction::Open => manager.open(batch),
        PortAction::Close => manager.close(batch),
    };

    Ok(PortReport { action, forwards })
}

/// `Success: port:open, localhost:8080->web1:80` or `Failed: ..., <error>`
pub fn result_line(action: PortAction, fw: &ForwardPattern) -> String {
    match &fw.error {
        None => format!(
            "Success: {}, localhost:{}->{}:{}",
            action, fw.local_port, fw.server_name, fw.remote_port
        ),
        Some(error) => format!(
            "Failed: {}, localhost:{}->{}:{}, {}",
            action, fw.local_port, fw.server_name, fw.remote_port, error
        ),
    }
}

/// Lines printed by `port:list`
pub fn list_lines(forwards: &[ForwardPattern]) -> Vec<String> {
    if forwards.is_empty() {
        return vec!["No open port forwarding".to_string()];
    }
    forwards
        .iter()
        .map(|fw| {
            format!(
                "localhost:{} -> {}:{}",
                fw.local_port, fw.server_name, fw.remote_port
            )
        })
        .collect()
}
