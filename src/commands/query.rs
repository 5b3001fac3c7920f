//! Alfred script filter
//!
//! Turns the partially typed query into candidate rows. The first word may
//! be any prefix of `shell`, `port`, `port:open`, `port:close` or
//! `port:list`; e.g. `sh web` offers shells on every host starting with
//! `web`, and `port:o web 8080:80` offers forwards on those hosts.

use anyhow::{bail, Context, Result};
use tracing::warn;

use super::alfred::{Item, ScriptFilter};
use super::port::PortAction;
use crate::config::{self, HostConfig, Settings};
use crate::forwarding::{ForwardPattern, SocketRegistry};

/// Where candidates come from
pub trait CandidateSource {
    /// Host aliases, optionally restricted to a prefix
    fn hosts(&self, prefix: Option<&str>) -> Result<Vec<HostConfig>>;

    /// Forwards currently open
    fn open_forwards(&self) -> Result<Vec<ForwardPattern>>;
}

/// Reads the SSH config and sockets directory named by `Settings`
pub struct SettingsSource<'a> {
    settings: &'a Settings,
}

impl<'a> SettingsSource<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }
}

impl CandidateSource for SettingsSource<'_> {
    fn hosts(&self, prefix: Option<&str>) -> Result<Vec<HostConfig>> {
        Ok(config::list_hosts(self.settings.ssh_config_path(), prefix)?)
    }

    fn open_forwards(&self) -> Result<Vec<ForwardPattern>> {
        SocketRegistry::new(&self.settings.sockets_dir)
            .list()
            .with_context(|| {
                format!(
                    "Failed to list forwards in {}",
                    self.settings.sockets_dir.display()
                )
            })
    }
}

/// Build the script filter response for a raw query
///
/// Errors become a single error row so Alfred can show them.
pub fn script_filter(input: &str, source: &impl CandidateSource) -> ScriptFilter {
    let tokens: Vec<&str> = input.split_whitespace().collect();
    match candidates(&tokens, source) {
        Ok(items) => ScriptFilter::new(items),
        Err(e) => {
            warn!("Query '{}' failed: {:#}", input, e);
            ScriptFilter::error(format!("{:#}", e))
        }
    }
}

/// Candidate rows for already tokenized input
pub fn candidates(tokens: &[&str], source: &impl CandidateSource) -> Result<Vec<Item>> {
    let Some((&cmd, rest)) = tokens.split_first() else {
        return Ok(usage_items());
    };
    let server = rest.first().copied();
    let args = rest.get(1..).unwrap_or_default();

    if "shell".starts_with(cmd) {
        shell_candidates(server, source)
    } else if "port".starts_with(cmd) {
        Ok(port_usage_items())
    } else if "port:open".starts_with(cmd) {
        forward_candidates(PortAction::Open, server, args, source)
    } else if "port:close".starts_with(cmd) {
        forward_candidates(PortAction::Close, server, args, source)
    } else if "port:list".starts_with(cmd) {
        list_candidates(source)
    } else {
        bail!("ssh-server command '{}' is not supported", cmd)
    }
}

fn usage_items() -> Vec<Item> {
    let mut items = vec![Item::new("open shell on remote server")
        .subtitle("Usage: shell serverName")
        .autocomplete("shell")];
    items.extend(port_usage_items());
    items
}

fn port_usage_items() -> Vec<Item> {
    vec![
        Item::new("open local port forwarding from remote server")
            .subtitle("Usage: port:open serverName localPort:remotePort")
            .autocomplete("port:open"),
        Item::new("close local port forwarding from remote server")
            .subtitle("Usage: port:close serverName localPort:remotePort")
            .autocomplete("port:close"),
        Item::new("list opening local port forwards from remote server")
            .subtitle("Usage: port:list")
            .action("port:list"),
    ]
}

fn shell_candidates(server: Option<&str>, source: &impl CandidateSource) -> Result<Vec<Item>> {
    Ok(source
        .hosts(server)?
        .into_iter()
        .map(|host| {
            Item::new(format!("open shell on remote server '{}'", host.alias))
                .subtitle(format!("ssh shell {}", host.alias))
                .action(format!("shell {}", host.alias))
        })
        .collect())
}

fn forward_candidates(
    action: PortAction,
    server: Option<&str>,
    args: &[&str],
    source: &impl CandidateSource,
) -> Result<Vec<Item>> {
    let verb = match action {
        PortAction::Open => "open",
        PortAction::Close => "close",
    };
    let args = args.join(" ");

    Ok(source
        .hosts(server)?
        .into_iter()
        .map(|host| {
            let command = format!("{} {} {}", action, host.alias, args);
            Item::new(format!(
                "{} local port forwarding from remote server '{}'",
                verb, host.alias
            ))
            .subtitle(format!("ssh {}", command))
            .action(command)
        })
        .collect())
}

fn list_candidates(source: &impl CandidateSource) -> Result<Vec<Item>> {
    let forwards = source.open_forwards()?;
    if forwards.is_empty() {
        return Ok(vec![Item::new("No open port forwarding")]);
    }

    Ok(forwards
        .iter()
        .map(|fw| {
            Item::new(format!(
                "localhost:{} -> {}:{}",
                fw.local_port, fw.server_name, fw.remote_port
            ))
            .subtitle("close it")
            .action(format!(
                "{} {} {}:{}",
                PortAction::Close,
                fw.server_name,
                fw.local_port,
                fw.remote_port
            ))
        })
        .collect())
}
