//! Command-line front ends
//!
//! `port:*`, `shell` and `hosts` print plain text; `query` is the Alfred
//! script filter and prints JSON.

pub mod alfred;
pub mod port;
pub mod query;
pub mod shell;

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::config::{self, Settings};
use crate::forwarding::{ForwardingManager, SocketRegistry, SshForwardClient};

pub use port::PortAction;

#[derive(Parser, Debug)]
#[command(name = "alfred-ssh", version)]
#[command(about = "SSH shells and local port forwards for Alfred", long_about = None)]
pub struct Cli {
    /// Directory holding control sockets of open forwards
    #[arg(long, env = "ALFRED_SSH_SOCKETS_DIR", global = true)]
    pub sockets_dir: Option<PathBuf>,

    /// SSH client config to read hosts from
    #[arg(long, env = "ALFRED_SSH_CONFIG", global = true)]
    pub ssh_config: Option<PathBuf>,

    /// ssh binary to run
    #[arg(long = "ssh", env = "ALFRED_SSH_PROGRAM", global = true)]
    pub ssh_program: Option<PathBuf>,

    /// Log more to stderr (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Open local port forwards: <server> <localPort:remotePort>...
    #[command(name = "port:open")]
    PortOpen {
        server: String,
        #[arg(required = true)]
        forwards: Vec<String>,
    },
    /// Close local port forwards: <server> <localPort:remotePort>...
    #[command(name = "port:close")]
    PortClose {
        server: String,
        #[arg(required = true)]
        forwards: Vec<String>,
    },
    /// List open port forwards
    #[command(name = "port:list")]
    PortList,
    /// Open an interactive shell on a host
    Shell { server: String },
    /// List host aliases from the SSH config
    Hosts { prefix: Option<String> },
    /// Alfred script filter: print candidate items as JSON
    Query {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        input: Vec<String>,
    },
}

impl Cli {
    fn settings(&self) -> Result<Settings> {
        Settings::resolve(
            self.sockets_dir.clone(),
            self.ssh_config.clone(),
            self.ssh_program.clone(),
        )
        .context("Failed to resolve settings")
    }
}

fn forwarding_manager(settings: &Settings) -> ForwardingManager<SshForwardClient> {
    ForwardingManager::new(
        SocketRegistry::new(&settings.sockets_dir),
        SshForwardClient::new(&settings.ssh_program),
    )
}

/// Run the parsed command
pub fn dispatch(cli: Cli) -> Result<ExitCode> {
    let settings = cli.settings()?;
    let mut stdout = std::io::stdout().lock();

    match cli.command {
        Commands::PortOpen { server, forwards } => {
            let manager = forwarding_manager(&settings);
            let report = port::run(&manager, PortAction::Open, &server, &forwards)?;
            report.print(&mut stdout)?;
            Ok(report.exit_code())
        }
        Commands::PortClose { server, forwards } => {
            let manager = forwarding_manager(&settings);
            let report = port::run(&manager, PortAction::Close, &server, &forwards)?;
            report.print(&mut stdout)?;
            Ok(report.exit_code())
        }
        Commands::PortList => {
            let manager = forwarding_manager(&settings);
            let forwards = manager.list().with_context(|| {
                format!(
                    "Failed to list forwards in {}",
                    settings.sockets_dir.display()
                )
            })?;
            for line in port::list_lines(&forwards) {
                writeln!(stdout, "{}", line)?;
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Shell { server } => shell::open_shell(&settings.ssh_program, &server),
        Commands::Hosts { prefix } => {
            let hosts = config::list_hosts(settings.ssh_config_path(), prefix.as_deref())?;
            for host in hosts {
                writeln!(stdout, "{}", host.alias)?;
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Query { input } => {
            let source = query::SettingsSource::new(&settings);
            let output = query::script_filter(&input.join(" "), &source);
            writeln!(stdout, "{}", output.to_json()?)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_port_open() {
        let cli = Cli::try_parse_from([
            "alfred-ssh",
            "port:open",
            "web1",
            "8080:80",
            "9000:90",
        ])
        .unwrap();

        match cli.command {
            Commands::PortOpen { server, forwards } => {
                assert_eq!(server, "web1");
                assert_eq!(forwards, vec!["8080:80", "9000:90"]);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_port_open_requires_forwards() {
        assert!(Cli::try_parse_from(["alfred-ssh", "port:open", "web1"]).is_err());
    }

    #[test]
    fn test_parse_query_keeps_words() {
        let cli = Cli::try_parse_from(["alfred-ssh", "query", "port:open web", "8080:80"]).unwrap();
        match cli.command {
            Commands::Query { input } => assert_eq!(input, vec!["port:open web", "8080:80"]),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_global_options() {
        let cli = Cli::try_parse_from([
            "alfred-ssh",
            "port:list",
            "--sockets-dir",
            "/tmp/sockets",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.sockets_dir, Some(PathBuf::from("/tmp/sockets")));
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::PortList));
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
