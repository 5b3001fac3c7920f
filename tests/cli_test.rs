//! End-to-end runs of the `alfred-ssh` binary.
//!
//! None of these reach a real `ssh`: `--ssh` points at a path that does not
//! exist, and every case either needs no ssh or is rejected before it.

use std::path::Path;
use std::process::{Command, Output};

use serde_json::Value;

const SSH_CONFIG: &str = r#"
Host *
    ServerAliveInterval 60

Host web1
    HostName 10.0.0.1

Host web2
    HostName 10.0.0.2

Host db1
    HostName 10.0.0.3
"#;

struct Env {
    dir: tempfile::TempDir,
}

impl Env {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ssh_config"), SSH_CONFIG).unwrap();
        Self { dir }
    }

    fn sockets(&self) -> std::path::PathBuf {
        self.dir.path().join("sockets")
    }

    fn run(&self, args: &[&str]) -> Output {
        // Global options go first: `query` swallows everything after its text
        Command::new(env!("CARGO_BIN_EXE_alfred-ssh"))
            .arg("--sockets-dir")
            .arg(self.sockets())
            .arg("--ssh-config")
            .arg(self.dir.path().join("ssh_config"))
            .arg("--ssh")
            .arg(self.dir.path().join("no-such-ssh"))
            .args(args)
            .env_remove("ALFRED_SSH_SOCKETS_DIR")
            .env_remove("ALFRED_SSH_CONFIG")
            .env_remove("ALFRED_SSH_PROGRAM")
            .env_remove("RUST_LOG")
            .output()
            .unwrap()
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8(output.stdout.clone()).unwrap()
}

fn items(output: &Output) -> Vec<Value> {
    let value: Value = serde_json::from_slice(&output.stdout).unwrap();
    value["items"].as_array().unwrap().clone()
}

fn touch(dir: &Path, name: &str) {
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(dir.join(name), b"").unwrap();
}

#[test]
fn hosts_filters_by_prefix() {
    let env = Env::new();
    let output = env.run(&["hosts", "web"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "web1\nweb2\n");
}

#[test]
fn hosts_lists_patterns_verbatim() {
    let env = Env::new();
    let output = env.run(&["hosts"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "*\nweb1\nweb2\ndb1\n");
}

#[test]
fn query_shell_candidates() {
    let env = Env::new();
    let output = env.run(&["query", "sh web"]);
    assert!(output.status.success());

    let items = items(&output);
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["arg"], "shell web1");
    assert_eq!(items[1]["arg"], "shell web2");
}

#[test]
fn query_empty_shows_usage() {
    let env = Env::new();
    let output = env.run(&["query", ""]);
    assert_eq!(items(&output).len(), 4);
}

#[test]
fn query_unknown_command_is_error_item() {
    let env = Env::new();
    let output = env.run(&["query", "frobnicate web1"]);
    assert!(output.status.success());

    let items = items(&output);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["title"], "ssh-server command 'frobnicate' is not supported");
    assert_eq!(items[0]["valid"], false);
}

#[test]
fn query_port_list_reads_sockets_dir() {
    let env = Env::new();
    touch(&env.sockets(), "localhost-8080-localhost-80.web1");
    touch(&env.sockets(), "ssh.log");

    let output = env.run(&["query", "port:list"]);
    let items = items(&output);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["title"], "localhost:8080 -> web1:80");
    assert_eq!(items[0]["arg"], "port:close web1 8080:80");
}

#[test]
fn port_list_plain_output() {
    let env = Env::new();
    let output = env.run(&["port:list"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "No open port forwarding\n");

    touch(&env.sockets(), "localhost-8080-localhost-80.web1");
    let output = env.run(&["port:list"]);
    assert_eq!(stdout(&output), "localhost:8080 -> web1:80\n");
}

#[test]
fn malformed_forward_token_is_dropped() {
    let env = Env::new();
    let output = env.run(&["port:open", "web1", "abc"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "");
}

#[test]
fn close_unopened_forward_fails() {
    let env = Env::new();
    let output = env.run(&["port:close", "web1", "8080:80"]);
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(
        stdout(&output),
        "Failed: port:close, localhost:8080->web1:80, not forwarded\n"
    );
}

#[test]
fn open_already_forwarded_skips_ssh() {
    let env = Env::new();
    touch(&env.sockets(), "localhost-8080-localhost-80.web1");

    let output = env.run(&["port:open", "web1", "8080:80"]);
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(
        stdout(&output),
        "Failed: port:open, localhost:8080->web1:80, already forwarded\n"
    );
}

#[test]
fn bad_server_name_reports_each_forward() {
    let env = Env::new();
    let output = env.run(&["port:open", "bad/name", "8080:80", "9000:90"]);
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(
        stdout(&output),
        "Failed: port:open, localhost:8080->bad/name:80, invalid forward: bad server name 'bad/name'\n\
         Failed: port:open, localhost:9000->bad/name:90, invalid forward: bad server name 'bad/name'\n"
    );
}

#[test]
fn open_with_missing_ssh_reports_launch_error() {
    let env = Env::new();
    let output = env.run(&["port:open", "web1", "8080:80"]);
    assert_eq!(output.status.code(), Some(1));

    let out = stdout(&output);
    assert!(out.starts_with("Failed: port:open, localhost:8080->web1:80, failed to start"));
    assert!(!env.sockets().join("localhost-8080-localhost-80.web1").exists());
}

#[test]
fn broken_config_fails_hosts() {
    let env = Env::new();
    std::fs::write(env.dir.path().join("ssh_config"), "Host\n").unwrap();

    let output = env.run(&["hosts"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("line 1"));
}
