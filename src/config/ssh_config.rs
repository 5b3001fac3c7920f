//! SSH Config Reader
//!
//! Parses ~/.ssh/config to discover the host aliases the user can connect to.
//! Only `Host` declarations matter here; every other directive is parsed
//! (so malformed input is caught) but otherwise left to `ssh` itself.

use std::path::{Path, PathBuf};

/// One `Key Value` (or `Key=Value`) line of the config file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    /// 1-based line number
    pub line: usize,
    /// Directive name as written (matching is case-insensitive)
    pub key: String,
    /// Raw value, surrounding whitespace removed
    pub value: String,
}

impl Directive {
    /// Check whether this is a `Host` declaration
    pub fn is_host(&self) -> bool {
        self.key.eq_ignore_ascii_case("host")
    }
}

/// A host alias declared by a `Host` directive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostConfig {
    /// Alias usable as `ssh <alias>`
    pub alias: String,
    /// Line of the declaring `Host` directive
    pub line: usize,
}

/// SSH config parser errors
#[derive(Debug, thiserror::Error)]
pub enum SshConfigError {
    #[error("Failed to determine home directory")]
    NoHomeDir,

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },
}

/// Get default SSH config path
pub fn default_ssh_config_path() -> Result<PathBuf, SshConfigError> {
    dirs::home_dir()
        .map(|home| home.join(".ssh").join("config"))
        .ok_or(SshConfigError::NoHomeDir)
}

/// Parse SSH config file into its directives
pub fn parse_ssh_config(path: Option<&Path>) -> Result<Vec<Directive>, SshConfigError> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => default_ssh_config_path()?,
    };

    let content = std::fs::read_to_string(&path).map_err(|source| SshConfigError::Io {
        path: path.clone(),
        source,
    })?;

    parse_directives(&content)
}

/// List host aliases in file order, optionally restricted to a literal prefix
pub fn list_hosts(
    path: Option<&Path>,
    prefix: Option<&str>,
) -> Result<Vec<HostConfig>, SshConfigError> {
    let directives = parse_ssh_config(path)?;
    let hosts = host_aliases(&directives, prefix)?;
    tracing::debug!("Found {} SSH config hosts (prefix: {:?})", hosts.len(), prefix);
    Ok(hosts)
}

/// Pick the `Host` values out of parsed directives
///
/// `Host` lines may carry several values, each reported on its own. Values
/// with glob characters (`dev-*`) are kept as written; the prefix is
/// compared literally and never expanded.
pub fn host_aliases(
    directives: &[Directive],
    prefix: Option<&str>,
) -> Result<Vec<HostConfig>, SshConfigError> {
    let mut hosts = Vec::new();

    for directive in directives.iter().filter(|d| d.is_host()) {
        for alias in split_arguments(&directive.value, directive.line)? {
            if !alias.is_empty() && prefix.map_or(true, |p| alias.starts_with(p)) {
                hosts.push(HostConfig {
                    alias,
                    line: directive.line,
                });
            }
        }
    }

    Ok(hosts)
}

/// Parse SSH config content string
pub fn parse_directives(content: &str) -> Result<Vec<Directive>, SshConfigError> {
    let mut directives = Vec::new();

    for (idx, raw) in content.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (key, value) = split_key_value(line);

        if value.is_empty() {
            if key.eq_ignore_ascii_case("host") {
                return Err(SshConfigError::Parse {
                    line: line_no,
                    message: "Host directive requires at least one alias".to_string(),
                });
            }
            tracing::debug!("Skipping {} without value at line {}", key, line_no);
            continue;
        }

        if value.matches('"').count() % 2 != 0 {
            return Err(SshConfigError::Parse {
                line: line_no,
                message: format!("unterminated quote in {} value", key),
            });
        }

        directives.push(Directive {
            line: line_no,
            key: key.to_string(),
            value: value.to_string(),
        });
    }

    Ok(directives)
}

/// Split "Key Value" / "Key=Value" / "Key = Value"
fn split_key_value(line: &str) -> (&str, &str) {
    let end = line
        .find(|c: char| c.is_whitespace() || c == '=')
        .unwrap_or(line.len());
    let (key, rest) = line.split_at(end);
    let rest = rest.trim_start();
    let rest = rest.strip_prefix('=').unwrap_or(rest);
    (key, rest.trim())
}

/// Split a value into whitespace-separated arguments, honouring double quotes
fn split_arguments(value: &str, line: usize) -> Result<Vec<String>, SshConfigError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;

    for c in value.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    args.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }

    if in_quotes {
        return Err(SshConfigError::Parse {
            line,
            message: "unterminated quote".to_string(),
        });
    }
    if has_token {
        args.push(current);
    }

    Ok(args)
}
