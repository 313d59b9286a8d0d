//! Daemon configuration
//!
//! [`Config`] is built once at startup and handed to the sync loop. Nothing
//! in it changes for the lifetime of the process.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Default author name stamped on commits
pub const DEFAULT_AUTHOR: &str = "gitomatic";

/// Default author email stamped on commits
pub const DEFAULT_EMAIL: &str = "gitomatic@fribbledom.com";

/// Default time between two sync cycles
pub const DEFAULT_INTERVAL: &str = "1m";

/// Default private key used for key-based authentication
pub const DEFAULT_PRIVKEY: &str = "~/.ssh/id_rsa";

/// Remote pulled from and pushed to unless configured otherwise
pub const DEFAULT_REMOTE: &str = "origin";

/// Name and email recorded as author and committer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

impl Identity {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

impl Default for Identity {
    fn default() -> Self {
        Self::new(DEFAULT_AUTHOR, DEFAULT_EMAIL)
    }
}

/// Immutable settings for one daemon process
#[derive(Debug, Clone)]
pub struct Config {
    /// Root of the working tree to keep in sync
    pub repo_path: PathBuf,
    /// Pull from the remote at the start of each cycle
    pub pull: bool,
    /// Detect, stage, commit and push local changes
    pub push: bool,
    /// Author identity for commits
    pub identity: Identity,
    /// Sleep between cycles
    pub interval: Duration,
    /// Preferred remote for pull and push
    pub remote: String,
}

impl Config {
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self {
            repo_path: repo_path.into(),
            pull: true,
            push: true,
            identity: Identity::default(),
            interval: Duration::from_secs(60),
            remote: DEFAULT_REMOTE.to_string(),
        }
    }

    pub fn with_pull(mut self, pull: bool) -> Self {
        self.pull = pull;
        self
    }

    pub fn with_push(mut self, push: bool) -> Self {
        self.push = push;
        self
    }

    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = identity;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_remote(mut self, remote: impl Into<String>) -> Self {
        self.remote = remote.into();
        self
    }
}

/// Parse an interval string such as `"1m"`, `"1h30m"`, `"1.5s"` or `"300ms"`.
///
/// The grammar is a sequence of decimal numbers, each with an optional
/// fraction and a mandatory unit (`ns`, `us`, `µs`, `ms`, `s`, `m`, `h`).
/// A bare `"0"` is the only unit-less value accepted.
pub fn parse_interval(input: &str) -> Result<Duration> {
    let invalid = |reason: &str| Error::InvalidInterval {
        value: input.to_string(),
        reason: reason.to_string(),
    };

    let s = input.trim();
    if s.is_empty() {
        return Err(invalid("duration cannot be empty"));
    }
    if s == "0" {
        return Ok(Duration::ZERO);
    }
    if s.starts_with(['+', '-']) {
        return Err(invalid("signed durations are not allowed"));
    }

    let mut total: u128 = 0;
    let mut rest = s;

    while !rest.is_empty() {
        let int_len = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        let (int_part, after) = rest.split_at(int_len);

        let (frac_part, after) = match after.strip_prefix('.') {
            Some(after) => {
                let len = after
                    .find(|c: char| !c.is_ascii_digit())
                    .unwrap_or(after.len());
                after.split_at(len)
            }
            None => ("", after),
        };

        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid("expected a number"));
        }

        let unit_len = after
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(after.len());
        let (unit, after) = after.split_at(unit_len);
        if unit.is_empty() {
            return Err(invalid("missing unit"));
        }
        let scale =
            unit_nanos(unit).ok_or_else(|| invalid(&format!("unknown unit '{}'", unit)))?;

        let whole: u128 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| invalid("value out of range"))?
        };

        // Digits past nanosecond precision cannot change the result
        let frac_digits = &frac_part[..frac_part.len().min(18)];
        let frac_nanos = if frac_digits.is_empty() {
            0
        } else {
            let numerator: u128 = frac_digits
                .parse()
                .map_err(|_| invalid("value out of range"))?;
            numerator * scale / 10u128.pow(frac_digits.len() as u32)
        };

        total = whole
            .checked_mul(scale)
            .and_then(|n| n.checked_add(frac_nanos))
            .and_then(|n| n.checked_add(total))
            .ok_or_else(|| invalid("value out of range"))?;

        rest = after;
    }

    let secs = u64::try_from(total / 1_000_000_000).map_err(|_| invalid("value out of range"))?;
    Ok(Duration::new(secs, (total % 1_000_000_000) as u32))
}

fn unit_nanos(unit: &str) -> Option<u128> {
    match unit {
        "ns" => Some(1),
        "us" | "µs" | "μs" => Some(1_000),
        "ms" => Some(1_000_000),
        "s" => Some(1_000_000_000),
        "m" => Some(60 * 1_000_000_000),
        "h" => Some(3_600 * 1_000_000_000),
        _ => None,
    }
}

/// Expand a leading `~` to the invoking user's home directory
pub fn expand_tilde(path: &Path) -> Result<PathBuf> {
    expand_tilde_with(path, dirs::home_dir())
}

fn expand_tilde_with(path: &Path, home: Option<PathBuf>) -> Result<PathBuf> {
    let Ok(rest) = path.strip_prefix("~") else {
        return Ok(path.to_path_buf());
    };

    let home = home.ok_or_else(|| Error::HomeDirUnavailable {
        path: path.to_path_buf(),
    })?;

    if rest.as_os_str().is_empty() {
        Ok(home)
    } else {
        Ok(home.join(rest))
    }
}
