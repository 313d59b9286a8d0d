//! Command-line interface
//!
//! Every flag can also be set through a `GITOMATIC_*` environment variable.

use clap::{ArgAction, Parser};
use std::path::PathBuf;

use crate::auth::Credential;
use crate::config::{
    parse_interval, Config, Identity, DEFAULT_AUTHOR, DEFAULT_EMAIL, DEFAULT_INTERVAL,
    DEFAULT_PRIVKEY, DEFAULT_REMOTE,
};
use crate::error::Result;

#[derive(Debug, Parser)]
#[command(name = "gitomatic")]
#[command(about = "Automatically commit, pull and push a git working tree", long_about = None)]
pub struct Cli {
    /// Root of the repository to keep in sync
    pub path: PathBuf,

    /// Pull from the remote before looking for changes
    #[arg(long, env = "GITOMATIC_PULL", default_value_t = true, action = ArgAction::Set)]
    pub pull: bool,

    /// Commit local changes and push them to the remote
    #[arg(long, env = "GITOMATIC_PUSH", default_value_t = true, action = ArgAction::Set)]
    pub push: bool,

    /// Author name for commits
    #[arg(long, env = "GITOMATIC_AUTHOR", default_value = DEFAULT_AUTHOR)]
    pub author: String,

    /// Author email for commits
    #[arg(long, env = "GITOMATIC_EMAIL", default_value = DEFAULT_EMAIL)]
    pub email: String,

    /// How often to check for changes, e.g. "30s", "1m", "1h30m"
    #[arg(long, env = "GITOMATIC_INTERVAL", default_value = DEFAULT_INTERVAL)]
    pub interval: String,

    /// Private key used for SSH authentication
    #[arg(long, env = "GITOMATIC_PRIVKEY", default_value = DEFAULT_PRIVKEY)]
    pub privkey: PathBuf,

    /// Passphrase for the private key
    #[arg(long, env = "GITOMATIC_PASSPHRASE", hide_env_values = true)]
    pub passphrase: Option<String>,

    /// Username for HTTP basic auth; takes precedence over the private key
    #[arg(long, env = "GITOMATIC_USERNAME", default_value = "")]
    pub username: String,

    /// Password for HTTP basic auth
    #[arg(long, env = "GITOMATIC_PASSWORD", default_value = "", hide_env_values = true)]
    pub password: String,

    /// Remote to pull from and push to
    #[arg(long, env = "GITOMATIC_REMOTE", default_value = DEFAULT_REMOTE)]
    pub remote: String,

    /// Run a single cycle and exit
    #[arg(long, env = "GITOMATIC_ONCE")]
    pub once: bool,
}

impl Cli {
    /// Validate the options and split them into loop settings and credential
    pub fn into_config(self) -> Result<(Config, Credential)> {
        let interval = parse_interval(&self.interval)?;
        let credential = Credential::from_options(
            &self.username,
            &self.password,
            &self.privkey,
            self.passphrase,
        )?;

        let config = Config::new(self.path)
            .with_pull(self.pull)
            .with_push(self.push)
            .with_identity(Identity::new(self.author, self.email))
            .with_interval(interval)
            .with_remote(self.remote);

        Ok((config, credential))
    }
}
