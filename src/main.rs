//! gitomatic CLI - Automatic Git Sync

use anyhow::Context;
use clap::Parser;
use gitomatic::cli::Cli;
use gitomatic::{Error, GitRepository, SyncLoop};

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            // --help and --version are not failures
            std::process::exit(if e.use_stderr() { 1 } else { 0 });
        }
    };

    if let Err(e) = run(cli).await {
        tracing::error!("{}", fatal_message(&e));
        std::process::exit(1);
    }
}

/// Startup configuration errors point back at the options; anything else
/// stopped a running daemon
fn fatal_message(err: &anyhow::Error) -> String {
    match err.downcast_ref::<Error>() {
        Some(e) if e.is_config_error() => {
            format!("Not starting: {:#} (see --help for the options)", err)
        }
        _ => format!("Fatal: {:#}", err),
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let once = cli.once;
    let (config, credential) = cli.into_config().context("Invalid configuration")?;

    tracing::info!("git-o-matic starting with {}", credential.describe());

    let repo = GitRepository::open(&config.repo_path).context("Cannot access repository")?;
    let mut sync = SyncLoop::new(config, credential, repo);

    if once {
        sync.run_cycle()?;
        return Ok(());
    }

    sync.run().await?;
    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_config_errors_are_reported_as_startup_failures() {
        let err = anyhow::Error::new(Error::InvalidKey {
            path: PathBuf::from("/tmp/key"),
        })
        .context("Invalid configuration");

        let message = fatal_message(&err);
        assert!(message.starts_with("Not starting: Invalid configuration"));
        assert!(message.contains("--help"));
    }

    #[test]
    fn test_cycle_errors_are_reported_as_fatal() {
        let err = anyhow::Error::new(Error::Commit {
            source: git2::Error::from_str("index locked"),
        });

        let message = fatal_message(&err);
        assert!(message.starts_with("Fatal: "));
        assert!(message.contains("index locked"));
        assert!(!message.contains("--help"));
    }
}
