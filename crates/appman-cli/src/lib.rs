//! appman - command line access to an application server's manifests.
//!
//! Configuration is read from `--config` (or `<config_dir>/appman/config.toml`
//! when present) and individual values can be overridden by flags or the
//! `APPMAN_*` environment variables.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use appman_core::config::default_config_path;
use appman_core::{Manager, ManagerConfig};
use clap::{Parser, Subcommand};
use serde_json::json;

/// Command line arguments.
#[derive(Debug, Parser)]
#[command(name = "appman")]
#[command(author, version, about = "appman - application manifest client")]
pub struct Cli {
    /// Path to a TOML config file
    #[arg(long, global = true, env = "APPMAN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Application server base URL
    #[arg(long, global = true, env = "APPMAN_SERVER_URL")]
    pub server_url: Option<String>,

    /// Application identifier
    #[arg(long, global = true, env = "APPMAN_APP_ID")]
    pub app_id: Option<String>,

    /// Shared secret (prefer the environment variable)
    #[arg(long, global = true, env = "APPMAN_PASSPHRASE", hide_env_values = true)]
    pub passphrase: Option<String>,

    /// Treat every summary as an upgrade
    #[arg(long, global = true)]
    pub debug: bool,

    /// Log fetch details to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// What to fetch.
    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show the application summary
    Summary,
    /// List installable packages
    Packages,
    /// Show the server time
    Timestamp,
}

impl Cli {
    /// Merge the config file with flag and environment overrides.
    ///
    /// # Errors
    ///
    /// Fails if the config file cannot be loaded, or if there is no file and
    /// the server URL or passphrase is missing.
    pub fn resolve_config(&self) -> Result<ManagerConfig> {
        let path = self
            .config
            .clone()
            .or_else(|| default_config_path().filter(|p| p.exists()));

        let mut config = match path {
            Some(path) => {
                tracing::debug!("Loading config from {}", path.display());
                ManagerConfig::load(&path)
                    .with_context(|| format!("Failed to load {}", path.display()))?
            }
            None => {
                tracing::debug!("No config file; using flags and environment");
                let Some(server_url) = &self.server_url else {
                    bail!("No config file found; pass --server-url or set APPMAN_SERVER_URL");
                };
                let Some(passphrase) = &self.passphrase else {
                    bail!("No passphrase; set APPMAN_PASSPHRASE");
                };
                ManagerConfig::new(server_url.clone(), passphrase.as_str())
            }
        };

        if let Some(url) = &self.server_url {
            config.server_url.clone_from(url);
        }
        if let Some(passphrase) = &self.passphrase {
            config.passphrase = passphrase.as_str().into();
        }
        if self.debug {
            config.debug = true;
        }
        Ok(config)
    }
}

/// Execute the parsed command, printing JSON to stdout.
///
/// # Errors
///
/// Fails if the configuration is incomplete, the HTTP client cannot be
/// built, or nothing is known about the requested value.
pub fn run(cli: &Cli) -> Result<()> {
    let config = cli.resolve_config()?;
    let Some(app_id) = &cli.app_id else {
        bail!("No application id; pass --app-id or set APPMAN_APP_ID");
    };
    let manager = Manager::connect(app_id.as_str(), config).context("Failed to set up HTTP client")?;

    let output = match cli.command {
        Commands::Summary => {
            let Some(summary) = manager.summary() else {
                bail!("No summary available for {app_id}");
            };
            json!({
                "id": summary.id(),
                "name": summary.name(),
                "version": summary.version(),
            })
        }
        Commands::Packages => {
            let Some(packages) = manager.packages() else {
                bail!("No packages available for {app_id}");
            };
            serde_json::to_value(packages)?
        }
        Commands::Timestamp => {
            let Some(ts) = manager.timestamp() else {
                bail!("Server time unavailable");
            };
            json!(ts.to_rfc3339())
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
