//! Definitions of CLI arguments and commands for the migration scripts

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::Level;

use crate::{
    commands::{list_networks, migrate},
    constants::{
        DEFAULT_ARTIFACTS_DIR, DEFAULT_CONFIG_PATH, DEFAULT_DEPLOYMENTS_PATH,
        DEFAULT_MIGRATIONS_DIR,
    },
    errors::MigrationError,
};

/// Deploy compiled contracts to an EVM network, one migration at a time
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the network / compiler configuration file
    #[arg(short, long, env = "MIGRATE_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Directory holding the compiled contract artifacts
    #[arg(short, long, default_value = DEFAULT_ARTIFACTS_DIR)]
    pub artifacts_dir: PathBuf,

    /// Directory holding the numbered migration scripts
    #[arg(short, long, default_value = DEFAULT_MIGRATIONS_DIR)]
    pub migrations_dir: PathBuf,

    /// Path to the file recording deployed contracts
    #[arg(short, long, default_value = DEFAULT_DEPLOYMENTS_PATH)]
    pub deployments: PathBuf,

    /// Increase logging verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// The command to run
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// The maximum level of log events to emit
    pub fn log_level(&self) -> Level {
        match self.verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }

    /// The project files the commands operate on
    pub fn paths(&self) -> ProjectPaths {
        ProjectPaths {
            config: self.config.clone(),
            artifacts_dir: self.artifacts_dir.clone(),
            migrations_dir: self.migrations_dir.clone(),
            deployments: self.deployments.clone(),
        }
    }
}

/// The files and directories making up a migration project
#[derive(Clone, Debug)]
pub struct ProjectPaths {
    /// The network / compiler configuration file
    pub config: PathBuf,
    /// The compiled artifacts directory
    pub artifacts_dir: PathBuf,
    /// The migration scripts directory
    pub migrations_dir: PathBuf,
    /// The deployment history file
    pub deployments: PathBuf,
}

/// The available commands
#[derive(Subcommand)]
pub enum Command {
    /// Run pending migrations against a network
    Migrate(MigrateArgs),
    /// List the configured networks and what is deployed on them
    Networks,
}

/// Run the migration scripts against a network
#[derive(Args)]
pub struct MigrateArgs {
    /// Name of the network to deploy to
    #[arg(short, long, default_value = "development")]
    pub network: String,

    /// Private key of the deployer
    #[arg(short, long, env = "PKEY", hide_env_values = true)]
    pub priv_key: String,

    /// Run every migration from the start, even those already completed
    #[arg(long)]
    pub reset: bool,
}

impl Command {
    /// Run the command against the given project
    pub async fn run(self, paths: &ProjectPaths) -> Result<(), MigrationError> {
        match self {
            Command::Migrate(args) => migrate(args, paths).await,
            Command::Networks => list_networks(paths),
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use tracing::Level;

    use super::{Cli, Command};

    #[test]
    fn test_parse_migrate() {
        let cli = Cli::parse_from([
            "migrate",
            "-vv",
            "--artifacts-dir",
            "out",
            "migrate",
            "--network",
            "development",
            "--priv-key",
            "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
            "--reset",
        ]);

        assert_eq!(cli.log_level(), Level::TRACE);
        assert_eq!(cli.paths().artifacts_dir.to_str(), Some("out"));
        assert_eq!(cli.paths().migrations_dir.to_str(), Some("migrations"));
        match cli.command {
            Command::Migrate(args) => {
                assert_eq!(args.network, "development");
                assert!(args.reset);
            }
            Command::Networks => panic!("expected the migrate command"),
        }
    }

    #[test]
    fn test_parse_networks() {
        let cli = Cli::parse_from(["migrate", "--config", "zombies.json", "networks"]);
        assert_eq!(cli.log_level(), Level::INFO);
        assert_eq!(cli.paths().config.to_str(), Some("zombies.json"));
        assert!(matches!(cli.command, Command::Networks));
    }
}
