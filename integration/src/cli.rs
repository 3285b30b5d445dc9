//! Definition of the CLI arguments for integration tests

use clap::{Parser, ValueEnum};

use crate::constants::{DEFAULT_DEVNET_HOST, DEFAULT_DEVNET_PKEY, DEFAULT_DEVNET_PORT};

/// CLI tool for running integration tests against a running devnet node.
///
/// Every test deploys its own contracts, nothing needs to be deployed beforehand.
#[derive(Parser)]
pub(crate) struct Cli {
    /// Test to run, all tests run if omitted
    #[arg(short, long)]
    pub(crate) test: Option<Tests>,

    /// Devnet host
    #[arg(long, default_value = DEFAULT_DEVNET_HOST)]
    pub(crate) host: String,

    /// Devnet RPC port
    #[arg(long, default_value_t = DEFAULT_DEVNET_PORT)]
    pub(crate) port: u16,

    /// Devnet private key, defaults to the first Anvil account
    #[arg(short, long, env = "PKEY", default_value = DEFAULT_DEVNET_PKEY)]
    pub(crate) priv_key: String,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub(crate) enum Tests {
    SequentialDeploy,
    Redeploy,
    UnknownArtifact,
    Migrations,
}

impl Tests {
    pub(crate) const ALL: [Tests; 4] = [
        Tests::SequentialDeploy,
        Tests::Redeploy,
        Tests::UnknownArtifact,
        Tests::Migrations,
    ];
}
