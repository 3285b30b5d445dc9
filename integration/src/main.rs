//! Integration tests for the migration runner.
//! These assume that a devnet is already running locally.

use clap::Parser;
use cli::{Cli, Tests};
use eyre::Result;
use tests::{test_migrations, test_redeploy, test_sequential_deploy, test_unknown_artifact};
use tracing::info;
use utils::TestArgs;

mod cli;
mod constants;
mod tests;
mod utils;

#[tokio::main]
async fn main() -> Result<()> {
    let Cli {
        test,
        host,
        port,
        priv_key,
    } = Cli::parse();

    tracing_subscriber::fmt().init();

    let args = TestArgs::new(&host, port, priv_key)?;
    let tests = match test {
        Some(test) => vec![test],
        None => Tests::ALL.to_vec(),
    };

    for test in tests {
        info!("running {test:?}");
        match test {
            Tests::SequentialDeploy => test_sequential_deploy(&args).await?,
            Tests::Redeploy => test_redeploy(&args).await?,
            Tests::UnknownArtifact => test_unknown_artifact(&args).await?,
            Tests::Migrations => test_migrations(&args).await?,
        }
        info!("{test:?} passed");
    }

    Ok(())
}
