//! Implementations of the migration commands

use std::fmt::Write;

use tracing::{error, info};

use crate::{
    artifacts::ArtifactRegistry,
    cli::{MigrateArgs, ProjectPaths},
    config::{Configuration, NetworkProfile},
    deployer::{ContractDeployer, RpcDeployer},
    deployments::DeploymentHistory,
    errors::MigrationError,
    migrations::MigrationScript,
    runner::Runner,
    types::MigrationReport,
};

/// Run the pending migrations against the selected network over JSON-RPC
pub async fn migrate(args: MigrateArgs, paths: &ProjectPaths) -> Result<(), MigrationError> {
    let priv_key = args.priv_key;
    migrate_with(paths, &args.network, args.reset, |network| {
        RpcDeployer::new(network, &priv_key)
    })
    .await
    .map(|_| ())
}

/// Run the pending migrations against the selected network, deploying
/// through whatever `connect` builds for it.
///
/// The deployment history is written back even when a migration fails,
/// so that the migrations which did complete are not run again.
pub async fn migrate_with<D, F>(
    paths: &ProjectPaths,
    network_name: &str,
    reset: bool,
    connect: F,
) -> Result<MigrationReport, MigrationError>
where
    D: ContractDeployer,
    F: FnOnce(&NetworkProfile) -> Result<D, MigrationError>,
{
    let config = Configuration::load(&paths.config)?;
    let network = config.network(network_name)?.clone();
    let compiler = config.compiler().clone();
    info!(
        network = %network.name,
        rpc_url = %network.rpc_url(),
        chain_id = %network.chain_id,
        compiler = %compiler.tool_name,
        compiler_version = %compiler.version,
        "selected network"
    );

    let registry = ArtifactRegistry::load_dir(&paths.artifacts_dir)?;
    let scripts = MigrationScript::load_dir(&paths.migrations_dir)?;
    info!(
        artifacts = registry.len(),
        migrations = scripts.len(),
        "loaded project"
    );

    let deployer = connect(&network)?;
    let mut history = DeploymentHistory::load(&paths.deployments)?;
    let mut runner = Runner::new(network, registry, deployer).with_compiler(compiler);

    let res = runner.run_migrations(&scripts, &mut history, reset).await;
    let saved = history.save(&paths.deployments);
    let report = match (res, saved) {
        // The failed step is the error worth reporting
        (Err(e), Err(save_err)) => {
            error!("could not record deployment progress: {save_err}");
            return Err(e);
        }
        (res, saved) => {
            saved?;
            res?
        }
    };

    for contract in &report.deployed {
        info!(
            contract = %contract.contract_name,
            address = %contract.address,
            "deployed"
        );
    }
    info!(
        completed = report.completed.len(),
        skipped = report.skipped.len(),
        "migrations finished"
    );

    Ok(report)
}

/// Print the configured networks along with the contracts recorded on them
pub fn list_networks(paths: &ProjectPaths) -> Result<(), MigrationError> {
    let config = Configuration::load(&paths.config)?;
    let history = DeploymentHistory::load(&paths.deployments)?;

    print!("{}", render_networks(&config, &history));
    Ok(())
}

/// Render the listing printed by [`list_networks`]
pub fn render_networks(config: &Configuration, history: &DeploymentHistory) -> String {
    let compiler = config.compiler();
    let mut out = format!("Compiler: {} {}\n", compiler.tool_name, compiler.version);

    for network in config.networks() {
        let _ = writeln!(
            out,
            "\nNetwork: {} ({}, network_id: {})",
            network.name,
            network.rpc_url(),
            network.chain_id
        );

        match history.network(&network.name) {
            Some(record) if !record.contracts.is_empty() => {
                for (name, contract) in &record.contracts {
                    let _ = writeln!(out, "  {name}: {:#x}", contract.address);
                }
            }
            _ => {
                let _ = writeln!(out, "  No contracts deployed.");
            }
        }
    }

    out
}
