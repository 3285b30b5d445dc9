//! Integration tests for the migration runner

use std::str::FromStr;

use alloy::providers::Provider;
use alloy_primitives::Bytes;
use eyre::{eyre, Result};
use migrate::{
    deployments::DeploymentHistory,
    errors::MigrationError,
    migrations::{DeploymentStep, MigrationScript},
    types::RunState,
};

use crate::{constants::ANSWER_RUNTIME_CODE, utils::TestArgs};

/// Deploy two contracts and check they land, in order, with the expected code
pub(crate) async fn test_sequential_deploy(args: &TestArgs) -> Result<()> {
    let mut runner = args.runner(&["ZombieFactory", "Zombie"])?;
    let sender = args.deployer_address()?;
    let nonce = runner
        .deployer()
        .provider()
        .get_transaction_count(sender)
        .await?;

    let deployed = runner
        .run(&DeploymentStep::sequence(["ZombieFactory", "Zombie"]))
        .await?;

    assert_eq!(runner.state(), RunState::Completed);
    assert_eq!(deployed.len(), 2, "Expected two deployments");

    // Creation addresses follow the sender's nonce, so they reveal the submission order
    assert_eq!(deployed[0].contract_name, "ZombieFactory");
    assert_eq!(deployed[0].address, sender.create(nonce));
    assert_eq!(deployed[1].contract_name, "Zombie");
    assert_eq!(deployed[1].address, sender.create(nonce + 1));

    let runtime = Bytes::from_str(ANSWER_RUNTIME_CODE)?;
    for contract in &deployed {
        let code = runner
            .deployer()
            .provider()
            .get_code_at(contract.address)
            .await?;
        assert_eq!(
            code, runtime,
            "Unexpected code at {}",
            contract.contract_name
        );
    }

    Ok(())
}

/// Running the same steps twice creates independent instances
pub(crate) async fn test_redeploy(args: &TestArgs) -> Result<()> {
    let mut runner = args.runner(&["Zombie"])?;
    let steps = DeploymentStep::sequence(["Zombie"]);

    let first = runner.run(&steps).await?;
    let second = runner.run(&steps).await?;

    assert_ne!(
        first[0].address, second[0].address,
        "Redeploying reused the previous instance"
    );

    Ok(())
}

/// An unknown artifact fails the run before anything is submitted
pub(crate) async fn test_unknown_artifact(args: &TestArgs) -> Result<()> {
    let mut runner = args.runner(&["Zombie"])?;
    let sender = args.deployer_address()?;
    let provider = runner.deployer().provider().clone();
    let nonce_before = provider.get_transaction_count(sender).await?;

    let res = runner
        .run(&DeploymentStep::sequence(["Unknown", "Zombie"]))
        .await;
    match res.as_ref().map_err(MigrationError::root_cause) {
        Err(MigrationError::ArtifactResolution(_)) => {}
        res => return Err(eyre!("Expected an artifact resolution error, got {res:?}")),
    }

    let nonce_after = provider.get_transaction_count(sender).await?;
    assert_eq!(nonce_before, nonce_after, "A transaction was submitted");
    assert_eq!(runner.state(), RunState::Failed);

    Ok(())
}

/// Migrations record their progress and are not run twice
pub(crate) async fn test_migrations(args: &TestArgs) -> Result<()> {
    let scripts = vec![
        MigrationScript::new(1, "deploy_zombie_factory", ["ZombieFactory"]),
        MigrationScript::new(2, "deploy_zombie", ["Zombie"]),
    ];
    let mut history = DeploymentHistory::default();

    let mut runner = args.runner(&["ZombieFactory", "Zombie"])?;
    let report = runner
        .run_migrations(&scripts, &mut history, false /* reset */)
        .await?;
    assert_eq!(report.completed, vec![1, 2]);

    let mut runner = args.runner(&["ZombieFactory", "Zombie"])?;
    let report = runner
        .run_migrations(&scripts, &mut history, false /* reset */)
        .await?;
    assert_eq!(report.skipped, vec![1, 2]);
    assert!(report.deployed.is_empty());

    Ok(())
}
