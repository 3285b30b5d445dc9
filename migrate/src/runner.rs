//! The deployment runner: executes deployment steps one after the other
//! against a single, explicitly selected network
//!
//! Each step resolves its artifact, submits the creation transaction and
//! waits for it to be confirmed before the next step starts, since later
//! steps may depend on contracts deployed by earlier ones. The first failure
//! aborts the rest of the run. There is no retry.

use std::collections::BTreeMap;

use alloy_primitives::Address;
use itertools::Itertools;
use tracing::{error, info, warn};

use crate::{
    artifacts::ArtifactRegistry,
    config::{CompilerSpec, NetworkProfile},
    deployer::ContractDeployer,
    deployments::DeploymentHistory,
    errors::MigrationError,
    migrations::{DeploymentStep, MigrationScript},
    types::{DeployedContract, MigrationReport, RunState},
};

/// Runs deployment steps against one network
pub struct Runner<D> {
    /// The network deployments target
    network: NetworkProfile,
    /// The compiler artifacts are expected to be built with
    compiler: Option<CompilerSpec>,
    /// The compiled artifacts, by contract name
    registry: ArtifactRegistry,
    /// The handle used to submit deployments
    deployer: D,
    /// The chain id reported by the deployer, once verified
    chain_id: Option<u64>,
    /// Where the runner is in its lifecycle
    state: RunState,
    /// Every contract deployed by this runner, in order
    deployed: Vec<DeployedContract>,
    /// Addresses recorded for this network before the runner started
    recorded: BTreeMap<String, Address>,
}

impl<D: ContractDeployer> Runner<D> {
    /// A runner deploying artifacts from `registry` to `network` through `deployer`
    pub fn new(network: NetworkProfile, registry: ArtifactRegistry, deployer: D) -> Self {
        Self {
            network,
            compiler: None,
            registry,
            deployer,
            chain_id: None,
            state: RunState::Pending,
            deployed: Vec::new(),
            recorded: BTreeMap::new(),
        }
    }

    /// Warn about artifacts not built with `compiler`
    pub fn with_compiler(mut self, compiler: CompilerSpec) -> Self {
        self.compiler = Some(compiler);
        self
    }

    /// The network this runner deploys to
    pub fn network(&self) -> &NetworkProfile {
        &self.network
    }

    /// The deployer this runner submits through
    pub fn deployer(&self) -> &D {
        &self.deployer
    }

    /// The runner's current state
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Every contract deployed so far, in deployment order
    pub fn deployed(&self) -> &[DeployedContract] {
        &self.deployed
    }

    /// The latest known address of `contract_name` on this network, whether
    /// deployed by this runner or recorded before it started
    pub fn address_of(&self, contract_name: &str) -> Option<Address> {
        self.deployed
            .iter()
            .rev()
            .find(|c| c.contract_name == contract_name)
            .map(|c| c.address)
            .or_else(|| self.recorded.get(contract_name).copied())
    }

    /// Check that the deployer is connected to a chain the network profile
    /// accepts, returning its chain id
    pub async fn verify_chain(&mut self) -> Result<u64, MigrationError> {
        if let Some(chain_id) = self.chain_id {
            return Ok(chain_id);
        }

        let chain_id = self.deployer.chain_id().await?;
        if !self.network.chain_id.accepts(chain_id) {
            return Err(MigrationError::Configuration(format!(
                "network `{}` expects chain {}, but the node reports chain {chain_id}",
                self.network.name, self.network.chain_id
            )));
        }

        self.chain_id = Some(chain_id);
        Ok(chain_id)
    }

    /// Execute `steps` in ordinal order, returning the contracts deployed.
    ///
    /// Steps that opt out of overwriting are skipped when the contract
    /// already has a known address. Every other step deploys a new
    /// instance, so running the same steps twice yields two instances each.
    pub async fn run(
        &mut self,
        steps: &[DeploymentStep],
    ) -> Result<Vec<DeployedContract>, MigrationError> {
        self.state = RunState::Running;
        let res = self.execute(steps).await;
        self.state = if res.is_ok() {
            RunState::Completed
        } else {
            RunState::Failed
        };

        res
    }

    /// Run each script not yet completed on this network, recording the
    /// progress in `history` after every script.
    ///
    /// With `reset`, every script runs regardless of earlier progress.
    /// Progress made before a failure is kept in `history`.
    pub async fn run_migrations(
        &mut self,
        scripts: &[MigrationScript],
        history: &mut DeploymentHistory,
        reset: bool,
    ) -> Result<MigrationReport, MigrationError> {
        let chain_id = self.verify_chain().await?;
        let record = history.network_mut(&self.network.name, chain_id);
        self.recorded = record
            .contracts
            .iter()
            .map(|(name, contract)| (name.clone(), contract.address))
            .collect();

        let last_completed = if reset {
            None
        } else {
            record.last_completed_migration
        };

        let mut report = MigrationReport::default();
        for script in MigrationScript::ordered(scripts.to_vec())? {
            if last_completed.is_some_and(|last| script.number <= last) {
                info!(
                    migration = script.number,
                    name = %script.name,
                    "migration already completed on this network, skipping"
                );
                report.skipped.push(script.number);
                continue;
            }

            info!(
                network = %self.network.name,
                migration = script.number,
                name = %script.name,
                "running migration"
            );
            let first_deployed = self.deployed.len();
            let res = self.run(&script.steps).await;

            // Contracts deployed before a failing step are live on chain
            record.record_contracts(script.number, &self.deployed[first_deployed..]);
            let deployed = res.map_err(|e| {
                let e = e.in_migration(script.number);
                error!(migration = script.number, name = %script.name, "migration failed: {e}");
                e
            })?;

            record.complete(script.number);
            report.completed.push(script.number);
            report.deployed.extend(deployed);
        }

        Ok(report)
    }

    /// Execute the steps, stopping at the first failure
    async fn execute(
        &mut self,
        steps: &[DeploymentStep],
    ) -> Result<Vec<DeployedContract>, MigrationError> {
        let steps: Vec<&DeploymentStep> = steps.iter().sorted_by_key(|s| s.ordinal).collect();
        if let Some((a, _)) = steps
            .iter()
            .tuple_windows()
            .find(|(a, b)| a.ordinal == b.ordinal)
        {
            return Err(MigrationError::Configuration(format!(
                "more than one deployment step has ordinal {}",
                a.ordinal
            )));
        }

        self.verify_chain().await?;

        let mut deployed = Vec::with_capacity(steps.len());
        for step in steps {
            match self.execute_step(step).await {
                Ok(Some(contract)) => {
                    self.deployed.push(contract.clone());
                    deployed.push(contract);
                }
                Ok(None) => {}
                Err(e) => {
                    error!(
                        network = %self.network.name,
                        step = step.ordinal,
                        contract = %step.contract_name,
                        "deployment step failed: {e}"
                    );
                    return Err(MigrationError::Step {
                        migration: None,
                        step: step.ordinal,
                        contract: step.contract_name.clone(),
                        source: Box::new(e),
                    });
                }
            }
        }

        Ok(deployed)
    }

    /// Execute a single step, returning `None` if it was skipped
    async fn execute_step(
        &self,
        step: &DeploymentStep,
    ) -> Result<Option<DeployedContract>, MigrationError> {
        let contract = &step.contract_name;

        if !step.overwrite {
            if let Some(address) = self.address_of(contract) {
                info!(%contract, %address, "already deployed, not overwriting");
                return Ok(None);
            }
        }

        let artifact = self.registry.resolve(contract)?;
        if !artifact.is_deployable() {
            return Err(MigrationError::ArtifactResolution(format!(
                "{contract} (artifact has no bytecode, is it an interface or abstract contract?)"
            )));
        }

        let arity = artifact.constructor_arity();
        if arity > 0 && step.constructor_args.is_none() {
            return Err(MigrationError::deployment(
                contract,
                format!("constructor expects {arity} argument(s), none were given"),
            ));
        }
        if arity == 0 && step.constructor_args.is_some() {
            return Err(MigrationError::deployment(
                contract,
                "constructor takes no arguments, but some were given",
            ));
        }

        if let (Some(compiler), Some(version)) = (&self.compiler, &artifact.compiler_version) {
            if !compiler.matches(version) {
                warn!(
                    %contract,
                    artifact_version = %version,
                    pinned_version = %compiler.version,
                    "artifact was not built with the pinned {} version",
                    compiler.tool_name
                );
            }
        }

        info!(
            network = %self.network.name,
            step = step.ordinal,
            %contract,
            "deploying"
        );
        let receipt = self.deployer.deploy(artifact, step).await?;
        info!(
            %contract,
            address = %receipt.address,
            tx = %receipt.transaction_hash,
            "deployed"
        );

        Ok(Some(DeployedContract {
            contract_name: contract.clone(),
            ordinal: step.ordinal,
            address: receipt.address,
            transaction_hash: receipt.transaction_hash,
        }))
    }
}
