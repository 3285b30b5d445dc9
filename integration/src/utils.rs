//! Utilities for running integration tests

use std::str::FromStr;

use alloy::signers::local::PrivateKeySigner;
use alloy_primitives::Address;
use eyre::Result;
use migrate::{
    artifacts::{Artifact, ArtifactRegistry},
    config::{Configuration, NetworkProfile},
    deployer::RpcDeployer,
    runner::Runner,
};

use crate::constants::{ANSWER_CREATION_CODE, DEVNET_NETWORK_NAME, TEST_COMPILER_VERSION};

/// The arguments shared by every test
pub(crate) struct TestArgs {
    /// The devnet's network profile
    pub(crate) network: NetworkProfile,
    /// The deployer's private key
    pub(crate) priv_key: String,
}

impl TestArgs {
    /// Declare the devnet at `host:port` as a network accepting any chain
    pub(crate) fn new(host: &str, port: u16, priv_key: String) -> Result<Self> {
        let config = Configuration::from_json_str(&format!(
            r#"{{
                "networks": {{
                    "{DEVNET_NETWORK_NAME}": {{ "host": "{host}", "port": {port}, "network_id": "*" }}
                }},
                "compilers": {{ "solc": {{ "version": "{TEST_COMPILER_VERSION}" }} }}
            }}"#
        ))?;
        let network = config.network(DEVNET_NETWORK_NAME)?.clone();

        Ok(Self { network, priv_key })
    }

    /// The address deployments are sent from
    pub(crate) fn deployer_address(&self) -> Result<Address> {
        Ok(PrivateKeySigner::from_str(&self.priv_key)?.address())
    }

    /// A runner deploying the given contracts to the devnet
    pub(crate) fn runner(&self, contract_names: &[&str]) -> Result<Runner<RpcDeployer>> {
        let deployer = RpcDeployer::new(&self.network, &self.priv_key)?;
        Ok(Runner::new(
            self.network.clone(),
            answer_registry(contract_names)?,
            deployer,
        ))
    }
}

/// A registry in which every named contract is the "answer 42" contract
pub(crate) fn answer_registry(contract_names: &[&str]) -> Result<ArtifactRegistry> {
    let artifacts = contract_names
        .iter()
        .map(|name| {
            Artifact::from_json_str(
                &format!(
                    r#"{{
                        "contractName": "{name}",
                        "abi": [],
                        "bytecode": "{ANSWER_CREATION_CODE}",
                        "compiler": {{ "name": "solc", "version": "{TEST_COMPILER_VERSION}" }}
                    }}"#
                ),
                name,
            )
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ArtifactRegistry::from_artifacts(artifacts)?)
}
