//! Submitting deployment transactions to a network

use std::{str::FromStr, time::Duration};

use alloy::{
    network::{Ethereum, EthereumWallet, ReceiptResponse, TransactionBuilder},
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::types::TransactionRequest,
    signers::local::PrivateKeySigner,
    transports::http::reqwest::Url,
};
use async_trait::async_trait;
use tokio::time::timeout;
use tracing::debug;

use crate::{
    artifacts::Artifact, config::NetworkProfile, errors::MigrationError,
    migrations::DeploymentStep, types::DeploymentReceipt,
};

/// The handle through which the runner deploys contracts.
///
/// `deploy` must not return before the deployment has reached a terminal
/// state, either confirmed or rejected.
#[async_trait]
pub trait ContractDeployer: Send + Sync {
    /// The identifier of the chain this deployer submits to
    async fn chain_id(&self) -> Result<u64, MigrationError>;

    /// Deploy a new instance of `artifact` as instructed by `step`
    /// and wait for it to be confirmed
    async fn deploy(
        &self,
        artifact: &Artifact,
        step: &DeploymentStep,
    ) -> Result<DeploymentReceipt, MigrationError>;
}

/// A [`ContractDeployer`] talking to a node over JSON-RPC, signing with a local key
pub struct RpcDeployer {
    /// The provider, with the deployer's wallet attached
    provider: DynProvider<Ethereum>,
    /// The number of block confirmations to wait for
    confirmations: u64,
    /// An optional gas limit for creation transactions
    gas: Option<u64>,
    /// How long to wait for a receipt
    timeout: Duration,
}

impl RpcDeployer {
    /// Connect to the node backing `network`, signing with `priv_key`
    pub fn new(network: &NetworkProfile, priv_key: &str) -> Result<Self, MigrationError> {
        Self::with_rpc_url(&network.rpc_url(), network, priv_key)
    }

    /// Connect to the node at `rpc_url`, using the deployment
    /// settings of `network`
    pub fn with_rpc_url(
        rpc_url: &str,
        network: &NetworkProfile,
        priv_key: &str,
    ) -> Result<Self, MigrationError> {
        let signer = PrivateKeySigner::from_str(priv_key)
            .map_err(|e| MigrationError::ClientInitialization(e.to_string()))?;
        let url =
            Url::parse(rpc_url).map_err(|e| MigrationError::ClientInitialization(e.to_string()))?;

        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .on_http(url);

        Ok(Self {
            provider: DynProvider::new(provider),
            confirmations: network.confirmations,
            gas: network.gas,
            timeout: network.deploy_timeout,
        })
    }

    /// The underlying provider
    pub fn provider(&self) -> &DynProvider<Ethereum> {
        &self.provider
    }
}

#[async_trait]
impl ContractDeployer for RpcDeployer {
    async fn chain_id(&self) -> Result<u64, MigrationError> {
        timeout(self.timeout, self.provider.get_chain_id())
            .await
            .map_err(|_| {
                MigrationError::ClientInitialization(format!(
                    "no chain id reported within {}s",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| MigrationError::ClientInitialization(e.to_string()))
    }

    async fn deploy(
        &self,
        artifact: &Artifact,
        step: &DeploymentStep,
    ) -> Result<DeploymentReceipt, MigrationError> {
        let contract = &step.contract_name;

        let mut tx = TransactionRequest::default()
            .with_deploy_code(artifact.deploy_code(step.constructor_args.as_ref()));
        if let Some(gas) = self.gas {
            tx = tx.with_gas_limit(gas);
        }

        // Filling the nonce and gas also waits on the node
        let pending = timeout(self.timeout, self.provider.send_transaction(tx))
            .await
            .map_err(|_| {
                MigrationError::deployment(
                    contract,
                    format!(
                        "creation transaction not accepted within {}s",
                        self.timeout.as_secs()
                    ),
                )
            })?
            .map_err(|e| MigrationError::deployment(contract, e))?;
        let transaction_hash = *pending.tx_hash();
        debug!(%contract, tx = %transaction_hash, "submitted creation transaction");

        // A receipt is only available once the transaction is mined,
        // so at least one confirmation is always awaited
        let receipt = pending
            .with_required_confirmations(self.confirmations.max(1))
            .with_timeout(Some(self.timeout))
            .get_receipt()
            .await
            .map_err(|e| MigrationError::deployment(contract, e))?;

        if !receipt.status() {
            return Err(MigrationError::deployment(
                contract,
                format!("creation transaction {transaction_hash} reverted"),
            ));
        }

        let address = receipt.contract_address.ok_or_else(|| {
            MigrationError::deployment(contract, "receipt carries no contract address")
        })?;

        Ok(DeploymentReceipt {
            address,
            transaction_hash,
        })
    }
}

#[cfg(test)]
mod tests {
    use tokio::net::TcpListener;

    use super::{ContractDeployer, RpcDeployer};
    use crate::{
        artifacts::tests::dummy_artifact, config::Configuration, errors::MigrationError,
        migrations::DeploymentStep,
    };

    /// The first of the default anvil accounts
    const ANVIL_PRIV_KEY: &str =
        "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[tokio::test]
    async fn test_unresponsive_node_times_out() {
        // Connections complete in the backlog but no request is ever answered
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let config = Configuration::from_json_str(&format!(
            r#"{{
                "networks": {{
                    "stalled": {{
                        "host": "127.0.0.1",
                        "port": {port},
                        "network_id": "*",
                        "deploy_timeout": 1
                    }}
                }},
                "compilers": {{ "solc": {{ "version": "0.8.11" }} }}
            }}"#
        ))
        .unwrap();
        let network = config.network("stalled").unwrap();
        let deployer = RpcDeployer::new(network, ANVIL_PRIV_KEY).unwrap();

        let res = deployer.chain_id().await;
        assert!(matches!(res, Err(MigrationError::ClientInitialization(_))));

        let step = DeploymentStep::new(1, "Zombie");
        let res = deployer.deploy(&dummy_artifact("Zombie"), &step).await;
        assert!(matches!(
            res,
            Err(MigrationError::Deployment { contract, .. }) if contract == "Zombie"
        ));

        drop(listener);
    }
}
