//! The `deployments.json` file: per-network record of deployed contracts
//! and of the last migration that completed

use std::{collections::BTreeMap, fs, path::Path};

use alloy_primitives::{Address, TxHash};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{errors::MigrationError, types::DeployedContract};

/// The recorded deployments, keyed by network name
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentHistory {
    /// The record of each network migrations have run against
    #[serde(default)]
    networks: BTreeMap<String, NetworkDeployments>,
}

/// What has been deployed to one network
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkDeployments {
    /// The chain the network reported when the contracts were deployed
    pub chain_id: u64,
    /// The number of the last migration script that completed
    #[serde(default)]
    pub last_completed_migration: Option<u64>,
    /// The latest instance of each contract, keyed by contract name
    #[serde(default)]
    pub contracts: BTreeMap<String, ContractRecord>,
}

/// The latest deployed instance of a contract
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractRecord {
    /// The instance's address
    pub address: Address,
    /// The hash of the creation transaction
    pub transaction_hash: TxHash,
    /// The migration that deployed the instance
    pub migration: u64,
}

impl DeploymentHistory {
    /// Read the history at `path`. A missing file is an empty history.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, MigrationError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| MigrationError::ReadDeployments(format!("{}: {e}", path.display())))?;
        serde_json::from_str(&contents)
            .map_err(|e| MigrationError::ReadDeployments(format!("{}: {e}", path.display())))
    }

    /// Write the history to `path`, replacing its contents
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), MigrationError> {
        let path = path.as_ref();
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| MigrationError::WriteDeployments(e.to_string()))?;

        fs::write(path, contents)
            .map_err(|e| MigrationError::WriteDeployments(format!("{}: {e}", path.display())))
    }

    /// The record of the network named `name`, if migrations ever ran on it
    pub fn network(&self, name: &str) -> Option<&NetworkDeployments> {
        self.networks.get(name)
    }

    /// The record of the network named `name` as seen on `chain_id`.
    ///
    /// A record made on a different chain is stale, e.g. a development
    /// chain that has been restarted, and is replaced by an empty one.
    pub fn network_mut(&mut self, name: &str, chain_id: u64) -> &mut NetworkDeployments {
        let record = self
            .networks
            .entry(name.to_string())
            .or_insert_with(|| NetworkDeployments::new(chain_id));

        if record.chain_id != chain_id {
            warn!(
                network = name,
                recorded_chain_id = record.chain_id,
                chain_id,
                "recorded deployments belong to another chain, discarding them"
            );
            *record = NetworkDeployments::new(chain_id);
        }

        record
    }
}

impl NetworkDeployments {
    /// An empty record for the given chain
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            last_completed_migration: None,
            contracts: BTreeMap::new(),
        }
    }

    /// The recorded address of `contract_name`, if any
    pub fn address_of(&self, contract_name: &str) -> Option<Address> {
        self.contracts.get(contract_name).map(|r| r.address)
    }

    /// Record that `migration` completed after deploying `deployed`
    pub fn record(&mut self, migration: u64, deployed: &[DeployedContract]) {
        self.record_contracts(migration, deployed);
        self.complete(migration);
    }

    /// Record contracts deployed by `migration`, whether or not it completed
    pub fn record_contracts(&mut self, migration: u64, deployed: &[DeployedContract]) {
        for contract in deployed {
            self.contracts.insert(
                contract.contract_name.clone(),
                ContractRecord {
                    address: contract.address,
                    transaction_hash: contract.transaction_hash,
                    migration,
                },
            );
        }
    }

    /// Mark `migration` as completed on this network
    pub fn complete(&mut self, migration: u64) {
        self.last_completed_migration = Some(migration);
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{Address, TxHash};

    use super::DeploymentHistory;
    use crate::{errors::MigrationError, types::DeployedContract};

    /// A contract deployed at an address made of `byte`
    fn deployed(name: &str, byte: u8) -> DeployedContract {
        DeployedContract {
            contract_name: name.to_string(),
            ordinal: 1,
            address: Address::repeat_byte(byte),
            transaction_hash: TxHash::repeat_byte(byte),
        }
    }

    #[test]
    fn test_record_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deployments.json");

        let mut history = DeploymentHistory::load(&path).unwrap();
        assert_eq!(history, DeploymentHistory::default());

        history
            .network_mut("development", 1337)
            .record(2, &[deployed("ZombieFactory", 0x11)]);
        history.save(&path).unwrap();

        let reloaded = DeploymentHistory::load(&path).unwrap();
        assert_eq!(reloaded, history);

        let record = reloaded.network("development").unwrap();
        assert_eq!(record.chain_id, 1337);
        assert_eq!(record.last_completed_migration, Some(2));
        assert_eq!(
            record.address_of("ZombieFactory"),
            Some(Address::repeat_byte(0x11))
        );
        assert_eq!(record.contracts["ZombieFactory"].migration, 2);
    }

    #[test]
    fn test_later_deployment_replaces_record() {
        let mut history = DeploymentHistory::default();
        let record = history.network_mut("development", 1337);
        record.record(1, &[deployed("Zombie", 0x01)]);
        record.record(2, &[deployed("Zombie", 0x02)]);

        assert_eq!(record.address_of("Zombie"), Some(Address::repeat_byte(0x02)));
        assert_eq!(record.last_completed_migration, Some(2));
    }

    #[test]
    fn test_contracts_recorded_without_completion() {
        let mut history = DeploymentHistory::default();
        let record = history.network_mut("development", 1337);
        record.record(1, &[deployed("ZombieFactory", 0x01)]);
        record.record_contracts(2, &[deployed("Zombie", 0x02)]);

        assert_eq!(record.address_of("Zombie"), Some(Address::repeat_byte(0x02)));
        assert_eq!(record.contracts["Zombie"].migration, 2);
        assert_eq!(record.last_completed_migration, Some(1));
    }

    #[test]
    fn test_stale_chain_discarded() {
        let mut history = DeploymentHistory::default();
        history
            .network_mut("development", 1337)
            .record(2, &[deployed("Zombie", 0x01)]);

        let record = history.network_mut("development", 5777);
        assert_eq!(record.chain_id, 5777);
        assert_eq!(record.last_completed_migration, None);
        assert!(record.contracts.is_empty());
    }

    #[test]
    fn test_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deployments.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(matches!(
            DeploymentHistory::load(&path),
            Err(MigrationError::ReadDeployments(_))
        ));
    }
}
