//! Type definitions shared by the runner, the deployers and the deployment history

use alloy_primitives::{Address, TxHash};

/// The lifecycle of a deployment run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    /// No step has been submitted yet
    Pending,
    /// Steps are being executed
    Running,
    /// Every step of the last run succeeded
    Completed,
    /// A step failed and the remaining steps were abandoned
    Failed,
}

/// What the network reports back for a confirmed deployment
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeploymentReceipt {
    /// The address of the new contract instance
    pub address: Address,
    /// The hash of the creation transaction
    pub transaction_hash: TxHash,
}

/// A contract instance created by a deployment step
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeployedContract {
    /// The name of the deployed contract
    pub contract_name: String,
    /// The ordinal of the step that deployed it
    pub ordinal: usize,
    /// The address of the instance
    pub address: Address,
    /// The hash of the creation transaction
    pub transaction_hash: TxHash,
}

/// The outcome of running a set of migration scripts
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// The numbers of the scripts that ran, in order
    pub completed: Vec<u64>,
    /// The numbers of the scripts skipped because they already ran on this network
    pub skipped: Vec<u64>,
    /// Every contract deployed, in deployment order
    pub deployed: Vec<DeployedContract>,
}
