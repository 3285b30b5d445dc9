//! Constants used in the migration scripts

/// The default path of the network / compiler configuration file
pub const DEFAULT_CONFIG_PATH: &str = "migrate-config.json";

/// The default directory holding compiled contract artifacts
pub const DEFAULT_ARTIFACTS_DIR: &str = "build/contracts";

/// The default directory holding the migration scripts
pub const DEFAULT_MIGRATIONS_DIR: &str = "migrations";

/// The default path of the deployment history file
pub const DEFAULT_DEPLOYMENTS_PATH: &str = "deployments.json";

/// The wildcard chain identifier, accepting any chain
pub const ANY_CHAIN_ID: &str = "*";

/// The extension of artifact and migration script files
pub const JSON_EXTENSION: &str = "json";

/// Separator between the number and the name of a migration script file,
/// e.g. `2_deploy_contracts.json`
pub const MIGRATION_NUMBER_SEPARATOR: char = '_';

/// The number of confirmations to wait for a deployment transaction
/// when the network profile does not say otherwise
pub const DEFAULT_DEPLOY_CONFIRMATIONS: u64 = 0;

/// How long to wait for a deployment receipt, in seconds,
/// when the network profile does not say otherwise
pub const DEFAULT_DEPLOY_TIMEOUT_SECS: u64 = 120;

/// The scheme used to build an RPC url from a network's host and port
pub const RPC_URL_SCHEME: &str = "http";
