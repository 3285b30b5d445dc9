//! Definitions of errors that can occur while loading configuration and running migrations

use thiserror::Error;

/// Errors that can occur during the execution of the migration scripts
#[derive(Debug, Error)]
pub enum MigrationError {
    /// A network or compiler declaration is malformed or missing,
    /// or a migration script could not be loaded
    #[error("configuration error: {0}")]
    Configuration(String),
    /// The named contract is not among the compiled artifacts
    #[error("artifact `{0}` not found among compiled artifacts")]
    ArtifactResolution(String),
    /// Error parsing a compilation artifact
    #[error("error parsing artifact: {0}")]
    ArtifactParsing(String),
    /// Error initializing the RPC client
    #[error("error initializing client: {0}")]
    ClientInitialization(String),
    /// The network rejected a deployment, or could not be reached
    #[error("error deploying `{contract}`: {reason}")]
    Deployment {
        /// The contract whose deployment failed
        contract: String,
        /// Why the deployment failed
        reason: String,
    },
    /// Error reading the `deployments.json` file
    #[error("error reading deployments: {0}")]
    ReadDeployments(String),
    /// Error writing the `deployments.json` file
    #[error("error writing deployments: {0}")]
    WriteDeployments(String),
    /// A deployment step failed, aborting the rest of the run
    #[error("{}step {step} (`{contract}`) failed: {source}", migration_prefix(.migration))]
    Step {
        /// The number of the migration script the step belongs to, if any
        migration: Option<u64>,
        /// The ordinal of the failing step
        step: usize,
        /// The contract the step deploys
        contract: String,
        /// Why the step failed
        source: Box<MigrationError>,
    },
}

impl MigrationError {
    /// Shorthand for a [`MigrationError::Deployment`] on the given contract
    pub fn deployment(contract: impl Into<String>, reason: impl ToString) -> Self {
        MigrationError::Deployment {
            contract: contract.into(),
            reason: reason.to_string(),
        }
    }

    /// The ordinal of the failing step, if the error arose in one
    pub fn step(&self) -> Option<usize> {
        match self {
            MigrationError::Step { step, .. } => Some(*step),
            _ => None,
        }
    }

    /// The migration script the failing step belongs to, if known
    pub fn migration(&self) -> Option<u64> {
        match self {
            MigrationError::Step { migration, .. } => *migration,
            _ => None,
        }
    }

    /// Attach the number of the migration script a failing step belongs to
    pub(crate) fn in_migration(self, number: u64) -> Self {
        match self {
            MigrationError::Step { step, contract, source, .. } => MigrationError::Step {
                migration: Some(number),
                step,
                contract,
                source,
            },
            other => other,
        }
    }

    /// The underlying error, with any step context removed
    pub fn root_cause(&self) -> &MigrationError {
        match self {
            MigrationError::Step { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Render the migration number a failing step belongs to, if known
fn migration_prefix(migration: &Option<u64>) -> String {
    migration.map(|number| format!("migration {number}, ")).unwrap_or_default()
}
