//! Migration scripts: ordered lists of contracts to deploy
//!
//! A migration script is a JSON file named `<number>_<name>.json` in the
//! migrations directory, e.g. `2_deploy_contracts.json`:
//!
//! ```json
//! { "deploy": ["ZombieFactory", { "contract": "Zombie", "overwrite": false }] }
//! ```
//!
//! Scripts run in ascending number order, and the steps within a script run
//! in the order they are declared.

use std::{fs, path::Path, str::FromStr};

use alloy_primitives::Bytes;
use itertools::Itertools;
use serde::Deserialize;

use crate::{
    constants::{JSON_EXTENSION, MIGRATION_NUMBER_SEPARATOR},
    errors::MigrationError,
};

/// A single "deploy contract X" instruction
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeploymentStep {
    /// The name of the contract artifact to deploy
    pub contract_name: String,
    /// The step's position in the deployment sequence
    pub ordinal: usize,
    /// Whether to deploy a new instance even if one is already recorded
    /// for this network
    pub overwrite: bool,
    /// ABI-encoded constructor arguments, appended to the creation bytecode
    pub constructor_args: Option<Bytes>,
}

impl DeploymentStep {
    /// A step deploying `contract_name` at position `ordinal`
    pub fn new(ordinal: usize, contract_name: impl Into<String>) -> Self {
        Self {
            contract_name: contract_name.into(),
            ordinal,
            overwrite: true,
            constructor_args: None,
        }
    }

    /// Build a sequence of steps deploying the given contracts in order
    pub fn sequence<S: Into<String>>(contract_names: impl IntoIterator<Item = S>) -> Vec<Self> {
        contract_names
            .into_iter()
            .enumerate()
            .map(|(i, name)| Self::new(i + 1, name))
            .collect()
    }

    /// Skip this step when the contract is already deployed on the network
    pub fn without_overwrite(mut self) -> Self {
        self.overwrite = false;
        self
    }

    /// Pass the given ABI-encoded arguments to the contract's constructor
    pub fn with_constructor_args(mut self, args: Bytes) -> Self {
        self.constructor_args = Some(args);
        self
    }
}

/// A numbered migration script
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MigrationScript {
    /// The script's number, which orders it among the other scripts
    pub number: u64,
    /// The script's name, without its number prefix
    pub name: String,
    /// The deployments the script performs, in order
    pub steps: Vec<DeploymentStep>,
}

impl MigrationScript {
    /// A script deploying the given contracts in order
    pub fn new<S: Into<String>>(
        number: u64,
        name: impl Into<String>,
        contract_names: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            number,
            name: name.into(),
            steps: DeploymentStep::sequence(contract_names),
        }
    }

    /// Parse a script from its JSON representation
    pub fn from_json_str(number: u64, name: &str, contents: &str) -> Result<Self, MigrationError> {
        let raw: RawScript = serde_json::from_str(contents).map_err(|e| {
            MigrationError::Configuration(format!("migration {number}_{name}: {e}"))
        })?;

        let steps = raw
            .deploy
            .into_iter()
            .enumerate()
            .map(|(i, raw_step)| raw_step.into_step(i + 1))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| MigrationError::Configuration(format!("migration {number}_{name}: {e}")))?;

        Ok(Self {
            number,
            name: name.to_string(),
            steps,
        })
    }

    /// Load all scripts in `dir`, ordered by number
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Vec<Self>, MigrationError> {
        let dir = dir.as_ref();
        let read_err = |e: std::io::Error| {
            MigrationError::Configuration(format!("cannot read {}: {e}", dir.display()))
        };

        let mut scripts = Vec::new();
        for entry in fs::read_dir(dir).map_err(read_err)? {
            let path = entry.map_err(read_err)?.path();
            if !path.is_file() || !path.extension().is_some_and(|ext| ext == JSON_EXTENSION) {
                continue;
            }

            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
            let (number, name) = parse_script_file_stem(stem)?;
            let contents = fs::read_to_string(&path).map_err(read_err)?;
            scripts.push(Self::from_json_str(number, name, &contents)?);
        }

        Self::ordered(scripts)
    }

    /// Sort scripts by number, rejecting duplicate numbers
    pub fn ordered(scripts: Vec<Self>) -> Result<Vec<Self>, MigrationError> {
        let scripts: Vec<Self> = scripts.into_iter().sorted_by_key(|s| s.number).collect();
        if let Some((a, b)) = scripts
            .iter()
            .tuple_windows()
            .find(|(a, b)| a.number == b.number)
        {
            return Err(MigrationError::Configuration(format!(
                "migrations `{}` and `{}` share the number {}",
                a.name, b.name, a.number
            )));
        }

        Ok(scripts)
    }
}

// -----------
// | Helpers |
// -----------

/// A migration script as written
#[derive(Deserialize)]
struct RawScript {
    /// The contracts to deploy, in order
    deploy: Vec<RawStep>,
}

/// A step is either a bare contract name or an object with options
#[derive(Deserialize)]
#[serde(untagged)]
enum RawStep {
    /// Just the contract's name
    Name(String),
    /// The contract's name along with deployment options
    Detailed {
        /// The contract's name
        contract: String,
        /// Whether to deploy even if the contract is already recorded
        #[serde(default = "default_overwrite")]
        overwrite: bool,
        /// Hex-encoded constructor arguments
        #[serde(default)]
        args: Option<String>,
    },
}

/// Steps deploy a new instance unless told otherwise
fn default_overwrite() -> bool {
    true
}

impl RawStep {
    /// Convert into the step at position `ordinal`
    fn into_step(self, ordinal: usize) -> Result<DeploymentStep, String> {
        match self {
            RawStep::Name(name) => Ok(DeploymentStep::new(ordinal, name)),
            RawStep::Detailed {
                contract,
                overwrite,
                args,
            } => {
                let mut step = DeploymentStep::new(ordinal, contract);
                step.overwrite = overwrite;
                if let Some(args) = args {
                    let args = Bytes::from_str(&args).map_err(|e| {
                        format!("invalid constructor args for {}: {e}", step.contract_name)
                    })?;
                    step.constructor_args = Some(args);
                }

                Ok(step)
            }
        }
    }
}

/// Split `2_deploy_contracts` into `(2, "deploy_contracts")`
fn parse_script_file_stem(stem: &str) -> Result<(u64, &str), MigrationError> {
    let (number, name) = stem
        .split_once(MIGRATION_NUMBER_SEPARATOR)
        .unwrap_or((stem, ""));

    let number = number.parse::<u64>().map_err(|_| {
        MigrationError::Configuration(format!(
            "migration file `{stem}` must be prefixed with a number, e.g. `2_deploy_contracts`"
        ))
    })?;

    Ok((number, name))
}
