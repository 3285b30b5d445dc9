//! Loading and validation of the network / compiler configuration
//!
//! The configuration file is the JSON rendering of a declarative
//! key-value description:
//!
//! ```json
//! {
//!     "networks": {
//!         "development": { "host": "127.0.0.1", "port": 7545, "network_id": "*" }
//!     },
//!     "compilers": { "solc": { "version": "0.8.11" } }
//! }
//! ```

use std::{
    collections::BTreeMap,
    fmt::{self, Display},
    fs,
    path::Path,
    str::FromStr,
    time::Duration,
};

use serde::Deserialize;

use crate::{
    constants::{
        ANY_CHAIN_ID, DEFAULT_DEPLOY_CONFIRMATIONS, DEFAULT_DEPLOY_TIMEOUT_SECS, RPC_URL_SCHEME,
    },
    errors::MigrationError,
};

// ---------
// | Types |
// ---------

/// The chain a network profile is willing to deploy to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChainId {
    /// Accept whichever chain the node reports
    Any,
    /// Only deploy to the chain with this identifier
    Exact(u64),
}

impl ChainId {
    /// Whether a node reporting `chain_id` satisfies this profile
    pub fn accepts(&self, chain_id: u64) -> bool {
        match self {
            ChainId::Any => true,
            ChainId::Exact(id) => *id == chain_id,
        }
    }
}

impl FromStr for ChainId {
    type Err = MigrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == ANY_CHAIN_ID {
            return Ok(ChainId::Any);
        }

        s.parse::<u64>().map(ChainId::Exact).map_err(|_| {
            MigrationError::Configuration(format!(
                "invalid network_id `{s}`, expected an integer or `{ANY_CHAIN_ID}`"
            ))
        })
    }
}

impl Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainId::Any => write!(f, "{ANY_CHAIN_ID}"),
            ChainId::Exact(id) => write!(f, "{id}"),
        }
    }
}

/// A named target environment for deployment
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetworkProfile {
    /// The name the network is declared under
    pub name: String,
    /// The host of the node's RPC endpoint
    pub host: String,
    /// The port of the node's RPC endpoint
    pub port: u16,
    /// The chain the profile deploys to
    pub chain_id: ChainId,
    /// The number of block confirmations to wait for after each deployment
    pub confirmations: u64,
    /// An optional gas limit for deployment transactions
    pub gas: Option<u64>,
    /// How long to wait for a deployment to be confirmed
    pub deploy_timeout: Duration,
}

impl NetworkProfile {
    /// The RPC url of the node backing this network
    pub fn rpc_url(&self) -> String {
        format!("{RPC_URL_SCHEME}://{}:{}", self.host, self.port)
    }
}

/// The compiler whose artifacts are deployed
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompilerSpec {
    /// The compiler's name, e.g. `solc`
    pub tool_name: String,
    /// The pinned semantic version, e.g. `0.8.11`
    pub version: String,
}

impl CompilerSpec {
    /// Whether an artifact built by the given compiler version matches the pin.
    ///
    /// Build metadata (`0.8.11+commit.d7f03943`) is ignored.
    pub fn matches(&self, version: &str) -> bool {
        strip_build_metadata(version) == strip_build_metadata(&self.version)
    }
}

/// A validated configuration: the declared networks and the compiler pin
#[derive(Clone, Debug)]
pub struct Configuration {
    /// The declared networks, keyed by name
    networks: BTreeMap<String, NetworkProfile>,
    /// The single active compiler pin
    compiler: CompilerSpec,
}

impl Configuration {
    /// Read and validate the configuration file at `path`
    pub fn load(path: impl AsRef<Path>) -> Result<Self, MigrationError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            MigrationError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;

        Self::from_json_str(&contents)
    }

    /// Parse and validate a configuration from its JSON representation
    pub fn from_json_str(contents: &str) -> Result<Self, MigrationError> {
        let raw: RawConfiguration = serde_json::from_str(contents)
            .map_err(|e| MigrationError::Configuration(e.to_string()))?;

        raw.validate()
    }

    /// Select the network declared under `name`
    pub fn network(&self, name: &str) -> Result<&NetworkProfile, MigrationError> {
        self.networks.get(name).ok_or_else(|| {
            MigrationError::Configuration(format!("network `{name}` is not declared"))
        })
    }

    /// All declared networks, in name order
    pub fn networks(&self) -> impl Iterator<Item = &NetworkProfile> {
        self.networks.values()
    }

    /// The compiler artifacts are expected to be built with
    pub fn compiler(&self) -> &CompilerSpec {
        &self.compiler
    }
}

// -----------------
// | Raw Structure |
// -----------------

/// The configuration file as written, before validation
#[derive(Deserialize)]
struct RawConfiguration {
    /// The network declarations, keyed by name
    #[serde(default)]
    networks: BTreeMap<String, RawNetwork>,
    /// The compiler declarations, keyed by tool name
    #[serde(default)]
    compilers: BTreeMap<String, RawCompiler>,
}

/// A network declaration as written. Every field is optional here so that
/// missing fields are reported by name.
#[derive(Deserialize)]
struct RawNetwork {
    /// The node's host
    host: Option<String>,
    /// The node's port, wide enough to report out-of-range values
    port: Option<i64>,
    /// The chain identifier, or `*`
    network_id: Option<RawChainId>,
    /// Block confirmations to wait for
    confirmations: Option<u64>,
    /// Gas limit for creation transactions
    gas: Option<u64>,
    /// Seconds to wait on the node
    deploy_timeout: Option<u64>,
}

/// `network_id` may be written as a number or as a string
#[derive(Deserialize)]
#[serde(untagged)]
enum RawChainId {
    /// `"network_id": 1`
    Number(u64),
    /// `"network_id": "1"` or `"network_id": "*"`
    Text(String),
}

/// A compiler declaration as written
#[derive(Deserialize)]
struct RawCompiler {
    /// The pinned version
    version: Option<String>,
}

impl RawConfiguration {
    /// Check the declarations and convert them into a [`Configuration`]
    fn validate(self) -> Result<Configuration, MigrationError> {
        if self.networks.is_empty() {
            return Err(MigrationError::Configuration(
                "no networks are declared".to_string(),
            ));
        }

        let networks = self
            .networks
            .into_iter()
            .map(|(name, raw)| raw.validate(&name).map(|profile| (name, profile)))
            .collect::<Result<BTreeMap<_, _>, _>>()?;

        let mut compilers = self.compilers.into_iter();
        let (tool_name, raw_compiler) = match (compilers.next(), compilers.next()) {
            (Some(compiler), None) => compiler,
            (None, _) => {
                return Err(MigrationError::Configuration(
                    "no compiler is declared".to_string(),
                ))
            }
            (Some(_), Some(_)) => {
                return Err(MigrationError::Configuration(
                    "exactly one compiler may be declared".to_string(),
                ))
            }
        };

        let version = raw_compiler.version.ok_or_else(|| {
            MigrationError::Configuration(format!("compilers.{tool_name}.version is missing"))
        })?;
        validate_version(&version)?;

        Ok(Configuration {
            networks,
            compiler: CompilerSpec { tool_name, version },
        })
    }
}

impl RawNetwork {
    /// Check the declaration of the network `name` and convert it into a profile
    fn validate(self, name: &str) -> Result<NetworkProfile, MigrationError> {
        let missing = |field: &str| {
            MigrationError::Configuration(format!("networks.{name}.{field} is missing"))
        };

        let host = self.host.ok_or_else(|| missing("host"))?;
        if host.trim().is_empty() {
            return Err(MigrationError::Configuration(format!(
                "networks.{name}.host is empty"
            )));
        }

        let port = self.port.ok_or_else(|| missing("port"))?;
        let port = u16::try_from(port)
            .ok()
            .filter(|port| *port > 0)
            .ok_or_else(|| {
                MigrationError::Configuration(format!(
                    "networks.{name}.port `{port}` is outside 1..=65535"
                ))
            })?;

        let chain_id = match self.network_id.ok_or_else(|| missing("network_id"))? {
            RawChainId::Number(id) => ChainId::Exact(id),
            RawChainId::Text(text) => text.parse()?,
        };

        Ok(NetworkProfile {
            name: name.to_string(),
            host,
            port,
            chain_id,
            confirmations: self.confirmations.unwrap_or(DEFAULT_DEPLOY_CONFIRMATIONS),
            gas: self.gas,
            deploy_timeout: Duration::from_secs(
                self.deploy_timeout.unwrap_or(DEFAULT_DEPLOY_TIMEOUT_SECS),
            ),
        })
    }
}

/// Drop `+build` metadata from a version string
fn strip_build_metadata(version: &str) -> &str {
    version.split('+').next().unwrap_or(version).trim()
}

/// Check that `version` is `MAJOR.MINOR.PATCH`, optionally followed by
/// `-prerelease` and / or `+build`
fn validate_version(version: &str) -> Result<(), MigrationError> {
    let core = strip_build_metadata(version);
    let core = core.split('-').next().unwrap_or(core);
    let parts: Vec<&str> = core.split('.').collect();

    let valid = parts.len() == 3
        && parts
            .iter()
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()));

    if valid {
        Ok(())
    } else {
        Err(MigrationError::Configuration(format!(
            "compiler version `{version}` is not a semantic version"
        )))
    }
}
