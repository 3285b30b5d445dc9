//! The registry of compiled contract artifacts, keyed by contract name
//!
//! Artifacts are produced by an external compilation step. Both the Truffle
//! layout (`build/contracts/<Name>.json`, with `"bytecode": "0x.."`) and the
//! Foundry layout (`out/<Source>.sol/<Name>.json`, with
//! `"bytecode": { "object": "0x.." }`) are understood.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use alloy::json_abi::JsonAbi;
use alloy_primitives::Bytes;
use serde::Deserialize;
use tracing::debug;

use crate::{constants::JSON_EXTENSION, errors::MigrationError};

/// Directories in a build output that do not hold contract artifacts
const NON_ARTIFACT_DIRS: [&str; 2] = ["build-info", "cache"];

/// A compiled contract: its interface and creation bytecode
#[derive(Clone, Debug)]
pub struct Artifact {
    /// The contract's name, as used in migration scripts
    pub contract_name: String,
    /// The contract's ABI
    pub abi: JsonAbi,
    /// The contract's creation bytecode
    pub bytecode: Bytes,
    /// The version of the compiler that produced the artifact, if recorded
    pub compiler_version: Option<String>,
}

impl Artifact {
    /// Parse an artifact from its JSON representation.
    ///
    /// `fallback_name` is used when the artifact does not record its own
    /// contract name, as is the case for Foundry artifacts.
    pub fn from_json_str(contents: &str, fallback_name: &str) -> Result<Self, MigrationError> {
        let raw: RawArtifact = serde_json::from_str(contents)
            .map_err(|e| MigrationError::ArtifactParsing(format!("{fallback_name}: {e}")))?;

        let contract_name = raw.contract_name.unwrap_or_else(|| fallback_name.to_string());
        let hex = match raw.bytecode {
            RawBytecode::Hex(hex) => hex,
            RawBytecode::Object { object } => object,
        };
        if hex.contains("__") {
            return Err(MigrationError::ArtifactParsing(format!(
                "{contract_name}: bytecode contains unlinked library placeholders"
            )));
        }
        let bytecode = parse_hex(&hex)
            .map_err(|e| MigrationError::ArtifactParsing(format!("{contract_name}: {e}")))?;

        let compiler_version = raw
            .compiler
            .and_then(|c| c.version)
            .or_else(|| raw.metadata.and_then(|m| m.compiler).and_then(|c| c.version));

        Ok(Artifact {
            contract_name,
            abi: raw.abi,
            bytecode,
            compiler_version,
        })
    }

    /// Whether the artifact carries creation bytecode.
    ///
    /// Interfaces and abstract contracts compile to an empty bytecode.
    pub fn is_deployable(&self) -> bool {
        !self.bytecode.is_empty()
    }

    /// The number of arguments the contract's constructor takes
    pub fn constructor_arity(&self) -> usize {
        self.abi.constructor().map_or(0, |c| c.inputs.len())
    }

    /// The data of a creation transaction: bytecode followed by the
    /// ABI-encoded constructor arguments, if any
    pub fn deploy_code(&self, constructor_args: Option<&Bytes>) -> Bytes {
        match constructor_args {
            Some(args) => [self.bytecode.as_ref(), args.as_ref()].concat().into(),
            None => self.bytecode.clone(),
        }
    }
}

/// A mapping from contract name to compiled artifact.
///
/// Lookup fails closed: an unknown name is an error, never an empty handle.
#[derive(Clone, Debug, Default)]
pub struct ArtifactRegistry {
    /// The artifacts, keyed by contract name
    artifacts: BTreeMap<String, Artifact>,
}

impl ArtifactRegistry {
    /// Build a registry from already-parsed artifacts
    pub fn from_artifacts(
        artifacts: impl IntoIterator<Item = Artifact>,
    ) -> Result<Self, MigrationError> {
        let mut registry = Self::default();
        for artifact in artifacts {
            registry.insert(artifact)?;
        }

        Ok(registry)
    }

    /// Load every artifact found under `dir`, descending into subdirectories
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self, MigrationError> {
        let mut registry = Self::default();
        for path in artifact_files(dir.as_ref())? {
            let fallback_name = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or_default()
                .to_string();
            let contents = fs::read_to_string(&path).map_err(|e| {
                MigrationError::ArtifactParsing(format!("cannot read {}: {e}", path.display()))
            })?;

            let artifact = Artifact::from_json_str(&contents, &fallback_name)?;
            debug!(
                contract = %artifact.contract_name,
                path = %path.display(),
                "loaded artifact"
            );
            registry.insert(artifact)?;
        }

        Ok(registry)
    }

    /// Resolve the artifact compiled for `contract_name`
    pub fn resolve(&self, contract_name: &str) -> Result<&Artifact, MigrationError> {
        self.artifacts
            .get(contract_name)
            .ok_or_else(|| MigrationError::ArtifactResolution(contract_name.to_string()))
    }

    /// The names of all known contracts, in name order
    pub fn contract_names(&self) -> impl Iterator<Item = &str> {
        self.artifacts.keys().map(String::as_str)
    }

    /// The number of artifacts in the registry
    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    /// Whether the registry holds no artifacts
    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// Add `artifact`, rejecting a second artifact for the same contract
    fn insert(&mut self, artifact: Artifact) -> Result<(), MigrationError> {
        if self.artifacts.contains_key(&artifact.contract_name) {
            return Err(MigrationError::ArtifactParsing(format!(
                "duplicate artifact for contract `{}`",
                artifact.contract_name
            )));
        }

        self.artifacts.insert(artifact.contract_name.clone(), artifact);
        Ok(())
    }
}

// -----------
// | Helpers |
// -----------

/// The fields of a Truffle or Foundry artifact that deployment needs
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawArtifact {
    /// The contract name, recorded by Truffle only
    contract_name: Option<String>,
    /// The contract's ABI
    abi: JsonAbi,
    /// The creation bytecode
    bytecode: RawBytecode,
    /// The compiler, as recorded by Truffle
    compiler: Option<RawCompiler>,
    /// The solc metadata, which Foundry stores as an object
    metadata: Option<RawMetadata>,
}

/// Creation bytecode in either artifact layout
#[derive(Deserialize)]
#[serde(untagged)]
enum RawBytecode {
    /// Truffle: `"bytecode": "0x.."`
    Hex(String),
    /// Foundry: `"bytecode": { "object": "0x.." }`
    Object {
        /// The hex-encoded bytecode
        object: String,
    },
}

/// The compiler that produced an artifact
#[derive(Deserialize)]
struct RawCompiler {
    /// The full compiler version, build metadata included
    version: Option<String>,
}

/// Foundry nests the compiler under `metadata`. Truffle stores `metadata`
/// as a string, which is tolerated and ignored.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawMetadataInner {
    /// Metadata as an object, possibly naming the compiler
    Object {
        /// The compiler that produced the artifact
        compiler: Option<RawCompiler>,
    },
    /// Metadata in any other shape
    Other(serde_json::Value),
}

/// The part of an artifact's metadata that names its compiler
#[derive(Deserialize)]
#[serde(from = "RawMetadataInner")]
struct RawMetadata {
    /// The compiler that produced the artifact, if the metadata says
    compiler: Option<RawCompiler>,
}

impl From<RawMetadataInner> for RawMetadata {
    fn from(inner: RawMetadataInner) -> Self {
        match inner {
            RawMetadataInner::Object { compiler } => RawMetadata { compiler },
            RawMetadataInner::Other(_) => RawMetadata { compiler: None },
        }
    }
}

/// Parse a hex string, with or without a `0x` prefix, into bytes
fn parse_hex(hex: &str) -> Result<Bytes, String> {
    let hex = hex.trim();
    if hex.is_empty() || hex == "0x" {
        return Ok(Bytes::new());
    }

    Bytes::from_str(hex).map_err(|e| e.to_string())
}

/// Collect the JSON files under `dir`, sorted by path
fn artifact_files(dir: &Path) -> Result<Vec<PathBuf>, MigrationError> {
    let read_err =
        |e: std::io::Error| MigrationError::ArtifactParsing(format!("{}: {e}", dir.display()));

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_err)? {
        let path = entry.map_err(read_err)?.path();
        if path.is_dir() {
            let skip = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| NON_ARTIFACT_DIRS.contains(&name));
            if !skip {
                files.extend(artifact_files(&path)?);
            }
        } else if path.extension().is_some_and(|ext| ext == JSON_EXTENSION) {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}
