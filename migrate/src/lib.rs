//! Scripts for deploying compiled contracts to a network, migration by migration.

#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

pub mod artifacts;
pub mod cli;
pub mod commands;
pub mod config;
pub mod constants;
pub mod deployer;
pub mod deployments;
pub mod errors;
pub mod migrations;
pub mod runner;
pub mod types;
