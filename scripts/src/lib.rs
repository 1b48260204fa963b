//! Scripts for deploying, wiring and upgrading the Furio contracts.

#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

pub mod artifacts;
pub mod chain;
pub mod cli;
mod commands;
pub mod components;
pub mod constants;
pub mod errors;
pub mod handle;
pub mod plan;
pub mod proxy;
pub mod registry;
pub mod sequencer;
#[cfg(any(test, feature = "test-helpers"))]
pub mod sim;
pub mod solidity;
pub mod types;
pub mod utils;
