//! Scenarios run against a simulated chain or a development node

mod registry;
mod staking;
mod swap;
mod upgrade;
mod wiring;
