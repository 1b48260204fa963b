//! Defines types and utilities for managing the inventory of scenarios

use std::{future::Future, pin::Pin};

use eyre::Result;

use crate::test_args::TestArgs;

/// The signature of a scenario
type TestFn = fn(TestArgs) -> Pin<Box<dyn Future<Output = Result<()>>>>;

/// A registered scenario
pub struct IntegrationTest {
    /// The name of the scenario
    pub name: &'static str,
    /// The scenario function
    pub test_fn: TestFn,
}

// Collect the scenarios into an iterable
inventory::collect!(IntegrationTest);

/// Register a scenario with the runner, and as a `cargo test` against the simulated chain
#[macro_export]
macro_rules! integration_test {
    ($test_fn:ident) => {
        inventory::submit!($crate::test_inventory::IntegrationTest {
            name: stringify!($test_fn),
            test_fn: move |args| std::boxed::Box::pin($test_fn(args)),
        });

        /// The scenario on the simulated chain
        #[cfg(test)]
        mod $test_fn {
            /// Run the scenario against a fresh simulated chain
            #[tokio::test]
            async fn simulated() -> eyre::Result<()> {
                super::$test_fn($crate::test_args::TestArgs::simulated()).await
            }
        }
    };
}
