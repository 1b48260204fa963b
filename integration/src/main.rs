//! Scenarios for the Furio deployment scripts, run on a simulated chain or a
//! development node.

#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

use clap::Parser;
use cli::Cli;
use colored::Colorize;
use eyre::Result;
use itertools::Itertools;
use test_args::TestArgs;
use test_inventory::IntegrationTest;

mod cli;
mod constants;
mod scenarios;
mod test_args;
mod test_inventory;
mod util;

/// Run every scenario matching the filter, each against fresh arguments
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .pretty()
        .with_max_level(cli.log_level())
        .init();

    let tests = inventory::iter::<IntegrationTest>
        .into_iter()
        .filter(|test| match &cli.test {
            Some(filter) => test.name.contains(filter.as_str()),
            None => true,
        })
        .sorted_by_key(|test| test.name)
        .collect_vec();
    if tests.is_empty() {
        eyre::bail!("no scenario matches {:?}", cli.test.unwrap_or_default());
    }

    let backend = match &cli.rpc_url {
        Some(url) => url.as_str(),
        None => "simulated chain",
    };
    println!("running {} scenarios on {}\n", tests.len(), backend);

    let mut failures = Vec::new();
    for test in &tests {
        let args = match &cli.rpc_url {
            Some(url) => {
                TestArgs::rpc(url, &cli.priv_key, &cli.user_priv_key, &cli.artifacts).await?
            }
            None => TestArgs::simulated(),
        };

        match (test.test_fn)(args).await {
            Ok(()) => println!("{} {}", "PASSED".green().bold(), test.name),
            Err(e) => {
                println!("{} {}", "FAILED".red().bold(), test.name);
                failures.push((test.name, e));
            }
        }
    }

    println!();
    if failures.is_empty() {
        println!("{}", format!("all {} scenarios passed", tests.len()).green());
        return Ok(());
    }

    for (name, e) in &failures {
        println!("{}: {:?}\n", name.red(), e);
    }
    println!(
        "{}",
        format!("{} of {} scenarios failed", failures.len(), tests.len()).red()
    );
    std::process::exit(1);
}
