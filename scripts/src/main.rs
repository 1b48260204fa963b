use std::time::Duration;

use clap::Parser;
use furio_scripts::{cli::Cli, errors::ScriptError, utils::setup_client};

#[tokio::main]
async fn main() -> Result<(), ScriptError> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .pretty()
        .with_max_level(cli.log_level())
        .init();

    let rpc_url = cli.rpc_url()?;
    let poll = cli.poll_config();
    let client = setup_client(
        &cli.priv_key,
        &rpc_url,
        &cli.artifacts,
        Duration::from_secs(cli.confirmation_timeout_secs),
    )
    .await?;

    cli.command.run(client, cli.deployments_path, poll).await
}
