//! Utilities for the deployment scripts.

use std::{
    collections::BTreeMap,
    fs::{self, File},
    future::Future,
    io::Read,
    path::Path,
    str::FromStr,
    sync::Arc,
    time::Duration,
};

use alloy_primitives::Address;
use serde_json::{json, Value};
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::{
    artifacts::ArtifactStore, chain::rpc::RpcChainClient, constants::DEPLOYMENTS_KEY,
    errors::ScriptError, types::PollConfig,
};

/// Sets up the signing client used by the scripts, reading contract
/// bytecode from the given artifacts directory.
pub async fn setup_client(
    priv_key: &str,
    rpc_url: &str,
    artifacts_dir: &Path,
    confirmation_timeout: Duration,
) -> Result<Arc<RpcChainClient>, ScriptError> {
    let client = RpcChainClient::connect(
        rpc_url,
        priv_key,
        ArtifactStore::new(artifacts_dir),
        confirmation_timeout,
    )
    .await?;

    Ok(Arc::new(client))
}

/// Parse an operator-supplied address, rejecting empty and zero values
pub fn parse_address(label: &str, value: &str) -> Result<Address, ScriptError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ScriptError::Config(format!("{} is empty", label)));
    }

    let address = Address::from_str(value)
        .map_err(|e| ScriptError::Config(format!("{} is not an address: {}", label, e)))?;
    if address.is_zero() {
        return Err(ScriptError::Config(format!("{} is the zero address", label)));
    }

    Ok(address)
}

/// Read and parse a JSON file
pub fn get_json_from_file(file_path: &Path) -> Result<Value, ScriptError> {
    let mut file_contents = String::new();
    File::open(file_path)
        .map_err(|e| ScriptError::ReadDeployments(e.to_string()))?
        .read_to_string(&mut file_contents)
        .map_err(|e| ScriptError::ReadDeployments(e.to_string()))?;

    serde_json::from_str(&file_contents).map_err(|e| ScriptError::ReadDeployments(e.to_string()))
}

/// Every address recorded in the deployments file, keyed by deployment key.
///
/// A missing file is treated as an empty deployment.
pub fn read_deployments(file_path: &Path) -> Result<BTreeMap<String, Address>, ScriptError> {
    if !file_path.exists() {
        return Ok(BTreeMap::new());
    }

    let parsed_json = get_json_from_file(file_path)?;
    let Some(entries) = parsed_json[DEPLOYMENTS_KEY].as_object() else {
        return Ok(BTreeMap::new());
    };

    entries
        .iter()
        .map(|(key, value)| {
            let address = value
                .as_str()
                .ok_or_else(|| {
                    ScriptError::ReadDeployments(format!("{} is not an address string", key))
                })
                .and_then(|s| {
                    Address::from_str(s).map_err(|e| ScriptError::ReadDeployments(e.to_string()))
                })?;
            Ok((key.clone(), address))
        })
        .collect()
}

/// The address recorded under `contract_key` in the deployments file
pub fn parse_addr_from_deployments_file(
    file_path: &Path,
    contract_key: &str,
) -> Result<Address, ScriptError> {
    read_deployments(file_path)?
        .get(contract_key)
        .copied()
        .ok_or_else(|| {
            ScriptError::ReadDeployments(format!(
                "no `{}` entry in {}",
                contract_key,
                file_path.display()
            ))
        })
}

/// Record `address` under `contract_key` in the deployments file, creating it if needed
pub fn write_deployed_address(
    file_path: &Path,
    contract_key: &str,
    address: Address,
) -> Result<(), ScriptError> {
    // If the file doesn't exist, create it
    if !file_path.exists() {
        fs::write(file_path, "{}").map_err(|e| ScriptError::WriteDeployments(e.to_string()))?;
    }
    let mut parsed_json = get_json_from_file(file_path)?;

    if !parsed_json[DEPLOYMENTS_KEY].is_object() {
        parsed_json[DEPLOYMENTS_KEY] = json!({});
    }
    parsed_json[DEPLOYMENTS_KEY][contract_key] = Value::String(format!("{address:#x}"));

    let contents = serde_json::to_string_pretty(&parsed_json)
        .map_err(|e| ScriptError::WriteDeployments(e.to_string()))?;
    fs::write(file_path, contents).map_err(|e| ScriptError::WriteDeployments(e.to_string()))?;

    Ok(())
}

/// Repeatedly run `check` until it reports `true`, sleeping `poll.interval`
/// between attempts and failing with [`ScriptError::PropagationTimeout`]
/// once `poll.timeout` has elapsed.
pub async fn poll_until<F, Fut>(what: &str, poll: &PollConfig, mut check: F) -> Result<(), ScriptError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, ScriptError>>,
{
    let deadline = Instant::now() + poll.timeout;
    loop {
        if check().await? {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(ScriptError::PropagationTimeout(what.to_string()));
        }

        debug!("waiting for {} to propagate", what);
        sleep(poll.interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address_rejects_empty_and_zero() {
        assert!(matches!(parse_address("SAFE", ""), Err(ScriptError::Config(_))));
        assert!(matches!(parse_address("SAFE", "  "), Err(ScriptError::Config(_))));
        assert!(matches!(
            parse_address("SAFE", "0x0000000000000000000000000000000000000000"),
            Err(ScriptError::Config(_))
        ));
        assert!(matches!(parse_address("SAFE", "0x1234"), Err(ScriptError::Config(_))));
        assert_eq!(
            parse_address("SAFE", "0x00000000000000000000000000000000000000aa").unwrap(),
            Address::with_last_byte(0xaa)
        );
    }

    #[test]
    fn test_deployments_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deployments.json");
        assert!(read_deployments(&path).unwrap().is_empty());

        let pool = Address::repeat_byte(0x11);
        write_deployed_address(&path, "pool", Address::repeat_byte(0x10)).unwrap();
        write_deployed_address(&path, "vault", Address::repeat_byte(0x12)).unwrap();
        write_deployed_address(&path, "pool", pool).unwrap();

        let deployments = read_deployments(&path).unwrap();
        assert_eq!(deployments.len(), 2);
        assert_eq!(parse_addr_from_deployments_file(&path, "pool").unwrap(), pool);
        assert!(matches!(
            parse_addr_from_deployments_file(&path, "swap"),
            Err(ScriptError::ReadDeployments(_))
        ));
    }

    #[tokio::test]
    async fn test_poll_until_observes_change() {
        let poll = PollConfig {
            interval: Duration::from_millis(1),
            timeout: Duration::from_secs(5),
        };

        let mut attempts = 0;
        poll_until("counter", &poll, || {
            attempts += 1;
            let done = attempts >= 3;
            async move { Ok(done) }
        })
        .await
        .unwrap();
        assert_eq!(attempts, 3);
    }
}
