//! Implementations of the various deploy scripts

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use tracing::{info, warn};

use crate::{
    chain::ChainClient,
    cli::{
        DeployArgs, DeployRegistryArgs, PlanArgs, RegistryGetArgs, RegistrySetArgs, UpgradeArgs,
    },
    constants::ADDRESS_BOOK_DEPLOYMENT_KEY,
    errors::ScriptError,
    plan::DeploymentPlan,
    registry::Registry,
    sequencer::{Sequencer, SequencerConfig},
    types::{Component, DeploymentStep, PollConfig},
    utils::{parse_addr_from_deployments_file, parse_address},
};

/// Deploy a registry, record it and write the external addresses
pub async fn deploy_registry(
    args: DeployRegistryArgs,
    client: Arc<dyn ChainClient>,
    deployments_path: PathBuf,
    poll: PollConfig,
) -> Result<(), ScriptError> {
    let externals = args.externals.parse()?;
    let config = SequencerConfig {
        poll,
        deployments_path: Some(deployments_path),
    };

    Sequencer::bootstrap_registry(client, !args.direct, &externals, config).await?;
    Ok(())
}

/// Deploy the selected components, attaching to those already recorded
pub async fn deploy(
    args: DeployArgs,
    client: Arc<dyn ChainClient>,
    deployments_path: PathBuf,
    poll: PollConfig,
) -> Result<(), ScriptError> {
    let components = select_components(&args.components, args.all, args.mocks)?;
    let registry = attach_registry(args.address_book, client.clone(), &deployments_path)?;

    let sequencer = Sequencer::new(
        client,
        registry,
        SequencerConfig {
            poll,
            deployments_path: Some(deployments_path),
        },
    );

    let mut plan = if args.fresh {
        DeploymentPlan::fresh(&components)
    } else {
        sequencer.resume_plan(&components).await?
    };
    if args.reorder {
        let available = sequencer.available_keys(&plan).await?;
        plan = plan.ordered(&available)?;
    }

    let records = sequencer.run(&plan).await?;
    info!("deployed {} components", records.len());
    Ok(())
}

/// Point a component's proxy at a new logic contract
pub async fn upgrade(
    args: UpgradeArgs,
    client: Arc<dyn ChainClient>,
    deployments_path: &Path,
    poll: PollConfig,
) -> Result<(), ScriptError> {
    let registry = attach_registry(args.address_book, client.clone(), deployments_path)?;
    let proxy = match args.proxy {
        Some(proxy) => parse_address("proxy", &proxy)?,
        None => registry.get_required(args.component.key()).await?,
    };

    let mut step = DeploymentStep::upgrade(args.component, proxy);
    if let Some(contract) = args.contract {
        step = step.with_contract(contract);
    }

    let sequencer = Sequencer::new(
        client,
        registry,
        SequencerConfig {
            poll,
            deployments_path: None,
        },
    );
    let record = sequencer.execute(&step).await?;

    println!(
        "{} at {:#x} now runs {} at {:#x}",
        record.component,
        record.address,
        step.contract_name(),
        record.implementation.unwrap_or_default()
    );
    Ok(())
}

/// Print the address stored under a key
pub async fn registry_get(
    args: RegistryGetArgs,
    client: Arc<dyn ChainClient>,
    deployments_path: &Path,
) -> Result<(), ScriptError> {
    let registry = attach_registry(args.address_book, client, deployments_path)?;
    let value = registry.get(args.key).await?;
    if value.is_zero() {
        warn!("registry key {} is unset", args.key);
    }

    println!("{}: {:#x}", args.key, value);
    Ok(())
}

/// Store an address under a key
pub async fn registry_set(
    args: RegistrySetArgs,
    client: Arc<dyn ChainClient>,
    deployments_path: &Path,
    poll: PollConfig,
) -> Result<(), ScriptError> {
    let registry = attach_registry(args.address_book, client, deployments_path)?;
    let value = parse_address(args.key.as_str(), &args.value)?;

    registry.register(args.key, value, &poll).await?;
    println!("{} set to {:#x}", args.key, value);
    Ok(())
}

/// Print the selected components in a valid deployment order
pub async fn plan(
    args: PlanArgs,
    client: Arc<dyn ChainClient>,
    deployments_path: &Path,
) -> Result<(), ScriptError> {
    let components = select_components(&args.components, args.all, args.mocks)?;
    let registry = attach_registry(args.address_book, client.clone(), deployments_path)?;
    let sequencer = Sequencer::new(client, registry, SequencerConfig::default());

    let plan = DeploymentPlan::fresh(&components);
    let available = sequencer.available_keys(&plan).await?;
    let ordered = plan.ordered(&available)?;

    for (i, step) in ordered.steps().iter().enumerate() {
        let spec = step.component.spec();
        let requires = spec.requires();
        if requires.is_empty() {
            println!("{:>2}. {} -> `{}`", i + 1, step.component, spec.key);
        } else {
            let requires = itertools::join(requires, ", ");
            println!(
                "{:>2}. {} -> `{}` (needs {})",
                i + 1,
                step.component,
                spec.key,
                requires
            );
        }
    }

    Ok(())
}

/// The components named on the command line, or all of them
fn select_components(
    requested: &[Component],
    all: bool,
    mocks: bool,
) -> Result<Vec<Component>, ScriptError> {
    let mut components = Vec::new();
    if mocks {
        components.extend_from_slice(Component::MOCK_TOKENS);
    }
    if all {
        components.extend_from_slice(Component::ALL);
    } else {
        components.extend_from_slice(requested);
    }

    if components.is_empty() {
        return Err(ScriptError::Config(
            "no components given, name some or pass --all".to_string(),
        ));
    }

    Ok(components)
}

/// The registry given on the command line, or the one in the deployments file
fn attach_registry(
    address_book: Option<String>,
    client: Arc<dyn ChainClient>,
    deployments_path: &Path,
) -> Result<Registry, ScriptError> {
    let address = match address_book {
        Some(address) => parse_address("address book", &address)?,
        None => parse_addr_from_deployments_file(deployments_path, ADDRESS_BOOK_DEPLOYMENT_KEY)?,
    };

    Ok(Registry::attach(client, address))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_components() {
        let selected = select_components(&[], true, true).unwrap();
        assert_eq!(&selected[..3], Component::MOCK_TOKENS);
        assert_eq!(selected.len(), 3 + Component::ALL.len());

        assert!(matches!(
            select_components(&[], false, false),
            Err(ScriptError::Config(_))
        ));
    }
}
