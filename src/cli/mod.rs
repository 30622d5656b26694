//! CLI subcommands — init, validate, deploy, status.

use crate::chain::{is_local_network, sim::SimChain};
use crate::core::engine::{Engine, EngineOptions};
use crate::core::journal::{journal_path, Journal, VerificationStatus};
use crate::core::{parser, types};
use clap::Subcommand;
use std::path::{Path, PathBuf};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new deployment project
    Init {
        /// Directory to initialize (default: current)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Validate deploy.yaml without connecting to a network
    Validate {
        /// Path to deploy.yaml
        #[arg(short, long, default_value = "deploy.yaml")]
        file: PathBuf,
    },

    /// Deploy contracts, resuming from the journal
    Deploy {
        /// Path to deploy.yaml
        #[arg(short, long, default_value = "deploy.yaml")]
        file: PathBuf,

        /// Target network
        #[arg(short, long, default_value = "localhost")]
        network: String,

        /// Directory searched recursively for contract artifacts
        #[arg(short, long, default_value = "contracts")]
        contracts_dir: PathBuf,

        /// Journal directory
        #[arg(long, default_value = "deployments")]
        state_dir: PathBuf,
    },

    /// Show journaled deployment state for a network
    Status {
        /// Target network
        #[arg(short, long, default_value = "localhost")]
        network: String,

        /// Journal directory
        #[arg(long, default_value = "deployments")]
        state_dir: PathBuf,
    },
}

/// Dispatch a CLI command.
pub async fn dispatch(cmd: Commands) -> Result<(), String> {
    match cmd {
        Commands::Init { path } => cmd_init(&path),
        Commands::Validate { file } => cmd_validate(&file),
        Commands::Deploy {
            file,
            network,
            contracts_dir,
            state_dir,
        } => cmd_deploy(&file, &network, &contracts_dir, &state_dir).await,
        Commands::Status { network, state_dir } => cmd_status(&state_dir, &network),
    }
}

fn cmd_init(path: &Path) -> Result<(), String> {
    let plan_path = path.join("deploy.yaml");
    if plan_path.exists() {
        return Err(format!("{} already exists", plan_path.display()));
    }

    let state_dir = path.join("deployments");
    std::fs::create_dir_all(&state_dir).map_err(|e| format!("cannot create state dir: {}", e))?;
    let contracts_dir = path.join("contracts");
    std::fs::create_dir_all(&contracts_dir)
        .map_err(|e| format!("cannot create contracts dir: {}", e))?;

    let template = r#"contracts:
  - contract: Registry

  - contract: Vault
    args: ["@Registry"]
    dependencies: ["@Registry"]
    actions:
      - target: "@Registry"
        command: register
        args: ["@Vault"]
"#;
    std::fs::write(&plan_path, template)
        .map_err(|e| format!("cannot write {}: {}", plan_path.display(), e))?;

    println!("Initialized deployment project at {}", path.display());
    println!("  Created: {}", plan_path.display());
    println!("  Created: {}/", contracts_dir.display());
    println!("  Created: {}/", state_dir.display());
    Ok(())
}

fn cmd_validate(file: &Path) -> Result<(), String> {
    let plan = load_plan(file)?;
    let total_actions: usize = plan.contracts.iter().map(|c| c.actions.len()).sum();
    println!(
        "OK: {} ({} contracts, {} actions)",
        file.display(),
        plan.contracts.len(),
        total_actions
    );
    Ok(())
}

async fn cmd_deploy(
    file: &Path,
    network: &str,
    contracts_dir: &Path,
    state_dir: &Path,
) -> Result<(), String> {
    let plan = load_plan(file)?;

    if !is_local_network(network) {
        return Err(format!(
            "network '{}' needs a live chain backend; only local networks (localhost, hardhat, anvil) are built in",
            network
        ));
    }
    let chain = SimChain::new();

    let options = EngineOptions {
        network: network.to_string(),
        state_dir: state_dir.to_path_buf(),
    };
    let mut engine =
        Engine::new(plan, &chain, Some(&chain), options).map_err(|e| e.to_string())?;
    let report = engine.run(contracts_dir).await.map_err(|e| e.to_string())?;

    println!("done: {}", report);
    Ok(())
}

fn cmd_status(state_dir: &Path, network: &str) -> Result<(), String> {
    let path = journal_path(state_dir, network);
    if !path.exists() {
        println!("No deployments recorded for '{}' ({})", network, path.display());
        return Ok(());
    }

    let journal = Journal::load(state_dir, network).map_err(|e| e.to_string())?;
    println!("Network: {}", network);
    for (name, record) in journal.entries() {
        let verification = match record.verification {
            VerificationStatus::Pending => " [verification pending]",
            VerificationStatus::Completed => " [verified]",
            VerificationStatus::Avoid => "",
        };
        if record.deployed {
            println!("  {} => {}{}", name, record.address, verification);
        } else {
            println!("  {} => (not deployed)", name);
        }
        for (command, action) in &record.actions {
            let state = if action.completed {
                "completed"
            } else if action.pending {
                "pending"
            } else {
                "queued"
            };
            println!("    {} {}", command, state);
        }
    }
    Ok(())
}

/// Parse and validate a plan file, printing every error before failing.
fn load_plan(file: &Path) -> Result<types::DeployPlan, String> {
    let plan = parser::parse_plan_file(file).map_err(|e| e.to_string())?;
    let errors = parser::validate_plan(&plan);
    if errors.is_empty() {
        return Ok(plan);
    }
    for e in &errors {
        eprintln!("  ERROR: {}", e);
    }
    Err(format!("{} validation error(s)", errors.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_init_creates_project() {
        let dir = tempfile::tempdir().unwrap();
        cmd_init(dir.path()).unwrap();
        assert!(dir.path().join("deploy.yaml").exists());
        assert!(dir.path().join("deployments").is_dir());
        assert!(dir.path().join("contracts").is_dir());

        // The template itself must validate
        let plan = load_plan(&dir.path().join("deploy.yaml")).unwrap();
        assert_eq!(plan.contracts.len(), 2);
    }

    #[test]
    fn test_cli_init_refuses_existing_plan() {
        let dir = tempfile::tempdir().unwrap();
        cmd_init(dir.path()).unwrap();
        let err = cmd_init(dir.path()).unwrap_err();
        assert!(err.contains("already exists"));
    }

    #[test]
    fn test_cli_validate_reports_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deploy.yaml");
        std::fs::write(&path, "contracts:\n  - contract: Vault\n    args: [\"@Ghost\"]\n")
            .unwrap();
        let err = cmd_validate(&path).unwrap_err();
        assert!(err.contains("1 validation error"));
    }

    #[tokio::test]
    async fn test_cli_deploy_refuses_live_network() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deploy.yaml");
        std::fs::write(&path, "contracts:\n  - contract: Vault\n").unwrap();
        let err = cmd_deploy(&path, "sepolia", dir.path(), dir.path())
            .await
            .unwrap_err();
        assert!(err.contains("live chain backend"));
    }

    #[tokio::test]
    async fn test_cli_deploy_end_to_end_local() {
        let dir = tempfile::tempdir().unwrap();
        cmd_init(dir.path()).unwrap();
        for name in ["Registry", "Vault"] {
            std::fs::write(
                dir.path().join("contracts").join(format!("{}.sol", name)),
                "contract",
            )
            .unwrap();
        }

        cmd_deploy(
            &dir.path().join("deploy.yaml"),
            "localhost",
            &dir.path().join("contracts"),
            &dir.path().join("deployments"),
        )
        .await
        .unwrap();

        let journal =
            Journal::load(&dir.path().join("deployments"), "localhost").unwrap();
        assert!(journal.is_deployed("Registry"));
        assert!(journal.is_deployed("Vault"));
        assert!(journal.is_action_completed("Vault", "register"));

        // Status over the produced journal must not error
        cmd_status(&dir.path().join("deployments"), "localhost").unwrap();
    }

    #[test]
    fn test_cli_status_without_journal() {
        let dir = tempfile::tempdir().unwrap();
        cmd_status(dir.path(), "localhost").unwrap();
    }
}
