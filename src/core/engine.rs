//! Deployment engine — recursive ensure-before-use orchestration.
//!
//! Drives each declared contract through dependency satisfaction, creation,
//! initialization, actions, and verification, every step gated by the
//! journal so an interrupted run resumes from the first incomplete step.
//! Dependency discovery is lazy: resolving an `@Name` argument re-enters the
//! same pipeline for the referenced contract, with a single in-progress
//! stack guarding both declared dependencies and inline references against
//! cycles.

use super::error::EngineError;
use super::events::{self, DeployEvent};
use super::journal::{Journal, VerificationStatus};
use super::resolver;
use super::types::{ActionSpec, ContractSpec, DeployPlan, DeployReport, Value};
use crate::chain::{is_local_network, ChainBackend, ContractHandle, Verifier};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::time::Instant;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The canonical post-deploy initialization command.
const INITIALIZE: &str = "initialize";

/// Run parameters: which network, and where journals live.
pub struct EngineOptions {
    pub network: String,
    pub state_dir: PathBuf,
}

/// Orchestration context for one run. Owns the runtime registry, the
/// in-progress stack, and the journal; discarded at run end.
pub struct Engine<'a> {
    specs: IndexMap<String, ContractSpec>,
    backend: &'a dyn ChainBackend,
    verifier: Option<&'a dyn Verifier>,
    network: String,
    state_dir: PathBuf,
    journal: Journal,
    addresses: HashMap<String, String>,
    handles: HashMap<String, Box<dyn ContractHandle>>,
    in_progress: Vec<String>,
    finished: HashSet<String>,
    report: DeployReport,
}

impl std::fmt::Debug for Engine<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("network", &self.network)
            .field("state_dir", &self.state_dir)
            .finish_non_exhaustive()
    }
}

impl<'a> Engine<'a> {
    /// Build an engine for one run: load the journal for the target network
    /// and seed the address registry from it.
    pub fn new(
        plan: DeployPlan,
        backend: &'a dyn ChainBackend,
        verifier: Option<&'a dyn Verifier>,
        options: EngineOptions,
    ) -> Result<Self, EngineError> {
        let mut specs = IndexMap::with_capacity(plan.contracts.len());
        for spec in plan.contracts {
            let name = spec.contract.clone();
            if specs.insert(name.clone(), spec).is_some() {
                return Err(EngineError::Config(format!(
                    "duplicate contract name '{}'",
                    name
                )));
            }
        }

        let journal = Journal::load(&options.state_dir, &options.network)?;
        let mut addresses = HashMap::new();
        for (name, record) in journal.entries() {
            if record.deployed && !record.address.is_empty() {
                addresses.insert(name.clone(), record.address.clone());
            }
        }

        Ok(Self {
            specs,
            backend,
            verifier,
            network: options.network,
            state_dir: options.state_dir,
            journal,
            addresses,
            handles: HashMap::new(),
            in_progress: Vec::new(),
            finished: HashSet::new(),
            report: DeployReport::default(),
        })
    }

    /// Run the whole plan: discover artifacts under `root` and drive every
    /// matching contract through its pipeline, in discovery order. The first
    /// fatal error aborts the run; the journal keeps whatever completed.
    pub async fn run(&mut self, root: &Path) -> Result<DeployReport, EngineError> {
        let start = Instant::now();
        let run_id = events::generate_run_id();
        let _ = events::append_event(
            &self.state_dir,
            &self.network,
            DeployEvent::RunStarted {
                network: self.network.clone(),
                run_id: run_id.clone(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        );

        // Informational only, never control flow
        if let Ok(account) = self.backend.deployer_account().await {
            println!(
                "deployer {} (balance {:.4} ETH)",
                account.address,
                account.balance_eth()
            );
        }

        let candidates = discover_candidates(root, &self.specs)?;
        for name in &candidates {
            println!(">> candidate contract: {}", name);
        }
        for name in candidates {
            self.ensure_deployed(&name).await?;
        }

        let _ = events::append_event(
            &self.state_dir,
            &self.network,
            DeployEvent::RunCompleted {
                network: self.network.clone(),
                run_id,
                deployed: self.report.deployed,
                actions_run: self.report.actions_run,
                total_seconds: start.elapsed().as_secs_f64(),
            },
        );

        Ok(self.report.clone())
    }

    /// Drive one contract through its full pipeline, recursing into
    /// dependencies and argument references first. Idempotent within a run
    /// and against the journal across runs.
    pub fn ensure_deployed<'b>(&'b mut self, name: &str) -> BoxFuture<'b, Result<(), EngineError>> {
        let name = name.to_string();
        Box::pin(async move {
            if self.finished.contains(&name) {
                return Ok(());
            }
            if self.in_progress.iter().any(|n| n == &name) {
                let mut path = self.in_progress.clone();
                path.push(name);
                return Err(EngineError::CyclicDependency { path });
            }
            let spec = self
                .specs
                .get(&name)
                .cloned()
                .ok_or_else(|| EngineError::UnknownContract(name.clone()))?;

            self.in_progress.push(name.clone());
            let result = self.process_contract(&spec).await;
            // Pop on every exit path so a failed branch does not poison
            // sibling attempts at this contract.
            self.in_progress.pop();
            result?;

            self.finished.insert(name);
            Ok(())
        })
    }

    async fn process_contract(&mut self, spec: &ContractSpec) -> Result<(), EngineError> {
        // Declared dependencies must be fully deployed first
        for dep in &spec.dependencies {
            let dep_name = resolver::require_reference(&spec.contract, dep)?;
            if !self.specs.contains_key(dep_name) {
                return Err(EngineError::UnknownContract(dep_name.to_string()));
            }
            if !self.journal.is_deployed(dep_name) {
                self.ensure_deployed(dep_name).await?;
            }
        }

        self.deploy_contract(spec).await?;

        if let Some(init_args) = spec.initialize.clone() {
            let init = ActionSpec {
                target: format!("{}{}", resolver::SIGIL, spec.contract),
                command: INITIALIZE.to_string(),
                args: init_args,
            };
            self.run_action(&spec.contract, &init).await?;
        }

        for action in &spec.actions {
            self.run_action(&spec.contract, action).await?;
        }

        self.maybe_verify(spec).await
    }

    /// Creation step. Skipped entirely when the journal already records the
    /// contract as deployed; this is the resumability contract.
    async fn deploy_contract(&mut self, spec: &ContractSpec) -> Result<(), EngineError> {
        let name = &spec.contract;

        if self.journal.is_deployed(name) {
            if let Some(address) = self.journal.address(name) {
                println!("skipping {} (already deployed at {})", name, address);
            }
            self.report.reused += 1;
            return Ok(());
        }

        let resolved = self.resolve_args(&spec.args).await?;
        let deployed = self
            .backend
            .deploy(name, &resolved)
            .await
            .map_err(EngineError::Backend)?;
        if deployed.address.is_empty() {
            return Err(EngineError::MissingAddress(name.clone()));
        }

        // Journal write strictly after the side effect is confirmed
        self.journal
            .record_deployed(name, &deployed.address, spec.verify)?;
        self.addresses.insert(name.clone(), deployed.address.clone());
        self.handles.insert(name.clone(), deployed.handle);

        let _ = events::append_event(
            &self.state_dir,
            &self.network,
            DeployEvent::ContractDeployed {
                contract: name.clone(),
                address: deployed.address.clone(),
            },
        );
        println!(">> deployed {} => {}", name, deployed.address);
        self.report.deployed += 1;
        Ok(())
    }

    /// One post-deploy call, idempotent against the journal. Intent is
    /// persisted as `pending` before the call is issued; completion is
    /// persisted only after on-chain confirmation.
    async fn run_action(&mut self, owner: &str, action: &ActionSpec) -> Result<(), EngineError> {
        if self.journal.is_action_completed(owner, &action.command) {
            println!(
                "skipping action {}.{} (already completed)",
                owner, action.command
            );
            self.report.actions_skipped += 1;
            return Ok(());
        }

        let target_name = resolver::require_reference(owner, &action.target)?.to_string();
        if !self.specs.contains_key(&target_name) {
            return Err(EngineError::UnknownContract(target_name));
        }

        self.journal
            .mark_action_pending(owner, &action.command, &action.args)?;

        if !self.addresses.contains_key(&target_name) {
            self.ensure_deployed(&target_name).await?;
        }
        let resolved = self.resolve_args(&action.args).await?;

        let tx = {
            let handle = self.handle_for(&target_name).await?;
            handle
                .invoke(&action.command, &resolved)
                .await
                .map_err(EngineError::Backend)?
        };
        let receipt = self
            .backend
            .wait_for_confirmation(&tx)
            .await
            .map_err(EngineError::Backend)?;
        if !receipt.success() {
            return Err(EngineError::CallFailed {
                contract: target_name,
                command: action.command.clone(),
            });
        }

        self.journal
            .mark_action_completed(owner, &action.command, &resolved)?;
        let _ = events::append_event(
            &self.state_dir,
            &self.network,
            DeployEvent::ActionExecuted {
                contract: owner.to_string(),
                command: action.command.clone(),
                block: receipt.block,
            },
        );
        println!(
            ">> {}.{} confirmed in block {}",
            owner, action.command, receipt.block
        );
        self.report.actions_run += 1;
        Ok(())
    }

    /// Look up the live handle for a deployed contract, reconstructing it
    /// from the artifact description on resume.
    async fn handle_for(&mut self, name: &str) -> Result<&dyn ContractHandle, EngineError> {
        if !self.handles.contains_key(name) {
            let address = self
                .addresses
                .get(name)
                .cloned()
                .ok_or_else(|| EngineError::TargetNotFound(name.to_string()))?;
            let handle = self
                .backend
                .attach(name, &address)
                .await
                .map_err(EngineError::Backend)?;
            self.handles.insert(name.to_string(), handle);
        }
        self.handles
            .get(name)
            .map(|h| h.as_ref())
            .ok_or_else(|| EngineError::TargetNotFound(name.to_string()))
    }

    async fn resolve_args(&mut self, args: &[Value]) -> Result<Vec<Value>, EngineError> {
        let mut resolved = Vec::with_capacity(args.len());
        for arg in args {
            resolved.push(self.resolve_value(arg).await?);
        }
        Ok(resolved)
    }

    /// Reference resolution: literals pass through byte-identical; `@Name`
    /// becomes that contract's address, deploying it on demand first.
    async fn resolve_value(&mut self, value: &Value) -> Result<Value, EngineError> {
        let Some(name) = resolver::reference_name(value) else {
            println!("  using {} literally", value);
            return Ok(value.clone());
        };
        let name = name.to_string();

        if !self.addresses.contains_key(&name) {
            if !self.specs.contains_key(&name) {
                return Err(EngineError::UnknownContract(name));
            }
            println!("deploying missing dependency: {}", name);
            self.ensure_deployed(&name).await?;
        }
        // Still absent after an ensure attempt: the backend claimed success
        // without producing an address.
        let address = self
            .addresses
            .get(&name)
            .cloned()
            .ok_or_else(|| EngineError::MissingAddress(name.clone()))?;
        println!("  resolved @{} => {}", name, address);
        Ok(Value::String(address))
    }

    /// Verification step: local networks skip entirely; failures warn and
    /// stay pending for the next run.
    async fn maybe_verify(&mut self, spec: &ContractSpec) -> Result<(), EngineError> {
        if is_local_network(&self.network) || !spec.verify {
            return Ok(());
        }
        match self.journal.verification(&spec.contract) {
            VerificationStatus::Completed | VerificationStatus::Avoid => return Ok(()),
            VerificationStatus::Pending => {}
        }
        let Some(verifier) = self.verifier else {
            eprintln!(
                "warning: verification requested for {} but no verifier configured",
                spec.contract
            );
            return Ok(());
        };

        let address = self
            .addresses
            .get(&spec.contract)
            .cloned()
            .ok_or_else(|| EngineError::MissingAddress(spec.contract.clone()))?;
        let ctor_args = self.resolve_args(&spec.args).await?;

        match verifier.verify(&address, &ctor_args).await {
            Ok(()) => {
                self.journal.mark_verified(&spec.contract)?;
                let _ = events::append_event(
                    &self.state_dir,
                    &self.network,
                    DeployEvent::VerificationCompleted {
                        contract: spec.contract.clone(),
                        address: address.clone(),
                    },
                );
                println!(">> verified {} at {}", spec.contract, address);
                self.report.verified += 1;
            }
            Err(e) => {
                eprintln!(
                    "warning: verification of {} failed: {} (will retry next run)",
                    spec.contract, e
                );
                let _ = events::append_event(
                    &self.state_dir,
                    &self.network,
                    DeployEvent::VerificationFailed {
                        contract: spec.contract.clone(),
                        error: e,
                    },
                );
            }
        }
        Ok(())
    }
}

/// Walk the search root recursively (sorted entries, so runs are
/// deterministic) and return declared contract names with a matching
/// artifact base name, in discovery order, deduplicated. Artifacts with no
/// declared contract are ignored.
pub fn discover_candidates(
    root: &Path,
    specs: &IndexMap<String, ContractSpec>,
) -> Result<Vec<String>, EngineError> {
    let mut found = Vec::new();
    walk(root, specs, &mut found)?;
    Ok(found)
}

fn walk(
    dir: &Path,
    specs: &IndexMap<String, ContractSpec>,
    found: &mut Vec<String>,
) -> Result<(), EngineError> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| EngineError::Config(format!("cannot read {}: {}", dir.display(), e)))?;
    let mut entries: Vec<_> = entries
        .collect::<Result<_, _>>()
        .map_err(|e| EngineError::Config(format!("cannot read {}: {}", dir.display(), e)))?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let path = entry.path();
        if path.is_dir() {
            walk(&path, specs, found)?;
        } else if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            if specs.contains_key(stem) && !found.iter().any(|f| f == stem) {
                found.push(stem.to_string());
            }
        }
    }
    Ok(())
}
