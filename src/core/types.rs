//! Plan schema types.
//!
//! Defines the deploy.yaml schema: an ordered list of contract specs, each
//! with constructor args, pre-deploy dependencies, an optional initialize
//! call, post-deploy actions, and a verification request. Argument values are
//! untyped (`serde_json::Value`); a string with the `@` prefix references
//! another contract's deployed address.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Untyped argument value as declared in the plan.
pub type Value = serde_json::Value;

/// Root plan — the ordered set of contracts to deploy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployPlan {
    /// Contracts in declared order. Declared order is the default processing
    /// order, not a strict dependency order.
    pub contracts: Vec<ContractSpec>,
}

/// One declared deployable contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractSpec {
    /// Unique name, also the artifact base name under the search root.
    pub contract: String,

    /// Constructor arguments — literals or `@Name` references.
    #[serde(default)]
    pub args: Vec<Value>,

    /// Reference-form names (`@Name`) deployed in full before this contract.
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// Arguments for the canonical post-deploy `initialize` call.
    #[serde(default)]
    pub initialize: Option<Vec<Value>>,

    /// Post-deploy calls, run in declared order.
    #[serde(default)]
    pub actions: Vec<ActionSpec>,

    /// Request third-party verification after deployment.
    #[serde(default)]
    pub verify: bool,
}

/// A post-deploy call against a deployed contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionSpec {
    /// Target contract, reference form (`@Name`).
    pub target: String,

    /// Method name invoked on the target.
    pub command: String,

    /// Call arguments — literals or `@Name` references.
    #[serde(default)]
    pub args: Vec<Value>,
}

/// Summary of a completed run.
#[derive(Debug, Clone, Default)]
pub struct DeployReport {
    /// Contracts deployed this run.
    pub deployed: u32,
    /// Contracts already in the journal, skipped.
    pub reused: u32,
    /// Actions (including initialize calls) executed this run.
    pub actions_run: u32,
    /// Actions skipped as already completed.
    pub actions_skipped: u32,
    /// Contracts verified this run.
    pub verified: u32,
}

impl fmt::Display for DeployReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} deployed, {} reused, {} actions run, {} skipped, {} verified",
            self.deployed, self.reused, self.actions_run, self.actions_skipped, self.verified
        )
    }
}
