//! Engine error taxonomy.
//!
//! Every fatal condition unwinds the whole recursive deployment chain up to
//! the driver; only verification failures degrade to a logged warning.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// The plan references a contract name it does not declare.
    #[error("unknown contract '{0}' referenced in plan")]
    UnknownContract(String),

    /// A dependency or action target does not use the '@' reference form.
    #[error("dependency '{dependency}' of '{contract}' must use the '@Name' reference form")]
    InvalidDependencyFormat { contract: String, dependency: String },

    /// A contract was re-entered while already mid-deployment.
    /// `path` is the in-progress stack plus the offending name.
    #[error("cyclic dependency: {}", path.join(" -> "))]
    CyclicDependency { path: Vec<String> },

    /// The backend reported success but no address was recorded.
    #[error("no address recorded for '{0}' after deployment")]
    MissingAddress(String),

    /// No live handle exists for an action target and none could be attached.
    #[error("no handle available for action target '{0}'")]
    TargetNotFound(String),

    /// A call confirmed on-chain with a non-success status.
    #[error("call '{command}' on '{contract}' confirmed with reverted status")]
    CallFailed { contract: String, command: String },

    /// Transport-level failure raised by a backend.
    #[error("backend error: {0}")]
    Backend(String),

    /// Malformed or inconsistent plan.
    #[error("invalid plan: {0}")]
    Config(String),

    /// Journal could not be read or persisted.
    #[error("journal error: {0}")]
    Journal(String),
}
