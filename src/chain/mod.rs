//! Chain backend abstraction — the seam to the execution environment.
//!
//! The engine never talks to a node directly: creation, calls, confirmation
//! waits, and verification all go through these traits, awaited one at a
//! time. Backends report failures as plain strings; the engine wraps them.

pub mod sim;

use crate::core::types::Value;
use async_trait::async_trait;

/// Reference to a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRef(pub String);

/// Terminal status of a confirmed transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    Success,
    Reverted,
}

/// Confirmation receipt.
#[derive(Debug, Clone)]
pub struct TxReceipt {
    pub status: TxStatus,
    pub block: u64,
}

impl TxReceipt {
    pub fn success(&self) -> bool {
        self.status == TxStatus::Success
    }
}

/// Deployer account snapshot, for progress reporting only.
#[derive(Debug, Clone)]
pub struct AccountInfo {
    pub address: String,
    pub balance_wei: u128,
}

impl AccountInfo {
    pub fn balance_eth(&self) -> f64 {
        self.balance_wei as f64 / 1e18
    }
}

/// Result of deploying a contract: its address plus a live call surface.
pub struct Deployed {
    pub address: String,
    pub handle: Box<dyn ContractHandle>,
}

/// Untyped call surface for a deployed contract — dynamic dispatch by
/// command name, decoupled from any specific binding shape.
#[async_trait]
pub trait ContractHandle: Send + Sync {
    async fn invoke(&self, command: &str, args: &[Value]) -> Result<TxRef, String>;
}

/// Execution environment backend: creates contracts and settles calls.
#[async_trait]
pub trait ChainBackend: Send + Sync {
    /// Deploy the named artifact with resolved constructor args.
    async fn deploy(&self, artifact: &str, args: &[Value]) -> Result<Deployed, String>;

    /// Reconstruct a call surface for an already-deployed contract from its
    /// artifact description (resume path).
    async fn attach(&self, artifact: &str, address: &str)
        -> Result<Box<dyn ContractHandle>, String>;

    /// Wait for a submitted transaction to reach a terminal status.
    async fn wait_for_confirmation(&self, tx: &TxRef) -> Result<TxReceipt, String>;

    /// Deployer account snapshot. Informational only, never control flow.
    async fn deployer_account(&self) -> Result<AccountInfo, String>;
}

/// Third-party verification registry.
#[async_trait]
pub trait Verifier: Send + Sync {
    async fn verify(&self, address: &str, constructor_args: &[Value]) -> Result<(), String>;
}

/// Local/ephemeral networks have no externally meaningful registry, so
/// verification is skipped entirely there.
pub fn is_local_network(network: &str) -> bool {
    matches!(network, "localhost" | "hardhat" | "anvil")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_local_network_detection() {
        assert!(is_local_network("localhost"));
        assert!(is_local_network("hardhat"));
        assert!(is_local_network("anvil"));
        assert!(!is_local_network("sepolia"));
        assert!(!is_local_network("mainnet"));
    }

    #[test]
    fn test_chain_receipt_success() {
        let ok = TxReceipt { status: TxStatus::Success, block: 7 };
        assert!(ok.success());
        let bad = TxReceipt { status: TxStatus::Reverted, block: 7 };
        assert!(!bad.success());
    }

    #[test]
    fn test_chain_balance_eth() {
        let account = AccountInfo {
            address: "0x1".to_string(),
            balance_wei: 2_500_000_000_000_000_000,
        };
        assert!((account.balance_eth() - 2.5).abs() < 1e-9);
    }
}
