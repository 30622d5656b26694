//! In-memory simulated chain for local networks and tests.
//!
//! Assigns deterministic addresses in deployment order, confirms every call
//! in the next block, and records all traffic for inspection.

use super::{
    AccountInfo, ChainBackend, ContractHandle, Deployed, TxReceipt, TxRef, TxStatus, Verifier,
};
use crate::core::types::Value;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// One recorded deployment.
#[derive(Debug, Clone)]
pub struct SimDeploy {
    pub artifact: String,
    pub args: Vec<Value>,
    pub address: String,
}

/// One recorded contract call.
#[derive(Debug, Clone)]
pub struct SimCall {
    pub address: String,
    pub command: String,
    pub args: Vec<Value>,
}

#[derive(Debug, Default)]
struct SimState {
    block: u64,
    deploys: Vec<SimDeploy>,
    calls: Vec<SimCall>,
    verified: Vec<String>,
}

/// Simulated backend. Cloning shares the underlying chain state.
#[derive(Clone, Default)]
pub struct SimChain {
    state: Arc<Mutex<SimState>>,
}

impl SimChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of deployments issued for an artifact name.
    pub fn deploy_count(&self, artifact: &str) -> usize {
        self.state
            .lock()
            .expect("sim state poisoned")
            .deploys
            .iter()
            .filter(|d| d.artifact == artifact)
            .count()
    }

    pub fn deploys(&self) -> Vec<SimDeploy> {
        self.state.lock().expect("sim state poisoned").deploys.clone()
    }

    pub fn calls(&self) -> Vec<SimCall> {
        self.state.lock().expect("sim state poisoned").calls.clone()
    }

    pub fn verified(&self) -> Vec<String> {
        self.state.lock().expect("sim state poisoned").verified.clone()
    }
}

struct SimHandle {
    address: String,
    state: Arc<Mutex<SimState>>,
}

#[async_trait]
impl ContractHandle for SimHandle {
    async fn invoke(&self, command: &str, args: &[Value]) -> Result<TxRef, String> {
        let mut state = self.state.lock().expect("sim state poisoned");
        state.calls.push(SimCall {
            address: self.address.clone(),
            command: command.to_string(),
            args: args.to_vec(),
        });
        let nonce = state.calls.len() as u64;
        Ok(TxRef(format!("0xtx{:016x}", nonce)))
    }
}

#[async_trait]
impl ChainBackend for SimChain {
    async fn deploy(&self, artifact: &str, args: &[Value]) -> Result<Deployed, String> {
        let address = {
            let mut state = self.state.lock().expect("sim state poisoned");
            let address = format!("0x{:040x}", 0x1000 + state.deploys.len());
            state.deploys.push(SimDeploy {
                artifact: artifact.to_string(),
                args: args.to_vec(),
                address: address.clone(),
            });
            state.block += 1;
            address
        };
        Ok(Deployed {
            handle: Box::new(SimHandle {
                address: address.clone(),
                state: Arc::clone(&self.state),
            }),
            address,
        })
    }

    async fn attach(
        &self,
        _artifact: &str,
        address: &str,
    ) -> Result<Box<dyn ContractHandle>, String> {
        Ok(Box::new(SimHandle {
            address: address.to_string(),
            state: Arc::clone(&self.state),
        }))
    }

    async fn wait_for_confirmation(&self, _tx: &TxRef) -> Result<TxReceipt, String> {
        let mut state = self.state.lock().expect("sim state poisoned");
        state.block += 1;
        Ok(TxReceipt {
            status: TxStatus::Success,
            block: state.block,
        })
    }

    async fn deployer_account(&self) -> Result<AccountInfo, String> {
        Ok(AccountInfo {
            address: "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266".to_string(),
            balance_wei: 10_000_000_000_000_000_000_000,
        })
    }
}

#[async_trait]
impl Verifier for SimChain {
    async fn verify(&self, address: &str, _constructor_args: &[Value]) -> Result<(), String> {
        self.state
            .lock()
            .expect("sim state poisoned")
            .verified
            .push(address.to_string());
        Ok(())
    }
}
