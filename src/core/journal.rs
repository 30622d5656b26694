//! Execution journal — load, save (atomic), path derivation.
//!
//! The journal is the single source of truth for "has this side effect
//! already happened". One JSON file per target network, keyed by contract
//! name, rewritten in full after every state-changing step so a crash
//! between steps loses at most the in-flight step. Completion entries are
//! written strictly after the side effect confirms; `pending` entries
//! strictly before the call is issued.

use super::error::EngineError;
use super::types::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Verification state of a deployed contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    /// Requested but not yet confirmed by the registry.
    Pending,
    /// Confirmed by the registry.
    Completed,
    /// Not requested, or not applicable on this network.
    Avoid,
}

/// Journal entry for one post-deploy action, keyed by command name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRecord {
    /// Intent was durably recorded; the call may or may not have landed.
    #[serde(default)]
    pub pending: bool,
    /// The call confirmed successfully.
    #[serde(default)]
    pub completed: bool,
    /// Declared args while pending; resolved args once completed.
    #[serde(default)]
    pub args: Vec<Value>,
}

/// Journal entry for one contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractRecord {
    pub deployed: bool,
    pub address: String,
    #[serde(default)]
    pub actions: IndexMap<String, ActionRecord>,
    #[serde(default = "default_verification")]
    pub verification: VerificationStatus,
}

fn default_verification() -> VerificationStatus {
    VerificationStatus::Avoid
}

/// Derive the journal path for a network within the state directory.
pub fn journal_path(state_dir: &Path, network: &str) -> PathBuf {
    state_dir.join(format!("{network}.deploy.json"))
}

/// Durable journal bound to its on-disk path.
#[derive(Debug)]
pub struct Journal {
    path: PathBuf,
    entries: IndexMap<String, ContractRecord>,
}

impl Journal {
    /// Load the journal for a network. Starts empty if the file is absent.
    pub fn load(state_dir: &Path, network: &str) -> Result<Self, EngineError> {
        let path = journal_path(state_dir, network);
        if !path.exists() {
            return Ok(Self {
                path,
                entries: IndexMap::new(),
            });
        }
        let content = std::fs::read_to_string(&path)
            .map_err(|e| EngineError::Journal(format!("cannot read {}: {}", path.display(), e)))?;
        let entries = serde_json::from_str(&content).map_err(|e| {
            EngineError::Journal(format!("invalid journal {}: {}", path.display(), e))
        })?;
        Ok(Self { path, entries })
    }

    /// Persist a full snapshot atomically (write to temp, then rename).
    pub fn save(&self) -> Result<(), EngineError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                EngineError::Journal(format!("cannot create dir {}: {}", parent.display(), e))
            })?;
        }

        let json = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| EngineError::Journal(format!("serialize error: {}", e)))?;

        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, &json).map_err(|e| {
            EngineError::Journal(format!("cannot write {}: {}", tmp_path.display(), e))
        })?;
        std::fs::rename(&tmp_path, &self.path).map_err(|e| {
            EngineError::Journal(format!(
                "cannot rename {} -> {}: {}",
                tmp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        Ok(())
    }

    pub fn entries(&self) -> &IndexMap<String, ContractRecord> {
        &self.entries
    }

    pub fn is_deployed(&self, name: &str) -> bool {
        self.entries.get(name).is_some_and(|r| r.deployed)
    }

    pub fn address(&self, name: &str) -> Option<&str> {
        self.entries
            .get(name)
            .filter(|r| r.deployed)
            .map(|r| r.address.as_str())
    }

    /// Record a completed deployment and persist. Verification is pre-set to
    /// `pending` when requested, `avoid` otherwise.
    pub fn record_deployed(
        &mut self,
        name: &str,
        address: &str,
        verify_requested: bool,
    ) -> Result<(), EngineError> {
        self.entries.insert(
            name.to_string(),
            ContractRecord {
                deployed: true,
                address: address.to_string(),
                actions: IndexMap::new(),
                verification: if verify_requested {
                    VerificationStatus::Pending
                } else {
                    VerificationStatus::Avoid
                },
            },
        );
        self.save()
    }

    pub fn is_action_completed(&self, name: &str, command: &str) -> bool {
        self.entries
            .get(name)
            .and_then(|r| r.actions.get(command))
            .is_some_and(|a| a.completed)
    }

    /// Durably record intent before the call is issued.
    pub fn mark_action_pending(
        &mut self,
        name: &str,
        command: &str,
        declared_args: &[Value],
    ) -> Result<(), EngineError> {
        let record = self.entry_mut(name)?;
        record.actions.insert(
            command.to_string(),
            ActionRecord {
                pending: true,
                completed: false,
                args: declared_args.to_vec(),
            },
        );
        self.save()
    }

    /// Record confirmed completion with the args as actually sent.
    pub fn mark_action_completed(
        &mut self,
        name: &str,
        command: &str,
        resolved_args: &[Value],
    ) -> Result<(), EngineError> {
        let record = self.entry_mut(name)?;
        record.actions.insert(
            command.to_string(),
            ActionRecord {
                pending: false,
                completed: true,
                args: resolved_args.to_vec(),
            },
        );
        self.save()
    }

    pub fn verification(&self, name: &str) -> VerificationStatus {
        self.entries
            .get(name)
            .map(|r| r.verification)
            .unwrap_or(VerificationStatus::Avoid)
    }

    pub fn mark_verified(&mut self, name: &str) -> Result<(), EngineError> {
        self.entry_mut(name)?.verification = VerificationStatus::Completed;
        self.save()
    }

    fn entry_mut(&mut self, name: &str) -> Result<&mut ContractRecord, EngineError> {
        self.entries
            .get_mut(name)
            .ok_or_else(|| EngineError::Journal(format!("no journal entry for '{}'", name)))
    }
}
