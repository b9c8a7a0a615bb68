//! Collaborator seams: discovery snapshots and descriptor expansion
//!
//! The resolver never fetches or caches. Every call receives an immutable
//! snapshot of what discovery has found so far and reads it for the duration
//! of that call only.

use crate::error::{DescriptorError, Result, WalletError};
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Txo → (descriptor, index), as established by discovery
pub trait OwnershipLookup {
    fn get_descriptor(&self, txo: &Txo) -> Option<OwnershipRecord>;
}

/// Read-only view of a discovery engine's state
pub trait DiscoverySnapshot: OwnershipLookup {
    fn fetch_status(&self, descriptor: &str) -> FetchStatus;

    /// Raw transactions in chronological order
    fn history(&self, descriptor: &str) -> &[RawTransaction];

    fn utxos(&self, descriptor: &str) -> &[Utxo];

    /// Balance as reported by the collaborator; defaults to the UTXO sum
    fn balance(&self, descriptor: &str) -> Sats {
        self.utxos(descriptor)
            .iter()
            .fold(0 as Sats, |sum, utxo| sum.saturating_add(utxo.value))
    }
}

/// Descriptor validation and single-address expansion
pub trait DescriptorExpander {
    fn validate(&self, descriptor: &str) -> std::result::Result<(), DescriptorError>;

    fn derive_address(
        &self,
        descriptor: &str,
        index: DescriptorIndex,
    ) -> std::result::Result<String, DescriptorError>;
}

/// Per-descriptor discovery results
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorData {
    #[serde(default)]
    pub status: FetchStatus,
    #[serde(default)]
    pub history: Vec<RawTransaction>,
    #[serde(default)]
    pub utxos: Vec<Utxo>,
    /// Balance reported by the discovery engine, when it reports one
    #[serde(default)]
    pub balance: Option<Sats>,
}

/// In-memory discovery snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub descriptors: HashMap<String, DescriptorData>,
    #[serde(default)]
    pub ownership: HashMap<Txo, OwnershipRecord>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| WalletError::Serialization(e.to_string()))
    }

    pub fn set_status(&mut self, descriptor: &str, status: FetchStatus) {
        self.entry(descriptor).status = status;
    }

    /// Append a transaction; order of calls is chronological order
    pub fn push_transaction(&mut self, descriptor: &str, tx: RawTransaction) {
        self.entry(descriptor).history.push(tx);
    }

    pub fn add_utxo(&mut self, descriptor: &str, utxo: Utxo) {
        self.entry(descriptor).utxos.push(utxo);
    }

    pub fn set_balance(&mut self, descriptor: &str, balance: Sats) {
        self.entry(descriptor).balance = Some(balance);
    }

    pub fn record_ownership(&mut self, txo: Txo, descriptor: &str, index: DescriptorIndex) {
        self.ownership.insert(
            txo,
            OwnershipRecord {
                descriptor: descriptor.to_string(),
                index,
            },
        );
    }

    fn entry(&mut self, descriptor: &str) -> &mut DescriptorData {
        self.descriptors.entry(descriptor.to_string()).or_default()
    }
}

impl OwnershipLookup for Snapshot {
    fn get_descriptor(&self, txo: &Txo) -> Option<OwnershipRecord> {
        self.ownership.get(txo).cloned()
    }
}

impl DiscoverySnapshot for Snapshot {
    fn fetch_status(&self, descriptor: &str) -> FetchStatus {
        self.descriptors
            .get(descriptor)
            .map(|d| d.status)
            .unwrap_or_default()
    }

    fn history(&self, descriptor: &str) -> &[RawTransaction] {
        self.descriptors
            .get(descriptor)
            .map(|d| d.history.as_slice())
            .unwrap_or_default()
    }

    fn utxos(&self, descriptor: &str) -> &[Utxo] {
        self.descriptors
            .get(descriptor)
            .map(|d| d.utxos.as_slice())
            .unwrap_or_default()
    }

    fn balance(&self, descriptor: &str) -> Sats {
        match self.descriptors.get(descriptor).and_then(|d| d.balance) {
            Some(reported) => reported,
            None => self
                .utxos(descriptor)
                .iter()
                .fold(0 as Sats, |sum, utxo| sum.saturating_add(utxo.value)),
        }
    }
}
