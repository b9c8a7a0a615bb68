//! Shared helpers for integration tests

#![allow(dead_code)]

use descriptor_attribution::*;
use std::sync::Once;

pub const CHANGE_DESCRIPTOR: &str = "pkh(xpub6BosfCnifzxcFwrSzQiqu2DBVTshkCXacvNsWGYJVVhhawA7d4R5WSWGFNbi8Aw6ZRc1brxMyWMzG3DSSSSoekkudhUd9yLb6qx39T9nMdj/1/*)";

pub const WALLET_SNAPSHOT: &str = include_str!("../fixtures/wallet_snapshot.json");

static TRACING: Once = Once::new();

/// Install a test subscriber once; honours RUST_LOG
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn wallet_snapshot() -> Snapshot {
    init_tracing();
    Snapshot::from_json(WALLET_SNAPSHOT).expect("fixture parses")
}

pub fn txid(byte: u8) -> Txid {
    Txid([byte; 32])
}

/// Expansion collaborator whose descriptors only cover indexes below `range`
pub struct BoundedExpander {
    pub range: u32,
}

impl DescriptorExpander for BoundedExpander {
    fn validate(&self, descriptor: &str) -> std::result::Result<(), DescriptorError> {
        Expander::default().validate(descriptor)
    }

    fn derive_address(
        &self,
        descriptor: &str,
        index: DescriptorIndex,
    ) -> std::result::Result<String, DescriptorError> {
        match index {
            DescriptorIndex::Index(i) if i >= self.range => {
                Err(DescriptorError::IndexOutOfRange(u64::from(i)))
            }
            _ => Expander::default().derive_address(descriptor, index),
        }
    }
}

pub fn owned_output(txid: Txid, vout: u32, value: Sats) -> RawOutput {
    let txo = Txo::new(txid, vout);
    RawOutput {
        txo,
        value,
        owned_txo: Some(txo),
    }
}

pub fn foreign_output(txid: Txid, vout: u32, value: Sats) -> RawOutput {
    RawOutput {
        txo: Txo::new(txid, vout),
        value,
        owned_txo: None,
    }
}

pub fn owned_input(prev: Txo, value: Sats) -> RawInput {
    RawInput {
        prev_txo: prev,
        value,
        owned_prev_txo: Some(prev),
    }
}

pub fn foreign_input(prev: Txo, value: Sats) -> RawInput {
    RawInput {
        prev_txo: prev,
        value,
        owned_prev_txo: None,
    }
}
