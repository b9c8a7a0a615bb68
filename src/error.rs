//! Error types for descriptor attribution

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WalletError {
    #[error("Invalid endpoint: {0}")]
    Endpoint(#[from] EndpointError),

    #[error("Invalid descriptor: {0}")]
    Descriptor(#[from] DescriptorError),

    #[error("Malformed transaction record: {0}")]
    MalformedRecord(String),

    #[error("Descriptor has not been fetched: {0}")]
    NotFetched(String),

    #[error("Invalid session transition: {0}")]
    InvalidTransition(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Discovery snapshot is inconsistent: {0}")]
    InconsistentSnapshot(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, WalletError>;

/// Rejections of an `protocol://host:port` endpoint URI
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EndpointError {
    #[error("Invalid electrum endpoint {0}")]
    Malformed(String),

    #[error("Invalid host: {0:?}")]
    MissingHost(String),

    #[error("Invalid protocol: {0}. Expected 'ssl' or 'tcp'")]
    InvalidProtocol(String),

    #[error("Invalid or missing port: {0:?}. Port must be a positive number")]
    InvalidPort(String),
}

/// Everything the descriptor expansion collaborator can reject.
///
/// Only these outcomes mean a descriptor (or a descriptor/index pair) is unusable.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DescriptorError {
    #[error("Descriptor syntax error: {0}")]
    Syntax(String),

    #[error("Descriptor has no address form: {0}")]
    UnsupportedScript(String),

    #[error("Checksum mismatch: expected {expected}, found {found}")]
    Checksum { expected: String, found: String },

    #[error("Key or address belongs to another network: {0}")]
    NetworkMismatch(String),

    #[error("Hardened step cannot be derived from a public key: {0}")]
    HardenedDerivation(String),

    #[error("Derivation index {0} is out of range")]
    IndexOutOfRange(u64),

    #[error("Index {index} does not fit descriptor ranging: {reason}")]
    IndexMismatch { index: String, reason: String },
}

/// Why a single owned input/output row could not be displayed
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RowError {
    #[error("Ownership of {0} is not known to the discovery snapshot")]
    UnknownOwnership(String),

    #[error("Address derivation failed: {0}")]
    Derivation(#[from] DescriptorError),
}
