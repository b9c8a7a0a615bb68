//! # Descriptor Attribution
//!
//! Wallet views for a single Bitcoin output descriptor: balance, UTXO set and
//! an attributed transaction history.
//!
//! Given the raw transaction records a discovery engine found for a descriptor,
//! this crate decides which inputs spent wallet funds and which outputs received
//! them, maps each to its descriptor derivation index, derives the address at
//! that index, and computes the net value each transaction moved.
//!
//! ## Architecture
//!
//! - Discovery engine (external): fetches and scans the chain
//! - Discovery snapshot: immutable per-call view of what was found
//! - Attribution resolver (this crate): pure functions over a snapshot
//! - Session: connection/fetch state machine that gates the resolver
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: resolver calls read one snapshot and hold no state
//! 2. **Per-row Failure**: an unresolvable input or output never hides its siblings
//! 3. **No Guessed Ownership**: only discovery's ownership records are trusted
//! 4. **Explicit Gating**: invalid descriptors and unfetched data are distinct states
//!
//! ## Usage
//!
//! ```rust
//! use descriptor_attribution::WalletView;
//! use descriptor_attribution::discovery::Snapshot;
//! use descriptor_attribution::types::*;
//!
//! let view = WalletView::new(Network::Bitcoin);
//! let descriptor = "wpkh(0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798)";
//! let valid = view.validate_descriptor(descriptor).unwrap();
//!
//! let mut snapshot = Snapshot::new();
//! snapshot.set_status(descriptor, FetchStatus::Fetched);
//! assert_eq!(view.compute_balance(&valid, &snapshot).unwrap(), 0);
//! ```

pub mod types;
pub mod constants;
pub mod error;
pub mod endpoint;
pub mod descriptor;
pub mod discovery;
pub mod attribution;
pub mod session;
pub mod config;

// Re-export commonly used types
pub use types::*;
pub use error::{DescriptorError, EndpointError, Result, RowError, WalletError};
pub use attribution::ValidDescriptor;
pub use descriptor::{Expander, WalletDescriptor};
pub use discovery::{DescriptorExpander, DiscoverySnapshot, OwnershipLookup, Snapshot};
pub use session::{SessionState, WalletSession, WalletSummary, WalletViewModel};
pub use crate::config::WalletConfig;

/// Main attribution entry point, bound to one expansion collaborator
///
/// # Examples
///
/// ```
/// use descriptor_attribution::{Expander, WalletView};
/// use descriptor_attribution::types::Network;
///
/// let view = WalletView::with_expander(Expander::new(Network::Testnet));
/// assert!(view.validate_descriptor("pkh(garbage)").is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct WalletView<E = Expander> {
    expander: E,
}

impl WalletView<Expander> {
    /// Create a view that expands descriptors for `network`
    ///
    /// # Examples
    ///
    /// ```
    /// use descriptor_attribution::WalletView;
    /// use descriptor_attribution::types::Network;
    ///
    /// let view = WalletView::new(Network::Bitcoin);
    /// ```
    pub fn new(network: Network) -> Self {
        Self {
            expander: Expander::new(network),
        }
    }
}

impl<E: DescriptorExpander> WalletView<E> {
    pub fn with_expander(expander: E) -> Self {
        Self { expander }
    }

    pub fn expander(&self) -> &E {
        &self.expander
    }

    /// Validate a descriptor before any fetch or resolve
    ///
    /// # Examples
    ///
    /// ```
    /// use descriptor_attribution::WalletView;
    /// use descriptor_attribution::types::Network;
    ///
    /// let view = WalletView::new(Network::Bitcoin);
    /// let valid = view
    ///     .validate_descriptor("pkh(xpub6BosfCnifzxcFwrSzQiqu2DBVTshkCXacvNsWGYJVVhhawA7d4R5WSWGFNbi8Aw6ZRc1brxMyWMzG3DSSSSoekkudhUd9yLb6qx39T9nMdj/1/*)")
    ///     .unwrap();
    /// assert!(valid.as_str().starts_with("pkh("));
    /// ```
    pub fn validate_descriptor(
        &self,
        descriptor: &str,
    ) -> std::result::Result<ValidDescriptor, DescriptorError> {
        attribution::validate_descriptor(&self.expander, descriptor)
    }

    /// Resolve an output reference to its owning descriptor index and address
    ///
    /// # Examples
    ///
    /// ```
    /// use descriptor_attribution::WalletView;
    /// use descriptor_attribution::discovery::Snapshot;
    /// use descriptor_attribution::types::*;
    ///
    /// let view = WalletView::new(Network::Bitcoin);
    /// let descriptor = "pkh(xpub6BosfCnifzxcFwrSzQiqu2DBVTshkCXacvNsWGYJVVhhawA7d4R5WSWGFNbi8Aw6ZRc1brxMyWMzG3DSSSSoekkudhUd9yLb6qx39T9nMdj/1/*)";
    /// let txo = Txo::new(Txid([7; 32]), 0);
    ///
    /// let mut snapshot = Snapshot::new();
    /// assert_eq!(view.resolve_owned_output(&txo, &snapshot), Ok(None));
    ///
    /// snapshot.record_ownership(txo, descriptor, DescriptorIndex::Index(0));
    /// let owned = view.resolve_owned_output(&txo, &snapshot).unwrap().unwrap();
    /// assert_eq!(owned.address, "1J3J6EvPrv8q6AC3VCjWV45Uf3nssNMRtH");
    /// ```
    pub fn resolve_owned_output<L: OwnershipLookup + ?Sized>(
        &self,
        txo: &Txo,
        lookup: &L,
    ) -> std::result::Result<Option<OwnedResolution>, RowError> {
        attribution::resolve_owned_output(txo, lookup, &self.expander)
    }

    /// Attribute one raw transaction record
    ///
    /// # Examples
    ///
    /// ```
    /// use descriptor_attribution::WalletView;
    /// use descriptor_attribution::discovery::Snapshot;
    /// use descriptor_attribution::types::*;
    ///
    /// let view = WalletView::new(Network::Bitcoin);
    /// let descriptor = "pkh(xpub6BosfCnifzxcFwrSzQiqu2DBVTshkCXacvNsWGYJVVhhawA7d4R5WSWGFNbi8Aw6ZRc1brxMyWMzG3DSSSSoekkudhUd9yLb6qx39T9nMdj/1/*)";
    /// let txid = Txid([1; 32]);
    /// let txo = Txo::new(txid, 0);
    ///
    /// let mut snapshot = Snapshot::new();
    /// snapshot.record_ownership(txo, descriptor, DescriptorIndex::Index(3));
    ///
    /// let raw = RawTransaction {
    ///     txid,
    ///     block_height: 800_000,
    ///     irreversible: true,
    ///     tx_type: TxType::Received,
    ///     ins: vec![],
    ///     outs: vec![RawOutput { txo, value: 50_000, owned_txo: Some(txo) }],
    /// };
    ///
    /// let attributed = view.attribute_transaction(&raw, &snapshot).unwrap();
    /// assert_eq!(attributed.net_received, 50_000);
    /// assert_eq!(attributed.outputs[0].index, DescriptorIndex::Index(3));
    /// ```
    pub fn attribute_transaction<L: OwnershipLookup + ?Sized>(
        &self,
        raw: &RawTransaction,
        lookup: &L,
    ) -> Result<TxAttribution> {
        attribution::attribute_transaction(raw, lookup, &self.expander)
    }

    /// Attributed history, most recent first
    pub fn list_history<S: DiscoverySnapshot + ?Sized>(
        &self,
        descriptor: &ValidDescriptor,
        snapshot: &S,
    ) -> Result<Vec<TxAttribution>> {
        attribution::list_history(descriptor, snapshot, &self.expander)
    }

    pub fn list_utxos<S: DiscoverySnapshot + ?Sized>(
        &self,
        descriptor: &ValidDescriptor,
        snapshot: &S,
    ) -> Result<Vec<Utxo>> {
        attribution::list_utxos(descriptor, snapshot)
    }

    pub fn compute_balance<S: DiscoverySnapshot + ?Sized>(
        &self,
        descriptor: &ValidDescriptor,
        snapshot: &S,
    ) -> Result<Sats> {
        attribution::compute_balance(descriptor, snapshot)
    }

    /// Gated view of `session` over `snapshot`
    pub fn view<S: DiscoverySnapshot + ?Sized>(
        &self,
        session: &WalletSession,
        snapshot: &S,
    ) -> Result<WalletViewModel> {
        session.view(snapshot, &self.expander)
    }
}
