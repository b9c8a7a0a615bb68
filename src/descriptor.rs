//! Output descriptor validation and single-address expansion
//!
//! Script descriptors are parsed by `miniscript`, so the whole descriptor
//! language it knows is accepted (`pkh`, `wpkh`, `sh`, `wsh`, `tr`, `multi`,
//! `sortedmulti`, key origins, multipath `<a;b>` steps). `addr(ADDRESS)` is
//! handled here. A trailing `#checksum` is verified against the exact text it
//! was computed over.
//!
//! A descriptor is usable when every extended key belongs to the configured
//! network, no derivation step needs a private key, and it has an address form.

use crate::constants::HARDENED_INDEX_BOUND;
use crate::discovery::DescriptorExpander;
use crate::error::DescriptorError;
use crate::types::{DescriptorIndex, Network};
use miniscript::bitcoin::{self, address::NetworkUnchecked, Address};
use miniscript::descriptor::checksum::desc_checksum;
use miniscript::descriptor::{ConversionError, DescriptorPublicKey};
use miniscript::{Descriptor, ForEachKey};
use secp256k1::{Secp256k1, Verification, VerifyOnly};
use std::str::FromStr;
use tracing::trace;

impl From<Network> for bitcoin::Network {
    fn from(network: Network) -> Self {
        match network {
            Network::Bitcoin => bitcoin::Network::Bitcoin,
            Network::Testnet => bitcoin::Network::Testnet,
            Network::Regtest => bitcoin::Network::Regtest,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptorKind {
    /// Script descriptor, possibly ranged or multipath
    Script(Descriptor<DescriptorPublicKey>),
    /// `addr(ADDRESS)`: one fixed address
    Address(Address),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletDescriptor {
    pub kind: DescriptorKind,
    pub network: Network,
}

impl WalletDescriptor {
    /// Parse and check that the descriptor expands on `network`
    pub fn parse<C: Verification>(
        secp: &Secp256k1<C>,
        descriptor: &str,
        network: Network,
    ) -> Result<Self, DescriptorError> {
        let body = strip_checksum(descriptor)?;

        let kind = match body.strip_prefix("addr(").and_then(|s| s.strip_suffix(')')) {
            Some(address) => DescriptorKind::Address(parse_address(address, network)?),
            None => {
                let script = Descriptor::<DescriptorPublicKey>::from_str(body)
                    .map_err(|e| DescriptorError::Syntax(e.to_string()))?;
                check_key_networks(&script, network)?;
                DescriptorKind::Script(script)
            }
        };

        let parsed = WalletDescriptor { kind, network };
        parsed.check_expansion(secp)?;
        Ok(parsed)
    }

    /// Whether the descriptor ends in a `*` wildcard
    pub fn is_ranged(&self) -> bool {
        matches!(&self.kind, DescriptorKind::Script(script) if script.has_wildcard())
    }

    pub fn is_multipath(&self) -> bool {
        matches!(&self.kind, DescriptorKind::Script(script) if script.is_multipath())
    }

    /// The single concrete address at `index`
    ///
    /// `Index(i)` needs a ranged descriptor and `i < 2^31`; `NonRanged` needs a
    /// descriptor without wildcard.
    pub fn address_at<C: Verification>(
        &self,
        secp: &Secp256k1<C>,
        index: DescriptorIndex,
    ) -> Result<String, DescriptorError> {
        let address = match (&self.kind, index) {
            (DescriptorKind::Address(address), DescriptorIndex::NonRanged) => address.to_string(),
            (DescriptorKind::Address(_), DescriptorIndex::Index(_)) => {
                return Err(index_mismatch(index, "descriptor is not ranged"))
            }
            (DescriptorKind::Script(script), index) => {
                let child = match (script.has_wildcard(), index) {
                    (true, DescriptorIndex::Index(i)) if i >= HARDENED_INDEX_BOUND => {
                        return Err(DescriptorError::IndexOutOfRange(u64::from(i)))
                    }
                    (true, DescriptorIndex::Index(i)) => i,
                    (false, DescriptorIndex::NonRanged) => 0,
                    (true, DescriptorIndex::NonRanged) => {
                        return Err(index_mismatch(index, "ranged descriptor needs a child index"))
                    }
                    (false, DescriptorIndex::Index(_)) => {
                        return Err(index_mismatch(index, "descriptor is not ranged"))
                    }
                };
                script_address(secp, script, child, self.network)?
            }
        };
        trace!(%index, %address, "expanded descriptor");
        Ok(address)
    }

    /// Derive the first address of every single path
    fn check_expansion<C: Verification>(&self, secp: &Secp256k1<C>) -> Result<(), DescriptorError> {
        let DescriptorKind::Script(script) = &self.kind else {
            return Ok(());
        };
        let singles = script
            .clone()
            .into_single_descriptors()
            .map_err(|e| DescriptorError::Syntax(e.to_string()))?;
        for single in &singles {
            script_address(secp, single, 0, self.network)?;
        }
        Ok(())
    }
}

fn script_address<C: Verification>(
    secp: &Secp256k1<C>,
    script: &Descriptor<DescriptorPublicKey>,
    child: u32,
    network: Network,
) -> Result<String, DescriptorError> {
    let derived = script.derived_descriptor(secp, child).map_err(|e| match e {
        ConversionError::MultiKey => DescriptorError::IndexMismatch {
            index: child.to_string(),
            reason: "multipath descriptor has no single address per index".to_string(),
        },
        other => DescriptorError::HardenedDerivation(other.to_string()),
    })?;
    let address = derived
        .address(network.into())
        .map_err(|e| DescriptorError::UnsupportedScript(e.to_string()))?;
    Ok(address.to_string())
}

fn check_key_networks(
    script: &Descriptor<DescriptorPublicKey>,
    network: Network,
) -> Result<(), DescriptorError> {
    let mut foreign = None;
    script.for_each_key(|key| {
        let key_network = match key {
            DescriptorPublicKey::XPub(xkey) => Some(xkey.xkey.network),
            DescriptorPublicKey::MultiXPub(xkey) => Some(xkey.xkey.network),
            DescriptorPublicKey::Single(_) => None,
        };
        match key_network {
            // tpub serves testnet and regtest alike
            Some(n) if (n == bitcoin::Network::Bitcoin) != (network == Network::Bitcoin) => {
                foreign = Some(format!("{:?} key {} used on {:?}", n, key, network));
                false
            }
            _ => true,
        }
    });
    match foreign {
        Some(reason) => Err(DescriptorError::NetworkMismatch(reason)),
        None => Ok(()),
    }
}

fn parse_address(address: &str, network: Network) -> Result<Address, DescriptorError> {
    address
        .parse::<Address<NetworkUnchecked>>()
        .map_err(|e| DescriptorError::Syntax(format!("addr({}): {}", address, e)))?
        .require_network(network.into())
        .map_err(|e| DescriptorError::NetworkMismatch(format!("addr({}): {}", address, e)))
}

fn strip_checksum(descriptor: &str) -> Result<&str, DescriptorError> {
    let Some((body, found)) = descriptor.split_once('#') else {
        return Ok(descriptor);
    };
    let expected = desc_checksum(body).map_err(|e| DescriptorError::Syntax(e.to_string()))?;
    if found != expected {
        return Err(DescriptorError::Checksum {
            expected,
            found: found.to_string(),
        });
    }
    Ok(body)
}

fn index_mismatch(index: DescriptorIndex, reason: &str) -> DescriptorError {
    DescriptorError::IndexMismatch {
        index: index.to_string(),
        reason: reason.to_string(),
    }
}

/// Default expansion collaborator: parses on every call, caches nothing
#[derive(Debug, Clone)]
pub struct Expander {
    pub network: Network,
    secp: Secp256k1<VerifyOnly>,
}

impl Default for Expander {
    fn default() -> Self {
        Self::new(Network::default())
    }
}

impl Expander {
    pub fn new(network: Network) -> Self {
        Self {
            network,
            secp: Secp256k1::verification_only(),
        }
    }

    pub fn parse(&self, descriptor: &str) -> Result<WalletDescriptor, DescriptorError> {
        WalletDescriptor::parse(&self.secp, descriptor, self.network)
    }
}

impl DescriptorExpander for Expander {
    fn validate(&self, descriptor: &str) -> Result<(), DescriptorError> {
        self.parse(descriptor).map(|_| ())
    }

    fn derive_address(
        &self,
        descriptor: &str,
        index: DescriptorIndex,
    ) -> Result<String, DescriptorError> {
        self.parse(descriptor)?.address_at(&self.secp, index)
    }
}
