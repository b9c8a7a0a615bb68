//! Core types for descriptor attribution

use crate::error::{RowError, WalletError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Amount in satoshis
pub type Sats = u64;

/// Signed amount in satoshis
pub type SignedSats = i64;

/// Transaction id: 32 bytes, kept in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Txid(pub [u8; 32]);

impl fmt::Display for Txid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for Txid {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)
            .map_err(|e| WalletError::MalformedRecord(format!("txid {}: {}", s, e)))?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|_| {
            WalletError::MalformedRecord(format!("txid {} is not 32 bytes", s))
        })?;
        Ok(Txid(bytes))
    }
}

impl TryFrom<String> for Txid {
    type Error = WalletError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Txid> for String {
    fn from(txid: Txid) -> Self {
        txid.to_string()
    }
}

/// Output reference: 𝒪 = ℍ × ℕ, written `txid:vout`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Txo {
    pub txid: Txid,
    pub vout: u32,
}

impl Txo {
    pub fn new(txid: Txid, vout: u32) -> Self {
        Self { txid, vout }
    }
}

impl fmt::Display for Txo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.txid, self.vout)
    }
}

impl FromStr for Txo {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (txid, vout) = s
            .split_once(':')
            .ok_or_else(|| WalletError::MalformedRecord(format!("txo {} has no vout", s)))?;
        let vout = vout
            .parse::<u32>()
            .map_err(|e| WalletError::MalformedRecord(format!("txo {}: {}", s, e)))?;
        Ok(Txo { txid: txid.parse()?, vout })
    }
}

impl TryFrom<String> for Txo {
    type Error = WalletError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Txo> for String {
    fn from(txo: Txo) -> Self {
        txo.to_string()
    }
}

/// Position of an address within a descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "IndexRepr", into = "IndexRepr")]
pub enum DescriptorIndex {
    /// Child number substituted for the `*` of a ranged descriptor
    Index(u32),
    /// The single address of a descriptor without `*`
    NonRanged,
}

const NON_RANGED_LABEL: &str = "non-ranged";

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum IndexRepr {
    Index(u32),
    Label(String),
}

impl TryFrom<IndexRepr> for DescriptorIndex {
    type Error = String;

    fn try_from(repr: IndexRepr) -> Result<Self, Self::Error> {
        match repr {
            IndexRepr::Index(i) => Ok(DescriptorIndex::Index(i)),
            IndexRepr::Label(label) if label == NON_RANGED_LABEL => Ok(DescriptorIndex::NonRanged),
            IndexRepr::Label(label) => Err(format!("unknown descriptor index {}", label)),
        }
    }
}

impl From<DescriptorIndex> for IndexRepr {
    fn from(index: DescriptorIndex) -> Self {
        match index {
            DescriptorIndex::Index(i) => IndexRepr::Index(i),
            DescriptorIndex::NonRanged => IndexRepr::Label(NON_RANGED_LABEL.to_string()),
        }
    }
}

impl fmt::Display for DescriptorIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DescriptorIndex::Index(i) => write!(f, "{}", i),
            DescriptorIndex::NonRanged => f.write_str(NON_RANGED_LABEL),
        }
    }
}

/// Ownership record: Txo → (descriptor, index)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipRecord {
    pub descriptor: String,
    pub index: DescriptorIndex,
}

/// Chain the descriptors and addresses belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Bitcoin,
    Testnet,
    Regtest,
}

impl FromStr for Network {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bitcoin" | "mainnet" => Ok(Network::Bitcoin),
            "testnet" => Ok(Network::Testnet),
            "regtest" => Ok(Network::Regtest),
            other => Err(WalletError::Config(format!("unknown network {}", other))),
        }
    }
}

/// Transaction classification, decided by the discovery collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TxType {
    Received,
    Sent,
    Consolidated,
    ReceivedAndSent,
}

impl fmt::Display for TxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TxType::Received => "RECEIVED",
            TxType::Sent => "SENT",
            TxType::Consolidated => "CONSOLIDATED",
            TxType::ReceivedAndSent => "RECEIVED_AND_SENT",
        })
    }
}

/// Discovery progress for one descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FetchStatus {
    #[default]
    NotFetched,
    Fetching,
    Fetched,
}

/// Unspent output owned by a descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    pub txo: Txo,
    pub value: Sats,
}

/// Raw input as reported by discovery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawInput {
    pub prev_txo: Txo,
    pub value: Sats,
    /// Set when the spent output belonged to the wallet
    #[serde(default)]
    pub owned_prev_txo: Option<Txo>,
}

/// Raw output as reported by discovery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawOutput {
    pub txo: Txo,
    pub value: Sats,
    /// Set when the output belongs to the wallet
    #[serde(default)]
    pub owned_txo: Option<Txo>,
}

/// Raw transaction record: ℐ* × 𝒯* plus chain position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTransaction {
    pub txid: Txid,
    /// 0 while unconfirmed
    #[serde(default)]
    pub block_height: u32,
    #[serde(default)]
    pub irreversible: bool,
    pub tx_type: TxType,
    pub ins: Vec<RawInput>,
    pub outs: Vec<RawOutput>,
}

/// An owned output resolved to its concrete address
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnedResolution {
    pub descriptor: String,
    pub index: DescriptorIndex,
    pub address: String,
}

/// Funds leaving the wallet through one input
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InputLine {
    pub input_index: usize,
    pub value: Sats,
    pub index: DescriptorIndex,
    pub address: String,
}

impl fmt::Display for InputLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Sent {} sats by placing them in tx's vin: {}, spending from descriptor index: {}, which corresponds to address: {}",
            self.value, self.input_index, self.index, self.address
        )
    }
}

/// Funds entering the wallet through one output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputLine {
    pub output_index: usize,
    pub value: Sats,
    pub index: DescriptorIndex,
    pub address: String,
}

impl fmt::Display for OutputLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Received {} sats from tx's vout: {}, to owned descriptor index: {}, which corresponds to address: {}",
            self.value, self.output_index, self.index, self.address
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Input,
    Output,
}

/// Owned row that produced no line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedRow {
    pub side: Side,
    pub position: usize,
    pub value: Sats,
    pub reason: RowError,
}

/// Attributed transaction: the display view of one raw record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxAttribution {
    pub txid: Txid,
    pub tx_type: TxType,
    pub block_height: u32,
    pub irreversible: bool,
    /// Σ resolved output lines − Σ resolved input lines
    pub net_received: SignedSats,
    pub inputs: Vec<InputLine>,
    pub outputs: Vec<OutputLine>,
    pub unresolved: Vec<UnresolvedRow>,
}

impl TxAttribution {
    pub fn is_confirmed(&self) -> bool {
        self.block_height > 0
    }

    /// All display lines, inputs first
    pub fn lines(&self) -> Vec<String> {
        self.inputs
            .iter()
            .map(ToString::to_string)
            .chain(self.outputs.iter().map(ToString::to_string))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TXID: &str = "4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33b";

    #[test]
    fn test_txo_parse_and_display() {
        let txo: Txo = format!("{}:7", TXID).parse().unwrap();
        assert_eq!(txo.vout, 7);
        assert_eq!(txo.to_string(), format!("{}:7", TXID));
    }

    #[test]
    fn test_txo_rejects_missing_vout() {
        assert!(TXID.parse::<Txo>().is_err());
        assert!(format!("{}:x", TXID).parse::<Txo>().is_err());
        assert!("abcd:1".parse::<Txo>().is_err());
    }

    #[test]
    fn test_descriptor_index_serde() {
        let ranged: DescriptorIndex = serde_json::from_str("3").unwrap();
        assert_eq!(ranged, DescriptorIndex::Index(3));
        let fixed: DescriptorIndex = serde_json::from_str("\"non-ranged\"").unwrap();
        assert_eq!(fixed, DescriptorIndex::NonRanged);
        assert_eq!(serde_json::to_string(&fixed).unwrap(), "\"non-ranged\"");
        assert!(serde_json::from_str::<DescriptorIndex>("\"ranged\"").is_err());
    }

    #[test]
    fn test_tx_type_wire_names() {
        let t: TxType = serde_json::from_str("\"RECEIVED_AND_SENT\"").unwrap();
        assert_eq!(t, TxType::ReceivedAndSent);
        assert_eq!(t.to_string(), "RECEIVED_AND_SENT");
    }

    #[test]
    fn test_line_rendering() {
        let line = OutputLine {
            output_index: 0,
            value: 50_000,
            index: DescriptorIndex::Index(3),
            address: "1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH".to_string(),
        };
        assert_eq!(
            line.to_string(),
            "Received 50000 sats from tx's vout: 0, to owned descriptor index: 3, which corresponds to address: 1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH"
        );
    }
}
