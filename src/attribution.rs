//! Transaction attribution: which inputs spent wallet funds, which outputs
//! received them, at which descriptor index and address.

use crate::constants::MAX_MONEY;
use crate::discovery::{DescriptorExpander, DiscoverySnapshot, OwnershipLookup};
use crate::error::{DescriptorError, Result, RowError, WalletError};
use crate::types::*;
use tracing::{debug, instrument, warn};

/// A descriptor string the expansion collaborator has accepted.
///
/// Only [`validate_descriptor`] builds one, so every aggregate view below is
/// unreachable for a descriptor that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValidDescriptor(String);

impl ValidDescriptor {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ValidDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn validate_descriptor<E: DescriptorExpander + ?Sized>(
    expander: &E,
    descriptor: &str,
) -> std::result::Result<ValidDescriptor, DescriptorError> {
    expander.validate(descriptor)?;
    Ok(ValidDescriptor(descriptor.to_string()))
}

/// ResolveOwnedOutput: 𝒪 → Option<(descriptor, index, address)>
///
/// - lookup miss: `Ok(None)`, the output is simply not owned
/// - lookup hit: the address at (descriptor, index)
/// - expansion rejects the pair: `Err`, fatal for this row only
pub fn resolve_owned_output<L, E>(
    txo: &Txo,
    lookup: &L,
    expander: &E,
) -> std::result::Result<Option<OwnedResolution>, RowError>
where
    L: OwnershipLookup + ?Sized,
    E: DescriptorExpander + ?Sized,
{
    let Some(OwnershipRecord { descriptor, index }) = lookup.get_descriptor(txo) else {
        return Ok(None);
    };
    let address = expander.derive_address(&descriptor, index)?;
    Ok(Some(OwnedResolution {
        descriptor,
        index,
        address,
    }))
}

/// An annotated row must resolve; a lookup miss here means the snapshot is inconsistent
fn resolve_annotated<L, E>(
    txo: &Txo,
    lookup: &L,
    expander: &E,
) -> std::result::Result<OwnedResolution, RowError>
where
    L: OwnershipLookup + ?Sized,
    E: DescriptorExpander + ?Sized,
{
    resolve_owned_output(txo, lookup, expander)?
        .ok_or_else(|| RowError::UnknownOwnership(txo.to_string()))
}

/// AttributeTransaction: raw record → attributed view
///
/// netReceived = Σ resolved owned outputs − Σ resolved owned inputs.
/// Rows that carry no ownership annotation produce nothing. Annotated rows that
/// fail to resolve are listed in `unresolved` and excluded from the net value.
#[instrument(skip_all, fields(txid = %raw.txid))]
pub fn attribute_transaction<L, E>(
    raw: &RawTransaction,
    lookup: &L,
    expander: &E,
) -> Result<TxAttribution>
where
    L: OwnershipLookup + ?Sized,
    E: DescriptorExpander + ?Sized,
{
    check_record(raw)?;

    let mut net_received: SignedSats = 0;
    let mut inputs = Vec::new();
    let mut outputs = Vec::new();
    let mut unresolved = Vec::new();

    for (input_index, input) in raw.ins.iter().enumerate() {
        let Some(owned) = &input.owned_prev_txo else {
            continue;
        };
        match resolve_annotated(owned, lookup, expander) {
            Ok(resolution) => {
                debug!(input_index, index = %resolution.index, "owned input");
                net_received -= input.value as SignedSats;
                inputs.push(InputLine {
                    input_index,
                    value: input.value,
                    index: resolution.index,
                    address: resolution.address,
                });
            }
            Err(reason) => {
                warn!(input_index, %reason, "dropping owned input");
                unresolved.push(UnresolvedRow {
                    side: Side::Input,
                    position: input_index,
                    value: input.value,
                    reason,
                });
            }
        }
    }

    for (output_index, output) in raw.outs.iter().enumerate() {
        let Some(owned) = &output.owned_txo else {
            continue;
        };
        match resolve_annotated(owned, lookup, expander) {
            Ok(resolution) => {
                debug!(output_index, index = %resolution.index, "owned output");
                net_received += output.value as SignedSats;
                outputs.push(OutputLine {
                    output_index,
                    value: output.value,
                    index: resolution.index,
                    address: resolution.address,
                });
            }
            Err(reason) => {
                warn!(output_index, %reason, "dropping owned output");
                unresolved.push(UnresolvedRow {
                    side: Side::Output,
                    position: output_index,
                    value: output.value,
                    reason,
                });
            }
        }
    }

    Ok(TxAttribution {
        txid: raw.txid,
        tx_type: raw.tx_type,
        block_height: raw.block_height,
        irreversible: raw.irreversible,
        net_received,
        inputs,
        outputs,
        unresolved,
    })
}

/// Structural contract of a raw record. Violations are caller bugs, not runtime conditions.
///
/// 1. ∀i: outs[i].txo = (txid, i)
/// 2. an ownership annotation names the row it is attached to
/// 3. ∀ row: value ≤ M_max
/// 4. Σ owned inputs ≤ M_max and Σ owned outputs ≤ M_max, so netReceived fits in i64
fn check_record(raw: &RawTransaction) -> Result<()> {
    let owned_in = raw
        .ins
        .iter()
        .filter(|input| input.owned_prev_txo.is_some())
        .fold(0 as Sats, |sum, input| sum.saturating_add(input.value));
    let owned_out = raw
        .outs
        .iter()
        .filter(|output| output.owned_txo.is_some())
        .fold(0 as Sats, |sum, output| sum.saturating_add(output.value));
    if owned_in > MAX_MONEY || owned_out > MAX_MONEY {
        return Err(WalletError::MalformedRecord(format!(
            "{} moves more than the money supply: {} owned in, {} owned out",
            raw.txid, owned_in, owned_out
        )));
    }

    for (i, input) in raw.ins.iter().enumerate() {
        if input.value > MAX_MONEY {
            return Err(WalletError::MalformedRecord(format!(
                "input {} of {} carries {} sats",
                i, raw.txid, input.value
            )));
        }
        if let Some(owned) = &input.owned_prev_txo {
            if *owned != input.prev_txo {
                return Err(WalletError::MalformedRecord(format!(
                    "input {} of {} spends {} but is annotated with {}",
                    i, raw.txid, input.prev_txo, owned
                )));
            }
        }
    }

    for (i, output) in raw.outs.iter().enumerate() {
        let expected = Txo::new(raw.txid, i as u32);
        if output.txo != expected {
            return Err(WalletError::MalformedRecord(format!(
                "output {} of {} references {}",
                i, raw.txid, output.txo
            )));
        }
        if output.value > MAX_MONEY {
            return Err(WalletError::MalformedRecord(format!(
                "output {} of {} carries {} sats",
                i, raw.txid, output.value
            )));
        }
        if let Some(owned) = &output.owned_txo {
            if *owned != expected {
                return Err(WalletError::MalformedRecord(format!(
                    "output {} of {} is annotated with {}",
                    i, raw.txid, owned
                )));
            }
        }
    }

    Ok(())
}

fn ensure_fetched<S: DiscoverySnapshot + ?Sized>(
    descriptor: &ValidDescriptor,
    snapshot: &S,
) -> Result<()> {
    match snapshot.fetch_status(descriptor.as_str()) {
        FetchStatus::Fetched => Ok(()),
        status => Err(WalletError::NotFetched(format!("{} is {:?}", descriptor, status))),
    }
}

/// ListHistory: attributed transactions, most recent first
#[instrument(skip_all, fields(descriptor = %descriptor))]
pub fn list_history<S, E>(
    descriptor: &ValidDescriptor,
    snapshot: &S,
    expander: &E,
) -> Result<Vec<TxAttribution>>
where
    S: DiscoverySnapshot + ?Sized,
    E: DescriptorExpander + ?Sized,
{
    ensure_fetched(descriptor, snapshot)?;
    let history = snapshot
        .history(descriptor.as_str())
        .iter()
        .rev()
        .map(|raw| attribute_transaction(raw, snapshot, expander))
        .collect::<Result<Vec<_>>>()?;
    debug!(transactions = history.len(), "attributed history");
    Ok(history)
}

/// ListUtxos: the snapshot's unspent outputs for the descriptor
pub fn list_utxos<S: DiscoverySnapshot + ?Sized>(
    descriptor: &ValidDescriptor,
    snapshot: &S,
) -> Result<Vec<Utxo>> {
    ensure_fetched(descriptor, snapshot)?;
    Ok(snapshot.utxos(descriptor.as_str()).to_vec())
}

/// ComputeBalance: Σ value over ListUtxos
///
/// The collaborator's own balance must agree with the UTXO sum.
pub fn compute_balance<S: DiscoverySnapshot + ?Sized>(
    descriptor: &ValidDescriptor,
    snapshot: &S,
) -> Result<Sats> {
    let balance = list_utxos(descriptor, snapshot)?
        .iter()
        .fold(0 as Sats, |sum, utxo| sum.saturating_add(utxo.value));
    let reported = snapshot.balance(descriptor.as_str());
    if reported != balance {
        warn!(descriptor = %descriptor, balance, reported, "balance disagrees with utxo set");
        return Err(WalletError::InconsistentSnapshot(format!(
            "{} reports balance {} but its utxos sum to {}",
            descriptor, reported, balance
        )));
    }
    Ok(balance)
}
