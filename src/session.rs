//! Connection and fetch lifecycle around the resolver
//!
//! The resolver only runs once a session has fetched a validated descriptor.
//! Every other state is reported as a distinct view instead of an error or a
//! zero balance.

use crate::attribution::{compute_balance, list_history, list_utxos, validate_descriptor, ValidDescriptor};
use crate::discovery::{DescriptorExpander, DiscoverySnapshot};
use crate::endpoint::{parse_endpoint, ElectrumEndpoint};
use crate::error::{DescriptorError, Result, WalletError};
use crate::types::*;
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
    Fetching,
    Fetched,
}

/// Everything the wallet screen can show for a fetched descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalletSummary {
    pub balance: Sats,
    pub utxos: Vec<Utxo>,
    /// Most recent first
    pub history: Vec<TxAttribution>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "data", rename_all = "kebab-case")]
pub enum WalletViewModel {
    /// No descriptor entered yet
    NotConfigured,
    /// The descriptor is not usable; nothing else is shown
    DescriptorInvalid(DescriptorError),
    NotConnected,
    /// Connecting, or a fetch is in flight
    Loading,
    /// Connected, but discovery has not fetched this descriptor yet
    NoDataYet,
    Ready(WalletSummary),
}

#[derive(Debug, Clone)]
pub struct WalletSession {
    state: SessionState,
    endpoint: Option<ElectrumEndpoint>,
    descriptor: String,
    validity: std::result::Result<ValidDescriptor, DescriptorError>,
}

impl WalletSession {
    pub fn new<E: DescriptorExpander + ?Sized>(descriptor: &str, expander: &E) -> Self {
        Self {
            state: SessionState::Disconnected,
            endpoint: None,
            descriptor: descriptor.to_string(),
            validity: validate_descriptor(expander, descriptor),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn endpoint(&self) -> Option<&ElectrumEndpoint> {
        self.endpoint.as_ref()
    }

    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    pub fn valid_descriptor(&self) -> std::result::Result<&ValidDescriptor, &DescriptorError> {
        self.validity.as_ref()
    }

    /// Replace the descriptor. Results fetched for the previous one no longer apply.
    pub fn set_descriptor<E: DescriptorExpander + ?Sized>(&mut self, descriptor: &str, expander: &E) {
        self.descriptor = descriptor.to_string();
        self.validity = validate_descriptor(expander, descriptor);
        match &self.validity {
            Err(reason) if !descriptor.is_empty() => warn!(%reason, "descriptor is not usable"),
            _ => {}
        }
        if matches!(self.state, SessionState::Fetching | SessionState::Fetched) {
            self.transition(SessionState::Connected);
        }
    }

    /// Start connecting to `uri`. A malformed URI is rejected before the state changes.
    pub fn connect(&mut self, uri: &str) -> Result<&ElectrumEndpoint> {
        let endpoint = parse_endpoint(uri)?;
        if self.state != SessionState::Disconnected {
            self.disconnect();
        }
        info!(%endpoint, "connecting");
        self.transition(SessionState::Connecting);
        Ok(&*self.endpoint.insert(endpoint))
    }

    pub fn connection_established(&mut self) -> Result<()> {
        self.require(&[SessionState::Connecting], "connection_established")?;
        self.transition(SessionState::Connected);
        Ok(())
    }

    pub fn connection_failed(&mut self) {
        if self.state == SessionState::Connecting {
            warn!("connection failed");
            self.endpoint = None;
            self.transition(SessionState::Disconnected);
        }
    }

    /// Enter `Fetching` and hand back the descriptor discovery should fetch
    pub fn begin_fetch(&mut self) -> Result<ValidDescriptor> {
        self.require(&[SessionState::Connected, SessionState::Fetched], "begin_fetch")?;
        let descriptor = self.validity.clone()?;
        self.transition(SessionState::Fetching);
        Ok(descriptor)
    }

    pub fn fetch_completed(&mut self) -> Result<()> {
        self.require(&[SessionState::Fetching], "fetch_completed")?;
        self.transition(SessionState::Fetched);
        Ok(())
    }

    pub fn disconnect(&mut self) {
        self.endpoint = None;
        self.transition(SessionState::Disconnected);
    }

    /// Project the snapshot through the resolver, gated on session state
    pub fn view<S, E>(&self, snapshot: &S, expander: &E) -> Result<WalletViewModel>
    where
        S: DiscoverySnapshot + ?Sized,
        E: DescriptorExpander + ?Sized,
    {
        if self.descriptor.is_empty() {
            return Ok(WalletViewModel::NotConfigured);
        }
        let descriptor = match &self.validity {
            Ok(descriptor) => descriptor,
            Err(reason) => return Ok(WalletViewModel::DescriptorInvalid(reason.clone())),
        };

        match self.state {
            SessionState::Disconnected => return Ok(WalletViewModel::NotConnected),
            SessionState::Connecting | SessionState::Fetching => return Ok(WalletViewModel::Loading),
            SessionState::Connected => return Ok(WalletViewModel::NoDataYet),
            SessionState::Fetched => {}
        }

        if snapshot.fetch_status(descriptor.as_str()) != FetchStatus::Fetched {
            return Ok(WalletViewModel::NoDataYet);
        }

        Ok(WalletViewModel::Ready(WalletSummary {
            balance: compute_balance(descriptor, snapshot)?,
            utxos: list_utxos(descriptor, snapshot)?,
            history: list_history(descriptor, snapshot, expander)?,
        }))
    }

    fn require(&self, allowed: &[SessionState], operation: &str) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(WalletError::InvalidTransition(format!(
                "{} not allowed while {:?}",
                operation, self.state
            )))
        }
    }

    fn transition(&mut self, next: SessionState) {
        if self.state != next {
            info!(from = ?self.state, to = ?next, "session transition");
            self.state = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::Expander;
    use crate::discovery::Snapshot;
    use crate::error::EndpointError;

    const G: &str = "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";

    fn descriptor() -> String {
        format!("wpkh({})", G)
    }

    fn connected_session() -> WalletSession {
        let mut session = WalletSession::new(&descriptor(), &Expander::default());
        session.connect("ssl://node.example.com:700").unwrap();
        session.connection_established().unwrap();
        session
    }

    #[test]
    fn test_full_lifecycle() {
        let mut session = connected_session();
        assert_eq!(session.state(), SessionState::Connected);
        let fetched = session.begin_fetch().unwrap();
        assert_eq!(fetched.as_str(), descriptor());
        assert_eq!(session.state(), SessionState::Fetching);
        session.fetch_completed().unwrap();
        assert_eq!(session.state(), SessionState::Fetched);
        session.disconnect();
        assert_eq!(session.state(), SessionState::Disconnected);
        assert!(session.endpoint().is_none());
    }

    #[test]
    fn test_bad_uri_leaves_state_untouched() {
        let mut session = connected_session();
        let err = session.connect("http://host:50001").unwrap_err();
        assert!(matches!(err, WalletError::Endpoint(EndpointError::InvalidProtocol(_))));
        assert_eq!(session.state(), SessionState::Connected);
        assert_eq!(session.endpoint().unwrap().host, "node.example.com");
    }

    #[test]
    fn test_reconnect_replaces_endpoint() {
        let mut session = connected_session();
        session.connect("tcp://other.example.com:50001").unwrap();
        assert_eq!(session.state(), SessionState::Connecting);
        assert_eq!(session.endpoint().unwrap().port, 50001);
    }

    #[test]
    fn test_fetch_requires_connection() {
        let mut session = WalletSession::new(&descriptor(), &Expander::default());
        assert!(matches!(session.begin_fetch(), Err(WalletError::InvalidTransition(_))));
        assert!(matches!(session.fetch_completed(), Err(WalletError::InvalidTransition(_))));
    }

    #[test]
    fn test_invalid_descriptor_blocks_fetch() {
        let mut session = connected_session();
        session.set_descriptor("pkh(nonsense)", &Expander::default());
        assert!(matches!(session.begin_fetch(), Err(WalletError::Descriptor(_))));
        assert_eq!(session.state(), SessionState::Connected);
    }

    #[test]
    fn test_descriptor_change_drops_fetched_state() {
        let mut session = connected_session();
        session.begin_fetch().unwrap();
        session.fetch_completed().unwrap();
        session.set_descriptor(&format!("pkh({})", G), &Expander::default());
        assert_eq!(session.state(), SessionState::Connected);
    }

    #[test]
    fn test_connection_failure() {
        let mut session = WalletSession::new(&descriptor(), &Expander::default());
        session.connect("ssl://node.example.com:700").unwrap();
        session.connection_failed();
        assert_eq!(session.state(), SessionState::Disconnected);
        assert!(session.connection_established().is_err());
    }

    #[test]
    fn test_views_by_state() {
        let expander = Expander::default();
        let mut snapshot = Snapshot::new();
        let mut session = WalletSession::new(&descriptor(), &expander);
        assert_eq!(session.view(&snapshot, &expander).unwrap(), WalletViewModel::NotConnected);

        session.connect("ssl://node.example.com:700").unwrap();
        assert_eq!(session.view(&snapshot, &expander).unwrap(), WalletViewModel::Loading);

        session.connection_established().unwrap();
        assert_eq!(session.view(&snapshot, &expander).unwrap(), WalletViewModel::NoDataYet);

        session.begin_fetch().unwrap();
        session.fetch_completed().unwrap();
        // session finished but the snapshot does not know the descriptor
        assert_eq!(session.view(&snapshot, &expander).unwrap(), WalletViewModel::NoDataYet);

        snapshot.set_status(&descriptor(), FetchStatus::Fetched);
        match session.view(&snapshot, &expander).unwrap() {
            WalletViewModel::Ready(summary) => {
                assert_eq!(summary.balance, 0);
                assert!(summary.history.is_empty());
            }
            other => panic!("unexpected view {:?}", other),
        }

        session.set_descriptor("pkh(garbage)", &expander);
        assert!(matches!(
            session.view(&snapshot, &expander).unwrap(),
            WalletViewModel::DescriptorInvalid(DescriptorError::Syntax(_))
        ));
    }

    #[test]
    fn test_empty_descriptor_is_not_configured() {
        let expander = Expander::default();
        let mut session = WalletSession::new("", &expander);
        session.connect("ssl://node.example.com:700").unwrap();
        session.connection_established().unwrap();
        let snapshot = Snapshot::new();
        assert_eq!(session.view(&snapshot, &expander).unwrap(), WalletViewModel::NotConfigured);
        // still cannot be fetched
        assert!(matches!(session.begin_fetch(), Err(WalletError::Descriptor(_))));

        session.set_descriptor(&descriptor(), &expander);
        assert_eq!(session.view(&snapshot, &expander).unwrap(), WalletViewModel::NoDataYet);
        session.set_descriptor("", &expander);
        assert_eq!(session.view(&snapshot, &expander).unwrap(), WalletViewModel::NotConfigured);
    }
}
