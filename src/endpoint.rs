//! Electrum endpoint URIs: `protocol://host:port`
//!
//! Endpoints are rejected here, before any connection is attempted.

use crate::error::EndpointError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Ssl,
    Tcp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Protocol::Ssl => "ssl",
            Protocol::Tcp => "tcp",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElectrumEndpoint {
    pub protocol: Protocol,
    pub host: String,
    pub port: u16,
}

impl fmt::Display for ElectrumEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.protocol, self.host, self.port)
    }
}

impl FromStr for ElectrumEndpoint {
    type Err = EndpointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_endpoint(s)
    }
}

/// ParseEndpoint: 𝕊 → {ssl, tcp} × 𝕊 × ℕ⁺
///
/// 1. The URI splits on the first `://` into protocol and authority
/// 2. The host runs up to the first `:` or `/` and is non-empty
/// 3. The protocol is `ssl` or `tcp`
/// 4. The port follows `:`, ends at `/` or end of input, and is in 1..=65535
///
/// Anything after a `/` following the port is ignored.
pub fn parse_endpoint(uri: &str) -> Result<ElectrumEndpoint, EndpointError> {
    let (protocol, authority) = uri
        .split_once("://")
        .ok_or_else(|| EndpointError::Malformed(uri.to_string()))?;

    let host_end = authority
        .find(|c: char| c == ':' || c == '/')
        .unwrap_or(authority.len());
    let (host, rest) = authority.split_at(host_end);

    if host.is_empty() {
        return Err(EndpointError::MissingHost(uri.to_string()));
    }

    let protocol = match protocol {
        "ssl" => Protocol::Ssl,
        "tcp" => Protocol::Tcp,
        other => return Err(EndpointError::InvalidProtocol(other.to_string())),
    };

    let port = rest
        .strip_prefix(':')
        .map(|p| p.split('/').next().unwrap_or_default())
        .unwrap_or_default();
    if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
        return Err(EndpointError::InvalidPort(port.to_string()));
    }
    let port = match port.parse::<u16>() {
        Ok(port) if port > 0 => port,
        _ => return Err(EndpointError::InvalidPort(port.to_string())),
    };

    Ok(ElectrumEndpoint {
        protocol,
        host: host.to_string(),
        port,
    })
}
