//! Server addresses derived from server records.

use crate::{error::Result, Error, Port};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Scheme of every stored server address.
pub const CONTROL_SCHEME: &str = "http";

/// Path of the control endpoint on a server.
pub const CONTROL_PATH: &str = "/control";

/// A `scheme://host:port/path` address of a server's control endpoint.
///
/// Hosts containing `:` (IPv6 literals) are bracketed so the port separator
/// stays unambiguous.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServerAddress(String);

impl ServerAddress {
    /// Build the control address of a server at `host:port`.
    pub fn from_host_port(host: &str, port: Port) -> Self {
        let host = host.trim();
        let host = if host.contains(':') && !host.starts_with('[') {
            format!("[{host}]")
        } else {
            host.to_string()
        };
        Self(format!("{CONTROL_SCHEME}://{host}:{port}{CONTROL_PATH}"))
    }

    /// Parse a stored address, validating its shape.
    pub fn parse(value: &str) -> Result<Self> {
        let address = Self(value.to_string());
        address.authority()?;
        Ok(address)
    }

    /// The address as stored.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Host and port, with any IPv6 brackets removed.
    pub fn host_port(&self) -> Result<(String, Port)> {
        let authority = self.authority()?;
        let (host, port) = authority
            .rsplit_once(':')
            .ok_or_else(|| Error::InvalidAddress(self.0.clone()))?;

        let port: Port = port
            .parse()
            .map_err(|_| Error::InvalidAddress(self.0.clone()))?;

        let host = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);

        if host.is_empty() {
            return Err(Error::InvalidAddress(self.0.clone()));
        }

        Ok((host.to_string(), port))
    }

    /// `host:port` form suitable for socket connects.
    pub fn socket_target(&self) -> Result<String> {
        let (host, port) = self.host_port()?;
        if host.contains(':') {
            Ok(format!("[{host}]:{port}"))
        } else {
            Ok(format!("{host}:{port}"))
        }
    }

    fn authority(&self) -> Result<&str> {
        let rest = self
            .0
            .split_once("://")
            .map(|(_, rest)| rest)
            .ok_or_else(|| Error::InvalidAddress(self.0.clone()))?;

        let authority = rest.split('/').next().unwrap_or_default();
        if authority.is_empty() {
            return Err(Error::InvalidAddress(self.0.clone()));
        }
        Ok(authority)
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ipv4_address() {
        let address = ServerAddress::from_host_port("192.168.1.5", 3000);
        assert_eq!(address.as_str(), "http://192.168.1.5:3000/control");
        assert_eq!(
            address.host_port().unwrap(),
            ("192.168.1.5".to_string(), 3000)
        );
        assert_eq!(address.socket_target().unwrap(), "192.168.1.5:3000");
    }

    #[test]
    fn ipv6_address_is_bracketed() {
        let address = ServerAddress::from_host_port("fe80::1", 3000);
        assert_eq!(address.as_str(), "http://[fe80::1]:3000/control");
        assert_eq!(address.host_port().unwrap(), ("fe80::1".to_string(), 3000));
        assert_eq!(address.socket_target().unwrap(), "[fe80::1]:3000");

        // Already bracketed hosts are not double-wrapped
        let address = ServerAddress::from_host_port("[::1]", 8080);
        assert_eq!(address.as_str(), "http://[::1]:8080/control");
    }

    #[test]
    fn hostname_address() {
        let address = ServerAddress::from_host_port("homebox.local", 4000);
        assert_eq!(address.as_str(), "http://homebox.local:4000/control");
    }

    #[test]
    fn parse_rejects_malformed() {
        assert!(ServerAddress::parse("http://10.0.0.1:3000/control").is_ok());
        assert!(ServerAddress::parse("10.0.0.1:3000").is_err());
        assert!(ServerAddress::parse("http:///control").is_err());

        let no_port = ServerAddress::parse("http://10.0.0.1/control").unwrap();
        assert!(no_port.host_port().is_err());
    }
}
