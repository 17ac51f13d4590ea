use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use crate::error::TransportError;

/// Default telnet control port of the receiver.
pub const DEFAULT_PORT: u16 = 23;

/// Network address of a receiver: an IP address and a TCP port.
///
/// Host names are rejected; receivers are addressed by IP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceAddress {
    pub ip: IpAddr,
    pub port: u16,
}

impl DeviceAddress {
    /// Address on the default control port.
    pub fn new(ip: IpAddr) -> Self {
        Self {
            ip,
            port: DEFAULT_PORT,
        }
    }

    /// Override the port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Socket address used for connecting.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.port)
    }
}

impl From<SocketAddr> for DeviceAddress {
    fn from(addr: SocketAddr) -> Self {
        Self {
            ip: addr.ip(),
            port: addr.port(),
        }
    }
}

impl FromStr for DeviceAddress {
    type Err = TransportError;

    /// Accepts `ip`, `ip:port` and `[ipv6]:port`.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        if let Ok(addr) = trimmed.parse::<SocketAddr>() {
            return Ok(addr.into());
        }
        if let Ok(ip) = trimmed.parse::<IpAddr>() {
            return Ok(Self::new(ip));
        }

        let invalid = |reason: &str| TransportError::InvalidAddress {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        match trimmed.rsplit_once(':') {
            Some((host, port)) => {
                port.parse::<u16>()
                    .map_err(|_| invalid("port must be an integer between 0 and 65535"))?;
                if host.parse::<IpAddr>().is_err() {
                    return Err(invalid("host is not an IP address"));
                }
                Err(invalid("malformed address"))
            }
            None => Err(invalid("host is not an IP address")),
        }
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.socket_addr().fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;

    #[test]
    fn parses_bare_ip_with_default_port() {
        let addr: DeviceAddress = "192.168.0.28".parse().unwrap();
        assert_eq!(addr.ip, IpAddr::V4(Ipv4Addr::new(192, 168, 0, 28)));
        assert_eq!(addr.port, DEFAULT_PORT);
    }

    #[test]
    fn parses_ip_and_port() {
        let addr: DeviceAddress = "10.0.0.5:2323".parse().unwrap();
        assert_eq!(addr.port, 2323);
        assert_eq!(addr.to_string(), "10.0.0.5:2323");
    }

    #[test]
    fn parses_ipv6_forms() {
        let bare: DeviceAddress = "::1".parse().unwrap();
        assert_eq!(bare.port, DEFAULT_PORT);
        let bracketed: DeviceAddress = "[::1]:4000".parse().unwrap();
        assert_eq!(bracketed.port, 4000);
    }

    #[test]
    fn rejects_host_names() {
        let err = "receiver.local".parse::<DeviceAddress>().unwrap_err();
        assert!(matches!(err, TransportError::InvalidAddress { .. }));
        let err = "receiver.local:23".parse::<DeviceAddress>().unwrap_err();
        assert!(err.to_string().contains("not an IP address"));
    }

    #[test]
    fn rejects_non_numeric_port() {
        let err = "192.168.0.28:telnet".parse::<DeviceAddress>().unwrap_err();
        assert!(err.to_string().contains("port must be an integer"));
    }
}
