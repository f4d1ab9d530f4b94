use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use serde::{Deserialize, Serialize};

/// Canonical form of an endpoint address.
///
/// IPv4-mapped IPv6 addresses (`::ffff:a.b.c.d`) are folded into their IPv4
/// form, so two textual spellings of the same host always compare equal.
/// Ordering is total: every IPv4 address sorts before every IPv6 address,
/// and addresses of the same family sort numerically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "IpAddr", into = "IpAddr")]
pub struct Address(IpAddr);

/// Returned when text does not parse as an IP address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressError {
    input: String,
}

impl fmt::Display for AddressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid address: {}", self.input)
    }
}

impl std::error::Error for AddressError {}

impl Address {
    /// Normalize a resolved IP address.
    pub fn from_ip(ip: IpAddr) -> Self {
        Self(ip.to_canonical())
    }

    pub fn ip(&self) -> IpAddr {
        self.0
    }
}

impl From<IpAddr> for Address {
    fn from(ip: IpAddr) -> Self {
        Self::from_ip(ip)
    }
}

impl From<Address> for IpAddr {
    fn from(addr: Address) -> Self {
        addr.0
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ip: IpAddr = s.parse().map_err(|_| AddressError { input: s.to_string() })?;
        Ok(Self::from_ip(ip))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn test_mapped_and_plain_forms_are_equal() {
        let plain: Address = "10.1.2.3".parse().unwrap();
        let mapped: Address = "::ffff:10.1.2.3".parse().unwrap();

        assert_eq!(plain, mapped);
        assert_eq!(mapped.ip(), IpAddr::V4(Ipv4Addr::new(10, 1, 2, 3)));
        assert_eq!(mapped.to_string(), "10.1.2.3");
    }

    #[test]
    fn test_ordering_puts_ipv4_first() {
        let mut addrs: Vec<Address> = ["fd00::1", "10.0.0.2", "10.0.0.10", "::1", "9.255.255.255"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        addrs.sort();

        let rendered: Vec<String> = addrs.iter().map(|a| a.to_string()).collect();
        assert_eq!(
            rendered,
            vec!["9.255.255.255", "10.0.0.2", "10.0.0.10", "::1", "fd00::1"]
        );
    }

    #[test]
    fn test_unspecified_is_an_ordinary_address() {
        let v4 = Address::from_ip(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert_eq!(v4.to_string(), "0.0.0.0");
        assert_eq!("::ffff:0.0.0.0".parse::<Address>().unwrap(), v4);

        let v6 = Address::from_ip(IpAddr::V6(Ipv6Addr::UNSPECIFIED));
        assert_eq!(v6.to_string(), "::");
        assert!(v4 < v6);
    }

    #[test]
    fn test_parse_failure() {
        let err = "not-an-ip".parse::<Address>().unwrap_err();
        assert_eq!(err.to_string(), "invalid address: not-an-ip");
        assert!("10.0.0".parse::<Address>().is_err());
        assert!(serde_json::from_str::<Address>("\"10.0.0.256\"").is_err());
    }

    #[test]
    fn test_serde_uses_canonical_text() {
        let addr: Address = "::ffff:192.168.0.7".parse().unwrap();
        assert_eq!(serde_json::to_string(&addr).unwrap(), "\"192.168.0.7\"");

        let back: Address = serde_json::from_str("\"::ffff:192.168.0.7\"").unwrap();
        assert_eq!(back, addr);
    }
}
