//! Reservation record types
//!
//! A [`Reservation`] is one static binding of a hardware address and an
//! identifier to an IPv4 address. The identifier is opaque but stable per
//! physical node (typically a Raspberry Pi serial number) and doubles as the
//! directory name for the node's boot trees, so it is validated path-safe at
//! construction.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A 6-octet link-layer address in canonical lowercase colon-separated form.
///
/// Parsing accepts any case and normalizes; equality is on the raw octets,
/// so `AA:BB:..` and `aa:bb:..` compare equal by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HardwareAddr([u8; 6]);

impl HardwareAddr {
    /// The raw octets
    pub fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl FromStr for HardwareAddr {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut octets = [0u8; 6];
        let mut groups = 0;
        for part in s.split(':') {
            if groups == 6 {
                return Err(Error::validation(format!("malformed hardware address: {s}")));
            }
            if part.len() != 2 {
                return Err(Error::validation(format!("malformed hardware address: {s}")));
            }
            octets[groups] = u8::from_str_radix(part, 16)
                .map_err(|_| Error::validation(format!("malformed hardware address: {s}")))?;
            groups += 1;
        }
        if groups != 6 {
            return Err(Error::validation(format!("malformed hardware address: {s}")));
        }
        Ok(Self(octets))
    }
}

impl fmt::Display for HardwareAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let o = self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            o[0], o[1], o[2], o[3], o[4], o[5]
        )
    }
}

impl TryFrom<String> for HardwareAddr {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<HardwareAddr> for String {
    fn from(addr: HardwareAddr) -> Self {
        addr.to_string()
    }
}

/// One static address binding held by the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    /// Opaque stable identifier, unique within the registry
    pub identifier: String,

    /// Link-layer address, unique within the registry
    pub hardware_address: HardwareAddr,

    /// Assigned IPv4 address
    pub address: Ipv4Addr,

    /// Human label; defaults to the identifier
    pub display_name: String,
}

impl Reservation {
    /// Create a reservation with the display name defaulted to the identifier
    pub fn new(
        identifier: impl Into<String>,
        hardware_address: HardwareAddr,
        address: Ipv4Addr,
    ) -> Result<Self> {
        let identifier = identifier.into();
        validate_identifier(&identifier)?;
        Ok(Self {
            display_name: identifier.clone(),
            identifier,
            hardware_address,
            address,
        })
    }
}

/// Check that an identifier is usable both as a registry key and as a path
/// component under the TFTP/NFS roots.
pub fn validate_identifier(identifier: &str) -> Result<()> {
    if identifier.is_empty() {
        return Err(Error::validation("identifier must not be empty"));
    }
    if identifier == "." || identifier == ".." {
        return Err(Error::validation(format!(
            "identifier must not be a relative path component: {identifier:?}"
        )));
    }
    if identifier
        .chars()
        .any(|c| c.is_whitespace() || c == '/' || c == '\\' || c == ',')
    {
        return Err(Error::validation(format!(
            "identifier must not contain whitespace, commas, or path separators: {identifier:?}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_normalizes_case() {
        let upper: HardwareAddr = "AA:BB:CC:DD:EE:FF".parse().unwrap();
        let lower: HardwareAddr = "aa:bb:cc:dd:ee:ff".parse().unwrap();
        assert_eq!(upper, lower);
        assert_eq!(upper.to_string(), "aa:bb:cc:dd:ee:ff");
    }

    #[test]
    fn rejects_malformed_addresses() {
        for bad in [
            "",
            "aa:bb:cc:dd:ee",
            "aa:bb:cc:dd:ee:ff:00",
            "aa:bb:cc:dd:ee:fg",
            "aabb:cc:dd:ee:ff",
            "aa-bb-cc-dd-ee-ff",
        ] {
            assert!(bad.parse::<HardwareAddr>().is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn serde_round_trips_as_string() {
        let addr: HardwareAddr = "88:A2:9E:1B:E3:AC".parse().unwrap();
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"88:a2:9e:1b:e3:ac\"");
        let back: HardwareAddr = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }

    #[test]
    fn display_name_defaults_to_identifier() {
        let r = Reservation::new(
            "d3a76dcf",
            "88:a2:9e:1b:e3:ac".parse().unwrap(),
            Ipv4Addr::new(192, 168, 0, 101),
        )
        .unwrap();
        assert_eq!(r.display_name, "d3a76dcf");
    }

    #[test]
    fn rejects_path_hostile_identifiers() {
        for bad in ["", "..", ".", "a/b", "a b", "a,b"] {
            assert!(validate_identifier(bad).is_err(), "accepted {bad:?}");
        }
        validate_identifier("rpi4-1a2b3c4d").unwrap();
    }
}
