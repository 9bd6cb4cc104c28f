//! Device identity stamped into every capture file header.

use std::fmt;
use std::str::FromStr;

/// A 48-bit IEEE MAC address.
///
/// # Example
///
/// ```
/// use csi_sniffer::MacAddress;
///
/// let mac: MacAddress = "24:0a:c4:00:11:22".parse().unwrap();
/// assert_eq!(mac.octets()[0], 0x24);
/// assert_eq!(mac.to_string(), "24:0a:c4:00:11:22");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    /// The all-zero address, used when an identity was never obtained.
    pub const UNSPECIFIED: Self = Self([0; 6]);

    /// Creates an address from its six octets.
    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    /// Returns the raw octets.
    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl From<[u8; 6]> for MacAddress {
    fn from(octets: [u8; 6]) -> Self {
        Self(octets)
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

/// Error returned when parsing a textual MAC address fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid MAC address: {input}")]
pub struct ParseMacError {
    input: String,
}

impl FromStr for MacAddress {
    type Err = ParseMacError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseMacError {
            input: s.to_string(),
        };

        let mut octets = [0u8; 6];
        let mut parts = s.split([':', '-']);
        for octet in &mut octets {
            let part = parts.next().ok_or_else(err)?;
            if part.len() != 2 {
                return Err(err());
            }
            *octet = u8::from_str_radix(part, 16).map_err(|_| err())?;
        }
        if parts.next().is_some() {
            return Err(err());
        }

        Ok(Self(octets))
    }
}

/// Hardware identity of the capturing device.
///
/// Supplied once by the management phase before the pipeline starts and
/// treated as read-only afterwards. Both addresses are copied into each
/// [`FileHeader`](crate::FileHeader) when a capture file is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceIdentity {
    /// Station MAC of the WiFi interface.
    pub wifi_mac: MacAddress,
    /// Public address of the Bluetooth controller.
    pub bt_mac: MacAddress,
}

impl DeviceIdentity {
    /// Creates an identity from the two interface addresses.
    pub fn new(wifi_mac: impl Into<MacAddress>, bt_mac: impl Into<MacAddress>) -> Self {
        Self {
            wifi_mac: wifi_mac.into(),
            bt_mac: bt_mac.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mac_display_is_lowercase_colon_separated() {
        let mac = MacAddress::new([0xAA, 0xBB, 0x0C, 0x01, 0x02, 0xFF]);
        assert_eq!(mac.to_string(), "aa:bb:0c:01:02:ff");
    }

    #[test]
    fn test_mac_parse_accepts_dashes() {
        let mac: MacAddress = "aa-bb-cc-dd-ee-ff".parse().unwrap();
        assert_eq!(mac.octets(), [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
    }

    #[test]
    fn test_mac_parse_rejects_wrong_length() {
        assert!("aa:bb:cc:dd:ee".parse::<MacAddress>().is_err());
        assert!("aa:bb:cc:dd:ee:ff:00".parse::<MacAddress>().is_err());
        assert!("aaa:bb:cc:dd:ee:ff".parse::<MacAddress>().is_err());
        assert!("zz:bb:cc:dd:ee:ff".parse::<MacAddress>().is_err());
    }

    #[test]
    fn test_identity_default_is_unspecified() {
        let identity = DeviceIdentity::default();
        assert_eq!(identity.wifi_mac, MacAddress::UNSPECIFIED);
        assert_eq!(identity.bt_mac, MacAddress::UNSPECIFIED);
    }
}
