// SPDX-License-Identifier: Apache-2.0
//! A validated, locally-administered MAC address.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Bit 1 of the first octet: set for locally-administered addresses.
const LOCALLY_ADMINISTERED_BIT: u8 = 0b0000_0010;

/// A 6-byte MAC address with the locally-administered bit set, as required
/// for synthesised node identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "[u8; 6]", into = "[u8; 6]")]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    /// Validate and construct a MAC address.
    ///
    /// # Errors
    /// Returns [`ConfigError::Validation`] if the locally-administered bit
    /// (bit 1 of the first octet) is not set.
    pub fn new(bytes: [u8; 6]) -> Result<Self, ConfigError> {
        if bytes[0] & LOCALLY_ADMINISTERED_BIT == 0 {
            return Err(ConfigError::Validation(format!(
                "mac address {bytes:02x?} is missing the locally-administered bit"
            )));
        }
        Ok(Self(bytes))
    }

    /// The raw 6 bytes.
    #[must_use]
    pub fn as_bytes(&self) -> [u8; 6] {
        self.0
    }

    /// Colon-separated lowercase hex representation.
    #[must_use]
    pub fn to_hex_string(self) -> String {
        self.0
            .iter()
            .map(|byte| format!("{byte:02x}"))
            .collect::<Vec<_>>()
            .join(":")
    }
}

impl TryFrom<[u8; 6]> for MacAddress {
    type Error = ConfigError;

    fn try_from(bytes: [u8; 6]) -> Result<Self, Self::Error> {
        Self::new(bytes)
    }
}

impl From<MacAddress> for [u8; 6] {
    fn from(mac: MacAddress) -> Self {
        mac.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn rejects_globally_administered_bytes() {
        assert!(MacAddress::new([0x00, 0, 0, 0, 0, 1]).is_err());
    }

    #[test]
    fn accepts_locally_administered_bytes() {
        let mac = MacAddress::new([0x02, 0, 0, 0, 0, 1]).unwrap();
        assert_eq!(mac.to_hex_string(), "02:00:00:00:00:01");
    }
}
