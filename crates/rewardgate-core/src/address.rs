//! Wallet addresses and claim identities.
//!
//! Every lookup and storage key goes through [`WalletAddress`], which only
//! exists in its canonical form: 20 raw bytes rendered as lowercase `0x` hex.
//! Two inputs that differ only in letter case therefore produce the same
//! identity.

use std::fmt;
use std::str::FromStr;

use alloy_primitives::Address;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ClaimError, ClaimResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WalletAddress(Address);

impl WalletAddress {
    pub const LEN: usize = 20;

    /// Accepts `0x`/`0X` plus 40 hex digits in any case. Checksums are not
    /// enforced; case carries no meaning once parsed.
    pub fn parse(raw: &str) -> ClaimResult<Self> {
        let Some(body) = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) else {
            return Err(ClaimError::validation("address must start with 0x"));
        };
        if body.len() != Self::LEN * 2 {
            return Err(ClaimError::validation("address must be 20 bytes"));
        }
        Address::from_str(body)
            .map(Self)
            .map_err(|_| ClaimError::validation("address must be hex"))
    }

    pub const fn from_bytes(bytes: [u8; Self::LEN]) -> Self {
        Self(Address::new(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; Self::LEN] {
        &self.0 .0 .0
    }

    pub fn as_address(&self) -> Address {
        self.0
    }

    pub fn normalized(&self) -> String {
        format!("{:#x}", self.0)
    }
}

impl From<Address> for WalletAddress {
    fn from(addr: Address) -> Self {
        Self(addr)
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.normalized())
    }
}

impl FromStr for WalletAddress {
    type Err = ClaimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for WalletAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for WalletAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Canonical string form of `raw`. Idempotent on its own output.
pub fn normalize_address(raw: &str) -> ClaimResult<String> {
    WalletAddress::parse(raw).map(|addr| addr.normalized())
}

/// The party a claim is made for: a wallet plus the social account that
/// says it owns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimIdentity {
    pub address: WalletAddress,
    pub account_id: Option<u64>,
}

impl ClaimIdentity {
    pub fn new(address: WalletAddress, account_id: Option<u64>) -> Self {
        Self {
            address,
            account_id,
        }
    }

    /// Key used for claim records and locks. An account claims once per
    /// period no matter how many wallets it has linked.
    pub fn storage_key(&self) -> String {
        match self.account_id {
            Some(id) => format!("acct:{id}"),
            None => format!("addr:{}", self.address.normalized()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn mixed_case_addresses_are_one_identity() {
        let lower = WalletAddress::parse("0xabcdef0123456789abcdef0123456789abcdef01").unwrap();
        let upper = WalletAddress::parse("0XABCDEF0123456789ABCDEF0123456789ABCDEF01").unwrap();
        assert_eq!(lower, upper);
        assert_eq!(
            ClaimIdentity::new(lower, None).storage_key(),
            ClaimIdentity::new(upper, None).storage_key()
        );
    }

    #[test]
    fn rejects_malformed_addresses() {
        for raw in [
            "",
            "0x",
            "abcdef0123456789abcdef0123456789abcdef01",
            "0xabcdef0123456789abcdef0123456789abcdef0",
            "0xabcdef0123456789abcdef0123456789abcdef0g",
            " 0xabcdef0123456789abcdef0123456789abcdef01",
        ] {
            assert!(WalletAddress::parse(raw).is_err(), "{raw:?} should not parse");
        }
    }

    #[test]
    fn account_id_takes_precedence_in_storage_key() {
        let addr = WalletAddress::from_bytes([7u8; 20]);
        assert_eq!(ClaimIdentity::new(addr, Some(42)).storage_key(), "acct:42");
        assert_eq!(
            ClaimIdentity::new(addr, None).storage_key(),
            format!("addr:0x{}", "07".repeat(20))
        );
    }

    #[test]
    fn checksummed_input_normalizes_to_lowercase() {
        let addr = WalletAddress::parse("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed").unwrap();
        assert_eq!(addr.normalized(), "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed");
        assert_eq!(addr.as_address().to_checksum(None), "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed");
        assert_eq!(WalletAddress::from(Address::repeat_byte(7)).as_bytes(), &[7u8; 20]);
    }

    #[test]
    fn serde_uses_normalized_form() {
        let addr: WalletAddress =
            serde_json::from_str("\"0xABCDEF0123456789abcdef0123456789ABCDEF01\"").unwrap();
        assert_eq!(
            serde_json::to_string(&addr).unwrap(),
            "\"0xabcdef0123456789abcdef0123456789abcdef01\""
        );
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(bytes in proptest::array::uniform20(any::<u8>()), upper in any::<bool>()) {
            let hex_body = hex::encode(bytes);
            let raw = if upper { format!("0x{}", hex_body.to_ascii_uppercase()) } else { format!("0x{hex_body}") };
            let once = normalize_address(&raw).unwrap();
            let twice = normalize_address(&once).unwrap();
            prop_assert_eq!(&once, &twice);
            prop_assert_eq!(once, format!("0x{hex_body}"));
        }
    }
}
