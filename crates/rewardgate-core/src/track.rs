//! Reward tracks: independently cadenced claim channels, loaded once at
//! startup and shared read-only.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};

use crate::address::WalletAddress;
use crate::error::{ClaimError, ClaimResult};
use crate::period::ResetTime;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RewardTrack {
    /// Fixed reward in the token's smallest unit.
    #[serde(deserialize_with = "deserialize_amount")]
    pub amount: u128,
    #[serde(default = "midnight")]
    pub reset_utc: ResetTime,
    /// Claims are refused before this instant.
    #[serde(default)]
    pub unlock_at_ms: Option<u64>,
    /// Chain this track pays out on. `None` accepts the request's chain or
    /// the daemon default.
    #[serde(default)]
    pub chain: Option<String>,
    #[serde(default)]
    pub precondition: Option<Precondition>,
    #[serde(default = "enabled")]
    pub require_ownership: bool,
}

impl RewardTrack {
    pub fn is_unlocked(&self, now_ms: u64) -> bool {
        self.unlock_at_ms.map_or(true, |at| now_ms >= at)
    }
}

/// A single `eth_call` view read that must return at least `min_value`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Precondition {
    pub contract: WalletAddress,
    #[serde(deserialize_with = "deserialize_selector")]
    pub selector: [u8; 4],
    #[serde(default = "one", deserialize_with = "deserialize_amount")]
    pub min_value: u128,
}

impl Precondition {
    /// `selector ++ leftpad32(claimant)`
    pub fn calldata(&self, claimant: &WalletAddress) -> Vec<u8> {
        let mut data = Vec::with_capacity(4 + 32);
        data.extend_from_slice(&self.selector);
        data.extend_from_slice(&[0u8; 12]);
        data.extend_from_slice(claimant.as_bytes());
        data
    }
}

#[derive(Debug, Clone)]
pub struct TrackTable {
    tracks: BTreeMap<String, RewardTrack>,
    default_track: String,
}

impl TrackTable {
    pub fn new(tracks: BTreeMap<String, RewardTrack>, default_track: String) -> ClaimResult<Self> {
        if !tracks.contains_key(&default_track) {
            return Err(ClaimError::Configuration(format!(
                "default track {default_track:?} is not configured"
            )));
        }
        for (id, track) in &tracks {
            if id.is_empty() || !id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_') {
                return Err(ClaimError::Configuration(format!(
                    "track id {id:?} must be non-empty [A-Za-z0-9_-]"
                )));
            }
            if track.amount == 0 {
                return Err(ClaimError::Configuration(format!(
                    "track {id:?} has a zero reward amount"
                )));
            }
        }
        Ok(Self {
            tracks,
            default_track,
        })
    }

    pub fn resolve<'a>(&'a self, requested: Option<&'a str>) -> ClaimResult<(&'a str, &'a RewardTrack)> {
        let id = requested.unwrap_or(&self.default_track);
        self.tracks
            .get_key_value(id)
            .map(|(id, track)| (id.as_str(), track))
            .ok_or_else(|| ClaimError::validation("unknown track"))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RewardTrack)> {
        self.tracks.iter().map(|(id, track)| (id.as_str(), track))
    }
}

fn midnight() -> ResetTime {
    ResetTime::MIDNIGHT
}

fn enabled() -> bool {
    true
}

fn one() -> u128 {
    1
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AmountRepr {
    Decimal(String),
    Number(u64),
}

fn deserialize_amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
    match AmountRepr::deserialize(deserializer)? {
        AmountRepr::Number(n) => Ok(u128::from(n)),
        AmountRepr::Decimal(s) => {
            if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
                return Err(serde::de::Error::custom("amount must be a decimal integer"));
            }
            s.parse::<u128>().map_err(serde::de::Error::custom)
        }
    }
}

fn deserialize_selector<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 4], D::Error> {
    let raw = String::deserialize(deserializer)?;
    let body = raw.strip_prefix("0x").unwrap_or(&raw);
    let mut out = [0u8; 4];
    hex::decode_to_slice(body, &mut out)
        .map_err(|_| serde::de::Error::custom("selector must be 4 hex bytes"))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(json: &str, default_track: &str) -> ClaimResult<TrackTable> {
        let tracks: BTreeMap<String, RewardTrack> = serde_json::from_str(json).unwrap();
        TrackTable::new(tracks, default_track.to_string())
    }

    #[test]
    fn parses_amounts_beyond_u64() {
        let t = table(
            r#"{"daily":{"amount":"100000000000000000000","reset_utc":"08:20"}}"#,
            "daily",
        )
        .unwrap();
        let (id, track) = t.resolve(None).unwrap();
        assert_eq!(id, "daily");
        assert_eq!(track.amount, 100_000_000_000_000_000_000u128);
        assert_eq!(track.reset_utc.to_string(), "08:20");
        assert!(track.require_ownership);
    }

    #[test]
    fn unknown_track_is_a_validation_error() {
        let t = table(r#"{"daily":{"amount":10}}"#, "daily").unwrap();
        assert!(matches!(t.resolve(Some("weekly")), Err(ClaimError::Validation(_))));
    }

    #[test]
    fn missing_default_track_is_a_configuration_error() {
        let err = table(r#"{"daily":{"amount":10}}"#, "bonus").unwrap_err();
        assert!(matches!(err, ClaimError::Configuration(_)));
    }

    #[test]
    fn zero_amount_is_rejected() {
        let err = table(r#"{"daily":{"amount":"0"}}"#, "daily").unwrap_err();
        assert!(matches!(err, ClaimError::Configuration(_)));
    }

    #[test]
    fn unlock_threshold_gates_by_time() {
        let t = table(r#"{"bonus":{"amount":5,"unlock_at_ms":1000}}"#, "bonus").unwrap();
        let (_, track) = t.resolve(Some("bonus")).unwrap();
        assert!(!track.is_unlocked(999));
        assert!(track.is_unlocked(1000));
    }

    #[test]
    fn precondition_calldata_pads_claimant() {
        let t = table(
            r#"{"base":{"amount":5,"precondition":{"contract":"0x00000000000000000000000000000000000000aa","selector":"0x70a08231"}}}"#,
            "base",
        )
        .unwrap();
        let (_, track) = t.resolve(None).unwrap();
        let pre = track.precondition.as_ref().unwrap();
        assert_eq!(pre.min_value, 1);
        let claimant = WalletAddress::from_bytes([0x11; 20]);
        let data = pre.calldata(&claimant);
        assert_eq!(&data[..4], &[0x70, 0xa0, 0x82, 0x31]);
        assert_eq!(&data[4..16], &[0u8; 12]);
        assert_eq!(&data[16..], &[0x11; 20]);
    }
}
