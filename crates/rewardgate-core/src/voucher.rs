//! Voucher signing.
//!
//! The on-chain verifier rebuilds the packed message
//! `recipient (20) ++ amount (uint256 BE) ++ nonce (uint256 BE)`, hashes it
//! with Keccak-256, wraps the digest in the personal-message prefix and
//! recovers the signer. Any change to the layout here breaks redemption.

use std::fmt;

use alloy_primitives::{eip191_hash_message, Address, U256};
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use zeroize::Zeroizing;

use crate::address::WalletAddress;
use crate::error::{ClaimError, ClaimResult};

pub const MESSAGE_LEN: usize = WalletAddress::LEN + 32 + 32;
pub const SIGNATURE_LEN: usize = 65;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voucher {
    pub recipient: WalletAddress,
    pub amount: u128,
    pub nonce: u64,
    pub signature: [u8; SIGNATURE_LEN],
}

impl Voucher {
    pub fn signature_hex(&self) -> String {
        format!("0x{}", hex::encode(self.signature))
    }
}

pub fn voucher_message(recipient: &WalletAddress, amount: u128, nonce: u64) -> [u8; MESSAGE_LEN] {
    let mut out = [0u8; MESSAGE_LEN];
    out[..20].copy_from_slice(recipient.as_bytes());
    out[20..52].copy_from_slice(&U256::from(amount).to_be_bytes::<32>());
    out[52..].copy_from_slice(&U256::from(nonce).to_be_bytes::<32>());
    out
}

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    alloy_primitives::keccak256(data).0
}

pub fn voucher_digest(recipient: &WalletAddress, amount: u128, nonce: u64) -> [u8; 32] {
    keccak256(&voucher_message(recipient, amount, nonce))
}

/// Hash actually signed: EIP-191 over the 32-byte digest, i.e.
/// `keccak256("\x19Ethereum Signed Message:\n32" ++ digest)`.
pub fn personal_message_hash(digest: &[u8; 32]) -> [u8; 32] {
    eip191_hash_message(digest).0
}

pub fn address_of(key: &VerifyingKey) -> WalletAddress {
    WalletAddress::from(Address::from_public_key(key))
}

pub struct VoucherSigner {
    key: SigningKey,
    address: WalletAddress,
}

impl VoucherSigner {
    /// Loads the service key from hex (with or without `0x`). Errors never
    /// include the input.
    pub fn from_hex(raw: &str) -> ClaimResult<Self> {
        let trimmed = raw.trim();
        let body = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes = Zeroizing::new(
            hex::decode(body)
                .map_err(|_| ClaimError::Configuration("signing key must be hex".to_string()))?,
        );
        if bytes.len() != 32 {
            return Err(ClaimError::Configuration(
                "signing key must decode to 32 bytes".to_string(),
            ));
        }
        let key = SigningKey::from_slice(&bytes)
            .map_err(|_| ClaimError::Configuration("signing key is not a valid scalar".to_string()))?;
        let address = address_of(key.verifying_key());
        Ok(Self { key, address })
    }

    pub fn address(&self) -> WalletAddress {
        self.address
    }

    pub fn sign(&self, recipient: WalletAddress, amount: u128, nonce: u64) -> ClaimResult<Voucher> {
        let digest = voucher_digest(&recipient, amount, nonce);
        let (signature, recovery_id) = self
            .key
            .sign_prehash_recoverable(&personal_message_hash(&digest))
            .map_err(|_| ClaimError::Configuration("voucher signing failed".to_string()))?;

        let mut out = [0u8; SIGNATURE_LEN];
        out[..64].copy_from_slice(&signature.to_bytes());
        out[64] = 27 + recovery_id.to_byte();
        Ok(Voucher {
            recipient,
            amount,
            nonce,
            signature: out,
        })
    }
}

impl fmt::Debug for VoucherSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VoucherSigner")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// Recovers the address that signed `voucher`, the same way the verifier
/// contract does.
pub fn recover_signer(voucher: &Voucher) -> ClaimResult<WalletAddress> {
    let digest = voucher_digest(&voucher.recipient, voucher.amount, voucher.nonce);
    let signature = Signature::from_slice(&voucher.signature[..64])
        .map_err(|_| ClaimError::validation("malformed signature"))?;
    let recovery_id = voucher.signature[64]
        .checked_sub(27)
        .and_then(RecoveryId::from_byte)
        .ok_or_else(|| ClaimError::validation("malformed recovery id"))?;
    let key = VerifyingKey::recover_from_prehash(
        &personal_message_hash(&digest),
        &signature,
        recovery_id,
    )
    .map_err(|_| ClaimError::validation("signature does not recover"))?;
    Ok(address_of(&key))
}
