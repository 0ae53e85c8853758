//! Loading the voucher signing key. The key never comes from the config
//! file; it is read from the environment once at startup.

use rewardgate_core::error::ClaimError;
use rewardgate_core::voucher::VoucherSigner;
use zeroize::Zeroizing;

pub const SIGNER_KEY_ENV: &str = "REWARDGATE_SIGNER_PRIVATE_KEY";
pub const LEGACY_SIGNER_KEY_ENV: &str = "SIGNER_PRIVATE_KEY";

/// Reads [`SIGNER_KEY_ENV`], falling back to [`LEGACY_SIGNER_KEY_ENV`]. An
/// empty variable counts as unset.
pub fn load_voucher_signer() -> Result<VoucherSigner, ClaimError> {
    let raw = read_key_from_env()?;
    VoucherSigner::from_hex(&raw)
}

fn read_key_from_env() -> Result<Zeroizing<String>, ClaimError> {
    [SIGNER_KEY_ENV, LEGACY_SIGNER_KEY_ENV]
        .into_iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|value| !value.trim().is_empty())
        .map(Zeroizing::new)
        .ok_or_else(|| {
            ClaimError::Configuration(format!("signing key is missing; set {SIGNER_KEY_ENV}"))
        })
}
