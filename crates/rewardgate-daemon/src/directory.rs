//! Identity directory client and the wallet-ownership check.
//!
//! Ownership is a security boundary: any failure to reach or understand the
//! directory counts as "not owned".

use async_trait::async_trait;
use rewardgate_core::address::WalletAddress;
use rewardgate_core::error::{ClaimError, ClaimResult, Rejection};
use serde::Deserialize;

use crate::upstream::{http_client, trim_base_url, UpstreamError};

const SERVICE: &str = "directory";

/// One page of verified (secondary) wallet links for an account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationPage {
    pub addresses: Vec<String>,
    pub next_page_token: Option<String>,
}

#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    async fn verifications(
        &self,
        account_id: u64,
        page_token: Option<&str>,
    ) -> Result<VerificationPage, UpstreamError>;

    async fn custody_address(&self, account_id: u64) -> Result<Option<String>, UpstreamError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnershipLink {
    Verification { page: usize },
    Custody,
}

/// Proves `claimed` belongs to `account_id`: walks every verification page
/// until a match or the last page, then falls back to the custody address.
pub async fn verify_ownership(
    directory: &dyn IdentityDirectory,
    account_id: u64,
    claimed: &WalletAddress,
    max_pages: usize,
) -> ClaimResult<OwnershipLink> {
    match find_link(directory, account_id, claimed, max_pages).await {
        Ok(Some(link)) => Ok(link),
        Ok(None) => Err(ClaimError::rejected(
            Rejection::OwnershipUnverified,
            "wallet is not linked to account",
        )),
        Err(err) => {
            tracing::warn!(account_id, address = %claimed, error = %err, "ownership check failed closed");
            Err(ClaimError::rejected(
                Rejection::OwnershipUnverified,
                "directory unavailable",
            ))
        }
    }
}

async fn find_link(
    directory: &dyn IdentityDirectory,
    account_id: u64,
    claimed: &WalletAddress,
    max_pages: usize,
) -> Result<Option<OwnershipLink>, UpstreamError> {
    let mut token: Option<String> = None;
    let mut page = 0usize;
    loop {
        if page >= max_pages {
            return Err(UpstreamError::malformed(
                SERVICE,
                format!("verification pages exceeded {max_pages}"),
            ));
        }
        let batch = directory.verifications(account_id, token.as_deref()).await?;
        if batch.addresses.iter().any(|raw| same_wallet(raw, claimed)) {
            return Ok(Some(OwnershipLink::Verification { page }));
        }
        page += 1;
        match batch.next_page_token.filter(|t| !t.is_empty()) {
            Some(next) => token = Some(next),
            None => break,
        }
    }

    let custody = directory.custody_address(account_id).await?;
    if custody.as_deref().is_some_and(|raw| same_wallet(raw, claimed)) {
        return Ok(Some(OwnershipLink::Custody));
    }
    Ok(None)
}

fn same_wallet(raw: &str, claimed: &WalletAddress) -> bool {
    WalletAddress::parse(raw).is_ok_and(|addr| &addr == claimed)
}

/// Farcaster hub HTTP API.
#[derive(Debug, Clone)]
pub struct HubDirectoryClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerificationsResponse {
    #[serde(default)]
    messages: Vec<HubMessage>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HubMessage {
    #[serde(default)]
    data: Option<HubMessageData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HubMessageData {
    #[serde(default, alias = "verificationAddEthAddressBody")]
    verification_add_address_body: Option<VerificationBody>,
}

#[derive(Debug, Deserialize)]
struct VerificationBody {
    address: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdRegistryEventResponse {
    #[serde(default)]
    id_register_event_body: Option<IdRegisterBody>,
}

#[derive(Debug, Deserialize)]
struct IdRegisterBody {
    to: String,
}

impl HubDirectoryClient {
    pub fn new(base_url: &str, timeout_ms: u64) -> Result<Self, UpstreamError> {
        Ok(Self {
            http: http_client(timeout_ms).map_err(UpstreamError::transport(SERVICE))?,
            base_url: trim_base_url(base_url),
        })
    }
}

#[async_trait]
impl IdentityDirectory for HubDirectoryClient {
    async fn verifications(
        &self,
        account_id: u64,
        page_token: Option<&str>,
    ) -> Result<VerificationPage, UpstreamError> {
        let mut query = vec![("fid", account_id.to_string())];
        if let Some(token) = page_token {
            query.push(("pageToken", token.to_string()));
        }
        let body: VerificationsResponse = self
            .http
            .get(format!("{}/v1/verificationsByFid", self.base_url))
            .query(&query)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(UpstreamError::transport(SERVICE))?
            .json()
            .await
            .map_err(UpstreamError::transport(SERVICE))?;

        Ok(VerificationPage {
            addresses: body
                .messages
                .into_iter()
                .filter_map(|m| m.data?.verification_add_address_body)
                .map(|b| b.address)
                .collect(),
            next_page_token: body.next_page_token,
        })
    }

    async fn custody_address(&self, account_id: u64) -> Result<Option<String>, UpstreamError> {
        let body: IdRegistryEventResponse = self
            .http
            .get(format!("{}/v1/onChainIdRegistryEventByFid", self.base_url))
            .query(&[("fid", account_id.to_string())])
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(UpstreamError::transport(SERVICE))?
            .json()
            .await
            .map_err(UpstreamError::transport(SERVICE))?;
        Ok(body.id_register_event_body.map(|b| b.to))
    }
}
