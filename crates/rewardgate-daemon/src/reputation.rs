use async_trait::async_trait;
use rewardgate_core::address::WalletAddress;
use rewardgate_core::error::{ClaimError, ClaimResult, Rejection};
use serde::Deserialize;

use crate::config::ReputationConfig;
use crate::upstream::{http_client, trim_base_url, UpstreamError};

const SERVICE: &str = "reputation";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReputationReport {
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub follower_count: Option<u64>,
    #[serde(default)]
    pub active_days: Option<u64>,
}

#[async_trait]
pub trait ReputationService: Send + Sync {
    async fn lookup(
        &self,
        account_id: Option<u64>,
        address: &WalletAddress,
    ) -> Result<ReputationReport, UpstreamError>;
}

/// Minimums a claimant must meet. A dimension without a minimum is not
/// checked; a dimension with one must be present in the report.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EligibilityPolicy {
    pub min_score: Option<f64>,
    pub min_followers: Option<u64>,
    pub min_active_days: Option<u64>,
}

impl EligibilityPolicy {
    pub fn from_config(cfg: &ReputationConfig) -> Self {
        Self {
            min_score: cfg.min_score,
            min_followers: cfg.min_followers,
            min_active_days: cfg.min_active_days,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min_score.is_none() && self.min_followers.is_none() && self.min_active_days.is_none()
    }

    pub fn evaluate(&self, report: &ReputationReport) -> ClaimResult<()> {
        if let Some(min) = self.min_score {
            match report.score {
                Some(score) if score >= min => {}
                Some(score) => return Err(ineligible(format!("score {score} below minimum {min}"))),
                None => return Err(ineligible(format!("score missing; minimum {min}"))),
            }
        }
        if let Some(min) = self.min_followers {
            check_count("follower count", report.follower_count, min)?;
        }
        if let Some(min) = self.min_active_days {
            check_count("active days", report.active_days, min)?;
        }
        Ok(())
    }
}

fn check_count(label: &str, actual: Option<u64>, min: u64) -> ClaimResult<()> {
    match actual {
        Some(v) if v >= min => Ok(()),
        Some(v) => Err(ineligible(format!("{label} {v} below minimum {min}"))),
        None => Err(ineligible(format!("{label} missing; minimum {min}"))),
    }
}

fn ineligible(detail: String) -> ClaimError {
    ClaimError::rejected(Rejection::Ineligible, detail)
}

#[derive(Debug, Clone)]
pub struct HttpReputationClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpReputationClient {
    pub fn new(base_url: &str, timeout_ms: u64) -> Result<Self, UpstreamError> {
        Ok(Self {
            http: http_client(timeout_ms).map_err(UpstreamError::transport(SERVICE))?,
            base_url: trim_base_url(base_url),
        })
    }
}

#[async_trait]
impl ReputationService for HttpReputationClient {
    async fn lookup(
        &self,
        account_id: Option<u64>,
        address: &WalletAddress,
    ) -> Result<ReputationReport, UpstreamError> {
        let mut query = vec![("address", address.normalized())];
        if let Some(id) = account_id {
            query.push(("fid", id.to_string()));
        }
        let report: ReputationReport = self
            .http
            .get(format!("{}/v1/reputation", self.base_url))
            .query(&query)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(UpstreamError::transport(SERVICE))?
            .json()
            .await
            .map_err(UpstreamError::transport(SERVICE))?;
        if report.score.is_some_and(|s| !s.is_finite()) {
            return Err(UpstreamError::malformed(SERVICE, "non-finite score"));
        }
        Ok(report)
    }
}
