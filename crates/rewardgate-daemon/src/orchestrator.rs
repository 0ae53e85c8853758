//! The claim pipeline. Checks run strictly in order, cheapest first, and
//! stop at the first failure; nothing is written until a voucher is issued.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use rewardgate_core::address::{ClaimIdentity, WalletAddress};
use rewardgate_core::error::{ClaimError, ClaimResult, Contention, Rejection};
use rewardgate_core::track::{RewardTrack, TrackTable};
use rewardgate_core::voucher::{Voucher, VoucherSigner};

use crate::chain::{first_word_at_least, ChainInspector, ChainRegistry};
use crate::clock::{Clock, SystemClock};
use crate::config::{DaemonConfig, DenylistConfig};
use crate::directory::{verify_ownership, HubDirectoryClient, IdentityDirectory};
use crate::ledger::{AuditEntry, ClaimLedger};
use crate::reputation::{EligibilityPolicy, HttpReputationClient, ReputationService};
use crate::store::ClaimStore;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClaimRequest {
    pub address: String,
    pub account_id: Option<u64>,
    pub track: Option<String>,
    pub chain: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Denylist {
    addresses: HashSet<WalletAddress>,
    accounts: HashSet<u64>,
}

impl Denylist {
    pub fn from_config(cfg: &DenylistConfig) -> Self {
        Self {
            addresses: cfg.addresses.iter().copied().collect(),
            accounts: cfg.accounts.iter().copied().collect(),
        }
    }

    pub fn blocks(&self, identity: &ClaimIdentity) -> bool {
        self.addresses.contains(&identity.address)
            || identity
                .account_id
                .is_some_and(|id| self.accounts.contains(&id))
    }
}

pub struct ClaimOrchestrator {
    pub tracks: Arc<TrackTable>,
    pub chains: ChainRegistry,
    pub denylist: Denylist,
    pub directory: Arc<dyn IdentityDirectory>,
    pub max_directory_pages: usize,
    pub reputation: Option<Arc<dyn ReputationService>>,
    pub eligibility: EligibilityPolicy,
    pub ledger: ClaimLedger,
    pub signer: Arc<VoucherSigner>,
    pub clock: Arc<dyn Clock>,
}

impl ClaimOrchestrator {
    /// Wires the HTTP collaborators described by `cfg`. The store and signer
    /// are resolved by the caller since both need secrets or a connection.
    pub fn from_config(
        cfg: &DaemonConfig,
        store: Arc<dyn ClaimStore>,
        signer: Arc<VoucherSigner>,
    ) -> anyhow::Result<Self> {
        let directory = HubDirectoryClient::new(&cfg.directory.base_url, cfg.directory.timeout_ms)?;
        let (reputation, eligibility) = match &cfg.reputation {
            Some(rep) => {
                let client: Arc<dyn ReputationService> =
                    Arc::new(HttpReputationClient::new(&rep.base_url, rep.timeout_ms)?);
                (Some(client), EligibilityPolicy::from_config(rep))
            }
            None => (None, EligibilityPolicy::default()),
        };
        Ok(Self {
            tracks: Arc::new(cfg.track_table()?),
            chains: ChainRegistry::from_config(&cfg.chains, &cfg.default_chain)?,
            denylist: Denylist::from_config(&cfg.denylist),
            directory: Arc::new(directory),
            max_directory_pages: cfg.directory.max_pages,
            reputation,
            eligibility,
            ledger: ClaimLedger::new(store, Duration::from_millis(cfg.lock_ttl_ms), cfg.audit_cap),
            signer,
            clock: Arc::new(SystemClock),
        })
    }

    pub async fn process(&self, req: &ClaimRequest) -> ClaimResult<Voucher> {
        let outcome = self.authorize_and_issue(req).await;
        match &outcome {
            Ok(voucher) => tracing::info!(
                address = %voucher.recipient,
                account_id = ?req.account_id,
                track = ?req.track,
                nonce = voucher.nonce,
                "claim approved"
            ),
            Err(err @ (ClaimError::Upstream(_) | ClaimError::Configuration(_))) => tracing::error!(
                address = %req.address,
                account_id = ?req.account_id,
                track = ?req.track,
                error = %err,
                "claim failed"
            ),
            Err(err) => tracing::info!(
                address = %req.address,
                account_id = ?req.account_id,
                track = ?req.track,
                chain = ?req.chain,
                kind = err.kind(),
                reason = %err,
                "claim rejected"
            ),
        }
        outcome
    }

    async fn authorize_and_issue(&self, req: &ClaimRequest) -> ClaimResult<Voucher> {
        let address = WalletAddress::parse(&req.address)?;
        let (track_id, track) = self.tracks.resolve(req.track.as_deref())?;
        let (chain_id, chain) = self
            .chains
            .resolve(req.chain.as_deref(), track.chain.as_deref())?;
        if track.require_ownership && req.account_id.is_none() {
            return Err(ClaimError::validation("account id is required"));
        }
        let claimed = ClaimIdentity::new(address, req.account_id);

        if self.denylist.blocks(&claimed) {
            return Err(ClaimError::rejected(Rejection::Blocked, "denylisted"));
        }

        // An account id keys records and reputation only once the directory
        // has vouched for it.
        let identity = if track.require_ownership {
            claimed
        } else {
            ClaimIdentity::new(address, None)
        };

        let now = self.clock.now_ms();
        if !track.is_unlocked(now) {
            return Err(ClaimError::rejected(
                Rejection::NotYetAvailable,
                format!("track {track_id} unlocks at {:?}", track.unlock_at_ms),
            ));
        }

        if track.require_ownership {
            if let Some(account_id) = identity.account_id {
                let link = verify_ownership(
                    self.directory.as_ref(),
                    account_id,
                    &identity.address,
                    self.max_directory_pages,
                )
                .await?;
                tracing::debug!(account_id, address = %identity.address, ?link, "ownership verified");
            }
        }

        self.check_eligibility(&identity).await?;
        self.check_not_contract(chain_id, chain, &identity.address).await?;
        self.check_precondition(chain_id, chain, track, &identity.address)
            .await?;

        let lock = self.ledger.acquire(track_id, &identity).await?;
        let outcome = self.issue_locked(track_id, track, &identity).await;
        lock.release().await;
        outcome
    }

    async fn check_eligibility(&self, identity: &ClaimIdentity) -> ClaimResult<()> {
        let Some(service) = self.reputation.as_ref() else {
            return Ok(());
        };
        if self.eligibility.is_empty() {
            return Ok(());
        }
        let report = service
            .lookup(identity.account_id, &identity.address)
            .await
            .map_err(|e| ClaimError::upstream(e.to_string()))?;
        self.eligibility.evaluate(&report)
    }

    async fn check_not_contract(
        &self,
        chain_id: &str,
        chain: &dyn ChainInspector,
        address: &WalletAddress,
    ) -> ClaimResult<()> {
        let code = chain
            .code_at(address)
            .await
            .map_err(|e| ClaimError::upstream(e.to_string()))?;
        if !code.is_empty() {
            return Err(ClaimError::rejected(
                Rejection::Forbidden,
                format!("address holds contract code on {chain_id}"),
            ));
        }
        Ok(())
    }

    async fn check_precondition(
        &self,
        chain_id: &str,
        chain: &dyn ChainInspector,
        track: &RewardTrack,
        address: &WalletAddress,
    ) -> ClaimResult<()> {
        let Some(pre) = track.precondition.as_ref() else {
            return Ok(());
        };
        let ret = chain
            .call(&pre.contract, &pre.calldata(address))
            .await
            .map_err(|e| ClaimError::upstream(e.to_string()))?;
        let met = first_word_at_least(&ret, pre.min_value)
            .map_err(|e| ClaimError::upstream(e.to_string()))?;
        if !met {
            return Err(ClaimError::rejected(
                Rejection::PreconditionNotMet,
                format!("view call on {chain_id} returned less than {}", pre.min_value),
            ));
        }
        Ok(())
    }

    /// Runs with the claim lock held.
    async fn issue_locked(
        &self,
        track_id: &str,
        track: &RewardTrack,
        identity: &ClaimIdentity,
    ) -> ClaimResult<Voucher> {
        let now = self.clock.now_ms();
        if let Some(last) = self.ledger.last_claim(track_id, identity).await? {
            if track.reset_utc.claimed_this_period(last, now) {
                return Err(ClaimError::Contention {
                    kind: Contention::AlreadyClaimed,
                    retry_after_ms: track.reset_utc.next_period_start(now).saturating_sub(now),
                });
            }
        }

        let voucher = self.signer.sign(identity.address, track.amount, now)?;
        self.ledger.record_claim(track_id, identity, now).await?;

        let entry = AuditEntry {
            timestamp: now,
            track: track_id.to_string(),
            account: identity.account_id,
            recipient: identity.address.normalized(),
            amount: track.amount.to_string(),
        };
        if let Err(err) = self.ledger.append_audit(&entry).await {
            tracing::warn!(track = track_id, error = %err, "audit append failed; claim stands");
        }
        tracing::info!(
            target: "rewardgate.claim.audit",
            timestamp = entry.timestamp,
            track = %entry.track,
            account = ?entry.account,
            recipient = %entry.recipient,
            amount = %entry.amount,
            "voucher issued"
        );
        Ok(voucher)
    }
}
