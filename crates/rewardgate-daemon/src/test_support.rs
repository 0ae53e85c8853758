//! In-process fakes for the claim pipeline's collaborators.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rewardgate_core::address::WalletAddress;
use rewardgate_core::period::ResetTime;
use rewardgate_core::track::{RewardTrack, TrackTable};
use rewardgate_core::voucher::VoucherSigner;

use crate::chain::{ChainInspector, ChainRegistry};
use crate::clock::Clock;
use crate::config::DenylistConfig;
use crate::directory::{IdentityDirectory, VerificationPage};
use crate::ledger::ClaimLedger;
use crate::orchestrator::{ClaimOrchestrator, Denylist};
use crate::reputation::{EligibilityPolicy, ReputationReport, ReputationService};
use crate::store::MemoryStore;
use crate::upstream::UpstreamError;

pub(crate) const SIGNER_KEY: &str =
    "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub(crate) const ACCOUNT: u64 = 4242;
/// 2026-03-01T12:00:00Z
pub(crate) const NOON_MS: u64 = 1_772_366_400_000;

pub(crate) fn wallet() -> WalletAddress {
    WalletAddress::from_bytes([0x11; 20])
}

pub(crate) fn daily_track(amount: u128) -> RewardTrack {
    RewardTrack {
        amount,
        reset_utc: ResetTime::MIDNIGHT,
        unlock_at_ms: None,
        chain: None,
        precondition: None,
        require_ownership: true,
    }
}

pub(crate) struct FixedClock(AtomicU64);

impl FixedClock {
    pub(crate) fn set(&self, now_ms: u64) {
        self.0.store(now_ms, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_ms(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
pub(crate) struct StaticDirectory {
    pub(crate) verified: Mutex<Vec<String>>,
    pub(crate) custody: Mutex<Option<String>>,
    pub(crate) down: AtomicBool,
    pub(crate) calls: AtomicUsize,
}

#[async_trait]
impl IdentityDirectory for StaticDirectory {
    async fn verifications(
        &self,
        _account_id: u64,
        _page_token: Option<&str>,
    ) -> Result<VerificationPage, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.down.load(Ordering::SeqCst) {
            return Err(UpstreamError::malformed("directory", "unavailable"));
        }
        Ok(VerificationPage {
            addresses: self.verified.lock().clone(),
            next_page_token: None,
        })
    }

    async fn custody_address(&self, _account_id: u64) -> Result<Option<String>, UpstreamError> {
        Ok(self.custody.lock().clone())
    }
}

#[derive(Default)]
pub(crate) struct StaticReputation {
    pub(crate) report: Mutex<ReputationReport>,
    pub(crate) queried_accounts: Mutex<Vec<Option<u64>>>,
    pub(crate) down: AtomicBool,
    pub(crate) calls: AtomicUsize,
}

#[async_trait]
impl ReputationService for StaticReputation {
    async fn lookup(
        &self,
        account_id: Option<u64>,
        _address: &WalletAddress,
    ) -> Result<ReputationReport, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queried_accounts.lock().push(account_id);
        if self.down.load(Ordering::SeqCst) {
            return Err(UpstreamError::malformed("reputation", "unavailable"));
        }
        Ok(self.report.lock().clone())
    }
}

#[derive(Default)]
pub(crate) struct StaticChain {
    pub(crate) contracts: Mutex<HashSet<WalletAddress>>,
    /// Returned by every `eth_call`; 32 zero bytes when unset.
    pub(crate) call_return: Mutex<Option<Vec<u8>>>,
    pub(crate) code_calls: AtomicUsize,
    pub(crate) view_calls: AtomicUsize,
}

#[async_trait]
impl ChainInspector for StaticChain {
    async fn code_at(&self, address: &WalletAddress) -> Result<Vec<u8>, UpstreamError> {
        self.code_calls.fetch_add(1, Ordering::SeqCst);
        if self.contracts.lock().contains(address) {
            Ok(vec![0x60, 0x80, 0x60, 0x40])
        } else {
            Ok(Vec::new())
        }
    }

    async fn call(&self, _contract: &WalletAddress, _calldata: &[u8]) -> Result<Vec<u8>, UpstreamError> {
        self.view_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.call_return.lock().clone().unwrap_or_else(|| vec![0u8; 32]))
    }
}

/// Builds orchestrators over shared fakes so tests can inspect what each
/// collaborator saw.
pub(crate) struct Harness {
    pub(crate) tracks: BTreeMap<String, RewardTrack>,
    pub(crate) eligibility: EligibilityPolicy,
    pub(crate) denylist: DenylistConfig,
    pub(crate) store: Arc<MemoryStore>,
    pub(crate) directory: Arc<StaticDirectory>,
    pub(crate) reputation: Arc<StaticReputation>,
    pub(crate) chain: Arc<StaticChain>,
    pub(crate) clock: Arc<FixedClock>,
}

impl Harness {
    /// One "daily" track of 10 tokens; the test wallet is verified for
    /// [`ACCOUNT`] and has a passing reputation.
    pub(crate) fn new() -> Self {
        let directory = StaticDirectory::default();
        directory.verified.lock().push(wallet().normalized());
        let reputation = StaticReputation::default();
        *reputation.report.lock() = ReputationReport {
            score: Some(0.9),
            follower_count: Some(500),
            active_days: Some(60),
        };
        let mut tracks = BTreeMap::new();
        tracks.insert("daily".to_string(), daily_track(10_000_000_000_000_000_000));
        Self {
            tracks,
            eligibility: EligibilityPolicy {
                min_score: Some(0.5),
                min_followers: None,
                min_active_days: None,
            },
            denylist: DenylistConfig::default(),
            store: Arc::new(MemoryStore::default()),
            directory: Arc::new(directory),
            reputation: Arc::new(reputation),
            chain: Arc::new(StaticChain::default()),
            clock: Arc::new(FixedClock(AtomicU64::new(NOON_MS))),
        }
    }

    pub(crate) fn orchestrator(&self) -> ClaimOrchestrator {
        let mut chains: BTreeMap<String, Arc<dyn ChainInspector>> = BTreeMap::new();
        chains.insert("base".to_string(), self.chain.clone());
        ClaimOrchestrator {
            tracks: Arc::new(TrackTable::new(self.tracks.clone(), "daily".to_string()).unwrap()),
            chains: ChainRegistry::new(chains, "base".to_string()),
            denylist: Denylist::from_config(&self.denylist),
            directory: self.directory.clone(),
            max_directory_pages: 8,
            reputation: Some(self.reputation.clone()),
            eligibility: self.eligibility.clone(),
            ledger: ClaimLedger::new(self.store.clone(), Duration::from_secs(10), 100),
            signer: Arc::new(VoucherSigner::from_hex(SIGNER_KEY).unwrap()),
            clock: self.clock.clone(),
        }
    }
}
