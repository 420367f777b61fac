//! The wallet: reconciliation state behind one lock, plus persistence,
//! subscribers, statistics and metrics.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use cirrus_store::WalletStore;
use cirrus_types::{CoinOutputDiff, ConsensusChange, Currency, OutputId, UnlockHash};
use cirrus_utils::StatsCounter;

use crate::applier::DiffOutcome;
use crate::config::{Strictness, WalletConfig};
use crate::metrics::WalletMetrics;
use crate::registry::KnownOutput;
use crate::subscriber::{SubscriberId, SubscriberSet, WalletSubscriber};
use crate::update::{ReconcileSummary, WalletState};
use crate::WalletError;

const STAT_RECONCILIATIONS: &str = "reconciliations";
const STAT_REJECTED: &str = "rejected_updates";
const STAT_PERSIST_FAILURES: &str = "persist_failures";

const STAT_NAMES: &[&str] = &[
    "ignored",
    "created",
    "reactivated",
    "unchanged",
    "deactivated",
    "missing_ignored",
    STAT_RECONCILIATIONS,
    STAT_REJECTED,
    STAT_PERSIST_FAILURES,
];

/// A wallet tracking the outputs spendable by its keys.
///
/// All reconciliation state (keys, outputs, the pool overlay and the age)
/// sits behind one mutex: an update runs as a single critical section and
/// every query observes either the state before it or after it, never a
/// state in between.
pub struct Wallet {
    state: Mutex<WalletState>,
    subscribers: Mutex<SubscriberSet>,
    strictness: Strictness,
    store: Option<Arc<dyn WalletStore>>,
    persist_on_update: bool,
    stats: StatsCounter,
    metrics: WalletMetrics,
}

impl Wallet {
    /// An in-memory wallet with no keys and no store.
    pub fn new(strictness: Strictness) -> Self {
        Self::from_parts(WalletState::default(), strictness, None, false)
    }

    /// An in-memory wallet controlling `keys`.
    pub fn with_keys(strictness: Strictness, keys: impl IntoIterator<Item = UnlockHash>) -> Self {
        let mut state = WalletState::default();
        for key in keys {
            state.registry.add_key(key);
        }
        Self::from_parts(state, strictness, None, false)
    }

    /// Restore a wallet from `store`, registering any configured keys it does
    /// not know yet.
    pub fn open(config: &WalletConfig, store: Arc<dyn WalletStore>) -> Result<Self, WalletError> {
        let mut state = match store.load_wallet()? {
            Some(record) => WalletState::from_record(record),
            None => WalletState::default(),
        };

        let added = config
            .keys
            .iter()
            .filter(|key| state.registry.add_key(**key))
            .count();
        if added > 0 && config.persist_on_update {
            store.save_wallet(&state.to_record())?;
        }

        tracing::info!(
            keys = state.registry.len(),
            new_keys = added,
            outputs = state.registry.output_count(),
            pending = state.unconfirmed_diffs.len(),
            age = state.age.value(),
            strictness = %config.strictness,
            "wallet opened"
        );

        Ok(Self::from_parts(
            state,
            config.strictness,
            Some(store),
            config.persist_on_update,
        ))
    }

    fn from_parts(
        state: WalletState,
        strictness: Strictness,
        store: Option<Arc<dyn WalletStore>>,
        persist_on_update: bool,
    ) -> Self {
        let metrics = WalletMetrics::new();
        metrics.age.set(state.age.value());
        metrics
            .spendable_outputs
            .set(to_gauge(state.registry.spendable_outputs().count()));

        Self {
            state: Mutex::new(state),
            subscribers: Mutex::new(SubscriberSet::default()),
            strictness,
            store,
            persist_on_update,
            stats: StatsCounter::new(STAT_NAMES),
            metrics,
        }
    }

    pub fn strictness(&self) -> Strictness {
        self.strictness
    }

    /// Start tracking outputs paid to `key`. Returns `false` if it was
    /// already tracked.
    ///
    /// Pending pool diffs already paid to `key` are overlaid at once, and
    /// subscribers are notified. Under [`Strictness::Strict`] a pending spend
    /// of an output the wallet never observed rejects the registration.
    pub fn add_key(&self, key: UnlockHash) -> Result<bool, WalletError> {
        let persisted = {
            let state = &mut *self.lock_state();
            let Some(touched) = state.add_key(key, self.strictness)? else {
                return Ok(false);
            };
            tracing::info!(key = %key, pending = touched, "key registered");
            self.metrics
                .spendable_outputs
                .set(to_gauge(state.registry.spendable_outputs().count()));
            self.persist_after_update(state)
        };

        self.notify_subscribers();
        persisted.map(|()| true)
    }

    /// Fold a consensus change and the complete current pool contents into
    /// the wallet.
    ///
    /// Unwinds the previous pool overlay, applies the confirmed diffs,
    /// overlays `unconfirmed`, then moves the age by the applied minus
    /// reverted block counts. Subscribers are notified once afterwards.
    ///
    /// Under [`Strictness::Strict`], a revert of an output the wallet never
    /// observed rejects the whole update: the wallet is left exactly as it
    /// was and nobody is notified.
    ///
    /// If saving to the store fails the in-memory update still stands,
    /// subscribers are still notified, and the store error is returned.
    pub fn receive_update(
        &self,
        change: &ConsensusChange,
        unconfirmed: Vec<CoinOutputDiff>,
    ) -> Result<ReconcileSummary, WalletError> {
        let span = tracing::debug_span!(
            "reconcile",
            reverted = change.reverted_block_count(),
            applied = change.applied_block_count(),
            confirmed_diffs = change.coin_output_diffs.len(),
            unconfirmed_diffs = unconfirmed.len()
        );
        let _enter = span.enter();
        let timer = self.metrics.reconcile_duration.start_timer();

        let (summary, persisted) = {
            let mut state = self.lock_state();
            let summary = match state.reconcile(change, unconfirmed, self.strictness) {
                Ok(summary) => summary,
                Err(e) => {
                    timer.stop_and_discard();
                    self.stats.increment(STAT_REJECTED);
                    self.metrics.rejected_updates.inc();
                    if matches!(e, WalletError::UnknownOutput { .. }) {
                        self.metrics.invariant_violations.inc();
                    }
                    return Err(e);
                }
            };
            self.record_summary(&summary);
            let persisted = self.persist_after_update(&state);
            (summary, persisted)
        };
        timer.observe_duration();

        tracing::debug!(
            unwound = summary.unwound,
            confirmed = summary.confirmed,
            overlaid = summary.overlaid,
            created = summary.created,
            reactivated = summary.reactivated,
            deactivated = summary.deactivated,
            missing = summary.missing_ignored,
            age = summary.age,
            "wallet updated"
        );

        // The state lock is released so subscribers can query the wallet.
        self.notify_subscribers();
        persisted.map(|()| summary)
    }

    /// Write the current state to the store, if there is one.
    pub fn save(&self) -> Result<(), WalletError> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        let record = self.lock_state().to_record();
        store.save_wallet(&record)?;
        Ok(())
    }

    // ── Subscribers ─────────────────────────────────────────────────────

    pub fn subscribe(&self, subscriber: Arc<dyn WalletSubscriber>) -> SubscriberId {
        self.lock_subscribers().subscribe(subscriber)
    }

    /// Returns `false` if `id` was not subscribed.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.lock_subscribers().unsubscribe(id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock_subscribers().len()
    }

    // ── Queries ─────────────────────────────────────────────────────────

    pub fn age(&self) -> i64 {
        self.lock_state().age.value()
    }

    /// Sum of all spendable outputs, including those created by pool
    /// transactions.
    pub fn spendable_balance(&self) -> Currency {
        self.lock_state()
            .registry
            .spendable_outputs()
            .map(KnownOutput::value)
            .sum()
    }

    /// Spendable outputs sorted by id.
    pub fn spendable_outputs(&self) -> Vec<KnownOutput> {
        let mut outputs: Vec<KnownOutput> = self
            .lock_state()
            .registry
            .spendable_outputs()
            .cloned()
            .collect();
        outputs.sort_by_key(KnownOutput::id);
        outputs
    }

    /// The entry for `id` under `key`, spendable or not.
    pub fn known_output(&self, key: &UnlockHash, id: &OutputId) -> Option<KnownOutput> {
        self.lock_state()
            .registry
            .lookup(key)
            .and_then(|k| k.lookup(id))
            .cloned()
    }

    pub fn output_count(&self) -> usize {
        self.lock_state().registry.output_count()
    }

    pub fn unconfirmed_diff_count(&self) -> usize {
        self.lock_state().unconfirmed_diffs.len()
    }

    /// Tracked keys, sorted.
    pub fn keys(&self) -> Vec<UnlockHash> {
        let mut keys: Vec<UnlockHash> = self
            .lock_state()
            .registry
            .iter()
            .map(|(key, _)| *key)
            .collect();
        keys.sort();
        keys
    }

    pub fn contains_key(&self, key: &UnlockHash) -> bool {
        self.lock_state().registry.contains(key)
    }

    /// Lifetime counters: one per diff outcome plus update totals.
    pub fn stats(&self) -> BTreeMap<&'static str, u64> {
        self.stats.snapshot()
    }

    pub fn metrics(&self) -> &WalletMetrics {
        &self.metrics
    }

    // ── Internals ───────────────────────────────────────────────────────

    fn record_summary(&self, summary: &ReconcileSummary) {
        for outcome in DiffOutcome::ALL {
            self.stats
                .add(outcome.as_str(), summary.count(outcome) as u64);
        }
        self.stats.increment(STAT_RECONCILIATIONS);

        self.metrics.reconciliations.inc();
        self.metrics
            .diffs_applied
            .inc_by((summary.unwound + summary.confirmed + summary.overlaid) as u64);
        self.metrics
            .invariant_violations
            .inc_by(summary.missing_ignored as u64);
        self.metrics.age.set(summary.age);
        self.metrics.spendable_outputs.add(
            to_gauge(summary.created + summary.reactivated) - to_gauge(summary.deactivated),
        );
    }

    fn persist_after_update(&self, state: &WalletState) -> Result<(), WalletError> {
        let Some(store) = self.store.as_ref().filter(|_| self.persist_on_update) else {
            return Ok(());
        };
        store.save_wallet(&state.to_record()).map_err(|e| {
            tracing::warn!(error = %e, "failed to persist wallet");
            self.stats.increment(STAT_PERSIST_FAILURES);
            WalletError::Store(e)
        })
    }

    fn notify_subscribers(&self) {
        let subscribers = self.lock_subscribers().snapshot();
        for subscriber in subscribers {
            subscriber.receive_wallet_update();
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, WalletState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_subscribers(&self) -> MutexGuard<'_, SubscriberSet> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn to_gauge(count: usize) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX)
}
