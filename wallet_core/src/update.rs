//! Update coordinator: folds consensus changes and transaction-pool
//! snapshots into the wallet's view.
//!
//! The view always equals "confirmed chain plus the current pool". The pool
//! overlay is never merged: each update first unwinds the previous overlay,
//! then applies the confirmed diffs, then overlays the new pool snapshot.

use cirrus_store::WalletRecord;
use cirrus_types::{CoinOutputDiff, ConsensusChange, DiffDirection, UnlockHash};

use crate::age::AgeCounter;
use crate::applier::{apply_diff, DiffOutcome, Journal};
use crate::config::Strictness;
use crate::registry::KeyRegistry;
use crate::WalletError;

/// What one update did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// Diffs of the previous pool overlay that were unwound.
    pub unwound: usize,
    /// Confirmed diffs applied.
    pub confirmed: usize,
    /// Diffs of the new pool overlay applied.
    pub overlaid: usize,
    pub created: usize,
    pub reactivated: usize,
    pub unchanged: usize,
    pub deactivated: usize,
    pub ignored: usize,
    pub missing_ignored: usize,
    /// Net change of the wallet age.
    pub age_delta: i64,
    /// Wallet age after the update.
    pub age: i64,
}

impl ReconcileSummary {
    fn record(&mut self, outcome: DiffOutcome) {
        let slot = match outcome {
            DiffOutcome::Ignored => &mut self.ignored,
            DiffOutcome::Created => &mut self.created,
            DiffOutcome::Reactivated => &mut self.reactivated,
            DiffOutcome::Unchanged => &mut self.unchanged,
            DiffOutcome::Deactivated => &mut self.deactivated,
            DiffOutcome::MissingIgnored => &mut self.missing_ignored,
        };
        *slot += 1;
    }

    /// Count of diffs that ended in `outcome`.
    pub fn count(&self, outcome: DiffOutcome) -> usize {
        match outcome {
            DiffOutcome::Ignored => self.ignored,
            DiffOutcome::Created => self.created,
            DiffOutcome::Reactivated => self.reactivated,
            DiffOutcome::Unchanged => self.unchanged,
            DiffOutcome::Deactivated => self.deactivated,
            DiffOutcome::MissingIgnored => self.missing_ignored,
        }
    }
}

/// Everything guarded by the wallet lock.
#[derive(Default)]
pub(crate) struct WalletState {
    pub(crate) registry: KeyRegistry,
    /// The pool overlay currently applied on top of the confirmed state.
    pub(crate) unconfirmed_diffs: Vec<CoinOutputDiff>,
    pub(crate) age: AgeCounter,
}

impl WalletState {
    pub(crate) fn from_record(record: WalletRecord) -> Self {
        Self {
            registry: KeyRegistry::from_records(record.keys),
            unconfirmed_diffs: record.unconfirmed_diffs,
            age: AgeCounter::new(record.age),
        }
    }

    pub(crate) fn to_record(&self) -> WalletRecord {
        WalletRecord {
            age: self.age.value(),
            keys: self.registry.to_records(),
            unconfirmed_diffs: self.unconfirmed_diffs.clone(),
        }
    }

    /// Register `key` and overlay the pending diffs already paid to it, so
    /// the next unwind finds every entry it expects. Returns the number of
    /// entries the overlay touched, or `None` if the key was already known.
    /// On error the key is not registered and nothing has changed.
    pub(crate) fn add_key(
        &mut self,
        key: UnlockHash,
        strictness: Strictness,
    ) -> Result<Option<usize>, WalletError> {
        if !self.registry.add_key(key) {
            return Ok(None);
        }
        let mut journal = Journal::default();
        let pending = self
            .unconfirmed_diffs
            .iter()
            .filter(|diff| diff.output.unlock_hash == key);
        for diff in pending {
            if let Err(e) = apply_diff(
                &mut self.registry,
                diff,
                DiffDirection::Apply,
                strictness,
                &mut journal,
            ) {
                journal.rollback(&mut self.registry);
                self.registry.remove_key(&key);
                return Err(e);
            }
        }
        Ok(Some(journal.len()))
    }

    /// Run one full update. On error nothing has changed.
    pub(crate) fn reconcile(
        &mut self,
        change: &ConsensusChange,
        unconfirmed: Vec<CoinOutputDiff>,
        strictness: Strictness,
    ) -> Result<ReconcileSummary, WalletError> {
        let mut summary = ReconcileSummary::default();
        let mut journal = Journal::default();

        let passes =
            self.apply_passes(change, &unconfirmed, strictness, &mut journal, &mut summary);
        if let Err(e) = passes {
            tracing::debug!(undone = journal.len(), "rolling back aborted update");
            journal.rollback(&mut self.registry);
            return Err(e);
        }

        self.unconfirmed_diffs = unconfirmed;
        summary.age_delta = self
            .age
            .adjust(change.reverted_block_count(), change.applied_block_count());
        summary.age = self.age.value();
        Ok(summary)
    }

    fn apply_passes(
        &mut self,
        change: &ConsensusChange,
        unconfirmed: &[CoinOutputDiff],
        strictness: Strictness,
        journal: &mut Journal,
        summary: &mut ReconcileSummary,
    ) -> Result<(), WalletError> {
        // Unwind the previous pool overlay newest first, leaving confirmed
        // state only. A pool may create an output and spend it again.
        for diff in self.unconfirmed_diffs.iter().rev() {
            let outcome = apply_diff(
                &mut self.registry,
                diff,
                DiffDirection::Revert,
                strictness,
                journal,
            )?;
            summary.record(outcome);
            summary.unwound += 1;
        }

        for diff in &change.coin_output_diffs {
            let outcome = apply_diff(
                &mut self.registry,
                diff,
                DiffDirection::Apply,
                strictness,
                journal,
            )?;
            summary.record(outcome);
            summary.confirmed += 1;
        }

        for diff in unconfirmed {
            let outcome = apply_diff(
                &mut self.registry,
                diff,
                DiffDirection::Apply,
                strictness,
                journal,
            )?;
            summary.record(outcome);
            summary.overlaid += 1;
        }
        Ok(())
    }
}
