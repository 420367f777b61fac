//! Prometheus metrics for the wallet.
//!
//! [`WalletMetrics`] owns a dedicated [`Registry`] so several wallets in one
//! process never collide; callers expose it with [`WalletMetrics::encode`].

use prometheus::{
    register_histogram_with_registry, register_int_counter_with_registry,
    register_int_gauge_with_registry, Encoder, Histogram, HistogramOpts, IntCounter, IntGauge,
    Opts, Registry, TextEncoder,
};

/// Reconciliation latency buckets, 100 µs → 1 s.
const RECONCILE_BUCKETS: &[f64] = &[0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0];

pub struct WalletMetrics {
    /// The Prometheus registry that owns every metric below.
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Successful updates.
    pub reconciliations: IntCounter,
    /// Updates rejected because of an unknown output under strict mode.
    pub rejected_updates: IntCounter,
    /// Diffs handed to the applier across all passes.
    pub diffs_applied: IntCounter,
    /// Reverts of outputs the wallet never observed (strict and lenient).
    pub invariant_violations: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    pub age: IntGauge,
    pub spendable_outputs: IntGauge,

    // ── Histograms ──────────────────────────────────────────────────────
    pub reconcile_duration: Histogram,
}

impl WalletMetrics {
    /// Create a fresh set of metrics, all registered under a new
    /// [`Registry`].
    pub fn new() -> Self {
        let registry = Registry::new();

        let reconciliations = register_int_counter_with_registry!(
            Opts::new(
                "cirrus_wallet_reconciliations_total",
                "Wallet updates applied"
            ),
            registry
        )
        .expect("failed to register reconciliations counter");

        let rejected_updates = register_int_counter_with_registry!(
            Opts::new(
                "cirrus_wallet_rejected_updates_total",
                "Wallet updates rejected and rolled back"
            ),
            registry
        )
        .expect("failed to register rejected_updates counter");

        let diffs_applied = register_int_counter_with_registry!(
            Opts::new(
                "cirrus_wallet_diffs_applied_total",
                "Output diffs processed by the wallet"
            ),
            registry
        )
        .expect("failed to register diffs_applied counter");

        let invariant_violations = register_int_counter_with_registry!(
            Opts::new(
                "cirrus_wallet_invariant_violations_total",
                "Reverts of outputs the wallet never observed"
            ),
            registry
        )
        .expect("failed to register invariant_violations counter");

        let age = register_int_gauge_with_registry!(
            Opts::new("cirrus_wallet_age", "Net chain height progress seen by the wallet"),
            registry
        )
        .expect("failed to register age gauge");

        let spendable_outputs = register_int_gauge_with_registry!(
            Opts::new(
                "cirrus_wallet_spendable_outputs",
                "Outputs currently spendable by the wallet"
            ),
            registry
        )
        .expect("failed to register spendable_outputs gauge");

        let reconcile_duration = register_histogram_with_registry!(
            HistogramOpts::new(
                "cirrus_wallet_reconcile_duration_seconds",
                "Time spent applying one wallet update"
            )
            .buckets(RECONCILE_BUCKETS.to_vec()),
            registry
        )
        .expect("failed to register reconcile_duration histogram");

        Self {
            registry,
            reconciliations,
            rejected_updates,
            diffs_applied,
            invariant_violations,
            age,
            spendable_outputs,
            reconcile_duration,
        }
    }

    /// Render every metric in the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl Default for WalletMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_instances_do_not_collide() {
        let a = WalletMetrics::new();
        let b = WalletMetrics::new();
        a.reconciliations.inc();
        assert_eq!(a.reconciliations.get(), 1);
        assert_eq!(b.reconciliations.get(), 0);
    }

    #[test]
    fn encode_lists_registered_metrics() {
        let metrics = WalletMetrics::new();
        metrics.age.set(5);
        metrics.reconcile_duration.observe(0.002);
        let text = metrics.encode().unwrap();
        assert!(text.contains("cirrus_wallet_age 5"));
        assert!(text.contains("cirrus_wallet_reconcile_duration_seconds_count 1"));
        assert!(text.contains("cirrus_wallet_spendable_outputs 0"));
    }
}
