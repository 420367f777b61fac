//! Integration tests driving the wallet through its public API:
//! consensus change + pool snapshot → reconciliation → queries, subscribers
//! and persistence (in-memory and LMDB).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use cirrus_nullables::NullWalletStore;
use cirrus_store::WalletStore;
use cirrus_store_lmdb::{LmdbEnvironment, LmdbWalletStore};
use cirrus_types::{
    BlockId, CoinOutput, CoinOutputDiff, ConsensusChange, Currency, DiffDirection, OutputId,
    TransactionId, UnlockHash,
};
use cirrus_wallet::{Strictness, Wallet, WalletConfig, WalletError};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const A: UnlockHash = UnlockHash::ZERO;

fn address(seed: u8) -> UnlockHash {
    UnlockHash::new([seed; 32])
}

fn output_id(seed: u8) -> OutputId {
    OutputId::derive(&TransactionId::new([seed; 32]), 0)
}

fn diff(seed: u8, owner: UnlockHash, direction: DiffDirection) -> CoinOutputDiff {
    CoinOutputDiff::new(
        direction,
        output_id(seed),
        CoinOutput::new(Currency::new(seed as u128 * 100), owner),
    )
}

fn forward(seed: u8) -> CoinOutputDiff {
    diff(seed, A, DiffDirection::Apply)
}

fn change(reverted: u8, applied: u8, diffs: Vec<CoinOutputDiff>) -> ConsensusChange {
    ConsensusChange {
        reverted_blocks: (0..reverted).map(|i| BlockId::new([i; 32])).collect(),
        applied_blocks: (0..applied).map(|i| BlockId::new([0x80 | i; 32])).collect(),
        coin_output_diffs: diffs,
    }
}

fn spendable(wallet: &Wallet, seed: u8) -> Option<bool> {
    wallet
        .known_output(&A, &output_id(seed))
        .map(|o| o.is_spendable())
}

fn temp_store() -> (tempfile::TempDir, Arc<LmdbWalletStore>) {
    let dir = tempfile::tempdir().expect("temp dir");
    let env = LmdbEnvironment::open(dir.path(), 16 * 1024 * 1024).expect("open env");
    (dir, Arc::new(LmdbWalletStore::new(env)))
}

fn config(strictness: Strictness) -> WalletConfig {
    WalletConfig {
        strictness,
        keys: vec![A],
        ..WalletConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

#[test]
fn confirmed_output_then_reorg() {
    let wallet = Wallet::with_keys(Strictness::Strict, [A]);

    wallet
        .receive_update(&change(0, 1, vec![forward(1)]), vec![])
        .unwrap();
    let entry = wallet.known_output(&A, &output_id(1)).unwrap();
    assert!(entry.is_spendable());
    assert_eq!(entry.age(), 0);
    assert_eq!(wallet.output_count(), 1);
    assert_eq!(wallet.age(), 1);

    // The block is reverted: the same output comes back as a revert.
    wallet
        .receive_update(&change(1, 0, vec![forward(1).inverse()]), vec![])
        .unwrap();
    assert_eq!(spendable(&wallet, 1), Some(false));
    assert_eq!(wallet.output_count(), 1);
    assert_eq!(wallet.age(), 0);
    assert_eq!(wallet.spendable_balance(), Currency::ZERO);
}

#[test]
fn empty_pool_snapshot_unwinds_previous_overlay() {
    let wallet = Wallet::with_keys(Strictness::Strict, [A]);

    wallet
        .receive_update(&ConsensusChange::default(), vec![forward(2)])
        .unwrap();
    assert_eq!(spendable(&wallet, 2), Some(true));
    assert_eq!(wallet.unconfirmed_diff_count(), 1);

    wallet
        .receive_update(&ConsensusChange::default(), vec![])
        .unwrap();
    assert_eq!(spendable(&wallet, 2), Some(false));
    assert_eq!(wallet.unconfirmed_diff_count(), 0);
}

#[test]
fn chained_pool_spend_leaves_no_phantom_balance() {
    let wallet = Wallet::with_keys(Strictness::Strict, [A]);

    // One pool transaction creates output 1, a second one spends it.
    wallet
        .receive_update(&ConsensusChange::default(), vec![forward(1), forward(1).inverse()])
        .unwrap();
    assert_eq!(spendable(&wallet, 1), Some(false));
    assert_eq!(wallet.spendable_balance(), Currency::ZERO);

    wallet
        .receive_update(&ConsensusChange::default(), vec![])
        .unwrap();
    assert_eq!(spendable(&wallet, 1), Some(false));
    assert_eq!(wallet.spendable_balance(), Currency::ZERO);
}

#[test]
fn key_added_with_pending_overlay_keeps_strict_wallet_usable() {
    let b = address(7);
    let wallet = Wallet::with_keys(Strictness::Strict, [A]);
    wallet
        .receive_update(
            &ConsensusChange::default(),
            vec![diff(2, b, DiffDirection::Apply)],
        )
        .unwrap();

    assert!(wallet.add_key(b).unwrap());
    assert_eq!(wallet.spendable_balance(), Currency::new(200));

    for _ in 0..2 {
        wallet
            .receive_update(&ConsensusChange::default(), vec![])
            .unwrap();
    }
    assert_eq!(wallet.unconfirmed_diff_count(), 0);
    assert_eq!(wallet.spendable_balance(), Currency::ZERO);
    let entry = wallet.known_output(&b, &output_id(2)).unwrap();
    assert!(!entry.is_spendable());
}

#[test]
fn foreign_outputs_never_enter_the_ledger() {
    let wallet = Wallet::with_keys(Strictness::Strict, [A]);
    let summary = wallet
        .receive_update(
            &change(0, 1, vec![diff(1, address(7), DiffDirection::Apply), forward(2)]),
            vec![diff(3, address(7), DiffDirection::Revert)],
        )
        .unwrap();

    assert_eq!(summary.ignored, 2);
    assert_eq!(summary.created, 1);
    assert_eq!(wallet.output_count(), 1);
    assert!(!wallet.contains_key(&address(7)));
}

#[test]
fn duplicate_delivery_does_not_duplicate_entries() {
    let wallet = Wallet::with_keys(Strictness::Strict, [A]);
    // A locally built transaction echoed by both the pool and a block.
    wallet
        .receive_update(&change(0, 1, vec![forward(1), forward(1)]), vec![forward(1)])
        .unwrap();

    assert_eq!(wallet.output_count(), 1);
    assert_eq!(wallet.spendable_outputs().len(), 1);
    assert_eq!(wallet.spendable_balance(), Currency::new(100));
}

#[test]
fn spendable_outputs_are_sorted_and_span_keys() {
    let b = address(2);
    let wallet = Wallet::with_keys(Strictness::Strict, [A, b]);
    wallet
        .receive_update(
            &change(0, 1, vec![forward(3), diff(1, b, DiffDirection::Apply), forward(2)]),
            vec![],
        )
        .unwrap();

    let ids: Vec<OutputId> = wallet.spendable_outputs().iter().map(|o| o.id()).collect();
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(ids, sorted);
    assert_eq!(ids.len(), 3);
    assert_eq!(wallet.spendable_balance(), Currency::new(600));
    assert_eq!(wallet.keys(), {
        let mut keys = vec![A, b];
        keys.sort();
        keys
    });
}

// ---------------------------------------------------------------------------
// Strictness
// ---------------------------------------------------------------------------

#[test]
fn strict_rejection_is_atomic_and_silent() {
    let wallet = Wallet::with_keys(Strictness::Strict, [A]);
    wallet
        .receive_update(&change(0, 2, vec![forward(1)]), vec![forward(2)])
        .unwrap();

    let notified = Arc::new(AtomicUsize::new(0));
    let n = Arc::clone(&notified);
    wallet.subscribe(Arc::new(move || {
        n.fetch_add(1, Ordering::SeqCst);
    }));

    let bad = change(1, 0, vec![forward(1).inverse(), diff(9, A, DiffDirection::Revert)]);
    let err = wallet.receive_update(&bad, vec![forward(3)]).unwrap_err();
    match err {
        WalletError::UnknownOutput { address, id } => {
            assert_eq!(address, A);
            assert_eq!(id, output_id(9));
        }
        other => panic!("unexpected error: {other}"),
    }

    assert_eq!(notified.load(Ordering::SeqCst), 0);
    assert_eq!(wallet.age(), 2);
    assert_eq!(spendable(&wallet, 1), Some(true));
    assert_eq!(spendable(&wallet, 2), Some(true));
    assert_eq!(wallet.known_output(&A, &output_id(3)), None);
    assert_eq!(wallet.unconfirmed_diff_count(), 1);
}

#[test]
fn lenient_logs_and_continues() {
    let wallet = Wallet::with_keys(Strictness::Lenient, [A]);
    let summary = wallet
        .receive_update(
            &change(0, 1, vec![diff(9, A, DiffDirection::Revert), forward(1)]),
            vec![],
        )
        .unwrap();

    assert_eq!(summary.missing_ignored, 1);
    assert_eq!(spendable(&wallet, 1), Some(true));
    assert_eq!(wallet.known_output(&A, &output_id(9)), None);
    assert_eq!(wallet.age(), 1);
    assert_eq!(wallet.metrics().invariant_violations.get(), 1);
}

// ---------------------------------------------------------------------------
// Subscribers
// ---------------------------------------------------------------------------

#[test]
fn each_update_notifies_once() {
    let wallet = Wallet::with_keys(Strictness::Lenient, [A]);
    let calls = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&calls);
    let id = wallet.subscribe(Arc::new(move || {
        c.fetch_add(1, Ordering::SeqCst);
    }));

    wallet
        .receive_update(&change(0, 1, vec![forward(1), forward(2)]), vec![forward(3)])
        .unwrap();
    wallet
        .receive_update(&ConsensusChange::default(), vec![])
        .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    assert!(wallet.unsubscribe(id));
    assert!(!wallet.unsubscribe(id));
    wallet
        .receive_update(&ConsensusChange::default(), vec![])
        .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(wallet.subscriber_count(), 0);
}

#[test]
fn subscriber_sees_the_finished_update() {
    let wallet = Arc::new(Wallet::with_keys(Strictness::Strict, [A]));
    let seen = Arc::new(Mutex::new(Vec::new()));

    // Re-reading the wallet from inside the callback must not deadlock.
    let w = Arc::downgrade(&wallet);
    let s = Arc::clone(&seen);
    wallet.subscribe(Arc::new(move || {
        if let Some(wallet) = w.upgrade() {
            s.lock()
                .unwrap()
                .push((wallet.age(), wallet.spendable_balance()));
        }
    }));

    wallet
        .receive_update(&change(0, 1, vec![forward(1)]), vec![forward(2)])
        .unwrap();
    wallet
        .receive_update(&change(0, 1, vec![]), vec![])
        .unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec![(1, Currency::new(300)), (2, Currency::new(100))]
    );
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

#[test]
fn open_registers_configured_keys_once() {
    let store = Arc::new(NullWalletStore::new());
    let wallet = Wallet::open(&config(Strictness::Strict), store.clone()).unwrap();
    assert!(wallet.contains_key(&A));
    assert_eq!(store.save_count(), 1);
    drop(wallet);

    let wallet = Wallet::open(&config(Strictness::Strict), store.clone()).unwrap();
    assert_eq!(wallet.keys(), vec![A]);
    assert_eq!(store.save_count(), 1);
}

#[test]
fn every_update_is_saved() {
    let store = Arc::new(NullWalletStore::new());
    let wallet = Wallet::open(&config(Strictness::Strict), store.clone()).unwrap();

    wallet
        .receive_update(&change(0, 3, vec![forward(1)]), vec![forward(2)])
        .unwrap();

    let record = store.record().unwrap();
    assert_eq!(record.age, 3);
    assert_eq!(record.output_count(), 2);
    assert_eq!(record.unconfirmed_diffs, vec![forward(2)]);
}

#[test]
fn wallet_survives_restart_on_lmdb() {
    let (dir, store) = temp_store();
    {
        let wallet = Wallet::open(&config(Strictness::Strict), store.clone()).unwrap();
        wallet
            .receive_update(&change(0, 2, vec![forward(1), forward(2)]), vec![forward(3)])
            .unwrap();
        wallet
            .receive_update(&change(0, 1, vec![forward(2).inverse()]), vec![forward(3)])
            .unwrap();
    }
    drop(store);

    let env = LmdbEnvironment::open(dir.path(), 16 * 1024 * 1024).expect("reopen env");
    let store: Arc<dyn WalletStore> = Arc::new(LmdbWalletStore::new(env));
    let wallet = Wallet::open(&config(Strictness::Strict), store).unwrap();

    assert_eq!(wallet.age(), 3);
    assert_eq!(wallet.output_count(), 3);
    assert_eq!(spendable(&wallet, 1), Some(true));
    assert_eq!(spendable(&wallet, 2), Some(false));
    assert_eq!(spendable(&wallet, 3), Some(true));
    assert_eq!(wallet.unconfirmed_diff_count(), 1);

    // The restored overlay is unwound by the next snapshot.
    wallet
        .receive_update(&ConsensusChange::default(), vec![])
        .unwrap();
    assert_eq!(spendable(&wallet, 3), Some(false));
}

#[test]
fn restored_metrics_reflect_loaded_state() {
    let store = Arc::new(NullWalletStore::new());
    {
        let wallet = Wallet::open(&config(Strictness::Strict), store.clone()).unwrap();
        wallet
            .receive_update(&change(0, 4, vec![forward(1), forward(2)]), vec![])
            .unwrap();
    }
    let wallet = Wallet::open(&config(Strictness::Strict), store).unwrap();
    assert_eq!(wallet.metrics().age.get(), 4);
    assert_eq!(wallet.metrics().spendable_outputs.get(), 2);
}
