//! Key registry: the wallet's record of every output ever observed for the
//! keys it controls.
//!
//! Outputs are never removed: an output that is spent or whose creation is
//! undone is only marked unspendable, so a later re-observation reactivates
//! the existing entry instead of creating a second one.

use std::collections::HashMap;

use cirrus_store::{KeyRecord, OutputRecord};
use cirrus_types::{CoinOutput, Currency, OutputId, UnlockHash};

/// One coin output the wallet has seen for one of its keys.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KnownOutput {
    id: OutputId,
    output: CoinOutput,
    spendable: bool,
    /// Offset against the wallet age at creation. Always 0 when created;
    /// interpreted by maturity checks outside the wallet.
    age: i64,
}

impl KnownOutput {
    pub(crate) fn new(id: OutputId, output: CoinOutput) -> Self {
        Self {
            id,
            output,
            spendable: true,
            age: 0,
        }
    }

    pub fn id(&self) -> OutputId {
        self.id
    }

    pub fn output(&self) -> &CoinOutput {
        &self.output
    }

    pub fn value(&self) -> Currency {
        self.output.value
    }

    pub fn is_spendable(&self) -> bool {
        self.spendable
    }

    pub fn age(&self) -> i64 {
        self.age
    }

    pub(crate) fn set_spendable(&mut self, spendable: bool) {
        self.spendable = spendable;
    }
}

/// Outputs observed for a single key.
#[derive(Clone, Debug, Default)]
pub struct SpendableKey {
    outputs: HashMap<OutputId, KnownOutput>,
}

impl SpendableKey {
    pub fn lookup(&self, id: &OutputId) -> Option<&KnownOutput> {
        self.outputs.get(id)
    }

    pub(crate) fn lookup_mut(&mut self, id: &OutputId) -> Option<&mut KnownOutput> {
        self.outputs.get_mut(id)
    }

    pub(crate) fn insert(&mut self, entry: KnownOutput) {
        self.outputs.insert(entry.id, entry);
    }

    /// Only used to roll back an entry created by an aborted reconciliation.
    pub(crate) fn remove(&mut self, id: &OutputId) -> Option<KnownOutput> {
        self.outputs.remove(id)
    }

    pub fn outputs(&self) -> impl Iterator<Item = &KnownOutput> {
        self.outputs.values()
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }
}

/// Every key the wallet controls.
#[derive(Clone, Debug, Default)]
pub struct KeyRegistry {
    keys: HashMap<UnlockHash, SpendableKey>,
}

impl KeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a key. Returns `false` if it was already registered; its
    /// outputs are left untouched either way.
    pub fn add_key(&mut self, unlock_hash: UnlockHash) -> bool {
        if self.keys.contains_key(&unlock_hash) {
            return false;
        }
        self.keys.insert(unlock_hash, SpendableKey::default());
        true
    }

    /// Only used to undo a registration whose pending overlay was rejected.
    pub(crate) fn remove_key(&mut self, unlock_hash: &UnlockHash) -> Option<SpendableKey> {
        self.keys.remove(unlock_hash)
    }

    pub fn lookup(&self, unlock_hash: &UnlockHash) -> Option<&SpendableKey> {
        self.keys.get(unlock_hash)
    }

    pub(crate) fn lookup_mut(&mut self, unlock_hash: &UnlockHash) -> Option<&mut SpendableKey> {
        self.keys.get_mut(unlock_hash)
    }

    pub fn contains(&self, unlock_hash: &UnlockHash) -> bool {
        self.keys.contains_key(unlock_hash)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&UnlockHash, &SpendableKey)> {
        self.keys.iter()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Total outputs across all keys, spendable or not.
    pub fn output_count(&self) -> usize {
        self.keys.values().map(SpendableKey::len).sum()
    }

    pub fn spendable_outputs(&self) -> impl Iterator<Item = &KnownOutput> {
        self.keys
            .values()
            .flat_map(SpendableKey::outputs)
            .filter(|o| o.spendable)
    }

    // ── Persistence ─────────────────────────────────────────────────────

    /// Records sorted by unlock hash, outputs sorted by id, so equal
    /// registries always produce equal records.
    pub(crate) fn to_records(&self) -> Vec<KeyRecord> {
        let mut records: Vec<KeyRecord> = self
            .keys
            .iter()
            .map(|(unlock_hash, key)| {
                let mut outputs: Vec<OutputRecord> = key
                    .outputs()
                    .map(|o| OutputRecord {
                        id: o.id,
                        output: o.output,
                        spendable: o.spendable,
                        age: o.age,
                    })
                    .collect();
                outputs.sort_by_key(|o| o.id);
                KeyRecord {
                    unlock_hash: *unlock_hash,
                    outputs,
                }
            })
            .collect();
        records.sort_by_key(|r| r.unlock_hash);
        records
    }

    pub(crate) fn from_records(records: Vec<KeyRecord>) -> Self {
        let keys = records
            .into_iter()
            .map(|record| {
                let outputs = record
                    .outputs
                    .into_iter()
                    .map(|o| {
                        (
                            o.id,
                            KnownOutput {
                                id: o.id,
                                output: o.output,
                                spendable: o.spendable,
                                age: o.age,
                            },
                        )
                    })
                    .collect();
                (record.unlock_hash, SpendableKey { outputs })
            })
            .collect();
        Self { keys }
    }
}
