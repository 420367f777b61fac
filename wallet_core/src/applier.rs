//! Diff applier: moves a single known output in response to one diff.
//!
//! A diff whose direction matches the pass being run makes its output
//! available: the entry is created, or reactivated if it was seen before.
//! A diff pointing the other way makes the output unavailable; the entry is
//! kept and marked unspendable so it can be reactivated later.
//!
//! Every mutation is written to a [`Journal`] so an aborted reconciliation
//! can be undone exactly.

use cirrus_types::{CoinOutputDiff, DiffDirection, OutputId, UnlockHash};

use crate::config::Strictness;
use crate::registry::{KeyRegistry, KnownOutput};
use crate::WalletError;

/// What [`apply_diff`] did to the registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DiffOutcome {
    /// The output belongs to an address the wallet does not control.
    Ignored,
    /// A new spendable entry was created.
    Created,
    /// An existing unspendable entry became spendable again.
    Reactivated,
    /// The entry already had the state the diff asks for.
    Unchanged,
    /// The entry was marked unspendable.
    Deactivated,
    /// The entry to mark unspendable did not exist and the wallet is lenient.
    MissingIgnored,
}

impl DiffOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ignored => "ignored",
            Self::Created => "created",
            Self::Reactivated => "reactivated",
            Self::Unchanged => "unchanged",
            Self::Deactivated => "deactivated",
            Self::MissingIgnored => "missing_ignored",
        }
    }

    /// Every outcome, in declaration order.
    pub const ALL: [DiffOutcome; 6] = [
        Self::Ignored,
        Self::Created,
        Self::Reactivated,
        Self::Unchanged,
        Self::Deactivated,
        Self::MissingIgnored,
    ];
}

enum Undo {
    Created {
        address: UnlockHash,
        id: OutputId,
    },
    Toggled {
        address: UnlockHash,
        id: OutputId,
        was_spendable: bool,
    },
}

/// Mutations made during one reconciliation, newest last.
#[derive(Default)]
pub(crate) struct Journal {
    entries: Vec<Undo>,
}

impl Journal {
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Undo every recorded mutation, newest first.
    pub(crate) fn rollback(self, registry: &mut KeyRegistry) {
        for undo in self.entries.into_iter().rev() {
            match undo {
                Undo::Created { address, id } => {
                    if let Some(key) = registry.lookup_mut(&address) {
                        key.remove(&id);
                    }
                }
                Undo::Toggled {
                    address,
                    id,
                    was_spendable,
                } => {
                    if let Some(entry) = registry
                        .lookup_mut(&address)
                        .and_then(|key| key.lookup_mut(&id))
                    {
                        entry.set_spendable(was_spendable);
                    }
                }
            }
        }
    }
}

/// Apply `diff` during a pass running in `direction`.
///
/// Touches at most one entry. Never changes the wallet age and never
/// notifies anyone.
pub(crate) fn apply_diff(
    registry: &mut KeyRegistry,
    diff: &CoinOutputDiff,
    direction: DiffDirection,
    strictness: Strictness,
    journal: &mut Journal,
) -> Result<DiffOutcome, WalletError> {
    let address = diff.output.unlock_hash;
    let Some(key) = registry.lookup_mut(&address) else {
        return Ok(DiffOutcome::Ignored);
    };

    let outcome = if diff.direction == direction {
        match key.lookup_mut(&diff.id) {
            // Locally built transactions and pool echoes report the same
            // output more than once; an entry is never created twice.
            Some(entry) if entry.is_spendable() => DiffOutcome::Unchanged,
            Some(entry) => {
                entry.set_spendable(true);
                journal.entries.push(Undo::Toggled {
                    address,
                    id: diff.id,
                    was_spendable: false,
                });
                DiffOutcome::Reactivated
            }
            None => {
                key.insert(KnownOutput::new(diff.id, diff.output));
                journal.entries.push(Undo::Created {
                    address,
                    id: diff.id,
                });
                DiffOutcome::Created
            }
        }
    } else {
        match key.lookup_mut(&diff.id) {
            Some(entry) if !entry.is_spendable() => DiffOutcome::Unchanged,
            Some(entry) => {
                entry.set_spendable(false);
                journal.entries.push(Undo::Toggled {
                    address,
                    id: diff.id,
                    was_spendable: true,
                });
                DiffOutcome::Deactivated
            }
            None => match strictness {
                Strictness::Strict => {
                    tracing::error!(
                        address = %address,
                        id = %diff.id,
                        pass = direction.as_str(),
                        "revert of unknown output; aborting update"
                    );
                    return Err(WalletError::UnknownOutput { address, id: diff.id });
                }
                Strictness::Lenient => {
                    tracing::warn!(
                        address = %address,
                        id = %diff.id,
                        pass = direction.as_str(),
                        "revert of unknown output ignored"
                    );
                    DiffOutcome::MissingIgnored
                }
            },
        }
    };

    tracing::trace!(
        address = %address,
        id = %diff.id,
        diff = diff.direction.as_str(),
        pass = direction.as_str(),
        outcome = outcome.as_str(),
        "diff applied"
    );
    Ok(outcome)
}
