//! LMDB implementation of WalletStore.

use cirrus_store::{KeyRecord, StoreError, WalletRecord, WalletStore};
use cirrus_types::CoinOutputDiff;

use crate::{LmdbEnvironment, LmdbError};

const AGE_KEY: &[u8] = b"age";
const UNCONFIRMED_KEY: &[u8] = b"unconfirmed";

/// Wallet store backed by an [`LmdbEnvironment`].
///
/// `save_wallet` rewrites every key record inside one write transaction, so
/// a crash mid-save leaves the previous wallet intact.
pub struct LmdbWalletStore {
    env: LmdbEnvironment,
}

impl LmdbWalletStore {
    pub fn new(env: LmdbEnvironment) -> Self {
        Self { env }
    }

    pub fn environment(&self) -> &LmdbEnvironment {
        &self.env
    }

    fn load(&self) -> Result<Option<WalletRecord>, LmdbError> {
        let rtxn = self.env.env.read_txn()?;

        let age = match self.env.meta_db.get(&rtxn, AGE_KEY)? {
            Some(bytes) => {
                let arr: [u8; 8] = bytes.try_into().map_err(|_| {
                    LmdbError::Serialization("age has unexpected byte length".into())
                })?;
                i64::from_le_bytes(arr)
            }
            None => return Ok(None),
        };

        let unconfirmed_diffs: Vec<CoinOutputDiff> =
            match self.env.meta_db.get(&rtxn, UNCONFIRMED_KEY)? {
                Some(bytes) => bincode::deserialize(bytes)?,
                None => Vec::new(),
            };

        let mut keys = Vec::new();
        for entry in self.env.keys_db.iter(&rtxn)? {
            let (key, value) = entry?;
            let record: KeyRecord = bincode::deserialize(value)?;
            if key != record.unlock_hash.as_bytes() {
                return Err(LmdbError::Serialization(format!(
                    "key record stored under wrong key for {}",
                    record.unlock_hash
                )));
            }
            keys.push(record);
        }

        Ok(Some(WalletRecord {
            age,
            keys,
            unconfirmed_diffs,
        }))
    }

    fn save(&self, record: &WalletRecord) -> Result<(), LmdbError> {
        let mut wtxn = self.env.env.write_txn()?;

        self.env.keys_db.clear(&mut wtxn)?;
        for key in &record.keys {
            let bytes = bincode::serialize(key)?;
            self.env
                .keys_db
                .put(&mut wtxn, key.unlock_hash.as_bytes(), &bytes)?;
        }

        self.env
            .meta_db
            .put(&mut wtxn, AGE_KEY, &record.age.to_le_bytes())?;
        let unconfirmed = bincode::serialize(&record.unconfirmed_diffs)?;
        self.env
            .meta_db
            .put(&mut wtxn, UNCONFIRMED_KEY, &unconfirmed)?;

        wtxn.commit()?;
        tracing::trace!(
            keys = record.keys.len(),
            outputs = record.output_count(),
            "wallet saved"
        );
        Ok(())
    }
}

impl WalletStore for LmdbWalletStore {
    fn load_wallet(&self) -> Result<Option<WalletRecord>, StoreError> {
        Ok(self.load()?)
    }

    fn save_wallet(&self, record: &WalletRecord) -> Result<(), StoreError> {
        Ok(self.save(record)?)
    }
}
