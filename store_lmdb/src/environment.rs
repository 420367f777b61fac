//! LMDB environment setup.

use std::path::{Path, PathBuf};

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use crate::LmdbError;

/// The schema version that the current code writes.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

pub(crate) const SCHEMA_VERSION_KEY: &[u8] = b"schema_version";

const MAX_DBS: u32 = 4;

/// Wraps the LMDB environment and all database handles.
pub struct LmdbEnvironment {
    pub(crate) env: Env,
    /// Unlock hash → bincode `KeyRecord`.
    pub(crate) keys_db: Database<Bytes, Bytes>,
    /// Wallet age, unconfirmed diffs, schema version.
    pub(crate) meta_db: Database<Bytes, Bytes>,
    path: PathBuf,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given directory.
    ///
    /// Creates the directory if needed and refuses to open a database written
    /// by a newer schema version.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;

        // SAFETY: the environment is opened once per directory by this
        // process and the memory map is only accessed through heed.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(MAX_DBS)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let keys_db: Database<Bytes, Bytes> = env.create_database(&mut wtxn, Some("keys"))?;
        let meta_db: Database<Bytes, Bytes> = env.create_database(&mut wtxn, Some("meta"))?;

        let stored = match meta_db.get(&wtxn, SCHEMA_VERSION_KEY)? {
            Some(bytes) => {
                let arr: [u8; 4] = bytes.try_into().map_err(|_| {
                    LmdbError::Serialization("schema_version has unexpected byte length".into())
                })?;
                u32::from_le_bytes(arr)
            }
            None => 0,
        };

        if stored > CURRENT_SCHEMA_VERSION {
            return Err(LmdbError::SchemaTooNew {
                found: stored,
                supported: CURRENT_SCHEMA_VERSION,
            });
        }
        if stored < CURRENT_SCHEMA_VERSION {
            tracing::info!(
                from = stored,
                to = CURRENT_SCHEMA_VERSION,
                "initialising wallet schema"
            );
            meta_db.put(&mut wtxn, SCHEMA_VERSION_KEY, &CURRENT_SCHEMA_VERSION.to_le_bytes())?;
        }
        wtxn.commit()?;

        Ok(Self {
            env,
            keys_db,
            meta_db,
            path: path.to_path_buf(),
        })
    }

    /// Directory the environment lives in.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored schema version.
    pub fn schema_version(&self) -> Result<u32, LmdbError> {
        let rtxn = self.env.read_txn()?;
        match self.meta_db.get(&rtxn, SCHEMA_VERSION_KEY)? {
            Some(bytes) if bytes.len() == 4 => {
                let mut arr = [0u8; 4];
                arr.copy_from_slice(bytes);
                Ok(u32::from_le_bytes(arr))
            }
            Some(_) => Err(LmdbError::Serialization(
                "schema_version has unexpected byte length".into(),
            )),
            None => Err(LmdbError::NotFound("meta key 'schema_version'".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAP_SIZE: usize = 16 * 1024 * 1024;

    #[test]
    fn fresh_environment_records_schema_version() {
        let dir = tempfile::tempdir().unwrap();
        let env = LmdbEnvironment::open(dir.path(), MAP_SIZE).unwrap();
        assert_eq!(env.schema_version().unwrap(), CURRENT_SCHEMA_VERSION);
        assert_eq!(env.path(), dir.path());
    }

    #[test]
    fn open_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        LmdbEnvironment::open(&nested, MAP_SIZE).unwrap();
        assert!(nested.join("data.mdb").exists());
    }

    #[test]
    fn newer_schema_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        {
            let env = LmdbEnvironment::open(dir.path(), MAP_SIZE).unwrap();
            let mut wtxn = env.env.write_txn().unwrap();
            env.meta_db
                .put(&mut wtxn, SCHEMA_VERSION_KEY, &99u32.to_le_bytes())
                .unwrap();
            wtxn.commit().unwrap();
        }
        match LmdbEnvironment::open(dir.path(), MAP_SIZE) {
            Err(LmdbError::SchemaTooNew { found, supported }) => {
                assert_eq!(found, 99);
                assert_eq!(supported, CURRENT_SCHEMA_VERSION);
            }
            other => panic!("expected SchemaTooNew, got {:?}", other.map(|_| ())),
        }
    }
}
