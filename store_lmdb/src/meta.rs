//! LMDB implementation of MetaStore.

use agora_store::{MetaStore, StoreError};

use crate::store::{decode_u64, LmdbGovernanceStore};
use crate::LmdbError;

const SCHEMA_VERSION_KEY: &[u8] = b"schema_version";
const SEQUENCE_PREFIX: &str = "seq:";

impl MetaStore for LmdbGovernanceStore {
    fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.meta_db
            .put(&mut wtxn, key.as_bytes(), value)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get_meta(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .meta_db
            .get(&rtxn, key.as_bytes())
            .map_err(LmdbError::from)?;
        Ok(val.map(<[u8]>::to_vec))
    }

    fn next_sequence(&self, name: &str) -> Result<u64, StoreError> {
        let key = format!("{SEQUENCE_PREFIX}{name}");
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let current = match self
            .meta_db
            .get(&wtxn, key.as_bytes())
            .map_err(LmdbError::from)?
        {
            Some(bytes) => decode_u64(bytes, &key)?,
            None => 0,
        };
        let next = current + 1;
        self.meta_db
            .put(&mut wtxn, key.as_bytes(), &next.to_be_bytes())
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(next)
    }

    fn get_schema_version(&self) -> Result<u32, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .meta_db
            .get(&rtxn, SCHEMA_VERSION_KEY)
            .map_err(LmdbError::from)?;
        match val {
            Some(bytes) => {
                let arr: [u8; 4] = bytes.try_into().map_err(|_| {
                    LmdbError::Malformed(
                        "schema_version has unexpected byte length".to_string(),
                    )
                })?;
                Ok(u32::from_le_bytes(arr))
            }
            None => Ok(0),
        }
    }

    fn set_schema_version(&self, version: u32) -> Result<(), StoreError> {
        let bytes = version.to_le_bytes();
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.meta_db
            .put(&mut wtxn, SCHEMA_VERSION_KEY, &bytes)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }
}
