use std::path::Path;

use sled::Tree;
use tracing::{debug, info};

use super::{PoolStore, StoreResult};
use crate::amm::MarketPool;

const POOLS_TREE: &str = "pools";

/// Snapshots kept in a sled tree, one JSON document per market id
pub struct SledStore {
    db: sled::Db,
    tree: Tree,
}

impl SledStore {
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let db = sled::open(path.as_ref())?;
        info!(path = %path.as_ref().display(), "pool store opened");
        Self::from_db(db)
    }

    /// Store backed by a temporary database, removed on drop
    pub fn temporary() -> StoreResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: sled::Db) -> StoreResult<Self> {
        let tree = db.open_tree(POOLS_TREE)?;
        Ok(Self { db, tree })
    }

    /// Block until pending writes reach disk
    pub fn flush(&self) -> StoreResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

impl PoolStore for SledStore {
    fn save(&self, market_id: &str, pool: &MarketPool) -> StoreResult<()> {
        let bytes = serde_json::to_vec(pool)?;
        self.tree.insert(market_id.as_bytes(), bytes)?;
        debug!(market_id, model = pool.model_name(), "snapshot saved");
        Ok(())
    }

    fn load(&self, market_id: &str) -> StoreResult<Option<MarketPool>> {
        match self.tree.get(market_id.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn remove(&self, market_id: &str) -> StoreResult<Option<MarketPool>> {
        match self.tree.remove(market_id.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn ids(&self) -> StoreResult<Vec<String>> {
        // sled iterates keys in byte order, which is ascending for UTF-8 ids
        self.tree
            .iter()
            .keys()
            .map(|key| -> StoreResult<String> { Ok(String::from_utf8_lossy(&key?).into_owned()) })
            .collect()
    }
}
