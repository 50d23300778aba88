// ============================================================================
// Pool Store - where callers keep canonical snapshots
// ============================================================================
//
// The engines never persist anything. A caller that wants to remember the
// latest snapshot of each market injects one of these stores:
//   - MemoryStore: process-local, for tests and single-node demos
//   - SledStore: embedded on-disk tree, snapshots stored as JSON
//
// Ordering of writes is the caller's job. A store only keeps the last
// snapshot saved under each id.
//
// ============================================================================

pub mod activity;
pub mod sled_store;

pub use activity::*;
pub use sled_store::SledStore;

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::debug;

use crate::amm::MarketPool;
use crate::error::StoreError;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Keyed storage for pool snapshots
pub trait PoolStore: Send + Sync {
    fn save(&self, market_id: &str, pool: &MarketPool) -> StoreResult<()>;

    fn load(&self, market_id: &str) -> StoreResult<Option<MarketPool>>;

    /// Returns the removed snapshot, if there was one
    fn remove(&self, market_id: &str) -> StoreResult<Option<MarketPool>>;

    /// Stored market ids in ascending order
    fn ids(&self) -> StoreResult<Vec<String>>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    pools: Mutex<HashMap<String, MarketPool>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PoolStore for MemoryStore {
    fn save(&self, market_id: &str, pool: &MarketPool) -> StoreResult<()> {
        let mut pools = self.pools.lock().map_err(|_| StoreError::Poisoned)?;
        pools.insert(market_id.to_string(), pool.clone());
        debug!(market_id, model = pool.model_name(), "snapshot saved");
        Ok(())
    }

    fn load(&self, market_id: &str) -> StoreResult<Option<MarketPool>> {
        let pools = self.pools.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(pools.get(market_id).cloned())
    }

    fn remove(&self, market_id: &str) -> StoreResult<Option<MarketPool>> {
        let mut pools = self.pools.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(pools.remove(market_id))
    }

    fn ids(&self) -> StoreResult<Vec<String>> {
        let pools = self.pools.lock().map_err(|_| StoreError::Poisoned)?;
        let mut ids: Vec<String> = pools.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}
