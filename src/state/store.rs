//! Key-value store abstraction with staged writes
//!
//! `CacheStore` buffers writes over a parent store and merges them only on
//! `commit`. Overlays nest: a cache over a cache commits into the outer
//! cache, which itself may still be discarded.

use super::manager::StateManager;

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::ops::Bound;

/// Ordered byte-keyed store
pub trait KvStore {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;

    fn set(&mut self, key: &[u8], value: Vec<u8>);

    fn delete(&mut self, key: &[u8]);

    /// Entries whose key starts with `prefix`, in key order
    fn prefix_scan(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)>;

    fn has(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }
}

/// In-memory durable store
#[derive(Debug, Clone, Default)]
pub struct MemStore {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KvStore for MemStore {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &[u8], value: Vec<u8>) {
        self.entries.insert(key.to_vec(), value);
    }

    fn delete(&mut self, key: &[u8]) {
        self.entries.remove(key);
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.entries
            .range::<[u8], _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// Copy-on-write overlay buffering writes until `commit`
pub struct CacheStore<'a> {
    parent: &'a mut dyn KvStore,
    /// `None` marks a deletion
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl<'a> CacheStore<'a> {
    pub fn new(parent: &'a mut dyn KvStore) -> Self {
        Self {
            parent,
            writes: BTreeMap::new(),
        }
    }

    /// Number of buffered writes and deletions
    pub fn pending_writes(&self) -> usize {
        self.writes.len()
    }

    /// Merge buffered writes into the parent store
    pub fn commit(self) {
        for (key, value) in self.writes {
            match value {
                Some(value) => self.parent.set(&key, value),
                None => self.parent.delete(&key),
            }
        }
    }

    /// Drop buffered writes; the parent is left untouched
    pub fn discard(self) {}
}

impl KvStore for CacheStore<'_> {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        match self.writes.get(key) {
            Some(value) => value.clone(),
            None => self.parent.get(key),
        }
    }

    fn set(&mut self, key: &[u8], value: Vec<u8>) {
        self.writes.insert(key.to_vec(), Some(value));
    }

    fn delete(&mut self, key: &[u8]) {
        self.writes.insert(key.to_vec(), None);
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> =
            self.parent.prefix_scan(prefix).into_iter().collect();

        let overlay = self
            .writes
            .range::<[u8], _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(|(k, _)| k.starts_with(prefix));
        for (key, value) in overlay {
            match value {
                Some(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }

        merged.into_iter().collect()
    }
}

/// Height and time of the block being executed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockInfo {
    pub height: u64,
    pub time: DateTime<Utc>,
}

impl BlockInfo {
    pub fn new(height: u64, time: DateTime<Utc>) -> Self {
        Self { height, time }
    }
}

/// Execution context: the store visible to the current step plus block info
pub struct Context<'a> {
    store: &'a mut dyn KvStore,
    block: BlockInfo,
}

impl<'a> Context<'a> {
    pub fn new(store: &'a mut dyn KvStore, block: BlockInfo) -> Self {
        Self { store, block }
    }

    pub fn block(&self) -> &BlockInfo {
        &self.block
    }

    pub fn block_height(&self) -> u64 {
        self.block.height
    }

    /// Unix timestamp of the block, in seconds
    pub fn timestamp(&self) -> i64 {
        self.block.time.timestamp()
    }

    pub fn store(&self) -> &dyn KvStore {
        &*self.store
    }

    pub fn store_mut(&mut self) -> &mut dyn KvStore {
        &mut *self.store
    }

    /// Typed access to the orchestration records
    pub fn state(&mut self) -> StateManager<'_> {
        StateManager::new(&mut *self.store)
    }
}

/// Run `f` against a scratch overlay of `ctx`.
/// Writes made by `f` reach `ctx` only when it returns `Ok`.
pub fn with_cache<T, E>(
    ctx: &mut Context<'_>,
    f: impl FnOnce(&mut Context<'_>) -> Result<T, E>,
) -> Result<T, E> {
    let block = ctx.block.clone();
    let mut cache = CacheStore::new(&mut *ctx.store);
    let result = f(&mut Context::new(&mut cache, block));
    if result.is_ok() {
        cache.commit();
    }
    result
}
