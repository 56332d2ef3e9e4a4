use core::future::Future;

use rangeid::{CounterStore, MemoryCounterStore, RedisCounterStore, StoreError};

use crate::server::config::{ServerConfig, StoreKind};

/// The counter store selected at startup.
#[derive(Debug)]
pub enum BackingStore {
    Memory(MemoryCounterStore),
    Redis(RedisCounterStore),
}

impl BackingStore {
    pub fn from_config(config: &ServerConfig) -> Self {
        match config.store {
            StoreKind::Memory => Self::Memory(MemoryCounterStore::new()),
            StoreKind::Redis => Self::Redis(RedisCounterStore::new(config.redis.clone())),
        }
    }

    pub const fn kind(&self) -> StoreKind {
        match self {
            Self::Memory(_) => StoreKind::Memory,
            Self::Redis(_) => StoreKind::Redis,
        }
    }
}

impl CounterStore for BackingStore {
    fn increment(
        &self,
        key: &str,
        delta: u64,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send {
        async move {
            match self {
                Self::Memory(store) => store.increment(key, delta).await,
                Self::Redis(store) => store.increment(key, delta).await,
            }
        }
    }
}
