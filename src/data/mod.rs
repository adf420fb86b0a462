mod quota_monitor;
mod storage;

pub use {
    quota_monitor::QuotaMonitor,
    storage::{FileTokenStore, MemoryTokenStore, StorageKey, StoreError, TokenStore},
};
