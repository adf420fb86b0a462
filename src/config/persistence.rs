//! Local persistence configuration

/// Names of the persisted values. Every key is stored under `PERSISTENCE.storage_prefix`.
pub struct StorageKeys {
    pub access_token: &'static str,
    pub refresh_token: &'static str,
    pub user: &'static str,
    pub theme: &'static str,
}

/// The Master Persistence Configuration
pub struct PersistenceConfig {
    /// Product namespace prepended to every stored key
    pub storage_prefix: &'static str,
    /// Default path of the on-disk session file
    pub state_path: &'static str,
    pub keys: StorageKeys,
}

pub const PERSISTENCE: PersistenceConfig = PersistenceConfig {
    storage_prefix: "procurelens_",
    state_path: ".procurelens.json",
    keys: StorageKeys {
        access_token: "access_token",
        refresh_token: "refresh_token",
        user: "user",
        theme: "theme",
    },
};

/// Fully-qualified storage key, e.g. `procurelens_access_token`.
pub fn storage_key(name: &str) -> String {
    format!("{}{}", PERSISTENCE.storage_prefix, name)
}
