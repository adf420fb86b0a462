use std::sync::{Arc, RwLock};

use crate::data::{StorageKey, TokenStore};
use crate::domain::{TokenPair, UserProfile};
use crate::utils::{read, write};

/// The one piece of shared mutable state: the current credential.
///
/// Injected into the API client and the stream clients. Readers must call
/// `access_token` at send time rather than holding on to an earlier value.
pub trait SessionProvider: Send + Sync {
    fn access_token(&self) -> Option<String>;

    /// Forget the access token after the backend rejected it. The refresh token is kept.
    fn evict_access_token(&self);
}

#[derive(Debug, Default, Clone)]
struct Tokens {
    access: Option<String>,
    refresh: Option<String>,
}

/// In-memory credentials mirrored to a durable [`TokenStore`].
///
/// Memory is authoritative; store write failures are logged and otherwise ignored.
pub struct SessionHandle {
    tokens: RwLock<Tokens>,
    store: Arc<dyn TokenStore>,
}

impl SessionHandle {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self {
            tokens: RwLock::new(Tokens::default()),
            store,
        }
    }

    /// Load persisted tokens into memory. Returns the access token, if one was stored.
    pub fn load_persisted(&self) -> Option<String> {
        let loaded = Tokens {
            access: self.store.get(StorageKey::AccessToken),
            refresh: self.store.get(StorageKey::RefreshToken),
        };
        let access = loaded.access.clone();
        *write(&self.tokens) = loaded;
        access
    }

    pub fn refresh_token(&self) -> Option<String> {
        read(&self.tokens).refresh.clone()
    }

    pub fn has_credentials(&self) -> bool {
        let tokens = read(&self.tokens);
        tokens.access.is_some() || tokens.refresh.is_some()
    }

    /// Install a freshly issued pair. A missing refresh token keeps the current one.
    pub fn set_tokens(&self, pair: &TokenPair) {
        {
            let mut tokens = write(&self.tokens);
            tokens.access = Some(pair.access_token.clone());
            if let Some(refresh) = &pair.refresh_token {
                tokens.refresh = Some(refresh.clone());
            }
        }
        self.persist(StorageKey::AccessToken, Some(&pair.access_token));
        if let Some(refresh) = &pair.refresh_token {
            self.persist(StorageKey::RefreshToken, Some(refresh));
        }
    }

    pub fn replace_access_token(&self, access_token: &str) {
        write(&self.tokens).access = Some(access_token.to_string());
        self.persist(StorageKey::AccessToken, Some(access_token));
    }

    pub fn cache_user(&self, user: &UserProfile) {
        match serde_json::to_string(user) {
            Ok(json) => self.persist(StorageKey::User, Some(&json)),
            Err(e) => log::warn!("Could not serialise user profile for caching: {}", e),
        }
    }

    /// Drop every credential and the cached profile, in memory and on disk.
    pub fn clear(&self) {
        *write(&self.tokens) = Tokens::default();
        if let Err(e) = self.store.clear_session() {
            log::warn!("Could not clear persisted session: {}", e);
        }
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    fn persist(&self, key: StorageKey, value: Option<&str>) {
        let result = match value {
            Some(value) => self.store.set(key, value),
            None => self.store.remove(key),
        };
        if let Err(e) = result {
            log::warn!("Could not persist {}: {}", key.name(), e);
        }
    }
}

impl SessionProvider for SessionHandle {
    fn access_token(&self) -> Option<String> {
        read(&self.tokens).access.clone()
    }

    fn evict_access_token(&self) {
        write(&self.tokens).access = None;
        self.persist(StorageKey::AccessToken, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MemoryTokenStore;

    fn handle() -> (Arc<MemoryTokenStore>, SessionHandle) {
        let store = Arc::new(MemoryTokenStore::new());
        (store.clone(), SessionHandle::new(store))
    }

    fn pair(access: &str, refresh: Option<&str>) -> TokenPair {
        TokenPair {
            access_token: access.into(),
            refresh_token: refresh.map(str::to_string),
            token_type: "bearer".into(),
        }
    }

    #[test]
    fn tokens_are_mirrored_to_the_store() {
        let (store, handle) = handle();
        handle.set_tokens(&pair("a1", Some("r1")));

        assert_eq!(handle.access_token().as_deref(), Some("a1"));
        assert_eq!(store.get(StorageKey::AccessToken).as_deref(), Some("a1"));
        assert_eq!(store.get(StorageKey::RefreshToken).as_deref(), Some("r1"));
    }

    #[test]
    fn pair_without_refresh_keeps_the_old_one() {
        let (_, handle) = handle();
        handle.set_tokens(&pair("a1", Some("r1")));
        handle.set_tokens(&pair("a2", None));

        assert_eq!(handle.access_token().as_deref(), Some("a2"));
        assert_eq!(handle.refresh_token().as_deref(), Some("r1"));
    }

    #[test]
    fn eviction_only_drops_the_access_token() {
        let (store, handle) = handle();
        handle.set_tokens(&pair("a1", Some("r1")));

        handle.evict_access_token();

        assert_eq!(handle.access_token(), None);
        assert_eq!(store.get(StorageKey::AccessToken), None);
        assert_eq!(handle.refresh_token().as_deref(), Some("r1"));
        assert!(handle.has_credentials());
    }

    #[test]
    fn load_persisted_restores_memory() {
        let (store, handle) = handle();
        store.set(StorageKey::AccessToken, "persisted").unwrap();
        store.set(StorageKey::RefreshToken, "persisted-r").unwrap();

        assert_eq!(handle.load_persisted().as_deref(), Some("persisted"));
        assert_eq!(handle.refresh_token().as_deref(), Some("persisted-r"));
    }
}
