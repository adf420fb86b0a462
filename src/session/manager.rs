use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::{Mutex as AsyncMutex, broadcast, watch};

use super::claims::decode_claims;
use super::error::{AuthError, SESSION_EXPIRED_MESSAGE};
use super::provider::{SessionHandle, SessionProvider};
use super::renewal::{RenewalTimer, renewal_delay};
use super::state::{SessionEvent, SessionState};
use crate::api::{ApiClient, ApiError};
use crate::data::StorageKey;
use crate::domain::{Credentials, RegisterRequest, Theme, TokenPair, UserProfile};
use crate::utils::{now_timestamp_ms, redact_token};

#[cfg(debug_assertions)]
use crate::{config::DF, utils::format_duration};

const EVENT_CAPACITY: usize = 16;

/// Owns the access/refresh tokens for the lifetime of the process and keeps the access
/// token fresh.
///
/// Cheap to clone; clones drive the same session.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    api: ApiClient,
    handle: Arc<SessionHandle>,
    renewal_lead: Duration,
    timer: RenewalTimer,
    /// Bumped whenever the session is replaced or cleared; in-flight work from an older
    /// generation discards its result.
    generation: AtomicU64,
    /// Serialises renewals so concurrent callers share one refresh round-trip.
    renew_lock: AsyncMutex<()>,
    state_tx: watch::Sender<SessionState>,
    events_tx: broadcast::Sender<SessionEvent>,
}

impl SessionManager {
    pub fn new(api: ApiClient, handle: Arc<SessionHandle>, renewal_lead: Duration) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Anonymous);
        let (events_tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(SessionInner {
                api,
                handle,
                renewal_lead,
                timer: RenewalTimer::default(),
                generation: AtomicU64::new(0),
                renew_lock: AsyncMutex::new(()),
                state_tx,
                events_tx,
            }),
        }
    }

    // --- observation ---

    pub fn state(&self) -> SessionState {
        self.inner.state_tx.borrow().clone()
    }

    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.inner.state_tx.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events_tx.subscribe()
    }

    pub fn current_user(&self) -> Option<UserProfile> {
        self.state().user().cloned()
    }

    /// The injectable view of the current credential.
    pub fn provider(&self) -> Arc<dyn SessionProvider> {
        self.inner.handle.clone()
    }

    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    /// `exp` claim of the current access token, in epoch seconds.
    pub fn access_expiry(&self) -> Option<i64> {
        let token = self.inner.handle.access_token()?;
        decode_claims(&token).ok().map(|claims| claims.exp)
    }

    pub fn renewal_scheduled(&self) -> bool {
        self.inner.timer.is_armed()
    }

    // --- scoped lifetime ---

    /// Acquire: restore any persisted session.
    pub async fn start(&self) -> SessionState {
        self.restore_from_storage().await
    }

    /// Release: cancel the renewal timer. Credentials stay persisted for the next start.
    pub fn stop(&self) {
        self.inner.timer.cancel();
    }

    // --- operations ---

    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile, AuthError> {
        let credentials = Credentials::new(email, password);
        credentials.validate()?;

        let previous = self.state();
        self.set_state(SessionState::Authenticating);

        match self.sign_in(&credentials).await {
            Ok(user) => Ok(user),
            Err(e) => {
                log::warn!("Login failed for {}: {}", credentials.email, e);
                self.restore_state_after_failure(previous);
                Err(e)
            }
        }
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<UserProfile, AuthError> {
        request.validate()?;

        let previous = self.state();
        self.set_state(SessionState::Authenticating);

        let result = match self.inner.api.register(request).await {
            Ok(()) => self.sign_in(&request.credentials()).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = &result {
            log::warn!("Registration failed for {}: {}", request.email, e);
            self.restore_state_after_failure(previous);
        }
        result
    }

    /// Run once at startup. A stored token is trusted only after `/auth/me` accepts it;
    /// anything else is treated as logged out and wiped.
    pub async fn restore_from_storage(&self) -> SessionState {
        let Some(access_token) = self.inner.handle.load_persisted() else {
            self.inner.handle.clear();
            self.set_state(SessionState::Anonymous);
            return self.state();
        };

        self.set_state(SessionState::Authenticating);
        let generation = self.generation();

        let result = self.inner.api.current_user().await;
        if generation != self.generation() {
            // A login or logout overtook the restore.
            return self.state();
        }

        match result {
            Ok(user) => {
                #[cfg(debug_assertions)]
                if DF.log_session {
                    log::info!("Restored session for {}", user.email);
                }
                self.inner.handle.cache_user(&user);
                self.schedule_renewal(&access_token);
                self.set_state(SessionState::Authenticated {
                    user,
                    renewal_pending: false,
                });
                if let Err(e) = self.renew_if_due().await {
                    log::info!("Restored session could not be renewed: {}", e);
                }
            }
            Err(e) => {
                log::info!("Stored session rejected ({}); starting signed out", e);
                self.clear_local();
            }
        }
        self.state()
    }

    /// Arm the renewal timer for `access_token`. Returns whether a renewal was scheduled.
    ///
    /// Any earlier renewal is cancelled first. Nothing is armed when the token is already
    /// inside the renewal lead window; the next caller must renew on use.
    pub fn schedule_renewal(&self, access_token: &str) -> bool {
        self.inner.timer.cancel();

        let claims = match decode_claims(access_token) {
            Ok(claims) => claims,
            Err(e) => {
                log::warn!(
                    "Cannot schedule renewal for {}: {}",
                    redact_token(access_token),
                    e
                );
                return false;
            }
        };

        let now_ms = now_timestamp_ms();
        let Some(delay) = renewal_delay(claims.exp, now_ms, self.inner.renewal_lead) else {
            #[cfg(debug_assertions)]
            if DF.log_renewal {
                log::info!("Access token is inside the renewal window; not scheduling");
            }
            return false;
        };

        #[cfg(debug_assertions)]
        if DF.log_renewal {
            log::info!(
                "Renewal scheduled in {} (token expires in {})",
                format_duration(delay.as_millis() as i64),
                format_duration(claims.expires_at_ms() - now_ms)
            );
        }

        let weak: Weak<SessionInner> = Arc::downgrade(&self.inner);
        self.inner.timer.arm(delay, async move {
            if let Some(inner) = weak.upgrade() {
                let manager = SessionManager { inner };
                if let Err(e) = manager.renew().await {
                    log::debug!("Scheduled renewal ended without a new token: {}", e);
                }
            }
        });
        true
    }

    /// Exchange the refresh token for a new access token.
    ///
    /// Single-flight: a caller arriving while another renewal runs waits for it and
    /// reuses its outcome. Failure ends the session and emits [`SessionEvent::Expired`]
    /// exactly once.
    pub async fn renew(&self) -> Result<(), AuthError> {
        let token_before = self.inner.handle.access_token();
        let _guard = self.inner.renew_lock.lock().await;

        let Some(refresh_token) = self.inner.handle.refresh_token() else {
            // Already signed out, possibly by the renewal we just waited for.
            return Err(AuthError::NoSession);
        };
        let token_now = self.inner.handle.access_token();
        if token_now.is_some() && token_now != token_before {
            return Ok(());
        }

        let generation = self.generation();
        self.set_renewal_pending(true);

        let result = self.inner.api.refresh(&refresh_token).await;

        if generation != self.generation() {
            #[cfg(debug_assertions)]
            if DF.log_renewal {
                log::info!("Discarding renewal result: session changed while it was in flight");
            }
            return Err(AuthError::NoSession);
        }

        match result {
            Ok(pair) => {
                // Only the access token is replaced; the refresh token is retained.
                self.inner.handle.replace_access_token(&pair.access_token);
                self.schedule_renewal(&pair.access_token);
                self.set_renewal_pending(false);
                #[cfg(debug_assertions)]
                if DF.log_renewal {
                    log::info!("Access token renewed: {}", redact_token(&pair.access_token));
                }
                let _ = self.inner.events_tx.send(SessionEvent::Renewed);
                Ok(())
            }
            Err(e) => {
                log::warn!("Token renewal failed ({}); signing out", e);
                self.clear_local();
                let _ = self.inner.events_tx.send(SessionEvent::Expired {
                    message: SESSION_EXPIRED_MESSAGE.to_string(),
                });
                Err(AuthError::Expired)
            }
        }
    }

    /// Best-effort server logout, then an unconditional local sign-out. Idempotent.
    pub async fn logout(&self) {
        if self.inner.handle.has_credentials() {
            if let Err(e) = self.inner.api.logout().await {
                log::debug!("Server-side logout failed (ignored): {}", e);
            }
        }
        self.clear_local();

        #[cfg(debug_assertions)]
        if DF.log_session {
            log::info!("Signed out");
        }
        let _ = self.inner.events_tx.send(SessionEvent::SignedOut);
    }

    /// Run `op`; if it fails with 401, renew once and retry.
    ///
    /// The API client never refreshes on its own. Callers that want the
    /// refresh-and-retry behaviour opt in here. A token already inside the renewal lead
    /// window is renewed before `op` runs.
    pub async fn authorized<T, F, Fut>(&self, op: F) -> Result<T, AuthError>
    where
        F: Fn(ApiClient) -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        self.renew_if_due().await?;
        match op(self.inner.api.clone()).await {
            Err(e) if e.is_unauthorized() => {
                self.renew().await?;
                op(self.inner.api.clone()).await.map_err(AuthError::from)
            }
            other => other.map_err(AuthError::from),
        }
    }

    // --- preferences ---

    pub fn theme(&self) -> Theme {
        self.inner
            .handle
            .store()
            .get(StorageKey::Theme)
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default()
    }

    pub fn set_theme(&self, theme: Theme) {
        if let Err(e) = self
            .inner
            .handle
            .store()
            .set(StorageKey::Theme, &theme.to_string())
        {
            log::warn!("Could not persist theme preference: {}", e);
        }
    }

    // --- internals ---

    async fn sign_in(&self, credentials: &Credentials) -> Result<UserProfile, AuthError> {
        let pair = self.inner.api.login(credentials).await?;
        // Validate the new token before it replaces anything.
        let user = self.inner.api.current_user_with(&pair.access_token).await?;
        self.establish(&pair, user.clone());
        self.renew_if_due().await?;
        Ok(user)
    }

    /// Renew now when the access token can be decoded and is already inside the lead
    /// window. No-op without a refresh token or a readable expiry.
    async fn renew_if_due(&self) -> Result<(), AuthError> {
        if self.inner.handle.refresh_token().is_none() {
            return Ok(());
        }
        let Some(exp) = self.access_expiry() else {
            return Ok(());
        };
        if renewal_delay(exp, now_timestamp_ms(), self.inner.renewal_lead).is_some() {
            return Ok(());
        }
        #[cfg(debug_assertions)]
        if DF.log_renewal {
            log::info!("Access token is inside the renewal window; renewing before use");
        }
        self.renew().await
    }

    fn restore_state_after_failure(&self, previous: SessionState) {
        // A renewal failure during sign-in has already signed out.
        if self.state() == SessionState::Authenticating {
            self.set_state(previous);
        }
    }

    fn establish(&self, pair: &TokenPair, user: UserProfile) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        self.inner.handle.set_tokens(pair);
        self.inner.handle.cache_user(&user);
        self.schedule_renewal(&pair.access_token);

        #[cfg(debug_assertions)]
        if DF.log_session {
            log::info!("Signed in as {}", user);
        }
        self.set_state(SessionState::Authenticated {
            user: user.clone(),
            renewal_pending: false,
        });
        let _ = self.inner.events_tx.send(SessionEvent::SignedIn(user));
    }

    fn clear_local(&self) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        self.inner.timer.cancel();
        self.inner.handle.clear();
        self.set_state(SessionState::Anonymous);
    }

    fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::SeqCst)
    }

    fn set_state(&self, state: SessionState) {
        self.inner.state_tx.send_replace(state);
    }

    fn set_renewal_pending(&self, pending: bool) {
        self.inner.state_tx.send_if_modified(|state| match state {
            SessionState::Authenticated {
                renewal_pending, ..
            } if *renewal_pending != pending => {
                *renewal_pending = pending;
                true
            }
            _ => false,
        });
    }
}
