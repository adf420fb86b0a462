use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::api::{ApiClient, ApiError};
use crate::domain::Quota;
use crate::utils::lock;

#[cfg(debug_assertions)]
use crate::config::DF;

/// Read-only view of the account's usage limits, refreshed on demand or on a fixed period.
///
/// A failed refresh keeps the previous snapshot; the error stays local to the quota view.
#[derive(Clone)]
pub struct QuotaMonitor {
    inner: Arc<QuotaInner>,
}

struct QuotaInner {
    api: ApiClient,
    interval: Duration,
    snapshot_tx: watch::Sender<Option<Quota>>,
    last_error: Mutex<Option<ApiError>>,
    poller: Mutex<Option<JoinHandle<()>>>,
}

impl QuotaMonitor {
    pub fn new(api: ApiClient, interval: Duration) -> Self {
        let (snapshot_tx, _) = watch::channel(None);
        Self {
            inner: Arc::new(QuotaInner {
                api,
                interval,
                snapshot_tx,
                last_error: Mutex::new(None),
                poller: Mutex::new(None),
            }),
        }
    }

    pub fn snapshot(&self) -> Option<Quota> {
        self.inner.snapshot_tx.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<Option<Quota>> {
        self.inner.snapshot_tx.subscribe()
    }

    pub fn last_error(&self) -> Option<ApiError> {
        lock(&self.inner.last_error).clone()
    }

    pub async fn refresh_now(&self) -> Result<Quota, ApiError> {
        self.inner.refresh().await
    }

    /// Poll every interval, starting immediately. Restarting replaces the running poller.
    pub fn start(&self) {
        let weak: Weak<QuotaInner> = Arc::downgrade(&self.inner);
        let period = self.inner.interval;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                // Errors are recorded on the monitor; polling carries on.
                let _ = inner.refresh().await;
            }
        });
        if let Some(previous) = lock(&self.inner.poller).replace(handle) {
            previous.abort();
        }
    }

    pub fn stop(&self) {
        if let Some(handle) = lock(&self.inner.poller).take() {
            handle.abort();
        }
    }

    pub fn is_polling(&self) -> bool {
        lock(&self.inner.poller)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl QuotaInner {
    async fn refresh(&self) -> Result<Quota, ApiError> {
        match self.api.quota().await {
            Ok(quota) => {
                #[cfg(debug_assertions)]
                if DF.log_quota {
                    for (name, usage) in quota.entries() {
                        log::info!("Quota {}: {}", name, usage);
                    }
                }
                if quota.any_exhausted() {
                    log::warn!("A {} plan limit has been reached", quota.tier);
                }
                *lock(&self.last_error) = None;
                self.snapshot_tx.send_replace(Some(quota.clone()));
                Ok(quota)
            }
            Err(e) => {
                log::warn!("Quota refresh failed: {}", e);
                *lock(&self.last_error) = Some(e.clone());
                Err(e)
            }
        }
    }
}

impl Drop for QuotaInner {
    fn drop(&mut self) {
        if let Some(handle) = lock(&self.poller).take() {
            handle.abort();
        }
    }
}
