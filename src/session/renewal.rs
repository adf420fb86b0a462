use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::utils::{TimeUtils, duration_until_ms, lock};

/// Time to wait before renewing a token expiring at `exp_secs`, renewing `lead` early.
///
/// `None` when `exp - lead` is not strictly in the future: nothing is scheduled and the
/// caller renews on next use.
pub fn renewal_delay(exp_secs: i64, now_ms: i64, lead: Duration) -> Option<Duration> {
    let fire_at_ms = exp_secs
        .saturating_mul(TimeUtils::MS_IN_S)
        .saturating_sub(lead.as_millis() as i64);
    duration_until_ms(fire_at_ms, now_ms)
}

/// Holds at most one pending renewal.
#[derive(Default)]
pub(crate) struct RenewalTimer {
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl RenewalTimer {
    /// Run `job` after `delay`, replacing whatever was pending.
    pub(crate) fn arm<F>(&self, delay: Duration, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Detached so that re-arming from inside `job` cannot abort the job itself.
            tokio::spawn(job);
        });
        if let Some(previous) = lock(&self.pending).replace(handle) {
            previous.abort();
        }
    }

    pub(crate) fn cancel(&self) -> bool {
        match lock(&self.pending).take() {
            Some(handle) => {
                let was_pending = !handle.is_finished();
                handle.abort();
                was_pending
            }
            None => false,
        }
    }

    pub(crate) fn is_armed(&self) -> bool {
        lock(&self.pending)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for RenewalTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
