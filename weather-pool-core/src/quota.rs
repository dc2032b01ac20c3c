//! Per-provider request counters with a rolling hourly reset.
//!
//! Usage is incremented after a successful fetch, not reserved before it, so
//! concurrent requests may briefly push a provider past its quota. Each
//! window's check-and-reset runs under the provider's lock, which keeps
//! increments from being lost to a concurrent reset.

use std::{sync::Arc, time::Duration};

use parking_lot::Mutex;
use tokio::{
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};

use crate::{provider::ProviderDescriptor, registry::ProviderRegistry};

pub const DEFAULT_QUOTA_WINDOW: Duration = Duration::from_secs(3600);

#[derive(Debug)]
pub struct QuotaWindow {
    limit: u64,
    state: Mutex<WindowState>,
}

#[derive(Debug)]
struct WindowState {
    usage: u64,
    last_reset: Instant,
}

impl QuotaWindow {
    pub fn new(limit: u64, now: Instant) -> Self {
        Self { limit, state: Mutex::new(WindowState { usage: 0, last_reset: now }) }
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn usage(&self) -> u64 {
        self.state.lock().usage
    }

    pub fn last_reset(&self) -> Instant {
        self.state.lock().last_reset
    }

    pub fn is_under_quota(&self) -> bool {
        self.state.lock().usage < self.limit
    }

    pub fn record_use(&self) {
        let mut state = self.state.lock();
        state.usage = state.usage.saturating_add(1);
    }

    /// Zeroes usage if at least `window` has passed since the last reset.
    /// Returns whether a reset happened.
    pub fn reset_if_due(&self, now: Instant, window: Duration) -> bool {
        let mut state = self.state.lock();
        if now.saturating_duration_since(state.last_reset) >= window {
            state.usage = 0;
            state.last_reset = now;
            true
        } else {
            false
        }
    }
}

/// Quota bookkeeping over every provider in a registry.
#[derive(Debug, Clone)]
pub struct QuotaTracker {
    registry: Arc<ProviderRegistry>,
    window: Duration,
}

impl QuotaTracker {
    pub fn new(registry: Arc<ProviderRegistry>, window: Duration) -> Self {
        Self { registry, window }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn is_under_quota(&self, provider: &ProviderDescriptor) -> bool {
        provider.quota.is_under_quota()
    }

    /// Counts one request against `name`. Unknown names are ignored.
    pub fn record_use(&self, name: &str) {
        if let Some(provider) = self.registry.get(name) {
            provider.quota.record_use();
            tracing::trace!(
                provider = name,
                usage = provider.usage(),
                quota = provider.hourly_quota(),
                "recorded use"
            );
        }
    }

    pub fn reset_if_due(&self, provider: &ProviderDescriptor, now: Instant) -> bool {
        provider.quota.reset_if_due(now, self.window)
    }

    /// Runs `reset_if_due` for every registered provider; returns how many reset.
    pub fn sweep(&self, now: Instant) -> usize {
        let mut reset = 0;
        for provider in self.registry.iter() {
            if self.reset_if_due(provider, now) {
                tracing::debug!(provider = provider.name(), "quota window reset");
                reset += 1;
            }
        }
        reset
    }

    /// Spawns the periodic sweep. The first tick is one full window from now
    /// and missed ticks are delayed rather than bunched together.
    pub fn spawn_reset_task(&self) -> JoinHandle<()> {
        let tracker = self.clone();
        tokio::spawn(async move {
            let start = Instant::now() + tracker.window;
            let mut ticker = tokio::time::interval_at(start, tracker.window);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                let now = ticker.tick().await;
                tracker.sweep(now);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderKind;

    fn registry(quota: u64, now: Instant) -> Arc<ProviderRegistry> {
        Arc::new(ProviderRegistry::from_descriptors(vec![
            ProviderDescriptor::new("a", ProviderKind::Metno, "http://a", None, quota, now),
            ProviderDescriptor::new("b", ProviderKind::WeatherApi, "http://b", None, quota, now),
        ]))
    }

    #[test]
    fn usage_never_exceeds_quota_when_gated_by_eligibility() {
        let now = Instant::now();
        let reg = registry(3, now);
        let tracker = QuotaTracker::new(reg.clone(), DEFAULT_QUOTA_WINDOW);
        let a = reg.get("a").expect("registered");

        for _ in 0..10 {
            if tracker.is_under_quota(a) {
                tracker.record_use("a");
            }
        }
        assert_eq!(a.usage(), 3);
        assert!(!tracker.is_under_quota(a));
    }

    #[test]
    fn record_use_on_unknown_provider_is_a_no_op() {
        let reg = registry(3, Instant::now());
        let tracker = QuotaTracker::new(reg.clone(), DEFAULT_QUOTA_WINDOW);
        tracker.record_use("nope");
        assert!(reg.iter().all(|p| p.usage() == 0));
    }

    #[test]
    fn reset_only_after_full_window() {
        let start = Instant::now();
        let reg = registry(1, start);
        let tracker = QuotaTracker::new(reg.clone(), DEFAULT_QUOTA_WINDOW);
        let a = reg.get("a").expect("registered");

        tracker.record_use("a");
        assert!(!tracker.reset_if_due(a, start + Duration::from_secs(3599)));
        assert_eq!(a.usage(), 1);

        let later = start + Duration::from_secs(3600);
        assert!(tracker.reset_if_due(a, later));
        assert_eq!(a.usage(), 0);
        assert_eq!(a.quota.last_reset(), later);

        // The window restarts from the reset, not from the first start.
        tracker.record_use("a");
        assert!(!tracker.reset_if_due(a, later + Duration::from_secs(1800)));
        assert_eq!(a.usage(), 1);
    }

    #[test]
    fn sweep_visits_every_provider() {
        let start = Instant::now();
        let reg = registry(5, start);
        let tracker = QuotaTracker::new(reg.clone(), DEFAULT_QUOTA_WINDOW);
        tracker.record_use("a");
        tracker.record_use("b");

        assert_eq!(tracker.sweep(start + DEFAULT_QUOTA_WINDOW), 2);
        assert!(reg.iter().all(|p| p.usage() == 0));
    }

    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn background_task_resets_each_window() {
        let reg = registry(2, Instant::now());
        let tracker = QuotaTracker::new(reg.clone(), DEFAULT_QUOTA_WINDOW);
        let task = tracker.spawn_reset_task();
        settle().await;

        tracker.record_use("a");
        tracker.record_use("a");
        assert_eq!(reg.get("a").map(|p| p.usage()), Some(2));

        tokio::time::advance(Duration::from_secs(3599)).await;
        settle().await;
        assert_eq!(reg.get("a").map(|p| p.usage()), Some(2));

        tokio::time::advance(Duration::from_secs(1)).await;
        settle().await;
        assert_eq!(reg.get("a").map(|p| p.usage()), Some(0));

        task.abort();
    }
}
