//! Per-provider enable/disable with timed recovery.
//!
//! A failing provider is disabled for a fixed cool-down. Re-enables are not
//! one task per disable: every disable pushes `(expiry, provider, epoch)`
//! onto a single queue drained by one worker task. The epoch is bumped on
//! each disable, and an expiring entry only re-enables the provider when it
//! belongs to the most recent disable.

use std::{cmp::Reverse, collections::BinaryHeap, sync::Arc, time::Duration};

use parking_lot::Mutex;
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{Instant, sleep_until},
};

use crate::{provider::ProviderDescriptor, registry::ProviderRegistry};

pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(300);

#[derive(Debug)]
pub struct BreakerState {
    inner: Mutex<BreakerInner>,
}

#[derive(Debug)]
struct BreakerInner {
    enabled: bool,
    epoch: u64,
}

impl Default for BreakerState {
    fn default() -> Self {
        Self { inner: Mutex::new(BreakerInner { enabled: true, epoch: 0 }) }
    }
}

impl BreakerState {
    pub fn is_enabled(&self) -> bool {
        self.inner.lock().enabled
    }

    /// Disables and returns the epoch identifying this disable.
    pub(crate) fn trip(&self) -> u64 {
        let mut inner = self.inner.lock();
        inner.enabled = false;
        inner.epoch += 1;
        inner.epoch
    }

    /// Re-enables if no later disable superseded `epoch`.
    pub(crate) fn restore(&self, epoch: u64) -> bool {
        let mut inner = self.inner.lock();
        if inner.epoch == epoch {
            inner.enabled = true;
            true
        } else {
            false
        }
    }
}

type Pending = Reverse<(Instant, String, u64)>;

#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    registry: Arc<ProviderRegistry>,
    cooldown: Duration,
    queue: mpsc::UnboundedSender<Pending>,
}

impl CircuitBreaker {
    /// Creates the breaker and spawns its re-enable worker. The worker exits
    /// once every clone of the breaker is dropped.
    pub fn start(registry: Arc<ProviderRegistry>, cooldown: Duration) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_reenable_queue(registry.clone(), rx));
        (Self { registry, cooldown, queue: tx }, worker)
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn is_enabled(&self, provider: &ProviderDescriptor) -> bool {
        provider.breaker.is_enabled()
    }

    /// Disables `name` now and schedules its re-enable one cool-down later.
    /// Disabling an already disabled provider extends the cool-down: it is
    /// re-enabled one cool-down after the latest disable. Unknown names are
    /// ignored.
    pub fn disable(&self, name: &str) {
        let Some(provider) = self.registry.get(name) else {
            return;
        };

        let epoch = provider.breaker.trip();
        let due = Instant::now() + self.cooldown;
        tracing::warn!(provider = name, cooldown_secs = self.cooldown.as_secs(), "provider disabled");

        if self.queue.send(Reverse((due, name.to_string(), epoch))).is_err() {
            tracing::error!(provider = name, "re-enable queue is closed; provider stays disabled");
        }
    }
}

async fn run_reenable_queue(
    registry: Arc<ProviderRegistry>,
    mut rx: mpsc::UnboundedReceiver<Pending>,
) {
    let mut pending: BinaryHeap<Pending> = BinaryHeap::new();

    loop {
        let next_due = pending.peek().map(|Reverse((due, _, _))| *due);

        tokio::select! {
            msg = rx.recv() => match msg {
                Some(entry) => pending.push(entry),
                None => break,
            },
            _ = sleep_until(next_due.unwrap_or_else(Instant::now)), if next_due.is_some() => {
                let now = Instant::now();
                while let Some(Reverse((due, _, _))) = pending.peek() {
                    if *due > now {
                        break;
                    }
                    let Some(Reverse((_, name, epoch))) = pending.pop() else {
                        break;
                    };
                    if let Some(provider) = registry.get(&name) {
                        if provider.breaker.restore(epoch) {
                            tracing::info!(provider = %name, "provider re-enabled after cool-down");
                        } else {
                            tracing::debug!(provider = %name, "stale re-enable skipped");
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderKind;

    fn registry() -> Arc<ProviderRegistry> {
        let now = Instant::now();
        Arc::new(ProviderRegistry::from_descriptors(vec![
            ProviderDescriptor::new("a", ProviderKind::Metno, "http://a", None, 10, now),
            ProviderDescriptor::new("b", ProviderKind::WeatherApi, "http://b", None, 10, now),
        ]))
    }

    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn restore_ignores_superseded_epochs() {
        let state = BreakerState::default();
        let first = state.trip();
        let second = state.trip();
        assert!(!state.restore(first));
        assert!(!state.is_enabled());
        assert!(state.restore(second));
        assert!(state.is_enabled());
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_until_cooldown_elapses() {
        let reg = registry();
        let (breaker, worker) = CircuitBreaker::start(reg.clone(), DEFAULT_COOLDOWN);
        let a = reg.get("a").expect("registered").clone();

        breaker.disable("a");
        assert!(!breaker.is_enabled(&a));
        assert!(reg.get("b").is_some_and(|b| b.is_enabled()));
        settle().await;

        tokio::time::advance(Duration::from_secs(299)).await;
        settle().await;
        assert!(!breaker.is_enabled(&a));

        tokio::time::advance(Duration::from_secs(1)).await;
        settle().await;
        assert!(breaker.is_enabled(&a));

        worker.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_disable_extends_to_latest_cooldown() {
        let reg = registry();
        let (breaker, worker) = CircuitBreaker::start(reg.clone(), DEFAULT_COOLDOWN);
        let a = reg.get("a").expect("registered").clone();

        breaker.disable("a");
        settle().await;
        tokio::time::advance(Duration::from_secs(200)).await;
        breaker.disable("a");
        settle().await;

        // First cool-down expires here but the second disable is still active.
        tokio::time::advance(Duration::from_secs(100)).await;
        settle().await;
        assert!(!a.is_enabled());

        tokio::time::advance(Duration::from_secs(200)).await;
        settle().await;
        assert!(a.is_enabled());

        worker.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn independent_providers_recover_independently() {
        let reg = registry();
        let (breaker, worker) = CircuitBreaker::start(reg.clone(), Duration::from_secs(10));

        breaker.disable("a");
        settle().await;
        tokio::time::advance(Duration::from_secs(5)).await;
        breaker.disable("b");
        settle().await;

        tokio::time::advance(Duration::from_secs(5)).await;
        settle().await;
        assert!(reg.get("a").is_some_and(|p| p.is_enabled()));
        assert!(reg.get("b").is_some_and(|p| !p.is_enabled()));

        tokio::time::advance(Duration::from_secs(5)).await;
        settle().await;
        assert!(reg.get("b").is_some_and(|p| p.is_enabled()));

        worker.abort();
    }

    #[tokio::test]
    async fn disable_unknown_is_a_no_op() {
        let reg = registry();
        let (breaker, worker) = CircuitBreaker::start(reg.clone(), DEFAULT_COOLDOWN);
        breaker.disable("nope");
        assert!(reg.iter().all(|p| p.is_enabled()));
        worker.abort();
    }
}
