// # Reachability Probe
//
// Concurrent liveness checking with a time-bounded cache.
//
// ## Purpose
//
// Answers "does this address currently respond to a single probe packet?"
// while bounding how often the network is actually touched. Results are
// cached per address for a configurable TTL (default 30 s); batch checks fan
// out onto a bounded number of in-flight probes (default 10) so a large lab
// never floods the link.
//
// ## Cache Behavior
//
// Eviction is passive: an entry past its TTL is simply overwritten by the
// next check. Entries for addresses no longer in the registry linger until
// overwritten or the process restarts, bounded by the set of addresses ever
// probed.
//
// Liveness is advisory. A probe that errors, times out, or has no route all
// collapse to `false`; callers cannot distinguish them and must not try.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{RwLock, Semaphore, mpsc};
use tracing::debug;

use crate::config::ProbeConfig;
use crate::traits::Pinger;

/// One cached observation
#[derive(Debug, Clone, Copy)]
struct LivenessRecord {
    reachable: bool,
    observed_at: Instant,
}

/// Liveness checker with a TTL cache and bounded fan-out
///
/// Cloning is cheap; clones share the cache and the in-flight limit.
#[derive(Clone)]
pub struct ReachabilityProbe {
    pinger: Arc<dyn Pinger>,
    ttl: Duration,
    timeout: Duration,
    cache: Arc<RwLock<HashMap<Ipv4Addr, LivenessRecord>>>,
    limiter: Arc<Semaphore>,
}

impl ReachabilityProbe {
    /// Create a probe over the given pinger implementation
    pub fn new(pinger: Arc<dyn Pinger>, config: &ProbeConfig) -> Self {
        Self {
            pinger,
            ttl: config.cache_ttl(),
            timeout: config.probe_timeout(),
            cache: Arc::new(RwLock::new(HashMap::new())),
            limiter: Arc::new(Semaphore::new(config.max_in_flight.max(1))),
        }
    }

    /// Check one address.
    ///
    /// With `force_refresh` false, a cached observation younger than the TTL
    /// is returned without any I/O. Otherwise a single bounded-timeout probe
    /// is issued and its result cached.
    pub async fn check(&self, address: Ipv4Addr, force_refresh: bool) -> bool {
        if !force_refresh {
            let cache = self.cache.read().await;
            if let Some(record) = cache.get(&address)
                && record.observed_at.elapsed() < self.ttl
            {
                return record.reachable;
            }
        }

        // Acquire only fails on a closed semaphore, and this one never closes.
        let _permit = self.limiter.acquire().await.ok();
        let reachable = self.pinger.ping(address, self.timeout).await;
        debug!(%address, reachable, "probe completed");

        self.cache.write().await.insert(
            address,
            LivenessRecord {
                reachable,
                observed_at: Instant::now(),
            },
        );
        reachable
    }

    /// Probe a batch concurrently, bounded by the in-flight limit.
    ///
    /// The result always has exactly one entry per distinct requested
    /// address; a failed probe yields `false` for that address only.
    pub async fn check_many(&self, addresses: &[Ipv4Addr]) -> HashMap<Ipv4Addr, bool> {
        self.fan_out(addresses, None).await
    }

    /// Like [`check_many`](Self::check_many), but bound the whole batch by a
    /// deadline. Probes still in flight at the deadline are left to finish on
    /// their own probe timeout; their results are discarded and the address
    /// reports `false`.
    pub async fn check_many_within(
        &self,
        addresses: &[Ipv4Addr],
        deadline: Duration,
    ) -> HashMap<Ipv4Addr, bool> {
        self.fan_out(addresses, Some(deadline)).await
    }

    /// Last cached observation for an address, regardless of TTL
    pub async fn last_known(&self, address: Ipv4Addr) -> Option<bool> {
        self.cache
            .read()
            .await
            .get(&address)
            .map(|record| record.reachable)
    }

    /// Snapshot of all cached observations, regardless of TTL.
    ///
    /// This is the join input for reachability-ordered listings.
    pub async fn known_statuses(&self) -> HashMap<Ipv4Addr, bool> {
        self.cache
            .read()
            .await
            .iter()
            .map(|(addr, record)| (*addr, record.reachable))
            .collect()
    }

    async fn fan_out(
        &self,
        addresses: &[Ipv4Addr],
        deadline: Option<Duration>,
    ) -> HashMap<Ipv4Addr, bool> {
        // Seed every requested address with `false` so abandoned or failed
        // probes still produce an entry.
        let mut results: HashMap<Ipv4Addr, bool> =
            addresses.iter().map(|addr| (*addr, false)).collect();
        if results.is_empty() {
            return results;
        }

        let unique: Vec<Ipv4Addr> = results.keys().copied().collect();
        let (tx, mut rx) = mpsc::channel(unique.len());

        for address in unique {
            let probe = self.clone();
            let tx = tx.clone();
            // Detached on purpose: a probe past the deadline is abandoned,
            // not cancelled; its own timeout ends it.
            tokio::spawn(async move {
                let reachable = probe.check(address, true).await;
                let _ = tx.send((address, reachable)).await;
            });
        }
        drop(tx);

        let collect = async {
            while let Some((address, reachable)) = rx.recv().await {
                results.insert(address, reachable);
            }
        };

        match deadline {
            Some(limit) => {
                if tokio::time::timeout(limit, collect).await.is_err() {
                    debug!("batch deadline reached, abandoning in-flight probes");
                }
            }
            None => collect.await,
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Pinger double: scripted reachability, call counting, optional delay,
    /// high-water mark of concurrent calls.
    struct ScriptedPinger {
        reachable: HashMap<Ipv4Addr, bool>,
        delay: Duration,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl ScriptedPinger {
        fn new(reachable: HashMap<Ipv4Addr, bool>) -> Self {
            Self {
                reachable,
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn max_in_flight(&self) -> usize {
            self.max_in_flight.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Pinger for ScriptedPinger {
        async fn ping(&self, address: Ipv4Addr, _timeout: Duration) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.reachable.get(&address).copied().unwrap_or(false)
        }
    }

    fn addr(last: u8) -> Ipv4Addr {
        Ipv4Addr::new(192, 168, 0, last)
    }

    fn config(max_in_flight: usize) -> ProbeConfig {
        ProbeConfig {
            cache_ttl_secs: 30,
            timeout_secs: 1,
            max_in_flight,
        }
    }

    #[tokio::test]
    async fn cached_result_is_reused_within_ttl() {
        let pinger = Arc::new(ScriptedPinger::new(HashMap::from([(addr(1), true)])));
        let probe = ReachabilityProbe::new(pinger.clone(), &config(10));

        assert!(probe.check(addr(1), false).await);
        assert!(probe.check(addr(1), false).await);
        assert_eq!(pinger.calls(), 1);
    }

    #[tokio::test]
    async fn force_refresh_bypasses_cache() {
        let pinger = Arc::new(ScriptedPinger::new(HashMap::from([(addr(1), true)])));
        let probe = ReachabilityProbe::new(pinger.clone(), &config(10));

        probe.check(addr(1), false).await;
        probe.check(addr(1), true).await;
        assert_eq!(pinger.calls(), 2);
    }

    #[tokio::test]
    async fn check_many_yields_one_entry_per_address() {
        let pinger = Arc::new(ScriptedPinger::new(HashMap::from([
            (addr(1), true),
            (addr(2), false),
        ])));
        let probe = ReachabilityProbe::new(pinger.clone(), &config(10));

        let results = probe.check_many(&[addr(1), addr(2), addr(3)]).await;
        assert_eq!(results.len(), 3);
        assert_eq!(results[&addr(1)], true);
        assert_eq!(results[&addr(2)], false);
        assert_eq!(results[&addr(3)], false);
    }

    #[tokio::test]
    async fn check_many_respects_the_in_flight_bound() {
        let pinger = Arc::new(
            ScriptedPinger::new(HashMap::new()).with_delay(Duration::from_millis(20)),
        );
        let probe = ReachabilityProbe::new(pinger.clone(), &config(3));

        let batch: Vec<Ipv4Addr> = (1..=12).map(addr).collect();
        probe.check_many(&batch).await;

        assert_eq!(pinger.calls(), 12);
        assert!(
            pinger.max_in_flight() <= 3,
            "observed {} concurrent probes",
            pinger.max_in_flight()
        );
    }

    #[tokio::test]
    async fn deadline_bounds_the_batch_and_fills_false() {
        // Probes hang far past the deadline; the batch must still return
        // promptly with every address present.
        let pinger = Arc::new(
            ScriptedPinger::new(HashMap::from([(addr(1), true)]))
                .with_delay(Duration::from_secs(30)),
        );
        let probe = ReachabilityProbe::new(pinger, &config(10));

        let started = Instant::now();
        let results = probe
            .check_many_within(&[addr(1), addr(2), addr(3)], Duration::from_millis(50))
            .await;

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(results.len(), 3);
        assert!(results.values().all(|reachable| !reachable));
    }

    #[tokio::test]
    async fn last_known_ignores_ttl_and_unprobed_addresses() {
        let pinger = Arc::new(ScriptedPinger::new(HashMap::from([(addr(1), true)])));
        let probe = ReachabilityProbe::new(pinger, &config(10));

        assert_eq!(probe.last_known(addr(1)).await, None);
        probe.check(addr(1), false).await;
        assert_eq!(probe.last_known(addr(1)).await, Some(true));

        let statuses = probe.known_statuses().await;
        assert_eq!(statuses.get(&addr(1)), Some(&true));
    }
}
