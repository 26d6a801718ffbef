// # Pinger Trait
//
// Defines the interface for the single-packet liveness probe.
//
// ## Purpose
//
// Reachability is an advisory signal, not a correctness-critical one. The
// probe returns a bare boolean: absence of a response is indistinguishable
// from failure to send, so there is no error channel here at all.
//
// ## Implementations
//
// - `leasebook-system::SystemPinger`: shells out to `ping -c 1 -W <secs>`
// - Scripted fakes in the core contract tests

use std::net::Ipv4Addr;
use std::time::Duration;

use async_trait::async_trait;

/// Trait for liveness probe implementations
#[async_trait]
pub trait Pinger: Send + Sync {
    /// Probe an address once, waiting at most `timeout` for a reply.
    ///
    /// `false` covers every failure mode: no reply, no route, probe error.
    async fn ping(&self, address: Ipv4Addr, timeout: Duration) -> bool;
}
