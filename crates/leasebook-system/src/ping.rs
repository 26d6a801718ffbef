// # System Pinger
//
// Liveness probe over the system `ping` binary.
//
// Raw ICMP sockets need privileges the tool usually does not have; the
// setuid `ping` binary does not. One echo request, a bounded reply wait,
// and an outer guard a second past the probe's own deadline in case the
// binary wedges. Every failure mode is "unreachable".

use std::net::Ipv4Addr;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use leasebook_core::traits::Pinger;

/// Single-packet probe via `ping -c 1 -W <secs>`
#[derive(Debug, Default, Clone)]
pub struct SystemPinger;

impl SystemPinger {
    /// Create a new system pinger
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Pinger for SystemPinger {
    async fn ping(&self, address: Ipv4Addr, timeout: Duration) -> bool {
        let wait_secs = timeout.as_secs().max(1);
        let child = Command::new("ping")
            .args(["-c", "1", "-W"])
            .arg(wait_secs.to_string())
            .arg(address.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status();

        match tokio::time::timeout(timeout + Duration::from_secs(1), child).await {
            Ok(Ok(status)) => status.success(),
            // Spawn failure or a wedged binary both read as unreachable
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn unroutable_address_reports_false_within_the_bound() {
        // 192.0.2.0/24 is TEST-NET-1, reserved and never assigned
        let pinger = SystemPinger::new();
        let started = Instant::now();

        let reachable = pinger
            .ping(Ipv4Addr::new(192, 0, 2, 1), Duration::from_secs(1))
            .await;

        assert!(!reachable);
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
