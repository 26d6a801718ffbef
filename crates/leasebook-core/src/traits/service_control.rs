// # Service Control Trait
//
// Defines the interface for signalling the dependent network services to
// re-read their configuration.
//
// ## Purpose
//
// After a durable write the DHCP service (and, for export-list changes, the
// NFS server) must pick up the new file. The reload is synchronous from the
// store's point of view: the result is checked and surfaced, never assumed.
// What the store does *not* do is verify that the service actually serves
// the new configuration afterwards; a clean reload return is as far as the
// contract goes.

use async_trait::async_trait;

use crate::error::Result;

/// Trait for service reload implementations
#[async_trait]
pub trait ServiceControl: Send + Sync {
    /// Ask the named service to re-read its configuration.
    ///
    /// Returns `Ok(())` only if the reload command itself reported success.
    async fn reload(&self, service: &str) -> Result<()>;
}
