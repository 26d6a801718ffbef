// # Service Control
//
// `systemctl`-based reload for the dependent services.
//
// The exit status and stderr are part of the contract: the store must be
// able to tell the operator when a write landed but the service never
// picked it up. dnsmasq does not re-read its main configuration on SIGHUP,
// so "reload" is a restart.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use leasebook_core::error::{Error, Result};
use leasebook_core::traits::ServiceControl;

/// Reloads services by restarting their systemd units
#[derive(Debug, Clone)]
pub struct SystemdServiceControl {
    use_sudo: bool,
}

impl SystemdServiceControl {
    /// Create a controller; `use_sudo` prefixes every call with `sudo`
    pub fn new(use_sudo: bool) -> Self {
        Self { use_sudo }
    }
}

#[async_trait]
impl ServiceControl for SystemdServiceControl {
    async fn reload(&self, service: &str) -> Result<()> {
        let mut command = if self.use_sudo {
            let mut c = Command::new("sudo");
            c.arg("systemctl");
            c
        } else {
            Command::new("systemctl")
        };
        command
            .args(["restart", service])
            .stdin(Stdio::null())
            .stdout(Stdio::null());

        let output = command
            .output()
            .await
            .map_err(|e| Error::service(service, format!("could not run systemctl: {e}")))?;

        if !output.status.success() {
            return Err(Error::service(
                service,
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        debug!(service, "service restarted");
        Ok(())
    }
}
