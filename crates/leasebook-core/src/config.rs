//! Configuration types for the reservation registry
//!
//! This module defines all configuration structures used throughout the
//! crate. Every field has a serde default matching the lab deployment the
//! project grew out of, so an empty settings file is a valid one.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::codec::LineFormat;
use crate::error::{Error, Result};

/// Top-level settings, persisted as a JSON file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Store paths, service names, and line format
    #[serde(default)]
    pub store: StoreConfig,

    /// Liveness probe tuning
    #[serde(default)]
    pub probe: ProbeConfig,

    /// Address assignment plan
    #[serde(default)]
    pub plan: AddressPlan,

    /// How writes to root-owned files are performed
    #[serde(default)]
    pub privilege: PrivilegeMode,

    /// Log level for the CLI (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Settings {
    /// Load settings from a JSON file.
    ///
    /// A missing file yields the defaults; this is the first-run case, not
    /// an error. A present-but-malformed file is an error.
    pub async fn load(path: &Path) -> Result<Self> {
        match tokio::fs::read_to_string(path).await {
            Ok(raw) => {
                let settings: Settings = serde_json::from_str(&raw)?;
                settings.validate()?;
                Ok(settings)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("no settings file at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.store.validate()?;
        self.probe.validate()?;
        self.plan.validate()?;

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(Error::validation(format!(
                    "log_level '{other}' is not valid (trace, debug, info, warn, error)"
                )));
            }
        }
        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            probe: ProbeConfig::default(),
            plan: AddressPlan::default(),
            privilege: PrivilegeMode::default(),
            log_level: default_log_level(),
        }
    }
}

/// Paths, service names, and export policy for the reservation store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// The reservation file (the dependent DHCP service's configuration)
    #[serde(default = "default_reservations_path")]
    pub reservations_path: PathBuf,

    /// The NFS export list
    #[serde(default = "default_exports_path")]
    pub exports_path: PathBuf,

    /// Root under which each node's TFTP boot tree lives
    #[serde(default = "default_tftp_root")]
    pub tftp_root: PathBuf,

    /// Root under which each node's NFS root filesystem lives
    #[serde(default = "default_nfs_root")]
    pub nfs_root: PathBuf,

    /// Service reloaded after reservation-file writes
    #[serde(default = "default_dhcp_service")]
    pub dhcp_service: String,

    /// Service reloaded after export-list writes
    #[serde(default = "default_exports_service")]
    pub exports_service: String,

    /// Reservation line grammar tokens
    #[serde(default)]
    pub line_format: LineFormat,

    /// Whether `add` also maintains the node's export-list line
    #[serde(default = "default_manage_exports")]
    pub manage_exports: bool,

    /// Client spec for generated export lines (`*` exports to any host)
    #[serde(default = "default_export_client_spec")]
    pub export_client_spec: String,

    /// Option string for generated export lines
    #[serde(default = "default_export_options")]
    pub export_options: String,
}

impl StoreConfig {
    /// Validate the store configuration
    pub fn validate(&self) -> Result<()> {
        if self.dhcp_service.is_empty() {
            return Err(Error::validation("dhcp_service cannot be empty"));
        }
        if self.exports_service.is_empty() {
            return Err(Error::validation("exports_service cannot be empty"));
        }
        if self.line_format.prefix.is_empty() {
            return Err(Error::validation("line_format.prefix cannot be empty"));
        }
        for (name, path) in [("tftp_root", &self.tftp_root), ("nfs_root", &self.nfs_root)] {
            if path.as_os_str().is_empty() {
                return Err(Error::validation(format!("{name} cannot be empty")));
            }
        }
        Ok(())
    }

    /// The TFTP boot tree for an identifier
    pub fn tftp_tree(&self, identifier: &str) -> PathBuf {
        self.tftp_root.join(identifier)
    }

    /// The NFS root tree for an identifier
    pub fn nfs_tree(&self, identifier: &str) -> PathBuf {
        self.nfs_root.join(identifier)
    }

    /// The export-list line for an identifier's NFS tree
    pub fn export_line(&self, identifier: &str) -> String {
        format!(
            "{} {}({})",
            self.nfs_tree(identifier).display(),
            self.export_client_spec,
            self.export_options
        )
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            reservations_path: default_reservations_path(),
            exports_path: default_exports_path(),
            tftp_root: default_tftp_root(),
            nfs_root: default_nfs_root(),
            dhcp_service: default_dhcp_service(),
            exports_service: default_exports_service(),
            line_format: LineFormat::default(),
            manage_exports: default_manage_exports(),
            export_client_spec: default_export_client_spec(),
            export_options: default_export_options(),
        }
    }
}

/// Liveness probe tuning
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// How long a cached observation stays fresh (seconds)
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Per-probe reply wait (seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum probes in flight during a batch check
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
}

impl ProbeConfig {
    /// Validate the probe configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_in_flight == 0 {
            return Err(Error::validation("probe.max_in_flight must be at least 1"));
        }
        if self.timeout_secs == 0 {
            return Err(Error::validation("probe.timeout_secs must be at least 1"));
        }
        Ok(())
    }

    /// Cache TTL as a duration
    pub fn cache_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.cache_ttl_secs)
    }

    /// Probe timeout as a duration
    pub fn probe_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl_secs(),
            timeout_secs: default_timeout_secs(),
            max_in_flight: default_max_in_flight(),
        }
    }
}

/// Address assignment plan for suggested addresses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressPlan {
    /// First three dotted-quad octets of the managed subnet
    #[serde(default = "default_subnet_prefix")]
    pub subnet_prefix: String,

    /// Lowest host number handed out
    #[serde(default = "default_range_start")]
    pub range_start: u8,

    /// Highest host number handed out (inclusive)
    #[serde(default = "default_range_end")]
    pub range_end: u8,
}

impl AddressPlan {
    /// Validate the address plan
    pub fn validate(&self) -> Result<()> {
        parse_subnet_prefix(&self.subnet_prefix)?;
        if self.range_start > self.range_end {
            return Err(Error::validation(format!(
                "plan range is inverted: {}..{}",
                self.range_start, self.range_end
            )));
        }
        Ok(())
    }
}

impl Default for AddressPlan {
    fn default() -> Self {
        Self {
            subnet_prefix: default_subnet_prefix(),
            range_start: default_range_start(),
            range_end: default_range_end(),
        }
    }
}

/// How writes to root-owned files are performed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrivilegeMode {
    /// Direct filesystem access (running as root, or against test paths)
    Direct,
    /// Stage to a temp file and install with `sudo`
    #[default]
    Sudo,
}

/// Parse a `subnet_prefix` string ("192.168.0") into its three octets
pub fn parse_subnet_prefix(prefix: &str) -> Result<[u8; 3]> {
    let mut octets = [0u8; 3];
    let mut count = 0;
    for part in prefix.split('.') {
        if count == 3 {
            return Err(Error::validation(format!("malformed subnet prefix: {prefix}")));
        }
        octets[count] = part
            .parse()
            .map_err(|_| Error::validation(format!("malformed subnet prefix: {prefix}")))?;
        count += 1;
    }
    if count != 3 {
        return Err(Error::validation(format!("malformed subnet prefix: {prefix}")));
    }
    Ok(octets)
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_reservations_path() -> PathBuf {
    PathBuf::from("/etc/dnsmasq.conf")
}

fn default_exports_path() -> PathBuf {
    PathBuf::from("/etc/exports")
}

fn default_tftp_root() -> PathBuf {
    PathBuf::from("/tftpboot")
}

fn default_nfs_root() -> PathBuf {
    PathBuf::from("/media/rpi-client")
}

fn default_dhcp_service() -> String {
    "dnsmasq".to_string()
}

fn default_exports_service() -> String {
    "nfs-kernel-server".to_string()
}

fn default_manage_exports() -> bool {
    true
}

fn default_export_client_spec() -> String {
    "*".to_string()
}

fn default_export_options() -> String {
    "rw,sync,no_subtree_check,no_root_squash".to_string()
}

fn default_cache_ttl_secs() -> u64 {
    30
}

fn default_timeout_secs() -> u64 {
    1
}

fn default_max_in_flight() -> usize {
    10
}

fn default_subnet_prefix() -> String {
    "192.168.0".to_string()
}

fn default_range_start() -> u8 {
    100
}

fn default_range_end() -> u8 {
    200
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        Settings::default().validate().unwrap();
    }

    #[test]
    fn empty_settings_file_is_all_defaults() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.store.dhcp_service, "dnsmasq");
        assert_eq!(settings.plan.range_start, 100);
        assert_eq!(settings.probe.max_in_flight, 10);
        assert_eq!(settings.privilege, PrivilegeMode::Sudo);
    }

    #[test]
    fn export_line_matches_the_exports_syntax() {
        let store = StoreConfig::default();
        assert_eq!(
            store.export_line("d3a76dcf"),
            "/media/rpi-client/d3a76dcf *(rw,sync,no_subtree_check,no_root_squash)"
        );
    }

    #[test]
    fn subnet_prefix_parsing_rejects_garbage() {
        assert_eq!(parse_subnet_prefix("192.168.0").unwrap(), [192, 168, 0]);
        for bad in ["", "192.168", "192.168.0.1", "192.168.x", "300.1.2"] {
            assert!(parse_subnet_prefix(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn inverted_plan_range_is_rejected() {
        let plan = AddressPlan {
            subnet_prefix: "10.0.0".into(),
            range_start: 150,
            range_end: 100,
        };
        assert!(plan.validate().is_err());
    }
}
