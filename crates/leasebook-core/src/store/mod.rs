//! Reservation store
//!
//! The store is the only component with filesystem and process side effects:
//! it owns the external reservation file, the export list, and the reload
//! signal to the dependent services, and it orchestrates the address book
//! and the line codec into CRUD operations that look atomic from the
//! caller's side.
//!
//! ## Consistency model
//!
//! ```text
//!            ┌──────────────────┐
//!            │ ReservationStore │
//!            └──────────────────┘
//!              │       │      │
//!       ┌──────┘       │      └────────┐
//!       ▼              ▼               ▼
//! ┌───────────┐  ┌───────────┐  ┌───────────────┐
//! │ ConfigIo  │  │ codec     │  │ ServiceControl│
//! │ (file)    │  │ (pure)    │  │ (reload)      │
//! └───────────┘  └───────────┘  └───────────────┘
//! ```
//!
//! The external file is the single source of truth; the in-memory book is a
//! snapshot of it. Every mutation runs read → modify → write → reload under
//! one async mutex, re-reading the file at the start so hand edits and other
//! writers inside this process cannot be silently clobbered. The snapshot is
//! replaced wholesale (copy-on-replace) only after the durable write
//! succeeds, so readers never observe state that is not on disk.
//!
//! Cross-process writers are *not* serialized here; two processes editing
//! the same file race with last-writer-wins semantics, as the file format
//! itself offers nothing better.

use std::collections::HashSet;
use std::fmt;
use std::net::Ipv4Addr;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::book::AddressBook;
use crate::codec::ConfigTextCodec;
use crate::config::{StoreConfig, parse_subnet_prefix};
use crate::error::{Error, Result};
use crate::reservation::{HardwareAddr, Reservation, validate_identifier};
use crate::traits::{ConfigIo, ServiceControl};

/// Outcome of a [`ReservationStore::reload`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReloadReport {
    /// Number of reservations now in the book
    pub reservations: usize,
    /// False when the source file could not be read and the store fell back
    /// to an empty book. Distinguishes "no reservations" from "no file".
    pub source_available: bool,
}

/// Which teardown actions [`ReservationStore::delete`] performs
#[derive(Debug, Clone, Copy)]
pub struct DeleteOptions {
    /// Remove the reservation line from the registry file
    pub registry: bool,
    /// Remove the node's line from the export list
    pub exports: bool,
    /// Remove the node's TFTP boot tree (destructive)
    pub tftp_tree: bool,
    /// Remove the node's NFS root tree (destructive)
    pub nfs_tree: bool,
}

impl Default for DeleteOptions {
    /// Registry and export lines go; filesystem trees are kept unless asked.
    fn default() -> Self {
        Self {
            registry: true,
            exports: true,
            tftp_tree: false,
            nfs_tree: false,
        }
    }
}

impl DeleteOptions {
    /// Default teardown plus both filesystem trees
    pub fn purge_files() -> Self {
        Self {
            tftp_tree: true,
            nfs_tree: true,
            ..Self::default()
        }
    }
}

/// One teardown action of [`ReservationStore::delete`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteStep {
    Registry,
    Exports,
    TftpTree,
    NfsTree,
}

impl fmt::Display for DeleteStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Registry => "registry line",
            Self::Exports => "export line",
            Self::TftpTree => "tftp tree",
            Self::NfsTree => "nfs tree",
        };
        f.write_str(name)
    }
}

/// Per-step outcome of a best-effort teardown
#[derive(Debug, Default)]
pub struct DeleteReport {
    /// Steps that completed
    pub applied: Vec<DeleteStep>,
    /// Steps that failed, with the reason; later steps were still attempted
    pub failed: Vec<(DeleteStep, String)>,
}

impl DeleteReport {
    /// Whether every requested step completed
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Durable reservation registry over an external flat file
pub struct ReservationStore {
    config: StoreConfig,
    codec: ConfigTextCodec,
    io: Arc<dyn ConfigIo>,
    services: Arc<dyn ServiceControl>,

    /// Copy-on-replace snapshot; readers clone the Arc and never block writers
    book: RwLock<Arc<AddressBook>>,

    /// Serializes the read-modify-write-reload critical sections
    write_lock: Mutex<()>,
}

impl ReservationStore {
    /// Create a store over the given I/O and service-control implementations.
    ///
    /// The book starts empty; call [`reload`](Self::reload) to populate it.
    pub fn new(config: StoreConfig, io: Arc<dyn ConfigIo>, services: Arc<dyn ServiceControl>) -> Self {
        let codec = ConfigTextCodec::new(config.line_format.clone());
        Self {
            config,
            codec,
            io,
            services,
            book: RwLock::new(Arc::new(AddressBook::new())),
            write_lock: Mutex::new(()),
        }
    }

    /// The store's configuration
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Current book snapshot.
    ///
    /// The snapshot is immutable and may be stale the moment it is taken;
    /// call [`reload`](Self::reload) first when external changes matter.
    pub async fn snapshot(&self) -> Arc<AddressBook> {
        self.book.read().await.clone()
    }

    /// Re-read the source file and replace the book wholesale.
    ///
    /// An unreadable source falls back to an empty book (the first-run case)
    /// and is reported through [`ReloadReport::source_available`] rather than
    /// as an error.
    pub async fn reload(&self) -> Result<ReloadReport> {
        let _guard = self.write_lock.lock().await;
        match self.read_source().await {
            Ok(raw) => {
                let book = self.build_book(&raw);
                let reservations = book.len();
                self.install(book).await;
                debug!(reservations, "registry reloaded");
                Ok(ReloadReport {
                    reservations,
                    source_available: true,
                })
            }
            Err(e) => {
                warn!(
                    "reservation source unavailable ({e}); falling back to an empty registry"
                );
                self.install(AddressBook::new()).await;
                Ok(ReloadReport {
                    reservations: 0,
                    source_available: false,
                })
            }
        }
    }

    /// Add a reservation and persist it.
    ///
    /// Uniqueness is checked against the freshly re-read on-disk truth. The
    /// snapshot is updated only after the file write succeeds; a failed write
    /// leaves both the file and the book exactly as they were. A failed
    /// service reload after a successful write surfaces as
    /// [`Error::PartiallyApplied`] with the book already updated, since the
    /// book tracks durable state.
    pub async fn add(
        &self,
        identifier: &str,
        hardware_address: &str,
        address: Ipv4Addr,
    ) -> Result<Reservation> {
        let hw: HardwareAddr = hardware_address.parse()?;
        let reservation = Reservation::new(identifier, hw, address)?;

        let _guard = self.write_lock.lock().await;

        // Missing source is the first-run case: start from nothing.
        let raw = match self.read_source().await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("reservation source unavailable ({e}); starting a new file");
                String::new()
            }
        };
        let mut book = self.build_book(&raw);

        if let Some(existing) = book
            .iter()
            .find(|r| r.address == address && r.identifier != identifier)
        {
            // Address uniqueness is advisory only; the file format tolerates it.
            warn!(
                "address {address} is already reserved for {}; duplicate offers likely",
                existing.identifier
            );
        }

        book.insert(reservation.clone())?;

        let mut new_raw = raw;
        if !new_raw.is_empty() && !new_raw.ends_with('\n') {
            new_raw.push('\n');
        }
        new_raw.push_str(&self.codec.encode(&reservation));
        new_raw.push('\n');

        self.io
            .write(&self.config.reservations_path, &new_raw)
            .await
            .map_err(|e| Error::persist_failed("reservation file write", e.to_string()))?;
        // Durable from here on; the book must reflect the file.
        self.install(book).await;

        let mut applied = vec!["reservation file write".to_string()];
        if let Err(e) = self.services.reload(&self.config.dhcp_service).await {
            return Err(Error::partially_applied(
                applied,
                format!("{} reload failed: {e}", self.config.dhcp_service),
            ));
        }
        applied.push(format!("{} reload", self.config.dhcp_service));

        if self.config.manage_exports
            && let Err(e) = self.ensure_export(&reservation.identifier).await
        {
            return Err(Error::partially_applied(
                applied,
                format!("export maintenance failed: {e}"),
            ));
        }

        info!(
            identifier = %reservation.identifier,
            address = %reservation.address,
            "reservation added"
        );
        Ok(reservation)
    }

    /// Change a reservation's hardware address, address, or display name.
    ///
    /// The identifier is immutable. A no-op edit (all fields already at the
    /// requested values) returns without touching the file.
    pub async fn edit(
        &self,
        identifier: &str,
        new_hardware_address: Option<&str>,
        new_address: Option<Ipv4Addr>,
        new_display_name: Option<&str>,
    ) -> Result<Reservation> {
        let new_hw: Option<HardwareAddr> = new_hardware_address.map(str::parse).transpose()?;
        if let Some(name) = new_display_name
            && name.trim().is_empty()
        {
            return Err(Error::validation("display name must not be empty"));
        }

        let _guard = self.write_lock.lock().await;

        let raw = self.read_source().await?;
        let mut book = self.build_book(&raw);
        let old = book.find(identifier)?.clone();

        let updated = book.update(identifier, |r| {
            if let Some(hw) = new_hw {
                r.hardware_address = hw;
            }
            if let Some(addr) = new_address {
                r.address = addr;
            }
            if let Some(name) = new_display_name {
                r.display_name = name.to_string();
            }
        })?;

        if updated == old {
            debug!(identifier, "edit is a no-op");
            return Ok(updated);
        }

        if let Some(addr) = new_address
            && let Some(existing) = book
                .iter()
                .find(|r| r.address == addr && r.identifier != identifier)
        {
            warn!(
                "address {addr} is already reserved for {}; duplicate offers likely",
                existing.identifier
            );
        }

        let new_raw = self.codec.replace_line(&raw, &old, &updated)?;
        self.io
            .write(&self.config.reservations_path, &new_raw)
            .await
            .map_err(|e| Error::persist_failed("reservation file write", e.to_string()))?;
        self.install(book).await;

        if let Err(e) = self.services.reload(&self.config.dhcp_service).await {
            return Err(Error::partially_applied(
                vec!["reservation file write".to_string()],
                format!("{} reload failed: {e}", self.config.dhcp_service),
            ));
        }

        info!(identifier, "reservation updated");
        Ok(updated)
    }

    /// Tear down a reservation: up to four independent best-effort steps.
    ///
    /// Each step's failure is collected in the report and does not stop the
    /// later steps; this is deliberate cleanup, not a transaction. The book
    /// drops the entry iff the registry step completed.
    ///
    /// When the registry step is requested the identifier must exist in the
    /// registry ([`Error::NotFound`] otherwise); a cleanup-only call (all
    /// registry/exports flags off) works from the identifier alone.
    pub async fn delete(&self, identifier: &str, options: DeleteOptions) -> Result<DeleteReport> {
        validate_identifier(identifier)?;

        let _guard = self.write_lock.lock().await;
        let mut report = DeleteReport::default();

        // Registry line
        let mut book_after: Option<AddressBook> = None;
        if options.registry {
            match self.read_source().await {
                Ok(raw) => {
                    let mut book = self.build_book(&raw);
                    let target = book.find(identifier)?.clone();

                    let filtered = self.codec.remove_lines(&raw, |lease| {
                        lease.hardware_address == target.hardware_address
                            && lease.address == target.address
                    });

                    match self.io.write(&self.config.reservations_path, &filtered).await {
                        Ok(()) => {
                            // remove cannot fail: find() above proved presence
                            let _ = book.remove(identifier);
                            book_after = Some(book);
                            match self.services.reload(&self.config.dhcp_service).await {
                                Ok(()) => report.applied.push(DeleteStep::Registry),
                                Err(e) => report.failed.push((
                                    DeleteStep::Registry,
                                    format!("line removed but reload failed: {e}"),
                                )),
                            }
                        }
                        Err(e) => report
                            .failed
                            .push((DeleteStep::Registry, format!("write failed: {e}"))),
                    }
                }
                Err(e) => report
                    .failed
                    .push((DeleteStep::Registry, format!("source unavailable: {e}"))),
            }
        }

        // Export line
        if options.exports {
            match self.remove_export(identifier).await {
                Ok(()) => report.applied.push(DeleteStep::Exports),
                Err(e) => report.failed.push((DeleteStep::Exports, e.to_string())),
            }
        }

        // Filesystem trees. Destructive and default-off.
        if options.tftp_tree {
            let path = self.config.tftp_tree(identifier);
            match self.io.remove_tree(&path).await {
                Ok(()) => report.applied.push(DeleteStep::TftpTree),
                Err(e) => report.failed.push((DeleteStep::TftpTree, e.to_string())),
            }
        }
        if options.nfs_tree {
            let path = self.config.nfs_tree(identifier);
            match self.io.remove_tree(&path).await {
                Ok(()) => report.applied.push(DeleteStep::NfsTree),
                Err(e) => report.failed.push((DeleteStep::NfsTree, e.to_string())),
            }
        }

        if let Some(book) = book_after {
            self.install(book).await;
        }

        if report.is_clean() {
            info!(identifier, "reservation deleted");
        } else {
            warn!(
                identifier,
                failed = report.failed.len(),
                "teardown partially applied"
            );
        }
        Ok(report)
    }

    /// Suggest the lowest free host number in `[range_start, range_end]`
    /// under the subnet prefix, judged against the current snapshot.
    ///
    /// An exhausted range degrades to the inclusive end boundary instead of
    /// failing; the caller gets an address either way.
    pub async fn assign_next_address(
        &self,
        subnet_prefix: &str,
        range_start: u8,
        range_end: u8,
    ) -> Result<Ipv4Addr> {
        let prefix = parse_subnet_prefix(subnet_prefix)?;
        if range_start > range_end {
            return Err(Error::validation(format!(
                "address range is inverted: {range_start}..{range_end}"
            )));
        }

        let book = self.snapshot().await;
        let used: HashSet<u8> = book
            .iter()
            .filter(|r| r.address.octets()[..3] == prefix)
            .map(|r| r.address.octets()[3])
            .collect();

        let host = (range_start..=range_end)
            .find(|host| !used.contains(host))
            .unwrap_or(range_end);
        Ok(Ipv4Addr::new(prefix[0], prefix[1], prefix[2], host))
    }

    async fn read_source(&self) -> Result<String> {
        self.io
            .read_to_string(&self.config.reservations_path)
            .await
            .map_err(|e| Error::source_unavailable(e.to_string()))
    }

    /// Build a book from raw text, tolerating a dirty file: duplicate or
    /// malformed entries are skipped with a warning, never fatal.
    fn build_book(&self, raw: &str) -> AddressBook {
        let mut book = AddressBook::new();
        for lease in self.codec.decode(raw) {
            let reservation = match Reservation::new(
                lease.identifier.clone(),
                lease.hardware_address,
                lease.address,
            ) {
                Ok(r) => r,
                Err(e) => {
                    warn!("skipping unusable reservation line for {:?}: {e}", lease.identifier);
                    continue;
                }
            };
            if let Err(e) = book.insert(reservation) {
                warn!("skipping conflicting reservation line: {e}");
            }
        }
        book
    }

    async fn install(&self, book: AddressBook) {
        *self.book.write().await = Arc::new(book);
    }

    /// Append the node's export line unless its path is already exported
    async fn ensure_export(&self, identifier: &str) -> Result<()> {
        let path = &self.config.exports_path;
        let raw = match self.io.read_to_string(path).await {
            Ok(raw) => raw,
            // A missing export list is created, not reported.
            Err(_) => String::new(),
        };

        let tree = self.config.nfs_tree(identifier).display().to_string();
        if raw
            .lines()
            .any(|line| line.split_whitespace().next() == Some(tree.as_str()))
        {
            debug!(identifier, "export line already present");
            return Ok(());
        }

        let mut new_raw = raw;
        if !new_raw.is_empty() && !new_raw.ends_with('\n') {
            new_raw.push('\n');
        }
        new_raw.push_str(&self.config.export_line(identifier));
        new_raw.push('\n');

        self.io.write(path, &new_raw).await?;
        self.services.reload(&self.config.exports_service).await
    }

    /// Drop the node's export line; reload only if something was removed
    async fn remove_export(&self, identifier: &str) -> Result<()> {
        let path = &self.config.exports_path;
        let raw = match self.io.read_to_string(path).await {
            Ok(raw) => raw,
            // No export list means nothing to remove.
            Err(_) => return Ok(()),
        };

        let tree = self.config.nfs_tree(identifier).display().to_string();
        let kept: Vec<&str> = raw
            .split('\n')
            .filter(|line| line.split_whitespace().next() != Some(tree.as_str()))
            .collect();
        let new_raw = kept.join("\n");

        if new_raw == raw {
            return Ok(());
        }

        self.io.write(path, &new_raw).await?;
        self.services.reload(&self.config.exports_service).await
    }
}
