//! Test doubles and common utilities for store contract tests
//!
//! These fakes verify the store's persistence discipline without touching
//! the real filesystem or any services: an in-memory file map with fault
//! injection, and a reload recorder.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use leasebook_core::error::{Error, Result};
use leasebook_core::traits::{ConfigIo, ServiceControl};
use leasebook_core::{ReservationStore, StoreConfig};

/// In-memory filesystem double with fault injection
#[derive(Default)]
pub struct MemoryConfigIo {
    files: Mutex<HashMap<PathBuf, String>>,
    removed_trees: Mutex<Vec<PathBuf>>,
    fail_writes_to: Mutex<Option<PathBuf>>,
    fail_tree_removal: Mutex<bool>,
    write_count: AtomicUsize,
}

impl MemoryConfigIo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a file
    pub fn seed(&self, path: impl Into<PathBuf>, contents: impl Into<String>) {
        self.files
            .lock()
            .unwrap()
            .insert(path.into(), contents.into());
    }

    /// Current contents of a file, if it exists
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<String> {
        self.files.lock().unwrap().get(path.as_ref()).cloned()
    }

    /// Make every write to this path fail
    pub fn fail_writes_to(&self, path: impl Into<PathBuf>) {
        *self.fail_writes_to.lock().unwrap() = Some(path.into());
    }

    /// Make every tree removal fail
    pub fn fail_tree_removals(&self) {
        *self.fail_tree_removal.lock().unwrap() = true;
    }

    /// Trees removed so far
    pub fn removed_trees(&self) -> Vec<PathBuf> {
        self.removed_trees.lock().unwrap().clone()
    }

    /// Number of successful writes
    pub fn write_count(&self) -> usize {
        self.write_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConfigIo for MemoryConfigIo {
    async fn read_to_string(&self, path: &Path) -> Result<String> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| {
                Error::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("no such file: {}", path.display()),
                ))
            })
    }

    async fn write(&self, path: &Path, contents: &str) -> Result<()> {
        if self.fail_writes_to.lock().unwrap().as_deref() == Some(path) {
            return Err(Error::Other(format!(
                "injected write failure: {}",
                path.display()
            )));
        }
        self.files
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), contents.to_string());
        self.write_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn remove_tree(&self, path: &Path) -> Result<()> {
        if *self.fail_tree_removal.lock().unwrap() {
            return Err(Error::Other(format!(
                "injected removal failure: {}",
                path.display()
            )));
        }
        self.removed_trees.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }
}

/// Service-control double that records reloads and can fail per service
#[derive(Default)]
pub struct RecordingServiceControl {
    reloads: Mutex<Vec<String>>,
    failing: Mutex<HashSet<String>>,
}

impl RecordingServiceControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make reloads of this service fail
    pub fn fail_service(&self, service: impl Into<String>) {
        self.failing.lock().unwrap().insert(service.into());
    }

    /// Services reloaded so far, in order
    pub fn reloads(&self) -> Vec<String> {
        self.reloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl ServiceControl for RecordingServiceControl {
    async fn reload(&self, service: &str) -> Result<()> {
        self.reloads.lock().unwrap().push(service.to_string());
        if self.failing.lock().unwrap().contains(service) {
            return Err(Error::service(service, "injected reload failure"));
        }
        Ok(())
    }
}

/// A store over fresh fakes, with the default (dnsmasq-shaped) configuration
pub fn store_with(
    io: Arc<MemoryConfigIo>,
    services: Arc<RecordingServiceControl>,
) -> ReservationStore {
    ReservationStore::new(StoreConfig::default(), io, services)
}

/// Default reservations path, matching `StoreConfig::default()`
pub fn reservations_path() -> PathBuf {
    StoreConfig::default().reservations_path
}

/// Default exports path, matching `StoreConfig::default()`
pub fn exports_path() -> PathBuf {
    StoreConfig::default().exports_path
}
