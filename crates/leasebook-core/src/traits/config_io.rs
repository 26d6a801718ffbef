// # Config I/O Trait
//
// Defines the interface for reading and writing the shared configuration
// files the registry persists to.
//
// ## Purpose
//
// The reservation file and the export list usually live under /etc and are
// root-owned; the process running the registry does not assume it can write
// them directly. This seam lets the store stay ignorant of how the bytes
// reach disk: directly with an atomic rename, or staged through a
// sudo-mediated copy.
//
// ## Implementations
//
// - `leasebook-system::LocalConfigIo`: plain tokio::fs with write-then-rename
// - `leasebook-system::SudoConfigIo`: `sudo cat` / stage-and-`sudo cp`
// - In-memory test doubles in the core contract tests

use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;

/// Trait for configuration file access implementations
///
/// Implementations must be thread-safe and usable across async tasks.
/// Reads and writes are whole-file; the store composes edits in memory and
/// replaces the file in one call.
#[async_trait]
pub trait ConfigIo: Send + Sync {
    /// Read an entire file as UTF-8 text
    async fn read_to_string(&self, path: &Path) -> Result<String>;

    /// Replace an entire file's contents.
    ///
    /// Implementations should make the replacement as close to atomic as the
    /// write path allows; a reader must never observe a torn file.
    async fn write(&self, path: &Path, contents: &str) -> Result<()>;

    /// Recursively remove a directory tree. Removing a path that does not
    /// exist is not an error.
    async fn remove_tree(&self, path: &Path) -> Result<()>;
}
