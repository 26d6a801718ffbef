//! Contract: best-effort teardown
//!
//! Delete runs up to four independent steps; one step's failure is collected
//! in the report and never stops the later steps. This is deliberate
//! cleanup, not a transaction.

mod common;

use std::path::PathBuf;
use std::sync::Arc;

use common::*;
use leasebook_core::error::Error;
use leasebook_core::{DeleteOptions, DeleteStep};

const HOSTS: &str = "\
interface=eth0
dhcp-host=aa:bb:cc:dd:ee:01,192.168.0.100,node1,infinite
dhcp-host=aa:bb:cc:dd:ee:02,192.168.0.101,node2,infinite
";

const EXPORTS: &str = "\
/media/rpi-client/node1 *(rw,sync,no_subtree_check,no_root_squash)
/media/rpi-client/node2 *(rw,sync,no_subtree_check,no_root_squash)
";

#[tokio::test]
async fn default_delete_removes_registry_and_export_lines() {
    let io = Arc::new(MemoryConfigIo::new());
    let services = Arc::new(RecordingServiceControl::new());
    io.seed(reservations_path(), HOSTS);
    io.seed(exports_path(), EXPORTS);
    let store = store_with(io.clone(), services.clone());
    store.reload().await.unwrap();

    let report = store.delete("node1", DeleteOptions::default()).await.unwrap();
    assert!(report.is_clean(), "failed steps: {:?}", report.failed);
    assert_eq!(report.applied, [DeleteStep::Registry, DeleteStep::Exports]);

    let conf = io.contents(reservations_path()).unwrap();
    assert!(conf.contains("interface=eth0"));
    assert!(!conf.contains("node1"));
    assert!(conf.contains("node2"));

    let exports = io.contents(exports_path()).unwrap();
    assert!(!exports.contains("node1"));
    assert!(exports.contains("node2"));

    assert_eq!(services.reloads(), ["dnsmasq", "nfs-kernel-server"]);
    // No trees were touched
    assert!(io.removed_trees().is_empty());

    let book = store.snapshot().await;
    assert!(book.find("node1").is_err());
    assert!(book.find("node2").is_ok());
}

#[tokio::test]
async fn purge_files_removes_both_trees() {
    let io = Arc::new(MemoryConfigIo::new());
    let services = Arc::new(RecordingServiceControl::new());
    io.seed(reservations_path(), HOSTS);
    io.seed(exports_path(), EXPORTS);
    let store = store_with(io.clone(), services.clone());
    store.reload().await.unwrap();

    let report = store
        .delete("node1", DeleteOptions::purge_files())
        .await
        .unwrap();
    assert!(report.is_clean(), "failed steps: {:?}", report.failed);

    assert_eq!(
        io.removed_trees(),
        [
            PathBuf::from("/tftpboot/node1"),
            PathBuf::from("/media/rpi-client/node1"),
        ]
    );
}

#[tokio::test]
async fn failing_tree_removal_is_collected_not_fatal() {
    let io = Arc::new(MemoryConfigIo::new());
    let services = Arc::new(RecordingServiceControl::new());
    io.seed(reservations_path(), HOSTS);
    io.seed(exports_path(), EXPORTS);
    io.fail_tree_removals();
    let store = store_with(io.clone(), services.clone());
    store.reload().await.unwrap();

    let report = store
        .delete("node1", DeleteOptions::purge_files())
        .await
        .unwrap();

    // The line removals still went through
    assert_eq!(report.applied, [DeleteStep::Registry, DeleteStep::Exports]);
    assert!(!io.contents(reservations_path()).unwrap().contains("node1"));

    // Exactly the two tree steps failed
    let failed_steps: Vec<DeleteStep> = report.failed.iter().map(|(step, _)| *step).collect();
    assert_eq!(failed_steps, [DeleteStep::TftpTree, DeleteStep::NfsTree]);
    assert!(!report.is_clean());
}

#[tokio::test]
async fn deleting_an_unknown_identifier_is_not_found() {
    let io = Arc::new(MemoryConfigIo::new());
    let services = Arc::new(RecordingServiceControl::new());
    io.seed(reservations_path(), HOSTS);
    let store = store_with(io.clone(), services);
    store.reload().await.unwrap();

    let err = store
        .delete("ghost", DeleteOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert_eq!(io.contents(reservations_path()).unwrap(), HOSTS);
}

#[tokio::test]
async fn cleanup_only_delete_needs_no_registry_entry() {
    // A node that was deregistered by hand can still have its boot trees
    // purged; only the tree steps are requested.
    let io = Arc::new(MemoryConfigIo::new());
    let services = Arc::new(RecordingServiceControl::new());
    let store = store_with(io.clone(), services);

    let report = store
        .delete(
            "stale-node",
            DeleteOptions {
                registry: false,
                exports: false,
                tftp_tree: true,
                nfs_tree: true,
            },
        )
        .await
        .unwrap();

    assert!(report.is_clean());
    assert_eq!(
        io.removed_trees(),
        [
            PathBuf::from("/tftpboot/stale-node"),
            PathBuf::from("/media/rpi-client/stale-node"),
        ]
    );
}

#[tokio::test]
async fn missing_export_list_does_not_fail_the_exports_step() {
    let io = Arc::new(MemoryConfigIo::new());
    let services = Arc::new(RecordingServiceControl::new());
    io.seed(reservations_path(), HOSTS);
    let store = store_with(io.clone(), services.clone());
    store.reload().await.unwrap();

    let report = store.delete("node1", DeleteOptions::default()).await.unwrap();
    assert!(report.is_clean(), "failed steps: {:?}", report.failed);
    // Only the registry reload happened; there was no export list to touch
    assert_eq!(services.reloads(), ["dnsmasq"]);
}
