// # leasebook-core
//
// Core library for the leasebook DHCP reservation registry.
//
// ## Architecture Overview
//
// This library provides the pieces a netboot lab needs to manage static
// address reservations safely:
// - **AddressBook**: in-memory reservation set enforcing the uniqueness
//   invariants (identifier, hardware address)
// - **ConfigTextCodec**: bidirectional mapping between the registry's
//   flat-file line grammar and reservation records
// - **ReachabilityProbe**: concurrent liveness checks with a TTL cache
// - **ReservationStore**: the one component with side effects; orchestrates
//   load, mutation, durable write-back, and service reload
// - **ConfigIo / ServiceControl / Pinger**: trait seams whose operating
//   system implementations live in `leasebook-system`
//
// ## Design Principles
//
// 1. The external file is the single source of truth; memory is a snapshot
// 2. Mutations are serialized read-modify-write-reload critical sections
// 3. Liveness is advisory and ephemeral, never persisted
// 4. All side effects are injected, so the core is testable with fakes

pub mod book;
pub mod codec;
pub mod config;
pub mod error;
pub mod probe;
pub mod reservation;
pub mod store;
pub mod traits;

// Re-export core types for convenience
pub use book::{AddressBook, SortKey};
pub use codec::{ConfigTextCodec, DecodedLease, LineFormat};
pub use config::{AddressPlan, PrivilegeMode, ProbeConfig, Settings, StoreConfig};
pub use error::{Error, Result};
pub use probe::ReachabilityProbe;
pub use reservation::{HardwareAddr, Reservation};
pub use store::{DeleteOptions, DeleteReport, DeleteStep, ReloadReport, ReservationStore};
pub use traits::{ConfigIo, Pinger, ServiceControl};
