// # Address Book
//
// In-memory set of reservations, keyed by identifier.
//
// ## Purpose
//
// Holds the current view of the registry and enforces the two uniqueness
// invariants (identifier, hardware address). It is a cache of the on-disk
// truth: the store replaces it wholesale on reload and never lets it drift
// from durably-written state.
//
// The book performs no I/O. Reachability ordering joins against probe state
// supplied by the caller.

use std::collections::HashMap;
use std::net::Ipv4Addr;

use crate::error::{Error, Result};
use crate::reservation::Reservation;

/// Ordering for [`AddressBook::list`]
#[derive(Debug, Clone, Copy)]
pub enum SortKey<'a> {
    /// Ascending numeric IPv4 value (dotted quad as a 32-bit big-endian integer)
    Address,
    /// Case-insensitive display name, address order as tiebreak
    DisplayName,
    /// Last known reachability: reachable, then unknown, then unreachable,
    /// ties broken by address order. The map is the probe's last known state.
    Reachability(&'a HashMap<Ipv4Addr, bool>),
}

/// In-memory reservation set with uniqueness enforcement
#[derive(Debug, Clone, Default)]
pub struct AddressBook {
    entries: HashMap<String, Reservation>,
}

impl AddressBook {
    /// Create an empty book
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of reservations
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the book holds no reservations
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over reservations in unspecified order
    pub fn iter(&self) -> impl Iterator<Item = &Reservation> {
        self.entries.values()
    }

    /// Add a reservation, enforcing both uniqueness invariants.
    ///
    /// Fails with [`Error::DuplicateIdentifier`] or
    /// [`Error::DuplicateHardwareAddress`] without modifying the book.
    pub fn insert(&mut self, reservation: Reservation) -> Result<()> {
        if self.entries.contains_key(&reservation.identifier) {
            return Err(Error::DuplicateIdentifier(reservation.identifier));
        }
        if let Some(existing) = self.find_by_hardware_address(reservation.hardware_address) {
            return Err(Error::DuplicateHardwareAddress(format!(
                "{} (held by {})",
                reservation.hardware_address, existing.identifier
            )));
        }
        self.entries
            .insert(reservation.identifier.clone(), reservation);
        Ok(())
    }

    /// Apply field changes to the reservation with this identifier.
    ///
    /// The mutation runs on a copy; the hardware-address uniqueness invariant
    /// is re-checked against all *other* entries before the copy is committed,
    /// so a failed update leaves the book untouched. The identifier itself is
    /// immutable.
    pub fn update(
        &mut self,
        identifier: &str,
        mutate: impl FnOnce(&mut Reservation),
    ) -> Result<Reservation> {
        let original = self
            .entries
            .get(identifier)
            .ok_or_else(|| Error::not_found(identifier))?;

        let mut updated = original.clone();
        mutate(&mut updated);

        if updated.identifier != identifier {
            return Err(Error::validation("reservation identifier is immutable"));
        }
        if let Some(other) = self
            .entries
            .values()
            .find(|r| r.identifier != identifier && r.hardware_address == updated.hardware_address)
        {
            return Err(Error::DuplicateHardwareAddress(format!(
                "{} (held by {})",
                updated.hardware_address, other.identifier
            )));
        }

        self.entries
            .insert(identifier.to_string(), updated.clone());
        Ok(updated)
    }

    /// Remove and return the reservation with this identifier
    pub fn remove(&mut self, identifier: &str) -> Result<Reservation> {
        self.entries
            .remove(identifier)
            .ok_or_else(|| Error::not_found(identifier))
    }

    /// Look up a reservation by identifier
    pub fn find(&self, identifier: &str) -> Result<&Reservation> {
        self.entries
            .get(identifier)
            .ok_or_else(|| Error::not_found(identifier))
    }

    /// Look up a reservation by hardware address
    pub fn find_by_hardware_address(&self, addr: crate::HardwareAddr) -> Option<&Reservation> {
        self.entries.values().find(|r| r.hardware_address == addr)
    }

    /// Produce the reservations ordered by the given key
    pub fn list(&self, key: SortKey<'_>) -> Vec<Reservation> {
        let mut out: Vec<Reservation> = self.entries.values().cloned().collect();
        match key {
            SortKey::Address => {
                out.sort_by_key(|r| u32::from(r.address));
            }
            SortKey::DisplayName => {
                out.sort_by_key(|r| (r.display_name.to_lowercase(), u32::from(r.address)));
            }
            SortKey::Reachability(status) => {
                // reachable < unknown < unreachable
                let rank = |r: &Reservation| match status.get(&r.address).copied() {
                    Some(true) => 0u8,
                    None => 1,
                    Some(false) => 2,
                };
                out.sort_by_key(|r| (rank(r), u32::from(r.address)));
            }
        }
        out
    }
}
