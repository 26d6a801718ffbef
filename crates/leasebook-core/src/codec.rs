// # Reservation Line Codec
//
// Bidirectional mapping between the registry's flat-file line grammar and
// reservation records.
//
// ## Line grammar
//
// ```text
// <prefix>=<hw>:<hw>:<hw>:<hw>:<hw>:<hw>,<ip>,<identifier>,<lease-marker>
// ```
//
// The prefix and lease marker are opaque tokens owned by the dependent DHCP
// service's configuration syntax (`dhcp-host` / `infinite` for dnsmasq) and
// are supplied through [`LineFormat`]. The host file may contain arbitrary
// unrelated directives; lines that do not match the grammar are passed
// through untouched, never treated as errors.
//
// This component is pure text transformation. It performs no I/O and knows
// nothing about the registry's uniqueness invariants.

use std::net::Ipv4Addr;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::reservation::{HardwareAddr, Reservation};

/// Fixed tokens of the reservation line grammar
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineFormat {
    /// Literal directive prefix before the `=`
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Trailing token marking a never-expiring lease
    #[serde(default = "default_lease_marker")]
    pub lease_marker: String,
}

impl Default for LineFormat {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            lease_marker: default_lease_marker(),
        }
    }
}

fn default_prefix() -> String {
    "dhcp-host".to_string()
}

fn default_lease_marker() -> String {
    "infinite".to_string()
}

/// One triple extracted from a reservation line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedLease {
    /// Hardware address, normalized to canonical lowercase
    pub hardware_address: HardwareAddr,
    /// Assigned IPv4 address
    pub address: Ipv4Addr,
    /// Free-form identifier token
    pub identifier: String,
}

/// Parser/serializer for the reservation line grammar
#[derive(Debug, Clone)]
pub struct ConfigTextCodec {
    format: LineFormat,
    line: Regex,
}

impl ConfigTextCodec {
    /// Build a codec for the given line format
    pub fn new(format: LineFormat) -> Self {
        // hw token is case-insensitive on input; identifier runs to the next
        // comma or end of line. Anything after a third comma is ignored.
        let pattern = format!(
            r"^{}=([0-9A-Fa-f]{{2}}(?::[0-9A-Fa-f]{{2}}){{5}}),(\d{{1,3}}(?:\.\d{{1,3}}){{3}}),([^,\r\n]+)",
            regex::escape(&format.prefix)
        );
        let line = Regex::new(&pattern).expect("reservation line pattern is valid");
        Self { format, line }
    }

    /// The format this codec was built with
    pub fn format(&self) -> &LineFormat {
        &self.format
    }

    /// Extract all reservation triples from raw text.
    ///
    /// Non-matching lines (comments, unrelated directives, malformed
    /// addresses) are skipped.
    pub fn decode(&self, raw: &str) -> Vec<DecodedLease> {
        raw.lines()
            .filter_map(|line| self.decode_line(line))
            .collect()
    }

    /// Decode a single line, or `None` if it is not a reservation line
    pub fn decode_line(&self, line: &str) -> Option<DecodedLease> {
        let caps = self.line.captures(line)?;
        let hardware_address: HardwareAddr = caps[1].parse().ok()?;
        // The octet pattern admits values over 255; treat those lines as
        // unrelated rather than erroring.
        let address: Ipv4Addr = caps[2].parse().ok()?;
        Some(DecodedLease {
            hardware_address,
            address,
            identifier: caps[3].to_string(),
        })
    }

    /// Serialize one reservation as a single line, no-expiry marker appended.
    ///
    /// The result carries no trailing newline; it is suitable for appending
    /// to or splicing into raw text.
    pub fn encode(&self, reservation: &Reservation) -> String {
        format!(
            "{}={},{},{},{}",
            self.format.prefix,
            reservation.hardware_address,
            reservation.address,
            reservation.identifier,
            self.format.lease_marker
        )
    }

    /// Replace the line describing `old` with the encoding of `new`.
    ///
    /// The line is located by exact `(hardware address, address, identifier)`
    /// match first; if no line matches exactly (hand edits may have drifted),
    /// the first line carrying `old`'s hardware address is used instead.
    pub fn replace_line(
        &self,
        raw: &str,
        old: &Reservation,
        new: &Reservation,
    ) -> Result<String> {
        let mut lines: Vec<String> = raw.split('\n').map(str::to_string).collect();

        let exact = |lease: &DecodedLease| {
            lease.hardware_address == old.hardware_address
                && lease.address == old.address
                && lease.identifier == old.identifier
        };

        let position = lines
            .iter()
            .position(|l| self.decode_line(l).is_some_and(|lease| exact(&lease)))
            .or_else(|| {
                lines.iter().position(|l| {
                    self.decode_line(l)
                        .is_some_and(|lease| lease.hardware_address == old.hardware_address)
                })
            })
            .ok_or_else(|| Error::LineNotFound(old.hardware_address.to_string()))?;

        lines[position] = self.encode(new);
        Ok(lines.join("\n"))
    }

    /// Remove every reservation line matching the predicate.
    ///
    /// Unrelated lines are preserved verbatim and in order, including blank
    /// lines and the trailing-newline shape of the input.
    pub fn remove_lines(&self, raw: &str, predicate: impl Fn(&DecodedLease) -> bool) -> String {
        let kept: Vec<&str> = raw
            .split('\n')
            .filter(|line| match self.decode_line(line) {
                Some(lease) => !predicate(&lease),
                None => true,
            })
            .collect();
        kept.join("\n")
    }
}

impl Default for ConfigTextCodec {
    fn default() -> Self {
        Self::new(LineFormat::default())
    }
}
