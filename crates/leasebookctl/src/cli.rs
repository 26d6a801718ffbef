use std::net::Ipv4Addr;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "leasebookctl")]
#[command(about = "Manage static DHCP reservations for a PXE netboot lab")]
pub struct Cli {
    /// Settings file (missing file means defaults)
    #[arg(long, default_value = "/etc/leasebook.json")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// List reservations.
    List(ListArgs),
    /// Add a reservation.
    Add(AddArgs),
    /// Edit a reservation's hardware address, address, or display name.
    Edit(EditArgs),
    /// Delete a reservation, optionally purging its boot trees.
    Delete(DeleteArgs),
    /// Print the next free address in the configured range.
    NextIp,
}

#[derive(Parser, Debug)]
pub struct ListArgs {
    #[arg(long, value_enum, default_value_t = SortOrder::Address)]
    pub sort: SortOrder,
    /// Probe every reservation and include online status.
    #[arg(long)]
    pub check: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
pub enum SortOrder {
    /// Numeric address order
    Address,
    /// Case-insensitive display name
    Name,
    /// Online first, then unknown, then offline
    Status,
}

#[derive(Parser, Debug)]
pub struct AddArgs {
    /// Stable node identifier (serial number or hostname)
    pub identifier: String,
    /// Hardware address, any case, colon-separated
    pub mac: String,
    /// Address to reserve; the next free one in the range when omitted
    pub address: Option<Ipv4Addr>,
}

#[derive(Parser, Debug)]
pub struct EditArgs {
    pub identifier: String,
    /// New hardware address
    #[arg(long)]
    pub mac: Option<String>,
    /// New IPv4 address
    #[arg(long)]
    pub address: Option<Ipv4Addr>,
    /// New display name
    #[arg(long)]
    pub name: Option<String>,
}

#[derive(Parser, Debug)]
pub struct DeleteArgs {
    pub identifier: String,
    /// Also remove the node's TFTP and NFS trees. Unrecoverable.
    #[arg(long)]
    pub purge_files: bool,
}
