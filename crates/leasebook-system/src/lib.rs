// # leasebook-system
//
// Operating-system implementations of the leasebook trait seams.
//
// ## Purpose
//
// Everything here talks to the machine: the filesystem, `sudo`, `systemctl`,
// and the `ping` binary. The core library only sees the traits, so all of
// this stays swappable and the core stays testable with fakes.
//
// ## Implementations
//
// - [`LocalConfigIo`]: direct filesystem access with atomic replace writes
// - [`SudoConfigIo`]: stage-and-`sudo cp` writes for root-owned files
// - [`SystemdServiceControl`]: `systemctl restart` with the result checked
// - [`SystemPinger`]: single-packet `ping` probe

pub mod io;
pub mod ping;
pub mod service;

pub use io::{LocalConfigIo, SudoConfigIo};
pub use ping::SystemPinger;
pub use service::SystemdServiceControl;
