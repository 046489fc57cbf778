//! Host-OS access boundary
//!
//! Everything the client needs from the operating system goes through
//! [`HostOs`]: reading a logical file, reading a 64-bit value at an offset of
//! a logical register device, and one synchronous mailbox exchange. Each
//! call acquires and releases its handle within the call.

pub mod linux;

#[cfg(test)]
pub mod fake;

use std::io;

use esmi_raw::HsmpMessage;

pub use linux::LinuxHost;

/// Logical files the client reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostFile {
    /// Per-processor topology records
    CpuInfo,
    /// Accumulating energy counter, 1-based (cores first, then sockets)
    EnergyCounter(u32),
    /// Binary metrics table of a socket
    MetricsTable(u32),
}

/// Logical register devices the client reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostDevice {
    /// Energy/power-unit registers of a logical CPU
    EnergyRegister(u32),
}

pub trait HostOs {
    fn read_text(&self, file: HostFile) -> io::Result<String> {
        let bytes = self.read_bytes(file)?;
        String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    fn read_bytes(&self, file: HostFile) -> io::Result<Vec<u8>>;

    fn read_u64_at(&self, device: HostDevice, offset: u64) -> io::Result<u64>;

    /// One request/response exchange; the response overwrites `message.args`
    fn mailbox_exchange(&self, message: &mut HsmpMessage) -> io::Result<()>;

    fn energy_driver_present(&self) -> bool;

    fn register_driver_present(&self) -> bool;

    fn mailbox_driver_present(&self) -> bool;
}

impl<T: HostOs + ?Sized> HostOs for &T {
    fn read_text(&self, file: HostFile) -> io::Result<String> {
        (**self).read_text(file)
    }

    fn read_bytes(&self, file: HostFile) -> io::Result<Vec<u8>> {
        (**self).read_bytes(file)
    }

    fn read_u64_at(&self, device: HostDevice, offset: u64) -> io::Result<u64> {
        (**self).read_u64_at(device, offset)
    }

    fn mailbox_exchange(&self, message: &mut HsmpMessage) -> io::Result<()> {
        (**self).mailbox_exchange(message)
    }

    fn energy_driver_present(&self) -> bool {
        (**self).energy_driver_present()
    }

    fn register_driver_present(&self) -> bool {
        (**self).register_driver_present()
    }

    fn mailbox_driver_present(&self) -> bool {
        (**self).mailbox_driver_present()
    }
}

/// Parse an integer counter file (`"123456\n"`)
pub fn parse_counter(text: &str) -> io::Result<u64> {
    text.trim().parse::<u64>().map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("bad counter value {:?}: {e}", text.trim()),
        )
    })
}
