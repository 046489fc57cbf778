use std::fs::OpenOptions;
use std::io;
use std::os::unix::io::AsRawFd;
use std::path::PathBuf;

use esmi_raw::hsmp::{HSMP_BASE_IOCTL_NR, HSMP_IOCTL_CMD_NR};
use esmi_raw::{HsmpMessage, HsmpMessageId};

use crate::config::HostConfig;
use crate::host::{HostDevice, HostFile, HostOs};

// _IOWR(0xF8, 0, struct hsmp_message)
nix::ioctl_readwrite!(
    hsmp_ioctl_cmd,
    HSMP_BASE_IOCTL_NR,
    HSMP_IOCTL_CMD_NR,
    HsmpMessage
);

/// [`HostOs`] backed by procfs, sysfs, `/dev/cpu/N/msr*` and `/dev/hsmp`
#[derive(Debug, Clone)]
pub struct LinuxHost {
    config: HostConfig,
}

impl LinuxHost {
    pub fn new(config: HostConfig) -> Self {
        Self { config }
    }

    pub fn auto_detect() -> Self {
        Self::new(HostConfig::auto_detect())
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    fn file_path(&self, file: HostFile) -> io::Result<PathBuf> {
        match file {
            HostFile::CpuInfo => Ok(self.config.cpuinfo.clone()),
            HostFile::EnergyCounter(index) => self
                .config
                .energy_counter(index)
                .ok_or_else(|| io::Error::from_raw_os_error(libc::ENODEV)),
            HostFile::MetricsTable(socket) => Ok(self.config.metrics_table(socket)),
        }
    }
}

impl HostOs for LinuxHost {
    fn read_bytes(&self, file: HostFile) -> io::Result<Vec<u8>> {
        let path = self.file_path(file)?;
        esmi_raw::read_all(&path).map_err(|e| {
            tracing::debug!("{e}");
            e.into_io_error()
        })
    }

    fn read_u64_at(&self, device: HostDevice, offset: u64) -> io::Result<u64> {
        let HostDevice::EnergyRegister(cpu) = device;
        let path = self
            .config
            .msr_device(cpu)
            .ok_or_else(|| io::Error::from_raw_os_error(libc::ENODEV))?;

        let value = esmi_raw::read_u64_at(&path, offset).map_err(|e| {
            tracing::debug!("{e}");
            e.into_io_error()
        })?;

        tracing::debug!("MSR read: CPU {} MSR 0x{:08x} = 0x{:016x}", cpu, offset, value);
        Ok(value)
    }

    fn mailbox_exchange(&self, message: &mut HsmpMessage) -> io::Result<()> {
        let writable = HsmpMessageId::from_u32(message.msg_id).is_some_and(|id| id.is_set());

        let device = OpenOptions::new()
            .read(true)
            .write(writable)
            .open(&self.config.hsmp_device)?;

        // SAFETY: HSMP_IOCTL_CMD copies a `struct hsmp_message` in and out.
        // `HsmpMessage` is #[repr(C)] with the uapi layout and `message` is a
        // valid exclusive reference for the duration of the call.
        unsafe { hsmp_ioctl_cmd(device.as_raw_fd(), message as *mut HsmpMessage) }
            .map_err(io::Error::from)?;

        Ok(())
    }

    fn energy_driver_present(&self) -> bool {
        self.config.energy_hwmon.is_some()
    }

    fn register_driver_present(&self) -> bool {
        self.config.msr_device_name.is_some()
    }

    fn mailbox_driver_present(&self) -> bool {
        self.config.hsmp_device.exists()
    }
}
