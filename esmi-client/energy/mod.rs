use once_cell::sync::OnceCell;

use esmi_raw::energy::msr::{MSR_CORE_ENERGY_STATUS, MSR_PKG_ENERGY_STATUS, MSR_RAPL_POWER_UNIT};
use esmi_raw::energy::{counter_to_microjoules, PowerUnit};
use esmi_raw::RegisterLayout;

use crate::common::topology::CpuTopology;
use crate::error::{EsmiError, Result};
use crate::host::{parse_counter, HostDevice, HostFile, HostOs};

name_enum! {
    /// Where energy counters come from on this platform
    pub enum EnergyPath {
        AccumulatingCounterFile => "amd_energy counter files",
        ScaledRegister => "energy MSRs",
    }
}

impl EnergyPath {
    /// Error reported when the driver behind this path is missing
    pub fn driver_absent(&self) -> EsmiError {
        match self {
            EnergyPath::AccumulatingCounterFile => EsmiError::EnergyDriverAbsent,
            EnergyPath::ScaledRegister => EsmiError::RegisterDriverAbsent,
        }
    }

    pub fn driver_present<H: HostOs>(&self, host: &H) -> bool {
        match self {
            EnergyPath::AccumulatingCounterFile => host.energy_driver_present(),
            EnergyPath::ScaledRegister => host.register_driver_present(),
        }
    }
}

/// Milan (family 19h, models 00h-0Fh and 30h-3Fh) exposes accumulated
/// counters through amd_energy; everything else is read from the MSRs.
pub fn select_energy_path(family: u32, model: u32) -> EnergyPath {
    match (family, model) {
        (0x19, 0x00..=0x0F) | (0x19, 0x30..=0x3F) => EnergyPath::AccumulatingCounterFile,
        _ => EnergyPath::ScaledRegister,
    }
}

/// Energy reads over one selected path
pub struct EnergyMonitor<'a, H: HostOs> {
    host: &'a H,
    topology: &'a CpuTopology,
    path: EnergyPath,
    energy_unit: &'a OnceCell<u32>,
}

impl<'a, H: HostOs> EnergyMonitor<'a, H> {
    pub fn new(
        host: &'a H,
        topology: &'a CpuTopology,
        path: EnergyPath,
        energy_unit: &'a OnceCell<u32>,
    ) -> Self {
        Self {
            host,
            topology,
            path,
            energy_unit,
        }
    }

    /// Number of values `read_all` produces: physical cores, then sockets
    pub fn entry_count(&self) -> usize {
        (self.topology.physical_cores() + self.topology.sockets) as usize
    }

    /// SMT siblings share one counter
    fn fold(&self, core: u32) -> u32 {
        core % self.topology.physical_cores()
    }

    /// Accumulated energy of a core in microjoules
    pub fn read_core(&self, core: u32) -> Result<u64> {
        if core >= self.topology.core_count() {
            return Err(EsmiError::InvalidInput(format!(
                "core {core} out of range (0..{})",
                self.topology.core_count()
            )));
        }
        let physical = self.fold(core);

        match self.path {
            EnergyPath::AccumulatingCounterFile => self.read_counter(physical + 1),
            EnergyPath::ScaledRegister => self.read_register(physical, MSR_CORE_ENERGY_STATUS),
        }
    }

    /// Accumulated energy of a socket in microjoules
    pub fn read_socket(&self, socket: u32) -> Result<u64> {
        if socket >= self.topology.sockets {
            return Err(EsmiError::InvalidInput(format!(
                "socket {socket} out of range (0..{})",
                self.topology.sockets
            )));
        }

        match self.path {
            EnergyPath::AccumulatingCounterFile => {
                self.read_counter(self.topology.physical_cores() + socket + 1)
            }
            EnergyPath::ScaledRegister => {
                let cpu = self.topology.first_core_on_socket(socket).ok_or_else(|| {
                    EsmiError::DeviceNotPresent(format!("no mapped core on socket {socket}"))
                })?;
                self.read_register(cpu, MSR_PKG_ENERGY_STATUS)
            }
        }
    }

    /// Every core then every socket; entries that are not present read as 0
    pub fn read_all(&self) -> Result<Vec<u64>> {
        let mut energies = vec![0; self.entry_count()];
        self.read_into(&mut energies)?;
        Ok(energies)
    }

    /// Fill `buf` with `read_all` values; extra trailing slots are left alone
    pub fn read_into(&self, buf: &mut [u64]) -> Result<()> {
        if buf.is_empty() {
            return Err(EsmiError::NullArgument("energy buffer"));
        }
        let needed = self.entry_count();
        if buf.len() < needed {
            return Err(EsmiError::UnexpectedSize {
                expected: needed,
                actual: buf.len(),
            });
        }

        let physical = self.topology.physical_cores();
        let cores = (0..physical).map(|c| (c, self.read_core(c)));
        let sockets = (0..self.topology.sockets).map(|s| (physical + s, self.read_socket(s)));

        for (slot, result) in cores.chain(sockets) {
            buf[slot as usize] = match result {
                Ok(value) => value,
                Err(e) if e.is_not_present() => {
                    tracing::debug!("Energy entry {slot} not present, reporting 0");
                    0
                }
                Err(e) => return Err(e),
            };
        }
        Ok(())
    }

    fn read_counter(&self, index: u32) -> Result<u64> {
        let text = self.host.read_text(HostFile::EnergyCounter(index))?;
        let value = parse_counter(&text)?;
        tracing::debug!("energy{index}_input = {value} uJ");
        Ok(value)
    }

    fn read_register(&self, cpu: u32, register: u64) -> Result<u64> {
        let shift = self.energy_unit_shift()?;
        let raw = self.host.read_u64_at(HostDevice::EnergyRegister(cpu), register)?;
        Ok(counter_to_microjoules(raw, shift))
    }

    /// Energy status unit, read once from the lowest mapped core
    fn energy_unit_shift(&self) -> Result<u32> {
        self.energy_unit
            .get_or_try_init(|| -> Result<u32> {
                let cpu = self.topology.first_core_on_socket(0).unwrap_or(0);
                let raw = self
                    .host
                    .read_u64_at(HostDevice::EnergyRegister(cpu), MSR_RAPL_POWER_UNIT)?;
                let unit = PowerUnit::from_raw(raw);
                tracing::info!("Energy status unit: 1/2^{} J (CPU {cpu})", unit.energy_units);
                Ok(unit.energy_units as u32)
            })
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::topology::build_topology;
    use crate::error::EsmiStatus;
    use crate::host::fake::{FakeHost, FakeRead};

    fn topology(host: &FakeHost) -> CpuTopology {
        build_topology(host.cpuinfo.as_deref().unwrap()).unwrap()
    }

    #[test]
    fn test_path_selection() {
        assert_eq!(select_energy_path(0x19, 0x01), EnergyPath::AccumulatingCounterFile);
        assert_eq!(select_energy_path(0x19, 0x30), EnergyPath::AccumulatingCounterFile);
        assert_eq!(select_energy_path(0x19, 0x3F), EnergyPath::AccumulatingCounterFile);
        assert_eq!(select_energy_path(0x19, 0x11), EnergyPath::ScaledRegister);
        assert_eq!(select_energy_path(0x17, 0x31), EnergyPath::ScaledRegister);
        assert_eq!(select_energy_path(0x1A, 0x02), EnergyPath::ScaledRegister);
    }

    #[test]
    fn test_smt_siblings_read_the_same_counter() {
        let mut host = FakeHost::epyc(2, 8, 2, 0x01, 4);
        host.counters.insert(2, FakeRead::Value(5_000));
        let topo = topology(&host);
        let unit = OnceCell::new();
        let monitor = EnergyMonitor::new(&host, &topo, EnergyPath::AccumulatingCounterFile, &unit);

        // 8 physical cores: core 1 and core 9 are siblings
        assert_eq!(monitor.read_core(1).unwrap(), 5_000);
        assert_eq!(monitor.read_core(9).unwrap(), 5_000);
    }

    #[test]
    fn test_socket_counter_follows_core_counters() {
        let mut host = FakeHost::epyc(2, 8, 2, 0x01, 4);
        host.counters.insert(8 + 1 + 1, FakeRead::Value(77));
        let topo = topology(&host);
        let unit = OnceCell::new();
        let monitor = EnergyMonitor::new(&host, &topo, EnergyPath::AccumulatingCounterFile, &unit);

        assert_eq!(monitor.read_socket(1).unwrap(), 77);
    }

    #[test]
    fn test_socket_register_comes_from_first_core_of_socket() {
        let mut host = FakeHost::epyc(2, 8, 2, 0x11, 5);
        // ESU = 16: 0x10000 raw is 1 J
        host.registers
            .insert((4, MSR_PKG_ENERGY_STATUS), FakeRead::Value(0x3_0000));
        host.registers
            .insert((4, MSR_CORE_ENERGY_STATUS), FakeRead::Value(0x1_0000));
        let topo = topology(&host);
        let unit = OnceCell::new();
        let monitor = EnergyMonitor::new(&host, &topo, EnergyPath::ScaledRegister, &unit);

        assert_eq!(monitor.read_socket(1).unwrap(), 3_000_000);
        assert_eq!(monitor.read_core(4).unwrap(), 1_000_000);
    }

    #[test]
    fn test_energy_unit_read_once() {
        let mut host = FakeHost::epyc(1, 4, 1, 0x11, 5);
        for cpu in 0..4 {
            host.registers
                .insert((cpu, MSR_CORE_ENERGY_STATUS), FakeRead::Value(0x8000));
        }
        let topo = topology(&host);
        let unit = OnceCell::new();
        let monitor = EnergyMonitor::new(&host, &topo, EnergyPath::ScaledRegister, &unit);

        for cpu in 0..4 {
            assert_eq!(monitor.read_core(cpu).unwrap(), 500_000);
        }
        let unit_reads = host
            .register_reads
            .lock()
            .iter()
            .filter(|(_, reg)| *reg == MSR_RAPL_POWER_UNIT)
            .count();
        assert_eq!(unit_reads, 1);
        assert_eq!(unit.get(), Some(&16));
    }

    #[test]
    fn test_batch_zeroes_missing_entries() {
        let mut host = FakeHost::epyc(2, 2, 1, 0x01, 4);
        for index in 1..=6 {
            host.counters.insert(index, FakeRead::Value(index as u64 * 10));
        }
        host.counters.insert(3, FakeRead::Errno(libc::ENODEV));
        let topo = topology(&host);
        let unit = OnceCell::new();
        let monitor = EnergyMonitor::new(&host, &topo, EnergyPath::AccumulatingCounterFile, &unit);

        let energies = monitor.read_all().unwrap();
        assert_eq!(energies.len(), 4 + 2);
        assert_eq!(monitor.entry_count(), 6);
        assert_eq!(energies, vec![10, 20, 0, 40, 50, 60]);
    }

    #[test]
    fn test_batch_aborts_on_other_errors() {
        let mut host = FakeHost::epyc(1, 4, 1, 0x01, 4);
        for index in 1..=5 {
            host.counters.insert(index, FakeRead::Value(1));
        }
        host.counters.insert(2, FakeRead::Errno(libc::EACCES));
        let topo = topology(&host);
        let unit = OnceCell::new();
        let monitor = EnergyMonitor::new(&host, &topo, EnergyPath::AccumulatingCounterFile, &unit);

        assert_eq!(
            monitor.read_all().unwrap_err().status(),
            EsmiStatus::PermissionDenied
        );
    }

    #[test]
    fn test_read_into_checks_buffer() {
        let host = FakeHost::epyc(1, 4, 1, 0x01, 4);
        let topo = topology(&host);
        let unit = OnceCell::new();
        let monitor = EnergyMonitor::new(&host, &topo, EnergyPath::AccumulatingCounterFile, &unit);

        assert!(matches!(
            monitor.read_into(&mut []),
            Err(EsmiError::NullArgument(_))
        ));
        assert!(matches!(
            monitor.read_into(&mut [0; 3]),
            Err(EsmiError::UnexpectedSize {
                expected: 5,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_index_validation_precedes_io() {
        let host = FakeHost::epyc(1, 4, 1, 0x11, 5);
        let topo = topology(&host);
        let unit = OnceCell::new();
        let monitor = EnergyMonitor::new(&host, &topo, EnergyPath::ScaledRegister, &unit);

        assert!(matches!(monitor.read_core(4), Err(EsmiError::InvalidInput(_))));
        assert!(matches!(monitor.read_socket(1), Err(EsmiError::InvalidInput(_))));
        assert!(host.register_reads.lock().is_empty());
    }
}
