//! In-memory host used by unit tests

use std::collections::HashMap;
use std::io;

use parking_lot::Mutex;

use esmi_raw::energy::msr::MSR_RAPL_POWER_UNIT;
use esmi_raw::{HsmpMessage, HsmpMessageId};

use crate::host::{HostDevice, HostFile, HostOs};

/// Outcome of one scripted read
#[derive(Debug, Clone, Copy)]
pub enum FakeRead {
    Value(u64),
    Errno(i32),
}

impl FakeRead {
    fn result(self) -> io::Result<u64> {
        match self {
            FakeRead::Value(v) => Ok(v),
            FakeRead::Errno(errno) => Err(io::Error::from_raw_os_error(errno)),
        }
    }
}

#[derive(Debug)]
pub struct FakeHost {
    pub cpuinfo: Option<String>,
    pub counters: HashMap<u32, FakeRead>,
    pub registers: HashMap<(u32, u64), FakeRead>,
    pub metrics: HashMap<u32, Vec<u8>>,
    pub protocol: u32,
    pub responses: HashMap<u32, Vec<u32>>,
    pub mailbox_errno: Option<i32>,
    pub loopback_offset: u32,
    pub energy_driver: bool,
    pub register_driver: bool,
    pub mailbox_driver: bool,
    pub exchanges: Mutex<Vec<HsmpMessage>>,
    pub register_reads: Mutex<Vec<(u32, u64)>>,
}

impl FakeHost {
    /// A platform with `logical_per_socket` CPUs per socket and every driver present
    ///
    /// Logical CPU `c` and `c + physical_cores` are SMT siblings, matching
    /// Linux enumeration on EPYC.
    pub fn epyc(
        sockets: u32,
        logical_per_socket: u32,
        threads_per_core: u32,
        model: u32,
        protocol: u32,
    ) -> Self {
        Self {
            cpuinfo: Some(cpuinfo(sockets, logical_per_socket, threads_per_core, 0x19, model)),
            counters: HashMap::new(),
            registers: HashMap::from([((0, MSR_RAPL_POWER_UNIT), FakeRead::Value(0x000A_1003))]),
            metrics: HashMap::new(),
            protocol,
            responses: HashMap::new(),
            mailbox_errno: None,
            loopback_offset: 1,
            energy_driver: true,
            register_driver: true,
            mailbox_driver: true,
            exchanges: Mutex::new(Vec::new()),
            register_reads: Mutex::new(Vec::new()),
        }
    }

    pub fn respond(mut self, id: HsmpMessageId, words: &[u32]) -> Self {
        self.responses.insert(id.id(), words.to_vec());
        self
    }

    pub fn exchange_count(&self) -> usize {
        self.exchanges.lock().len()
    }

    /// Exchanges made after the protocol probe during init
    pub fn commands(&self) -> Vec<HsmpMessage> {
        self.exchanges
            .lock()
            .iter()
            .filter(|m| m.msg_id != HsmpMessageId::GetProtoVersion.id())
            .copied()
            .collect()
    }
}

/// Render cpuinfo records for a homogeneous AMD platform
pub fn cpuinfo(
    sockets: u32,
    logical_per_socket: u32,
    threads_per_core: u32,
    family: u32,
    model: u32,
) -> String {
    let total = sockets * logical_per_socket;
    let physical = total / threads_per_core;
    let physical_per_socket = physical / sockets;

    let mut text = String::new();
    for cpu in 0..total {
        let core = cpu % physical;
        let socket = core / physical_per_socket;
        let thread = cpu / physical;
        let apic = (socket << 7) | ((core % physical_per_socket) << 1) | thread;

        text.push_str(&format!(
            "processor\t: {cpu}\nvendor_id\t: AuthenticAMD\ncpu family\t: {family}\n\
             model\t\t: {model}\nphysical id\t: {socket}\nsiblings\t: {logical_per_socket}\n\
             core id\t\t: {}\ncpu cores\t: {physical_per_socket}\napicid\t\t: {apic}\n\n",
            core % physical_per_socket
        ));
    }
    text
}

impl HostOs for FakeHost {
    fn read_bytes(&self, file: HostFile) -> io::Result<Vec<u8>> {
        match file {
            HostFile::CpuInfo => self
                .cpuinfo
                .clone()
                .map(String::into_bytes)
                .ok_or_else(|| io::Error::from_raw_os_error(libc::ENOENT)),
            HostFile::EnergyCounter(index) => {
                let read = self
                    .counters
                    .get(&index)
                    .copied()
                    .unwrap_or(FakeRead::Errno(libc::ENOENT));
                read.result().map(|v| format!("{v}\n").into_bytes())
            }
            HostFile::MetricsTable(socket) => self
                .metrics
                .get(&socket)
                .cloned()
                .ok_or_else(|| io::Error::from_raw_os_error(libc::ENOENT)),
        }
    }

    fn read_u64_at(&self, device: HostDevice, offset: u64) -> io::Result<u64> {
        let HostDevice::EnergyRegister(cpu) = device;
        self.register_reads.lock().push((cpu, offset));
        self.registers
            .get(&(cpu, offset))
            .copied()
            .unwrap_or(FakeRead::Errno(libc::EIO))
            .result()
    }

    fn mailbox_exchange(&self, message: &mut HsmpMessage) -> io::Result<()> {
        self.exchanges.lock().push(*message);

        if let Some(errno) = self.mailbox_errno {
            return Err(io::Error::from_raw_os_error(errno));
        }

        let id = message.msg_id;
        if id == HsmpMessageId::GetProtoVersion.id() {
            message.args[0] = self.protocol;
        } else if id == HsmpMessageId::Test.id() {
            message.args[0] = message.args[0].wrapping_add(self.loopback_offset);
        } else if let Some(words) = self.responses.get(&id) {
            message.args[..words.len()].copy_from_slice(words);
        } else {
            message.args = [0; esmi_raw::HSMP_MAX_MSG_LEN];
        }
        Ok(())
    }

    fn energy_driver_present(&self) -> bool {
        self.energy_driver
    }

    fn register_driver_present(&self) -> bool {
        self.register_driver
    }

    fn mailbox_driver_present(&self) -> bool {
        self.mailbox_driver
    }
}
