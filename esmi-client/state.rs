//! Library context: lifecycle, detected platform data and shared validation
//!
//! An [`Esmi`] value owns the host accessor and everything discovered during
//! [`Esmi::init`]. Every telemetry or control method first checks that the
//! context is initialized (possibly degraded), then validates its indices,
//! and only then touches the host.

use once_cell::sync::OnceCell;

use esmi_raw::HsmpMessageId;

use crate::common::arch::{detect_platform, Platform};
use crate::common::topology::{build_topology, CpuTopology};
use crate::energy::{select_energy_path, EnergyMonitor, EnergyPath};
use crate::error::{EsmiError, Result};
use crate::host::{HostFile, HostOs};
use crate::mailbox::{
    self, CapabilityTable, LinkTable, MailboxClient, MailboxRequest, PlatformLimits,
    ProtocolVersion,
};

/// Why an initialized context runs with reduced functionality
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegradedReason {
    /// No mailbox driver, or firmware reported protocol 0
    NoMailbox,
    /// The driver for the selected energy path is absent
    NoEnergy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemState {
    Uninitialized,
    Initialized,
    Degraded(DegradedReason),
    ShutDown,
}

/// Outcome of a successful [`Esmi::init`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitStatus {
    Initialized,
    DegradedNoMailbox,
    DegradedNoEnergy,
}

/// Data discovered at init; immutable afterwards except for the energy-unit cache
#[derive(Debug)]
struct Session {
    topology: CpuTopology,
    platform: Platform,
    protocol: Option<ProtocolVersion>,
    selected_path: EnergyPath,
    energy_available: bool,
    capabilities: CapabilityTable,
    limits: PlatformLimits,
    links: LinkTable,
    energy_unit: OnceCell<u32>,
}

/// E-SMI client context over a host accessor
pub struct Esmi<H: HostOs> {
    host: H,
    state: SystemState,
    session: Option<Session>,
}

impl<H: HostOs> Esmi<H> {
    pub fn new(host: H) -> Self {
        Self {
            host,
            state: SystemState::Uninitialized,
            session: None,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Discover topology, platform, energy path and mailbox protocol
    ///
    /// Fails with `UnsupportedPlatform` for non-AMD or pre-Zen 2 processors
    /// and with `NoDriver` when neither the energy driver nor the mailbox is
    /// usable. A context that was shut down may be initialized again.
    pub fn init(&mut self) -> Result<InitStatus> {
        if matches!(
            self.state,
            SystemState::Initialized | SystemState::Degraded(_)
        ) {
            return Err(EsmiError::InvalidInput(
                "context already initialized".to_string(),
            ));
        }

        let cpuinfo = self.host.read_text(HostFile::CpuInfo)?;
        let topology = build_topology(&cpuinfo)?;
        let platform = detect_platform(&topology.identity)?;

        let selected_path = select_energy_path(topology.identity.family, topology.identity.model);
        let energy_available = selected_path.driver_present(&self.host);
        if !energy_available {
            tracing::warn!("Energy path '{}' unavailable: driver absent", selected_path.name());
        }

        let protocol = self.probe_protocol();

        if protocol.is_none() && !energy_available {
            return Err(EsmiError::NoDriver);
        }

        let (capabilities, limits, links) = match protocol {
            Some(version) => (version.capabilities(), version.limits(), version.link_table()),
            None => (
                CapabilityTable::empty(),
                PlatformLimits::default(),
                LinkTable::empty(),
            ),
        };

        let (state, status) = match (protocol, energy_available) {
            (None, _) => (
                SystemState::Degraded(DegradedReason::NoMailbox),
                InitStatus::DegradedNoMailbox,
            ),
            (Some(_), false) => (
                SystemState::Degraded(DegradedReason::NoEnergy),
                InitStatus::DegradedNoEnergy,
            ),
            (Some(_), true) => (SystemState::Initialized, InitStatus::Initialized),
        };

        tracing::info!(
            "E-SMI initialized: {} sockets, {} CPUs, {} threads/core, platform {}, HSMP protocol {}, energy via {}",
            topology.sockets,
            topology.core_count(),
            topology.threads_per_core,
            platform.name(),
            protocol.map_or(0, |v| v.raw()),
            selected_path.name()
        );

        self.session = Some(Session {
            topology,
            platform,
            protocol,
            selected_path,
            energy_available,
            capabilities,
            limits,
            links,
            energy_unit: OnceCell::new(),
        });
        self.state = state;

        Ok(status)
    }

    fn probe_protocol(&self) -> Option<ProtocolVersion> {
        if !self.host.mailbox_driver_present() {
            tracing::warn!("HSMP driver not present, mailbox commands disabled");
            return None;
        }

        let request = MailboxRequest::new(HsmpMessageId::GetProtoVersion, 0).response_words(1);
        match mailbox::exchange(&self.host, request) {
            Ok(response) => {
                let version = ProtocolVersion::from_raw(response.word(0));
                if version.is_none() {
                    tracing::warn!("Firmware reported HSMP protocol 0, mailbox commands disabled");
                }
                version
            }
            Err(e) => {
                tracing::warn!("HSMP protocol probe failed: {e}");
                None
            }
        }
    }

    pub fn status(&self) -> SystemState {
        self.state
    }

    /// Release the context; later calls fail with `NotInitialized`
    pub fn shutdown(&mut self) {
        if self.session.take().is_some() {
            tracing::debug!("E-SMI context shut down");
        }
        self.state = SystemState::ShutDown;
    }

    fn session(&self) -> Result<&Session> {
        match self.state {
            SystemState::Initialized | SystemState::Degraded(_) => {
                self.session.as_ref().ok_or(EsmiError::NotInitialized)
            }
            SystemState::Uninitialized | SystemState::ShutDown => Err(EsmiError::NotInitialized),
        }
    }

    pub(crate) fn mailbox(&self) -> Result<MailboxClient<'_, H>> {
        let session = self.session()?;
        Ok(MailboxClient::new(&self.host, session.capabilities))
    }

    pub(crate) fn energy(&self) -> Result<EnergyMonitor<'_, H>> {
        let session = self.session()?;
        if !session.energy_available {
            return Err(session.selected_path.driver_absent());
        }
        Ok(EnergyMonitor::new(
            &self.host,
            &session.topology,
            session.selected_path,
            &session.energy_unit,
        ))
    }

    pub(crate) fn check_socket(&self, socket: u32) -> Result<()> {
        let sockets = self.session()?.topology.sockets;
        if socket >= sockets {
            return Err(EsmiError::InvalidInput(format!(
                "socket {socket} out of range (0..{sockets})"
            )));
        }
        Ok(())
    }

    pub(crate) fn check_core(&self, core: u32) -> Result<()> {
        let cores = self.session()?.topology.core_count();
        if core >= cores {
            return Err(EsmiError::InvalidInput(format!(
                "core {core} out of range (0..{cores})"
            )));
        }
        Ok(())
    }

    pub fn topology(&self) -> Result<&CpuTopology> {
        Ok(&self.session()?.topology)
    }

    pub fn cpu_family(&self) -> Result<u32> {
        Ok(self.topology()?.identity.family)
    }

    pub fn cpu_model(&self) -> Result<u32> {
        Ok(self.topology()?.identity.model)
    }

    pub fn number_of_sockets(&self) -> Result<u32> {
        Ok(self.topology()?.sockets)
    }

    /// Logical CPUs, SMT siblings included
    pub fn number_of_cpus(&self) -> Result<u32> {
        Ok(self.topology()?.core_count())
    }

    pub fn threads_per_core(&self) -> Result<u32> {
        Ok(self.topology()?.threads_per_core)
    }

    pub fn platform(&self) -> Result<Platform> {
        Ok(self.session()?.platform)
    }

    pub fn protocol_version(&self) -> Result<ProtocolVersion> {
        self.session()?
            .protocol
            .ok_or(EsmiError::MailboxDriverAbsent)
    }

    /// Path selected from family/model, whether or not its driver is loaded
    pub fn energy_path(&self) -> Result<EnergyPath> {
        Ok(self.session()?.selected_path)
    }

    pub fn capabilities(&self) -> Result<CapabilityTable> {
        Ok(self.session()?.capabilities)
    }

    pub fn limits(&self) -> Result<PlatformLimits> {
        Ok(self.session()?.limits)
    }

    /// Platform limits for a command that is gated on `id`
    pub(crate) fn limits_for(&self, id: HsmpMessageId) -> Result<PlatformLimits> {
        self.mailbox()?.gate(id)?;
        self.limits()
    }

    pub fn link_table(&self) -> Result<LinkTable> {
        Ok(self.session()?.links)
    }
}
