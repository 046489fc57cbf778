// Macros (must be first for visibility)
#[macro_use]
pub mod macros;

pub mod commands;
pub mod common;
pub mod config;
pub mod energy;
pub mod error;
pub mod host;
pub mod mailbox;
pub mod state;

pub use commands::{BandwidthType, ClockFrequencies, FreqLimitSource, FrequencyLimit, PowerCapUpdate};
pub use config::HostConfig;
pub use energy::EnergyPath;
pub use error::{EsmiError, EsmiStatus, Result};
pub use host::{HostOs, LinuxHost};
pub use mailbox::{CapabilityTable, ProtocolVersion};
pub use state::{DegradedReason, Esmi, InitStatus, SystemState};
