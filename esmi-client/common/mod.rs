pub mod arch;
pub mod topology;

pub use arch::{detect_platform, Platform};
pub use topology::{build_topology, CoreMapping, CpuIdentity, CpuTopology};
