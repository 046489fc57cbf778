use crate::error::Result;
use crate::host::HostOs;
use crate::state::Esmi;

impl<H: HostOs> Esmi<H> {
    /// Accumulated core energy in microjoules; SMT siblings report the same value
    pub fn core_energy(&self, core: u32) -> Result<u64> {
        self.check_core(core)?;
        self.energy()?.read_core(core)
    }

    /// Accumulated socket energy in microjoules
    pub fn socket_energy(&self, socket: u32) -> Result<u64> {
        self.check_socket(socket)?;
        self.energy()?.read_socket(socket)
    }

    /// Physical cores followed by sockets
    pub fn all_energies(&self) -> Result<Vec<u64>> {
        self.energy()?.read_all()
    }

    /// Same as [`Esmi::all_energies`] into a caller buffer
    pub fn energies_into(&self, buf: &mut [u64]) -> Result<()> {
        self.energy()?.read_into(buf)
    }
}
