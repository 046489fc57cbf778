use esmi_raw::hsmp::metrics::{MetricsTable, METRICS_TABLE_SIZE};
use esmi_raw::HsmpMessageId;

use crate::error::{EsmiError, Result};
use crate::host::{HostFile, HostOs};
use crate::mailbox::MailboxRequest;
use crate::state::Esmi;

impl<H: HostOs> Esmi<H> {
    pub fn metrics_table_version(&self, socket: u32) -> Result<u32> {
        self.check_socket(socket)?;
        let response = self.mailbox()?.submit(
            MailboxRequest::new(HsmpMessageId::GetMetricTableVersion, socket).response_words(1),
        )?;
        Ok(response.word(0))
    }

    /// Read the socket's metrics table from the driver's binary attribute
    ///
    /// Gated like a mailbox command, but the table itself is read from the
    /// file the driver keeps refreshed.
    pub fn metrics_table(&self, socket: u32) -> Result<MetricsTable> {
        self.check_socket(socket)?;
        if !self.capabilities()?.supports(HsmpMessageId::GetMetricTable) {
            return Err(EsmiError::UnsupportedCommand(HsmpMessageId::GetMetricTable));
        }

        let bytes = self.host().read_bytes(HostFile::MetricsTable(socket))?;
        let table = MetricsTable::from_bytes(&bytes).ok_or(EsmiError::UnexpectedSize {
            expected: METRICS_TABLE_SIZE,
            actual: bytes.len(),
        })?;

        tracing::debug!(
            "Socket {socket} metrics table: accumulation counter {}",
            table.accumulation_counter
        );
        Ok(table)
    }

    /// Physical DRAM address the firmware copies the metrics table to
    pub fn metrics_table_dram_address(&self, socket: u32) -> Result<u64> {
        self.check_socket(socket)?;
        let response = self.mailbox()?.submit(
            MailboxRequest::new(HsmpMessageId::GetMetricTableDramAddr, socket).response_words(2),
        )?;
        Ok(((response.word(1) as u64) << 32) | response.word(0) as u64)
    }
}
