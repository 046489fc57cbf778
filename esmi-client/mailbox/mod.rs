//! HSMP mailbox client
//!
//! A command goes through four steps, all within one call:
//!
//! 1. **Built** - a [`MailboxRequest`] is assembled from the message id,
//!    target socket and input words.
//! 2. **Gated** - the id is checked against the active [`CapabilityTable`];
//!    unsupported ids fail with `UnsupportedCommand` and never reach the host.
//! 3. **Submitted** - exactly one host exchange; failures are mapped and
//!    returned, never retried.
//! 4. **Decoded** - the caller unpacks the [`MailboxResponse`] words with the
//!    pure layouts in `esmi_raw::hsmp::layout`.

pub mod capability;

use esmi_raw::{HsmpMessage, HsmpMessageId, HSMP_MAX_MSG_LEN};

use crate::error::{EsmiError, Result};
use crate::host::HostOs;

pub use capability::{
    CapabilityEntry, CapabilityTable, LinkTable, PlatformLimits, ProtocolVersion,
};

/// A command ready to be gated and submitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MailboxRequest {
    id: HsmpMessageId,
    socket: u32,
    args: [u32; HSMP_MAX_MSG_LEN],
    num_args: usize,
    response_words: usize,
}

impl MailboxRequest {
    pub fn new(id: HsmpMessageId, socket: u32) -> Self {
        Self {
            id,
            socket,
            args: [0; HSMP_MAX_MSG_LEN],
            num_args: 0,
            response_words: 0,
        }
    }

    /// Append one input word
    pub fn arg(mut self, word: u32) -> Self {
        debug_assert!(self.num_args < HSMP_MAX_MSG_LEN, "too many HSMP arguments");
        if self.num_args < HSMP_MAX_MSG_LEN {
            self.args[self.num_args] = word;
            self.num_args += 1;
        }
        self
    }

    /// Number of response words to read back
    pub fn response_words(mut self, words: usize) -> Self {
        self.response_words = words.min(HSMP_MAX_MSG_LEN);
        self
    }

    pub fn id(&self) -> HsmpMessageId {
        self.id
    }

    pub fn socket(&self) -> u32 {
        self.socket
    }

    pub fn args(&self) -> &[u32] {
        &self.args[..self.num_args]
    }

    fn to_message(self) -> HsmpMessage {
        HsmpMessage {
            msg_id: self.id.id(),
            num_args: self.num_args as u16,
            response_sz: self.response_words as u16,
            args: self.args,
            sock_ind: self.socket as u16,
        }
    }
}

/// Words returned by one exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MailboxResponse {
    words: [u32; HSMP_MAX_MSG_LEN],
    len: usize,
}

impl MailboxResponse {
    pub fn words(&self) -> &[u32] {
        &self.words[..self.len]
    }

    /// Word `index`, or 0 when the command returns fewer words
    pub fn word(&self, index: usize) -> u32 {
        self.words().get(index).copied().unwrap_or(0)
    }
}

/// Single choke point between typed operations and the host mailbox
pub struct MailboxClient<'a, H: HostOs> {
    host: &'a H,
    capabilities: CapabilityTable,
}

impl<'a, H: HostOs> MailboxClient<'a, H> {
    pub fn new(host: &'a H, capabilities: CapabilityTable) -> Self {
        Self { host, capabilities }
    }

    /// `UnsupportedCommand` unless `id` is in the capability table
    pub fn gate(&self, id: HsmpMessageId) -> Result<()> {
        if !self.capabilities.supports(id) {
            tracing::debug!("{} gated: not in capability table", id);
            return Err(EsmiError::UnsupportedCommand(id));
        }
        Ok(())
    }

    /// Gate, submit once, and hand back the raw response words
    pub fn submit(&self, request: MailboxRequest) -> Result<MailboxResponse> {
        self.gate(request.id)?;
        exchange(self.host, request)
    }
}

/// Submit without gating; used only for the protocol version probe
pub(crate) fn exchange<H: HostOs>(host: &H, request: MailboxRequest) -> Result<MailboxResponse> {
    let mut message = request.to_message();

    host.mailbox_exchange(&mut message).map_err(|e| {
        tracing::warn!(
            "HSMP {} on socket {} failed: {}",
            request.id,
            request.socket,
            e
        );
        EsmiError::from(e)
    })?;

    let response = MailboxResponse {
        words: message.args,
        len: request.response_words,
    };

    tracing::debug!(
        "HSMP {} socket {} args {:08x?} -> {:08x?}",
        request.id,
        request.socket,
        request.args(),
        response.words()
    );

    Ok(response)
}
