//! Command/response engine
//!
//! Sends one command at a time and reads one event back for it. No command is
//! issued until the read for the previous one has returned.

use crate::config::{AckPolicy, EngineConfig};
use crate::error::{Error, Result};
use crate::hci::constants::*;
use crate::hci::packet::{CommandFrame, EventFrame};
use crate::hci::transport::HciTransport;
use tracing::{debug, info, warn};

/// How a reset sequence ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetOutcome {
    /// An event arrived on this attempt (1-based)
    Acknowledged { attempt: usize },
    /// Every attempt timed out
    Unacknowledged,
}

pub struct CommandEngine<T> {
    transport: T,
    config: EngineConfig,
    last_opcode: Option<u16>,
    buffer: [u8; HCI_MAX_EVENT_SIZE],
}

impl<T: HciTransport> CommandEngine<T> {
    pub fn new(transport: T, config: EngineConfig) -> Self {
        Self {
            transport,
            config,
            last_opcode: None,
            buffer: [0; HCI_MAX_EVENT_SIZE],
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Write `frame` to the controller
    pub fn send_command(&mut self, frame: &CommandFrame) -> Result<()> {
        if self.config.hexdump {
            debug!("Writing {}", hex::encode(frame.to_packet()));
        }
        self.transport.write_command(frame)?;
        self.last_opcode = Some(frame.opcode());
        Ok(())
    }

    /// Block until one event arrives and return its bytes
    ///
    /// Under `AckPolicy::Strict` a Command Complete or Command Status with a
    /// non-zero status for the last sent opcode is an error.
    pub fn await_event(&mut self) -> Result<EventFrame> {
        let len = self.transport.read_event(&mut self.buffer)?;
        let event = EventFrame::new(&self.buffer[..len]);

        if self.config.hexdump {
            debug!("received {} {}", event.len(), hex::encode(event.as_bytes()));
        }

        if self.config.ack_policy == AckPolicy::Strict {
            if let Some(opcode) = self.last_opcode {
                match event.status_for(opcode) {
                    Some(0) | None => {}
                    Some(status) => return Err(Error::CommandRejected { opcode, status }),
                }
            }
        }

        Ok(event)
    }

    /// Send `frame` and wait for its event
    pub fn execute(&mut self, frame: &CommandFrame) -> Result<EventFrame> {
        self.send_command(frame)?;
        self.await_event()
    }

    /// Reset the controller, retrying while it stays silent
    ///
    /// Each attempt sends HCI_Reset and waits `RESET_TIMEOUT` for the socket to
    /// become readable. The first event that arrives is consumed and ends the
    /// sequence.
    pub fn reset(&mut self) -> Result<ResetOutcome> {
        let reset = CommandFrame::reset();

        for attempt in 1..=RESET_ATTEMPTS {
            self.send_command(&reset)?;

            if self.transport.wait_readable(RESET_TIMEOUT)? {
                self.await_event()?;
                info!(attempt, "controller reset");
                return Ok(ResetOutcome::Acknowledged { attempt });
            }
            debug!(attempt, "no reply to reset");
        }

        match self.config.ack_policy {
            AckPolicy::Strict => Err(Error::ResetTimeout(RESET_ATTEMPTS)),
            AckPolicy::Permissive => {
                warn!(
                    attempts = RESET_ATTEMPTS,
                    "controller never acknowledged reset, continuing"
                );
                Ok(ResetOutcome::Unacknowledged)
            }
        }
    }
}
