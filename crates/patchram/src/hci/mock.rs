//! Scripted transport for unit tests

use crate::error::HciError;
use crate::hci::constants::*;
use crate::hci::packet::CommandFrame;
use crate::hci::transport::HciTransport;
use std::collections::VecDeque;
use std::time::Duration;

/// Everything the engine did to the transport, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Command(u16, Vec<u8>),
    Wait(Duration),
    Read,
    Settle(Duration),
}

/// Replies to every command with a Command Complete for it
///
/// Resets can be told to go unanswered and statuses can be scripted.
#[derive(Debug, Default)]
pub struct MockTransport {
    pub steps: Vec<Step>,
    silent_resets: usize,
    statuses: VecDeque<u8>,
    last_opcode: u16,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// The first `count` reset attempts never become readable
    pub fn silent_resets(mut self, count: usize) -> Self {
        self.silent_resets = count;
        self
    }

    /// Status bytes for the next events, in order; later events succeed
    pub fn statuses(mut self, statuses: &[u8]) -> Self {
        self.statuses = statuses.iter().copied().collect();
        self
    }

    /// Opcodes of every command written
    pub fn opcodes(&self) -> Vec<u16> {
        self.steps
            .iter()
            .filter_map(|step| match step {
                Step::Command(op, _) => Some(*op),
                _ => None,
            })
            .collect()
    }
}

impl HciTransport for MockTransport {
    fn write_command(&mut self, frame: &CommandFrame) -> Result<(), HciError> {
        self.last_opcode = frame.opcode();
        self.steps
            .push(Step::Command(frame.opcode(), frame.parameters().to_vec()));
        Ok(())
    }

    fn wait_readable(&mut self, timeout: Duration) -> Result<bool, HciError> {
        self.steps.push(Step::Wait(timeout));
        if self.silent_resets > 0 {
            self.silent_resets -= 1;
            return Ok(false);
        }
        Ok(true)
    }

    fn read_event(&mut self, buf: &mut [u8]) -> Result<usize, HciError> {
        self.steps.push(Step::Read);
        let status = self.statuses.pop_front().unwrap_or(0);
        let [lo, hi] = self.last_opcode.to_le_bytes();
        let event = [HCI_EVENT_PKT, EVT_CMD_COMPLETE, 4, 1, lo, hi, status];
        buf[..event.len()].copy_from_slice(&event);
        Ok(event.len())
    }

    fn settle(&mut self, delay: Duration) {
        self.steps.push(Step::Settle(delay));
    }
}
