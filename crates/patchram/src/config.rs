//! Run configuration threaded through the command engine

/// How an event read after a command is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AckPolicy {
    /// Any event that arrives acknowledges the command
    #[default]
    Permissive,
    /// A non-zero status for the sent opcode fails the run, and so does a
    /// reset that is never acknowledged
    Strict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineConfig {
    /// Log every outgoing frame and incoming event as hex
    pub hexdump: bool,
    pub ack_policy: AckPolicy,
}

impl EngineConfig {
    pub fn with_hexdump(mut self, hexdump: bool) -> Self {
        self.hexdump = hexdump;
        self
    }

    pub fn with_ack_policy(mut self, ack_policy: AckPolicy) -> Self {
        self.ack_policy = ack_policy;
        self
    }
}
