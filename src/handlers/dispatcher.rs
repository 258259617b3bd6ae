use time::OffsetDateTime;
use tracing::{debug, instrument};

use crate::hw::{CommandQueue, Transaction};
use crate::protocol::ChannelId;
use crate::utils::format_hex;

use super::capabilities::DeviceCapabilities;
use super::device_command::DeviceCommand;
use super::frame_codec::{CommandFrame, FrameCodecError};

/// Result of routing a [`DeviceCommand`].
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum CommandOutcome {
    /// A frame was queued for transmission.
    Queued,
    /// The device does not declare or implement the command; nothing was queued.
    Unsupported,
}

/// Queues command frames for the control point.
///
/// Each dispatch discards queued transactions that have not started yet.
#[derive(Debug, Clone)]
pub struct CommandDispatcher {
    queue: CommandQueue,
    capabilities: DeviceCapabilities,
}

impl CommandDispatcher {
    #[must_use]
    pub fn new(queue: CommandQueue, capabilities: DeviceCapabilities) -> Self {
        Self {
            queue,
            capabilities,
        }
    }

    /// Replaces any unsent work with a single write of `frame`.
    #[instrument(skip(self, frame), level = "debug", fields(frame = %format_hex(frame.as_bytes())))]
    pub fn dispatch(&self, frame: CommandFrame) {
        self.queue.replace_pending([command_transaction(frame)]);
    }

    /// Routes a host intent if the device declares and implements it.
    ///
    /// # Errors
    ///
    /// Returns an error when the command frame cannot be encoded.
    pub fn send(&self, command: DeviceCommand) -> Result<CommandOutcome, FrameCodecError> {
        let capability = command.required_capability();
        if !self.capabilities.supports(capability) {
            debug!(%command, %capability, "capability not declared; ignoring command");
            return Ok(CommandOutcome::Unsupported);
        }

        let Some(frame) = command.encode()? else {
            debug!(%command, "no frame encoding for command; ignoring");
            return Ok(CommandOutcome::Unsupported);
        };

        self.dispatch(frame);
        Ok(CommandOutcome::Queued)
    }

    /// Queues a set-time frame for `timestamp`.
    ///
    /// # Errors
    ///
    /// Returns an error when `timestamp` does not fit the frame.
    pub fn set_time(&self, timestamp: OffsetDateTime) -> Result<CommandOutcome, FrameCodecError> {
        self.send(DeviceCommand::SetTime(timestamp))
    }

    /// Queues the find-device frame.
    pub fn find_device(&self) -> CommandOutcome {
        self.send(DeviceCommand::FindDevice)
            .unwrap_or(CommandOutcome::Unsupported)
    }

    pub(crate) fn queue(&self) -> &CommandQueue {
        &self.queue
    }
}

pub(crate) fn command_transaction(frame: CommandFrame) -> Transaction {
    Transaction::new("command").write(ChannelId::ControlPoint, frame)
}
