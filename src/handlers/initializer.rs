use time::OffsetDateTime;
use tracing::{info, instrument};

use crate::events::ConnectionState;
use crate::hw::{CommandQueue, Transaction};
use crate::protocol::ChannelId;

use super::frame_codec::{CommandFrame, FrameCodecError};
use super::time_sync::TimeSyncHandler;

/// Queues the post-connect bootstrap sequence.
#[derive(Debug, Clone)]
pub struct ConnectionInitializer {
    queue: CommandQueue,
}

impl ConnectionInitializer {
    #[must_use]
    pub fn new(queue: CommandQueue) -> Self {
        Self { queue }
    }

    /// Replaces unsent work with the bootstrap transaction.
    ///
    /// The bootstrap writes the set-time frame, moves the device to
    /// `initializing`, subscribes to the steps and secondary channels, requests
    /// device information, marks the device `initialized`, then requests the
    /// battery level, all within one transaction.
    ///
    /// # Errors
    ///
    /// Returns an error when `now` cannot be encoded as a set-time frame. Nothing
    /// is queued in that case.
    #[instrument(skip(self), level = "debug")]
    pub fn on_connected(&self, now: OffsetDateTime) -> Result<(), FrameCodecError> {
        let set_time = TimeSyncHandler::frame_for(now)?;
        self.queue.replace_pending([bootstrap_transaction(set_time)]);
        info!("queued connection bootstrap");
        Ok(())
    }
}

fn bootstrap_transaction(set_time: CommandFrame) -> Transaction {
    Transaction::new("initialize")
        .write(ChannelId::ControlPoint, set_time)
        .set_state(ConnectionState::Initializing)
        .subscribe(ChannelId::StepsInfo)
        .subscribe(ChannelId::UnknownSecondary)
        .request_device_info()
        .set_state(ConnectionState::Initialized)
        .request_battery_info()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::handlers::FrameCodec;
    use crate::handlers::dispatcher::command_transaction;
    use crate::hw::QueuedAction;

    fn at(seconds: i64) -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(seconds).expect("valid test timestamp")
    }

    fn drain(queue: &CommandQueue) -> Vec<(&'static str, Vec<QueuedAction>)> {
        std::iter::from_fn(|| queue.pop())
            .map(|tx| (tx.label(), tx.into_actions()))
            .collect()
    }

    #[test]
    fn on_connected_queues_time_sync_and_bootstrap_as_one_transaction() {
        let queue = CommandQueue::new();
        ConnectionInitializer::new(queue.clone())
            .on_connected(at(1_700_000_000))
            .expect("timestamp fits");

        assert_eq!(
            vec![(
                "initialize",
                vec![
                    QueuedAction::Write {
                        channel: ChannelId::ControlPoint,
                        frame: FrameCodec::encode_set_time(1_700_000_000),
                    },
                    QueuedAction::SetState(ConnectionState::Initializing),
                    QueuedAction::Subscribe(ChannelId::StepsInfo),
                    QueuedAction::Subscribe(ChannelId::UnknownSecondary),
                    QueuedAction::RequestDeviceInfo,
                    QueuedAction::SetState(ConnectionState::Initialized),
                    QueuedAction::RequestBatteryInfo,
                ]
            )],
            drain(&queue)
        );
    }

    #[test]
    fn on_connected_discards_stale_work() {
        let queue = CommandQueue::new();
        queue.enqueue(command_transaction(FrameCodec::encode_find_device()));

        let initializer = ConnectionInitializer::new(queue.clone());
        initializer.on_connected(at(10)).expect("timestamp fits");
        initializer.on_connected(at(20)).expect("timestamp fits");

        let queued = drain(&queue);
        assert_eq!(1, queued.len());
        assert_eq!(
            Some(&QueuedAction::Write {
                channel: ChannelId::ControlPoint,
                frame: FrameCodec::encode_set_time(20),
            }),
            queued[0].1.first()
        );
    }

    #[test]
    fn on_connected_rejects_unencodable_time_without_queueing() {
        let queue = CommandQueue::new();
        queue.enqueue(command_transaction(FrameCodec::encode_find_device()));

        assert_matches!(
            ConnectionInitializer::new(queue.clone()).on_connected(at(-5)),
            Err(FrameCodecError::TimestampOutOfRange { .. })
        );
        assert_eq!(1, queue.pending_len());
    }
}
