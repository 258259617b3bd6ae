use std::sync::Arc;

use thiserror::Error;
use time::OffsetDateTime;
use tracing::{info, instrument, warn};

use crate::events::{ActivitySample, DeviceEvent, EventBus};
use crate::handlers::FrameCodec;
use crate::hw::{ChannelEvent, ReadStatus};
use crate::protocol::ChannelId;
use crate::sink::{SampleSinkError, SampleStore};
use crate::utils::format_hex;

/// Errors returned while decoding notification payloads.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum NotificationDecodeError {
    #[error("malformed packet: expected {expected} bytes, got {actual}")]
    MalformedPacket { expected: usize, actual: usize },
}

/// What the router did with one transport event.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[must_use]
pub enum RouterAction {
    /// A sample was decoded, stored and broadcast.
    SampleProduced(ActivitySample),
    /// The event was logged and dropped.
    Unhandled,
}

/// Routes value-changed events to decoders by channel.
pub struct NotificationRouter {
    store: Arc<dyn SampleStore>,
    events: EventBus,
    clock: fn() -> OffsetDateTime,
}

impl NotificationRouter {
    /// Creates a router that stores samples in `store` and publishes on `events`.
    #[must_use]
    pub fn new(store: Arc<dyn SampleStore>, events: EventBus) -> Self {
        Self {
            store,
            events,
            clock: OffsetDateTime::now_utc,
        }
    }

    /// Replaces the wall clock used to stamp samples.
    #[must_use]
    pub fn with_clock(mut self, clock: fn() -> OffsetDateTime) -> Self {
        self.clock = clock;
        self
    }

    /// Handles one value-changed event.
    #[instrument(
        skip(self, event),
        level = "trace",
        fields(uuid = event.uuid(), payload_len = event.payload().len())
    )]
    pub fn on_channel_changed(&self, event: &ChannelEvent) -> RouterAction {
        match event.channel() {
            Some(ChannelId::StepsInfo) => self.handle_steps_info(event.payload()),
            _ => {
                info!(
                    uuid = event.uuid(),
                    data = %format_hex(event.payload()),
                    "unhandled characteristic changed"
                );
                RouterAction::Unhandled
            }
        }
    }

    /// Handles one completed characteristic read. No reads carry protocol data.
    pub fn on_channel_read(&self, event: &ChannelEvent, status: ReadStatus) -> RouterAction {
        info!(
            uuid = event.uuid(),
            %status,
            data = %format_hex(event.payload()),
            "unhandled characteristic read"
        );
        RouterAction::Unhandled
    }

    fn handle_steps_info(&self, payload: &[u8]) -> RouterAction {
        let sample = match FrameCodec::decode_steps_info(payload, (self.clock)()) {
            Ok(sample) => sample,
            Err(error) => {
                info!(%error, data = %format_hex(payload), "dropping steps-info packet");
                return RouterAction::Unhandled;
            }
        };

        if let Err(error) = self.persist(&sample) {
            warn!(?error, "unable to store realtime sample");
            return RouterAction::Unhandled;
        }

        self.events
            .publish(DeviceEvent::ActivitySampleProduced(sample));
        RouterAction::SampleProduced(sample)
    }

    fn persist(&self, sample: &ActivitySample) -> Result<(), SampleSinkError> {
        let mut writer = self.store.acquire()?;
        writer.add_sample(sample)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::sink::MemorySampleStore;

    fn fixed_clock() -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(1_700_000_000).expect("fixed timestamp is valid")
    }

    fn router(store: &MemorySampleStore, events: &EventBus) -> NotificationRouter {
        NotificationRouter::new(Arc::new(store.clone()), events.clone()).with_clock(fixed_clock)
    }

    #[test]
    fn steps_info_produces_stored_and_broadcast_sample() {
        let store = MemorySampleStore::new();
        let events = EventBus::new();
        let mut listener = events.subscribe();
        let router = router(&store, &events);

        let action = router.on_channel_changed(&ChannelEvent::for_channel(
            ChannelId::StepsInfo,
            vec![0x01, 0, 0, 0x02, 0, 0, 0x03, 0, 0],
        ));

        let expected = ActivitySample::new(1_700_000_000, 1, 2, 3);
        assert_eq!(RouterAction::SampleProduced(expected), action);
        assert_eq!(vec![expected], store.samples());
        assert_eq!(
            Ok(DeviceEvent::ActivitySampleProduced(expected)),
            listener.try_recv()
        );
        assert_eq!(0, store.outstanding_writers());
    }

    #[rstest]
    #[case(vec![])]
    #[case(vec![0x01; 8])]
    #[case(vec![0x01; 10])]
    fn malformed_steps_info_is_dropped(#[case] payload: Vec<u8>) {
        let store = MemorySampleStore::new();
        let events = EventBus::new();
        let mut listener = events.subscribe();
        let router = router(&store, &events);

        let action =
            router.on_channel_changed(&ChannelEvent::for_channel(ChannelId::StepsInfo, payload));

        assert_eq!(RouterAction::Unhandled, action);
        assert!(store.samples().is_empty());
        assert_matches!(
            listener.try_recv(),
            Err(tokio::sync::broadcast::error::TryRecvError::Empty)
        );
    }

    #[rstest]
    #[case(ChannelEvent::for_channel(ChannelId::UnknownSecondary, vec![0x01; 9]))]
    #[case(ChannelEvent::for_channel(ChannelId::HeartRateMeasurement, vec![0x00, 0x48]))]
    #[case(ChannelEvent::from_uuid("0000fee4-0000-1000-8000-00805f9b34fb", vec![0x01; 9]))]
    fn other_channels_are_unhandled(#[case] event: ChannelEvent) {
        let store = MemorySampleStore::new();
        let events = EventBus::new();
        let router = router(&store, &events);

        assert_eq!(RouterAction::Unhandled, router.on_channel_changed(&event));
        assert!(store.samples().is_empty());
    }

    #[test]
    fn persistence_failure_discards_sample_without_broadcast() {
        let store = MemorySampleStore::new();
        store.set_available(false);
        let events = EventBus::new();
        let mut listener = events.subscribe();
        let router = router(&store, &events);

        let action = router.on_channel_changed(&ChannelEvent::for_channel(
            ChannelId::StepsInfo,
            vec![0x01, 0, 0, 0x02, 0, 0, 0x03, 0, 0],
        ));

        assert_eq!(RouterAction::Unhandled, action);
        assert_eq!(0, store.outstanding_writers());
        assert_matches!(
            listener.try_recv(),
            Err(tokio::sync::broadcast::error::TryRecvError::Empty)
        );
    }

    #[test]
    fn failed_sample_write_releases_writer_without_broadcast() {
        let store = MemorySampleStore::new();
        store.set_accepting_writes(false);
        let events = EventBus::new();
        let mut listener = events.subscribe();
        let router = router(&store, &events);

        let action = router.on_channel_changed(&ChannelEvent::for_channel(
            ChannelId::StepsInfo,
            vec![0x01, 0, 0, 0x02, 0, 0, 0x03, 0, 0],
        ));

        assert_eq!(RouterAction::Unhandled, action);
        assert_eq!(0, store.outstanding_writers());
        assert!(store.samples().is_empty());
        assert_matches!(
            listener.try_recv(),
            Err(tokio::sync::broadcast::error::TryRecvError::Empty)
        );
    }

    #[test]
    fn channel_reads_are_logged_only() {
        let store = MemorySampleStore::new();
        let router = router(&store, &EventBus::new());
        let event = ChannelEvent::for_channel(ChannelId::StepsInfo, vec![0x01, 0, 0, 0x02, 0, 0, 0x03, 0, 0]);

        assert_eq!(
            RouterAction::Unhandled,
            router.on_channel_read(&event, ReadStatus::Success)
        );
        assert!(store.samples().is_empty());
    }
}
