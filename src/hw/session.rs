use std::sync::Arc;

use time::OffsetDateTime;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace, warn};

use super::model::{ChannelEvent, FoundDevice, ListenStopReason, ListenSummary, ReadStatus};
use super::queue::{CommandQueue, QueuedAction};
use super::transport::CharacteristicChannel;
use crate::error::{InteractionError, ProtocolError};
use crate::events::{ConnectionState, DeviceEvent, EventBus};
use crate::handlers::{
    CommandDispatcher, CommandOutcome, ConnectionInitializer, DeviceCapabilities, DeviceCommand,
    FrameCodec,
};
use crate::notification::{NotificationRouter, RouterAction};
use crate::protocol::ChannelId;
use crate::sink::SampleStore;
use crate::utils::format_hex;

/// A connected watch: transport, outgoing queue and event bus.
pub struct DeviceSession {
    channel: Box<dyn CharacteristicChannel>,
    queue: CommandQueue,
    events: EventBus,
    capabilities: DeviceCapabilities,
}

impl DeviceSession {
    /// Wraps a connected transport. The session starts `disconnected`.
    #[must_use]
    pub fn new(
        channel: Box<dyn CharacteristicChannel>,
        capabilities: DeviceCapabilities,
    ) -> Self {
        Self {
            channel,
            queue: CommandQueue::new(),
            events: EventBus::new(),
            capabilities,
        }
    }

    /// Returns details for the connected device.
    #[must_use]
    pub fn device(&self) -> &FoundDevice {
        self.channel.device()
    }

    #[must_use]
    pub fn capabilities(&self) -> &DeviceCapabilities {
        &self.capabilities
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.queue.state()
    }

    /// Event bus carrying state changes, samples, device info and battery level.
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Returns a dispatcher sharing this session's queue.
    #[must_use]
    pub fn dispatcher(&self) -> CommandDispatcher {
        CommandDispatcher::new(self.queue.clone(), self.capabilities.clone())
    }

    /// Returns an initializer sharing this session's queue.
    #[must_use]
    pub fn initializer(&self) -> ConnectionInitializer {
        ConnectionInitializer::new(self.queue.clone())
    }

    /// Builds a router that stores samples in `store` and publishes on this session's bus.
    #[must_use]
    pub fn router(&self, store: Arc<dyn SampleStore>) -> NotificationRouter {
        NotificationRouter::new(store, self.events.clone())
    }

    /// Queues the bootstrap sequence and transmits it.
    ///
    /// A failed step clears queued work and moves the session back to
    /// `disconnected`.
    ///
    /// # Errors
    ///
    /// Returns an error if `now` cannot be encoded or the transport rejects a step.
    #[instrument(skip(self), level = "info", fields(device_id = self.device().device_id()))]
    pub async fn initialize(&self, now: OffsetDateTime) -> Result<(), ProtocolError> {
        self.initializer().on_connected(now)?;
        if let Err(error) = self.process_queue().await {
            warn!(%error, "initialization failed");
            self.reset_to_disconnected();
            return Err(error.into());
        }
        Ok(())
    }

    /// Routes `command` and transmits it when it was queued.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame cannot be encoded or the transport rejects the write.
    #[instrument(skip(self), level = "info")]
    pub async fn send_command(&self, command: DeviceCommand) -> Result<CommandOutcome, ProtocolError> {
        let outcome = self.dispatcher().send(command)?;
        if outcome == CommandOutcome::Queued {
            self.process_queue().await?;
        }
        Ok(outcome)
    }

    /// Transmits queued transactions in order, returning how many completed.
    ///
    /// A transport failure drops the remaining steps of the failing transaction;
    /// later transactions stay queued.
    ///
    /// # Errors
    ///
    /// Returns the first transport error.
    pub async fn process_queue(&self) -> Result<usize, InteractionError> {
        let mut completed = 0usize;
        while let Some(transaction) = self.queue.pop() {
            let label = transaction.label();
            for action in transaction.into_actions() {
                if let Err(error) = self.execute(action).await {
                    warn!(label, %error, "transaction aborted");
                    return Err(error);
                }
            }
            debug!(label, "transaction sent");
            completed += 1;
        }
        Ok(completed)
    }

    #[instrument(skip(self), level = "trace")]
    async fn execute(&self, action: QueuedAction) -> Result<(), InteractionError> {
        match action {
            QueuedAction::Write { channel, frame } => {
                debug!(%channel, frame = %format_hex(frame.as_bytes()), "writing frame");
                self.channel.write(channel, frame.as_bytes()).await
            }
            QueuedAction::Subscribe(channel) => self.channel.subscribe(channel).await,
            QueuedAction::RequestDeviceInfo => {
                let record = self.channel.read_device_info().await?;
                let info = FrameCodec::decode_device_info(record);
                info!(
                    hardware = info.hardware_version(),
                    firmware = info.firmware_version(),
                    "device information received"
                );
                self.events.publish(DeviceEvent::DeviceInfoReceived(info));
                Ok(())
            }
            QueuedAction::RequestBatteryInfo => {
                let record = self.channel.read_battery_info().await?;
                let battery = FrameCodec::decode_battery_info(record);
                info!(percent = battery.percent_charged(), "battery level received");
                self.events
                    .publish(DeviceEvent::BatteryInfoReceived(battery));
                Ok(())
            }
            QueuedAction::SetState(state) => {
                if self.queue.set_state(state) {
                    info!(%state, "connection state changed");
                    self.events.publish(DeviceEvent::DeviceStateChanged(state));
                }
                Ok(())
            }
        }
    }

    /// Feeds transport notifications to `router` while transmitting queued work.
    ///
    /// Stops after `max_samples` produced samples, when the notification stream
    /// ends, when `cancel` fires, or on Ctrl+C.
    ///
    /// # Errors
    ///
    /// Returns an error if the notification stream cannot be opened, a queued
    /// transaction fails, or waiting for Ctrl+C fails.
    #[instrument(skip(self, router, cancel), level = "debug", fields(?max_samples))]
    pub async fn run(
        &self,
        router: &NotificationRouter,
        max_samples: Option<usize>,
        cancel: CancellationToken,
    ) -> Result<ListenSummary, InteractionError> {
        if max_samples == Some(0) {
            return Ok(ListenSummary::new(0, 0, ListenStopReason::ReachedLimit(0)));
        }

        let mut notifications = self.channel.notifications().await?;
        self.process_queue().await?;

        let mut received = 0usize;
        let mut produced = 0usize;
        let stop_reason = loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break ListenStopReason::Interrupted,
                signal = tokio::signal::ctrl_c() => {
                    signal.map_err(|source| InteractionError::CtrlC { source })?;
                    break ListenStopReason::Interrupted;
                }
                () = self.queue.work_available() => {
                    self.process_queue().await?;
                }
                maybe_event = notifications.next() => {
                    let Some(event) = maybe_event else {
                        break ListenStopReason::NotificationStreamClosed;
                    };
                    received += 1;
                    if let RouterAction::SampleProduced(_) = router.on_channel_changed(&event) {
                        produced += 1;
                        if let Some(limit) = max_samples && produced >= limit {
                            break ListenStopReason::ReachedLimit(limit);
                        }
                    }
                }
            }
        };

        info!(received, produced, %stop_reason, "listen loop stopped");
        Ok(ListenSummary::new(received, produced, stop_reason))
    }

    /// Reads `channel` once and reports the result to `router`.
    ///
    /// # Errors
    ///
    /// Returns the transport error after reporting a failed read.
    #[instrument(skip(self, router), level = "debug")]
    pub async fn read_channel(
        &self,
        channel: ChannelId,
        router: &NotificationRouter,
    ) -> Result<Vec<u8>, InteractionError> {
        match self.channel.read(channel).await {
            Ok(payload) => {
                let event = ChannelEvent::for_channel(channel, payload);
                let action = router.on_channel_read(&event, ReadStatus::Success);
                trace!(?action, "read routed");
                Ok(event.payload().to_vec())
            }
            Err(error) => {
                let event = ChannelEvent::for_channel(channel, Vec::new());
                let action = router.on_channel_read(&event, ReadStatus::Failed);
                trace!(?action, "failed read routed");
                Err(error)
            }
        }
    }

    /// Drops queued work, reports `disconnected` and closes the transport.
    ///
    /// # Errors
    ///
    /// Returns an error if transport teardown fails.
    #[instrument(skip(self), level = "debug")]
    pub async fn disconnect(self) -> Result<(), InteractionError> {
        self.reset_to_disconnected();
        self.channel.close().await
    }

    fn reset_to_disconnected(&self) {
        if self.queue.reset() {
            info!("connection state changed to disconnected");
            self.events
                .publish(DeviceEvent::DeviceStateChanged(ConnectionState::Disconnected));
        }
    }
}
