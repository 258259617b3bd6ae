use serde::Serialize;
use serde_with::SerializeDisplay;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::trace;

const EVENT_BUS_CAPACITY: usize = 64;

/// Lifecycle of one device connection.
#[derive(
    Debug, Clone, Copy, Default, Eq, PartialEq, Hash, derive_more::Display, SerializeDisplay,
)]
pub enum ConnectionState {
    #[default]
    #[display("disconnected")]
    Disconnected,
    #[display("initializing")]
    Initializing,
    #[display("initialized")]
    Initialized,
}

/// One step/distance/calorie observation reported by the watch.
///
/// The timestamp is the host receipt time; the payload itself carries none.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
pub struct ActivitySample {
    timestamp_seconds: i64,
    steps: u32,
    distance_meters: u32,
    calories_burnt: u32,
}

impl ActivitySample {
    pub(crate) fn new(
        timestamp_seconds: i64,
        steps: u32,
        distance_meters: u32,
        calories_burnt: u32,
    ) -> Self {
        Self {
            timestamp_seconds,
            steps,
            distance_meters,
            calories_burnt,
        }
    }

    /// Unix timestamp assigned when the sample was decoded.
    #[must_use]
    pub fn timestamp_seconds(&self) -> i64 {
        self.timestamp_seconds
    }

    /// Step counter (24-bit).
    #[must_use]
    pub fn steps(&self) -> u32 {
        self.steps
    }

    /// Distance in metres (24-bit).
    #[must_use]
    pub fn distance_meters(&self) -> u32 {
        self.distance_meters
    }

    /// Calories burnt (24-bit).
    #[must_use]
    pub fn calories_burnt(&self) -> u32 {
        self.calories_burnt
    }
}

/// Hardware and firmware revisions from the device information profile.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct DeviceInfo {
    hardware_version: String,
    firmware_version: String,
}

impl DeviceInfo {
    pub(crate) fn new(hardware_version: String, firmware_version: String) -> Self {
        Self {
            hardware_version,
            firmware_version,
        }
    }

    #[must_use]
    pub fn hardware_version(&self) -> &str {
        &self.hardware_version
    }

    #[must_use]
    pub fn firmware_version(&self) -> &str {
        &self.firmware_version
    }
}

/// Charge level from the battery profile, clamped to `0..=100`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
pub struct BatteryInfo {
    percent_charged: u8,
}

impl BatteryInfo {
    pub(crate) fn new(percent_charged: u8) -> Self {
        Self {
            percent_charged: percent_charged.min(100),
        }
    }

    #[must_use]
    pub fn percent_charged(&self) -> u8 {
        self.percent_charged
    }
}

/// Events published to the host.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum DeviceEvent {
    DeviceStateChanged(ConnectionState),
    ActivitySampleProduced(ActivitySample),
    DeviceInfoReceived(DeviceInfo),
    BatteryInfoReceived(BatteryInfo),
}

/// Broadcast fan-out of [`DeviceEvent`]s to any number of listeners.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<DeviceEvent>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _receiver) = broadcast::channel(EVENT_BUS_CAPACITY);
        Self { sender }
    }

    /// Publishes an event. Having no listeners is not an error.
    pub(crate) fn publish(&self, event: DeviceEvent) {
        if let Err(broadcast::error::SendError(event)) = self.sender.send(event) {
            trace!(?event, "no event listeners attached");
        }
    }

    /// Subscribes a new listener that sees events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DeviceEvent> {
        self.sender.subscribe()
    }

    /// Subscribes a new listener as a stream.
    #[must_use]
    pub fn stream(&self) -> BroadcastStream<DeviceEvent> {
        BroadcastStream::new(self.subscribe())
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
