use std::pin::Pin;

use async_trait::async_trait;
use tokio_stream::Stream;

use super::model::{BatteryLevelRecord, ChannelEvent, DeviceInformationRecord, FoundDevice};
use crate::error::InteractionError;
use crate::protocol::ChannelId;

/// Stream of value-changed events pushed by a transport.
pub type ChannelEventStream = Pin<Box<dyn Stream<Item = ChannelEvent> + Send>>;

/// Characteristic-level access to one connected watch.
#[async_trait]
pub trait CharacteristicChannel: Send + Sync {
    /// Returns details for the connected device.
    fn device(&self) -> &FoundDevice;

    /// Writes one frame to a channel.
    async fn write(&self, channel: ChannelId, payload: &[u8]) -> Result<(), InteractionError>;

    /// Enables notifications on a channel.
    async fn subscribe(&self, channel: ChannelId) -> Result<(), InteractionError>;

    /// Reads the current value of a channel.
    async fn read(&self, channel: ChannelId) -> Result<Vec<u8>, InteractionError>;

    /// Opens the stream of value-changed events for all subscribed channels.
    async fn notifications(&self) -> Result<ChannelEventStream, InteractionError>;

    /// Queries the device information profile.
    ///
    /// A revision the device does not expose is `None`; a failed read is an error.
    async fn read_device_info(&self) -> Result<DeviceInformationRecord, InteractionError>;

    /// Queries the battery profile.
    async fn read_battery_info(&self) -> Result<BatteryLevelRecord, InteractionError>;

    /// Tears the connection down.
    async fn close(&self) -> Result<(), InteractionError>;
}
