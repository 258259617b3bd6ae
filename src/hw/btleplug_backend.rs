use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{
    Central, CharPropFlags, Characteristic, Manager as _, Peripheral as _, ScanFilter, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use tokio::time::sleep;
use tokio_stream::StreamExt;
use tracing::{debug, info, instrument, trace};

use super::model::{BatteryLevelRecord, ChannelEvent, DeviceInformationRecord, FoundDevice};
use super::transport::{ChannelEventStream, CharacteristicChannel};
use crate::error::InteractionError;
use crate::handlers::DeviceCapabilities;
use crate::protocol::{self, ChannelId};

const SCAN_POLL_INTERVAL: Duration = Duration::from_millis(250);
const KNOWN_SERVICES: [&str; 4] = [
    protocol::VENDOR_SERVICE_UUID,
    protocol::HEART_RATE_SERVICE_UUID,
    protocol::BATTERY_SERVICE_UUID,
    protocol::DEVICE_INFORMATION_SERVICE_UUID,
];

/// Hardware backend backed by `btleplug`.
#[derive(Debug)]
pub(crate) struct BtleplugBackend {
    manager: Manager,
}

impl BtleplugBackend {
    /// Creates the real BLE backend.
    pub(crate) async fn new() -> Result<Self, InteractionError> {
        let manager = Manager::new().await?;
        Ok(Self { manager })
    }

    /// Scans every adapter until a watch matching `capabilities` appears, then connects.
    #[instrument(skip(self, capabilities), level = "debug", fields(name = capabilities.device_name()))]
    pub(crate) async fn connect(
        self,
        capabilities: &DeviceCapabilities,
    ) -> Result<BtleplugChannel, InteractionError> {
        let adapters = self.adapters().await?;
        info!(adapter_count = adapters.len(), "starting indefinite BLE scan");

        for adapter in &adapters {
            adapter.adapter.start_scan(ScanFilter::default()).await?;
        }

        loop {
            for adapter in &adapters {
                for peripheral in adapter.adapter.peripherals().await? {
                    let Some(properties) = peripheral.properties().await? else {
                        continue;
                    };
                    let advertised_services: Vec<String> = properties
                        .services
                        .iter()
                        .map(|uuid| uuid.to_string().to_lowercase())
                        .collect();
                    if !capabilities
                        .matches_advertisement(properties.local_name.as_deref(), &advertised_services)
                    {
                        continue;
                    }

                    stop_scans(&adapters).await;
                    let device = FoundDevice::new(
                        adapter.name.clone(),
                        peripheral.id().to_string(),
                        properties.local_name,
                        properties.rssi,
                    );
                    return BtleplugChannel::open(peripheral, device).await;
                }
            }

            sleep(SCAN_POLL_INTERVAL).await;
        }
    }

    #[instrument(skip(self), level = "trace")]
    async fn adapters(&self) -> Result<Vec<AdapterHandle>, InteractionError> {
        let adapters = self.manager.adapters().await?;
        if adapters.is_empty() {
            return Err(InteractionError::NoAdapters);
        }

        let mut handles = Vec::with_capacity(adapters.len());
        for adapter in adapters {
            let name = adapter.adapter_info().await?;
            handles.push(AdapterHandle { adapter, name });
        }
        Ok(handles)
    }
}

async fn stop_scans(adapters: &[AdapterHandle]) {
    for handle in adapters {
        if let Err(error) = handle.adapter.stop_scan().await {
            debug!(?error, "failed to stop adapter scan cleanly");
        }
    }
}

#[derive(Debug)]
struct AdapterHandle {
    adapter: Adapter,
    name: String,
}

/// Transport bound to a connected `btleplug` peripheral.
#[derive(Debug)]
pub(crate) struct BtleplugChannel {
    device: FoundDevice,
    peripheral: Peripheral,
    characteristics: HashMap<ChannelId, Characteristic>,
}

impl BtleplugChannel {
    #[instrument(skip(peripheral, device), level = "debug", fields(device_id = device.device_id()))]
    async fn open(peripheral: Peripheral, device: FoundDevice) -> Result<Self, InteractionError> {
        if !peripheral.is_connected().await? {
            peripheral.connect().await?;
        }
        peripheral.discover_services().await?;

        for service in peripheral.services() {
            let uuid = service.uuid.to_string().to_lowercase();
            let known = KNOWN_SERVICES.contains(&uuid.as_str());
            trace!(service = %uuid, known, "discovered service");
        }

        let characteristics = characteristics_by_channel(&peripheral);
        let missing: Vec<ChannelId> = protocol::required_channels()
            .filter(|channel| !characteristics.contains_key(channel))
            .collect();
        if !missing.is_empty() {
            if let Err(error) = peripheral.disconnect().await {
                debug!(?error, "failed to disconnect after channel validation error");
            }
            return Err(InteractionError::MissingRequiredChannels {
                missing: format_missing_channels(&missing),
            });
        }

        info!(
            device_id = device.device_id(),
            channels = characteristics.len(),
            "connected to watch"
        );
        Ok(Self {
            device,
            peripheral,
            characteristics,
        })
    }

    fn characteristic_for(&self, channel: ChannelId) -> Result<&Characteristic, InteractionError> {
        self.characteristics
            .get(&channel)
            .ok_or(InteractionError::MissingChannel { channel })
    }

    /// Reads a profile string. A channel the device does not expose reads as `None`.
    async fn read_optional_string(
        &self,
        channel: ChannelId,
    ) -> Result<Option<String>, InteractionError> {
        let Some(characteristic) = self.characteristics.get(&channel) else {
            debug!(%channel, "device does not expose profile channel");
            return Ok(None);
        };
        let payload = self.peripheral.read(characteristic).await?;
        Ok(profile_string(&payload))
    }
}

#[async_trait]
impl CharacteristicChannel for BtleplugChannel {
    fn device(&self) -> &FoundDevice {
        &self.device
    }

    #[instrument(skip(self, payload), level = "trace", fields(payload_len = payload.len()))]
    async fn write(&self, channel: ChannelId, payload: &[u8]) -> Result<(), InteractionError> {
        let characteristic = self.characteristic_for(channel)?;
        self.peripheral
            .write(characteristic, payload, write_type_for(characteristic.properties))
            .await?;
        Ok(())
    }

    #[instrument(skip(self), level = "trace")]
    async fn subscribe(&self, channel: ChannelId) -> Result<(), InteractionError> {
        let characteristic = self.characteristic_for(channel)?;
        self.peripheral.subscribe(characteristic).await?;
        Ok(())
    }

    #[instrument(skip(self), level = "trace")]
    async fn read(&self, channel: ChannelId) -> Result<Vec<u8>, InteractionError> {
        let characteristic = self.characteristic_for(channel)?;
        Ok(self.peripheral.read(characteristic).await?)
    }

    async fn notifications(&self) -> Result<ChannelEventStream, InteractionError> {
        let notifications = self.peripheral.notifications().await?;
        Ok(Box::pin(notifications.map(|notification| {
            ChannelEvent::from_uuid(notification.uuid.to_string(), notification.value)
        })))
    }

    #[instrument(skip(self), level = "debug")]
    async fn read_device_info(&self) -> Result<DeviceInformationRecord, InteractionError> {
        let hardware = self.read_optional_string(ChannelId::HardwareRevision).await?;
        let firmware = self.read_optional_string(ChannelId::FirmwareRevision).await?;
        Ok(DeviceInformationRecord::new(hardware, firmware))
    }

    #[instrument(skip(self), level = "debug")]
    async fn read_battery_info(&self) -> Result<BatteryLevelRecord, InteractionError> {
        let payload = self.read(ChannelId::BatteryLevel).await?;
        let level = payload.first().copied().ok_or(InteractionError::EmptyProfileValue {
            channel: ChannelId::BatteryLevel,
        })?;
        Ok(BatteryLevelRecord::new(level))
    }

    #[instrument(skip(self), level = "debug")]
    async fn close(&self) -> Result<(), InteractionError> {
        if self.peripheral.is_connected().await? {
            self.peripheral.disconnect().await?;
        }
        Ok(())
    }
}

fn characteristics_by_channel(peripheral: &Peripheral) -> HashMap<ChannelId, Characteristic> {
    let mut by_channel = HashMap::new();
    for characteristic in peripheral.characteristics() {
        let uuid = characteristic.uuid.to_string();
        match protocol::channel_for_uuid(&uuid) {
            Some(channel) => {
                by_channel.entry(channel).or_insert(characteristic);
            }
            None => trace!(%uuid, "ignoring unknown characteristic"),
        }
    }
    by_channel
}

fn profile_string(payload: &[u8]) -> Option<String> {
    let value = String::from_utf8_lossy(payload)
        .trim_end_matches('\0')
        .trim()
        .to_string();
    (!value.is_empty()).then_some(value)
}

fn write_type_for(properties: CharPropFlags) -> WriteType {
    if properties.contains(CharPropFlags::WRITE) {
        WriteType::WithResponse
    } else {
        WriteType::WithoutResponse
    }
}

fn format_missing_channels(channels: &[ChannelId]) -> String {
    channels
        .iter()
        .map(|channel| {
            let metadata = protocol::channel_metadata(*channel);
            format!("{} ({})", metadata.name(), metadata.uuid())
        })
        .collect::<Vec<_>>()
        .join(", ")
}
