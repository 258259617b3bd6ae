use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use bon::Builder;
use tokio::time::sleep;
use tokio_stream::StreamExt;
use tracing::{debug, instrument};

use super::model::{BatteryLevelRecord, ChannelEvent, DeviceInformationRecord, FoundDevice};
use super::transport::{ChannelEventStream, CharacteristicChannel};
use crate::error::{FixtureError, InteractionError};
use crate::handlers::DeviceCapabilities;
use crate::protocol::{self, ChannelId};

const FAKE_ADAPTER: &str = "fake0";
const FAKE_DEVICE_ID: &str = "C0:FF:EE:00:00:02";
const FAKE_DEVICE_NAME: &str = "Uwatch2";
const FAKE_RSSI: i16 = -52;
const DEFAULT_NOTIFICATIONS: &str = "fee1:e80300200300410000,fee1:f40100c80000190000";
const DEFAULT_HARDWARE_REVISION: &str = "UW2-HW1.0";
const DEFAULT_FIRMWARE_REVISION: &str = "UW2-FW1.2.7";
const DEFAULT_BATTERY_LEVEL: u8 = 87;

/// Parsed `channel:hex,...` notification fixtures.
#[derive(Debug, Clone, derive_more::Into)]
pub(crate) struct NotificationFixture {
    events: Vec<ChannelEvent>,
}

impl FromStr for NotificationFixture {
    type Err = FixtureError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.trim().is_empty() {
            return Ok(Self { events: Vec::new() });
        }

        let events = value
            .split(',')
            .map(parse_notification_record)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { events })
    }
}

/// Parsed `hardware|firmware` device information fixture.
#[derive(Debug, Clone, derive_more::Into)]
pub(crate) struct DeviceInfoFixture {
    record: DeviceInformationRecord,
}

impl FromStr for DeviceInfoFixture {
    type Err = FixtureError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (hardware, firmware) = value.split_once('|').ok_or(FixtureError::InvalidDeviceInfo)?;
        let non_empty = |field: &str| {
            let field = field.trim();
            (!field.is_empty()).then(|| field.to_string())
        };
        Ok(Self {
            record: DeviceInformationRecord::new(non_empty(hardware), non_empty(firmware)),
        })
    }
}

/// Settings for constructing the fake transport.
#[derive(Debug, Builder)]
pub(crate) struct FakeBackendConfig {
    notifications: Option<NotificationFixture>,
    device_info: Option<DeviceInfoFixture>,
    battery_level: Option<u8>,
    reject_channel: Option<ChannelId>,
    #[builder(default)]
    hold_open: bool,
    #[builder(default)]
    connect_delay: Duration,
    log: Option<FakeTransportLog>,
}

/// One operation observed by the fake transport.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum TransportOp {
    Write { channel: ChannelId, payload: Vec<u8> },
    Subscribe(ChannelId),
    Read(ChannelId),
    ReadDeviceInfo,
    ReadBatteryInfo,
    Close,
}

/// Shared record of every operation the fake transport performed.
#[derive(Debug, Clone, Default)]
pub struct FakeTransportLog {
    ops: Arc<Mutex<Vec<TransportOp>>>,
}

impl FakeTransportLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, op: TransportOp) {
        self.ops
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(op);
    }

    /// Returns a copy of the operations recorded so far.
    #[must_use]
    pub fn ops(&self) -> Vec<TransportOp> {
        self.ops
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the payloads written to `channel`, in order.
    #[must_use]
    pub fn writes_to(&self, channel: ChannelId) -> Vec<Vec<u8>> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                TransportOp::Write {
                    channel: written,
                    payload,
                } if written == channel => Some(payload),
                _ => None,
            })
            .collect()
    }
}

/// Fake backend used in tests and non-hardware environments.
#[derive(Debug)]
pub(crate) struct FakeBackend {
    config: FakeBackendConfig,
}

impl FakeBackend {
    pub(crate) fn new(config: FakeBackendConfig) -> Self {
        Self { config }
    }

    /// Connects to the scripted watch if it matches `capabilities`.
    #[instrument(skip(self, capabilities), level = "debug", fields(name = capabilities.device_name()))]
    pub(crate) async fn connect(
        self,
        capabilities: &DeviceCapabilities,
    ) -> Result<FakeChannel, InteractionError> {
        let config = self.config;
        if !config.connect_delay.is_zero() {
            sleep(config.connect_delay).await;
        }

        if !capabilities.matches_advertisement(Some(FAKE_DEVICE_NAME), &[]) {
            return Err(InteractionError::NoMatchingFixtureDevice {
                name: capabilities.device_name().to_string(),
            });
        }

        let notifications = match config.notifications {
            Some(fixture) => fixture.into(),
            None => DEFAULT_NOTIFICATIONS.parse::<NotificationFixture>()?.into(),
        };
        let device_info = config.device_info.map_or_else(
            || {
                DeviceInformationRecord::new(
                    Some(DEFAULT_HARDWARE_REVISION.to_string()),
                    Some(DEFAULT_FIRMWARE_REVISION.to_string()),
                )
            },
            Into::into,
        );

        debug!("connected to fake watch");
        Ok(FakeChannel {
            device: FoundDevice::new(
                FAKE_ADAPTER.to_string(),
                FAKE_DEVICE_ID.to_string(),
                Some(FAKE_DEVICE_NAME.to_string()),
                Some(FAKE_RSSI),
            ),
            notifications: Mutex::new(Some(notifications)),
            device_info,
            battery_level: config.battery_level.unwrap_or(DEFAULT_BATTERY_LEVEL),
            reject_channel: config.reject_channel,
            hold_open: config.hold_open,
            log: config.log.unwrap_or_default(),
        })
    }
}

/// Fixture-driven transport that records what it was asked to do.
#[derive(Debug)]
pub(crate) struct FakeChannel {
    device: FoundDevice,
    notifications: Mutex<Option<Vec<ChannelEvent>>>,
    device_info: DeviceInformationRecord,
    battery_level: u8,
    reject_channel: Option<ChannelId>,
    hold_open: bool,
    log: FakeTransportLog,
}

impl FakeChannel {
    fn check(&self, operation: &'static str, channel: ChannelId) -> Result<(), InteractionError> {
        if self.reject_channel == Some(channel) {
            return Err(InteractionError::TransportRejected { operation, channel });
        }
        Ok(())
    }
}

#[async_trait]
impl CharacteristicChannel for FakeChannel {
    fn device(&self) -> &FoundDevice {
        &self.device
    }

    async fn write(&self, channel: ChannelId, payload: &[u8]) -> Result<(), InteractionError> {
        self.check("write", channel)?;
        self.log.push(TransportOp::Write {
            channel,
            payload: payload.to_vec(),
        });
        Ok(())
    }

    async fn subscribe(&self, channel: ChannelId) -> Result<(), InteractionError> {
        self.check("subscribe", channel)?;
        self.log.push(TransportOp::Subscribe(channel));
        Ok(())
    }

    async fn read(&self, channel: ChannelId) -> Result<Vec<u8>, InteractionError> {
        self.check("read", channel)?;
        self.log.push(TransportOp::Read(channel));
        let payload = match channel {
            ChannelId::BatteryLevel => vec![self.battery_level],
            ChannelId::HardwareRevision => self
                .device_info
                .clone()
                .into_parts()
                .0
                .unwrap_or_default()
                .into_bytes(),
            ChannelId::FirmwareRevision => self
                .device_info
                .clone()
                .into_parts()
                .1
                .unwrap_or_default()
                .into_bytes(),
            _ => Vec::new(),
        };
        Ok(payload)
    }

    async fn notifications(&self) -> Result<ChannelEventStream, InteractionError> {
        let events = self
            .notifications
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .unwrap_or_default();
        let scripted = tokio_stream::iter(events);
        if self.hold_open {
            Ok(Box::pin(scripted.chain(tokio_stream::pending())))
        } else {
            Ok(Box::pin(scripted))
        }
    }

    async fn read_device_info(&self) -> Result<DeviceInformationRecord, InteractionError> {
        self.check("read", ChannelId::HardwareRevision)?;
        self.check("read", ChannelId::FirmwareRevision)?;
        self.log.push(TransportOp::ReadDeviceInfo);
        Ok(self.device_info.clone())
    }

    async fn read_battery_info(&self) -> Result<BatteryLevelRecord, InteractionError> {
        self.check("read", ChannelId::BatteryLevel)?;
        self.log.push(TransportOp::ReadBatteryInfo);
        Ok(BatteryLevelRecord::new(self.battery_level))
    }

    async fn close(&self) -> Result<(), InteractionError> {
        self.log.push(TransportOp::Close);
        Ok(())
    }
}

fn parse_notification_record(record: &str) -> Result<ChannelEvent, FixtureError> {
    let (channel, payload) =
        record
            .trim()
            .split_once(':')
            .ok_or_else(|| FixtureError::InvalidNotificationRecord {
                record: record.to_string(),
            })?;
    let uuid = parse_channel_uuid(channel.trim())?;
    let payload = hex::decode(payload.trim())?;
    Ok(ChannelEvent::from_uuid(uuid, payload))
}

fn parse_channel_uuid(value: &str) -> Result<String, FixtureError> {
    if value.contains('-') {
        return Ok(value.to_string());
    }

    u16::from_str_radix(value, 16)
        .map(protocol::expand_short_uuid)
        .map_err(|_| FixtureError::InvalidShortUuid {
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("", 0)]
    #[case("fee1:010000020000030000", 1)]
    #[case("fee1:010000020000030000, fee3:0A0B", 2)]
    #[case("0000fee1-0000-1000-8000-00805f9b34fb:01", 1)]
    fn notification_fixture_parses_records(#[case] fixture: &str, #[case] expected_count: usize) {
        let parsed: Vec<ChannelEvent> = fixture
            .parse::<NotificationFixture>()
            .expect("fixture should parse")
            .into();
        assert_eq!(expected_count, parsed.len());
    }

    #[test]
    fn notification_fixture_resolves_short_uuid() {
        let parsed: Vec<ChannelEvent> = "FEE1:FF"
            .parse::<NotificationFixture>()
            .expect("fixture should parse")
            .into();
        assert_eq!(Some(ChannelId::StepsInfo), parsed[0].channel());
        assert_eq!(&[0xFF], parsed[0].payload());
    }

    #[rstest]
    #[case("fee1")]
    #[case("fee1=0102")]
    fn notification_fixture_rejects_missing_separator(#[case] fixture: &str) {
        assert_matches!(
            fixture.parse::<NotificationFixture>(),
            Err(FixtureError::InvalidNotificationRecord { .. })
        );
    }

    #[test]
    fn notification_fixture_rejects_bad_uuid_and_hex() {
        assert_matches!(
            "zz:01".parse::<NotificationFixture>(),
            Err(FixtureError::InvalidShortUuid { value }) if value == "zz"
        );
        assert_matches!(
            "fee1:0".parse::<NotificationFixture>(),
            Err(FixtureError::InvalidHex(_))
        );
    }

    #[test]
    fn device_info_fixture_treats_blank_fields_as_missing() {
        let record: DeviceInformationRecord = "HW2|"
            .parse::<DeviceInfoFixture>()
            .expect("fixture should parse")
            .into();
        assert_eq!((Some("HW2".to_string()), None), record.into_parts());
        assert_matches!(
            "HW2".parse::<DeviceInfoFixture>(),
            Err(FixtureError::InvalidDeviceInfo)
        );
    }

    #[tokio::test]
    async fn connect_rejects_other_device_names() {
        let backend = FakeBackend::new(FakeBackendConfig::builder().build());
        let caps = DeviceCapabilities::uwatch2().with_device_name("Band5");

        assert_matches!(
            backend.connect(&caps).await,
            Err(InteractionError::NoMatchingFixtureDevice { name }) if name == "Band5"
        );
    }

    #[tokio::test]
    async fn fake_channel_records_operations_and_rejects_configured_channel() -> anyhow::Result<()>
    {
        let log = FakeTransportLog::new();
        let channel = FakeBackend::new(
            FakeBackendConfig::builder()
                .reject_channel(ChannelId::UnknownSecondary)
                .log(log.clone())
                .build(),
        )
        .connect(&DeviceCapabilities::uwatch2())
        .await?;

        channel.write(ChannelId::ControlPoint, &[0xFE]).await?;
        channel.subscribe(ChannelId::StepsInfo).await?;
        assert_matches!(
            channel.subscribe(ChannelId::UnknownSecondary).await,
            Err(InteractionError::TransportRejected {
                operation: "subscribe",
                channel: ChannelId::UnknownSecondary
            })
        );
        assert_eq!(vec![87], channel.read(ChannelId::BatteryLevel).await?);

        assert_eq!(
            vec![
                TransportOp::Write {
                    channel: ChannelId::ControlPoint,
                    payload: vec![0xFE]
                },
                TransportOp::Subscribe(ChannelId::StepsInfo),
                TransportOp::Read(ChannelId::BatteryLevel),
            ],
            log.ops()
        );
        Ok(())
    }

    #[rstest]
    #[case(ChannelId::HardwareRevision)]
    #[case(ChannelId::FirmwareRevision)]
    #[tokio::test]
    async fn rejected_revision_channel_fails_device_info_read(
        #[case] rejected: ChannelId,
    ) -> anyhow::Result<()> {
        let log = FakeTransportLog::new();
        let channel = FakeBackend::new(
            FakeBackendConfig::builder()
                .reject_channel(rejected)
                .log(log.clone())
                .build(),
        )
        .connect(&DeviceCapabilities::uwatch2())
        .await?;

        assert_matches!(
            channel.read_device_info().await,
            Err(InteractionError::TransportRejected { operation: "read", channel }) if channel == rejected
        );
        assert!(log.ops().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn notifications_are_delivered_once() -> anyhow::Result<()> {
        let channel = FakeBackend::new(FakeBackendConfig::builder().build())
            .connect(&DeviceCapabilities::uwatch2())
            .await?;

        let first: Vec<ChannelEvent> = channel.notifications().await?.collect().await;
        let second: Vec<ChannelEvent> = channel.notifications().await?.collect().await;

        assert_eq!(2, first.len());
        assert!(second.is_empty());
        Ok(())
    }
}
