use std::collections::HashMap;
use std::sync::LazyLock;

use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

/// Vendor watch service advertised by the device.
pub(crate) const VENDOR_SERVICE_UUID: &str = "0000feea-0000-1000-8000-00805f9b34fb";
/// Standard heart rate service.
pub(crate) const HEART_RATE_SERVICE_UUID: &str = "0000180d-0000-1000-8000-00805f9b34fb";
/// Standard battery service.
pub(crate) const BATTERY_SERVICE_UUID: &str = "0000180f-0000-1000-8000-00805f9b34fb";
/// Standard device information service.
pub(crate) const DEVICE_INFORMATION_SERVICE_UUID: &str = "0000180a-0000-1000-8000-00805f9b34fb";

const BASE_UUID_SUFFIX: &str = "-0000-1000-8000-00805f9b34fb";

/// Known characteristics exposed by the watch.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, EnumIter, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ChannelId {
    /// Periodic step/distance/calorie counters (notify).
    StepsInfo,
    /// Vendor command channel (write).
    ControlPoint,
    /// Secondary vendor notify channel with an undocumented payload.
    UnknownSecondary,
    /// Watchface upload channel.
    WatchfaceTransfer,
    /// Firmware upload channel.
    FirmwareTransfer,
    /// Standard heart rate measurement characteristic.
    HeartRateMeasurement,
    /// Standard heart rate control point characteristic.
    HeartRateControlPoint,
    /// Standard battery level characteristic.
    BatteryLevel,
    /// Device information: hardware revision string.
    HardwareRevision,
    /// Device information: firmware revision string.
    FirmwareRevision,
}

/// Descriptive metadata for one channel.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) struct ChannelMetadata {
    name: &'static str,
    uuid: &'static str,
    required: bool,
}

impl ChannelMetadata {
    /// Human-readable channel name.
    pub(crate) fn name(self) -> &'static str {
        self.name
    }

    /// Characteristic UUID in lowercase hyphenated form.
    pub(crate) fn uuid(self) -> &'static str {
        self.uuid
    }

    /// Whether a session cannot operate without this channel.
    pub(crate) fn required(self) -> bool {
        self.required
    }
}

static CHANNELS_BY_UUID: LazyLock<HashMap<&'static str, ChannelId>> = LazyLock::new(|| {
    ChannelId::iter()
        .map(|channel| (metadata_for(channel).uuid, channel))
        .collect()
});

/// Returns metadata for one channel.
pub(crate) fn channel_metadata(channel: ChannelId) -> ChannelMetadata {
    metadata_for(channel)
}

/// Resolves a characteristic UUID to a known channel, ignoring case.
pub(crate) fn channel_for_uuid(uuid: &str) -> Option<ChannelId> {
    CHANNELS_BY_UUID
        .get(uuid.to_ascii_lowercase().as_str())
        .copied()
}

/// Channels that must be present for a session to be usable.
pub(crate) fn required_channels() -> impl Iterator<Item = ChannelId> {
    ChannelId::iter().filter(|channel| metadata_for(*channel).required())
}

/// Expands a 16-bit assigned number into a full Bluetooth base UUID.
pub(crate) fn expand_short_uuid(short: u16) -> String {
    format!("0000{short:04x}{BASE_UUID_SUFFIX}")
}

fn metadata_for(channel: ChannelId) -> ChannelMetadata {
    match channel {
        ChannelId::StepsInfo => ChannelMetadata {
            name: "Steps info",
            uuid: "0000fee1-0000-1000-8000-00805f9b34fb",
            required: true,
        },
        ChannelId::ControlPoint => ChannelMetadata {
            name: "Control point",
            uuid: "0000fee2-0000-1000-8000-00805f9b34fb",
            required: true,
        },
        ChannelId::UnknownSecondary => ChannelMetadata {
            name: "Unknown secondary",
            uuid: "0000fee3-0000-1000-8000-00805f9b34fb",
            required: true,
        },
        ChannelId::WatchfaceTransfer => ChannelMetadata {
            name: "Watchface transfer",
            uuid: "0000fee5-0000-1000-8000-00805f9b34fb",
            required: false,
        },
        ChannelId::FirmwareTransfer => ChannelMetadata {
            name: "Firmware transfer",
            uuid: "0000fee6-0000-1000-8000-00805f9b34fb",
            required: false,
        },
        ChannelId::HeartRateMeasurement => ChannelMetadata {
            name: "Heart rate measurement",
            uuid: "00002a37-0000-1000-8000-00805f9b34fb",
            required: false,
        },
        ChannelId::HeartRateControlPoint => ChannelMetadata {
            name: "Heart rate control point",
            uuid: "00002a39-0000-1000-8000-00805f9b34fb",
            required: false,
        },
        ChannelId::BatteryLevel => ChannelMetadata {
            name: "Battery level",
            uuid: "00002a19-0000-1000-8000-00805f9b34fb",
            required: false,
        },
        ChannelId::HardwareRevision => ChannelMetadata {
            name: "Hardware revision",
            uuid: "00002a27-0000-1000-8000-00805f9b34fb",
            required: false,
        },
        ChannelId::FirmwareRevision => ChannelMetadata {
            name: "Firmware revision",
            uuid: "00002a26-0000-1000-8000-00805f9b34fb",
            required: false,
        },
    }
}

/// Vendor opcodes carried in byte 4 of a control-point frame.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
#[repr(u8)]
pub enum Opcode {
    SetRealtimeStepsNotification = 0x03,
    SetTimer = 0x04,
    SetFitnessGoal = 0x05,
    FetchData = 0x06,
    SendFirmwareInfo = 0x07,
    SendNotification = 0x08,
    FactoryReset = 0x09,
    ConfirmActivityTransfer = 0x0A,
    Sync = 0x0B,
    Reboot = 0x0C,
    SetWearLocation = 0x0F,
    SetRealtimeStep = 0x10,
    StopSyncData = 0x11,
    GetSensorData = 0x12,
    StopMotorVibrate = 0x13,
    SetTime = 0x31,
    FindDevice = 0x61,
}

impl Opcode {
    /// Returns the wire byte for this opcode.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }

    /// Looks up an opcode by its wire byte.
    #[must_use]
    pub fn from_byte(value: u8) -> Option<Self> {
        Self::iter().find(|opcode| opcode.as_byte() == value)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("0000fee1-0000-1000-8000-00805f9b34fb", Some(ChannelId::StepsInfo))]
    #[case("0000FEE2-0000-1000-8000-00805F9B34FB", Some(ChannelId::ControlPoint))]
    #[case("00002a19-0000-1000-8000-00805f9b34fb", Some(ChannelId::BatteryLevel))]
    #[case("0000fee4-0000-1000-8000-00805f9b34fb", None)]
    fn channel_for_uuid_resolves_known_characteristics(
        #[case] uuid: &str,
        #[case] expected: Option<ChannelId>,
    ) {
        assert_eq!(expected, channel_for_uuid(uuid));
    }

    #[test]
    fn every_channel_round_trips_through_uuid_lookup() {
        for channel in ChannelId::iter() {
            let uuid = channel_metadata(channel).uuid();
            assert_eq!(Some(channel), channel_for_uuid(uuid));
        }
    }

    #[test]
    fn required_channels_cover_vendor_notify_and_command_paths() {
        let required: Vec<ChannelId> = required_channels().collect();
        assert_eq!(
            vec![
                ChannelId::StepsInfo,
                ChannelId::ControlPoint,
                ChannelId::UnknownSecondary
            ],
            required
        );
    }

    #[test]
    fn expand_short_uuid_uses_bluetooth_base() {
        assert_eq!(VENDOR_SERVICE_UUID, expand_short_uuid(0xFEEA));
    }

    #[test]
    fn channel_names_parse_from_snake_case() {
        assert_eq!(Ok(ChannelId::StepsInfo), "steps_info".parse::<ChannelId>());
        assert_eq!("heart_rate_measurement", ChannelId::HeartRateMeasurement.to_string());
    }

    #[rstest]
    #[case(0x09, Some(Opcode::FactoryReset))]
    #[case(0x61, Some(Opcode::FindDevice))]
    #[case(0xFF, None)]
    fn opcode_from_byte_matches_table(#[case] value: u8, #[case] expected: Option<Opcode>) {
        assert_eq!(expected, Opcode::from_byte(value));
    }
}
