use serde::Serialize;

use crate::protocol::{self, ChannelId};

/// A discovered watch that matched the scan predicate.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct FoundDevice {
    adapter_name: String,
    device_id: String,
    local_name: Option<String>,
    rssi: Option<i16>,
}

impl FoundDevice {
    pub(crate) fn new(
        adapter_name: String,
        device_id: String,
        local_name: Option<String>,
        rssi: Option<i16>,
    ) -> Self {
        Self {
            adapter_name,
            device_id,
            local_name,
            rssi,
        }
    }

    /// Returns the adapter name used to discover this device.
    #[must_use]
    pub fn adapter_name(&self) -> &str {
        &self.adapter_name
    }

    /// Returns the backend-specific device identifier.
    #[must_use]
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Returns the advertised local name, if present.
    #[must_use]
    pub fn local_name(&self) -> Option<&str> {
        self.local_name.as_deref()
    }

    /// Returns the latest observed RSSI value, if present.
    #[must_use]
    pub fn rssi(&self) -> Option<i16> {
        self.rssi
    }
}

/// Raw values read from the standard device information profile.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct DeviceInformationRecord {
    hardware_revision: Option<String>,
    firmware_revision: Option<String>,
}

impl DeviceInformationRecord {
    #[must_use]
    pub fn new(hardware_revision: Option<String>, firmware_revision: Option<String>) -> Self {
        Self {
            hardware_revision,
            firmware_revision,
        }
    }

    pub(crate) fn into_parts(self) -> (Option<String>, Option<String>) {
        (self.hardware_revision, self.firmware_revision)
    }
}

/// Raw value read from the standard battery level characteristic.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct BatteryLevelRecord(u8);

impl BatteryLevelRecord {
    #[must_use]
    pub fn new(level: u8) -> Self {
        Self(level)
    }

    pub(crate) fn level(self) -> u8 {
        self.0
    }
}

/// A value-changed notification pushed by the transport.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ChannelEvent {
    uuid: String,
    channel: Option<ChannelId>,
    payload: Vec<u8>,
}

impl ChannelEvent {
    /// Creates an event for a characteristic UUID, resolving it against the channel table.
    #[must_use]
    pub fn from_uuid(uuid: impl Into<String>, payload: Vec<u8>) -> Self {
        let uuid = uuid.into().to_ascii_lowercase();
        let channel = protocol::channel_for_uuid(&uuid);
        Self {
            uuid,
            channel,
            payload,
        }
    }

    /// Creates an event for a known channel.
    #[must_use]
    pub fn for_channel(channel: ChannelId, payload: Vec<u8>) -> Self {
        Self {
            uuid: protocol::channel_metadata(channel).uuid().to_string(),
            channel: Some(channel),
            payload,
        }
    }

    /// Characteristic UUID the value arrived on.
    #[must_use]
    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    /// Known channel role, if the UUID is in the channel table.
    #[must_use]
    pub fn channel(&self) -> Option<ChannelId> {
        self.channel
    }

    /// Raw notification bytes.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

/// Outcome reported by the transport for a characteristic read.
#[derive(Debug, Clone, Copy, Eq, PartialEq, derive_more::Display)]
pub enum ReadStatus {
    #[display("success")]
    Success,
    #[display("failed")]
    Failed,
}

/// Why a listen run ended.
#[derive(Debug, Clone, Eq, PartialEq, derive_more::Display, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListenStopReason {
    #[display("interrupted")]
    Interrupted,
    #[display("reached sample limit ({_0})")]
    ReachedLimit(usize),
    #[display("notification stream closed")]
    NotificationStreamClosed,
}

/// Counters for one listen run.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct ListenSummary {
    received_notifications: usize,
    produced_samples: usize,
    stop_reason: ListenStopReason,
}

impl ListenSummary {
    pub(crate) fn new(
        received_notifications: usize,
        produced_samples: usize,
        stop_reason: ListenStopReason,
    ) -> Self {
        Self {
            received_notifications,
            produced_samples,
            stop_reason,
        }
    }

    /// Returns the number of notifications received from the transport.
    #[must_use]
    pub fn received_notifications(&self) -> usize {
        self.received_notifications
    }

    /// Returns the number of activity samples produced.
    #[must_use]
    pub fn produced_samples(&self) -> usize {
        self.produced_samples
    }

    /// Returns why the run stopped.
    #[must_use]
    pub fn stop_reason(&self) -> &ListenStopReason {
        &self.stop_reason
    }
}
