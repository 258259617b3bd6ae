use strum_macros::Display;
use time::OffsetDateTime;

use crate::protocol::Opcode;

use super::capabilities::Capability;
use super::frame_codec::{CommandFrame, FrameCodec, FrameCodecError};
use super::time_sync::TimeSyncHandler;

/// Host intents that may be sent to a device.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum DeviceCommand {
    SetTime(OffsetDateTime),
    FindDevice,
    FactoryReset,
    Reboot,
    StopMotorVibrate,
    SetAlarms,
    SendNotification,
    SetMusicInfo,
    AddCalendarEvent,
    SendWeather,
    FetchRecordedData,
    EnableRealtimeHeartRate(bool),
}

impl DeviceCommand {
    /// Capability a device must declare before this command is routed.
    #[must_use]
    pub fn required_capability(&self) -> Capability {
        match self {
            Self::SetTime(_) => Capability::SetTime,
            Self::FindDevice => Capability::FindDevice,
            Self::FactoryReset => Capability::FactoryReset,
            Self::Reboot => Capability::Reboot,
            Self::StopMotorVibrate => Capability::Vibration,
            Self::SetAlarms => Capability::Alarms,
            Self::SendNotification => Capability::Notifications,
            Self::SetMusicInfo => Capability::Music,
            Self::AddCalendarEvent => Capability::CalendarEvents,
            Self::SendWeather => Capability::Weather,
            Self::FetchRecordedData => Capability::ActivityDataFetching,
            Self::EnableRealtimeHeartRate(_) => Capability::HeartRate,
        }
    }

    /// Encodes the control-point frame, or `None` when this watch has no encoding.
    ///
    /// # Errors
    ///
    /// Returns an error when the frame cannot be encoded.
    pub fn encode(&self) -> Result<Option<CommandFrame>, FrameCodecError> {
        let frame = match self {
            Self::SetTime(timestamp) => TimeSyncHandler::frame_for(*timestamp)?,
            Self::FindDevice => FrameCodec::encode_find_device(),
            Self::FactoryReset => FrameCodec::encode_generic(Opcode::FactoryReset, &[])?,
            Self::Reboot => FrameCodec::encode_generic(Opcode::Reboot, &[])?,
            Self::StopMotorVibrate => FrameCodec::encode_generic(Opcode::StopMotorVibrate, &[])?,
            Self::SetAlarms
            | Self::SendNotification
            | Self::SetMusicInfo
            | Self::AddCalendarEvent
            | Self::SendWeather
            | Self::FetchRecordedData
            | Self::EnableRealtimeHeartRate(_) => return Ok(None),
        };
        Ok(Some(frame))
    }
}
