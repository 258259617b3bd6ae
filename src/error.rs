use derive_more::From;
use thiserror::Error;

use crate::handlers::FrameCodecError;
use crate::notification::NotificationDecodeError;
use crate::protocol::{ChannelId, channel_metadata};
use crate::sink::SampleSinkError;

/// Errors returned by transport operations.
#[derive(Debug, Error)]
pub enum InteractionError {
    #[error("BLE operation failed")]
    Ble(#[from] btleplug::Error),
    #[error("no BLE adapters were found")]
    NoAdapters,
    #[error("no device named `{name}` was found in the fake fixture")]
    NoMatchingFixtureDevice { name: String },
    #[error(
        "required channel `{name}` ({uuid}) was not found on the connected device",
        name = channel_metadata(*channel).name(),
        uuid = channel_metadata(*channel).uuid()
    )]
    MissingChannel { channel: ChannelId },
    #[error("required channels are missing: {missing}")]
    MissingRequiredChannels { missing: String },
    #[error("channel `{channel}` returned an empty value")]
    EmptyProfileValue { channel: ChannelId },
    #[error("transport rejected `{operation}` on channel `{channel}`")]
    TransportRejected {
        operation: &'static str,
        channel: ChannelId,
    },
    #[error("the transport connection is closed")]
    TransportClosed,
    #[error("failed while waiting for Ctrl+C")]
    CtrlC { source: std::io::Error },
    #[error(transparent)]
    Fixture(#[from] FixtureError),
}

/// Errors returned when parsing fake transport fixtures.
#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("notification fixtures must look like `fee1:0A0B0C`, got `{record}`")]
    InvalidNotificationRecord { record: String },
    #[error("channel `{value}` is not a 16-bit hexadecimal UUID")]
    InvalidShortUuid { value: String },
    #[error("payload is not valid hexadecimal")]
    InvalidHex(#[from] hex::FromHexError),
    #[error("device info fixtures must look like `hardware|firmware`")]
    InvalidDeviceInfo,
}

/// Errors returned by telemetry initialisation.
#[derive(Debug, Error)]
pub(crate) enum TelemetryError {
    #[error("failed to install tracing subscriber")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),
}

/// Top-level protocol errors wrapping module-specific error types.
#[derive(Debug, Error, From)]
pub enum ProtocolError {
    #[error(transparent)]
    #[from(NotificationDecodeError, Box<NotificationDecodeError>)]
    Notification(Box<NotificationDecodeError>),
    #[error(transparent)]
    #[from(FrameCodecError, Box<FrameCodecError>)]
    FrameCodec(Box<FrameCodecError>),
    #[error(transparent)]
    #[from(SampleSinkError, Box<SampleSinkError>)]
    SampleSink(Box<SampleSinkError>),
    #[error(transparent)]
    #[from(InteractionError, Box<InteractionError>)]
    Interaction(Box<InteractionError>),
}
