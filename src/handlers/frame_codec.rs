use thiserror::Error;
use time::OffsetDateTime;

use crate::events::{ActivitySample, BatteryInfo, DeviceInfo};
use crate::hw::{BatteryLevelRecord, DeviceInformationRecord};
use crate::notification::NotificationDecodeError;
use crate::protocol::Opcode;

/// Leading bytes of every control-point frame.
pub const FRAME_MAGIC: [u8; 2] = [0xFE, 0xEA];
/// Protocol version byte following the magic.
pub const PROTOCOL_VERSION: u8 = 0x10;
/// Header bytes counted by the length field: magic, version, length, opcode.
const HEADER_LEN: usize = 5;
/// Largest extra payload whose total length still fits the one-byte length field.
pub const MAX_EXTRA_PAYLOAD_LEN: usize = u8::MAX as usize - HEADER_LEN;
const SET_TIME_FRAME_LEN: u8 = 0x0A;
const SET_TIME_TERMINATOR: u8 = 0x03;
const STEPS_INFO_LEN: usize = 9;

/// Errors returned by frame encoding.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum FrameCodecError {
    /// The payload would overflow the one-byte length field.
    #[error("command payload is too large: {payload_len} bytes exceeds max {max_payload_len}")]
    PayloadTooLarge {
        payload_len: usize,
        max_payload_len: usize,
    },
    /// The timestamp does not fit in the 32-bit unsigned seconds field.
    #[error("timestamp {unix_timestamp} is outside the 32-bit unsigned range")]
    TimestampOutOfRange { unix_timestamp: i64 },
    /// The bytes are not a well-formed set-time frame.
    #[error("bytes are not a set-time frame")]
    NotSetTimeFrame,
}

/// One encoded control-point frame. Immutable once built.
#[derive(Debug, Clone, Eq, PartialEq, derive_more::Into)]
pub struct CommandFrame(Vec<u8>);

impl CommandFrame {
    /// Returns the frame bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the opcode byte.
    #[must_use]
    pub fn opcode(&self) -> u8 {
        self.0[4]
    }

    /// Returns the declared length byte.
    #[must_use]
    pub fn declared_len(&self) -> u8 {
        self.0[3]
    }
}

impl AsRef<[u8]> for CommandFrame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Stateless encoder/decoder for the watch wire format.
pub struct FrameCodec;

impl FrameCodec {
    /// Encodes a variable-length command frame.
    ///
    /// ```
    /// use uwatch::{FrameCodec, Opcode};
    ///
    /// let frame = FrameCodec::encode_generic(Opcode::FactoryReset, &[])?;
    /// assert_eq!(&[0xFE, 0xEA, 0x10, 0x05, 0x09], frame.as_bytes());
    /// # Ok::<(), uwatch::FrameCodecError>(())
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error when `payload` is longer than [`MAX_EXTRA_PAYLOAD_LEN`].
    pub fn encode_generic(opcode: Opcode, payload: &[u8]) -> Result<CommandFrame, FrameCodecError> {
        if payload.len() > MAX_EXTRA_PAYLOAD_LEN {
            return Err(FrameCodecError::PayloadTooLarge {
                payload_len: payload.len(),
                max_payload_len: MAX_EXTRA_PAYLOAD_LEN,
            });
        }

        let declared_len = u8::try_from(payload.len() + HEADER_LEN).map_err(|_| {
            FrameCodecError::PayloadTooLarge {
                payload_len: payload.len(),
                max_payload_len: MAX_EXTRA_PAYLOAD_LEN,
            }
        })?;

        let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
        frame.extend_from_slice(&FRAME_MAGIC);
        frame.push(PROTOCOL_VERSION);
        frame.push(declared_len);
        frame.push(opcode.as_byte());
        frame.extend_from_slice(payload);
        Ok(CommandFrame(frame))
    }

    /// Encodes the fixed 10-byte set-time frame.
    ///
    /// ```
    /// use uwatch::FrameCodec;
    ///
    /// let frame = FrameCodec::encode_set_time(0x6553_F100);
    /// assert_eq!(
    ///     &[0xFE, 0xEA, 0x10, 0x0A, 0x31, 0x65, 0x53, 0xF1, 0x00, 0x03],
    ///     frame.as_bytes()
    /// );
    /// ```
    #[must_use]
    pub fn encode_set_time(epoch_seconds: u32) -> CommandFrame {
        let [b0, b1, b2, b3] = epoch_seconds.to_be_bytes();
        CommandFrame(vec![
            FRAME_MAGIC[0],
            FRAME_MAGIC[1],
            PROTOCOL_VERSION,
            SET_TIME_FRAME_LEN,
            Opcode::SetTime.as_byte(),
            b0,
            b1,
            b2,
            b3,
            SET_TIME_TERMINATOR,
        ])
    }

    /// Recovers the timestamp embedded in a set-time frame.
    ///
    /// # Errors
    ///
    /// Returns an error when `frame` does not have the set-time shape.
    pub fn decode_set_time(frame: &[u8]) -> Result<u32, FrameCodecError> {
        match frame {
            [m0, m1, PROTOCOL_VERSION, SET_TIME_FRAME_LEN, opcode, b0, b1, b2, b3, SET_TIME_TERMINATOR]
                if [*m0, *m1] == FRAME_MAGIC && *opcode == Opcode::SetTime.as_byte() =>
            {
                Ok(u32::from_be_bytes([*b0, *b1, *b2, *b3]))
            }
            _ => Err(FrameCodecError::NotSetTimeFrame),
        }
    }

    /// Encodes the fixed find-device frame.
    #[must_use]
    pub fn encode_find_device() -> CommandFrame {
        CommandFrame(vec![
            FRAME_MAGIC[0],
            FRAME_MAGIC[1],
            PROTOCOL_VERSION,
            0x05,
            Opcode::FindDevice.as_byte(),
        ])
    }

    /// Decodes a 9-byte steps-info notification, stamping it with `received_at`.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationDecodeError::MalformedPacket`] for any other length.
    pub fn decode_steps_info(
        payload: &[u8],
        received_at: OffsetDateTime,
    ) -> Result<ActivitySample, NotificationDecodeError> {
        let Ok(fields) = <&[u8; STEPS_INFO_LEN]>::try_from(payload) else {
            return Err(NotificationDecodeError::MalformedPacket {
                expected: STEPS_INFO_LEN,
                actual: payload.len(),
            });
        };

        let [s0, s1, s2, d0, d1, d2, c0, c1, c2] = *fields;
        Ok(ActivitySample::new(
            received_at.unix_timestamp(),
            u24_le(s0, s1, s2),
            u24_le(d0, d1, d2),
            u24_le(c0, c1, c2),
        ))
    }

    /// Converts a device-information profile record.
    #[must_use]
    pub fn decode_device_info(record: DeviceInformationRecord) -> DeviceInfo {
        let (hardware_revision, firmware_revision) = record.into_parts();
        DeviceInfo::new(
            hardware_revision.unwrap_or_default(),
            firmware_revision.unwrap_or_default(),
        )
    }

    /// Converts a battery profile record.
    #[must_use]
    pub fn decode_battery_info(record: BatteryLevelRecord) -> BatteryInfo {
        BatteryInfo::new(record.level())
    }
}

fn u24_le(low: u8, mid: u8, high: u8) -> u32 {
    u32::from_le_bytes([low, mid, high, 0])
}
