use time::OffsetDateTime;

use super::{CommandFrame, FrameCodec, FrameCodecError};

/// Builds set-time frames from wall-clock timestamps.
pub struct TimeSyncHandler;

impl TimeSyncHandler {
    /// Builds the set-time frame for `timestamp`.
    ///
    /// ```
    /// use time::OffsetDateTime;
    /// use uwatch::TimeSyncHandler;
    ///
    /// let frame = TimeSyncHandler::frame_for(OffsetDateTime::UNIX_EPOCH)?;
    /// assert_eq!(&[0xFE, 0xEA, 0x10, 0x0A, 0x31, 0, 0, 0, 0, 0x03], frame.as_bytes());
    /// # Ok::<(), uwatch::FrameCodecError>(())
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error when the Unix timestamp is negative or beyond `u32::MAX`.
    pub fn frame_for(timestamp: OffsetDateTime) -> Result<CommandFrame, FrameCodecError> {
        let unix_timestamp = timestamp.unix_timestamp();
        let epoch_seconds = u32::try_from(unix_timestamp)
            .map_err(|_| FrameCodecError::TimestampOutOfRange { unix_timestamp })?;
        Ok(FrameCodec::encode_set_time(epoch_seconds))
    }
}
