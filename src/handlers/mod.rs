mod capabilities;
mod device_command;
mod dispatcher;
mod frame_codec;
mod initializer;
mod time_sync;

pub use self::capabilities::{Capability, DeviceCapabilities};
pub use self::device_command::DeviceCommand;
pub use self::dispatcher::{CommandDispatcher, CommandOutcome};
pub use self::frame_codec::{
    CommandFrame, FRAME_MAGIC, FrameCodec, FrameCodecError, MAX_EXTRA_PAYLOAD_LEN,
    PROTOCOL_VERSION,
};
pub use self::initializer::ConnectionInitializer;
pub use self::time_sync::TimeSyncHandler;
