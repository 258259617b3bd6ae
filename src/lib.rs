mod app;
mod cli;
mod error;
mod events;
mod handlers;
mod hw;
mod notification;
mod protocol;
mod sink;
mod telemetry;
mod terminal;
mod utils;

pub use app::{SessionHandler, fake_hardware_client, real_hardware_client, run, run_with_clients};
pub use cli::{
    Args, Command, ControlAction, ControlArgs, FakeArgs, ListenArgs, LogLevel, OutputFormat,
    ReadArgs, Settings, SyncTimeArgs,
};
pub use error::{FixtureError, InteractionError, ProtocolError};
pub use events::{
    ActivitySample, BatteryInfo, ConnectionState, DeviceEvent, DeviceInfo, EventBus,
};
pub use handlers::{
    Capability, CommandDispatcher, CommandFrame, CommandOutcome, ConnectionInitializer,
    DeviceCapabilities, DeviceCommand, FRAME_MAGIC, FrameCodec, FrameCodecError,
    MAX_EXTRA_PAYLOAD_LEN, PROTOCOL_VERSION, TimeSyncHandler,
};
pub use hw::{
    BatteryLevelRecord, ChannelEvent, ChannelEventStream, CharacteristicChannel, CommandQueue,
    DeviceInformationRecord, DeviceSession, FakeTransportLog, FoundDevice, HardwareClient,
    ListenStopReason, ListenSummary, ReadStatus, TransportOp,
};
pub use notification::{NotificationDecodeError, NotificationRouter, RouterAction};
pub use protocol::{ChannelId, Opcode};
pub use sink::{
    JsonLinesSampleStore, MemorySampleStore, SampleSinkError, SampleStore, SampleWriter,
};
pub use terminal::TerminalClient;
