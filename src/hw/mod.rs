mod btleplug_backend;
mod fake_backend;
mod hardware;
mod model;
mod queue;
mod session;
mod transport;

pub(crate) use self::fake_backend::{DeviceInfoFixture, FakeBackendConfig, NotificationFixture};
pub use self::fake_backend::{FakeTransportLog, TransportOp};
pub use self::hardware::HardwareClient;
pub(crate) use self::hardware::{fake_hardware_client, real_hardware_client};
pub use self::model::{
    BatteryLevelRecord, ChannelEvent, DeviceInformationRecord, FoundDevice, ListenStopReason,
    ListenSummary, ReadStatus,
};
pub use self::queue::CommandQueue;
pub(crate) use self::queue::{QueuedAction, Transaction};
pub use self::session::DeviceSession;
pub use self::transport::{ChannelEventStream, CharacteristicChannel};
