use async_trait::async_trait;
use tracing::info;

use super::btleplug_backend::BtleplugBackend;
use super::fake_backend::{FakeBackend, FakeBackendConfig};
use super::session::DeviceSession;
use crate::error::InteractionError;
use crate::handlers::DeviceCapabilities;

/// Finds and connects to one watch.
#[async_trait]
pub trait HardwareClient: Send + Sync {
    /// Connects to the first device matching `capabilities`.
    async fn connect(
        self: Box<Self>,
        capabilities: &DeviceCapabilities,
    ) -> Result<DeviceSession, InteractionError>;
}

/// Builds a hardware client backed by the real BLE transport.
pub(crate) fn real_hardware_client() -> Box<dyn HardwareClient> {
    Box::new(RealHardwareClient)
}

/// Builds a hardware client backed by fake fixtures.
pub(crate) fn fake_hardware_client(config: FakeBackendConfig) -> Box<dyn HardwareClient> {
    info!("using fake BLE backend");
    Box::new(FakeHardwareClient {
        backend: FakeBackend::new(config),
    })
}

#[derive(Debug)]
struct RealHardwareClient;

#[async_trait]
impl HardwareClient for RealHardwareClient {
    async fn connect(
        self: Box<Self>,
        capabilities: &DeviceCapabilities,
    ) -> Result<DeviceSession, InteractionError> {
        let channel = BtleplugBackend::new().await?.connect(capabilities).await?;
        Ok(DeviceSession::new(Box::new(channel), capabilities.clone()))
    }
}

#[derive(Debug)]
struct FakeHardwareClient {
    backend: FakeBackend,
}

#[async_trait]
impl HardwareClient for FakeHardwareClient {
    async fn connect(
        self: Box<Self>,
        capabilities: &DeviceCapabilities,
    ) -> Result<DeviceSession, InteractionError> {
        let Self { backend } = *self;
        let channel = backend.connect(capabilities).await?;
        Ok(DeviceSession::new(Box::new(channel), capabilities.clone()))
    }
}
