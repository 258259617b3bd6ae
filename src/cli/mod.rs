pub(crate) mod command;
pub(crate) mod control;
pub(crate) mod info;
pub(crate) mod listen;
pub(crate) mod report;
pub(crate) mod ui;

use std::sync::Arc;

use anyhow::Result;

use crate::app::SessionHandler;
use crate::hw::{DeviceSession, HardwareClient};
use crate::sink::{JsonLinesSampleStore, MemorySampleStore, SampleStore};

pub use self::command::{Args, Command, FakeArgs, LogLevel, OutputFormat, Settings};
pub use self::control::{ControlAction, ControlArgs, ReadArgs, SyncTimeArgs};
pub use self::listen::ListenArgs;

/// Connects to the watch named in `settings`, or the default model name.
pub(crate) async fn connect(
    client: Box<dyn HardwareClient>,
    settings: &Settings,
) -> Result<DeviceSession> {
    let handler = match settings.device_name() {
        Some(name) => SessionHandler::new(client).with_device_name(name),
        None => SessionHandler::new(client),
    };
    handler.connect().await
}

/// Disconnects `session`, keeping the command's own error when both fail.
pub(crate) async fn disconnect_after<T>(
    session: DeviceSession,
    command_result: Result<T>,
) -> Result<T> {
    if let Err(error) = session.disconnect().await {
        if command_result.is_ok() {
            return Err(error.into());
        }
        tracing::trace!(?error, "failed to disconnect cleanly");
    }

    command_result
}

/// Sample store selected by `--samples`.
pub(crate) fn sample_store(settings: &Settings) -> Arc<dyn SampleStore> {
    match settings.samples_path() {
        Some(path) => Arc::new(JsonLinesSampleStore::new(path)),
        None => Arc::new(MemorySampleStore::new()),
    }
}
