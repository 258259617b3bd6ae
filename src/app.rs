use std::io;

use anyhow::{Context, Result};
use tracing::instrument;

use crate::cli::control::ControlRequest;
use crate::cli::{Command, FakeArgs, LogLevel, Settings};
use crate::handlers::DeviceCapabilities;
use crate::hw::{
    DeviceSession, HardwareClient, fake_hardware_client as build_fake_hardware_client,
    real_hardware_client as build_real_hardware_client,
};
use crate::telemetry;
use crate::terminal::{SystemTerminalClient, TerminalClient};

const SERVICE_NAME: &str = "uwatch";

/// Creates a hardware client backed by the real BLE transport.
#[must_use]
pub fn real_hardware_client() -> Box<dyn HardwareClient> {
    build_real_hardware_client()
}

/// Creates a hardware client backed by fake BLE fixtures.
#[must_use]
pub fn fake_hardware_client(fake_args: FakeArgs) -> Box<dyn HardwareClient> {
    build_fake_hardware_client(fake_args.into_backend_config())
}

/// Session-level app helper for acquiring a watch connection.
pub struct SessionHandler {
    hardware_client: Box<dyn HardwareClient>,
    capabilities: DeviceCapabilities,
}

impl SessionHandler {
    /// Creates a session handler for the Uwatch2.
    ///
    /// ```
    /// let handler = uwatch::SessionHandler::new(uwatch::real_hardware_client());
    /// let _ = handler;
    /// ```
    #[must_use]
    pub fn new(hardware_client: Box<dyn HardwareClient>) -> Self {
        Self {
            hardware_client,
            capabilities: DeviceCapabilities::uwatch2(),
        }
    }

    /// Overrides the advertised local name matched while scanning.
    ///
    /// ```
    /// let handler = uwatch::SessionHandler::new(uwatch::real_hardware_client())
    ///     .with_device_name("Uwatch2-Desk");
    /// let _ = handler;
    /// ```
    #[must_use]
    pub fn with_device_name(mut self, device_name: impl Into<String>) -> Self {
        self.capabilities = self.capabilities.with_device_name(device_name);
        self
    }

    /// Connects to the first matching watch.
    ///
    /// # Errors
    ///
    /// Returns an error if discovery or connection fails.
    #[instrument(
        skip(self),
        level = "info",
        fields(device_name = self.capabilities.device_name())
    )]
    pub async fn connect(self) -> Result<DeviceSession> {
        let Self {
            hardware_client,
            capabilities,
        } = self;
        hardware_client
            .connect(&capabilities)
            .await
            .with_context(|| format!("failed to connect to `{}`", capabilities.device_name()))
    }
}

/// Runs the CLI command with injected clients.
///
/// ```
/// # async fn run() -> anyhow::Result<()> {
/// use clap::Parser;
///
/// let args = uwatch::Args::try_parse_from(["uwatch", "--fake", "--output", "json", "info"])?;
/// let settings = args.settings(uwatch::OutputFormat::Json);
/// let (command, maybe_fake_args) = args.into_command_and_fake_args();
/// let hardware_client = match maybe_fake_args {
///     Some(fake_args) => uwatch::fake_hardware_client(fake_args),
///     None => uwatch::real_hardware_client(),
/// };
/// let mut out = Vec::new();
/// uwatch::run(command, &settings, &mut out, hardware_client).await?;
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns an error if tracing initialisation fails, BLE interaction fails, or
/// output writing fails.
pub async fn run<W>(
    command: Command,
    settings: &Settings,
    out: &mut W,
    hardware_client: Box<dyn HardwareClient>,
) -> Result<()>
where
    W: io::Write,
{
    run_with_clients(command, settings, out, &SystemTerminalClient, hardware_client).await
}

/// Runs the CLI command with injected terminal and hardware clients.
///
/// ```
/// # async fn run() -> anyhow::Result<()> {
/// struct FakeTerminal;
/// impl uwatch::TerminalClient for FakeTerminal {
///     fn stdout_is_terminal(&self) -> bool { false }
///     fn stderr_is_terminal(&self) -> bool { false }
/// }
///
/// let fake_args = uwatch::FakeArgs::builder().battery_level(64).build();
/// let settings = uwatch::Settings::builder().build();
/// let mut out = Vec::new();
/// uwatch::run_with_clients(
///     uwatch::Command::Find,
///     &settings,
///     &mut out,
///     &FakeTerminal,
///     uwatch::fake_hardware_client(fake_args),
/// ).await?;
/// assert_eq!("find: sent\n", String::from_utf8(out)?);
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns an error if tracing initialisation fails, BLE interaction fails, or
/// output writing fails.
#[instrument(
    skip(settings, out, terminal_client, hardware_client),
    level = "info",
    fields(command = command_name(&command), output = ?settings.output_format())
)]
pub async fn run_with_clients<W>(
    command: Command,
    settings: &Settings,
    out: &mut W,
    terminal_client: &dyn TerminalClient,
    hardware_client: Box<dyn HardwareClient>,
) -> Result<()>
where
    W: io::Write,
{
    telemetry::initialise_tracing(
        SERVICE_NAME,
        terminal_client.stderr_is_terminal(),
        settings.log_level().map(LogLevel::as_level_filter),
    )?;

    match &command {
        Command::Listen(args) => {
            crate::cli::listen::run(hardware_client, args, settings, out, terminal_client).await
        }
        Command::Info => crate::cli::info::run(hardware_client, settings, out, terminal_client).await,
        Command::SyncTime(args) => {
            let request = ControlRequest::SyncTime(args);
            crate::cli::control::run(hardware_client, request, settings, out, terminal_client).await
        }
        Command::Find => {
            let request = ControlRequest::Find;
            crate::cli::control::run(hardware_client, request, settings, out, terminal_client).await
        }
        Command::Control(args) => {
            let request = ControlRequest::Command(args);
            crate::cli::control::run(hardware_client, request, settings, out, terminal_client).await
        }
        Command::Read(args) => {
            let request = ControlRequest::Read(args);
            crate::cli::control::run(hardware_client, request, settings, out, terminal_client).await
        }
    }
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Listen(_args) => "listen",
        Command::Info => "info",
        Command::SyncTime(_args) => "sync-time",
        Command::Find => "find",
        Command::Control(_args) => "command",
        Command::Read(_args) => "read",
    }
}
