use std::path::{Path, PathBuf};
use std::time::Duration;

use bon::Builder;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::filter::LevelFilter;

use crate::cli::control::{ControlArgs, ReadArgs, SyncTimeArgs};
use crate::cli::listen::ListenArgs;
use crate::error::FixtureError;
use crate::hw::{DeviceInfoFixture, FakeBackendConfig, FakeTransportLog, NotificationFixture};
use crate::protocol::ChannelId;

/// Command-line options for the Uwatch BLE tool.
#[derive(Debug, Parser)]
#[command(name = "uwatch", about = "Talk to Umidigi Uwatch2 fitness watches over BLE.")]
pub struct Args {
    /// Log verbosity; overrides `RUST_LOG`.
    #[arg(long, global = true, value_enum)]
    log_level: Option<LogLevel>,
    /// Output format. Defaults to `pretty` on a terminal and `json` otherwise.
    #[arg(long, global = true, value_enum)]
    output: Option<OutputFormat>,
    /// Advertised local name to connect to.
    #[arg(long, global = true)]
    name: Option<String>,
    /// Append activity samples to this JSON-lines file instead of keeping them in memory.
    #[arg(long, global = true)]
    samples: Option<PathBuf>,
    /// Uses the fake BLE backend with fixture-driven payloads.
    #[arg(long, global = true)]
    fake: bool,
    /// Fake notifications in the form `fee1:0A0B0C,fee3:01,...`.
    #[arg(long, global = true, requires = "fake")]
    fake_notifications: Option<NotificationFixture>,
    /// Fake device information in the form `hardware|firmware`.
    #[arg(long, global = true, requires = "fake")]
    fake_device_info: Option<DeviceInfoFixture>,
    /// Fake battery level in percent.
    #[arg(long, global = true, requires = "fake")]
    fake_battery: Option<u8>,
    /// Artificial fake connection delay (e.g. `250ms`, `2s`).
    #[arg(long, global = true, requires = "fake", value_parser = parse_duration)]
    fake_connect_delay: Option<Duration>,
    #[command(subcommand)]
    command: Command,
}

impl Args {
    /// Creates argument values directly without CLI parsing.
    ///
    /// ```
    /// use uwatch::{Args, Command, ListenArgs};
    ///
    /// let info = Args::new(Command::Info);
    /// let listen = Args::new(Command::Listen(ListenArgs::new(Some(10))));
    /// let _ = (info, listen);
    /// ```
    #[must_use]
    pub fn new(command: Command) -> Self {
        Self {
            log_level: None,
            output: None,
            name: None,
            samples: None,
            fake: false,
            fake_notifications: None,
            fake_device_info: None,
            fake_battery: None,
            fake_connect_delay: None,
            command,
        }
    }

    /// Returns the requested log level, if any.
    #[must_use]
    pub fn log_level(&self) -> Option<LogLevel> {
        self.log_level
    }

    /// Returns the requested output format, if any.
    #[must_use]
    pub fn output_format(&self) -> Option<OutputFormat> {
        self.output
    }

    /// Returns run settings, resolving the output format with `default_output`.
    #[must_use]
    pub fn settings(&self, default_output: OutputFormat) -> Settings {
        Settings::builder()
            .output_format(self.output.unwrap_or(default_output))
            .maybe_device_name(self.name.clone())
            .maybe_samples_path(self.samples.clone())
            .maybe_log_level(self.log_level)
            .build()
    }

    /// Splits parsed CLI arguments into command and optional fake-client settings.
    #[must_use]
    pub fn into_command_and_fake_args(self) -> (Command, Option<FakeArgs>) {
        let Args {
            fake,
            fake_notifications,
            fake_device_info,
            fake_battery,
            fake_connect_delay,
            command,
            ..
        } = self;

        let fake_args = fake.then(|| FakeArgs {
            notifications: fake_notifications,
            device_info: fake_device_info,
            battery_level: fake_battery,
            connect_delay: fake_connect_delay.unwrap_or(Duration::ZERO),
            hold_open: false,
            reject_channel: None,
            transport_log: None,
        });

        (command, fake_args)
    }
}

/// Settings shared by every command.
#[derive(Debug, Clone, Builder)]
pub struct Settings {
    #[builder(default = OutputFormat::Pretty)]
    output_format: OutputFormat,
    #[builder(into)]
    device_name: Option<String>,
    #[builder(into)]
    samples_path: Option<PathBuf>,
    log_level: Option<LogLevel>,
}

impl Settings {
    #[must_use]
    pub fn output_format(&self) -> OutputFormat {
        self.output_format
    }

    /// Device name override; `None` keeps the model default.
    #[must_use]
    pub fn device_name(&self) -> Option<&str> {
        self.device_name.as_deref()
    }

    #[must_use]
    pub fn samples_path(&self) -> Option<&Path> {
        self.samples_path.as_deref()
    }

    #[must_use]
    pub fn log_level(&self) -> Option<LogLevel> {
        self.log_level
    }
}

/// Fake backend arguments for programmatic runs.
#[derive(Debug, Builder)]
pub struct FakeArgs {
    #[builder(with = |value: &str| -> std::result::Result<_, FixtureError> { value.parse() })]
    notifications: Option<NotificationFixture>,
    #[builder(with = |value: &str| -> std::result::Result<_, FixtureError> { value.parse() })]
    device_info: Option<DeviceInfoFixture>,
    battery_level: Option<u8>,
    #[builder(default)]
    connect_delay: Duration,
    /// Keeps the notification stream open after the scripted events.
    #[builder(default)]
    hold_open: bool,
    /// Rejects every operation on this channel.
    reject_channel: Option<ChannelId>,
    /// Records every transport operation.
    transport_log: Option<FakeTransportLog>,
}

impl FakeArgs {
    pub(crate) fn into_backend_config(self) -> FakeBackendConfig {
        let Self {
            notifications,
            device_info,
            battery_level,
            connect_delay,
            hold_open,
            reject_channel,
            transport_log,
        } = self;

        FakeBackendConfig::builder()
            .maybe_notifications(notifications)
            .maybe_device_info(device_info)
            .maybe_battery_level(battery_level)
            .maybe_reject_channel(reject_channel)
            .hold_open(hold_open)
            .connect_delay(connect_delay)
            .maybe_log(transport_log)
            .build()
    }
}

/// Supported CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Connect, initialise, then print activity samples as they arrive.
    Listen(ListenArgs),
    /// Connect, initialise, then print device information and battery level.
    Info,
    /// Connect and set the watch clock.
    SyncTime(SyncTimeArgs),
    /// Connect and make the watch vibrate.
    Find,
    /// Connect and send one device command.
    #[command(name = "command")]
    Control(ControlArgs),
    /// Connect and read one characteristic.
    Read(ReadArgs),
}

/// Log verbosity accepted by `--log-level`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub(crate) fn as_level_filter(self) -> LevelFilter {
        match self {
            Self::Off => LevelFilter::OFF,
            Self::Error => LevelFilter::ERROR,
            Self::Warn => LevelFilter::WARN,
            Self::Info => LevelFilter::INFO,
            Self::Debug => LevelFilter::DEBUG,
            Self::Trace => LevelFilter::TRACE,
        }
    }
}

/// Output rendering accepted by `--output`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text, coloured on a terminal.
    Pretty,
    /// One JSON document per line.
    Json,
}

fn parse_duration(value: &str) -> Result<Duration, String> {
    humantime::parse_duration(value).map_err(|error| error.to_string())
}
