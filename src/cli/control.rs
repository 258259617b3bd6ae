use std::io;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use serde::Serialize;
use strum_macros::Display;
use time::OffsetDateTime;
use tracing::instrument;

use crate::handlers::{CommandOutcome, DeviceCommand};
use crate::hw::{DeviceSession, HardwareClient};
use crate::protocol::ChannelId;
use crate::terminal::TerminalClient;
use crate::utils::format_hex;

use super::command::Settings;
use super::report::Reporter;

/// JSON result emitted by a one-shot command.
#[derive(Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum ControlResult {
    SyncTime {
        unix_timestamp: i64,
        outcome: &'static str,
    },
    Find {
        outcome: &'static str,
    },
    Command {
        command: String,
        outcome: &'static str,
    },
    Read {
        channel: String,
        payload: String,
    },
}

/// Arguments for the `sync-time` command.
#[derive(Debug, Args)]
pub struct SyncTimeArgs {
    /// Unix timestamp in UTC seconds. Uses current UTC time when omitted.
    #[arg(long)]
    unix_timestamp: Option<i64>,
}

impl SyncTimeArgs {
    /// Creates sync-time arguments.
    ///
    /// ```
    /// use uwatch::SyncTimeArgs;
    ///
    /// let args = SyncTimeArgs::new(Some(1_700_000_000));
    /// let _ = args;
    /// ```
    #[must_use]
    pub fn new(unix_timestamp: Option<i64>) -> Self {
        Self { unix_timestamp }
    }

    fn resolve_timestamp(&self) -> Result<OffsetDateTime> {
        match self.unix_timestamp {
            Some(value) => OffsetDateTime::from_unix_timestamp(value)
                .with_context(|| format!("invalid unix timestamp: {value}")),
            None => Ok(OffsetDateTime::now_utc()),
        }
    }
}

/// Arguments for the `command` command.
#[derive(Debug, Args)]
pub struct ControlArgs {
    #[arg(value_enum)]
    action: ControlAction,
}

impl ControlArgs {
    /// Creates arguments for one device command.
    ///
    /// ```
    /// use uwatch::{ControlAction, ControlArgs};
    ///
    /// let args = ControlArgs::new(ControlAction::Reboot);
    /// let _ = args;
    /// ```
    #[must_use]
    pub fn new(action: ControlAction) -> Self {
        Self { action }
    }
}

/// Device commands reachable from the command line.
#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ControlAction {
    Reboot,
    FactoryReset,
    StopVibration,
    SetAlarms,
    SendNotification,
    SetMusicInfo,
    AddCalendarEvent,
    SendWeather,
    FetchRecordedData,
    EnableHeartRate,
    DisableHeartRate,
}

impl From<ControlAction> for DeviceCommand {
    fn from(action: ControlAction) -> Self {
        match action {
            ControlAction::Reboot => Self::Reboot,
            ControlAction::FactoryReset => Self::FactoryReset,
            ControlAction::StopVibration => Self::StopMotorVibrate,
            ControlAction::SetAlarms => Self::SetAlarms,
            ControlAction::SendNotification => Self::SendNotification,
            ControlAction::SetMusicInfo => Self::SetMusicInfo,
            ControlAction::AddCalendarEvent => Self::AddCalendarEvent,
            ControlAction::SendWeather => Self::SendWeather,
            ControlAction::FetchRecordedData => Self::FetchRecordedData,
            ControlAction::EnableHeartRate => Self::EnableRealtimeHeartRate(true),
            ControlAction::DisableHeartRate => Self::EnableRealtimeHeartRate(false),
        }
    }
}

/// Arguments for the `read` command.
#[derive(Debug, Args)]
pub struct ReadArgs {
    /// Characteristic to read, e.g. `battery_level` or `firmware_revision`.
    channel: ChannelId,
}

impl ReadArgs {
    /// Creates read arguments for one channel.
    #[must_use]
    pub fn new(channel: ChannelId) -> Self {
        Self { channel }
    }
}

/// One-shot request handled by [`run`].
#[derive(Debug)]
pub(crate) enum ControlRequest<'a> {
    SyncTime(&'a SyncTimeArgs),
    Find,
    Command(&'a ControlArgs),
    Read(&'a ReadArgs),
}

/// Connects, initialises, performs one request and disconnects.
#[instrument(skip(client, settings, out, terminal_client), level = "info")]
pub(crate) async fn run<W>(
    client: Box<dyn HardwareClient>,
    request: ControlRequest<'_>,
    settings: &Settings,
    out: &mut W,
    terminal_client: &dyn TerminalClient,
) -> Result<()>
where
    W: io::Write,
{
    let mut reporter = Reporter::new(out, settings.output_format(), terminal_client);
    let session = super::connect(client, settings).await?;

    let command_result = run_with_session(&session, request, settings, &mut reporter).await;
    super::disconnect_after(session, command_result).await
}

async fn run_with_session<W>(
    session: &DeviceSession,
    request: ControlRequest<'_>,
    settings: &Settings,
    reporter: &mut Reporter<'_, W>,
) -> Result<()>
where
    W: io::Write,
{
    session.initialize(OffsetDateTime::now_utc()).await?;

    match request {
        ControlRequest::SyncTime(args) => {
            let timestamp = args.resolve_timestamp()?;
            let outcome = session
                .send_command(DeviceCommand::SetTime(timestamp))
                .await?;
            let unix_timestamp = timestamp.unix_timestamp();
            let pretty = match outcome {
                CommandOutcome::Queued => format!("Synced time (UTC unix): {unix_timestamp}"),
                CommandOutcome::Unsupported => "sync-time: unsupported".to_string(),
            };
            reporter.result(
                pretty,
                &ControlResult::SyncTime {
                    unix_timestamp,
                    outcome: outcome_label(outcome),
                },
            )?;
        }
        ControlRequest::Find => {
            let outcome = session.send_command(DeviceCommand::FindDevice).await?;
            reporter.result(
                format!("find: {}", outcome_label(outcome)),
                &ControlResult::Find {
                    outcome: outcome_label(outcome),
                },
            )?;
        }
        ControlRequest::Command(args) => {
            let outcome = session
                .send_command(DeviceCommand::from(args.action))
                .await?;
            reporter.result(
                format!("{}: {}", args.action, outcome_label(outcome)),
                &ControlResult::Command {
                    command: args.action.to_string(),
                    outcome: outcome_label(outcome),
                },
            )?;
        }
        ControlRequest::Read(args) => {
            let router = session.router(super::sample_store(settings));
            let payload = session.read_channel(args.channel, &router).await?;
            reporter.result(
                format!("{}: {}", args.channel, format_hex(&payload)),
                &ControlResult::Read {
                    channel: args.channel.to_string(),
                    payload: hex::encode(&payload),
                },
            )?;
        }
    }

    Ok(())
}

fn outcome_label(outcome: CommandOutcome) -> &'static str {
    match outcome {
        CommandOutcome::Queued => "sent",
        CommandOutcome::Unsupported => "unsupported",
    }
}
