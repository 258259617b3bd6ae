use std::io;

use anyhow::Result;
use time::OffsetDateTime;
use tokio::sync::broadcast;
use tracing::instrument;

use crate::events::DeviceEvent;
use crate::hw::{DeviceSession, HardwareClient};
use crate::terminal::TerminalClient;

use super::command::{OutputFormat, Settings};
use super::report::Reporter;
use super::ui::{DeviceReport, DeviceReportView};

/// Executes the `info` command.
#[instrument(skip(client, settings, out, terminal_client), level = "info")]
pub(crate) async fn run<W>(
    client: Box<dyn HardwareClient>,
    settings: &Settings,
    out: &mut W,
    terminal_client: &dyn TerminalClient,
) -> Result<()>
where
    W: io::Write,
{
    let mut reporter = Reporter::new(out, settings.output_format(), terminal_client);
    let session = super::connect(client, settings).await?;

    let report_result = collect_report(&session).await;
    let report = super::disconnect_after(session, report_result).await?;

    if settings.output_format() == OutputFormat::Pretty {
        reporter.connected(report.device())?;
    }
    let view = DeviceReportView::new(&report, reporter.painter()).to_string();
    reporter.result(view, &report)
}

async fn collect_report(session: &DeviceSession) -> Result<DeviceReport> {
    let mut listener = session.events().subscribe();
    session.initialize(OffsetDateTime::now_utc()).await?;

    let mut device_info = None;
    let mut battery = None;
    loop {
        match listener.try_recv() {
            Ok(DeviceEvent::DeviceInfoReceived(info)) => device_info = Some(info),
            Ok(DeviceEvent::BatteryInfoReceived(info)) => battery = Some(info),
            Ok(_) | Err(broadcast::error::TryRecvError::Lagged(_)) => {}
            Err(_) => break,
        }
    }

    Ok(DeviceReport::new(
        session.device().clone(),
        session.capabilities(),
        device_info,
        battery,
        session.state(),
    ))
}
