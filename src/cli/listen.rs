use clap::Args;
use std::io;

use anyhow::Result;
use time::OffsetDateTime;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;
use tracing::{instrument, warn};

use crate::events::DeviceEvent;
use crate::hw::{DeviceSession, HardwareClient, ListenSummary};
use crate::terminal::TerminalClient;

use super::command::Settings;
use super::report::Reporter;

/// Arguments for the `listen` command.
#[derive(Debug, Args)]
pub struct ListenArgs {
    /// Stop after this many activity samples. If omitted, listen until Ctrl+C.
    #[arg(long)]
    max_samples: Option<usize>,
}

impl ListenArgs {
    /// Creates listen arguments with an optional sample limit.
    #[must_use]
    pub fn new(max_samples: Option<usize>) -> Self {
        Self { max_samples }
    }

    pub(crate) fn max_samples(&self) -> Option<usize> {
        self.max_samples
    }
}

/// Executes the `listen` command.
#[instrument(skip(client, settings, out, terminal_client), level = "info")]
pub(crate) async fn run<W>(
    client: Box<dyn HardwareClient>,
    args: &ListenArgs,
    settings: &Settings,
    out: &mut W,
    terminal_client: &dyn TerminalClient,
) -> Result<()>
where
    W: io::Write,
{
    let mut reporter = Reporter::new(out, settings.output_format(), terminal_client);
    let session = super::connect(client, settings).await?;
    reporter.connected(session.device())?;

    let mut listener = session.events().subscribe();
    let listen_result = listen(&session, args, settings, &mut reporter, &mut listener).await;
    let listen_result = super::disconnect_after(session, listen_result).await;
    report_pending(&mut listener, &mut reporter)?;

    reporter.summary(&listen_result?)
}

async fn listen<W>(
    session: &DeviceSession,
    args: &ListenArgs,
    settings: &Settings,
    reporter: &mut Reporter<'_, W>,
    listener: &mut broadcast::Receiver<DeviceEvent>,
) -> Result<ListenSummary>
where
    W: io::Write,
{
    session.initialize(OffsetDateTime::now_utc()).await?;
    report_pending(listener, reporter)?;

    let router = session.router(super::sample_store(settings));
    let run = session.run(&router, args.max_samples(), CancellationToken::new());
    tokio::pin!(run);

    let summary = loop {
        tokio::select! {
            biased;
            received = listener.recv() => match received {
                Ok(event) => reporter.event(&event)?,
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "event output lagged"),
                Err(RecvError::Closed) => break (&mut run).await?,
            },
            summary = &mut run => break summary?,
        }
    };

    report_pending(listener, reporter)?;
    Ok(summary)
}

fn report_pending<W>(
    listener: &mut broadcast::Receiver<DeviceEvent>,
    reporter: &mut Reporter<'_, W>,
) -> Result<()>
where
    W: io::Write,
{
    loop {
        match listener.try_recv() {
            Ok(event) => reporter.event(&event)?,
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                warn!(skipped, "event output lagged");
            }
            Err(_) => return Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn max_samples_defaults_to_unbounded() {
        assert_eq!(None, ListenArgs::new(None).max_samples());
        assert_eq!(Some(3), ListenArgs::new(Some(3)).max_samples());
    }
}
