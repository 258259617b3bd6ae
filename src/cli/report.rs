use std::fmt::Display;
use std::io;

use anyhow::Result;
use serde::Serialize;
use serde_json::json;

use crate::events::DeviceEvent;
use crate::hw::{FoundDevice, ListenSummary};
use crate::terminal::TerminalClient;

use super::command::OutputFormat;
use super::ui::{DeviceView, EventView, ListenSummaryView, Painter};

/// Writes command output as styled text or one JSON document per line.
pub(crate) struct Reporter<'a, W> {
    out: &'a mut W,
    format: OutputFormat,
    painter: Painter,
}

impl<'a, W> Reporter<'a, W>
where
    W: io::Write,
{
    pub(crate) fn new(
        out: &'a mut W,
        format: OutputFormat,
        terminal_client: &dyn TerminalClient,
    ) -> Self {
        let use_colour = format == OutputFormat::Pretty && terminal_client.stdout_is_terminal();
        Self {
            out,
            format,
            painter: Painter::new(use_colour),
        }
    }

    pub(crate) fn painter(&self) -> &Painter {
        &self.painter
    }

    pub(crate) fn connected(&mut self, device: &FoundDevice) -> Result<()> {
        match self.format {
            OutputFormat::Pretty => {
                writeln!(self.out, "{}", DeviceView::new(device, &self.painter))?;
                Ok(())
            }
            OutputFormat::Json => self.json_line(&json!({ "connected": device })),
        }
    }

    pub(crate) fn event(&mut self, event: &DeviceEvent) -> Result<()> {
        match self.format {
            OutputFormat::Pretty => {
                writeln!(self.out, "{}", EventView::new(event, &self.painter))?;
                Ok(())
            }
            OutputFormat::Json => self.json_line(event),
        }
    }

    pub(crate) fn summary(&mut self, summary: &ListenSummary) -> Result<()> {
        match self.format {
            OutputFormat::Pretty => {
                writeln!(self.out, "{}", ListenSummaryView::new(summary, &self.painter))?;
                Ok(())
            }
            OutputFormat::Json => self.json_line(&json!({ "summary": summary })),
        }
    }

    /// Writes `pretty` or `value` depending on the output format.
    pub(crate) fn result(&mut self, pretty: impl Display, value: &impl Serialize) -> Result<()> {
        match self.format {
            OutputFormat::Pretty => {
                writeln!(self.out, "{pretty}")?;
                Ok(())
            }
            OutputFormat::Json => self.json_line(value),
        }
    }

    fn json_line(&mut self, value: &impl Serialize) -> Result<()> {
        serde_json::to_writer(&mut *self.out, value)?;
        writeln!(self.out)?;
        Ok(())
    }
}
