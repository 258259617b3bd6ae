use owo_colors::{OwoColorize, Style as OwoStyle};

use crate::events::ConnectionState;
use crate::hw::ListenStopReason;

const LOW_BATTERY_PERCENT: u8 = 20;

/// Colours watch output when writing to a terminal.
#[derive(Debug)]
pub(crate) struct Painter {
    use_colour: bool,
}

impl Painter {
    pub(crate) fn new(use_colour: bool) -> Self {
        Self { use_colour }
    }

    pub(crate) fn heading<T: AsRef<str>>(&self, text: T) -> String {
        self.paint(text.as_ref(), OwoStyle::new().bold().cyan())
    }

    pub(crate) fn muted<T: AsRef<str>>(&self, text: T) -> String {
        self.paint(text.as_ref(), OwoStyle::new().dimmed())
    }

    pub(crate) fn value<T: AsRef<str>>(&self, text: T) -> String {
        self.paint(text.as_ref(), OwoStyle::new().bold())
    }

    /// Green once initialised, yellow when disconnected.
    pub(crate) fn state(&self, state: ConnectionState) -> String {
        let style = match state {
            ConnectionState::Initialized => OwoStyle::new().bold().green(),
            ConnectionState::Initializing => OwoStyle::new().bold(),
            ConnectionState::Disconnected => OwoStyle::new().bold().yellow(),
        };
        self.paint(&state.to_string(), style)
    }

    pub(crate) fn battery(&self, percent_charged: u8) -> String {
        let style = if percent_charged < LOW_BATTERY_PERCENT {
            OwoStyle::new().bold().red()
        } else {
            OwoStyle::new().bold().green()
        };
        self.paint(&format!("{percent_charged}%"), style)
    }

    pub(crate) fn stop_reason(&self, reason: &ListenStopReason) -> String {
        let style = match reason {
            ListenStopReason::ReachedLimit(_) => OwoStyle::new().bold().green(),
            ListenStopReason::Interrupted | ListenStopReason::NotificationStreamClosed => {
                OwoStyle::new().bold().yellow()
            }
        };
        self.paint(&reason.to_string(), style)
    }

    fn paint(&self, text: &str, style: OwoStyle) -> String {
        if self.use_colour {
            format!("{}", text.style(style))
        } else {
            text.to_string()
        }
    }
}
