use std::fmt::{self, Display, Formatter};

use crate::events::DeviceEvent;
use crate::hw::ListenSummary;

use super::painter::Painter;

/// Renders one device event as a single line.
pub(crate) struct EventView<'a> {
    event: &'a DeviceEvent,
    painter: &'a Painter,
}

impl<'a> EventView<'a> {
    pub(crate) fn new(event: &'a DeviceEvent, painter: &'a Painter) -> Self {
        Self { event, painter }
    }
}

impl Display for EventView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let painter = self.painter;
        match self.event {
            DeviceEvent::DeviceStateChanged(state) => {
                write!(f, "{} {}", painter.heading("State:"), painter.state(*state))
            }
            DeviceEvent::DeviceInfoReceived(info) => write!(
                f,
                "{} hardware={} firmware={}",
                painter.heading("Device info:"),
                painter.value(info.hardware_version()),
                painter.value(info.firmware_version())
            ),
            DeviceEvent::BatteryInfoReceived(battery) => write!(
                f,
                "{} {}",
                painter.heading("Battery:"),
                painter.battery(battery.percent_charged())
            ),
            DeviceEvent::ActivitySampleProduced(sample) => write!(
                f,
                "{} steps={} distance={}m calories={} {}",
                painter.heading("Sample:"),
                painter.value(sample.steps().to_string()),
                painter.value(sample.distance_meters().to_string()),
                painter.value(sample.calories_burnt().to_string()),
                painter.muted(format!("at={}", sample.timestamp_seconds()))
            ),
        }
    }
}

/// Renders the listen session summary.
pub(crate) struct ListenSummaryView<'a> {
    summary: &'a ListenSummary,
    painter: &'a Painter,
}

impl<'a> ListenSummaryView<'a> {
    pub(crate) fn new(summary: &'a ListenSummary, painter: &'a Painter) -> Self {
        Self { summary, painter }
    }
}

impl Display for ListenSummaryView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.painter.heading("Stopped:"),
            self.painter.stop_reason(self.summary.stop_reason()),
            self.painter.value(format!(
                "- {} sample(s) from {} notification(s)",
                self.summary.produced_samples(),
                self.summary.received_notifications()
            ))
        )
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::events::{ActivitySample, BatteryInfo, ConnectionState, DeviceInfo};
    use crate::hw::ListenStopReason;

    #[rstest]
    #[case(
        DeviceEvent::DeviceStateChanged(ConnectionState::Initialized),
        "State: initialized"
    )]
    #[case(
        DeviceEvent::DeviceInfoReceived(DeviceInfo::new("HW1".into(), "FW2".into())),
        "Device info: hardware=HW1 firmware=FW2"
    )]
    #[case(DeviceEvent::BatteryInfoReceived(BatteryInfo::new(87)), "Battery: 87%")]
    #[case(
        DeviceEvent::ActivitySampleProduced(ActivitySample::new(1_700_000_000, 1000, 800, 65)),
        "Sample: steps=1000 distance=800m calories=65 at=1700000000"
    )]
    fn event_view_renders_plain_lines(#[case] event: DeviceEvent, #[case] expected: &str) {
        let painter = Painter::new(false);
        assert_eq!(expected, EventView::new(&event, &painter).to_string());
    }

    #[rstest]
    #[case(ListenStopReason::ReachedLimit(2), "Stopped: reached sample limit (2) - 2 sample(s) from 3 notification(s)")]
    #[case(ListenStopReason::NotificationStreamClosed, "Stopped: notification stream closed - 2 sample(s) from 3 notification(s)")]
    fn summary_view_renders_counts(#[case] reason: ListenStopReason, #[case] expected: &str) {
        let summary = ListenSummary::new(3, 2, reason);
        let painter = Painter::new(false);
        assert_eq!(expected, ListenSummaryView::new(&summary, &painter).to_string());
    }
}
