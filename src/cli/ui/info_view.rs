use std::fmt::{self, Display, Formatter};

use serde::Serialize;
use strum::IntoEnumIterator;

use crate::events::{BatteryInfo, ConnectionState, DeviceInfo};
use crate::handlers::{Capability, DeviceCapabilities};
use crate::hw::FoundDevice;

use super::device_view::write_fields;
use super::painter::Painter;

/// Everything `info` learned about the connected watch.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct DeviceReport {
    device: FoundDevice,
    manufacturer: String,
    model: String,
    device_info: Option<DeviceInfo>,
    battery: Option<BatteryInfo>,
    state: ConnectionState,
    capabilities: Vec<String>,
}

impl DeviceReport {
    pub(crate) fn new(
        device: FoundDevice,
        capabilities: &DeviceCapabilities,
        device_info: Option<DeviceInfo>,
        battery: Option<BatteryInfo>,
        state: ConnectionState,
    ) -> Self {
        Self {
            device,
            manufacturer: capabilities.manufacturer().to_string(),
            model: capabilities.device_name().to_string(),
            device_info,
            battery,
            state,
            capabilities: Capability::iter()
                .filter(|capability| capabilities.supports(*capability))
                .map(|capability| capability.to_string())
                .collect(),
        }
    }

    pub(crate) fn device(&self) -> &FoundDevice {
        &self.device
    }
}

pub(crate) struct DeviceReportView<'a> {
    report: &'a DeviceReport,
    painter: &'a Painter,
}

impl<'a> DeviceReportView<'a> {
    pub(crate) fn new(report: &'a DeviceReport, painter: &'a Painter) -> Self {
        Self { report, painter }
    }
}

impl Display for DeviceReportView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let report = self.report;
        let painter = self.painter;
        let missing = || painter.muted("-");
        let (hardware, firmware) = match &report.device_info {
            Some(info) => (
                painter.value(info.hardware_version()),
                painter.value(info.firmware_version()),
            ),
            None => (missing(), missing()),
        };
        let battery = report
            .battery
            .map_or_else(missing, |battery| painter.battery(battery.percent_charged()));

        writeln!(f, "{}", painter.heading("Device:"))?;
        write_fields(
            f,
            painter,
            &[
                ("manufacturer", painter.value(&report.manufacturer)),
                ("model", painter.value(&report.model)),
                ("hardware", hardware),
                ("firmware", firmware),
                ("battery", battery),
                ("state", painter.state(report.state)),
                ("capabilities", painter.value(report.capabilities.join(", "))),
            ],
        )
    }
}
