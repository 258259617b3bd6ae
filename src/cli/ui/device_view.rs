use std::fmt::{self, Display, Formatter};

use crate::hw::FoundDevice;
use crate::utils::format_rssi;

use super::painter::Painter;

/// Writes indented `field: value` lines with muted field names.
pub(crate) fn write_fields(
    f: &mut Formatter<'_>,
    painter: &Painter,
    fields: &[(&str, String)],
) -> fmt::Result {
    for (index, (field, value)) in fields.iter().enumerate() {
        if index > 0 {
            writeln!(f)?;
        }
        write!(f, "  {}: {value}", painter.muted(field))?;
    }
    Ok(())
}

/// Renders a `FoundDevice` under a heading.
pub(crate) struct DeviceView<'a> {
    device: &'a FoundDevice,
    painter: &'a Painter,
}

impl<'a> DeviceView<'a> {
    pub(crate) fn new(device: &'a FoundDevice, painter: &'a Painter) -> Self {
        Self { device, painter }
    }
}

impl Display for DeviceView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = self.device.local_name().unwrap_or("<unknown>");
        writeln!(f, "{}", self.painter.heading("Connected device:"))?;
        write_fields(
            f,
            self.painter,
            &[
                ("adapter", self.painter.value(self.device.adapter_name())),
                ("device_id", self.painter.value(self.device.device_id())),
                ("name", self.painter.value(name)),
                ("rssi", self.painter.value(format_rssi(self.device.rssi()))),
            ],
        )
    }
}
