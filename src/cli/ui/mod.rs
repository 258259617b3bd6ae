mod device_view;
mod event_view;
mod info_view;
mod painter;

pub(crate) use self::device_view::DeviceView;
pub(crate) use self::event_view::{EventView, ListenSummaryView};
pub(crate) use self::info_view::{DeviceReport, DeviceReportView};
pub(crate) use self::painter::Painter;
