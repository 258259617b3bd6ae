use std::collections::HashSet;

use bon::Builder;
use strum_macros::{Display, EnumIter};

use crate::protocol;

const UWATCH2_NAME: &str = "Uwatch2";
const UWATCH2_MANUFACTURER: &str = "Umidigi";

/// Features a device may declare.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, EnumIter, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Capability {
    ActivityTracking,
    ActivityDataFetching,
    RealtimeData,
    HeartRate,
    FindDevice,
    SetTime,
    Alarms,
    SmartWakeup,
    Screenshots,
    AppManagement,
    CalendarEvents,
    Weather,
    Notifications,
    Music,
    FactoryReset,
    Reboot,
    Vibration,
}

/// Static description of one device model.
#[derive(Debug, Clone, Eq, PartialEq, Builder)]
pub struct DeviceCapabilities {
    #[builder(into)]
    device_name: String,
    #[builder(into)]
    manufacturer: String,
    #[builder(default)]
    supported: HashSet<Capability>,
    #[builder(default)]
    alarm_slot_count: u8,
}

impl DeviceCapabilities {
    /// Capabilities of the Umidigi Uwatch2.
    ///
    /// ```
    /// use uwatch::{Capability, DeviceCapabilities};
    ///
    /// let caps = DeviceCapabilities::uwatch2();
    /// assert!(caps.supports(Capability::FindDevice));
    /// assert!(!caps.supports(Capability::Alarms));
    /// assert_eq!(1, caps.alarm_slot_count());
    /// ```
    #[must_use]
    pub fn uwatch2() -> Self {
        Self::builder()
            .device_name(UWATCH2_NAME)
            .manufacturer(UWATCH2_MANUFACTURER)
            .supported(HashSet::from([
                Capability::ActivityTracking,
                Capability::RealtimeData,
                Capability::HeartRate,
                Capability::FindDevice,
                Capability::SetTime,
                Capability::FactoryReset,
                Capability::Reboot,
                Capability::Vibration,
            ]))
            .alarm_slot_count(1)
            .build()
    }

    /// Returns a copy with a different advertised name to match on.
    #[must_use]
    pub fn with_device_name(mut self, device_name: impl Into<String>) -> Self {
        self.device_name = device_name.into();
        self
    }

    #[must_use]
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    #[must_use]
    pub fn manufacturer(&self) -> &str {
        &self.manufacturer
    }

    #[must_use]
    pub fn supports(&self, capability: Capability) -> bool {
        self.supported.contains(&capability)
    }

    /// Alarm slots reported to the host, even when alarms are unsupported.
    #[must_use]
    pub fn alarm_slot_count(&self) -> u8 {
        self.alarm_slot_count
    }

    /// Returns whether an advertisement belongs to this model.
    ///
    /// A device matches on its exact local name or on the vendor service UUID.
    #[must_use]
    pub fn matches_advertisement(&self, local_name: Option<&str>, service_uuids: &[String]) -> bool {
        if local_name == Some(self.device_name.as_str()) {
            return true;
        }

        service_uuids
            .iter()
            .any(|uuid| uuid.eq_ignore_ascii_case(protocol::VENDOR_SERVICE_UUID))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn uwatch2_declares_expected_capabilities() {
        let caps = DeviceCapabilities::uwatch2();
        let supported: Vec<Capability> = Capability::iter()
            .filter(|capability| caps.supports(*capability))
            .collect();

        assert_eq!(
            vec![
                Capability::ActivityTracking,
                Capability::RealtimeData,
                Capability::HeartRate,
                Capability::FindDevice,
                Capability::SetTime,
                Capability::FactoryReset,
                Capability::Reboot,
                Capability::Vibration,
            ],
            supported
        );
        assert_eq!("Umidigi", caps.manufacturer());
        assert_eq!("Uwatch2", caps.device_name());
    }

    #[rstest]
    #[case(Some("Uwatch2"), vec![], true)]
    #[case(Some("Uwatch2 Pro"), vec![], false)]
    #[case(None, vec!["0000FEEA-0000-1000-8000-00805F9B34FB".to_string()], true)]
    #[case(Some("Speaker"), vec!["0000180f-0000-1000-8000-00805f9b34fb".to_string()], false)]
    fn matches_advertisement_uses_name_or_vendor_service(
        #[case] local_name: Option<&str>,
        #[case] services: Vec<String>,
        #[case] expected: bool,
    ) {
        let caps = DeviceCapabilities::uwatch2();
        assert_eq!(expected, caps.matches_advertisement(local_name, &services));
    }

    #[test]
    fn with_device_name_overrides_match_name() {
        let caps = DeviceCapabilities::uwatch2().with_device_name("Uwatch2-Test");
        assert!(caps.matches_advertisement(Some("Uwatch2-Test"), &[]));
    }
}
