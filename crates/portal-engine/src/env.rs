use chrono::{DateTime, Utc};
use portal_core::traits::{Clock, DeviceOracle};
use portal_core::types::DeviceClass;

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock stopped at a fixed instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Reports a configured device class.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticDevice(pub DeviceClass);

impl DeviceOracle for StaticDevice {
    fn device_class(&self) -> DeviceClass {
        self.0
    }
}
