/* Driver construction settings, expressed as a builder. */
use std::time::Duration;

use crate::protocol::{DEFAULT_ADDRESS, DEFAULT_PASSWORD};

/// Default response timeout for a single command round-trip.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Default finger-detection poll period.
pub const DEFAULT_DETECTION_PERIOD: Duration = Duration::from_millis(300);

/// Default serial baud rate the sensor boots at.
pub const DEFAULT_BAUD: u32 = 57600;

/// Construction-time settings for a [`crate::engine::Driver`].
#[derive(Debug, Clone)]
pub struct DriverConfig {
    pub(crate) address: u32,
    pub(crate) password: u32,
    pub(crate) baud: u32,
    pub(crate) detection_period: Duration,
    pub(crate) response_timeout: Duration,
}

impl DriverConfig {
    /// The sensor address `Driver::connect` will address frames to.
    pub fn address(&self) -> u32 {
        self.address
    }

    /// The password `password_verify` falls back to when called without one.
    pub fn password(&self) -> u32 {
        self.password
    }

    /// The baud rate the caller's `Port` is expected to already be open at
    /// before handing it to `Driver::connect`.
    pub fn baud(&self) -> u32 {
        self.baud
    }

    pub fn detection_period(&self) -> Duration {
        self.detection_period
    }

    pub fn response_timeout(&self) -> Duration {
        self.response_timeout
    }

    pub fn builder() -> DriverConfigBuilder {
        DriverConfigBuilder::default()
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS,
            password: DEFAULT_PASSWORD,
            baud: DEFAULT_BAUD,
            detection_period: DEFAULT_DETECTION_PERIOD,
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DriverConfigBuilder {
    inner: DriverConfig,
}

impl DriverConfigBuilder {
    pub fn address(mut self, address: u32) -> Self {
        self.inner.address = address;
        self
    }

    pub fn password(mut self, password: u32) -> Self {
        self.inner.password = password;
        self
    }

    pub fn baud(mut self, baud: u32) -> Self {
        self.inner.baud = baud;
        self
    }

    pub fn detection_period(mut self, period: Duration) -> Self {
        self.inner.detection_period = period;
        self
    }

    pub fn response_timeout(mut self, timeout: Duration) -> Self {
        self.inner.response_timeout = timeout;
        self
    }

    pub fn build(self) -> DriverConfig {
        self.inner
    }
}
