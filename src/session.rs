/* Session state owned exclusively by the `Driver`. The reader task only
 * publishes frames through the dispatcher; it never mutates this state. */
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::protocol::{PacketSize, DEFAULT_ADDRESS, DEFAULT_PASSWORD};

/// Mutable session state, guarded by the command mutex on writes. `finger_state`
/// is the exception: it is written only by the watchdog task and read by
/// callers, so it is exposed lock-free via an `AtomicBool`.
pub struct Session {
    address: Mutex<u32>,
    password: Mutex<u32>,
    capacity: Mutex<Option<u16>>,
    packet_size: Mutex<PacketSize>,
    finger_state: AtomicBool,
    detection_period_ms: Mutex<u64>,
}

impl Session {
    pub fn new(address: u32, password: u32, detection_period: std::time::Duration) -> Self {
        Self {
            address: Mutex::new(address),
            password: Mutex::new(password),
            capacity: Mutex::new(None),
            packet_size: Mutex::new(PacketSize::Bytes32),
            finger_state: AtomicBool::new(false),
            detection_period_ms: Mutex::new(detection_period.as_millis() as u64),
        }
    }

    pub fn address(&self) -> u32 {
        *self.address.lock().unwrap()
    }

    pub fn set_address(&self, value: u32) {
        *self.address.lock().unwrap() = value;
    }

    pub fn password(&self) -> u32 {
        *self.password.lock().unwrap()
    }

    pub fn set_password(&self, value: u32) {
        *self.password.lock().unwrap() = value;
    }

    pub fn cached_capacity(&self) -> Option<u16> {
        *self.capacity.lock().unwrap()
    }

    pub fn set_capacity(&self, value: u16) {
        *self.capacity.lock().unwrap() = Some(value);
    }

    pub fn packet_size(&self) -> PacketSize {
        *self.packet_size.lock().unwrap()
    }

    pub fn set_packet_size(&self, value: PacketSize) {
        *self.packet_size.lock().unwrap() = value;
    }

    pub fn finger_state(&self) -> bool {
        self.finger_state.load(Ordering::Acquire)
    }

    pub fn set_finger_state(&self, value: bool) {
        self.finger_state.store(value, Ordering::Release);
    }

    pub fn detection_period(&self) -> std::time::Duration {
        std::time::Duration::from_millis(*self.detection_period_ms.lock().unwrap())
    }

    /// Set the finger-detection poll period. Must be strictly positive.
    pub fn set_detection_period(&self, period: std::time::Duration) -> Result<(), String> {
        if period.is_zero() {
            return Err("detection period must be greater than zero".to_string());
        }
        *self.detection_period_ms.lock().unwrap() = period.as_millis() as u64;
        Ok(())
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(DEFAULT_ADDRESS, DEFAULT_PASSWORD, std::time::Duration::from_millis(300))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_original_source() {
        let session = Session::default();
        assert_eq!(session.address(), DEFAULT_ADDRESS);
        assert_eq!(session.password(), DEFAULT_PASSWORD);
        assert_eq!(session.detection_period(), std::time::Duration::from_millis(300));
        assert!(session.cached_capacity().is_none());
    }

    #[test]
    fn rejects_non_positive_detection_period() {
        let session = Session::default();
        assert!(session.set_detection_period(std::time::Duration::ZERO).is_err());
    }

    #[test]
    fn finger_state_round_trips() {
        let session = Session::default();
        assert!(!session.finger_state());
        session.set_finger_state(true);
        assert!(session.finger_state());
    }
}
