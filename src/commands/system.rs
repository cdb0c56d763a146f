/* Handshake, password, system parameters, address/password updates, baud and
 * security reconfiguration, backlight. */
use tracing::info;

use crate::engine::Driver;
use crate::error::{DriverError, Result};
use crate::protocol::{Baudrate, Command, ParameterId, PacketSize, Security, SystemParameters};

impl Driver {
    /// Confirm the sensor is reachable and speaking the protocol correctly.
    pub async fn handshake(&self) -> Result<()> {
        let _lock = self.serialize_commands().await;
        self.command_get(Command::Handshake.opcode(), &[], false).await?;
        Ok(())
    }

    /// Verify `password` (or the session's configured password if `None`)
    /// against the sensor's configured password.
    pub async fn password_verify(&self, password: Option<u32>) -> Result<()> {
        let password = password.unwrap_or_else(|| self.session().password());
        let _lock = self.serialize_commands().await;
        self.command_get(Command::PasswordVerify.opcode(), &password.to_be_bytes(), false).await?;
        Ok(())
    }

    /// Fetch and parse the sensor's system parameters block, caching
    /// `capacity` on the session for later range-checks.
    pub async fn parameters_get(&self) -> Result<SystemParameters> {
        let _lock = self.serialize_commands().await;
        self.parameters_get_unlocked().await
    }

    /// Same as `parameters_get`, without acquiring the command lock. Only for
    /// callers that already hold it (`template::capacity`).
    pub(crate) async fn parameters_get_unlocked(&self) -> Result<SystemParameters> {
        let (ack, _) = self.command_get(Command::ParametersGet.opcode(), &[], false).await?;
        let params = SystemParameters::decode(&ack.payload[1..])?;
        self.session().set_capacity(params.capacity);
        self.session().set_packet_size(params.packet_size);
        Ok(params)
    }

    /// Change the sensor's security (matching) level, 1 (loosest) through 5
    /// (strictest).
    pub async fn security_set(&self, level: u16) -> Result<()> {
        let security = Security::new(level).map_err(|e| DriverError::Argument(e.to_string()))?;
        let _lock = self.serialize_commands().await;
        self.parameter_set(ParameterId::Security, security.level() as u8).await
    }

    /// Change the bulk-transfer fragment size.
    pub async fn packet_size_set(&self, size: PacketSize) -> Result<()> {
        let _lock = self.serialize_commands().await;
        self.parameter_set(ParameterId::PacketSize, size.code() as u8).await?;
        self.session().set_packet_size(size);
        Ok(())
    }

    /// Change the serial baud rate. On success, pauses the reader, reconfigures
    /// the Port, and resumes — no frames are in flight during the window
    /// because the command has already been acknowledged at the old rate.
    pub async fn baudrate_set(&self, bps: u32) -> Result<()> {
        let baud = Baudrate::from_bps(bps).map_err(|e| DriverError::Argument(e.to_string()))?;
        let _lock = self.serialize_commands().await;
        self.parameter_set(ParameterId::Baudrate, baud.code() as u8).await?;

        info!(bps, "reconfiguring serial baud rate");
        self.0.pause.pause();
        let result = self.0.port.lock().await.set_baud(baud.bps()).await;
        self.0.pause.resume();
        result.map_err(DriverError::Io)
    }

    /// Must only be called while the caller already holds the command lock.
    async fn parameter_set(&self, param: ParameterId, value: u8) -> Result<()> {
        self.command_set(Command::ParametersSet.opcode(), &[param as u8, value], &[]).await
    }

    /// Change the device address. On success, updates the cached session
    /// address used to route subsequent frames.
    pub async fn address_set(&self, address: u32) -> Result<()> {
        let _lock = self.serialize_commands().await;
        self.command_set(Command::AddressSet.opcode(), &address.to_be_bytes(), &[]).await?;
        self.session().set_address(address);
        Ok(())
    }

    /// Change the device password. On success, updates the cached session
    /// password used by a parameterless `password_verify`.
    pub async fn password_set(&self, password: u32) -> Result<()> {
        let _lock = self.serialize_commands().await;
        self.command_set(Command::PasswordSet.opcode(), &password.to_be_bytes(), &[]).await?;
        self.session().set_password(password);
        Ok(())
    }

    /// Turn the sensor's ring backlight on or off.
    pub async fn backlight(&self, enable: bool) -> Result<()> {
        let command = if enable { Command::BacklightOn } else { Command::BacklightOff };
        let _lock = self.serialize_commands().await;
        self.command_set(command.opcode(), &[], &[]).await
    }

    /// Sample the sensor's currently-known finger-on-sensor state without
    /// waiting for the next watchdog tick.
    pub fn is_finger_present(&self) -> bool {
        self.session().finger_state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DriverConfig;
    use crate::protocol::{ErrorCode, Frame, Pid};
    use std::sync::atomic::{AtomicU32, Ordering as AtomicOrdering};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    struct RecordingPort {
        writes: mpsc::UnboundedSender<Vec<u8>>,
        last_baud: Arc<AtomicU32>,
    }

    #[async_trait::async_trait]
    impl crate::port::Port for RecordingPort {
        async fn read_until(&mut self, _delim: &[u8]) -> std::io::Result<Option<Vec<u8>>> {
            std::future::pending().await
        }

        async fn read_n(&mut self, _n: usize) -> std::io::Result<Option<Vec<u8>>> {
            std::future::pending().await
        }

        async fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
            let _ = self.writes.send(buf.to_vec());
            Ok(())
        }

        async fn set_baud(&mut self, baud: u32) -> std::io::Result<()> {
            self.last_baud.store(baud, AtomicOrdering::SeqCst);
            Ok(())
        }

        fn cts(&mut self) -> bool {
            false
        }
    }

    fn connect() -> (Driver, mpsc::UnboundedReceiver<Vec<u8>>, Arc<AtomicU32>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let last_baud = Arc::new(AtomicU32::new(0));
        let port: Box<dyn crate::port::Port> =
            Box::new(RecordingPort { writes: tx, last_baud: last_baud.clone() });
        (Driver::connect(port, DriverConfig::default()), rx, last_baud)
    }

    fn success(address: u32) -> Frame {
        Frame::new(address, Pid::Ack, vec![ErrorCode::Success as u8])
    }

    #[tokio::test]
    async fn baudrate_set_reconfigures_the_port_after_the_ack() {
        let (driver, mut writes, last_baud) = connect();
        let handle = {
            let driver = driver.clone();
            tokio::spawn(async move { driver.baudrate_set(115_200).await })
        };

        writes.recv().await.expect("PARAMETERS_SET frame written");
        let address = driver.session().address();
        driver.on_frame_received().emit(success(address));

        handle.await.unwrap().expect("baudrate_set succeeds");
        assert_eq!(last_baud.load(AtomicOrdering::SeqCst), 115_200);
    }

    #[tokio::test]
    async fn baudrate_set_rejects_a_rate_not_a_multiple_of_9600() {
        let (driver, _writes, _last_baud) = connect();
        assert!(matches!(driver.baudrate_set(115_201).await, Err(DriverError::Argument(_))));
    }

    #[tokio::test]
    async fn parameters_get_caches_capacity_and_packet_size_on_the_session() {
        let (driver, mut writes, _last_baud) = connect();
        assert!(driver.session().cached_capacity().is_none());

        let handle = {
            let driver = driver.clone();
            tokio::spawn(async move { driver.parameters_get().await })
        };
        writes.recv().await.expect("PARAMETERS_GET frame written");
        let address = driver.session().address();

        let mut payload = vec![ErrorCode::Success as u8];
        payload.extend_from_slice(&0x00FFu16.to_be_bytes()); // status
        payload.extend_from_slice(&0x0001u16.to_be_bytes()); // sensor id
        payload.extend_from_slice(&200u16.to_be_bytes()); // capacity
        payload.extend_from_slice(&3u16.to_be_bytes()); // security
        payload.extend_from_slice(&0xFFFF_FFFFu32.to_be_bytes()); // address
        payload.extend_from_slice(&2u16.to_be_bytes()); // packet_size code -> 128
        payload.extend_from_slice(&6u16.to_be_bytes()); // baudrate code -> 57600
        driver.on_frame_received().emit(Frame::new(address, Pid::Ack, payload));

        let params = handle.await.unwrap().expect("parameters_get succeeds");
        assert_eq!(params.capacity, 200);
        assert_eq!(driver.session().cached_capacity(), Some(200));
        assert_eq!(driver.session().packet_size().byte_count(), 128);
    }

    #[tokio::test]
    async fn address_set_updates_the_cached_session_address_on_success() {
        let (driver, mut writes, _last_baud) = connect();
        let old_address = driver.session().address();
        let handle = {
            let driver = driver.clone();
            tokio::spawn(async move { driver.address_set(0x1234_5678).await })
        };

        writes.recv().await.expect("ADDRESS_SET frame written");
        driver.on_frame_received().emit(success(old_address));

        handle.await.unwrap().expect("address_set succeeds");
        assert_eq!(driver.session().address(), 0x1234_5678);
    }
}
