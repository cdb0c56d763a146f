/* Ambient `Port` implementations. Not part of the protocol engine's
 * test-critical surface — integrators may supply their own `Port` entirely. */
#[cfg(feature = "tokio-serial")]
mod tokio_serial_port;

#[cfg(feature = "tokio-serial")]
pub use tokio_serial_port::TokioSerialPort;
