/* r30x-fpsensor: an async host-side driver for the ZhianTec/R30x family of
 * optical fingerprint sensor modules. The crate is the wire protocol engine:
 * framing, frame reassembly, transaction/ACK handling, bulk-data assembly,
 * and the named command surface built on top. Callers provide a `Port` —
 * this crate never opens a serial device itself, save for the optional
 * `tokio-serial`-backed adapter under `transport`. */
mod commands;
mod config;
mod dispatcher;
mod engine;
mod error;
mod port;
mod protocol;
mod reader;
mod session;
mod transaction;

#[cfg(feature = "tokio-serial")]
pub mod transport;

pub use config::{DriverConfig, DriverConfigBuilder};
pub use dispatcher::{Signal, Subscription};
pub use engine::Driver;
pub use error::{DriverError, Result};
pub use port::Port;
pub use protocol::{
    BufferId, Command, DecodeError, ErrorCode, Frame, ParameterId, ParamsError, PacketSize, Pid,
    Security, SystemParameters, Baudrate,
};
pub use session::Session;
