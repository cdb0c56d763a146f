/* Driver error taxonomy: surfaced to every public command. Internal helpers that
 * aggregate several fallible steps may use `anyhow::Result`, converting to
 * `DriverError` at the boundary. */
use thiserror::Error;

use crate::protocol::ErrorCode;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("argument out of range: {0}")]
    Argument(String),

    #[error("no ACK received within the response timeout")]
    ReceptionFailure,

    #[error("ACK received but bulk transfer did not complete before the timeout")]
    BulkTimeout,

    #[error("sensor reported a packet transmission error")]
    Communication,

    #[error("sensor address mismatch, check the configured session address")]
    WrongAddress,

    #[error("sensor requires password verification before this command")]
    PasswordRequired,

    #[error("sensor returned a non-success status: {0}")]
    Transaction(ErrorCode),

    #[error("driver is disconnected from the sensor; waiting for reconnect")]
    Disconnected,

    #[error("malformed response from sensor: {0}")]
    Params(#[from] crate::protocol::ParamsError),

    #[error("I/O failure on the serial port")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DriverError>;
