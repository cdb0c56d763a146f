/* `Port` adapter over `tokio_serial::SerialStream`: a thin async shim with no
 * protocol awareness, so the protocol engine above it never touches the
 * serial crate directly. */
use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{SerialPort, SerialPortBuilderExt};

use crate::port::Port;

/// Serial line settings the sensor boots at: 8 data bits, 1 stop bit, no
/// parity.
pub struct TokioSerialPort {
    stream: tokio_serial::SerialStream,
}

impl TokioSerialPort {
    /// Open `path` at `baud`, with the sensor's fixed 8N1 framing.
    pub fn open(path: &str, baud: u32) -> tokio_serial::Result<Self> {
        let stream = tokio_serial::new(path, baud)
            .data_bits(tokio_serial::DataBits::Eight)
            .stop_bits(tokio_serial::StopBits::One)
            .parity(tokio_serial::Parity::None)
            .open_native_async()?;
        Ok(Self { stream })
    }
}

fn eof_to_none<T>(result: std::io::Result<T>) -> std::io::Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
        Err(err) => Err(err),
    }
}

#[async_trait]
impl Port for TokioSerialPort {
    async fn read_until(&mut self, delim: &[u8]) -> std::io::Result<Option<Vec<u8>>> {
        let mut acc = Vec::new();
        loop {
            let mut byte = [0u8; 1];
            match eof_to_none(self.stream.read_exact(&mut byte).await)? {
                None => return Ok(None),
                Some(_) => {
                    acc.push(byte[0]);
                    if acc.len() >= delim.len() && acc[acc.len() - delim.len()..] == *delim {
                        return Ok(Some(acc));
                    }
                }
            }
        }
    }

    async fn read_n(&mut self, n: usize) -> std::io::Result<Option<Vec<u8>>> {
        let mut buf = vec![0u8; n];
        match eof_to_none(self.stream.read_exact(&mut buf).await)? {
            None => Ok(None),
            Some(_) => Ok(Some(buf)),
        }
    }

    async fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        AsyncWriteExt::write_all(&mut self.stream, buf).await
    }

    async fn set_baud(&mut self, baud: u32) -> std::io::Result<()> {
        self.stream.set_baud_rate(baud).map_err(std::io::Error::from)
    }

    fn cts(&mut self) -> bool {
        self.stream.read_clear_to_send().unwrap_or(false)
    }
}
