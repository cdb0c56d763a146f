/* The injected byte-level transport. The protocol engine never opens a serial
 * device itself; it is handed something implementing `Port`. A
 * `tokio-serial`-backed implementation ships under `transport` as ambient
 * infrastructure. */
use async_trait::async_trait;

/// Byte-oriented duplex transport the protocol engine is built on top of.
///
/// Implementations are expected to return `Ok(None)` (not an error) when the
/// underlying device disappears mid-read; the frame reader treats that as a
/// disconnect signal rather than a fatal I/O error.
#[async_trait]
pub trait Port: Send {
    /// Read bytes until `delim` has been seen as a contiguous suffix of the
    /// accumulated read, returning the bytes read so far (including `delim`).
    async fn read_until(&mut self, delim: &[u8]) -> std::io::Result<Option<Vec<u8>>>;

    /// Read exactly `n` bytes, or `Ok(None)` if the device disappeared before
    /// `n` bytes arrived.
    async fn read_n(&mut self, n: usize) -> std::io::Result<Option<Vec<u8>>>;

    /// Write the full buffer to the transport.
    async fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()>;

    /// Reconfigure the transport's baud rate in place.
    async fn set_baud(&mut self, baud: u32) -> std::io::Result<()>;

    /// Current state of the Clear-To-Send line, sampled by the finger-detection
    /// watchdog.
    fn cts(&mut self) -> bool;
}
