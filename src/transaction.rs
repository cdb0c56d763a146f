/* Transmit/ACK/bulk-assembly primitives the command surface is built on,
 * using `tokio::sync::oneshot` signals guarded by the dispatcher's
 * `Subscription`. */
use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::dispatcher::Subscription;
use crate::engine::Driver;
use crate::error::{DriverError, Result};
use crate::protocol::{ErrorCode, Frame, Pid};

impl Driver {
    /// Encode and write `frame`, then wait up to the configured response
    /// timeout for the first received frame matching `predicate`.
    pub(crate) async fn transmit(
        &self,
        frame: &Frame,
        mut predicate: impl FnMut(&Frame) -> bool + Send + 'static,
    ) -> Result<Frame> {
        let (tx, rx) = oneshot::channel();
        let tx = std::sync::Mutex::new(Some(tx));

        let _subscription = Subscription::new(self.0.on_frame_received.clone(), move |received: Frame| {
            if predicate(&received) {
                if let Some(tx) = tx.lock().unwrap().take() {
                    let _ = tx.send(received);
                }
            }
        });

        self.0.port.lock().await.write_all(&frame.encode()).await.map_err(DriverError::Io)?;

        match tokio::time::timeout(self.0.response_timeout, rx).await {
            Ok(Ok(frame)) => Ok(frame),
            Ok(Err(_)) | Err(_) => Err(DriverError::ReceptionFailure),
        }
    }

    /// Send a COMMAND frame and wait for its ACK, optionally assembling a
    /// trailing DATA/END_OF_DATA stream. Returns the ACK frame and any
    /// assembled bulk bytes.
    pub(crate) async fn command_get(
        &self,
        command: u8,
        payload: &[u8],
        data_wait: bool,
    ) -> Result<(Frame, Vec<u8>)> {
        self.fail_if_disconnected()?;

        let mut command_payload = Vec::with_capacity(1 + payload.len());
        command_payload.push(command);
        command_payload.extend_from_slice(payload);

        let address = self.0.session.address();
        let send = Frame::new(address, Pid::Command, command_payload);

        // Bulk assembly, if requested, must be subscribed before the command
        // is transmitted so no DATA frame can arrive unobserved.
        let data_buf: Arc<std::sync::Mutex<Vec<u8>>> = Arc::new(std::sync::Mutex::new(Vec::new()));
        let (done_tx, mut done_rx) = tokio::sync::mpsc::unbounded_channel::<()>();
        let (activity_tx, mut activity_rx) = tokio::sync::mpsc::unbounded_channel::<()>();
        let bulk_subscription = if data_wait {
            let data_buf = data_buf.clone();
            Some(Subscription::new(self.0.on_frame_received.clone(), move |frame: Frame| {
                match frame.pid {
                    Pid::Data => {
                        data_buf.lock().unwrap().extend_from_slice(&frame.payload);
                        let _ = activity_tx.send(());
                    }
                    Pid::EndOfData => {
                        data_buf.lock().unwrap().extend_from_slice(&frame.payload);
                        let _ = done_tx.send(());
                    }
                    _ => {}
                }
            }))
        } else {
            None
        };

        let ack = self.transmit(&send, |frame| frame.pid == Pid::Ack).await?;

        if ack.payload.is_empty() {
            warn!("ACK frame carried an empty payload, treating as a faulty packet");
            return Err(DriverError::Transaction(ErrorCode::PacketFaulty));
        }
        let code = ErrorCode::from_u8(ack.payload[0]);
        match code {
            ErrorCode::PacketTransmission => return Err(DriverError::Communication),
            ErrorCode::Address => return Err(DriverError::WrongAddress),
            ErrorCode::PasswordVerify => return Err(DriverError::PasswordRequired),
            _ => {}
        }

        if data_wait {
            let timeout = self.0.response_timeout;
            let mut deadline = Instant::now() + timeout;
            loop {
                tokio::select! {
                    _ = done_rx.recv() => break,
                    _ = activity_rx.recv() => {
                        deadline = Instant::now() + timeout;
                    }
                    _ = tokio::time::sleep_until(deadline) => {
                        drop(bulk_subscription);
                        return Err(DriverError::BulkTimeout);
                    }
                }
            }
        }
        drop(bulk_subscription);

        if !code.is_success() {
            return Err(DriverError::Transaction(code));
        }

        let data = Arc::try_unwrap(data_buf).map(|m| m.into_inner().unwrap()).unwrap_or_default();
        Ok((ack, data))
    }

    /// `command_get` followed by fragmenting `outbound_data` into
    /// `session.packet_size`-sized DATA frames and a final END_OF_DATA frame.
    pub(crate) async fn command_set(&self, command: u8, payload: &[u8], outbound_data: &[u8]) -> Result<()> {
        let (_, _) = self.command_get(command, payload, false).await?;

        if outbound_data.is_empty() {
            return Ok(());
        }

        let address = self.0.session.address();
        let piece_size = self.0.session.packet_size().byte_count();
        let chunks: Vec<&[u8]> = outbound_data.chunks(piece_size).collect();

        let Some((last, pieces)) = chunks.split_last() else {
            return Ok(());
        };
        for piece in pieces {
            let frame = Frame::new(address, Pid::Data, piece.to_vec());
            self.0.port.lock().await.write_all(&frame.encode()).await.map_err(DriverError::Io)?;
        }
        let frame = Frame::new(address, Pid::EndOfData, last.to_vec());
        self.0.port.lock().await.write_all(&frame.encode()).await.map_err(DriverError::Io)?;
        debug!(bytes = outbound_data.len(), pieces = chunks.len(), "bulk upload complete");
        Ok(())
    }
}
