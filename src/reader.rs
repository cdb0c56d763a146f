/* Frame reader: a two-state machine that reassembles frames from the Port's
 * byte stream and publishes them through the dispatcher. Runs for the
 * lifetime of the `Driver` on its own task; never mutates session state
 * directly, only publishes frames for others to act on. */
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, Notify};
use tracing::{debug, warn};

use crate::dispatcher::Signal;
use crate::port::Port;
use crate::protocol::{Frame, HEADER};

enum State {
    WaitHead,
    WaitBody { buffer: Vec<u8> },
}

/// Shared handle to the Port, used by both the reader task (reads) and the
/// command path (writes, and baud reconfiguration). Serializing both sides
/// through one mutex is what makes a baud-rate change race-free: the command
/// path holding the lock while it calls `set_baud` guarantees no concurrent
/// read is in flight on the old rate.
pub type PortHandle = Arc<Mutex<Box<dyn Port>>>;

/// Coordinates a reader pause/resume cycle around a baud-rate change.
#[derive(Default)]
pub struct PauseControl {
    paused: AtomicBool,
    notify: Notify,
}

impl PauseControl {
    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    async fn wait_if_paused(&self) {
        while self.paused.load(Ordering::SeqCst) {
            self.notify.notified().await;
        }
    }
}

/// Runs the frame-reader state machine until the Port reports a disconnect.
/// `on_frame` and `on_disconnect` are the dispatcher signals to publish to.
pub async fn run(
    port: PortHandle,
    pause: Arc<PauseControl>,
    on_frame: Arc<Signal<Frame>>,
    on_disconnect: Arc<Signal<()>>,
) {
    let mut state = State::WaitHead;
    loop {
        pause.wait_if_paused().await;

        match state {
            State::WaitHead => {
                let recv = {
                    let mut guard = port.lock().await;
                    guard.read_until(&HEADER).await
                };
                match recv {
                    Ok(Some(bytes)) if bytes.len() >= 2 => {
                        let seed = bytes[bytes.len() - 2..].to_vec();
                        state = State::WaitBody { buffer: seed };
                    }
                    Ok(Some(_)) => {
                        // Fewer than 2 bytes back; nothing to seed with, stay in WaitHead.
                        state = State::WaitHead;
                    }
                    Ok(None) => {
                        warn!("serial port disconnected while waiting for frame header");
                        on_disconnect.emit(());
                        return;
                    }
                    Err(err) => {
                        debug!("read_until(header) error: {err}");
                        state = State::WaitHead;
                    }
                }
            }
            State::WaitBody { mut buffer } => {
                let rest = {
                    let mut guard = port.lock().await;
                    guard.read_n(7).await
                };
                let rest = match rest {
                    Ok(Some(bytes)) if bytes.len() == 7 => bytes,
                    Ok(_) => {
                        warn!("serial port disconnected mid-frame (address/pid/length)");
                        on_disconnect.emit(());
                        return;
                    }
                    Err(err) => {
                        debug!("read_n(7) error: {err}");
                        state = State::WaitHead;
                        continue;
                    }
                };
                buffer.extend_from_slice(&rest);

                let n = u16::from_be_bytes([rest[5], rest[6]]) as usize;
                let payload_and_checksum = {
                    let mut guard = port.lock().await;
                    guard.read_n(n).await
                };
                let payload_and_checksum = match payload_and_checksum {
                    Ok(Some(bytes)) if bytes.len() == n => bytes,
                    Ok(_) => {
                        warn!("serial port disconnected mid-frame (payload)");
                        on_disconnect.emit(());
                        return;
                    }
                    Err(err) => {
                        debug!("read_n({n}) error: {err}");
                        state = State::WaitHead;
                        continue;
                    }
                };
                buffer.extend_from_slice(&payload_and_checksum);

                match Frame::decode(&buffer) {
                    Ok(frame) => on_frame.emit(frame),
                    Err(err) => debug!("dropping frame that failed to decode: {err}"),
                }
                state = State::WaitHead;
            }
        }
    }
}
