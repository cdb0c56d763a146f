/* The `Driver`: owns the Port, the frame reader task, the finger-detection
 * watchdog task, and the session state. Command methods live in
 * `commands/*`; the transmit/ACK/bulk-assembly primitives live in
 * `transaction.rs`. A cheap `Clone`-able handle around an `Arc<DriverInner>`,
 * spawning its background tasks once at construction and tearing them down
 * on drop. */
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex as AsyncMutex, MutexGuard};
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::DriverConfig;
use crate::dispatcher::Signal;
use crate::error::{DriverError, Result};
use crate::port::Port;
use crate::protocol::Frame;
use crate::reader::{self, PauseControl, PortHandle};
use crate::session::Session;

pub(crate) struct DriverInner {
    pub(crate) port: PortHandle,
    pub(crate) pause: Arc<PauseControl>,
    pub(crate) on_frame_received: Arc<Signal<Frame>>,
    pub(crate) on_connect: Arc<Signal<()>>,
    pub(crate) on_disconnect: Arc<Signal<()>>,
    pub(crate) on_finger_detected: Arc<Signal<()>>,
    pub(crate) session: Arc<Session>,
    pub(crate) command_lock: AsyncMutex<()>,
    pub(crate) disconnected: AtomicBool,
    pub(crate) response_timeout: Duration,
    reader_task: AsyncMutex<Option<JoinHandle<()>>>,
    watchdog_task: AsyncMutex<Option<JoinHandle<()>>>,
}

/// Handle to a running driver session. Cheap to clone; every clone shares the
/// same background tasks and session state.
#[derive(Clone)]
pub struct Driver(pub(crate) Arc<DriverInner>);

impl Driver {
    /// Take ownership of `port` and start the reader and finger-detection
    /// tasks. The Port is assumed to already be open at `config.baud`.
    pub fn connect(port: Box<dyn Port>, config: DriverConfig) -> Self {
        let port: PortHandle = Arc::new(AsyncMutex::new(port));
        let pause = Arc::new(PauseControl::default());
        let on_frame_received = Arc::new(Signal::new());
        let on_connect = Arc::new(Signal::new());
        let on_disconnect = Arc::new(Signal::new());
        let on_finger_detected = Arc::new(Signal::new());
        let session = Arc::new(Session::new(config.address, config.password, config.detection_period));

        let inner = Arc::new(DriverInner {
            port: port.clone(),
            pause: pause.clone(),
            on_frame_received: on_frame_received.clone(),
            on_connect: on_connect.clone(),
            on_disconnect: on_disconnect.clone(),
            on_finger_detected: on_finger_detected.clone(),
            session: session.clone(),
            command_lock: AsyncMutex::new(()),
            disconnected: AtomicBool::new(false),
            response_timeout: config.response_timeout,
            reader_task: AsyncMutex::new(None),
            watchdog_task: AsyncMutex::new(None),
        });

        let disconnect_flag = inner.clone();
        inner.on_disconnect.subscribe(move |_| {
            disconnect_flag.disconnected.store(true, Ordering::SeqCst);
        });

        let reader_port = port.clone();
        let reader_pause = pause.clone();
        let reader_frame_signal = on_frame_received.clone();
        let reader_disconnect_signal = on_disconnect.clone();
        let reader_task = tokio::spawn(async move {
            reader::run(reader_port, reader_pause, reader_frame_signal, reader_disconnect_signal).await;
        });

        let watchdog_port = port;
        let watchdog_session = session;
        let watchdog_signal = on_finger_detected;
        let watchdog_task = tokio::spawn(async move {
            run_finger_watchdog(watchdog_port, watchdog_session, watchdog_signal).await;
        });

        // Tasks are stashed behind blocking_lock-free try_lock since no other
        // holder exists yet at construction time.
        *inner.reader_task.try_lock().expect("uncontended at construction") = Some(reader_task);
        *inner.watchdog_task.try_lock().expect("uncontended at construction") = Some(watchdog_task);

        info!("driver connected");
        Driver(inner)
    }

    pub fn session(&self) -> &Session {
        &self.0.session
    }

    pub fn on_frame_received(&self) -> &Signal<Frame> {
        &self.0.on_frame_received
    }

    pub fn on_connect(&self) -> &Signal<()> {
        &self.0.on_connect
    }

    pub fn on_disconnect(&self) -> &Signal<()> {
        &self.0.on_disconnect
    }

    pub fn on_finger_detected(&self) -> &Signal<()> {
        &self.0.on_finger_detected
    }

    pub fn is_disconnected(&self) -> bool {
        self.0.disconnected.load(Ordering::SeqCst)
    }

    pub(crate) fn fail_if_disconnected(&self) -> Result<()> {
        if self.is_disconnected() {
            return Err(DriverError::Disconnected);
        }
        Ok(())
    }

    /// Serializes the command surface: held for the duration of one public
    /// operation so two callers can never interleave frames on the wire.
    /// Acquired exactly once per public `commands/*.rs` entry point; internal
    /// helpers that such an entry point calls into must not try to acquire it
    /// again, since `tokio::sync::Mutex` is not reentrant.
    pub(crate) async fn serialize_commands(&self) -> MutexGuard<'_, ()> {
        self.0.command_lock.lock().await
    }

    /// Stop the reader and watchdog tasks. Subsequent commands will time out
    /// since nothing is consuming the Port's bytes any longer.
    pub async fn shutdown(&self) {
        if let Some(handle) = self.0.reader_task.lock().await.take() {
            handle.abort();
        }
        if let Some(handle) = self.0.watchdog_task.lock().await.take() {
            handle.abort();
        }
        self.0.disconnected.store(true, Ordering::SeqCst);
    }

    /// Hand the driver a freshly-opened `Port` after a disconnect, restart
    /// the reader task against it, and emit `on_connect`. Commands that were
    /// refused with `DriverError::Disconnected` since the last
    /// `on_disconnect` will go through again once this returns. The
    /// finger-detection watchdog is left running throughout a disconnect —
    /// it only samples `Port::cts`, which is harmless against a torn-down
    /// transport — so it is not restarted here.
    pub async fn reconnect(&self, port: Box<dyn Port>) {
        *self.0.port.lock().await = port;
        self.0.disconnected.store(false, Ordering::SeqCst);

        let reader_port = self.0.port.clone();
        let reader_pause = self.0.pause.clone();
        let reader_frame_signal = self.0.on_frame_received.clone();
        let reader_disconnect_signal = self.0.on_disconnect.clone();
        let new_task = tokio::spawn(async move {
            reader::run(reader_port, reader_pause, reader_frame_signal, reader_disconnect_signal).await;
        });

        let mut guard = self.0.reader_task.lock().await;
        if let Some(old) = guard.take() {
            old.abort();
        }
        *guard = Some(new_task);
        drop(guard);

        info!("driver reconnected");
        self.0.on_connect.emit(());
    }
}

impl Drop for DriverInner {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.reader_task.try_lock() {
            if let Some(handle) = guard.take() {
                handle.abort();
            }
        }
        if let Ok(mut guard) = self.watchdog_task.try_lock() {
            if let Some(handle) = guard.take() {
                handle.abort();
            }
        }
    }
}

/// Polls `Port::cts()` on a fixed tick, comparing against `session`'s cached
/// finger state every `detection_period` and emitting only on a low-to-high
/// transition.
async fn run_finger_watchdog(port: PortHandle, session: Arc<Session>, signal: Arc<Signal<()>>) {
    const POLL_TICK: Duration = Duration::from_millis(10);
    let mut last_sample = tokio::time::Instant::now();
    loop {
        tokio::time::sleep(POLL_TICK).await;
        if last_sample.elapsed() < session.detection_period() {
            continue;
        }
        last_sample = tokio::time::Instant::now();

        let cts = port.lock().await.cts();
        let previous = session.finger_state();
        if cts != previous {
            session.set_finger_state(cts);
            if cts {
                info!("finger detected on sensor");
                signal.emit(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DriverConfig;

    /// A Port that never resolves a read and answers `cts()` from a shared
    /// flag the test can flip, for driving the finger-detection watchdog
    /// without a real transport.
    struct StubPort {
        cts: Arc<AtomicBool>,
    }

    #[async_trait::async_trait]
    impl Port for StubPort {
        async fn read_until(&mut self, _delim: &[u8]) -> std::io::Result<Option<Vec<u8>>> {
            std::future::pending().await
        }

        async fn read_n(&mut self, _n: usize) -> std::io::Result<Option<Vec<u8>>> {
            std::future::pending().await
        }

        async fn write_all(&mut self, _buf: &[u8]) -> std::io::Result<()> {
            Ok(())
        }

        async fn set_baud(&mut self, _baud: u32) -> std::io::Result<()> {
            Ok(())
        }

        fn cts(&mut self) -> bool {
            self.cts.load(Ordering::SeqCst)
        }
    }

    #[tokio::test]
    async fn connect_starts_connected_and_shutdown_marks_disconnected() {
        let port: Box<dyn Port> = Box::new(StubPort { cts: Arc::new(AtomicBool::new(false)) });
        let driver = Driver::connect(port, DriverConfig::default());

        assert!(!driver.is_disconnected());
        driver.shutdown().await;
        assert!(driver.is_disconnected());
    }

    #[tokio::test]
    async fn on_disconnect_signal_flips_the_disconnected_flag() {
        let port: Box<dyn Port> = Box::new(StubPort { cts: Arc::new(AtomicBool::new(false)) });
        let driver = Driver::connect(port, DriverConfig::default());

        driver.on_disconnect().emit(());

        assert!(driver.is_disconnected());
        assert!(matches!(driver.fail_if_disconnected(), Err(DriverError::Disconnected)));
    }

    #[tokio::test]
    async fn reconnect_clears_the_disconnected_flag_and_emits_on_connect() {
        let port: Box<dyn Port> = Box::new(StubPort { cts: Arc::new(AtomicBool::new(false)) });
        let driver = Driver::connect(port, DriverConfig::default());

        let connected = Arc::new(AtomicBool::new(false));
        let flag = connected.clone();
        driver.on_connect().subscribe(move |_| flag.store(true, Ordering::SeqCst));

        driver.on_disconnect().emit(());
        assert!(driver.is_disconnected());

        let new_port: Box<dyn Port> = Box::new(StubPort { cts: Arc::new(AtomicBool::new(false)) });
        driver.reconnect(new_port).await;

        assert!(!driver.is_disconnected());
        assert!(connected.load(Ordering::SeqCst));
        assert!(driver.fail_if_disconnected().is_ok());

        driver.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn finger_watchdog_emits_only_on_low_to_high_transition() {
        let cts = Arc::new(AtomicBool::new(false));
        let port: Box<dyn Port> = Box::new(StubPort { cts: cts.clone() });
        let config = DriverConfig::builder().detection_period(Duration::from_millis(20)).build();
        let driver = Driver::connect(port, config);

        let events = Arc::new(std::sync::Mutex::new(0usize));
        let counted = events.clone();
        driver.on_finger_detected().subscribe(move |_| *counted.lock().unwrap() += 1);

        tokio::time::advance(Duration::from_millis(50)).await;
        assert_eq!(*events.lock().unwrap(), 0, "no transition yet, no emission");
        assert!(!driver.is_finger_present());

        cts.store(true, Ordering::SeqCst);
        tokio::time::advance(Duration::from_millis(50)).await;
        assert_eq!(*events.lock().unwrap(), 1, "low-to-high transition emits once");
        assert!(driver.is_finger_present());

        tokio::time::advance(Duration::from_millis(50)).await;
        assert_eq!(*events.lock().unwrap(), 1, "staying high must not re-emit");

        driver.shutdown().await;
    }
}
