//! Serial transport (component C1). Opens the device, spawns the read
//! thread that pushes bytes straight into the ring with no line-oriented or
//! encoding parser on the path, and exposes `write`/`pulse_reset`.
//!
//! One struct owns the external I/O handle; `spawn_reader` moves it onto its
//! own thread and hands back a `ReaderHandle`, since the read loop owns the
//! device for as long as it runs. `ReaderHandle::close` is the explicit C1
//! `close()` operation: it cancels the read loop and blocks until the
//! thread has actually exited — only then is the device provably released,
//! rather than merely requested to be. The write side has no buffering of
//! its own to drain: `write`/`pulse_reset` already flush synchronously
//! before returning, so there is nothing left in flight by the time
//! `close` is called.

use crate::autobaud::AutobaudDetector;
use crate::error::TransportError;
use p2dbg_core::{ControlLine, Metrics, ResetEvent};
use p2dbg_ring::RingProducer;
use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::SyncSender;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{info, warn};

const RESET_ASSERT_HOLD: Duration = Duration::from_millis(10);
const RESET_LOADER_WAIT: Duration = Duration::from_millis(15);

fn io_kind_to_transport_error(port: &str, err: &io::Error) -> TransportError {
    match err.kind() {
        io::ErrorKind::PermissionDenied => TransportError::PermissionDenied { port: port.to_string() },
        io::ErrorKind::NotFound => TransportError::PortUnavailable { port: port.to_string() },
        _ => TransportError::WriteFailed(io::Error::new(err.kind(), err.to_string())),
    }
}

/// An open serial device. Owns the underlying handle; `spawn_reader` moves it
/// into a dedicated OS thread that feeds the shared ring until `close`/drop.
pub struct SerialTransport {
    port: Box<dyn serialport::SerialPort>,
    port_name: String,
    control_line: ControlLine,
    reset_sequence: Arc<AtomicU64>,
}

impl SerialTransport {
    /// Opens `port` at `baud`. `control_line` is the line `pulse_reset` will
    /// assert.
    pub fn open(port: &str, baud: u32, control_line: ControlLine) -> Result<Self, TransportError> {
        if baud == 0 || baud > 2_000_000 {
            return Err(TransportError::BaudUnsupported { baud });
        }

        let handle = serialport::new(port, baud)
            .timeout(Duration::from_millis(100))
            .open()
            .map_err(|e| match e.kind {
                serialport::ErrorKind::NoDevice => TransportError::PortUnavailable { port: port.to_string() },
                serialport::ErrorKind::Io(io::ErrorKind::PermissionDenied) => {
                    TransportError::PermissionDenied { port: port.to_string() }
                }
                _ => TransportError::PortUnavailable { port: port.to_string() },
            })?;

        info!(port, baud, "opened serial transport");
        Ok(Self {
            port: handle,
            port_name: port.to_string(),
            control_line,
            reset_sequence: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Writes `bytes`, then blocks until the hardware FIFO has drained.
    pub fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.port
            .write_all(bytes)
            .map_err(|e| io_kind_to_transport_error(&self.port_name, &e))?;
        self.port
            .flush()
            .map_err(|e| io_kind_to_transport_error(&self.port_name, &e))?;
        Ok(())
    }

    /// Asserts the configured control line, holds 10ms, releases, then waits
    /// 15ms for the P2 loader to come active, emitting `ResetEvent` to
    /// `reset_tx` (the reset coordinator's inbound channel, C6) throughout.
    pub fn pulse_reset(&mut self, reset_tx: &SyncSender<ResetEvent>, now_ns: impl Fn() -> u64) -> Result<(), TransportError> {
        self.assert_control_line(true)?;
        std::thread::sleep(RESET_ASSERT_HOLD);
        self.assert_control_line(false)?;
        std::thread::sleep(RESET_LOADER_WAIT);

        let sequence = self.reset_sequence.fetch_add(1, Ordering::Relaxed);
        let event = ResetEvent {
            kind: self.control_line,
            timestamp_ns: now_ns(),
            sequence,
        };
        if reset_tx.send(event).is_err() {
            warn!("reset event dropped: reset coordinator channel closed");
        }
        Ok(())
    }

    fn assert_control_line(&mut self, level: bool) -> Result<(), TransportError> {
        let result = match self.control_line {
            ControlLine::Dtr => self.port.write_data_terminal_ready(level),
            ControlLine::Rts => self.port.write_request_to_send(level),
        };
        result.map_err(|e| io_kind_to_transport_error(&self.port_name, &io::Error::new(io::ErrorKind::Other, e)))
    }

    /// Spawns the read thread: wakes on each byte block, pushes every byte
    /// into `producer` and the autobaud side buffer, and exits when `cancel`
    /// is set or the port reports a fatal error. Every delivered byte
    /// appears exactly once in the ring or the ring's own overflow counter
    /// accounts for it — this thread never silently drops bytes itself.
    ///
    /// `recorder_tap`, when present, is handed each chunk before it is
    /// pushed into the ring — the recorder's zero-copy tap of C1's inbound
    /// path (§4.C7).
    pub fn spawn_reader(
        mut self,
        producer: RingProducer,
        metrics: Arc<Metrics>,
        autobaud_pattern: Vec<u8>,
        cancel: Arc<AtomicBool>,
        recorder_tap: Option<p2dbg_record::RecorderTap>,
    ) -> ReaderHandle {
        let cancel_for_thread = cancel.clone();
        let handle = std::thread::spawn(move || {
            let cancel = cancel_for_thread;
            let mut buf = [0u8; 4096];
            let mut detector = AutobaudDetector::new(autobaud_pattern);
            loop {
                if cancel.load(Ordering::Acquire) {
                    break;
                }
                match self.port.read(&mut buf) {
                    Ok(0) => continue,
                    Ok(n) => {
                        let bytes = &buf[..n];
                        detector.feed(bytes);
                        metrics.add_bytes_in(n as u64);
                        if let Some(tap) = &recorder_tap {
                            tap.on_bytes(bytes, p2dbg_core::now_ns());
                        }
                        if let Err(overflow) = producer.append(bytes) {
                            metrics.inc_overflow();
                            let err = TransportError::BufferOverflow { dropped: overflow.dropped };
                            warn!(error = %err, "ring buffer overflow, bytes dropped");
                        }
                    }
                    Err(e) if e.kind() == io::ErrorKind::TimedOut => continue,
                    Err(e) => {
                        warn!(error = %e, "serial read failed, closing transport read thread");
                        break;
                    }
                }
            }
            producer.close();
            info!("serial transport read thread exiting");
            // `self` (and with it `self.port`) drops here, releasing the
            // device — the event `ReaderHandle::close`'s join waits for.
        });
        ReaderHandle { handle, cancel }
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// Duplicates the underlying handle so a pulse can be asserted from
    /// another thread (e.g. a `SIGUSR1` handler) after `spawn_reader` has
    /// taken ownership of `self` for the read loop.
    pub fn try_clone_control(&self) -> Result<ControlHandle, TransportError> {
        let cloned = self
            .port
            .try_clone()
            .map_err(|e| io_kind_to_transport_error(&self.port_name, &io::Error::new(io::ErrorKind::Other, e)))?;
        Ok(ControlHandle {
            port: cloned,
            port_name: self.port_name.clone(),
            control_line: self.control_line,
            reset_sequence: self.reset_sequence.clone(),
        })
    }
}

/// The handle `spawn_reader` returns: the read thread's `JoinHandle` plus
/// the `cancel` flag that stops it, bundled so the caller has one thing to
/// hold instead of wiring them together itself.
pub struct ReaderHandle {
    handle: JoinHandle<()>,
    cancel: Arc<AtomicBool>,
}

impl ReaderHandle {
    /// The explicit C1 `close()`: cancels the read loop and blocks until
    /// the thread has actually exited, at which point `self.port` has
    /// dropped and the device is released. Distinct from `join`, which
    /// waits passively — `close` is the caller declaring "stop now".
    pub fn close(self) -> std::thread::Result<()> {
        self.cancel.store(true, Ordering::Release);
        self.handle.join()
    }

    /// Waits for the read thread to exit on its own (cancelled elsewhere,
    /// or the device errored out) without asserting `cancel` itself.
    pub fn join(self) -> std::thread::Result<()> {
        self.handle.join()
    }
}

/// A duplicated handle onto an already-open port, used only to assert the
/// reset control line from a thread other than the reader's.
pub struct ControlHandle {
    port: Box<dyn serialport::SerialPort>,
    port_name: String,
    control_line: ControlLine,
    reset_sequence: Arc<AtomicU64>,
}

impl ControlHandle {
    pub fn pulse_reset(&mut self, reset_tx: &SyncSender<ResetEvent>, now_ns: impl Fn() -> u64) -> Result<(), TransportError> {
        self.assert_control_line(true)?;
        std::thread::sleep(RESET_ASSERT_HOLD);
        self.assert_control_line(false)?;
        std::thread::sleep(RESET_LOADER_WAIT);

        let sequence = self.reset_sequence.fetch_add(1, Ordering::Relaxed);
        let event = ResetEvent {
            kind: self.control_line,
            timestamp_ns: now_ns(),
            sequence,
        };
        if reset_tx.send(event).is_err() {
            warn!("reset event dropped: reset coordinator channel closed");
        }
        Ok(())
    }

    fn assert_control_line(&mut self, level: bool) -> Result<(), TransportError> {
        let result = match self.control_line {
            ControlLine::Dtr => self.port.write_data_terminal_ready(level),
            ControlLine::Rts => self.port.write_request_to_send(level),
        };
        result.map_err(|e| io_kind_to_transport_error(&self.port_name, &io::Error::new(io::ErrorKind::Other, e)))
    }
}
