//! The recorder half of C7: taps C1's inbound path with a callback and
//! drains a bounded channel to disk on its own thread, so a slow disk never
//! stalls the live read path.

use crate::error::RecordError;
use crate::format::{self, DATA_TYPE_RAW_BYTES, Metadata};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, RecvTimeoutError, SyncSender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{info, warn};

enum WriterMsg {
    Entry { delta_ms: u32, bytes: Vec<u8> },
    Stop,
}

/// Shared state the tap callback and the writer thread both touch; cheap to
/// clone into the transport's read thread closure.
#[derive(Clone)]
pub struct RecorderTap {
    tx: SyncSender<WriterMsg>,
    start_ns: u64,
    truncated: Arc<AtomicBool>,
    entries_written: Arc<AtomicU64>,
}

impl RecorderTap {
    /// Invoked from the transport read thread with each chunk of bytes it
    /// reads, zero-copy up to this point — the only copy this call makes is
    /// the one needed to cross the channel onto the writer thread.
    pub fn on_bytes(&self, bytes: &[u8], now_ns: u64) {
        if bytes.is_empty() {
            return;
        }
        let delta_ms = now_ns.saturating_sub(self.start_ns) / 1_000_000;
        let msg = WriterMsg::Entry { delta_ms: delta_ms as u32, bytes: bytes.to_vec() };
        if self.tx.try_send(msg).is_err() {
            if !self.truncated.swap(true, Ordering::Relaxed) {
                warn!("recorder writer fell behind, session marked truncated");
            }
        }
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated.load(Ordering::Relaxed)
    }

    pub fn entries_written(&self) -> u64 {
        self.entries_written.load(Ordering::Relaxed)
    }
}

pub struct Recorder {
    tap: RecorderTap,
    writer_thread: Option<JoinHandle<()>>,
    stop_ack_rx: Receiver<()>,
}

impl Recorder {
    /// Opens `path`, writes the header and metadata blob, and spawns the
    /// writer thread. `start_ns` anchors every subsequent entry's `delta_ms`.
    pub fn start(
        path: impl AsRef<Path>,
        start_ns: u64,
        metadata: Metadata,
        channel_capacity: usize,
    ) -> Result<Self, RecordError> {
        let path = path.as_ref();
        let mut file = BufWriter::new(File::create(path).map_err(|e| RecordError::Io {
            path: path.display().to_string(),
            source: e,
        })?);

        let metadata_json = serde_json::to_vec(&metadata)?;
        format::write_header(&mut file, start_ns, &metadata_json).map_err(|e| RecordError::Io {
            path: path.display().to_string(),
            source: e,
        })?;

        let (tx, rx) = sync_channel(channel_capacity);
        let (stop_ack_tx, stop_ack_rx) = sync_channel(1);
        let truncated = Arc::new(AtomicBool::new(false));
        let entries_written = Arc::new(AtomicU64::new(0));

        let writer_thread = std::thread::spawn({
            let entries_written = entries_written.clone();
            move || run_writer(file, rx, stop_ack_tx, entries_written)
        });

        info!(path = %path.display(), "recorder started");
        Ok(Self {
            tap: RecorderTap { tx, start_ns, truncated, entries_written },
            writer_thread: Some(writer_thread),
            stop_ack_rx,
        })
    }

    pub fn tap(&self) -> RecorderTap {
        self.tap.clone()
    }

    /// Signals the writer thread to drain and close, waiting up to 2 seconds
    /// before abandoning it.
    pub fn stop(mut self) {
        let _ = self.tap.tx.try_send(WriterMsg::Stop);
        match self.stop_ack_rx.recv_timeout(Duration::from_secs(2)) {
            Ok(()) => {
                if let Some(handle) = self.writer_thread.take() {
                    let _ = handle.join();
                }
                info!("recorder stopped cleanly");
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!("recorder writer did not drain within 2s, abandoning it");
            }
            Err(RecvTimeoutError::Disconnected) => {}
        }
    }
}

fn run_writer(
    mut file: BufWriter<File>,
    rx: Receiver<WriterMsg>,
    stop_ack_tx: SyncSender<()>,
    entries_written: Arc<AtomicU64>,
) {
    while let Ok(msg) = rx.recv() {
        match msg {
            WriterMsg::Entry { delta_ms, bytes } => {
                if let Err(e) = format::write_entry(&mut file, delta_ms, DATA_TYPE_RAW_BYTES, &bytes) {
                    warn!(error = %e, "recorder write failed");
                    break;
                }
                entries_written.fetch_add(1, Ordering::Relaxed);
            }
            WriterMsg::Stop => break,
        }
    }
    let _ = file.flush();
    let _ = stop_ack_tx.send(());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn tap_writes_entries_that_the_format_reader_can_parse_back() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("p2dbg-record-test-{}.p2rec", std::process::id()));

        let recorder = Recorder::start(&path, 1_000_000_000, Metadata::default(), 16).unwrap();
        let tap = recorder.tap();
        tap.on_bytes(b"hello", 1_000_000_000);
        tap.on_bytes(b"world", 1_005_000_000);
        recorder.stop();

        let bytes = std::fs::read(&path).unwrap();
        std::fs::remove_file(&path).ok();
        let mut cursor = Cursor::new(bytes);
        let header = format::read_header(&mut cursor).unwrap();
        assert_eq!(header.start_ns, 1_000_000_000);

        let first = format::read_entry(&mut cursor).unwrap().unwrap();
        assert_eq!(first.delta_ms, 0);
        assert_eq!(first.bytes, b"hello");
        let second = format::read_entry(&mut cursor).unwrap().unwrap();
        assert_eq!(second.delta_ms, 5);
        assert_eq!(second.bytes, b"world");
        assert!(format::read_entry(&mut cursor).unwrap().is_none());
    }

    #[test]
    fn a_full_channel_marks_the_session_truncated_without_blocking() {
        // Built directly, with nothing ever draining `rx`, so the channel
        // fills deterministically instead of racing a writer thread.
        let (tx, _rx) = sync_channel(1);
        let tap = RecorderTap {
            tx,
            start_ns: 0,
            truncated: Arc::new(AtomicBool::new(false)),
            entries_written: Arc::new(AtomicU64::new(0)),
        };
        for _ in 0..4 {
            tap.on_bytes(b"x", 0);
        }
        assert!(tap.is_truncated());
    }
}
