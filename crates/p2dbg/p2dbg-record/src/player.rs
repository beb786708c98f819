//! The player half of C7. Loads a `.p2rec` file fully into memory (so
//! `seek(fraction)` and total-duration reporting are O(1)) and schedules its
//! entries onto the same `RingProducer::append` the live transport uses —
//! the single injection point that makes playback byte-identical downstream.

use crate::error::RecordError;
use crate::format::{self, Entry, Metadata};
use p2dbg_ring::RingProducer;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::mpsc::{Receiver, RecvTimeoutError, SyncSender};
use std::time::Duration;
use tracing::{info, warn};

const DRIFT_RESYNC_THRESHOLD_NS: u64 = 5_000_000;
const MIN_SPEED: f64 = 0.25;
const MAX_SPEED: f64 = 10.0;

pub enum PlayerCommand {
    Play,
    Pause,
    Stop,
    Seek(f64),
    SetSpeed(f64),
}

enum RunState {
    Playing,
    Paused,
    Stopped,
}

pub struct Player {
    metadata: Metadata,
    entries: Vec<Entry>,
    producer: RingProducer,
    cmd_rx: Receiver<PlayerCommand>,
}

impl Player {
    /// Loads and fully validates `path`: bad magic, an unsupported version,
    /// or a truncated entry stream all fail here rather than mid-playback.
    pub fn load(
        path: impl AsRef<Path>,
        producer: RingProducer,
        cmd_rx: Receiver<PlayerCommand>,
    ) -> Result<Self, RecordError> {
        let path = path.as_ref();
        let mut reader = BufReader::new(File::open(path).map_err(|e| RecordError::Io {
            path: path.display().to_string(),
            source: e,
        })?);

        let header = format::read_header(&mut reader)?;
        let mut entries = Vec::new();
        while let Some(entry) = format::read_entry(&mut reader)? {
            entries.push(entry);
        }

        info!(path = %path.display(), entries = entries.len(), "loaded recording");
        Ok(Self { metadata: header.metadata, entries, producer, cmd_rx })
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    fn total_duration_ms(&self) -> u64 {
        self.entries.last().map(|e| e.delta_ms as u64).unwrap_or(0)
    }

    /// Drives playback until `Stop`, a command error (sender dropped), or
    /// the recording is exhausted. Consumes `self` — run on a dedicated
    /// thread, mirroring the router and reset coordinator's own `run`.
    pub fn run(mut self, now_ns: impl Fn() -> u64) {
        let mut state = RunState::Paused;
        let mut speed = 1.0_f64;
        let mut index = 0usize;
        let mut anchor_ns = now_ns();
        let mut anchor_delta_ms = 0u64;

        loop {
            match state {
                RunState::Stopped => break,
                RunState::Paused => match self.cmd_rx.recv() {
                    Ok(cmd) => {
                        if let Some(new_state) = self.apply_command(
                            cmd,
                            &mut speed,
                            &mut index,
                            &mut anchor_ns,
                            &mut anchor_delta_ms,
                            &now_ns,
                        ) {
                            state = new_state;
                        }
                    }
                    Err(_) => break,
                },
                RunState::Playing => {
                    if index >= self.entries.len() {
                        info!("playback reached end of recording");
                        state = RunState::Paused;
                        continue;
                    }

                    let entry_delta_ms = self.entries[index].delta_ms as u64;
                    let target_ns = anchor_ns
                        + ((entry_delta_ms.saturating_sub(anchor_delta_ms)) as f64 * 1_000_000.0 / speed) as u64;

                    let now = now_ns();
                    if target_ns > now {
                        match self.cmd_rx.recv_timeout(Duration::from_nanos(target_ns - now)) {
                            Ok(cmd) => {
                                if let Some(new_state) = self.apply_command(
                                    cmd,
                                    &mut speed,
                                    &mut index,
                                    &mut anchor_ns,
                                    &mut anchor_delta_ms,
                                    &now_ns,
                                ) {
                                    state = new_state;
                                }
                                continue;
                            }
                            Err(RecvTimeoutError::Timeout) => {}
                            Err(RecvTimeoutError::Disconnected) => {
                                state = RunState::Stopped;
                                continue;
                            }
                        }
                    }

                    let actual_now = now_ns();
                    let drift = actual_now.saturating_sub(target_ns);
                    if drift > DRIFT_RESYNC_THRESHOLD_NS {
                        anchor_ns = actual_now;
                        anchor_delta_ms = entry_delta_ms;
                    }

                    if let Err(overflow) = self.producer.append(&self.entries[index].bytes) {
                        warn!(dropped = overflow.dropped, "playback injection overflowed the ring");
                    }
                    index += 1;
                }
            }
        }

        info!("player exiting");
    }

    #[allow(clippy::too_many_arguments)]
    fn apply_command(
        &mut self,
        cmd: PlayerCommand,
        speed: &mut f64,
        index: &mut usize,
        anchor_ns: &mut u64,
        anchor_delta_ms: &mut u64,
        now_ns: &impl Fn() -> u64,
    ) -> Option<RunState> {
        match cmd {
            PlayerCommand::Play => {
                *anchor_ns = now_ns();
                *anchor_delta_ms = self.entries.get(*index).map(|e| e.delta_ms as u64).unwrap_or(0);
                Some(RunState::Playing)
            }
            PlayerCommand::Pause => Some(RunState::Paused),
            PlayerCommand::Stop => Some(RunState::Stopped),
            PlayerCommand::SetSpeed(s) => {
                *speed = s.clamp(MIN_SPEED, MAX_SPEED);
                None
            }
            PlayerCommand::Seek(fraction) => {
                let fraction = fraction.clamp(0.0, 1.0);
                let target_ms = (self.total_duration_ms() as f64 * fraction) as u64;
                *index = self.entries.partition_point(|e| (e.delta_ms as u64) < target_ms);
                *anchor_ns = now_ns();
                *anchor_delta_ms = self.entries.get(*index).map(|e| e.delta_ms as u64).unwrap_or(target_ms);
                None
            }
        }
    }
}

/// Convenience wrapper for callers that just want a command sender and a
/// join handle, mirroring how `bins/p2dbg-play` wires things up.
pub fn spawn(
    path: impl AsRef<Path>,
    producer: RingProducer,
    now_ns: impl Fn() -> u64 + Send + 'static,
) -> Result<(SyncSender<PlayerCommand>, std::thread::JoinHandle<()>), RecordError> {
    let (cmd_tx, cmd_rx) = std::sync::mpsc::sync_channel(16);
    let player = Player::load(path, producer, cmd_rx)?;
    let handle = std::thread::spawn(move || player.run(now_ns));
    Ok((cmd_tx, handle))
}
