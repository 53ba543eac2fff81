//! Terminal status line and audible bell alert

use alerting::AlertSink;
use dms::{DriverStatus, StatusDisplay};
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

const BELL: &[u8] = b"\x07";

/// Prints the status line whenever it changes
pub struct ConsoleStatus<W: Write + Send + 'static> {
    out: W,
    last: Option<DriverStatus>,
}

impl ConsoleStatus<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send + 'static> ConsoleStatus<W> {
    pub fn new(out: W) -> Self {
        Self { out, last: None }
    }

    /// Last status shown
    pub fn current(&self) -> Option<DriverStatus> {
        self.last
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send + 'static> StatusDisplay for ConsoleStatus<W> {
    fn show(&mut self, status: DriverStatus) {
        if self.last == Some(status) {
            return;
        }
        self.last = Some(status);
        info!("{}", status);

        if let Err(e) = writeln!(self.out, "{}", status).and_then(|_| self.out.flush()) {
            warn!("Failed to write status: {}", e);
        }
    }
}

/// Alert that rings the terminal bell repeatedly while playing.
///
/// The bell loops until stopped; `rewind` resets the ring count, which is the
/// playback position of this alert.
pub struct BellAlertSink {
    playing: Arc<AtomicBool>,
    rings: Arc<AtomicU64>,
    ringer: JoinHandle<()>,
}

impl BellAlertSink {
    /// Start the ringer task on the current runtime
    pub fn spawn<W: Write + Send + 'static>(interval: Duration, out: W) -> Self {
        let playing = Arc::new(AtomicBool::new(false));
        let rings = Arc::new(AtomicU64::new(0));
        let out = Mutex::new(out);

        let ringer = {
            let playing = playing.clone();
            let rings = rings.clone();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                loop {
                    ticker.tick().await;
                    if !playing.load(Ordering::Acquire) {
                        continue;
                    }
                    let mut writer = out.lock().unwrap_or_else(PoisonError::into_inner);
                    match writer.write_all(BELL).and_then(|_| writer.flush()) {
                        Ok(()) => {
                            rings.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(e) => debug!("Bell write failed: {}", e),
                    }
                }
            })
        };

        Self {
            playing,
            rings,
            ringer,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }

    /// Bells rung since the last rewind
    pub fn rings(&self) -> u64 {
        self.rings.load(Ordering::Relaxed)
    }
}

impl AlertSink for BellAlertSink {
    fn start(&mut self) {
        self.playing.store(true, Ordering::Release);
    }

    fn stop(&mut self) {
        self.playing.store(false, Ordering::Release);
    }

    fn rewind(&mut self) {
        self.rings.store(0, Ordering::Relaxed);
    }
}

impl Drop for BellAlertSink {
    fn drop(&mut self) {
        self.ringer.abort();
    }
}
