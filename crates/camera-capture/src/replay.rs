//! Replay source: streams raw I420 clips from a directory
//!
//! Each `*.yuv` file holds one packed I420 frame. Geometry and rotation are
//! read from the file name: `<label>_<W>x<H>[_r<deg>].yuv`, for example
//! `driver_640x480_r270.yuv`.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::source::FrameSource;
use crate::{CameraConfig, CameraError, Frame, LensFacing};

/// One frame file on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clip {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub rotation_degrees: u32,
}

impl Clip {
    /// Parse clip geometry from its file name
    pub fn from_path(path: &Path) -> Option<Self> {
        if path.extension()?.to_str()? != "yuv" {
            return None;
        }

        let stem = path.file_stem()?.to_str()?;
        let mut size = None;
        let mut rotation_degrees = 0;

        for token in stem.split('_') {
            if let Some((w, h)) = token.split_once('x') {
                if let (Ok(w), Ok(h)) = (w.parse::<u32>(), h.parse::<u32>()) {
                    size = Some((w, h));
                    continue;
                }
            }
            if let Some(deg) = token.strip_prefix('r') {
                if let Ok(deg) = deg.parse::<u32>() {
                    rotation_degrees = deg;
                }
            }
        }

        let (width, height) = size?;
        Some(Self {
            path: path.to_path_buf(),
            width,
            height,
            rotation_degrees,
        })
    }
}

/// Frame source backed by a directory of raw clips, replayed as the front sensor
pub struct ReplaySource {
    dir: PathBuf,
    interval: Duration,
    loop_replay: bool,
    capacity: usize,
    worker: Option<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl ReplaySource {
    /// Create a replay source from camera configuration
    pub fn new(config: &CameraConfig) -> Self {
        Self {
            dir: config.replay_dir.clone(),
            interval: config.frame_interval(),
            loop_replay: config.loop_replay,
            capacity: config.frame_channel_capacity.max(1),
            worker: None,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// List clips in playback order (sorted by file name)
    pub fn scan(dir: &Path) -> Result<Vec<Clip>, CameraError> {
        if !dir.is_dir() {
            return Err(CameraError::Unavailable(format!(
                "replay directory {} not found",
                dir.display()
            )));
        }

        let mut clips = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            match Clip::from_path(&path) {
                Some(clip) => clips.push(clip),
                None => debug!("Skipping {}", path.display()),
            }
        }
        clips.sort_by(|a, b| a.path.cmp(&b.path));

        if clips.is_empty() {
            return Err(CameraError::Unavailable(format!(
                "no *_WxH.yuv clips in {}",
                dir.display()
            )));
        }
        Ok(clips)
    }
}

impl FrameSource for ReplaySource {
    fn bind(&mut self, lens: LensFacing) -> Result<mpsc::Receiver<Frame>, CameraError> {
        if self.worker.is_some() {
            return Err(CameraError::AlreadyBound);
        }
        if lens != LensFacing::Front {
            return Err(CameraError::UnsupportedLens(lens));
        }

        let clips = Self::scan(&self.dir)?;
        info!(
            "Replaying {} clips from {} as {:?} camera",
            clips.len(),
            self.dir.display(),
            lens
        );

        let (tx, rx) = mpsc::channel(self.capacity);
        self.shutdown.store(false, Ordering::SeqCst);
        let shutdown = self.shutdown.clone();
        let interval = self.interval;
        let loop_replay = self.loop_replay;

        self.worker = Some(tokio::spawn(async move {
            replay(clips, tx, interval, loop_replay, shutdown).await;
        }));

        Ok(rx)
    }

    fn unbind_all(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            worker.abort();
            info!("Replay source unbound");
        }
    }
}

impl Drop for ReplaySource {
    fn drop(&mut self) {
        self.unbind_all();
    }
}

async fn replay(
    clips: Vec<Clip>,
    tx: mpsc::Sender<Frame>,
    interval: Duration,
    loop_replay: bool,
    shutdown: Arc<AtomicBool>,
) {
    let mut ticker = tokio::time::interval(interval);
    let mut sequence = 0u64;

    'replay: loop {
        for clip in &clips {
            ticker.tick().await;
            if shutdown.load(Ordering::SeqCst) {
                break 'replay;
            }

            let bytes = match tokio::fs::read(&clip.path).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!("Failed to read {}: {}", clip.path.display(), e);
                    continue;
                }
            };

            let timestamp_ns = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(0);

            let frame = match Frame::from_i420(&bytes, clip.width, clip.height) {
                Ok(frame) => frame
                    .with_rotation(clip.rotation_degrees)
                    .with_sequence(sequence, timestamp_ns),
                Err(e) => {
                    warn!("Invalid clip {}: {}", clip.path.display(), e);
                    continue;
                }
            };
            sequence += 1;

            match tx.try_send(frame) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(frame)) => {
                    debug!("Dropping frame {}: worker busy", frame.sequence);
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    debug!("Frame receiver dropped");
                    break 'replay;
                }
            }
        }

        if !loop_replay {
            break;
        }
    }

    if !loop_replay && !shutdown.load(Ordering::SeqCst) {
        info!("Replay finished after {} frames", sequence);
    }
}
