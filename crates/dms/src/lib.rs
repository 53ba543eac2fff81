//! Driver Monitoring System (DMS)
//!
//! Runs a capture session against the remote drowsiness detector:
//! - Binds the front camera and drains its frames on one worker
//! - Keeps at most one detection request in flight, dropping frames meanwhile
//! - Marshals verdicts to a presenter that owns the alert and the status display
//! - Discards verdicts that arrive after the session was stopped

pub mod config;
pub mod guard;
mod presenter;
pub mod session;
pub mod state;
pub mod stats;
mod worker;

pub use config::SessionConfig;
pub use guard::{InFlightGuard, InFlightPermit, SessionToken};
pub use session::{CaptureSession, SessionParts};
pub use state::{DriverStatus, StatusDisplay};
pub use stats::{CaptureStats, StatsSnapshot};

use camera_capture::CameraError;
use inference_client::DetectionResult;
use thiserror::Error;

/// DMS error types
#[derive(Error, Debug)]
pub enum DmsError {
    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    #[error("No async runtime available: {0}")]
    Runtime(String),

    #[error("Session task failed: {0}")]
    Task(String),
}

/// Verdict for one frame, sent from a submission task to the presenter
#[derive(Debug, Clone)]
pub(crate) struct VerdictEvent {
    /// Sequence number of the frame the verdict is for
    pub sequence: u64,
    pub result: DetectionResult,
}
