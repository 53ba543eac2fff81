//! Capture session lifecycle

use alerting::{AlertSink, AlertStateMachine};
use camera_capture::{FrameExtractor, FrameSource, LensFacing};
use inference_client::DetectionService;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::SessionConfig;
use crate::guard::{InFlightGuard, SessionToken};
use crate::presenter::Presenter;
use crate::state::StatusDisplay;
use crate::stats::{CaptureStats, StatsSnapshot};
use crate::worker::CaptureLoop;
use crate::DmsError;

/// A running capture session.
///
/// Owns the bound frame source, the frame worker and the presenter task.
pub struct CaptureSession<Src: FrameSource, A: AlertSink, D: StatusDisplay> {
    source: Src,
    lens: LensFacing,
    token: SessionToken,
    guard: InFlightGuard,
    stats: Arc<CaptureStats>,
    worker: JoinHandle<()>,
    presenter: JoinHandle<(AlertStateMachine<A>, D)>,
}

/// Everything handed back by [`CaptureSession::stop`]
pub struct SessionParts<Src, A: AlertSink, D> {
    pub source: Src,
    /// Alert machine, reset to idle
    pub alert: AlertStateMachine<A>,
    pub display: D,
    pub stats: StatsSnapshot,
}

impl<Src: FrameSource, A: AlertSink, D: StatusDisplay> CaptureSession<Src, A, D> {
    /// Bind `source` and start processing frames.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<S: DetectionService>(
        mut source: Src,
        lens: LensFacing,
        service: Arc<S>,
        alert: AlertStateMachine<A>,
        display: D,
        config: &SessionConfig,
    ) -> Result<Self, DmsError> {
        let runtime = Handle::try_current().map_err(|e| DmsError::Runtime(e.to_string()))?;

        let frames = source.bind(lens).map_err(|e| {
            warn!("Could not start capture session: {}", e);
            e
        })?;

        let token = SessionToken::new();
        let guard = InFlightGuard::new();
        let stats = Arc::new(CaptureStats::default());
        let (verdict_tx, verdict_rx) = mpsc::channel(config.result_channel_capacity.max(1));

        let presenter = Presenter {
            alert,
            display,
            token: token.clone(),
            stats: stats.clone(),
        };
        let presenter = runtime.spawn(presenter.run(verdict_rx));

        let capture = CaptureLoop {
            extractor: FrameExtractor::new(config.mirror),
            service,
            guard: guard.clone(),
            token: token.clone(),
            stats: stats.clone(),
            verdicts: verdict_tx,
            runtime: runtime.clone(),
        };
        let worker = runtime.spawn_blocking(move || capture.run(frames));

        info!("Capture session started ({:?} lens)", lens);
        Ok(Self {
            source,
            lens,
            token,
            guard,
            stats,
            worker,
            presenter,
        })
    }

    pub fn lens(&self) -> LensFacing {
        self.lens
    }

    /// Live counters
    pub fn stats(&self) -> Arc<CaptureStats> {
        self.stats.clone()
    }

    /// Whether a detection request is outstanding
    pub fn request_in_flight(&self) -> bool {
        self.guard.is_held()
    }

    /// Token cancelled when the session stops
    pub fn token(&self) -> SessionToken {
        self.token.clone()
    }

    /// Stop the session.
    ///
    /// Cancels the token, unbinds the camera, waits for the worker and the
    /// presenter and resets the alert. Verdicts still in flight are
    /// discarded when they arrive.
    pub async fn stop(mut self) -> Result<SessionParts<Src, A, D>, DmsError> {
        self.token.cancel();
        self.source.unbind_all();

        self.worker
            .await
            .map_err(|e| DmsError::Task(format!("capture worker: {}", e)))?;
        let (alert, display) = self
            .presenter
            .await
            .map_err(|e| DmsError::Task(format!("presenter: {}", e)))?;

        let stats = self.stats.snapshot();
        info!(
            "Capture session stopped: {} delivered, {} dropped, {} submitted",
            stats.delivered, stats.dropped_busy, stats.submitted
        );

        Ok(SessionParts {
            source: self.source,
            alert,
            display,
            stats,
        })
    }
}
