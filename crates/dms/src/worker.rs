//! Frame worker
//!
//! Drains frame deliveries sequentially on a dedicated blocking thread.
//! A frame that arrives while a request is outstanding is dropped.

use camera_capture::{Frame, FrameExtractor};
use inference_client::{DetectionRequest, DetectionService};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::guard::{InFlightGuard, InFlightPermit, SessionToken};
use crate::stats::CaptureStats;
use crate::VerdictEvent;

pub(crate) struct CaptureLoop<S: DetectionService> {
    pub extractor: FrameExtractor,
    pub service: Arc<S>,
    pub guard: InFlightGuard,
    pub token: SessionToken,
    pub stats: Arc<CaptureStats>,
    pub verdicts: mpsc::Sender<VerdictEvent>,
    pub runtime: Handle,
}

impl<S: DetectionService> CaptureLoop<S> {
    /// Run until the source closes its channel or the session is cancelled
    pub fn run(self, mut frames: mpsc::Receiver<Frame>) {
        info!("Capture worker started");

        while let Some(frame) = frames.blocking_recv() {
            if self.token.is_cancelled() {
                break;
            }
            self.on_frame(frame);
        }

        info!("Capture worker stopped");
    }

    fn on_frame(&self, frame: Frame) {
        self.stats.record_delivered();
        let sequence = frame.sequence;

        let Some(permit) = self.guard.try_acquire() else {
            self.stats.record_dropped_busy();
            debug!("Dropping frame {}: request in flight", sequence);
            return;
        };

        // The frame is consumed here and released once its pixels are encoded
        let image = match self.extractor.extract(frame) {
            Ok(image) => image,
            Err(e) => {
                self.stats.record_extraction_failed();
                debug!("Frame {} extraction failed: {}", sequence, e);
                return;
            }
        };

        debug!(
            "Frame {} encoded: {}x{}, {} bytes",
            sequence,
            image.width,
            image.height,
            image.len()
        );
        self.submit(sequence, DetectionRequest::from_image(&image), permit);
    }

    fn submit(&self, sequence: u64, request: DetectionRequest, permit: InFlightPermit) {
        self.stats.record_submitted();

        let service = self.service.clone();
        let token = self.token.clone();
        let stats = self.stats.clone();
        let verdicts = self.verdicts.clone();

        self.runtime.spawn(async move {
            let result = service.submit(request).await;
            stats.record_completed();

            if token.is_cancelled() {
                stats.record_discarded_late();
                debug!("Discarding verdict for frame {}: session stopped", sequence);
                return;
            }

            if verdicts.send(VerdictEvent { sequence, result }).await.is_err() {
                stats.record_discarded_late();
                debug!("Discarding verdict for frame {}: presenter gone", sequence);
            }

            // Released only once the verdict is queued, so verdicts reach the
            // presenter in the order their requests were issued
            drop(permit);
        });
    }
}
