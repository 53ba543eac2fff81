//! Presenter task: the only owner of the alert and the status display

use alerting::{AlertSink, AlertStateMachine};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::guard::SessionToken;
use crate::state::{DriverStatus, StatusDisplay};
use crate::stats::CaptureStats;
use crate::VerdictEvent;

pub(crate) struct Presenter<A: AlertSink, D: StatusDisplay> {
    pub alert: AlertStateMachine<A>,
    pub display: D,
    pub token: SessionToken,
    pub stats: Arc<CaptureStats>,
}

impl<A: AlertSink, D: StatusDisplay> Presenter<A, D> {
    /// Apply verdicts in arrival order until the session is cancelled.
    ///
    /// Returns the alert (reset to idle) and the display.
    pub async fn run(
        mut self,
        mut verdicts: mpsc::Receiver<VerdictEvent>,
    ) -> (AlertStateMachine<A>, D) {
        self.display.show(DriverStatus::default());
        let cancelled = self.token.cancelled();
        tokio::pin!(cancelled);

        loop {
            tokio::select! {
                biased;
                _ = &mut cancelled => break,
                event = verdicts.recv() => match event {
                    Some(event) => self.present(event),
                    None => break,
                },
            }
        }

        // Anything still queued belongs to a stopped session
        verdicts.close();
        while let Ok(event) = verdicts.try_recv() {
            self.stats.record_discarded_late();
            debug!("Discarding queued verdict for frame {}", event.sequence);
        }

        self.alert.reset();
        info!("Presenter stopped");
        (self.alert, self.display)
    }

    fn present(&mut self, event: VerdictEvent) {
        if self.token.is_cancelled() {
            self.stats.record_discarded_late();
            return;
        }

        let action = self.alert.apply(&event.result);
        let status = DriverStatus::from_result(&event.result, self.alert.policy());
        debug!(
            "Frame {}: {:?} -> {:?}, {}",
            event.sequence, event.result, action, status
        );
        self.display.show(status);
    }
}
