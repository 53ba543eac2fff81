//! Alert State Machine Implementation

use inference_client::DetectionResult;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// The audible alert resource.
///
/// There is one per process and only [`AlertStateMachine`] drives it.
pub trait AlertSink: Send + 'static {
    /// Begin (or resume) playback
    fn start(&mut self);
    /// Pause playback
    fn stop(&mut self);
    /// Move the playback position back to the beginning
    fn rewind(&mut self);
}

impl<S: AlertSink + ?Sized> AlertSink for Box<S> {
    fn start(&mut self) {
        (**self).start()
    }

    fn stop(&mut self) {
        (**self).stop()
    }

    fn rewind(&mut self) {
        (**self).rewind()
    }
}

/// Alert playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AlertState {
    #[default]
    Idle,
    Playing,
}

/// Side effect produced by a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertAction {
    /// Playback started
    Started,
    /// Playback stopped and rewound
    Stopped,
    /// Nothing changed
    NoOp,
}

/// How a verdict that could not be obtained is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownVerdictPolicy {
    /// Treat as "not drowsy": a running alert is stopped
    #[default]
    FailOpen,
    /// Keep the current alert state until a real verdict arrives
    Hold,
}

/// Alert configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Treatment of transport failures and malformed replies
    pub unknown_policy: UnknownVerdictPolicy,
}

/// Debounced alert controller.
///
/// | state   | drowsy  | not drowsy      |
/// |---------|---------|-----------------|
/// | Idle    | start   | -               |
/// | Playing | -       | stop + rewind   |
pub struct AlertStateMachine<S: AlertSink> {
    sink: S,
    state: AlertState,
    policy: UnknownVerdictPolicy,
}

impl<S: AlertSink> AlertStateMachine<S> {
    /// Create an idle state machine driving `sink`
    pub fn new(sink: S, config: &AlertConfig) -> Self {
        info!(
            "Creating alert state machine (unknown verdicts: {:?})",
            config.unknown_policy
        );
        Self {
            sink,
            state: AlertState::Idle,
            policy: config.unknown_policy,
        }
    }

    /// Current state
    pub fn state(&self) -> AlertState {
        self.state
    }

    /// Policy applied to unknown verdicts
    pub fn policy(&self) -> UnknownVerdictPolicy {
        self.policy
    }

    /// The alert resource
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Apply a detection result
    pub fn apply(&mut self, result: &DetectionResult) -> AlertAction {
        match result {
            DetectionResult::Drowsy => self.on_verdict(true),
            DetectionResult::Awake => self.on_verdict(false),
            DetectionResult::Unknown(reason) => match self.policy {
                UnknownVerdictPolicy::FailOpen => {
                    debug!("No verdict ({}), treating as not drowsy", reason);
                    self.on_verdict(false)
                }
                UnknownVerdictPolicy::Hold => {
                    debug!("No verdict ({}), holding {:?}", reason, self.state);
                    AlertAction::NoOp
                }
            },
        }
    }

    /// Apply a confirmed verdict
    pub fn on_verdict(&mut self, drowsy: bool) -> AlertAction {
        match (self.state, drowsy) {
            (AlertState::Idle, true) => {
                self.sink.start();
                self.state = AlertState::Playing;
                warn!("Drowsiness detected, alert started");
                AlertAction::Started
            }
            (AlertState::Playing, false) => {
                self.silence();
                info!("Driver awake, alert stopped");
                AlertAction::Stopped
            }
            (AlertState::Playing, true) | (AlertState::Idle, false) => AlertAction::NoOp,
        }
    }

    /// Return to idle at the end of a capture session
    pub fn reset(&mut self) -> AlertAction {
        if self.state == AlertState::Playing {
            self.silence();
            info!("Alert reset at session end");
            AlertAction::Stopped
        } else {
            AlertAction::NoOp
        }
    }

    fn silence(&mut self) {
        self.sink.stop();
        self.sink.rewind();
        self.state = AlertState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inference_client::FailureReason;
    use proptest::prelude::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Call {
        Start,
        Stop,
        Rewind,
    }

    #[derive(Default)]
    struct RecordingSink {
        calls: Vec<Call>,
    }

    impl AlertSink for RecordingSink {
        fn start(&mut self) {
            self.calls.push(Call::Start);
        }

        fn stop(&mut self) {
            self.calls.push(Call::Stop);
        }

        fn rewind(&mut self) {
            self.calls.push(Call::Rewind);
        }
    }

    fn machine(policy: UnknownVerdictPolicy) -> AlertStateMachine<RecordingSink> {
        AlertStateMachine::new(
            RecordingSink::default(),
            &AlertConfig {
                unknown_policy: policy,
            },
        )
    }

    fn network_failure() -> DetectionResult {
        DetectionResult::Unknown(FailureReason::Transport("connection refused".into()))
    }

    #[test]
    fn test_repeated_drowsy_starts_once() {
        let mut alert = machine(UnknownVerdictPolicy::FailOpen);

        let actions: Vec<_> = [
            DetectionResult::Drowsy,
            DetectionResult::Drowsy,
            DetectionResult::Awake,
        ]
        .iter()
        .map(|r| alert.apply(r))
        .collect();

        assert_eq!(
            actions,
            vec![AlertAction::Started, AlertAction::NoOp, AlertAction::Stopped]
        );
        assert_eq!(alert.sink().calls, vec![Call::Start, Call::Stop, Call::Rewind]);
        assert_eq!(alert.state(), AlertState::Idle);
    }

    #[test]
    fn test_awake_while_idle_is_noop() {
        let mut alert = machine(UnknownVerdictPolicy::FailOpen);
        assert_eq!(alert.apply(&DetectionResult::Awake), AlertAction::NoOp);
        assert!(alert.sink().calls.is_empty());
    }

    #[test]
    fn test_fail_open_stops_alert_on_network_failure() {
        let mut alert = machine(UnknownVerdictPolicy::FailOpen);
        alert.apply(&DetectionResult::Drowsy);

        assert_eq!(alert.apply(&network_failure()), AlertAction::Stopped);
        assert_eq!(alert.state(), AlertState::Idle);
    }

    #[test]
    fn test_hold_keeps_alert_on_network_failure() {
        let mut alert = machine(UnknownVerdictPolicy::Hold);
        alert.apply(&DetectionResult::Drowsy);

        assert_eq!(alert.apply(&network_failure()), AlertAction::NoOp);
        assert_eq!(alert.state(), AlertState::Playing);
        assert_eq!(alert.sink().calls, vec![Call::Start]);
    }

    #[test]
    fn test_reset() {
        let mut alert = machine(UnknownVerdictPolicy::FailOpen);
        assert_eq!(alert.reset(), AlertAction::NoOp);

        alert.apply(&DetectionResult::Drowsy);
        assert_eq!(alert.reset(), AlertAction::Stopped);
        assert_eq!(alert.state(), AlertState::Idle);
        assert_eq!(alert.sink().calls, vec![Call::Start, Call::Stop, Call::Rewind]);
    }

    fn verdicts() -> impl Strategy<Value = Vec<DetectionResult>> {
        proptest::collection::vec(
            prop_oneof![
                Just(DetectionResult::Drowsy),
                Just(DetectionResult::Awake),
                Just(DetectionResult::Unknown(FailureReason::Status(503))),
            ],
            0..64,
        )
    }

    proptest! {
        #[test]
        fn prop_never_two_consecutive_starts(results in verdicts(), hold in any::<bool>()) {
            let policy = if hold {
                UnknownVerdictPolicy::Hold
            } else {
                UnknownVerdictPolicy::FailOpen
            };
            let mut alert = machine(policy);
            for result in &results {
                alert.apply(result);
            }

            let starts_and_stops: Vec<Call> = alert
                .sink()
                .calls
                .iter()
                .copied()
                .filter(|c| *c != Call::Rewind)
                .collect();
            for pair in starts_and_stops.windows(2) {
                prop_assert_ne!(pair[0], pair[1]);
            }
            if let Some(first) = starts_and_stops.first() {
                prop_assert_eq!(*first, Call::Start);
            }
            let playing = alert.state() == AlertState::Playing;
            prop_assert_eq!(playing, starts_and_stops.last() == Some(&Call::Start));
        }
    }
}
