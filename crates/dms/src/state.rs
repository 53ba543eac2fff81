//! Driver status as presented to the user

use alerting::UnknownVerdictPolicy;
use inference_client::DetectionResult;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What the status display shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DriverStatus {
    #[default]
    Awake,
    Drowsy,
    /// The last verdict could not be obtained and is being held
    Unknown,
}

impl DriverStatus {
    /// Status for a detection result under the given unknown-verdict policy
    pub fn from_result(result: &DetectionResult, policy: UnknownVerdictPolicy) -> Self {
        match result {
            DetectionResult::Drowsy => DriverStatus::Drowsy,
            DetectionResult::Awake => DriverStatus::Awake,
            DetectionResult::Unknown(_) => match policy {
                UnknownVerdictPolicy::FailOpen => DriverStatus::Awake,
                UnknownVerdictPolicy::Hold => DriverStatus::Unknown,
            },
        }
    }
}

impl fmt::Display for DriverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DriverStatus::Awake => "Awake",
            DriverStatus::Drowsy => "Drowsy",
            DriverStatus::Unknown => "Unknown",
        };
        write!(f, "Status: {}", label)
    }
}

/// Status output owned by the presenter
pub trait StatusDisplay: Send + 'static {
    fn show(&mut self, status: DriverStatus);
}

#[cfg(test)]
mod tests {
    use super::*;
    use inference_client::FailureReason;

    #[test]
    fn test_status_text() {
        assert_eq!(DriverStatus::Drowsy.to_string(), "Status: Drowsy");
        assert_eq!(DriverStatus::Awake.to_string(), "Status: Awake");
        assert_eq!(DriverStatus::Unknown.to_string(), "Status: Unknown");
        assert_eq!(DriverStatus::default(), DriverStatus::Awake);
    }

    #[test]
    fn test_unknown_result_follows_policy() {
        let failed = DetectionResult::Unknown(FailureReason::Status(502));

        assert_eq!(
            DriverStatus::from_result(&failed, UnknownVerdictPolicy::FailOpen),
            DriverStatus::Awake
        );
        assert_eq!(
            DriverStatus::from_result(&failed, UnknownVerdictPolicy::Hold),
            DriverStatus::Unknown
        );
        assert_eq!(
            DriverStatus::from_result(&DetectionResult::Drowsy, UnknownVerdictPolicy::Hold),
            DriverStatus::Drowsy
        );
    }
}
