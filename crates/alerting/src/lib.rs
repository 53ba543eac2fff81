//! Alerting System
//!
//! Maps detection verdicts onto start/stop decisions for a single audible
//! alert, debouncing repeated "drowsy" verdicts.

mod machine;

pub use machine::{
    AlertAction, AlertConfig, AlertSink, AlertState, AlertStateMachine, UnknownVerdictPolicy,
};
