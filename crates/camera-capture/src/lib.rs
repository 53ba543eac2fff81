//! Camera Capture Library for the Drowsiness Monitor
//!
//! Provides the camera-side half of the pipeline:
//! - Planar YUV 4:2:0 frames as delivered by a front-facing sensor
//! - Frame extraction (NV21 interleave, RGB conversion, rotation, mirroring, JPEG)
//! - Frame sources: a push-based source for platform callbacks and a
//!   replay source that streams raw I420 files from disk

pub mod extract;
pub mod frame;
pub mod replay;
pub mod source;

pub use extract::{FrameExtractor, JPEG_QUALITY};
pub use frame::{EncodedImage, Frame, Plane, Rotation};
pub use replay::ReplaySource;
pub use source::{Delivery, FrameFeeder, FrameSource, ManualSource};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Camera error types
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Camera unavailable: {0}")]
    Unavailable(String),

    #[error("Lens {0:?} is not supported by this source")]
    UnsupportedLens(LensFacing),

    #[error("Camera already bound")]
    AlreadyBound,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors while turning a raw frame into an encoded image
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Frame has zero dimensions ({width}x{height})")]
    EmptyFrame { width: u32, height: u32 },

    #[error("{plane} plane too small: expected at least {expected} bytes, got {actual}")]
    PlaneTooSmall {
        plane: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{plane} plane has invalid strides (row {row_stride}, pixel {pixel_stride})")]
    InvalidStride {
        plane: &'static str,
        row_stride: usize,
        pixel_stride: usize,
    },

    #[error("Unsupported rotation: {0} degrees")]
    UnsupportedRotation(u32),

    #[error("JPEG encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

/// Which way the sensor faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LensFacing {
    /// Selfie sensor pointed at the driver
    #[default]
    Front,
    /// Rear sensor
    Back,
}

/// Camera configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Sensor to bind
    pub lens: LensFacing,
    /// Mirror frames horizontally (front sensor convention)
    pub mirror: bool,
    /// Directory of raw I420 clips for the replay source
    pub replay_dir: PathBuf,
    /// Delivery rate of the replay source
    pub fps: u32,
    /// Restart the replay when the last clip has been delivered
    pub loop_replay: bool,
    /// Frames buffered between the source and the capture worker
    pub frame_channel_capacity: usize,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            lens: LensFacing::Front,
            mirror: true,
            replay_dir: PathBuf::from("frames"),
            fps: 15,
            loop_replay: true,
            frame_channel_capacity: 1,
        }
    }
}

impl CameraConfig {
    /// Delay between two replayed frames
    pub fn frame_interval(&self) -> std::time::Duration {
        std::time::Duration::from_micros((1_000_000 / u64::from(self.fps.max(1))).max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_targets_front_sensor() {
        let config = CameraConfig::default();
        assert_eq!(config.lens, LensFacing::Front);
        assert!(config.mirror);
        assert_eq!(config.frame_channel_capacity, 1);
    }

    #[test]
    fn test_frame_interval() {
        let config = CameraConfig {
            fps: 20,
            ..Default::default()
        };
        assert_eq!(config.frame_interval().as_millis(), 50);

        let zero = CameraConfig {
            fps: 0,
            ..Default::default()
        };
        assert_eq!(zero.frame_interval().as_secs(), 1);
    }

    #[test]
    fn test_frame_interval_is_never_zero() {
        let fast = CameraConfig {
            fps: 2_000_000,
            ..Default::default()
        };
        assert_eq!(fast.frame_interval().as_micros(), 1);

        let max = CameraConfig {
            fps: u32::MAX,
            ..Default::default()
        };
        assert!(!max.frame_interval().is_zero());
    }
}
