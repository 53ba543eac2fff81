//! Frame sources
//!
//! A source owns the camera binding and pushes frames into a bounded channel.
//! Delivery never blocks: when the consumer has not picked up the previous
//! frame the new one is dropped.

use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::{CameraError, Frame, LensFacing};

/// Camera subsystem seam used by the capture session
pub trait FrameSource: Send + 'static {
    /// Bind the sensor and start delivering frames
    fn bind(&mut self, lens: LensFacing) -> Result<mpsc::Receiver<Frame>, CameraError>;

    /// Stop delivery and release every camera use-case
    fn unbind_all(&mut self);
}

/// Outcome of handing a frame to a source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Frame queued for the capture worker
    Accepted,
    /// Worker still busy with an earlier frame; this one was dropped
    Dropped,
    /// No session is bound
    Unbound,
}

type SharedSender = Arc<Mutex<Option<mpsc::Sender<Frame>>>>;

/// Push-based source for platform camera callbacks.
///
/// The platform binding holds a [`FrameFeeder`] and calls
/// [`FrameFeeder::deliver`] from its frame callback. Only the front sensor
/// can be bound.
pub struct ManualSource {
    capacity: usize,
    sender: SharedSender,
}

impl ManualSource {
    /// Create a source buffering at most `capacity` undelivered frames
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            sender: Arc::new(Mutex::new(None)),
        }
    }

    /// Handle used to push frames into the source
    pub fn feeder(&self) -> FrameFeeder {
        FrameFeeder {
            sender: self.sender.clone(),
        }
    }
}

impl FrameSource for ManualSource {
    fn bind(&mut self, lens: LensFacing) -> Result<mpsc::Receiver<Frame>, CameraError> {
        if lens != LensFacing::Front {
            return Err(CameraError::UnsupportedLens(lens));
        }

        let mut slot = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return Err(CameraError::AlreadyBound);
        }

        let (tx, rx) = mpsc::channel(self.capacity);
        *slot = Some(tx);
        info!("Manual source bound to {:?} lens", lens);
        Ok(rx)
    }

    fn unbind_all(&mut self) {
        let mut slot = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.take().is_some() {
            info!("Manual source unbound");
        }
    }
}

/// Cloneable handle that delivers frames into a [`ManualSource`]
#[derive(Clone)]
pub struct FrameFeeder {
    sender: SharedSender,
}

impl FrameFeeder {
    /// Deliver a frame without blocking
    pub fn deliver(&self, frame: Frame) -> Delivery {
        let slot = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(tx) = slot.as_ref() else {
            return Delivery::Unbound;
        };

        match tx.try_send(frame) {
            Ok(()) => Delivery::Accepted,
            Err(mpsc::error::TrySendError::Full(frame)) => {
                debug!("Dropping frame {}: worker busy", frame.sequence);
                Delivery::Dropped
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Delivery::Unbound,
        }
    }
}
