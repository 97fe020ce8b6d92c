use std::{io, path::Path, time::Duration};

use mockall::automock;
use thiserror::Error;

use crate::types::{CameraEvent, CaptureEvent};

pub mod folder;
#[cfg(feature = "gphoto2")]
pub mod gphoto;

#[derive(Debug, Error)]
pub enum CameraError {
    #[error("No camera found: {0}")]
    NotFound(String),
    #[error("Camera disconnected: {0}")]
    Disconnected(String),
    #[error("Camera io error: {0}")]
    Io(#[from] io::Error),
    #[error("Unsupported camera setup: {0}")]
    Unsupported(String),
}

impl CameraError {
    /// Whether a new connection attempt may succeed.
    pub fn is_transient(&self) -> bool {
        !matches!(self, CameraError::Unsupported(_))
    }
}

/// An established camera connection.
#[automock]
pub trait Camera {
    /// Block until an event occurs or `timeout` elapses.
    fn wait_for_event(&mut self, timeout: Duration) -> Result<CameraEvent, CameraError>;
    /// Retrieve captured file from camera storage into `destination`.
    fn save_file(&mut self, capture: &CaptureEvent, destination: &Path)
        -> Result<(), CameraError>;
    /// Release the camera.
    fn exit(&mut self) -> Result<(), CameraError>;
}

#[automock]
pub trait CameraConnector {
    fn connect(&self) -> Result<Box<dyn Camera>, CameraError>;
}
