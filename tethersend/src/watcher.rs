use std::time::Duration;

use tethersend_core::{
    camera::{Camera, CameraError},
    types::{CameraEvent, CaptureEvent},
};

pub const DEFAULT_EVENT_TIMEOUT: Duration = Duration::from_millis(3000);

pub struct EventWatcher {
    timeout: Duration,
}

impl EventWatcher {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Wait for next captured file. `None` when wait timed out or when the
    /// camera reported something else than a new file.
    pub fn wait(&self, camera: &mut dyn Camera) -> Result<Option<CaptureEvent>, CameraError> {
        match camera.wait_for_event(self.timeout)? {
            CameraEvent::FileAdded(capture) => {
                log::info!("New capture {}", capture);
                Ok(Some(capture))
            }
            CameraEvent::Timeout => Ok(None),
            other => {
                log::debug!("Ignore camera event {:?}", other);
                Ok(None)
            }
        }
    }
}

impl Default for EventWatcher {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_TIMEOUT)
    }
}
