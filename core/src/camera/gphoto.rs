//! USB tethered camera through libgphoto2.
use std::{path::Path, time::Duration};

use gphoto2::{camera::CameraEvent as GphotoEvent, Context};

use crate::types::{CameraEvent, CaptureEvent};

use super::{Camera, CameraConnector, CameraError};

impl From<gphoto2::Error> for CameraError {
    fn from(error: gphoto2::Error) -> Self {
        match error.kind() {
            gphoto2::error::ErrorKind::ModelNotFound => CameraError::NotFound(error.to_string()),
            gphoto2::error::ErrorKind::NotSupported => CameraError::Unsupported(error.to_string()),
            _ => CameraError::Disconnected(error.to_string()),
        }
    }
}

pub struct GphotoCameraConnector;

impl CameraConnector for GphotoCameraConnector {
    fn connect(&self) -> Result<Box<dyn Camera>, CameraError> {
        let context = Context::new()?;
        let camera = context.autodetect_camera().wait()?;
        log::debug!("Connected to camera {}", camera.abilities().model());
        Ok(Box::new(GphotoCamera {
            camera: Some(camera),
        }))
    }
}

pub struct GphotoCamera {
    camera: Option<gphoto2::Camera>,
}

impl GphotoCamera {
    fn camera(&self) -> Result<&gphoto2::Camera, CameraError> {
        self.camera
            .as_ref()
            .ok_or_else(|| CameraError::Disconnected("Camera was released".to_string()))
    }
}

impl Camera for GphotoCamera {
    fn wait_for_event(&mut self, timeout: Duration) -> Result<CameraEvent, CameraError> {
        let event = self.camera()?.wait_event(timeout).wait()?;
        Ok(match event {
            GphotoEvent::Timeout => CameraEvent::Timeout,
            GphotoEvent::NewFile(path) => {
                CameraEvent::FileAdded(CaptureEvent::new(path.folder(), path.name()))
            }
            GphotoEvent::NewFolder(path) => CameraEvent::FolderAdded(path.folder().to_string()),
            GphotoEvent::CaptureComplete => CameraEvent::CaptureComplete,
            other => CameraEvent::Unknown(format!("{:?}", other)),
        })
    }

    fn save_file(
        &mut self,
        capture: &CaptureEvent,
        destination: &Path,
    ) -> Result<(), CameraError> {
        self.camera()?
            .fs()
            .download_to(&capture.folder, &capture.name, destination)
            .wait()?;
        Ok(())
    }

    fn exit(&mut self) -> Result<(), CameraError> {
        self.camera.take();
        Ok(())
    }
}
