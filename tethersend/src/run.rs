use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tethersend_core::camera::{Camera, CameraConnector, CameraError};
use tethersend_core::client::{FtpClient, FtpConnector};
use tethersend_core::types::CaptureEvent;

use crate::archive::{clear_sent_mark, local_name, pending_pictures};
use crate::context::Context;
use crate::error::Error;
use crate::retry::retry;
use crate::upload::{UploadError, Uploader};
use crate::watcher::EventWatcher;

#[derive(Debug)]
enum State {
    Disconnected,
    Idle,
    Saving(CaptureEvent),
    Uploading(PathBuf),
    ReconnectingCamera,
}

pub struct Runner<'a> {
    context: &'a Context,
    camera_connector: &'a dyn CameraConnector,
    ftp_connector: &'a dyn FtpConnector,
    stop_signal: Arc<AtomicBool>,
    watcher: EventWatcher,
    uploader: Uploader,
    camera: Option<Box<dyn Camera>>,
    ftp: Option<Box<dyn FtpClient>>,
}

/// Watch camera and upload its captures until stop signal. Connections are
/// always closed before returning.
pub fn run(
    context: &Context,
    camera_connector: &dyn CameraConnector,
    ftp_connector: &dyn FtpConnector,
    stop_signal: Arc<AtomicBool>,
) -> Result<(), Error> {
    let mut runner = Runner::new(context, camera_connector, ftp_connector, stop_signal);
    let result = runner.run();
    runner.close();

    match result {
        Err(error) if error.is_interrupted() => {
            log::info!("{}", error);
            Ok(())
        }
        other => other,
    }
}

impl<'a> Runner<'a> {
    pub fn new(
        context: &'a Context,
        camera_connector: &'a dyn CameraConnector,
        ftp_connector: &'a dyn FtpConnector,
        stop_signal: Arc<AtomicBool>,
    ) -> Self {
        Self {
            context,
            camera_connector,
            ftp_connector,
            stop_signal,
            watcher: EventWatcher::new(context.event_timeout),
            uploader: Uploader::new(context.sent_folder.clone(), context.archive_mode),
            camera: None,
            ftp: None,
        }
    }

    fn stopped(&self) -> bool {
        self.stop_signal.load(Ordering::Relaxed)
    }

    pub fn run(&mut self) -> Result<(), Error> {
        let mut state = State::Disconnected;

        loop {
            if self.stopped() {
                log::info!("Stop requested");
                return Ok(());
            }

            log::trace!("State {:?}", state);
            state = match state {
                State::Disconnected => {
                    self.prepare_folders()?;
                    if !self.context.exit_after_flush {
                        self.camera = Some(self.connect_camera()?);
                    }
                    self.ftp = Some(self.connect_ftp()?);
                    self.flush_pending()?;
                    if self.context.exit_after_flush {
                        log::info!("Pending pictures flushed");
                        return Ok(());
                    }
                    log::info!("Waiting for captures");
                    State::Idle
                }
                State::Idle => match self.wait_capture() {
                    Ok(Some(capture)) => State::Saving(capture),
                    Ok(None) => State::Idle,
                    Err(CameraError::Disconnected(message)) => {
                        log::warn!("Camera disconnected ({}), reconnect it", message);
                        State::ReconnectingCamera
                    }
                    Err(error) => return Err(error.into()),
                },
                State::Saving(capture) => match self.save(&capture) {
                    Ok(picture) => State::Uploading(picture),
                    Err(Error::Camera(CameraError::Disconnected(message))) => {
                        log::warn!(
                            "Camera disconnected while saving {} ({}), capture is lost",
                            capture,
                            message
                        );
                        State::ReconnectingCamera
                    }
                    Err(error) => return Err(error),
                },
                State::Uploading(picture) => {
                    self.upload(&picture)?;
                    State::Idle
                }
                State::ReconnectingCamera => {
                    self.release_camera();
                    self.camera = Some(self.connect_camera()?);
                    log::info!("Camera reconnected, waiting for captures");
                    State::Idle
                }
            };
        }
    }

    fn prepare_folders(&self) -> Result<(), Error> {
        for folder in [&self.context.raw_folder, &self.context.sent_folder] {
            fs::create_dir_all(folder).map_err(|error| Error::Folder(folder.clone(), error))?;
        }
        Ok(())
    }

    fn connect_camera(&self) -> Result<Box<dyn Camera>, Error> {
        log::info!("Connect camera");
        let camera = retry(
            "Camera",
            &self.context.connect_policy,
            &self.stop_signal,
            || self.camera_connector.connect(),
        )?;
        Ok(camera)
    }

    fn connect_ftp(&self) -> Result<Box<dyn FtpClient>, Error> {
        log::info!(
            "Connect ftp server {}:{}",
            self.context.host,
            self.context.port
        );
        let ftp = retry(
            "Ftp server",
            &self.context.connect_policy,
            &self.stop_signal,
            || self.ftp_connector.connect(),
        )?;
        Ok(ftp)
    }

    fn wait_capture(&mut self) -> Result<Option<CaptureEvent>, CameraError> {
        match self.camera.as_deref_mut() {
            Some(camera) => self.watcher.wait(camera),
            None => Err(CameraError::Disconnected("No camera connection".to_string())),
        }
    }

    fn save(&mut self, capture: &CaptureEvent) -> Result<PathBuf, Error> {
        let name = local_name(
            self.context.naming,
            capture,
            &[
                self.context.sent_folder.as_path(),
                self.context.raw_folder.as_path(),
            ],
        );
        let destination = self.context.raw_folder.join(name);
        clear_sent_mark(&destination)
            .map_err(|error| Error::Picture(destination.clone(), error))?;

        match self.camera.as_deref_mut() {
            Some(camera) => camera.save_file(capture, &destination)?,
            None => {
                return Err(CameraError::Disconnected("No camera connection".to_string()).into())
            }
        };

        log::info!("Capture {} saved as '{}'", capture, destination.display());
        Ok(destination)
    }

    fn flush_pending(&mut self) -> Result<(), Error> {
        let pending = pending_pictures(&self.context.raw_folder);
        if pending.is_empty() {
            return Ok(());
        }

        log::info!("{} pending picture(s) to send", pending.len());
        for picture in pending {
            if self.stopped() {
                break;
            }
            self.upload(&picture)?;
        }
        Ok(())
    }

    fn upload(&mut self, picture: &Path) -> Result<(), Error> {
        let attempts = self.context.upload_attempts.max(1);

        for attempt in 1..=attempts {
            let ftp = match self.ftp.take() {
                Some(ftp) => ftp,
                None => self.connect_ftp()?,
            };
            let ftp = self.ftp.insert(ftp);

            match self.uploader.send(picture, &mut **ftp) {
                Ok(_) => return Ok(()),
                Err(UploadError::Transfer(_, error)) => {
                    // Connection state is unknown after a failed transfer
                    self.ftp = None;
                    if attempt < attempts {
                        log::warn!(
                            "Upload of '{}' failed (attempt {}/{}): {}, reconnect",
                            picture.display(),
                            attempt,
                            attempts,
                            error
                        );
                        continue;
                    }
                    return self.upload_failed(UploadError::Transfer(picture.to_path_buf(), error));
                }
                Err(error) => return self.upload_failed(error),
            }
        }

        Ok(())
    }

    fn upload_failed(&self, error: UploadError) -> Result<(), Error> {
        if self.context.abort_on_upload_failure {
            return Err(error.into());
        }

        log::error!(
            "{}, picture stays in '{}' until next start",
            error,
            self.context.raw_folder.display()
        );
        Ok(())
    }

    fn release_camera(&mut self) {
        if let Some(mut camera) = self.camera.take() {
            if let Err(error) = camera.exit() {
                log::debug!("Error when releasing camera: {}", error);
            }
        }
    }

    pub fn close(&mut self) {
        if let Some(mut ftp) = self.ftp.take() {
            log::info!("Close ftp connection");
            if let Err(error) = ftp.quit() {
                log::warn!("Error when closing ftp connection: {}", error);
            }
        }
        if self.camera.is_some() {
            log::info!("Release camera");
            self.release_camera();
        }
    }
}
