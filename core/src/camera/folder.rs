//! Camera seen through a folder: a mounted camera storage or the output
//! folder of a tethering tool. Every file appearing in the folder is a
//! captured picture.
use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::mpsc::{channel, Receiver, RecvTimeoutError},
    time::Duration,
};

use notify::{watcher, DebouncedEvent, RecommendedWatcher, RecursiveMode, Watcher};
use tempfile::NamedTempFile;

use crate::{
    types::{CameraEvent, CaptureEvent},
    utils::ignore_file,
};

use super::{Camera, CameraConnector, CameraError};

pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(2);

pub struct FolderCameraConnector {
    folder: PathBuf,
    settle_delay: Duration,
}

impl FolderCameraConnector {
    pub fn new(folder: PathBuf) -> Self {
        Self {
            folder,
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }

    /// Delay during which file writes are merged before the file is reported.
    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }
}

impl CameraConnector for FolderCameraConnector {
    fn connect(&self) -> Result<Box<dyn Camera>, CameraError> {
        if !self.folder.is_dir() {
            return Err(CameraError::NotFound(format!(
                "Folder '{}' is not present",
                self.folder.display()
            )));
        }
        let folder = fs::canonicalize(&self.folder)?;

        let (sender, receiver) = channel();
        let mut watcher = watcher(sender, self.settle_delay)
            .map_err(|error| CameraError::NotFound(format!("Unable to watch folder: {}", error)))?;
        watcher
            .watch(&folder, RecursiveMode::NonRecursive)
            .map_err(|error| CameraError::NotFound(format!("Unable to watch folder: {}", error)))?;

        log::debug!("Watching camera folder '{}'", folder.display());
        Ok(Box::new(FolderCamera {
            folder,
            watcher: Some(watcher),
            receiver,
        }))
    }
}

pub struct FolderCamera {
    folder: PathBuf,
    watcher: Option<RecommendedWatcher>,
    receiver: Receiver<DebouncedEvent>,
}

impl FolderCamera {
    fn ensure_present(&self) -> Result<(), CameraError> {
        if self.watcher.is_none() {
            return Err(CameraError::Disconnected("Camera was released".to_string()));
        }
        if !self.folder.is_dir() {
            return Err(CameraError::Disconnected(format!(
                "Folder '{}' disappeared",
                self.folder.display()
            )));
        }
        Ok(())
    }

    fn digest_event(&self, event: DebouncedEvent) -> Result<CameraEvent, CameraError> {
        match event {
            DebouncedEvent::Create(path) | DebouncedEvent::Rename(_, path) => {
                if path.parent() != Some(self.folder.as_path()) || ignore_file(&path) {
                    return Ok(CameraEvent::Unknown(format!("{}", path.display())));
                }
                if path.is_dir() {
                    return Ok(CameraEvent::FolderAdded(path.display().to_string()));
                }
                let name = match path.file_name().and_then(|name| name.to_str()) {
                    Some(name) => name.to_string(),
                    None => {
                        return Ok(CameraEvent::Unknown(format!(
                            "Not utf8 file name {}",
                            path.display()
                        )))
                    }
                };
                Ok(CameraEvent::FileAdded(CaptureEvent::new(
                    self.folder.display().to_string(),
                    name,
                )))
            }
            DebouncedEvent::Remove(path) | DebouncedEvent::NoticeRemove(path)
                if path == self.folder =>
            {
                Err(CameraError::Disconnected(format!(
                    "Folder '{}' removed",
                    self.folder.display()
                )))
            }
            DebouncedEvent::Error(error, _) => Err(CameraError::Disconnected(format!(
                "Watch error: {}",
                error
            ))),
            other => Ok(CameraEvent::Unknown(format!("{:?}", other))),
        }
    }
}

impl Camera for FolderCamera {
    fn wait_for_event(&mut self, timeout: Duration) -> Result<CameraEvent, CameraError> {
        self.ensure_present()?;

        match self.receiver.recv_timeout(timeout) {
            Ok(event) => self.digest_event(event),
            Err(RecvTimeoutError::Timeout) => {
                self.ensure_present()?;
                Ok(CameraEvent::Timeout)
            }
            Err(RecvTimeoutError::Disconnected) => Err(CameraError::Disconnected(
                "Folder watcher stopped".to_string(),
            )),
        }
    }

    fn save_file(
        &mut self,
        capture: &CaptureEvent,
        destination: &Path,
    ) -> Result<(), CameraError> {
        let source = Path::new(&capture.folder).join(&capture.name);
        let mut source_file = match fs::File::open(&source) {
            Ok(file) => file,
            Err(error) => {
                self.ensure_present()?;
                return Err(CameraError::Io(error));
            }
        };

        let destination_folder = destination.parent().unwrap_or_else(|| Path::new("."));
        let mut temporary = NamedTempFile::new_in(destination_folder)?;
        io::copy(&mut source_file, &mut temporary)?;
        temporary
            .persist(destination)
            .map_err(|error| CameraError::Io(error.error))?;

        log::debug!("Saved {} into '{}'", capture, destination.display());
        Ok(())
    }

    fn exit(&mut self) -> Result<(), CameraError> {
        self.watcher.take();
        Ok(())
    }
}
