use std::{
    fs::File,
    io,
    path::{Path, PathBuf},
};

use tethersend_core::{
    client::{FtpClient, FtpClientError},
    types::ArchiveMode,
};
use thiserror::Error;

use crate::archive::archive;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Unable to open '{0}': {1}")]
    Open(PathBuf, io::Error),
    #[error("Transfer of '{0}' failed: {1}")]
    Transfer(PathBuf, FtpClientError),
    #[error("'{0}' was sent but can't be archived: {1}")]
    Archive(PathBuf, io::Error),
}

pub struct Uploader {
    sent_folder: PathBuf,
    mode: ArchiveMode,
}

impl Uploader {
    pub fn new(sent_folder: PathBuf, mode: ArchiveMode) -> Self {
        Self { sent_folder, mode }
    }

    /// Transmit `picture` then archive it into sent folder. Picture stays in
    /// raw folder if transmission fails.
    pub fn send(&self, picture: &Path, ftp: &mut dyn FtpClient) -> Result<PathBuf, UploadError> {
        let remote_name = picture
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                UploadError::Open(
                    picture.to_path_buf(),
                    io::Error::new(io::ErrorKind::InvalidInput, "No utf8 file name"),
                )
            })?;

        let mut file =
            File::open(picture).map_err(|error| UploadError::Open(picture.to_path_buf(), error))?;
        let size = ftp
            .store_binary(remote_name, &mut file)
            .map_err(|error| UploadError::Transfer(picture.to_path_buf(), error))?;
        drop(file);
        log::debug!("Sent '{}' ({} bytes)", picture.display(), size);

        let archived = archive(picture, &self.sent_folder, self.mode)
            .map_err(|error| UploadError::Archive(picture.to_path_buf(), error))?;
        log::info!("Picture {} sent and archived", remote_name);
        Ok(archived)
    }
}
