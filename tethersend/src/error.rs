use std::{io, path::PathBuf};

use tethersend_core::{camera::CameraError, client::FtpClientError};
use thiserror::Error;

use crate::{retry::RetryError, upload::UploadError};

pub const EXIT_INTERRUPTED: i32 = 0;
pub const EXIT_RETRY_BUDGET_EXCEEDED: i32 = 1;
pub const EXIT_FAILURE: i32 = 2;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Startup error: {0:#}")]
    Startup(#[from] anyhow::Error),
    #[error("Unable to prepare folder {0}: {1}")]
    Folder(PathBuf, io::Error),
    #[error("Unable to prepare picture {0}: {1}")]
    Picture(PathBuf, io::Error),
    #[error("Camera connection: {0}")]
    CameraConnection(#[from] RetryError<CameraError>),
    #[error("Ftp connection: {0}")]
    FtpConnection(#[from] RetryError<FtpClientError>),
    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),
    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),
}

impl Error {
    pub fn is_interrupted(&self) -> bool {
        matches!(
            self,
            Error::CameraConnection(RetryError::Interrupted(_))
                | Error::FtpConnection(RetryError::Interrupted(_))
        )
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Error::CameraConnection(RetryError::Interrupted(_))
            | Error::FtpConnection(RetryError::Interrupted(_)) => EXIT_INTERRUPTED,
            Error::CameraConnection(RetryError::BudgetExceeded { .. })
            | Error::FtpConnection(RetryError::BudgetExceeded { .. }) => {
                EXIT_RETRY_BUDGET_EXCEEDED
            }
            _ => EXIT_FAILURE,
        }
    }
}
