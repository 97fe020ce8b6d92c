use std::fmt::Display;

use strum_macros::{Display as StrumDisplay, EnumString};

/// A file newly created on the camera storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureEvent {
    pub folder: String,
    pub name: String,
}

impl CaptureEvent {
    pub fn new(folder: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            folder: folder.into(),
            name: name.into(),
        }
    }
}

impl Display for CaptureEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.folder.trim_end_matches('/'), self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraEvent {
    Timeout,
    FileAdded(CaptureEvent),
    FolderAdded(String),
    CaptureComplete,
    Unknown(String),
}

/// How a capture is named once saved into the raw folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, StrumDisplay, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Naming {
    /// Keep the name given by the camera.
    Camera,
    /// `capt####.jpg`, following the highest number already stored locally.
    Sequential,
}

/// How an uploaded picture reaches the sent folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, StrumDisplay, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ArchiveMode {
    Move,
    Copy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, StrumDisplay, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum CameraBackend {
    Folder,
    Gphoto2,
}

#[cfg(test)]
mod test {
    use super::*;
    use rstest::*;
    use std::str::FromStr;

    #[rstest]
    #[case("move", ArchiveMode::Move)]
    #[case("copy", ArchiveMode::Copy)]
    fn test_archive_mode_from_str(#[case] raw: &str, #[case] expected: ArchiveMode) {
        assert_eq!(ArchiveMode::from_str(raw).unwrap(), expected);
        assert_eq!(expected.to_string(), raw);
    }

    #[test]
    fn test_unknown_naming() {
        assert!(Naming::from_str("random").is_err());
    }

    #[test]
    fn test_capture_display() {
        assert_eq!(
            CaptureEvent::new("/store_00010001/DCIM/100CANON/", "IMG_0001.JPG").to_string(),
            "/store_00010001/DCIM/100CANON/IMG_0001.JPG"
        );
    }
}
