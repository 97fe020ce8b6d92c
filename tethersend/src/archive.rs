use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::OnceLock,
};

use regex::Regex;
use tethersend_core::{
    types::{ArchiveMode, CaptureEvent, Naming},
    utils::ignore_file,
};
use walkdir::WalkDir;

pub const CAPTURE_PREFIX: &str = "capt";
pub const CAPTURE_EXTENSION: &str = "jpg";

fn capture_name_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"^capt(\d{4,18})\.(?i:jpg)$").expect("Capture name regex must be valid")
    })
}

pub fn capture_name(number: u64) -> String {
    format!("{}{:04}.{}", CAPTURE_PREFIX, number, CAPTURE_EXTENSION)
}

/// Number carried by a `capt####.jpg` file name.
pub fn capture_number(file_name: &str) -> Option<u64> {
    capture_name_regex()
        .captures(file_name)
        .and_then(|captures| captures.get(1))
        .and_then(|number| number.as_str().parse::<u64>().ok())
}

fn file_names(folder: &Path) -> impl Iterator<Item = String> {
    WalkDir::new(folder)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
}

/// Next free sequential capture name according to `sent_folder` content,
/// `capt0000.jpg` when no capture file is found there.
pub fn next_local_name(sent_folder: &Path) -> String {
    next_local_name_in(&[sent_folder])
}

/// Next free sequential capture name across all given folders.
pub fn next_local_name_in(folders: &[&Path]) -> String {
    let highest = folders
        .iter()
        .flat_map(|folder| file_names(folder))
        .filter_map(|file_name| capture_number(&file_name))
        .max();

    match highest {
        Some(number) => capture_name(number + 1),
        None => capture_name(0),
    }
}

/// Raw folder file name to use for given capture.
pub fn local_name(naming: Naming, capture: &CaptureEvent, folders: &[&Path]) -> String {
    match naming {
        Naming::Camera => capture.name.clone(),
        Naming::Sequential => next_local_name_in(folders),
    }
}

/// Hidden file next to a copied raw picture telling it was sent.
fn sent_mark_path(picture: &Path) -> Option<PathBuf> {
    let file_name = picture.file_name()?.to_str()?;
    Some(picture.with_file_name(format!(".{}.sent", file_name)))
}

fn is_marked_sent(picture: &Path) -> bool {
    sent_mark_path(picture)
        .map(|mark| mark.exists())
        .unwrap_or(false)
}

fn mark_sent(picture: &Path) -> io::Result<()> {
    if let Some(mark) = sent_mark_path(picture) {
        fs::write(mark, b"")?;
    }
    Ok(())
}

/// Forget that a raw picture of this name was sent, before reusing the name.
pub fn clear_sent_mark(picture: &Path) -> io::Result<()> {
    match sent_mark_path(picture).map(fs::remove_file) {
        Some(Err(error)) if error.kind() != io::ErrorKind::NotFound => Err(error),
        _ => Ok(()),
    }
}

/// Raw pictures not sent yet, sorted by name. Moved pictures leave raw
/// folder once sent, copied ones are marked sent, so no sent folder is
/// looked at.
pub fn pending_pictures(raw_folder: &Path) -> Vec<PathBuf> {
    let mut pending: Vec<PathBuf> = file_names(raw_folder)
        .map(|file_name| raw_folder.join(file_name))
        .filter(|path| !ignore_file(path))
        .filter(|path| !is_marked_sent(path))
        .collect();
    pending.sort();
    pending
}

/// Put `picture` into `sent_folder`, by rename or by copy. Return the
/// archived path.
pub fn archive(picture: &Path, sent_folder: &Path, mode: ArchiveMode) -> io::Result<PathBuf> {
    let file_name = picture.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("'{}' has no file name", picture.display()),
        )
    })?;
    let destination = sent_folder.join(file_name);

    match mode {
        ArchiveMode::Copy => {
            fs::copy(picture, &destination)?;
            mark_sent(picture)?;
        }
        ArchiveMode::Move => {
            if let Err(error) = fs::rename(picture, &destination) {
                // Sent folder can be on another file system
                log::debug!(
                    "Rename of '{}' failed ({}), copy and remove it",
                    picture.display(),
                    error
                );
                fs::copy(picture, &destination)?;
                fs::remove_file(picture)?;
            }
            // Mark left by a previous run in copy mode
            clear_sent_mark(picture)?;
        }
    }

    Ok(destination)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::tests::tmpdir;
    use pretty_assertions::assert_eq;
    use rstest::*;

    fn touch(folder: &Path, names: &[&str]) {
        fs::create_dir_all(folder).unwrap();
        for name in names {
            fs::write(folder.join(name), name.as_bytes()).unwrap();
        }
    }

    #[rstest]
    // Empty
    #[case(vec![], "capt0000.jpg")]
    // Not matching only
    #[case(vec!["badname.jpg"], "capt0000.jpg")]
    #[case(vec!["captABCD.jpg", "capt12.jpg", "IMG_0001.JPG"], "capt0000.jpg")]
    // Highest wins
    #[case(vec!["capt0005.jpg", "capt0013.jpg"], "capt0014.jpg")]
    #[case(vec!["capt0013.jpg", "capt0005.jpg", "badname.jpg"], "capt0014.jpg")]
    // Extension case insensitive
    #[case(vec!["capt0041.JPG"], "capt0042.jpg")]
    #[case(vec!["capt0001.jpg", "capt0900.Jpg"], "capt0901.jpg")]
    // Other extensions are ignored
    #[case(vec!["capt0100.png", "capt0002.jpg"], "capt0003.jpg")]
    // Malformed names do not reset counter
    #[case(vec!["capt0005.jpg", "captABCD.jpg"], "capt0006.jpg")]
    // Past four digits
    #[case(vec!["capt9999.jpg", "capt10000.jpg"], "capt10001.jpg")]
    #[case(vec!["capt4294967295.jpg"], "capt4294967296.jpg")]
    // Too long to be a counter
    #[case(vec!["capt0003.jpg", "capt9999999999999999999.jpg"], "capt0004.jpg")]
    fn test_next_local_name(#[case] existing: Vec<&str>, #[case] expected: &str) {
        // Given
        let sent = tmpdir();
        touch(&sent, &existing);

        // When
        let name = next_local_name(&sent);

        // Then
        assert_eq!(name, expected);
    }

    #[test]
    fn test_next_local_name_missing_folder() {
        assert_eq!(
            next_local_name(&tmpdir().join("not_existing")),
            "capt0000.jpg"
        );
    }

    #[test]
    fn test_next_local_name_across_folders() {
        let root = tmpdir();
        touch(&root.join("sent"), &["capt0005.jpg"]);
        touch(&root.join("raw"), &["capt0007.jpg"]);

        let name = next_local_name_in(&[root.join("sent").as_path(), root.join("raw").as_path()]);

        assert_eq!(name, "capt0008.jpg");
    }

    #[test]
    fn test_local_name() {
        let sent = tmpdir();
        touch(&sent, &["capt0002.jpg"]);
        let capture = CaptureEvent::new("/store/DCIM/100", "capt0000.jpg");

        assert_eq!(
            local_name(Naming::Camera, &capture, &[sent.as_path()]),
            "capt0000.jpg"
        );
        assert_eq!(
            local_name(Naming::Sequential, &capture, &[sent.as_path()]),
            "capt0003.jpg"
        );
    }

    #[test]
    fn test_pending_pictures() {
        let raw = tmpdir().join("raw");
        touch(&raw, &["capt0003.jpg", "capt0001.jpg", "capt0002.jpg", ".hidden"]);

        let pending = pending_pictures(&raw);

        assert_eq!(
            pending,
            vec![
                raw.join("capt0001.jpg"),
                raw.join("capt0002.jpg"),
                raw.join("capt0003.jpg")
            ]
        );
    }

    #[test]
    fn test_pending_picture_named_like_a_sent_one() {
        // Given: camera counter was reset, an older capt0000.jpg is archived
        let root = tmpdir();
        let raw = root.join("raw");
        let sent = root.join("sent");
        touch(&raw, &["capt0000.jpg"]);
        touch(&sent, &["capt0000.jpg"]);

        // When
        let pending = pending_pictures(&raw);

        // Then
        assert_eq!(pending, vec![raw.join("capt0000.jpg")]);
    }

    #[test]
    fn test_copied_pictures_stay_sent_with_another_sent_folder() {
        // Given: pictures copied to removable sent folder
        let root = tmpdir();
        let raw = root.join("raw");
        let removable_sent = root.join("usb").join("sent");
        touch(&raw, &["capt0001.jpg", "capt0002.jpg"]);
        fs::create_dir_all(&removable_sent).unwrap();
        archive(&raw.join("capt0001.jpg"), &removable_sent, ArchiveMode::Copy).unwrap();

        // When: removable sent folder is gone
        fs::remove_dir_all(root.join("usb")).unwrap();
        let pending = pending_pictures(&raw);

        // Then
        assert_eq!(pending, vec![raw.join("capt0002.jpg")]);
    }

    #[test]
    fn test_clear_sent_mark() {
        let root = tmpdir();
        let raw = root.join("raw");
        let sent = root.join("sent");
        touch(&raw, &["capt0001.jpg"]);
        fs::create_dir_all(&sent).unwrap();
        archive(&raw.join("capt0001.jpg"), &sent, ArchiveMode::Copy).unwrap();
        assert!(pending_pictures(&raw).is_empty());

        clear_sent_mark(&raw.join("capt0001.jpg")).unwrap();
        clear_sent_mark(&raw.join("capt0002.jpg")).unwrap();

        assert_eq!(pending_pictures(&raw), vec![raw.join("capt0001.jpg")]);
    }

    #[test]
    fn test_archive_move() {
        let root = tmpdir();
        let raw = root.join("raw");
        let sent = root.join("sent");
        touch(&raw, &["capt0001.jpg"]);
        fs::create_dir_all(&sent).unwrap();

        let archived = archive(&raw.join("capt0001.jpg"), &sent, ArchiveMode::Move).unwrap();

        assert_eq!(archived, sent.join("capt0001.jpg"));
        assert!(!raw.join("capt0001.jpg").exists());
        assert_eq!(fs::read(&archived).unwrap(), b"capt0001.jpg");
    }

    #[test]
    fn test_archive_copy() {
        let root = tmpdir();
        let raw = root.join("raw");
        let sent = root.join("sent");
        touch(&raw, &["capt0001.jpg"]);
        fs::create_dir_all(&sent).unwrap();

        let archived = archive(&raw.join("capt0001.jpg"), &sent, ArchiveMode::Copy).unwrap();

        assert_eq!(
            fs::read(raw.join("capt0001.jpg")).unwrap(),
            fs::read(&archived).unwrap()
        );
    }
}
