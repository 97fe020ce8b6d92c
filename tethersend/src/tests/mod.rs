use std::fs;
use std::path::PathBuf;

use testdir::testdir;
use uuid::Uuid;

pub fn tmpdir() -> PathBuf {
    let path = testdir!().join(PathBuf::from(Uuid::new_v4().to_string()));
    fs::create_dir_all(&path).unwrap();
    path
}
