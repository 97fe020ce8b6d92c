use std::{fs, path::Path};

use anyhow::{Context, Result};

pub fn strbool(value: &str) -> bool {
    ["true", "True", "t", "T", "1"].contains(&value)
}

/// Hidden and editor/temporary files are never considered as pictures.
pub fn ignore_file(path: &Path) -> bool {
    if let Some(file_name) = path.file_name().and_then(|name| name.to_str()) {
        return file_name.starts_with('.')
            || file_name.starts_with('~')
            || file_name.ends_with('~')
            || file_name.starts_with('#');
    }
    true
}

/// Read a host address from a text file: first non empty line, trimmed.
pub fn read_ip_file(path: &Path) -> Result<String> {
    let content = fs::read_to_string(path)
        .context(format!("Read ip file '{}'", path.display()))?;
    content
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
        .context(format!("Ip file '{}' is empty", path.display()))
}
