use std::{
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use anyhow::{Context, Result};

use ini::{Ini, Properties};

use crate::{
    types::{ArchiveMode, CameraBackend, Naming},
    utils::strbool,
};

pub const DEFAULT_HOST: &str = "192.168.178.44";
pub const DEFAULT_PORT: u16 = 26000;
pub const DEFAULT_OUTPUT_FOLDER: &str = "pictures";
pub const DEFAULT_LOG_FOLDER: &str = "logs";
pub const DEFAULT_WATCH_FOLDER: &str = "camera";
pub const DEFAULT_EVENT_TIMEOUT_MS: u64 = 3000;
pub const DEFAULT_CONNECT_BUDGET_SECONDS: u64 = 15 * 60;
pub const DEFAULT_CONNECT_INTERVAL_SECONDS: u64 = 2;
pub const DEFAULT_UPLOAD_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocalConfig {
    pub output_folder: PathBuf,
    pub removable_sent_folder: Option<PathBuf>,
    pub archive_mode: ArchiveMode,
    pub naming: Naming,
    pub log_folder: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CameraConfig {
    pub backend: CameraBackend,
    pub watch_folder: PathBuf,
    pub event_timeout: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    pub connect_budget: Duration,
    pub connect_interval: Duration,
    pub upload_attempts: u32,
    pub abort_on_upload_failure: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub server: ServerConfig,
    pub local: LocalConfig,
    pub camera: CameraConfig,
    pub retry: RetryConfig,
}

/// Where a loaded [`Config`] comes from. `Defaults` carries the absent
/// default file path.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    File(PathBuf),
    Defaults(PathBuf),
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        let user_home_folder_path = dirs::home_dir().context("Unable to determine home folder")?;
        Ok(if cfg!(target_os = "windows") {
            user_home_folder_path
                .join("AppData")
                .join("Local")
                .join("tethersend.conf")
        } else {
            user_home_folder_path.join(".tethersend.conf")
        })
    }

    /// Load given config file, or the default one. A missing default file
    /// means built-in defaults, a missing given file is an error.
    pub fn from_env(config_file_path: Option<&Path>) -> Result<(Self, ConfigSource)> {
        match config_file_path {
            Some(path) => Self::load(path, true),
            None => Self::load(&Self::default_path()?, false),
        }
    }

    fn load(config_file_path: &Path, required: bool) -> Result<(Self, ConfigSource)> {
        if !required && !config_file_path.exists() {
            return Ok((
                Self::from_ini(Ini::new())?,
                ConfigSource::Defaults(config_file_path.to_path_buf()),
            ));
        }

        let config_ini = Ini::load_from_file(config_file_path).context(format!(
            "Error when loading config file at '{}'",
            config_file_path.display()
        ))?;
        Ok((
            Self::from_ini(config_ini)?,
            ConfigSource::File(config_file_path.to_path_buf()),
        ))
    }

    pub fn from_ini(config_ini: Ini) -> Result<Self> {
        let empty = Properties::new();
        let server = config_ini.section(Some("server")).unwrap_or(&empty);
        let local = config_ini.section(Some("local")).unwrap_or(&empty);
        let camera = config_ini.section(Some("camera")).unwrap_or(&empty);
        let retry = config_ini.section(Some("retry")).unwrap_or(&empty);

        let server = ServerConfig {
            host: server.get("host").unwrap_or(DEFAULT_HOST).to_string(),
            port: parse_or(server, "server", "port", DEFAULT_PORT)?,
            username: non_empty(server.get("username")),
            password: non_empty(server.get("password")),
        };

        let local = LocalConfig {
            output_folder: PathBuf::from(
                local.get("output_folder").unwrap_or(DEFAULT_OUTPUT_FOLDER),
            ),
            removable_sent_folder: non_empty(local.get("removable_sent_folder")).map(PathBuf::from),
            archive_mode: parse_or(local, "local", "archive_mode", ArchiveMode::Move)?,
            naming: parse_or(local, "local", "naming", Naming::Camera)?,
            log_folder: PathBuf::from(local.get("log_folder").unwrap_or(DEFAULT_LOG_FOLDER)),
        };

        let camera = CameraConfig {
            backend: parse_or(camera, "camera", "backend", CameraBackend::Folder)?,
            watch_folder: PathBuf::from(camera.get("watch_folder").unwrap_or(DEFAULT_WATCH_FOLDER)),
            event_timeout: Duration::from_millis(parse_or(
                camera,
                "camera",
                "event_timeout_ms",
                DEFAULT_EVENT_TIMEOUT_MS,
            )?),
        };

        let upload_attempts: u32 =
            parse_or(retry, "retry", "upload_attempts", DEFAULT_UPLOAD_ATTEMPTS)?;
        if upload_attempts == 0 {
            anyhow::bail!("upload_attempts from retry section must be at least 1");
        }
        let retry = RetryConfig {
            connect_budget: Duration::from_secs(parse_or(
                retry,
                "retry",
                "connect_budget_seconds",
                DEFAULT_CONNECT_BUDGET_SECONDS,
            )?),
            connect_interval: Duration::from_secs(parse_or(
                retry,
                "retry",
                "connect_interval_seconds",
                DEFAULT_CONNECT_INTERVAL_SECONDS,
            )?),
            upload_attempts,
            abort_on_upload_failure: strbool(retry.get("abort_on_upload_failure").unwrap_or("0")),
        };

        Ok(Self {
            server,
            local,
            camera,
            retry,
        })
    }

    pub fn raw_folder(&self) -> PathBuf {
        self.local.output_folder.join("raw")
    }

    pub fn sent_folder(&self) -> PathBuf {
        self.local.output_folder.join("sent")
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn parse_or<T>(section: &Properties, section_name: &str, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match section.get(key) {
        Some(raw) => raw.trim().parse::<T>().map_err(|error| {
            anyhow::anyhow!(
                "Unable to read {} config from {} section ('{}'): {}",
                key,
                section_name,
                raw,
                error
            )
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use testdir::testdir;

    #[test]
    fn test_defaults() {
        let config = Config::from_ini(Ini::new()).unwrap();

        assert_eq!(config.server.host, DEFAULT_HOST);
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.server.username, None);
        assert_eq!(config.local.archive_mode, ArchiveMode::Move);
        assert_eq!(config.local.naming, Naming::Camera);
        assert_eq!(config.camera.backend, CameraBackend::Folder);
        assert_eq!(config.camera.event_timeout, Duration::from_millis(3000));
        assert_eq!(config.retry.connect_budget, Duration::from_secs(900));
        assert_eq!(config.retry.connect_interval, Duration::from_secs(2));
        assert_eq!(config.raw_folder(), PathBuf::from("pictures/raw"));
        assert_eq!(config.sent_folder(), PathBuf::from("pictures/sent"));
    }

    #[test]
    fn test_from_ini() {
        let config_ini = Ini::load_from_str(
            "[server]
host = 10.0.0.2
port = 2121
username = photo
password =

[local]
output_folder = /srv/pictures
removable_sent_folder = /media/usb/sent
archive_mode = copy
naming = sequential

[retry]
upload_attempts = 5
abort_on_upload_failure = true
",
        )
        .unwrap();

        let config = Config::from_ini(config_ini).unwrap();

        assert_eq!(config.server.host, "10.0.0.2");
        assert_eq!(config.server.port, 2121);
        assert_eq!(config.server.username, Some("photo".to_string()));
        assert_eq!(config.server.password, None);
        assert_eq!(
            config.local.removable_sent_folder,
            Some(PathBuf::from("/media/usb/sent"))
        );
        assert_eq!(config.local.archive_mode, ArchiveMode::Copy);
        assert_eq!(config.local.naming, Naming::Sequential);
        assert_eq!(config.retry.upload_attempts, 5);
        assert!(config.retry.abort_on_upload_failure);
        assert_eq!(config.raw_folder(), PathBuf::from("/srv/pictures/raw"));
    }

    #[test]
    fn test_load_missing_default_file() {
        let path = testdir!().join("tethersend.conf");

        let (config, source) = Config::load(&path, false).unwrap();

        assert_eq!(config, Config::from_ini(Ini::new()).unwrap());
        assert_eq!(source, ConfigSource::Defaults(path));
    }

    #[test]
    fn test_load_missing_given_file() {
        let path = testdir!().join("tethersend.conf");
        assert!(Config::load(&path, true).is_err());
    }

    #[test]
    fn test_load_file() {
        let path = testdir!().join("tethersend.conf");
        fs::write(&path, "[server]\nport = 2121\n").unwrap();

        let (config, source) = Config::from_env(Some(&path)).unwrap();

        assert_eq!(config.server.port, 2121);
        assert_eq!(source, ConfigSource::File(path));
    }

    #[test]
    fn test_invalid_port() {
        let config_ini = Ini::load_from_str("[server]\nport = ftp\n").unwrap();
        assert!(Config::from_ini(config_ini).is_err());
    }

    #[test]
    fn test_zero_upload_attempts() {
        let config_ini = Ini::load_from_str("[retry]\nupload_attempts = 0\n").unwrap();
        assert!(Config::from_ini(config_ini).is_err());
    }
}
