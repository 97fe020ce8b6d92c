use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tethersend_core::config::Config;
use tethersend_core::types::{ArchiveMode, Naming};

use crate::retry::RetryPolicy;

#[derive(Clone)]
pub struct Context {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub raw_folder: PathBuf,
    pub sent_folder: PathBuf,
    pub archive_mode: ArchiveMode,
    pub naming: Naming,
    pub event_timeout: Duration,
    pub connect_policy: RetryPolicy,
    pub upload_attempts: u32,
    pub abort_on_upload_failure: bool,
    pub exit_after_flush: bool,
}

impl Context {
    pub fn from_config(config: &Config, exit_after_flush: bool) -> Self {
        let (sent_folder, archive_mode) = resolve_sent_folder(
            &config.sent_folder(),
            config.local.removable_sent_folder.as_deref(),
            config.local.archive_mode,
        );

        Self {
            host: config.server.host.clone(),
            port: config.server.port,
            username: config.server.username.clone(),
            password: config.server.password.clone(),
            raw_folder: config.raw_folder(),
            sent_folder,
            archive_mode,
            naming: config.local.naming,
            event_timeout: config.camera.event_timeout,
            connect_policy: RetryPolicy::new(
                config.retry.connect_budget,
                config.retry.connect_interval,
            ),
            upload_attempts: config.retry.upload_attempts.max(1),
            abort_on_upload_failure: config.retry.abort_on_upload_failure,
            exit_after_flush,
        }
    }
}

/// Removable sent folder is used (by copy) only when mounted at startup,
/// local sent folder otherwise.
pub fn resolve_sent_folder(
    local_sent_folder: &Path,
    removable_sent_folder: Option<&Path>,
    archive_mode: ArchiveMode,
) -> (PathBuf, ArchiveMode) {
    if let Some(removable_sent_folder) = removable_sent_folder {
        if removable_sent_folder.is_dir() {
            log::info!(
                "Archive sent pictures by copy into '{}'",
                removable_sent_folder.display()
            );
            return (removable_sent_folder.to_path_buf(), ArchiveMode::Copy);
        }
        log::warn!(
            "Removable sent folder '{}' not present, use '{}'",
            removable_sent_folder.display(),
            local_sent_folder.display()
        );
    }

    (local_sent_folder.to_path_buf(), archive_mode)
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("raw_folder", &self.raw_folder)
            .field("sent_folder", &self.sent_folder)
            .field("archive_mode", &self.archive_mode)
            .field("naming", &self.naming)
            .field("event_timeout", &self.event_timeout)
            .field("connect_policy", &self.connect_policy)
            .field("upload_attempts", &self.upload_attempts)
            .field("abort_on_upload_failure", &self.abort_on_upload_failure)
            .field("exit_after_flush", &self.exit_after_flush)
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::tests::tmpdir;
    use ini::Ini;
    use std::fs;

    #[test]
    fn test_removable_present() {
        let root = tmpdir();
        let removable = root.join("usb");
        fs::create_dir_all(&removable).unwrap();

        let resolved =
            resolve_sent_folder(&root.join("sent"), Some(&removable), ArchiveMode::Move);

        assert_eq!(resolved, (removable, ArchiveMode::Copy));
    }

    #[test]
    fn test_removable_absent() {
        let root = tmpdir();

        let resolved = resolve_sent_folder(
            &root.join("sent"),
            Some(&root.join("usb")),
            ArchiveMode::Move,
        );

        assert_eq!(resolved, (root.join("sent"), ArchiveMode::Move));
    }

    #[test]
    fn test_from_config() {
        let config_ini =
            Ini::load_from_str("[server]\npassword = secret\n[local]\noutput_folder = out\n")
                .unwrap();
        let config = Config::from_ini(config_ini).unwrap();

        let context = Context::from_config(&config, true);

        assert_eq!(context.raw_folder, PathBuf::from("out/raw"));
        assert_eq!(context.sent_folder, PathBuf::from("out/sent"));
        assert!(context.exit_after_flush);
        assert!(!format!("{:?}", context).contains("secret"));
    }
}
