use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use env_logger::{Env, Target};

/// Duplicate log records to console and to a file.
pub struct LogSink<C: Write, F: Write> {
    console: C,
    file: F,
}

impl<C: Write, F: Write> LogSink<C, F> {
    pub fn new(console: C, file: F) -> Self {
        Self { console, file }
    }
}

impl<C: Write, F: Write> Write for LogSink<C, F> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // Losing console must not prevent file logging (and inversely)
        let console = self.console.write_all(buf);
        let file = self.file.write_all(buf);
        console.and(file).map(|_| buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let console = self.console.flush();
        let file = self.file.flush();
        console.and(file)
    }
}

pub fn log_file_path(log_folder: &Path, date: NaiveDate) -> PathBuf {
    log_folder.join(format!("tethersend_{}.log", date.format("%Y-%m-%d")))
}

fn open_log_file(log_folder: &Path) -> Result<(PathBuf, fs::File)> {
    fs::create_dir_all(log_folder)
        .context(format!("Create log folder '{}'", log_folder.display()))?;
    let path = log_file_path(log_folder, Local::now().date_naive());
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .context(format!("Open log file '{}'", path.display()))?;
    Ok((path, file))
}

/// Install process logger. Records go to stderr and, when possible, to the
/// dated log file of `log_folder`.
pub fn init(log_folder: &Path) -> Option<PathBuf> {
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));

    match open_log_file(log_folder) {
        Ok((path, file)) => {
            builder
                .target(Target::Pipe(Box::new(LogSink::new(io::stderr(), file))))
                .init();
            Some(path)
        }
        Err(error) => {
            builder.init();
            log::warn!("Log to console only: {:#}", error);
            None
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_log_file_path() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        assert_eq!(
            log_file_path(Path::new("logs"), date),
            PathBuf::from("logs/tethersend_2026-10-18.log")
        );
    }

    #[test]
    fn test_sink_writes_both() {
        let mut console = vec![];
        let mut file = vec![];

        {
            let mut sink = LogSink::new(&mut console, &mut file);
            writeln!(sink, "[INFO] Picture capt0001.jpg sent and archived").unwrap();
            sink.flush().unwrap();
        }

        assert_eq!(console, file);
        assert_eq!(
            String::from_utf8(file).unwrap(),
            "[INFO] Picture capt0001.jpg sent and archived\n"
        );
    }
}
