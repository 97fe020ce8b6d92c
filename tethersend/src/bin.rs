use std::{
    env,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use anyhow::{Context as AnyhowContext, Result};
use structopt::StructOpt;
use tethersend::{
    context::Context,
    error::{Error, EXIT_FAILURE},
    logging, run,
};
use tethersend_core::{
    camera::{folder::FolderCameraConnector, CameraConnector},
    client::SuppaFtpConnector,
    config::{Config, ConfigSource},
    types::CameraBackend,
    utils::read_ip_file,
};

#[derive(StructOpt, Debug)]
#[structopt(name = "tethersend")]
struct Opt {
    /// Config file (default: ~/.tethersend.conf)
    #[structopt(long, parse(from_os_str))]
    config: Option<PathBuf>,

    /// Ftp server address
    #[structopt(long)]
    ip: Option<String>,

    /// Ftp server port
    #[structopt(long)]
    port: Option<u16>,

    /// Folder containing raw and sent folders
    #[structopt(short, long, parse(from_os_str))]
    output: Option<PathBuf>,

    /// Text file containing ftp server address
    #[structopt(long, parse(from_os_str))]
    ip_file: Option<PathBuf>,

    /// Read ftp password from this environment variable
    #[structopt(long)]
    env_var_pass: Option<String>,

    /// Prompt for ftp password
    #[structopt(long)]
    ask_password: bool,

    /// Send pending raw pictures then exit
    #[structopt(long)]
    exit_after_flush: bool,
}

impl Opt {
    fn apply(&self, config: &mut Config) -> Result<()> {
        if let Some(ip) = &self.ip {
            config.server.host = ip.clone();
        } else if let Some(ip_file) = &self.ip_file {
            config.server.host = read_ip_file(ip_file)?;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(output) = &self.output {
            config.local.output_folder = output.clone();
        }

        if let Some(env_var_pass) = &self.env_var_pass {
            config.server.password = Some(
                env::var(env_var_pass)
                    .context(format!("No env var set for name {}", env_var_pass))?,
            );
        } else if self.ask_password {
            config.server.password = Some(rpassword::prompt_password("Ftp password ? ")?);
        }

        Ok(())
    }
}

fn camera_connector(config: &Config) -> Result<Box<dyn CameraConnector>> {
    match config.camera.backend {
        CameraBackend::Folder => Ok(Box::new(FolderCameraConnector::new(
            config.camera.watch_folder.clone(),
        ))),
        #[cfg(feature = "gphoto2")]
        CameraBackend::Gphoto2 => Ok(Box::new(
            tethersend_core::camera::gphoto::GphotoCameraConnector,
        )),
        #[cfg(not(feature = "gphoto2"))]
        CameraBackend::Gphoto2 => {
            anyhow::bail!("This build has no gphoto2 support (enable \"gphoto2\" feature)")
        }
    }
}

fn main_(opt: Opt, mut config: Config) -> Result<(), Error> {
    opt.apply(&mut config)?;
    let context = Context::from_config(&config, opt.exit_after_flush);
    log::debug!("Run with {:?}", context);

    let stop_signal = Arc::new(AtomicBool::new(false));
    let handler_stop_signal = stop_signal.clone();
    ctrlc::set_handler(move || {
        if handler_stop_signal.swap(true, Ordering::Relaxed) {
            log::warn!("Interrupted again, exit now");
            std::process::exit(0);
        }
        log::info!("Interrupt received, stopping");
    })
    .context("Install interrupt handler")?;

    let camera_connector = camera_connector(&config)?;
    let ftp_connector = SuppaFtpConnector::from_config(&config.server);
    run::run(
        &context,
        camera_connector.as_ref(),
        &ftp_connector,
        stop_signal,
    )?;

    log::info!("Exit application");
    Ok(())
}

fn main() {
    let opt = Opt::from_args();
    let (config, config_source) = match Config::from_env(opt.config.as_deref()) {
        Ok(loaded) => loaded,
        Err(error) => {
            eprintln!("{:#}", error);
            std::process::exit(EXIT_FAILURE);
        }
    };

    if let Some(log_file) = logging::init(&config.local.log_folder) {
        log::info!("Log into '{}'", log_file.display());
    }
    match config_source {
        ConfigSource::File(path) => log::info!("Use config file '{}'", path.display()),
        ConfigSource::Defaults(path) => {
            log::info!("No config file at '{}', use defaults", path.display())
        }
    }

    if let Err(error) = main_(opt, config) {
        log::error!("{}", error);
        std::process::exit(error.exit_code());
    }
}
