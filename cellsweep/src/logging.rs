//! Logger setup of the CLI with support for an active progress bar

use std::env;
use std::io::Write;
use std::str::FromStr;

use anyhow::anyhow;
use fern::Output;
use indicatif::{ProgressBar, WeakProgressBar};
use log::{error, info};
use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::cli::VerbosityLevel;

/// Progress bar that is currently shown, log output suspends it while writing
static ACTIVE_PROGRESS_BAR: Lazy<RwLock<Option<WeakProgressBar>>> =
    Lazy::new(|| RwLock::new(None));

/// Writer that hides the active progress bar while forwarding output to the wrapped writer
#[derive(Debug)]
pub struct ProgressAwareWriter<W: Write + Send>(W);

impl<W: Write + Send> ProgressAwareWriter<W> {
    pub fn new(inner: W) -> Self {
        Self(inner)
    }

    fn suspended<F: FnOnce(&mut W) -> T, T>(&mut self, f: F) -> T {
        match progress_bar() {
            Some(pb) => pb.suspend(|| f(&mut self.0)),
            None => f(&mut self.0),
        }
    }
}

impl<W: Write + Send + 'static> ProgressAwareWriter<W> {
    pub fn into_output(self) -> Output {
        let boxed: Box<dyn Write + Send + 'static> = Box::new(self);
        boxed.into()
    }
}

impl<W: Write + Send> Write for ProgressAwareWriter<W> {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.suspended(|w| w.write(buf))
    }

    #[inline]
    fn flush(&mut self) -> std::io::Result<()> {
        self.suspended(|w| w.flush())
    }
}

/// Registers the progress bar that log output has to suspend, `None` removes it
pub(crate) fn set_progress_bar(pb: Option<WeakProgressBar>) {
    *ACTIVE_PROGRESS_BAR.write() = pb;
}

/// Returns the active progress bar if it is still alive
pub(crate) fn progress_bar() -> Option<ProgressBar> {
    ACTIVE_PROGRESS_BAR.read().as_ref()?.upgrade()
}

/// Logs an anyhow error together with its chain of causes
pub(crate) fn log_error(err: &anyhow::Error) {
    error!("Error occurred: {}", err);
    err.chain()
        .skip(1)
        .for_each(|cause| error!("  caused by: {}", cause));
}

/// Initializes the global fern logger
///
/// The filter level is taken from the first of: quiet mode, the verbosity flags, the `RUST_LOG`
/// environment variable, INFO.
pub(crate) fn initialize_logging(
    verbosity: VerbosityLevel,
    quiet_mode: bool,
) -> Result<(), anyhow::Error> {
    let mut unknown_env_level = None;
    let level = if quiet_mode {
        log::LevelFilter::Off
    } else if let Some(level) = verbosity.into_filter() {
        level
    } else if let Some(env_level) = env::var_os("RUST_LOG") {
        let env_level = env_level.to_string_lossy().into_owned();
        log::LevelFilter::from_str(&env_level).unwrap_or_else(|_| {
            unknown_env_level = Some(env_level);
            log::LevelFilter::Info
        })
    } else {
        log::LevelFilter::Info
    };

    let dispatch = if matches!(verbosity, VerbosityLevel::None) {
        fern::Dispatch::new().format(|out, message, record| {
            out.finish(format_args!(
                "[{}][{}] {}",
                chrono::Local::now().format("%T%.3f"),
                record.level(),
                message
            ))
        })
    } else {
        fern::Dispatch::new().format(|out, message, record| {
            out.finish(format_args!(
                "[{}][{}][{}] {}",
                chrono::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, false),
                record.target(),
                record.level(),
                message
            ))
        })
    };

    dispatch
        .level(level)
        .chain(ProgressAwareWriter::new(std::io::stdout()).into_output())
        .apply()
        .map_err(|e| anyhow!("Unable to apply logger configuration ({:?})", e))?;

    if let Some(env_level) = unknown_env_level {
        error!(
            "Unknown log filter level '{}' defined in 'RUST_LOG' env variable, using INFO instead.",
            env_level
        );
    }

    Ok(())
}

/// Logs program name, version and the full command line
pub(crate) fn log_program_info() {
    info!(
        "{} v{} ({})",
        env::args().next().unwrap_or_else(|| "cellsweep".to_string()),
        env!("CARGO_PKG_VERSION"),
        env!("CARGO_PKG_NAME")
    );
    info!(
        "Called with command line: {}",
        env::args().collect::<Vec<_>>().join(" ")
    );
}
