//! The `cellsweep` CLI.
//!
//! The CLI fills a box with a particle lattice and exercises the region tagging (`tag`) or the
//! colored damping sweeps (`sweep`) of the [`cellsweep_lib`] crate on it.

use crate::{logging, sweep, tag};
use anyhow::Context;
use clap::Parser;
use log::info;

static HELP_TEMPLATE: &str = "{before-help}{name} (v{version}) - {about-with-newline}\n{usage-heading} {usage}\n\n{all-args}{after-help}";

#[derive(Clone, Debug, clap::Parser)]
#[command(
    name = "cellsweep",
    about = "Region tagging and race-free colored sweeps over particles in cell linked lists",
    version,
    propagate_version = true,
    help_template = HELP_TEMPLATE,
)]
struct CommandlineArgs {
    /// Enable quiet mode (no output except for severe panic messages), overrides verbosity level
    #[arg(long, short = 'q', global = true)]
    quiet: bool,
    /// Print more verbose output, use multiple "v"s for even more verbose output (-v, -vv)
    #[arg(short, action = clap::ArgAction::Count, global = true)]
    verbosity: u8,
    /// Subcommands
    #[command(subcommand)]
    subcommand: Subcommand,
}

#[derive(Clone, Debug, clap::Parser)]
enum Subcommand {
    /// Tag the particles and cells of a ball-shaped region in a particle box
    #[command(help_template = HELP_TEMPLATE)]
    Tag(tag::TagSubcommandArgs),
    /// Run pairwise damping sweeps over a particle box
    #[command(help_template = HELP_TEMPLATE)]
    Sweep(sweep::SweepSubcommandArgs),
}

/// A simple on/off switch for command line arguments.
///
/// An argument declared with `value_name = "off|on"` and `require_equals = true` is used as
/// `--fixed-wall=on` or `--fixed-wall=off`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Switch {
    Off,
    On,
}

impl Switch {
    pub fn into_bool(self) -> bool {
        matches!(self, Switch::On)
    }
}

/// Runs the cellsweep CLI with the provided command line arguments.
///
/// Behaves like the `cellsweep` binary including its output and exiting the process on invalid
/// arguments. The first argument is ignored as it is the binary name when called with
/// `std::env::args()`:
/// ```no_run
/// cellsweep::cli::run_cellsweep(["cellsweep", "--version"]);
/// ```
pub fn run_cellsweep<I, T>(args: I) -> Result<(), anyhow::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    run_cellsweep_impl(args).inspect_err(logging::log_error)
}

fn run_cellsweep_impl<I, T>(args: I) -> Result<(), anyhow::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cmd_args = CommandlineArgs::parse_from(args);

    logging::initialize_logging(VerbosityLevel::from(cmd_args.verbosity), cmd_args.quiet)
        .context("Failed to initialize logging")?;
    logging::log_program_info();

    let result = match &cmd_args.subcommand {
        Subcommand::Tag(cmd_args) => tag::tag_subcommand(cmd_args),
        Subcommand::Sweep(cmd_args) => sweep::sweep_subcommand(cmd_args),
    };

    info!("Timings:");
    match cellsweep_lib::profiling::write_to_string() {
        Ok(timings) => timings
            .lines()
            .filter(|l| !l.is_empty())
            .for_each(|l| info!("{}", l)),
        Err(err) => info!("Unable to write timings ({})", err),
    }

    info!(
        "Finished at {}.",
        chrono::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, false)
    );

    result
}

#[derive(Copy, Clone, Debug)]
pub(crate) enum VerbosityLevel {
    None,
    Verbose,
    VeryVerbose,
    VeryVeryVerbose,
}

impl From<u8> for VerbosityLevel {
    fn from(value: u8) -> Self {
        match value {
            0 => VerbosityLevel::None,
            1 => VerbosityLevel::Verbose,
            2 => VerbosityLevel::VeryVerbose,
            _ => VerbosityLevel::VeryVeryVerbose,
        }
    }
}

impl VerbosityLevel {
    /// Maps this verbosity level to a log filter
    pub fn into_filter(self) -> Option<log::LevelFilter> {
        match self {
            VerbosityLevel::None => None,
            VerbosityLevel::Verbose => Some(log::LevelFilter::Info),
            VerbosityLevel::VeryVerbose => Some(log::LevelFilter::Debug),
            VerbosityLevel::VeryVeryVerbose => Some(log::LevelFilter::Trace),
        }
    }
}
