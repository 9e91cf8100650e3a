use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::utils::version;

#[derive(Parser)]
#[command(author, version = version(), about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
#[command(subcommand_value_name = "SUBCOMMAND")]
#[command(subcommand_help_heading = "Subcommands")]
pub struct Cli {
    /// Path to config file (default: `$XDG_CONFIG_HOME/handwheel/config.kdl`).
    ///
    /// This can also be set with the `HANDWHEEL_CONFIG` environment variable. If both are set,
    /// the command line argument takes precedence.
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Recorded pose script to play back, `-` for stdin.
    #[arg(short, long, default_value = "-")]
    pub replay: PathBuf,
    /// Don't create a virtual joystick, only log the steering axis.
    #[arg(long)]
    pub dry_run: bool,
    /// Place the wheel with the controllers and print the resulting config section on exit.
    ///
    /// Hold the right trigger: the right hand sets the wheel center and the left hand sets a
    /// point on the rim.
    #[arg(long)]
    pub edit: bool,

    #[command(subcommand)]
    pub subcommand: Option<Sub>,
}

#[derive(Subcommand)]
pub enum Sub {
    /// Validate the config file.
    Validate {
        /// Path to config file (default: `$XDG_CONFIG_HOME/handwheel/config.kdl`).
        ///
        /// This can also be set with the `HANDWHEEL_CONFIG` environment variable. If both are
        /// set, the command line argument takes precedence.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}
