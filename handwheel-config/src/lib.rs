#[macro_use]
extern crate tracing;

use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::Write as _;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use miette::{Context as _, IntoDiagnostic as _};

#[macro_use]
mod macros;

pub mod device;
pub mod error;
pub mod utils;
pub mod wheel;

pub use crate::device::Device;
pub use crate::error::InvalidConfig;
pub use crate::utils::{FloatOrInt, MergeWith};
pub use crate::wheel::{AxisScale, GripMode, Orientation, Wheel};

const DEFAULT_CONFIG: &str = include_str!("../../resources/default-config.kdl");

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub wheel: Wheel,
    pub device: Device,
    /// Engine updates per second.
    pub tick_rate: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            wheel: Wheel::default(),
            device: Device::default(),
            tick_rate: 90,
        }
    }
}

#[derive(knuffel::Decode, Debug, Default, PartialEq)]
pub struct ConfigPart {
    #[knuffel(child)]
    pub wheel: Option<wheel::WheelPart>,
    #[knuffel(child)]
    pub device: Option<device::DevicePart>,
    #[knuffel(child, unwrap(argument))]
    pub tick_rate: Option<u16>,
}

impl MergeWith<ConfigPart> for Config {
    fn merge_with(&mut self, part: &ConfigPart) {
        merge!((self, part), wheel, device);
        merge_clone!((self, part), tick_rate);
    }
}

#[derive(Debug, Clone)]
pub enum ConfigPath {
    /// Explicitly set config path.
    ///
    /// Load the config only from this path, never create it.
    Explicit(PathBuf),

    /// Default config path.
    ///
    /// Prioritize the user path, fallback to the system path, fallback to creating the user path
    /// on startup.
    Regular {
        /// User config path, usually `$XDG_CONFIG_HOME/handwheel/config.kdl`.
        user_path: PathBuf,
        /// System config path, usually `/etc/handwheel/config.kdl`.
        system_path: PathBuf,
    },
}

impl Config {
    pub fn load(path: &Path) -> miette::Result<Self> {
        let contents = fs::read_to_string(path)
            .into_diagnostic()
            .with_context(|| format!("error reading {path:?}"))?;

        let config = Self::parse(
            path.file_name()
                .and_then(OsStr::to_str)
                .unwrap_or("config.kdl"),
            &contents,
        )
        .context("error parsing")?;

        config
            .validate()
            .into_diagnostic()
            .with_context(|| format!("invalid config in {path:?}"))?;

        debug!("loaded config from {path:?}");
        Ok(config)
    }

    /// Parses the config without checking the wheel invariants.
    pub fn parse(filename: &str, text: &str) -> Result<Self, knuffel::Error> {
        let _span = tracy_client::span!("Config::parse");
        let part: ConfigPart = knuffel::parse(filename, text)?;
        Ok(Config::from_part(&part))
    }

    pub fn validate(&self) -> Result<(), InvalidConfig> {
        self.wheel.validate()?;
        if !(1..=1000).contains(&self.tick_rate) {
            return Err(InvalidConfig::TickRate(self.tick_rate));
        }
        Ok(())
    }
}

impl ConfigPath {
    /// Picks the config path from the command line, then `$HANDWHEEL_CONFIG`, then the XDG
    /// locations.
    pub fn new(explicit: Option<PathBuf>) -> Self {
        let explicit = explicit.or_else(|| {
            std::env::var_os("HANDWHEEL_CONFIG")
                .filter(|path| !path.is_empty())
                .map(PathBuf::from)
        });
        if let Some(path) = explicit {
            return ConfigPath::Explicit(path);
        }

        let user_path = ProjectDirs::from("", "", "handwheel")
            .map(|dirs| dirs.config_dir().join("config.kdl"))
            .unwrap_or_else(|| PathBuf::from("handwheel.kdl"));
        ConfigPath::Regular {
            user_path,
            system_path: PathBuf::from("/etc/handwheel/config.kdl"),
        }
    }

    /// Loads the config, returns an error if it doesn't exist.
    pub fn load(&self) -> miette::Result<Config> {
        let _span = tracy_client::span!("ConfigPath::load");

        self.load_inner(|user_path, system_path| {
            Err(miette::miette!(
                "no config file found; create one at {user_path:?} or {system_path:?}",
            ))
        })
        .context("error loading config")
    }

    /// Loads the config, or creates it if it doesn't exist.
    ///
    /// Returns a tuple containing the path that was created, if any, and the loaded config.
    pub fn load_or_create(&self) -> (Option<&Path>, miette::Result<Config>) {
        let _span = tracy_client::span!("ConfigPath::load_or_create");

        let mut created_at = None;

        let result = self
            .load_inner(|user_path, _| {
                Self::create(user_path, &mut created_at)
                    .map(|()| user_path)
                    .with_context(|| format!("error creating config at {user_path:?}"))
            })
            .context("error loading config");

        (created_at, result)
    }

    fn load_inner<'a>(
        &'a self,
        maybe_create: impl FnOnce(&'a Path, &'a Path) -> miette::Result<&'a Path>,
    ) -> miette::Result<Config> {
        let path = match self {
            ConfigPath::Explicit(path) => path.as_path(),
            ConfigPath::Regular {
                user_path,
                system_path,
            } => {
                if user_path.exists() {
                    user_path.as_path()
                } else if system_path.exists() {
                    system_path.as_path()
                } else {
                    maybe_create(user_path.as_path(), system_path.as_path())?
                }
            }
        };
        Config::load(path)
    }

    fn create<'a>(path: &'a Path, created_at: &mut Option<&'a Path>) -> miette::Result<()> {
        if let Some(default_parent) = path.parent() {
            fs::create_dir_all(default_parent)
                .into_diagnostic()
                .with_context(|| format!("error creating config directory {default_parent:?}"))?;
        }

        let mut new_file = match File::options()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)
        {
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => return Ok(()),
            res => res,
        }
        .into_diagnostic()
        .with_context(|| format!("error opening config file at {path:?}"))?;

        *created_at = Some(path);

        new_file
            .write_all(DEFAULT_CONFIG.as_bytes())
            .into_diagnostic()
            .with_context(|| format!("error writing default config to {path:?}"))?;

        Ok(())
    }
}
