use std::error::Error;
use std::fmt;

/// A configuration value that parsed fine but breaks an invariant the engine relies on.
///
/// These are rejected as a whole rather than clamped into range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InvalidConfig {
    Radius(f64),
    Inertia(f64),
    LockToLock(f64),
    GrabWidth(f64),
    TickRate(u16),
}

impl fmt::Display for InvalidConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidConfig::Radius(value) => {
                write!(f, "wheel radius must be greater than 0, got {value}")
            }
            InvalidConfig::Inertia(value) => {
                write!(f, "wheel inertia must be at least 0 and less than 1, got {value}")
            }
            InvalidConfig::LockToLock(value) => {
                write!(f, "lock-to-lock range must be greater than 0, got {value}")
            }
            InvalidConfig::GrabWidth(value) => {
                write!(f, "grab width must be greater than 0, got {value}")
            }
            InvalidConfig::TickRate(value) => {
                write!(f, "tick rate must be between 1 and 1000, got {value}")
            }
        }
    }
}

impl Error for InvalidConfig {}
