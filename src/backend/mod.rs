//! Virtual joystick output.

pub mod headless;
pub use headless::Headless;

pub mod uinput;
pub use uinput::Uinput;

/// Analog channels of the virtual joystick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Axis {
    Steering,
}

/// Receives normalized axis values.
///
/// Writes are buffered and only become visible to readers of the device on `sync()`.
pub trait HidSink {
    /// Sets a channel to a value in [-1, 1].
    fn set_axis(&mut self, axis: Axis, value: f64) -> anyhow::Result<()>;

    /// Flushes all pending writes at once.
    fn sync(&mut self) -> anyhow::Result<()>;
}

pub enum Backend {
    Uinput(Uinput),
    Headless(Headless),
}

impl Backend {
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Uinput(_) => "uinput",
            Backend::Headless(_) => "headless",
        }
    }

    pub fn headless(&self) -> Option<&Headless> {
        if let Self::Headless(v) = self {
            Some(v)
        } else {
            None
        }
    }
}

impl HidSink for Backend {
    fn set_axis(&mut self, axis: Axis, value: f64) -> anyhow::Result<()> {
        match self {
            Backend::Uinput(uinput) => uinput.set_axis(axis, value),
            Backend::Headless(headless) => headless.set_axis(axis, value),
        }
    }

    fn sync(&mut self) -> anyhow::Result<()> {
        match self {
            Backend::Uinput(uinput) => uinput.sync(),
            Backend::Headless(headless) => headless.sync(),
        }
    }
}
