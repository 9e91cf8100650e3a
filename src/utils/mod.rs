use std::time::Duration;

use git_version::git_version;

pub fn version() -> String {
    format!(
        "{} ({})",
        env!("CARGO_PKG_VERSION"),
        git_version!(fallback = "unknown commit"),
    )
}

/// Time between two engine ticks at `rate` ticks per second.
pub fn tick_period(rate: u16) -> Duration {
    Duration::from_secs(1) / u32::from(rate.max(1))
}
