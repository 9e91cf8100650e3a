//! Headless backend for tests and dry runs.
//!
//! Keeps the latest synced frame in memory instead of talking to a device.

use std::collections::BTreeMap;

use super::{Axis, HidSink};

#[derive(Debug, Default)]
pub struct Headless {
    pending: BTreeMap<Axis, f64>,
    synced: BTreeMap<Axis, f64>,
    frame_count: u64,
}

impl Headless {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of frames flushed so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Last synced value of an axis.
    pub fn axis(&self, axis: Axis) -> Option<f64> {
        self.synced.get(&axis).copied()
    }
}

impl HidSink for Headless {
    fn set_axis(&mut self, axis: Axis, value: f64) -> anyhow::Result<()> {
        self.pending.insert(axis, value);
        Ok(())
    }

    fn sync(&mut self) -> anyhow::Result<()> {
        self.synced.append(&mut self.pending);
        self.frame_count += 1;
        trace!("headless frame {}: {:?}", self.frame_count, self.synced);
        Ok(())
    }
}
