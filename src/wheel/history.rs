use crate::geometry::wrap_angle;

pub const HISTORY_LEN: usize = 10;

/// Most recent continuous wheel angles, oldest dropped first.
///
/// Always holds at least two entries so that the previous angle is defined.
#[derive(Debug, Clone)]
pub struct AngleHistory {
    angles: [f64; HISTORY_LEN],
    /// Index the next push writes to.
    next: usize,
    len: usize,
}

impl AngleHistory {
    pub fn new() -> Self {
        Self {
            angles: [0.; HISTORY_LEN],
            next: 2,
            len: 2,
        }
    }

    pub fn push(&mut self, angle: f64) {
        self.angles[self.next] = angle;
        self.next = (self.next + 1) % HISTORY_LEN;
        self.len = (self.len + 1).min(HISTORY_LEN);
    }

    /// Pushes an absolute angle, removing the ±2π jump from the last entry.
    pub fn push_unwrapped(&mut self, raw: f64) {
        let last = self.last();
        self.push(last + wrap_angle(raw - last));
    }

    pub fn last(&self) -> f64 {
        self.angles[self.index_from_end(1)]
    }

    pub fn prev(&self) -> f64 {
        self.angles[self.index_from_end(2)]
    }

    pub fn set_last(&mut self, angle: f64) {
        let idx = self.index_from_end(1);
        self.angles[idx] = angle;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        let start = self.next + HISTORY_LEN - self.len;
        (0..self.len).map(move |i| self.angles[(start + i) % HISTORY_LEN])
    }

    fn index_from_end(&self, n: usize) -> usize {
        (self.next + HISTORY_LEN - n) % HISTORY_LEN
    }
}

impl Default for AngleHistory {
    fn default() -> Self {
        Self::new()
    }
}
