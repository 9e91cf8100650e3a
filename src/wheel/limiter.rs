use super::history::AngleHistory;

/// Fraction of the overrun kept every tick past the lock.
pub const ELASTICITY: f64 = 0.25;

/// Smallest per-tick angle change past the lock that still buzzes the controllers.
pub const HAPTIC_THRESHOLD: f64 = 0.015;

const HAPTIC_BASE: f64 = 1500.;
const HAPTIC_PER_RADIAN: f64 = 2500.;
pub const HAPTIC_MAX: u16 = 3999;

/// Soft stop at the wheel lock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElasticLimit {
    pub limit: f64,
    pub elasticity: f64,
}

impl ElasticLimit {
    pub fn new(limit: f64) -> Self {
        Self {
            limit,
            elasticity: ELASTICITY,
        }
    }

    /// How far past the lock the angle is, or 0.
    pub fn overrun(&self, angle: f64) -> f64 {
        (angle.abs() - self.limit).max(0.)
    }

    pub fn clamp(&self, angle: f64) -> f64 {
        let over = self.overrun(angle);
        if over == 0. {
            return angle;
        }

        angle.signum() * (self.limit + over * self.elasticity)
    }

    /// Clamps the newest angle in place.
    ///
    /// Returns the haptic pulse strength to request, if the wheel is past the lock and still
    /// moving.
    pub fn apply(&self, history: &mut AngleHistory) -> Option<u16> {
        let angle = history.last();
        let over = self.overrun(angle);
        if over == 0. {
            return None;
        }

        history.set_last(self.clamp(angle));

        let moved = (history.last() - history.prev()).abs();
        (moved > HAPTIC_THRESHOLD).then(|| haptic_strength(over))
    }
}

pub fn haptic_strength(over: f64) -> u16 {
    (HAPTIC_BASE + over * HAPTIC_PER_RADIAN).min(f64::from(HAPTIC_MAX)) as u16
}
