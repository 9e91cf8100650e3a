//! Turning hand positions into wheel angles.

use glam::DVec3;
use handwheel_config::Orientation;

use super::history::AngleHistory;
use crate::geometry::{angle_of, project};

/// Below this distance from the center (meters) a hand is treated as sitting on the pivot.
pub const MIN_RADIUS: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AngleUpdate {
    /// An absolute angle that may be off by whole turns.
    Absolute(f64),
    /// An increment relative to the last angle.
    Delta(f64),
}

impl AngleUpdate {
    pub fn apply(self, history: &mut AngleHistory) {
        match self {
            AngleUpdate::Absolute(angle) => history.push_unwrapped(angle),
            AngleUpdate::Delta(delta) => history.push(history.last() + delta),
        }
    }
}

/// Angle of the line going from the right hand to the left hand.
pub fn two_hand_angle(orientation: Orientation, left: DVec3, right: DVec3) -> f64 {
    angle_of(project(orientation, left - right))
}

/// Angle of a single hand around the wheel center.
pub fn raw_angle(orientation: Orientation, center: DVec3, hand: DVec3) -> f64 {
    angle_of(project(orientation, hand - center))
}

/// Angle increment of a hand that moved from `prev` to `current`.
///
/// Only the motion perpendicular to the radius counts, divided by the current radius. This makes
/// turning feel the same no matter how far from the center the hand holds the wheel.
pub fn tangential_delta(
    orientation: Orientation,
    center: DVec3,
    prev: DVec3,
    current: DVec3,
) -> f64 {
    let c = project(orientation, current - center);
    let d = project(orientation, current - prev);

    let radius = c.length();
    if radius < MIN_RADIUS {
        return 0.;
    }

    let tangential = c.perp_dot(d) / radius;
    tangential / radius
}
