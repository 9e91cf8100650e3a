//! Wheel motion while nobody holds it.

use handwheel_config::Wheel;

use super::history::AngleHistory;

/// Extra inertia decay while past the lock.
const OVERTURN_BLEED: f64 = 0.95;

/// Deflection, as a fraction of the lock, where the centering force starts growing.
const CENTERING_RAMP_START: f64 = 0.7;
/// Centering force multiplier at the lock.
const CENTERING_RAMP_END: f64 = 1.8;
/// Centering force multiplier past the lock.
const CENTERING_OVERTURNED: f64 = 1.5;

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Physics {
    /// Angle change per tick.
    pub turn_speed: f64,
}

impl Physics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remembers how fast the hands are turning the wheel.
    pub fn track(&mut self, history: &AngleHistory) {
        self.turn_speed = history.last() - history.prev();
    }

    /// Lets the wheel spin on by itself, pushing the new angle.
    pub fn coast(&mut self, history: &mut AngleHistory, wheel: &Wheel) {
        let max_angle = wheel.max_angle();
        let angle = history.last();
        let overturned = angle.abs() > max_angle;

        if overturned {
            let toward_center = -angle.signum();
            let min_speed = overturn_return_speed(angle, max_angle);
            if self.turn_speed * toward_center < min_speed {
                self.turn_speed = toward_center * min_speed;
            }
        }

        history.push(angle + self.turn_speed);

        if overturned {
            self.turn_speed *= wheel.inertia * OVERTURN_BLEED;
        } else {
            self.turn_speed *= wheel.inertia;
        }
    }
}

/// Slowest speed at which an overturned wheel heads back to the lock.
pub fn overturn_return_speed(angle: f64, max_angle: f64) -> f64 {
    let over = angle.abs() - max_angle;
    let ratio = (over / (max_angle * 0.2)).min(1.);
    0.01 + ratio * 0.02
}

pub fn centering_force(angle: f64, wheel: &Wheel) -> f64 {
    let base = wheel.center_speed * wheel.center_force;
    let deflection = angle.abs() / wheel.max_angle();

    if deflection > 1. {
        base * CENTERING_OVERTURNED
    } else if deflection > CENTERING_RAMP_START {
        let t = (deflection - CENTERING_RAMP_START) / (1. - CENTERING_RAMP_START);
        base * (1. + (CENTERING_RAMP_END - 1.) * t)
    } else {
        base
    }
}

/// Pulls the newest angle toward zero, landing exactly on zero.
pub fn apply_centering(history: &mut AngleHistory, wheel: &Wheel) {
    let angle = history.last();
    let force = centering_force(angle, wheel);

    if angle.abs() <= force {
        history.set_last(0.);
    } else {
        history.set_last(angle - force * angle.signum());
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use approx::assert_abs_diff_eq;

    use super::*;

    fn wheel() -> Wheel {
        Wheel {
            lock_to_lock: 360.,
            center_speed: 0.1,
            center_force: 1.,
            inertia: 0.5,
            ..Default::default()
        }
    }

    #[test]
    fn centering_ramps_up_near_the_lock() {
        let wheel = wheel();
        assert_abs_diff_eq!(centering_force(0., &wheel), 0.1);
        assert_abs_diff_eq!(centering_force(0.7 * PI, &wheel), 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(centering_force(0.85 * PI, &wheel), 0.14, epsilon = 1e-12);
        assert_abs_diff_eq!(centering_force(PI, &wheel), 0.18, epsilon = 1e-12);
        assert_abs_diff_eq!(centering_force(-1.1 * PI, &wheel), 0.15, epsilon = 1e-12);
    }

    #[test]
    fn centering_snaps_to_zero() {
        let wheel = wheel();
        let mut history = AngleHistory::new();
        history.push(0.25);

        apply_centering(&mut history, &wheel);
        assert_abs_diff_eq!(history.last(), 0.15, epsilon = 1e-12);
        apply_centering(&mut history, &wheel);
        assert_abs_diff_eq!(history.last(), 0.05, epsilon = 1e-12);
        apply_centering(&mut history, &wheel);
        assert_eq!(history.last(), 0.);
        apply_centering(&mut history, &wheel);
        assert_eq!(history.last(), 0.);
    }

    #[test]
    fn no_centering_force_keeps_angle() {
        let wheel = Wheel {
            center_force: 0.,
            ..wheel()
        };
        let mut history = AngleHistory::new();
        history.push(-1.);
        apply_centering(&mut history, &wheel);
        assert_eq!(history.last(), -1.);
    }

    #[test]
    fn coast_decays() {
        let wheel = wheel();
        let mut history = AngleHistory::new();
        let mut physics = Physics { turn_speed: 0.2 };

        physics.coast(&mut history, &wheel);
        assert_abs_diff_eq!(history.last(), 0.2);
        assert_abs_diff_eq!(physics.turn_speed, 0.1);

        physics.coast(&mut history, &wheel);
        assert_abs_diff_eq!(history.last(), 0.3, epsilon = 1e-12);
        assert_abs_diff_eq!(physics.turn_speed, 0.05);
    }

    #[test]
    fn overturned_coast_heads_back() {
        let wheel = Wheel {
            inertia: 0.,
            ..wheel()
        };
        let mut history = AngleHistory::new();
        history.push(PI + 0.1);
        let mut physics = Physics { turn_speed: 0.5 };

        physics.coast(&mut history, &wheel);

        // ratio = 0.1 / (0.2π)
        let expected = 0.01 + 0.1 / (0.2 * PI) * 0.02;
        assert_abs_diff_eq!(history.last(), PI + 0.1 - expected, epsilon = 1e-12);
        assert_eq!(physics.turn_speed, 0.);
    }

    #[test]
    fn fast_return_is_not_slowed_down() {
        let wheel = wheel();
        let mut history = AngleHistory::new();
        history.push(-PI - 0.1);
        let mut physics = Physics { turn_speed: 0.2 };

        physics.coast(&mut history, &wheel);
        assert_abs_diff_eq!(history.last(), -PI + 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(physics.turn_speed, 0.2 * 0.5 * 0.95, epsilon = 1e-12);
    }

    #[test]
    fn return_speed_saturates() {
        assert_abs_diff_eq!(overturn_return_speed(10., 1.), 0.03);
        assert_abs_diff_eq!(overturn_return_speed(1., 1.), 0.01);
    }

    #[test]
    fn track_is_discrete_derivative() {
        let mut history = AngleHistory::new();
        history.push(1.);
        history.push(1.25);
        let mut physics = Physics::new();
        physics.track(&history);
        assert_abs_diff_eq!(physics.turn_speed, 0.25);
    }
}
