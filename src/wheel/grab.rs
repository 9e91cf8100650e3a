//! Deciding which hands hold the wheel.

use std::fmt;

use glam::DVec3;
use handwheel_config::{GripMode, Wheel};

use super::tracker::{raw_angle, two_hand_angle};
use crate::geometry::{off_plane, project};
use crate::tracking::{Hand, HandSample, Hands, SourceId};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GrabState {
    Released,
    HeldSingle {
        hand: Hand,
        source: SourceId,
        /// Where the hand grabbed the wheel.
        grab_position: DVec3,
        /// Wheel angle minus the raw hand angle at the moment of grabbing.
        ///
        /// Only logged. Single-hand steering follows tangential deltas and never reads it.
        grab_angle_offset: f64,
    },
    HeldDouble {
        /// Wheel angle minus the two-hand angle at the moment of snapping.
        offset: f64,
    },
}

/// Grab state without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrabMode {
    Released,
    Single(Hand),
    Double,
}

impl GrabState {
    pub fn mode(&self) -> GrabMode {
        match self {
            GrabState::Released => GrabMode::Released,
            GrabState::HeldSingle { hand, .. } => GrabMode::Single(*hand),
            GrabState::HeldDouble { .. } => GrabMode::Double,
        }
    }

    pub fn is_held(&self) -> bool {
        !matches!(self, GrabState::Released)
    }
}

impl fmt::Display for GrabMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrabMode::Released => f.write_str("released"),
            GrabMode::Single(hand) => write!(f, "single({hand})"),
            GrabMode::Double => f.write_str("double"),
        }
    }
}

/// Grip button state of one hand in manual grip mode.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GripLatch {
    pub grabbed: bool,
    was_pressed: bool,
}

impl GripLatch {
    pub fn update(&mut self, pressed: bool, in_bounds: bool, toggle: bool) {
        let just_pressed = pressed && !self.was_pressed;
        let just_released = !pressed && self.was_pressed;
        self.was_pressed = pressed;

        if toggle {
            if just_pressed {
                // Letting go works anywhere, grabbing only on the rim.
                self.grabbed = !self.grabbed && in_bounds;
            }
        } else {
            if just_pressed && in_bounds {
                self.grabbed = true;
            }
            if just_released {
                self.grabbed = false;
            }
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct HandGrip {
    latch: GripLatch,
    /// The hand holds the wheel.
    bound: bool,
}

#[derive(Debug, Default)]
pub struct GrabArbitrator {
    left: HandGrip,
    right: HandGrip,
}

impl GrabArbitrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_bound(&self, hand: Hand) -> bool {
        self.grip(hand).bound
    }

    /// Computes the grab state for this tick.
    ///
    /// `last_angle` is the current continuous wheel angle, used to compute the offsets that keep
    /// the angle from jumping when the grab mode changes.
    pub fn arbitrate(
        &mut self,
        wheel: &Wheel,
        hands: &Hands,
        current: &GrabState,
        last_angle: f64,
    ) -> GrabState {
        for hand in [Hand::Left, Hand::Right] {
            self.update_hand(wheel, hand, hands.get(hand));
        }

        let left = self.left.bound;
        let right = self.right.bound;

        let unsnap = wheel.grip == GripMode::Proximity
            && match (&hands.left, &hands.right) {
                (Some(l), Some(r)) => ready_to_unsnap(wheel, l.position, r.position),
                _ => false,
            };

        if left && right && !unsnap {
            if let GrabState::HeldDouble { .. } = current {
                return *current;
            }

            if let (Some(l), Some(r)) = (&hands.left, &hands.right) {
                let raw = two_hand_angle(wheel.orientation, l.position, r.position);
                return GrabState::HeldDouble {
                    offset: last_angle - raw,
                };
            }
        }

        // With a single steering hand, the right one wins.
        for hand in [Hand::Right, Hand::Left] {
            if !self.grip(hand).bound {
                continue;
            }
            let Some(sample) = hands.get(hand) else {
                continue;
            };

            if let GrabState::HeldSingle {
                hand: held, source, ..
            } = current
            {
                if *held == hand && *source == sample.source {
                    return *current;
                }
            }

            let center = DVec3::from_array(wheel.center);
            let raw = raw_angle(wheel.orientation, center, sample.position);
            return GrabState::HeldSingle {
                hand,
                source: sample.source,
                grab_position: sample.position,
                grab_angle_offset: last_angle - raw,
            };
        }

        // A bound hand without a pose keeps holding the wheel where it was.
        match current {
            GrabState::HeldDouble { .. } if left || right => *current,
            GrabState::HeldSingle { hand, .. } if self.grip(*hand).bound => *current,
            _ => GrabState::Released,
        }
    }

    fn update_hand(&mut self, wheel: &Wheel, hand: Hand, sample: Option<&HandSample>) {
        // Without a sample the hand keeps its latch, its button state and its bound flag.
        let Some(sample) = sample else {
            return;
        };

        let in_bounds = in_holding_bounds(wheel, sample.position);
        let grip = self.grip_mut(hand);
        grip.bound = match wheel.grip {
            GripMode::Manual => {
                grip.latch.update(sample.buttons.grip, in_bounds, wheel.grip_toggle);
                grip.latch.grabbed
            }
            GripMode::Proximity => in_bounds,
        };
    }

    fn grip(&self, hand: Hand) -> &HandGrip {
        match hand {
            Hand::Left => &self.left,
            Hand::Right => &self.right,
        }
    }

    fn grip_mut(&mut self, hand: Hand) -> &mut HandGrip {
        match hand {
            Hand::Left => &mut self.left,
            Hand::Right => &mut self.right,
        }
    }
}

/// Whether a hand is inside the grabbable ring around the rim.
pub fn in_holding_bounds(wheel: &Wheel, position: DVec3) -> bool {
    let rel = position - DVec3::from_array(wheel.center);
    if off_plane(wheel.orientation, rel).abs() >= wheel.grab_width {
        return false;
    }

    let distance = project(wheel.orientation, rel).length();
    wheel.radius - wheel.grab_width < distance && distance < wheel.radius + wheel.grab_width
}

/// Whether two hands are too far apart, or too far from the center, to keep steering together.
pub fn ready_to_unsnap(wheel: &Wheel, left: DVec3, right: DVec3) -> bool {
    let limit = wheel.diameter().powi(2);

    if left.distance_squared(right) > limit {
        return true;
    }

    let midpoint = (left + right) / 2.;
    midpoint.distance_squared(DVec3::from_array(wheel.center)) > limit
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use handwheel_config::Orientation;

    use super::*;
    use crate::tracking::Buttons;

    fn wheel() -> Wheel {
        Wheel {
            center: [0., 0., 0.],
            radius: 0.2,
            ..Default::default()
        }
    }

    fn sample(source: u32, x: f64, y: f64, grip: bool) -> HandSample {
        HandSample {
            source: SourceId(source),
            position: DVec3::new(x, y, 0.),
            buttons: Buttons {
                grip,
                trigger: false,
            },
        }
    }

    fn hands(left: Option<HandSample>, right: Option<HandSample>) -> Hands {
        Hands { left, right }
    }

    #[test]
    fn holding_bounds_is_an_annulus() {
        let wheel = wheel();
        assert!(in_holding_bounds(&wheel, DVec3::new(0.2, 0., 0.)));
        assert!(in_holding_bounds(&wheel, DVec3::new(0., 0.28, 0.05)));
        assert!(!in_holding_bounds(&wheel, DVec3::new(0., 0., 0.)));
        assert!(!in_holding_bounds(&wheel, DVec3::new(0.05, 0., 0.)));
        assert!(!in_holding_bounds(&wheel, DVec3::new(0.31, 0., 0.)));
        assert!(!in_holding_bounds(&wheel, DVec3::new(0.2, 0., 0.15)));
    }

    #[test]
    fn holding_bounds_follows_orientation() {
        let wheel = Wheel {
            orientation: Orientation::Horizontal,
            ..wheel()
        };
        assert!(in_holding_bounds(&wheel, DVec3::new(0., 0.05, 0.2)));
        assert!(!in_holding_bounds(&wheel, DVec3::new(0., 0.2, 0.)));
    }

    #[test]
    fn unsnap_uses_diameter() {
        let wheel = wheel();
        let left = DVec3::new(-0.2, 0., 0.);
        let right = DVec3::new(0.2, 0., 0.);
        assert!(!ready_to_unsnap(&wheel, left, right));

        let right = DVec3::new(0.25, 0., 0.);
        assert!(ready_to_unsnap(&wheel, left, right));

        // Close together but far from the center.
        let left = DVec3::new(0.45, 0., 0.);
        let right = DVec3::new(0.5, 0., 0.);
        assert!(ready_to_unsnap(&wheel, left, right));
    }

    #[test]
    fn hold_latch() {
        let mut latch = GripLatch::default();
        latch.update(true, false, false);
        assert!(!latch.grabbed, "pressing off the rim grabs nothing");

        // Still pressed, now on the rim: not a new press.
        latch.update(true, true, false);
        assert!(!latch.grabbed);

        latch.update(false, true, false);
        latch.update(true, true, false);
        assert!(latch.grabbed);

        latch.update(true, false, false);
        assert!(latch.grabbed, "moving off the rim keeps the grab");

        latch.update(false, false, false);
        assert!(!latch.grabbed);
    }

    #[test]
    fn toggle_latch() {
        let mut latch = GripLatch::default();
        latch.update(true, true, true);
        assert!(latch.grabbed);
        latch.update(false, true, true);
        assert!(latch.grabbed, "releasing the button keeps the grab");

        latch.update(true, false, true);
        assert!(!latch.grabbed, "second press lets go anywhere");
        latch.update(false, false, true);
        latch.update(true, false, true);
        assert!(!latch.grabbed, "press off the rim does not grab");
    }

    #[test]
    fn manual_single_then_double() {
        let wheel = wheel();
        let mut arb = GrabArbitrator::new();

        let state = arb.arbitrate(
            &wheel,
            &hands(Some(sample(1, -0.2, 0., false)), Some(sample(2, 0.2, 0., true))),
            &GrabState::Released,
            0.5,
        );
        assert_eq!(state.mode(), GrabMode::Single(Hand::Right));
        let GrabState::HeldSingle {
            grab_angle_offset, ..
        } = state
        else {
            unreachable!()
        };
        assert_abs_diff_eq!(grab_angle_offset, 0.5);

        let state = arb.arbitrate(
            &wheel,
            &hands(Some(sample(1, -0.2, 0., true)), Some(sample(2, 0.2, 0., true))),
            &state,
            0.5,
        );
        let GrabState::HeldDouble { offset } = state else {
            panic!("expected a two-hand grab, got {state:?}");
        };
        // Left minus right points along -x, angle π.
        assert_abs_diff_eq!(offset, 0.5 - std::f64::consts::PI, epsilon = 1e-12);

        // Double keeps its offset while both hands hold.
        let kept = arb.arbitrate(
            &wheel,
            &hands(Some(sample(1, -0.2, 0.1, true)), Some(sample(2, 0.2, -0.1, true))),
            &state,
            1.,
        );
        assert_eq!(kept, state);
    }

    #[test]
    fn right_hand_wins_single() {
        let wheel = wheel();
        let mut arb = GrabArbitrator::new();

        // Both in bounds but far apart enough to unsnap.
        let wheel = Wheel {
            grip: GripMode::Proximity,
            grab_width: 0.15,
            ..wheel
        };
        let state = arb.arbitrate(
            &wheel,
            &hands(Some(sample(1, -0.3, 0., false)), Some(sample(2, 0.3, 0., false))),
            &GrabState::Released,
            0.,
        );
        assert_eq!(state.mode(), GrabMode::Single(Hand::Right));
    }

    #[test]
    fn proximity_unsnap_is_checked_before_snap() {
        let wheel = Wheel {
            grip: GripMode::Proximity,
            grab_width: 0.15,
            ..wheel()
        };
        let mut arb = GrabArbitrator::new();

        let state = arb.arbitrate(
            &wheel,
            &hands(Some(sample(1, -0.2, 0., false)), Some(sample(2, 0.2, 0., false))),
            &GrabState::Released,
            0.,
        );
        assert_eq!(state.mode(), GrabMode::Double);

        let state = arb.arbitrate(
            &wheel,
            &hands(Some(sample(1, -0.3, 0., false)), Some(sample(2, 0.3, 0., false))),
            &state,
            0.,
        );
        assert_eq!(state.mode(), GrabMode::Single(Hand::Right));
    }

    #[test]
    fn lost_pose_keeps_grab() {
        let wheel = wheel();
        let mut arb = GrabArbitrator::new();

        let state = arb.arbitrate(
            &wheel,
            &hands(None, Some(sample(2, 0.2, 0., true))),
            &GrabState::Released,
            0.,
        );
        assert_eq!(state.mode(), GrabMode::Single(Hand::Right));

        let lost = arb.arbitrate(&wheel, &hands(None, None), &state, 0.);
        assert_eq!(lost, state);
        assert!(arb.is_bound(Hand::Right));

        // The grip was released while the pose was lost.
        let back = arb.arbitrate(
            &wheel,
            &hands(None, Some(sample(2, 0.25, 0., false))),
            &lost,
            0.,
        );
        assert_eq!(back, GrabState::Released);
    }

    #[test]
    fn new_source_regrabs() {
        let wheel = wheel();
        let mut arb = GrabArbitrator::new();

        let state = arb.arbitrate(
            &wheel,
            &hands(None, Some(sample(2, 0.2, 0., true))),
            &GrabState::Released,
            0.,
        );
        let state2 = arb.arbitrate(
            &wheel,
            &hands(None, Some(sample(7, 0.2, 0.05, true))),
            &state,
            0.,
        );
        assert!(matches!(
            state2,
            GrabState::HeldSingle {
                source: SourceId(7),
                ..
            }
        ));
    }
}
