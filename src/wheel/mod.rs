//! The steering wheel engine.
//!
//! Every tick the engine takes the hand samples and works out who holds the wheel, turns the
//! continuous wheel angle accordingly, softly stops it at the lock, lets it coast and re-center
//! when nobody holds it, and maps the result to the steering axis.
//!
//! The angle is continuous: it keeps counting across full turns, so a 900° wheel really has to be
//! turned two and a half times to reach the lock.

use arrayvec::ArrayVec;
use glam::DVec3;
use handwheel_config::{InvalidConfig, Wheel};

use self::grab::{GrabArbitrator, GrabMode, GrabState};
use self::history::AngleHistory;
use self::limiter::ElasticLimit;
use self::physics::Physics;
use self::tracker::{tangential_delta, two_hand_angle, AngleUpdate};
use crate::backend::HidSink;
use crate::tracking::{sample_hands, Hand, Hands, SourceId, Tracking};

pub mod grab;
pub mod history;
pub mod limiter;
pub mod output;
pub mod physics;
pub mod tracker;


#[derive(Debug)]
pub struct Engine {
    wheel: Wheel,
    history: AngleHistory,
    grab: GrabState,
    arbitrator: GrabArbitrator,
    physics: Physics,
    /// Position of the single steering hand on the previous tick.
    prev_position: Option<DVec3>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HapticPulse {
    pub source: SourceId,
    pub strength: u16,
}

/// Result of one engine step.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub axis: f64,
    pub haptics: ArrayVec<HapticPulse, 2>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Status {
    pub angle: f64,
    pub axis: f64,
    pub turn_speed: f64,
    pub mode: GrabMode,
}

impl Engine {
    pub fn new(wheel: Wheel) -> Result<Self, InvalidConfig> {
        wheel.validate()?;

        Ok(Self {
            wheel,
            history: AngleHistory::new(),
            grab: GrabState::Released,
            arbitrator: GrabArbitrator::new(),
            physics: Physics::new(),
            prev_position: None,
        })
    }

    pub fn wheel(&self) -> &Wheel {
        &self.wheel
    }

    /// Current continuous wheel angle, radians, counterclockwise positive.
    pub fn angle(&self) -> f64 {
        self.history.last()
    }

    pub fn grab_state(&self) -> &GrabState {
        &self.grab
    }

    pub fn status(&self) -> Status {
        Status {
            angle: self.angle(),
            axis: output::axis_value(self.angle(), &self.wheel),
            turn_speed: self.physics.turn_speed,
            mode: self.grab.mode(),
        }
    }

    /// Reads the hands, advances the wheel by one tick and writes the steering axis.
    ///
    /// A sink error ends the session, the engine does no retries.
    pub fn tick<T, S>(&mut self, tracking: &mut T, sink: &mut S) -> anyhow::Result<Frame>
    where
        T: Tracking + ?Sized,
        S: HidSink + ?Sized,
    {
        let _span = tracy_client::span!("Engine::tick");

        let hands = sample_hands(tracking);
        let frame = self.step(&hands);

        for pulse in &frame.haptics {
            tracking.haptic_pulse(pulse.source, pulse.strength);
        }

        output::emit(sink, frame.axis)?;
        Ok(frame)
    }

    /// Advances the wheel by one tick.
    pub fn step(&mut self, hands: &Hands) -> Frame {
        let grab = self
            .arbitrator
            .arbitrate(&self.wheel, hands, &self.grab, self.history.last());
        self.set_grab(grab);

        if let Some(update) = self.angle_update(hands) {
            update.apply(&mut self.history);
        }

        let limit = ElasticLimit::new(self.wheel.max_angle());
        let haptic = limit.apply(&mut self.history);

        if self.grab.is_held() {
            self.physics.track(&self.history);
        } else {
            self.physics.coast(&mut self.history, &self.wheel);
        }

        let hands_off =
            !self.arbitrator.is_bound(Hand::Left) && !self.arbitrator.is_bound(Hand::Right);
        if hands_off {
            physics::apply_centering(&mut self.history, &self.wheel);
        }

        let mut haptics = ArrayVec::new();
        if let Some(strength) = haptic {
            for sample in hands.iter() {
                trace!("haptic pulse {strength} to {:?}", sample.source);
                haptics.push(HapticPulse {
                    source: sample.source,
                    strength,
                });
            }
        }

        Frame {
            axis: output::axis_value(self.history.last(), &self.wheel),
            haptics,
        }
    }

    /// Moves the wheel so that it is centered on `anchor` with its rim passing through `rim`.
    pub fn reposition(&mut self, anchor: DVec3, rim: DVec3) -> Result<(), InvalidConfig> {
        self.set_wheel(Wheel {
            center: anchor.to_array(),
            radius: anchor.distance(rim),
            ..self.wheel
        })
    }

    /// Replaces the wheel configuration as a whole.
    pub fn set_wheel(&mut self, wheel: Wheel) -> Result<(), InvalidConfig> {
        wheel.validate()?;
        self.wheel = wheel;
        Ok(())
    }

    /// Placement step: while the right trigger is held, the right hand sets the center and the
    /// left hand sets the rim.
    ///
    /// Returns whether the wheel moved.
    pub fn edit_step(&mut self, hands: &Hands) -> Result<bool, InvalidConfig> {
        let (Some(left), Some(right)) = (&hands.left, &hands.right) else {
            return Ok(false);
        };
        if !right.buttons.trigger {
            return Ok(false);
        }

        self.reposition(right.position, left.position)?;
        Ok(true)
    }

    fn set_grab(&mut self, grab: GrabState) {
        if grab == self.grab {
            return;
        }

        if grab.mode() != self.grab.mode() {
            debug!("wheel grab: {} -> {}", self.grab.mode(), grab.mode());
        }
        if let GrabState::HeldSingle {
            hand,
            grab_angle_offset,
            ..
        } = grab
        {
            trace!("grabbed with the {hand} hand, angle offset {grab_angle_offset:.4}");
        }

        self.prev_position = match grab {
            GrabState::HeldSingle { grab_position, .. } => Some(grab_position),
            _ => None,
        };
        self.grab = grab;
    }

    fn angle_update(&mut self, hands: &Hands) -> Option<AngleUpdate> {
        match self.grab {
            GrabState::Released => None,
            GrabState::HeldSingle { hand, .. } => {
                let current = hands.get(hand)?.position;
                let prev = self.prev_position.replace(current)?;
                let center = DVec3::from_array(self.wheel.center);
                let delta = tangential_delta(self.wheel.orientation, center, prev, current);
                Some(AngleUpdate::Delta(delta))
            }
            GrabState::HeldDouble { offset } => {
                let left = hands.left?.position;
                let right = hands.right?.position;
                let raw = two_hand_angle(self.wheel.orientation, left, right);
                Some(AngleUpdate::Absolute(raw + offset))
            }
        }
    }

    #[cfg(test)]
    fn set_angle(&mut self, angle: f64) {
        self.history.push(angle);
    }

    #[cfg(test)]
    fn verify_invariants(&self) {
        assert!(self.history.len() >= 2);
        assert!(self.angle().is_finite(), "angle is {}", self.angle());
        assert!(self.physics.turn_speed.is_finite());

        let axis = output::axis_value(self.angle(), &self.wheel);
        assert!((-1. ..=1.).contains(&axis));

        match self.grab {
            GrabState::Released => assert!(self.prev_position.is_none()),
            GrabState::HeldSingle { hand, .. } => {
                assert!(self.prev_position.is_some());
                assert!(self.arbitrator.is_bound(hand));
            }
            GrabState::HeldDouble { offset } => {
                assert!(self.prev_position.is_none());
                assert!(offset.is_finite());
                assert!(
                    self.arbitrator.is_bound(Hand::Left) || self.arbitrator.is_bound(Hand::Right)
                );
            }
        }
    }
}
