//! Hand tracking input.

use std::fmt;

use glam::DVec3;

pub mod replay;
pub use replay::Replay;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hand {
    Left,
    Right,
}

impl fmt::Display for Hand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Hand::Left => "left",
            Hand::Right => "right",
        })
    }
}

/// Stable identifier of a tracked controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: DVec3,
    pub valid: bool,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Buttons {
    pub grip: bool,
    pub trigger: bool,
}

/// One hand as seen during one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandSample {
    pub source: SourceId,
    pub position: DVec3,
    pub buttons: Buttons,
}

/// Hands with a valid pose this tick.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Hands {
    pub left: Option<HandSample>,
    pub right: Option<HandSample>,
}

impl Hands {
    pub fn get(&self, hand: Hand) -> Option<&HandSample> {
        match hand {
            Hand::Left => self.left.as_ref(),
            Hand::Right => self.right.as_ref(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &HandSample> {
        self.left.iter().chain(self.right.iter())
    }
}

/// Source of controller poses and buttons, and sink for haptic feedback.
pub trait Tracking {
    /// Moves on to the next tick.
    ///
    /// Returns `false` when there is nothing more to track.
    fn advance(&mut self) -> bool;

    fn hand_source(&self, hand: Hand) -> Option<SourceId>;
    fn pose(&self, source: SourceId) -> Option<Pose>;
    fn buttons(&self, source: SourceId) -> Buttons;

    /// Requests a haptic pulse, fire-and-forget.
    fn haptic_pulse(&mut self, source: SourceId, strength: u16);
}

/// Reads both hands, leaving out the ones without a valid pose.
pub fn sample_hands<T: Tracking + ?Sized>(tracking: &T) -> Hands {
    let sample = |hand: Hand| {
        let source = tracking.hand_source(hand)?;
        let Some(pose) = tracking.pose(source).filter(|pose| pose.valid) else {
            trace!("no valid pose for the {hand} hand, skipping it this tick");
            return None;
        };

        Some(HandSample {
            source,
            position: pose.position,
            buttons: tracking.buttons(source),
        })
    };

    Hands {
        left: sample(Hand::Left),
        right: sample(Hand::Right),
    }
}
