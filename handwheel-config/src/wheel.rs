use std::f64::consts::PI;

use crate::error::InvalidConfig;
use crate::utils::{Flag, MergeWith};
use crate::FloatOrInt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Wheel {
    /// Wheel center in seated tracking space, meters.
    pub center: [f64; 3],
    /// Distance from the center to the rim, meters.
    pub radius: f64,
    /// Total rotation from one lock to the other, degrees.
    pub lock_to_lock: f64,
    pub orientation: Orientation,
    /// Multiplier applied to `center_speed`.
    pub center_force: f64,
    /// Centering speed in radians per tick.
    pub center_speed: f64,
    /// Fraction of the turn speed kept every tick after letting go.
    pub inertia: f64,
    /// Half-width of the grabbable ring around the rim, meters.
    pub grab_width: f64,
    pub grip: GripMode,
    /// Grip press toggles the grab instead of holding it.
    pub grip_toggle: bool,
    pub axis_scale: AxisScale,
}

impl Default for Wheel {
    fn default() -> Self {
        Self {
            center: [0., -0.4, -0.35],
            radius: 0.175,
            lock_to_lock: 900.,
            orientation: Orientation::default(),
            center_force: 1.,
            center_speed: PI / 18.,
            inertia: 0.95,
            grab_width: 0.1,
            grip: GripMode::default(),
            grip_toggle: false,
            axis_scale: AxisScale::default(),
        }
    }
}

#[derive(knuffel::Decode, Debug, Default, Clone, Copy, PartialEq)]
pub struct WheelPart {
    #[knuffel(child)]
    pub center: Option<Center>,
    #[knuffel(child, unwrap(argument))]
    pub radius: Option<FloatOrInt<0, 100>>,
    #[knuffel(child, unwrap(argument))]
    pub lock_to_lock: Option<FloatOrInt<0, 7200>>,
    #[knuffel(child, unwrap(argument))]
    pub orientation: Option<Orientation>,
    #[knuffel(child, unwrap(argument))]
    pub center_force: Option<FloatOrInt<0, 100>>,
    #[knuffel(child, unwrap(argument))]
    pub center_speed: Option<FloatOrInt<0, 10>>,
    #[knuffel(child, unwrap(argument))]
    pub inertia: Option<FloatOrInt<0, 1>>,
    #[knuffel(child, unwrap(argument))]
    pub grab_width: Option<FloatOrInt<0, 10>>,
    #[knuffel(child, unwrap(argument))]
    pub grip: Option<GripMode>,
    #[knuffel(child)]
    pub grip_toggle: Option<Flag>,
    #[knuffel(child, unwrap(argument))]
    pub axis_scale: Option<AxisScale>,
}

impl MergeWith<WheelPart> for Wheel {
    fn merge_with(&mut self, part: &WheelPart) {
        merge!(
            (self, part),
            center,
            radius,
            lock_to_lock,
            center_force,
            center_speed,
            inertia,
            grab_width,
            grip_toggle,
        );
        merge_clone!((self, part), orientation, grip, axis_scale);
    }
}

/// `center x y z`
#[derive(knuffel::Decode, Debug, Clone, Copy, PartialEq)]
pub struct Center {
    #[knuffel(argument)]
    pub x: FloatOrInt<-1000, 1000>,
    #[knuffel(argument)]
    pub y: FloatOrInt<-1000, 1000>,
    #[knuffel(argument)]
    pub z: FloatOrInt<-1000, 1000>,
}

impl MergeWith<Center> for [f64; 3] {
    fn merge_with(&mut self, part: &Center) {
        *self = [part.x.0, part.y.0, part.z.0];
    }
}

#[derive(knuffel::DecodeScalar, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Facing the driver, like a car wheel.
    #[default]
    Vertical,
    /// Lying flat, like a ship's helm seen from above.
    Horizontal,
}

#[derive(knuffel::DecodeScalar, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum GripMode {
    /// The grip button grabs the rim.
    #[default]
    Manual,
    /// Any hand inside the grabbable ring holds the wheel.
    Proximity,
}

#[derive(knuffel::DecodeScalar, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum AxisScale {
    /// Full lock maps to the ends of the axis.
    #[default]
    FullLock,
    /// Full lock maps to half of the axis range.
    Legacy,
}

impl Wheel {
    /// Rotation from center to either lock, radians.
    pub fn max_angle(&self) -> f64 {
        self.lock_to_lock / 360. * PI
    }

    pub fn diameter(&self) -> f64 {
        self.radius * 2.
    }

    pub fn validate(&self) -> Result<(), InvalidConfig> {
        if !(self.radius.is_finite() && self.radius > 0.) {
            return Err(InvalidConfig::Radius(self.radius));
        }
        if !(0. ..1.).contains(&self.inertia) {
            return Err(InvalidConfig::Inertia(self.inertia));
        }
        if !(self.lock_to_lock.is_finite() && self.lock_to_lock > 0.) {
            return Err(InvalidConfig::LockToLock(self.lock_to_lock));
        }
        if !(self.grab_width.is_finite() && self.grab_width > 0.) {
            return Err(InvalidConfig::GrabWidth(self.grab_width));
        }
        Ok(())
    }

    /// Formats the wheel as a `wheel` config section.
    pub fn to_kdl(&self) -> String {
        let [x, y, z] = self.center;
        let orientation = match self.orientation {
            Orientation::Vertical => "vertical",
            Orientation::Horizontal => "horizontal",
        };
        let grip = match self.grip {
            GripMode::Manual => "manual",
            GripMode::Proximity => "proximity",
        };
        let axis_scale = match self.axis_scale {
            AxisScale::FullLock => "full-lock",
            AxisScale::Legacy => "legacy",
        };

        let mut kdl = String::from("wheel {\n");
        kdl += &format!("    center {x} {y} {z}\n");
        kdl += &format!("    radius {}\n", self.radius);
        kdl += &format!("    lock-to-lock {}\n", self.lock_to_lock);
        kdl += &format!("    orientation \"{orientation}\"\n");
        kdl += &format!("    center-force {}\n", self.center_force);
        kdl += &format!("    center-speed {}\n", self.center_speed);
        kdl += &format!("    inertia {}\n", self.inertia);
        kdl += &format!("    grab-width {}\n", self.grab_width);
        kdl += &format!("    grip \"{grip}\"\n");
        if self.grip_toggle {
            kdl += "    grip-toggle\n";
        }
        kdl += &format!("    axis-scale \"{axis_scale}\"\n");
        kdl += "}\n";
        kdl
    }
}
