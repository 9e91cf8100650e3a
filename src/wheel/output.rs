use std::f64::consts::TAU;

use handwheel_config::{AxisScale, Wheel};

use crate::backend::{Axis, HidSink};

/// Maps the continuous wheel angle to the steering axis.
///
/// Turning counterclockwise steers left, which is the negative end of the axis.
pub fn axis_value(angle: f64, wheel: &Wheel) -> f64 {
    let value = match wheel.axis_scale {
        AxisScale::FullLock => -angle / wheel.max_angle(),
        AxisScale::Legacy => -(angle / TAU) / (wheel.lock_to_lock / 360.),
    };
    value.clamp(-1., 1.)
}

pub fn emit<S: HidSink + ?Sized>(sink: &mut S, value: f64) -> anyhow::Result<()> {
    sink.set_axis(Axis::Steering, value)?;
    sink.sync()
}
