//! Projection of tracking-space positions onto the wheel plane.
//!
//! In-plane coordinates are `(u, v)`: `(x, y)` for a vertical wheel, `(x, z)` for a horizontal one.
//! Angles are measured with `atan2(v, u)`.

use std::f64::consts::{PI, TAU};

use glam::{DVec2, DVec3};
use handwheel_config::Orientation;

pub fn project(orientation: Orientation, v: DVec3) -> DVec2 {
    match orientation {
        Orientation::Vertical => DVec2::new(v.x, v.y),
        Orientation::Horizontal => DVec2::new(v.x, v.z),
    }
}

/// Signed distance along the wheel axis.
pub fn off_plane(orientation: Orientation, v: DVec3) -> f64 {
    match orientation {
        Orientation::Vertical => v.z,
        Orientation::Horizontal => v.y,
    }
}

pub fn angle_of(v: DVec2) -> f64 {
    v.y.atan2(v.x)
}

/// Wraps an angle into (-π, π].
pub fn wrap_angle(angle: f64) -> f64 {
    if angle > -PI && angle <= PI {
        return angle;
    }

    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI {
        wrapped + TAU
    } else {
        wrapped
    }
}
