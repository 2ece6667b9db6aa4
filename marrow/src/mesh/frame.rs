//! Local coordinate frames along a limb
//!
//! Every ball carries an orthonormal frame `(direction, local_y, local_z)`
//! where `direction` is the travel direction of the limb at that ball and
//! the other two axes span its cross-section plane.  The construction from
//! a bare direction is deterministic (no free rotation left to choose), at
//! the cost of a discontinuity at the world-Y-parallel case, where the
//! helper axis switches to world X.
use nalgebra::{Rotation3, Unit, Vector3};

/// Directions shorter than this are treated as degenerate
pub(crate) const DIRECTION_EPSILON: f32 = 1e-6;

/// Cross products shorter than this mean the inputs are (anti)parallel
pub(crate) const PARALLEL_EPSILON: f32 = 1e-4;

/// Orthonormal local frame at a ball
#[derive(Copy, Clone, Debug)]
pub struct Frame {
    /// Unit direction of travel along the limb
    pub direction: Vector3<f32>,
    /// First cross-section axis
    pub local_y: Vector3<f32>,
    /// Second cross-section axis
    pub local_z: Vector3<f32>,
}

impl Frame {
    /// Builds the canonical frame for a direction
    ///
    /// The helper axis is world Y, or world X when the direction is
    /// (anti)parallel to Y; `local_y = helper × d`, `local_z = local_y × d`,
    /// both normalized.  A degenerate (near-zero) direction falls back to
    /// world Y rather than producing NaNs.
    pub fn from_direction(direction: Vector3<f32>) -> Self {
        let d = if direction.norm() > DIRECTION_EPSILON {
            direction.normalize()
        } else {
            Vector3::y()
        };
        let helper = if d.cross(&Vector3::y()).norm() <= PARALLEL_EPSILON {
            Vector3::x()
        } else {
            Vector3::y()
        };
        let local_y = helper.cross(&d).normalize();
        let local_z = local_y.cross(&d).normalize();
        Self {
            direction: d,
            local_y,
            local_z,
        }
    }

    /// The four corners of the cross-section quad at `position`
    ///
    /// Corners run in a cycle (`+y+z`, `-y+z`, `-y-z`, `+y-z`), so
    /// consecutive corners differ by a single sign flip.
    pub fn cross_section(
        &self,
        position: Vector3<f32>,
        radius: f32,
    ) -> [Vector3<f32>; 4] {
        let y = self.local_y * radius;
        let z = self.local_z * radius;
        [
            position + y + z,
            position - y + z,
            position - y - z,
            position + y - z,
        ]
    }
}

/// Rotates `v` by `angle` radians about `axis`
pub(crate) fn rotate_about(
    v: Vector3<f32>,
    axis: Unit<Vector3<f32>>,
    angle: f32,
) -> Vector3<f32> {
    Rotation3::from_axis_angle(&axis, angle) * v
}
