use nalgebra::{Unit, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::{geometry_utils::heading_angle, retarget_config::RetargetConfig};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RotationAxis {
    X,
    Y,
    Z,
}

impl RotationAxis {
    pub fn unit(&self) -> Unit<Vector3<f32>> {
        match self {
            RotationAxis::X => Vector3::x_axis(),
            RotationAxis::Y => Vector3::y_axis(),
            RotationAxis::Z => Vector3::z_axis(),
        }
    }
}

/// Builds joint orientations from render-space landmark positions.
///
/// The heading aligns a joint with its chain neighbour; the twist turns it
/// about its length towards the facing reference. The two are composed as
/// `heading * twist`, i.e. the twist is applied in the heading's local frame.
/// Swapping the order changes which side of the hand faces the camera.
#[derive(Debug, Clone)]
pub struct OrientationSolver {
    heading_axis: RotationAxis,
    twist_axis: RotationAxis,
    zero_offset: f32,
}

impl OrientationSolver {
    pub fn new(config: &RetargetConfig) -> Self {
        OrientationSolver {
            heading_axis: config.axis_for_chain_heading,
            twist_axis: config.axis_for_twist,
            zero_offset: config.heading_offset,
        }
    }

    /// Rotation about `axis` by the heading from `origin` towards `reference`.
    /// Coincident points have no heading and give the identity.
    pub fn solve_heading(
        &self,
        origin: &Vector3<f32>,
        reference: &Vector3<f32>,
        axis: RotationAxis,
    ) -> UnitQuaternion<f32> {
        match heading_angle(origin, reference, self.zero_offset) {
            Some(angle) => UnitQuaternion::from_axis_angle(&axis.unit(), angle),
            None => UnitQuaternion::identity(),
        }
    }

    pub fn solve_composed(
        &self,
        origin: &Vector3<f32>,
        chain_reference: &Vector3<f32>,
        facing_reference: &Vector3<f32>,
    ) -> UnitQuaternion<f32> {
        let heading = self.solve_heading(origin, chain_reference, self.heading_axis);
        let twist = self.solve_heading(origin, facing_reference, self.twist_axis);
        heading * twist
    }
}
