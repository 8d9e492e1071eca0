use nalgebra::{UnitQuaternion, Vector3};

use crate::{geometry_utils::lerp, retarget_config::RetargetConfig, rig::JointTransform};

/// Interpolates a joint's current transform towards a newly solved one.
/// Only runs when a fresh landmark frame is applied, so a stale detector
/// never makes joints drift.
#[derive(Debug, Clone)]
pub struct TransformSmoother {
    lerp_factor: f32,
}

impl TransformSmoother {
    pub fn new(config: &RetargetConfig) -> Self {
        if config.smoothing_lerp_factor <= 0. {
            panic!("Smoothing lerp factor must be above 0");
        }
        TransformSmoother {
            lerp_factor: config.smoothing_lerp_factor.min(1.),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.lerp_factor < 1.
    }

    pub fn smooth(
        &self,
        current: &JointTransform,
        target_position: Vector3<f32>,
        target_orientation: UnitQuaternion<f32>,
    ) -> (Vector3<f32>, UnitQuaternion<f32>) {
        if !self.is_enabled() {
            return (target_position, target_orientation);
        }
        let position = self.smooth_position(current, target_position);
        // slerp is undefined for exactly opposite rotations; jump straight to the target then
        let orientation = current
            .orientation
            .try_slerp(&target_orientation, self.lerp_factor, 1e-6)
            .unwrap_or(target_orientation);
        (position, orientation)
    }

    pub fn smooth_position(&self, current: &JointTransform, target: Vector3<f32>) -> Vector3<f32> {
        if !self.is_enabled() {
            return target;
        }
        let t = self.lerp_factor;
        current.position.zip_map(&target, |a, b| lerp(a, b, t))
    }
}
