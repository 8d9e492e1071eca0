use map_range::MapRange;
use nalgebra::Vector3;

use crate::{retarget_config::RetargetConfig, Point3D};

/// Maps detector-space landmarks (pixels, origin top-left, y down) into
/// render space (y up, centred on the configured bias).
#[derive(Debug, Clone)]
pub struct PositionRemapping {
    width: f32,
    height: f32,
    offset: f32,
    bias_x: f32,
    bias_y: f32,
    depth_scale: f32,
}

impl PositionRemapping {
    pub fn new(config: &RetargetConfig) -> Self {
        PositionRemapping {
            width: config.detector_width,
            height: config.detector_height,
            offset: config.offset,
            bias_x: config.position_bias_x,
            bias_y: config.position_bias_y,
            depth_scale: config.depth_scale,
        }
    }

    pub fn normalize(&self, p: Point3D) -> Vector3<f32> {
        let (x, y, z) = p;
        Vector3::new(
            x.map_range(0. ..self.width, -1. ..1.) * self.offset + self.bias_x,
            -y.map_range(0. ..self.height, -1. ..1.) * self.offset + self.bias_y,
            z * self.depth_scale,
        )
    }

    /// Render-space bounds (min, max) of the x and y axes for points inside the detector frame
    pub fn bounds(&self) -> ((f32, f32), (f32, f32)) {
        let offset = self.offset.abs();
        (
            (self.bias_x - offset, self.bias_x + offset),
            (self.bias_y - offset, self.bias_y + offset),
        )
    }
}
