use log::{debug, info};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Coarse palm-vs-back classification relative to the capture device.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacingSide {
    Front,
    Back,
}

/// Only valid for a hand held roughly square to the camera; purely
/// informational.
pub fn classify_side(palm_base: &Vector3<f32>, facing_reference: &Vector3<f32>) -> FacingSide {
    if palm_base.x < facing_reference.x {
        FacingSide::Front
    } else {
        FacingSide::Back
    }
}

/// Remembers the last classification so that changes can be logged once
#[derive(Debug, Default)]
pub struct FacingClassifier {
    current: Option<FacingSide>,
}

impl FacingClassifier {
    pub fn new() -> Self {
        FacingClassifier { current: None }
    }

    /// Classify, and return Some(side) only if it differs from the previous result
    pub fn update(
        &mut self,
        palm_base: &Vector3<f32>,
        facing_reference: &Vector3<f32>,
    ) -> Option<FacingSide> {
        let side = classify_side(palm_base, facing_reference);
        if self.current == Some(side) {
            debug!("Facing side unchanged: {:?}", side);
            None
        } else {
            info!("Facing side changed: {:?} -> {:?}", self.current, side);
            self.current = Some(side);
            Some(side)
        }
    }

    pub fn current(&self) -> Option<FacingSide> {
        self.current
    }
}
