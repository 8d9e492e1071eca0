use std::{f32::consts::FRAC_PI_2, fs};

use anyhow::{anyhow, Result};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

use crate::{
    landmarks::{Chain, MAX_CHAIN_LENGTH},
    rig::JointId,
    systems::orientation::RotationAxis,
};

/// Which kind of rig the engine drives; chosen once per session.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RigMode {
    /// Flat list of independent shapes, addressed by index
    IndependentShapes,
    /// Hierarchical rig with named bones
    NamedRig,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RetargetConfig {
    // -------- DETECTOR
    /// Width of the detector's input frames, in detector units (pixels)
    pub detector_width: f32,

    /// Height of the detector's input frames, in detector units (pixels)
    pub detector_height: f32,

    // -------- POSITION REMAPPING
    /// Scales the [-1,1] normalised detector range into the scene's working volume
    pub offset: f32,

    pub position_bias_x: f32,
    pub position_bias_y: f32,

    /// Detector z is multiplied by this; use 0 to ignore depth
    pub depth_scale: f32,

    // -------- ORIENTATION
    pub axis_for_chain_heading: RotationAxis,
    pub axis_for_twist: RotationAxis,

    /// Subtracted from every measured heading so that "up" reads as zero (radians)
    pub heading_offset: f32,

    /// Comparison landmark for the palm root joint
    pub root_reference: JointId,

    /// Landmark used for the twist (and facing side) reference
    pub facing_reference: JointId,

    /// Joints that copy the root's orientation instead of solving their own
    pub isolated_joints: Vec<JointId>,

    // -------- RIG
    pub rig_mode: RigMode,

    /// Joints per finger chain for generated rigs (1-5)
    pub joints_per_finger: usize,

    // -------- SMOOTHING
    /// How much to interpolate current transforms towards newly solved ones
    /// (1.0 is immediate, i.e. no smoothing, 0 is invalid)
    pub smoothing_lerp_factor: f32,
}

impl Default for RetargetConfig {
    fn default() -> Self {
        RetargetConfig {
            detector_width: 500.,
            detector_height: 500.,
            offset: 16.,
            position_bias_x: 2.,
            position_bias_y: 4.,
            depth_scale: 0.1,
            axis_for_chain_heading: RotationAxis::Z,
            axis_for_twist: RotationAxis::Y,
            heading_offset: FRAC_PI_2,
            root_reference: JointId::new(Chain::MiddleFinger, 0),
            facing_reference: JointId::new(Chain::Thumb, 0),
            isolated_joints: Vec::new(),
            rig_mode: RigMode::IndependentShapes,
            joints_per_finger: 4,
            smoothing_lerp_factor: 1.0,
        }
    }
}

impl RetargetConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.detector_width > 0.) || !(self.detector_height > 0.) {
            return Err(anyhow!(
                "Detector dimensions must be positive, got {}x{}",
                self.detector_width,
                self.detector_height
            ));
        }
        if !(self.smoothing_lerp_factor > 0. && self.smoothing_lerp_factor <= 1.) {
            return Err(anyhow!(
                "Smoothing lerp factor must be in (0, 1], got {}",
                self.smoothing_lerp_factor
            ));
        }
        if !(1..=MAX_CHAIN_LENGTH).contains(&self.joints_per_finger) {
            return Err(anyhow!(
                "Joints per finger must be between 1 and {}, got {}",
                MAX_CHAIN_LENGTH,
                self.joints_per_finger
            ));
        }
        if self.isolated_joints.iter().any(|j| j.is_root()) {
            warn!("The palm root is listed as isolated; it will still solve its own orientation");
        }
        Ok(())
    }

    pub fn is_isolated(&self, joint: &JointId) -> bool {
        !joint.is_root() && self.isolated_joints.contains(joint)
    }

    pub fn write_config_to_file(&self, config_file_path: &str) -> Result<()> {
        debug!("Current state of config: {:?}", self);
        let text = serde_json::to_string_pretty(self)?;
        match fs::write(config_file_path, text) {
            Ok(()) => {
                info!("Wrote config to file: {:?}", config_file_path);
                Ok(())
            }
            Err(e) => {
                error!("Error writing config to file: {:?}", e);
                Err(anyhow!("Failed to write config to {}: {}", config_file_path, e))
            }
        }
    }
}

pub fn load_config_from_file(config_file_path: &str) -> Result<RetargetConfig> {
    match fs::read_to_string(config_file_path) {
        Err(e) => {
            if e.kind() == std::io::ErrorKind::NotFound {
                warn!(
                    "Retarget Config file not found at {}, will use defaults",
                    &config_file_path
                );
                Ok(RetargetConfig::default())
            } else {
                Err(anyhow!(
                    "Failed to load Retarget Config from disk; error: {:?}",
                    e
                ))
            }
        }
        Ok(s) => {
            info!("Loaded Retarget config OK from \"{}\"", config_file_path);
            let config = parse_config(&s)?;
            debug!("Config parsed data from file: {:?}", &config);
            Ok(config)
        }
    }
}

pub fn parse_config(text: &str) -> Result<RetargetConfig> {
    let config = serde_json::from_str::<RetargetConfig>(text)
        .map_err(|e| anyhow!("Failed to parse config data: {}", e))?;
    config.validate()?;
    Ok(config)
}
