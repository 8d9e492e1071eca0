use log::{debug, info, warn};
use nalgebra::UnitQuaternion;
use serde::Serialize;

use crate::{
    detector::LandmarkSource,
    error::RetargetError,
    landmarks::{Detection, LandmarkFrame},
    retarget_config::RetargetConfig,
    rig::{JointKey, JointTarget},
    systems::{facing::FacingSide, Systems},
};

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Nothing ticked yet, or the last tick finished applying a frame
    Idle,
    /// No fresh frame this tick; joints were left untouched
    AwaitingFrame,
    /// A fresh frame was written onto the rig
    Applying,
}

/// What one tick did
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub state: EngineState,
    pub applied: Vec<JointKey>,
    pub skipped: Vec<(JointKey, RetargetError)>,
    pub facing: Option<FacingSide>,
}

impl TickReport {
    fn awaiting(facing: Option<FacingSide>) -> Self {
        TickReport {
            state: EngineState::AwaitingFrame,
            applied: Vec::new(),
            skipped: Vec::new(),
            facing,
        }
    }
}

/// Single-slot cell for the most recently completed frame. Overwritten
/// between ticks; a frame is only "fresh" until the tick that applies it.
#[derive(Debug, Default)]
struct FrameCell {
    frame: Option<LandmarkFrame>,
    fresh: bool,
}

impl FrameCell {
    fn store(&mut self, frame: LandmarkFrame) {
        if self.fresh {
            debug!("Replacing a frame that was never applied");
        }
        self.frame = Some(frame);
        self.fresh = true;
    }
}

/// Drives a rig from hand landmark frames, one tick at a time.
pub struct RetargetingEngine {
    config: RetargetConfig,
    systems: Systems,
    cell: FrameCell,
    state: EngineState,
    frames_applied: u64,
}

impl RetargetingEngine {
    pub fn new(config: &RetargetConfig) -> Self {
        RetargetingEngine {
            config: config.clone(),
            systems: Systems::new(config),
            cell: FrameCell::default(),
            state: EngineState::Idle,
            frames_applied: 0,
        }
    }

    /// Like `new`, but rejects a config that fails validation instead of
    /// panicking on it later
    pub fn try_new(config: &RetargetConfig) -> anyhow::Result<Self> {
        config.validate()?;
        Ok(RetargetingEngine::new(config))
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn frames_applied(&self) -> u64 {
        self.frames_applied
    }

    pub fn has_fresh_frame(&self) -> bool {
        self.cell.fresh
    }

    /// Accept a completed detector result. Only the first hand is used; "no
    /// hands" leaves the last frame in place.
    pub fn submit_detection(&mut self, detection: Detection) -> bool {
        match detection.first() {
            None => {
                debug!("Detector reported no hands; keeping previous frame");
                false
            }
            Some(hand) => {
                if detection.len() > 1 {
                    debug!("{} hands detected, using the first", detection.len());
                }
                self.submit_frame(hand.to_frame())
            }
        }
    }

    pub fn submit_frame(&mut self, frame: LandmarkFrame) -> bool {
        if frame.is_empty() {
            debug!("Ignoring frame with no known chains");
            return false;
        }
        self.cell.store(frame);
        true
    }

    /// Pick up whatever the detector finished since the last poll
    pub fn poll_detector<S: LandmarkSource>(&mut self, source: &mut S) -> bool {
        match source.poll() {
            Some(detection) => self.submit_detection(detection),
            None => false,
        }
    }

    pub fn latest_frame(&self) -> Result<&LandmarkFrame, RetargetError> {
        self.cell
            .frame
            .as_ref()
            .ok_or(RetargetError::DetectionUnavailable)
    }

    /// Apply the fresh frame, if there is one, to every joint of `target`,
    /// palm root first. Joints that cannot be resolved are skipped and the
    /// rest of the frame still applies.
    pub fn tick<T: JointTarget>(&mut self, target: &mut T) -> TickReport {
        let RetargetingEngine {
            config,
            systems,
            cell,
            state,
            frames_applied,
        } = self;

        let frame = match (&cell.frame, cell.fresh) {
            (Some(frame), true) => frame,
            _ => {
                *state = EngineState::AwaitingFrame;
                return TickReport::awaiting(systems.facing_classifier.current());
            }
        };
        *state = EngineState::Applying;
        cell.fresh = false;
        *frames_applied += 1;
        debug!("Applying frame #{}", frames_applied);

        let normalize = |p| systems.position_remapping.normalize(p);

        let facing_reference = systems.chain_resolver.resolve_facing(frame).map(normalize);
        if let (Ok(palm), Ok(facing)) = (
            systems.chain_resolver.resolve_root(frame).map(normalize),
            &facing_reference,
        ) {
            systems.facing_classifier.update(&palm, facing);
        }

        let mut report = TickReport {
            state: EngineState::Applying,
            applied: Vec::new(),
            skipped: Vec::new(),
            facing: None,
        };
        let mut root_orientation: Option<UnitQuaternion<f32>> = None;

        for slot in target.slots() {
            let joint = match slot.joint {
                Ok(joint) => joint,
                Err(e) => {
                    warn!("Skipping \"{}\": {}", slot.name, e);
                    report.skipped.push((slot.key, e));
                    continue;
                }
            };

            let resolved = systems
                .chain_resolver
                .resolve(frame, &joint)
                .and_then(|r| facing_reference.clone().map(|f| (r, f)));
            let (resolved, facing) = match resolved {
                Ok(r) => r,
                Err(e) => {
                    warn!("Skipping \"{}\": {}", slot.name, e);
                    report.skipped.push((slot.key, e));
                    continue;
                }
            };

            let target_position = normalize(resolved.landmark);
            let current = target.transform(slot.key).unwrap_or_default();
            let (position, orientation) = if config.is_isolated(&joint) {
                // copied as is; only the position eases
                let orientation = root_orientation
                    .or_else(|| {
                        target
                            .root_key()
                            .and_then(|key| target.transform(key))
                            .map(|t| t.orientation)
                    })
                    .unwrap_or_else(UnitQuaternion::identity);
                (systems.smoother.smooth_position(&current, target_position), orientation)
            } else {
                let target_orientation = systems.orientation_solver.solve_composed(
                    &target_position,
                    &normalize(resolved.comparison),
                    &facing,
                );
                systems.smoother.smooth(&current, target_position, target_orientation)
            };

            if !target.set_pose(slot.key, position, orientation) {
                warn!("Joint \"{}\" disappeared from the rig", slot.name);
                continue;
            }
            debug!(
                "{} -> position {:?}, orientation {:?}",
                slot.name,
                position.as_slice(),
                orientation.euler_angles()
            );
            if joint.is_root() {
                root_orientation = Some(orientation);
            }
            report.applied.push(slot.key);
        }

        if report.applied.is_empty() {
            info!("No joints could be resolved from frame #{}", frames_applied);
        }
        report.facing = systems.facing_classifier.current();
        *state = EngineState::Idle;
        report
    }
}
