pub mod chain_resolver;
pub mod facing;
pub mod orientation;
pub mod position_remapping;
pub mod smoothing;

use chain_resolver::ChainResolver;
use facing::FacingClassifier;
use log::{info, warn};
use orientation::OrientationSolver;
use position_remapping::PositionRemapping;
use smoothing::TransformSmoother;

use crate::retarget_config::RetargetConfig;

pub struct Systems {
    pub position_remapping: PositionRemapping,
    pub orientation_solver: OrientationSolver,
    pub facing_classifier: FacingClassifier,
    pub chain_resolver: ChainResolver,
    pub smoother: TransformSmoother,
}

impl Systems {
    pub fn new(config: &RetargetConfig) -> Systems {
        let position_remapping = PositionRemapping::new(config);
        let ((min_x, max_x), (min_y, max_y)) = position_remapping.bounds();
        info!(
            "Detector frame {}x{} maps to x [{}, {}], y [{}, {}]",
            config.detector_width, config.detector_height, min_x, max_x, min_y, max_y
        );

        let smoother = TransformSmoother::new(config);
        if smoother.is_enabled() {
            info!("Smoothing enabled, lerp factor {}", config.smoothing_lerp_factor);
        } else {
            warn!("Smoothing disabled; joints will snap to each new frame");
        }

        Systems {
            position_remapping,
            orientation_solver: OrientationSolver::new(config),
            facing_classifier: FacingClassifier::new(),
            chain_resolver: ChainResolver::new(config),
            smoother,
        }
    }
}
