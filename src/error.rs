use thiserror::Error;

use crate::landmarks::Chain;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RetargetError {
    #[error("no landmark frame available yet")]
    DetectionUnavailable,
    #[error("chain \"{0}\" is not present in the current landmark frame")]
    UnresolvedChain(Chain),
    #[error("chain \"{chain}\" has no landmark at index {index}")]
    MissingLandmark { chain: Chain, index: u8 },
    #[error("joint name \"{0}\" does not follow the <chain><index> convention")]
    MalformedJointName(String),
    #[error("detector failed to start: {0}")]
    DetectorStartupFailure(String),
}

impl RetargetError {
    /// Per-joint problems: skip the joint, keep going with the rest of the frame
    pub fn is_recoverable_per_joint(&self) -> bool {
        matches!(
            self,
            RetargetError::UnresolvedChain(_)
                | RetargetError::MissingLandmark { .. }
                | RetargetError::MalformedJointName(_)
        )
    }
}
