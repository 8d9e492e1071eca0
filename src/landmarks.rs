use std::fmt;

use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{error::RetargetError, Point3D};

/// Longest finger chain a detector may report, root to tip
pub const MAX_CHAIN_LENGTH: usize = 5;

/// Number of keypoints in the flat (MediaPipe-style) hand layout
pub const FLAT_KEYPOINT_COUNT: usize = 21;

/// Named landmark chains, as the detector labels them.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum Chain {
    PalmBase,
    Thumb,
    IndexFinger,
    MiddleFinger,
    RingFinger,
    Pinky,
}

impl Chain {
    /// All chains, palm root first, then fingers in declared order
    pub const ALL: [Chain; 6] = [
        Chain::PalmBase,
        Chain::Thumb,
        Chain::IndexFinger,
        Chain::MiddleFinger,
        Chain::RingFinger,
        Chain::Pinky,
    ];

    pub const FINGERS: [Chain; 5] = [
        Chain::Thumb,
        Chain::IndexFinger,
        Chain::MiddleFinger,
        Chain::RingFinger,
        Chain::Pinky,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Chain::PalmBase => "palmBase",
            Chain::Thumb => "thumb",
            Chain::IndexFinger => "indexFinger",
            Chain::MiddleFinger => "middleFinger",
            Chain::RingFinger => "ringFinger",
            Chain::Pinky => "pinky",
        }
    }

    pub fn from_name(name: &str) -> Option<Chain> {
        Chain::ALL.iter().copied().find(|c| c.name() == name)
    }

    pub fn is_root(&self) -> bool {
        matches!(self, Chain::PalmBase)
    }

    /// How many landmarks this chain can hold at most
    pub fn max_len(&self) -> usize {
        if self.is_root() {
            1
        } else {
            MAX_CHAIN_LENGTH
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Raw detector annotations: chain name -> ordered points, root to tip
pub type Annotations = IndexMap<String, Vec<Point3D>>;

/// One hand as reported by the detector. Some detectors provide named
/// annotations, others only the flat 21-keypoint list.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct HandPrediction {
    #[serde(default)]
    pub annotations: Annotations,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub landmarks: Vec<Point3D>,
}

impl HandPrediction {
    pub fn to_frame(&self) -> LandmarkFrame {
        if self.annotations.is_empty() && !self.landmarks.is_empty() {
            LandmarkFrame::from_keypoints(&self.landmarks)
        } else {
            LandmarkFrame::from_annotations(&self.annotations)
        }
    }
}

/// One completed detector result. An empty list means "no hands".
pub type Detection = Vec<HandPrediction>;

/// The landmarks of a single hand for one detection frame.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct LandmarkFrame {
    chains: IndexMap<Chain, Vec<Point3D>>,
}

impl LandmarkFrame {
    pub fn new() -> Self {
        LandmarkFrame {
            chains: IndexMap::new(),
        }
    }

    pub fn with_chain(mut self, chain: Chain, points: Vec<Point3D>) -> Self {
        self.insert_chain(chain, points);
        self
    }

    pub fn insert_chain(&mut self, chain: Chain, mut points: Vec<Point3D>) {
        points.truncate(chain.max_len());
        self.chains.insert(chain, points);
    }

    pub fn from_annotations(annotations: &Annotations) -> Self {
        let mut frame = LandmarkFrame::new();
        for (name, points) in annotations {
            match Chain::from_name(name) {
                Some(chain) => frame.insert_chain(chain, points.clone()),
                None => debug!("Ignoring unknown annotation \"{}\"", name),
            }
        }
        frame
    }

    /// Split the flat keypoint layout (0 palm base, then four points per
    /// finger, thumb to pinky) into chains. A short list fills whole chains
    /// while points last.
    pub fn from_keypoints(keypoints: &[Point3D]) -> Self {
        let mut frame = LandmarkFrame::new();
        if let Some(palm) = keypoints.first() {
            frame.insert_chain(Chain::PalmBase, vec![*palm]);
        }
        let finger_points = keypoints.get(1..).unwrap_or_default();
        for (chain, points) in Chain::FINGERS.iter().zip(finger_points.chunks(4)) {
            if points.len() == 4 {
                frame.insert_chain(*chain, points.to_vec());
            }
        }
        if keypoints.len() < FLAT_KEYPOINT_COUNT {
            debug!(
                "Only {} of {} keypoints; built {} chains",
                keypoints.len(),
                FLAT_KEYPOINT_COUNT,
                frame.chains.len()
            );
        }
        frame
    }

    pub fn chain(&self, chain: Chain) -> Option<&[Point3D]> {
        self.chains.get(&chain).map(|points| points.as_slice())
    }

    pub fn landmark(&self, chain: Chain, index: u8) -> Result<Point3D, RetargetError> {
        let points = self
            .chain(chain)
            .ok_or(RetargetError::UnresolvedChain(chain))?;
        points
            .get(index as usize)
            .copied()
            .ok_or(RetargetError::MissingLandmark { chain, index })
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_names_round_trip() {
        for chain in Chain::ALL {
            assert_eq!(Chain::from_name(chain.name()), Some(chain));
        }
        assert_eq!(Chain::from_name("littleFinger"), None);
    }

    #[test]
    fn test_annotations_skip_unknown_names() {
        let mut annotations = Annotations::new();
        annotations.insert("palmBase".into(), vec![(1., 2., 0.)]);
        annotations.insert("wrist".into(), vec![(9., 9., 9.)]);
        let frame = LandmarkFrame::from_annotations(&annotations);
        assert_eq!(frame.chain(Chain::PalmBase), Some(&[(1., 2., 0.)][..]));
        assert_eq!(frame.chains.len(), 1);
    }

    #[test]
    fn test_keypoints_split_into_chains() {
        let keypoints: Vec<Point3D> = (0..21).map(|i| (i as f32, 0., 0.)).collect();
        let frame = LandmarkFrame::from_keypoints(&keypoints);
        assert_eq!(frame.landmark(Chain::PalmBase, 0), Ok((0., 0., 0.)));
        assert_eq!(frame.landmark(Chain::Thumb, 3), Ok((4., 0., 0.)));
        assert_eq!(frame.landmark(Chain::MiddleFinger, 0), Ok((9., 0., 0.)));
        assert_eq!(frame.landmark(Chain::Pinky, 3), Ok((20., 0., 0.)));
    }

    #[test]
    fn test_short_keypoints_fill_whole_chains_only() {
        let keypoints: Vec<Point3D> = (0..7).map(|i| (i as f32, 0., 0.)).collect();
        let frame = LandmarkFrame::from_keypoints(&keypoints);
        assert!(frame.chain(Chain::Thumb).is_some());
        assert_eq!(
            frame.landmark(Chain::IndexFinger, 0),
            Err(RetargetError::UnresolvedChain(Chain::IndexFinger))
        );
    }

    #[test]
    fn test_missing_landmark_in_short_chain() {
        let frame = LandmarkFrame::new().with_chain(Chain::Thumb, vec![(0., 0., 0.)]);
        assert_eq!(
            frame.landmark(Chain::Thumb, 2),
            Err(RetargetError::MissingLandmark {
                chain: Chain::Thumb,
                index: 2
            })
        );
    }

    #[test]
    fn test_prediction_prefers_annotations() {
        let json = r#"{"annotations":{"palmBase":[[250,250,0]]},"landmarks":[[1,1,1]]}"#;
        let prediction: HandPrediction = serde_json::from_str(json).unwrap();
        let frame = prediction.to_frame();
        assert_eq!(frame.landmark(Chain::PalmBase, 0), Ok((250., 250., 0.)));
    }
}
