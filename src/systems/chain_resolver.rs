use crate::{
    error::RetargetError, landmarks::LandmarkFrame, retarget_config::RetargetConfig,
    rig::JointId, Point3D,
};

/// A joint's own landmark and the landmark its heading is measured against
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedLandmarks {
    pub landmark: Point3D,
    pub comparison: Point3D,
}

/// Finds, for any joint, its landmark and its comparison landmark: the
/// previous landmark in the same chain, the palm root for chain starts, and
/// the configured root reference (middle finger base) for the palm root itself.
#[derive(Debug, Clone)]
pub struct ChainResolver {
    root_reference: JointId,
    facing_reference: JointId,
}

impl ChainResolver {
    pub fn new(config: &RetargetConfig) -> Self {
        ChainResolver {
            root_reference: config.root_reference,
            facing_reference: config.facing_reference,
        }
    }

    pub fn comparison_for(&self, joint: &JointId) -> JointId {
        if joint.is_root() {
            self.root_reference
        } else if joint.index == 0 {
            JointId::root()
        } else {
            JointId::new(joint.chain, joint.index - 1)
        }
    }

    pub fn resolve(
        &self,
        frame: &LandmarkFrame,
        joint: &JointId,
    ) -> Result<ResolvedLandmarks, RetargetError> {
        let landmark = frame.landmark(joint.chain, joint.index)?;
        let comparison_id = self.comparison_for(joint);
        let comparison = frame.landmark(comparison_id.chain, comparison_id.index)?;
        Ok(ResolvedLandmarks {
            landmark,
            comparison,
        })
    }

    /// Resolve a joint given by bone name (`<chain><index>`, e.g. `ringFinger2`)
    pub fn resolve_named(
        &self,
        frame: &LandmarkFrame,
        bone_name: &str,
    ) -> Result<ResolvedLandmarks, RetargetError> {
        let joint = JointId::parse_bone_name(bone_name)?;
        self.resolve(frame, &joint)
    }

    pub fn resolve_facing(&self, frame: &LandmarkFrame) -> Result<Point3D, RetargetError> {
        frame.landmark(self.facing_reference.chain, self.facing_reference.index)
    }

    pub fn resolve_root(&self, frame: &LandmarkFrame) -> Result<Point3D, RetargetError> {
        let root = JointId::root();
        frame.landmark(root.chain, root.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::Chain;

    fn frame() -> LandmarkFrame {
        LandmarkFrame::new()
            .with_chain(Chain::PalmBase, vec![(250., 250., 0.)])
            .with_chain(
                Chain::MiddleFinger,
                vec![(250., 200., 0.), (250., 150., 0.), (250., 110., 0.), (250., 80., 0.)],
            )
            .with_chain(Chain::Thumb, vec![(260., 240., 0.), (280., 220., 0.)])
    }

    fn resolver() -> ChainResolver {
        ChainResolver::new(&RetargetConfig::default())
    }

    #[test]
    fn test_comparison_is_chain_predecessor() {
        let r = resolver();
        assert_eq!(
            r.comparison_for(&JointId::new(Chain::MiddleFinger, 2)),
            JointId::new(Chain::MiddleFinger, 1)
        );
        assert_eq!(
            r.comparison_for(&JointId::new(Chain::MiddleFinger, 0)),
            JointId::new(Chain::PalmBase, 0)
        );
        assert_eq!(
            r.comparison_for(&JointId::root()),
            JointId::new(Chain::MiddleFinger, 0)
        );
    }

    #[test]
    fn test_resolve_landmarks() {
        let r = resolver();
        let f = frame();
        let resolved = r.resolve(&f, &JointId::new(Chain::MiddleFinger, 2)).unwrap();
        assert_eq!(resolved.landmark, (250., 110., 0.));
        assert_eq!(resolved.comparison, (250., 150., 0.));

        let resolved = r.resolve(&f, &JointId::new(Chain::MiddleFinger, 0)).unwrap();
        assert_eq!(resolved.comparison, (250., 250., 0.));

        let resolved = r.resolve(&f, &JointId::root()).unwrap();
        assert_eq!(resolved.landmark, (250., 250., 0.));
        assert_eq!(resolved.comparison, (250., 200., 0.));
    }

    #[test]
    fn test_resolve_named() {
        let r = resolver();
        let f = frame();
        let resolved = r.resolve_named(&f, "middleFinger3").unwrap();
        assert_eq!(resolved.landmark, (250., 80., 0.));
        assert_eq!(resolved.comparison, (250., 110., 0.));
        let resolved = r.resolve_named(&f, "palmBase").unwrap();
        assert_eq!(resolved.comparison, (250., 200., 0.));
        assert_eq!(
            r.resolve_named(&f, "wrist"),
            Err(RetargetError::MalformedJointName("wrist".into()))
        );
    }

    #[test]
    fn test_absent_chain_is_unresolved() {
        let r = resolver();
        let f = frame();
        assert_eq!(
            r.resolve(&f, &JointId::new(Chain::Pinky, 1)),
            Err(RetargetError::UnresolvedChain(Chain::Pinky))
        );
        // present chain, but the predecessor lives in an absent chain
        let no_palm = LandmarkFrame::new().with_chain(Chain::Thumb, vec![(1., 1., 0.)]);
        assert_eq!(
            r.resolve(&no_palm, &JointId::new(Chain::Thumb, 0)),
            Err(RetargetError::UnresolvedChain(Chain::PalmBase))
        );
    }

    #[test]
    fn test_facing_reference_is_thumb_base() {
        assert_eq!(resolver().resolve_facing(&frame()), Ok((260., 240., 0.)));
    }
}
