use std::{fmt, fs};

use anyhow::{anyhow, Result};
use indexmap::IndexMap;
use log::{debug, info, warn};
use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::{
    error::RetargetError,
    landmarks::{Chain, MAX_CHAIN_LENGTH},
    retarget_config::{RetargetConfig, RigMode},
};

/// Addresses a node within one rig: array index for shape sets, insertion
/// index for named rigs.
pub type JointKey = usize;

/// Which landmark drives a rig node
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JointId {
    pub chain: Chain,
    pub index: u8,
}

impl JointId {
    pub fn new(chain: Chain, index: u8) -> Self {
        JointId { chain, index }
    }

    pub fn root() -> Self {
        JointId::new(Chain::PalmBase, 0)
    }

    pub fn is_root(&self) -> bool {
        self.chain.is_root()
    }

    /// Bone names follow `<chain><index>`: the letters name the chain and the
    /// digits give the index within it, e.g. `indexFinger2`. A name without
    /// digits is index 0, so the root is just `palmBase`.
    pub fn parse_bone_name(name: &str) -> Result<JointId, RetargetError> {
        let malformed = || RetargetError::MalformedJointName(name.to_string());

        if name.chars().any(|c| !c.is_ascii_alphanumeric()) {
            return Err(malformed());
        }
        let chain_name: String = name.chars().filter(|c| c.is_ascii_alphabetic()).collect();
        let digits: String = name.chars().filter(|c| c.is_ascii_digit()).collect();

        let chain = Chain::from_name(&chain_name).ok_or_else(malformed)?;
        let index = if digits.is_empty() {
            0
        } else {
            digits.parse::<u8>().map_err(|_| malformed())?
        };
        Ok(JointId { chain, index })
    }
}

impl fmt::Display for JointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() && self.index == 0 {
            write!(f, "{}", self.chain)
        } else {
            write!(f, "{}{}", self.chain, self.index)
        }
    }
}

/// Position, orientation and scale of a rig node. The engine writes position
/// and orientation; scale belongs to whoever built the scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointTransform {
    pub position: Vector3<f32>,
    pub orientation: UnitQuaternion<f32>,
    pub scale: Vector3<f32>,
}

impl Default for JointTransform {
    fn default() -> Self {
        JointTransform {
            position: Vector3::zeros(),
            orientation: UnitQuaternion::identity(),
            scale: Vector3::new(1., 1., 1.),
        }
    }
}

/// One drivable node as seen during traversal
#[derive(Debug, Clone, PartialEq)]
pub struct JointSlot {
    pub key: JointKey,
    pub name: String,
    /// Err if the node's name could not be mapped to a landmark
    pub joint: Result<JointId, RetargetError>,
}

/// Anything the engine can drive: a flat shape list or a bone hierarchy.
/// Poses going in and out are in render space, whatever the target stores.
pub trait JointTarget {
    /// Every node, in application order (palm root first)
    fn slots(&self) -> Vec<JointSlot>;

    fn transform(&self, key: JointKey) -> Option<JointTransform>;

    /// Returns false if there is no node at `key`
    fn set_pose(
        &mut self,
        key: JointKey,
        position: Vector3<f32>,
        orientation: UnitQuaternion<f32>,
    ) -> bool;

    fn root_key(&self) -> Option<JointKey> {
        self.slots()
            .into_iter()
            .find(|s| s.joint.as_ref().map_or(false, |j| j.is_root()))
            .map(|s| s.key)
    }
}

#[derive(Debug, Clone)]
struct Shape {
    joint: JointId,
    transform: JointTransform,
}

/// Independent shapes, one per landmark, no hierarchy
#[derive(Debug, Clone)]
pub struct ShapeSet {
    shapes: Vec<Shape>,
}

impl ShapeSet {
    /// Palm root first, then `joints_per_finger` shapes for each finger
    pub fn new(joints_per_finger: usize) -> Self {
        let per_finger = joints_per_finger.clamp(1, MAX_CHAIN_LENGTH);
        if per_finger != joints_per_finger {
            warn!(
                "Joints per finger {} out of range, using {}",
                joints_per_finger, per_finger
            );
        }
        let mut shapes = vec![Shape {
            joint: JointId::root(),
            transform: JointTransform::default(),
        }];
        for chain in Chain::FINGERS {
            for index in 0..per_finger {
                shapes.push(Shape {
                    joint: JointId::new(chain, index as u8),
                    transform: JointTransform::default(),
                });
            }
        }
        ShapeSet { shapes }
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn joint(&self, key: JointKey) -> Option<JointId> {
        self.shapes.get(key).map(|s| s.joint)
    }
}

impl JointTarget for ShapeSet {
    fn slots(&self) -> Vec<JointSlot> {
        self.shapes
            .iter()
            .enumerate()
            .map(|(key, shape)| JointSlot {
                key,
                name: shape.joint.to_string(),
                joint: Ok(shape.joint),
            })
            .collect()
    }

    fn transform(&self, key: JointKey) -> Option<JointTransform> {
        self.shapes.get(key).map(|s| s.transform)
    }

    fn set_pose(
        &mut self,
        key: JointKey,
        position: Vector3<f32>,
        orientation: UnitQuaternion<f32>,
    ) -> bool {
        match self.shapes.get_mut(key) {
            Some(shape) => {
                shape.transform.position = position;
                shape.transform.orientation = orientation;
                true
            }
            None => false,
        }
    }

    fn root_key(&self) -> Option<JointKey> {
        Some(0)
    }
}

/// Entry in a bone list file: `[{ "name": "thumb1", "parent": "thumb0" }, ...]`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BoneSpec {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
}

#[derive(Debug, Clone)]
struct Bone {
    parent: Option<JointKey>,
    children: Vec<JointKey>,
    joint: Result<JointId, RetargetError>,
    transform: JointTransform,
}

/// Bone hierarchy keyed by name. Transforms are local to the parent bone.
#[derive(Debug, Clone, Default)]
pub struct NamedRig {
    bones: IndexMap<String, Bone>,
}

impl NamedRig {
    pub fn new() -> Self {
        NamedRig {
            bones: IndexMap::new(),
        }
    }

    /// Parents must be added before their children. Bones whose names do not
    /// map to a landmark are kept (they still carry children) but never driven.
    pub fn add_bone(&mut self, name: &str, parent: Option<&str>) -> Result<JointKey> {
        if self.bones.contains_key(name) {
            return Err(anyhow!("Duplicate bone name \"{}\"", name));
        }
        let parent_key = match parent {
            Some(parent_name) => Some(
                self.bones
                    .get_index_of(parent_name)
                    .ok_or_else(|| anyhow!("Bone \"{}\" has unknown parent \"{}\"", name, parent_name))?,
            ),
            None => None,
        };

        let joint = JointId::parse_bone_name(name);
        if let Err(e) = &joint {
            warn!("Bone will not be driven: {}", e);
        }

        let (key, _) = self.bones.insert_full(
            name.to_string(),
            Bone {
                parent: parent_key,
                children: Vec::new(),
                joint,
                transform: JointTransform::default(),
            },
        );
        if let Some(parent_key) = parent_key {
            if let Some((_, parent_bone)) = self.bones.get_index_mut(parent_key) {
                parent_bone.children.push(key);
            }
        }
        debug!("Added bone \"{}\" with key {}", name, key);
        Ok(key)
    }

    pub fn from_bones(bones: &[BoneSpec]) -> Result<Self> {
        let mut rig = NamedRig::new();
        for bone in bones {
            rig.add_bone(&bone.name, bone.parent.as_deref())?;
        }
        Ok(rig)
    }

    /// The conventional hand skeleton: `palmBase` at the root, and for each
    /// finger a chain `<finger>0 .. <finger>n-1` hanging off the palm.
    pub fn hand_skeleton(joints_per_finger: usize) -> Result<Self> {
        let per_finger = joints_per_finger.clamp(1, MAX_CHAIN_LENGTH);
        let mut rig = NamedRig::new();
        let root = JointId::root().to_string();
        rig.add_bone(&root, None)?;
        for chain in Chain::FINGERS {
            let mut parent = root.clone();
            for index in 0..per_finger {
                let name = JointId::new(chain, index as u8).to_string();
                rig.add_bone(&name, Some(&parent))?;
                parent = name;
            }
        }
        Ok(rig)
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    pub fn key_of(&self, name: &str) -> Option<JointKey> {
        self.bones.get_index_of(name)
    }

    pub fn name_of(&self, key: JointKey) -> Option<&str> {
        self.bones.get_index(key).map(|(name, _)| name.as_str())
    }

    pub fn parent_of(&self, key: JointKey) -> Option<JointKey> {
        self.bones.get_index(key).and_then(|(_, b)| b.parent)
    }

    /// Pre-order depth-first, roots and children in insertion order
    pub fn traversal(&self) -> Vec<JointKey> {
        let mut order = Vec::with_capacity(self.bones.len());
        let mut stack: Vec<JointKey> = self
            .bones
            .values()
            .enumerate()
            .filter(|(_, b)| b.parent.is_none())
            .map(|(key, _)| key)
            .rev()
            .collect();
        while let Some(key) = stack.pop() {
            order.push(key);
            if let Some((_, bone)) = self.bones.get_index(key) {
                stack.extend(bone.children.iter().rev());
            }
        }
        order
    }

    /// Transform relative to the parent bone (or to render space for roots)
    pub fn local_transform(&self, key: JointKey) -> Option<JointTransform> {
        self.bones.get_index(key).map(|(_, b)| b.transform)
    }

    pub fn set_local_pose(
        &mut self,
        key: JointKey,
        position: Vector3<f32>,
        orientation: UnitQuaternion<f32>,
    ) -> bool {
        match self.bones.get_index_mut(key) {
            Some((_, bone)) => {
                bone.transform.position = position;
                bone.transform.orientation = orientation;
                true
            }
            None => false,
        }
    }

    /// World-space transform: the node's local transform composed with all
    /// of its ancestors
    pub fn global_transform(&self, key: JointKey) -> Option<JointTransform> {
        let (_, bone) = self.bones.get_index(key)?;
        let local = bone.transform;
        match bone.parent {
            None => Some(local),
            Some(parent_key) => {
                let parent = self.global_transform(parent_key)?;
                Some(JointTransform {
                    position: parent.position
                        + parent.orientation * parent.scale.component_mul(&local.position),
                    orientation: parent.orientation * local.orientation,
                    scale: parent.scale.component_mul(&local.scale),
                })
            }
        }
    }

    /// Inverse of `global_transform` for one node: express a world-space pose
    /// relative to the node's parent as it currently stands
    fn to_local(
        &self,
        key: JointKey,
        position: Vector3<f32>,
        orientation: UnitQuaternion<f32>,
    ) -> Option<(Vector3<f32>, UnitQuaternion<f32>)> {
        let (_, bone) = self.bones.get_index(key)?;
        match bone.parent {
            None => Some((position, orientation)),
            Some(parent_key) => {
                let parent = self.global_transform(parent_key)?;
                let inverse = parent.orientation.inverse();
                // a zero scale axis collapses children onto the parent; keep them there
                let unscaled = (inverse * (position - parent.position))
                    .zip_map(&parent.scale, |p, s| if s == 0. { 0. } else { p / s });
                Some((unscaled, inverse * orientation))
            }
        }
    }

    pub fn set_scale(&mut self, key: JointKey, scale: Vector3<f32>) -> bool {
        match self.bones.get_index_mut(key) {
            Some((_, bone)) => {
                bone.transform.scale = scale;
                true
            }
            None => false,
        }
    }
}

impl JointTarget for NamedRig {
    fn slots(&self) -> Vec<JointSlot> {
        self.traversal()
            .into_iter()
            .filter_map(|key| {
                self.bones.get_index(key).map(|(name, bone)| JointSlot {
                    key,
                    name: name.clone(),
                    joint: bone.joint.clone(),
                })
            })
            .collect()
    }

    fn transform(&self, key: JointKey) -> Option<JointTransform> {
        self.global_transform(key)
    }

    /// Stored relative to the parent, so bones that are not driven this
    /// frame follow their parent. Parents come first in traversal, so every
    /// driven bone ends the tick exactly at the requested pose.
    fn set_pose(
        &mut self,
        key: JointKey,
        position: Vector3<f32>,
        orientation: UnitQuaternion<f32>,
    ) -> bool {
        match self.to_local(key, position, orientation) {
            Some((local_position, local_orientation)) => {
                self.set_local_pose(key, local_position, local_orientation)
            }
            None => false,
        }
    }
}

/// The rig chosen for this session
#[derive(Debug, Clone)]
pub enum Rig {
    IndependentShapeSet(ShapeSet),
    HierarchicalRig(NamedRig),
}

impl Rig {
    pub fn from_config(config: &RetargetConfig) -> Result<Rig> {
        match config.rig_mode {
            RigMode::IndependentShapes => {
                info!("Using independent shapes, {} per finger", config.joints_per_finger);
                Ok(Rig::IndependentShapeSet(ShapeSet::new(config.joints_per_finger)))
            }
            RigMode::NamedRig => {
                info!("Using named hand skeleton, {} bones per finger", config.joints_per_finger);
                Ok(Rig::HierarchicalRig(NamedRig::hand_skeleton(
                    config.joints_per_finger,
                )?))
            }
        }
    }

    /// Name for a node, as it would appear in a bone list
    pub fn name_of(&self, key: JointKey) -> Option<String> {
        match self {
            Rig::IndependentShapeSet(shapes) => shapes.joint(key).map(|j| j.to_string()),
            Rig::HierarchicalRig(rig) => rig.name_of(key).map(String::from),
        }
    }
}

impl JointTarget for Rig {
    fn slots(&self) -> Vec<JointSlot> {
        match self {
            Rig::IndependentShapeSet(shapes) => shapes.slots(),
            Rig::HierarchicalRig(rig) => rig.slots(),
        }
    }

    fn transform(&self, key: JointKey) -> Option<JointTransform> {
        match self {
            Rig::IndependentShapeSet(shapes) => shapes.transform(key),
            Rig::HierarchicalRig(rig) => rig.transform(key),
        }
    }

    fn set_pose(
        &mut self,
        key: JointKey,
        position: Vector3<f32>,
        orientation: UnitQuaternion<f32>,
    ) -> bool {
        match self {
            Rig::IndependentShapeSet(shapes) => shapes.set_pose(key, position, orientation),
            Rig::HierarchicalRig(rig) => rig.set_pose(key, position, orientation),
        }
    }

    fn root_key(&self) -> Option<JointKey> {
        match self {
            Rig::IndependentShapeSet(shapes) => shapes.root_key(),
            Rig::HierarchicalRig(rig) => rig.root_key(),
        }
    }
}

pub fn load_bones_from_file(path: &str) -> Result<Vec<BoneSpec>> {
    let text = fs::read_to_string(path)
        .map_err(|e| anyhow!("Failed to read bone list \"{}\": {}", path, e))?;
    let bones: Vec<BoneSpec> = serde_json::from_str(&text)
        .map_err(|e| anyhow!("Failed to parse bone list \"{}\": {}", path, e))?;
    info!("Loaded {} bones from \"{}\"", bones.len(), path);
    Ok(bones)
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use super::*;

    #[test]
    fn test_parse_bone_names() {
        assert_eq!(
            JointId::parse_bone_name("ringFinger2"),
            Ok(JointId::new(Chain::RingFinger, 2))
        );
        assert_eq!(JointId::parse_bone_name("palmBase"), Ok(JointId::root()));
        assert_eq!(JointId::parse_bone_name("thumb"), Ok(JointId::new(Chain::Thumb, 0)));
        for bad in ["wrist", "", "thumb_1", "thumb300", "12"] {
            assert_eq!(
                JointId::parse_bone_name(bad),
                Err(RetargetError::MalformedJointName(bad.to_string())),
                "{} should be malformed",
                bad
            );
        }
    }

    #[test]
    fn test_bone_name_display_round_trip() {
        for joint in [JointId::root(), JointId::new(Chain::Pinky, 3)] {
            assert_eq!(JointId::parse_bone_name(&joint.to_string()), Ok(joint));
        }
        assert_eq!(JointId::root().to_string(), "palmBase");
        let odd_root = JointId::parse_bone_name("palmBase1").unwrap();
        assert_eq!(odd_root, JointId::new(Chain::PalmBase, 1));
        assert_eq!(odd_root.to_string(), "palmBase1");
        assert_eq!(JointId::parse_bone_name(&odd_root.to_string()), Ok(odd_root));
    }

    #[test]
    fn test_shape_set_layout() {
        let shapes = ShapeSet::new(4);
        assert_eq!(shapes.len(), 21);
        assert_eq!(shapes.joint(0), Some(JointId::root()));
        assert_eq!(shapes.joint(1), Some(JointId::new(Chain::Thumb, 0)));
        assert_eq!(shapes.joint(5), Some(JointId::new(Chain::IndexFinger, 0)));
        assert_eq!(shapes.joint(20), Some(JointId::new(Chain::Pinky, 3)));
        assert_eq!(ShapeSet::new(9).len(), 26);
    }

    #[test]
    fn test_skeleton_traversal_is_preorder() {
        let rig = NamedRig::hand_skeleton(2).unwrap();
        let names: Vec<String> = rig.slots().into_iter().map(|s| s.name).collect();
        assert_eq!(
            names,
            vec![
                "palmBase",
                "thumb0",
                "thumb1",
                "indexFinger0",
                "indexFinger1",
                "middleFinger0",
                "middleFinger1",
                "ringFinger0",
                "ringFinger1",
                "pinky0",
                "pinky1"
            ]
        );
        assert_eq!(rig.root_key(), Some(0));
        assert_eq!(rig.parent_of(rig.key_of("thumb0").unwrap()), Some(0));
    }

    #[test]
    fn test_traversal_follows_hierarchy_not_insertion() {
        let bones: Vec<BoneSpec> = serde_json::from_str(
            r#"[
                { "name": "palmBase" },
                { "name": "thumb0", "parent": "palmBase" },
                { "name": "pinky0", "parent": "palmBase" },
                { "name": "thumb1", "parent": "thumb0" },
                { "name": "wrist_helper", "parent": "pinky0" }
            ]"#,
        )
        .unwrap();
        let rig = NamedRig::from_bones(&bones).unwrap();
        let slots = rig.slots();
        let names: Vec<&str> = slots.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["palmBase", "thumb0", "thumb1", "pinky0", "wrist_helper"]);
        assert_eq!(
            slots[4].joint,
            Err(RetargetError::MalformedJointName("wrist_helper".into()))
        );
    }

    #[test]
    fn test_bad_bone_lists_rejected() {
        let mut rig = NamedRig::new();
        rig.add_bone("palmBase", None).unwrap();
        assert!(rig.add_bone("palmBase", None).is_err());
        assert!(rig.add_bone("thumb0", Some("nope")).is_err());
    }

    #[test]
    fn test_global_transform_composes_ancestors() {
        let mut rig = NamedRig::hand_skeleton(2).unwrap();
        let palm = rig.key_of("palmBase").unwrap();
        let thumb0 = rig.key_of("thumb0").unwrap();
        let thumb1 = rig.key_of("thumb1").unwrap();
        let quarter = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2);
        rig.set_local_pose(palm, Vector3::new(2., 4., 0.), quarter);
        rig.set_local_pose(thumb0, Vector3::new(1., 0., 0.), UnitQuaternion::identity());
        rig.set_local_pose(thumb1, Vector3::new(1., 0., 0.), UnitQuaternion::identity());

        let global = rig.global_transform(thumb1).unwrap();
        assert!((global.position - Vector3::new(2., 6., 0.)).norm() < 1e-5);
        assert!(global.orientation.angle_to(&quarter) < 1e-5);

        rig.set_scale(palm, Vector3::new(2., 2., 2.));
        let global = rig.global_transform(thumb0).unwrap();
        assert!((global.position - Vector3::new(2., 6., 0.)).norm() < 1e-5);
        assert_eq!(global.scale, Vector3::new(2., 2., 2.));
    }

    #[test]
    fn test_set_pose_is_world_space() {
        let mut rig = NamedRig::hand_skeleton(2).unwrap();
        let palm = rig.key_of("palmBase").unwrap();
        let thumb0 = rig.key_of("thumb0").unwrap();
        let quarter = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2);
        rig.set_pose(palm, Vector3::new(2., 4., 0.), quarter);
        rig.set_pose(thumb0, Vector3::new(2., 5., 0.), UnitQuaternion::identity());

        let world = rig.transform(thumb0).unwrap();
        assert!((world.position - Vector3::new(2., 5., 0.)).norm() < 1e-5);
        assert!(world.orientation.angle() < 1e-5);
        let local = rig.local_transform(thumb0).unwrap();
        assert!((local.position - Vector3::new(1., 0., 0.)).norm() < 1e-5);
        assert!(local.orientation.angle_to(&quarter.inverse()) < 1e-5);

        // an undriven child follows its parent
        rig.set_pose(palm, Vector3::new(0., 0., 0.), UnitQuaternion::identity());
        let world = rig.transform(thumb0).unwrap();
        assert!((world.position - Vector3::new(1., 0., 0.)).norm() < 1e-5);

        rig.set_scale(palm, Vector3::new(2., 2., 2.));
        rig.set_pose(thumb0, Vector3::new(4., 0., 0.), UnitQuaternion::identity());
        assert!((rig.transform(thumb0).unwrap().position - Vector3::new(4., 0., 0.)).norm() < 1e-5);
        assert!((rig.local_transform(thumb0).unwrap().position - Vector3::new(2., 0., 0.)).norm() < 1e-5);
    }

    #[test]
    fn test_rig_from_config() {
        let config = RetargetConfig {
            rig_mode: RigMode::NamedRig,
            joints_per_finger: 3,
            ..Default::default()
        };
        let rig = Rig::from_config(&config).unwrap();
        assert!(matches!(rig, Rig::HierarchicalRig(_)));
        assert_eq!(rig.slots().len(), 16);
        assert_eq!(rig.name_of(1), Some("thumb0".to_string()));

        let rig = Rig::from_config(&RetargetConfig::default()).unwrap();
        assert!(matches!(rig, Rig::IndependentShapeSet(_)));
        assert_eq!(rig.root_key(), Some(0));
    }
}
