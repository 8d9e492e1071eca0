pub mod detector;
pub mod engine;
pub mod error;
pub mod geometry_utils;
pub mod landmarks;
pub mod retarget_config;
pub mod rig;
pub mod systems;

/// A landmark in detector space: pixel-like units, origin top-left, shallow z
pub type Point3D = (f32, f32, f32);
