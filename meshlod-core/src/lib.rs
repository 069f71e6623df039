//! Core data structures and traits for meshlod
//!
//! This crate provides the shared types used by the simplification engine:
//! points, indexed triangle meshes, point clouds, strided position views,
//! and the workspace error type.

pub mod error;
pub mod mesh;
pub mod point;
pub mod point_cloud;
pub mod positions;
pub mod traits;

pub use error::*;
pub use mesh::*;
pub use point::*;
pub use point_cloud::*;
pub use positions::*;
pub use traits::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Point3, Vector3};

// Type aliases for easier imports
pub type Mesh = TriangleMesh;
