//! Scene data structures: meshes, materials, textures, transforms and the scene graph.
//!
//! - `model` contains mesh and material definitions and their GPU resources
//! - `texture` contains the GPU texture wrapper and creation utilities
//! - `instance` holds node transforms and their per-instance GPU layout
//! - `scene_graph` is the arena of pivots and models making up the scene

pub mod instance;
pub mod model;
pub mod scene_graph;
pub mod texture;
