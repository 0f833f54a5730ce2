//! orrery
//!
//! An animated sun, earth and moon rendered with wgpu on native and WASM.
//! The earth circles the sun and the moon circles the earth, lit by a point
//! light at the sun's centre with cube-map shadows, composited over a
//! background image with HDR bloom, and viewed through an orbit camera.
//!
//! High-level modules
//! - `camera`: perspective camera, projection and their uniform
//! - `config`: the RON scene config and its defaults
//! - `context`: window, surface and device
//! - `controls`: damped orbit camera controller
//! - `data_structures`: meshes, materials, instances, textures and the scene graph
//! - `flow`: the event loop
//! - `frame`: per-frame clock, resize check and animation step
//! - `pipelines`: phong, shadow, background and bloom pipelines
//! - `render`: records and submits a frame
//! - `resources`: asset loading and generated geometry
//! - `solar_system`: the sun, earth and moon and their animation

pub mod camera;
pub mod config;
pub mod context;
pub mod controls;
pub mod data_structures;
pub mod flow;
pub mod frame;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod solar_system;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Web entry point.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    flow::run().map_err(|e| JsValue::from_str(&format!("{e:#}")))
}
