//! Render pipelines and the GPU state each of them owns.
//!
//! - `basic`: the phong pipeline plus shared pipeline and bind group helpers
//! - `light`: point and ambient light uniforms
//! - `shadow`: the point light's depth cube and its passes
//! - `background`: the full-viewport background image
//! - `bloom`: HDR bright-pass, blur chain and composite

pub mod background;
pub mod basic;
pub mod bloom;
pub mod light;
pub mod shadow;
