//! Loading of everything that lives outside the binary: the scene config,
//! texture images, and generated geometry.
//!
//! Native builds read from `./assets/`, web builds fetch `<origin>/assets/`.

pub mod mesh;
pub mod texture;

pub use texture::{load_binary, load_image, load_string, request_image, PendingImage};
