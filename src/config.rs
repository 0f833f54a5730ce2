//! Scene parameters.
//!
//! Every tunable of the scene lives in [`SceneConfig`]. The defaults reproduce
//! the reference scene exactly; an optional `assets/scene.ron` can override any
//! subset of fields since every struct is `#[serde(default)]`.

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::resources::texture::{is_not_found, load_string};

/// File name looked up (relative to the asset root) when the app starts.
pub const SCENE_CONFIG_FILE: &str = "scene.ron";

/// Top-level scene configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SceneConfig {
    pub camera: CameraConfig,
    pub controls: ControlsConfig,
    pub lighting: LightingConfig,
    pub bloom: BloomConfig,
    pub bodies: BodiesConfig,
    pub textures: TextureConfig,
    pub animation: AnimationConfig,
}

/// Perspective camera placement and frustum.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view in degrees.
    pub fov_deg: f32,
    /// Aspect ratio used until the first resize.
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub position: [f32; 3],
    pub target: [f32; 3],
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_deg: 40.0,
            aspect: 2.0,
            near: 0.1,
            far: 1000.0,
            position: [0.0, 20.0, 50.0],
            target: [0.0, 0.0, 0.0],
        }
    }
}

/// Orbit controller behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ControlsConfig {
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub enable_zoom: bool,
    pub enable_pan: bool,
    pub min_distance: f32,
    pub max_distance: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            enable_damping: true,
            damping_factor: 0.05,
            enable_zoom: true,
            enable_pan: true,
            min_distance: 30.0,
            max_distance: 80.0,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            pan_speed: 1.0,
        }
    }
}

/// Point light, ambient light and the point light's shadow map.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LightingConfig {
    /// Packed `0xRRGGBB`, shared by the point and the ambient light.
    pub color: u32,
    pub point_intensity: f32,
    pub ambient_intensity: f32,
    pub point_position: [f32; 3],
    pub cast_shadow: bool,
    pub shadow_map_size: u32,
    pub shadow_near: f32,
    pub shadow_far: f32,
    /// World-space distance a receiver is moved towards the light before the
    /// shadow comparison.
    pub shadow_bias: f32,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            color: 0xf9d71c,
            point_intensity: 0.8,
            ambient_intensity: 0.1,
            point_position: [0.0, 0.0, 0.0],
            cast_shadow: true,
            shadow_map_size: 1024,
            shadow_near: 0.1,
            shadow_far: 500.0,
            shadow_bias: 0.05,
        }
    }
}

/// Bloom post-processing parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BloomConfig {
    pub strength: f32,
    /// Blends the per-mip weights from "sharp" (0.0) to "wide" (1.0).
    pub radius: f32,
    /// Luminance above which pixels start to glow.
    pub threshold: f32,
    /// Width of the smoothstep ramp above `threshold`.
    pub smooth_width: f32,
}

impl Default for BloomConfig {
    fn default() -> Self {
        Self {
            strength: 1.5,
            radius: 0.4,
            threshold: 0.85,
            smooth_width: 0.01,
        }
    }
}

/// Geometry and placement of the sun, earth and moon.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BodiesConfig {
    pub sphere_radius: f32,
    pub width_segments: u32,
    pub height_segments: u32,
    pub sun_scale: f32,
    pub sun_emissive: u32,
    pub earth_orbit_radius: f32,
    pub moon_orbit_radius: f32,
    pub moon_scale: f32,
}

impl Default for BodiesConfig {
    fn default() -> Self {
        Self {
            sphere_radius: 1.0,
            width_segments: 32,
            height_segments: 32,
            sun_scale: 5.0,
            sun_emissive: 0xf9d71c,
            earth_orbit_radius: 20.0,
            moon_orbit_radius: 3.0,
            moon_scale: 0.5,
        }
    }
}

/// Texture paths relative to the asset root.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TextureConfig {
    pub background: String,
    pub earth: String,
    pub moon: String,
}

impl Default for TextureConfig {
    fn default() -> Self {
        Self {
            background: "textures/milky_way.jpg".to_string(),
            earth: "textures/earth.jpg".to_string(),
            moon: "textures/moon.jpg".to_string(),
        }
    }
}

/// Rates of the orbit clock.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnimationConfig {
    /// The orbit clock runs this many times slower than wall-clock seconds.
    pub slowdown: f64,
    /// Multiple of the orbit clock applied to the moon-earth pivot.
    pub moon_speed: f32,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            slowdown: 3.0,
            moon_speed: 5.0,
        }
    }
}

impl SceneConfig {
    pub fn from_ron(text: &str) -> anyhow::Result<Self> {
        ron::from_str(text).context("scene config is not valid RON")
    }

    /// Reads `scene.ron` from the asset root, falling back to the defaults when
    /// the file is absent.
    pub async fn load() -> anyhow::Result<Self> {
        Self::load_from(SCENE_CONFIG_FILE).await
    }

    /// Reads a config file from the asset root. Only a missing file means the
    /// default scene; unreadable or malformed files are errors.
    pub async fn load_from(file_name: &str) -> anyhow::Result<Self> {
        match load_string(file_name).await {
            Ok(text) => {
                let config =
                    Self::from_ron(&text).with_context(|| format!("reading {file_name}"))?;
                log::info!("Loaded scene config from {file_name}");
                Ok(config)
            }
            Err(e) if is_not_found(&e) => {
                log::info!("No {file_name}, using the default scene");
                Ok(Self::default())
            }
            Err(e) => Err(e.context(format!("could not load {file_name}"))),
        }
    }
}

/// Splits `0xRRGGBB` into linear-space RGB floats in `[0, 1]`.
///
/// Hex colours are authored in sRGB, so each channel is decoded before use in
/// lighting.
pub fn hex_to_linear_rgb(hex: u32) -> [f32; 3] {
    let channel = |shift: u32| {
        let c = ((hex >> shift) & 0xff) as f32 / 255.0;
        if c <= 0.04045 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    };
    [channel(16), channel(8), channel(0)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_scene() {
        let config = SceneConfig::default();
        assert_eq!(config.camera.fov_deg, 40.0);
        assert_eq!(config.camera.position, [0.0, 20.0, 50.0]);
        assert_eq!(config.controls.min_distance, 30.0);
        assert_eq!(config.controls.max_distance, 80.0);
        assert!(config.controls.enable_damping);
        assert_eq!(config.lighting.color, 0xf9d71c);
        assert_eq!(config.lighting.shadow_map_size, 1024);
        assert_eq!(config.bloom.strength, 1.5);
        assert_eq!(config.bloom.radius, 0.4);
        assert_eq!(config.bloom.threshold, 0.85);
        assert_eq!(config.animation.slowdown, 3.0);
        assert_eq!(config.animation.moon_speed, 5.0);
    }

    #[test]
    fn partial_ron_keeps_other_defaults() {
        let config = SceneConfig::from_ron("(bloom: (strength: 0.5), camera: (fov_deg: 60.0))")
            .expect("valid RON");
        assert_eq!(config.bloom.strength, 0.5);
        assert_eq!(config.bloom.threshold, 0.85);
        assert_eq!(config.camera.fov_deg, 60.0);
        assert_eq!(config.camera.far, 1000.0);
        assert_eq!(config.bodies, BodiesConfig::default());
    }

    #[test]
    fn malformed_ron_is_an_error() {
        assert!(SceneConfig::from_ron("(bloom: (strength: \"bright\"))").is_err());
    }

    #[test]
    fn hex_colours_decode_to_linear() {
        assert_eq!(hex_to_linear_rgb(0xffffff), [1.0, 1.0, 1.0]);
        assert_eq!(hex_to_linear_rgb(0x000000), [0.0, 0.0, 0.0]);
        let [r, g, b] = hex_to_linear_rgb(0xf9d71c);
        assert!(r > g && g > b);
        assert!((r - 0.947).abs() < 0.01);
    }
}
