//! The sun, earth and moon as a scene graph, plus their per-frame animation.

use std::f64::consts::TAU;

use cgmath::Vector3;

use crate::{
    config::{hex_to_linear_rgb, SceneConfig},
    data_structures::{
        instance::Instance,
        model::MaterialUniform,
        scene_graph::{GeometryId, MaterialId, NodeId, SceneGraph},
    },
};

/// The one sphere every body is drawn with.
pub const SPHERE: GeometryId = GeometryId(0);

/// What a material looks like before it is uploaded.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialDesc {
    pub name: String,
    /// Linear RGB.
    pub color: [f32; 3],
    /// Linear RGB, multiplied with the emissive map when there is one.
    pub emissive: [f32; 3],
    /// Path relative to the asset root.
    pub emissive_map: Option<String>,
    pub receive_shadow: bool,
}

impl MaterialDesc {
    pub fn uniform(&self) -> MaterialUniform {
        MaterialUniform::new(self.color, self.emissive, self.receive_shadow)
    }
}

#[derive(Debug, Clone)]
pub struct SolarSystem {
    pub graph: SceneGraph,
    pub materials: Vec<MaterialDesc>,
    /// Nodes whose rotation is set to the orbit clock every frame, in the
    /// order: system pivot, sun, earth orbit, earth, moon.
    pub tracked: Vec<NodeId>,
    /// Spins `moon_speed` times faster than the tracked nodes.
    pub moon_earth_orbit: NodeId,
    /// Never rotated.
    pub moon_orbit: NodeId,
    moon_speed: f32,
}

impl SolarSystem {
    pub fn new(config: &SceneConfig) -> Self {
        let bodies = &config.bodies;
        let white = hex_to_linear_rgb(0xffffff);

        let materials = vec![
            MaterialDesc {
                name: "sun".to_string(),
                color: white,
                emissive: hex_to_linear_rgb(bodies.sun_emissive),
                emissive_map: None,
                receive_shadow: false,
            },
            MaterialDesc {
                name: "earth".to_string(),
                color: white,
                emissive: white,
                emissive_map: Some(config.textures.earth.clone()),
                receive_shadow: true,
            },
            MaterialDesc {
                name: "moon".to_string(),
                color: white,
                emissive: white,
                emissive_map: Some(config.textures.moon.clone()),
                receive_shadow: true,
            },
        ];
        let (sun_material, earth_material, moon_material) =
            (MaterialId(0), MaterialId(1), MaterialId(2));

        let mut graph = SceneGraph::new();
        let solar_system = graph.add_container("solar system", None, Instance::new());
        let sun = graph.add_model(
            "sun",
            Some(solar_system),
            Instance::new().with_uniform_scale(bodies.sun_scale),
            SPHERE,
            sun_material,
            false,
        );

        let earth_orbit = graph.add_container(
            "earth orbit",
            Some(solar_system),
            Instance::new().with_position(Vector3::new(bodies.earth_orbit_radius, 0.0, 0.0)),
        );
        let earth = graph.add_model(
            "earth",
            Some(earth_orbit),
            Instance::new(),
            SPHERE,
            earth_material,
            true,
        );

        let moon_earth_orbit = graph.add_container(
            "moon-earth orbit",
            Some(solar_system),
            Instance::new().with_position(Vector3::new(bodies.earth_orbit_radius, 0.0, 0.0)),
        );
        let moon_orbit = graph.add_container(
            "moon orbit",
            Some(moon_earth_orbit),
            Instance::new().with_position(Vector3::new(bodies.moon_orbit_radius, 0.0, 0.0)),
        );
        let moon = graph.add_model(
            "moon",
            Some(moon_orbit),
            Instance::new().with_uniform_scale(bodies.moon_scale),
            SPHERE,
            moon_material,
            true,
        );
        graph.update_world_transforms();

        log::info!("Built solar system with {} nodes", graph.len());

        Self {
            graph,
            materials,
            tracked: vec![solar_system, sun, earth_orbit, earth, moon],
            moon_earth_orbit,
            moon_orbit,
            moon_speed: config.animation.moon_speed,
        }
    }

    /// Sets every rotation from the orbit clock `t` (radians) and refreshes
    /// world transforms. Rotations are absolute, so equal `t` gives an equal
    /// scene.
    ///
    /// Angles are reduced to `[0, 2π)` in `f64` before narrowing, so they keep
    /// full precision however long the clock has run.
    pub fn animate(&mut self, t: f64) {
        let angle = t.rem_euclid(TAU) as f32;
        let moon_angle = (t * self.moon_speed as f64).rem_euclid(TAU) as f32;

        for &id in &self.tracked {
            if let Some(local) = self.graph.local_transform_mut(id) {
                local.set_rotation_y(cgmath::Rad(angle));
            }
        }
        if let Some(local) = self.graph.local_transform_mut(self.moon_earth_orbit) {
            local.set_rotation_y(cgmath::Rad(moon_angle));
        }
        self.graph.update_world_transforms();
    }

    /// Rotation about +Y of a node's local transform, in radians.
    pub fn rotation_y(&self, id: NodeId) -> Option<f32> {
        self.graph.get_local_transform(id).map(|local| {
            let q = local.rotation;
            // Pure Y rotations only: q = (cos(a/2), 0, sin(a/2), 0)
            2.0 * q.v.y.atan2(q.s)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_five_objects_in_order() {
        let system = SolarSystem::new(&SceneConfig::default());
        let names: Vec<_> = system
            .tracked
            .iter()
            .map(|&id| system.graph.get(id).unwrap().name.as_str())
            .collect();
        assert_eq!(names, ["solar system", "sun", "earth orbit", "earth", "moon"]);
        assert!(!system.tracked.contains(&system.moon_earth_orbit));
        assert!(!system.tracked.contains(&system.moon_orbit));
    }

    #[test]
    fn every_model_has_a_known_material() {
        let system = SolarSystem::new(&SceneConfig::default());
        let renderables: Vec<_> = system.graph.renderables().collect();
        assert_eq!(renderables.len(), 3);
        for r in renderables {
            assert_eq!(r.geometry, SPHERE);
            assert!(r.material.0 < system.materials.len());
        }
    }

    #[test]
    fn only_planets_cast_and_receive_shadows() {
        let system = SolarSystem::new(&SceneConfig::default());
        let shadowed: Vec<_> = system
            .graph
            .renderables()
            .map(|r| (system.graph.get(r.id).unwrap().name.clone(), r.cast_shadow))
            .collect();
        assert_eq!(
            shadowed,
            [
                ("sun".to_string(), false),
                ("earth".to_string(), true),
                ("moon".to_string(), true)
            ]
        );
        assert!(!system.materials[0].receive_shadow);
        assert!(system.materials[1].receive_shadow);

        // Receiving is decided by the material the shader reads
        for r in system.graph.renderables() {
            let flags = system.materials[r.material.0].uniform().flags;
            assert_eq!(flags[0] == 1.0, r.cast_shadow);
        }
    }

    #[test]
    fn animate_sets_absolute_rotation() {
        let mut system = SolarSystem::new(&SceneConfig::default());
        system.animate(0.7);
        system.animate(0.7);
        for &id in &system.tracked {
            assert!((system.rotation_y(id).unwrap() - 0.7).abs() < 1e-5);
        }
        assert!((system.rotation_y(system.moon_earth_orbit).unwrap() - 3.5).abs() < 1e-5);
        assert_eq!(system.rotation_y(system.moon_orbit), Some(0.0));
    }

    #[test]
    fn sun_is_scaled_and_moon_is_halved() {
        let system = SolarSystem::new(&SceneConfig::default());
        let sun = system.graph.find("sun").unwrap();
        let moon = system.graph.find("moon").unwrap();
        assert_eq!(system.graph.get_world_transform(sun).unwrap().scale.x, 5.0);
        assert_eq!(system.graph.get_world_transform(moon).unwrap().scale.x, 0.5);
    }
}
