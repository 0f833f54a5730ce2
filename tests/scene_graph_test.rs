use orrery::{config::SceneConfig, solar_system::SolarSystem};

fn parent_name(system: &SolarSystem, name: &str) -> Option<String> {
    let graph = &system.graph;
    let id = graph.find(name)?;
    let parent = graph.get_parent(id)?;
    graph.get(parent).map(|node| node.name.clone())
}

#[test]
fn hierarchy_matches_the_orbits() {
    let system = SolarSystem::new(&SceneConfig::default());

    assert_eq!(parent_name(&system, "solar system"), None);
    assert_eq!(parent_name(&system, "sun").as_deref(), Some("solar system"));
    assert_eq!(parent_name(&system, "earth orbit").as_deref(), Some("solar system"));
    assert_eq!(parent_name(&system, "earth").as_deref(), Some("earth orbit"));
    assert_eq!(parent_name(&system, "moon-earth orbit").as_deref(), Some("solar system"));
    assert_eq!(parent_name(&system, "moon orbit").as_deref(), Some("moon-earth orbit"));
    assert_eq!(parent_name(&system, "moon").as_deref(), Some("moon orbit"));
}

#[test]
fn every_child_is_listed_by_its_parent() {
    let system = SolarSystem::new(&SceneConfig::default());
    let graph = &system.graph;
    assert_eq!(graph.len(), 7);

    for i in 0..graph.len() {
        let id = orrery::data_structures::scene_graph::NodeId(i);
        if let Some(parent) = graph.get_parent(id) {
            assert!(graph.get_children(parent).contains(&id));
            assert!(parent.0 < id.0);
        }
    }
}

#[test]
fn only_bodies_are_drawn() {
    let system = SolarSystem::new(&SceneConfig::default());
    let drawn: Vec<_> = system
        .graph
        .renderables()
        .map(|r| system.graph.get(r.id).unwrap().name.clone())
        .collect();
    assert_eq!(drawn, ["sun", "earth", "moon"]);
}

#[test]
fn custom_orbit_radii_are_used() {
    let mut config = SceneConfig::default();
    config.bodies.earth_orbit_radius = 35.0;
    config.bodies.moon_orbit_radius = 4.5;
    let system = SolarSystem::new(&config);

    let position = |name: &str| {
        let id = system.graph.find(name).unwrap();
        system.graph.get_world_transform(id).unwrap().position
    };
    assert_eq!(position("earth").x, 35.0);
    assert_eq!(position("moon").x, 39.5);
}
