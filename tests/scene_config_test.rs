use orrery::config::SceneConfig;

#[test]
fn shipped_scene_file_matches_the_defaults() {
    let text = std::fs::read_to_string("assets/scene.ron").expect("assets/scene.ron is present");
    let config = SceneConfig::from_ron(&text).expect("assets/scene.ron parses");
    assert_eq!(config, SceneConfig::default());
}

#[tokio::test]
async fn load_reads_the_asset_root() {
    let config = SceneConfig::load().await.expect("scene config loads");
    assert_eq!(config.textures.earth, "textures/earth.jpg");
    assert_eq!(config.bodies.earth_orbit_radius, 20.0);
}

#[tokio::test]
async fn missing_file_falls_back_to_the_defaults() {
    let config = SceneConfig::load_from("no_such_scene.ron")
        .await
        .expect("a missing file is not an error");
    assert_eq!(config, SceneConfig::default());
}

#[tokio::test]
async fn unreadable_file_is_an_error() {
    // The asset root is a directory, not a file
    let result = SceneConfig::load_from("").await;
    assert!(result.is_err());
}
