use cgmath::{InnerSpace, MetricSpace, Point3};
use orrery::{
    camera,
    config::SceneConfig,
    controls::OrbitController,
    frame::{self, DrawingBuffer, SurfaceSize},
    solar_system::SolarSystem,
};

struct Canvas {
    buffer: SurfaceSize,
    display: SurfaceSize,
    resizes: usize,
}

impl DrawingBuffer for Canvas {
    fn buffer_size(&self) -> SurfaceSize {
        self.buffer
    }
    fn display_size(&self) -> SurfaceSize {
        self.display
    }
    fn set_buffer_size(&mut self, size: SurfaceSize) {
        self.buffer = size;
        self.resizes += 1;
    }
}

struct Scene {
    config: SceneConfig,
    canvas: Canvas,
    system: SolarSystem,
    camera: camera::Camera,
    projection: camera::Projection,
    controller: OrbitController,
}

impl Scene {
    fn new(buffer: SurfaceSize, display: SurfaceSize) -> Self {
        let config = SceneConfig::default();
        let system = SolarSystem::new(&config);
        let (camera, projection) = camera::from_config(&config.camera);
        let controller = OrbitController::new(config.controls.clone(), camera.target, buffer.height);
        Self {
            config,
            canvas: Canvas {
                buffer,
                display,
                resizes: 0,
            },
            system,
            camera,
            projection,
            controller,
        }
    }

    fn step(&mut self, time_ms: f64) -> frame::FrameUpdate {
        frame::update(
            time_ms,
            self.config.animation.slowdown,
            &mut self.canvas,
            &mut self.system,
            &mut self.camera,
            &mut self.projection,
            &mut self.controller,
        )
    }

    fn world_position(&self, name: &str) -> Point3<f32> {
        let id = self.system.graph.find(name).unwrap();
        let p = self.system.graph.get_world_transform(id).unwrap().position;
        Point3::new(p.x, p.y, p.z)
    }
}

#[test]
fn three_seconds_turn_everything_one_radian() {
    let size = SurfaceSize::new(800, 600);
    let mut scene = Scene::new(size, size);
    let update = scene.step(3000.0);

    assert!((update.t - 1.0).abs() < 1e-6);
    for &id in &scene.system.tracked {
        assert!((scene.system.rotation_y(id).unwrap() - 1.0).abs() < 1e-5);
    }
    let moon_earth = scene.system.rotation_y(scene.system.moon_earth_orbit).unwrap();
    assert!((moon_earth - 5.0).abs() < 1e-4);
    assert_eq!(scene.system.rotation_y(scene.system.moon_orbit), Some(0.0));
}

#[test]
fn frame_zero_is_the_rest_pose() {
    let size = SurfaceSize::new(800, 600);
    let mut scene = Scene::new(size, size);
    let update = scene.step(0.0);

    assert_eq!(update.t, 0.0);
    assert!(!update.resized);
    for &id in &scene.system.tracked {
        assert_eq!(scene.system.rotation_y(id), Some(0.0));
    }
    assert_eq!(scene.world_position("earth"), Point3::new(20.0, 0.0, 0.0));
    assert_eq!(scene.world_position("moon"), Point3::new(23.0, 0.0, 0.0));
}

#[test]
fn bodies_stay_on_their_orbits() {
    let size = SurfaceSize::new(800, 600);
    let mut scene = Scene::new(size, size);
    let origin = Point3::new(0.0, 0.0, 0.0);

    for time_ms in [0.0, 250.0, 1234.0, 3000.0, 9999.0, 60_000.0] {
        scene.step(time_ms);
        let sun = scene.world_position("sun");
        let earth = scene.world_position("earth");
        let earth_orbit = scene.world_position("earth orbit");
        let moon_orbit_centre = scene.world_position("moon-earth orbit");
        let moon = scene.world_position("moon");

        assert!(sun.distance(origin) < 1e-5);
        assert!((earth.distance(origin) - 20.0).abs() < 1e-3);
        assert!(earth.distance(earth_orbit) < 1e-4);
        assert!(moon_orbit_centre.distance(earth) < 1e-3);
        assert!((moon.distance(moon_orbit_centre) - 3.0).abs() < 1e-3);
        assert!(earth.y.abs() < 1e-5 && moon.y.abs() < 1e-5);
    }
}

#[test]
fn same_time_gives_same_scene() {
    let size = SurfaceSize::new(800, 600);
    let mut a = Scene::new(size, size);
    let mut b = Scene::new(size, size);

    for time_ms in [16.0, 33.0, 50.0, 1500.0] {
        a.step(time_ms);
    }
    b.step(1500.0);

    for name in ["earth", "moon", "sun"] {
        assert!(a.world_position(name).distance(b.world_position(name)) < 1e-5);
    }
}

#[test]
fn resize_follows_the_display_once() {
    let mut scene = Scene::new(SurfaceSize::new(300, 150), SurfaceSize::new(1280, 720));

    let first = scene.step(16.0);
    assert!(first.resized);
    assert_eq!(scene.canvas.buffer, SurfaceSize::new(1280, 720));
    assert!((scene.projection.aspect - 1280.0 / 720.0).abs() < 1e-6);

    let second = scene.step(32.0);
    assert!(!second.resized);
    assert_eq!(scene.canvas.resizes, 1);

    scene.canvas.display = SurfaceSize::new(640, 640);
    assert!(scene.step(48.0).resized);
    assert_eq!(scene.projection.aspect, 1.0);
    assert_eq!(scene.canvas.resizes, 2);
}

#[test]
fn idle_camera_stays_in_the_zoom_range() {
    let size = SurfaceSize::new(800, 600);
    let mut scene = Scene::new(size, size);
    for i in 0..120 {
        scene.step(i as f64 * 16.0);
        let distance = (scene.camera.position - scene.camera.target).magnitude();
        assert!(distance >= 30.0 - 1e-3 && distance <= 80.0 + 1e-3);
    }
}

/// Distance between two angles on the circle, in radians.
fn angle_between(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(std::f64::consts::TAU);
    d.min(std::f64::consts::TAU - d)
}

#[test]
fn rotations_stay_smooth_after_ten_days() {
    let size = SurfaceSize::new(800, 600);
    let mut scene = Scene::new(size, size);
    let ten_days_ms = 10.0 * 24.0 * 3600.0 * 1000.0;

    let mut previous_moon = None;
    for frame in 0..4 {
        let time_ms = ten_days_ms + frame as f64 * 16.0;
        scene.step(time_ms);
        let t = time_ms * 0.001 / 3.0;

        let earth = scene.system.rotation_y(scene.system.tracked[3]).unwrap() as f64;
        let moon = scene.system.rotation_y(scene.system.moon_earth_orbit).unwrap() as f64;
        assert!(angle_between(earth, t) < 1e-5);
        assert!(angle_between(moon, t * 5.0) < 1e-5);

        if let Some(previous) = previous_moon {
            let step = angle_between(moon, previous);
            assert!((step - 0.016 * 5.0 / 3.0).abs() < 1e-4);
        }
        previous_moon = Some(moon);
    }
}
