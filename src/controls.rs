//! Orbit camera controller: left-drag orbits, right-drag pans, the wheel zooms.
//!
//! Input only accumulates deltas; [`OrbitController::update`] applies them to
//! the camera once per frame. With damping enabled each update applies a
//! fraction of the remaining delta, so motion eases out over several frames.

use cgmath::*;
use winit::{
    dpi::PhysicalPosition,
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
};

use crate::{
    camera::{Camera, Projection},
    config::ControlsConfig,
};

const EPS: f32 = 0.000001;
/// Pixels per wheel "line" when the platform reports pixel deltas.
const PIXELS_PER_LINE: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragState {
    None,
    Rotate,
    Pan,
    Dolly,
}

/// Spherical coordinates around the target, with +Y up.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Spherical {
    radius: f32,
    /// Polar angle from +Y.
    phi: f32,
    /// Azimuth around +Y, measured from +Z.
    theta: f32,
}

impl Spherical {
    fn from_offset(offset: Vector3<f32>) -> Self {
        let radius = offset.magnitude();
        if radius == 0.0 {
            return Self {
                radius,
                phi: 0.0,
                theta: 0.0,
            };
        }
        Self {
            radius,
            theta: offset.x.atan2(offset.z),
            phi: (offset.y / radius).clamp(-1.0, 1.0).acos(),
        }
    }

    fn to_offset(self) -> Vector3<f32> {
        let sin_phi_radius = self.phi.sin() * self.radius;
        Vector3::new(
            sin_phi_radius * self.theta.sin(),
            self.phi.cos() * self.radius,
            sin_phi_radius * self.theta.cos(),
        )
    }
}

#[derive(Debug, Clone)]
pub struct OrbitController {
    config: ControlsConfig,
    pub target: Point3<f32>,
    /// Remaining (theta, phi) rotation still to be applied.
    spherical_delta: Vector2<f32>,
    pan_offset: Vector3<f32>,
    /// Screen-space pan accumulated since the last update, in pixels.
    pending_pan: Vector2<f32>,
    scale: f32,
    state: DragState,
    cursor: Option<PhysicalPosition<f64>>,
    viewport_height: f32,
}

impl OrbitController {
    pub fn new(config: ControlsConfig, target: Point3<f32>, viewport_height: u32) -> Self {
        Self {
            config,
            target,
            spherical_delta: Vector2::zero(),
            pan_offset: Vector3::zero(),
            pending_pan: Vector2::zero(),
            scale: 1.0,
            state: DragState::None,
            cursor: None,
            viewport_height: viewport_height.max(1) as f32,
        }
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    /// Rotation per pixel is relative to the viewport height.
    pub fn resize(&mut self, viewport_height: u32) {
        if viewport_height > 0 {
            self.viewport_height = viewport_height as f32;
        }
    }

    pub fn rotate_left(&mut self, angle: f32) {
        self.spherical_delta.x -= angle;
    }

    pub fn rotate_up(&mut self, angle: f32) {
        self.spherical_delta.y -= angle;
    }

    pub fn dolly_in(&mut self, dolly_scale: f32) {
        if self.config.enable_zoom {
            self.scale *= dolly_scale;
        }
    }

    pub fn dolly_out(&mut self, dolly_scale: f32) {
        if self.config.enable_zoom {
            self.scale /= dolly_scale;
        }
    }

    /// Queues a pan by a screen-space distance in pixels.
    pub fn pan(&mut self, dx: f32, dy: f32) {
        if self.config.enable_pan {
            self.pending_pan += Vector2::new(dx, dy);
        }
    }

    fn zoom_scale(&self) -> f32 {
        0.95f32.powf(self.config.zoom_speed)
    }

    /// Feeds a window event to the controller. Returns whether it was consumed.
    pub fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::MouseInput { state, button, .. } => {
                match (button, state) {
                    (MouseButton::Left, ElementState::Pressed) => self.state = DragState::Rotate,
                    (MouseButton::Right, ElementState::Pressed) if self.config.enable_pan => {
                        self.state = DragState::Pan
                    }
                    (MouseButton::Middle, ElementState::Pressed) if self.config.enable_zoom => {
                        self.state = DragState::Dolly
                    }
                    (_, ElementState::Released) => self.state = DragState::None,
                    _ => return false,
                }
                true
            }
            WindowEvent::CursorMoved { position, .. } => {
                let previous = self.cursor.replace(*position);
                let Some(previous) = previous else {
                    return false;
                };
                let dx = (position.x - previous.x) as f32;
                let dy = (position.y - previous.y) as f32;
                self.handle_drag(dx, dy)
            }
            WindowEvent::CursorLeft { .. } => {
                self.cursor = None;
                self.state = DragState::None;
                false
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let y = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y as f64,
                    MouseScrollDelta::PixelDelta(p) => p.y / PIXELS_PER_LINE,
                };
                if y > 0.0 {
                    self.dolly_in(self.zoom_scale());
                } else if y < 0.0 {
                    self.dolly_out(self.zoom_scale());
                }
                y != 0.0
            }
            _ => false,
        }
    }

    fn handle_drag(&mut self, dx: f32, dy: f32) -> bool {
        match self.state {
            DragState::None => false,
            DragState::Rotate => {
                let full_turn = 2.0 * std::f32::consts::PI / self.viewport_height;
                self.rotate_left(full_turn * dx * self.config.rotate_speed);
                self.rotate_up(full_turn * dy * self.config.rotate_speed);
                true
            }
            DragState::Pan => {
                self.pan(dx * self.config.pan_speed, dy * self.config.pan_speed);
                true
            }
            DragState::Dolly => {
                if dy > 0.0 {
                    self.dolly_out(self.zoom_scale());
                } else if dy < 0.0 {
                    self.dolly_in(self.zoom_scale());
                }
                true
            }
        }
    }

    /// Applies the accumulated input to `camera`. Returns whether the camera moved.
    pub fn update(&mut self, camera: &mut Camera, projection: &Projection) -> bool {
        let mut offset = camera.position - self.target;

        self.flush_pan(camera, projection, offset.magnitude());

        let mut spherical = Spherical::from_offset(offset);
        let factor = if self.config.enable_damping {
            self.config.damping_factor
        } else {
            1.0
        };
        spherical.theta += self.spherical_delta.x * factor;
        spherical.phi += self.spherical_delta.y * factor;
        spherical.phi = spherical.phi.clamp(EPS, std::f32::consts::PI - EPS);
        spherical.radius = (spherical.radius * self.scale)
            .clamp(self.config.min_distance, self.config.max_distance);

        self.target += self.pan_offset * factor;
        offset = spherical.to_offset();

        let previous = camera.position;
        camera.position = self.target + offset;
        camera.target = self.target;

        if self.config.enable_damping {
            self.spherical_delta *= 1.0 - factor;
            self.pan_offset *= 1.0 - factor;
        } else {
            self.spherical_delta = Vector2::zero();
            self.pan_offset = Vector3::zero();
        }
        self.scale = 1.0;

        (camera.position - previous).magnitude2() > EPS
    }

    /// Turns the pixel pan queued since the last update into a world-space offset.
    fn flush_pan(&mut self, camera: &Camera, projection: &Projection, distance: f32) {
        if self.pending_pan == Vector2::zero() {
            return;
        }
        let target_distance = distance * (projection.fovy / 2.0).tan();
        let forward = (self.target - camera.position).normalize();
        let right = forward.cross(Vector3::unit_y()).normalize();
        let up = right.cross(forward);

        let left = 2.0 * self.pending_pan.x * target_distance / self.viewport_height;
        let upwards = 2.0 * self.pending_pan.y * target_distance / self.viewport_height;
        self.pan_offset += -right * left + up * upwards;
        self.pending_pan = Vector2::zero();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{camera, config::CameraConfig};

    fn setup() -> (OrbitController, Camera, Projection) {
        let (camera, projection) = camera::from_config(&CameraConfig::default());
        let controller = OrbitController::new(ControlsConfig::default(), camera.target, 600);
        (controller, camera, projection)
    }

    fn distance(camera: &Camera) -> f32 {
        (camera.position - camera.target).magnitude()
    }

    #[test]
    fn no_input_leaves_camera_in_place() {
        let (mut controller, mut camera, projection) = setup();
        let start = camera;
        for _ in 0..10 {
            controller.update(&mut camera, &projection);
        }
        assert!((camera.position - start.position).magnitude() < 1e-3);
        assert_eq!(camera.target, start.target);
    }

    #[test]
    fn zoom_is_clamped_to_distance_range() {
        let (mut controller, mut camera, projection) = setup();
        for _ in 0..200 {
            controller.dolly_in(0.5);
            controller.update(&mut camera, &projection);
        }
        assert!((distance(&camera) - 30.0).abs() < 1e-3);

        for _ in 0..200 {
            controller.dolly_out(0.5);
            controller.update(&mut camera, &projection);
        }
        assert!((distance(&camera) - 80.0).abs() < 1e-3);
    }

    #[test]
    fn damped_rotation_eases_out_to_full_angle() {
        let (mut controller, mut camera, projection) = setup();
        let before = Spherical::from_offset(camera.position - camera.target).theta;

        controller.rotate_left(-0.5);
        let mut last_step = f32::MAX;
        for _ in 0..600 {
            let prev = camera.position;
            controller.update(&mut camera, &projection);
            last_step = (camera.position - prev).magnitude();
        }
        let after = Spherical::from_offset(camera.position - camera.target).theta;

        assert!(last_step < 1e-4);
        assert!((after - before - 0.5).abs() < 1e-3);
    }

    #[test]
    fn polar_angle_never_flips_over_the_pole() {
        let mut config = ControlsConfig::default();
        config.enable_damping = false;
        let (mut camera, projection) = camera::from_config(&CameraConfig::default());
        let mut controller = OrbitController::new(config, camera.target, 600);

        controller.rotate_up(10.0);
        controller.update(&mut camera, &projection);
        let offset = camera.position - camera.target;
        assert!(offset.y > 0.0);
        assert!(offset.x.abs() < 1e-3 && offset.z.abs() < 1e-3);
    }

    #[test]
    fn left_drag_rotates_and_release_stops() {
        let (mut controller, _, _) = setup();
        let press = WindowEvent::MouseInput {
            device_id: winit::event::DeviceId::dummy(),
            state: ElementState::Pressed,
            button: MouseButton::Left,
        };
        assert!(controller.handle_window_event(&press));
        assert_eq!(controller.state(), DragState::Rotate);

        assert!(controller.handle_drag(300.0, 0.0));
        // Dragging half the viewport height turns a full half circle
        assert!((controller.spherical_delta.x + std::f32::consts::PI).abs() < 1e-5);

        let release = WindowEvent::MouseInput {
            device_id: winit::event::DeviceId::dummy(),
            state: ElementState::Released,
            button: MouseButton::Left,
        };
        controller.handle_window_event(&release);
        assert_eq!(controller.state(), DragState::None);
    }

    #[test]
    fn pan_moves_target_and_camera_together() {
        let mut config = ControlsConfig::default();
        config.enable_damping = false;
        let (mut camera, projection) = camera::from_config(&CameraConfig::default());
        let mut controller = OrbitController::new(config, camera.target, 600);
        let offset_before = camera.position - camera.target;

        controller.pan(100.0, 0.0);
        controller.update(&mut camera, &projection);

        let offset_after = camera.position - camera.target;
        assert!((offset_after - offset_before).magnitude() < 1e-3);
        // Dragging right pulls the scene right, moving the target to the left
        assert!(camera.target.x < 0.0);
    }
}
