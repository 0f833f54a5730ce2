//! The per-frame update: orbit clock, resize check, animation and camera step.
//!
//! Nothing here touches the GPU, the drawing buffer is reached through
//! [`DrawingBuffer`] so the update can run against any surface.

use crate::{
    camera::{Camera, Projection},
    controls::OrbitController,
    solar_system::SolarSystem,
};

/// Width and height in physical pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl From<winit::dpi::PhysicalSize<u32>> for SurfaceSize {
    fn from(size: winit::dpi::PhysicalSize<u32>) -> Self {
        Self::new(size.width, size.height)
    }
}

/// Something drawn into at one size and shown at another.
pub trait DrawingBuffer {
    /// Size of the buffer frames are rendered into.
    fn buffer_size(&self) -> SurfaceSize;
    /// Size the buffer is currently displayed at.
    fn display_size(&self) -> SurfaceSize;
    fn set_buffer_size(&mut self, size: SurfaceSize);
}

/// Seconds since startup, slowed down by `slowdown`. Used as the rotation
/// angle of the tracked nodes in radians.
///
/// Unbounded, so it stays in `f64` until [`SolarSystem::animate`] wraps it.
pub fn orbit_clock(time_ms: f64, slowdown: f64) -> f64 {
    time_ms * 0.001 / slowdown
}

/// Matches the drawing buffer to its display size and the projection's aspect
/// ratio to the new size. Returns whether anything changed.
pub fn resize_to_display_size<B: DrawingBuffer + ?Sized>(
    buffer: &mut B,
    projection: &mut Projection,
) -> bool {
    let display = buffer.display_size();
    if display.is_empty() || buffer.buffer_size() == display {
        return false;
    }
    buffer.set_buffer_size(display);
    projection.resize(display.width, display.height);
    log::debug!("Resized drawing buffer to {}x{}", display.width, display.height);
    true
}

/// Result of one [`update`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameUpdate {
    /// The orbit clock in radians.
    pub t: f64,
    pub resized: bool,
}

/// Advances everything that changes between two frames.
pub fn update<B: DrawingBuffer + ?Sized>(
    time_ms: f64,
    slowdown: f64,
    buffer: &mut B,
    system: &mut SolarSystem,
    camera: &mut Camera,
    projection: &mut Projection,
    controller: &mut OrbitController,
) -> FrameUpdate {
    let t = orbit_clock(time_ms, slowdown);

    let resized = resize_to_display_size(buffer, projection);
    if resized {
        controller.resize(buffer.buffer_size().height);
    }

    system.animate(t);
    controller.update(camera, projection);

    FrameUpdate { t, resized }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Deg;

    struct FakeCanvas {
        buffer: SurfaceSize,
        display: SurfaceSize,
    }

    impl DrawingBuffer for FakeCanvas {
        fn buffer_size(&self) -> SurfaceSize {
            self.buffer
        }
        fn display_size(&self) -> SurfaceSize {
            self.display
        }
        fn set_buffer_size(&mut self, size: SurfaceSize) {
            self.buffer = size;
        }
    }

    #[test]
    fn orbit_clock_is_a_third_of_seconds() {
        assert_eq!(orbit_clock(0.0, 3.0), 0.0);
        assert!((orbit_clock(3000.0, 3.0) - 1.0).abs() < 1e-6);
        assert!((orbit_clock(600.0, 3.0) - 0.2).abs() < 1e-9);
    }

    #[test]
    fn orbit_clock_keeps_millisecond_steps_after_days() {
        let ten_days_ms = 10.0 * 24.0 * 3600.0 * 1000.0;
        let step = orbit_clock(ten_days_ms + 16.0, 3.0) - orbit_clock(ten_days_ms, 3.0);
        assert!((step - 0.016 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn resize_is_idempotent() {
        let mut canvas = FakeCanvas {
            buffer: SurfaceSize::new(800, 600),
            display: SurfaceSize::new(1024, 768),
        };
        let mut projection = Projection::new(2.0, Deg(40.0), 0.1, 1000.0);

        assert!(resize_to_display_size(&mut canvas, &mut projection));
        assert_eq!(canvas.buffer, SurfaceSize::new(1024, 768));
        assert_eq!(projection.aspect, 1024.0 / 768.0);

        assert!(!resize_to_display_size(&mut canvas, &mut projection));
        assert!(!resize_to_display_size(&mut canvas, &mut projection));
        assert_eq!(projection.aspect, 1024.0 / 768.0);
    }

    #[test]
    fn zero_sized_display_is_skipped() {
        let mut canvas = FakeCanvas {
            buffer: SurfaceSize::new(800, 600),
            display: SurfaceSize::new(0, 0),
        };
        let mut projection = Projection::new(2.0, Deg(40.0), 0.1, 1000.0);
        assert!(!resize_to_display_size(&mut canvas, &mut projection));
        assert_eq!(canvas.buffer, SurfaceSize::new(800, 600));
        assert_eq!(projection.aspect, 2.0);
    }
}
