//! Node transforms and their GPU representation.
//!
//! An [`Instance`] is the local (or world) transform of a scene-graph node.
//! Model nodes upload their world transform as an [`InstanceRaw`] into a
//! shared instance buffer every frame.

use std::ops::Mul;

use cgmath::{InnerSpace, One, Rotation3};

use crate::data_structures::model;

/// Position, rotation (as quaternion) and scale of a node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Instance {
    pub position: cgmath::Vector3<f32>,
    pub rotation: cgmath::Quaternion<f32>,
    pub scale: cgmath::Vector3<f32>,
}

impl Instance {
    /// Identity transform (no move, rotate, or scale).
    pub fn new() -> Self {
        Self {
            position: cgmath::Vector3::new(0.0, 0.0, 0.0),
            // `Quaternion::one()` is the identity quaternion (no rotation)
            rotation: cgmath::Quaternion::one(),
            scale: cgmath::Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn with_position(mut self, position: cgmath::Vector3<f32>) -> Self {
        self.position = position;
        self
    }

    pub fn with_uniform_scale(mut self, scale: f32) -> Self {
        self.scale = cgmath::Vector3::new(scale, scale, scale);
        self
    }

    /// Replaces the rotation with `angle` about +Y.
    pub fn set_rotation_y<A: Into<cgmath::Rad<f32>>>(&mut self, angle: A) {
        self.rotation = cgmath::Quaternion::from_angle_y(angle);
    }

    pub fn to_matrix(&self) -> cgmath::Matrix4<f32> {
        cgmath::Matrix4::from_translation(self.position)
            * cgmath::Matrix4::from(self.rotation)
            * cgmath::Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }

    pub fn to_raw(&self) -> InstanceRaw {
        InstanceRaw {
            model: self.to_matrix().into(),
            normal: cgmath::Matrix3::from(self.rotation.normalize()).into(),
        }
    }
}

/// Composes `parent * child`: the child's transform expressed in the parent's space.
impl<'a, 'b> Mul<&'b Instance> for &'a Instance {
    type Output = Instance;

    fn mul(self, rhs: &'b Instance) -> Self::Output {
        let new_rotation = self.rotation * rhs.rotation;

        let new_scale = cgmath::Vector3::new(
            self.scale.x * rhs.scale.x,
            self.scale.y * rhs.scale.y,
            self.scale.z * rhs.scale.z,
        );
        let scaled_rhs_pos = cgmath::Vector3::new(
            self.scale.x * rhs.position.x,
            self.scale.y * rhs.position.y,
            self.scale.z * rhs.position.z,
        );
        let new_position = self.position + (self.rotation * scaled_rhs_pos);

        Instance {
            position: new_position,
            rotation: new_rotation,
            scale: new_scale,
        }
    }
}

impl Mul<Instance> for Instance {
    type Output = Self;

    fn mul(self, rhs: Instance) -> Self::Output {
        &self * &rhs
    }
}

impl Default for Instance {
    fn default() -> Self {
        Self::new()
    }
}

/**
 * The raw instance is the actual data stored on the GPU
 */
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceRaw {
    model: [[f32; 4]; 4],
    normal: [[f32; 3]; 3],
}

/**
 * Stride layout: the model matrix as four vec4s (locations 5-8) followed by the
 * normal matrix as three vec3s (locations 9-11).
 */
impl model::Vertex for InstanceRaw {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<InstanceRaw>() as wgpu::BufferAddress,
            // Advance once per instance instead of once per vertex
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 5,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 4]>() as wgpu::BufferAddress,
                    shader_location: 6,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 8]>() as wgpu::BufferAddress,
                    shader_location: 7,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 12]>() as wgpu::BufferAddress,
                    shader_location: 8,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 16]>() as wgpu::BufferAddress,
                    shader_location: 9,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 19]>() as wgpu::BufferAddress,
                    shader_location: 10,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 22]>() as wgpu::BufferAddress,
                    shader_location: 11,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Rad, Vector3};

    fn close(a: Vector3<f32>, b: Vector3<f32>) -> bool {
        (a - b).magnitude() < 1e-5
    }

    #[test]
    fn composition_applies_parent_rotation_to_child_offset() {
        let mut parent = Instance::new();
        parent.set_rotation_y(Rad(std::f32::consts::FRAC_PI_2));
        let child = Instance::new().with_position(Vector3::new(20.0, 0.0, 0.0));

        let world = &parent * &child;
        // +X rotated a quarter turn about +Y lands on -Z
        assert!(close(world.position, Vector3::new(0.0, 0.0, -20.0)));
    }

    #[test]
    fn composition_scales_child_offset() {
        let parent = Instance::new().with_uniform_scale(2.0);
        let child = Instance::new()
            .with_position(Vector3::new(1.0, 0.0, 0.0))
            .with_uniform_scale(0.5);

        let world = parent * child;
        assert!(close(world.position, Vector3::new(2.0, 0.0, 0.0)));
        assert!(close(world.scale, Vector3::new(1.0, 1.0, 1.0)));
    }

    #[test]
    fn set_rotation_y_replaces_previous_rotation() {
        let mut instance = Instance::new();
        instance.set_rotation_y(Rad(1.0));
        instance.set_rotation_y(Rad(1.0));
        let expected = cgmath::Quaternion::from_angle_y(Rad(1.0));
        assert!((instance.rotation - expected).magnitude() < 1e-6);
    }

    #[test]
    fn raw_instance_size_matches_vertex_layout() {
        assert_eq!(std::mem::size_of::<InstanceRaw>(), 25 * 4);
    }
}
