//! ECS components for scene objects.
//!
//! Scene objects are `hecs` entities. An entity with a
//! [`Transform`](crate::Transform) and a [`RenderMesh`] is drawn every frame;
//! adding a [`Spin`] makes [`Scene::animate`](crate::Scene::animate) drive its
//! y-rotation from elapsed time.
//!
//! # Example
//!
//! ```ignore
//! use lustre::*;
//!
//! run(|ctx| {
//!     let material = ctx.add_material(StandardMaterial::new().metalness(0.7));
//!     let sphere = ctx.mesh_sphere(0.5, 32, 32);
//!
//!     ctx.spawn((
//!         Transform::from_position(Vec3::new(-1.5, 0.0, 0.0)),
//!         RenderMesh::new(sphere, material),
//!         Spin::new(0.2),
//!     ));
//!
//!     move |frame| {
//!         frame.animate();
//!     }
//! });
//! ```

use crate::material::MaterialId;

/// Type-safe handle to a mesh uploaded through the
/// [`SetupContext`](crate::SetupContext).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MeshId(pub(crate) usize);

/// Component for drawing a mesh with a material.
///
/// Entities only hold the material's id, so any number of them can share
/// one material and observe every edit made to it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderMesh {
    /// Handle to the mesh geometry.
    pub mesh: MeshId,
    /// Handle to the material in the shared library.
    pub material: MaterialId,
}

impl RenderMesh {
    pub fn new(mesh: MeshId, material: MaterialId) -> Self {
        Self { mesh, material }
    }
}

/// Rotation about the y axis driven by elapsed time.
///
/// At time `t` seconds the entity's `rotation.y` is `rate * t` radians. The
/// angle is absolute rather than accumulated, so it never drifts with
/// frame timing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Spin {
    /// Radians per second.
    pub rate: f32,
}

impl Spin {
    pub fn new(rate: f32) -> Self {
        Self { rate }
    }

    /// The y-rotation at elapsed time `t`.
    pub fn angle_at(&self, t: f32) -> f32 {
        self.rate * t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spin_angle_is_linear_in_time() {
        let spin = Spin::new(0.2);
        assert_eq!(spin.angle_at(0.0), 0.0);
        assert!((spin.angle_at(10.0) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn render_meshes_compare_by_handles() {
        let a = RenderMesh::new(MeshId(0), MaterialId(0));
        let b = RenderMesh::new(MeshId(1), MaterialId(0));
        assert_ne!(a, b);
        assert_eq!(a.material, b.material);
    }
}
