//! CPU-side geometry and the built-in primitives.
//!
//! [`RawGeometry`] holds vertices and triangle indices before GPU upload.
//! The primitive constructors follow the usual conventions for PBR scenes:
//! counter-clockwise front faces, unit normals, UVs in `[0, 1]` with `v`
//! running top to bottom.
//!
//! ```
//! use lustre::RawGeometry;
//!
//! let sphere = RawGeometry::sphere(0.5, 32, 32);
//! let torus = RawGeometry::torus(0.5, 0.2, 32, 64);
//! let plane = RawGeometry::plane(1.0, 1.0);
//! assert_eq!(plane.indices.len(), 6);
//! # let _ = (sphere, torus);
//! ```

use crate::gpu::GpuContext;
use crate::mesh::{Mesh, Vertex3d};
use glam::Vec3;
use std::f32::consts::{PI, TAU};

/// Raw geometry data before GPU upload.
#[derive(Clone, Debug)]
pub struct RawGeometry {
    /// Vertex positions, normals, and UVs.
    pub vertices: Vec<Vertex3d>,
    /// Triangle indices.
    pub indices: Vec<u32>,
}

impl RawGeometry {
    /// Creates raw geometry from vertices and indices.
    pub fn new(vertices: Vec<Vertex3d>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// A UV sphere centered at the origin.
    ///
    /// `width_segments` divide the equator, `height_segments` run pole to
    /// pole. The pole rows are degenerate rings, so no triangles are emitted
    /// for the collapsed edges there.
    pub fn sphere(radius: f32, width_segments: u32, height_segments: u32) -> Self {
        let width_segments = width_segments.max(3);
        let height_segments = height_segments.max(2);

        let mut vertices = Vec::with_capacity(((width_segments + 1) * (height_segments + 1)) as usize);
        let mut indices = Vec::new();

        for iy in 0..=height_segments {
            let v = iy as f32 / height_segments as f32;

            // Shift pole UVs to the middle of their segment.
            let u_offset = if iy == 0 {
                0.5 / width_segments as f32
            } else if iy == height_segments {
                -0.5 / width_segments as f32
            } else {
                0.0
            };

            for ix in 0..=width_segments {
                let u = ix as f32 / width_segments as f32;
                let phi = u * TAU;
                let theta = v * PI;

                let position = Vec3::new(
                    -radius * phi.cos() * theta.sin(),
                    radius * theta.cos(),
                    radius * phi.sin() * theta.sin(),
                );
                let normal = position.normalize_or_zero();

                vertices.push(Vertex3d::new(
                    position.into(),
                    normal.into(),
                    [u + u_offset, v],
                ));
            }
        }

        let row = width_segments + 1;
        for iy in 0..height_segments {
            for ix in 0..width_segments {
                let a = iy * row + ix + 1;
                let b = iy * row + ix;
                let c = (iy + 1) * row + ix;
                let d = (iy + 1) * row + ix + 1;

                if iy != 0 {
                    indices.extend_from_slice(&[a, b, d]);
                }
                if iy != height_segments - 1 {
                    indices.extend_from_slice(&[b, c, d]);
                }
            }
        }

        Self::new(vertices, indices)
    }

    /// A torus in the XY plane, centered at the origin.
    ///
    /// `radius` is the distance from the center to the middle of the tube,
    /// `tube` the tube's own radius.
    pub fn torus(radius: f32, tube: f32, radial_segments: u32, tubular_segments: u32) -> Self {
        let radial_segments = radial_segments.max(3);
        let tubular_segments = tubular_segments.max(3);

        let mut vertices =
            Vec::with_capacity(((radial_segments + 1) * (tubular_segments + 1)) as usize);
        let mut indices = Vec::new();

        for j in 0..=radial_segments {
            for i in 0..=tubular_segments {
                let u = i as f32 / tubular_segments as f32 * TAU;
                let v = j as f32 / radial_segments as f32 * TAU;

                let position = Vec3::new(
                    (radius + tube * v.cos()) * u.cos(),
                    (radius + tube * v.cos()) * u.sin(),
                    tube * v.sin(),
                );
                let center = Vec3::new(radius * u.cos(), radius * u.sin(), 0.0);
                let normal = (position - center).normalize_or_zero();

                vertices.push(Vertex3d::new(
                    position.into(),
                    normal.into(),
                    [
                        i as f32 / tubular_segments as f32,
                        j as f32 / radial_segments as f32,
                    ],
                ));
            }
        }

        let row = tubular_segments + 1;
        for j in 1..=radial_segments {
            for i in 1..=tubular_segments {
                let a = row * j + i - 1;
                let b = row * (j - 1) + i - 1;
                let c = row * (j - 1) + i;
                let d = row * j + i;

                indices.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }

        Self::new(vertices, indices)
    }

    /// A single-quad plane in the XY plane facing +Z.
    pub fn plane(width: f32, height: f32) -> Self {
        let hw = width * 0.5;
        let hh = height * 0.5;
        let normal = [0.0, 0.0, 1.0];

        let vertices = vec![
            Vertex3d::new([-hw, hh, 0.0], normal, [0.0, 0.0]),
            Vertex3d::new([hw, hh, 0.0], normal, [1.0, 0.0]),
            Vertex3d::new([-hw, -hh, 0.0], normal, [0.0, 1.0]),
            Vertex3d::new([hw, -hh, 0.0], normal, [1.0, 1.0]),
        ];
        let indices = vec![0, 2, 1, 2, 3, 1];

        Self::new(vertices, indices)
    }

    /// Computes the axis-aligned bounding box.
    ///
    /// Returns `(min, max)` corners of the bounding box.
    pub fn bounds(&self) -> (Vec3, Vec3) {
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);

        for v in &self.vertices {
            let p = Vec3::from(v.position);
            min = min.min(p);
            max = max.max(p);
        }

        (min, max)
    }

    /// Returns the center point of the geometry.
    pub fn center(&self) -> Vec3 {
        let (min, max) = self.bounds();
        (min + max) * 0.5
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Uploads this geometry to the GPU as a [`Mesh`].
    pub fn upload(&self, gpu: &GpuContext) -> Mesh {
        Mesh::new(gpu, &self.vertices, &self.indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_unit_normals(geom: &RawGeometry) {
        for v in &geom.vertices {
            let len = Vec3::from(v.normal).length();
            assert!((len - 1.0).abs() < 1e-4, "normal length {len}");
        }
    }

    /// Every triangle's winding agrees with its vertex normals (CCW front faces).
    fn assert_outward_winding(geom: &RawGeometry) {
        for tri in geom.indices.chunks(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| geom.vertices[i as usize]);
            let p0 = Vec3::from(a.position);
            let face = (Vec3::from(b.position) - p0).cross(Vec3::from(c.position) - p0);
            if face.length_squared() < 1e-12 {
                continue;
            }
            let normal = Vec3::from(a.normal) + Vec3::from(b.normal) + Vec3::from(c.normal);
            assert!(face.dot(normal) > 0.0);
        }
    }

    #[test]
    fn sphere_vertices_lie_on_radius() {
        let sphere = RawGeometry::sphere(0.5, 32, 32);
        assert_eq!(sphere.vertices.len(), 33 * 33);
        // Pole rows contribute one triangle per segment instead of two.
        assert_eq!(sphere.triangle_count(), 32 * 32 * 2 - 2 * 32);
        for v in &sphere.vertices {
            assert!((Vec3::from(v.position).length() - 0.5).abs() < 1e-5);
        }
        assert_unit_normals(&sphere);
        assert_outward_winding(&sphere);
    }

    #[test]
    fn torus_dimensions() {
        let torus = RawGeometry::torus(0.5, 0.2, 32, 64);
        assert_eq!(torus.vertices.len(), 33 * 65);
        assert_eq!(torus.triangle_count(), 32 * 64 * 2);

        let (min, max) = torus.bounds();
        assert!((max.x - 0.7).abs() < 1e-4);
        assert!((min.x + 0.7).abs() < 1e-4);
        assert!((max.z - 0.2).abs() < 1e-4);
        assert!(torus.center().length() < 1e-4);
        assert_unit_normals(&torus);
        assert_outward_winding(&torus);
    }

    #[test]
    fn plane_faces_positive_z() {
        let plane = RawGeometry::plane(1.0, 1.0);
        let (min, max) = plane.bounds();
        assert_eq!(min, Vec3::new(-0.5, -0.5, 0.0));
        assert_eq!(max, Vec3::new(0.5, 0.5, 0.0));
        assert_outward_winding(&plane);
        assert!(plane.vertices.iter().all(|v| v.normal == [0.0, 0.0, 1.0]));
    }

    #[test]
    fn raw_geometry_center() {
        let vertices = vec![
            Vertex3d::new([0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0]),
            Vertex3d::new([2.0, 4.0, 6.0], [0.0, 1.0, 0.0], [0.0, 0.0]),
        ];
        let geom = RawGeometry::new(vertices, vec![0, 1, 0]);

        assert_eq!(geom.center(), Vec3::new(1.0, 2.0, 3.0));
    }
}
