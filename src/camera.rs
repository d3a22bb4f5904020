use glam::{Mat4, Vec3};

/// A perspective camera for 3D scenes.
///
/// Holds the projection parameters (vertical field of view, aspect, clip
/// planes) and a look-at pose. The projection matrix is cached: after
/// changing `fov`, `aspect`, `near` or `far`, call
/// [`update_projection_matrix`](Self::update_projection_matrix).
#[derive(Clone, Copy, Debug)]
pub struct PerspectiveCamera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    projection: Mat4,
}

impl Default for PerspectiveCamera {
    fn default() -> Self {
        Self::new(50.0, 1.0, 0.1, 2000.0)
    }
}

impl PerspectiveCamera {
    pub fn new(fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        let mut camera = Self {
            position: Vec3::ZERO,
            target: Vec3::NEG_Z,
            up: Vec3::Y,
            fov: fov_degrees,
            aspect,
            near,
            far,
            projection: Mat4::IDENTITY,
        };
        camera.update_projection_matrix();
        camera
    }

    pub fn at(mut self, x: f32, y: f32, z: f32) -> Self {
        self.position = Vec3::new(x, y, z);
        self
    }

    pub fn looking_at(mut self, x: f32, y: f32, z: f32) -> Self {
        self.target = Vec3::new(x, y, z);
        self
    }

    /// Set the aspect ratio and recompute the projection.
    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
        self.update_projection_matrix();
    }

    /// Recompute the cached projection matrix from the current parameters.
    pub fn update_projection_matrix(&mut self) {
        self.projection =
            Mat4::perspective_rh(self.fov.to_radians(), self.aspect, self.near, self.far);
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.projection
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view_matrix()
    }

    /// Unit vector the camera is facing.
    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize_or_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aspect_follows_resizes() {
        let mut camera = PerspectiveCamera::new(50.0, 800.0 / 600.0, 0.01, 100.0);
        for (w, h) in [(1920u32, 1080u32), (300, 900), (1, 1)] {
            camera.set_aspect(w as f32 / h as f32);
            assert_eq!(camera.aspect, w as f32 / h as f32);
            let expected = Mat4::perspective_rh(50f32.to_radians(), w as f32 / h as f32, 0.01, 100.0);
            assert!(camera.projection_matrix().abs_diff_eq(expected, 1e-6));
        }
    }

    #[test]
    fn projection_is_stale_until_updated() {
        let mut camera = PerspectiveCamera::new(50.0, 1.0, 0.01, 100.0);
        let before = camera.projection_matrix();
        camera.fov = 90.0;
        assert_eq!(camera.projection_matrix(), before);
        camera.update_projection_matrix();
        assert_ne!(camera.projection_matrix(), before);
    }

    #[test]
    fn looks_at_origin() {
        let camera = PerspectiveCamera::new(50.0, 1.0, 0.01, 100.0)
            .at(3.0, 2.0, 5.0)
            .looking_at(0.0, 0.0, 0.0);
        let forward = camera.forward();
        let expected = Vec3::new(-3.0, -2.0, -5.0).normalize();
        assert!(forward.abs_diff_eq(expected, 1e-6));

        // The target lands on the view axis (straight ahead, negative z in view space).
        let in_view = camera.view_matrix().transform_point3(Vec3::ZERO);
        assert!(in_view.x.abs() < 1e-5 && in_view.y.abs() < 1e-5);
        assert!(in_view.z < 0.0);
    }
}
