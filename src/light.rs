//! Scene lights.
//!
//! Two kinds, matching what the shading model consumes: a uniform
//! [`AmbientLight`] and a single [`PointLight`] with physically based
//! inverse-power falloff.

use glam::Vec3;

use crate::material::Color;

/// Light applied equally to every surface, regardless of orientation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AmbientLight {
    pub color: Color,
    pub intensity: f32,
}

impl AmbientLight {
    pub fn new(color: Color, intensity: f32) -> Self {
        Self { color, intensity }
    }
}

impl Default for AmbientLight {
    fn default() -> Self {
        Self::new(Color::WHITE, 0.0)
    }
}

/// Omnidirectional light at a point in space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointLight {
    pub color: Color,
    pub intensity: f32,
    pub position: Vec3,
    /// Range cutoff. `0.0` means infinite range.
    pub distance: f32,
    /// Falloff exponent; 2 is physically correct.
    pub decay: f32,
}

impl PointLight {
    pub fn new(color: Color, intensity: f32) -> Self {
        Self {
            color,
            intensity,
            position: Vec3::ZERO,
            distance: 0.0,
            decay: 2.0,
        }
    }

    pub fn at(mut self, x: f32, y: f32, z: f32) -> Self {
        self.position = Vec3::new(x, y, z);
        self
    }

    pub fn distance(mut self, distance: f32) -> Self {
        self.distance = distance.max(0.0);
        self
    }

    pub fn decay(mut self, decay: f32) -> Self {
        self.decay = decay;
        self
    }

    /// Falloff factor at `d` units from the light.
    ///
    /// Mirrors the computation in `shaders/pbr.wgsl`.
    pub fn attenuation(&self, d: f32) -> f32 {
        let falloff = 1.0 / d.powf(self.decay).max(0.01);
        if self.distance > 0.0 {
            let ratio = (d / self.distance).powi(4);
            let window = (1.0 - ratio).clamp(0.0, 1.0);
            falloff * window * window
        } else {
            falloff
        }
    }
}

/// The lights of a scene.
#[derive(Clone, Debug, Default)]
pub struct Lights {
    pub ambient: AmbientLight,
    /// `None` renders without a direct light.
    pub point: Option<PointLight>,
}

/// Light data as laid out in the frame uniform buffer.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct LightUniforms {
    /// rgb = color × intensity.
    pub ambient: [f32; 4],
    /// xyz = position, w = 1 when the point light is enabled.
    pub point_position: [f32; 4],
    /// rgb = color × intensity.
    pub point_color: [f32; 4],
    /// x = distance, y = decay.
    pub point_params: [f32; 4],
}

impl From<&Lights> for LightUniforms {
    fn from(lights: &Lights) -> Self {
        let [ar, ag, ab] = lights.ambient.color.scaled(lights.ambient.intensity);
        let (point_position, point_color, point_params) = match &lights.point {
            Some(p) => {
                let [r, g, b] = p.color.scaled(p.intensity);
                (
                    p.position.extend(1.0).to_array(),
                    [r, g, b, 0.0],
                    [p.distance, p.decay, 0.0, 0.0],
                )
            }
            None => ([0.0; 4], [0.0; 4], [0.0; 4]),
        };
        Self {
            ambient: [ar, ag, ab, 0.0],
            point_position,
            point_color,
            point_params,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverse_square_falloff() {
        let light = PointLight::new(Color::WHITE, 1.0);
        assert_eq!(light.attenuation(1.0), 1.0);
        assert!((light.attenuation(2.0) - 0.25).abs() < 1e-6);
        // Clamped so the light never blows up next to its source.
        assert_eq!(light.attenuation(0.0), 100.0);
    }

    #[test]
    fn distance_cutoff() {
        let light = PointLight::new(Color::WHITE, 1.0).distance(4.0);
        assert_eq!(light.attenuation(4.0), 0.0);
        assert_eq!(light.attenuation(10.0), 0.0);
        assert!(light.attenuation(1.0) > 0.0);
    }

    #[test]
    fn uniforms_scale_color_by_intensity() {
        let lights = Lights {
            ambient: AmbientLight::new(Color::WHITE, 0.5),
            point: Some(PointLight::new(Color::WHITE, 1.0).at(5.0, 5.0, 5.0)),
        };
        let uniforms = LightUniforms::from(&lights);
        assert_eq!(uniforms.ambient, [0.5, 0.5, 0.5, 0.0]);
        assert_eq!(uniforms.point_position, [5.0, 5.0, 5.0, 1.0]);
        assert_eq!(uniforms.point_color, [1.0, 1.0, 1.0, 0.0]);
        assert_eq!(uniforms.point_params, [0.0, 2.0, 0.0, 0.0]);
    }

    #[test]
    fn missing_point_light_is_disabled() {
        let uniforms = LightUniforms::from(&Lights::default());
        assert_eq!(uniforms.point_position[3], 0.0);
    }
}
