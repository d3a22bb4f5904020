//! Physically based surface materials.
//!
//! A [`StandardMaterial`] is the metalness/roughness model: a base color, how
//! metallic the surface is, how rough it is, and an optional environment
//! cubemap it reflects. Materials live in a shared [`Materials`] library and
//! are referenced by [`MaterialId`], so any number of objects can point at
//! the same instance and observe every edit to it.

use crate::texture::EnvMapId;

/// Linear RGBA color.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Color from a `0xRRGGBB` literal, interpreted as sRGB and converted
    /// to linear.
    pub fn hex(hex: u32) -> Self {
        let channel = |shift: u32| srgb_to_linear(((hex >> shift) & 0xff) as f32 / 255.0);
        Self::rgb(channel(16), channel(8), channel(0))
    }

    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// RGB scaled by `intensity`, alpha dropped.
    pub fn scaled(self, intensity: f32) -> [f32; 3] {
        [self.r * intensity, self.g * intensity, self.b * intensity]
    }

    pub(crate) fn to_wgpu(self) -> wgpu::Color {
        wgpu::Color {
            r: self.r as f64,
            g: self.g as f64,
            b: self.b as f64,
            a: self.a as f64,
        }
    }
}

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Metalness/roughness PBR material.
#[derive(Clone, Debug, PartialEq)]
pub struct StandardMaterial {
    pub color: Color,
    /// 0 = dielectric, 1 = metal.
    pub metalness: f32,
    /// 0 = mirror, 1 = fully diffuse.
    pub roughness: f32,
    pub env_map: Option<EnvMapId>,
    pub env_map_intensity: f32,
}

impl Default for StandardMaterial {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            metalness: 0.0,
            roughness: 1.0,
            env_map: None,
            env_map_intensity: 1.0,
        }
    }
}

impl StandardMaterial {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn metalness(mut self, metalness: f32) -> Self {
        self.set(MaterialParam::Metalness, metalness);
        self
    }

    pub fn roughness(mut self, roughness: f32) -> Self {
        self.set(MaterialParam::Roughness, roughness);
        self
    }

    pub fn env_map(mut self, env_map: EnvMapId) -> Self {
        self.env_map = Some(env_map);
        self
    }

    pub fn env_map_intensity(mut self, intensity: f32) -> Self {
        self.set(MaterialParam::EnvMapIntensity, intensity);
        self
    }

    pub fn get(&self, param: MaterialParam) -> f32 {
        match param {
            MaterialParam::Metalness => self.metalness,
            MaterialParam::Roughness => self.roughness,
            MaterialParam::EnvMapIntensity => self.env_map_intensity,
        }
    }

    /// Write a scalar parameter, clamped to its valid range.
    pub fn set(&mut self, param: MaterialParam, value: f32) {
        let value = param.clamp(value);
        match param {
            MaterialParam::Metalness => self.metalness = value,
            MaterialParam::Roughness => self.roughness = value,
            MaterialParam::EnvMapIntensity => self.env_map_intensity = value,
        }
    }
}

/// The scalar fields of a [`StandardMaterial`] that can be bound to controls.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MaterialParam {
    Metalness,
    Roughness,
    EnvMapIntensity,
}

impl MaterialParam {
    /// Clamp `value` into the parameter's valid range. NaN maps to the
    /// range's lower bound.
    pub fn clamp(self, value: f32) -> f32 {
        let value = if value.is_nan() { 0.0 } else { value };
        match self {
            MaterialParam::Metalness | MaterialParam::Roughness => value.clamp(0.0, 1.0),
            MaterialParam::EnvMapIntensity => value.max(0.0),
        }
    }
}

/// Type-safe handle to a material in a [`Materials`] library.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MaterialId(pub(crate) usize);

/// Shared storage for materials.
///
/// Typically wrapped in `Rc<RefCell<_>>` and shared between the scene
/// renderer and the control panel bindings.
#[derive(Debug, Default)]
pub struct Materials {
    materials: Vec<StandardMaterial>,
}

impl Materials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, material: StandardMaterial) -> MaterialId {
        let id = MaterialId(self.materials.len());
        self.materials.push(material);
        id
    }

    pub fn get(&self, id: MaterialId) -> Option<&StandardMaterial> {
        self.materials.get(id.0)
    }

    pub fn get_mut(&mut self, id: MaterialId) -> Option<&mut StandardMaterial> {
        self.materials.get_mut(id.0)
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MaterialId, &StandardMaterial)> {
        self.materials
            .iter()
            .enumerate()
            .map(|(i, m)| (MaterialId(i), m))
    }
}

/// Per-material uniforms uploaded before each draw.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct MaterialUniforms {
    pub color: [f32; 4],
    /// x = metalness, y = roughness, z = env map intensity, w = 1 when an
    /// environment map is bound.
    pub params: [f32; 4],
}

impl MaterialUniforms {
    pub fn from_material(material: &StandardMaterial, has_env_map: bool) -> Self {
        Self {
            color: material.color.to_array(),
            params: [
                material.metalness,
                material.roughness,
                material.env_map_intensity,
                if has_env_map { 1.0 } else { 0.0 },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_white_and_black() {
        let white = Color::hex(0xffffff);
        assert!((white.r - 1.0).abs() < 1e-6 && (white.b - 1.0).abs() < 1e-6);
        assert_eq!(Color::hex(0x000000), Color::BLACK);
        let mid = Color::hex(0x808080);
        assert!((mid.r - 0.2158605).abs() < 1e-4);
    }

    #[test]
    fn parameters_are_clamped() {
        let mut material = StandardMaterial::new().metalness(1.7).roughness(-0.2);
        assert_eq!(material.metalness, 1.0);
        assert_eq!(material.roughness, 0.0);

        material.set(MaterialParam::Metalness, f32::NAN);
        assert_eq!(material.metalness, 0.0);

        material.set(MaterialParam::EnvMapIntensity, 3.0);
        assert_eq!(material.get(MaterialParam::EnvMapIntensity), 3.0);
    }

    #[test]
    fn library_hands_out_stable_ids() {
        let mut materials = Materials::new();
        let a = materials.add(StandardMaterial::new().metalness(0.7));
        let b = materials.add(StandardMaterial::new());
        assert_ne!(a, b);
        assert_eq!(materials.len(), 2);

        if let Some(m) = materials.get_mut(a) {
            m.roughness = 0.2;
        }
        assert_eq!(materials.get(a).map(|m| m.roughness), Some(0.2));
        assert_eq!(materials.get(b).map(|m| m.roughness), Some(1.0));
    }

    #[test]
    fn uniforms_pack_params() {
        let material = StandardMaterial::new()
            .metalness(0.7)
            .roughness(0.2)
            .env_map_intensity(1.0);
        let uniforms = MaterialUniforms::from_material(&material, true);
        assert_eq!(uniforms.params, [0.7, 0.2, 1.0, 1.0]);
        assert_eq!(std::mem::size_of::<MaterialUniforms>(), 32);
    }
}
