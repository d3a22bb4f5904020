//! # lustre
//!
//! **Reflective materials, one closure at a time.**
//!
//! A small rendering layer for physically based demo scenes: a wgpu context,
//! a perspective camera, primitive geometry, a metalness/roughness material
//! with environment cubemap reflections, ambient and point lights, an
//! ECS-backed scene and an egui control panel.
//!
//! ## Quick Start
//!
//! ```no_run
//! use lustre::*;
//!
//! fn main() -> lustre::Result<()> {
//!     run(|ctx| {
//!         ctx.ambient_light(Color::WHITE, 0.5);
//!         ctx.point_light(PointLight::new(Color::WHITE, 1.0).at(5.0, 5.0, 5.0));
//!
//!         let material = ctx.add_material(StandardMaterial::new().metalness(0.7).roughness(0.2));
//!         let sphere = ctx.mesh_sphere(0.5, 32, 32);
//!         ctx.spawn((Transform::new(), RenderMesh::new(sphere, material), Spin::new(0.2)));
//!
//!         let binding = ctx.material_binding(material, MaterialParam::Roughness);
//!         ctx.gui()
//!             .add_folder("Material")
//!             .add(binding, 0.0, 1.0)
//!             .step(0.01)
//!             .name("Roughness");
//!
//!         move |frame| frame.animate()
//!     })
//! }
//! ```
//!
//! ## Shared materials
//!
//! Materials live in one library and objects reference them by
//! [`MaterialId`]. Objects that share an id share the material: a slider
//! bound to it changes all of them at once.

mod app;
mod camera;
mod clock;
mod ecs;
mod error;
mod geometry;
mod gpu;
mod light;
mod material;
mod mesh;
mod mesh_pass;
mod overlay;
mod scene;
mod texture;
mod ui;

pub use app::{AppConfig, Frame, SetupContext, run, run_with_config};
pub use camera::PerspectiveCamera;
pub use clock::Clock;
pub use ecs::{MeshId, RenderMesh, Spin};
pub use error::{Error, Result};
pub use geometry::RawGeometry;
pub use gpu::{GpuContext, Viewport};
pub use light::{AmbientLight, Lights, PointLight};
pub use material::{Color, MaterialId, MaterialParam, Materials, StandardMaterial};
pub use mesh::{Mesh, Transform, Vertex3d};
pub use mesh_pass::MeshPass;
pub use scene::Scene;
pub use texture::{
    CUBE_FACES, CubeImages, CubeTexture, CubeTextureLoader, EnvMapId, EnvironmentMaps,
    PendingCubeTexture, cube_face_paths,
};
pub use ui::{ControlPanel, Folder, MaterialBinding, Slider, SliderBinding};

// Re-export glam math types for convenience
pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};

// ECS support
pub use hecs::{Entity, World};
