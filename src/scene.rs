//! The scene: objects, lights and background composed for one frame.
//!
//! Objects live in a `hecs` world. The materials they reference live in a
//! [`Materials`] library shared with whoever edits them (the control panel),
//! so the scene resolves material ids at draw time and always renders the
//! current values.

use std::cell::RefCell;
use std::rc::Rc;

use glam::Mat4;
use hecs::{DynamicBundle, Entity, World};

use crate::ecs::{MeshId, RenderMesh, Spin};
use crate::light::{AmbientLight, Lights, PointLight};
use crate::material::{Color, MaterialId, Materials, StandardMaterial};
use crate::mesh::Transform;

/// One mesh to draw this frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct DrawItem {
    pub model: Mat4,
    pub mesh: MeshId,
    pub material: MaterialId,
}

/// Scene objects, lights and the clear color.
pub struct Scene {
    /// The ECS world holding every scene object.
    pub world: World,
    pub lights: Lights,
    /// Clear color behind all objects.
    pub background: Color,
    materials: Rc<RefCell<Materials>>,
}

impl Scene {
    pub fn new(materials: Rc<RefCell<Materials>>) -> Self {
        Self {
            world: World::new(),
            lights: Lights::default(),
            background: Color::BLACK,
            materials,
        }
    }

    /// Spawn an object. Anything with a [`Transform`] and a [`RenderMesh`]
    /// is drawn; add a [`Spin`] to animate it.
    pub fn spawn(&mut self, components: impl DynamicBundle) -> Entity {
        self.world.spawn(components)
    }

    pub fn set_ambient_light(&mut self, light: AmbientLight) {
        self.lights.ambient = light;
    }

    pub fn set_point_light(&mut self, light: PointLight) {
        self.lights.point = Some(light);
    }

    /// The shared material library.
    pub fn materials(&self) -> &Rc<RefCell<Materials>> {
        &self.materials
    }

    /// Set every spinning object's y-rotation for elapsed time `t`.
    pub fn animate(&mut self, t: f32) {
        for (_, (transform, spin)) in self.world.query_mut::<(&mut Transform, &Spin)>() {
            transform.rotation.y = spin.angle_at(t);
        }
    }

    /// A copy of the material `entity` is drawn with, as it is right now.
    pub fn material_of(&self, entity: Entity) -> Option<StandardMaterial> {
        let id = self.world.get::<&RenderMesh>(entity).ok()?.material;
        self.materials.borrow().get(id).cloned()
    }

    /// Number of drawable objects.
    pub fn object_count(&self) -> usize {
        self.world
            .query::<(&Transform, &RenderMesh)>()
            .iter()
            .count()
    }

    pub(crate) fn draw_list(&self) -> Vec<DrawItem> {
        self.world
            .query::<(&Transform, &RenderMesh)>()
            .iter()
            .map(|(_, (transform, render))| DrawItem {
                model: transform.matrix(),
                mesh: render.mesh,
                material: render.material,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::MaterialParam;
    use glam::Vec3;

    fn scene_with_three_shapes() -> (Scene, MaterialId, [Entity; 3]) {
        let materials = Rc::new(RefCell::new(Materials::new()));
        let material = materials
            .borrow_mut()
            .add(StandardMaterial::new().metalness(0.7).roughness(0.2));
        let mut scene = Scene::new(materials);

        let sphere = scene.spawn((
            Transform::from_position(Vec3::new(-1.5, 0.0, 0.0)),
            RenderMesh::new(MeshId(0), material),
            Spin::new(0.2),
        ));
        let torus = scene.spawn((
            Transform::from_position(Vec3::new(1.5, 0.0, 0.0))
                .rotation_z(std::f32::consts::FRAC_PI_4),
            RenderMesh::new(MeshId(1), material),
            Spin::new(0.2),
        ));
        let plane = scene.spawn((
            Transform::new()
                .rotation_x(std::f32::consts::FRAC_PI_2)
                .rotation_z(std::f32::consts::FRAC_PI_6),
            RenderMesh::new(MeshId(2), material),
            Spin::new(0.2),
        ));
        (scene, material, [sphere, torus, plane])
    }

    #[test]
    fn animate_sets_identical_y_rotation() {
        let (mut scene, _, entities) = scene_with_three_shapes();
        for t in [0.0, 1.0, 7.25, 1000.0] {
            scene.animate(t);
            for entity in entities {
                let transform = scene.world.get::<&Transform>(entity).unwrap();
                assert_eq!(transform.rotation.y, 0.2 * t);
            }
        }
    }

    #[test]
    fn animate_leaves_other_axes_alone() {
        let (mut scene, _, [_, torus, plane]) = scene_with_three_shapes();
        scene.animate(3.0);
        let torus = *scene.world.get::<&Transform>(torus).unwrap();
        assert_eq!(torus.rotation.z, std::f32::consts::FRAC_PI_4);
        assert_eq!(torus.position, Vec3::new(1.5, 0.0, 0.0));
        let plane = *scene.world.get::<&Transform>(plane).unwrap();
        assert_eq!(plane.rotation.x, std::f32::consts::FRAC_PI_2);
    }

    #[test]
    fn objects_share_one_material() {
        let (scene, material, entities) = scene_with_three_shapes();

        scene
            .materials()
            .borrow_mut()
            .get_mut(material)
            .unwrap()
            .set(MaterialParam::Metalness, 0.35);

        for entity in entities {
            let resolved = scene.material_of(entity).unwrap();
            assert_eq!(resolved.metalness, 0.35);
            assert_eq!(resolved.roughness, 0.2);
        }
        assert!(scene.draw_list().iter().all(|item| item.material == material));
    }

    #[test]
    fn only_renderable_entities_are_drawn() {
        let (mut scene, _, _) = scene_with_three_shapes();
        scene.spawn((Transform::new(), Spin::new(1.0)));
        assert_eq!(scene.object_count(), 3);
        assert_eq!(scene.draw_list().len(), 3);
    }

    #[test]
    fn default_scene_is_black_and_unlit() {
        let scene = Scene::new(Rc::new(RefCell::new(Materials::new())));
        assert_eq!(scene.background, Color::BLACK);
        assert_eq!(scene.lights.ambient.intensity, 0.0);
        assert!(scene.lights.point.is_none());
    }
}
