use std::f32::consts::PI;

use lustre::{
    AppConfig, Color, MaterialParam, PerspectiveCamera, PointLight, RenderMesh, Spin,
    StandardMaterial, Transform, Vec3, cube_face_paths,
};

/// Radians per second every shape turns about its y axis.
const SPIN_RATE: f32 = 0.2;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = lustre::run_with_config(AppConfig::default(), |ctx| {
        // Camera
        let aspect = ctx.aspect();
        ctx.set_camera(
            PerspectiveCamera::new(50.0, aspect, 0.01, 100.0)
                .at(3.0, 2.0, 5.0)
                .looking_at(0.0, 0.0, 0.0),
        );

        // Lights
        ctx.ambient_light(Color::hex(0xffffff), 0.5);
        ctx.point_light(PointLight::new(Color::hex(0xffffff), 1.0).at(5.0, 5.0, 5.0));

        // Shared reflective material
        let environment = ctx.load_cube_texture(cube_face_paths(ctx.environment_dir(), "jpg"));
        let material = ctx.add_material(
            StandardMaterial::new()
                .color(Color::hex(0xffffff))
                .metalness(0.7)
                .roughness(0.2)
                .env_map(environment)
                .env_map_intensity(1.0),
        );

        // Shapes
        let sphere = ctx.mesh_sphere(0.5, 32, 32);
        let torus = ctx.mesh_torus(0.5, 0.2, 32, 64);
        let plane = ctx.mesh_plane(1.0, 1.0);

        ctx.spawn((
            Transform::from_position(Vec3::new(-1.5, 0.0, 0.0)),
            RenderMesh::new(sphere, material),
            Spin::new(SPIN_RATE),
        ));
        ctx.spawn((
            Transform::from_position(Vec3::new(1.5, 0.0, 0.0)).rotation_z(PI / 4.0),
            RenderMesh::new(torus, material),
            Spin::new(SPIN_RATE),
        ));
        ctx.spawn((
            Transform::new().rotation_x(PI / 2.0).rotation_z(PI / 6.0),
            RenderMesh::new(plane, material),
            Spin::new(SPIN_RATE),
        ));

        // Control panel
        let metalness = ctx.material_binding(material, MaterialParam::Metalness);
        let roughness = ctx.material_binding(material, MaterialParam::Roughness);
        let folder = ctx.gui().add_folder("Material Controls");
        folder.add(metalness, 0.0, 1.0).step(0.01).name("Metalness");
        folder.add(roughness, 0.0, 1.0).step(0.01).name("Roughness");
        folder.open();

        move |frame| {
            frame.animate();
        }
    }) {
        log::error!("{err}");
        std::process::exit(1);
    }
}
