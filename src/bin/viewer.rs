//! Demo viewer: a checkerboard ground plane with a few shaded primitives
//! under a directional light, rendered with shadow mapping.

use glam::Vec3;
use shadow_engine::resources::{Material, Mesh, SamplerDesc, TextureData};
use shadow_engine::scene::{Camera, DirectionalLight, Model, Node, Projection, Scene, Transform};
use shadow_engine::{Engine, EngineError, RendererConfig};
use std::sync::Arc;

fn build_scene() -> Scene {
    let checkerboard = Arc::new(TextureData::checkerboard(
        512,
        [200, 200, 200, 255],
        [90, 90, 90, 255],
    ));
    let white = Arc::new(TextureData::white());

    let ground_material = Arc::new(Material::new("ground", checkerboard));
    let red = Arc::new(
        Material::new("red", white.clone())
            .with_base_factor([0.9, 0.2, 0.2, 1.0])
            .with_sampler(SamplerDesc::nearest()),
    );
    let blue = Arc::new(
        Material::new("blue", white.clone()).with_base_factor([0.2, 0.3, 0.9, 1.0]),
    );
    let yellow = Arc::new(Material::new("yellow", white).with_base_factor([0.9, 0.8, 0.2, 1.0]));

    let ground = Arc::new(Mesh::plane(40.0, 40.0, 8));
    let cube = Arc::new(Mesh::cube());
    let sphere = Arc::new(Mesh::sphere(32, 16));

    let mut camera_node = Node::new("Camera")
        .with_camera(Camera::new(Projection::perspective(60.0, 16.0 / 9.0, 0.1, 500.0)))
        .with_transform(Transform::from_translation(Vec3::new(10.0, 8.0, 12.0)));
    camera_node.transform.look_at(Vec3::ZERO, Vec3::Y);

    // the shadow camera looks along the light direction over a fixed volume
    let mut shadow_camera_node = Node::new("ShadowCamera")
        .with_camera(Camera::new(Projection::orthographic(60.0, 60.0, -100.0, 100.0)))
        .with_transform(Transform::from_translation(Vec3::new(8.0, 30.0, 20.0)));
    shadow_camera_node.transform.look_at(Vec3::ZERO, Vec3::Y);

    let light_node = Node::new("Light").with_light(DirectionalLight::new(
        Vec3::new(255.0, 250.0, 235.0),
        Vec3::new(0.4, 1.0, 0.6),
    ));

    let root = Node::new("root")
        .with_child(
            Node::new("Ground").with_model(Model::single(ground, ground_material)),
        )
        .with_child(
            Node::new("Spinner")
                .with_transform(Transform::from_translation(Vec3::new(0.0, 1.5, 0.0)))
                .with_model(Model::single(cube.clone(), red)),
        )
        .with_child(
            Node::new("Tower")
                .with_transform(Transform::from_translation_scale(
                    Vec3::new(-5.0, 2.0, -3.0),
                    Vec3::new(1.0, 4.0, 1.0),
                ))
                .with_model(Model::single(cube, blue)),
        )
        .with_child(
            Node::new("Orbiter").with_child(
                Node::new("Ball")
                    .with_transform(Transform::from_translation(Vec3::new(6.0, 1.0, 0.0)))
                    .with_model(Model::single(sphere, yellow)),
            ),
        )
        .with_child(camera_node)
        .with_child(shadow_camera_node)
        .with_child(light_node);

    Scene::new(root)
}

fn main() -> Result<(), EngineError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let scene = build_scene();
    let engine = Engine::new(RendererConfig {
        title: "Shadow Engine Viewer".to_string(),
        ..Default::default()
    });

    engine.run(scene, |scene, dt| {
        if let Some(spinner) = scene.find_mut("Spinner") {
            spinner.transform.rotate_axis(Vec3::Y, dt * 0.8);
        }
        if let Some(orbiter) = scene.find_mut("Orbiter") {
            orbiter.transform.rotate_axis(Vec3::Y, dt * 0.4);
        }
    })
}
