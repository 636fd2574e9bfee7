use criterion::{criterion_group, criterion_main, Criterion, black_box};

use dropview::core::camera::Camera;
use dropview::scene::{Geometry, LocalTransform, Material, NodeContent, Scene, SceneNodeId};
use dropview::viewer::lod::{LodController, LodLevel};
use dropview::viewer::picking::{CanvasRect, Picker};

use glam::Vec3;

/// A `side` x `side` grid of cubes, each named as a detail level.
fn cube_field(side: u32) -> (Scene, Vec<SceneNodeId>) {
    let mut scene = Scene::new();
    let root = scene.graph.root();
    let geometry = scene.resources.add_geometry(Geometry::cuboid(Vec3::splat(0.4)));
    let material = scene.materials.add(Material::new("cube"));
    let mut nodes = Vec::new();
    for x in 0..side {
        for z in 0..side {
            let index = ((x + z) % 3) as usize;
            let node = scene.graph.add_child(
                root,
                format!("cube_{}_{}_LOD{}", x, z, index),
                NodeContent::Mesh { geometry, material },
            );
            let offset = side as f32 / 2.0;
            scene.graph.set_transform(
                node,
                LocalTransform::from_position(Vec3::new(x as f32 - offset, 0.0, z as f32 - offset)),
            );
            nodes.push(node);
        }
    }
    scene.graph.update_world_transforms();
    (scene, nodes)
}

fn bench_lod_update(c: &mut Criterion) {
    let (mut scene, _) = cube_field(32);
    let mut lod = LodController::new(vec![
        LodLevel::new(0.0, [0]),
        LodLevel::new(20.0, [1]),
        LodLevel::new(40.0, [2]),
    ]);
    lod.discover(&scene.graph, scene.graph.root());

    c.bench_function("lod_update_1024_objects", |b| {
        let mut frame = 0u32;
        b.iter(|| {
            frame = frame.wrapping_add(1);
            let distance = (frame % 60) as f32;
            lod.update(black_box(Vec3::new(0.0, 5.0, distance)), &mut scene.graph)
        });
    });
}

fn bench_lod_discover(c: &mut Criterion) {
    let (scene, _) = cube_field(32);

    c.bench_function("lod_discover_1024_nodes", |b| {
        b.iter(|| {
            let mut lod = LodController::new(LodLevel::default_levels());
            lod.discover(black_box(&scene.graph), scene.graph.root())
        });
    });
}

fn bench_pick(c: &mut Criterion) {
    let (mut scene, _) = cube_field(16);
    let mut picker = Picker::new(&mut scene.materials, 0xff6600);
    let mut camera = Camera::new(Vec3::new(0.0, 20.0, 20.0), 60.0, 16.0 / 9.0);
    camera.look_at(Vec3::ZERO);
    let canvas = CanvasRect::sized(1280.0, 720.0);

    c.bench_function("pick_256_cubes", |b| {
        let mut frame = 0u32;
        b.iter(|| {
            frame = frame.wrapping_add(1);
            let x = (frame.wrapping_mul(37) % 1280) as f32;
            let y = (frame.wrapping_mul(53) % 720) as f32;
            picker.pick(&mut scene, &camera, black_box(x), black_box(y), &canvas)
        });
    });
}

criterion_group!(benches, bench_lod_update, bench_lod_discover, bench_pick);
criterion_main!(benches);
