use std::collections::HashMap;

use indirect_ngin::{
    Matrix4, Scene, SceneError, SceneLimits, SquareMatrix, vec3,
    data_structures::{
        cache::RenderCache,
        material::{Material, Placeholders},
    },
    resources::{ImportedMaterial, ImportedNode, ImportedScene, TextureSource},
};

use crate::common::test_utils::{cube_mesh, small_limits, triangle_mesh};

mod common;

fn grid_scene() -> (Scene, usize) {
    let mut scene = Scene::new(SceneLimits::default());
    let parts = scene
        .load_meshes(0, &[cube_mesh(Some(0))], &[Material::default()])
        .unwrap();
    let graph = scene.graph_mut();
    for i in 0..16 {
        for j in 0..16 {
            let node = graph.new_node(0, 1, 0);
            graph.add_part(node, parts.start).unwrap();
            let offset = vec3(2.0 * i as f32 - 16.0, -2.0, 2.0 * j as f32 - 16.0);
            graph
                .set_transform(node, Matrix4::from_translation(offset))
                .unwrap();
        }
    }
    (scene, parts.start)
}

/// Every command's instance range, in cache order.
fn instance_ranges(cache: &RenderCache) -> Vec<std::ops::Range<u32>> {
    cache
        .objects()
        .iter()
        .flat_map(|o| o.commands.iter().map(|c| c.instances()))
        .collect()
}

#[test]
fn grid_of_one_part_becomes_one_instanced_command() {
    let (mut scene, _) = grid_scene();
    scene.build_cache().unwrap();
    let cache = scene.cache();

    assert_eq!(cache.objects().len(), 1);
    let object = &cache.objects()[0];
    assert_eq!(object.geometry, 0);
    assert_eq!(object.commands.len(), 1);

    let command = object.commands[0];
    assert_eq!(command.n_index, 36);
    assert_eq!(command.n_instance, 256);
    assert_eq!(command.base_index, 0);
    assert_eq!(command.base_vertex, 0);
    assert_eq!(command.base_instance, 0);

    assert_eq!(cache.transforms().len(), 256);
    for (k, transform) in cache.transforms().iter().enumerate() {
        let (i, j) = (k / 16, k % 16);
        assert_eq!(
            transform.translation(),
            [2.0 * i as f32 - 16.0, -2.0, 2.0 * j as f32 - 16.0]
        );
    }
    for (slot, assign) in cache.assigns().iter().enumerate() {
        assert_eq!(assign.transform, slot as u32);
        assert_eq!(assign.material, 0);
    }
}

#[test]
fn part_with_other_material_shares_the_command() {
    let (mut scene, cube_part) = grid_scene();
    let floor = scene
        .add_material(Material {
            shininess: 1.0,
            ..Default::default()
        })
        .unwrap();
    let cube = *scene.store().part(0, cube_part).unwrap();
    let floor_part = scene.add_part(0, cube.with_material(floor)).unwrap();
    assert_eq!(scene.store().part(0, floor_part).unwrap().key(), cube.key());

    // Retarget the grid to the floor part, keep one plain cube
    let grid: Vec<_> = scene.graph().roots().to_vec();
    let graph = scene.graph_mut();
    for &node in &grid {
        graph.resize(node, 0, 0).unwrap();
        graph.resize(node, 1, 0).unwrap();
        graph.add_part(node, floor_part).unwrap();
    }
    let cube_node = graph.new_node(0, 1, 0);
    graph.add_part(cube_node, cube_part).unwrap();
    graph
        .set_transform(cube_node, Matrix4::from_translation(vec3(5.0, 0.0, 0.0)))
        .unwrap();

    scene.build_cache().unwrap();
    let cache = scene.cache();
    assert_eq!(cache.command_count(), 1);
    assert_eq!(cache.objects()[0].commands[0].n_instance, 257);
    let floors = cache.assigns().iter().filter(|a| a.material == floor).count();
    assert_eq!(floors, 256);
    let cubes = cache.assigns().iter().filter(|a| a.material == 0).count();
    assert_eq!(cubes, 1);
}

#[test]
fn geometries_get_their_own_objects_in_slot_order() {
    let mut scene = Scene::new(SceneLimits::default());
    let materials = [Material::default()];
    let tri = scene
        .load_meshes(1, &[triangle_mesh(1, Some(0)), triangle_mesh(2, Some(0))], &materials)
        .unwrap();
    let cube = scene.load_meshes(0, &[cube_mesh(Some(0))], &materials).unwrap();

    let graph = scene.graph_mut();
    let a = graph.new_node(1, 2, 0);
    graph.add_part(a, tri.start).unwrap();
    graph.add_part(a, tri.start + 1).unwrap();
    let b = graph.new_node(0, 1, 0);
    graph.add_part(b, cube.start).unwrap();
    let c = graph.new_node(1, 1, 0);
    graph.add_part(c, tri.start).unwrap();

    scene.build_cache().unwrap();
    let cache = scene.cache();
    let geometries: Vec<_> = cache.objects().iter().map(|o| o.geometry).collect();
    assert_eq!(geometries, vec![0, 1]);
    assert_eq!(cache.objects()[0].commands.len(), 1);

    let triangles = &cache.objects()[1].commands;
    assert_eq!(triangles.len(), 2);
    assert_eq!(triangles[0].n_index, 3);
    assert_eq!(triangles[0].n_instance, 2);
    assert_eq!(triangles[1].n_index, 6);
    assert_eq!(triangles[1].n_instance, 1);
    assert_eq!(cache.instance_count(), 4);
}

#[test]
fn command_ranges_partition_the_instances() {
    let mut scene = Scene::new(SceneLimits::default());
    let materials = [Material::default()];
    let tri = scene
        .load_meshes(
            0,
            &[
                triangle_mesh(1, Some(0)),
                triangle_mesh(2, Some(0)),
                triangle_mesh(3, Some(0)),
            ],
            &materials,
        )
        .unwrap();
    let graph = scene.graph_mut();
    for n in 0..10 {
        let node = graph.new_node(0, 1, 0);
        graph.add_part(node, tri.start + n % 3).unwrap();
    }

    scene.build_cache().unwrap();
    let mut next = 0;
    for range in instance_ranges(scene.cache()) {
        assert_eq!(range.start, next);
        assert!(range.end > range.start);
        next = range.end;
    }
    assert_eq!(next as usize, scene.cache().instance_count());
    assert_eq!(next, 10);
}

#[test]
fn children_inherit_their_parents_transform() {
    let mut scene = Scene::new(SceneLimits::default());
    let tri = scene
        .load_meshes(0, &[triangle_mesh(1, Some(0))], &[Material::default()])
        .unwrap();
    let graph = scene.graph_mut();
    let parent = graph.new_node(0, 0, 1);
    graph
        .set_transform(parent, Matrix4::from_translation(vec3(1.0, 0.0, 0.0)))
        .unwrap();
    let child = graph.new_node(0, 1, 0);
    graph.add_part(child, tri.start).unwrap();
    graph
        .set_transform(child, Matrix4::from_translation(vec3(0.0, 2.0, 0.0)))
        .unwrap();
    graph.add_child(parent, child).unwrap();

    scene.build_cache().unwrap();
    let cache = scene.cache();
    // the parent has no parts and contributes no instance
    assert_eq!(cache.instance_count(), 1);
    assert_eq!(cache.transforms()[0].translation(), [1.0, 2.0, 0.0]);
}

#[test]
fn rebuilding_an_unchanged_scene_gives_the_same_cache() {
    let (mut scene, _) = grid_scene();
    scene.build_cache().unwrap();
    let objects = scene.cache().objects().to_vec();
    let transforms = scene.cache().transforms().to_vec();
    let assigns = scene.cache().assigns().to_vec();

    scene.mark_dirty();
    scene.build_cache().unwrap();
    assert_eq!(scene.cache().objects(), objects.as_slice());
    assert_eq!(scene.cache().transforms(), transforms.as_slice());
    assert_eq!(scene.cache().assigns(), assigns.as_slice());
}

#[test]
fn deleted_nodes_leave_the_cache() {
    let (mut scene, _) = grid_scene();
    let victim = scene.graph().roots()[0];
    scene.graph_mut().delete(victim).unwrap();
    scene.build_cache().unwrap();
    assert_eq!(scene.cache().instance_count(), 255);
}

#[test]
fn too_many_instances_is_an_error() {
    let mut scene = Scene::new(small_limits());
    let tri = scene
        .load_meshes(0, &[triangle_mesh(1, Some(0))], &[Material::default()])
        .unwrap();
    let graph = scene.graph_mut();
    for _ in 0..9 {
        let node = graph.new_node(0, 1, 0);
        graph.add_part(node, tri.start).unwrap();
    }
    assert_eq!(
        scene.build_cache(),
        Err(SceneError::TransformCapacity {
            requested: 9,
            limit: 8
        })
    );
    assert!(scene.cache().is_empty());
    assert!(scene.is_cache_dirty());
}

#[test]
fn referencing_a_missing_part_is_an_error() {
    let mut scene = Scene::new(SceneLimits::default());
    scene
        .load_meshes(0, &[triangle_mesh(1, Some(0))], &[Material::default()])
        .unwrap();
    let graph = scene.graph_mut();
    let node = graph.new_node(0, 1, 0);
    graph.add_part(node, 7).unwrap();
    assert_eq!(
        scene.build_cache(),
        Err(SceneError::UnknownPart {
            geometry: 0,
            part: 7
        })
    );
}

#[test]
fn material_records_use_placeholders_for_missing_textures() {
    let mut scene = Scene::new(small_limits());
    let diffuse = scene
        .insert_texture_color("floorDiffuse", [85, 170, 255, 255], false)
        .unwrap();
    let material = scene
        .add_material(Material {
            diffuse: Some(diffuse),
            shininess: 1.0,
            ..Default::default()
        })
        .unwrap();
    scene.build_cache().unwrap();

    let record = scene.material_records()[material as usize];
    assert_eq!(record.diffuse, diffuse.index() as u32);
    // placeholders sit behind the two table slots
    assert_eq!(record.specular, 3);
    assert_eq!(record.normal, 4);
    assert_eq!(record.shininess, 1.0);
}

#[test]
fn two_geometries_with_one_node_each() {
    let mut scene = Scene::new(SceneLimits::default());
    let materials = [Material::default()];
    let cube = scene.load_meshes(0, &[cube_mesh(Some(0))], &materials).unwrap();
    let tri = scene.load_meshes(1, &[triangle_mesh(1, Some(0))], &materials).unwrap();
    let graph = scene.graph_mut();
    let a = graph.new_node(0, 1, 0);
    graph.add_part(a, cube.start).unwrap();
    let b = graph.new_node(1, 1, 0);
    graph.add_part(b, tri.start).unwrap();

    scene.build_cache().unwrap();
    let objects = scene.cache().objects();
    assert_eq!(objects.len(), 2);
    for object in objects {
        assert_eq!(object.commands.len(), 1);
        assert_eq!(object.commands[0].n_instance, 1);
    }
    // the triangle's base index is relative to its own geometry
    assert_eq!(objects[1].commands[0].base_index, 0);
    assert_eq!(objects[1].commands[0].base_instance, 1);
}

#[test]
fn unreadable_maps_use_the_placeholder_of_their_role() {
    let diffuse = TextureSource::File("maps/wall_diffuse.png".into());
    let mut root = ImportedNode::new("wall");
    root.meshes.push(0);
    let imported = ImportedScene {
        meshes: vec![cube_mesh(Some(0))],
        materials: vec![ImportedMaterial {
            name: "wall".to_string(),
            diffuse: Some(diffuse.clone()),
            specular: Some(TextureSource::File("maps/wall_specular.png".into())),
            normal: Some(TextureSource::File("maps/wall_normal.png".into())),
            shininess: 8.0,
        }],
        root,
    };
    // only the diffuse map decoded
    let images = HashMap::from([(diffuse.key(), image::RgbaImage::new(1, 1))]);

    let mut scene = Scene::new(SceneLimits::default());
    scene
        .insert_imported(&imported, 0, Matrix4::identity(), images)
        .unwrap();
    assert_eq!(scene.textures().len(), 3);
    scene.build_cache().unwrap();

    let record = scene.material_records()[0];
    let placeholders = Placeholders::after(scene.textures().capacity());
    let diffuse_slot = scene.textures().find(diffuse.key()).unwrap();
    assert_eq!(record.diffuse, diffuse_slot.index() as u32);
    assert_eq!(record.specular, placeholders.black);
    assert_eq!(record.normal, placeholders.flat_normal);
}
