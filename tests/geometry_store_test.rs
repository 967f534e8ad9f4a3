use indirect_ngin::{
    Scene, SceneError, SceneLimits,
    data_structures::{
        geometry::{GeometryStore, Part},
        material::Material,
    },
};

use crate::common::test_utils::{cube_mesh, small_limits, triangle_mesh};

mod common;

#[test]
fn loads_append_behind_existing_data() {
    let mut store = GeometryStore::new(SceneLimits::default());
    let first = store.load(0, &[cube_mesh(Some(0))], 0).unwrap();
    let second = store
        .load(0, &[triangle_mesh(1, Some(0)), cube_mesh(Some(1))], 4)
        .unwrap();
    assert_eq!(first, 0..1);
    assert_eq!(second, 1..3);

    let geometry = store.geometry(0).unwrap();
    assert_eq!(geometry.n_vertices(), 24 + 3 + 24);
    assert_eq!(geometry.n_indices(), 36 + 3 + 36);
    assert!(geometry.is_dirty());
    assert!(geometry.buffers().is_none());

    let parts = geometry.parts();
    assert_eq!(
        parts[1],
        Part {
            n_index: 3,
            base_index: 36,
            base_vertex: 24,
            material: 4,
        }
    );
    assert_eq!(parts[2].base_index, 39);
    assert_eq!(parts[2].base_vertex, 27);
    assert_eq!(parts[2].material, 5);
}

#[test]
fn slots_outside_the_limit_are_rejected() {
    let mut store = GeometryStore::new(small_limits());
    assert_eq!(
        store.load(2, &[cube_mesh(None)], 0),
        Err(SceneError::GeometrySlot { slot: 2, limit: 2 })
    );
    assert!(store.geometry(2).is_none());
    assert_eq!(store.iter().count(), 0);
}

#[test]
fn part_overflow_leaves_the_geometry_unchanged() {
    let mut store = GeometryStore::new(small_limits());
    store
        .load(0, &[triangle_mesh(1, None), triangle_mesh(1, None), triangle_mesh(1, None)], 0)
        .unwrap();
    let meshes = [triangle_mesh(1, None), triangle_mesh(1, None)];
    assert_eq!(
        store.load(0, &meshes, 0),
        Err(SceneError::PartCapacity {
            slot: 0,
            requested: 5,
            limit: 4
        })
    );
    let geometry = store.geometry(0).unwrap();
    assert_eq!(geometry.parts().len(), 3);
    assert_eq!(geometry.n_indices(), 9);
}

#[test]
fn hand_made_parts_must_stay_inside_the_index_data() {
    let mut store = GeometryStore::new(small_limits());
    assert_eq!(
        store.add_part(1, Part {
            n_index: 3,
            base_index: 0,
            base_vertex: 0,
            material: 0
        }),
        Err(SceneError::UnknownGeometry(1))
    );

    store.load(0, &[cube_mesh(None)], 0).unwrap();
    let face = Part {
        n_index: 6,
        base_index: 30,
        base_vertex: 0,
        material: 1,
    };
    assert_eq!(store.add_part(0, face), Ok(1));
    assert_eq!(store.part(0, 1), Ok(&face));
    assert_eq!(
        store.add_part(0, Part { base_index: 33, ..face }),
        Err(SceneError::PartRange {
            slot: 0,
            start: 33,
            end: 39,
            n_indices: 36
        })
    );
}

#[test]
fn unknown_parts_are_reported() {
    let mut store = GeometryStore::new(SceneLimits::default());
    store.load(0, &[cube_mesh(None)], 0).unwrap();
    assert_eq!(store.part(3, 0), Err(SceneError::UnknownGeometry(3)));
    assert_eq!(
        store.part(0, 1),
        Err(SceneError::UnknownPart {
            geometry: 0,
            part: 1
        })
    );
}

#[test]
fn scene_load_is_all_or_nothing() {
    let mut scene = Scene::new(small_limits());
    let materials = [Material::default(), Material::default()];
    let parts = scene
        .load_meshes(0, &[cube_mesh(Some(0)), cube_mesh(Some(1))], &materials)
        .unwrap();
    assert_eq!(parts, 0..2);
    assert_eq!(scene.materials().len(), 2);
    assert!(scene.is_cache_dirty());

    // no room for a third material
    assert_eq!(
        scene.load_meshes(1, &[cube_mesh(Some(0))], &[Material::default()]),
        Err(SceneError::MaterialCapacity {
            requested: 3,
            limit: 2
        })
    );
    assert!(scene.store().geometry(1).is_none());
    assert_eq!(scene.materials().len(), 2);
}

#[test]
fn scene_parts_point_at_their_own_materials() {
    let mut scene = Scene::new(SceneLimits::default());
    scene
        .load_meshes(0, &[cube_mesh(Some(0))], &[Material::default()])
        .unwrap();
    let shiny = Material {
        shininess: 128.0,
        ..Default::default()
    };
    let parts = scene
        .load_meshes(0, &[triangle_mesh(1, Some(1)), triangle_mesh(1, None)], &[
            Material::default(),
            shiny,
        ])
        .unwrap();
    // material indices are offset by the materials loaded before
    assert_eq!(scene.store().part(0, parts.start).unwrap().material, 2);
    assert_eq!(scene.store().part(0, parts.start + 1).unwrap().material, 1);
    assert_eq!(scene.materials().get(2), Some(&shiny));
}
