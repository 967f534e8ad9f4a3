use std::path::PathBuf;

use indirect_ngin::{
    Matrix4, Scene, SceneError, SceneLimits, SquareMatrix, vec3,
    data_structures::material::Placeholders,
    resources::{ImportOptions, import_scene},
};

use crate::common::test_utils::small_limits;

mod common;

fn asset(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("assets")
        .join(name)
}

#[tokio::test]
async fn obj_cube_imports_as_one_part() {
    let imported = import_scene(&asset("cube.obj"), &ImportOptions::default())
        .await
        .unwrap();
    assert_eq!(imported.meshes.len(), 1);
    let mesh = &imported.meshes[0];
    assert_eq!(mesh.indices.len(), 36);
    // four corners per face, none shared between faces
    assert_eq!(mesh.vertices.len(), 24);
    assert_eq!(mesh.material, Some(0));
    assert!(mesh.vertices.iter().all(|v| v.tangent != [0.0; 3]));

    assert_eq!(imported.materials.len(), 1);
    assert_eq!(imported.materials[0].name, "crate");
    assert_eq!(imported.materials[0].shininess, 16.0);
    assert!(imported.materials[0].diffuse.is_some());
}

#[tokio::test]
async fn missing_textures_fall_back_to_placeholders() {
    let mut scene = Scene::new(SceneLimits::default());
    let root = scene
        .load(asset("cube.obj"), 0, Matrix4::identity(), &ImportOptions::default())
        .await
        .unwrap();
    assert!(scene.graph().contains(root));
    assert_eq!(scene.store().geometry(0).unwrap().n_indices(), 36);
    assert_eq!(scene.materials().len(), 1);

    assert_eq!(scene.textures().len(), 1);
    let (_, entry) = scene.textures().iter().next().unwrap();
    assert!(entry.texture.is_missing());
    assert!(!entry.texture.is_uploaded());

    scene.build_cache().unwrap();
    assert_eq!(scene.cache().instance_count(), 1);
    let record = scene.material_records()[0];
    let placeholders = Placeholders::after(scene.textures().capacity());
    assert_eq!(record.diffuse, placeholders.white);
    assert_eq!(record.specular, placeholders.black);
    assert_eq!(record.normal, placeholders.flat_normal);
    assert_eq!(record.shininess, 16.0);
}

#[tokio::test]
async fn gltf_node_tree_becomes_instances() {
    let mut scene = Scene::new(SceneLimits::default());
    scene
        .load(asset("triangle.gltf"), 1, Matrix4::identity(), &ImportOptions::default())
        .await
        .unwrap();
    // one default material for the material-less primitive
    assert_eq!(scene.materials().len(), 1);
    assert_eq!(scene.store().geometry(1).unwrap().parts().len(), 1);

    scene.build_cache().unwrap();
    let cache = scene.cache();
    assert_eq!(cache.objects().len(), 1);
    assert_eq!(cache.objects()[0].geometry, 1);
    assert_eq!(cache.command_count(), 1);
    assert_eq!(cache.objects()[0].commands[0].n_instance, 2);
    assert_eq!(cache.transforms()[0].translation(), [1.0, 0.0, 0.0]);
    assert_eq!(cache.transforms()[1].translation(), [1.0, 2.0, 0.0]);
}

#[tokio::test]
async fn load_transform_applies_to_the_whole_tree() {
    let mut scene = Scene::new(SceneLimits::default());
    let offset = Matrix4::from_translation(vec3(0.0, 0.0, 5.0));
    scene
        .load(asset("triangle.gltf"), 0, offset, &ImportOptions::default())
        .await
        .unwrap();
    scene.build_cache().unwrap();
    assert_eq!(scene.cache().transforms()[0].translation(), [1.0, 0.0, 5.0]);
    assert_eq!(scene.cache().transforms()[1].translation(), [1.0, 2.0, 5.0]);
}

#[tokio::test]
async fn failed_loads_leave_the_scene_unchanged() {
    let mut scene = Scene::new(small_limits());
    let error = scene
        .load(asset("cube.obj"), 2, Matrix4::identity(), &ImportOptions::default())
        .await
        .unwrap_err();
    assert_eq!(
        error.downcast_ref::<SceneError>(),
        Some(&SceneError::GeometrySlot { slot: 2, limit: 2 })
    );
    assert!(scene.graph().is_empty());
    assert!(scene.materials().is_empty());
    assert!(scene.textures().is_empty());
    assert!(scene.store().geometry(0).is_none());
}

#[tokio::test]
async fn unknown_formats_are_rejected() {
    let result = import_scene(&asset("cube.mtl"), &ImportOptions::default()).await;
    assert!(result.is_err());
}
