use std::path::{Path, PathBuf};

use model_inspect::{EXPORT_FORMATS, Exporter, Importer, PostProcessSteps, import_scene};

fn fixture(name: &str) -> PathBuf {
    Path::new("tests").join("fixtures").join(name)
}

#[test]
fn should_list_text_formats() {
    let ids: Vec<_> = EXPORT_FORMATS.iter().map(|f| f.id).collect();
    assert_eq!(ids, ["obj", "objnomtl", "stl", "ply"]);
}

#[tokio::test]
async fn should_round_trip_obj_export() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("cube_out.obj");

    let mut importer = Importer::new();
    let scene = import_scene(&mut importer, fixture("cube.obj")).await.unwrap();
    Exporter::new().export(scene, "obj", &output).unwrap();

    let mtl = std::fs::read_to_string(dir.path().join("cube_out.mtl")).unwrap();
    assert!(mtl.contains("newmtl Red\nKd 1 0 0\nd 1\n"));

    let mut reimporter = Importer::new();
    let reimported = reimporter
        .read_file(&output, PostProcessSteps::VALIDATE_DATA_STRUCTURE)
        .await
        .unwrap();
    let names: Vec<_> = reimported.meshes.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, ["Cube", "Tri"]);
    assert_eq!(reimported.meshes[0].num_faces(), 12);
    assert_eq!(reimported.meshes[1].num_faces(), 1);
    assert_eq!(reimported.materials[0].name, "Red");
}

#[tokio::test]
async fn should_bake_node_transforms_into_stl() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("triangle.stl");

    let mut importer = Importer::new();
    let scene = import_scene(&mut importer, fixture("triangle.glb")).await.unwrap();
    Exporter::new().export(scene, "stl", &output).unwrap();

    let stl = std::fs::read_to_string(&output).unwrap();
    assert!(stl.starts_with("solid Triangle\n"));
    assert!(stl.contains("   vertex 1 2 3\n"));
    assert!(stl.contains("   vertex 2 2 3\n"));
    assert!(stl.contains("   vertex 1 3 3\n"));
    assert!(!dir.path().join("triangle.mtl").exists());
}
