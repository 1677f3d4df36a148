use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;

fn cli() -> Command {
    Command::new(env!("CARGO_BIN_EXE_model-inspect"))
}

fn fixture(name: &str) -> PathBuf {
    Path::new("tests").join("fixtures").join(name)
}

#[test]
fn should_print_scene_of_obj() {
    cli()
        .arg("scene")
        .arg(fixture("cube.obj"))
        .assert()
        .success()
        .stdout(predicate::str::starts_with("numChildren: 2\nnumMeshes: 2\nnumMaterials: 1\n"))
        .stdout(predicate::str::contains("nodeName: cube.obj\n"))
        .stdout(predicate::str::contains("meshName: Tri\nnumVertices: 3\nnumFaces: 1\n0  0  2\n1  0  2\n0  1  2\n"));
}

#[test]
fn should_print_flipped_faces_in_reverse_order() {
    cli()
        .arg("scene")
        .arg("--flip-axis")
        .arg(fixture("cube.obj"))
        .assert()
        .success()
        .stdout(predicate::str::contains("meshName: Tri\nnumVertices: 3\nnumFaces: 1\n0  1  -2\n1  0  -2\n0  0  -2\n"));
}

#[test]
fn should_only_print_summary_without_nodes() {
    cli()
        .args(["scene", "--no-nodes"])
        .arg(fixture("triangle.glb"))
        .assert()
        .success()
        .stdout("numChildren: 0\nnumMeshes: 1\nnumMaterials: 1\n");
}

#[test]
fn should_fail_on_scenes_without_meshes() {
    cli()
        .arg("scene")
        .arg(fixture("empty.obj"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unable to import"));
}

#[test]
fn should_print_gltf_info() {
    cli()
        .arg("gltf")
        .arg(fixture("triangle.gltf"))
        .assert()
        .success()
        .stdout(predicate::str::starts_with("### glTF Info - \"triangle.gltf\" ###\n"))
        .stdout(predicate::str::contains("Image filename: Data URI\n"));
}

#[test]
fn should_print_mesh_sizes_and_positions() {
    cli()
        .args(["gltf", "--meshes", "--positions"])
        .arg(fixture("triangle.glb"))
        .assert()
        .success()
        .stdout(concat!(
            "Mesh: 0\nMeshPrimitive: 36 bytes of position data\nMeshPrimitive: 36 bytes of normal data\n\n",
            "Mesh: 0\nMeshPrimitive: 0 positions\n0  0  0  \n1  0  0  \n0  1  0  \n\n",
        ));
}

#[test]
fn should_reject_uppercase_gltf_extension() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("TRIANGLE.GLB");
    std::fs::copy(fixture("triangle.glb"), &path).unwrap();

    cli()
        .arg("gltf")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("extension must be .gltf or .glb"));
}

#[test]
fn should_export_and_list_formats() {
    cli()
        .arg("formats")
        .assert()
        .success()
        .stdout(predicate::str::contains("objnomtl"))
        .stdout(predicate::str::contains("Stanford Polygon Library"));

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("cube.ply");
    cli()
        .arg("export")
        .arg(fixture("cube.obj"))
        .arg("ply")
        .arg(&output)
        .assert()
        .success();
    let ply = std::fs::read_to_string(&output).unwrap();
    assert!(ply.contains("element vertex 11\n"));
    assert!(ply.contains("element face 13\n"));
}

#[test]
fn should_reject_unknown_export_formats() {
    let dir = tempfile::tempdir().unwrap();
    cli()
        .arg("export")
        .arg(fixture("cube.obj"))
        .arg("fbx")
        .arg(dir.path().join("cube.fbx"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Found no exporter to handle this file format: fbx"));
}
