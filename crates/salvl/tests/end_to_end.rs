//! Convert a small synthetic first-game level through the public API.

use std::collections::HashMap;
use std::path::PathBuf;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use glam::{Mat3, Vec3};
use salvl::salvl_decode::proxy::RECORD_LEN;
use salvl::salvl_decode::{build_geometry, read_mesh_file, resolve_placements};
use salvl::scene::{PartAssets, Property};
use salvl::{ConvertOptions, build_scene, convert, read_level};

/// One object at (1, 2, 3), solid and visible, rotated Z then Y then X by
/// zero, whose basic model is a single triangle centred on the origin.
fn level_bytes() -> Vec<u8> {
    let mut out = Vec::new();
    let u16s = |out: &mut Vec<u8>, values: &[u16]| {
        for v in values {
            out.extend_from_slice(&v.to_le_bytes());
        }
    };
    let u32s = |out: &mut Vec<u8>, values: &[u32]| {
        for v in values {
            out.extend_from_slice(&v.to_le_bytes());
        }
    };
    let f32s = |out: &mut Vec<u8>, values: &[f32]| {
        for v in values {
            out.extend_from_slice(&v.to_le_bytes());
        }
    };
    let pos = |out: &Vec<u8>| out.len() as u32;

    out.extend_from_slice(b"SA1LVL\0\x03");
    u32s(&mut out, &[0, 0]);

    let points = pos(&out);
    f32s(&mut out, &[-1.0, 0.0, -1.0, 1.0, 0.0, -1.0, 0.0, 0.0, 1.0]);
    let indices = pos(&out);
    u16s(&mut out, &[0, 1, 2, 0]);
    let meshset = pos(&out);
    u16s(&mut out, &[0, 1]);
    u32s(&mut out, &[indices, 0, 0, 0, 0, 0]);
    let model = pos(&out);
    u32s(&mut out, &[points, 0, 3, meshset, 0]);
    u16s(&mut out, &[1, 0]);
    u32s(&mut out, &[0; 4]);
    let object = pos(&out);
    u32s(&mut out, &[0x20, model]);
    f32s(&mut out, &[1.0, 2.0, 3.0]);
    u32s(&mut out, &[0; 8]);
    let col = pos(&out);
    u32s(&mut out, &[0; 6]);
    u32s(&mut out, &[object, 0, 0x8000_0001]);
    let landtable = pos(&out);
    u16s(&mut out, &[1, 0]);
    u32s(&mut out, &[0, 0, col, 0, 0, 0, 0]);

    out[8..12].copy_from_slice(&landtable.to_le_bytes());
    out
}

/// Route pipeline logs through the test harness so they show on failure.
fn init_logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("salvl-e2e-{tag}-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn single_triangle_level() {
    init_logging();
    let level = read_level(&level_bytes()).unwrap();
    let geometry = build_geometry(&level.landtable, 0.2).unwrap();
    assert_eq!(geometry.meshes.len(), 1);
    assert_eq!(geometry.meshes[0].triangle_count(), 1);

    let placements = resolve_placements(&geometry);
    assert_eq!(placements.collision.len(), 1);
    assert!(placements.visual.is_empty());

    let placed = &placements.collision[0];
    assert_eq!(placed.position, Vec3::new(1.0, 2.0, 3.0));
    assert_eq!(placed.rotation, Mat3::IDENTITY);
    assert_eq!(placed.size, Vec3::new(2.0, 0.2, 2.0));

    let assets = HashMap::from([(
        placed.part,
        PartAssets {
            mesh_url: "rbxasset://salvl/0.mesh".into(),
            texture: None,
            diffuse: 0x00FF_FFFF,
        },
    )]);
    let scene = build_scene(&geometry, &placements, &assets, 2.0);

    let map = scene.root.child("Map").unwrap();
    let item = &map.child("Collision").unwrap().children[0];
    assert_eq!(
        item.property("CFrame"),
        Some(&Property::CoordinateFrame {
            position: Vec3::new(2.0, 4.0, 6.0),
            rotation: Mat3::IDENTITY,
        })
    );
    // Visible as well as solid, so the collision part is drawn.
    assert_eq!(item.property("Transparency"), Some(&Property::Float(0.0)));
    assert_eq!(item.property("Color3uint8"), Some(&Property::Color3uint8(0x00FF_FFFF)));

    assert_eq!(scene.shared_strings().len(), 1);
    let text: String = scene.shared_strings()[0].value.split('\n').collect();
    let blob = STANDARD.decode(text).unwrap();
    assert_eq!(&blob[..6], b"CSGPHS");
    assert_eq!(blob.len(), 10 + RECORD_LEN);
}

#[tokio::test]
async fn local_conversion_writes_files() {
    init_logging();
    let dir = temp_dir("local");
    let level_path = dir.join("stage.sa1lvl");
    let index_path = dir.join("index.txt");
    std::fs::write(&level_path, level_bytes()).unwrap();
    std::fs::write(&index_path, "").unwrap();

    let options = ConvertOptions::from_args(
        dir.join("content").to_str().unwrap(),
        "2",
        level_path.to_str().unwrap(),
        index_path.to_str().unwrap(),
    )
    .unwrap();
    let report = convert(&options, None).await.unwrap();

    assert_eq!(report.mesh_files, 1);
    assert_eq!((report.collision, report.visual), (1, 0));

    let out = dir.join("content").join("salvl");
    let mesh = read_mesh_file(&std::fs::read(out.join("0.mesh")).unwrap()).unwrap();
    assert_eq!(mesh.vertices.len(), 3);
    assert_eq!(mesh.faces.len(), 1);

    let xml = std::fs::read_to_string(&report.scene_path).unwrap();
    assert!(xml.contains("<X>2</X>\n<Y>4</Y>\n<Z>6</Z>"));
    assert!(xml.contains("<url>rbxasset://salvl/0.mesh</url>"));
    assert!(xml.contains(r#"<SharedString name="PhysicalConfigData">"#));

    std::fs::remove_dir_all(&dir).unwrap();
}
