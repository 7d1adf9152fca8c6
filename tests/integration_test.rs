//! Integration tests for studio-export
//!
//! Tests the full pipeline: synthesize studio model bytes -> load ->
//! verify the normalized aggregate -> export and check the output.

mod generate_test_models;

use tempfile::tempdir;

use studio_export::export::mscn::{self, MscnHeader};
use studio_export::export::smd;
use studio_export::{AlignedBuffer, ClassicBuffers, Error, Loader, StudioVersion};

fn v8_buffer(break_ik_chain: bool) -> AlignedBuffer {
    AlignedBuffer::from_vec(generate_test_models::build_v8_model(break_ik_chain))
}

#[test]
fn v8_model_normalizes_end_to_end() {
    let buf = v8_buffer(false);
    let model = Loader::new(&buf).load().expect("load should succeed");

    assert_eq!(model.hdr.version, StudioVersion::V8);
    assert_eq!(model.hdr.name, "synthetic_v8");
    assert_eq!(model.bones.len(), 2);
    assert_eq!(model.bones[0].name, "root");
    assert_eq!(model.bones[1].name, "child");
    assert_eq!(model.bones[1].parent, 0);
    assert_eq!(model.bones[0].procedure_offset(), None);

    assert_eq!(model.materials.len(), 1);
    assert_eq!(model.materials[0].name(false), "mat_body");
    assert_eq!(model.skins.len(), 1);
    assert_eq!(model.skins[0].name.as_str(), "default");

    assert_eq!(model.hitbox_sets.len(), 1);
    assert_eq!(model.hitbox_sets[0].hitboxes[0].name, "torso");
    assert_eq!(model.hitbox_sets[0].hitboxes[0].force_crit_point, 1);

    let chains = model.ik_chains.as_ref().expect("ik table present");
    assert_eq!(chains.len(), 1);
    assert_eq!(chains[0].name, "ik_leg");

    // tables the fixture does not declare stay "not loaded"
    assert!(model.sequences.is_none());
    assert!(model.pose_params.is_none());
    assert!(model.ik_locks.is_none());

    assert_eq!(model.lods.len(), 1);
    let lod = model.lod(0).unwrap();
    assert_eq!(lod.vertex_count, 3);
    assert_eq!(lod.index_count, 3);
    assert_eq!(lod.meshes.len(), 1);
    assert_eq!(lod.meshes[0].material, Some(0));

    let buffer = model.mesh_buffer(0).unwrap();
    let vertices = buffer.vertices().expect("vertex stream present");
    let weights = buffer.weights().expect("weight stream present");
    assert_eq!(vertices.len(), 3);
    assert_eq!(weights.len(), 4);
    // texcoord1 stream was never written
    assert!(buffer.texcoords().is_none());

    // per-vertex weights sum to one
    for v in vertices {
        let range = v.weight_index() as usize..(v.weight_index() + v.weight_count()) as usize;
        let sum: f32 = weights[range].iter().map(|w| w.weight).sum();
        assert!((sum - 1.0).abs() < 1e-5);
    }
    // the skinned vertex splits evenly across both bones
    assert_eq!(vertices[1].weight_count(), 2);
    let w = &weights[vertices[1].weight_index() as usize..][..2];
    assert_eq!((w[0].bone, w[1].bone), (0, 1));
    assert!((w[0].weight - 0.5).abs() < 1e-5);

    // texcoord V was flipped during decode
    assert_eq!(vertices[0].uv0.y, 1.0);
    assert_eq!(vertices[2].uv0.y, 0.5);
}

#[test]
fn malformed_ik_chain_aborts_the_whole_load() {
    let buf = v8_buffer(true);
    let err = Loader::new(&buf).load().unwrap_err();
    assert!(matches!(
        err,
        Error::MalformedIkChain {
            links: 2,
            link_type: 0
        }
    ));
}

#[test]
fn unsupported_version_is_rejected() {
    let mut bytes = generate_test_models::build_v8_model(false);
    bytes[4..8].copy_from_slice(&9i32.to_le_bytes());
    let buf = AlignedBuffer::from_vec(bytes);
    assert!(matches!(
        Loader::new(&buf).load().unwrap_err(),
        Error::UnsupportedVersion { version: 9, .. }
    ));
}

#[test]
fn r2_model_loads_from_loose_files() {
    let fixture = generate_test_models::build_r2_model();
    let mdl = AlignedBuffer::from_vec(fixture.mdl);
    let buffers = ClassicBuffers {
        vtx: AlignedBuffer::from_vec(fixture.vtx),
        vvd: AlignedBuffer::from_vec(fixture.vvd),
        vvw: None,
    };
    let model = Loader::new(&mdl)
        .with_classic(&buffers)
        .load()
        .expect("classic load should succeed");

    assert_eq!(model.hdr.version, StudioVersion::R2);
    assert_eq!(model.bones.len(), 1);
    assert_eq!(model.materials[0].name(false), "models/props/crate");
    assert_eq!(model.body_parts.len(), 1);
    assert_eq!(model.body_parts[0].name(), "body");

    let lod = model.lod(0).unwrap();
    assert_eq!(lod.vertex_count, 3);
    assert_eq!(lod.models.len(), 1);
    assert_eq!(lod.models[0].name, "crate_model");
    assert!(!lod.models[0].is_disabled());

    let buffer = model.mesh_buffer(0).unwrap();
    let vertices = buffer.vertices().unwrap();
    assert_eq!(vertices.len(), 3);
    assert_eq!(vertices[1].position.x, 8.0);
    // VVD uv (0.0, 0.25) flips to (0.0, 0.75)
    assert_eq!(vertices[0].uv0.y, 0.75);
    let weights = buffer.weights().unwrap();
    assert_eq!(weights.len(), 3);
    assert!(weights.iter().all(|w| w.bone == 0 && w.weight == 1.0));
}

#[test]
fn classic_load_without_vertex_files_fails() {
    let fixture = generate_test_models::build_r2_model();
    let mdl = AlignedBuffer::from_vec(fixture.mdl);
    assert!(matches!(
        Loader::new(&mdl).load().unwrap_err(),
        Error::MissingVertexData
    ));
}

#[test]
fn classic_checksum_mismatch_fails() {
    let fixture = generate_test_models::build_r2_model();
    let mdl = AlignedBuffer::from_vec(fixture.mdl);
    let mut bad_vvd = fixture.vvd;
    bad_vvd[8..12].copy_from_slice(&0x0BADi32.to_le_bytes());
    let buffers = ClassicBuffers {
        vtx: AlignedBuffer::from_vec(fixture.vtx),
        vvd: AlignedBuffer::from_vec(bad_vvd),
        vvw: None,
    };
    assert!(matches!(
        Loader::new(&mdl).with_classic(&buffers).load().unwrap_err(),
        Error::ChecksumMismatch { .. }
    ));
}

#[test]
fn smd_export_writes_the_expected_sections() {
    let buf = v8_buffer(false);
    let model = Loader::new(&buf).load().unwrap();

    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("synthetic_v8.smd");
    smd::export_smd(&model, 0, &path, false).expect("export should succeed");

    let text = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "version 1");
    assert_eq!(lines[1], "nodes");
    assert_eq!(lines[2], "0 \"root\" -1");
    assert_eq!(lines[3], "1 \"child\" 0");
    assert_eq!(lines[4], "end");
    assert_eq!(lines[5], "skeleton");
    assert_eq!(lines[6], "time 0");
    // two bone pose lines then end
    assert_eq!(lines[9], "end");
    assert_eq!(lines[10], "triangles");
    assert_eq!(lines[11], "mat_body");
    // three vertex lines then the closing end
    assert_eq!(lines.len(), 16);
    assert_eq!(*lines.last().unwrap(), "end");
    // skinned vertex carries its weight pairs
    assert!(lines[13].ends_with("2 0 0.5 1 0.5"), "line: {}", lines[13]);
}

#[test]
fn mscn_export_round_trips_its_header() {
    let buf = v8_buffer(false);
    let model = Loader::new(&buf).load().unwrap();

    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("synthetic_v8.mscn");
    mscn::export_mscn(&model, 0, &path).expect("export should succeed");

    let data = std::fs::read(&path).unwrap();
    let hdr = MscnHeader::from_bytes(&data).expect("valid header");
    assert_eq!(hdr.bone_count, 2);
    assert_eq!(hdr.material_count, 1);
    assert_eq!(hdr.vertex_count, 3);
    assert_eq!(hdr.index_count, 3);
    assert_eq!(hdr.weight_count, 4);
    // the texcoord1 stream was absent, so its offset is zero
    assert_eq!(hdr.texcoord_offset, 0);
    // names resolve through the name table
    let name_at = (hdr.name_table_offset) as usize;
    assert_eq!(&data[name_at..name_at + 5], b"root\0");
    // weights are the last stream present, 8 bytes each
    assert_eq!(data.len() as u32, hdr.weight_offset + hdr.weight_count * 8);
}

#[test]
fn export_lod_out_of_range_fails_cleanly() {
    let buf = v8_buffer(false);
    let model = Loader::new(&buf).load().unwrap();
    let dir = tempdir().unwrap();
    let path = dir.path().join("out.smd");
    assert!(smd::export_smd(&model, 5, &path, false).is_err());
    assert!(!path.exists());
}

#[test]
fn v16_split_bone_model_round_trips_its_bone_table() {
    let buf = AlignedBuffer::from_vec(generate_test_models::build_v16_model());
    let model = Loader::new(&buf).load().expect("load should succeed");

    assert_eq!(model.hdr.version, StudioVersion::V16);
    assert_eq!(model.hdr.name, "synthetic_v16");
    assert_eq!(model.bones.len(), 2);
    assert_eq!(model.bones[0].name, "root");
    assert_eq!(model.bones[0].parent, -1);
    assert_eq!(model.bones[1].name, "child");
    assert_eq!(model.bones[1].parent, 0);
    assert_eq!(model.bones[1].physics_bone, 1);
    assert_eq!(model.bones[1].pos.z, 4.0);
    // no baked geometry block in this fixture
    assert!(model.lods.is_empty());
}

#[test]
fn v19_bones_come_from_the_linear_table() {
    let buf = AlignedBuffer::from_vec(generate_test_models::build_v19_model());
    let model = Loader::new(&buf).load().expect("load should succeed");

    assert_eq!(model.hdr.version, StudioVersion::V19);
    assert_eq!(model.hdr.name, "synthetic_v19");
    assert_eq!(model.bones.len(), 2);
    assert_eq!(model.bones[1].name, "child");
    assert_eq!(model.bones[1].parent, 0);
    assert_eq!(model.bones[1].pos.z, 12.0);
    assert_eq!(model.bones[1].scale, glam::Vec3::ONE);
}

#[test]
fn multi_mesh_lod_keeps_per_mesh_weight_ranges_and_owners() {
    let buf = AlignedBuffer::from_vec(generate_test_models::build_v8_two_mesh_model([3, 2]));
    let model = Loader::new(&buf).load().expect("load should succeed");

    let lod = model.lod(0).unwrap();
    assert_eq!(lod.meshes.len(), 2);
    assert_eq!(lod.vertex_count, 5);

    // each mesh is attributed to the body part that declares it
    assert_eq!(lod.meshes[0].body_part_index, 0);
    assert_eq!(lod.meshes[1].body_part_index, 1);

    // each mesh declares its slice of the shared per-LOD weight stream
    assert_eq!(lod.meshes[0].weights_index, 0);
    assert_eq!(lod.meshes[0].weights_count, 3);
    assert_eq!(lod.meshes[1].weights_index, 3);
    assert_eq!(lod.meshes[1].weights_count, 2);

    let buffer = model.mesh_buffer(0).unwrap();
    let vertices = buffer.vertices().unwrap();
    let mut cursor = 0usize;
    for mesh in &lod.meshes {
        for v in &vertices[cursor..cursor + mesh.vertex_count as usize] {
            assert!(v.weight_index() >= mesh.weights_index);
            assert!(v.weight_index() + v.weight_count() <= mesh.weights_index + mesh.weights_count);
        }
        cursor += mesh.vertex_count as usize;
    }
}

#[test]
fn merged_lod_vertex_overflow_fails_the_load() {
    // mesh A fills the 16-bit index space; mesh B's first index would
    // rebase to vertex 65_536
    let buf =
        AlignedBuffer::from_vec(generate_test_models::build_v8_two_mesh_model([65_536, 1]));
    let err = Loader::new(&buf).load().unwrap_err();
    assert!(matches!(err, Error::IndexRange { index: 65_536 }));
}
