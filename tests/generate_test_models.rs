//! Synthetic studio model builders for integration tests.
//!
//! Assembles byte-exact fixtures in memory: a small rtech v8 model with a
//! baked VG block, and a classic r2 model with its loose VTX/VVD files.

#![allow(dead_code)]

use bytemuck::{bytes_of, Zeroable};
use std::mem::size_of;

use studio_export::studio::classic::{
    BodyPartClassic, BoneClassic, MaterialClassic, MeshClassic, ModelClassic, OptVertex,
    StudioHdrClassic, VtxBodyPart, VtxHeader, VtxLod, VtxMesh, VtxModel, VtxStripGroup,
    VvdBoneWeight, VvdHeader, VvdVertex, VTX_VERSION, VVD_MAGIC,
};
use studio_export::studio::rtech::{
    BodyPartV8, BoneDataV16, BoneDataV19, BoneHdrV16, BoneV8, HitboxSetV8, HitboxV8, IkChainV8,
    IkLinkV8, LinearBoneV19, MaterialV8, ModelV8, StudioHdrV16, StudioHdrV8, VgHeader, VgLod,
    VgMesh, STUDIO_MAGIC, VG_MAGIC, VG_NORMAL_PACKED, VG_POSITION, VG_UV0, VG_WEIGHTS,
};
use studio_export::studio::Mat34;

pub const TEST_CHECKSUM: i32 = 0x7357;

fn align_to(buf: &mut Vec<u8>, alignment: usize) {
    while buf.len() % alignment != 0 {
        buf.push(0);
    }
}

fn put_name(buf: &mut Vec<u8>, name: &str) -> usize {
    let at = buf.len();
    buf.extend_from_slice(name.as_bytes());
    buf.push(0);
    at
}

fn inline_name(name: &str) -> [u8; 64] {
    let mut out = [0u8; 64];
    out[..name.len()].copy_from_slice(name.as_bytes());
    out
}

fn bone_v8(name_offset: i32, parent: i32, pos: [f32; 3]) -> BoneV8 {
    BoneV8 {
        name_offset,
        parent,
        pos,
        quat: [0.0, 0.0, 0.0, 1.0],
        rot: [0.0; 3],
        scale: [1.0; 3],
        pose_to_bone: Mat34::IDENTITY,
        flags: 0,
        proc_type: 0,
        proc_index: 0,
        physics_bone: 0,
        surface_prop_idx: 0,
        contents: 0,
        unused: [0; 8],
    }
}

/// A two-bone rtech v8 model with one material, one body part holding one
/// model with one mesh, one hitbox set, one well-formed IK chain, and a VG
/// block carrying a single triangle. When `break_ik_chain` is set, the IK
/// chain declares two links instead of three.
pub fn build_v8_model(break_ik_chain: bool) -> Vec<u8> {
    let mut buf = vec![0u8; size_of::<StudioHdrV8>()];

    // bones
    align_to(&mut buf, 4);
    let bone_offset = buf.len();
    buf.resize(bone_offset + 2 * size_of::<BoneV8>(), 0);
    let names_at = buf.len();
    let root_name = put_name(&mut buf, "root");
    let child_name = put_name(&mut buf, "child");
    let bone0 = bone_v8((root_name - bone_offset) as i32, -1, [0.0, 0.0, 0.0]);
    let rec1 = bone_offset + size_of::<BoneV8>();
    let bone1 = bone_v8((child_name - rec1) as i32, 0, [0.0, 0.0, 8.0]);
    buf[bone_offset..rec1].copy_from_slice(bytes_of(&bone0));
    buf[rec1..names_at].copy_from_slice(bytes_of(&bone1));

    // material
    align_to(&mut buf, 8);
    let texture_offset = buf.len();
    buf.resize(texture_offset + size_of::<MaterialV8>(), 0);
    let mat_name = put_name(&mut buf, "mat_body");
    let mat = MaterialV8 {
        guid: 0xABCD_EF01,
        name_offset: (mat_name - texture_offset) as i32,
        _pad: 0,
    };
    let mat_end = texture_offset + size_of::<MaterialV8>();
    buf[texture_offset..mat_end].copy_from_slice(bytes_of(&mat));

    // skin table: one family over one material slot
    align_to(&mut buf, 2);
    let skin_offset = buf.len();
    buf.extend_from_slice(&0i16.to_le_bytes());

    // body part with one model
    align_to(&mut buf, 4);
    let body_part_offset = buf.len();
    buf.resize(body_part_offset + size_of::<BodyPartV8>(), 0);
    let model_offset = buf.len();
    buf.resize(model_offset + size_of::<ModelV8>(), 0);
    let bp_name = put_name(&mut buf, "body");
    let model_name = put_name(&mut buf, "body_model");
    let bp = BodyPartV8 {
        name_offset: (bp_name - body_part_offset) as i32,
        model_count: 1,
        base: 1,
        model_offset: (model_offset - body_part_offset) as i32,
    };
    let model = ModelV8 {
        name_offset: (model_name - model_offset) as i32,
        type_: 0,
        bounding_radius: 16.0,
        mesh_count: 1,
        mesh_offset: 0,
        vertex_count: 3,
        vertex_offset: 0,
        unused: [0; 8],
    };
    buf[body_part_offset..body_part_offset + size_of::<BodyPartV8>()]
        .copy_from_slice(bytes_of(&bp));
    buf[model_offset..model_offset + size_of::<ModelV8>()].copy_from_slice(bytes_of(&model));

    // hitbox set with one hitbox
    align_to(&mut buf, 4);
    let hitbox_set_offset = buf.len();
    buf.resize(hitbox_set_offset + size_of::<HitboxSetV8>(), 0);
    let hitbox_at = buf.len();
    buf.resize(hitbox_at + size_of::<HitboxV8>(), 0);
    let set_name = put_name(&mut buf, "default");
    let hb_name = put_name(&mut buf, "torso");
    let set = HitboxSetV8 {
        name_offset: (set_name - hitbox_set_offset) as i32,
        hitbox_count: 1,
        hitbox_offset: (hitbox_at - hitbox_set_offset) as i32,
    };
    let mut hb = HitboxV8::zeroed();
    hb.bone = 1;
    hb.group = 0;
    hb.bbmin = [-4.0, -4.0, -4.0];
    hb.bbmax = [4.0, 4.0, 4.0];
    hb.name_offset = (hb_name - hitbox_at) as i32;
    hb.force_crit_point = 1;
    buf[hitbox_set_offset..hitbox_set_offset + size_of::<HitboxSetV8>()]
        .copy_from_slice(bytes_of(&set));
    buf[hitbox_at..hitbox_at + size_of::<HitboxV8>()].copy_from_slice(bytes_of(&hb));

    // ik chain with its three links
    align_to(&mut buf, 4);
    let ik_chain_offset = buf.len();
    buf.resize(ik_chain_offset + size_of::<IkChainV8>(), 0);
    let link_at = buf.len();
    let link_count: i32 = if break_ik_chain { 2 } else { 3 };
    buf.resize(link_at + 3 * size_of::<IkLinkV8>(), 0);
    let chain_name = put_name(&mut buf, "ik_leg");
    let chain = IkChainV8 {
        name_offset: (chain_name - ik_chain_offset) as i32,
        link_type: 0,
        link_count,
        link_offset: (link_at - ik_chain_offset) as i32,
        unk_10: 0.0,
        unused: [0; 3],
    };
    buf[ik_chain_offset..ik_chain_offset + size_of::<IkChainV8>()]
        .copy_from_slice(bytes_of(&chain));
    for i in 0..3usize {
        let link = IkLinkV8 {
            bone: i as i32 % 2,
            knee_dir: [0.0, 1.0, 0.0],
            unused: [0.0; 3],
        };
        let at = link_at + i * size_of::<IkLinkV8>();
        buf[at..at + size_of::<IkLinkV8>()].copy_from_slice(bytes_of(&link));
    }

    // VG block
    align_to(&mut buf, 16);
    let hw_data_offset = buf.len();
    buf.extend_from_slice(&build_vg_block());
    let hw_data_size = buf.len() - hw_data_offset;

    let mut hdr = StudioHdrV8::zeroed();
    hdr.id = STUDIO_MAGIC;
    hdr.version = 8;
    hdr.sub_version = 0;
    hdr.checksum = TEST_CHECKSUM;
    hdr.name = inline_name("synthetic_v8");
    hdr.length = buf.len() as i32;
    hdr.bone_count = 2;
    hdr.bone_offset = bone_offset as i32;
    hdr.hitbox_set_count = 1;
    hdr.hitbox_set_offset = hitbox_set_offset as i32;
    hdr.texture_count = 1;
    hdr.texture_offset = texture_offset as i32;
    hdr.skin_ref_count = 1;
    hdr.skin_family_count = 1;
    hdr.skin_offset = skin_offset as i32;
    hdr.body_part_count = 1;
    hdr.body_part_offset = body_part_offset as i32;
    hdr.ik_chain_count = 1;
    hdr.ik_chain_offset = ik_chain_offset as i32;
    hdr.hw_data_offset = hw_data_offset as i32;
    hdr.hw_data_size = hw_data_size as i32;
    buf[..size_of::<StudioHdrV8>()].copy_from_slice(bytes_of(&hdr));
    buf
}

/// One triangle: position + weights + packed normal + uv0, stride 32.
/// Vertex 1 is skinned across both bones.
fn build_vg_block() -> Vec<u8> {
    let flags = VG_POSITION | VG_WEIGHTS | VG_NORMAL_PACKED | VG_UV0;
    let mut vg = vec![0u8; size_of::<VgHeader>()];

    let bone_remap_offset = vg.len();
    vg.extend_from_slice(&[0u8, 1u8]);

    align_to(&mut vg, 8);
    let lod_offset = vg.len();
    vg.resize(lod_offset + size_of::<VgLod>(), 0);
    align_to(&mut vg, 8); // VgMesh starts with a u64
    let mesh_offset = vg.len();
    vg.resize(mesh_offset + size_of::<VgMesh>(), 0);

    align_to(&mut vg, 4);
    let vertex_offset = vg.len();
    let positions = [[0.0f32, 0.0, 0.0], [4.0, 0.0, 0.0], [0.0, 4.0, 0.0]];
    let uvs = [[0.0f32, 0.0], [1.0, 0.0], [0.0, 0.5]];
    // (count, w0 unorm16, bones)
    let weights = [(1u8, 0u16, [0u8, 0, 0]), (2, 16384, [0, 1, 0]), (1, 0, [1, 0, 0])];
    for i in 0..3 {
        for f in positions[i] {
            vg.extend_from_slice(&f.to_le_bytes());
        }
        let (count, w0, bones) = weights[i];
        vg.extend_from_slice(&w0.to_le_bytes());
        vg.extend_from_slice(&0u16.to_le_bytes());
        vg.extend_from_slice(&bones);
        vg.push(count);
        vg.extend_from_slice(&0u32.to_le_bytes()); // packed normal
        for f in uvs[i] {
            vg.extend_from_slice(&f.to_le_bytes());
        }
    }
    let vertex_end = vg.len();

    align_to(&mut vg, 2);
    let index_offset = vg.len();
    for idx in [0u16, 1, 2] {
        vg.extend_from_slice(&idx.to_le_bytes());
    }

    let hdr = VgHeader {
        id: VG_MAGIC,
        version: 1,
        bone_remap_count: 2,
        bone_remap_offset: bone_remap_offset as u32,
        lod_count: 1,
        lod_offset: lod_offset as u32,
    };
    let lod = VgLod {
        mesh_count: 1,
        mesh_offset: mesh_offset as u32,
        switch_point: 0.0,
        vertex_count: 3,
        index_count: 3,
    };
    let mesh = VgMesh {
        flags,
        vertex_offset: vertex_offset as u32,
        vertex_stride: ((vertex_end - vertex_offset) / 3) as u32,
        vertex_count: 3,
        index_offset: index_offset as u32,
        index_count: 3,
        extra_weight_offset: 0,
        extra_weight_count: 0,
        weights_per_vert: 2,
        texcoord_count: 1,
        material: 0,
        _pad: 0,
    };
    vg[..size_of::<VgHeader>()].copy_from_slice(bytes_of(&hdr));
    vg[lod_offset..lod_offset + size_of::<VgLod>()].copy_from_slice(bytes_of(&lod));
    vg[mesh_offset..mesh_offset + size_of::<VgMesh>()].copy_from_slice(bytes_of(&mesh));
    vg
}

/// A one-bone rtech v8 model with two body parts, each holding one model
/// with one position-plus-weights mesh. `vertex_counts` sets the vertex
/// count of each mesh, so the caller controls how far the merged per-LOD
/// vertex stream grows.
pub fn build_v8_two_mesh_model(vertex_counts: [u32; 2]) -> Vec<u8> {
    let mut buf = vec![0u8; size_of::<StudioHdrV8>()];

    align_to(&mut buf, 4);
    let bone_offset = buf.len();
    buf.resize(bone_offset + size_of::<BoneV8>(), 0);
    let bone_name = put_name(&mut buf, "root");
    let bone = bone_v8((bone_name - bone_offset) as i32, -1, [0.0; 3]);
    buf[bone_offset..bone_offset + size_of::<BoneV8>()].copy_from_slice(bytes_of(&bone));

    align_to(&mut buf, 4);
    let body_part_offset = buf.len();
    buf.resize(body_part_offset + 2 * size_of::<BodyPartV8>(), 0);
    let model_table = buf.len();
    buf.resize(model_table + 2 * size_of::<ModelV8>(), 0);
    let part_names = [put_name(&mut buf, "upper"), put_name(&mut buf, "lower")];
    let model_names = [
        put_name(&mut buf, "upper_model"),
        put_name(&mut buf, "lower_model"),
    ];
    for bp in 0..2 {
        let bp_at = body_part_offset + bp * size_of::<BodyPartV8>();
        let model_at = model_table + bp * size_of::<ModelV8>();
        let part = BodyPartV8 {
            name_offset: (part_names[bp] - bp_at) as i32,
            model_count: 1,
            base: 1,
            model_offset: (model_at - bp_at) as i32,
        };
        let model = ModelV8 {
            name_offset: (model_names[bp] - model_at) as i32,
            type_: 0,
            bounding_radius: 16.0,
            mesh_count: 1,
            mesh_offset: 0,
            vertex_count: vertex_counts[bp] as i32,
            vertex_offset: 0,
            unused: [0; 8],
        };
        buf[bp_at..bp_at + size_of::<BodyPartV8>()].copy_from_slice(bytes_of(&part));
        buf[model_at..model_at + size_of::<ModelV8>()].copy_from_slice(bytes_of(&model));
    }

    align_to(&mut buf, 16);
    let hw_data_offset = buf.len();
    buf.extend_from_slice(&build_two_mesh_vg_block(vertex_counts));
    let hw_data_size = buf.len() - hw_data_offset;

    let mut hdr = StudioHdrV8::zeroed();
    hdr.id = STUDIO_MAGIC;
    hdr.version = 8;
    hdr.checksum = TEST_CHECKSUM;
    hdr.name = inline_name("synthetic_v8_pair");
    hdr.length = buf.len() as i32;
    hdr.bone_count = 1;
    hdr.bone_offset = bone_offset as i32;
    hdr.body_part_count = 2;
    hdr.body_part_offset = body_part_offset as i32;
    hdr.hw_data_offset = hw_data_offset as i32;
    hdr.hw_data_size = hw_data_size as i32;
    buf[..size_of::<StudioHdrV8>()].copy_from_slice(bytes_of(&hdr));
    buf
}

/// Two meshes, stride 20 (position + one inline bone-zero weight each),
/// three indices per mesh clamped to the mesh's vertex range.
fn build_two_mesh_vg_block(vertex_counts: [u32; 2]) -> Vec<u8> {
    let flags = VG_POSITION | VG_WEIGHTS;
    let mut vg = vec![0u8; size_of::<VgHeader>()];

    let bone_remap_offset = vg.len();
    vg.push(0u8);

    align_to(&mut vg, 8);
    let lod_offset = vg.len();
    vg.resize(lod_offset + size_of::<VgLod>(), 0);
    align_to(&mut vg, 8);
    let mesh_offset = vg.len();
    vg.resize(mesh_offset + 2 * size_of::<VgMesh>(), 0);

    for (mesh_i, &count) in vertex_counts.iter().enumerate() {
        align_to(&mut vg, 4);
        let vertex_offset = vg.len();
        for v in 0..count {
            for f in [v as f32, 0.0, 0.0] {
                vg.extend_from_slice(&f.to_le_bytes());
            }
            vg.extend_from_slice(&0u16.to_le_bytes());
            vg.extend_from_slice(&0u16.to_le_bytes());
            vg.extend_from_slice(&[0u8, 0, 0]);
            vg.push(1);
        }
        align_to(&mut vg, 2);
        let index_offset = vg.len();
        for idx in [0u32, 1, 2] {
            vg.extend_from_slice(&(idx.min(count - 1) as u16).to_le_bytes());
        }
        let mesh = VgMesh {
            flags,
            vertex_offset: vertex_offset as u32,
            vertex_stride: 20,
            vertex_count: count,
            index_offset: index_offset as u32,
            index_count: 3,
            extra_weight_offset: 0,
            extra_weight_count: 0,
            weights_per_vert: 1,
            texcoord_count: 0,
            material: 0,
            _pad: 0,
        };
        let at = mesh_offset + mesh_i * size_of::<VgMesh>();
        vg[at..at + size_of::<VgMesh>()].copy_from_slice(bytes_of(&mesh));
    }

    let hdr = VgHeader {
        id: VG_MAGIC,
        version: 1,
        bone_remap_count: 1,
        bone_remap_offset: bone_remap_offset as u32,
        lod_count: 1,
        lod_offset: lod_offset as u32,
    };
    let lod = VgLod {
        mesh_count: 2,
        mesh_offset: mesh_offset as u32,
        switch_point: 0.0,
        vertex_count: vertex_counts[0] + vertex_counts[1],
        index_count: 6,
    };
    vg[..size_of::<VgHeader>()].copy_from_slice(bytes_of(&hdr));
    vg[lod_offset..lod_offset + size_of::<VgLod>()].copy_from_slice(bytes_of(&lod));
    vg
}

fn split_bone_tables(buf: &mut Vec<u8>) -> usize {
    align_to(buf, 4);
    let bone_hdr_offset = buf.len();
    buf.resize(bone_hdr_offset + 2 * size_of::<BoneHdrV16>(), 0);
    let names = [put_name(buf, "root"), put_name(buf, "child")];
    for (i, name) in names.iter().enumerate() {
        let at = bone_hdr_offset + i * size_of::<BoneHdrV16>();
        let hdr = BoneHdrV16 {
            name_offset: *name as i32 - at as i32,
            physics_bone: i as i16,
            surface_prop_idx: 0,
            contents: 0,
        };
        buf[at..at + size_of::<BoneHdrV16>()].copy_from_slice(bytes_of(&hdr));
    }
    bone_hdr_offset
}

/// Two-bone v16 model: split bone header/data tables, no geometry block.
pub fn build_v16_model() -> Vec<u8> {
    let mut buf = vec![0u8; size_of::<StudioHdrV16>()];
    let model_name = put_name(&mut buf, "synthetic_v16");
    let bone_hdr_offset = split_bone_tables(&mut buf);

    align_to(&mut buf, 4);
    let bone_data_offset = buf.len();
    for i in 0..2 {
        let data = BoneDataV16 {
            parent: if i == 0 { -1 } else { 0 },
            flags: 0,
            proc_type: 0,
            proc_index: 0,
            pos: [0.0, 0.0, 4.0 * i as f32],
            quat: [0.0, 0.0, 0.0, 1.0],
            rot: [0.0; 3],
            scale: [1.0; 3],
            pose_to_bone: Mat34::IDENTITY,
        };
        buf.extend_from_slice(bytes_of(&data));
    }

    let mut hdr = StudioHdrV16::zeroed();
    hdr.id = STUDIO_MAGIC;
    hdr.version = 16;
    hdr.sub_version = 0;
    hdr.checksum = TEST_CHECKSUM;
    hdr.name_offset = model_name as u32;
    hdr.bone_count = 2;
    hdr.bone_hdr_offset = bone_hdr_offset as u32;
    hdr.bone_data_offset = bone_data_offset as u32;
    buf[..size_of::<StudioHdrV16>()].copy_from_slice(bytes_of(&hdr));
    buf
}

/// Two-bone v19 model: split bone tables plus the linear-bone table that
/// carries the transforms.
pub fn build_v19_model() -> Vec<u8> {
    let mut buf = vec![0u8; size_of::<StudioHdrV16>()];
    let model_name = put_name(&mut buf, "synthetic_v19");
    let bone_hdr_offset = split_bone_tables(&mut buf);

    align_to(&mut buf, 4);
    let bone_data_offset = buf.len();
    for i in 0..2 {
        let data = BoneDataV19 {
            parent: if i == 0 { -1 } else { 0 },
            flags: 0,
            proc_type: 0,
            proc_index: 0,
        };
        buf.extend_from_slice(bytes_of(&data));
    }

    align_to(&mut buf, 4);
    let linear_at = buf.len();
    buf.resize(linear_at + size_of::<LinearBoneV19>(), 0);
    let pos_at = buf.len();
    for p in [[0.0f32, 0.0, 0.0], [0.0, 0.0, 12.0]] {
        for f in p {
            buf.extend_from_slice(&f.to_le_bytes());
        }
    }
    let quat_at = buf.len();
    for _ in 0..2 {
        for f in [0.0f32, 0.0, 0.0, 1.0] {
            buf.extend_from_slice(&f.to_le_bytes());
        }
    }
    let rot_at = buf.len();
    buf.resize(rot_at + 2 * 12, 0);
    let scale_at = buf.len();
    for _ in 0..2 {
        for f in [1.0f32, 1.0, 1.0] {
            buf.extend_from_slice(&f.to_le_bytes());
        }
    }
    let p2b_at = buf.len();
    for _ in 0..2 {
        buf.extend_from_slice(bytes_of(&Mat34::IDENTITY));
    }
    let linear = LinearBoneV19 {
        bone_count: 2,
        pos_offset: (pos_at - linear_at) as i32,
        quat_offset: (quat_at - linear_at) as i32,
        rot_offset: (rot_at - linear_at) as i32,
        scale_offset: (scale_at - linear_at) as i32,
        pose_to_bone_offset: (p2b_at - linear_at) as i32,
    };
    buf[linear_at..linear_at + size_of::<LinearBoneV19>()].copy_from_slice(bytes_of(&linear));

    let mut hdr = StudioHdrV16::zeroed();
    hdr.id = STUDIO_MAGIC;
    hdr.version = 19;
    hdr.sub_version = 0;
    hdr.checksum = TEST_CHECKSUM;
    hdr.name_offset = model_name as u32;
    hdr.bone_count = 2;
    hdr.bone_hdr_offset = bone_hdr_offset as u32;
    hdr.bone_data_offset = bone_data_offset as u32;
    hdr.linear_bone_offset = linear_at as u32;
    buf[..size_of::<StudioHdrV16>()].copy_from_slice(bytes_of(&hdr));
    buf
}

/// Classic r2 fixture: the studio buffer plus matching VTX and VVD bytes.
pub struct ClassicFixture {
    pub mdl: Vec<u8>,
    pub vtx: Vec<u8>,
    pub vvd: Vec<u8>,
}

/// One-bone r2 model with a single triangle in a single strip group.
pub fn build_r2_model() -> ClassicFixture {
    // studio buffer
    let mut mdl = vec![0u8; size_of::<StudioHdrClassic>()];

    align_to(&mut mdl, 4);
    let bone_offset = mdl.len();
    mdl.resize(bone_offset + size_of::<BoneClassic>(), 0);
    let bone_name = put_name(&mut mdl, "root");
    let mut bone = BoneClassic::zeroed();
    bone.name_offset = (bone_name - bone_offset) as i32;
    bone.parent = -1;
    bone.quat = [0.0, 0.0, 0.0, 1.0];
    bone.scale = [1.0; 3];
    bone.pose_to_bone = Mat34::IDENTITY;
    mdl[bone_offset..bone_offset + size_of::<BoneClassic>()].copy_from_slice(bytes_of(&bone));

    align_to(&mut mdl, 4);
    let texture_offset = mdl.len();
    mdl.resize(texture_offset + size_of::<MaterialClassic>(), 0);
    let mat_name = put_name(&mut mdl, "models/props/crate");
    let mut mat = MaterialClassic::zeroed();
    mat.name_offset = (mat_name - texture_offset) as i32;
    mdl[texture_offset..texture_offset + size_of::<MaterialClassic>()]
        .copy_from_slice(bytes_of(&mat));

    align_to(&mut mdl, 2);
    let skin_offset = mdl.len();
    mdl.extend_from_slice(&0i16.to_le_bytes());

    align_to(&mut mdl, 4);
    let body_part_offset = mdl.len();
    mdl.resize(body_part_offset + size_of::<BodyPartClassic>(), 0);
    let model_offset = mdl.len();
    mdl.resize(model_offset + size_of::<ModelClassic>(), 0);
    let mesh_offset = mdl.len();
    mdl.resize(mesh_offset + size_of::<MeshClassic>(), 0);
    let bp_name = put_name(&mut mdl, "body");

    let bp = BodyPartClassic {
        name_offset: (bp_name - body_part_offset) as i32,
        model_count: 1,
        base: 1,
        model_offset: (model_offset - body_part_offset) as i32,
    };
    let mut smodel = ModelClassic::zeroed();
    smodel.name = inline_name("crate_model");
    smodel.mesh_count = 1;
    smodel.mesh_offset = (mesh_offset - model_offset) as i32;
    smodel.vertex_count = 3;
    smodel.vertex_offset = 0;
    let mut smesh = MeshClassic::zeroed();
    smesh.material = 0;
    smesh.vertex_count = 3;
    smesh.vertex_index_start = 0;
    mdl[body_part_offset..body_part_offset + size_of::<BodyPartClassic>()]
        .copy_from_slice(bytes_of(&bp));
    mdl[model_offset..model_offset + size_of::<ModelClassic>()]
        .copy_from_slice(bytes_of(&smodel));
    mdl[mesh_offset..mesh_offset + size_of::<MeshClassic>()].copy_from_slice(bytes_of(&smesh));

    let mut hdr = StudioHdrClassic::zeroed();
    hdr.id = STUDIO_MAGIC;
    hdr.version = 53;
    hdr.checksum = TEST_CHECKSUM;
    hdr.name = inline_name("synthetic_r2");
    hdr.length = mdl.len() as i32;
    hdr.bone_count = 1;
    hdr.bone_offset = bone_offset as i32;
    hdr.texture_count = 1;
    hdr.texture_offset = texture_offset as i32;
    hdr.skin_ref_count = 1;
    hdr.skin_family_count = 1;
    hdr.skin_offset = skin_offset as i32;
    hdr.body_part_count = 1;
    hdr.body_part_offset = body_part_offset as i32;
    mdl[..size_of::<StudioHdrClassic>()].copy_from_slice(bytes_of(&hdr));

    // VVD: three vertices, no fixups
    let mut vvd = vec![0u8; size_of::<VvdHeader>()];
    align_to(&mut vvd, 16);
    let vertex_offset = vvd.len();
    let verts = [
        ([0.0f32, 0.0, 0.0], [0.0f32, 0.25]),
        ([8.0, 0.0, 0.0], [1.0, 0.25]),
        ([0.0, 8.0, 0.0], [0.0, 1.0]),
    ];
    for (pos, uv) in verts {
        let v = VvdVertex {
            bone_weights: VvdBoneWeight {
                weight: [1.0, 0.0, 0.0],
                bone: [0, 0, 0],
                count: 1,
            },
            position: pos,
            normal: [0.0, 0.0, 1.0],
            uv,
        };
        vvd.extend_from_slice(bytes_of(&v));
    }
    let mut vvd_hdr = VvdHeader::zeroed();
    vvd_hdr.id = VVD_MAGIC;
    vvd_hdr.version = 4;
    vvd_hdr.checksum = TEST_CHECKSUM;
    vvd_hdr.lod_count = 1;
    vvd_hdr.lod_vertex_count[0] = 3;
    vvd_hdr.vertex_offset = vertex_offset as i32;
    vvd[..size_of::<VvdHeader>()].copy_from_slice(bytes_of(&vvd_hdr));

    // VTX: one body part / model / lod / mesh / strip group
    let mut vtx = vec![0u8; size_of::<VtxHeader>()];
    let bp_at = vtx.len();
    vtx.resize(bp_at + size_of::<VtxBodyPart>(), 0);
    let model_at = vtx.len();
    vtx.resize(model_at + size_of::<VtxModel>(), 0);
    let lod_at = vtx.len();
    vtx.resize(lod_at + size_of::<VtxLod>(), 0);
    let mesh_at = vtx.len();
    vtx.resize(mesh_at + size_of::<VtxMesh>(), 0);
    let group_at = vtx.len();
    vtx.resize(group_at + size_of::<VtxStripGroup>(), 0);
    let opt_at = vtx.len();
    for i in 0..3u16 {
        let opt = OptVertex {
            bone_weight_index: [0, 0, 0],
            bone_count: 1,
            orig_mesh_vert_id: i,
            bone_id: [0, 0, 0],
        };
        vtx.extend_from_slice(bytes_of(&opt));
    }
    let idx_at = vtx.len();
    for idx in [0u16, 1, 2] {
        vtx.extend_from_slice(&idx.to_le_bytes());
    }

    let vtx_hdr = VtxHeader {
        version: VTX_VERSION,
        vert_cache_size: 24,
        max_bones_per_strip: 53,
        max_bones_per_tri: 3,
        max_bones_per_vert: 3,
        checksum: TEST_CHECKSUM,
        lod_count: 1,
        material_replacement_offset: 0,
        body_part_count: 1,
        body_part_offset: bp_at as i32,
    };
    let vtx_bp = VtxBodyPart {
        model_count: 1,
        model_offset: (model_at - bp_at) as i32,
    };
    let vtx_model = VtxModel {
        lod_count: 1,
        lod_offset: (lod_at - model_at) as i32,
    };
    let vtx_lod = VtxLod {
        mesh_count: 1,
        mesh_offset: (mesh_at - lod_at) as i32,
        switch_point: -1.0,
    };
    let vtx_mesh = VtxMesh {
        strip_group_count: 1,
        strip_group_offset: (group_at - mesh_at) as i32,
        flags: 0,
    };
    let group = VtxStripGroup {
        vertex_count: 3,
        vertex_offset: (opt_at - group_at) as i32,
        index_count: 3,
        index_offset: (idx_at - group_at) as i32,
        strip_count: 0,
        strip_offset: 0,
        flags: 0,
    };
    vtx[..size_of::<VtxHeader>()].copy_from_slice(bytes_of(&vtx_hdr));
    vtx[bp_at..bp_at + size_of::<VtxBodyPart>()].copy_from_slice(bytes_of(&vtx_bp));
    vtx[model_at..model_at + size_of::<VtxModel>()].copy_from_slice(bytes_of(&vtx_model));
    vtx[lod_at..lod_at + size_of::<VtxLod>()].copy_from_slice(bytes_of(&vtx_lod));
    vtx[mesh_at..mesh_at + size_of::<VtxMesh>()].copy_from_slice(bytes_of(&vtx_mesh));
    vtx[group_at..group_at + size_of::<VtxStripGroup>()].copy_from_slice(bytes_of(&group));

    ClassicFixture { mdl, vtx, vvd }
}
