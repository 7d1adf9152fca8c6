//! rtech lineage record layouts (v8 through v19).
//!
//! v8..v14 keep the classic "everything relative to the studio header" shape
//! with 32-bit counts and offsets. v16+ shrink counts to 16 bits, split the
//! bone table into a header sub-table and a data sub-table, and (v19) move
//! bone transforms into a shared linear-bone table.
//!
//! All name/sub-table offsets inside a record are relative to that record
//! unless noted otherwise.

use bytemuck::{Pod, Zeroable};

use super::{view_slice, Mat34, Rec};
use crate::error::Result;

pub const STUDIO_MAGIC: u32 = 0x5453_4449; // "IDST"

/// Studio header, v8 family (also v12.1/v12.2/v12.4/v14; the revisions are
/// distinguished by `sub_version` and share this field set).
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct StudioHdrV8 {
    pub id: u32,
    pub version: i32,
    pub sub_version: i32,
    pub checksum: i32,
    pub name: [u8; 64],
    pub length: i32,

    pub eye_position: [f32; 3],
    pub illum_position: [f32; 3],
    pub hull_min: [f32; 3],
    pub hull_max: [f32; 3],
    pub view_bbmin: [f32; 3],
    pub view_bbmax: [f32; 3],

    pub flags: u32,

    pub bone_count: i32,
    pub bone_offset: i32,
    pub hitbox_set_count: i32,
    pub hitbox_set_offset: i32,
    pub local_seq_count: i32,
    pub local_seq_offset: i32,
    pub texture_count: i32,
    pub texture_offset: i32,
    pub skin_ref_count: i32,
    pub skin_family_count: i32,
    pub skin_offset: i32,
    pub body_part_count: i32,
    pub body_part_offset: i32,
    pub local_attachment_count: i32,
    pub local_attachment_offset: i32,
    pub ik_chain_count: i32,
    pub ik_chain_offset: i32,
    pub pose_param_count: i32,
    pub pose_param_offset: i32,
    pub ik_lock_count: i32,
    pub ik_lock_offset: i32,
    pub surface_prop_offset: i32,

    pub hw_data_offset: i32,
    pub hw_data_size: i32,

    pub unused: [i32; 8],
}

/// Studio header, v16+ (short counts, split bone table, offset-only name).
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct StudioHdrV16 {
    pub id: u32,
    pub version: u16,
    pub sub_version: u16,
    pub checksum: i32,
    pub name_offset: u32,
    pub surface_prop_offset: u32,
    pub flags: u32,

    pub bone_count: u16,
    pub hitbox_set_count: u16,
    pub local_seq_count: u16,
    pub texture_count: u16,
    pub skin_ref_count: u16,
    pub skin_family_count: u16,
    pub body_part_count: u16,
    pub local_attachment_count: u16,
    pub ik_chain_count: u16,
    pub pose_param_count: u16,
    pub ik_lock_count: u16,
    pub _pad: u16,

    pub bone_hdr_offset: u32,
    pub bone_data_offset: u32,
    /// 0 when the layout has no linear-bone table (v16/v17).
    pub linear_bone_offset: u32,
    pub hitbox_set_offset: u32,
    pub local_seq_offset: u32,
    pub texture_offset: u32,
    pub skin_offset: u32,
    pub body_part_offset: u32,
    pub local_attachment_offset: u32,
    pub ik_chain_offset: u32,
    pub pose_param_offset: u32,
    pub ik_lock_offset: u32,
    pub hw_data_offset: u32,
    pub hw_data_size: u32,
}

// ---------------------------------------------------------------------------
// Bones
// ---------------------------------------------------------------------------

/// Single-record bone, v8 layout.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct BoneV8 {
    pub name_offset: i32,
    pub parent: i32,
    pub pos: [f32; 3],
    pub quat: [f32; 4],
    pub rot: [f32; 3],
    pub scale: [f32; 3],
    pub pose_to_bone: Mat34,
    pub flags: i32,
    pub proc_type: i32,
    pub proc_index: i32,
    pub physics_bone: i32,
    pub surface_prop_idx: i32,
    pub contents: i32,
    pub unused: [i32; 8],
}

/// Single-record bone, v12.1 layout (adds the collision index, narrows the
/// reserved tail).
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct BoneV12_1 {
    pub name_offset: i32,
    pub parent: i32,
    pub pos: [f32; 3],
    pub quat: [f32; 4],
    pub rot: [f32; 3],
    pub scale: [f32; 3],
    pub pose_to_bone: Mat34,
    pub flags: i32,
    pub proc_type: i32,
    pub proc_index: i32,
    pub physics_bone: i32,
    pub surface_prop_idx: i32,
    pub contents: i32,
    pub collision_index: i32,
    pub unused: [i32; 3],
}

/// Split bone header record, v16+.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct BoneHdrV16 {
    pub name_offset: i32,
    pub physics_bone: i16,
    pub surface_prop_idx: i16,
    pub contents: i32,
}

/// Split bone data record, v16/v17.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct BoneDataV16 {
    pub parent: i32,
    pub flags: i32,
    pub proc_type: i32,
    pub proc_index: i32,
    pub pos: [f32; 3],
    pub quat: [f32; 4],
    pub rot: [f32; 3],
    pub scale: [f32; 3],
    pub pose_to_bone: Mat34,
}

/// Split bone data record, v19. Transforms live in the linear-bone table.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct BoneDataV19 {
    pub parent: i32,
    pub flags: i32,
    pub proc_type: i32,
    pub proc_index: i32,
}

/// Linear-bone table header, v19. Column offsets are relative to this
/// record; each column holds `bone_count` entries.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct LinearBoneV19 {
    pub bone_count: i32,
    pub pos_offset: i32,
    pub quat_offset: i32,
    pub rot_offset: i32,
    pub scale_offset: i32,
    pub pose_to_bone_offset: i32,
}

/// Borrowed view over the v19 linear-bone table columns.
#[derive(Clone, Copy)]
pub struct LinearBones<'a> {
    pub pos: &'a [[f32; 3]],
    pub quat: &'a [[f32; 4]],
    pub rot: &'a [[f32; 3]],
    pub scale: &'a [[f32; 3]],
    pub pose_to_bone: &'a [Mat34],
}

impl<'a> LinearBones<'a> {
    pub fn read(buf: &'a [u8], offset: usize) -> Result<Self> {
        let hdr = Rec::<LinearBoneV19>::at(buf, offset)?;
        let n = hdr.rec.bone_count as usize;
        Ok(LinearBones {
            pos: view_slice(buf, hdr.rel(hdr.rec.pos_offset as i64), n)?,
            quat: view_slice(buf, hdr.rel(hdr.rec.quat_offset as i64), n)?,
            rot: view_slice(buf, hdr.rel(hdr.rec.rot_offset as i64), n)?,
            scale: view_slice(buf, hdr.rel(hdr.rec.scale_offset as i64), n)?,
            pose_to_bone: view_slice(buf, hdr.rel(hdr.rec.pose_to_bone_offset as i64), n)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Auxiliary records
// ---------------------------------------------------------------------------

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct AttachmentV8 {
    pub name_offset: i32,
    pub flags: i32,
    pub local_bone: i32,
    pub local: Mat34,
    pub unused: [i32; 4],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct AttachmentV16 {
    pub name_offset: i32,
    pub local_bone: i16,
    pub flags: i16,
    pub local: Mat34,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct HitboxV8 {
    pub bone: i32,
    pub group: i32,
    pub bbmin: [f32; 3],
    pub bbmax: [f32; 3],
    pub name_offset: i32,
    pub force_crit_point: i32,
    pub unused: [i32; 4],
}

/// v16 hitbox; the crit-point flag was dropped again in this layout.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct HitboxV16 {
    pub bone: u16,
    pub group: u16,
    pub bbmin: [f32; 3],
    pub bbmax: [f32; 3],
    pub name_offset: i32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct HitboxSetV8 {
    pub name_offset: i32,
    pub hitbox_count: i32,
    pub hitbox_offset: i32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct HitboxSetV16 {
    pub name_offset: u16,
    pub hitbox_count: u16,
    pub hitbox_offset: i32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct PoseParamV8 {
    pub name_offset: i32,
    pub flags: i32,
    pub start: f32,
    pub end: f32,
    pub loop_: f32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct PoseParamV16 {
    pub name_offset: u16,
    pub _pad: u16,
    pub flags: i32,
    pub start: f32,
    pub end: f32,
    pub loop_: f32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct IkLinkV8 {
    pub bone: i32,
    pub knee_dir: [f32; 3],
    pub unused: [f32; 3],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct IkLinkV16 {
    pub bone: i32,
    pub knee_dir: [f32; 3],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct IkChainV8 {
    pub name_offset: i32,
    pub link_type: i32,
    pub link_count: i32,
    pub link_offset: i32,
    pub unk_10: f32,
    pub unused: [i32; 3],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct IkChainV16 {
    pub name_offset: u16,
    pub link_type: u16,
    pub link_count: u16,
    pub _pad: u16,
    pub link_offset: i32,
    pub unk_10: f32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct IkLockV8 {
    pub chain: i32,
    pub pos_weight: f32,
    pub local_q_weight: f32,
    pub flags: i32,
    pub unused: [i32; 4],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct IkLockV16 {
    pub chain: i16,
    pub flags: i16,
    pub pos_weight: f32,
    pub local_q_weight: f32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct SeqDescV8 {
    pub label_offset: i32,
    pub activity_name_offset: i32,
    pub flags: i32,
    pub activity: i32,
    pub act_weight: i32,
    pub frame_count: i32,
    pub fps: f32,
    pub bbmin: [f32; 3],
    pub bbmax: [f32; 3],
    pub unused: [i32; 4],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct SeqDescV16 {
    pub label_offset: u16,
    pub activity_name_offset: u16,
    pub flags: i32,
    pub frame_count: u16,
    pub _pad: u16,
    pub fps: f32,
}

/// rtech material reference (guid-bound asset).
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct MaterialV8 {
    pub guid: u64,
    pub name_offset: i32,
    pub _pad: i32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct MaterialV16 {
    pub guid: u64,
    pub name_offset: u16,
    pub _pad: [u16; 3],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct BodyPartV8 {
    pub name_offset: i32,
    pub model_count: i32,
    pub base: i32,
    pub model_offset: i32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct BodyPartV16 {
    pub name_offset: u16,
    pub model_count: u16,
    pub base: i32,
    pub model_offset: i32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct ModelV8 {
    pub name_offset: i32,
    pub type_: i32,
    pub bounding_radius: f32,
    pub mesh_count: i32,
    pub mesh_offset: i32,
    pub vertex_count: i32,
    pub vertex_offset: i32,
    pub unused: [i32; 8],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct ModelV16 {
    pub name_offset: u16,
    pub mesh_count: u16,
    pub mesh_offset: i32,
    pub vertex_count: i32,
}

// ---------------------------------------------------------------------------
// Baked hardware ("VG") vertex data
// ---------------------------------------------------------------------------

pub const VG_MAGIC: u32 = 0x4756_7430; // "0tVG"

/// Vertex layout flags carried by a baked mesh. The decode order is
/// position, weights, normal, color, uv0, uv1.
pub const VG_POSITION: u64 = 0x1;
pub const VG_POSITION_PACKED: u64 = 0x2;
pub const VG_NORMAL_PACKED: u64 = 0x4;
pub const VG_COLOR: u64 = 0x10;
pub const VG_WEIGHTS: u64 = 0x5000;
pub const VG_UV0: u64 = 0x20;
pub const VG_UV1: u64 = 0x200_0000;

/// Byte stride of one baked vertex for a flag set.
pub const fn vg_vertex_stride(flags: u64) -> usize {
    let mut stride = 0;
    if flags & VG_POSITION_PACKED != 0 {
        stride += 8;
    } else if flags & VG_POSITION != 0 {
        stride += 12;
    }
    if flags & VG_WEIGHTS != 0 {
        stride += 8; // 2x unorm16 weight + 3x u8 bone + u8 extra count
    }
    if flags & VG_NORMAL_PACKED != 0 {
        stride += 4;
    }
    if flags & VG_COLOR != 0 {
        stride += 4;
    }
    if flags & VG_UV0 != 0 {
        stride += 8;
    }
    if flags & VG_UV1 != 0 {
        stride += 8;
    }
    stride
}

/// Unpack the 64-bit fixed-point packed position (3x 21-bit fields).
pub fn unpack_position_u64(packed: u64) -> [f32; 3] {
    const MASK: u64 = 0x1F_FFFF;
    const BIAS: i64 = 0x10_0000;
    let field = |shift: u32| -> f32 {
        let raw = ((packed >> shift) & MASK) as i64;
        (raw - BIAS) as f32 / 256.0
    };
    [field(0), field(21), field(42)]
}

/// VG block header. All offsets relative to the VG block start.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct VgHeader {
    pub id: u32,
    pub version: u32,
    pub bone_remap_count: u32,
    pub bone_remap_offset: u32,
    pub lod_count: u32,
    pub lod_offset: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct VgLod {
    pub mesh_count: u32,
    pub mesh_offset: u32,
    pub switch_point: f32,
    pub vertex_count: u32,
    pub index_count: u32,
}

/// One baked mesh. Stream offsets relative to the VG block start.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct VgMesh {
    pub flags: u64,
    pub vertex_offset: u32,
    pub vertex_stride: u32,
    pub vertex_count: u32,
    pub index_offset: u32,
    pub index_count: u32,
    pub extra_weight_offset: u32,
    pub extra_weight_count: u32,
    pub weights_per_vert: u16,
    pub texcoord_count: u16,
    pub material: i32,
    pub _pad: u32,
}

/// Side-table weight record for vertices whose weight count exceeds the
/// inline limit.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct ExtraBoneWeight {
    pub weight: i16,
    pub bone: i16,
}

// compile-time size pins for the fixed wire layouts
const _: () = assert!(std::mem::size_of::<BoneHdrV16>() == 12);
const _: () = assert!(std::mem::size_of::<BoneDataV19>() == 16);
const _: () = assert!(std::mem::size_of::<ExtraBoneWeight>() == 4);
const _: () = assert!(std::mem::size_of::<VgMesh>() == 48);
