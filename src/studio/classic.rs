//! Classic engine lineage record layouts (r1/r2) and their loose vertex
//! data: VTX (optimized triangle strips), VVD (raw vertices) and VVW
//! (extended bone weights).
//!
//! The VTX hierarchy stores every offset relative to the record that
//! declares it, and its structures are byte-packed.

use bytemuck::{Pod, Zeroable};

use super::Mat34;

// ---------------------------------------------------------------------------
// Studio records
// ---------------------------------------------------------------------------

/// Classic studio header, shared by r1 (version 52) and r2 (version 53).
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct StudioHdrClassic {
    pub id: u32,
    pub version: i32,
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
    pub bone_controller_count: i32,
    pub bone_controller_offset: i32,
    pub hitbox_set_count: i32,
    pub hitbox_set_offset: i32,
    pub local_anim_count: i32,
    pub local_anim_offset: i32,
    pub local_seq_count: i32,
    pub local_seq_offset: i32,
    pub activity_list_version: i32,
    pub events_indexed: i32,
    pub texture_count: i32,
    pub texture_offset: i32,
    pub cd_texture_count: i32,
    pub cd_texture_offset: i32,
    pub skin_ref_count: i32,
    pub skin_family_count: i32,
    pub skin_offset: i32,
    pub body_part_count: i32,
    pub body_part_offset: i32,
    pub local_attachment_count: i32,
    pub local_attachment_offset: i32,
    pub local_node_count: i32,
    pub local_node_offset: i32,
    pub local_node_name_offset: i32,
    pub ik_chain_count: i32,
    pub ik_chain_offset: i32,
    pub pose_param_count: i32,
    pub pose_param_offset: i32,
    pub surface_prop_offset: i32,
    pub key_value_offset: i32,
    pub key_value_size: i32,
    pub ik_lock_count: i32,
    pub ik_lock_offset: i32,
    pub mass: f32,
    pub contents: i32,

    pub unused: [i32; 8],
}

/// Classic bone record, shared by r1 and r2 (r2 repurposes part of the
/// reserved tail, which this crate does not read).
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct BoneClassic {
    pub name_offset: i32,
    pub parent: i32,
    pub bone_controller: [i32; 6],
    pub pos: [f32; 3],
    pub quat: [f32; 4],
    pub rot: [f32; 3],
    pub pos_scale: [f32; 3],
    pub rot_scale: [f32; 3],
    pub pose_to_bone: Mat34,
    pub q_alignment: [f32; 4],
    pub flags: i32,
    pub proc_type: i32,
    pub proc_index: i32,
    pub physics_bone: i32,
    pub surface_prop_idx: i32,
    pub contents: i32,
    pub scale: [f32; 3],
    pub unused: [i32; 5],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct AttachmentClassic {
    pub name_offset: i32,
    pub flags: i32,
    pub local_bone: i32,
    pub local: Mat34,
    pub unused: [i32; 8],
}

/// r1 hitbox, no crit-point flag.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct HitboxClassic {
    pub bone: i32,
    pub group: i32,
    pub bbmin: [f32; 3],
    pub bbmax: [f32; 3],
    pub name_offset: i32,
    pub unused: [i32; 8],
}

/// r2 hitbox carries the crit-point flag; same shape as the v8 record.
pub use super::rtech::HitboxV8 as HitboxR2;
pub use super::rtech::HitboxSetV8 as HitboxSetClassic;
pub use super::rtech::IkChainV8 as IkChainClassic;
pub use super::rtech::IkLinkV8 as IkLinkClassic;
pub use super::rtech::IkLockV8 as IkLockClassic;
pub use super::rtech::PoseParamV8 as PoseParamClassic;
pub use super::rtech::SeqDescV8 as SeqDescClassic;
pub use super::rtech::BodyPartV8 as BodyPartClassic;
pub use super::rtech::ExtraBoneWeight;

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct ModelClassic {
    pub name: [u8; 64],
    pub type_: i32,
    pub bounding_radius: f32,
    pub mesh_count: i32,
    pub mesh_offset: i32,
    pub vertex_count: i32,
    /// Byte offset into the VVD vertex block (vertex-sized strides).
    pub vertex_offset: i32,
    pub tangent_offset: i32,
    pub unused: [i32; 8],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct MeshClassic {
    pub material: i32,
    pub model_offset: i32,
    pub vertex_count: i32,
    /// First vertex, relative to the owning model's vertex block.
    pub vertex_index_start: i32,
    pub mesh_id: i32,
    pub center: [f32; 3],
    pub unused: [i32; 8],
}

/// Classic texture/material record.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct MaterialClassic {
    pub name_offset: i32,
    pub flags: i32,
    pub used: i32,
    pub unused: [i32; 13],
}

// ---------------------------------------------------------------------------
// VVD - raw vertex data
// ---------------------------------------------------------------------------

pub const VVD_MAGIC: u32 = 0x5644_5349; // "IDSV"

/// Inline bone-weight limit of the classic vertex record.
pub const MAX_INLINE_WEIGHTS: usize = 3;

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct VvdHeader {
    pub id: u32,
    pub version: i32,
    pub checksum: i32,
    pub lod_count: i32,
    pub lod_vertex_count: [i32; 8],
    pub fixup_count: i32,
    pub fixup_offset: i32,
    pub vertex_offset: i32,
    pub tangent_offset: i32,
}

/// LOD fixup: a run of root-LOD vertices to copy for a given target LOD.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct VvdFixup {
    pub lod: i32,
    pub source_vertex_id: i32,
    pub vertex_count: i32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct VvdBoneWeight {
    pub weight: [f32; 3],
    pub bone: [u8; 3],
    pub count: u8,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct VvdVertex {
    pub bone_weights: VvdBoneWeight,
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

// ---------------------------------------------------------------------------
// VTX - optimized triangle data
// ---------------------------------------------------------------------------

pub const VTX_VERSION: i32 = 7;

pub const STRIPGROUP_IS_HWSKINNED: u8 = 0x2;

#[repr(C, packed)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct VtxHeader {
    pub version: i32,
    pub vert_cache_size: i32,
    pub max_bones_per_strip: u16,
    pub max_bones_per_tri: u16,
    pub max_bones_per_vert: i32,
    pub checksum: i32,
    pub lod_count: i32,
    pub material_replacement_offset: i32,
    pub body_part_count: i32,
    pub body_part_offset: i32,
}

#[repr(C, packed)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct VtxBodyPart {
    pub model_count: i32,
    pub model_offset: i32,
}

#[repr(C, packed)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct VtxModel {
    pub lod_count: i32,
    pub lod_offset: i32,
}

#[repr(C, packed)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct VtxLod {
    pub mesh_count: i32,
    pub mesh_offset: i32,
    pub switch_point: f32,
}

#[repr(C, packed)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct VtxMesh {
    pub strip_group_count: i32,
    pub strip_group_offset: i32,
    pub flags: u8,
}

#[repr(C, packed)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct VtxStripGroup {
    pub vertex_count: i32,
    pub vertex_offset: i32,
    pub index_count: i32,
    pub index_offset: i32,
    pub strip_count: i32,
    pub strip_offset: i32,
    pub flags: u8,
}

#[repr(C, packed)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct VtxStrip {
    pub index_count: i32,
    pub index_offset: i32,
    pub vertex_count: i32,
    pub vertex_offset: i32,
    pub bone_count: i16,
    pub flags: u8,
    pub bone_state_change_count: i32,
    pub bone_state_change_offset: i32,
}

/// Optimized-triangle vertex. The bone slots are either direct bone ids or,
/// for hardware-skinned strip groups, indices into the strip's bone-state
/// table.
#[repr(C, packed)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct OptVertex {
    pub bone_weight_index: [u8; 3],
    pub bone_count: u8,
    pub orig_mesh_vert_id: u16,
    pub bone_id: [i8; 3],
}

#[repr(C, packed)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct BoneStateChange {
    pub hardware_id: i32,
    pub new_bone_id: i32,
}

// ---------------------------------------------------------------------------
// VVW - extended bone weights
// ---------------------------------------------------------------------------

pub const VVW_MAGIC: u32 = 0x5757_5649; // "IVWW"

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct VvwHeader {
    pub id: u32,
    pub version: i32,
    pub checksum: i32,
    pub vertex_count: i32,
    pub vertex_info_offset: i32,
    pub extra_weight_count: i32,
    pub extra_weight_offset: i32,
}

/// Per-vertex pointer into the extra-weight table, indexed by original
/// vertex id.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct VvwVertexInfo {
    pub extra_index: i32,
    pub extra_count: i32,
}

const _: () = assert!(std::mem::size_of::<VvdVertex>() == 48);
const _: () = assert!(std::mem::size_of::<OptVertex>() == 9);
const _: () = assert!(std::mem::size_of::<VtxStripGroup>() == 25);
const _: () = assert!(std::mem::size_of::<VtxStrip>() == 27);
