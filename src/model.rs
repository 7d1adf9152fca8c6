//! Version-free model representation.
//!
//! One [`ParsedModel`] owns everything produced by normalization, with two
//! documented exceptions: bone pose-to-bone transforms and attachment local
//! matrices are references into the immutable source buffer, which must
//! outlive the aggregate. The borrow checker enforces that contract through
//! the `'a` lifetime.

use glam::{Quat, Vec2, Vec3};

use crate::error::{Error, Result};
use crate::meshbuf::MeshBuffer;
use crate::studio::{GenericStudioHdr, Mat34};

/// Canonical bone. Created once during normalization, immutable after.
#[derive(Debug, Clone, Copy)]
pub struct Bone<'a> {
    pub name: &'a str,
    /// -1 marks a root bone.
    pub parent: i32,
    pub flags: i32,
    pub proc_type: i32,
    /// Procedural-rule offset relative to this bone's header record.
    /// 0 means "no procedure", never "offset 0".
    pub proc_index: i32,
    pub physics_bone: i32,
    pub surface_prop_idx: i32,
    pub contents: i32,
    /// Borrowed from the source buffer; large, never copied.
    pub pose_to_bone: &'a Mat34,
    pub pos: Vec3,
    pub quat: Quat,
    /// Radian Euler rotation.
    pub rot: Vec3,
    pub scale: Vec3,
    /// Byte offset of the bone's header record in the source buffer.
    pub(crate) record_offset: usize,
}

impl<'a> Bone<'a> {
    /// Buffer-absolute byte offset of the procedural rule, or `None` when
    /// the bone has no procedure.
    pub fn procedure_offset(&self) -> Option<usize> {
        (self.proc_index != 0).then(|| (self.record_offset as i64 + self.proc_index as i64) as usize)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Attachment<'a> {
    pub name: &'a str,
    pub flags: i32,
    pub local_bone: i32,
    /// Borrowed local transform.
    pub local: &'a Mat34,
}

#[derive(Debug, Clone, Copy)]
pub struct Hitbox<'a> {
    pub bone: i32,
    pub group: i32,
    pub bbmin: &'a [f32; 3],
    pub bbmax: &'a [f32; 3],
    pub name: &'a str,
    /// Versions without the flag normalize it to 0.
    pub force_crit_point: i32,
}

#[derive(Debug)]
pub struct HitboxSet<'a> {
    pub name: &'a str,
    pub hitboxes: Vec<Hitbox<'a>>,
}

/// Borrowed-or-owned name slot; exactly one representation is active.
#[derive(Debug, Clone)]
pub enum Name<'a> {
    Borrowed(&'a str),
    Owned(String),
}

impl<'a> Name<'a> {
    pub fn as_str(&self) -> &str {
        match self {
            Name::Borrowed(s) => s,
            Name::Owned(s) => s,
        }
    }

    pub fn is_owned(&self) -> bool {
        matches!(self, Name::Owned(_))
    }
}

/// Opaque resolved material: the core stores the handle but never decodes
/// texture pixels itself.
#[derive(Debug, Clone)]
pub struct MaterialHandle {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub mip_count: u32,
}

#[derive(Debug, Clone)]
pub struct MaterialRef<'a> {
    /// None until the surrounding loader resolves the asset.
    pub handle: Option<MaterialHandle>,
    pub guid: u64,
    name: Name<'a>,
}

impl<'a> MaterialRef<'a> {
    pub fn new(guid: u64, name: Name<'a>) -> Self {
        MaterialRef {
            handle: None,
            guid,
            name,
        }
    }

    /// Replace the studio name with a generated, heap-owned one.
    pub fn store_name(&mut self, name: String) {
        self.name = Name::Owned(name);
    }

    /// Resolve the display name. `bias_studio = true` prefers the studio
    /// model's name over the resolved material asset's; a generated (owned)
    /// studio name always loses to a resolved handle.
    pub fn name(&self, bias_studio: bool) -> &str {
        if !bias_studio || self.name.is_owned() {
            if let Some(handle) = &self.handle {
                return &handle.name;
            }
        }
        self.name.as_str()
    }

    pub fn studio_name(&self) -> &Name<'a> {
        &self.name
    }
}

/// Skin family: maps logical material slots to material indices.
#[derive(Debug)]
pub struct SkinData<'a> {
    pub name: Name<'a>,
    pub indices: &'a [i16],
}

#[derive(Debug)]
pub struct BodyPart {
    name: String,
    pub model_index: i32,
    pub model_count: i32,
    /// Surfaced here because the source body-part table is shared with the
    /// preview layer.
    pub preview_enabled: bool,
}

impl BodyPart {
    pub fn unnamed() -> Self {
        BodyPart {
            name: String::new(),
            model_index: -1,
            model_count: 0,
            preview_enabled: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// First initialization wins; a second setup call on a named part is
    /// malformed input from a duplicated body-part table.
    pub fn setup(&mut self, name: &str, model_index: i32, model_count: i32) {
        if self.name.is_empty() {
            self.name = name.to_owned();
            self.model_index = model_index;
            self.model_count = model_count;
        }
    }
}

/// One mesh inside a LOD.
#[derive(Debug, Clone)]
pub struct MeshData {
    /// Index of this mesh's first byte range inside the owning LOD's
    /// [`MeshBuffer`] stream ordering (meshes are appended in order).
    pub vertex_data_index: usize,
    pub index_count: u32,
    pub vertex_count: u32,
    pub vert_cache_size: u16,
    /// Maximum weights any one vertex of this mesh may carry.
    pub weights_per_vert: u16,
    /// Total weight records owned by this mesh.
    pub weights_count: u32,
    /// First weight record owned by this mesh inside the LOD weight
    /// stream; vertex weight indices land in
    /// `weights_index..weights_index + weights_count`.
    pub weights_index: u32,
    pub texcoord_count: i16,
    /// Bitfield of present texcoord channels (bit 0 = texcoord0).
    pub texcoord_indices: u16,
    pub material_id: i32,
    /// Slot in `ParsedModel::materials`; None until resolved.
    pub material: Option<usize>,
    pub body_part_index: i32,
}

impl MeshData {
    /// Channel indices present beyond texcoord0.
    pub fn extra_texcoords(&self) -> impl Iterator<Item = u16> + '_ {
        (1..16).filter(|i| self.texcoord_indices & (1 << i) != 0)
    }
}

/// A body-part variant model: a contiguous mesh range within its LOD.
#[derive(Debug, Clone)]
pub struct ModelData {
    pub name: String,
    pub mesh_index: usize,
    pub mesh_count: u32,
    /// 0 means this model is disabled in the LOD (index-based disabling is
    /// not reliable for rtech models).
    pub vertex_count: u32,
}

impl ModelData {
    pub fn is_disabled(&self) -> bool {
        self.vertex_count == 0
    }
}

#[derive(Debug)]
pub struct LodData {
    pub models: Vec<ModelData>,
    pub meshes: Vec<MeshData>,
    pub vertex_count: usize,
    pub index_count: usize,
    pub switch_point: f32,
    /// Sizing hints for export buffers.
    pub texcoords_per_vert: u16,
    pub weights_per_vert: u16,
}

/// Animation metadata.
#[derive(Debug)]
pub struct SeqDesc<'a> {
    pub label: &'a str,
    pub activity_name: &'a str,
    pub flags: i32,
    pub frame_count: i32,
    pub fps: f32,
}

#[derive(Debug)]
pub struct PoseParam<'a> {
    pub name: &'a str,
    pub flags: i32,
    pub start: f32,
    pub end: f32,
    pub loop_: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IkLinkSlot {
    Thigh = 0,
    Knee = 1,
    Foot = 2,
}

#[derive(Debug, Clone, Copy)]
pub struct IkLink {
    pub bone: i32,
    pub knee_dir: Vec3,
}

/// Always exactly three links; a chain with any other link count or a
/// non-zero link type is corrupt input and fails the whole asset load.
#[derive(Debug)]
pub struct IkChain<'a> {
    pub name: &'a str,
    pub unk_10: f32,
    pub links: [IkLink; 3],
}

impl<'a> IkChain<'a> {
    pub fn link(&self, slot: IkLinkSlot) -> &IkLink {
        &self.links[slot as usize]
    }
}

#[derive(Debug, Clone, Copy)]
pub struct IkLock {
    pub chain: i32,
    pub pos_weight: f32,
    pub local_q_weight: f32,
    pub flags: i32,
}

/// The unified model aggregate. Write-once: populated during load, then
/// read-only. Ownership transfers use plain Rust moves.
#[derive(Debug)]
pub struct ParsedModel<'a> {
    pub hdr: GenericStudioHdr,

    pub bones: Vec<Bone<'a>>,
    pub attachments: Vec<Attachment<'a>>,
    pub hitbox_sets: Vec<HitboxSet<'a>>,

    pub lods: Vec<LodData>,
    pub materials: Vec<MaterialRef<'a>>,
    pub skins: Vec<SkinData<'a>>,
    pub body_parts: Vec<BodyPart>,

    /// None = the source version carries no such table ("not loaded");
    /// Some(empty) = the table exists with zero entries.
    pub sequences: Option<Vec<SeqDesc<'a>>>,
    pub pose_params: Option<Vec<PoseParam<'a>>>,
    pub ik_chains: Option<Vec<IkChain<'a>>>,
    pub ik_locks: Option<Vec<IkLock>>,

    /// One sealed buffer per LOD, the hand-off artifact for exporters.
    pub mesh_buffers: Vec<MeshBuffer>,
}

impl<'a> ParsedModel<'a> {
    pub fn new(hdr: GenericStudioHdr) -> Self {
        ParsedModel {
            hdr,
            bones: Vec::new(),
            attachments: Vec::new(),
            hitbox_sets: Vec::new(),
            lods: Vec::new(),
            materials: Vec::new(),
            skins: Vec::new(),
            body_parts: Vec::new(),
            sequences: None,
            pose_params: None,
            ik_chains: None,
            ik_locks: None,
            mesh_buffers: Vec::new(),
        }
    }

    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }

    pub fn lod(&self, i: usize) -> Result<&LodData> {
        self.lods.get(i).ok_or(Error::LodRange {
            lod: i,
            count: self.lods.len(),
        })
    }

    pub fn mesh_buffer(&self, lod: usize) -> Result<&MeshBuffer> {
        self.mesh_buffers.get(lod).ok_or(Error::LodRange {
            lod,
            count: self.mesh_buffers.len(),
        })
    }

    /// Sanity pass run after normalization: parents in range, per-mesh
    /// weight totals consistent.
    pub(crate) fn validate(&self) -> Result<()> {
        for (i, bone) in self.bones.iter().enumerate() {
            if bone.parent != -1 && (bone.parent < 0 || bone.parent as usize >= self.bones.len()) {
                return Err(Error::BadBoneParent {
                    bone: i,
                    parent: bone.parent,
                });
            }
        }
        Ok(())
    }
}

/// Bind-pose vertex data, as exporters consume it.
#[derive(Clone, Copy)]
pub struct ExportVertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn material_name_precedence() {
        let mut mat = MaterialRef::new(0, Name::Owned("fallback_mat".into()));
        assert_eq!(mat.name(true), "fallback_mat");
        assert_eq!(mat.name(false), "fallback_mat");

        mat.handle = Some(MaterialHandle {
            name: "real_mat".into(),
            width: 256,
            height: 256,
            mip_count: 1,
        });
        assert_eq!(mat.name(false), "real_mat");
        // owned (generated) studio name loses to a resolved handle
        assert_eq!(mat.name(true), "real_mat");

        let mat = MaterialRef {
            handle: Some(MaterialHandle {
                name: "real_mat".into(),
                width: 1,
                height: 1,
                mip_count: 1,
            }),
            guid: 0,
            name: Name::Borrowed("studio_mat"),
        };
        // borrowed studio name wins when biased
        assert_eq!(mat.name(true), "studio_mat");
        assert_eq!(mat.name(false), "real_mat");
    }

    #[test]
    fn body_part_setup_is_first_write_wins() {
        let mut part = BodyPart::unnamed();
        part.setup("head", 0, 2);
        part.setup("clone", 5, 9);
        assert_eq!(part.name(), "head");
        assert_eq!(part.model_index, 0);
        assert_eq!(part.model_count, 2);
    }

    #[test]
    fn disabled_model_has_no_vertices() {
        let m = ModelData {
            name: "blank".into(),
            mesh_index: 0,
            mesh_count: 0,
            vertex_count: 0,
        };
        assert!(m.is_disabled());
    }
}
