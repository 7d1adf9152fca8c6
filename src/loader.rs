//! Asset loading: version detection, buffer ownership, table walking.
//!
//! [`Loader`] drives the whole pipeline: detect the studio version, build
//! the version-normalized header, run the bone/entity normalizers, then
//! decode geometry (loose VTX/VVD/VVW files for the classic lineage, the
//! baked VG block for rtech) into one sealed [`MeshBuffer`] per LOD.
//! Any failure aborts the asset; no partial aggregate escapes.

use std::borrow::Cow;
use std::io::Read;
use std::ops::Deref;
use std::path::Path;

use glam::Vec2;
use tracing::{debug, info};

use crate::bones::{normalize_bone, RawBone};
use crate::entities::{
    normalize_attachment, normalize_hitbox_set, normalize_ik_chain, normalize_ik_lock,
    normalize_material, normalize_pose_param, normalize_seq_desc, normalize_skins, RawAttachment,
    RawHitboxSet, RawIkChain, RawIkLock, RawMaterial, RawPoseParam, RawSeqDesc,
};
use crate::error::{Error, Result};
use crate::meshbuf::MeshBufferWriter;
use crate::model::{BodyPart, LodData, MeshData, ModelData, ParsedModel};
use crate::studio::classic::{
    BodyPartClassic, BoneClassic, MaterialClassic, MeshClassic, ModelClassic, StudioHdrClassic,
    VtxBodyPart, VtxHeader, VtxLod, VtxMesh, VtxModel, VtxStrip, VtxStripGroup, VvdFixup,
    VvdHeader, VvdVertex, VvwHeader, VvwVertexInfo, OptVertex, BoneStateChange,
    STRIPGROUP_IS_HWSKINNED, VTX_VERSION, VVD_MAGIC, VVW_MAGIC,
};
use crate::studio::rtech::{
    BodyPartV16, BodyPartV8, BoneDataV16, BoneDataV19, BoneHdrV16, BoneV12_1, BoneV8,
    ExtraBoneWeight, LinearBones, MaterialV16, MaterialV8, ModelV16, ModelV8, StudioHdrV16,
    StudioHdrV8, VgHeader, VgLod, VgMesh, STUDIO_MAGIC, VG_MAGIC, VG_UV1,
};
use crate::studio::{cstr_at, inline_str, view, view_slice, GenericStudioHdr, Rec, StudioVersion};
use crate::vertex::{
    vertex_from_vg, vertex_from_vtx_classic, vertex_from_vtx_extended, Vertex, VertexWeight,
};

/// Owned byte buffer with 16-byte storage alignment, so typed views over
/// any naturally-aligned record offset succeed.
pub struct AlignedBuffer {
    words: Box<[u128]>,
    len: usize,
}

impl AlignedBuffer {
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        let words = vec![0u128; bytes.len().div_ceil(16)].into_boxed_slice();
        let mut buf = AlignedBuffer {
            words,
            len: bytes.len(),
        };
        bytemuck::cast_slice_mut::<u128, u8>(&mut buf.words)[..bytes.len()]
            .copy_from_slice(&bytes);
        buf
    }

    pub fn read_file(path: &Path) -> std::io::Result<Self> {
        let mut bytes = Vec::new();
        std::fs::File::open(path)?.read_to_end(&mut bytes)?;
        Ok(Self::from_vec(bytes))
    }

    pub fn as_slice(&self) -> &[u8] {
        &bytemuck::cast_slice(&self.words)[..self.len]
    }
}

impl Deref for AlignedBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

/// The loose companion files a classic-lineage model needs.
pub struct ClassicBuffers {
    pub vtx: AlignedBuffer,
    pub vvd: AlignedBuffer,
    pub vvw: Option<AlignedBuffer>,
}

impl ClassicBuffers {
    /// Open the companion files that live beside a studio file, trying the
    /// `.dx11.vtx` name before plain `.vtx`.
    pub fn open_beside(studio_path: &Path) -> std::io::Result<Self> {
        let vtx_path = {
            let dx11 = studio_path.with_extension("dx11.vtx");
            if dx11.exists() {
                dx11
            } else {
                studio_path.with_extension("vtx")
            }
        };
        let vvw_path = studio_path.with_extension("vvw");
        Ok(ClassicBuffers {
            vtx: AlignedBuffer::read_file(&vtx_path)?,
            vvd: AlignedBuffer::read_file(&studio_path.with_extension("vvd"))?,
            vvw: if vvw_path.exists() {
                Some(AlignedBuffer::read_file(&vvw_path)?)
            } else {
                None
            },
        })
    }
}

/// Detect the studio version from the first header bytes.
pub fn detect_version(buf: &[u8]) -> Result<StudioVersion> {
    let id = *view::<u32>(buf, 0)?;
    if id != STUDIO_MAGIC {
        return Err(Error::BadMagic(id));
    }
    let version = *view::<i32>(buf, 4)?;
    match version {
        52 | 53 => StudioVersion::from_header(version, 0),
        8 | 12 | 14 => {
            let sub_version = *view::<i32>(buf, 8)?;
            StudioVersion::from_header(version, sub_version)
        }
        // v16+ packs version and sub-version into two shorts
        _ => StudioVersion::from_header(version & 0xFFFF, version >> 16),
    }
}

/// Weight ceiling for classic meshes once a VVW side file is attached.
const MAX_EXTENDED_WEIGHTS: u16 = 16;

pub struct Loader<'a> {
    studio: &'a [u8],
    classic: Option<&'a ClassicBuffers>,
}

impl<'a> Loader<'a> {
    pub fn new(studio: &'a AlignedBuffer) -> Self {
        Loader {
            studio: studio.as_slice(),
            classic: None,
        }
    }

    /// Attach the loose vertex-data files a classic model needs.
    pub fn with_classic(mut self, buffers: &'a ClassicBuffers) -> Self {
        self.classic = Some(buffers);
        self
    }

    pub fn load(&self) -> Result<ParsedModel<'a>> {
        let version = detect_version(self.studio)?;
        let hdr = match version {
            v if v.is_classic() => generic_hdr_classic(self.studio, v)?,
            StudioVersion::V16 | StudioVersion::V17 | StudioVersion::V19 => {
                generic_hdr_v16(self.studio, version)?
            }
            _ => generic_hdr_v8(self.studio, version)?,
        };
        hdr.check_bounds(self.studio.len())?;

        let mut model = ParsedModel::new(hdr);
        self.load_bones(&mut model)?;
        self.load_entities(&mut model)?;
        self.load_materials(&mut model)?;

        if version.is_classic() {
            let buffers = self.classic.ok_or(Error::MissingVertexData)?;
            self.load_classic_geometry(&mut model, buffers)?;
        } else {
            self.load_vg_geometry(&mut model)?;
        }

        model.validate()?;
        info!(
            version = %model.hdr.version,
            name = %model.hdr.name,
            bones = model.bones.len(),
            lods = model.lods.len(),
            materials = model.materials.len(),
            "loaded studio model"
        );
        Ok(model)
    }

    fn load_bones(&self, model: &mut ParsedModel<'a>) -> Result<()> {
        let buf = self.studio;
        let hdr = &model.hdr;
        let mut bones = Vec::with_capacity(hdr.bone_count);

        let linear = if hdr.version.has_linear_bone_table() {
            hdr.linear_bone_offset
                .map(|at| LinearBones::read(buf, at))
                .transpose()?
        } else {
            None
        };

        for i in 0..hdr.bone_count {
            let raw = match hdr.version {
                StudioVersion::R1 | StudioVersion::R2 => {
                    RawBone::Classic(Rec::<BoneClassic>::index(buf, hdr.bone_offset, i)?)
                }
                StudioVersion::V8 => RawBone::V8(Rec::<BoneV8>::index(buf, hdr.bone_offset, i)?),
                StudioVersion::V12_1
                | StudioVersion::V12_2
                | StudioVersion::V12_4
                | StudioVersion::V14 => {
                    RawBone::V12(Rec::<BoneV12_1>::index(buf, hdr.bone_offset, i)?)
                }
                StudioVersion::V16 | StudioVersion::V17 => RawBone::Split {
                    hdr: Rec::<BoneHdrV16>::index(buf, hdr.bone_offset, i)?,
                    data: Rec::<BoneDataV16>::index(buf, hdr.bone_data_offset, i)?,
                },
                StudioVersion::V19 => RawBone::Linear {
                    hdr: Rec::<BoneHdrV16>::index(buf, hdr.bone_offset, i)?,
                    data: Rec::<BoneDataV19>::index(buf, hdr.bone_data_offset, i)?,
                    linear: linear.ok_or(Error::Truncated {
                        offset: 0,
                        needed: std::mem::size_of::<LinearBones>(),
                        len: buf.len(),
                    })?,
                    index: i,
                },
            };
            bones.push(normalize_bone(buf, raw)?);
        }
        debug!(bones = bones.len(), "normalized bone table");
        model.bones = bones;
        Ok(())
    }

    fn load_entities(&self, model: &mut ParsedModel<'a>) -> Result<()> {
        let buf = self.studio;
        let hdr = &model.hdr;
        let short = hdr.version.has_split_bones();

        for i in 0..hdr.local_attachment_count {
            let raw = match hdr.version {
                StudioVersion::R1 | StudioVersion::R2 => {
                    RawAttachment::Classic(Rec::index(buf, hdr.local_attachment_offset, i)?)
                }
                v if v.has_split_bones() => {
                    RawAttachment::V16(Rec::index(buf, hdr.local_attachment_offset, i)?)
                }
                _ => RawAttachment::V8(Rec::index(buf, hdr.local_attachment_offset, i)?),
            };
            model.attachments.push(normalize_attachment(buf, raw)?);
        }

        for i in 0..hdr.hitbox_set_count {
            let raw = match hdr.version {
                StudioVersion::R1 => {
                    RawHitboxSet::Classic(Rec::index(buf, hdr.hitbox_set_offset, i)?)
                }
                v if v.has_split_bones() => {
                    RawHitboxSet::V16(Rec::index(buf, hdr.hitbox_set_offset, i)?)
                }
                _ => RawHitboxSet::V8(Rec::index(buf, hdr.hitbox_set_offset, i)?),
            };
            model.hitbox_sets.push(normalize_hitbox_set(buf, raw)?);
        }

        // offset 0 means the version externalized the table; count 0 with a
        // live offset is an empty table
        if hdr.local_seq_offset != 0 {
            let mut seqs = Vec::with_capacity(hdr.local_seq_count);
            for i in 0..hdr.local_seq_count {
                let raw = if short {
                    RawSeqDesc::V16(Rec::index(buf, hdr.local_seq_offset, i)?)
                } else {
                    RawSeqDesc::V8(Rec::index(buf, hdr.local_seq_offset, i)?)
                };
                seqs.push(normalize_seq_desc(buf, raw)?);
            }
            model.sequences = Some(seqs);
        }

        if hdr.pose_param_offset != 0 {
            let mut params = Vec::with_capacity(hdr.pose_param_count);
            for i in 0..hdr.pose_param_count {
                let raw = if short {
                    RawPoseParam::V16(Rec::index(buf, hdr.pose_param_offset, i)?)
                } else {
                    RawPoseParam::V8(Rec::index(buf, hdr.pose_param_offset, i)?)
                };
                params.push(normalize_pose_param(buf, raw)?);
            }
            model.pose_params = Some(params);
        }

        if hdr.ik_chain_offset != 0 {
            let mut chains = Vec::with_capacity(hdr.ik_chain_count);
            for i in 0..hdr.ik_chain_count {
                let raw = if short {
                    RawIkChain::V16(Rec::index(buf, hdr.ik_chain_offset, i)?)
                } else {
                    RawIkChain::V8(Rec::index(buf, hdr.ik_chain_offset, i)?)
                };
                chains.push(normalize_ik_chain(buf, raw)?);
            }
            model.ik_chains = Some(chains);
        }

        if hdr.ik_lock_offset != 0 {
            let mut locks = Vec::with_capacity(hdr.ik_lock_count);
            for i in 0..hdr.ik_lock_count {
                let raw = if short {
                    RawIkLock::V16(Rec::index(buf, hdr.ik_lock_offset, i)?)
                } else {
                    RawIkLock::V8(Rec::index(buf, hdr.ik_lock_offset, i)?)
                };
                locks.push(normalize_ik_lock(raw));
            }
            model.ik_locks = Some(locks);
        }

        Ok(())
    }

    fn load_materials(&self, model: &mut ParsedModel<'a>) -> Result<()> {
        let buf = self.studio;
        let hdr = &model.hdr;

        for i in 0..hdr.texture_count {
            let raw = match hdr.version {
                StudioVersion::R1 | StudioVersion::R2 => {
                    RawMaterial::Classic(Rec::<MaterialClassic>::index(buf, hdr.texture_offset, i)?)
                }
                v if v.has_split_bones() => {
                    RawMaterial::V16(Rec::<MaterialV16>::index(buf, hdr.texture_offset, i)?)
                }
                _ => RawMaterial::V8(Rec::<MaterialV8>::index(buf, hdr.texture_offset, i)?),
            };
            model.materials.push(normalize_material(buf, raw)?);
        }

        if hdr.skin_offset != 0 && hdr.skin_family_count > 0 {
            model.skins = normalize_skins(
                buf,
                hdr.skin_offset,
                hdr.skin_family_count,
                hdr.skin_ref_count,
            )?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Classic geometry (VTX + VVD + optional VVW)
    // -----------------------------------------------------------------------

    fn load_classic_geometry(
        &self,
        model: &mut ParsedModel<'a>,
        buffers: &ClassicBuffers,
    ) -> Result<()> {
        let buf = self.studio;
        let hdr = &model.hdr;
        let vvd = buffers.vvd.as_slice();
        let vtx = buffers.vtx.as_slice();

        let vvd_hdr: &VvdHeader = view(vvd, 0)?;
        if vvd_hdr.id != VVD_MAGIC {
            return Err(Error::BadMagic(vvd_hdr.id));
        }
        if vvd_hdr.checksum != hdr.checksum {
            return Err(Error::ChecksumMismatch {
                expected: hdr.checksum,
                found: vvd_hdr.checksum,
            });
        }

        let vtx_hdr: &VtxHeader = view(vtx, 0)?;
        let vtx_version = vtx_hdr.version;
        if vtx_version != VTX_VERSION {
            return Err(Error::UnsupportedVersion {
                version: vtx_version,
                sub_version: 0,
            });
        }
        let vtx_checksum = vtx_hdr.checksum;
        if vtx_checksum != hdr.checksum {
            return Err(Error::ChecksumMismatch {
                expected: hdr.checksum,
                found: vtx_checksum,
            });
        }

        let vvw = match &buffers.vvw {
            Some(b) => {
                let w: &VvwHeader = view(b.as_slice(), 0)?;
                if w.id != VVW_MAGIC {
                    return Err(Error::BadMagic(w.id));
                }
                if w.checksum != hdr.checksum {
                    return Err(Error::ChecksumMismatch {
                        expected: hdr.checksum,
                        found: w.checksum,
                    });
                }
                let info: &[VvwVertexInfo] =
                    view_slice(b.as_slice(), w.vertex_info_offset as usize, w.vertex_count as usize)?;
                let weights: &[ExtraBoneWeight] = view_slice(
                    b.as_slice(),
                    w.extra_weight_offset as usize,
                    w.extra_weight_count as usize,
                )?;
                Some((info, weights))
            }
            None => None,
        };

        let root_verts: &[VvdVertex] = view_slice(
            vvd,
            vvd_hdr.vertex_offset as usize,
            vvd_hdr.lod_vertex_count[0] as usize,
        )?;
        let fixups: &[VvdFixup] = view_slice(
            vvd,
            vvd_hdr.fixup_offset as usize,
            vvd_hdr.fixup_count as usize,
        )?;

        let lod_count = vtx_hdr.lod_count as usize;
        let body_part_count = vtx_hdr.body_part_count as usize;
        let vtx_body_base = vtx_hdr.body_part_offset as usize;
        let vert_cache_size = vtx_hdr.vert_cache_size as u16;

        // the studio and VTX body-part tables walk in lockstep
        model.body_parts = (0..hdr.body_part_count)
            .map(|_| BodyPart::unnamed())
            .collect();

        for lod in 0..lod_count {
            let lod_verts = lod_vertices(root_verts, fixups, vvd_hdr, lod)?;

            let mut writer = MeshBufferWriter::new();
            let mut vertices: Vec<Vertex> = Vec::new();
            let mut indices: Vec<u16> = Vec::new();
            let mut weights: Vec<VertexWeight> = Vec::new();

            let mut models: Vec<ModelData> = Vec::new();
            let mut meshes: Vec<MeshData> = Vec::new();
            let mut max_weights: u16 = 0;
            let mut switch_point = 0.0f32;

            for bp in 0..hdr.body_part_count.min(body_part_count) {
                let sbp = Rec::<BodyPartClassic>::index(buf, hdr.body_part_offset, bp)?;
                let vbp = Rec::<VtxBodyPart>::index(vtx, vtx_body_base, bp)?;
                if lod == 0 {
                    model.body_parts[bp].setup(
                        cstr_at(buf, sbp.rel(sbp.rec.name_offset as i64))?,
                        models.len() as i32,
                        sbp.rec.model_count,
                    );
                }

                let vbp_models = vbp.rec.model_offset;
                for m in 0..sbp.rec.model_count.min(vbp.rec.model_count) as usize {
                    let smodel =
                        Rec::<ModelClassic>::index(buf, sbp.rel(sbp.rec.model_offset as i64), m)?;
                    let vmodel = Rec::<VtxModel>::index(vtx, vbp.rel(vbp_models as i64), m)?;
                    let vlod =
                        Rec::<VtxLod>::index(vtx, vmodel.rel(vmodel.rec.lod_offset as i64), lod)?;
                    switch_point = vlod.rec.switch_point;

                    let model_vert_base =
                        smodel.rec.vertex_offset as usize / std::mem::size_of::<VvdVertex>();
                    let mesh_index = meshes.len();
                    let mut model_vertex_count = 0u32;

                    let vlod_meshes = vlod.rec.mesh_offset;
                    for me in 0..smodel.rec.mesh_count.min(vlod.rec.mesh_count) as usize {
                        let smesh = Rec::<MeshClassic>::index(
                            buf,
                            smodel.rel(smodel.rec.mesh_offset as i64),
                            me,
                        )?;
                        let vmesh =
                            Rec::<VtxMesh>::index(vtx, vlod.rel(vlod_meshes as i64), me)?;

                        let mesh_verts = lod_verts
                            .get(model_vert_base + smesh.rec.vertex_index_start as usize..)
                            .unwrap_or(&[]);

                        let weights_before = weights.len();
                        let mut mesh = MeshData {
                            vertex_data_index: meshes.len(),
                            index_count: 0,
                            vertex_count: 0,
                            vert_cache_size,
                            weights_per_vert: crate::studio::classic::MAX_INLINE_WEIGHTS as u16,
                            weights_count: 0,
                            weights_index: weights_before as u32,
                            texcoord_count: 1,
                            texcoord_indices: 1,
                            material_id: smesh.rec.material,
                            material: usize::try_from(smesh.rec.material)
                                .ok()
                                .filter(|&i| i < model.materials.len()),
                            body_part_index: bp as i32,
                        };
                        if vvw.is_some() {
                            // extended weights lift the inline cap
                            mesh.weights_per_vert = MAX_EXTENDED_WEIGHTS;
                        }

                        let sg_base = vmesh.rel(vmesh.rec.strip_group_offset as i64);
                        for sg in 0..vmesh.rec.strip_group_count as usize {
                            let group = Rec::<VtxStripGroup>::index(vtx, sg_base, sg)?;
                            decode_strip_group(
                                &mut StripGroupCtx {
                                    vtx,
                                    group,
                                    mesh: &mesh,
                                    mesh_verts,
                                    vvw,
                                    vertices: &mut vertices,
                                    indices: &mut indices,
                                    weights: &mut weights,
                                },
                            )?;
                            mesh.vertex_count += group.rec.vertex_count as u32;
                            mesh.index_count += group.rec.index_count as u32;
                        }
                        mesh.weights_count = (weights.len() - weights_before) as u32;
                        max_weights = max_weights.max(mesh.weights_per_vert);
                        model_vertex_count += mesh.vertex_count;
                        meshes.push(mesh);
                    }

                    models.push(ModelData {
                        name: inline_str(&smodel.rec.name)?.to_owned(),
                        mesh_index,
                        mesh_count: smodel.rec.mesh_count as u32,
                        vertex_count: model_vertex_count,
                    });
                }
            }

            writer.add_indices(&indices)?;
            writer.add_vertices(&vertices)?;
            writer.add_weights(&weights)?;

            debug!(
                lod,
                vertices = vertices.len(),
                indices = indices.len(),
                "decoded classic lod"
            );
            model.lods.push(LodData {
                models,
                meshes,
                vertex_count: vertices.len(),
                index_count: indices.len(),
                switch_point,
                texcoords_per_vert: 1,
                weights_per_vert: max_weights,
            });
            model.mesh_buffers.push(writer.seal());
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // rtech geometry (baked VG block)
    // -----------------------------------------------------------------------

    fn load_vg_geometry(&self, model: &mut ParsedModel<'a>) -> Result<()> {
        let buf = self.studio;
        let hdr = &model.hdr;
        if hdr.hw_data_offset == 0 || hdr.hw_data_size == 0 {
            return Ok(());
        }
        let vg = buf
            .get(hdr.hw_data_offset..hdr.hw_data_offset + hdr.hw_data_size)
            .ok_or(Error::Truncated {
                offset: hdr.hw_data_offset,
                needed: hdr.hw_data_size,
                len: buf.len(),
            })?;

        let vg_hdr: &VgHeader = view(vg, 0)?;
        if vg_hdr.id != VG_MAGIC {
            return Err(Error::BadMagic(vg_hdr.id));
        }

        let bone_map: Cow<[u8]> = if vg_hdr.bone_remap_count > 0 {
            Cow::Borrowed(view_slice(
                vg,
                vg_hdr.bone_remap_offset as usize,
                vg_hdr.bone_remap_count as usize,
            )?)
        } else {
            Cow::Owned((0..=u8::MAX).collect())
        };

        self.load_body_parts(model)?;

        // the studio model/mesh tables are shared by every LOD
        let (lod_models, mesh_owners) = self.lod_models(model.hdr.version)?;

        for lod_i in 0..vg_hdr.lod_count as usize {
            let lod = Rec::<VgLod>::index(vg, vg_hdr.lod_offset as usize, lod_i)?;

            let mut writer = MeshBufferWriter::new();
            let mut vertices: Vec<Vertex> = Vec::with_capacity(lod.rec.vertex_count as usize);
            let mut indices: Vec<u16> = Vec::with_capacity(lod.rec.index_count as usize);
            let mut weights: Vec<VertexWeight> = Vec::new();
            let mut texcoords: Vec<Vec2> = Vec::new();
            let mut meshes: Vec<MeshData> = Vec::new();
            let mut max_weights: u16 = 0;
            let mut max_texcoords: u16 = 1;

            for mesh_i in 0..lod.rec.mesh_count as usize {
                let vm: &VgMesh = Rec::<VgMesh>::index(vg, lod.rec.mesh_offset as usize, mesh_i)?.rec;
                let vertex_base = vertices.len() as u32;
                let weights_before = weights.len();

                let raw_verts = vg
                    .get(
                        vm.vertex_offset as usize
                            ..vm.vertex_offset as usize
                                + vm.vertex_count as usize * vm.vertex_stride as usize,
                    )
                    .ok_or(Error::Truncated {
                        offset: vm.vertex_offset as usize,
                        needed: vm.vertex_count as usize * vm.vertex_stride as usize,
                        len: vg.len(),
                    })?;
                let mesh_indices: &[u16] =
                    view_slice(vg, vm.index_offset as usize, vm.index_count as usize)?;
                let extra: &[ExtraBoneWeight] = view_slice(
                    vg,
                    vm.extra_weight_offset as usize,
                    vm.extra_weight_count as usize,
                )?;

                let mesh = MeshData {
                    vertex_data_index: meshes.len(),
                    index_count: vm.index_count,
                    vertex_count: vm.vertex_count,
                    vert_cache_size: 0,
                    weights_per_vert: vm.weights_per_vert,
                    weights_count: 0,
                    weights_index: weights_before as u32,
                    texcoord_count: vm.texcoord_count as i16,
                    texcoord_indices: if vm.flags & VG_UV1 != 0 { 0b11 } else { 0b1 },
                    material_id: vm.material,
                    material: usize::try_from(vm.material)
                        .ok()
                        .filter(|&i| i < model.materials.len()),
                    body_part_index: mesh_owners.get(mesh_i).copied().unwrap_or(0),
                };

                let mut extra_cursor = 0usize;
                for v in 0..vm.vertex_count as usize {
                    let raw = &raw_verts[v * vm.vertex_stride as usize..];
                    vertices.push(vertex_from_vg(
                        &mesh,
                        vm.flags,
                        raw,
                        &bone_map,
                        extra,
                        &mut extra_cursor,
                        &mut weights,
                        &mut texcoords,
                    )?);
                }
                for &idx in mesh_indices {
                    // indices are rebased onto the merged per-LOD vertex
                    // stream, which can outgrow the 16-bit index space
                    let merged = vertex_base + idx as u32;
                    indices
                        .push(u16::try_from(merged).map_err(|_| Error::IndexRange {
                            index: merged,
                        })?);
                }

                let mut mesh = mesh;
                mesh.weights_count = (weights.len() - weights_before) as u32;
                max_weights = max_weights.max(mesh.weights_per_vert);
                max_texcoords = max_texcoords.max(mesh.texcoord_count.max(1) as u16);
                meshes.push(mesh);
            }

            writer.add_indices(&indices)?;
            writer.add_vertices(&vertices)?;
            writer.add_weights(&weights)?;
            writer.add_texcoords(&texcoords)?;

            debug!(
                lod = lod_i,
                vertices = vertices.len(),
                indices = indices.len(),
                "decoded vg lod"
            );
            model.lods.push(LodData {
                models: lod_models.clone(),
                meshes,
                vertex_count: vertices.len(),
                index_count: indices.len(),
                switch_point: lod.rec.switch_point,
                texcoords_per_vert: max_texcoords,
                weights_per_vert: max_weights,
            });
            model.mesh_buffers.push(writer.seal());
        }
        Ok(())
    }

    fn load_body_parts(&self, model: &mut ParsedModel<'a>) -> Result<()> {
        let buf = self.studio;
        let hdr = &model.hdr;
        model.body_parts = (0..hdr.body_part_count)
            .map(|_| BodyPart::unnamed())
            .collect();
        let mut model_cursor = 0i32;
        for bp in 0..hdr.body_part_count {
            if hdr.version.has_split_bones() {
                let r = Rec::<BodyPartV16>::index(buf, hdr.body_part_offset, bp)?;
                model.body_parts[bp].setup(
                    cstr_at(buf, r.rel(r.rec.name_offset as i64))?,
                    model_cursor,
                    r.rec.model_count as i32,
                );
                model_cursor += r.rec.model_count as i32;
            } else {
                let r = Rec::<BodyPartV8>::index(buf, hdr.body_part_offset, bp)?;
                model.body_parts[bp].setup(
                    cstr_at(buf, r.rel(r.rec.name_offset as i64))?,
                    model_cursor,
                    r.rec.model_count,
                );
                model_cursor += r.rec.model_count;
            }
        }
        Ok(())
    }

    /// Model list for the rtech lineage (shared by every LOD, mesh ranges
    /// assigned in declaration order), plus the owning body-part index of
    /// each mesh in that order.
    fn lod_models(&self, version: StudioVersion) -> Result<(Vec<ModelData>, Vec<i32>)> {
        let buf = self.studio;
        let mut out = Vec::new();
        let mut owners = Vec::new();
        let hdr_bp_count;
        let hdr_bp_offset;
        {
            // reparse the body-part table; the generic header keeps only
            // offsets, not the per-part model tables
            let hdr = match version {
                v if v.is_classic() => return Ok((out, owners)),
                StudioVersion::V16 | StudioVersion::V17 | StudioVersion::V19 => {
                    generic_hdr_v16(buf, version)?
                }
                _ => generic_hdr_v8(buf, version)?,
            };
            hdr_bp_count = hdr.body_part_count;
            hdr_bp_offset = hdr.body_part_offset;
        }

        let mut mesh_cursor = 0usize;
        for bp in 0..hdr_bp_count {
            if version.has_split_bones() {
                let r = Rec::<BodyPartV16>::index(buf, hdr_bp_offset, bp)?;
                for m in 0..r.rec.model_count as usize {
                    let mo = Rec::<ModelV16>::index(buf, r.rel(r.rec.model_offset as i64), m)?;
                    out.push(ModelData {
                        name: cstr_at(buf, mo.rel(mo.rec.name_offset as i64))?.to_owned(),
                        mesh_index: mesh_cursor,
                        mesh_count: mo.rec.mesh_count as u32,
                        vertex_count: mo.rec.vertex_count as u32,
                    });
                    mesh_cursor += mo.rec.mesh_count as usize;
                    owners.resize(mesh_cursor, bp as i32);
                }
            } else {
                let r = Rec::<BodyPartV8>::index(buf, hdr_bp_offset, bp)?;
                for m in 0..r.rec.model_count as usize {
                    let mo = Rec::<ModelV8>::index(buf, r.rel(r.rec.model_offset as i64), m)?;
                    out.push(ModelData {
                        name: cstr_at(buf, mo.rel(mo.rec.name_offset as i64))?.to_owned(),
                        mesh_index: mesh_cursor,
                        mesh_count: mo.rec.mesh_count as u32,
                        vertex_count: mo.rec.vertex_count as u32,
                    });
                    mesh_cursor += mo.rec.mesh_count as usize;
                    owners.resize(mesh_cursor, bp as i32);
                }
            }
        }
        Ok((out, owners))
    }
}

/// Context for decoding one VTX strip group into the LOD accumulators.
struct StripGroupCtx<'s> {
    vtx: &'s [u8],
    group: Rec<'s, VtxStripGroup>,
    mesh: &'s MeshData,
    mesh_verts: &'s [VvdVertex],
    vvw: Option<(&'s [VvwVertexInfo], &'s [ExtraBoneWeight])>,
    vertices: &'s mut Vec<Vertex>,
    indices: &'s mut Vec<u16>,
    weights: &'s mut Vec<VertexWeight>,
}

fn decode_strip_group(ctx: &mut StripGroupCtx<'_>) -> Result<()> {
    let group = ctx.group;
    let g = group.rec;
    let vertex_base = ctx.vertices.len() as u32;
    let hw_skinned = g.flags & STRIPGROUP_IS_HWSKINNED != 0;
    let opt_base = group.rel(g.vertex_offset as i64);
    let group_vert_count = g.vertex_count as usize;

    if hw_skinned {
        // each strip carries its own bone-state table; decode its vertex
        // span with that table
        let mut decoded = vec![false; group_vert_count];
        for s in 0..g.strip_count as usize {
            let strip = Rec::<VtxStrip>::index(ctx.vtx, group.rel(g.strip_offset as i64), s)?;
            let st = strip.rec;
            let states: &[BoneStateChange] = view_slice(
                ctx.vtx,
                strip.rel(st.bone_state_change_offset as i64),
                st.bone_state_change_count as usize,
            )?;
            let first = st.vertex_offset as usize;
            let count = st.vertex_count as usize;
            for v in first..(first + count).min(group_vert_count) {
                if decoded[v] {
                    continue;
                }
                decoded[v] = true;
                let opt = Rec::<OptVertex>::index(ctx.vtx, opt_base, v)?;
                let vert = decode_classic_vertex(ctx, opt.rec, true, states)?;
                // strips can visit vertices out of order; keep table order
                let slot = vertex_base as usize + v;
                if slot == ctx.vertices.len() {
                    ctx.vertices.push(vert);
                } else {
                    grow_to(ctx.vertices, slot);
                    ctx.vertices[slot] = vert;
                }
            }
        }
        // vertices no strip claimed still need a slot
        for (v, done) in decoded.iter().enumerate() {
            if !done {
                let opt = Rec::<OptVertex>::index(ctx.vtx, opt_base, v)?;
                let vert = decode_classic_vertex(ctx, opt.rec, false, &[])?;
                let slot = vertex_base as usize + v;
                grow_to(ctx.vertices, slot);
                ctx.vertices[slot] = vert;
            }
        }
    } else {
        for v in 0..group_vert_count {
            let opt = Rec::<OptVertex>::index(ctx.vtx, opt_base, v)?;
            let vert = decode_classic_vertex(ctx, opt.rec, false, &[])?;
            ctx.vertices.push(vert);
        }
    }

    let index_base = group.rel(g.index_offset as i64);
    let list: &[u16] = view_slice(ctx.vtx, index_base, g.index_count as usize)?;
    for &idx in list {
        let merged = vertex_base + idx as u32;
        ctx.indices
            .push(u16::try_from(merged).map_err(|_| Error::IndexRange {
                index: merged,
            })?);
    }
    Ok(())
}

fn decode_classic_vertex(
    ctx: &mut StripGroupCtx<'_>,
    opt: &OptVertex,
    hw_skinned: bool,
    states: &[BoneStateChange],
) -> Result<Vertex> {
    match ctx.vvw {
        Some((info, extra)) => {
            vertex_from_vtx_extended(ctx.mesh, opt, ctx.mesh_verts, info, extra, ctx.weights)
        }
        None => {
            vertex_from_vtx_classic(ctx.mesh, opt, ctx.mesh_verts, hw_skinned, states, ctx.weights)
        }
    }
}

fn grow_to(vertices: &mut Vec<Vertex>, slot: usize) {
    if slot >= vertices.len() {
        vertices.resize(slot + 1, Vertex::new(glam::Vec3::ZERO, 0, 0, Vec2::ZERO, 0, 0));
    }
}

/// Resolve the vertex table a LOD sees, applying VVD fixups when present.
fn lod_vertices<'v>(
    root: &'v [VvdVertex],
    fixups: &[VvdFixup],
    hdr: &VvdHeader,
    lod: usize,
) -> Result<Cow<'v, [VvdVertex]>> {
    if lod >= hdr.lod_count.max(1) as usize {
        return Err(Error::LodRange {
            lod,
            count: hdr.lod_count as usize,
        });
    }
    if fixups.is_empty() {
        let count = hdr.lod_vertex_count[lod] as usize;
        return Ok(Cow::Borrowed(root.get(..count).ok_or(Error::Truncated {
            offset: 0,
            needed: count,
            len: root.len(),
        })?));
    }
    let mut out = Vec::new();
    for fixup in fixups {
        if (fixup.lod as usize) < lod {
            continue;
        }
        let start = fixup.source_vertex_id as usize;
        let count = fixup.vertex_count as usize;
        out.extend_from_slice(root.get(start..start + count).ok_or(Error::Truncated {
            offset: start,
            needed: count,
            len: root.len(),
        })?);
    }
    Ok(Cow::Owned(out))
}

// ---------------------------------------------------------------------------
// Generic header construction
// ---------------------------------------------------------------------------

fn generic_hdr_classic(buf: &[u8], version: StudioVersion) -> Result<GenericStudioHdr> {
    let h: &StudioHdrClassic = view(buf, 0)?;
    let mut g = GenericStudioHdr::new(version);
    g.checksum = h.checksum;
    g.flags = h.flags;
    g.name = inline_str(&h.name)?.to_owned();
    g.bone_count = h.bone_count.max(0) as usize;
    g.bone_offset = h.bone_offset.max(0) as usize;
    g.bone_data_offset = g.bone_offset;
    g.hitbox_set_count = h.hitbox_set_count.max(0) as usize;
    g.hitbox_set_offset = h.hitbox_set_offset.max(0) as usize;
    g.local_attachment_count = h.local_attachment_count.max(0) as usize;
    g.local_attachment_offset = h.local_attachment_offset.max(0) as usize;
    g.skin_ref_count = h.skin_ref_count.max(0) as usize;
    g.skin_family_count = h.skin_family_count.max(0) as usize;
    g.skin_offset = h.skin_offset.max(0) as usize;
    g.body_part_count = h.body_part_count.max(0) as usize;
    g.body_part_offset = h.body_part_offset.max(0) as usize;
    g.local_seq_count = h.local_seq_count.max(0) as usize;
    g.local_seq_offset = h.local_seq_offset.max(0) as usize;
    g.pose_param_count = h.pose_param_count.max(0) as usize;
    g.pose_param_offset = h.pose_param_offset.max(0) as usize;
    g.ik_chain_count = h.ik_chain_count.max(0) as usize;
    g.ik_chain_offset = h.ik_chain_offset.max(0) as usize;
    g.ik_lock_count = h.ik_lock_count.max(0) as usize;
    g.ik_lock_offset = h.ik_lock_offset.max(0) as usize;
    g.texture_count = h.texture_count.max(0) as usize;
    g.texture_offset = h.texture_offset.max(0) as usize;
    g.surface_prop_offset = h.surface_prop_offset.max(0) as usize;
    Ok(g)
}

fn generic_hdr_v8(buf: &[u8], version: StudioVersion) -> Result<GenericStudioHdr> {
    let h: &StudioHdrV8 = view(buf, 0)?;
    let mut g = GenericStudioHdr::new(version);
    g.checksum = h.checksum;
    g.flags = h.flags;
    g.name = inline_str(&h.name)?.to_owned();
    g.bone_count = h.bone_count.max(0) as usize;
    g.bone_offset = h.bone_offset.max(0) as usize;
    g.bone_data_offset = g.bone_offset;
    g.hitbox_set_count = h.hitbox_set_count.max(0) as usize;
    g.hitbox_set_offset = h.hitbox_set_offset.max(0) as usize;
    g.local_attachment_count = h.local_attachment_count.max(0) as usize;
    g.local_attachment_offset = h.local_attachment_offset.max(0) as usize;
    g.skin_ref_count = h.skin_ref_count.max(0) as usize;
    g.skin_family_count = h.skin_family_count.max(0) as usize;
    g.skin_offset = h.skin_offset.max(0) as usize;
    g.body_part_count = h.body_part_count.max(0) as usize;
    g.body_part_offset = h.body_part_offset.max(0) as usize;
    g.local_seq_count = h.local_seq_count.max(0) as usize;
    g.local_seq_offset = h.local_seq_offset.max(0) as usize;
    g.pose_param_count = h.pose_param_count.max(0) as usize;
    g.pose_param_offset = h.pose_param_offset.max(0) as usize;
    g.ik_chain_count = h.ik_chain_count.max(0) as usize;
    g.ik_chain_offset = h.ik_chain_offset.max(0) as usize;
    g.ik_lock_count = h.ik_lock_count.max(0) as usize;
    g.ik_lock_offset = h.ik_lock_offset.max(0) as usize;
    g.texture_count = h.texture_count.max(0) as usize;
    g.texture_offset = h.texture_offset.max(0) as usize;
    g.surface_prop_offset = h.surface_prop_offset.max(0) as usize;
    g.hw_data_offset = h.hw_data_offset.max(0) as usize;
    g.hw_data_size = h.hw_data_size.max(0) as usize;
    Ok(g)
}

fn generic_hdr_v16(buf: &[u8], version: StudioVersion) -> Result<GenericStudioHdr> {
    let h: &StudioHdrV16 = view(buf, 0)?;
    let mut g = GenericStudioHdr::new(version);
    g.checksum = h.checksum;
    g.flags = h.flags;
    g.name = cstr_at(buf, h.name_offset as usize)?.to_owned();
    g.bone_count = h.bone_count as usize;
    g.bone_offset = h.bone_hdr_offset as usize;
    g.bone_data_offset = h.bone_data_offset as usize;
    if version.has_linear_bone_table() && h.linear_bone_offset != 0 {
        g.linear_bone_offset = Some(h.linear_bone_offset as usize);
    }
    g.hitbox_set_count = h.hitbox_set_count as usize;
    g.hitbox_set_offset = h.hitbox_set_offset as usize;
    g.local_attachment_count = h.local_attachment_count as usize;
    g.local_attachment_offset = h.local_attachment_offset as usize;
    g.skin_ref_count = h.skin_ref_count as usize;
    g.skin_family_count = h.skin_family_count as usize;
    g.skin_offset = h.skin_offset as usize;
    g.body_part_count = h.body_part_count as usize;
    g.body_part_offset = h.body_part_offset as usize;
    g.local_seq_count = h.local_seq_count as usize;
    g.local_seq_offset = h.local_seq_offset as usize;
    g.pose_param_count = h.pose_param_count as usize;
    g.pose_param_offset = h.pose_param_offset as usize;
    g.ik_chain_count = h.ik_chain_count as usize;
    g.ik_chain_offset = h.ik_chain_offset as usize;
    g.ik_lock_count = h.ik_lock_count as usize;
    g.ik_lock_offset = h.ik_lock_offset as usize;
    g.texture_count = h.texture_count as usize;
    g.texture_offset = h.texture_offset as usize;
    g.surface_prop_offset = h.surface_prop_offset as usize;
    g.hw_data_offset = h.hw_data_offset as usize;
    g.hw_data_size = h.hw_data_size as usize;
    Ok(g)
}
