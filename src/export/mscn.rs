//! MSCN binary scene-interchange exporter.
//!
//! Little-endian, fixed-size header followed by a name table, a bone
//! table, a material table, and the four mesh streams copied straight from
//! the LOD's sealed mesh buffer. Absent streams are recorded as offset 0.
//!
//! # Layout
//! ```text
//! 0x00: MscnHeader
//! 0x40: name table (nul-terminated strings, bones then materials)
//! var:  bone table   (MscnBone   * bone_count)
//! var:  material table (MscnMaterial * material_count)
//! var:  index/vertex/weight/texcoord streams, in that order
//! ```

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use bytemuck::cast_slice;

use crate::model::ParsedModel;

pub const MSCN_MAGIC: u32 = 0x4E43_534D; // "MSCN"
pub const MSCN_VERSION: u32 = 1;

/// MSCN header (64 bytes)
#[derive(Debug, Clone, Copy, Default)]
#[repr(C)]
pub struct MscnHeader {
    pub magic: u32,
    pub version: u32,
    pub bone_count: u32,
    pub material_count: u32,
    pub name_table_offset: u32,
    pub name_table_size: u32,
    pub bone_table_offset: u32,
    pub material_table_offset: u32,
    pub index_offset: u32,
    pub index_count: u32,
    pub vertex_offset: u32,
    pub vertex_count: u32,
    pub weight_offset: u32,
    pub weight_count: u32,
    pub texcoord_offset: u32,
    pub texcoord_count: u32,
}

impl MscnHeader {
    pub const SIZE: usize = 64;

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let fields = [
            self.magic,
            self.version,
            self.bone_count,
            self.material_count,
            self.name_table_offset,
            self.name_table_size,
            self.bone_table_offset,
            self.material_table_offset,
            self.index_offset,
            self.index_count,
            self.vertex_offset,
            self.vertex_count,
            self.weight_offset,
            self.weight_count,
            self.texcoord_offset,
            self.texcoord_count,
        ];
        let mut bytes = [0u8; Self::SIZE];
        for (i, f) in fields.iter().enumerate() {
            bytes[i * 4..i * 4 + 4].copy_from_slice(&f.to_le_bytes());
        }
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        let field = |i: usize| {
            u32::from_le_bytes([bytes[i * 4], bytes[i * 4 + 1], bytes[i * 4 + 2], bytes[i * 4 + 3]])
        };
        let hdr = MscnHeader {
            magic: field(0),
            version: field(1),
            bone_count: field(2),
            material_count: field(3),
            name_table_offset: field(4),
            name_table_size: field(5),
            bone_table_offset: field(6),
            material_table_offset: field(7),
            index_offset: field(8),
            index_count: field(9),
            vertex_offset: field(10),
            vertex_count: field(11),
            weight_offset: field(12),
            weight_count: field(13),
            texcoord_offset: field(14),
            texcoord_count: field(15),
        };
        (hdr.magic == MSCN_MAGIC).then_some(hdr)
    }
}

/// MSCN bone record (48 bytes): name-table-relative name, parent, local TRS.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct MscnBone {
    pub name_offset: u32,
    pub parent: i32,
    pub pos: [f32; 3],
    pub quat: [f32; 4],
    pub scale: [f32; 3],
}

impl MscnBone {
    pub const SIZE: usize = 48;

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..4].copy_from_slice(&self.name_offset.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.parent.to_le_bytes());
        let mut at = 8;
        for f in self.pos.iter().chain(&self.quat).chain(&self.scale) {
            bytes[at..at + 4].copy_from_slice(&f.to_le_bytes());
            at += 4;
        }
        bytes
    }
}

/// MSCN material record (12 bytes).
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct MscnMaterial {
    pub name_offset: u32,
    pub guid: u64,
}

impl MscnMaterial {
    pub const SIZE: usize = 12;

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..4].copy_from_slice(&self.name_offset.to_le_bytes());
        bytes[4..12].copy_from_slice(&self.guid.to_le_bytes());
        bytes
    }
}

/// Serialize one LOD as an MSCN scene.
pub fn write_mscn<W: Write>(w: &mut W, model: &ParsedModel<'_>, lod: usize) -> Result<()> {
    let buffer = model.mesh_buffer(lod)?;

    // name table first so record name offsets are known up front
    let mut names = Vec::new();
    let mut bone_names = Vec::with_capacity(model.bones.len());
    for bone in &model.bones {
        bone_names.push(names.len() as u32);
        names.extend_from_slice(bone.name.as_bytes());
        names.push(0);
    }
    let mut material_names = Vec::with_capacity(model.materials.len());
    for mat in &model.materials {
        material_names.push(names.len() as u32);
        names.extend_from_slice(mat.name(false).as_bytes());
        names.push(0);
    }

    let indices = buffer.indices().unwrap_or(&[]);
    let vertices = buffer.vertices().unwrap_or(&[]);
    let weights = buffer.weights().unwrap_or(&[]);
    let texcoords = buffer.texcoords().unwrap_or(&[]);

    let name_table_offset = MscnHeader::SIZE as u32;
    let bone_table_offset = name_table_offset + names.len() as u32;
    let material_table_offset = bone_table_offset + (model.bones.len() * MscnBone::SIZE) as u32;
    let mut cursor =
        material_table_offset + (model.materials.len() * MscnMaterial::SIZE) as u32;

    let mut place = |bytes: usize| -> u32 {
        if bytes == 0 {
            return 0;
        }
        let at = cursor;
        cursor += bytes as u32;
        at
    };
    let index_offset = place(std::mem::size_of_val(indices));
    let vertex_offset = place(std::mem::size_of_val(vertices));
    let weight_offset = place(std::mem::size_of_val(weights));
    let texcoord_offset = place(std::mem::size_of_val(texcoords));

    let header = MscnHeader {
        magic: MSCN_MAGIC,
        version: MSCN_VERSION,
        bone_count: model.bones.len() as u32,
        material_count: model.materials.len() as u32,
        name_table_offset,
        name_table_size: names.len() as u32,
        bone_table_offset,
        material_table_offset,
        index_offset,
        index_count: indices.len() as u32,
        vertex_offset,
        vertex_count: vertices.len() as u32,
        weight_offset,
        weight_count: weights.len() as u32,
        texcoord_offset,
        texcoord_count: texcoords.len() as u32,
    };
    w.write_all(&header.to_bytes())?;
    w.write_all(&names)?;

    for (bone, &name_offset) in model.bones.iter().zip(&bone_names) {
        let record = MscnBone {
            name_offset,
            parent: bone.parent,
            pos: bone.pos.to_array(),
            quat: bone.quat.to_array(),
            scale: bone.scale.to_array(),
        };
        w.write_all(&record.to_bytes())?;
    }
    for (mat, &name_offset) in model.materials.iter().zip(&material_names) {
        let record = MscnMaterial {
            name_offset,
            guid: mat.guid,
        };
        w.write_all(&record.to_bytes())?;
    }

    w.write_all(cast_slice(indices))?;
    w.write_all(cast_slice(vertices))?;
    w.write_all(cast_slice(weights))?;
    w.write_all(cast_slice(texcoords))?;
    Ok(())
}

/// Export one LOD to `path`, atomically.
pub fn export_mscn(model: &ParsedModel<'_>, lod: usize, path: &Path) -> Result<()> {
    super::write_atomic(path, |w| write_mscn(w, model, lod))
        .with_context(|| format!("exporting mscn to {}", path.display()))
}
