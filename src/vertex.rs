//! Mesh/vertex normalizer.
//!
//! Produces one canonical [`Vertex`] plus zero-or-more [`VertexWeight`]
//! records from one of four upstream encodings: baked hardware "VG" bytes,
//! generic VTX arrays, classic VTX+VVD pairs, and the VVW extended-weight
//! variant. All four paths flip texcoord V identically; a vertex claiming
//! more weights than its mesh allows is malformed input, never truncated.

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

use crate::error::{Error, Result};
use crate::model::MeshData;
use crate::studio::classic::{
    BoneStateChange, OptVertex, VvdVertex, VvwVertexInfo, MAX_INLINE_WEIGHTS,
};
use crate::studio::rtech::{
    unpack_position_u64, ExtraBoneWeight, VG_COLOR, VG_NORMAL_PACKED, VG_POSITION,
    VG_POSITION_PACKED, VG_UV0, VG_UV1, VG_WEIGHTS,
};

/// Largest value the 24-bit weight-start-index field can carry.
pub const MAX_WEIGHT_INDEX: usize = 0xFF_FFFF;

/// Canonical vertex. Weight count and start index share one word
/// (count in the low 8 bits, index in the high 24).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: Vec3,
    pub normal_packed: u32,
    pub color: u32,
    pub uv0: Vec2,
    weight_bits: u32,
}

impl Vertex {
    pub fn new(
        position: Vec3,
        normal_packed: u32,
        color: u32,
        uv0: Vec2,
        weight_count: u8,
        weight_index: u32,
    ) -> Self {
        debug_assert!(weight_index as usize <= MAX_WEIGHT_INDEX);
        Vertex {
            position,
            normal_packed,
            color,
            uv0,
            weight_bits: (weight_index << 8) | weight_count as u32,
        }
    }

    pub fn weight_count(&self) -> u32 {
        self.weight_bits & 0xFF
    }

    pub fn weight_index(&self) -> u32 {
        self.weight_bits >> 8
    }
}

/// One bone weight; weights for a vertex are contiguous in the shared
/// per-mesh array.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct VertexWeight {
    pub weight: f32,
    pub bone: i16,
    pub _pad: i16,
}

impl VertexWeight {
    pub fn new(bone: i16, weight: f32) -> Self {
        VertexWeight {
            weight,
            bone,
            _pad: 0,
        }
    }
}

/// The canonical V flip, applied by every decoder. A pure involution:
/// applying it twice returns the input.
#[inline]
pub fn flip_texcoord_v(uv: Vec2) -> Vec2 {
    Vec2::new(uv.x, 1.0 - uv.y)
}

// ---------------------------------------------------------------------------
// Packing helpers
// ---------------------------------------------------------------------------

#[inline]
fn f32_to_snorm16(value: f32) -> i16 {
    (value.clamp(-1.0, 1.0) * 32767.0) as i16
}

fn encode_octahedral(dir: Vec3) -> (f32, f32) {
    let l1 = dir.x.abs() + dir.y.abs() + dir.z.abs();
    if l1 == 0.0 {
        return (0.0, 0.0);
    }
    let mut u = dir.x / l1;
    let mut v = dir.y / l1;
    if dir.z < 0.0 {
        let (ua, va) = (u.abs(), v.abs());
        u = (1.0 - va) * if u >= 0.0 { 1.0 } else { -1.0 };
        v = (1.0 - ua) * if v >= 0.0 { 1.0 } else { -1.0 };
    }
    (u, v)
}

/// Pack a direction into the canonical 2x snorm16 octahedral u32.
pub fn pack_normal_u32(dir: Vec3) -> u32 {
    let (u, v) = encode_octahedral(dir);
    (f32_to_snorm16(u) as u16 as u32) | ((f32_to_snorm16(v) as u16 as u32) << 16)
}

/// Inverse of [`pack_normal_u32`], used by text exporters.
pub fn unpack_normal_u32(packed: u32) -> Vec3 {
    let u = (packed & 0xFFFF) as i16 as f32 / 32767.0;
    let v = (packed >> 16) as i16 as f32 / 32767.0;
    let mut dir = Vec3::new(u, v, 1.0 - u.abs() - v.abs());
    if dir.z < 0.0 {
        let old_x = dir.x;
        dir.x = (1.0 - dir.y.abs()) * if old_x >= 0.0 { 1.0 } else { -1.0 };
        dir.y = (1.0 - old_x.abs()) * if dir.y >= 0.0 { 1.0 } else { -1.0 };
    }
    dir.normalize_or_zero()
}

#[inline]
fn unorm15(raw: u16) -> f32 {
    raw as f32 / 32768.0
}

fn push_weights(
    mesh: &MeshData,
    weights: &mut Vec<VertexWeight>,
    pending: &[VertexWeight],
) -> Result<(u8, u32)> {
    let claimed = pending.len() as u32;
    if claimed > mesh.weights_per_vert as u32 {
        return Err(Error::WeightBudget {
            claimed,
            allowed: mesh.weights_per_vert as u32,
        });
    }
    let index = weights.len();
    if index > MAX_WEIGHT_INDEX {
        return Err(Error::WeightIndexRange { index });
    }
    weights.extend_from_slice(pending);
    Ok((claimed as u8, index as u32))
}

// ---------------------------------------------------------------------------
// (a) Baked hardware "VG" encoding
// ---------------------------------------------------------------------------

fn read_f32(raw: &[u8], at: usize) -> Result<f32> {
    let b = raw.get(at..at + 4).ok_or(Error::Truncated {
        offset: at,
        needed: 4,
        len: raw.len(),
    })?;
    Ok(f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

fn read_u32(raw: &[u8], at: usize) -> Result<u32> {
    let b = raw.get(at..at + 4).ok_or(Error::Truncated {
        offset: at,
        needed: 4,
        len: raw.len(),
    })?;
    Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

fn read_u64(raw: &[u8], at: usize) -> Result<u64> {
    let b = raw.get(at..at + 8).ok_or(Error::Truncated {
        offset: at,
        needed: 8,
        len: raw.len(),
    })?;
    Ok(u64::from_le_bytes([
        b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
    ]))
}

/// Decode one baked vertex from `raw` (the bytes of exactly one vertex,
/// laid out per the mesh's layout flags).
///
/// Inline bone bytes are remapped through `bone_map`. Weights beyond the
/// two inline unorm16 slots come from `extra`, consumed in vertex order via
/// `extra_cursor`; the final weight of a vertex is always the remainder
/// to 1.0.
pub fn vertex_from_vg(
    mesh: &MeshData,
    layout_flags: u64,
    raw: &[u8],
    bone_map: &[u8],
    extra: &[ExtraBoneWeight],
    extra_cursor: &mut usize,
    weights: &mut Vec<VertexWeight>,
    texcoords: &mut Vec<Vec2>,
) -> Result<Vertex> {
    let mut at = 0usize;

    let position = if layout_flags & VG_POSITION_PACKED != 0 {
        let p = unpack_position_u64(read_u64(raw, at)?);
        at += 8;
        Vec3::from_array(p)
    } else if layout_flags & VG_POSITION != 0 {
        let p = Vec3::new(
            read_f32(raw, at)?,
            read_f32(raw, at + 4)?,
            read_f32(raw, at + 8)?,
        );
        at += 12;
        p
    } else {
        Vec3::ZERO
    };

    let mut pending: Vec<VertexWeight> = Vec::new();
    if layout_flags & VG_WEIGHTS != 0 {
        let block = raw.get(at..at + 8).ok_or(Error::Truncated {
            offset: at,
            needed: 8,
            len: raw.len(),
        })?;
        let w0 = u16::from_le_bytes([block[0], block[1]]);
        let w1 = u16::from_le_bytes([block[2], block[3]]);
        let bones = [block[4], block[5], block[6]];
        let count = block[7] as u32;
        at += 8;

        let remap = |b: u8| -> i16 { bone_map.get(b as usize).map(|&m| m as i16).unwrap_or(0) };

        match count {
            0 => {}
            1 => pending.push(VertexWeight::new(remap(bones[0]), 1.0)),
            2 => {
                let a = unorm15(w0);
                pending.push(VertexWeight::new(remap(bones[0]), a));
                pending.push(VertexWeight::new(remap(bones[1]), 1.0 - a));
            }
            3 => {
                let (a, b) = (unorm15(w0), unorm15(w1));
                pending.push(VertexWeight::new(remap(bones[0]), a));
                pending.push(VertexWeight::new(remap(bones[1]), b));
                pending.push(VertexWeight::new(remap(bones[2]), 1.0 - a - b));
            }
            n => {
                // two inline slots, the rest fetched from the side table;
                // the stored weight of the last slot is superseded by the
                // remainder so the vertex always sums to one
                let (a, b) = (unorm15(w0), unorm15(w1));
                pending.push(VertexWeight::new(remap(bones[0]), a));
                pending.push(VertexWeight::new(remap(bones[1]), b));
                let mut sum = a + b;
                let take = (n - 2) as usize;
                let side = extra.get(*extra_cursor..*extra_cursor + take).ok_or(
                    Error::Truncated {
                        offset: *extra_cursor,
                        needed: take,
                        len: extra.len(),
                    },
                )?;
                *extra_cursor += take;
                for (i, e) in side.iter().enumerate() {
                    let w = if i + 1 == take {
                        1.0 - sum
                    } else {
                        unorm15(e.weight as u16)
                    };
                    sum += w;
                    pending.push(VertexWeight::new(e.bone, w));
                }
            }
        }
    }

    let normal_packed = if layout_flags & VG_NORMAL_PACKED != 0 {
        let n = read_u32(raw, at)?;
        at += 4;
        n
    } else {
        0
    };

    let color = if layout_flags & VG_COLOR != 0 {
        let c = read_u32(raw, at)?;
        at += 4;
        c
    } else {
        0xFFFF_FFFF
    };

    let uv0 = if layout_flags & VG_UV0 != 0 {
        let uv = flip_texcoord_v(Vec2::new(read_f32(raw, at)?, read_f32(raw, at + 4)?));
        at += 8;
        uv
    } else {
        Vec2::ZERO
    };

    if layout_flags & VG_UV1 != 0 {
        let uv = flip_texcoord_v(Vec2::new(read_f32(raw, at)?, read_f32(raw, at + 4)?));
        texcoords.push(uv);
    }

    let (count, index) = push_weights(mesh, weights, &pending)?;
    Ok(Vertex::new(position, normal_packed, color, uv0, count, index))
}

// ---------------------------------------------------------------------------
// (b) Generic VTX encoding
// ---------------------------------------------------------------------------

/// Decode shared vertex data by original vertex id: paired position/color/
/// UV arrays, no weights. Used for layouts whose skinning data lives
/// elsewhere.
pub fn vertex_from_vtx_generic(
    vvd_verts: &[VvdVertex],
    colors: Option<&[u32]>,
    uvs: Option<&[Vec2]>,
    orig_id: usize,
    texcoords: &mut Vec<Vec2>,
) -> Result<Vertex> {
    let v = vvd_verts.get(orig_id).ok_or(Error::Truncated {
        offset: orig_id,
        needed: 1,
        len: vvd_verts.len(),
    })?;

    let color = colors
        .and_then(|c| c.get(orig_id).copied())
        .unwrap_or(0xFFFF_FFFF);
    if let Some(uv1) = uvs.and_then(|u| u.get(orig_id).copied()) {
        texcoords.push(flip_texcoord_v(uv1));
    }

    Ok(Vertex::new(
        Vec3::from_array(v.position),
        pack_normal_u32(Vec3::from_array(v.normal)),
        color,
        flip_texcoord_v(Vec2::from_array(v.uv)),
        0,
        0,
    ))
}

// ---------------------------------------------------------------------------
// (c) Classic VTX + VVD encoding
// ---------------------------------------------------------------------------

/// Resolve the bone for inline weight slot `slot` of an optimized vertex.
/// Hardware-skinned strip groups store an index into the strip's bone-state
/// table instead of a direct bone id; a slot the table does not cover is
/// malformed input.
fn classic_bone(
    opt: &OptVertex,
    slot: usize,
    hw_skinned: bool,
    bone_states: &[BoneStateChange],
) -> Result<i16> {
    let id = opt.bone_id[slot] as i16;
    if !hw_skinned {
        return Ok(id);
    }
    let state_slot = id.max(0) as usize;
    bone_states
        .get(state_slot)
        .map(|s| s.new_bone_id as i16)
        .ok_or(Error::BoneStateRange {
            slot: state_slot,
            count: bone_states.len(),
        })
}

/// Decode one classic vertex: an optimized-triangle record cross-referenced
/// against the VVD vertex array.
pub fn vertex_from_vtx_classic(
    mesh: &MeshData,
    opt: &OptVertex,
    vvd_verts: &[VvdVertex],
    hw_skinned: bool,
    bone_states: &[BoneStateChange],
    weights: &mut Vec<VertexWeight>,
) -> Result<Vertex> {
    let orig_id = opt.orig_mesh_vert_id as usize;
    let v = vvd_verts.get(orig_id).ok_or(Error::Truncated {
        offset: orig_id,
        needed: 1,
        len: vvd_verts.len(),
    })?;

    let count = v.bone_weights.count as usize;
    if count > MAX_INLINE_WEIGHTS {
        return Err(Error::WeightBudget {
            claimed: count as u32,
            allowed: MAX_INLINE_WEIGHTS as u32,
        });
    }
    let mut pending = Vec::with_capacity(count);
    for slot in 0..count {
        pending.push(VertexWeight::new(
            classic_bone(opt, slot, hw_skinned, bone_states)?,
            v.bone_weights.weight[slot],
        ));
    }

    let (count, index) = push_weights(mesh, weights, &pending)?;
    Ok(Vertex::new(
        Vec3::from_array(v.position),
        pack_normal_u32(Vec3::from_array(v.normal)),
        0xFFFF_FFFF,
        flip_texcoord_v(Vec2::from_array(v.uv)),
        count,
        index,
    ))
}

// ---------------------------------------------------------------------------
// (d) Extended-weights encoding (classic + VVW side section)
// ---------------------------------------------------------------------------

/// Like the classic path, but weights past the inline VVD maximum come from
/// the VVW side section, located per-vertex through `vvw_info`.
pub fn vertex_from_vtx_extended(
    mesh: &MeshData,
    opt: &OptVertex,
    vvd_verts: &[VvdVertex],
    vvw_info: &[VvwVertexInfo],
    vvw_weights: &[ExtraBoneWeight],
    weights: &mut Vec<VertexWeight>,
) -> Result<Vertex> {
    let orig_id = opt.orig_mesh_vert_id as usize;
    let v = vvd_verts.get(orig_id).ok_or(Error::Truncated {
        offset: orig_id,
        needed: 1,
        len: vvd_verts.len(),
    })?;

    let inline = (v.bone_weights.count as usize).min(MAX_INLINE_WEIGHTS);
    let mut pending = Vec::with_capacity(inline);
    for slot in 0..inline {
        pending.push(VertexWeight::new(
            v.bone_weights.bone[slot] as i16,
            v.bone_weights.weight[slot],
        ));
    }

    if let Some(info) = vvw_info.get(orig_id) {
        let start = info.extra_index as usize;
        let take = info.extra_count as usize;
        if take > 0 {
            let side = vvw_weights.get(start..start + take).ok_or(Error::Truncated {
                offset: start,
                needed: take,
                len: vvw_weights.len(),
            })?;
            for e in side {
                pending.push(VertexWeight::new(e.bone, unorm15(e.weight as u16)));
            }
        }
    }

    let (count, index) = push_weights(mesh, weights, &pending)?;
    Ok(Vertex::new(
        Vec3::from_array(v.position),
        pack_normal_u32(Vec3::from_array(v.normal)),
        0xFFFF_FFFF,
        flip_texcoord_v(Vec2::from_array(v.uv)),
        count,
        index,
    ))
}
