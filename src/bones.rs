//! Bone normalizer.
//!
//! Every source version stores bones differently; this module reduces them
//! all to [`Bone`] through one tagged view and one normalize function. The
//! only non-trivial rule is procedural-index rebasing: split-table versions
//! keep the procedural rule offset relative to the *data* record, while the
//! canonical bone keeps it relative to the *header* record, so the table
//! distance is folded in. A stored index of 0 always means "no procedure"
//! and survives rebasing unchanged.

use glam::{Quat, Vec3};

use crate::error::Result;
use crate::model::Bone;
use crate::studio::classic::BoneClassic;
use crate::studio::rtech::{BoneDataV16, BoneDataV19, BoneHdrV16, BoneV12_1, BoneV8, LinearBones};
use crate::studio::{cstr_at, Rec};

/// One bone as a particular source version lays it out. Split variants
/// carry both halves plus the table positions needed for rebasing.
#[derive(Clone, Copy)]
pub enum RawBone<'a> {
    Classic(Rec<'a, BoneClassic>),
    V8(Rec<'a, BoneV8>),
    /// v12.1 through v14.
    V12(Rec<'a, BoneV12_1>),
    /// v16/v17: header and data records live in separate tables.
    Split {
        hdr: Rec<'a, BoneHdrV16>,
        data: Rec<'a, BoneDataV16>,
    },
    /// v19: like Split, but transforms come from the shared linear table.
    Linear {
        hdr: Rec<'a, BoneHdrV16>,
        data: Rec<'a, BoneDataV19>,
        linear: LinearBones<'a>,
        index: usize,
    },
}

fn quat(q: [f32; 4]) -> Quat {
    Quat::from_xyzw(q[0], q[1], q[2], q[3])
}

/// Rebase a data-relative procedural index onto the header record.
/// Zero is the absence marker and is never rebased.
fn rebase_proc_index(proc_index: i32, hdr_offset: usize, data_offset: usize) -> i32 {
    if proc_index == 0 {
        return 0;
    }
    proc_index + (data_offset as i64 - hdr_offset as i64) as i32
}

/// Reduce one raw bone record to the canonical form. `buf` is the studio
/// buffer the record views; bone names resolve through it.
pub fn normalize_bone<'a>(buf: &'a [u8], raw: RawBone<'a>) -> Result<Bone<'a>> {
    match raw {
        RawBone::Classic(r) => {
            let b = r.rec;
            Ok(Bone {
                name: cstr_at(buf, r.rel(b.name_offset as i64))?,
                parent: b.parent,
                flags: b.flags,
                proc_type: b.proc_type,
                proc_index: b.proc_index,
                physics_bone: b.physics_bone,
                surface_prop_idx: b.surface_prop_idx,
                contents: b.contents,
                pose_to_bone: &b.pose_to_bone,
                pos: Vec3::from_array(b.pos),
                quat: quat(b.quat),
                rot: Vec3::from_array(b.rot),
                scale: Vec3::from_array(b.scale),
                record_offset: r.offset,
            })
        }
        RawBone::V8(r) => {
            let b = r.rec;
            Ok(Bone {
                name: cstr_at(buf, r.rel(b.name_offset as i64))?,
                parent: b.parent,
                flags: b.flags,
                proc_type: b.proc_type,
                proc_index: b.proc_index,
                physics_bone: b.physics_bone,
                surface_prop_idx: b.surface_prop_idx,
                contents: b.contents,
                pose_to_bone: &b.pose_to_bone,
                pos: Vec3::from_array(b.pos),
                quat: quat(b.quat),
                rot: Vec3::from_array(b.rot),
                scale: Vec3::from_array(b.scale),
                record_offset: r.offset,
            })
        }
        RawBone::V12(r) => {
            let b = r.rec;
            Ok(Bone {
                name: cstr_at(buf, r.rel(b.name_offset as i64))?,
                parent: b.parent,
                flags: b.flags,
                proc_type: b.proc_type,
                proc_index: b.proc_index,
                physics_bone: b.physics_bone,
                surface_prop_idx: b.surface_prop_idx,
                contents: b.contents,
                pose_to_bone: &b.pose_to_bone,
                pos: Vec3::from_array(b.pos),
                quat: quat(b.quat),
                rot: Vec3::from_array(b.rot),
                scale: Vec3::from_array(b.scale),
                record_offset: r.offset,
            })
        }
        RawBone::Split { hdr, data } => {
            let h = hdr.rec;
            let d = data.rec;
            Ok(Bone {
                name: cstr_at(buf, hdr.rel(h.name_offset as i64))?,
                parent: d.parent,
                flags: d.flags,
                proc_type: d.proc_type,
                proc_index: rebase_proc_index(d.proc_index, hdr.offset, data.offset),
                physics_bone: h.physics_bone as i32,
                surface_prop_idx: h.surface_prop_idx as i32,
                contents: h.contents,
                pose_to_bone: &d.pose_to_bone,
                pos: Vec3::from_array(d.pos),
                quat: quat(d.quat),
                rot: Vec3::from_array(d.rot),
                scale: Vec3::from_array(d.scale),
                record_offset: hdr.offset,
            })
        }
        RawBone::Linear {
            hdr,
            data,
            linear,
            index,
        } => {
            let h = hdr.rec;
            let d = data.rec;
            Ok(Bone {
                name: cstr_at(buf, hdr.rel(h.name_offset as i64))?,
                parent: d.parent,
                flags: d.flags,
                proc_type: d.proc_type,
                proc_index: rebase_proc_index(d.proc_index, hdr.offset, data.offset),
                physics_bone: h.physics_bone as i32,
                surface_prop_idx: h.surface_prop_idx as i32,
                contents: h.contents,
                pose_to_bone: &linear.pose_to_bone[index],
                pos: Vec3::from_array(linear.pos[index]),
                quat: quat(linear.quat[index]),
                rot: Vec3::from_array(linear.rot[index]),
                scale: Vec3::from_array(linear.scale[index]),
                record_offset: hdr.offset,
            })
        }
    }
}
