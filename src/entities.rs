//! Auxiliary entity normalizers: attachments, hitbox sets, skin families,
//! pose parameters, IK chains and locks, sequence descriptors.
//!
//! Same shape as the bone path: a tagged raw view per entity, one
//! normalize function per entity. IK chains are the only entity with a
//! hard structural rule; a bad chain fails the whole asset.

use glam::Vec3;

use crate::error::{Error, Result};
use crate::model::{
    Attachment, Hitbox, HitboxSet, IkChain, IkLink, IkLock, MaterialRef, Name, PoseParam, SeqDesc,
    SkinData,
};
use crate::studio::classic::{AttachmentClassic, HitboxClassic, MaterialClassic};
use crate::studio::rtech::{
    AttachmentV16, AttachmentV8, HitboxSetV16, HitboxSetV8, HitboxV16, HitboxV8, IkChainV16,
    IkChainV8, IkLinkV16, IkLinkV8, IkLockV16, IkLockV8, MaterialV16, MaterialV8, PoseParamV16,
    PoseParamV8, SeqDescV16, SeqDescV8,
};
use crate::studio::{cstr_at, view_slice, Rec};

// ---------------------------------------------------------------------------
// Attachments
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
pub enum RawAttachment<'a> {
    Classic(Rec<'a, AttachmentClassic>),
    V8(Rec<'a, AttachmentV8>),
    V16(Rec<'a, AttachmentV16>),
}

pub fn normalize_attachment<'a>(buf: &'a [u8], raw: RawAttachment<'a>) -> Result<Attachment<'a>> {
    match raw {
        RawAttachment::Classic(r) => Ok(Attachment {
            name: cstr_at(buf, r.rel(r.rec.name_offset as i64))?,
            flags: r.rec.flags,
            local_bone: r.rec.local_bone,
            local: &r.rec.local,
        }),
        RawAttachment::V8(r) => Ok(Attachment {
            name: cstr_at(buf, r.rel(r.rec.name_offset as i64))?,
            flags: r.rec.flags,
            local_bone: r.rec.local_bone,
            local: &r.rec.local,
        }),
        RawAttachment::V16(r) => Ok(Attachment {
            name: cstr_at(buf, r.rel(r.rec.name_offset as i64))?,
            flags: r.rec.flags as i32,
            local_bone: r.rec.local_bone as i32,
            local: &r.rec.local,
        }),
    }
}

// ---------------------------------------------------------------------------
// Hitbox sets
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
pub enum RawHitboxSet<'a> {
    /// r1: the crit-point flag does not exist yet.
    Classic(Rec<'a, HitboxSetV8>),
    /// r2 and rtech v8..v14.
    V8(Rec<'a, HitboxSetV8>),
    V16(Rec<'a, HitboxSetV16>),
}

pub fn normalize_hitbox_set<'a>(buf: &'a [u8], raw: RawHitboxSet<'a>) -> Result<HitboxSet<'a>> {
    match raw {
        RawHitboxSet::Classic(r) => {
            let n = r.rec.hitbox_count as usize;
            let base = r.rel(r.rec.hitbox_offset as i64);
            let mut hitboxes = Vec::with_capacity(n);
            for i in 0..n {
                let hb = Rec::<HitboxClassic>::index(buf, base, i)?;
                hitboxes.push(Hitbox {
                    bone: hb.rec.bone,
                    group: hb.rec.group,
                    bbmin: &hb.rec.bbmin,
                    bbmax: &hb.rec.bbmax,
                    name: cstr_at(buf, hb.rel(hb.rec.name_offset as i64))?,
                    force_crit_point: 0,
                });
            }
            Ok(HitboxSet {
                name: cstr_at(buf, r.rel(r.rec.name_offset as i64))?,
                hitboxes,
            })
        }
        RawHitboxSet::V8(r) => {
            let n = r.rec.hitbox_count as usize;
            let base = r.rel(r.rec.hitbox_offset as i64);
            let mut hitboxes = Vec::with_capacity(n);
            for i in 0..n {
                let hb = Rec::<HitboxV8>::index(buf, base, i)?;
                hitboxes.push(Hitbox {
                    bone: hb.rec.bone,
                    group: hb.rec.group,
                    bbmin: &hb.rec.bbmin,
                    bbmax: &hb.rec.bbmax,
                    name: cstr_at(buf, hb.rel(hb.rec.name_offset as i64))?,
                    force_crit_point: hb.rec.force_crit_point,
                });
            }
            Ok(HitboxSet {
                name: cstr_at(buf, r.rel(r.rec.name_offset as i64))?,
                hitboxes,
            })
        }
        RawHitboxSet::V16(r) => {
            let n = r.rec.hitbox_count as usize;
            let base = r.rel(r.rec.hitbox_offset as i64);
            let mut hitboxes = Vec::with_capacity(n);
            for i in 0..n {
                let hb = Rec::<HitboxV16>::index(buf, base, i)?;
                hitboxes.push(Hitbox {
                    bone: hb.rec.bone as i32,
                    group: hb.rec.group as i32,
                    bbmin: &hb.rec.bbmin,
                    bbmax: &hb.rec.bbmax,
                    name: cstr_at(buf, hb.rel(hb.rec.name_offset as i64))?,
                    force_crit_point: 0,
                });
            }
            Ok(HitboxSet {
                name: cstr_at(buf, r.rel(r.rec.name_offset as i64))?,
                hitboxes,
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Materials and skin families
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
pub enum RawMaterial<'a> {
    Classic(Rec<'a, MaterialClassic>),
    V8(Rec<'a, MaterialV8>),
    V16(Rec<'a, MaterialV16>),
}

pub fn normalize_material<'a>(buf: &'a [u8], raw: RawMaterial<'a>) -> Result<MaterialRef<'a>> {
    match raw {
        RawMaterial::Classic(r) => {
            let name = cstr_at(buf, r.rel(r.rec.name_offset as i64))?;
            Ok(MaterialRef::new(0, Name::Borrowed(name)))
        }
        RawMaterial::V8(r) => {
            let name = cstr_at(buf, r.rel(r.rec.name_offset as i64))?;
            Ok(MaterialRef::new(r.rec.guid, Name::Borrowed(name)))
        }
        RawMaterial::V16(r) => {
            let name = cstr_at(buf, r.rel(r.rec.name_offset as i64))?;
            Ok(MaterialRef::new(r.rec.guid, Name::Borrowed(name)))
        }
    }
}

/// Read the skin-family table: `family_count` rows of `material_count`
/// material indices each. Family 0 is always "default"; the rest get
/// numbered names, since no supported layout stores family names.
pub fn normalize_skins<'a>(
    buf: &'a [u8],
    skin_offset: usize,
    family_count: usize,
    material_count: usize,
) -> Result<Vec<SkinData<'a>>> {
    let mut skins = Vec::with_capacity(family_count);
    for family in 0..family_count {
        let indices: &[i16] = view_slice(
            buf,
            skin_offset + family * material_count * 2,
            material_count,
        )?;
        // none of the supported layouts carry family names
        let name = if family == 0 {
            Name::Borrowed("default")
        } else {
            Name::Owned(format!("skin{family}"))
        };
        skins.push(SkinData { name, indices });
    }
    Ok(skins)
}

// ---------------------------------------------------------------------------
// Pose parameters
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
pub enum RawPoseParam<'a> {
    V8(Rec<'a, PoseParamV8>),
    V16(Rec<'a, PoseParamV16>),
}

pub fn normalize_pose_param<'a>(buf: &'a [u8], raw: RawPoseParam<'a>) -> Result<PoseParam<'a>> {
    match raw {
        RawPoseParam::V8(r) => Ok(PoseParam {
            name: cstr_at(buf, r.rel(r.rec.name_offset as i64))?,
            flags: r.rec.flags,
            start: r.rec.start,
            end: r.rec.end,
            loop_: r.rec.loop_,
        }),
        RawPoseParam::V16(r) => Ok(PoseParam {
            name: cstr_at(buf, r.rel(r.rec.name_offset as i64))?,
            flags: r.rec.flags,
            start: r.rec.start,
            end: r.rec.end,
            loop_: r.rec.loop_,
        }),
    }
}

// ---------------------------------------------------------------------------
// IK chains and locks
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
pub enum RawIkChain<'a> {
    V8(Rec<'a, IkChainV8>),
    V16(Rec<'a, IkChainV16>),
}

/// Normalize one IK chain. Every supported chain is a thigh/knee/foot
/// triple of link type 0; anything else is corrupt input.
pub fn normalize_ik_chain<'a>(buf: &'a [u8], raw: RawIkChain<'a>) -> Result<IkChain<'a>> {
    let (name, link_type, link_count, link_base, unk_10, link_stride) = match raw {
        RawIkChain::V8(r) => (
            cstr_at(buf, r.rel(r.rec.name_offset as i64))?,
            r.rec.link_type,
            r.rec.link_count,
            r.rel(r.rec.link_offset as i64),
            r.rec.unk_10,
            std::mem::size_of::<IkLinkV8>(),
        ),
        RawIkChain::V16(r) => (
            cstr_at(buf, r.rel(r.rec.name_offset as i64))?,
            r.rec.link_type as i32,
            r.rec.link_count as i32,
            r.rel(r.rec.link_offset as i64),
            r.rec.unk_10,
            std::mem::size_of::<IkLinkV16>(),
        ),
    };

    if link_count != 3 || link_type != 0 {
        return Err(Error::MalformedIkChain {
            links: link_count,
            link_type,
        });
    }

    let mut links = [IkLink {
        bone: 0,
        knee_dir: Vec3::ZERO,
    }; 3];
    for (i, link) in links.iter_mut().enumerate() {
        let at = link_base + i * link_stride;
        match raw {
            RawIkChain::V8(_) => {
                let l = Rec::<IkLinkV8>::at(buf, at)?;
                link.bone = l.rec.bone;
                link.knee_dir = Vec3::from_array(l.rec.knee_dir);
            }
            RawIkChain::V16(_) => {
                let l = Rec::<IkLinkV16>::at(buf, at)?;
                link.bone = l.rec.bone;
                link.knee_dir = Vec3::from_array(l.rec.knee_dir);
            }
        }
    }

    Ok(IkChain {
        name,
        unk_10,
        links,
    })
}

#[derive(Clone, Copy)]
pub enum RawIkLock<'a> {
    V8(Rec<'a, IkLockV8>),
    V16(Rec<'a, IkLockV16>),
}

pub fn normalize_ik_lock(raw: RawIkLock<'_>) -> IkLock {
    match raw {
        RawIkLock::V8(r) => IkLock {
            chain: r.rec.chain,
            pos_weight: r.rec.pos_weight,
            local_q_weight: r.rec.local_q_weight,
            flags: r.rec.flags,
        },
        RawIkLock::V16(r) => IkLock {
            chain: r.rec.chain as i32,
            pos_weight: r.rec.pos_weight,
            local_q_weight: r.rec.local_q_weight,
            flags: r.rec.flags as i32,
        },
    }
}

// ---------------------------------------------------------------------------
// Sequence descriptors
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
pub enum RawSeqDesc<'a> {
    V8(Rec<'a, SeqDescV8>),
    V16(Rec<'a, SeqDescV16>),
}

pub fn normalize_seq_desc<'a>(buf: &'a [u8], raw: RawSeqDesc<'a>) -> Result<SeqDesc<'a>> {
    match raw {
        RawSeqDesc::V8(r) => Ok(SeqDesc {
            label: cstr_at(buf, r.rel(r.rec.label_offset as i64))?,
            activity_name: cstr_at(buf, r.rel(r.rec.activity_name_offset as i64))?,
            flags: r.rec.flags,
            frame_count: r.rec.frame_count,
            fps: r.rec.fps,
        }),
        RawSeqDesc::V16(r) => Ok(SeqDesc {
            label: cstr_at(buf, r.rel(r.rec.label_offset as i64))?,
            activity_name: cstr_at(buf, r.rel(r.rec.activity_name_offset as i64))?,
            flags: r.rec.flags,
            frame_count: r.rec.frame_count as i32,
            fps: r.rec.fps,
        }),
    }
}
