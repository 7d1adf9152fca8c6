//! Raw header views.
//!
//! Typed, read-only overlays on a contiguous byte buffer for each source
//! format version. Views never copy and never mutate source bytes; all
//! multi-byte fields are little-endian. Overlay construction is
//! bounds-checked once against the caller-supplied buffer length; field
//! access after that is plain offset arithmetic.

pub mod classic;
pub mod rtech;

use bytemuck::{AnyBitPattern, Pod, Zeroable};

use crate::error::{Error, Result};

/// 3x4 bone transform, row-major. Large, so canonical records keep a
/// reference into the source buffer instead of copying it.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Mat34 {
    pub rows: [[f32; 4]; 3],
}

impl Mat34 {
    pub const IDENTITY: Mat34 = Mat34 {
        rows: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
        ],
    };
}

/// Every studio header layout this crate understands, spanning the classic
/// engine lineage (r1/r2 with loose VTX/VVD/VVW data) and the rtech lineage
/// (v8 through v19 with baked hardware data).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StudioVersion {
    R1,
    R2,
    V8,
    V12_1,
    V12_2,
    V12_4,
    V14,
    V16,
    V17,
    V19,
}

impl StudioVersion {
    /// Classic lineage carries its vertex data in loose VTX/VVD files.
    pub fn is_classic(self) -> bool {
        matches!(self, StudioVersion::R1 | StudioVersion::R2)
    }

    /// v16+ split the bone table into a header record and a data record in
    /// separate sub-tables; procedural offsets must be rebased.
    pub fn has_split_bones(self) -> bool {
        matches!(
            self,
            StudioVersion::V16 | StudioVersion::V17 | StudioVersion::V19
        )
    }

    /// v19 moves bone transforms into a shared linear-bone table.
    pub fn has_linear_bone_table(self) -> bool {
        matches!(self, StudioVersion::V19)
    }

    /// Map the header's version/sub-version pair to a tag.
    pub fn from_header(version: i32, sub_version: i32) -> Result<Self> {
        Ok(match (version, sub_version) {
            (52, _) => StudioVersion::R1,
            (53, _) => StudioVersion::R2,
            (8, _) => StudioVersion::V8,
            (12, 1) => StudioVersion::V12_1,
            (12, 2) => StudioVersion::V12_2,
            (12, 4) => StudioVersion::V12_4,
            (14, _) => StudioVersion::V14,
            (16, _) => StudioVersion::V16,
            (17, _) => StudioVersion::V17,
            (19, _) => StudioVersion::V19,
            _ => {
                return Err(Error::UnsupportedVersion {
                    version,
                    sub_version,
                })
            }
        })
    }
}

impl std::fmt::Display for StudioVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StudioVersion::R1 => "r1",
            StudioVersion::R2 => "r2",
            StudioVersion::V8 => "v8",
            StudioVersion::V12_1 => "v12.1",
            StudioVersion::V12_2 => "v12.2",
            StudioVersion::V12_4 => "v12.4",
            StudioVersion::V14 => "v14",
            StudioVersion::V16 => "v16",
            StudioVersion::V17 => "v17",
            StudioVersion::V19 => "v19",
        };
        f.write_str(s)
    }
}

/// Overlay a single record at `offset`. Fails when the record would read
/// past the buffer or the offset breaks the record's alignment.
pub fn view<T: AnyBitPattern>(buf: &[u8], offset: usize) -> Result<&T> {
    let size = std::mem::size_of::<T>();
    let end = offset.checked_add(size).ok_or(Error::Truncated {
        offset,
        needed: size,
        len: buf.len(),
    })?;
    if end > buf.len() {
        return Err(Error::Truncated {
            offset,
            needed: size,
            len: buf.len(),
        });
    }
    bytemuck::try_from_bytes(&buf[offset..end]).map_err(|_| Error::Misaligned {
        offset,
        type_name: std::any::type_name::<T>(),
    })
}

/// Overlay `count` contiguous records starting at `offset`.
pub fn view_slice<T: AnyBitPattern>(buf: &[u8], offset: usize, count: usize) -> Result<&[T]> {
    let size = std::mem::size_of::<T>()
        .checked_mul(count)
        .ok_or(Error::Truncated {
            offset,
            needed: usize::MAX,
            len: buf.len(),
        })?;
    let end = offset.checked_add(size).ok_or(Error::Truncated {
        offset,
        needed: size,
        len: buf.len(),
    })?;
    if end > buf.len() {
        return Err(Error::Truncated {
            offset,
            needed: size,
            len: buf.len(),
        });
    }
    bytemuck::try_cast_slice(&buf[offset..end]).map_err(|_| Error::Misaligned {
        offset,
        type_name: std::any::type_name::<T>(),
    })
}

/// Borrow a nul-terminated string out of the buffer.
pub fn cstr_at(buf: &[u8], offset: usize) -> Result<&str> {
    let tail = buf.get(offset..).ok_or(Error::Truncated {
        offset,
        needed: 1,
        len: buf.len(),
    })?;
    let end = tail
        .iter()
        .position(|&b| b == 0)
        .ok_or(Error::Truncated {
            offset,
            needed: tail.len() + 1,
            len: buf.len(),
        })?;
    std::str::from_utf8(&tail[..end]).map_err(|_| Error::BadName(offset))
}

/// Borrow a string from a fixed-size inline char array.
pub fn inline_str(raw: &[u8]) -> Result<&str> {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    std::str::from_utf8(&raw[..end]).map_err(|_| Error::BadName(0))
}

/// A record overlay paired with its byte offset in the source buffer.
/// Studio formats store name/sub-table offsets relative to the record that
/// declares them, so the offset travels with the view.
pub struct Rec<'a, T> {
    pub rec: &'a T,
    pub offset: usize,
}

impl<'a, T> Clone for Rec<'a, T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<'a, T> Copy for Rec<'a, T> {}

impl<'a, T: AnyBitPattern> Rec<'a, T> {
    pub fn at(buf: &'a [u8], offset: usize) -> Result<Self> {
        Ok(Rec {
            rec: view(buf, offset)?,
            offset,
        })
    }

    /// The i-th record of a table starting at `base`.
    pub fn index(buf: &'a [u8], base: usize, i: usize) -> Result<Self> {
        Rec::at(buf, base + i * std::mem::size_of::<T>())
    }

    /// Resolve an offset stored relative to this record.
    pub fn rel(&self, offset: i64) -> usize {
        (self.offset as i64 + offset) as usize
    }
}

/// Version-normalized studio header: every count and offset the normalizers
/// need, resolved to buffer-absolute byte offsets. Offsets are 0 when the
/// corresponding table is absent.
#[derive(Debug, Clone)]
pub struct GenericStudioHdr {
    pub version: StudioVersion,
    pub checksum: i32,
    pub flags: u32,
    pub name: String,

    pub bone_count: usize,
    pub bone_offset: usize,
    /// Split layouts (v16+): offset of the bone *data* sub-table. Equals
    /// `bone_offset` for single-record layouts.
    pub bone_data_offset: usize,
    /// v19 shared linear-bone table, when present.
    pub linear_bone_offset: Option<usize>,

    pub hitbox_set_count: usize,
    pub hitbox_set_offset: usize,

    pub local_attachment_count: usize,
    pub local_attachment_offset: usize,

    pub skin_ref_count: usize,
    pub skin_family_count: usize,
    pub skin_offset: usize,

    pub body_part_count: usize,
    pub body_part_offset: usize,

    pub local_seq_count: usize,
    pub local_seq_offset: usize,

    pub pose_param_count: usize,
    pub pose_param_offset: usize,

    pub ik_chain_count: usize,
    pub ik_chain_offset: usize,

    pub ik_lock_count: usize,
    pub ik_lock_offset: usize,

    pub texture_count: usize,
    pub texture_offset: usize,

    pub surface_prop_offset: usize,

    /// Baked hardware ("VG") block, rtech lineage only.
    pub hw_data_offset: usize,
    pub hw_data_size: usize,
}

impl GenericStudioHdr {
    /// An all-zero header for `version`; loaders fill the tables they find.
    pub fn new(version: StudioVersion) -> Self {
        GenericStudioHdr {
            version,
            checksum: 0,
            flags: 0,
            name: String::new(),
            bone_count: 0,
            bone_offset: 0,
            bone_data_offset: 0,
            linear_bone_offset: None,
            hitbox_set_count: 0,
            hitbox_set_offset: 0,
            local_attachment_count: 0,
            local_attachment_offset: 0,
            skin_ref_count: 0,
            skin_family_count: 0,
            skin_offset: 0,
            body_part_count: 0,
            body_part_offset: 0,
            local_seq_count: 0,
            local_seq_offset: 0,
            pose_param_count: 0,
            pose_param_offset: 0,
            ik_chain_count: 0,
            ik_chain_offset: 0,
            ik_lock_count: 0,
            ik_lock_offset: 0,
            texture_count: 0,
            texture_offset: 0,
            surface_prop_offset: 0,
            hw_data_offset: 0,
            hw_data_size: 0,
        }
    }

    /// Validate that every declared table lies inside `len` bytes.
    /// Debug builds additionally assert the "count > 0 implies offset != 0"
    /// invariant documented for raw views.
    pub(crate) fn check_bounds(&self, len: usize) -> Result<()> {
        let tables = [
            (self.bone_count, self.bone_offset),
            (self.bone_count, self.bone_data_offset),
            (self.hitbox_set_count, self.hitbox_set_offset),
            (self.local_attachment_count, self.local_attachment_offset),
            (self.skin_family_count, self.skin_offset),
            (self.body_part_count, self.body_part_offset),
            (self.local_seq_count, self.local_seq_offset),
            (self.pose_param_count, self.pose_param_offset),
            (self.ik_chain_count, self.ik_chain_offset),
            (self.ik_lock_count, self.ik_lock_offset),
            (self.texture_count, self.texture_offset),
        ];
        for (count, offset) in tables {
            if count > 0 {
                debug_assert!(offset != 0, "non-empty table with zero offset");
                if offset >= len {
                    return Err(Error::Truncated {
                        offset,
                        needed: 1,
                        len,
                    });
                }
            }
        }
        Ok(())
    }
}
