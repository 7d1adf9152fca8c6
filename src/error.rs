//! Error taxonomy for the normalization core.
//!
//! Malformed input is fatal for the asset being processed: normalization
//! failures abort the whole load and no partial aggregate is returned.
//! Missing optional data (unresolved material, absent procedural rule,
//! zero-length streams) is not an error and is represented as an absence
//! marker at the type level instead.

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("buffer too short: need {needed} bytes at offset {offset:#x}, have {len}")]
    Truncated {
        offset: usize,
        needed: usize,
        len: usize,
    },

    #[error("misaligned {type_name} view at offset {offset:#x}")]
    Misaligned {
        offset: usize,
        type_name: &'static str,
    },

    #[error("invalid utf-8 in name at offset {0:#x}")]
    BadName(usize),

    #[error("bad magic {0:#010x}")]
    BadMagic(u32),

    #[error("unsupported studio version {version} (sub-version {sub_version})")]
    UnsupportedVersion { version: i32, sub_version: i32 },

    #[error("checksum mismatch: studio header {expected:#x}, vertex data {found:#x}")]
    ChecksumMismatch { expected: i32, found: i32 },

    #[error("bone {bone} has out-of-range parent {parent}")]
    BadBoneParent { bone: usize, parent: i32 },

    #[error("ik chain has {links} links of type {link_type}; format requires exactly 3 links of type 0")]
    MalformedIkChain { links: i32, link_type: i32 },

    #[error("vertex claims {claimed} weights but mesh allows at most {allowed} per vertex")]
    WeightBudget { claimed: u32, allowed: u32 },

    #[error("vertex weight index {index} out of range for a 24-bit index field")]
    WeightIndexRange { index: usize },

    #[error("merged vertex index {index} does not fit the 16-bit index stream")]
    IndexRange { index: u32 },

    #[error("hardware bone slot {slot} out of range for the {count}-entry bone-state table")]
    BoneStateRange { slot: usize, count: usize },

    #[error("classic model requires loose vertex data files (vtx/vvd)")]
    MissingVertexData,

    #[error("mesh buffer stream '{0}' written twice")]
    StreamRewrite(&'static str),

    #[error("node {0} initialized twice")]
    NodeReinit(usize),

    #[error("lod {lod} out of range, model has {count} lods")]
    LodRange { lod: usize, count: usize },
}
