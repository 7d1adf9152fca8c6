//! studio-export library
//!
//! Decodes versioned "studio model" binaries (two engine lineages: the
//! classic r1/r2 layouts with loose VTX/VVD/VVW data, and the rtech v8..v19
//! layouts with baked "VG" hardware data) into one version-agnostic
//! [`model::ParsedModel`], then re-serializes that representation to
//! interchange formats (SMD text, MSCN binary scene).

pub mod bones;
pub mod entities;
pub mod error;
pub mod export;
pub mod loader;
pub mod meshbuf;
pub mod model;
pub mod studio;
pub mod vertex;

pub use error::{Error, Result};
pub use loader::{AlignedBuffer, ClassicBuffers, Loader};
pub use meshbuf::{MeshBuffer, MeshBufferWriter};
pub use model::{Bone, MaterialHandle, MaterialRef, Name, ParsedModel};
pub use studio::StudioVersion;
pub use vertex::{Vertex, VertexWeight};
