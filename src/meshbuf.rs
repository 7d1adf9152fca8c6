//! Compact mesh buffer.
//!
//! One self-describing allocation holding the normalized index, vertex,
//! weight and texcoord streams for a LOD, with a small fixed header of byte
//! offsets. Offset 0 means "stream absent" (the header occupies offset 0,
//! so no stream can legitimately start there). Write-once: streams are
//! appended through [`MeshBufferWriter`], then the buffer is sealed and
//! read-only. The sealed block is 16-byte aligned so stream accessors are
//! plain casts.

use bytemuck::{Pod, Zeroable};
use glam::Vec2;

use crate::error::{Error, Result};
use crate::vertex::{Vertex, VertexWeight};

/// Fixed buffer header. Offsets are from the start of the block; each
/// stream also records its element count so accessors are exactly sized.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
struct MeshBufHeader {
    index_offset: u64,
    index_count: u64,
    vertex_offset: u64,
    vertex_count: u64,
    weight_offset: u64,
    weight_count: u64,
    texcoord_offset: u64,
    texcoord_count: u64,
    size: u64,
}

const HEADER_SIZE: usize = std::mem::size_of::<MeshBufHeader>();
const STREAM_ALIGN: usize = 16;

fn align_up(v: usize) -> usize {
    (v + (STREAM_ALIGN - 1)) & !(STREAM_ALIGN - 1)
}

/// Append cursor over a growing block. Each stream may be written at most
/// once; streams may arrive in any order.
pub struct MeshBufferWriter {
    header: MeshBufHeader,
    data: Vec<u8>,
    wrote: [bool; 4],
}

impl MeshBufferWriter {
    pub fn new() -> Self {
        MeshBufferWriter {
            header: MeshBufHeader::default(),
            data: vec![0u8; align_up(HEADER_SIZE)],
            wrote: [false; 4],
        }
    }

    fn append<T: Pod>(
        &mut self,
        stream: usize,
        name: &'static str,
        items: &[T],
    ) -> Result<(u64, u64)> {
        if self.wrote[stream] {
            return Err(Error::StreamRewrite(name));
        }
        self.wrote[stream] = true;

        // a zero-element write leaves the offset at 0: the stream is absent
        if items.is_empty() {
            return Ok((0, 0));
        }

        let offset = align_up(self.data.len());
        self.data.resize(offset, 0);
        self.data.extend_from_slice(bytemuck::cast_slice(items));
        Ok((offset as u64, items.len() as u64))
    }

    pub fn add_indices(&mut self, indices: &[u16]) -> Result<()> {
        (self.header.index_offset, self.header.index_count) =
            self.append(0, "indices", indices)?;
        Ok(())
    }

    pub fn add_vertices(&mut self, vertices: &[Vertex]) -> Result<()> {
        (self.header.vertex_offset, self.header.vertex_count) =
            self.append(1, "vertices", vertices)?;
        Ok(())
    }

    pub fn add_weights(&mut self, weights: &[VertexWeight]) -> Result<()> {
        (self.header.weight_offset, self.header.weight_count) =
            self.append(2, "weights", weights)?;
        Ok(())
    }

    pub fn add_texcoords(&mut self, texcoords: &[Vec2]) -> Result<()> {
        (self.header.texcoord_offset, self.header.texcoord_count) =
            self.append(3, "texcoords", texcoords)?;
        Ok(())
    }

    /// Fix the final size, discard write state and move the block into
    /// 16-byte-aligned read-only storage.
    pub fn seal(mut self) -> MeshBuffer {
        self.header.size = self.data.len() as u64;
        self.data[..HEADER_SIZE].copy_from_slice(bytemuck::bytes_of(&self.header));

        let mut words = vec![0u128; align_up(self.data.len()) / STREAM_ALIGN];
        bytemuck::cast_slice_mut::<u128, u8>(&mut words)[..self.data.len()]
            .copy_from_slice(&self.data);
        MeshBuffer {
            words: words.into_boxed_slice(),
            size: self.data.len(),
        }
    }
}

impl Default for MeshBufferWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Sealed, read-only mesh block. Accessors return `None` for absent
/// streams, never an empty slice at offset 0.
#[derive(Debug)]
pub struct MeshBuffer {
    words: Box<[u128]>,
    size: usize,
}

impl MeshBuffer {
    pub fn as_bytes(&self) -> &[u8] {
        &bytemuck::cast_slice(&self.words)[..self.size]
    }

    fn header(&self) -> MeshBufHeader {
        bytemuck::pod_read_unaligned(&self.as_bytes()[..HEADER_SIZE])
    }

    fn stream<T: Pod>(&self, offset: u64, count: u64) -> Option<&[T]> {
        if offset == 0 {
            return None;
        }
        let start = offset as usize;
        let end = start + count as usize * std::mem::size_of::<T>();
        Some(bytemuck::cast_slice(&self.as_bytes()[start..end]))
    }

    pub fn indices(&self) -> Option<&[u16]> {
        let hdr = self.header();
        self.stream(hdr.index_offset, hdr.index_count)
    }

    pub fn vertices(&self) -> Option<&[Vertex]> {
        let hdr = self.header();
        self.stream(hdr.vertex_offset, hdr.vertex_count)
    }

    pub fn weights(&self) -> Option<&[VertexWeight]> {
        let hdr = self.header();
        self.stream(hdr.weight_offset, hdr.weight_count)
    }

    pub fn texcoords(&self) -> Option<&[Vec2]> {
        let hdr = self.header();
        self.stream(hdr.texcoord_offset, hdr.texcoord_count)
    }

    pub fn size(&self) -> u64 {
        self.header().size
    }
}
