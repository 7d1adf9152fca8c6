//! SMD text exporter.
//!
//! Grammar: `version 1`, a `nodes` block (index, quoted name, parent), a
//! `skeleton` block (one `time N` frame of bone-local position + Euler
//! rotation per bone), and a `triangles` block that is emitted only when
//! triangles were enqueued. Floats use Rust's default `Display`, which is
//! shortest-roundtrip rather than fixed-precision.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use glam::{Vec2, Vec3};

use crate::error::Error;
use crate::model::ParsedModel;
use crate::vertex::{unpack_normal_u32, Vertex, VertexWeight};

/// SMD node table. A node may be named exactly once; re-initializing a
/// named node is malformed input.
pub struct NodeTable {
    nodes: Vec<Option<(String, i32)>>,
}

impl NodeTable {
    pub fn with_capacity(count: usize) -> Self {
        NodeTable {
            nodes: vec![None; count],
        }
    }

    pub fn set(&mut self, id: usize, name: &str, parent: i32) -> Result<(), Error> {
        if id >= self.nodes.len() {
            self.nodes.resize(id + 1, None);
        }
        if self.nodes[id].is_some() {
            return Err(Error::NodeReinit(id));
        }
        self.nodes[id] = Some((name.to_owned(), parent));
        Ok(())
    }

    fn write<W: Write>(&self, w: &mut W) -> Result<()> {
        writeln!(w, "nodes")?;
        for (id, node) in self.nodes.iter().enumerate() {
            let (name, parent) = match node {
                Some(n) => (n.0.as_str(), n.1),
                None => ("", -1),
            };
            writeln!(w, "{id} \"{name}\" {parent}")?;
        }
        writeln!(w, "end")?;
        Ok(())
    }
}

struct SmdVertex {
    parent_bone: i32,
    position: Vec3,
    normal: Vec3,
    uv: Vec2,
    weights: Vec<VertexWeight>,
}

fn resolve_vertex(v: &Vertex, weights: Option<&[VertexWeight]>) -> SmdVertex {
    let vw = weights
        .and_then(|w| {
            w.get(v.weight_index() as usize..(v.weight_index() + v.weight_count()) as usize)
        })
        .unwrap_or(&[]);
    SmdVertex {
        parent_bone: vw.first().map(|w| w.bone as i32).unwrap_or(0),
        position: v.position,
        normal: unpack_normal_u32(v.normal_packed),
        uv: v.uv0,
        weights: vw.to_vec(),
    }
}

fn write_vertex<W: Write>(w: &mut W, v: &SmdVertex) -> Result<()> {
    write!(
        w,
        "{} {} {} {} {} {} {} {} {}",
        v.parent_bone,
        v.position.x,
        v.position.y,
        v.position.z,
        v.normal.x,
        v.normal.y,
        v.normal.z,
        v.uv.x,
        v.uv.y,
    )?;
    // the weight count is part of every vertex line, even when zero
    write!(w, " {}", v.weights.len())?;
    for vw in &v.weights {
        write!(w, " {} {}", vw.bone, vw.weight)?;
    }
    writeln!(w)?;
    Ok(())
}

/// Serialize one LOD of a parsed model as SMD text. `bias_studio_names`
/// selects which side wins when a mesh has both a studio material name and
/// a resolved material asset.
pub fn write_smd<W: Write>(
    w: &mut W,
    model: &ParsedModel<'_>,
    lod: usize,
    bias_studio_names: bool,
) -> Result<()> {
    let lod_data = model.lod(lod)?;
    let buffer = model.mesh_buffer(lod)?;

    writeln!(w, "version 1")?;

    let mut nodes = NodeTable::with_capacity(model.bones.len());
    for (id, bone) in model.bones.iter().enumerate() {
        nodes.set(id, bone.name, bone.parent)?;
    }
    nodes.write(w)?;

    // single bind-pose frame
    writeln!(w, "skeleton")?;
    writeln!(w, "time 0")?;
    for (id, bone) in model.bones.iter().enumerate() {
        writeln!(
            w,
            "{id} {} {} {} {} {} {}",
            bone.pos.x, bone.pos.y, bone.pos.z, bone.rot.x, bone.rot.y, bone.rot.z,
        )?;
    }
    writeln!(w, "end")?;

    let (Some(indices), Some(vertices)) = (buffer.indices(), buffer.vertices()) else {
        return Ok(());
    };
    if indices.is_empty() {
        return Ok(());
    }
    let weights = buffer.weights();

    writeln!(w, "triangles")?;
    let mut index_cursor = 0usize;
    for mesh in &lod_data.meshes {
        let count = mesh.index_count as usize;
        let range = indices.get(index_cursor..index_cursor + count).ok_or(
            Error::Truncated {
                offset: index_cursor,
                needed: count,
                len: indices.len(),
            },
        )?;
        index_cursor += count;

        let material = mesh
            .material
            .and_then(|i| model.materials.get(i))
            .map(|m| m.name(bias_studio_names).to_owned())
            .unwrap_or_else(|| format!("material_{}", mesh.material_id));

        for tri in range.chunks_exact(3) {
            writeln!(w, "{material}")?;
            for &idx in tri {
                let v = vertices.get(idx as usize).ok_or(Error::Truncated {
                    offset: idx as usize,
                    needed: 1,
                    len: vertices.len(),
                })?;
                write_vertex(w, &resolve_vertex(v, weights))?;
            }
        }
    }
    writeln!(w, "end")?;
    Ok(())
}

/// Export one LOD to `path`, atomically.
pub fn export_smd(
    model: &ParsedModel<'_>,
    lod: usize,
    path: &Path,
    bias_studio_names: bool,
) -> Result<()> {
    super::write_atomic(path, |w| write_smd(w, model, lod, bias_studio_names))
        .with_context(|| format!("exporting smd to {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meshbuf::MeshBufferWriter;
    use crate::model::{Bone, LodData};
    use crate::studio::{GenericStudioHdr, Mat34, StudioVersion};
    use glam::Quat;

    #[test]
    fn empty_lod_skips_the_triangles_block() {
        let mut model = ParsedModel::new(GenericStudioHdr::new(StudioVersion::V8));
        model.bones.push(Bone {
            name: "root",
            parent: -1,
            flags: 0,
            proc_type: 0,
            proc_index: 0,
            physics_bone: 0,
            surface_prop_idx: 0,
            contents: 0,
            pose_to_bone: &Mat34::IDENTITY,
            pos: Vec3::ZERO,
            quat: Quat::IDENTITY,
            rot: Vec3::ZERO,
            scale: Vec3::ONE,
            record_offset: 0,
        });
        model.lods.push(LodData {
            models: Vec::new(),
            meshes: Vec::new(),
            vertex_count: 0,
            index_count: 0,
            switch_point: 0.0,
            texcoords_per_vert: 1,
            weights_per_vert: 0,
        });
        model.mesh_buffers.push(MeshBufferWriter::new().seal());

        let mut out = Vec::new();
        write_smd(&mut out, &model, 0, false).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("version 1\nnodes\n0 \"root\" -1\nend\n"));
        assert!(text.contains("skeleton\ntime 0\n"));
        assert!(!text.contains("triangles"));
    }

    #[test]
    fn node_table_rejects_reinitialization() {
        let mut nodes = NodeTable::with_capacity(2);
        nodes.set(0, "root", -1).unwrap();
        nodes.set(1, "child", 0).unwrap();
        let err = nodes.set(0, "root_again", -1).unwrap_err();
        assert!(matches!(err, Error::NodeReinit(0)));
    }

    #[test]
    fn vertex_line_appends_weight_pairs() {
        let v = SmdVertex {
            parent_bone: 2,
            position: Vec3::new(1.0, 2.0, 3.0),
            normal: Vec3::Z,
            uv: Vec2::new(0.5, 0.25),
            weights: vec![VertexWeight::new(2, 0.75), VertexWeight::new(5, 0.25)],
        };
        let mut out = Vec::new();
        write_vertex(&mut out, &v).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "2 1 2 3 0 0 1 0.5 0.25 2 2 0.75 5 0.25\n"
        );
    }

    #[test]
    fn unweighted_vertex_still_writes_its_weight_count() {
        let v = SmdVertex {
            parent_bone: 0,
            position: Vec3::ZERO,
            normal: Vec3::Z,
            uv: Vec2::ZERO,
            weights: Vec::new(),
        };
        let mut out = Vec::new();
        write_vertex(&mut out, &v).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "0 0 0 0 0 0 1 0 0 0\n");
    }
}
