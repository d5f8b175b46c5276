//! Wavefront OBJ import.

use crate::core::geometry::*;
use crate::core::material::Material;
use crate::core::pbrt::Float;
use crate::core::primitive::Primitive;
use crate::core::spectrum::Spectrum;
use crate::core::texture::Texture;
use crate::core::transform::Transform;
use crate::shapes::{Mesh, MeshData, Shape};
use std::collections::HashMap;
use std::sync::Arc;

/// An OBJ corner: position/texcoord/normal indices, already zero-based.
/// Distinct triples become distinct vertices in the output mesh.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
struct IndexTriple {
    v: usize,
    vt: Option<usize>,
    vn: Option<usize>,
}

fn parse_index(field: &str, count: usize) -> Option<usize> {
    if field.is_empty() {
        return None;
    }
    let ix: i64 = field.parse().ok()?;
    // Negative indices count back from the latest element.
    if ix < 0 {
        let ix = count as i64 + ix;
        if ix >= 0 {
            Some(ix as usize)
        } else {
            None
        }
    } else if ix > 0 {
        Some((ix - 1) as usize)
    } else {
        None
    }
}

fn parse_floats(fields: &[&str]) -> Vec<Float> {
    fields.iter().filter_map(|f| f.parse().ok()).collect()
}

/// Loads an OBJ file into one primitive per face, deduplicating index
/// triples into shared vertex data. Faces with more than three corners
/// are fanned into triangles; every face gets a default gray matte
/// material.
pub fn load_obj(path: &str, transform: &Transform) -> Option<Vec<Arc<Primitive>>> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            error!("load_obj: {}: {}", path, e);
            return None;
        }
    };

    let mut positions: Vec<Vector3f> = Vec::new();
    let mut normals_in: Vec<Vector3f> = Vec::new();
    let mut texcoords_in: Vec<Vector2f> = Vec::new();

    let mut vertices: Vec<Vector3f> = Vec::new();
    let mut normals: Vec<Vector3f> = Vec::new();
    let mut texcoords: Vec<Vector2f> = Vec::new();
    let mut indices: Vec<u32> = Vec::new();
    let mut remap: HashMap<IndexTriple, u32> = HashMap::new();
    let mut has_normals = true;
    let mut has_texcoords = true;

    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut fields = line.split_whitespace();
        let keyword = fields.next().unwrap_or("");
        let fields: Vec<&str> = fields.collect();

        match keyword {
            "v" => {
                let n = parse_floats(&fields);
                if n.len() >= 3 {
                    positions.push(Vector3f::new(n[0], n[1], n[2]));
                } else {
                    warn!("load_obj: {}:{}: malformed vertex", path, line_no + 1);
                }
            }
            "vn" => {
                let n = parse_floats(&fields);
                if n.len() >= 3 {
                    normals_in.push(Vector3f::new(n[0], n[1], n[2]));
                }
            }
            "vt" => {
                let n = parse_floats(&fields);
                if n.len() >= 2 {
                    texcoords_in.push(Vector2f::new(n[0], n[1]));
                }
            }
            "f" => {
                let mut corners = Vec::with_capacity(fields.len());
                for field in &fields {
                    let mut it = field.split('/');
                    let v = parse_index(it.next().unwrap_or(""), positions.len());
                    let vt = it.next().and_then(|f| parse_index(f, texcoords_in.len()));
                    let vn = it.next().and_then(|f| parse_index(f, normals_in.len()));

                    let Some(v) = v else {
                        warn!("load_obj: {}:{}: malformed face", path, line_no + 1);
                        continue;
                    };
                    let triple = IndexTriple { v, vt, vn };

                    let ix = *remap.entry(triple).or_insert_with(|| {
                        vertices.push(positions.get(v).copied().unwrap_or_default());
                        match vn.and_then(|i| normals_in.get(i)) {
                            Some(&n) => normals.push(n),
                            None => has_normals = false,
                        }
                        match vt.and_then(|i| texcoords_in.get(i)) {
                            Some(&uv) => texcoords.push(uv),
                            None => has_texcoords = false,
                        }
                        (vertices.len() - 1) as u32
                    });
                    corners.push(ix);
                }
                // Triangle fan for quads and beyond.
                for i in 2..corners.len() {
                    indices.push(corners[0]);
                    indices.push(corners[i - 1]);
                    indices.push(corners[i]);
                }
            }
            // Object, group, material and smoothing statements don't
            // change the geometry we build.
            "o" | "g" | "s" | "mtllib" | "usemtl" => {}
            _ => {}
        }
    }

    if indices.is_empty() {
        error!("load_obj: {}: no faces found", path);
        return None;
    }

    let n_faces = indices.len() / 3;
    let md = MeshData::new(
        n_faces,
        vertices,
        if has_normals && !normals.is_empty() {
            Some(normals)
        } else {
            None
        },
        if has_texcoords && !texcoords.is_empty() {
            Some(texcoords)
        } else {
            None
        },
        indices,
        transform.inverse(),
    );

    let mesh = Arc::new(Shape::Mesh(Mesh::new(md)));
    let material: Arc<Material> = Arc::new(Material::Lambertian {
        kd: Texture::constant(Spectrum::new(0.5)),
    });

    Some(Primitive::from_shape(mesh, Some(material), None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_obj(content: &str) -> (tempfile::TempDir, String) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mesh.obj");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        let p = path.to_str().unwrap().to_string();
        (dir, p)
    }

    #[test]
    fn loads_a_quad_as_two_triangles() {
        let (_dir, path) = write_obj(
            "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n",
        );
        let prims = load_obj(&path, &Transform::default()).unwrap();
        assert_eq!(prims.len(), 2);

        let b = prims
            .iter()
            .fold(crate::core::geometry::Bounds3f::default(), |b, p| {
                b.union(&p.bounds())
            });
        assert_eq!(b.lo, Vector3f::new(0.0, 0.0, 0.0));
        assert_eq!(b.hi, Vector3f::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn dedupes_shared_corners() {
        let (_dir, path) = write_obj(
            "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3\nf 1 3 4\n",
        );
        let prims = load_obj(&path, &Transform::default()).unwrap();
        assert_eq!(prims.len(), 2);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_obj("/nonexistent/mesh.obj", &Transform::default()).is_none());
    }
}
