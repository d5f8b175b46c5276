//! Shapes.

pub mod mesh;
pub mod sphere;

pub use mesh::{Mesh, MeshData, Triangle};
pub use sphere::Sphere;

use crate::core::geometry::*;
use crate::core::interaction::Interaction;
use crate::core::params::Params;
use crate::core::pbrt::Float;
use crate::core::transform::{Matrix4x4, Transform};
use std::sync::Arc;

/// The closed set of shapes. Spheres and triangles are the primitives the
/// intersection routines run against; a mesh is a group that produces one
/// triangle shape per face.
pub enum Shape {
    Sphere(Sphere),
    Triangle(Triangle),
    Mesh(Mesh),
}

impl Shape {
    /// Intersects a world-space ray, returning the nearest interaction
    /// inside the ray's parametric extent.
    pub fn intersect(&self, r: &Ray) -> Option<Interaction> {
        match self {
            Shape::Sphere(s) => s.intersect(r),
            Shape::Triangle(t) => t.intersect(r),
            Shape::Mesh(m) => m.intersect(r),
        }
    }

    /// Predicate form of [`intersect`](Self::intersect); returns on the
    /// first hit without building an interaction.
    pub fn q_intersect(&self, r: &Ray) -> bool {
        match self {
            Shape::Sphere(s) => s.q_intersect(r),
            Shape::Triangle(t) => t.q_intersect(r),
            Shape::Mesh(m) => m.q_intersect(r),
        }
    }

    pub fn area(&self) -> Float {
        match self {
            Shape::Sphere(s) => s.area(),
            Shape::Triangle(t) => t.area(),
            Shape::Mesh(_) => panic!("Mesh::area() should be called on its faces"),
        }
    }

    /// World-space bounds.
    pub fn bounds(&self) -> Bounds3f {
        match self {
            Shape::Sphere(s) => s.bounds(),
            Shape::Triangle(t) => t.bounds(),
            Shape::Mesh(m) => m.bounds(),
        }
    }

    pub fn world_to_obj(&self) -> Transform {
        match self {
            Shape::Sphere(s) => s.world_to_obj(),
            Shape::Triangle(t) => t.world_to_obj(),
            Shape::Mesh(m) => m.world_to_obj(),
        }
    }

    /// Uniform area sample over the surface. `pdf` is `1 / area` with
    /// respect to area measure.
    pub fn sample(&self, u: Vector2f) -> Interaction {
        match self {
            Shape::Sphere(s) => s.sample(u),
            Shape::Triangle(t) => t.sample(u),
            Shape::Mesh(_) => panic!("Mesh::sample() should be called on its faces"),
        }
    }

    pub fn pdf(&self) -> Float {
        match self {
            Shape::Sphere(s) => s.pdf(),
            Shape::Triangle(t) => t.pdf(),
            Shape::Mesh(_) => panic!("Mesh::pdf() should be called on its faces"),
        }
    }

    /// Sample conditioned on a reference point; the default shapes sample
    /// the whole surface uniformly.
    pub fn sample_from(&self, _reference: &Interaction, u: Vector2f) -> Interaction {
        self.sample(u)
    }

    /// PDF of sampling direction `wi` from `reference`, converted to solid
    /// angle measure with the distance-squared over projected-area factor.
    pub fn pdf_from(&self, reference: &Interaction, wi: Vector3f) -> Float {
        match self {
            Shape::Sphere(s) => s.pdf_from(reference, wi),
            Shape::Triangle(t) => t.pdf_from(reference, wi),
            Shape::Mesh(_) => panic!("Mesh::pdf() should be called on its faces"),
        }
    }

    /// Per-face shapes for group shapes, `None` otherwise.
    pub fn faces(&self) -> Option<&[Arc<Shape>]> {
        match self {
            Shape::Mesh(m) => Some(m.faces()),
            _ => None,
        }
    }

    /// Builds a shape from scene parameters. Unknown or incomplete
    /// descriptions log an error and yield `None`.
    pub fn from_params(p: &Params) -> Option<Arc<Shape>> {
        let kind = p.string("type");
        match kind.as_str() {
            "" => {
                error!("Unspecified shape type");
                None
            }
            "sphere" => {
                let radius = p.f32("radius", 1.0);
                let mat = p.matrix44f("transform", Matrix4x4::default());
                Some(Arc::new(Shape::Sphere(Sphere::new(
                    Transform::new(mat),
                    radius,
                ))))
            }
            "mesh" => mesh_from_params(p),
            _ => {
                error!("Unknown shape : \"{}\"", kind);
                None
            }
        }
    }
}

fn mesh_from_params(p: &Params) -> Option<Arc<Shape>> {
    let count = p.value("count");
    let vertices = p.value("vertices");
    let indices = p.value("indices");

    if count.is_none() || vertices.is_none() || indices.is_none() {
        if count.is_none() {
            error!("Mesh parameter \"count\" not specified");
        }
        if vertices.is_none() {
            error!("Mesh parameter \"vertices\" not specified");
        }
        if indices.is_none() {
            error!("Mesh parameter \"indices\" not specified");
        }
        return None;
    }
    let (count, vertices, indices) = (count.unwrap(), vertices.unwrap(), indices.unwrap());

    let n_faces = count.u64() as usize;
    let v: Vec<Vector3f> = vertices
        .f32_vec()
        .chunks_exact(3)
        .map(|c| Vector3f::new(c[0], c[1], c[2]))
        .collect();
    let i: Vec<u32> = indices.u32_vec();

    let n = p.value("normals").map(|val| {
        val.f32_vec()
            .chunks_exact(3)
            .map(|c| Vector3f::new(c[0], c[1], c[2]))
            .collect::<Vec<_>>()
    });
    let uv = p.value("uv").map(|val| {
        val.f32_vec()
            .chunks_exact(2)
            .map(|c| Vector2f::new(c[0], c[1]))
            .collect::<Vec<_>>()
    });

    let t = Transform::new(p.matrix44f("transform", Matrix4x4::default()));
    let md = MeshData::new(n_faces, v, n, uv, i, t);
    Some(Arc::new(Shape::Mesh(Mesh::new(md))))
}
