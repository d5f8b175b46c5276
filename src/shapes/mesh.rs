//! Triangle meshes.

use crate::core::geometry::*;
use crate::core::interaction::{Interaction, Shading};
use crate::core::pbrt::*;
use crate::core::sampling::uniform_sample_triangle;
use crate::core::transform::Transform;
use crate::shapes::Shape;
use std::sync::Arc;

/// Vertex and index storage shared by every triangle of a mesh.
pub struct MeshData {
    pub world_to_obj: Transform,
    pub obj_to_world: Transform,
    pub vertices: Vec<Vector3f>,
    pub normals: Option<Vec<Vector3f>>,
    pub uv: Option<Vec<Vector2f>>,
    pub indices: Vec<u32>,
    pub n_faces: usize,
}

impl MeshData {
    pub fn new(
        n_faces: usize,
        vertices: Vec<Vector3f>,
        normals: Option<Vec<Vector3f>>,
        uv: Option<Vec<Vector2f>>,
        indices: Vec<u32>,
        world_to_obj: Transform,
    ) -> Arc<Self> {
        assert!(indices.len() >= 3 * n_faces, "Mesh index buffer too short");
        Arc::new(Self {
            world_to_obj,
            obj_to_world: world_to_obj.inverse(),
            vertices,
            normals,
            uv,
            indices,
            n_faces,
        })
    }
}

/// One face of a mesh, referencing the shared vertex data by index.
pub struct Triangle {
    md: Arc<MeshData>,
    face: usize,
}

impl Triangle {
    pub fn new(md: Arc<MeshData>, face: usize) -> Self {
        Self { md, face }
    }

    fn vertex_indices(&self) -> [usize; 3] {
        let i = 3 * self.face;
        [
            self.md.indices[i] as usize,
            self.md.indices[i + 1] as usize,
            self.md.indices[i + 2] as usize,
        ]
    }

    fn positions(&self) -> [Vector3f; 3] {
        let [i0, i1, i2] = self.vertex_indices();
        [
            self.md.vertices[i0],
            self.md.vertices[i1],
            self.md.vertices[i2],
        ]
    }

    pub fn area(&self) -> Float {
        let [p0, p1, p2] = self.positions();
        let p0 = self.md.obj_to_world.apply_point(p0);
        let p1 = self.md.obj_to_world.apply_point(p1);
        let p2 = self.md.obj_to_world.apply_point(p2);
        0.5 * cross(p1 - p0, p2 - p0).length()
    }

    pub fn bounds(&self) -> Bounds3f {
        let [p0, p1, p2] = self.positions();
        self.md
            .obj_to_world
            .apply_bounds(&Bounds3f::new(p0, p1).union_point(p2))
    }

    pub fn world_to_obj(&self) -> Transform {
        self.md.world_to_obj
    }

    /// Watertight intersection test: the triangle is translated so the ray
    /// starts at the origin, permuted so the dominant direction component
    /// is `z`, and sheared so the direction becomes `(0, 0, 1)`; the hit
    /// test then reduces to 2D edge functions. The accepted `t` must clear
    /// a conservative error bound so catastrophic cancellation cannot
    /// produce hits behind the origin.
    fn intersect_common(&self, r: &Ray) -> Option<(Float, Float, Float, Float, [Vector3f; 3])> {
        let [p0, p1, p2] = self.positions();

        // Translate and permute into ray space.
        let kz = r.d.abs().max_dimension();
        let kx = (kz + 1) % 3;
        let ky = (kx + 1) % 3;

        let d = r.d.permute(kx, ky, kz);
        let mut p0t = (p0 - r.o).permute(kx, ky, kz);
        let mut p1t = (p1 - r.o).permute(kx, ky, kz);
        let mut p2t = (p2 - r.o).permute(kx, ky, kz);

        // Shear so the ray direction is +z.
        let sx = -d.x / d.z;
        let sy = -d.y / d.z;
        let sz = 1.0 / d.z;

        p0t.x += sx * p0t.z;
        p0t.y += sy * p0t.z;
        p0t.z *= sz;

        p1t.x += sx * p1t.z;
        p1t.y += sy * p1t.z;
        p1t.z *= sz;

        p2t.x += sx * p2t.z;
        p2t.y += sy * p2t.z;
        p2t.z *= sz;

        // Signed edge functions; the hit is inside when they agree in sign.
        let e0 = p1t.x * p2t.y - p1t.y * p2t.x;
        let e1 = p2t.x * p0t.y - p2t.y * p0t.x;
        let e2 = p0t.x * p1t.y - p0t.y * p1t.x;

        if (e0 < 0.0 || e1 < 0.0 || e2 < 0.0) && (e0 > 0.0 || e1 > 0.0 || e2 > 0.0) {
            return None;
        }
        let det = e0 + e1 + e2;
        if float_equal(det, 0.0) {
            return None;
        }

        // Scaled distance, checked against the ray extent before dividing.
        let t_scaled = e0 * p0t.z + e1 * p1t.z + e2 * p2t.z;
        if det > 0.0 && (t_scaled <= 0.0 || t_scaled >= r.t_max * det) {
            return None;
        }
        if det < 0.0 && (t_scaled >= 0.0 || t_scaled <= r.t_max * det) {
            return None;
        }

        let idet = 1.0 / det;
        let b0 = e0 * idet;
        let b1 = e1 * idet;
        let b2 = e2 * idet;
        let t = t_scaled * idet;

        // Conservative bound on the error in t.
        let max_zt = Vector3f::new(p0t.z, p1t.z, p2t.z).abs().max_component();
        let delta_z = gamma(3) * max_zt;

        let max_xt = Vector3f::new(p0t.x, p1t.x, p2t.x).abs().max_component();
        let delta_x = gamma(5) * (max_xt + max_zt);

        let max_yt = Vector3f::new(p0t.y, p1t.y, p2t.y).abs().max_component();
        let delta_y = gamma(5) * (max_yt + max_zt);

        let max_e = Vector3f::new(e0, e1, e2).abs().max_component();
        let delta_e = 2.0 * (gamma(2) * max_xt * max_yt + delta_y * max_xt + delta_x * max_yt);

        let delta_t =
            3.0 * (gamma(3) * max_e * max_zt + delta_e * max_zt + delta_z * max_e) * idet.abs();
        if t <= delta_t {
            return None;
        }

        Some((t, b0, b1, b2, [p0, p1, p2]))
    }

    pub fn intersect(&self, ray: &Ray) -> Option<Interaction> {
        let r = self.md.world_to_obj.apply_ray(ray);
        let (t, b0, b1, b2, [p0, p1, p2]) = self.intersect_common(&r)?;

        let [i0, i1, i2] = self.vertex_indices();
        let (uv0, uv1, uv2) = match &self.md.uv {
            Some(uv) => (uv[i0], uv[i1], uv[i2]),
            None => (
                Vector2f::new(0.0, 0.0),
                Vector2f::new(0.0, 1.0),
                Vector2f::new(1.0, 1.0),
            ),
        };

        let dp02 = p0 - p2;
        let dp12 = p1 - p2;
        let n = normalize(cross(dp02, dp12));

        // Partial derivatives from the UV parameterization; fall back to
        // an arbitrary frame when it is degenerate.
        let duv02 = uv0 - uv2;
        let duv12 = uv1 - uv2;
        let uvdet = duv02.x * duv12.y - duv02.y * duv12.x;
        let (dpdu, dpdv) = if float_equal(uvdet, 0.0) {
            coordinate_system(n)
        } else {
            let inv = 1.0 / uvdet;
            (
                (duv12.y * dp02 - duv02.y * dp12) * inv,
                (-duv12.x * dp02 + duv02.x * dp12) * inv,
            )
        };

        let ns = match &self.md.normals {
            Some(nv) => b0 * nv[i0] + b1 * nv[i1] + b2 * nv[i2],
            None => n,
        };

        let p_abs_sum = Vector3f::new(
            (b0 * p0.x).abs() + (b1 * p1.x).abs() + (b2 * p2.x).abs(),
            (b0 * p0.y).abs() + (b1 * p1.y).abs() + (b2 * p2.y).abs(),
            (b0 * p0.z).abs() + (b1 * p1.z).abs() + (b2 * p2.z).abs(),
        );

        let isect = Interaction {
            t,
            p: b0 * p0 + b1 * p1 + b2 * p2,
            p_error: gamma(7) * p_abs_sum,
            wo: -r.d,
            uv: b0 * uv0 + b1 * uv1 + b2 * uv2,
            n: face_forward(n, ns),
            dpdu,
            dpdv,
            shading: Shading { n: ns, dpdu, dpdv },
            material: None,
            primitive: None,
        };

        Some(self.md.obj_to_world.apply_interaction(&isect))
    }

    pub fn q_intersect(&self, ray: &Ray) -> bool {
        let r = self.md.world_to_obj.apply_ray(ray);
        self.intersect_common(&r).is_some()
    }

    pub fn pdf(&self) -> Float {
        1.0 / self.area()
    }

    pub fn sample(&self, u: Vector2f) -> Interaction {
        let [p0, p1, p2] = self.positions();
        let [i0, i1, i2] = self.vertex_indices();

        let b = uniform_sample_triangle(u);
        let b2 = 1.0 - b.x - b.y;

        let mut it = Interaction::default();
        it.p = b.x * p0 + b.y * p1 + b2 * p2;
        it.n = match &self.md.normals {
            Some(nv) => normalize(b.x * nv[i0] + b.y * nv[i1] + b2 * nv[i2]),
            None => normalize(cross(p1 - p0, p2 - p0)),
        };
        it.p_error = gamma(6)
            * Vector3f::new(
                p0.x.abs().max(p1.x.abs()).max(p2.x.abs()),
                p0.y.abs().max(p1.y.abs()).max(p2.y.abs()),
                p0.z.abs().max(p1.z.abs()).max(p2.z.abs()),
            );

        it.p = self.md.obj_to_world.apply_point(it.p);
        it.n = normalize(self.md.obj_to_world.apply_normal(it.n));
        it
    }

    pub fn pdf_from(&self, reference: &Interaction, wi: Vector3f) -> Float {
        let r = reference.spawn_ray(wi);
        match self.intersect(&r) {
            Some(isect) => {
                distance_squared(reference.p, isect.p) / (abs_dot(isect.n, -wi) * self.area())
            }
            None => 0.0,
        }
    }
}

/// A mesh: a group shape producing one triangle shape per face. The group
/// itself intersects by testing every face; scene construction normally
/// expands the faces into individual primitives instead.
pub struct Mesh {
    md: Arc<MeshData>,
    faces: Vec<Arc<Shape>>,
    bounds: Bounds3f,
}

impl Mesh {
    pub fn new(md: Arc<MeshData>) -> Self {
        let mut faces = Vec::with_capacity(md.n_faces);
        let mut bounds = Bounds3f::default();
        for i in 0..md.n_faces {
            let tri = Triangle::new(Arc::clone(&md), i);
            bounds = bounds.union(&tri.bounds());
            faces.push(Arc::new(Shape::Triangle(tri)));
        }
        Self { md, faces, bounds }
    }

    pub fn faces(&self) -> &[Arc<Shape>] {
        &self.faces
    }

    pub fn bounds(&self) -> Bounds3f {
        self.bounds
    }

    pub fn world_to_obj(&self) -> Transform {
        self.md.world_to_obj
    }

    pub fn intersect(&self, r: &Ray) -> Option<Interaction> {
        let mut t_max = r.t_max;
        let mut hit = None;
        for f in &self.faces {
            if let Some(isect) = f.intersect(&r.clamped(t_max)) {
                t_max = isect.t;
                hit = Some(isect);
            }
        }
        hit
    }

    pub fn q_intersect(&self, r: &Ray) -> bool {
        self.faces.iter().any(|f| f.q_intersect(r))
    }
}
