//! Surface interactions.

use crate::core::geometry::*;
use crate::core::material::Material;
use crate::core::pbrt::*;
use crate::core::primitive::Primitive;
use std::sync::Arc;

/// Shading geometry, possibly differing from the true surface geometry
/// when interpolated normals are present.
#[derive(Copy, Clone, Debug, Default)]
pub struct Shading {
    pub n: Vector3f,
    pub dpdu: Vector3f,
    pub dpdv: Vector3f,
}

/// A point on a surface produced by a ray intersection: position with its
/// floating point error bound, parametric distance, local geometry and the
/// primitive that was hit.
#[derive(Clone, Default)]
pub struct Interaction {
    /// Point of interaction.
    pub p: Vector3f,

    /// Conservative bound on the rounding error of `p`.
    pub p_error: Vector3f,

    /// Parametric distance along the ray.
    pub t: Float,

    /// Surface parameterization.
    pub uv: Vector2f,

    /// Outgoing direction at the surface, the negated ray direction.
    pub wo: Vector3f,

    /// Geometric normal.
    pub n: Vector3f,

    pub dpdu: Vector3f,
    pub dpdv: Vector3f,

    /// Shading frame.
    pub shading: Shading,

    pub material: Option<Arc<Material>>,
    pub primitive: Option<Arc<Primitive>>,
}

impl Interaction {
    /// An interaction at a bare point, used for light sampling references.
    pub fn from_point(p: Vector3f) -> Self {
        Self {
            p,
            ..Default::default()
        }
    }

    /// Offsets `p` along the geometric normal far enough to escape its own
    /// error interval in the direction `d`, then snaps each coordinate one
    /// ulp further out so a spawned ray cannot re-hit the surface it
    /// started on.
    pub fn offset_origin(&self, d: Vector3f) -> Vector3f {
        let dist = dot(self.n.abs(), self.p_error);
        let mut offset = dist * self.n;
        if dot(d, self.n) < 0.0 {
            offset = -offset;
        }
        let mut po = self.p + offset;
        for i in 0..3 {
            if offset[i] > 0.0 {
                po[i] = next_float_up(po[i]);
            } else if offset[i] < 0.0 {
                po[i] = next_float_down(po[i]);
            }
        }
        po
    }

    /// Spawns an open-ended ray leaving the surface in direction `d`.
    pub fn spawn_ray(&self, d: Vector3f) -> Ray {
        Ray::new(self.offset_origin(d), d)
    }

    /// Spawns a ray towards a point, stopping just short of it.
    pub fn spawn_ray_to_point(&self, p: Vector3f) -> Ray {
        let o = self.offset_origin(p - self.p);
        Ray::with_max(o, p - o, 1.0 - SHADOW_EPSILON)
    }

    /// Spawns a ray towards another interaction, offsetting both endpoints
    /// out of their error intervals.
    pub fn spawn_ray_to(&self, it: &Interaction) -> Ray {
        let o = self.offset_origin(it.p - self.p);
        let target = it.offset_origin(o - it.p);
        Ray::with_max(o, target - o, 1.0 - SHADOW_EPSILON)
    }
}
