//! Sampling warps and multiple importance sampling weights.

use crate::core::geometry::*;
use crate::core::pbrt::*;

/// Maps a uniform sample onto the unit disk.
pub fn uniform_sample_disk(u: Vector2f) -> Vector2f {
    let r = (u.x as f64).sqrt();
    let a = 2.0 * std::f64::consts::PI * u.y as f64;
    Vector2f::new((r * a.cos()) as Float, (r * a.sin()) as Float)
}

/// Maps a uniform sample onto the unit sphere.
pub fn uniform_sample_sphere(u: Vector2f) -> Vector3f {
    let z = 1.0 - 2.0 * u.x;
    let r = (1.0 - z * z).max(0.0).sqrt();
    let phi = 2.0 * PI * u.y;
    Vector3f::new(r * phi.cos(), r * phi.sin(), z)
}

/// Maps a uniform sample to barycentric coordinates `(b0, b1)` uniformly
/// distributed over a triangle.
pub fn uniform_sample_triangle(u: Vector2f) -> Vector2f {
    let su0 = u.x.sqrt();
    Vector2f::new(1.0 - su0, u.y * su0)
}

/// Cosine-weighted direction in the `+z` hemisphere.
pub fn cosine_sample_hemisphere(u: Vector2f) -> Vector3f {
    let d = uniform_sample_disk(u);
    let z = (1.0 - d.x * d.x - d.y * d.y).max(0.0).sqrt();
    Vector3f::new(d.x, d.y, z)
}

pub fn cosine_hemisphere_pdf(cos_theta: Float) -> Float {
    cos_theta * INV_PI
}

/// Power heuristic with exponent 2 for combining two sampling strategies.
pub fn power_heuristic(nf: i32, f_pdf: Float, ng: i32, g_pdf: Float) -> Float {
    let f = nf as Float * f_pdf;
    let g = ng as Float * g_pdf;
    (f * f) / (f * f + g * g)
}
