//! Spheres.

use crate::core::efloat::{quadratic_efloat, EFloat};
use crate::core::geometry::*;
use crate::core::interaction::{Interaction, Shading};
use crate::core::pbrt::*;
use crate::core::sampling::uniform_sample_sphere;
use crate::core::transform::Transform;

/// A sphere of a given radius, centered at the origin of its object space;
/// placement in the scene comes entirely from the world-to-object
/// transform. Intersections are performed in object space over
/// error-bounded coefficients so roots near zero cannot flip sign.
pub struct Sphere {
    world_to_obj: Transform,
    bounds: Bounds3f,
    radius: Float,
}

/// Quadratic coefficients of the ray/sphere intersection, carrying the
/// transform error bounds of the object-space ray.
fn sphere_quadratic(
    r: &Ray,
    o_error: Vector3f,
    d_error: Vector3f,
    radius: Float,
) -> Option<(EFloat, EFloat)> {
    let ox = EFloat::new(r.o.x, o_error.x);
    let oy = EFloat::new(r.o.y, o_error.y);
    let oz = EFloat::new(r.o.z, o_error.z);

    let dx = EFloat::new(r.d.x, d_error.x);
    let dy = EFloat::new(r.d.y, d_error.y);
    let dz = EFloat::new(r.d.z, d_error.z);

    let a = dx * dx + dy * dy + dz * dz;
    let b = 2.0 * (dx * ox + dy * oy + dz * oz);
    let c = ox * ox + oy * oy + oz * oz - EFloat::from(radius) * EFloat::from(radius);

    quadratic_efloat(a, b, c)
}

impl Sphere {
    pub fn new(world_to_obj: Transform, radius: Float) -> Self {
        let r = Vector3f::new(radius, radius, radius);
        Self {
            world_to_obj,
            bounds: world_to_obj.inverse().apply_bounds(&Bounds3f::new(-r, r)),
            radius,
        }
    }

    pub fn radius(&self) -> Float {
        self.radius
    }

    pub fn area(&self) -> Float {
        4.0 * PI * self.radius * self.radius
    }

    pub fn bounds(&self) -> Bounds3f {
        self.bounds
    }

    pub fn world_to_obj(&self) -> Transform {
        self.world_to_obj
    }

    pub fn intersect(&self, ray: &Ray) -> Option<Interaction> {
        let (r, o_error, d_error) = self.world_to_obj.apply_ray_error(ray);

        let (t0, t1) = sphere_quadratic(&r, o_error, d_error, self.radius)?;

        // Select the nearest root whose whole interval is inside the
        // parametric range; testing the interval bounds keeps roots that
        // merely straddle zero from being accepted.
        let t = if t0.lo() > 0.0 && t0.hi() < r.t_max {
            t0
        } else {
            t1
        };
        if t.lo() <= 0.0 || t.hi() >= r.t_max {
            return None;
        }

        let mut isect = Interaction {
            t: t.value(),
            ..Default::default()
        };
        isect.p = r.at(isect.t);
        isect.n = normalize(isect.p);
        isect.wo = -r.d;

        // Reproject onto the exact sphere before deriving the error bound.
        isect.p *= self.radius / isect.p.length();
        isect.p_error = gamma(5) * isect.p.abs();

        let p = isect.n;
        let theta = (clamp(p.y as f64, -1.0, 1.0)).acos();
        let mut phi = (p.x as f64).atan2(p.z as f64);
        if phi < 0.0 {
            phi += 2.0 * std::f64::consts::PI;
        }
        isect.uv = Vector2f::new(
            (phi / (2.0 * std::f64::consts::PI)) as Float,
            (theta / std::f64::consts::PI) as Float,
        );

        let d = ((p.x * p.x + p.z * p.z) as f64).sqrt();
        let sin_phi = p.x as f64 / d;
        let cos_phi = p.z as f64 / d;
        isect.dpdu = Vector3f::new(
            (2.0 * std::f64::consts::PI * p.z as f64) as Float,
            0.0,
            (-2.0 * std::f64::consts::PI * p.x as f64) as Float,
        );
        isect.dpdv = Vector3f::new(
            (std::f64::consts::PI * p.y as f64 * sin_phi) as Float,
            (std::f64::consts::PI * -d) as Float,
            (std::f64::consts::PI * p.y as f64 * cos_phi) as Float,
        );

        isect.shading = Shading {
            n: isect.n,
            dpdu: isect.dpdu,
            dpdv: isect.dpdv,
        };

        Some(self.world_to_obj.inverse().apply_interaction(&isect))
    }

    pub fn q_intersect(&self, ray: &Ray) -> bool {
        let (r, o_error, d_error) = self.world_to_obj.apply_ray_error(ray);

        if let Some((t0, t1)) = sphere_quadratic(&r, o_error, d_error, self.radius) {
            let t = if t0.lo() > 0.0 && t0.hi() < r.t_max {
                t0
            } else {
                t1
            };
            return t.lo() > 0.0 && t.hi() < r.t_max;
        }
        false
    }

    pub fn pdf(&self) -> Float {
        1.0 / self.area()
    }

    /// Uniform sample over the surface, returned in world space.
    pub fn sample(&self, u: Vector2f) -> Interaction {
        let obj_to_world = self.world_to_obj.inverse();

        let p = self.radius * uniform_sample_sphere(u);
        let mut it = Interaction::from_point(obj_to_world.apply_point(p));
        it.n = normalize(obj_to_world.apply_normal(normalize(p)));
        it.p_error = gamma(5) * it.p.abs();
        it
    }

    /// Solid-angle PDF of sampling the direction `wi` from `reference`.
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
