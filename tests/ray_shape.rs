//! Ray/shape robustness.

use rt1w::core::geometry::*;
use rt1w::core::pbrt::*;
use rt1w::core::rng::Rng;
use rt1w::core::sampling::uniform_sample_sphere;
use rt1w::core::transform::Transform;
use rt1w::shapes::{Mesh, MeshData, Shape, Sphere};
use std::sync::Arc;

fn p_exp(rng: &mut Rng, min_exp: Float, max_exp: Float) -> Float {
    let logu = lerp(rng.f32(), min_exp, max_exp);
    let sign = if rng.f32() < 0.5 { -1.0 } else { 1.0 };
    sign * (10.0 as Float).powf(logu)
}

fn random_point(rng: &mut Rng, min_exp: Float, max_exp: Float) -> Vector3f {
    Vector3f::new(
        p_exp(rng, min_exp, max_exp),
        p_exp(rng, min_exp, max_exp),
        p_exp(rng, min_exp, max_exp),
    )
}

fn random_sphere(rng: &mut Rng) -> (Shape, Vector3f) {
    let center = random_point(rng, 0.0, 2.0);
    let radius = (10.0 as Float).powf(lerp(rng.f32(), 0.0, 1.5));
    (
        Shape::Sphere(Sphere::new(Transform::translate(center).inverse(), radius)),
        center,
    )
}

fn random_triangle(rng: &mut Rng) -> (Arc<Shape>, Vector3f) {
    let p0 = random_point(rng, 0.0, 2.0);
    let p1 = p0 + random_point(rng, 0.0, 1.5);
    let p2 = p0 + random_point(rng, 0.0, 1.5);
    let centroid = (p0 + p1 + p2) / 3.0;

    let md = MeshData::new(
        1,
        vec![p0, p1, p2],
        None,
        None,
        vec![0, 1, 2],
        Transform::default(),
    );
    let mesh = Mesh::new(md);
    (Arc::clone(&mesh.faces()[0]), centroid)
}

fn random_unit(rng: &mut Rng) -> Vector3f {
    uniform_sample_sphere(Vector2f::new(rng.f32(), rng.f32()))
}

/// Spec'd robustness property: a ray spawned from an interaction into the
/// hemisphere of the geometric normal must not re-hit the shape it
/// started on. Both shapes here are convex or planar, so any re-hit is a
/// self-intersection artifact.
#[test]
fn spawned_rays_do_not_self_intersect_spheres() {
    let mut rng = Rng::from_seed(11);

    for _ in 0..20 {
        let (sphere, center) = random_sphere(&mut rng);

        // Shoot at the sphere from a random direction to get a surface
        // interaction.
        let dir = random_unit(&mut rng);
        let bounds = sphere.bounds();
        let start = center + dir * (4.0 * bounds.diagonal().length());
        let Some(isect) = sphere.intersect(&Ray::new(start, normalize(center - start))) else {
            continue;
        };

        for _ in 0..1000 {
            let w = face_forward(random_unit(&mut rng), isect.n);
            let r = isect.spawn_ray(w);
            assert!(
                !sphere.q_intersect(&r),
                "sphere self-intersection from p = {:?}",
                isect.p
            );
        }
    }
}

#[test]
fn spawned_rays_do_not_self_intersect_triangles() {
    let mut rng = Rng::from_seed(13);

    for _ in 0..20 {
        let (tri, centroid) = random_triangle(&mut rng);

        let dir = random_unit(&mut rng);
        let start = centroid + dir * (4.0 * tri.bounds().diagonal().length().max(1.0));
        let Some(isect) = tri.intersect(&Ray::new(start, normalize(centroid - start))) else {
            continue;
        };

        for _ in 0..1000 {
            let w = face_forward(random_unit(&mut rng), isect.n);
            let r = isect.spawn_ray(w);
            assert!(
                !tri.q_intersect(&r),
                "triangle self-intersection from p = {:?}",
                isect.p
            );
        }
    }
}

/// `q_intersect` must answer exactly like `intersect`.
#[test]
fn q_intersect_agrees_with_intersect() {
    let mut rng = Rng::from_seed(17);

    for _ in 0..50 {
        let (sphere, center) = random_sphere(&mut rng);
        let (tri, centroid) = random_triangle(&mut rng);

        for _ in 0..200 {
            let o = random_point(&mut rng, 0.0, 3.0);
            for (shape, target) in [(&sphere, center), (&*tri, centroid)] {
                // Mix aimed and random rays so both outcomes are covered.
                let d = if rng.f32() < 0.5 {
                    normalize(target - o)
                } else {
                    random_unit(&mut rng)
                };
                let r = Ray::new(o, d);
                assert_eq!(shape.intersect(&r).is_some(), shape.q_intersect(&r));
            }
        }
    }
}
