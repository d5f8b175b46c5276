//! BVH and QBVH agreement and completeness.

use rt1w::accelerators::{BvhAccel, QbvhAccel};
use rt1w::core::camera::Camera;
use rt1w::core::geometry::*;
use rt1w::core::pbrt::*;
use rt1w::core::primitive::{Primitive, PrimitiveList};
use rt1w::core::rng::Rng;
use rt1w::core::sampler::Sampler;
use rt1w::core::scene::RenderDescription;
use rt1w::core::transform::Transform;
use rt1w::shapes::{Shape, Sphere};
use std::sync::Arc;

fn cornell_scene() -> RenderDescription {
    let path = format!("{}/scenes/cornell.json", env!("CARGO_MANIFEST_DIR"));
    RenderDescription::load(&path).expect("cornell.json should load")
}

/// One camera ray per pixel on a subsampled grid.
fn camera_rays(camera: &Camera) -> Vec<Ray> {
    let mut sampler = Sampler::new(1, 1, 4, true);
    let res = camera.resolution();

    let mut rays = Vec::new();
    for y in (0..res.y).step_by(4) {
        for x in (0..res.x).step_by(4) {
            sampler.start_pixel(Vector2i::new(x as i32, y as i32));
            rays.push(camera.generate_ray(&sampler.camera_sample()));
        }
    }
    rays
}

fn random_sphere_cloud(rng: &mut Rng, n: usize) -> Vec<Arc<Primitive>> {
    (0..n)
        .map(|_| {
            let c = Vector3f::new(
                20.0 * rng.f32() - 10.0,
                20.0 * rng.f32() - 10.0,
                20.0 * rng.f32() - 10.0,
            );
            let radius = 0.1 + 2.0 * rng.f32();
            let shape = Arc::new(Shape::Sphere(Sphere::new(
                Transform::translate(c).inverse(),
                radius,
            )));
            Primitive::new(shape, None, None)
        })
        .collect()
}

fn random_ray(rng: &mut Rng) -> Ray {
    let o = Vector3f::new(
        40.0 * rng.f32() - 20.0,
        40.0 * rng.f32() - 20.0,
        40.0 * rng.f32() - 20.0,
    );
    let d = normalize(Vector3f::new(
        2.0 * rng.f32() - 1.0,
        2.0 * rng.f32() - 1.0,
        2.0 * rng.f32() - 1.0,
    ));
    Ray::new(o, d)
}

#[test]
fn bvh_matches_linear_list() {
    let mut rng = Rng::from_seed(7);
    let prims = random_sphere_cloud(&mut rng, 200);

    let list = PrimitiveList::new(prims.clone());
    let bvh = BvhAccel::new(prims);

    for _ in 0..2000 {
        let r = random_ray(&mut rng);
        let reference = list.intersect(&r);
        let hit = bvh.intersect(&r);

        assert_eq!(reference.is_some(), hit.is_some());
        if let (Some(a), Some(b)) = (reference, hit) {
            assert!(float_equal(a.t, b.t), "t mismatch: {} vs {}", a.t, b.t);
            assert!(Arc::ptr_eq(
                a.primitive.as_ref().unwrap(),
                b.primitive.as_ref().unwrap()
            ));
        }

        assert_eq!(list.q_intersect(&r), bvh.q_intersect(&r));
    }
}

#[test]
fn qbvh_matches_bvh_on_random_scene() {
    let mut rng = Rng::from_seed(21);
    let prims = random_sphere_cloud(&mut rng, 200);

    let bvh = BvhAccel::new(prims.clone());
    let qbvh = QbvhAccel::new(prims);

    for _ in 0..2000 {
        let r = random_ray(&mut rng);
        let a = bvh.intersect(&r);
        let b = qbvh.intersect(&r);

        assert_eq!(a.is_some(), b.is_some());
        if let (Some(a), Some(b)) = (a, b) {
            assert!(float_equal(a.t, b.t));
            assert!(Arc::ptr_eq(
                a.primitive.as_ref().unwrap(),
                b.primitive.as_ref().unwrap()
            ));
        }
        assert_eq!(bvh.q_intersect(&r), qbvh.q_intersect(&r));
    }
}

#[test]
fn qbvh_matches_bvh_on_cornell_camera_rays() {
    let render = cornell_scene();
    let rays = camera_rays(&render.camera);

    let bvh = BvhAccel::new(render.primitives.clone());
    let qbvh = QbvhAccel::new(render.primitives);

    for r in &rays {
        let a = bvh.intersect(r);
        let b = qbvh.intersect(r);

        assert_eq!(a.is_some(), b.is_some());
        if let (Some(a), Some(b)) = (a, b) {
            assert!(float_equal(a.t, b.t), "t mismatch: {} vs {}", a.t, b.t);
            assert!(Arc::ptr_eq(
                a.primitive.as_ref().unwrap(),
                b.primitive.as_ref().unwrap()
            ));
        }
        assert_eq!(bvh.q_intersect(r), qbvh.q_intersect(r));
    }
}

#[test]
fn returned_t_is_the_minimum_over_hits() {
    let mut rng = Rng::from_seed(3);
    let prims = random_sphere_cloud(&mut rng, 50);
    let bvh = BvhAccel::new(prims);

    for _ in 0..500 {
        let r = random_ray(&mut rng);
        if let Some(isect) = bvh.intersect(&r) {
            // Every member hit must be at or beyond the returned t.
            for p in bvh.primitives() {
                if let Some(other) = Primitive::intersect(p, &r) {
                    assert!(other.t >= isect.t - 1e-4);
                }
            }
        }
    }
}
