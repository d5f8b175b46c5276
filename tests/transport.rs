//! Light transport checks.

use rt1w::core::geometry::*;
use rt1w::core::integrator::{uniform_sample_one_light, Integrator};
use rt1w::core::light::Light;
use rt1w::core::material::Material;
use rt1w::core::pbrt::*;
use rt1w::core::primitive::{Aggregate, Primitive};
use rt1w::core::sampler::Sampler;
use rt1w::core::scene::Scene;
use rt1w::core::spectrum::Spectrum;
use rt1w::core::texture::Texture;
use rt1w::core::transform::Transform;
use rt1w::shapes::{Mesh, MeshData, Shape, Sphere};
use std::sync::Arc;

/// An axis-aligned quad as a two-triangle mesh.
fn quad(p0: Vector3f, p1: Vector3f, p2: Vector3f, p3: Vector3f) -> Arc<Shape> {
    let md = MeshData::new(
        2,
        vec![p0, p1, p2, p3],
        None,
        None,
        vec![0, 1, 2, 0, 2, 3],
        Transform::default(),
    );
    Arc::new(Shape::Mesh(Mesh::new(md)))
}

fn matte(albedo: Float) -> Arc<Material> {
    Arc::new(Material::Lambertian {
        kd: Texture::constant(Spectrum::new(albedo)),
    })
}

/// Floor at y = 0 wound so its normal faces up.
fn floor(half: Float) -> Arc<Shape> {
    quad(
        Vector3f::new(half, 0.0, -half),
        Vector3f::new(-half, 0.0, -half),
        Vector3f::new(-half, 0.0, half),
        Vector3f::new(half, 0.0, half),
    )
}

/// Quad at height `y` wound so its normal faces down.
fn panel(y: Float, half: Float) -> Arc<Shape> {
    quad(
        Vector3f::new(half, y, -half),
        Vector3f::new(half, y, half),
        Vector3f::new(-half, y, half),
        Vector3f::new(-half, y, -half),
    )
}

/// Emitting panel: one area light and one emissive primitive per face.
fn emitting_panel(
    shape: &Arc<Shape>,
    l_emit: Spectrum,
) -> (Vec<Arc<Light>>, Vec<Arc<Primitive>>) {
    let black = matte(0.0);
    let mut lights = Vec::new();
    let mut prims = Vec::new();
    for face in shape.faces().expect("panel is a group") {
        let light = Arc::new(Light::Area {
            shape: Arc::clone(face),
            l_emit,
        });
        prims.push(Primitive::new(
            Arc::clone(face),
            Some(Arc::clone(&black)),
            Some(Arc::clone(&light)),
        ));
        lights.push(light);
    }
    (lights, prims)
}

/// Ray aimed at the origin from the side, steep enough to pass well clear
/// of the panels above the origin.
fn probe_ray() -> Ray {
    let o = Vector3f::new(3.0, 3.0, 0.0);
    Ray::new(o, normalize(-o))
}

#[test]
fn occluded_point_light_contributes_nothing() {
    let white = matte(0.73);

    let mut prims = Primitive::from_shape(floor(10.0), Some(Arc::clone(&white)), None);
    prims.extend(Primitive::from_shape(
        panel(2.0, 1.0),
        Some(Arc::clone(&white)),
        None,
    ));

    let light = Arc::new(Light::Point {
        p: Vector3f::new(0.0, 5.0, 0.0),
        intensity: Spectrum::new(10.0),
    });

    let scene = Scene::new(Aggregate::create("bvh", prims), vec![light]);
    let isect = scene.intersect(&probe_ray()).expect("probe hits the floor");
    assert!(isect.p.length() < 1e-3);

    let mut sampler = Sampler::new(1, 1, 0, true);
    for _ in 0..100 {
        let l = uniform_sample_one_light(&isect, &scene, &mut sampler);
        assert!(l.is_black(), "occluded light leaked: {:?}", l.rgb());
    }
}

#[test]
fn unoccluded_point_light_contributes() {
    let white = matte(0.73);
    let prims = Primitive::from_shape(floor(10.0), Some(white), None);

    let light = Arc::new(Light::Point {
        p: Vector3f::new(0.0, 5.0, 0.0),
        intensity: Spectrum::new(10.0),
    });

    let scene = Scene::new(Aggregate::create("bvh", prims), vec![light]);
    let isect = scene.intersect(&probe_ray()).unwrap();

    let mut sampler = Sampler::new(1, 1, 0, true);
    let l = uniform_sample_one_light(&isect, &scene, &mut sampler);
    // f * I / d^2 = (0.73 / pi) * 10 / 25, cos = 1.
    let expected = 0.73 * INV_PI * 10.0 / 25.0;
    assert!((l[0] - expected).abs() < 1e-3, "got {}", l[0]);
}

/// Mean direct radiance from a small area light matches the closed-form
/// point approximation within sampling error.
#[test]
fn area_light_mean_matches_closed_form() {
    let albedo = 0.6;
    let le = 10.0;
    let (h, half) = (2.0, 0.1);
    let area = (2.0 * half) * (2.0 * half);

    let mut prims = Primitive::from_shape(floor(5.0), Some(matte(albedo)), None);
    let (lights, light_prims) = emitting_panel(&panel(h, half), Spectrum::new(le));
    prims.extend(light_prims);

    let scene = Scene::new(Aggregate::create("bvh", prims), lights);
    let isect = scene.intersect(&probe_ray()).unwrap();

    let mut sampler = Sampler::new(1, 1, 0, true);
    let n = 20_000;
    let mut sum = 0.0;
    for _ in 0..n {
        sum += uniform_sample_one_light(&isect, &scene, &mut sampler)[0];
    }
    let mean = sum / n as Float;

    // L = (rho / pi) * Le * A * cos * cos' / h^2 for a small emitter.
    let expected = albedo * INV_PI * le * area * 1.0 * 1.0 / (h * h);
    let tolerance = 0.15 * expected;
    assert!(
        (mean - expected).abs() < tolerance,
        "mean {} vs closed form {}",
        mean,
        expected
    );
}

#[test]
fn camera_visible_emitter_returns_its_radiance() {
    let le = Spectrum::new(4.0);
    let (lights, prims) = emitting_panel(&panel(2.0, 1.0), le);

    let scene = Scene::new(Aggregate::create("bvh", prims), lights);
    let integrator = Integrator::create("path", Sampler::new(1, 1, 4, true), 4);

    // Straight up into the emitting side of the panel.
    let ray = Ray::new(Vector3f::new(0.0, 0.0, 0.0), Vector3f::new(0.0, 1.0, 0.0));
    let mut sampler = Sampler::new(1, 1, 4, true);
    sampler.start_pixel(Vector2i::new(0, 0));

    let rs = integrator.radiance(&ray, &scene, &mut sampler);
    assert_eq!(rs.li, le);

    // From above, the panel's back side is dark.
    let ray = Ray::new(Vector3f::new(0.0, 4.0, 0.0), Vector3f::new(0.0, -1.0, 0.0));
    let rs = integrator.radiance(&ray, &scene, &mut sampler);
    assert!(rs.li.is_black());
}

#[test]
fn environment_light_fills_misses_and_albedo() {
    let albedo = 0.4;
    let le = 0.7;

    let sphere = Arc::new(Shape::Sphere(Sphere::new(Transform::default(), 1.0)));
    let prims = Primitive::from_shape(sphere, Some(matte(albedo)), None);

    let env = Arc::new(Light::environment(
        Vector3f::default(),
        100.0,
        Spectrum::new(le),
        None,
    ));
    let scene = Scene::new(Aggregate::create("bvh", prims), vec![env]);
    let integrator = Integrator::create("path", Sampler::new(1, 1, 4, true), 4);

    let mut sampler = Sampler::new(1, 1, 4, true);
    sampler.start_pixel(Vector2i::new(0, 0));

    // A ray that misses everything carries exactly the environment term.
    let miss = Ray::new(Vector3f::new(0.0, 5.0, -10.0), Vector3f::new(0.0, 1.0, 0.0));
    let rs = integrator.radiance(&miss, &scene, &mut sampler);
    assert_eq!(rs.li, Spectrum::new(le));

    // A ray that hits the sphere reports the diffuse reflectance as its
    // first-hit albedo.
    let hit = Ray::new(Vector3f::new(0.0, 0.0, -10.0), Vector3f::new(0.0, 0.0, 1.0));
    let rs = integrator.radiance(&hit, &scene, &mut sampler);
    assert!((rs.albedo[0] - albedo * INV_PI).abs() < 1e-5);
    assert!(rs.li[0] > 0.0);
    // First-hit normal faces back along the ray.
    assert!(rs.n.z < -0.9);
}
