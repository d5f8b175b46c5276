//! Camera ray generation.

use rt1w::core::camera::Camera;
use rt1w::core::geometry::*;
use rt1w::core::sampler::Sampler;

#[test]
fn perspective_rays_obey_the_lens_model() {
    let eye = Vector3f::new(1.0, 2.0, -5.0);
    let look = Vector3f::new(0.0, 0.0, 3.0);
    let aperture = 0.25;

    let camera = Camera::perspective(
        eye,
        look,
        Vector3f::new(0.0, 1.0, 0.0),
        Vector2u::new(64, 48),
        Vector2f::new(2.0 * 64.0 / 48.0, 2.0),
        55.0,
        aperture,
        (look - eye).length(),
        0.1,
        1000.0,
    );

    let mut sampler = Sampler::new(2, 2, 4, true);
    for y in 0..48 {
        for x in 0..64 {
            sampler.start_pixel(Vector2i::new(x, y));
            loop {
                let r = camera.generate_ray(&sampler.camera_sample());

                // Origins stay on the lens disk around the eye.
                assert!((r.o - eye).length() <= aperture + 1e-4);

                // Directions are unit length and look towards the target.
                assert!((r.d.length() - 1.0).abs() < 1e-4);
                assert!(dot(look - eye, r.d) > 0.0);

                if !sampler.start_next_sample() {
                    break;
                }
            }
        }
    }
}

#[test]
fn pinhole_rays_start_at_the_eye() {
    let eye = Vector3f::new(0.0, 0.0, 0.0);
    let camera = Camera::perspective(
        eye,
        Vector3f::new(0.0, 0.0, 1.0),
        Vector3f::new(0.0, 1.0, 0.0),
        Vector2u::new(32, 32),
        Vector2f::new(2.0, 2.0),
        45.0,
        0.0,
        1.0,
        0.1,
        100.0,
    );

    let mut sampler = Sampler::new(1, 1, 4, false);
    sampler.start_pixel(Vector2i::new(16, 16));
    let r = camera.generate_ray(&sampler.camera_sample());

    assert_eq!(r.o, eye);
    // The center pixel looks straight down the view axis.
    assert!(r.d.z > 0.99);
}

#[test]
fn orthographic_rays_are_parallel() {
    let eye = Vector3f::new(0.0, 0.0, -10.0);
    let camera = Camera::orthographic(
        eye,
        Vector3f::new(0.0, 0.0, 0.0),
        Vector3f::new(0.0, 1.0, 0.0),
        Vector2u::new(16, 16),
        Vector2f::new(4.0, 4.0),
        0.0,
        10.0,
        0.1,
        100.0,
    );

    let mut sampler = Sampler::new(1, 1, 4, true);
    let mut first: Option<Vector3f> = None;
    for y in 0..16 {
        for x in 0..16 {
            sampler.start_pixel(Vector2i::new(x, y));
            let r = camera.generate_ray(&sampler.camera_sample());
            match first {
                Some(d) => assert!((r.d - d).length() < 1e-5),
                None => first = Some(r.d),
            }
        }
    }
}
