//! End-to-end render of the reference scene.

use rt1w::core::camera::Camera;
use rt1w::core::context::Render;
use rt1w::core::geometry::*;
use rt1w::core::integrator::Integrator;
use rt1w::core::primitive::Aggregate;
use rt1w::core::sampler::Sampler;
use rt1w::core::scene::{RenderDescription, Scene};
use std::sync::Arc;

/// Renders the cornell scene at a reduced resolution so the test stays
/// fast, and checks the output has no dark seams at tile boundaries.
#[test]
fn cornell_renders_without_tile_seams() {
    let path = format!("{}/scenes/cornell.json", env!("CARGO_MANIFEST_DIR"));
    let render = RenderDescription::load(&path).expect("cornell.json should load");

    // Same view, smaller film: 64x64 spans a 2x2 tile grid.
    let res = Vector2u::new(64, 64);
    let camera = Arc::new(Camera::perspective(
        Vector3f::new(278.0, 273.0, -800.0),
        Vector3f::new(278.0, 273.0, 0.0),
        Vector3f::new(0.0, 1.0, 0.0),
        res,
        Vector2f::new(2.0, 2.0),
        39.3,
        0.0,
        800.0,
        0.1,
        10000.0,
    ));

    let accelerator = render.options.string_or("accelerator", "bvh");
    let aggregate = Aggregate::create(&accelerator, render.primitives);
    let scene = Arc::new(Scene::new(aggregate, render.lights));

    let integrator = Arc::new(Integrator::create(
        &render.options.string("integrator"),
        Sampler::new(1, 1, 4, true),
        4,
    ));

    let rdr = Render::new(scene, camera, integrator);
    let image = rdr.image().quantize();

    assert_eq!(image.width, res.x as usize);
    assert_eq!(image.height, res.y as usize);
    assert_eq!(image.data.len(), (res.x * res.y * 3) as usize);

    // A closed box under an area light leaves no row or column fully
    // black; a tile scheduling bug would.
    let row_sum = |y: usize| -> u64 {
        image.data[3 * y * image.width..3 * (y + 1) * image.width]
            .iter()
            .map(|&v| v as u64)
            .sum()
    };
    for y in 0..image.height {
        assert!(row_sum(y) > 0, "row {} is fully black", y);
    }
    for x in 0..image.width {
        let col: u64 = (0..image.height)
            .map(|y| image.data[3 * (y * image.width + x)] as u64)
            .sum();
        assert!(col > 0, "column {} is fully black", x);
    }

    // The normals plane is populated where geometry was hit.
    let normals = rdr.normals();
    let n_pixels = normals.pixels();
    assert_eq!(n_pixels.len(), (res.x * res.y * 3) as usize);
    assert!(n_pixels.iter().any(|&v| v != 0.0));
}
