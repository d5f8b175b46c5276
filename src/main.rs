use anyhow::{Context, Result};
use clap::Parser;
use rt1w::core::context::Render;
use rt1w::core::denoise::denoise;
use rt1w::core::integrator::Integrator;
use rt1w::core::primitive::Aggregate;
use rt1w::core::sampler::Sampler;
use rt1w::core::scene::{RenderDescription, Scene};
use std::sync::Arc;

/// rt1w — render a JSON scene description to PNG
#[derive(Parser, Debug)]
#[command(name = "rt1w", version, about)]
struct Cli {
    /// Size of the grid in which pixels are subdivided; samples per pixel
    /// is the square of this
    #[arg(long, default_value_t = 1)]
    quality: u32,

    /// Apply a denoising step at the end of the rendering
    #[arg(long)]
    denoise: bool,

    /// Also output the color of the first ray-shape hit
    #[arg(long)]
    albedo: bool,

    /// Also output the surface normals
    #[arg(long)]
    normals: bool,

    /// Only print error messages
    #[arg(long)]
    quiet: bool,

    /// Print more stuff
    #[arg(long)]
    verbose: bool,

    /// Scene description file
    scene: String,
}

fn main() {
    // Usage problems exit with status 1.
    let cli = Cli::try_parse().unwrap_or_else(|e| {
        let _ = e.print();
        std::process::exit(1);
    });

    let level = if cli.quiet {
        log::LevelFilter::Error
    } else if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .format_timestamp(None)
        .init();

    if let Err(e) = run(&cli) {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let render = RenderDescription::load(&cli.scene).context("Nothing to render")?;

    if render.lights.is_empty() {
        log::warn!("Scene has no light");
    }

    let accelerator = render.options.string_or("accelerator", "bvh");
    let aggregate = Aggregate::create(&accelerator, render.primitives);
    let scene = Arc::new(Scene::new(aggregate, render.lights));

    let ns = cli.quality.max(1);
    let sampler = Sampler::new(ns, ns, 4, true);
    let integrator = Arc::new(Integrator::create(
        &render.options.string("integrator"),
        sampler,
        4,
    ));

    let output = render
        .options
        .string_or("output", cli.scene.trim_end_matches(".json"));

    let rdr = Render::new(scene, render.camera, integrator);

    let mut img = rdr.image();
    if cli.denoise {
        img = denoise(rdr.image(), rdr.normals(), rdr.albedo());
    }

    let path = format!("{}.png", output);
    img.quantize()
        .write_png(&path)
        .with_context(|| format!("Couldn't write {}", path))?;

    if cli.albedo {
        let path = format!("{}-albedo.png", output);
        rdr.albedo()
            .quantize()
            .write_png(&path)
            .with_context(|| format!("Couldn't write {}", path))?;
    }
    if cli.normals {
        let path = format!("{}-normals.png", output);
        rdr.normals()
            .quantize()
            .write_png(&path)
            .with_context(|| format!("Couldn't write {}", path))?;
    }
    Ok(())
}
