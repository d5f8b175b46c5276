//! Tiled rendering.

use crate::core::camera::Camera;
use crate::core::event::Event;
use crate::core::geometry::*;
use crate::core::image_io::{Image, Plane};
use crate::core::integrator::Integrator;
use crate::core::pbrt::*;
use crate::core::scene::Scene;
use crate::core::spectrum::Spectrum;
use crate::core::workq;
use itertools::iproduct;
use std::io::Write;
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Tiles are at most this many pixels on a side; the last row and column
/// of tiles may be shorter.
pub const TILE_SIZE: u32 = 32;

/// Float RGB plane written by the tile jobs.
#[derive(Default)]
struct Framebuffer {
    width: usize,
    height: usize,
    pixels: Vec<Float>,
}

impl Framebuffer {
    fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![0.0; width * height * 3],
        }
    }

    fn write_rect(&mut self, tile: &ImageTile, data: &[Float]) {
        let tw = (tile.x1 - tile.x0) as usize;
        for (row, y) in (tile.y0..tile.y1).enumerate() {
            let src = &data[row * tw * 3..(row + 1) * tw * 3];
            let off = 3 * (y as usize * self.width + tile.x0 as usize);
            self.pixels[off..off + tw * 3].copy_from_slice(src);
        }
    }
}

/// An axis-aligned rectangle of the framebuffer rendered as one job.
#[derive(Copy, Clone, Debug)]
struct ImageTile {
    x0: u32,
    y0: u32,
    x1: u32,
    y1: u32,
}

/// Holds everything a render needs and schedules it exactly once across
/// the work queue: one job per tile, a completion event counting tiles,
/// and a progress notification per tile. Tiles write disjoint rectangles,
/// so the only shared state after scheduling is the completion event and
/// the brief merge of each finished tile into the output planes.
pub struct RenderContext {
    scene: Arc<Scene>,
    camera: Arc<Camera>,
    integrator: Arc<Integrator>,

    image: Mutex<Framebuffer>,
    normals: Mutex<Framebuffer>,
    albedo: Mutex<Framebuffer>,

    event: Mutex<Option<Arc<Event>>>,
    /// One-shot scheduling state: 0 untouched, -1 in progress, 1 done.
    scheduled: AtomicI32,

    n_tiles: AtomicUsize,
    progress: AtomicUsize,
}

impl RenderContext {
    pub fn new(scene: Arc<Scene>, camera: Arc<Camera>, integrator: Arc<Integrator>) -> Arc<Self> {
        Arc::new(Self {
            scene,
            camera,
            integrator,
            image: Mutex::new(Framebuffer::default()),
            normals: Mutex::new(Framebuffer::default()),
            albedo: Mutex::new(Framebuffer::default()),
            event: Mutex::new(None),
            scheduled: AtomicI32::new(0),
            n_tiles: AtomicUsize::new(0),
            progress: AtomicUsize::new(0),
        })
    }

    pub fn resolution(&self) -> Vector2u {
        self.camera.resolution()
    }

    /// A copy of one output plane; only meaningful once the completion
    /// event has fired.
    pub fn plane_pixels(&self, plane: Plane) -> Vec<Float> {
        match plane {
            Plane::Color => self.image.lock().unwrap().pixels.clone(),
            Plane::Normals => self.normals.lock().unwrap().pixels.clone(),
            Plane::Albedo => self.albedo.lock().unwrap().pixels.clone(),
        }
    }

    /// Schedules the render on first call and returns the event that
    /// completes when every tile has been rendered. Losers of the
    /// scheduling race spin until the winner has published the event.
    pub fn schedule(ctx: &Arc<RenderContext>) -> Arc<Event> {
        loop {
            match ctx
                .scheduled
                .compare_exchange(0, -1, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => {
                    let event = RenderContext::schedule_tiles(ctx);
                    ctx.scheduled.store(1, Ordering::Release);
                    return event;
                }
                Err(1) => {
                    if let Some(e) = ctx.event.lock().unwrap().clone() {
                        return e;
                    }
                }
                Err(_) => std::hint::spin_loop(),
            }
        }
    }

    fn schedule_tiles(ctx: &Arc<RenderContext>) -> Arc<Event> {
        let res = ctx.resolution();
        let (w, h) = (res.x as usize, res.y as usize);

        *ctx.image.lock().unwrap() = Framebuffer::new(w, h);
        *ctx.normals.lock().unwrap() = Framebuffer::new(w, h);
        *ctx.albedo.lock().unwrap() = Framebuffer::new(w, h);

        let ntx = (res.x + TILE_SIZE - 1) / TILE_SIZE;
        let nty = (res.y + TILE_SIZE - 1) / TILE_SIZE;

        let tiles: Vec<ImageTile> = iproduct!(0..ntx, 0..nty)
            .map(|(i, j)| ImageTile {
                x0: i * TILE_SIZE,
                y0: j * TILE_SIZE,
                x1: ((i + 1) * TILE_SIZE).min(res.x),
                y1: ((j + 1) * TILE_SIZE).min(res.y),
            })
            .collect();

        info!("Rendering {}x{} tiles", ntx, nty);

        let event = Event::new(tiles.len() as i32);
        *ctx.event.lock().unwrap() = Some(Arc::clone(&event));
        ctx.n_tiles.store(tiles.len(), Ordering::Release);

        for tile in tiles {
            let tile_ctx = Arc::clone(ctx);
            let job = workq::execute(Some(workq::get_queue()), move || {
                render_tile(&tile_ctx, tile);
            });

            let progress_ctx = Arc::clone(ctx);
            job.notify(None, move || {
                progress_ctx.report_progress();
            });
        }
        event
    }

    fn report_progress(&self) {
        let done = self.progress.fetch_add(1, Ordering::Relaxed) + 1;
        let total = self.n_tiles.load(Ordering::Acquire);
        if !log_enabled!(log::Level::Info) {
            return;
        }

        let p = done as f32 / total as f32 * 100.0;
        let filled = (p / 2.0) as usize;
        let mut bar = String::with_capacity(64);
        for i in 0..50 {
            bar.push(if i <= filled { '#' } else { ' ' });
        }
        eprint!("\r{:.1}% [{}]", p, bar);
        if done == total {
            eprintln!("\nDone!");
        }
        let _ = std::io::stderr().flush();
    }
}

#[inline]
fn approx_gamma(c: Vector3f) -> Vector3f {
    Vector3f::new(
        c.x.sqrt().min(1.0),
        c.y.sqrt().min(1.0),
        c.z.sqrt().min(1.0),
    )
}

/// Renders one tile into local buffers, then merges them into the shared
/// planes and signals the context's completion event.
fn render_tile(ctx: &Arc<RenderContext>, tile: ImageTile) {
    let mut sampler = ctx.integrator.sampler().clone_sampler();
    let inv_ns = 1.0 / sampler.samples_per_pixel() as Float;

    let tw = (tile.x1 - tile.x0) as usize;
    let th = (tile.y1 - tile.y0) as usize;
    let mut image = vec![0.0 as Float; tw * th * 3];
    let mut normals = vec![0.0 as Float; tw * th * 3];
    let mut albedo = vec![0.0 as Float; tw * th * 3];

    for y in tile.y0..tile.y1 {
        for x in tile.x0..tile.x1 {
            let mut c = Spectrum::black();
            let mut a = Spectrum::black();
            let mut n = Vector3f::default();

            sampler.start_pixel(Vector2i::new(x as i32, y as i32));
            loop {
                let cs = sampler.camera_sample();
                let ray = ctx.camera.generate_ray(&cs);
                let rs = ctx.integrator.radiance(&ray, &ctx.scene, &mut sampler);
                c += rs.li;
                a += rs.albedo;
                n += rs.n;
                if !sampler.start_next_sample() {
                    break;
                }
            }

            n *= inv_ns;
            let li = approx_gamma((c * inv_ns).rgb());
            let al = approx_gamma((a * inv_ns).rgb());

            let off = 3 * ((y - tile.y0) as usize * tw + (x - tile.x0) as usize);
            image[off] = li.x;
            image[off + 1] = li.y;
            image[off + 2] = li.z;
            normals[off] = n.x;
            normals[off + 1] = n.y;
            normals[off + 2] = n.z;
            albedo[off] = al.x;
            albedo[off + 1] = al.y;
            albedo[off + 2] = al.z;
        }
    }

    ctx.image.lock().unwrap().write_rect(&tile, &image);
    ctx.normals.lock().unwrap().write_rect(&tile, &normals);
    ctx.albedo.lock().unwrap().write_rect(&tile, &albedo);

    let event = ctx.event.lock().unwrap().clone();
    event
        .expect("RenderContext tile ran before scheduling")
        .signal();
}

/// A scheduled render and its three lazily evaluated products.
pub struct Render {
    ctx: Arc<RenderContext>,
}

impl Render {
    pub fn new(scene: Arc<Scene>, camera: Arc<Camera>, integrator: Arc<Integrator>) -> Self {
        Self {
            ctx: RenderContext::new(scene, camera, integrator),
        }
    }

    pub fn image(&self) -> Image {
        Image::Render {
            ctx: Arc::clone(&self.ctx),
            plane: Plane::Color,
        }
    }

    pub fn normals(&self) -> Image {
        Image::Render {
            ctx: Arc::clone(&self.ctx),
            plane: Plane::Normals,
        }
    }

    pub fn albedo(&self) -> Image {
        Image::Render {
            ctx: Arc::clone(&self.ctx),
            plane: Plane::Albedo,
        }
    }
}
