//! Stratified sampling.

use crate::core::geometry::*;
use crate::core::pbrt::*;
use crate::core::rng::Rng;

/// Sample values driving one camera ray: a film-plane position and a lens
/// position.
#[derive(Copy, Clone, Debug)]
pub struct CameraSample {
    pub p_film: Vector2f,
    pub p_lens: Vector2f,
}

/// Stratified sampler over an `nx * ny` grid per pixel, yielding
/// `spp = nx * ny` samples. For every pixel it pre-generates a number of
/// 1D and 2D sample dimensions, each stratified over the pixel and
/// decorrelated between dimensions with a Fisher-Yates shuffle; requests
/// past the pre-generated dimensions fall back to raw RNG draws.
pub struct Sampler {
    spp: usize,
    nx: u32,
    ny: u32,
    dims: usize,
    jitter: bool,

    pixel: Vector2i,
    ix: usize,

    samples_1d: Vec<Vec<Float>>,
    samples_2d: Vec<Vec<Vector2f>>,
    dim_1d: usize,
    dim_2d: usize,

    rng: Rng,
}

fn generate_samples_1d(smp: &mut [Float], rng: &mut Rng, jitter: bool) {
    let inv_n = 1.0 / smp.len() as Float;
    for (i, s) in smp.iter_mut().enumerate() {
        let d = if jitter { rng.f32() } else { 0.5 };
        *s = ((i as Float + d) * inv_n).min(ONE_MINUS_EPSILON);
    }
}

fn generate_samples_2d(smp: &mut [Vector2f], nx: u32, ny: u32, rng: &mut Rng, jitter: bool) {
    let dx = 1.0 / nx as Float;
    let dy = 1.0 / ny as Float;

    let mut i = 0;
    for x in 0..nx {
        for y in 0..ny {
            let jx = if jitter { rng.f32() } else { 0.5 };
            let jy = if jitter { rng.f32() } else { 0.5 };
            smp[i] = Vector2f::new(
                ((x as Float + jx) * dx).min(ONE_MINUS_EPSILON),
                ((y as Float + jy) * dy).min(ONE_MINUS_EPSILON),
            );
            i += 1;
        }
    }
}

fn shuffle<T>(smp: &mut [T], rng: &mut Rng) {
    let n = smp.len();
    for i in 0..n - 1 {
        let j = i + rng.u32_bound((n - i) as u32) as usize;
        smp.swap(i, j);
    }
}

impl Sampler {
    /// Creates a sampler with an `nx * ny` stratum grid and `dims`
    /// pre-generated sample dimensions per pixel.
    pub fn new(nx: u32, ny: u32, dims: u32, jitter: bool) -> Self {
        let spp = (nx * ny) as usize;
        assert!(spp > 0, "Sampler needs at least one stratum");

        Self {
            spp,
            nx,
            ny,
            dims: dims as usize,
            jitter,
            pixel: Vector2i::new(0, 0),
            ix: 0,
            samples_1d: vec![vec![0.0; spp]; dims as usize],
            samples_2d: vec![vec![Vector2f::default(); spp]; dims as usize],
            dim_1d: 0,
            dim_2d: 0,
            rng: Rng::new(),
        }
    }

    pub fn samples_per_pixel(&self) -> usize {
        self.spp
    }

    /// A fresh sampler with the same configuration and an independent RNG
    /// stream. One clone is made per tile.
    pub fn clone_sampler(&self) -> Sampler {
        Sampler::new(self.nx, self.ny, self.dims as u32, self.jitter)
    }

    /// Regenerates and shuffles the strata for a pixel and resets the
    /// sample index and dimension cursors.
    pub fn start_pixel(&mut self, p: Vector2i) {
        self.pixel = p;
        self.ix = 0;
        self.dim_1d = 0;
        self.dim_2d = 0;

        for dim in self.samples_1d.iter_mut() {
            generate_samples_1d(dim, &mut self.rng, self.jitter);
            shuffle(dim, &mut self.rng);
        }
        for dim in self.samples_2d.iter_mut() {
            generate_samples_2d(dim, self.nx, self.ny, &mut self.rng, self.jitter);
            shuffle(dim, &mut self.rng);
        }
    }

    /// Advances to the next sample of the current pixel. Returns `false`
    /// once all `spp` samples have been consumed.
    pub fn start_next_sample(&mut self) -> bool {
        self.ix += 1;
        if self.ix < self.spp {
            self.dim_1d = 0;
            self.dim_2d = 0;
            true
        } else {
            false
        }
    }

    pub fn sample_1d(&mut self) -> Float {
        if self.dim_1d < self.samples_1d.len() {
            let v = self.samples_1d[self.dim_1d][self.ix];
            self.dim_1d += 1;
            v
        } else {
            self.rng.f32()
        }
    }

    pub fn sample_2d(&mut self) -> Vector2f {
        if self.dim_2d < self.samples_2d.len() {
            let v = self.samples_2d[self.dim_2d][self.ix];
            self.dim_2d += 1;
            v
        } else {
            Vector2f::new(self.rng.f32(), self.rng.f32())
        }
    }

    pub fn camera_sample(&mut self) -> CameraSample {
        let p = Vector2f::new(self.pixel.x as Float, self.pixel.y as Float);
        CameraSample {
            p_film: p + self.sample_2d(),
            p_lens: self.sample_2d(),
        }
    }
}
