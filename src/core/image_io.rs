//! Images and PNG input/output.

use crate::core::context::RenderContext;
use crate::core::denoise::DenoiseImage;
use crate::core::event::Event;
use crate::core::geometry::Vector2u;
use crate::core::pbrt::*;
use std::sync::Arc;

/// An 8-bit RGB pixel buffer, top row first.
pub struct Pixmap {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl Pixmap {
    /// Quantizes a float RGB buffer by clamping to `[0, 1]`.
    pub fn from_float_rgb(width: usize, height: usize, pixels: &[Float]) -> Self {
        assert_eq!(pixels.len(), width * height * 3);
        let data = pixels
            .iter()
            .map(|&v| (clamp(v, 0.0, 1.0) * 255.0).round() as u8)
            .collect();
        Self {
            width,
            height,
            data,
        }
    }

    pub fn read_png(path: &str) -> Result<Pixmap, image::ImageError> {
        let img = image::open(path)?.to_rgb8();
        Ok(Pixmap {
            width: img.width() as usize,
            height: img.height() as usize,
            data: img.into_raw(),
        })
    }

    pub fn write_png(&self, path: &str) -> Result<(), image::ImageError> {
        image::save_buffer(
            path,
            &self.data,
            self.width as u32,
            self.height as u32,
            image::ColorType::Rgb8,
        )
    }
}

/// Which render output a context-backed image reads.
#[derive(Copy, Clone, Debug)]
pub enum Plane {
    Color,
    Normals,
    Albedo,
}

/// A lazily evaluated image. Scheduling kicks off the producing stage and
/// returns its completion event; reading the pixels waits for it.
#[derive(Clone)]
pub enum Image {
    /// One of the three planes produced by a rendering context.
    Render {
        ctx: Arc<RenderContext>,
        plane: Plane,
    },

    /// Output of a denoise stage chained onto its inputs.
    Denoise { stage: Arc<DenoiseImage> },
}

impl Image {
    /// Starts the producing computation; idempotent.
    pub fn schedule(&self) -> Arc<Event> {
        match self {
            Image::Render { ctx, .. } => RenderContext::schedule(ctx),
            Image::Denoise { stage } => DenoiseImage::schedule(stage),
        }
    }

    pub fn size(&self) -> Vector2u {
        match self {
            Image::Render { ctx, .. } => ctx.resolution(),
            Image::Denoise { stage } => stage.size(),
        }
    }

    /// The float RGB pixels, waiting for the producing stage to finish.
    pub fn pixels(&self) -> Vec<Float> {
        self.schedule().wait();
        match self {
            Image::Render { ctx, plane } => ctx.plane_pixels(*plane),
            Image::Denoise { stage } => stage.pixels(),
        }
    }

    /// The image quantized to 8-bit RGB.
    pub fn quantize(&self) -> Pixmap {
        let size = self.size();
        Pixmap::from_float_rgb(size.x as usize, size.y as usize, &self.pixels())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantization_clamps_and_scales() {
        let pixels = [0.0, 0.5, 1.0, -0.25, 2.0, 0.25];
        let pm = Pixmap::from_float_rgb(2, 1, &pixels);
        assert_eq!(pm.data, vec![0, 128, 255, 0, 255, 64]);
    }

    #[test]
    fn png_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        let path = path.to_str().unwrap();

        let pm = Pixmap {
            width: 2,
            height: 2,
            data: vec![255, 0, 0, 0, 255, 0, 0, 0, 255, 128, 128, 128],
        };
        pm.write_png(path).unwrap();

        let back = Pixmap::read_png(path).unwrap();
        assert_eq!(back.width, 2);
        assert_eq!(back.height, 2);
        assert_eq!(back.data, pm.data);
    }
}
