//! Textures.

use crate::core::geometry::*;
use crate::core::image_io::Pixmap;
use crate::core::params::Params;
use crate::core::pbrt::*;
use crate::core::spectrum::Spectrum;
use std::sync::Arc;

/// Spatially varying spectra, addressed by surface UV.
pub enum Texture {
    Constant {
        color: Spectrum,
    },
    /// Sine-product checkerboard alternating two textures.
    Checker {
        odd: Arc<Texture>,
        even: Arc<Texture>,
    },
    /// Image-backed texture over a sub-rectangle of the source image.
    Image {
        img: Arc<Pixmap>,
        origin: Vector2i,
        size: Vector2u,
    },
}

impl Texture {
    pub fn constant(color: Spectrum) -> Arc<Texture> {
        Arc::new(Texture::Constant { color })
    }

    pub fn value(&self, u: Float, v: Float, p: Vector3f) -> Spectrum {
        match self {
            Texture::Constant { color } => *color,
            Texture::Checker { odd, even } => {
                let sines = (10.0 * u).sin() * (10.0 * v).sin();
                if sines > 0.0 {
                    even.value(u, v, p)
                } else {
                    odd.value(u, v, p)
                }
            }
            Texture::Image { img, origin, size } => {
                let u = clamp(u, 0.0, 1.0);
                let v = clamp(v, 0.0, 1.0);

                let x = (u as f64 * (size.x.max(1) - 1) as f64).round() as i64 + origin.x as i64;
                let y = (v as f64 * (size.y.max(1) - 1) as f64).round() as i64 + origin.y as i64;
                let x = clamp(x, 0, img.width as i64 - 1) as usize;
                let y = clamp(y, 0, img.height as i64 - 1) as usize;

                let px = &img.data[3 * (y * img.width + x)..];
                Spectrum::from_rgb(Vector3f::new(
                    px[0] as Float / 255.0,
                    px[1] as Float / 255.0,
                    px[2] as Float / 255.0,
                ))
            }
        }
    }

    /// Builds a texture from scene parameters; `None` with a logged
    /// warning when the description is incomplete.
    pub fn from_params(p: &Params) -> Option<Arc<Texture>> {
        let kind = p.string("type");
        if kind.is_empty() {
            warn!("Texture parameter \"type\" not specified");
            return None;
        }
        match kind.as_str() {
            "constant" => {
                let c = p.vector3f("color", Vector3f::new(1.0, 1.0, 1.0));
                Some(Texture::constant(Spectrum::from_rgb(c)))
            }
            "checker" => {
                let even = p.texture("even");
                let odd = p.texture("odd");
                match (even, odd) {
                    (Some(even), Some(odd)) => Some(Arc::new(Texture::Checker { odd, even })),
                    (even, odd) => {
                        if even.is_none() {
                            warn!("Texture parameter \"even\" not specified");
                        }
                        if odd.is_none() {
                            warn!("Texture parameter \"odd\" not specified");
                        }
                        None
                    }
                }
            }
            "image" => {
                let file = p.string("file");
                if file.is_empty() {
                    warn!("Texture parameter \"file\" not specified");
                    return None;
                }
                match Pixmap::read_png(&file) {
                    Ok(img) => {
                        let origin = p.vector2i("origin", Vector2i::new(0, 0));
                        let size =
                            p.vector2u("size", Vector2u::new(img.width as u32, img.height as u32));
                        Some(Arc::new(Texture::Image {
                            img: Arc::new(img),
                            origin,
                            size,
                        }))
                    }
                    Err(e) => {
                        warn!("Couldn't load image at \"{}\": {}", file, e);
                        None
                    }
                }
            }
            _ => {
                warn!("Texture parameter \"type\" not recognized");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_ignores_coordinates() {
        let t = Texture::constant(Spectrum::new(0.5));
        assert_eq!(t.value(0.0, 0.0, Vector3f::default()), Spectrum::new(0.5));
        assert_eq!(t.value(0.9, 0.1, Vector3f::new(5.0, 1.0, 2.0)), Spectrum::new(0.5));
    }

    #[test]
    fn checker_alternates() {
        let t = Texture::Checker {
            odd: Texture::constant(Spectrum::new(0.0)),
            even: Texture::constant(Spectrum::new(1.0)),
        };
        // sin(10 * 0.15) ~ sin(1.5) > 0 on both axes.
        let a = t.value(0.15, 0.15, Vector3f::default());
        // Flip v into the negative sine lobe.
        let b = t.value(0.15, 0.5, Vector3f::default());
        assert_ne!(a, b);
    }
}
