//! Materials.

use crate::core::geometry::*;
use crate::core::interaction::Interaction;
use crate::core::params::Params;
use crate::core::pbrt::*;
use crate::core::reflection::{Bsdf, BxDF, Fresnel};
use crate::core::sampler::Sampler;
use crate::core::sampling::uniform_sample_sphere;
use crate::core::spectrum::Spectrum;
use crate::core::texture::Texture;
use std::sync::Arc;

/// Computes the BSDF at an interaction from its material, if it has one.
pub fn compute_bsdf(isect: &Interaction) -> Option<Bsdf> {
    isect.material.as_ref().map(|m| m.compute_bsdf(isect))
}

/// The closed set of materials. Each can produce a BSDF for the path
/// integrator; the Whitted integrator instead drives the legacy
/// `scatter`/`f` pair.
pub enum Material {
    Lambertian { kd: Arc<Texture> },
    Metal { albedo: Arc<Texture>, fuzz: Float },
    Dielectric { eta: Float },
}

/// Uniform point inside the unit ball.
fn sample_in_sphere(u: Vector2f, r: Float) -> Vector3f {
    uniform_sample_sphere(u) * r.cbrt()
}

impl Material {
    pub fn compute_bsdf(&self, isect: &Interaction) -> Bsdf {
        match self {
            Material::Lambertian { kd } => {
                let kd = kd.value(isect.uv.x, isect.uv.y, isect.p);
                Bsdf::new(isect, vec![BxDF::LambertianReflection { r: kd }])
            }
            Material::Metal { albedo, .. } => {
                let r = albedo.value(isect.uv.x, isect.uv.y, isect.p);
                let fresnel = Fresnel::Conductor {
                    eta_i: Spectrum::new(1.0),
                    eta_t: Spectrum::new(1.2),
                    k: Spectrum::new(2.2),
                };
                Bsdf::new(isect, vec![BxDF::SpecularReflection { r, fresnel }])
            }
            Material::Dielectric { eta } => Bsdf::new(
                isect,
                vec![BxDF::FresnelSpecular {
                    r: Spectrum::new(1.0),
                    t: Spectrum::new(1.0),
                    eta_a: 1.0,
                    eta_b: *eta,
                }],
            ),
        }
    }

    /// Reflectance term for the Whitted light loop. Only diffuse surfaces
    /// respond to direct light there; specular materials contribute
    /// through their scattered ray alone.
    pub fn f(&self, isect: &Interaction, _wo: Vector3f, _wi: Vector3f) -> Spectrum {
        match self {
            Material::Lambertian { kd } => kd.value(isect.uv.x, isect.uv.y, isect.p),
            Material::Metal { .. } | Material::Dielectric { .. } => Spectrum::black(),
        }
    }

    /// Legacy scattering interface: one attenuated continuation direction,
    /// or `None` when the ray is absorbed.
    pub fn scatter(
        &self,
        ray: &Ray,
        isect: &Interaction,
        sampler: &mut Sampler,
    ) -> Option<(Spectrum, Vector3f)> {
        match self {
            Material::Lambertian { kd } => {
                let u = sampler.sample_2d();
                let r = sampler.sample_1d();
                let wi = isect.n + sample_in_sphere(u, r);
                let attenuation = kd.value(isect.uv.x, isect.uv.y, isect.p);
                Some((attenuation, wi))
            }
            Material::Metal { albedo, fuzz } => {
                let u = sampler.sample_2d();
                let r = sampler.sample_1d();
                let reflected = reflect(normalize(ray.d), isect.n);
                let wi = reflected + *fuzz * sample_in_sphere(u, r);
                if dot(wi, isect.n) > 0.0 {
                    Some((albedo.value(isect.uv.x, isect.uv.y, isect.p), wi))
                } else {
                    None
                }
            }
            Material::Dielectric { eta } => {
                let rdir = normalize(ray.d);
                let (norm_out, ni_over_nt, cosine) = if dot(rdir, isect.n) > 0.0 {
                    (-isect.n, *eta, *eta * dot(rdir, isect.n))
                } else {
                    (isect.n, 1.0 / *eta, -dot(rdir, isect.n))
                };

                let refracted = crate::core::reflection::refract(-rdir, norm_out, ni_over_nt);
                let p_reflect = match refracted {
                    Some(_) => crate::core::reflection::schlick(cosine, *eta),
                    None => 1.0,
                };

                let wi = if sampler.sample_1d() < p_reflect {
                    reflect(rdir, isect.n)
                } else {
                    refracted.unwrap()
                };
                Some((Spectrum::new(1.0), wi))
            }
        }
    }

    /// Builds a material from scene parameters.
    pub fn from_params(p: &Params) -> Option<Arc<Material>> {
        let kind = p.string("type");
        if kind.is_empty() {
            warn!("Material parameter \"type\" not specified");
        }
        match kind.as_str() {
            "lambertian" => match p.texture("Kd") {
                Some(kd) => Some(Arc::new(Material::Lambertian { kd })),
                None => {
                    warn!("Lambertian parameter \"Kd\" not specified");
                    None
                }
            },
            "metal" => {
                let tex = p.texture("texture");
                let fuzz = p.value("fuzz");
                match (tex, fuzz) {
                    (Some(albedo), Some(fuzz)) => Some(Arc::new(Material::Metal {
                        albedo,
                        fuzz: fuzz.f32().min(1.0),
                    })),
                    (tex, fuzz) => {
                        if tex.is_none() {
                            warn!("Metal parameter \"texture\" not specified");
                        }
                        if fuzz.is_none() {
                            warn!("Metal parameter \"fuzz\" not specified");
                        }
                        None
                    }
                }
            }
            "dielectric" => match p.value("refraction") {
                Some(eta) => Some(Arc::new(Material::Dielectric { eta: eta.f32() })),
                None => {
                    warn!("Dielectric parameter \"refraction\" not specified");
                    None
                }
            },
            _ => {
                warn!("Material parameter \"type\" not recognized");
                None
            }
        }
    }
}
