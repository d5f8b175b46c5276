//! Light transport integrators.

use crate::core::geometry::*;
use crate::core::interaction::Interaction;
use crate::core::light::{is_delta_light, light_emitted, Light};
use crate::core::material::compute_bsdf;
use crate::core::pbrt::*;
use crate::core::reflection::BxDFType;
use crate::core::sampler::Sampler;
use crate::core::sampling::power_heuristic;
use crate::core::scene::Scene;
use crate::core::spectrum::Spectrum;
use std::sync::Arc;

/// Per-camera-sample integrator output: radiance plus the first-hit
/// shading normal and albedo estimate consumed by the auxiliary outputs.
#[derive(Clone, Default)]
pub struct RadianceSample {
    pub li: Spectrum,
    pub n: Vector3f,
    pub albedo: Spectrum,
}

/// Estimates direct lighting at `isect` from a single light by combining
/// a light sample and a BSDF sample with the power heuristic. Delta
/// lights skip the BSDF strategy entirely.
fn estimate_direct(
    isect: &Interaction,
    u_scattering: Vector2f,
    light: &Arc<Light>,
    u_light: Vector2f,
    scene: &Scene,
) -> Spectrum {
    let flags = BxDFType::ALL;
    let mut l = Spectrum::black();

    let bsdf = match compute_bsdf(isect) {
        Some(b) => b,
        None => return l,
    };

    // Strategy one: sample the light.
    let sample = light.sample_li(isect, u_light);
    if !sample.li.is_black() && sample.pdf > 0.0 {
        let f = bsdf.f(isect.wo, sample.wi, flags) * abs_dot(sample.wi, isect.shading.n);
        let scattering_pdf = bsdf.pdf(isect.wo, sample.wi, flags);

        if !f.is_black() && sample.vis.visible(scene) {
            if is_delta_light(light) {
                l += f * sample.li / sample.pdf;
            } else {
                let weight = power_heuristic(1, sample.pdf, 1, scattering_pdf);
                l += f * sample.li * weight / sample.pdf;
            }
        }
    }

    // Strategy two: sample the BSDF and look for the same light.
    if !is_delta_light(light) {
        if let Some(bs) = bsdf.sample_f(isect.wo, u_scattering, flags) {
            let f = bs.f * abs_dot(bs.wi, isect.shading.n);
            if !f.is_black() && bs.pdf > 0.0 {
                let mut weight = 1.0;
                if !bs.sampled_type.contains(BxDFType::SPECULAR) {
                    let light_pdf = light.pdf_li(isect, bs.wi);
                    if float_equal(light_pdf, 0.0) {
                        return l;
                    }
                    weight = power_heuristic(1, bs.pdf, 1, light_pdf);
                }

                let r = isect.spawn_ray(bs.wi);
                let li = match scene.intersect(&r) {
                    Some(light_isect) => {
                        // Count the hit only when it lands on this light.
                        let same = light_isect
                            .primitive
                            .as_ref()
                            .and_then(|p| p.light())
                            .map_or(false, |hit_light| Arc::ptr_eq(hit_light, light));
                        if same {
                            light_emitted(&light_isect, -bs.wi)
                        } else {
                            Spectrum::black()
                        }
                    }
                    None => light.le(&r),
                };
                if !li.is_black() {
                    l += f * li * weight / bs.pdf;
                }
            }
        }
    }
    l
}

/// Picks one light uniformly and weights its direct estimate by the light
/// count.
pub fn uniform_sample_one_light(
    isect: &Interaction,
    scene: &Scene,
    sampler: &mut Sampler,
) -> Spectrum {
    let lights = scene.lights();
    if lights.is_empty() {
        return Spectrum::black();
    }
    let n = lights.len();
    let ix = ((sampler.sample_1d() * n as Float).floor() as usize).min(n - 1);
    let light = Arc::clone(&lights[ix]);

    n as Float * estimate_direct(isect, sampler.sample_2d(), &light, sampler.sample_2d(), scene)
}

/// The closed set of integrators.
pub enum Integrator {
    Whitted(WhittedIntegrator),
    Path(PathIntegrator),
}

impl Integrator {
    /// Builds the integrator selected by name; anything unrecognized gets
    /// the Whitted integrator, matching the scene option default.
    pub fn create(kind: &str, sampler: Sampler, max_depth: usize) -> Integrator {
        match kind {
            "path" => Integrator::Path(PathIntegrator { sampler, max_depth }),
            _ => Integrator::Whitted(WhittedIntegrator {
                sampler,
                max_depth,
                background: Spectrum::black(),
            }),
        }
    }

    /// The sampler template cloned for each tile.
    pub fn sampler(&self) -> &Sampler {
        match self {
            Integrator::Whitted(i) => &i.sampler,
            Integrator::Path(i) => &i.sampler,
        }
    }

    /// Radiance arriving along a camera ray, with first-hit auxiliaries.
    pub fn radiance(&self, ray: &Ray, scene: &Scene, sampler: &mut Sampler) -> RadianceSample {
        match self {
            Integrator::Whitted(i) => i.radiance(ray, scene, sampler),
            Integrator::Path(i) => i.radiance(ray, scene, sampler),
        }
    }
}

/// Depth-limited Whitted-style integrator over the legacy material
/// scattering interface: direct light gated by visibility plus one
/// scattered continuation ray per hit.
pub struct WhittedIntegrator {
    sampler: Sampler,
    max_depth: usize,
    background: Spectrum,
}

impl WhittedIntegrator {
    fn radiance(&self, ray: &Ray, scene: &Scene, sampler: &mut Sampler) -> RadianceSample {
        let mut out = RadianceSample::default();
        out.li = self.li(ray, scene, sampler, 0, Some(&mut out.n), Some(&mut out.albedo));
        out
    }

    fn li(
        &self,
        ray: &Ray,
        scene: &Scene,
        sampler: &mut Sampler,
        depth: usize,
        n_out: Option<&mut Vector3f>,
        a_out: Option<&mut Spectrum>,
    ) -> Spectrum {
        if let Some(isect) = scene.intersect(ray) {
            if depth < self.max_depth {
                if let Some(material) = isect.material.clone() {
                    if let Some((attenuation, wi)) = material.scatter(ray, &isect, sampler) {
                        let mut l = Spectrum::black();
                        for light in scene.lights() {
                            let u = sampler.sample_2d();
                            let sample = light.sample_li(&isect, u);
                            if sample.vis.visible(scene) {
                                l += sample.li * material.f(&isect, isect.wo, sample.wi);
                            }
                        }
                        let scattered = isect.spawn_ray(wi);
                        l += attenuation * self.li(&scattered, scene, sampler, depth + 1, None, None);

                        if let Some(n) = n_out {
                            *n = isect.n;
                        }
                        if let Some(a) = a_out {
                            *a = attenuation;
                        }
                        return l;
                    }
                }
            }
        }
        self.background
    }
}

/// Iterative path integrator with multiple importance sampling and
/// Russian roulette termination.
pub struct PathIntegrator {
    sampler: Sampler,
    max_depth: usize,
}

impl PathIntegrator {
    fn radiance(&self, r: &Ray, scene: &Scene, sampler: &mut Sampler) -> RadianceSample {
        let mut out = RadianceSample::default();
        let mut ray = *r;
        let mut l = Spectrum::black();
        let mut beta = Spectrum::new(1.0);
        let mut specular = false;

        let mut bounces = 0;
        loop {
            let isect = scene.intersect(&ray);

            // Emitted radiance is accounted for here only when no
            // scattering event preceded it: at the camera vertex, or after
            // a specular bounce whose contribution sampling cannot see.
            // The two cases are exclusive so nothing is counted twice.
            if bounces == 0 {
                match &isect {
                    Some(isect) => {
                        out.n = isect.n;
                        l += light_emitted(isect, -ray.d);
                    }
                    None => {
                        for light in scene.lights() {
                            l += light.le(&ray);
                        }
                    }
                }
            } else if specular {
                match &isect {
                    Some(isect) => l += beta * light_emitted(isect, -ray.d),
                    None => {
                        for light in scene.lights() {
                            l += beta * light.le(&ray);
                        }
                    }
                }
            }

            let isect = match isect {
                Some(isect) if bounces <= self.max_depth => isect,
                _ => break,
            };

            l += beta * uniform_sample_one_light(&isect, scene, sampler);

            let bsdf = match compute_bsdf(&isect) {
                Some(b) => b,
                None => break,
            };
            let u = sampler.sample_2d();
            let bs = match bsdf.sample_f(isect.wo, u, BxDFType::ALL) {
                Some(bs) if !bs.f.is_black() && !float_equal(bs.pdf, 0.0) => bs,
                _ => break,
            };

            if bounces == 0 {
                out.albedo = bs.f;
            }

            beta *= bs.f * abs_dot(bs.wi, isect.shading.n) / bs.pdf;
            specular = bs.sampled_type.contains(BxDFType::SPECULAR);
            ray = isect.spawn_ray(bs.wi);

            // Russian roulette once the path has had a fair chance.
            if bounces > 3 {
                let q = (1.0 - beta.max_component()).max(0.5);
                if sampler.sample_1d() < q {
                    break;
                }
                beta /= 1.0 - q;
            }
            bounces += 1;
        }

        out.li = l;
        out
    }
}
