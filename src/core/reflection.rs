//! BSDFs and their lobes.

use crate::core::geometry::*;
use crate::core::interaction::Interaction;
use crate::core::pbrt::*;
use crate::core::sampling::cosine_sample_hemisphere;
use crate::core::spectrum::Spectrum;
use bitflags::bitflags;

bitflags! {
    /// Classification of a BxDF lobe.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct BxDFType: u8 {
        const REFLECTION   = 1 << 0;
        const TRANSMISSION = 1 << 1;
        const DIFFUSE      = 1 << 2;
        const GLOSSY       = 1 << 3;
        const SPECULAR     = 1 << 4;
    }
}

impl BxDFType {
    pub const ALL: BxDFType = BxDFType::all();
}

// Directions in BxDF space have the shading normal as +z, which turns the
// spherical trigonometry into component reads.

#[inline]
pub fn cos_theta(w: Vector3f) -> Float {
    w.z
}

#[inline]
pub fn abs_cos_theta(w: Vector3f) -> Float {
    w.z.abs()
}

#[inline]
pub fn sin2_theta(w: Vector3f) -> Float {
    (1.0 - cos_theta(w) * cos_theta(w)).max(0.0)
}

#[inline]
pub fn same_hemisphere(w: Vector3f, wp: Vector3f) -> bool {
    w.z * wp.z > 0.0
}

/// Refracts `wi` about `n` with the relative index `eta = eta_i / eta_t`;
/// `None` on total internal reflection.
pub fn refract(wi: Vector3f, n: Vector3f, eta: Float) -> Option<Vector3f> {
    let cos_theta_i = dot(wi, n);
    let sin2_theta_i = (1.0 - cos_theta_i * cos_theta_i).max(0.0);
    let sin2_theta_t = eta * eta * sin2_theta_i;

    if sin2_theta_t >= 1.0 {
        return None;
    }
    let cos_theta_t = (1.0 - sin2_theta_t).sqrt();
    Some(-eta * wi + (eta * cos_theta_i - cos_theta_t) * n)
}

/// Schlick's reflectance approximation, used to pick between reflection
/// and refraction stochastically.
pub fn schlick(cos: Float, eta: Float) -> Float {
    let r = (1.0 - eta) / (1.0 + eta);
    let r = r * r;
    r + (1.0 - r) * (1.0 - cos).powi(5)
}

/// Fresnel reflectance models.
pub enum Fresnel {
    /// Dielectric interface with real indices on both sides.
    Dielectric { eta_i: Float, eta_t: Float },

    /// Conductor with complex index `eta + i k`, evaluated per channel.
    Conductor {
        eta_i: Spectrum,
        eta_t: Spectrum,
        k: Spectrum,
    },
}

impl Fresnel {
    /// Polarization-averaged reflectance for an incident cosine. The sign
    /// of `cos_theta_i` selects which side of the interface the ray
    /// arrives from.
    pub fn evaluate(&self, cos_theta_i: Float) -> Spectrum {
        match self {
            Fresnel::Dielectric { eta_i, eta_t } => {
                let mut cos_theta_i = clamp(cos_theta_i, -1.0, 1.0);
                let (mut eta_i, mut eta_t) = (*eta_i, *eta_t);
                if cos_theta_i <= 0.0 {
                    std::mem::swap(&mut eta_i, &mut eta_t);
                    cos_theta_i = cos_theta_i.abs();
                }

                let sin_theta_i = (1.0 - cos_theta_i * cos_theta_i).max(0.0).sqrt();
                let sin_theta_t = eta_i / eta_t * sin_theta_i;
                if sin_theta_t >= 1.0 {
                    return Spectrum::new(1.0);
                }

                let cos_theta_t = (1.0 - sin_theta_t * sin_theta_t).max(0.0).sqrt();
                let r_parl = (eta_t * cos_theta_i - eta_i * cos_theta_t)
                    / (eta_t * cos_theta_i + eta_i * cos_theta_t);
                let r_perp = (eta_i * cos_theta_i - eta_t * cos_theta_t)
                    / (eta_i * cos_theta_i + eta_t * cos_theta_t);
                Spectrum::new((r_parl * r_parl + r_perp * r_perp) / 2.0)
            }
            Fresnel::Conductor { eta_i, eta_t, k } => {
                let cos_theta_i = clamp(cos_theta_i, -1.0, 1.0);
                let eta = *eta_t / *eta_i;
                let etak = *k / *eta_i;

                let cos2 = cos_theta_i * cos_theta_i;
                let sin2 = 1.0 - cos2;
                let eta2 = eta * eta;
                let etak2 = etak * etak;

                let t0 = eta2 - etak2 - Spectrum::new(sin2);
                let a2b2 = (t0 * t0 + 4.0 * eta2 * etak2).sqrt();
                let t1 = a2b2 + Spectrum::new(cos2);
                let a = (0.5 * (a2b2 + t0)).sqrt();
                let t2 = 2.0 * cos_theta_i * a;
                let rs = (t1 - t2) / (t1 + t2);

                let t3 = cos2 * a2b2 + Spectrum::new(sin2 * sin2);
                let t4 = t2 * sin2;
                let rp = rs * (t3 - t4) / (t3 + t4);

                0.5 * (rp + rs)
            }
        }
    }
}

/// Result of importance sampling a lobe.
pub struct BxDFSample {
    pub wi: Vector3f,
    pub f: Spectrum,
    pub pdf: Float,
    pub sampled_type: BxDFType,
}

/// The closed set of lobes a BSDF composes.
pub enum BxDF {
    LambertianReflection {
        r: Spectrum,
    },
    SpecularReflection {
        r: Spectrum,
        fresnel: Fresnel,
    },
    SpecularTransmission {
        t: Spectrum,
        eta_a: Float,
        eta_b: Float,
    },
    /// Reflection and refraction combined, choosing between them with a
    /// Schlick-weighted comparison against the sample value.
    FresnelSpecular {
        r: Spectrum,
        t: Spectrum,
        eta_a: Float,
        eta_b: Float,
    },
}

impl BxDF {
    pub fn bxdf_type(&self) -> BxDFType {
        match self {
            BxDF::LambertianReflection { .. } => BxDFType::REFLECTION | BxDFType::DIFFUSE,
            BxDF::SpecularReflection { .. } => BxDFType::REFLECTION | BxDFType::SPECULAR,
            BxDF::SpecularTransmission { .. } => BxDFType::TRANSMISSION | BxDFType::SPECULAR,
            BxDF::FresnelSpecular { .. } => {
                BxDFType::REFLECTION | BxDFType::TRANSMISSION | BxDFType::SPECULAR
            }
        }
    }

    pub fn matches_flags(&self, flags: BxDFType) -> bool {
        let t = self.bxdf_type();
        t & flags == t
    }

    pub fn is_specular(&self) -> bool {
        self.bxdf_type().contains(BxDFType::SPECULAR)
    }

    /// Lobe value for a pair of local directions; zero for the delta
    /// lobes, whose contribution only appears through `sample_f`.
    pub fn f(&self, _wo: Vector3f, _wi: Vector3f) -> Spectrum {
        match self {
            BxDF::LambertianReflection { r } => *r * INV_PI,
            BxDF::SpecularReflection { .. }
            | BxDF::SpecularTransmission { .. }
            | BxDF::FresnelSpecular { .. } => Spectrum::black(),
        }
    }

    pub fn sample_f(&self, wo: Vector3f, u: Vector2f) -> BxDFSample {
        match self {
            BxDF::LambertianReflection { r } => {
                let mut wi = cosine_sample_hemisphere(u);
                if wo.z < 0.0 {
                    wi.z = -wi.z;
                }
                BxDFSample {
                    wi,
                    f: *r * INV_PI,
                    pdf: self.pdf(wo, wi),
                    sampled_type: self.bxdf_type(),
                }
            }
            BxDF::SpecularReflection { r, fresnel } => {
                let wi = Vector3f::new(-wo.x, -wo.y, wo.z);
                BxDFSample {
                    wi,
                    f: fresnel.evaluate(cos_theta(wi)) * *r / abs_cos_theta(wi),
                    pdf: 1.0,
                    sampled_type: self.bxdf_type(),
                }
            }
            BxDF::SpecularTransmission { t, eta_a, eta_b } => {
                let entering = cos_theta(wo) > 0.0;
                let (eta_i, eta_t) = if entering {
                    (*eta_a, *eta_b)
                } else {
                    (*eta_b, *eta_a)
                };
                let fresnel = Fresnel::Dielectric {
                    eta_i: *eta_a,
                    eta_t: *eta_b,
                };

                let n = face_forward(Vector3f::new(0.0, 0.0, 1.0), wo);
                match refract(wo, n, eta_i / eta_t) {
                    Some(wi) => {
                        let ft =
                            *t * (Spectrum::new(1.0) - fresnel.evaluate(cos_theta(wi)));
                        BxDFSample {
                            wi,
                            f: ft / abs_cos_theta(wi),
                            pdf: 1.0,
                            sampled_type: self.bxdf_type(),
                        }
                    }
                    None => BxDFSample {
                        wi: Vector3f::default(),
                        f: Spectrum::black(),
                        pdf: 0.0,
                        sampled_type: self.bxdf_type(),
                    },
                }
            }
            BxDF::FresnelSpecular {
                r,
                t,
                eta_a,
                eta_b,
            } => {
                let entering = cos_theta(wo) > 0.0;
                let (eta_i, eta_t) = if entering {
                    (*eta_a, *eta_b)
                } else {
                    (*eta_b, *eta_a)
                };
                let fresnel = Fresnel::Dielectric {
                    eta_i: *eta_a,
                    eta_t: *eta_b,
                };

                let n = face_forward(Vector3f::new(0.0, 0.0, 1.0), wo);
                let refracted = refract(wo, n, eta_i / eta_t);

                let mut wi;
                let mut ft;
                match refracted {
                    Some(wt) => {
                        wi = wt;
                        ft = *r * fresnel.evaluate(cos_theta(wi));
                        ft += *t * (Spectrum::new(1.0) - fresnel.evaluate(cos_theta(wi)));
                        if u.x * u.y < schlick(cos_theta(wi), eta_i) {
                            wi = reflect(wo, n);
                        }
                    }
                    None => {
                        // Total internal reflection.
                        wi = reflect(wo, n);
                        ft = *r * fresnel.evaluate(cos_theta(wi));
                    }
                }
                BxDFSample {
                    wi,
                    f: ft / abs_cos_theta(wi),
                    pdf: 1.0,
                    sampled_type: self.bxdf_type(),
                }
            }
        }
    }

    pub fn pdf(&self, wo: Vector3f, wi: Vector3f) -> Float {
        match self {
            BxDF::LambertianReflection { .. } => {
                if same_hemisphere(wo, wi) {
                    abs_cos_theta(wi) * INV_PI
                } else {
                    0.0
                }
            }
            // Delta distributions: the probability of any queried
            // direction is zero.
            _ => 0.0,
        }
    }
}

/// A BSDF: a set of lobes in a shading frame derived from the shading
/// normal and the surface `dpdu`.
pub struct Bsdf {
    ng: Vector3f,
    ns: Vector3f,
    ss: Vector3f,
    ts: Vector3f,
    bxdfs: Vec<BxDF>,
}

impl Bsdf {
    pub fn new(isect: &Interaction, bxdfs: Vec<BxDF>) -> Self {
        let ns = isect.shading.n;
        let ss = normalize(isect.shading.dpdu);
        let b = Self {
            ng: isect.n,
            ns,
            ss,
            ts: cross(ns, ss),
            bxdfs,
        };
        debug_assert!(!b.ng.has_nan() && !b.ns.has_nan() && !b.ss.has_nan() && !b.ts.has_nan());
        b
    }

    pub fn world_to_local(&self, v: Vector3f) -> Vector3f {
        Vector3f::new(dot(v, self.ss), dot(v, self.ts), dot(v, self.ns))
    }

    pub fn local_to_world(&self, v: Vector3f) -> Vector3f {
        Vector3f::new(
            self.ss.x * v.x + self.ts.x * v.y + self.ns.x * v.z,
            self.ss.y * v.x + self.ts.y * v.y + self.ns.y * v.z,
            self.ss.z * v.x + self.ts.z * v.y + self.ns.z * v.z,
        )
    }

    /// Sums the matching lobes for a pair of world directions. Whether a
    /// lobe reflects or transmits is decided against the geometric normal
    /// to avoid light leaks from shading normals.
    pub fn f(&self, wo_w: Vector3f, wi_w: Vector3f, flags: BxDFType) -> Spectrum {
        let wo = self.world_to_local(wo_w);
        let wi = self.world_to_local(wi_w);

        let reflect = dot(wo_w, self.ng) * dot(wi_w, self.ng) > 0.0;

        let mut f = Spectrum::black();
        for bxdf in &self.bxdfs {
            let t = bxdf.bxdf_type();
            if bxdf.matches_flags(flags)
                && ((reflect && t.contains(BxDFType::REFLECTION))
                    || (!reflect && t.contains(BxDFType::TRANSMISSION)))
            {
                f += bxdf.f(wo, wi);
            }
        }
        f
    }

    /// Samples one matching lobe chosen by `u.x` (remapped afterwards so
    /// the lobe sees a fresh uniform value). For non-specular samples the
    /// PDF is averaged with the other matching lobes and their values are
    /// added in for the hemisphere actually sampled.
    pub fn sample_f(&self, wo_w: Vector3f, u: Vector2f, flags: BxDFType) -> Option<BxDFSample> {
        let matching: Vec<&BxDF> = self.bxdfs.iter().filter(|b| b.matches_flags(flags)).collect();
        if matching.is_empty() {
            return None;
        }

        let n = matching.len();
        let ix = ((u.x * n as Float).floor() as usize).min(n - 1);
        let bxdf = matching[ix];
        let u_remap = Vector2f::new(u.x * n as Float - ix as Float, u.y);

        let wo = self.world_to_local(wo_w);
        let mut sample = bxdf.sample_f(wo, u_remap);
        if float_equal(sample.pdf, 0.0) {
            return None;
        }
        let wi = sample.wi;
        let wi_w = self.local_to_world(wi);

        if !bxdf.is_specular() && n > 1 {
            for (i, other) in matching.iter().enumerate() {
                if i != ix {
                    sample.pdf += other.pdf(wo, wi);
                }
            }
            sample.pdf /= n as Float;

            let reflect = dot(wo_w, self.ng) * dot(wi_w, self.ng) > 0.0;
            for (i, other) in matching.iter().enumerate() {
                let t = other.bxdf_type();
                if i != ix
                    && ((reflect && t.contains(BxDFType::REFLECTION))
                        || (!reflect && t.contains(BxDFType::TRANSMISSION)))
                {
                    sample.f += other.f(wo, wi);
                }
            }
        }

        sample.wi = wi_w;
        Some(sample)
    }

    /// Average PDF over the matching lobes.
    pub fn pdf(&self, wo_w: Vector3f, wi_w: Vector3f, flags: BxDFType) -> Float {
        if self.bxdfs.is_empty() {
            return 0.0;
        }
        let wo = self.world_to_local(wo_w);
        let wi = self.world_to_local(wi_w);
        if float_equal(wo.z, 0.0) {
            return 0.0;
        }

        let mut pdf = 0.0;
        let mut n = 0;
        for bxdf in &self.bxdfs {
            if bxdf.matches_flags(flags) {
                n += 1;
                pdf += bxdf.pdf(wo, wi);
            }
        }
        if n > 0 {
            pdf / n as Float
        } else {
            0.0
        }
    }
}
