//! Light sources.

use crate::core::geometry::*;
use crate::core::interaction::Interaction;
use crate::core::params::Params;
use crate::core::pbrt::*;
use crate::core::scene::Scene;
use crate::core::spectrum::Spectrum;
use crate::core::texture::Texture;
use crate::core::transform::Transform;
use crate::shapes::Shape;
use bitflags::bitflags;
use std::sync::Arc;

bitflags! {
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct LightType: u8 {
        const DELTA_POSITION  = 1 << 0;
        const DELTA_DIRECTION = 1 << 1;
        const AREA            = 1 << 2;
        const INFINITE        = 1 << 3;
    }
}

/// A light is a delta light iff its distribution is a Dirac in position or
/// direction; integrators skip BSDF-sampled MIS for these.
pub fn is_delta_light(light: &Light) -> bool {
    light
        .light_type()
        .intersects(LightType::DELTA_POSITION | LightType::DELTA_DIRECTION)
}

/// Radiance emitted by the primitive behind an interaction towards `wi`,
/// zero for non-emissive primitives.
pub fn light_emitted(isect: &Interaction, wi: Vector3f) -> Spectrum {
    match isect.primitive.as_ref().and_then(|p| p.light()) {
        Some(light) => light.l(isect, wi),
        None => Spectrum::black(),
    }
}

/// Deferred occlusion test between two points; `visible` traces the
/// shadow ray only when the integrator decides the sample matters.
#[derive(Clone, Default)]
pub struct VisibilityTester {
    p0: Interaction,
    p1: Interaction,
}

impl VisibilityTester {
    pub fn new(p0: Interaction, p1: Interaction) -> Self {
        Self { p0, p1 }
    }

    pub fn visible(&self, scene: &Scene) -> bool {
        !scene.q_intersect(&self.p0.spawn_ray_to(&self.p1))
    }
}

/// A light sample: incident direction, radiance, the PDF of having picked
/// it and the tester guarding its unoccluded path.
pub struct LiSample {
    pub wi: Vector3f,
    pub li: Spectrum,
    pub pdf: Float,
    pub vis: VisibilityTester,
}

#[inline]
fn spherical_phi(v: Vector3f) -> Float {
    let phi = v.y.atan2(v.x);
    if phi < 0.0 {
        phi + 2.0 * PI
    } else {
        phi
    }
}

#[inline]
fn spherical_theta(v: Vector3f) -> Float {
    clamp(v.z, -1.0, 1.0).acos()
}

#[inline]
fn spherical_direction(theta: Float, phi: Float) -> Vector3f {
    let sin_theta = theta.sin();
    Vector3f::new(sin_theta * phi.cos(), sin_theta * phi.sin(), theta.cos())
}

/// The closed set of light sources.
pub enum Light {
    /// Isotropic point emitter.
    Point { p: Vector3f, intensity: Spectrum },

    /// Emitting surface bound to a shape.
    Area { shape: Arc<Shape>, l_emit: Spectrum },

    /// A virtual emitting sphere of radius `radius` around the scene,
    /// with an optional radiance map in spherical coordinates.
    Environment {
        center: Vector3f,
        radius: Float,
        l_emit: Spectrum,
        map: Option<Arc<Texture>>,
        light_to_world: Transform,
    },
}

impl Light {
    pub fn environment(
        center: Vector3f,
        radius: Float,
        l_emit: Spectrum,
        map: Option<Arc<Texture>>,
    ) -> Self {
        Light::Environment {
            center,
            radius,
            l_emit,
            map,
            light_to_world: Transform::translate(center) * Transform::scale(radius, radius, radius),
        }
    }

    pub fn light_type(&self) -> LightType {
        match self {
            Light::Point { .. } => LightType::DELTA_POSITION,
            Light::Area { .. } => LightType::AREA,
            Light::Environment { .. } => LightType::AREA | LightType::INFINITE,
        }
    }

    /// The shape of an area light, used to inject its emissive geometry
    /// into the scene's primitives.
    pub fn shape(&self) -> Option<&Arc<Shape>> {
        match self {
            Light::Area { shape, .. } => Some(shape),
            _ => None,
        }
    }

    /// Samples a direction from `isect` towards the light.
    pub fn sample_li(&self, isect: &Interaction, u: Vector2f) -> LiSample {
        match self {
            Light::Point { p, intensity } => LiSample {
                wi: normalize(*p - isect.p),
                li: *intensity / distance_squared(isect.p, *p),
                pdf: 1.0,
                vis: VisibilityTester::new(Interaction::from_point(*p), isect.clone()),
            },
            Light::Area { shape, .. } => {
                let it = shape.sample_from(isect, u);
                let wi = normalize(it.p - isect.p);
                let li = self.l(&it, -wi);
                // Solid angle measure, so the PDF composes with the BSDF
                // strategy under one heuristic.
                LiSample {
                    wi,
                    li,
                    pdf: shape.pdf_from(isect, wi),
                    vis: VisibilityTester::new(it, isect.clone()),
                }
            }
            Light::Environment {
                center,
                radius,
                l_emit,
                map,
                light_to_world,
            } => {
                let phi = u.x * 2.0 * PI;
                let theta = u.y * PI;
                let wi = light_to_world.apply_vector(spherical_direction(theta, phi));

                let mut li = *l_emit;
                if let Some(map) = map {
                    li *= map.value(u.x, u.y, Vector3f::default());
                }
                LiSample {
                    wi,
                    li,
                    pdf: 1.0 / (2.0 * PI * PI),
                    vis: VisibilityTester::new(
                        Interaction::from_point(*center + wi * *radius),
                        isect.clone(),
                    ),
                }
            }
        }
    }

    /// Radiance carried back along a ray that escaped the scene.
    pub fn le(&self, r: &Ray) -> Spectrum {
        match self {
            Light::Point { .. } | Light::Area { .. } => Spectrum::black(),
            Light::Environment {
                l_emit,
                map,
                light_to_world,
                ..
            } => {
                let mut l = *l_emit;
                if let Some(map) = map {
                    let wi = normalize(light_to_world.inverse().apply_vector(r.d));
                    let u = spherical_phi(wi) * INV_2_PI;
                    let v = spherical_theta(wi) * INV_PI;
                    l *= map.value(u, v, Vector3f::default());
                }
                l
            }
        }
    }

    /// PDF of `sample_li` producing the direction `wi` from `isect`.
    pub fn pdf_li(&self, isect: &Interaction, wi: Vector3f) -> Float {
        match self {
            Light::Point { .. } => 0.0,
            Light::Area { shape, .. } => shape.pdf_from(isect, wi),
            Light::Environment { .. } => 1.0 / (2.0 * PI * PI),
        }
    }

    /// Emitted radiance from a point on an area light towards `w`; the
    /// emission is one-sided, facing the surface normal.
    pub fn l(&self, it: &Interaction, w: Vector3f) -> Spectrum {
        match self {
            Light::Area { l_emit, .. } => {
                if dot(it.n, w) > 0.0 {
                    *l_emit
                } else {
                    Spectrum::black()
                }
            }
            _ => Spectrum::black(),
        }
    }

    /// Builds a light from scene parameters. Area lights over group
    /// shapes are expanded by the scene loader before this is called.
    pub fn from_params(p: &Params) -> Option<Arc<Light>> {
        let kind = p.string("type");
        if kind.is_empty() {
            warn!("Light parameter \"type\" not specified");
        }
        match kind.as_str() {
            "point" => {
                let pos = p.value("position");
                match pos {
                    Some(pos) => {
                        let i = p.vector3f("intensity", Vector3f::new(1.0, 1.0, 1.0));
                        Some(Arc::new(Light::Point {
                            p: pos.vector3f(),
                            intensity: Spectrum::from_rgb(i),
                        }))
                    }
                    None => {
                        warn!("Point Light parameter \"position\" not specified");
                        None
                    }
                }
            }
            "area" => match p.shape("shape") {
                Some(shape) => {
                    let c = p.vector3f("emit", Vector3f::new(1.0, 1.0, 1.0));
                    Some(Arc::new(Light::Area {
                        shape,
                        l_emit: Spectrum::from_rgb(c),
                    }))
                }
                None => None,
            },
            "environment" => {
                let c = p.value("center");
                let r = p.value("radius");
                match (c, r) {
                    (Some(c), Some(r)) => {
                        let l =
                            Spectrum::from_rgb(p.vector3f("scale", Vector3f::new(1.0, 1.0, 1.0)));
                        let map = p.texture("radiance");
                        Some(Arc::new(Light::environment(
                            c.vector3f(),
                            r.f32(),
                            l,
                            map,
                        )))
                    }
                    (c, r) => {
                        if c.is_none() {
                            warn!("Environment Light parameter \"center\" not specified");
                        }
                        if r.is_none() {
                            warn!("Environment Light parameter \"radius\" not specified");
                        }
                        None
                    }
                }
            }
            _ => {
                warn!("Light parameter \"type\" not recognized");
                None
            }
        }
    }
}
