//! Primitives and aggregates.

use crate::accelerators::{BvhAccel, QbvhAccel};
use crate::core::geometry::*;
use crate::core::interaction::Interaction;
use crate::core::light::Light;
use crate::core::material::Material;
use crate::shapes::Shape;
use std::sync::Arc;

/// A shape bound to a material and, for emitters, an area light. This is
/// the unit the accelerators index and the unit an interaction points back
/// to.
pub struct Primitive {
    shape: Arc<Shape>,
    material: Option<Arc<Material>>,
    light: Option<Arc<Light>>,
}

impl Primitive {
    pub fn new(
        shape: Arc<Shape>,
        material: Option<Arc<Material>>,
        light: Option<Arc<Light>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            shape,
            material,
            light,
        })
    }

    /// Builds primitives from a parameter bag: either a shape/material
    /// pair, or an external OBJ file reference with an optional
    /// transform.
    pub fn from_params(p: &crate::core::params::Params) -> Option<Vec<Arc<Primitive>>> {
        if let Some(shape) = p.shape("shape") {
            if let Some(material) = p.material("material") {
                return Some(Primitive::from_shape(shape, Some(material), None));
            }
            warn!("Primitive has no material");
            return None;
        }

        let file = p.string("file");
        if !file.is_empty() {
            // The stored matrix is world-to-object; the loader wants the
            // placement transform.
            let t = crate::core::transform::Transform::new(
                p.matrix44f("transform", crate::core::transform::Matrix4x4::default()),
            )
            .inverse();
            return crate::loaders::obj::load_obj(&file, &t);
        }

        warn!("Primitive has no shape");
        None
    }

    /// Expands a shape into primitives: group shapes yield one primitive
    /// per face, everything else exactly one.
    pub fn from_shape(
        shape: Arc<Shape>,
        material: Option<Arc<Material>>,
        light: Option<Arc<Light>>,
    ) -> Vec<Arc<Primitive>> {
        match shape.faces() {
            Some(faces) => faces
                .iter()
                .map(|f| Primitive::new(Arc::clone(f), material.clone(), light.clone()))
                .collect(),
            None => vec![Primitive::new(shape, material, light)],
        }
    }

    pub fn bounds(&self) -> Bounds3f {
        self.shape.bounds()
    }

    pub fn shape(&self) -> &Arc<Shape> {
        &self.shape
    }

    pub fn material(&self) -> Option<&Arc<Material>> {
        self.material.as_ref()
    }

    /// The area light this primitive emits for, if any.
    pub fn light(&self) -> Option<&Arc<Light>> {
        self.light.as_ref()
    }

    /// Intersects the shape and binds the hit to this primitive. Takes
    /// the `Arc` so the interaction can point back at it.
    pub fn intersect(this: &Arc<Primitive>, r: &Ray) -> Option<Interaction> {
        let mut isect = this.shape.intersect(r)?;
        isect.material = this.material.clone();
        isect.primitive = Some(Arc::clone(this));
        Some(isect)
    }

    pub fn q_intersect(&self, r: &Ray) -> bool {
        self.shape.q_intersect(r)
    }
}

/// Plain linear grouping of primitives: intersection walks the whole list.
pub struct PrimitiveList {
    primitives: Vec<Arc<Primitive>>,
    bounds: Bounds3f,
}

impl PrimitiveList {
    pub fn new(primitives: Vec<Arc<Primitive>>) -> Self {
        let bounds = primitives
            .iter()
            .fold(Bounds3f::default(), |b, p| b.union(&p.bounds()));
        Self { primitives, bounds }
    }

    pub fn primitives(&self) -> &[Arc<Primitive>] {
        &self.primitives
    }

    pub fn bounds(&self) -> Bounds3f {
        self.bounds
    }

    pub fn intersect(&self, r: &Ray) -> Option<Interaction> {
        let mut t_max = r.t_max;
        let mut hit = None;
        for p in &self.primitives {
            if let Some(isect) = Primitive::intersect(p, &r.clamped(t_max)) {
                t_max = isect.t;
                hit = Some(isect);
            }
        }
        hit
    }

    pub fn q_intersect(&self, r: &Ray) -> bool {
        self.primitives.iter().any(|p| p.q_intersect(r))
    }
}

/// The aggregate forms a scene can use as its world: a linear list or one
/// of the two bounding volume hierarchies.
pub enum Aggregate {
    List(PrimitiveList),
    Bvh(BvhAccel),
    Qbvh(QbvhAccel),
}

impl Aggregate {
    /// Builds the accelerator selected by name; unknown names fall back to
    /// the binary BVH.
    pub fn create(name: &str, primitives: Vec<Arc<Primitive>>) -> Self {
        match name {
            "bvh" => Aggregate::Bvh(BvhAccel::new(primitives)),
            "qbvh" => Aggregate::Qbvh(QbvhAccel::new(primitives)),
            "list" => Aggregate::List(PrimitiveList::new(primitives)),
            other => {
                warn!("Unknown accelerator \"{}\", using bvh", other);
                Aggregate::Bvh(BvhAccel::new(primitives))
            }
        }
    }

    pub fn bounds(&self) -> Bounds3f {
        match self {
            Aggregate::List(a) => a.bounds(),
            Aggregate::Bvh(a) => a.bounds(),
            Aggregate::Qbvh(a) => a.bounds(),
        }
    }

    pub fn primitives(&self) -> &[Arc<Primitive>] {
        match self {
            Aggregate::List(a) => a.primitives(),
            Aggregate::Bvh(a) => a.primitives(),
            Aggregate::Qbvh(a) => a.primitives(),
        }
    }

    pub fn intersect(&self, r: &Ray) -> Option<Interaction> {
        match self {
            Aggregate::List(a) => a.intersect(r),
            Aggregate::Bvh(a) => a.intersect(r),
            Aggregate::Qbvh(a) => a.intersect(r),
        }
    }

    pub fn q_intersect(&self, r: &Ray) -> bool {
        match self {
            Aggregate::List(a) => a.q_intersect(r),
            Aggregate::Bvh(a) => a.q_intersect(r),
            Aggregate::Qbvh(a) => a.q_intersect(r),
        }
    }
}
