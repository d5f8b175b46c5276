//! Parameter bags.

use crate::core::geometry::*;
use crate::core::material::Material;
use crate::core::pbrt::Float;
use crate::core::primitive::Primitive;
use crate::core::texture::Texture;
use crate::core::transform::Matrix4x4;
use crate::core::value::Value;
use crate::shapes::Shape;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Anything a parameter can hold besides a plain string: a numeric value,
/// a nested parameter bag, or an already-built scene object.
#[derive(Clone)]
pub enum Object {
    Value(Arc<Value>),
    Params(Arc<Params>),
    Shape(Arc<Shape>),
    Material(Arc<Material>),
    Texture(Arc<Texture>),
    Primitive(Arc<Primitive>),
}

/// A two-map parameter bag: `{string -> string}` and `{string -> object}`.
/// String entries double as indirections, so an object lookup that lands
/// on a string retries under that string's value; this is how scene
/// sections reference named materials, shapes and textures.
#[derive(Clone, Default)]
pub struct Params {
    strings: BTreeMap<String, String>,
    objects: BTreeMap<String, Object>,
}

/// Typed scalar getter reading through `Object::Value`.
macro_rules! params_scalar {
    ($func:ident, $t:ty, $access:ident) => {
        pub fn $func(&self, k: &str, default: $t) -> $t {
            match self.value(k) {
                Some(v) => v.$access(),
                None => default,
            }
        }
    };
}

/// Typed vector getter reading through `Object::Value`.
macro_rules! params_vector {
    ($func:ident, $t:ty, $access:ident) => {
        pub fn $func(&self, k: &str, default: $t) -> $t {
            match self.value(k) {
                Some(v) => v.$access(),
                None => default,
            }
        }
    };
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_string(&mut self, k: &str, v: impl Into<String>) {
        self.strings.insert(k.to_string(), v.into());
    }

    pub fn insert(&mut self, k: &str, v: Object) {
        self.objects.insert(k.to_string(), v);
    }

    /// Deep merge; keys already present keep their values.
    pub fn merge(&mut self, other: &Params) {
        for (k, v) in &other.strings {
            self.strings.entry(k.clone()).or_insert_with(|| v.clone());
        }
        for (k, v) in &other.objects {
            self.objects.entry(k.clone()).or_insert_with(|| v.clone());
        }
    }

    /// Merges a map of named objects, keeping existing keys.
    pub fn merge_objects(&mut self, map: &BTreeMap<String, Object>) {
        for (k, v) in map {
            self.objects.entry(k.clone()).or_insert_with(|| v.clone());
        }
    }

    pub fn string(&self, k: &str) -> String {
        self.strings.get(k).cloned().unwrap_or_default()
    }

    pub fn string_or(&self, k: &str, default: &str) -> String {
        let s = self.string(k);
        if s.is_empty() {
            default.to_string()
        } else {
            s
        }
    }

    /// Object lookup with string indirection.
    pub fn object(&self, k: &str) -> Option<Object> {
        if let Some(obj) = self.objects.get(k) {
            return Some(obj.clone());
        }
        match self.strings.get(k) {
            Some(name) => self.object(name),
            None => None,
        }
    }

    pub fn value(&self, k: &str) -> Option<Arc<Value>> {
        match self.object(k)? {
            Object::Value(v) => Some(v),
            _ => {
                error!("Params: unexpected type retrieving value \"{}\"", k);
                None
            }
        }
    }

    /// A shape: either stored directly or built from a nested bag.
    pub fn shape(&self, k: &str) -> Option<Arc<Shape>> {
        match self.object(k)? {
            Object::Shape(s) => Some(s),
            Object::Params(p) => Shape::from_params(&p),
            _ => {
                error!("Params: unexpected type retrieving shape \"{}\"", k);
                None
            }
        }
    }

    pub fn material(&self, k: &str) -> Option<Arc<Material>> {
        match self.object(k)? {
            Object::Material(m) => Some(m),
            Object::Params(p) => Material::from_params(&p),
            _ => {
                error!("Params: unexpected type retrieving material \"{}\"", k);
                None
            }
        }
    }

    pub fn texture(&self, k: &str) -> Option<Arc<Texture>> {
        match self.object(k)? {
            Object::Texture(t) => Some(t),
            Object::Params(p) => Texture::from_params(&p),
            _ => {
                error!("Params: unexpected type retrieving texture \"{}\"", k);
                None
            }
        }
    }

    /// Primitives for a key: one stored directly, or however many a
    /// nested description expands to.
    pub fn primitives(&self, k: &str) -> Option<Vec<Arc<Primitive>>> {
        match self.object(k)? {
            Object::Primitive(p) => Some(vec![p]),
            Object::Params(p) => Primitive::from_params(&p),
            _ => {
                error!("Params: unexpected type retrieving primitive \"{}\"", k);
                None
            }
        }
    }

    params_scalar!(f32, Float, f32);
    params_scalar!(f64, f64, f64);
    params_scalar!(i32, i32, i32);
    params_scalar!(u32, u32, u32);
    params_scalar!(u64, u64, u64);

    params_vector!(vector2f, Vector2f, vector2f);
    params_vector!(vector2i, Vector2i, vector2i);
    params_vector!(vector2u, Vector2u, vector2u);
    params_vector!(vector3f, Vector3f, vector3f);

    pub fn matrix44f(&self, k: &str, default: Matrix4x4) -> Matrix4x4 {
        self.value(k)
            .and_then(|v| v.matrix44f())
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_getters_fall_back_to_defaults() {
        let mut p = Params::new();
        p.insert("radius", Object::Value(Value::scalar_f32(2.5)));

        assert_eq!(p.f32("radius", 1.0), 2.5);
        assert_eq!(p.f32("missing", 1.0), 1.0);
        assert_eq!(p.u32("radius", 9), 2);
    }

    #[test]
    fn string_indirection_resolves_objects() {
        let mut p = Params::new();
        p.insert("red", Object::Value(Value::from_vector3f(Vector3f::new(1.0, 0.0, 0.0))));
        p.insert_string("color", "red");

        assert_eq!(
            p.vector3f("color", Vector3f::default()),
            Vector3f::new(1.0, 0.0, 0.0)
        );
    }

    #[test]
    fn nested_primitive_descriptions_expand() {
        let mut kd = Params::new();
        kd.insert_string("type", "constant");
        kd.insert(
            "color",
            Object::Value(Value::from_vector3f(Vector3f::new(0.5, 0.5, 0.5))),
        );

        let mut mat = Params::new();
        mat.insert_string("type", "lambertian");
        mat.insert("Kd", Object::Params(Arc::new(kd)));

        let mut shape = Params::new();
        shape.insert_string("type", "sphere");
        shape.insert("radius", Object::Value(Value::scalar_f32(2.0)));

        let mut prim = Params::new();
        prim.insert("shape", Object::Params(Arc::new(shape)));
        prim.insert("material", Object::Params(Arc::new(mat)));

        let mut outer = Params::new();
        outer.insert("prim", Object::Params(Arc::new(prim)));

        let prims = outer.primitives("prim").unwrap();
        assert_eq!(prims.len(), 1);
        assert!(prims[0].material().is_some());
    }

    #[test]
    fn merge_keeps_existing_keys() {
        let mut a = Params::new();
        a.insert_string("name", "kept");
        a.insert("n", Object::Value(Value::scalar_u32(1)));

        let mut b = Params::new();
        b.insert_string("name", "overwritten");
        b.insert_string("extra", "added");
        b.insert("n", Object::Value(Value::scalar_u32(2)));

        a.merge(&b);
        assert_eq!(a.string("name"), "kept");
        assert_eq!(a.string("extra"), "added");
        assert_eq!(a.u32("n", 0), 1);
    }
}
