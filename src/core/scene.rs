//! Scenes and scene descriptions.

use crate::core::camera::Camera;
use crate::core::geometry::*;
use crate::core::interaction::Interaction;
use crate::core::light::Light;
use crate::core::material::Material;
use crate::core::params::{Object, Params};
use crate::core::primitive::{Aggregate, Primitive};
use crate::core::spectrum::Spectrum;
use crate::core::texture::Texture;
use crate::core::transform::{Matrix4x4, Transform};
use crate::core::value::Value;
use crate::loaders::obj::load_obj;
use crate::shapes::Shape;
use serde_json::Value as Json;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Everything the integrators trace against: the world aggregate and the
/// scene's lights.
pub struct Scene {
    aggregate: Aggregate,
    lights: Vec<Arc<Light>>,
}

impl Scene {
    pub fn new(aggregate: Aggregate, lights: Vec<Arc<Light>>) -> Self {
        Self { aggregate, lights }
    }

    pub fn bounds(&self) -> Bounds3f {
        self.aggregate.bounds()
    }

    pub fn lights(&self) -> &[Arc<Light>] {
        &self.lights
    }

    pub fn intersect(&self, r: &Ray) -> Option<Interaction> {
        self.aggregate.intersect(r)
    }

    pub fn q_intersect(&self, r: &Ray) -> bool {
        self.aggregate.q_intersect(r)
    }
}

#[derive(Error, Debug)]
pub enum SceneError {
    #[error("couldn't open {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("JSON parse error in {path} at line {line}, column {column}: {message}")]
    Parse {
        path: String,
        line: usize,
        column: usize,
        message: String,
    },

    #[error("couldn't extract a valid render description from {path}")]
    Incomplete { path: String },
}

/// A parsed scene file: primitives, lights, camera and the option bag.
/// This is the input the renderer pipeline is assembled from.
pub struct RenderDescription {
    pub primitives: Vec<Arc<Primitive>>,
    pub lights: Vec<Arc<Light>>,
    pub camera: Arc<Camera>,
    pub options: Params,
}

impl RenderDescription {
    /// Loads a JSON scene description. Parse failures surface with their
    /// position; missing pieces inside the scene are logged and skipped,
    /// and only a scene with no primitives or no camera is an error.
    pub fn load(path: &str) -> Result<RenderDescription, SceneError> {
        let text = std::fs::read_to_string(path).map_err(|source| SceneError::Io {
            path: path.to_string(),
            source,
        })?;
        let doc: Json = serde_json::from_str(&text).map_err(|e| SceneError::Parse {
            path: path.to_string(),
            line: e.line(),
            column: e.column(),
            message: e.to_string(),
        })?;

        let dir = Path::new(path)
            .parent()
            .filter(|d| !d.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), PathBuf::from);

        let mut loader = SceneLoader {
            dir,
            ..Default::default()
        };
        loader.load(&doc);

        if loader.primitives.is_empty() || loader.camera.is_none() {
            return Err(SceneError::Incomplete {
                path: path.to_string(),
            });
        }
        Ok(RenderDescription {
            primitives: loader.primitives,
            lights: loader.lights,
            camera: loader.camera.unwrap(),
            options: loader.options,
        })
    }
}

#[derive(Default)]
struct SceneLoader {
    dir: PathBuf,

    textures: BTreeMap<String, Object>,
    materials: BTreeMap<String, Object>,
    shapes: BTreeMap<String, Object>,

    bounds: Bounds3f,
    primitives: Vec<Arc<Primitive>>,
    lights: Vec<Arc<Light>>,
    camera: Option<Arc<Camera>>,
    options: Params,
}

fn resolve_path(dir: &Path, path: &str) -> String {
    if path.is_empty() || Path::new(path).is_absolute() {
        return path.to_string();
    }
    dir.join(path).to_string_lossy().into_owned()
}

/// Reads a `transform` member: a 16-number row-major matrix, an array of
/// composable transforms, or an object with exactly one of `rotate`
/// (angle plus axis), `scale`, or `translate`.
fn read_transform(v: &Json) -> Transform {
    if let Some(obj) = v.as_object() {
        if obj.len() != 1 {
            warn!("Transform object should only have one member");
            return Transform::default();
        }
        if let Some(r) = obj.get("rotate").and_then(Json::as_array) {
            if r.len() == 4 {
                let n: Vec<f32> = r.iter().filter_map(Json::as_f64).map(|x| x as f32).collect();
                if n.len() == 4 {
                    return Transform::rotate(n[0], Vector3f::new(n[1], n[2], n[3]));
                }
            }
        }
        if let Some(s) = obj.get("scale").and_then(Json::as_array) {
            let n: Vec<f32> = s.iter().filter_map(Json::as_f64).map(|x| x as f32).collect();
            if n.len() == 3 {
                return Transform::scale(n[0], n[1], n[2]);
            }
        }
        if let Some(t) = obj.get("translate").and_then(Json::as_array) {
            let n: Vec<f32> = t.iter().filter_map(Json::as_f64).map(|x| x as f32).collect();
            if n.len() == 3 {
                return Transform::translate(Vector3f::new(n[0], n[1], n[2]));
            }
        }
        warn!("Unrecognized Transform name");
        return Transform::default();
    }
    if let Some(arr) = v.as_array() {
        if arr.first().map_or(false, Json::is_number) {
            if arr.len() == 16 {
                let n: Vec<f32> = arr
                    .iter()
                    .filter_map(Json::as_f64)
                    .map(|x| x as f32)
                    .collect();
                if n.len() == 16 {
                    return Transform::new(Matrix4x4::from_slice(&n));
                }
            }
            warn!("Transform array should hold 16 numbers");
            return Transform::default();
        }
        let mut t = Transform::default();
        for m in arr {
            t = t * read_transform(m);
        }
        return t;
    }
    warn!("Unrecognized Transform format");
    Transform::default()
}

/// Converts a JSON object into a parameter bag. Transforms are inverted
/// on the way in, so consumers read world-to-object matrices; `file`
/// strings resolve against the scene directory; arrays flatten into
/// numeric values.
fn read_params(v: &Json, dir: &Path) -> Params {
    let mut p = Params::new();
    let Some(obj) = v.as_object() else {
        return p;
    };

    for (name, value) in obj {
        if name == "transform" {
            let t = read_transform(value);
            let inv = t.inv();
            let mut flat = Vec::with_capacity(16);
            for row in inv.m.iter() {
                flat.extend_from_slice(row);
            }
            p.insert(name, Object::Value(Value::from_f32s(flat)));
        } else if let Some(s) = value.as_str() {
            let s = if name == "file" {
                resolve_path(dir, s)
            } else {
                s.to_string()
            };
            p.insert_string(name, s);
        } else if let Some(arr) = value.as_array() {
            let mut nums = Vec::new();
            flatten_numbers(arr, &mut nums);
            p.insert(name, Object::Value(Value::from_f64s(nums)));
        } else if let Some(n) = value.as_u64() {
            p.insert(name, Object::Value(Value::scalar_u64(n)));
        } else if let Some(n) = value.as_i64() {
            p.insert(name, Object::Value(Value::scalar_i64(n)));
        } else if let Some(n) = value.as_f64() {
            p.insert(name, Object::Value(Value::scalar_f64(n)));
        } else if value.is_boolean() {
            warn!("Bool values are not supported");
        } else if value.is_object() {
            p.insert(name, Object::Params(Arc::new(read_params(value, dir))));
        }
    }
    p
}

fn flatten_numbers(arr: &[Json], out: &mut Vec<f64>) {
    for v in arr {
        if let Some(n) = v.as_f64() {
            out.push(n);
        } else if let Some(nested) = v.as_array() {
            flatten_numbers(nested, out);
        } else {
            warn!("Unsupported array element in scene parameters");
        }
    }
}

/// Material given to emissive primitives injected for area lights.
fn null_material() -> Arc<Material> {
    Arc::new(Material::Lambertian {
        kd: Texture::constant(Spectrum::black()),
    })
}

impl SceneLoader {
    fn load(&mut self, doc: &Json) {
        self.load_textures(doc);
        self.load_materials(doc);
        self.load_shapes(doc);
        self.load_camera(doc);
        self.load_options(doc);
        self.load_primitives(doc);
        self.load_lights(doc);
    }

    fn read_texture(&self, v: &Json) -> Option<Arc<Texture>> {
        let mut p = read_params(v, &self.dir);
        p.merge_objects(&self.textures);
        Texture::from_params(&p)
    }

    fn read_material(&self, v: &Json) -> Option<Arc<Material>> {
        let mut p = read_params(v, &self.dir);
        p.merge_objects(&self.textures);
        Material::from_params(&p)
    }

    fn read_shape(&self, v: &Json) -> Option<Arc<Shape>> {
        Shape::from_params(&read_params(v, &self.dir))
    }

    fn read_lights(&self, v: &Json) -> Vec<Arc<Light>> {
        let mut p = read_params(v, &self.dir);
        p.merge_objects(&self.textures);
        p.merge_objects(&self.shapes);

        if p.string("type") == "environment" {
            p.insert("center", Object::Value(Value::from_vector3f(self.bounds.center())));
            p.insert(
                "radius",
                Object::Value(Value::scalar_f32(self.bounds.diagonal().length() / 2.0)),
            );
        } else if p.string("type") == "area" {
            // An area light over a group becomes one light per face.
            if let Some(shape) = p.shape("shape") {
                if let Some(faces) = shape.faces() {
                    return faces
                        .iter()
                        .filter_map(|f| {
                            let mut fp = p.clone();
                            fp.insert("shape", Object::Shape(Arc::clone(f)));
                            Light::from_params(&fp)
                        })
                        .collect();
                }
            }
        }
        Light::from_params(&p).into_iter().collect()
    }

    fn load_textures(&mut self, doc: &Json) {
        let Some(section) = doc.get("textures").and_then(Json::as_array) else {
            return;
        };
        for v in section {
            match v.get("name").and_then(Json::as_str) {
                Some(name) if !name.is_empty() => match self.read_texture(v) {
                    Some(tex) => {
                        self.textures.insert(name.to_string(), Object::Texture(tex));
                    }
                    None => warn!("Couldn't create texture \"{}\"", name),
                },
                _ => warn!("Found unnamed texture, skipping"),
            }
        }
    }

    fn load_materials(&mut self, doc: &Json) {
        let Some(section) = doc.get("materials").and_then(Json::as_array) else {
            return;
        };
        for v in section {
            match v.get("name").and_then(Json::as_str) {
                Some(name) if !name.is_empty() => match self.read_material(v) {
                    Some(mat) => {
                        self.materials.insert(name.to_string(), Object::Material(mat));
                    }
                    None => warn!("Couldn't create material \"{}\"", name),
                },
                _ => warn!("Found unnamed material, skipping"),
            }
        }
    }

    fn load_shapes(&mut self, doc: &Json) {
        let Some(section) = doc.get("shapes").and_then(Json::as_array) else {
            return;
        };
        for v in section {
            match v.get("name").and_then(Json::as_str) {
                Some(name) if !name.is_empty() => match self.read_shape(v) {
                    Some(shape) => {
                        self.shapes.insert(name.to_string(), Object::Shape(shape));
                    }
                    None => warn!("Couldn't create shape \"{}\"", name),
                },
                _ => warn!("Found unnamed shape, skipping"),
            }
        }
    }

    fn load_camera(&mut self, doc: &Json) {
        match doc.get("camera") {
            Some(section) => {
                self.camera = Camera::from_params(&read_params(section, &self.dir));
                if let Some(camera) = &self.camera {
                    self.bounds = self.bounds.union_point(camera.position());
                }
            }
            None => error!("Missing \"camera\""),
        }
    }

    fn load_options(&mut self, doc: &Json) {
        if let Some(section) = doc.get("options") {
            self.options = read_params(section, &self.dir);
        }
    }

    fn load_primitives(&mut self, doc: &Json) {
        let Some(section) = doc.get("primitives").and_then(Json::as_array) else {
            error!("Couldn't find a primitive");
            return;
        };

        for (ix, v) in section.iter().enumerate() {
            if !v.is_object() {
                warn!("Primitive at index {} must be an object", ix);
                continue;
            }

            if let Some(file) = v.get("file") {
                match file.as_str() {
                    Some(file) => {
                        let path = resolve_path(&self.dir, file);
                        let t = v
                            .get("transform")
                            .map(read_transform)
                            .unwrap_or_default();
                        match load_obj(&path, &t) {
                            Some(prims) => {
                                for p in &prims {
                                    self.bounds = self.bounds.union(&p.bounds());
                                }
                                self.primitives.extend(prims);
                            }
                            None => warn!("Couldn't load OBJ file \"{}\"", path),
                        }
                    }
                    None => warn!("Expected filename for primitive at index {}", ix),
                }
                continue;
            }

            let shape = match v.get("shape") {
                Some(s) if s.is_object() => self.read_shape(s),
                Some(s) => match s.as_str() {
                    Some(name) => match self.shapes.get(name) {
                        Some(Object::Shape(shape)) => Some(Arc::clone(shape)),
                        _ => {
                            warn!("Couldn't find shape named \"{}\"", name);
                            None
                        }
                    },
                    None => None,
                },
                None => {
                    warn!("Primitive at index {}, no shape found", ix);
                    None
                }
            };

            let material = match v.get("material") {
                Some(m) if m.is_object() => self.read_material(m),
                Some(m) => match m.as_str() {
                    Some(name) => match self.materials.get(name) {
                        Some(Object::Material(mat)) => Some(Arc::clone(mat)),
                        _ => {
                            warn!("Couldn't find material named \"{}\"", name);
                            None
                        }
                    },
                    None => None,
                },
                None => {
                    warn!("Primitive at index {}, no material found", ix);
                    None
                }
            };

            match (shape, material) {
                (Some(shape), Some(material)) => {
                    self.bounds = self.bounds.union(&shape.bounds());
                    self.primitives
                        .extend(Primitive::from_shape(shape, Some(material), None));
                }
                _ => warn!("Couldn't create primitive at index {}", ix),
            }
        }

        if self.primitives.is_empty() {
            error!("Couldn't find a primitive");
        }
    }

    fn load_lights(&mut self, doc: &Json) {
        let Some(section) = doc.get("lights").and_then(Json::as_array) else {
            return;
        };
        for (ix, v) in section.iter().enumerate() {
            let lights = self.read_lights(v);
            if lights.is_empty() {
                warn!("Couldn't create light at index {}", ix);
                continue;
            }
            for light in lights {
                // Area lights also become scene geometry so the emitting
                // surface shows up in intersection tests.
                if let Some(shape) = light.shape() {
                    self.primitives.push(Primitive::new(
                        Arc::clone(shape),
                        Some(null_material()),
                        Some(Arc::clone(&light)),
                    ));
                }
                self.lights.push(light);
            }
        }
    }
}
