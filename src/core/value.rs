//! Type-erased numeric values.

use crate::core::geometry::*;
use crate::core::pbrt::Float;
use crate::core::transform::Matrix4x4;
use std::sync::Arc;

/// A scalar or vector of numbers whose concrete type is erased behind
/// converting accessors, so scene parameters can be stored once and read
/// back as whatever width a consumer needs.
pub enum Value {
    I32(Vec<i32>),
    I64(Vec<i64>),
    U32(Vec<u32>),
    U64(Vec<u64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

macro_rules! value_scalar {
    ($func:ident, $t:ty) => {
        /// First element converted to the named type; zero when empty.
        pub fn $func(&self) -> $t {
            match self {
                Value::I32(v) => v.first().copied().unwrap_or_default() as $t,
                Value::I64(v) => v.first().copied().unwrap_or_default() as $t,
                Value::U32(v) => v.first().copied().unwrap_or_default() as $t,
                Value::U64(v) => v.first().copied().unwrap_or_default() as $t,
                Value::F32(v) => v.first().copied().unwrap_or_default() as $t,
                Value::F64(v) => v.first().copied().unwrap_or_default() as $t,
            }
        }
    };
}

macro_rules! value_vec {
    ($func:ident, $t:ty) => {
        /// All elements converted to the named type.
        pub fn $func(&self) -> Vec<$t> {
            match self {
                Value::I32(v) => v.iter().map(|&x| x as $t).collect(),
                Value::I64(v) => v.iter().map(|&x| x as $t).collect(),
                Value::U32(v) => v.iter().map(|&x| x as $t).collect(),
                Value::U64(v) => v.iter().map(|&x| x as $t).collect(),
                Value::F32(v) => v.iter().map(|&x| x as $t).collect(),
                Value::F64(v) => v.iter().map(|&x| x as $t).collect(),
            }
        }
    };
}

impl Value {
    pub fn scalar_u32(v: u32) -> Arc<Value> {
        Arc::new(Value::U32(vec![v]))
    }

    pub fn scalar_i64(v: i64) -> Arc<Value> {
        Arc::new(Value::I64(vec![v]))
    }

    pub fn scalar_u64(v: u64) -> Arc<Value> {
        Arc::new(Value::U64(vec![v]))
    }

    pub fn scalar_f32(v: Float) -> Arc<Value> {
        Arc::new(Value::F32(vec![v]))
    }

    pub fn scalar_f64(v: f64) -> Arc<Value> {
        Arc::new(Value::F64(vec![v]))
    }

    pub fn from_f64s(v: Vec<f64>) -> Arc<Value> {
        Arc::new(Value::F64(v))
    }

    pub fn from_f32s(v: Vec<f32>) -> Arc<Value> {
        Arc::new(Value::F32(v))
    }

    pub fn from_vector3f(v: Vector3f) -> Arc<Value> {
        Arc::new(Value::F32(vec![v.x, v.y, v.z]))
    }

    pub fn count(&self) -> usize {
        match self {
            Value::I32(v) => v.len(),
            Value::I64(v) => v.len(),
            Value::U32(v) => v.len(),
            Value::U64(v) => v.len(),
            Value::F32(v) => v.len(),
            Value::F64(v) => v.len(),
        }
    }

    value_scalar!(f32, f32);
    value_scalar!(f64, f64);
    value_scalar!(i32, i32);
    value_scalar!(i64, i64);
    value_scalar!(u32, u32);
    value_scalar!(u64, u64);

    value_vec!(f32_vec, f32);
    value_vec!(f64_vec, f64);
    value_vec!(i32_vec, i32);
    value_vec!(u32_vec, u32);

    pub fn vector2f(&self) -> Vector2f {
        let v = self.f32_vec();
        Vector2f::new(
            v.first().copied().unwrap_or_default(),
            v.get(1).copied().unwrap_or_default(),
        )
    }

    pub fn vector2i(&self) -> Vector2i {
        let v = self.i32_vec();
        Vector2i::new(
            v.first().copied().unwrap_or_default(),
            v.get(1).copied().unwrap_or_default(),
        )
    }

    pub fn vector2u(&self) -> Vector2u {
        let v = self.u32_vec();
        Vector2u::new(
            v.first().copied().unwrap_or_default(),
            v.get(1).copied().unwrap_or_default(),
        )
    }

    pub fn vector3f(&self) -> Vector3f {
        let v = self.f32_vec();
        Vector3f::new(
            v.first().copied().unwrap_or_default(),
            v.get(1).copied().unwrap_or_default(),
            v.get(2).copied().unwrap_or_default(),
        )
    }

    /// 16-element row-major matrix; `None` for shorter values.
    pub fn matrix44f(&self) -> Option<Matrix4x4> {
        let v = self.f32_vec();
        if v.len() >= 16 {
            Some(Matrix4x4::from_slice(&v))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converting_extraction() {
        let v = Value::F64(vec![1.5, 2.0, 3.0]);
        assert_eq!(v.count(), 3);
        assert_eq!(v.f32(), 1.5);
        assert_eq!(v.i32(), 1);
        assert_eq!(v.u32_vec(), vec![1, 2, 3]);
        assert_eq!(v.vector3f(), Vector3f::new(1.5, 2.0, 3.0));
    }

    #[test]
    fn short_values_pad_with_zero() {
        let v = Value::U32(vec![7]);
        assert_eq!(v.vector3f(), Vector3f::new(7.0, 0.0, 0.0));
        assert!(v.matrix44f().is_none());
    }

    #[test]
    fn matrix_round_trips() {
        let m: Vec<f64> = (0..16).map(|i| i as f64).collect();
        let v = Value::F64(m);
        let mat = v.matrix44f().unwrap();
        assert_eq!(mat.m[0][0], 0.0);
        assert_eq!(mat.m[1][0], 4.0);
        assert_eq!(mat.m[3][3], 15.0);
    }
}
